//! Control-signal protocol between workerctl and the service master.
//!
//! The master's reactions are implemented by the service itself; workerctl
//! only delivers the request and observes the effects (process exit, a
//! regenerated statistics file).

use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::fmt;

/// Requests the service master understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    /// Begin an orderly shutdown of all workers, then the master itself
    Shutdown,
    /// Hot-reload workers without dropping the master
    Reload,
    /// Regenerate the statistics file (master broadcasts to all workers)
    DumpStatus,
    /// Regenerate the statistics file with the connection table
    DumpConnections,
}

impl ControlSignal {
    /// The OS signal carrying this request.
    pub fn os_signal(self) -> Signal {
        match self {
            ControlSignal::Shutdown => Signal::SIGINT,
            ControlSignal::Reload => Signal::SIGUSR1,
            ControlSignal::DumpStatus => Signal::SIGUSR2,
            ControlSignal::DumpConnections => Signal::SIGIO,
        }
    }
}

impl fmt::Display for ControlSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ControlSignal::Shutdown => "shutdown",
            ControlSignal::Reload => "reload",
            ControlSignal::DumpStatus => "status dump",
            ControlSignal::DumpConnections => "connections dump",
        };
        write!(f, "{name}")
    }
}

/// Narrow capability for talking to the master, swappable in tests.
pub trait SignalSender {
    /// Deliver a control signal to the master.
    fn send(&self, pid: Pid, signal: ControlSignal) -> Result<(), Errno>;

    /// Zero-effect existence probe (signal 0). Any failure, including
    /// EPERM, counts as "not alive": assume gone rather than hang.
    fn probe(&self, pid: Pid) -> bool;
}

/// Production adapter backed by kill(2).
pub struct OsSignals;

impl SignalSender for OsSignals {
    fn send(&self, pid: Pid, signal: ControlSignal) -> Result<(), Errno> {
        kill(pid, signal.os_signal())
    }

    fn probe(&self, pid: Pid) -> bool {
        kill(pid, None).is_ok()
    }
}
