//! The lifecycle state machine: start, stop, restart, and reload against
//! the service master.
//!
//! Every command resolves the master's identity and liveness first, so
//! illegal states short-circuit before any signal is sent. Terminal states
//! are data (`Outcome`), not errors; main maps them to exit codes.

use nix::unistd::Pid;
use std::fmt;
use tracing::debug;

use crate::config::Config;
use crate::master::{master_is_alive, read_master_pid};
use crate::signals::{ControlSignal, SignalSender};
use crate::timing::Clock;

/// How the bootstrap stage should run the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Daemon,
    Debug,
}

impl RunMode {
    /// `-d` on the command line or the always-daemonize config flag selects
    /// daemon mode; everything else runs attached for debugging.
    pub fn from_flags(detach: bool, always_daemonize: bool) -> Self {
        if detach || always_daemonize {
            RunMode::Daemon
        } else {
            RunMode::Debug
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Daemon => write!(f, "DAEMON"),
            RunMode::Debug => write!(f, "DEBUG"),
        }
    }
}

/// Terminal state of a lifecycle command. Determines the exit code and the
/// final user-facing line; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// `start` against a live master: benign no-op
    AlreadyRunning(Pid),
    /// A signal-requiring command against a dead or unknown master
    NotRunning,
    /// Master gone after the shutdown wait
    Stopped(Pid),
    /// Master survived the whole stop budget
    StopTimedOut(Pid),
    /// Hand off to the bootstrap stage in the given mode
    Launch(RunMode),
    /// Reload signal delivered; completion is not confirmed
    ReloadRequested(Pid),
}

pub struct Controller<'a> {
    config: &'a Config,
    signals: &'a dyn SignalSender,
    clock: &'a dyn Clock,
}

impl<'a> Controller<'a> {
    pub fn new(config: &'a Config, signals: &'a dyn SignalSender, clock: &'a dyn Clock) -> Self {
        Self {
            config,
            signals,
            clock,
        }
    }

    /// Master PID from the PID file, only if that process is actually alive.
    ///
    /// Re-read on every call: liveness must not be cached across branches
    /// that span a time gap.
    pub fn live_master(&self) -> Option<Pid> {
        read_master_pid(&self.config.pid_file).filter(|pid| master_is_alive(self.signals, *pid))
    }

    fn run_mode(&self, detach: bool) -> RunMode {
        RunMode::from_flags(detach, self.config.daemonize)
    }

    /// `start` never polls: spawning belongs to the bootstrap stage, and the
    /// controller's responsibility ends at flagging the mode.
    pub fn start(&self, detach: bool) -> Outcome {
        if let Some(pid) = self.live_master() {
            return Outcome::AlreadyRunning(pid);
        }
        Outcome::Launch(self.run_mode(detach))
    }

    pub fn stop(&self) -> Outcome {
        match self.live_master() {
            Some(pid) => self.shutdown_and_wait(pid),
            None => Outcome::NotRunning,
        }
    }

    /// Same wait loop as `stop`, but a dead master is not an error; the
    /// command falls through to the bootstrap hand-off either way.
    pub fn restart(&self, detach: bool) -> Outcome {
        if let Some(pid) = self.live_master() {
            match self.shutdown_and_wait(pid) {
                Outcome::Stopped(_) => {}
                other => return other,
            }
        }
        Outcome::Launch(self.run_mode(detach))
    }

    pub fn reload(&self) -> Outcome {
        match self.live_master() {
            Some(pid) => {
                if let Err(e) = self.signals.send(pid, ControlSignal::Reload) {
                    debug!("reload signal not delivered to PID {pid}: {e}");
                }
                Outcome::ReloadRequested(pid)
            }
            None => Outcome::NotRunning,
        }
    }

    /// Graceful-shutdown protocol: one shutdown signal, then re-probe
    /// liveness every poll tick until the master is gone or the budget runs
    /// out. Never escalates to SIGKILL; only the master's graceful path is
    /// trusted.
    fn shutdown_and_wait(&self, pid: Pid) -> Outcome {
        println!("stopping master (PID: {pid}) ...");
        if let Err(e) = self.signals.send(pid, ControlSignal::Shutdown) {
            // Lost a race with an exiting master; the poll below settles it
            debug!("shutdown signal not delivered to PID {pid}: {e}");
        }

        let deadline = self.clock.now() + self.config.stop_timeout();
        loop {
            if !master_is_alive(self.signals, pid) {
                return Outcome::Stopped(pid);
            }
            if self.clock.now() >= deadline {
                return Outcome::StopTimedOut(pid);
            }
            self.clock.sleep(self.config.stop_poll_interval());
        }
    }
}
