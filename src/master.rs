//! Master process identity and liveness.

use nix::unistd::Pid;
use std::fs;
use std::path::Path;

use crate::signals::SignalSender;

/// Read the master PID from the PID file.
///
/// A missing, empty, or unparsable file means no master is known, never an
/// error. The file is owned by the service; workerctl never writes it.
pub fn read_master_pid(pid_file: &Path) -> Option<Pid> {
    let content = fs::read_to_string(pid_file).ok()?;
    let raw = content.trim().parse::<i32>().ok()?;
    if raw <= 0 {
        return None;
    }
    Some(Pid::from_raw(raw))
}

/// Liveness probe with the self-signal guard: workerctl must never consider
/// itself the master, even if a stale PID file says so.
pub fn master_is_alive(signals: &dyn SignalSender, pid: Pid) -> bool {
    if pid.as_raw() == std::process::id() as i32 {
        return false;
    }
    signals.probe(pid)
}
