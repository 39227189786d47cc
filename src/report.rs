//! Read-side reporting: the live status display and the one-shot connection
//! dump.
//!
//! The statistics file is regenerated by the master and its workers on
//! request; workerctl deletes stale copies, asks for a fresh one, waits, and
//! renders whatever bytes showed up. All statistics-file IO is best-effort:
//! display degrades to empty output rather than failing the command.

use nix::unistd::Pid;
use owo_colors::OwoColorize;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::debug;

use crate::config::Config;
use crate::signals::{ControlSignal, SignalSender};
use crate::timing::Clock;
use crate::util::use_color;

/// Unbounded status display. Each iteration asks the master to regenerate
/// the statistics file, waits for the workers to write it, then repaints the
/// terminal. Runs until `cancel` flips; there is no internal exit
/// condition, even if the master goes away mid-loop.
pub fn status_loop(
    config: &Config,
    signals: &dyn SignalSender,
    pid: Pid,
    cancel: &AtomicBool,
    clock: &dyn Clock,
) {
    while !cancel.load(Ordering::SeqCst) {
        let dump = request_dump(
            &config.statistics_file,
            signals,
            pid,
            ControlSignal::DumpStatus,
            config.status_interval(),
            clock,
        );
        if cancel.load(Ordering::SeqCst) {
            break;
        }

        // Clear terminal before repainting
        print!("\x1B[2J\x1B[H");
        print_master_header(pid, signals);
        print!("{dump}");
        let _ = io::stdout().flush();
    }
}

/// One-shot connection dump: request, wait, print verbatim. A missing file
/// after the wait is tolerated.
pub fn connections_dump(config: &Config, signals: &dyn SignalSender, pid: Pid, clock: &dyn Clock) {
    let dump = request_dump(
        &config.statistics_file,
        signals,
        pid,
        ControlSignal::DumpConnections,
        config.connections_wait(),
        clock,
    );
    print!("{dump}");
    let _ = io::stdout().flush();
}

/// Delete the stale dump, ask the master to regenerate it, wait, re-read.
///
/// A race where the service rewrites the file between the delete and the
/// re-read is tolerated; the next request sees the fresh copy.
fn request_dump(
    statistics_file: &Path,
    signals: &dyn SignalSender,
    pid: Pid,
    signal: ControlSignal,
    wait: Duration,
    clock: &dyn Clock,
) -> String {
    remove_stale_dump(statistics_file);
    if let Err(e) = signals.send(pid, signal) {
        debug!("{signal} request not delivered to PID {pid}: {e}");
    }
    clock.sleep(wait);
    fs::read_to_string(statistics_file).unwrap_or_default()
}

fn remove_stale_dump(statistics_file: &Path) {
    if statistics_file.exists() {
        if let Err(e) = fs::remove_file(statistics_file) {
            debug!(
                "could not remove stale dump {}: {e}",
                statistics_file.display()
            );
        }
    }
}

fn print_master_header(pid: Pid, signals: &dyn SignalSender) {
    let alive = crate::master::master_is_alive(signals, pid);
    let state = if alive { "running" } else { "gone" };
    let uptime = master_uptime(pid);

    if use_color() {
        if alive {
            println!("{} service master ({})", "●".green(), state.green());
        } else {
            println!("{} service master ({})", "●".dimmed(), state.dimmed());
        }
    } else {
        println!("● service master ({state})");
    }
    match uptime {
        Some((_, ref display)) => println!("  PID: {pid} | Uptime: {display}\n"),
        None => println!("  PID: {pid}\n"),
    }
}

/// Master uptime as (raw seconds, human-readable string)
fn master_uptime(pid: Pid) -> Option<(u64, String)> {
    use sysinfo::{ProcessRefreshKind, ProcessesToUpdate, RefreshKind, System};

    let raw = u32::try_from(pid.as_raw()).ok()?;
    let mut sys =
        System::new_with_specifics(RefreshKind::new().with_processes(ProcessRefreshKind::new()));
    sys.refresh_processes(ProcessesToUpdate::Some(&[sysinfo::Pid::from_u32(raw)]));

    let process = sys.process(sysinfo::Pid::from_u32(raw))?;
    let start_time = process.start_time();
    if start_time == 0 {
        return None;
    }
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .ok()?
        .as_secs();
    let uptime_secs = now.saturating_sub(start_time);

    let hours = uptime_secs / 3600;
    let minutes = (uptime_secs % 3600) / 60;
    let seconds = uptime_secs % 60;

    let display = if hours > 0 {
        format!("{hours}h {minutes}m")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    };
    Some((uptime_secs, display))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::testing::ScriptedSignals;
    use crate::timing::FakeClock;
    use std::sync::atomic::AtomicUsize;
    use std::time::Instant;
    use tempfile::TempDir;

    fn test_config(dir: &TempDir) -> Config {
        Config {
            pid_file: dir.path().join("master.pid"),
            statistics_file: dir.path().join("master.status"),
            ..Config::default()
        }
    }

    #[test]
    fn test_request_dump_deletes_stale_file_and_signals_once() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);
        fs::write(&config.statistics_file, "stale contents").unwrap();

        let signals = ScriptedSignals::immortal();
        let clock = FakeClock::new();
        let dump = request_dump(
            &config.statistics_file,
            &signals,
            Pid::from_raw(4242),
            ControlSignal::DumpConnections,
            Duration::from_millis(500),
            &clock,
        );

        // Stale file was deleted and nothing regenerated it
        assert_eq!(dump, "");
        assert!(!config.statistics_file.exists());
        assert_eq!(signals.sent_kinds(), vec![ControlSignal::DumpConnections]);
        assert_eq!(clock.total_slept(), Duration::from_millis(500));
    }

    /// Clock standing in for the workers: the dump file appears during the
    /// wait, after the stale copy was deleted.
    struct RegeneratingClock {
        path: std::path::PathBuf,
        contents: &'static str,
    }

    impl Clock for RegeneratingClock {
        fn now(&self) -> Instant {
            Instant::now()
        }

        fn sleep(&self, _duration: Duration) {
            fs::write(&self.path, self.contents).unwrap();
        }
    }

    #[test]
    fn test_request_dump_returns_regenerated_contents() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);
        fs::write(&config.statistics_file, "stale contents").unwrap();

        let signals = ScriptedSignals::immortal();
        let clock = RegeneratingClock {
            path: config.statistics_file.clone(),
            contents: "conn 1\nconn 2\n",
        };
        let dump = request_dump(
            &config.statistics_file,
            &signals,
            Pid::from_raw(4242),
            ControlSignal::DumpStatus,
            Duration::from_secs(1),
            &clock,
        );

        assert_eq!(dump, "conn 1\nconn 2\n");
        assert_eq!(signals.sent_kinds(), vec![ControlSignal::DumpStatus]);
    }

    #[test]
    fn test_request_dump_tolerates_missing_file() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);

        let signals = ScriptedSignals::immortal();
        let clock = FakeClock::new();
        let dump = request_dump(
            &config.statistics_file,
            &signals,
            Pid::from_raw(4242),
            ControlSignal::DumpConnections,
            Duration::from_millis(500),
            &clock,
        );

        assert_eq!(dump, "");
    }

    #[test]
    fn test_status_loop_honors_preset_cancel() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);
        let signals = ScriptedSignals::immortal();
        let clock = FakeClock::new();
        let cancel = AtomicBool::new(true);

        status_loop(&config, &signals, Pid::from_raw(4242), &cancel, &clock);

        assert!(signals.sent_kinds().is_empty());
    }

    /// Clock that flips the cancel flag after a fixed number of sleeps, so
    /// the loop can be driven a bounded number of iterations.
    struct CancellingClock<'a> {
        cancel: &'a AtomicBool,
        remaining: AtomicUsize,
    }

    impl Clock for CancellingClock<'_> {
        fn now(&self) -> Instant {
            Instant::now()
        }

        fn sleep(&self, _duration: Duration) {
            if self.remaining.fetch_sub(1, Ordering::SeqCst) <= 1 {
                self.cancel.store(true, Ordering::SeqCst);
            }
        }
    }

    #[test]
    fn test_status_loop_requests_dump_each_iteration() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);
        let signals = ScriptedSignals::immortal();
        let cancel = AtomicBool::new(false);
        let clock = CancellingClock {
            cancel: &cancel,
            remaining: AtomicUsize::new(3),
        };

        status_loop(&config, &signals, Pid::from_raw(4242), &cancel, &clock);

        assert_eq!(
            signals.sent_kinds(),
            vec![
                ControlSignal::DumpStatus,
                ControlSignal::DumpStatus,
                ControlSignal::DumpStatus
            ]
        );
    }
}
