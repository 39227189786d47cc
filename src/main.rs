mod cli;
mod config;
mod lifecycle;
mod master;
mod report;
mod signals;
mod timing;
mod util;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use config::Config;
use lifecycle::{Controller, Outcome, RunMode};
use owo_colors::OwoColorize;
use signals::OsSignals;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use timing::SystemClock;
use tracing::Level;
use util::use_color;

const EXIT_OK: i32 = 0;
const EXIT_FAILURE: i32 = 1;
const EXIT_NOT_RUNNING: i32 = 5;

fn run() -> Result<i32> {
    let cli = Cli::parse();

    init_tracing();

    if let Commands::Completions { shell } = &cli.command {
        use clap::CommandFactory;
        let mut cmd = Cli::command();
        clap_complete::generate(*shell, &mut cmd, "workerctl", &mut std::io::stdout());
        return Ok(EXIT_OK);
    }

    let config = Config::load()?;

    announce(&cli.command, &config);

    let signals = OsSignals;
    let clock = SystemClock;
    let controller = Controller::new(&config, &signals, &clock);

    let code = match cli.command {
        Commands::Start { daemon } => finish(controller.start(daemon), &config),
        Commands::Stop => finish(controller.stop(), &config),
        Commands::Restart { daemon } => finish(controller.restart(daemon), &config),
        Commands::Reload => finish(controller.reload(), &config),

        Commands::Status => match controller.live_master() {
            Some(pid) => {
                let cancel = Arc::new(AtomicBool::new(false));
                let flag = Arc::clone(&cancel);
                ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
                    .context("Failed to set interrupt handler")?;
                report::status_loop(&config, &signals, pid, &cancel, &clock);
                EXIT_OK
            }
            None => finish(Outcome::NotRunning, &config),
        },

        Commands::Connections => match controller.live_master() {
            Some(pid) => {
                report::connections_dump(&config, &signals, pid, &clock);
                EXIT_OK
            }
            None => finish(Outcome::NotRunning, &config),
        },

        Commands::Completions { .. } => unreachable!("handled before config load"),
    };

    Ok(code)
}

/// One log line announcing what was invoked, before any signal is sent or
/// file is touched.
fn announce(command: &Commands, config: &Config) {
    let program = std::env::args()
        .next()
        .unwrap_or_else(|| "workerctl".to_string());
    match command {
        Commands::Start { daemon } => {
            let mode = RunMode::from_flags(*daemon, config.daemonize);
            tracing::info!("workerctl[{program}] start in {mode} mode");
        }
        other => tracing::info!("workerctl[{program}] {}", other.name()),
    }
}

/// Map a terminal outcome to its user-facing line and exit code.
fn finish(outcome: Outcome, config: &Config) -> i32 {
    match outcome {
        Outcome::AlreadyRunning(pid) => {
            println!("master already running (PID: {pid})");
            EXIT_OK
        }
        Outcome::NotRunning => {
            println!("master is not running");
            EXIT_NOT_RUNNING
        }
        Outcome::Stopped(pid) => {
            if use_color() {
                println!("{}", format!("master stopped (PID: {pid})").green());
            } else {
                println!("master stopped (PID: {pid})");
            }
            EXIT_OK
        }
        Outcome::StopTimedOut(pid) => {
            let line = format!(
                "master (PID: {pid}) failed to stop within {}s",
                config.stop_timeout_secs
            );
            if use_color() {
                eprintln!("{}", line.red());
            } else {
                eprintln!("{line}");
            }
            EXIT_FAILURE
        }
        Outcome::Launch(mode) => {
            println!("starting in {mode} mode");
            EXIT_OK
        }
        Outcome::ReloadRequested(pid) => {
            println!("reload signal sent to master (PID: {pid})");
            EXIT_OK
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .try_init()
        .ok();
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            let err_str = format!("{e:#}");
            if use_color() {
                eprintln!("{} {}", "error:".red().bold(), err_str);
            } else {
                eprintln!("error: {err_str}");
            }
            std::process::exit(EXIT_FAILURE);
        }
    }
}
