use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "workerctl")]
#[command(about = "Lifecycle controller for a master/worker background service")]
#[command(
    long_about = "workerctl drives an already-running (or not-yet-running) service master\nthrough signals and a PID file. It never runs the service itself.\n\nQuick start:\n  workerctl start                Launch attached, for debugging\n  workerctl start -d             Launch detached, as a daemon\n  workerctl stop                 Ask the master to shut down gracefully\n  workerctl reload               Hot-reload workers without dropping the master\n  workerctl status               Live statistics display (Ctrl+C to stop)\n  workerctl connections          One-shot connection dump"
)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the service master (hands off to the bootstrap stage)
    Start {
        /// Detach and run as a daemon
        #[arg(long, short = 'd')]
        daemon: bool,
    },

    /// Ask the master to shut down gracefully and wait for it to exit
    Stop,

    /// Stop the master, then hand back to the bootstrap stage
    Restart {
        /// Detach and run as a daemon
        #[arg(long, short = 'd')]
        daemon: bool,
    },

    /// Hot-reload workers without dropping the master
    Reload,

    /// Continuously display service statistics (Ctrl+C to stop)
    Status,

    /// Dump the current connection table once
    Connections,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for (bash, zsh, fish, powershell)
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

impl Commands {
    /// Command token as it appears on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Start { .. } => "start",
            Commands::Stop => "stop",
            Commands::Restart { .. } => "restart",
            Commands::Reload => "reload",
            Commands::Status => "status",
            Commands::Connections => "connections",
            Commands::Completions { .. } => "completions",
        }
    }
}
