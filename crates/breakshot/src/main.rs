//! breakshot - live HLS recorder with a scoreboard timeline
//!
//! Subcommands:
//! - `breakshot serve` - Run the HTTP server (default)
//! - `breakshot devices` - Probe V4L2 capture devices
//! - `breakshot config` - Print the effective configuration

use anyhow::{Context, Result};
use breakconf::BreakConfig;
use breakshot::devices::{self, DeviceStatus};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "breakshot")]
#[command(about = "Live HLS capture with a scrub-aligned scoreboard")]
#[command(version)]
struct Cli {
    /// Config file, replacing ./breakshot.toml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server
    Serve {
        /// HTTP port to bind
        #[arg(short, long)]
        port: Option<u16>,

        /// Directory for the playlist and segments
        #[arg(short, long)]
        workspace: Option<PathBuf>,
    },

    /// Probe /dev/videoN and recommend a capture device
    Devices {
        /// Number of device nodes to check
        #[arg(short = 'n', long, default_value = "5")]
        count: u32,
    },

    /// Print the effective configuration as TOML
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (mut config, sources) = BreakConfig::load_with_sources_from(cli.config.as_deref())
        .context("Failed to load configuration")?;

    match cli.command.unwrap_or(Commands::Serve {
        port: None,
        workspace: None,
    }) {
        Commands::Serve { port, workspace } => {
            if let Some(port) = port {
                config.bind.http_port = port;
            }
            if let Some(workspace) = workspace {
                config.paths.workspace_dir = workspace;
            }
            config.validate().context("Invalid configuration")?;

            let telemetry = breakshot::telemetry::init(&config.telemetry)
                .context("Failed to initialize telemetry")?;
            for file in &sources.files {
                tracing::info!("Loaded config: {}", file.display());
            }

            let result = breakshot::serve::run(&config).await;
            telemetry.shutdown();
            result
        }
        Commands::Devices { count } => {
            let probes = devices::probe_paths(&devices::default_candidates(count));
            for probe in &probes {
                match &probe.status {
                    DeviceStatus::Missing => println!("   {}  not present", probe.path.display()),
                    DeviceStatus::Readable => println!("✅ {}  readable", probe.path.display()),
                    DeviceStatus::Unreadable(reason) => {
                        println!("⚠️  {}  {}", probe.path.display(), reason)
                    }
                }
            }
            match devices::recommend(&probes) {
                Some(probe) => {
                    println!();
                    println!("Recommended: {}", probe.path.display());
                    println!("Set capture.device or BREAKSHOT_CAPTURE_DEVICE to use it.");
                }
                None => {
                    println!();
                    println!("No usable capture device found.");
                }
            }
            Ok(())
        }
        Commands::Config => {
            for file in &sources.files {
                println!("# from {}", file.display());
            }
            for var in &sources.env_overrides {
                println!("# env {}", var);
            }
            print!("{}", config.to_toml());
            Ok(())
        }
    }
}
