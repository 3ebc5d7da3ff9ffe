use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use procpool::codec;
use procpool::utils::config_paths::ConfigPaths;
use procpool::utils::logger::init_logger;
use procpool::{ProcessSupervisor, SupervisorConfig};
use serde_json::Value;
use std::path::PathBuf;
use std::process::ExitCode;

/// Run worker programs with a bounded number in flight.
#[derive(Parser, Debug)]
#[command(name = "procpool", version, about)]
struct Cli {
    /// Log level filter (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Also write logs to this file
    #[arg(long, global = true, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Also write logs to /tmp/.procpool/procpool.log
    #[arg(long, global = true, conflicts_with = "log_file")]
    log: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Launch every target, wait for all of them and print their records as JSON
    Run {
        /// Worker targets, relative to the project root
        #[arg(required = true)]
        targets: Vec<String>,
        /// Maximum concurrent workers (0 = unbounded)
        #[arg(short, long)]
        capacity: Option<usize>,
        /// Project root targets are resolved against
        #[arg(short, long)]
        root: Option<PathBuf>,
        /// Program that runs each target, e.g. php
        #[arg(long)]
        interpreter: Option<PathBuf>,
        /// Extension appended to each target name
        #[arg(long)]
        extension: Option<String>,
        /// JSON payload handed to every worker
        #[arg(short, long)]
        payload: Option<String>,
    },
    /// Encode a JSON payload into a worker argument
    Encode {
        json: String,
    },
    /// Decode a worker argument back into JSON
    Decode {
        argument: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_file = match (&cli.log_file, cli.log) {
        (Some(path), _) => Some(path.clone()),
        (None, true) => Some(ConfigPaths::runtime_log_file()),
        (None, false) => None,
    };
    if let Err(err) = init_logger(cli.log_level.as_deref(), log_file.as_deref()) {
        eprintln!("Failed to initialize logging: {err}");
    }

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::from(1)
        }
    }
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Run {
            targets,
            capacity,
            root,
            interpreter,
            extension,
            payload,
        } => {
            let mut config = SupervisorConfig::load().context("Failed to load configuration")?;
            if let Some(capacity) = capacity {
                config.capacity = capacity;
            }
            if root.is_some() {
                config.root = root;
            }
            if interpreter.is_some() {
                config.interpreter = interpreter;
            }
            if extension.is_some() {
                config.extension = extension;
            }
            // a pid-less worker must not hold a slot, or later targets never start
            config.finish_failed_spawns = true;

            let payload: Value = match payload {
                Some(json) => serde_json::from_str(&json).context("Payload is not valid JSON")?,
                None => codec::empty_payload(),
            };

            let mut supervisor = ProcessSupervisor::new(config)?;
            let mut failed = 0;
            for target in &targets {
                match supervisor.launch(target, payload.clone())? {
                    Some(pid) => tracing::info!("Launched {} (pid {})", target, pid),
                    None => failed += 1,
                }
            }
            supervisor.wait_all();

            println!("{}", serde_json::to_string_pretty(&supervisor.info(None))?);
            if failed > 0 {
                anyhow::bail!("{} of {} workers failed to start", failed, targets.len());
            }
        }
        Commands::Encode { json } => {
            let value: Value = serde_json::from_str(&json).context("Payload is not valid JSON")?;
            println!("{}", codec::encode(&value)?);
        }
        Commands::Decode { argument } => {
            let value: Value = codec::decode(&argument)?;
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
    }
    Ok(())
}
