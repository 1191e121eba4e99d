use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use telescope_pipeline::{Config, Pipeline};

#[derive(Parser)]
#[command(name = "telescope-pipeline")]
#[command(about = "Poll telescope channels and record raw, crash and collision data")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a config file
    Validate { config: String },
    /// Run the pipeline until interrupted
    Run {
        #[arg(long)]
        config: Option<String>,
        /// Override `source.base_url`
        #[arg(long)]
        base_url: Option<String>,
        /// Override `results.root`
        #[arg(long)]
        results: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { config } => validate(&config),
        Commands::Run {
            config,
            base_url,
            results,
        } => run(config.as_deref(), base_url, results).await,
    }
}

fn load(path: Option<&str>) -> Option<Config> {
    let config = match path {
        Some(path) => Config::from_file(path),
        None => Ok(Config::default()),
    };
    match config {
        Ok(c) => Some(c),
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            None
        }
    }
}

fn validate(path: &str) -> ExitCode {
    let Some(config) = load(Some(path)) else {
        return ExitCode::FAILURE;
    };

    if let Err(e) = config.validate() {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }

    println!("Config is valid");
    println!(
        "  source: {} ({} channels, every {} after {})",
        config.source.base_url,
        config.source.channels,
        humantime::format_duration(config.source.period),
        humantime::format_duration(config.source.initial_delay)
    );
    println!("  results: {}", config.results.root.display());
    ExitCode::SUCCESS
}

async fn run(path: Option<&str>, base_url: Option<String>, results: Option<PathBuf>) -> ExitCode {
    let Some(mut config) = load(path) else {
        return ExitCode::FAILURE;
    };
    if let Some(base_url) = base_url {
        config.source.base_url = base_url;
    }
    if let Some(results) = results {
        config.results.root = results;
    }

    if let Err(e) = config.validate() {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }
    if let Err(e) = config.resolve_host().await {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }

    let start_time = chrono::Utc::now();
    log::info!("Starting pipeline at {}", start_time);

    let pipeline = match Pipeline::start(&config) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to start pipeline: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for Ctrl-C: {}", e);
    }
    log::info!("Shutting down");

    let stats = pipeline.stop().await;
    log::info!(
        "Ran for {}s: {} raw lines, {} crash lines, {} collision lines",
        (chrono::Utc::now() - start_time).num_seconds(),
        stats.raw_lines,
        stats.crash_lines,
        stats.collision_lines
    );
    match serde_json::to_string(&stats) {
        Ok(summary) => log::info!("Final stats: {}", summary),
        Err(e) => log::warn!("Failed to serialize stats: {}", e),
    }
    ExitCode::SUCCESS
}
