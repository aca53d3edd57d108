use anyhow::Result;
use clap::{Parser, ValueEnum};
use shoprec::{init_tracing, AppState, Config};
use tracing::info;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    /// Refresh the analytics mirror from the live source.
    Sync,
    /// Train models from the current mirror contents.
    Train,
    /// Sync, then train.
    Full,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config/default.toml")]
    config: String,

    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[arg(short, long, value_enum, default_value_t = Mode::Full)]
    mode: Mode,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    std::env::set_var("RUST_LOG", &args.log_level);
    init_tracing().await;

    info!("starting shoprec trainer");

    let config = if std::path::Path::new(&args.config).exists() {
        Config::from_file(&args.config)?
    } else {
        info!("config file not found, using default configuration");
        Config::default()
    };

    let state = AppState::new(config).await?;

    match args.mode {
        Mode::Sync => {
            let report = state.syncer.sync().await?;
            info!("sync finished: {:?}", report);
        }
        Mode::Train => {
            let report = state.training.train().await?;
            info!("training finished: {:?}", report);
        }
        Mode::Full => {
            let report = state.training.full_retrain().await?;
            info!("full retrain finished: {:?}", report);
        }
    }

    Ok(())
}
