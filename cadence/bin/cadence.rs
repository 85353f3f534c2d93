use cadence::{Cli, Controller, Settings};
use cadence_common::logging;
use clap::Parser;

#[cfg(not(any(target_os = "macos", unix)))]
compile_error!("Only macos and unix are currently supported");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is normal; the environment may already be populated
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    logging::init();

    let settings = Settings::load(&cli)?.resolve()?;

    Controller::new(settings).run().await?;

    Ok(())
}
