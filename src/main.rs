// src/main.rs

use watchpty::config::Settings;
use watchpty::{cli, logging, run};

#[tokio::main]
async fn main() {
    if let Err(err) = run_main().await {
        eprintln!("watchpty error: {err:#}");
        std::process::exit(1);
    }
}

async fn run_main() -> anyhow::Result<()> {
    let args = cli::parse();
    let settings = Settings::from_args(&args)?;
    logging::init_logging(settings.log_level)?;
    run(settings).await?;
    Ok(())
}
