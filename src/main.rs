// src/main.rs

use graphrun::{cli, logging, run_from_args};

#[tokio::main]
async fn main() {
    if let Err(err) = run_main().await {
        eprintln!("graphrun error: {err:?}");
        std::process::exit(1);
    }
}

async fn run_main() -> anyhow::Result<()> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;
    run_from_args(args).await
}
