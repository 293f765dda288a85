// src/main.rs

use nightshift::{cli, config, logging, run};

#[tokio::main]
async fn main() {
    match run_main().await {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("nightshift error: {err:?}");
            std::process::exit(2);
        }
    }
}

async fn run_main() -> anyhow::Result<i32> {
    let args = cli::parse();

    let cfg = match &args.config {
        Some(path) => config::load_and_validate(path)?,
        None => config::load_or_default(config::default_config_path())?,
    };

    logging::init_logging(args.log_level, Some(cfg.paths.log_dir.as_path()))?;
    run(args, cfg).await
}
