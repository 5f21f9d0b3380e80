use std::sync::Arc;

use clap::Parser;
use tokio::sync::watch;

use scriptload::{
    config::{Config, Opt},
    core::{Loader, TokioScheduler},
    fetch::{FsFetcher, SpawnFetcher},
    logging::Logger,
};

// current-thread keeps deferred callbacks behind the code that queued them
#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Read command-line arguments
    let opt = Opt::parse();

    // Load configuration with optional override
    let config = match Config::load_with_opt_override(&opt) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            std::process::exit(1);
        }
    };

    // Initialize logging
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let log_task = if let Some(log_cfg) = &config.log {
        let logger = Logger::new(log_cfg.clone());
        logger.init_env_logger();
        Some(tokio::spawn(logger.run(shutdown_rx)))
    } else {
        env_logger::init();
        None
    };

    let (fetcher, scheduler) = match (
        SpawnFetcher::current(FsFetcher::new(&opt.root)),
        TokioScheduler::current(),
    ) {
        (Ok(fetcher), Ok(scheduler)) => (fetcher, scheduler),
        (Err(e), _) | (_, Err(e)) => {
            log::error!("Failed to start loader: {e}");
            std::process::exit(1);
        }
    };
    let loader = Loader::from_config(&config, Arc::new(fetcher), Arc::new(scheduler));

    log::info!("Loading scripts from {}...", opt.root.display());
    let preload = loader.preload(&config);
    for label in preload.labels() {
        let name = label.clone();
        loader.when(label.as_str(), move || log::info!("Label complete: {name}"));
    }

    match preload.wait().await {
        Ok(()) => {
            let stats = loader.stats();
            log::info!(
                "All preload labels complete: {} labels, {} scripts",
                stats.label_count,
                stats.written_count
            );
        }
        Err(e) => log::error!("Preload did not complete: {e}"),
    }

    let _ = shutdown_tx.send(true);
    if let Some(task) = log_task {
        match task.await {
            Ok(Err(e)) => eprintln!("Failed to write log file: {e}"),
            Err(e) => eprintln!("Log task failed: {e}"),
            Ok(Ok(())) => {}
        }
    }
}
