use std::env;
use std::process::ExitCode;

use boardwatch::jobs::run_scheduled;
use boardwatch::{init_tracing, Config, CsvStore, DetailPageEnricher, EnrichmentCollaborator, HtmlBoardSource};
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let run_once = env::args().any(|a| a == "--once");

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return ExitCode::from(e.exit_code());
        }
    };

    let source = match HtmlBoardSource::from_config(&config) {
        Ok(source) => source,
        Err(e) => {
            error!("{}", e);
            return ExitCode::from(e.exit_code());
        }
    };
    let enricher = match DetailPageEnricher::when_enabled(&config) {
        Ok(enricher) => enricher,
        Err(e) => {
            error!("{}", e);
            return ExitCode::from(e.exit_code());
        }
    };
    let store = CsvStore::new(&config.store_path);

    info!(
        "Worker starting; watching {} every {} minutes",
        config.board_url,
        config.run_interval.as_secs() / 60
    );

    match run_scheduled(
        &source,
        enricher.as_ref().map(|e| e as &dyn EnrichmentCollaborator),
        &store,
        config.run_interval,
        run_once,
    )
    .await
    {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Run failed: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}
