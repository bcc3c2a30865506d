use std::env;
use std::process::ExitCode;

use boardwatch::jobs::{run_board_snapshot, run_enrichment_only, RunReport};
use boardwatch::{init_tracing, AppError, Config, CsvStore, DetailPageEnricher, EnrichmentCollaborator, HtmlBoardSource, RunStamp};
use tracing::{error, info};

async fn run(config: &Config, enrich_only: bool) -> Result<RunReport, AppError> {
    let store = CsvStore::new(&config.store_path);

    if enrich_only {
        let enricher = DetailPageEnricher::from_config(config)?;
        return run_enrichment_only(&enricher, &store).await;
    }

    let source = HtmlBoardSource::from_config(config)?;
    let enricher = DetailPageEnricher::when_enabled(config)?;
    run_board_snapshot(
        &source,
        enricher.as_ref().map(|e| e as &dyn EnrichmentCollaborator),
        &store,
        RunStamp::now(),
    )
    .await
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let args: Vec<String> = env::args().collect();
    let enrich_only = args.iter().any(|a| a == "--enrich-only");
    let no_enrich = args.iter().any(|a| a == "--no-enrich");

    let mut config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return ExitCode::from(e.exit_code());
        }
    };

    if no_enrich {
        config.enrich = false;
    }

    match run(&config, enrich_only).await {
        Ok(report) => {
            info!("Run finished: {}", report);
            println!("{}", report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Run failed: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}
