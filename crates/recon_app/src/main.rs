mod cli;
mod config;
mod logging;

use std::path::Path;
use std::process::ExitCode;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use recon_engine::{
    ensure_output_dir, publish_report, AggregateReport, CancellationToken, CrawlConfig,
    CrawlRunner, FsBlobStore, HttpDriver, HttpDriverSettings, JsonlRecordSink, KeywordTaxonomy,
};
use recon_logging::{recon_error, recon_info, recon_warn};

use crate::cli::Cli;
use crate::logging::LogDestination;

const REPORT_LOG: &str = "reports.jsonl";

fn main() -> ExitCode {
    let cli = Cli::parse();

    let destination = if cli.no_log_file {
        LogDestination::Terminal
    } else {
        LogDestination::Both
    };
    logging::initialize(destination, logging::level_for(cli.verbose));

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            recon_error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = config::resolve(cli)?;
    recon_info!("Crawl configuration: {:?}", config);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;
    runtime.block_on(crawl(&config, &cli.output_dir))
}

async fn crawl(config: &CrawlConfig, output_dir: &Path) -> anyhow::Result<()> {
    ensure_output_dir(output_dir)?;
    let blobs = FsBlobStore::new(output_dir);
    let mut driver =
        HttpDriver::new(HttpDriverSettings::default()).context("failed to start the driver")?;

    let cancel = CancellationToken::new();
    let stop = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            recon_warn!("Stop requested, abandoning the current page");
            stop.cancel();
        }
    });

    let runner = CrawlRunner::new(config, KeywordTaxonomy::builtin())?.with_blob_store(&blobs);
    let outcome = runner
        .run(&mut driver, &cancel)
        .await
        .context("crawl aborted")?;

    let report = outcome.report(&config.platform, runner.taxonomy(), Utc::now());
    recon_info!("{}", summary_line(&report));

    let mut sink = JsonlRecordSink::new(output_dir.join(REPORT_LOG));
    let path = publish_report(&report, &mut sink, &blobs).context("failed to write the report")?;
    recon_info!("Report written to {:?}", path);
    for recommendation in &report.recommendations {
        recon_info!("Recommendation: {}", recommendation);
    }
    Ok(())
}

fn summary_line(report: &AggregateReport) -> String {
    format!(
        "Report: {} data provider(s), {} market(s), {} API endpoint(s), shrimp content: {}",
        report.data_sources.identified.len(),
        report.markets.identified.len(),
        report.data_sources.api_endpoints.len(),
        report.shrimp_specific.has_shrimp_content
    )
}
