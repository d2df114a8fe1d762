//! Executes the core crawl state machine against a browser driver.

use std::collections::VecDeque;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use recon_core::{update, CrawlState, CrawlView, Effect, FinishReason, Msg, VisitId, VisitOutcome};
use recon_logging::{recon_debug, recon_error, recon_info, recon_warn};
use tokio_util::sync::CancellationToken;

use crate::aggregate::{aggregate, AggregateReport, CrawlAccumulator, ReportContext};
use crate::auth::{AuthOutcome, Authenticator};
use crate::config::CrawlConfig;
use crate::driver::{with_timeout, BrowserDriver};
use crate::extract::{PageExtractor, PageFindings};
use crate::inspect::HtmlInspector;
use crate::keys::screenshot_key;
use crate::links::{relevant_urls, DiscoveredLink, LinkDiscoverer};
use crate::network::{NetworkObserver, ObservedTraffic};
use crate::persist::BlobStore;
use crate::taxonomy::KeywordTaxonomy;
use crate::{DriverError, RunError, Stage, VisitError};

/// Output of one successful page visit, consumed by the accumulator.
#[derive(Debug, Clone)]
pub struct VisitRecord {
    pub visit_id: VisitId,
    /// URL the visit was dispatched for.
    pub url: String,
    /// URL the driver ended up on; records are attributed to it.
    pub page_url: String,
    pub findings: PageFindings,
    pub links: Vec<DiscoveredLink>,
    pub traffic: ObservedTraffic,
    pub screenshot: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    pub start_url: String,
    pub authenticated: bool,
    pub credentials_present: bool,
    pub finish: FinishReason,
    pub view: CrawlView,
    pub records: CrawlAccumulator,
    pub screenshots: Vec<PathBuf>,
}

impl CrawlOutcome {
    pub fn report(
        &self,
        platform: &str,
        taxonomy: &KeywordTaxonomy,
        analysis_date: DateTime<Utc>,
    ) -> AggregateReport {
        let context = ReportContext {
            platform: platform.to_string(),
            url: self.start_url.clone(),
            authenticated: self.authenticated,
            credentials_present: self.credentials_present,
            analysis_date,
        };
        aggregate(&context, &self.records, taxonomy)
    }
}

/// Mutable per-run bookkeeping threaded through the visits.
struct RunProgress {
    authenticated: bool,
    records: CrawlAccumulator,
    screenshots: Vec<PathBuf>,
}

pub struct CrawlRunner<'a> {
    config: &'a CrawlConfig,
    extractor: PageExtractor,
    discoverer: LinkDiscoverer,
    authenticator: Authenticator,
    blobs: Option<&'a dyn BlobStore>,
}

impl<'a> CrawlRunner<'a> {
    pub fn new(config: &'a CrawlConfig, taxonomy: KeywordTaxonomy) -> Result<Self, RunError> {
        config.validate()?;
        Ok(Self {
            config,
            extractor: PageExtractor::new(taxonomy, config.extraction_toggles())?,
            discoverer: LinkDiscoverer::new(),
            authenticator: Authenticator::new(config.login_timeout(), config.driver_timeout()),
            blobs: None,
        })
    }

    /// Where screenshots go when they are enabled.
    pub fn with_blob_store(mut self, blobs: &'a dyn BlobStore) -> Self {
        self.blobs = Some(blobs);
        self
    }

    pub fn with_authenticator(mut self, authenticator: Authenticator) -> Self {
        self.authenticator = authenticator;
        self
    }

    pub fn taxonomy(&self) -> &KeywordTaxonomy {
        self.extractor.taxonomy()
    }

    /// Crawls until the frontier drains, the budget is spent or `cancel` fires.
    ///
    /// Only a fatal driver failure ends the run early with an error.
    pub async fn run<D>(
        &self,
        driver: &mut D,
        cancel: &CancellationToken,
    ) -> Result<CrawlOutcome, RunError>
    where
        D: BrowserDriver + ?Sized,
    {
        let mut progress = RunProgress {
            authenticated: false,
            records: CrawlAccumulator::default(),
            screenshots: Vec::new(),
        };

        let (mut state, effects) = update(
            CrawlState::new(self.config.crawl_limits()),
            Msg::Start {
                start_url: self.config.start_url.clone(),
            },
        );
        let mut pending: VecDeque<Effect> = effects.into();

        let finish = loop {
            let Some(effect) = pending.pop_front() else {
                break FinishReason::Drained;
            };
            match effect {
                Effect::Finished { reason } => break reason,
                Effect::VisitPage {
                    visit_id,
                    url,
                    authenticate,
                } => {
                    let messages = self
                        .run_visit(driver, cancel, visit_id, &url, authenticate, &mut progress)
                        .await?;
                    for msg in messages {
                        let (next, effects) = update(state, msg);
                        state = next;
                        pending.extend(effects);
                    }
                }
            }
        };

        let view = state.view();
        recon_info!(
            "Crawl finished ({:?}): {} visited, {} succeeded, {} failed; {} data-source and {} market records, {} API responses, {} matching requests",
            finish,
            view.visited,
            view.succeeded,
            view.failed,
            progress.records.data_sources.len(),
            progress.records.markets.len(),
            progress.records.api_endpoints.len(),
            progress.records.requests.len()
        );

        Ok(CrawlOutcome {
            start_url: self.config.start_url.clone(),
            authenticated: progress.authenticated,
            credentials_present: self.config.has_credentials(),
            finish,
            view,
            records: progress.records,
            screenshots: progress.screenshots,
        })
    }

    async fn run_visit<D>(
        &self,
        driver: &mut D,
        cancel: &CancellationToken,
        visit_id: VisitId,
        url: &str,
        authenticate: bool,
        progress: &mut RunProgress,
    ) -> Result<Vec<Msg>, RunError>
    where
        D: BrowserDriver + ?Sized,
    {
        let _scope = recon_logging::enter_visit(visit_id);
        if cancel.is_cancelled() {
            return Ok(cancelled(visit_id));
        }
        recon_info!("Visiting {}", url);

        let mut login = None;
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(VisitError::Cancelled),
            result = self.visit(driver, visit_id, url, authenticate, &mut login) => result,
        };
        driver.attach_network_tap(None);
        if login.as_ref().is_some_and(AuthOutcome::is_authenticated) {
            progress.authenticated = true;
        }

        match result {
            Ok(visit) => {
                let discovered = relevant_urls(&visit.links);
                recon_info!(
                    "Visited {}: {} records, {} links ({} relevant)",
                    visit.page_url,
                    visit.findings.record_count(),
                    visit.links.len(),
                    discovered.len()
                );
                if visit.traffic.dropped > 0 {
                    recon_debug!("Dropped {} network events", visit.traffic.dropped);
                }
                progress.screenshots.extend(visit.screenshot);
                progress.records.absorb(visit.findings, visit.traffic);
                Ok(vec![Msg::VisitFinished {
                    visit_id,
                    outcome: VisitOutcome::Success,
                    discovered,
                }])
            }
            Err(VisitError::Cancelled) => {
                recon_warn!("Visit of {} cancelled", url);
                Ok(cancelled(visit_id))
            }
            Err(VisitError::Driver { stage, source }) if source.is_fatal() => {
                recon_error!("Browser failed during {}: {}", stage, source);
                Err(RunError::DriverFatal { stage, source })
            }
            Err(err) => {
                recon_warn!("Visit of {} failed: {}", url, err);
                Ok(vec![Msg::VisitFinished {
                    visit_id,
                    outcome: VisitOutcome::Failed,
                    discovered: Vec::new(),
                }])
            }
        }
    }

    async fn visit<D>(
        &self,
        driver: &mut D,
        visit_id: VisitId,
        url: &str,
        authenticate: bool,
        login: &mut Option<AuthOutcome>,
    ) -> Result<VisitRecord, VisitError>
    where
        D: BrowserDriver + ?Sized,
    {
        // Login traffic belongs to the first visit.
        let observer = NetworkObserver::bounded(self.config.network_buffer);
        driver.attach_network_tap(Some(observer.tap()));

        if authenticate {
            let outcome = self
                .authenticator
                .authenticate(
                    driver,
                    &self.config.resolved_login_url(),
                    &self.config.username,
                    &self.config.password,
                )
                .await;
            *login = Some(outcome);
        }

        let loaded = self.load(driver, url).await;
        driver.attach_network_tap(None);
        let (page_url, html, screenshot) = loaded?;

        // Partial results of a failing pass never leave this function.
        let (findings, links) = self.inspect(&page_url, &html)?;
        let traffic = observer.drain(&page_url);

        Ok(VisitRecord {
            visit_id,
            url: url.to_string(),
            page_url,
            findings,
            links,
            traffic,
            screenshot,
        })
    }

    async fn load<D>(
        &self,
        driver: &mut D,
        url: &str,
    ) -> Result<(String, String, Option<PathBuf>), VisitError>
    where
        D: BrowserDriver + ?Sized,
    {
        let limit = self.config.driver_timeout();
        let failed = |stage: Stage| move |err: DriverError| VisitError::from_driver(stage, limit, err);

        with_timeout(limit, driver.navigate(url))
            .await
            .map_err(failed(Stage::Navigating))?;
        with_timeout(limit, driver.wait_for_network_idle())
            .await
            .map_err(failed(Stage::Settling))?;
        tokio::time::sleep(self.config.settle_delay()).await;

        let screenshot = if self.config.screenshot_enabled {
            self.capture(driver).await?
        } else {
            None
        };

        let page_url = with_timeout(limit, driver.current_url())
            .await
            .map_err(failed(Stage::Extracting))?;
        let html = with_timeout(limit, driver.content())
            .await
            .map_err(failed(Stage::Extracting))?;
        Ok((page_url, html, screenshot))
    }

    /// A missing capture never fails the visit unless the browser itself is gone.
    async fn capture<D>(&self, driver: &mut D) -> Result<Option<PathBuf>, VisitError>
    where
        D: BrowserDriver + ?Sized,
    {
        let Some(blobs) = self.blobs else {
            return Ok(None);
        };
        let limit = self.config.driver_timeout();
        match with_timeout(limit, driver.screenshot()).await {
            Ok(bytes) => {
                let key = screenshot_key(Utc::now());
                match blobs.put(&key, &bytes) {
                    Ok(path) => {
                        recon_debug!("Stored screenshot at {}", path.display());
                        Ok(Some(path))
                    }
                    Err(err) => {
                        recon_warn!("Could not store screenshot {}: {}", key, err);
                        Ok(None)
                    }
                }
            }
            Err(DriverError::Unsupported(what)) => {
                recon_debug!("Skipping screenshot, driver does not support {}", what);
                Ok(None)
            }
            Err(err) if err.is_fatal() => Err(VisitError::from_driver(Stage::Capturing, limit, err)),
            Err(err) => {
                recon_warn!("Screenshot failed: {}", err);
                Ok(None)
            }
        }
    }

    fn inspect(
        &self,
        page_url: &str,
        html: &str,
    ) -> Result<(PageFindings, Vec<DiscoveredLink>), VisitError> {
        let page = HtmlInspector::parse(page_url, html);
        let findings = self.extractor.extract(&page)?;
        let links = self.discoverer.discover(&page)?;
        Ok((findings, links))
    }
}

fn cancelled(visit_id: VisitId) -> Vec<Msg> {
    vec![
        Msg::StopRequested,
        Msg::VisitFinished {
            visit_id,
            outcome: VisitOutcome::Cancelled,
            discovered: Vec::new(),
        },
    ]
}
