//! Recon engine: page inspection, classification, network capture, the
//! browser driver contract and the crawl runner that executes core effects.
mod aggregate;
mod auth;
mod config;
mod crawl;
mod decode;
mod driver;
mod extract;
mod http_driver;
mod inspect;
mod keys;
mod links;
mod network;
mod persist;
mod taxonomy;
mod types;

pub use aggregate::{
    aggregate, dedupe_endpoints, dedupe_records, AggregateReport, CrawlAccumulator,
    DataSourcesSection, MarketsSection, MethodologySection, ReportContext, ShrimpSection,
    SummarySection, DATA_SOURCE_DETAIL_LIMIT, MARKET_DETAIL_LIMIT, PROVIDER_SUMMARY_LIMIT,
};
pub use auth::{
    login_succeeded, AuthFailure, AuthOutcome, Authenticator, PASSWORD_SELECTORS,
    SUBMIT_SELECTORS, USERNAME_SELECTORS,
};
pub use config::{ConfigError, CrawlConfig};
pub use crawl::{CrawlOutcome, CrawlRunner, VisitRecord};
pub use decode::{decode_document, DecodedDocument};
pub use driver::{first_present, wait_for_any, with_timeout, BrowserDriver, DEFAULT_POLL_INTERVAL};
pub use extract::{
    data_tables, endpoint_hints, image_hints, keyword_contexts, market_matches,
    methodology_links, visualization_count, ExtractionRecord, ExtractionToggles, ExtractorError,
    PageExtractor, PageFindings, CONTEXT_WINDOW, MARKET_TEXT_LIMIT,
};
pub use http_driver::{HttpDriver, HttpDriverSettings};
pub use inspect::{ElementHandle, HtmlInspector, InspectError, PageInspector};
pub use keys::{key_to_path, screenshot_key, REPORT_KEY};
pub use links::{relevant_urls, DiscoveredLink, LinkDiscoverer, NAVIGATION_SELECTORS};
pub use network::{
    ApiEndpoint, CapturedRequest, NetworkEvent, NetworkObserver, NetworkTap, ObservedTraffic,
};
pub use persist::{
    ensure_output_dir, publish_report, BlobStore, FsBlobStore, JsonlRecordSink, PersistError,
    RecordSink,
};
pub use taxonomy::{
    KeywordTaxonomy, API_RESPONSE_TERMS, DATA_SOURCE_TERMS, DOMAIN_TERMS, LINK_RELEVANCE_TERMS,
    MARKET_TERMS, METHODOLOGY_TERMS, REQUEST_URL_TERMS,
};
pub use types::{DriverError, RunError, Stage, VisitError};

pub use tokio_util::sync::CancellationToken;
