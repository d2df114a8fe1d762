//! Builds the final report from everything the crawl retained.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::extract::{ExtractionRecord, PageFindings};
use crate::network::{ApiEndpoint, CapturedRequest, ObservedTraffic};
use crate::taxonomy::KeywordTaxonomy;

pub const DATA_SOURCE_DETAIL_LIMIT: usize = 50;
pub const MARKET_DETAIL_LIMIT: usize = 30;
pub const PROVIDER_SUMMARY_LIMIT: usize = 10;

const DATA_TYPE_TRIGGERS: &[(&str, &[&str])] = &[
    ("prices", &["price", "usd/", "$/", "per kg", "per lb"]),
    ("forecasts", &["forecast", "outlook", "projection"]),
    ("trade volumes", &["import", "export", "volume", "shipment"]),
    ("production", &["production", "harvest", "farmed"]),
    ("inventories", &["inventory", "inventories", "cold storage"]),
];

const FREQUENCY_TRIGGERS: &[(&str, &[&str])] = &[
    ("daily", &["daily"]),
    ("weekly", &["weekly"]),
    ("monthly", &["monthly"]),
    ("quarterly", &["quarterly"]),
    ("annual", &["annual", "yearly"]),
];

const CLOSING_TIP: &str =
    "Re-run the crawl periodically and compare reports to track changes in sources and coverage.";

/// Per-crawl accumulator owned by the runner. Only successful visits are merged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlAccumulator {
    pub data_sources: Vec<ExtractionRecord>,
    pub markets: Vec<ExtractionRecord>,
    pub methodology_links: Vec<ExtractionRecord>,
    pub data_tables: Vec<ExtractionRecord>,
    pub api_endpoints: Vec<ApiEndpoint>,
    pub requests: Vec<CapturedRequest>,
}

impl CrawlAccumulator {
    pub fn absorb(&mut self, findings: PageFindings, traffic: ObservedTraffic) {
        self.data_sources.extend(findings.data_sources);
        self.markets.extend(findings.markets);
        self.methodology_links.extend(findings.methodology_links);
        self.data_tables.extend(findings.data_tables);
        self.api_endpoints.extend(traffic.api_responses);
        self.requests.extend(traffic.requests);
    }
}

/// Run-level facts the report needs besides the accumulated records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportContext {
    pub platform: String,
    pub url: String,
    pub authenticated: bool,
    pub credentials_present: bool,
    pub analysis_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateReport {
    pub analysis_date: DateTime<Utc>,
    pub platform: String,
    pub url: String,
    pub authenticated: bool,
    pub data_sources: DataSourcesSection,
    pub markets: MarketsSection,
    pub methodology: MethodologySection,
    pub shrimp_specific: ShrimpSection,
    pub summary: SummarySection,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourcesSection {
    pub identified: Vec<String>,
    pub total: usize,
    pub details: Vec<ExtractionRecord>,
    pub api_endpoints: Vec<ApiEndpoint>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketsSection {
    pub identified: Vec<String>,
    pub total: usize,
    pub details: Vec<ExtractionRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodologySection {
    pub links: Vec<ExtractionRecord>,
    pub data_tables: Vec<ExtractionRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShrimpSection {
    pub has_shrimp_content: bool,
    pub shrimp_keywords_found: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarySection {
    pub likely_data_providers: Vec<String>,
    pub markets_covered: usize,
    pub data_types: Vec<String>,
    pub update_frequency: String,
}

pub fn aggregate(
    context: &ReportContext,
    records: &CrawlAccumulator,
    taxonomy: &KeywordTaxonomy,
) -> AggregateReport {
    let data_sources = dedupe_records(&records.data_sources);
    let markets = dedupe_records(&records.markets);
    let api_endpoints = dedupe_endpoints(&records.api_endpoints);

    let providers: Vec<String> = distinct(data_sources.iter().filter_map(ExtractionRecord::provider));
    let identified_markets: Vec<String> = distinct(markets.iter().filter_map(ExtractionRecord::market));

    let contexts: Vec<String> = data_sources
        .iter()
        .filter_map(ExtractionRecord::context)
        .map(str::to_lowercase)
        .collect();
    let shrimp_keywords: Vec<String> = distinct(
        contexts
            .iter()
            .flat_map(|text| taxonomy.domain_terms_in(text)),
    );
    let has_shrimp_content = !shrimp_keywords.is_empty();

    let methodology_links = dedupe_records(&records.methodology_links);
    let data_tables = dedupe_records(&records.data_tables);
    let has_charts = markets
        .iter()
        .any(|record| matches!(record, ExtractionRecord::VisualizationCount { .. }));

    let summary = SummarySection {
        likely_data_providers: rank_providers(&data_sources),
        markets_covered: identified_markets.len(),
        data_types: data_types(&contexts, !data_tables.is_empty(), has_charts),
        update_frequency: update_frequency(&contexts),
    };

    let recommendations = recommendations(
        providers.len(),
        identified_markets.len(),
        api_endpoints.len(),
        has_shrimp_content,
        context.credentials_present,
    );

    AggregateReport {
        analysis_date: context.analysis_date,
        platform: context.platform.clone(),
        url: context.url.clone(),
        authenticated: context.authenticated,
        data_sources: DataSourcesSection {
            identified: providers,
            total: data_sources.len(),
            details: truncated(data_sources, DATA_SOURCE_DETAIL_LIMIT),
            api_endpoints,
        },
        markets: MarketsSection {
            identified: identified_markets,
            total: markets.len(),
            details: truncated(markets, MARKET_DETAIL_LIMIT),
        },
        methodology: MethodologySection {
            links: methodology_links,
            data_tables,
        },
        shrimp_specific: ShrimpSection {
            has_shrimp_content,
            shrimp_keywords_found: shrimp_keywords,
        },
        summary,
        recommendations,
    }
}

/// Structural dedupe keeping first occurrences in order.
pub fn dedupe_records(records: &[ExtractionRecord]) -> Vec<ExtractionRecord> {
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(records.len());
    for record in records {
        let fresh = match fingerprint(record) {
            Some(digest) => seen.insert(digest),
            None => !unique.contains(record),
        };
        if fresh {
            unique.push(record.clone());
        }
    }
    unique
}

/// Endpoint dedupe by URL only; the first captured response wins.
pub fn dedupe_endpoints(endpoints: &[ApiEndpoint]) -> Vec<ApiEndpoint> {
    let mut seen = HashSet::new();
    endpoints
        .iter()
        .filter(|endpoint| seen.insert(endpoint.url.as_str()))
        .cloned()
        .collect()
}

fn fingerprint(record: &ExtractionRecord) -> Option<[u8; 32]> {
    let bytes = serde_json::to_vec(record).ok()?;
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&Sha256::digest(&bytes));
    Some(digest)
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    values
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn truncated(mut records: Vec<ExtractionRecord>, limit: usize) -> Vec<ExtractionRecord> {
    records.truncate(limit);
    records
}

fn rank_providers(data_sources: &[ExtractionRecord]) -> Vec<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for provider in data_sources.iter().filter_map(ExtractionRecord::provider) {
        *counts.entry(provider).or_default() += 1;
    }
    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked
        .into_iter()
        .take(PROVIDER_SUMMARY_LIMIT)
        .map(|(provider, _)| provider.to_string())
        .collect()
}

fn data_types(contexts: &[String], has_tables: bool, has_charts: bool) -> Vec<String> {
    let mut types: Vec<String> = DATA_TYPE_TRIGGERS
        .iter()
        .filter(|(_, triggers)| mentions_any(contexts, triggers))
        .map(|(label, _)| label.to_string())
        .collect();
    if has_tables {
        types.push("tables".to_string());
    }
    if has_charts {
        types.push("charts".to_string());
    }
    types
}

fn update_frequency(contexts: &[String]) -> String {
    FREQUENCY_TRIGGERS
        .iter()
        .find(|(_, triggers)| mentions_any(contexts, triggers))
        .map(|(label, _)| label.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn mentions_any(contexts: &[String], triggers: &[&str]) -> bool {
    contexts
        .iter()
        .any(|text| triggers.iter().any(|trigger| text.contains(trigger)))
}

fn recommendations(
    providers: usize,
    markets: usize,
    endpoints: usize,
    has_shrimp_content: bool,
    credentials_present: bool,
) -> Vec<String> {
    let mut out = Vec::new();
    if providers > 0 {
        out.push(format!(
            "Cross-check the {providers} identified data provider(s) against their original publications."
        ));
    }
    if markets > 0 {
        out.push(format!(
            "Compare coverage of the {markets} identified market(s) with the markets you track."
        ));
    }
    if endpoints > 0 {
        out.push(format!(
            "Inspect the {endpoints} captured API endpoint(s) for structured data access."
        ));
    }
    if !has_shrimp_content {
        out.push(
            "No shrimp-specific content was found; verify that the crawl reached the relevant sections."
                .to_string(),
        );
    }
    if !credentials_present {
        out.push(
            "Provide login credentials to analyze content behind authentication.".to_string(),
        );
    }
    out.push(CLOSING_TIP.to_string());
    out
}
