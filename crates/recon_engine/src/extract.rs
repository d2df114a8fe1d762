//! Classification passes over one loaded page.
//!
//! Every pass is a pure function of a [`PageInspector`] and a keyword set.
//! Text comparisons are case-insensitive substring matches with no word
//! boundary checks, so a keyword inside a longer word still matches.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::inspect::{ElementHandle, InspectError, PageInspector};
use crate::links::resolve_url;
use crate::taxonomy::{KeywordTaxonomy, METHODOLOGY_TERMS};

/// Characters captured on each side of a keyword match.
pub const CONTEXT_WINDOW: usize = 50;
/// Longest text snippet kept on a market match.
pub const MARKET_TEXT_LIMIT: usize = 100;

/// Structural selectors that tend to hold market or region names.
pub const MARKET_SELECTORS: &[&str] = &[
    "select",
    "option",
    "[class*=\"market\"]",
    "[class*=\"region\"]",
    "[class*=\"country\"]",
    "[id*=\"market\"]",
    "[id*=\"region\"]",
    "[data-market]",
];

pub const VISUALIZATION_SELECTOR: &str = "canvas, svg, [class*=\"chart\"], [id*=\"chart\"]";

static ENDPOINT_HINT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)(?:api|endpoint|feed|source)\w*[^"'\n;]{0,40}?(?:url|uri|path)\w*["']?[^"'\n;]{0,40}?["'][^"'\n]+["']"#,
    )
    .expect("endpoint hint pattern is valid")
});

/// One classified finding, always tagged with the page it came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ExtractionRecord {
    KeywordContext {
        source: String,
        context: String,
        page_url: String,
    },
    ApiHint {
        hint: String,
        page_url: String,
    },
    ImageHint {
        source: String,
        image_url: String,
        page_url: String,
    },
    MarketMatch {
        market: String,
        element_class: String,
        text: String,
        page_url: String,
    },
    VisualizationCount {
        count: usize,
        page_url: String,
    },
    MethodologyLink {
        url: String,
        text: String,
        page_url: String,
    },
    DataTableSummary {
        index: usize,
        headers: Vec<String>,
        row_count: usize,
        page_url: String,
    },
}

impl ExtractionRecord {
    pub fn page_url(&self) -> &str {
        match self {
            ExtractionRecord::KeywordContext { page_url, .. }
            | ExtractionRecord::ApiHint { page_url, .. }
            | ExtractionRecord::ImageHint { page_url, .. }
            | ExtractionRecord::MarketMatch { page_url, .. }
            | ExtractionRecord::VisualizationCount { page_url, .. }
            | ExtractionRecord::MethodologyLink { page_url, .. }
            | ExtractionRecord::DataTableSummary { page_url, .. } => page_url,
        }
    }

    /// Provider keyword the record was matched on.
    pub fn provider(&self) -> Option<&str> {
        match self {
            ExtractionRecord::KeywordContext { source, .. }
            | ExtractionRecord::ImageHint { source, .. } => Some(source),
            _ => None,
        }
    }

    pub fn market(&self) -> Option<&str> {
        match self {
            ExtractionRecord::MarketMatch { market, .. } => Some(market),
            _ => None,
        }
    }

    pub fn context(&self) -> Option<&str> {
        match self {
            ExtractionRecord::KeywordContext { context, .. } => Some(context),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionToggles {
    pub data_sources: bool,
    pub markets: bool,
    pub methodology: bool,
}

impl Default for ExtractionToggles {
    fn default() -> Self {
        Self {
            data_sources: true,
            markets: true,
            methodology: true,
        }
    }
}

/// Everything one page visit produced, grouped by report section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageFindings {
    pub data_sources: Vec<ExtractionRecord>,
    pub markets: Vec<ExtractionRecord>,
    pub methodology_links: Vec<ExtractionRecord>,
    pub data_tables: Vec<ExtractionRecord>,
}

impl PageFindings {
    pub fn record_count(&self) -> usize {
        self.data_sources.len()
            + self.markets.len()
            + self.methodology_links.len()
            + self.data_tables.len()
    }
}

#[derive(Debug, thiserror::Error)]
#[error("keyword {keyword:?} does not compile to a context pattern: {source}")]
pub struct ExtractorError {
    keyword: String,
    #[source]
    source: regex::Error,
}

/// Runs the enabled passes against a page.
pub struct PageExtractor {
    taxonomy: KeywordTaxonomy,
    toggles: ExtractionToggles,
    context_patterns: Vec<(String, Regex)>,
}

impl PageExtractor {
    pub fn new(taxonomy: KeywordTaxonomy, toggles: ExtractionToggles) -> Result<Self, ExtractorError> {
        let context_patterns = compile_context_patterns(&taxonomy.data_sources)?;
        Ok(Self {
            taxonomy,
            toggles,
            context_patterns,
        })
    }

    pub fn taxonomy(&self) -> &KeywordTaxonomy {
        &self.taxonomy
    }

    pub fn extract(&self, page: &dyn PageInspector) -> Result<PageFindings, InspectError> {
        let mut findings = PageFindings::default();

        if self.toggles.data_sources {
            let text = page.extract_text();
            findings
                .data_sources
                .extend(contexts_with(&self.context_patterns, &text, page.url()));
            findings.data_sources.extend(endpoint_hints(page)?);
            findings
                .data_sources
                .extend(image_hints(page, &self.taxonomy.data_sources)?);
        }

        if self.toggles.markets {
            findings
                .markets
                .extend(market_matches(page, &self.taxonomy.markets)?);
            findings.markets.extend(visualization_count(page)?);
        }

        if self.toggles.methodology {
            findings.methodology_links = methodology_links(page)?;
        }

        findings.data_tables = data_tables(page)?;
        Ok(findings)
    }
}

fn compile_context_patterns(keywords: &[String]) -> Result<Vec<(String, Regex)>, ExtractorError> {
    keywords
        .iter()
        .map(|keyword| {
            let pattern = format!(
                "(?i).{{0,{w}}}{}.{{0,{w}}}",
                regex::escape(keyword),
                w = CONTEXT_WINDOW
            );
            Regex::new(&pattern)
                .map(|regex| (keyword.clone(), regex))
                .map_err(|source| ExtractorError {
                    keyword: keyword.clone(),
                    source,
                })
        })
        .collect()
}

/// Keyword-context scan: one record per non-overlapping match of each keyword.
pub fn keyword_contexts(
    page: &dyn PageInspector,
    keywords: &[String],
) -> Result<Vec<ExtractionRecord>, ExtractorError> {
    let patterns = compile_context_patterns(keywords)?;
    Ok(contexts_with(&patterns, &page.extract_text(), page.url()))
}

fn contexts_with(patterns: &[(String, Regex)], text: &str, page_url: &str) -> Vec<ExtractionRecord> {
    let mut records = Vec::new();
    for (keyword, pattern) in patterns {
        for found in pattern.find_iter(text) {
            records.push(ExtractionRecord::KeywordContext {
                source: keyword.clone(),
                context: found.as_str().trim().to_string(),
                page_url: page_url.to_string(),
            });
        }
    }
    records
}

/// Endpoint-hint scan over inline script bodies.
pub fn endpoint_hints(page: &dyn PageInspector) -> Result<Vec<ExtractionRecord>, InspectError> {
    let mut records = Vec::new();
    for script in page.query_all("script")? {
        if script.attribute("src").is_some() {
            continue;
        }
        for found in ENDPOINT_HINT.find_iter(script.text()) {
            records.push(ExtractionRecord::ApiHint {
                hint: found.as_str().to_string(),
                page_url: page.url().to_string(),
            });
        }
    }
    Ok(records)
}

/// Image-hint scan: one record per (image, keyword) pair.
pub fn image_hints(
    page: &dyn PageInspector,
    keywords: &[String],
) -> Result<Vec<ExtractionRecord>, InspectError> {
    let mut records = Vec::new();
    for image in page.query_all("img")? {
        let src = image.attribute("src").unwrap_or("");
        let fields = [
            src.to_lowercase(),
            image.attribute("alt").unwrap_or("").to_lowercase(),
            image.attribute("title").unwrap_or("").to_lowercase(),
        ];
        let image_url = resolve_url(src, page.url()).unwrap_or_else(|| src.to_string());
        for keyword in keywords {
            let needle = keyword.to_lowercase();
            if fields.iter().any(|field| field.contains(&needle)) {
                records.push(ExtractionRecord::ImageHint {
                    source: keyword.clone(),
                    image_url: image_url.clone(),
                    page_url: page.url().to_string(),
                });
            }
        }
    }
    Ok(records)
}

/// Market/region scan over the structural selectors.
pub fn market_matches(
    page: &dyn PageInspector,
    keywords: &[String],
) -> Result<Vec<ExtractionRecord>, InspectError> {
    let mut records = Vec::new();
    for selector in MARKET_SELECTORS {
        for element in page.query_all(selector)? {
            let text = element.normalized_text();
            let lowered = text.to_lowercase();
            for keyword in keywords {
                if lowered.contains(&keyword.to_lowercase()) {
                    records.push(market_record(&element, keyword, &text, page.url()));
                }
            }
        }
    }
    Ok(records)
}

fn market_record(element: &ElementHandle, keyword: &str, text: &str, page_url: &str) -> ExtractionRecord {
    ExtractionRecord::MarketMatch {
        market: keyword.to_string(),
        element_class: element.class_name().to_string(),
        text: text.chars().take(MARKET_TEXT_LIMIT).collect(),
        page_url: page_url.to_string(),
    }
}

pub fn visualization_count(page: &dyn PageInspector) -> Result<Option<ExtractionRecord>, InspectError> {
    let count = page.query_all(VISUALIZATION_SELECTOR)?.len();
    Ok((count > 0).then(|| ExtractionRecord::VisualizationCount {
        count,
        page_url: page.url().to_string(),
    }))
}

/// Anchors whose text or target mentions methodology or about pages.
pub fn methodology_links(page: &dyn PageInspector) -> Result<Vec<ExtractionRecord>, InspectError> {
    let mut records = Vec::new();
    for anchor in page.query_all("a")? {
        let text = anchor.normalized_text();
        let href = anchor.attribute("href").unwrap_or("").trim();
        let lowered_text = text.to_lowercase();
        let lowered_href = href.to_lowercase();
        let matches = METHODOLOGY_TERMS
            .iter()
            .any(|term| lowered_text.contains(term) || lowered_href.contains(term));
        if matches {
            records.push(ExtractionRecord::MethodologyLink {
                url: resolve_url(href, page.url()).unwrap_or_else(|| href.to_string()),
                text,
                page_url: page.url().to_string(),
            });
        }
    }
    Ok(records)
}

/// Structural summary of every table; body rows are preferred over all rows.
pub fn data_tables(page: &dyn PageInspector) -> Result<Vec<ExtractionRecord>, InspectError> {
    let mut records = Vec::new();
    for (index, table) in page.query_all("table")?.iter().enumerate() {
        let headers: Vec<String> = page
            .query_within(table, "th")?
            .iter()
            .map(ElementHandle::normalized_text)
            .collect();
        let body_rows = page.query_within(table, "tbody tr")?.len();
        let row_count = if body_rows > 0 {
            body_rows
        } else {
            page.query_within(table, "tr")?.len()
        };
        if !headers.is_empty() || row_count > 0 {
            records.push(ExtractionRecord::DataTableSummary {
                index,
                headers,
                row_count,
                page_url: page.url().to_string(),
            });
        }
    }
    Ok(records)
}
