//! Fixed keyword sets the extractor and aggregator match against.
//!
//! All terms are lowercase. Matching is substring based, so very short terms
//! are avoided where they would fire inside unrelated words.

/// Terms that mark content as belonging to the shrimp / seafood domain.
pub const DOMAIN_TERMS: &[&str] = &[
    "shrimp",
    "prawn",
    "vannamei",
    "monodon",
    "black tiger",
    "whiteleg",
    "penaeus",
    "aquaculture",
    "seafood",
    "hlso",
    "hoso",
];

/// Known data providers, publications and statistical agencies.
pub const DATA_SOURCE_TERMS: &[&str] = &[
    "urner barry",
    "expana",
    "undercurrent",
    "seafoodsource",
    "seafood source",
    "intrafish",
    "globefish",
    "fao",
    "usda",
    "noaa",
    "nmfs",
    "eurostat",
    "comtrade",
    "trade map",
    "mpeda",
    "tridge",
    "selina wamucii",
    "bloomberg",
    "reuters",
    "customs data",
];

/// Producing and consuming markets.
pub const MARKET_TERMS: &[&str] = &[
    "ecuador",
    "india",
    "vietnam",
    "indonesia",
    "thailand",
    "china",
    "united states",
    "european union",
    "japan",
    "mexico",
    "peru",
    "bangladesh",
    "honduras",
    "argentina",
    "saudi arabia",
    "spain",
];

/// Link text terms that make a navigation link worth visiting.
pub const LINK_RELEVANCE_TERMS: &[&str] = &[
    "data", "source", "market", "price", "forecast", "shrimp", "seafood", "analysis", "report",
    "insight",
];

/// Link text or target terms that mark a methodology / about page.
pub const METHODOLOGY_TERMS: &[&str] = &["methodology", "about", "how it works", "data source"];

/// URL terms that make a request event worth retaining.
pub const REQUEST_URL_TERMS: &[&str] = &["api", "data", "forecast", "price", "shrimp"];

/// URL terms that make a successful response an API endpoint.
pub const API_RESPONSE_TERMS: &[&str] = &["api", "data"];

/// Keyword sets used by one crawl.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordTaxonomy {
    pub domain: Vec<String>,
    pub data_sources: Vec<String>,
    pub markets: Vec<String>,
}

impl KeywordTaxonomy {
    pub fn builtin() -> Self {
        Self {
            domain: owned(DOMAIN_TERMS),
            data_sources: owned(DATA_SOURCE_TERMS),
            markets: owned(MARKET_TERMS),
        }
    }

    /// Domain terms that occur in `lowercase_text`.
    pub fn domain_terms_in<'a>(&'a self, lowercase_text: &'a str) -> impl Iterator<Item = &'a str> {
        self.domain
            .iter()
            .map(String::as_str)
            .filter(move |term| lowercase_text.contains(term))
    }
}

impl Default for KeywordTaxonomy {
    fn default() -> Self {
        Self::builtin()
    }
}

fn owned(terms: &[&str]) -> Vec<String> {
    terms.iter().map(|term| term.to_string()).collect()
}

/// True when `haystack` contains any of `terms`. Case-sensitive.
pub(crate) fn contains_any(haystack: &str, terms: &[&str]) -> bool {
    terms.iter().any(|term| haystack.contains(term))
}
