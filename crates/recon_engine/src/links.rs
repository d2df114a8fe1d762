use url::Url;

use crate::inspect::{InspectError, PageInspector};
use crate::taxonomy::LINK_RELEVANCE_TERMS;

/// Navigation-like regions scanned for anchors, in scan order.
pub const NAVIGATION_SELECTORS: &[&str] = &[
    "nav a",
    "header a",
    "[role=\"navigation\"] a",
    ".sidebar a",
    ".menu a",
    "aside a",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredLink {
    pub url: String,
    pub text: String,
    pub source_page: String,
    /// Whether the link text makes it worth visiting.
    pub relevant: bool,
}

pub struct LinkDiscoverer {
    selectors: Vec<String>,
    relevance_terms: Vec<String>,
}

impl LinkDiscoverer {
    pub fn new() -> Self {
        Self {
            selectors: NAVIGATION_SELECTORS.iter().map(|s| s.to_string()).collect(),
            relevance_terms: LINK_RELEVANCE_TERMS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Links found in navigation regions, first occurrence per URL.
    pub fn discover(&self, page: &dyn PageInspector) -> Result<Vec<DiscoveredLink>, InspectError> {
        let mut links: Vec<DiscoveredLink> = Vec::new();
        for selector in &self.selectors {
            for anchor in page.query_all(selector)? {
                let Some(href) = anchor.attribute("href").map(str::trim) else {
                    continue;
                };
                if is_excluded(href) {
                    continue;
                }
                let Some(url) = resolve_url(href, page.url()) else {
                    continue;
                };
                if links.iter().any(|known| known.url == url) {
                    continue;
                }
                let text = anchor.normalized_text();
                let relevant = self.is_relevant(&text);
                links.push(DiscoveredLink {
                    url,
                    text,
                    source_page: page.url().to_string(),
                    relevant,
                });
            }
        }
        Ok(links)
    }

    fn is_relevant(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        self.relevance_terms
            .iter()
            .any(|term| lowered.contains(term.as_str()))
    }
}

impl Default for LinkDiscoverer {
    fn default() -> Self {
        Self::new()
    }
}

/// URLs of the links proposed for enqueueing.
pub fn relevant_urls(links: &[DiscoveredLink]) -> Vec<String> {
    links
        .iter()
        .filter(|link| link.relevant)
        .map(|link| link.url.clone())
        .collect()
}

fn is_excluded(href: &str) -> bool {
    href.is_empty() || href.starts_with('#') || href.to_ascii_lowercase().contains("logout")
}

/// Absolute http(s) form of `reference` relative to `base`.
pub(crate) fn resolve_url(reference: &str, base: &str) -> Option<String> {
    let trimmed = reference.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with("javascript:") || lower.starts_with("mailto:") || lower.starts_with("data:") {
        return None;
    }
    let resolved = match Url::parse(trimmed) {
        Ok(url) => url,
        Err(_) => Url::parse(base).ok()?.join(trimmed).ok()?,
    };
    matches!(resolved.scheme(), "http" | "https").then(|| resolved.to_string())
}

#[cfg(test)]
mod tests {
    use super::resolve_url;

    #[test]
    fn resolves_relative_references() {
        assert_eq!(
            resolve_url("../prices?range=1y", "https://example.com/markets/shrimp/"),
            Some("https://example.com/markets/prices?range=1y".to_string())
        );
        assert_eq!(
            resolve_url("?page=2", "https://example.com/reports"),
            Some("https://example.com/reports?page=2".to_string())
        );
    }

    #[test]
    fn rejects_non_navigable_references() {
        assert_eq!(resolve_url("#top", "https://example.com/"), None);
        assert_eq!(resolve_url("javascript:void(0)", "https://example.com/"), None);
        assert_eq!(resolve_url("mailto:sales@example.com", "https://example.com/"), None);
        assert_eq!(resolve_url("", "https://example.com/"), None);
    }
}
