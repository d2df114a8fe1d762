use std::path::PathBuf;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

/// Key of the formatted report blob.
pub const REPORT_KEY: &str = "analysis_report.json";

const MAX_SEGMENT_CHARS: usize = 120;

/// `screenshots/<capture timestamp>.png`, with a filesystem-safe timestamp.
pub fn screenshot_key(captured_at: DateTime<Utc>) -> String {
    format!(
        "screenshots/{}.png",
        captured_at.format("%Y-%m-%dT%H-%M-%S%.3fZ")
    )
}

/// Maps a `/`-separated blob key to a relative path that is safe on Windows
/// and Unix. Segments that had to change get a short hash of the original so
/// distinct keys stay distinct. Returns `None` for keys that would escape
/// the store root or have no usable segment.
pub fn key_to_path(key: &str) -> Option<PathBuf> {
    let mut path = PathBuf::new();
    for segment in key.split('/').filter(|segment| !segment.is_empty()) {
        if segment == "." || segment == ".." {
            return None;
        }
        path.push(sanitize_segment(segment));
    }
    (!path.as_os_str().is_empty()).then_some(path)
}

fn sanitize_segment(segment: &str) -> String {
    let replaced: String = segment
        .chars()
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect();
    let mut cleaned: String = replaced
        .trim_matches(&['_', ' ', '.'][..])
        .chars()
        .take(MAX_SEGMENT_CHARS)
        .collect();
    if cleaned.is_empty() {
        cleaned = "blob".to_string();
    }
    let stem_len = cleaned.split('.').next().map_or(0, str::len);
    if is_reserved_windows_name(&cleaned[..stem_len]) {
        cleaned.insert(stem_len, '_');
    }
    if cleaned != segment {
        cleaned = format!("{cleaned}--{}", short_hash(segment));
    }
    cleaned
}

fn is_forbidden(c: char) -> bool {
    matches!(c, '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}')
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}

fn short_hash(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    digest.iter().take(4).map(|byte| format!("{byte:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use chrono::{TimeZone, Utc};

    use super::{key_to_path, screenshot_key, REPORT_KEY};

    #[test]
    fn well_formed_keys_map_unchanged() {
        assert_eq!(key_to_path(REPORT_KEY), Some(PathBuf::from("analysis_report.json")));
        let captured = Utc.with_ymd_and_hms(2026, 3, 1, 8, 30, 5).single().expect("timestamp");
        let key = screenshot_key(captured);
        assert_eq!(key, "screenshots/2026-03-01T08-30-05.000Z.png");
        assert_eq!(
            key_to_path(&key),
            Some(PathBuf::from("screenshots").join("2026-03-01T08-30-05.000Z.png"))
        );
    }

    #[test]
    fn escaping_keys_are_rejected() {
        assert_eq!(key_to_path("../etc/passwd"), None);
        assert_eq!(key_to_path("shots/./x.png"), None);
        assert_eq!(key_to_path("///"), None);
    }

    #[test]
    fn unsafe_segments_are_rewritten_distinctly() {
        let a = key_to_path("reports/a:b.json").expect("path");
        let b = key_to_path("reports/a*b.json").expect("path");
        assert_ne!(a, b);
        let name = a.file_name().and_then(|n| n.to_str()).expect("name");
        assert!(name.starts_with("a_b.json--"));
        let reserved = key_to_path("CON.json").expect("path");
        assert!(reserved.to_string_lossy().starts_with("CON_.json--"));
    }
}
