//! Filename conventions for report files: `<prefix>-<YYYY-MM-DD>[-<suffix>].json`.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

pub const JSON_EXT: &str = ".json";

static DATED_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.+?)-\d{4}-\d{2}-\d{2}").expect("dated label regex"));

/// Filename without directory and without a trailing `.json`.
pub fn stem(filename: &str) -> &str {
    let base = filename.rsplit('/').next().unwrap_or(filename);
    base.strip_suffix(JSON_EXT).unwrap_or(base)
}

/// `true` for `<prefix>-...json`.
pub fn matches_prefix(filename: &str, prefix: &str) -> bool {
    filename.ends_with(JSON_EXT)
        && filename
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('-'))
}

/// Date embedded right after `<prefix>-`, if it parses as `YYYY-MM-DD`.
pub fn embedded_date(filename: &str, prefix: &str) -> Option<NaiveDate> {
    if !matches_prefix(filename, prefix) {
        return None;
    }
    let rest = &filename[prefix.len() + 1..filename.len() - JSON_EXT.len()];
    let head = rest.get(..10)?;
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

/// Best-effort report type for display and filtering.
///
/// Precedence: `<label>-YYYY-MM-DD...` → `label`; `wr-...` → `weekly`; else `general`.
pub fn infer_type(filename: &str) -> String {
    let base = stem(filename);
    if let Some(caps) = DATED_LABEL.captures(base) {
        return caps[1].to_string();
    }
    if base.starts_with("wr-") {
        return "weekly".to_string();
    }
    "general".to_string()
}

/// `portfolio-analysis_2026` → `Portfolio Analysis 2026`.
pub fn title_from_filename(filename: &str) -> String {
    let base = stem(filename).replace(['-', '_'], " ");
    let mut out = String::with_capacity(base.len());
    let mut prev_word = false;
    for ch in base.chars() {
        let word = ch.is_ascii_alphanumeric();
        if word && !prev_word {
            out.push(ch.to_ascii_uppercase());
        } else {
            out.push(ch);
        }
        prev_word = word;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infer_type_precedence() {
        assert_eq!(infer_type("portfolio-analysis-2026-02-17.json"), "portfolio-analysis");
        assert_eq!(infer_type("wr-20260216-090068.json"), "weekly");
        assert_eq!(infer_type("misc.json"), "general");
        // dated label wins over the wr- prefix
        assert_eq!(infer_type("wr-2026-02-16.json"), "wr");
        // shortest label before the first date
        assert_eq!(infer_type("event-detect-2026-02-17-0900.json"), "event-detect");
    }

    #[test]
    fn titles_are_humanized() {
        assert_eq!(
            title_from_filename("portfolio-analysis-2026-02-17.json"),
            "Portfolio Analysis 2026 02 17"
        );
        assert_eq!(title_from_filename("my_report.json"), "My Report");
    }

    #[test]
    fn embedded_date_needs_prefix_and_date() {
        let d = NaiveDate::from_ymd_opt(2026, 2, 17).unwrap();
        assert_eq!(embedded_date("event-detect-2026-02-17.json", "event-detect"), Some(d));
        assert_eq!(
            embedded_date("event-detect-2026-02-17-0930.json", "event-detect"),
            Some(d)
        );
        assert_eq!(embedded_date("event-detect-latest.json", "event-detect"), None);
        assert_eq!(embedded_date("event-detector-2026-02-17.json", "event-detect"), None);
        assert_eq!(embedded_date("event-detect-2026-02-17.txt", "event-detect"), None);
    }

    #[test]
    fn prefix_match_requires_dash() {
        assert!(matches_prefix("morning-briefing-2026-02-17.json", "morning-briefing"));
        assert!(!matches_prefix("morning-briefings-2026-02-17.json", "morning-briefing"));
        assert!(!matches_prefix("morning-briefing-2026-02-17.json.tmp", "morning-briefing"));
    }
}
