//! Shared heuristic vocabulary for the three page extractors.
//!
//! All sources present a match as a block of flattened text containing a
//! "Home - Away" pair followed by labeled numeric sections. The helpers here
//! slice that text by label in a fixed priority order and pick numeric
//! tokens by field arity, so each extractor only decides where its blocks
//! come from.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html};

use crate::numeric;
use crate::state::MatchRecord;

/// A coupon snapshot never holds more rows than this.
pub const MAX_COUPON_ROWS: usize = 13;

/// Section labels in the order they appear within one match block. Slicing
/// after a label stops at the earliest occurrence of any of these.
pub const LABELS_ORDER: [&str; 5] = [
    "Odds",
    "Start-odds",
    "Svenska folket",
    "Spelvärde",
    "Tio Tidningar",
];

/// "Home - Away" with mandatory whitespace around the dash; tolerates both
/// hyphen and en-dash. The whitespace requirement keeps hyphens inside club
/// names from splitting the pair.
pub static TITLE_RX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([A-Za-zÅÄÖåäö0-9 .’'&()/-]+?)\s[–-]\s([A-Za-zÅÄÖåäö0-9 .’'&()/-]+)")
        .expect("valid regex")
});

/// Flattened text of an element: stripped text nodes joined by single
/// spaces, the way the match-block predicates expect it.
pub fn element_text(el: &ElementRef) -> String {
    el.text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Flattened text of the whole document.
pub fn document_text(doc: &Html) -> String {
    element_text(&doc.root_element())
}

/// The title pair found in the text before the first "Odds" label. Searching
/// only the prefix keeps dashes inside odds sections from being mistaken
/// for a name pair.
pub fn title_in_prefix(text: &str) -> Option<(String, String)> {
    let prefix = match text.split_once("Odds") {
        Some((prefix, _)) => prefix,
        None => text,
    };
    let caps = TITLE_RX.captures(prefix)?;
    Some((caps[1].trim().to_string(), caps[2].trim().to_string()))
}

/// Text slice after `label`, stopped at the next known label.
pub fn section_after_label(text: &str, label: &str) -> String {
    let Some(start) = text.find(label) else {
        return String::new();
    };
    let rest = &text[start + label.len()..];
    let mut stop = rest.len();
    for lb in LABELS_ORDER {
        if let Some(j) = rest.find(lb) {
            stop = stop.min(j);
        }
    }
    rest[..stop].to_string()
}

/// First three decimal tokens, padded with `None`.
pub fn pick_three_decimals(text: &str) -> [Option<f64>; 3] {
    let values = numeric::decimals(text);
    [
        values.first().copied(),
        values.get(1).copied(),
        values.get(2).copied(),
    ]
}

/// First three percent tokens, padded with `None`.
pub fn pick_three_percents(text: &str) -> [Option<u8>; 3] {
    let values = numeric::percents(text);
    [
        values.first().copied(),
        values.get(1).copied(),
        values.get(2).copied(),
    ]
}

/// Drop structurally identical records (first seen wins), cap the snapshot
/// and renumber the survivors 1..N in extraction order.
pub fn dedup_renumber(records: Vec<MatchRecord>) -> Vec<MatchRecord> {
    let mut seen = HashSet::new();
    let mut unique: Vec<MatchRecord> = Vec::new();
    for record in records {
        let key = format!(
            "{}|{}|{:?}|{:?}|{:?}|{:?}|{:?}|{:?}",
            record.home,
            record.away,
            record.odds_1,
            record.odds_x,
            record.odds_2,
            record.folk_1,
            record.folk_x,
            record.folk_2,
        );
        if seen.insert(key) {
            unique.push(record);
        }
    }
    unique.truncate(MAX_COUPON_ROWS);
    for (idx, record) in unique.iter_mut().enumerate() {
        record.match_nr = (idx + 1) as u8;
    }
    unique
}
