//! Club-name canonicalization and home/away reconciliation.
//!
//! Independent sources disagree on spelling ("Wolves", "Wolverhampton
//! Wanderers"), on suffixes ("IK Sirius" vs "Sirius") and sometimes on which
//! team is at home. Comparison therefore always runs on a canonical form:
//! lower-cased, punctuation stripped, generic club-type tokens removed and
//! known colloquial names substituted from a static alias table.

use std::collections::HashMap;

use once_cell::sync::Lazy;

/// Club-type and youth-squad tokens carrying no identity.
const SUFFIX_TOKENS: &[&str] = &[
    "fc", "afc", "cf", "sc", "ac", "bk", "ik", "if", "fk", "ff", "club", "united", "town",
    "athletic",
];

static ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("wolves", "wolverhampton wanderers"),
        ("man city", "manchester city"),
        ("man utd", "manchester united"),
        ("spurs", "tottenham hotspur"),
        ("newcastle", "newcastle united"),
        ("west brom", "west bromwich albion"),
        ("qpr", "queens park rangers"),
        ("sheff u", "sheffield united"),
        ("sheff utd", "sheffield united"),
        ("forest", "nottingham forest"),
        ("hbk", "halmstads bk"),
        ("sirius", "ik sirius"),
    ])
});

fn is_suffix_token(token: &str) -> bool {
    if SUFFIX_TOKENS.contains(&token) {
        return true;
    }
    // Youth squad markers: u17, u19, u21 ...
    let mut chars = token.chars();
    chars.next() == Some('u') && chars.as_str().chars().all(|c| c.is_ascii_digit()) && token.len() > 1
}

fn clean(name: &str) -> String {
    let mut lowered = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch.is_alphanumeric() {
            lowered.extend(ch.to_lowercase());
        } else {
            lowered.push(' ');
        }
    }
    lowered
        .split_whitespace()
        .filter(|token| !is_suffix_token(token))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Canonical comparable form of a club name.
pub fn canonical(name: &str) -> String {
    let cleaned = clean(name);
    match ALIASES.get(cleaned.as_str()) {
        Some(target) => clean(target),
        None => cleaned,
    }
}

/// Normalized edit-distance ratio between the canonical forms, in [0, 1].
pub fn similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(&canonical(a), &canonical(b))
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    pub home: String,
    pub away: String,
    pub swapped: bool,
}

/// Orient a source's (home, away) pair against a reference pair.
///
/// Scores the pairing as-is against the pairing with home/away exchanged and
/// keeps whichever matches the reference better. A tie keeps the source
/// orientation.
pub fn reconcile(
    source_home: &str,
    source_away: &str,
    reference_home: &str,
    reference_away: &str,
) -> Reconciled {
    let score_same = (similarity(source_home, reference_home)
        + similarity(source_away, reference_away))
        / 2.0;
    let score_swap = (similarity(source_home, reference_away)
        + similarity(source_away, reference_home))
        / 2.0;

    if score_swap > score_same {
        Reconciled {
            home: source_away.to_string(),
            away: source_home.to_string(),
            swapped: true,
        }
    } else {
        Reconciled {
            home: source_home.to_string(),
            away: source_away.to_string(),
            swapped: false,
        }
    }
}
