//! Extractor for the football-statistics site.
//!
//! Unlike the coupon sources this page describes a single match, and almost
//! nothing about it is stable: metric labels get renamed, sections are
//! reordered and whole cards disappear. Every semantic field therefore
//! carries an ordered chain of (scope, label) probes evaluated
//! first-match-wins against the flattened page text, so a renamed header
//! degrades that one field to `None` instead of breaking the record.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

use crate::error::PipelineError;
use crate::extract::{document_text, element_text};
use crate::fetch::{self, FetchOptions};
use crate::numeric;
use crate::state::{FootyRecord, FormOutcome, HeadToHead, ScopedMetric, TeamStats};

static TITLE_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h1, h2, .page-title, .match-headline").expect("valid selector"));

static VS_RX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)(.+?)\s+vs\s+(.+)").expect("valid regex"));

static VS_TEXT_RX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(.+?)\s+vs\s+(.+?)\s+(?:H2H|Stats)").expect("valid regex"));

/// Case-sensitive on purpose: result codes are upper-case glyphs, ordinary
/// prose is not.
static FORM_RUN_RX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[WDL]{3,6}\b").expect("valid regex"));

static H2H_LINE_CHAIN: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)H2H[^:]{0,40}:\s*(.{1,60})",
        r"(?i)Head to Head[^:]{0,40}:\s*(.{1,60})",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

static H2H_TALLY_CHAIN: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\bH\s*:?\s*(\d+)\s*X\s*:?\s*(\d+)\s*B\s*:?\s*(\d+)",
        r"(?i)\bW(?:ins)?\s*:?\s*(\d+)\D{0,12}D(?:raws)?\s*:?\s*(\d+)\D{0,12}L(?:osses)?\s*:?\s*(\d+)",
        r"(\d+)\s*-\s*(\d+)\s*-\s*(\d+)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

pub struct FootyFetch {
    pub record: FootyRecord,
    pub raw_len: usize,
    pub attempts: u32,
}

pub fn fetch_footy(url: &str, opts: &FetchOptions) -> Result<FootyFetch, PipelineError> {
    let doc = fetch::fetch_document(url, opts)?;
    match parse_footy(&doc.body) {
        Some(mut record) => {
            record.source = Some(url.to_string());
            Ok(FootyFetch {
                record,
                raw_len: doc.body.len(),
                attempts: doc.attempts,
            })
        }
        None => Err(PipelineError::ExtractionEmpty(
            "Ingen data från Footy.".to_string(),
        )),
    }
}

/// Extract one match's statistics record. `None` only when no team-name
/// pair can be located; every other field degrades independently.
pub fn parse_footy(html: &str) -> Option<FootyRecord> {
    let doc = Html::parse_document(html);
    let text = document_text(&doc);

    let (home_name, away_name) = find_team_names(&doc, &text)?;

    let home = TeamStats {
        name: home_name.clone(),
        xg: ScopedMetric {
            overall: metric_chain(&text, &[("Home", "xG"), ("Overall", "xG")]),
            side: metric_chain(&text, &[("Home", "xG")]),
        },
        xga: ScopedMetric {
            overall: metric_chain(&text, &[("Home", "xGA"), ("Overall", "xGA")]),
            side: metric_chain(&text, &[("Home", "xGA")]),
        },
        ppg: ScopedMetric {
            overall: metric_chain(&text, &[("Home", "PPG"), ("Overall", "PPG")]),
            side: metric_chain(&text, &[("Home", "PPG")]),
        },
        goals_for_avg: metric_chain(
            &text,
            &[("Home", "Goals For"), ("Home", "GF"), ("Home", "Goals")],
        ),
        goals_against_avg: metric_chain(&text, &[("Home", "Goals Against"), ("Home", "GA")]),
        form: find_form(&text, &home_name),
    };

    let away = TeamStats {
        name: away_name.clone(),
        xg: ScopedMetric {
            overall: metric_chain(&text, &[("Away", "xG"), ("Overall", "xG")]),
            side: metric_chain(&text, &[("Away", "xG")]),
        },
        xga: ScopedMetric {
            overall: metric_chain(&text, &[("Away", "xGA"), ("Overall", "xGA")]),
            side: metric_chain(&text, &[("Away", "xGA")]),
        },
        ppg: ScopedMetric {
            overall: metric_chain(&text, &[("Away", "PPG"), ("Overall", "PPG")]),
            side: metric_chain(&text, &[("Away", "PPG")]),
        },
        goals_for_avg: metric_chain(
            &text,
            &[("Away", "Goals For"), ("Away", "GF"), ("Away", "Goals")],
        ),
        goals_against_avg: metric_chain(&text, &[("Away", "Goals Against"), ("Away", "GA")]),
        form: find_form(&text, &away_name),
    };

    let (h2h, h2h_text) = find_h2h(&text);

    Some(FootyRecord {
        home,
        away,
        h2h,
        h2h_text,
        source: None,
        swapped: false,
    })
}

fn find_team_names(doc: &Html, text: &str) -> Option<(String, String)> {
    for title in doc.select(&TITLE_SEL) {
        let title_text = element_text(&title);
        if let Some(caps) = VS_RX.captures(&title_text) {
            return Some((caps[1].trim().to_string(), caps[2].trim().to_string()));
        }
    }
    let caps = VS_TEXT_RX.captures(text)?;
    Some((caps[1].trim().to_string(), caps[2].trim().to_string()))
}

/// First probe in the chain that hits wins.
fn metric_chain(text: &str, chain: &[(&str, &str)]) -> Option<f64> {
    chain
        .iter()
        .find_map(|(scope, label)| find_scoped_metric(text, scope, label))
}

/// A number introduced by `scope ... label` with no sentence break between
/// them, e.g. "Home xG (per match) 1.65".
fn find_scoped_metric(text: &str, scope: &str, label: &str) -> Option<f64> {
    let pattern = format!(
        r"(?i)\b{}\b[^.]*?\b{}\b[^0-9\-]*(-?\d+(?:[.,]\d+)?)",
        regex::escape(scope),
        regex::escape(label)
    );
    let rx = Regex::new(&pattern).ok()?;
    rx.captures(text)
        .and_then(|caps| numeric::parse_decimal(&caps[1]))
}

/// Recent-form run for one team. Team names repeat across the page; the
/// occurrence sitting closest to a "Form" label is the team's own card, so
/// the smallest name-to-label gap wins.
fn find_form(text: &str, team: &str) -> Vec<FormOutcome> {
    let mut best: Option<(usize, String)> = None;
    if let Ok(rx) = Regex::new(&format!(r"(?i){}", regex::escape(team))) {
        for m in rx.find_iter(text) {
            let rest = &text[m.end()..];
            let Some(pos) = rest.find("Form") else {
                continue;
            };
            if pos > 200 {
                continue;
            }
            if best.as_ref().is_none_or(|(gap, _)| pos < *gap) {
                let window: String = rest[pos..].chars().take(120).collect();
                best = Some((pos, window));
            }
        }
    }

    if let Some((_, window)) = best {
        if let Some(run) = FORM_RUN_RX.find(&window) {
            return form_outcomes(run.as_str());
        }
    }

    // No labeled card found: first run anywhere on the page.
    FORM_RUN_RX
        .find(text)
        .map(|run| form_outcomes(run.as_str()))
        .unwrap_or_default()
}

fn form_outcomes(run: &str) -> Vec<FormOutcome> {
    run.chars().filter_map(FormOutcome::from_char).take(5).collect()
}

fn find_h2h(text: &str) -> (Option<HeadToHead>, Option<String>) {
    let line = H2H_LINE_CHAIN
        .iter()
        .find_map(|rx| rx.captures(text).map(|caps| caps[1].trim().to_string()));
    let Some(line) = line else {
        return (None, None);
    };

    for rx in H2H_TALLY_CHAIN.iter() {
        if let Some(caps) = rx.captures(&line) {
            let tally = HeadToHead {
                wins: caps[1].parse().unwrap_or(0),
                draws: caps[2].parse().unwrap_or(0),
                losses: caps[3].parse().unwrap_or(0),
            };
            // Trim the stored line to the tally itself.
            let end = caps.get(0).map(|m| m.end()).unwrap_or(line.len());
            let summary = line[..end].trim().to_string();
            return (Some(tally), Some(summary));
        }
    }

    (None, Some(line))
}
