//! Extractor for the betting-coupon site.
//!
//! The coupon page lists up to 13 rows with a match number, two club names
//! and three outcome odds. Markup is unstable: class names have changed
//! several times, so the primary strategy tries every known row class and
//! the last resort is a regex sweep over the raw HTML. Public-pick
//! percentages are not captured here, the commentary source carries them.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

use crate::error::PipelineError;
use crate::extract::{dedup_renumber, element_text, section_after_label};
use crate::fetch::{self, FetchOptions};
use crate::numeric;
use crate::state::MatchRecord;

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid selector")
}

static ROW_SEL: Lazy<Selector> =
    Lazy::new(|| selector("div.sry-match-row, li.MatchRow, div.match-row"));
static NR_SEL: Lazy<Selector> =
    Lazy::new(|| selector(".sry-match-row__number, .MatchRow-number, .match-number"));
static HOME_SEL: Lazy<Selector> =
    Lazy::new(|| selector(".sry-match-row__team--home, .team-home, .home, .MatchRow-home"));
static AWAY_SEL: Lazy<Selector> =
    Lazy::new(|| selector(".sry-match-row__team--away, .team-away, .away, .MatchRow-away"));
static ODDS_SEL: Lazy<Selector> =
    Lazy::new(|| selector(".sry-odds__value, .odds__value, .odds"));

static FRACTION_RX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+[.,]\d+").expect("valid regex"));

/// Raw-HTML sweep: tag-delimited "Home - Away" titles.
static TITLE_TAG_RX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r">([A-Za-zÅÄÖåäö0-9 .’'&/-]+?)\s*-\s*([A-Za-zÅÄÖåäö0-9 .’'&/-]+?)<")
        .expect("valid regex")
});

/// Raw-HTML sweep: three odds following an "Odds" label.
static ODDS_BLOCK_RX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)Odds[^0-9]*(\d+(?:[.,]\d+)?)[^\d]+(\d+(?:[.,]\d+)?)[^\d]+(\d+(?:[.,]\d+)?)")
        .expect("valid regex")
});

pub struct CouponFetch {
    pub records: Vec<MatchRecord>,
    pub raw_len: usize,
    pub attempts: u32,
}

pub fn fetch_coupon(url: &str, opts: &FetchOptions) -> Result<CouponFetch, PipelineError> {
    let doc = fetch::fetch_document(url, opts)?;
    let records = parse_coupon(&doc.body);
    if records.is_empty() {
        return Err(PipelineError::ExtractionEmpty(
            "Inga matcher hittades på sidan.".to_string(),
        ));
    }
    Ok(CouponFetch {
        records,
        raw_len: doc.body.len(),
        attempts: doc.attempts,
    })
}

pub fn parse_coupon(html: &str) -> Vec<MatchRecord> {
    let doc = Html::parse_document(html);
    let mut records = Vec::new();

    for (idx, row) in doc.select(&ROW_SEL).enumerate() {
        let match_nr = row
            .select(&NR_SEL)
            .next()
            .and_then(|el| digits(&element_text(&el)))
            .unwrap_or((idx + 1) as u8);

        let home = row
            .select(&HOME_SEL)
            .next()
            .map(|el| element_text(&el))
            .unwrap_or_default();
        let away = row
            .select(&AWAY_SEL)
            .next()
            .map(|el| element_text(&el))
            .unwrap_or_default();

        let mut odds: Vec<f64> = row
            .select(&ODDS_SEL)
            .filter_map(|el| numeric::parse_decimal(&element_text(&el)))
            .take(3)
            .collect();
        if odds.len() < 3 {
            odds = row_odds_fallback(&element_text(&row));
        }

        if home.is_empty() || away.is_empty() || odds.len() < 3 {
            continue;
        }
        records.push(MatchRecord {
            match_nr,
            home,
            away,
            odds_1: Some(odds[0]),
            odds_x: Some(odds[1]),
            odds_2: Some(odds[2]),
            ..MatchRecord::default()
        });
    }

    if records.is_empty() {
        records = parse_raw_sweep(html);
    }

    dedup_renumber(records)
}

/// Odds from a row whose odds elements were missing or renamed. Prefers the
/// slice after an "Odds" label, then fractional-looking tokens (plain
/// integers are usually the match number), then any three numbers.
fn row_odds_fallback(text: &str) -> Vec<f64> {
    let labeled = section_after_label(text, "Odds");
    if !labeled.is_empty() {
        let values = numeric::decimals(&labeled);
        if values.len() >= 3 {
            return values[..3].to_vec();
        }
    }

    let fractional: Vec<f64> = FRACTION_RX
        .find_iter(text)
        .filter_map(|m| m.as_str().replace(',', ".").parse::<f64>().ok())
        .collect();
    if fractional.len() >= 3 {
        return fractional[..3].to_vec();
    }

    let all = numeric::decimals(text);
    if all.len() >= 3 {
        all[..3].to_vec()
    } else {
        Vec::new()
    }
}

fn parse_raw_sweep(html: &str) -> Vec<MatchRecord> {
    let titles: Vec<(String, String)> = TITLE_TAG_RX
        .captures_iter(html)
        .map(|caps| (caps[1].trim().to_string(), caps[2].trim().to_string()))
        .filter(|(home, away)| !home.is_empty() && !away.is_empty())
        .collect();
    let odds: Vec<[f64; 3]> = ODDS_BLOCK_RX
        .captures_iter(html)
        .filter_map(|caps| {
            let o1 = caps[1].replace(',', ".").parse::<f64>().ok()?;
            let ox = caps[2].replace(',', ".").parse::<f64>().ok()?;
            let o2 = caps[3].replace(',', ".").parse::<f64>().ok()?;
            Some([o1, ox, o2])
        })
        .collect();

    titles
        .into_iter()
        .zip(odds)
        .enumerate()
        .map(|(idx, ((home, away), triple))| MatchRecord {
            match_nr: (idx + 1) as u8,
            home,
            away,
            odds_1: Some(triple[0]),
            odds_x: Some(triple[1]),
            odds_2: Some(triple[2]),
            ..MatchRecord::default()
        })
        .collect()
}

fn digits(text: &str) -> Option<u8> {
    let cleaned: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    cleaned.parse::<u8>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(nr: u8, home: &str, away: &str, odds: [&str; 3]) -> String {
        format!(
            r#"<div class="match-row">
                 <span class="match-number">{nr}</span>
                 <span class="home">{home}</span> - <span class="away">{away}</span>
                 <span class="odds">{}</span><span class="odds">{}</span><span class="odds">{}</span>
               </div>"#,
            odds[0], odds[1], odds[2]
        )
    }

    #[test]
    fn primary_strategy_reads_class_markup() {
        let html = format!(
            "<html><body>{}{}</body></html>",
            row(1, "Halmstad", "Sirius", ["2,30", "3,10", "2,80"]),
            row(2, "Arsenal", "Chelsea", ["1,95", "3,45", "3,60"])
        );
        let records = parse_coupon(&html);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].home, "Halmstad");
        assert_eq!(records[0].odds_x, Some(3.10));
        assert_eq!(records[1].match_nr, 2);
        assert_eq!(records[1].folk_1, None);
    }

    #[test]
    fn raw_sweep_kicks_in_without_known_classes() {
        let html = r#"<html><body>
            <p>Halmstad - Sirius</p>
            <p>Odds</p><p>2,30</p><p>3,10</p><p>2,80</p>
        </body></html>"#;
        let records = parse_coupon(html);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].home, "Halmstad");
        assert_eq!(records[0].odds_2, Some(2.80));
    }

    #[test]
    fn duplicate_rows_collapse() {
        let html = format!(
            "<html><body>{}{}</body></html>",
            row(1, "Halmstad", "Sirius", ["2,30", "3,10", "2,80"]),
            row(2, "Halmstad", "Sirius", ["2,30", "3,10", "2,80"])
        );
        assert_eq!(parse_coupon(&html).len(), 1);
    }

    #[test]
    fn rows_without_three_odds_are_dropped() {
        let html = r#"<html><body><div class="match-row">
            <span class="home">Halmstad</span><span class="away">Sirius</span>
            <span class="odds">2,30</span>
        </div></body></html>"#;
        assert!(parse_coupon(html).is_empty());
    }

    #[test]
    fn malformed_markup_never_panics() {
        assert!(parse_coupon("<div class=\"match-row\"><<<>>>").is_empty());
        assert!(parse_coupon("").is_empty());
    }
}
