//! Extractor for the odds-commentary site.
//!
//! Match blocks here are unlabeled nests of divs, but each block reliably
//! contains the literal section labels. The primary strategy anchors on a
//! "Svenska folket" text node and climbs to the nearest ancestor that also
//! holds a name pair and an "Odds" label. When the label nodes disappear
//! (markup rewrites have done that before) a generic block scan and a
//! table-row scan take over, in that order.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};

use crate::error::PipelineError;
use crate::extract::{
    dedup_renumber, element_text, pick_three_decimals, pick_three_percents, section_after_label,
    title_in_prefix,
};
use crate::fetch::{self, FetchOptions};
use crate::state::MatchRecord;

static FOLK_LABEL_RX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*Svenska folket\s*$").expect("valid regex"));

static GENERIC_BLOCK_SEL: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(".content div, .entry-content div, li, article, .match, .match-row")
        .expect("valid selector")
});

static TABLE_ROW_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("table tr").expect("valid selector"));

/// How far a label node climbs before giving up on finding its block.
const MAX_CLIMB: usize = 8;

pub struct StryketFetch {
    pub records: Vec<MatchRecord>,
    pub raw_len: usize,
    pub attempts: u32,
}

pub fn fetch_stryket(url: &str, opts: &FetchOptions) -> Result<StryketFetch, PipelineError> {
    let doc = fetch::fetch_document(url, opts)?;
    let records = parse_stryket(&doc.body);
    if records.is_empty() {
        return Err(PipelineError::ExtractionEmpty(
            "Hittade inga matcher på sidan.".to_string(),
        ));
    }
    Ok(StryketFetch {
        records,
        raw_len: doc.body.len(),
        attempts: doc.attempts,
    })
}

pub fn parse_stryket(html: &str) -> Vec<MatchRecord> {
    let doc = Html::parse_document(html);

    let mut containers: Vec<ElementRef> = Vec::new();

    // 1) Anchor on "Svenska folket" text nodes and climb to the block.
    for node in doc.tree.nodes() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        if !FOLK_LABEL_RX.is_match(text) {
            continue;
        }
        let Some(parent) = node.parent().and_then(ElementRef::wrap) else {
            continue;
        };
        if let Some(container) = nearest_match_container(parent) {
            push_unique(&mut containers, container);
        }
    }

    // 2) Generic blocks holding both labels and a name pair.
    if containers.is_empty() {
        for block in doc.select(&GENERIC_BLOCK_SEL) {
            let text = element_text(&block);
            if text.contains("Odds")
                && text.contains("Svenska folket")
                && title_in_prefix(&text).is_some()
            {
                push_unique(&mut containers, block);
            }
        }
    }

    // 3) Table rows.
    if containers.is_empty() {
        for row in doc.select(&TABLE_ROW_SEL) {
            let text = element_text(&row);
            if text.contains("Odds") && title_in_prefix(&text).is_some() {
                push_unique(&mut containers, row);
            }
        }
    }

    let mut records = Vec::new();
    for container in containers {
        let text = element_text(&container);
        let Some((home, away)) = title_in_prefix(&text) else {
            continue;
        };

        let odds = pick_three_decimals(&section_after_label(&text, "Odds"));
        let folk = pick_three_percents(&section_after_label(&text, "Svenska folket"));
        let value = pick_three_decimals(&section_after_label(&text, "Spelvärde"));

        records.push(MatchRecord {
            match_nr: (records.len() + 1) as u8,
            home,
            away,
            odds_1: odds[0],
            odds_x: odds[1],
            odds_2: odds[2],
            folk_1: folk[0],
            folk_x: folk[1],
            folk_2: folk[2],
            value_1: value[0],
            value_x: value[1],
            value_2: value[2],
        });
    }

    dedup_renumber(records)
}

fn push_unique<'a>(containers: &mut Vec<ElementRef<'a>>, el: ElementRef<'a>) {
    if !containers.iter().any(|c| c.id() == el.id()) {
        containers.push(el);
    }
}

/// Climb from a label node until the flattened text holds both a name pair
/// (before the "Odds" label) and the label itself.
fn nearest_match_container(node: ElementRef<'_>) -> Option<ElementRef<'_>> {
    let mut current = Some(node);
    for _ in 0..MAX_CLIMB {
        let el = current?;
        let text = element_text(&el);
        if text.contains("Odds") && title_in_prefix(&text).is_some() {
            return Some(el);
        }
        current = el.parent().and_then(ElementRef::wrap);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    // Wrapper class is deliberately unknown to the generic scan, so these
    // blocks are only reachable through the label climb.
    fn block(home: &str, away: &str, odds: &str, folk: &str, value: &str) -> String {
        format!(
            r#"<div class="box">
                 <h3>{home} - {away}</h3>
                 <div><span>Odds</span> <span>{odds}</span></div>
                 <div><span>Svenska folket</span> <span>{folk}</span></div>
                 <div><span>Spelvärde</span> <span>{value}</span></div>
               </div>"#
        )
    }

    #[test]
    fn label_climb_finds_blocks() {
        let html = format!(
            "<html><body><div class=\"wrap\">{}{}</div></body></html>",
            block("Halmstad", "Sirius", "2,30 3,10 2,80", "41% 29% 30%", "0,12 -0,05 0,02"),
            block("Arsenal", "Chelsea", "1,95 3,45 3,60", "55% 25% 20%", "-0,10 0,00 0,15")
        );
        let records = parse_stryket(&html);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].home, "Halmstad");
        assert_eq!(records[0].folk_x, Some(29));
        assert_eq!(records[0].value_x, Some(-0.05));
        assert_eq!(records[1].match_nr, 2);
        assert_eq!(records[1].value_1, Some(-0.10));
    }

    #[test]
    fn generic_scan_handles_missing_label_nodes() {
        // Label text is glued to other content, so no text node matches the
        // exact label and the climb never starts.
        let html = r#"<html><body><div class="content"><div>
            Halmstad - Sirius Odds 2,30 3,10 2,80 Svenska folket 41% 29% 30%
        </div></div></body></html>"#;
        let records = parse_stryket(html);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].odds_1, Some(2.30));
        assert_eq!(records[0].folk_1, Some(41));
        assert_eq!(records[0].value_1, None);
    }

    #[test]
    fn table_rows_are_the_last_resort() {
        let html = r#"<html><body><table>
            <tr><td>Halmstad - Sirius</td><td>Odds 2,30 3,10 2,80</td></tr>
            <tr><td>ingen match här</td></tr>
        </table></body></html>"#;
        let records = parse_stryket(html);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].away, "Sirius");
        assert_eq!(records[0].folk_1, None);
    }

    #[test]
    fn identical_blocks_collapse_to_one() {
        let html = format!(
            "<html><body>{}{}</body></html>",
            block("Halmstad", "Sirius", "2,30 3,10 2,80", "41% 29% 30%", "0,12 -0,05 0,02"),
            block("Halmstad", "Sirius", "2,30 3,10 2,80", "41% 29% 30%", "0,12 -0,05 0,02")
        );
        assert_eq!(parse_stryket(&html).len(), 1);
    }

    #[test]
    fn fourteen_blocks_truncate_to_thirteen() {
        let mut body = String::new();
        for i in 0..14 {
            body.push_str(&block(
                &format!("Hemma{i}"),
                &format!("Borta{i}"),
                "2,30 3,10 2,80",
                "41% 29% 30%",
                "0,12 -0,05 0,02",
            ));
        }
        let records = parse_stryket(&format!("<html><body>{body}</body></html>"));
        assert_eq!(records.len(), 13);
        assert_eq!(records[12].match_nr, 13);
        assert_eq!(records[12].home, "Hemma12");
    }

    #[test]
    fn empty_document_yields_no_records() {
        assert!(parse_stryket("<html><body></body></html>").is_empty());
        assert!(parse_stryket("").is_empty());
    }
}
