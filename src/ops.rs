//! Operation facade over one shared [`MatchStore`].
//!
//! Every operation returns a serializable payload with an `ok` flag and a
//! human-readable `error` on failure, never a panic. Fetch operations are
//! the only blocking ones; extraction, reconciliation and export run to
//! completion once document bytes are available.

use std::path::Path;

use anyhow::Result;
use serde::Serialize;

use crate::coupon_fetch;
use crate::error::PipelineError;
use crate::excel_export::{self, ExportReport};
use crate::fetch::FetchOptions;
use crate::footy_fetch;
use crate::sheet_layout::LayoutPolicy;
use crate::state::{MatchStore, StoreSnapshot};
use crate::stryket_fetch;
use crate::team_names;

/// Payload shape shared by the refresh operations.
#[derive(Debug, Serialize)]
pub struct OpPayload {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matchnr: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub swapped: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_html_len: Option<usize>,
}

impl OpPayload {
    fn ok() -> Self {
        Self {
            ok: true,
            count: None,
            matchnr: None,
            swapped: None,
            error: None,
            debug_html_len: None,
        }
    }

    fn failed(reason: String) -> Self {
        Self {
            ok: false,
            error: Some(reason),
            ..Self::ok()
        }
    }
}

/// Replace the coupon from the betting-coupon site.
pub fn refresh_coupon(store: &MatchStore, url: &str, opts: &FetchOptions) -> OpPayload {
    match coupon_fetch::fetch_coupon(url, opts) {
        Ok(fetched) => {
            let count = fetched.records.len();
            store.replace_coupon(fetched.records);
            OpPayload {
                count: Some(count),
                debug_html_len: opts.debug.then_some(fetched.raw_len),
                ..OpPayload::ok()
            }
        }
        Err(err) => OpPayload::failed(err.to_string()),
    }
}

/// Replace the coupon from the odds-commentary site, which also carries
/// public-pick and value figures.
pub fn refresh_stryket(store: &MatchStore, url: &str, opts: &FetchOptions) -> OpPayload {
    match stryket_fetch::fetch_stryket(url, opts) {
        Ok(fetched) => {
            let count = fetched.records.len();
            store.replace_coupon(fetched.records);
            OpPayload {
                count: Some(count),
                debug_html_len: opts.debug.then_some(fetched.raw_len),
                ..OpPayload::ok()
            }
        }
        Err(err) => OpPayload::failed(err.to_string()),
    }
}

/// Fetch statistics for one coupon row and upsert them, reconciling the
/// source's home/away orientation against the coupon.
pub fn refresh_footy(store: &MatchStore, match_nr: u8, url: &str, opts: &FetchOptions) -> OpPayload {
    if !(1..=13).contains(&match_nr) {
        return OpPayload {
            matchnr: Some(match_nr),
            ..OpPayload::failed("matchnr måste vara 1..13".to_string())
        };
    }

    let Some(coupon_row) = store.coupon_record(match_nr) else {
        return OpPayload {
            matchnr: Some(match_nr),
            ..OpPayload::failed(PipelineError::MatchNotFound(match_nr).to_string())
        };
    };

    let fetched = match footy_fetch::fetch_footy(url, opts) {
        Ok(fetched) => fetched,
        Err(err) => {
            return OpPayload {
                matchnr: Some(match_nr),
                ..OpPayload::failed(err.to_string())
            };
        }
    };

    let mut record = fetched.record;
    let oriented = team_names::reconcile(
        &record.home.name,
        &record.away.name,
        &coupon_row.home,
        &coupon_row.away,
    );
    if oriented.swapped {
        std::mem::swap(&mut record.home, &mut record.away);
    }
    record.swapped = oriented.swapped;

    if !store.upsert_stats(match_nr, record) {
        // The coupon was replaced between the lookup and the upsert.
        return OpPayload {
            matchnr: Some(match_nr),
            ..OpPayload::failed(PipelineError::MatchNotFound(match_nr).to_string())
        };
    }

    OpPayload {
        matchnr: Some(match_nr),
        swapped: Some(oriented.swapped),
        debug_html_len: opts.debug.then_some(fetched.raw_len),
        ..OpPayload::ok()
    }
}

/// Project both collections into a filled copy of the template.
pub fn export(
    store: &MatchStore,
    template_path: &Path,
    policy: LayoutPolicy,
) -> Result<(Vec<u8>, ExportReport)> {
    let snapshot = store.snapshot();
    excel_export::export_workbook(template_path, &snapshot, policy)
}

/// Clear both collections.
pub fn reset(store: &MatchStore) -> OpPayload {
    store.reset();
    OpPayload::ok()
}

/// Verbatim view of both collections, for operational inspection.
pub fn debug_state(store: &MatchStore) -> StoreSnapshot {
    store.snapshot()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn footy_rejects_out_of_range_match_number() {
        let store = MatchStore::new();
        let payload = refresh_footy(&store, 14, "https://example.test", &FetchOptions::default());
        assert!(!payload.ok);
        assert_eq!(payload.matchnr, Some(14));
    }

    #[test]
    fn footy_requires_a_coupon_row() {
        let store = MatchStore::new();
        let payload = refresh_footy(&store, 3, "https://example.test", &FetchOptions::default());
        assert!(!payload.ok);
        assert!(payload.error.as_deref().unwrap_or_default().contains("3"));
    }

    #[test]
    fn reset_acknowledges() {
        let store = MatchStore::new();
        let payload = reset(&store);
        assert!(payload.ok);
        assert!(payload.error.is_none());
    }
}
