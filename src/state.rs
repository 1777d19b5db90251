//! Canonical record types and the process-wide match store.
//!
//! The store is an explicitly constructed object handed to every operation
//! by reference. One internal mutex guards both collections, so a stats
//! upsert always observes a fully formed coupon and no operation is ever
//! partially applied.

use std::collections::BTreeMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

/// One coupon row. Every numeric field is optional: sources drop sections
/// without warning and a missing value is not an error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub match_nr: u8,
    pub home: String,
    pub away: String,
    pub odds_1: Option<f64>,
    pub odds_x: Option<f64>,
    pub odds_2: Option<f64>,
    /// "Svenska folket" public-pick percentages. May not sum to 100.
    pub folk_1: Option<u8>,
    pub folk_x: Option<u8>,
    pub folk_2: Option<u8>,
    /// "Spelvärde" value scores, signed.
    pub value_1: Option<f64>,
    pub value_x: Option<f64>,
    pub value_2: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormOutcome {
    Win,
    Draw,
    Loss,
}

impl FormOutcome {
    pub fn from_char(ch: char) -> Option<Self> {
        match ch {
            'W' | 'w' => Some(FormOutcome::Win),
            'D' | 'd' => Some(FormOutcome::Draw),
            'L' | 'l' => Some(FormOutcome::Loss),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            FormOutcome::Win => 'W',
            FormOutcome::Draw => 'D',
            FormOutcome::Loss => 'L',
        }
    }
}

/// A metric split by scope: all matches vs the team's own side of the pitch
/// (home scope for the home team, away scope for the away team).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScopedMetric {
    pub overall: Option<f64>,
    pub side: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamStats {
    pub name: String,
    pub xg: ScopedMetric,
    pub xga: ScopedMetric,
    pub ppg: ScopedMetric,
    /// Goals scored per match, overall.
    pub goals_for_avg: Option<f64>,
    /// Goals conceded per match, overall.
    pub goals_against_avg: Option<f64>,
    /// Most recent results first, at most five.
    pub form: Vec<FormOutcome>,
}

/// Win/draw/loss tally over the last five meetings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadToHead {
    pub wins: u8,
    pub draws: u8,
    pub losses: u8,
}

/// Auxiliary statistics for one coupon row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FootyRecord {
    pub home: TeamStats,
    pub away: TeamStats,
    pub h2h: Option<HeadToHead>,
    /// Verbatim head-to-head summary line from the page.
    pub h2h_text: Option<String>,
    /// Page the record was extracted from.
    pub source: Option<String>,
    /// Whether reconciliation flipped the source's home/away orientation.
    pub swapped: bool,
}

/// Atomic view of both collections.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StoreSnapshot {
    pub coupon: Vec<MatchRecord>,
    pub stats: BTreeMap<u8, FootyRecord>,
}

#[derive(Default)]
struct StoreInner {
    coupon: Vec<MatchRecord>,
    stats: BTreeMap<u8, FootyRecord>,
}

/// Shared match store. Callers hold `&MatchStore`; all access is serialized
/// by the internal lock.
#[derive(Default)]
pub struct MatchStore {
    inner: Mutex<StoreInner>,
}

impl MatchStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wholesale replace of the coupon list. Stats entries persist until an
    /// explicit [`MatchStore::reset`].
    pub fn replace_coupon(&self, records: Vec<MatchRecord>) {
        let mut inner = self.lock();
        inner.coupon = records;
    }

    /// Upsert the stats record for one match number. Returns `false` when
    /// the coupon holds no row with that number.
    pub fn upsert_stats(&self, match_nr: u8, record: FootyRecord) -> bool {
        let mut inner = self.lock();
        if !inner.coupon.iter().any(|r| r.match_nr == match_nr) {
            return false;
        }
        inner.stats.insert(match_nr, record);
        true
    }

    /// The coupon row with the given number, if present.
    pub fn coupon_record(&self, match_nr: u8) -> Option<MatchRecord> {
        self.lock()
            .coupon
            .iter()
            .find(|r| r.match_nr == match_nr)
            .cloned()
    }

    /// Clear both collections.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.coupon.clear();
        inner.stats.clear();
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        let inner = self.lock();
        StoreSnapshot {
            coupon: inner.coupon.clone(),
            stats: inner.stats.clone(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StoreInner> {
        self.inner.lock().expect("match store lock poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(nr: u8) -> MatchRecord {
        MatchRecord {
            match_nr: nr,
            home: format!("Home {nr}"),
            away: format!("Away {nr}"),
            ..MatchRecord::default()
        }
    }

    #[test]
    fn replace_is_wholesale() {
        let store = MatchStore::new();
        store.replace_coupon(vec![record(1), record(2)]);
        store.replace_coupon(vec![record(1)]);
        assert_eq!(store.snapshot().coupon.len(), 1);
    }

    #[test]
    fn upsert_requires_coupon_membership() {
        let store = MatchStore::new();
        store.replace_coupon(vec![record(1)]);
        assert!(store.upsert_stats(1, FootyRecord::default()));
        assert!(!store.upsert_stats(5, FootyRecord::default()));
        assert_eq!(store.snapshot().stats.len(), 1);
    }

    #[test]
    fn stats_persist_across_coupon_refresh() {
        let store = MatchStore::new();
        store.replace_coupon(vec![record(1)]);
        store.upsert_stats(1, FootyRecord::default());
        store.replace_coupon(vec![record(1), record(2)]);
        assert!(store.snapshot().stats.contains_key(&1));
    }

    #[test]
    fn reset_clears_both() {
        let store = MatchStore::new();
        store.replace_coupon(vec![record(1)]);
        store.upsert_stats(1, FootyRecord::default());
        store.reset();
        let snap = store.snapshot();
        assert!(snap.coupon.is_empty());
        assert!(snap.stats.is_empty());
    }
}
