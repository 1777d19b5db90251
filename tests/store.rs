use std::thread;

use strykanalys::state::{FootyRecord, MatchRecord, MatchStore, TeamStats};

fn coupon(count: u8) -> Vec<MatchRecord> {
    (1..=count)
        .map(|nr| MatchRecord {
            match_nr: nr,
            home: format!("Hemma {nr}"),
            away: format!("Borta {nr}"),
            ..MatchRecord::default()
        })
        .collect()
}

fn stats_for(team: &str) -> FootyRecord {
    FootyRecord {
        home: TeamStats {
            name: team.to_string(),
            ..TeamStats::default()
        },
        ..FootyRecord::default()
    }
}

#[test]
fn concurrent_upserts_land_independently() {
    let store = MatchStore::new();
    store.replace_coupon(coupon(13));

    thread::scope(|scope| {
        scope.spawn(|| assert!(store.upsert_stats(3, stats_for("Tre"))));
        scope.spawn(|| assert!(store.upsert_stats(7, stats_for("Sju"))));
    });

    let snapshot = store.snapshot();
    assert_eq!(snapshot.stats.len(), 2);
    assert_eq!(snapshot.stats.get(&3).map(|r| r.home.name.as_str()), Some("Tre"));
    assert_eq!(snapshot.stats.get(&7).map(|r| r.home.name.as_str()), Some("Sju"));
}

#[test]
fn snapshot_is_atomic_under_concurrent_replace() {
    let store = MatchStore::new();
    store.replace_coupon(coupon(13));

    thread::scope(|scope| {
        scope.spawn(|| {
            for _ in 0..50 {
                store.replace_coupon(coupon(13));
            }
        });
        scope.spawn(|| {
            for _ in 0..50 {
                // A snapshot observes either the old or the new list as a
                // whole, never a partial replace.
                let snap = store.snapshot();
                assert_eq!(snap.coupon.len(), 13);
            }
        });
    });
}

#[test]
fn upsert_against_replaced_coupon_is_not_found() {
    let store = MatchStore::new();
    store.replace_coupon(coupon(13));
    store.replace_coupon(coupon(5));
    assert!(!store.upsert_stats(9, stats_for("Nio")));
    assert!(store.upsert_stats(5, stats_for("Fem")));
}
