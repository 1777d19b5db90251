use std::fs;
use std::path::PathBuf;

use strykanalys::coupon_fetch::parse_coupon;
use strykanalys::footy_fetch::parse_footy;
use strykanalys::state::FormOutcome;
use strykanalys::stryket_fetch::parse_stryket;

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

#[test]
fn stryket_fixture_yields_thirteen_rows() {
    let html = read_fixture("stryket_page.html");
    let records = parse_stryket(&html);

    // The page carries 13 match blocks plus a duplicate of the first one.
    assert_eq!(records.len(), 13);
    for (idx, record) in records.iter().enumerate() {
        assert_eq!(record.match_nr as usize, idx + 1);
    }
    let first_home_count = records
        .iter()
        .filter(|r| r.home == "Halmstads BK")
        .count();
    assert_eq!(first_home_count, 1);
}

#[test]
fn stryket_fixture_fields_land_in_document_order() {
    let html = read_fixture("stryket_page.html");
    let records = parse_stryket(&html);

    assert_eq!(records[0].home, "Halmstads BK");
    assert_eq!(records[0].away, "IK Sirius");
    assert_eq!(records[0].odds_1, Some(2.30));
    assert_eq!(records[0].folk_x, Some(29));
    assert_eq!(records[0].value_x, Some(-0.05));

    assert_eq!(records[1].home, "Arsenal");
    assert_eq!(records[1].value_1, Some(-0.10));

    assert_eq!(records[12].home, "Degerfors");
    assert_eq!(records[12].away, "Mjällby");
    assert_eq!(records[12].folk_2, Some(42));
}

#[test]
fn coupon_fixture_reads_class_markup() {
    let html = read_fixture("svenskaspel_kupong.html");
    let records = parse_coupon(&html);

    assert_eq!(records.len(), 13);
    assert_eq!(records[0].home, "Halmstads BK");
    assert_eq!(records[0].odds_1, Some(2.30));
    assert_eq!(records[0].odds_2, Some(2.80));
    // The coupon source does not carry public-pick or value figures.
    assert!(records.iter().all(|r| r.folk_1.is_none()));
    assert!(records.iter().all(|r| r.value_1.is_none()));
    assert_eq!(records[12].match_nr, 13);
    assert_eq!(records[12].away, "Mjällby");
}

#[test]
fn footy_fixture_builds_a_full_record() {
    let html = read_fixture("footy_match.html");
    let record = parse_footy(&html).expect("record");

    assert_eq!(record.home.name, "Wolverhampton Wanderers");
    assert_eq!(record.away.name, "Manchester City");

    assert_eq!(record.home.xg.side, Some(0.95));
    assert_eq!(record.home.xga.side, Some(1.85));
    assert_eq!(record.home.ppg.side, Some(0.9));
    assert_eq!(record.home.goals_for_avg, Some(1.1));
    assert_eq!(record.home.goals_against_avg, Some(2.0));

    assert_eq!(record.away.xg.side, Some(2.35));
    assert_eq!(record.away.ppg.overall, Some(2.6));

    assert_eq!(
        record.home.form,
        vec![
            FormOutcome::Loss,
            FormOutcome::Loss,
            FormOutcome::Draw,
            FormOutcome::Win,
            FormOutcome::Loss,
        ]
    );
    assert_eq!(record.away.form.len(), 5);
    assert_eq!(record.away.form[0], FormOutcome::Win);

    let h2h = record.h2h.expect("tally");
    assert_eq!((h2h.wins, h2h.draws, h2h.losses), (0, 1, 4));
    assert_eq!(record.h2h_text.as_deref(), Some("H:0 X:1 B:4"));
}

#[test]
fn extractors_return_nothing_on_foreign_pages() {
    let html = "<html><body><h1>Väderprognos</h1><p>Sol och 25 grader.</p></body></html>";
    assert!(parse_stryket(html).is_empty());
    assert!(parse_coupon(html).is_empty());
    assert!(parse_footy(html).is_none());
}
