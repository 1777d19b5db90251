//! Stryktipset analysis pipeline.
//!
//! Three third-party pages feed one in-memory store: the betting-coupon
//! site supplies the round's 13 matches, the odds-commentary site adds
//! public-pick and value figures, and the statistics site contributes
//! per-match team metrics keyed by match number. The store is projected
//! into a master spreadsheet template whose column layout is discovered
//! from its header row on every export.

pub mod coupon_fetch;
pub mod error;
pub mod excel_export;
pub mod extract;
pub mod fetch;
pub mod footy_fetch;
pub mod numeric;
pub mod ops;
pub mod sheet_layout;
pub mod state;
pub mod stryket_fetch;
pub mod team_names;
