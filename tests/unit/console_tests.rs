//! Unit tests for severity levels and their wire mapping.

use sbtc::console::Level;

// ── Wire mapping ────────────────────────────────────────────────────────

#[test]
fn wire_codes_map_to_severity_levels() {
    assert_eq!(Level::from_wire(1), Some(Level::Error));
    assert_eq!(Level::from_wire(2), Some(Level::Warning));
    assert_eq!(Level::from_wire(3), Some(Level::Info));
    assert_eq!(Level::from_wire(4), Some(Level::Debug));
}

#[test]
fn out_of_table_codes_map_to_none() {
    assert_eq!(Level::from_wire(0), None);
    assert_eq!(Level::from_wire(5), None);
    assert_eq!(Level::from_wire(u64::MAX), None);
}

// ── Rendering ───────────────────────────────────────────────────────────

#[test]
fn labels_are_lowercase_log_names() {
    assert_eq!(Level::Error.label(), "error");
    assert_eq!(Level::Warning.label(), "warn");
    assert_eq!(Level::Info.label(), "info");
    assert_eq!(Level::Debug.label(), "debug");
}

#[test]
fn display_matches_the_label() {
    for level in [Level::Error, Level::Warning, Level::Info, Level::Debug] {
        assert_eq!(level.to_string(), level.label());
    }
}
