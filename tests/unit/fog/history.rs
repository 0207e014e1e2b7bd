use super::*;

#[test]
fn budget_follows_pixel_count_within_bounds() {
    assert_eq!(history_budget_bytes(100), 4 * 1024 * 1024);
    assert_eq!(history_budget_bytes(10_000_000), 10_000_000);
    assert_eq!(history_budget_bytes(100_000_000), 24 * 1024 * 1024);
}

#[test]
fn pop_is_lifo() {
    let mut h = FogHistory::with_budget(usize::MAX);
    h.push(FogHistoryEntry::capture(&FogRaster::new(4, 4, 1)).unwrap());
    h.push(FogHistoryEntry::capture(&FogRaster::new(4, 4, 2)).unwrap());
    assert_eq!(h.pop().unwrap().restore().unwrap().alpha_at(0, 0), Some(2));
    assert_eq!(h.pop().unwrap().restore().unwrap().alpha_at(0, 0), Some(1));
    assert!(h.pop().is_none());
    assert_eq!(h.total_bytes(), 0);
}

#[test]
fn oldest_entries_are_evicted_past_budget() {
    let one = FogHistoryEntry::capture(&FogRaster::new(16, 16, 9)).unwrap();
    let per = one.byte_len();
    let mut h = FogHistory::with_budget(per * 2);
    for v in 0..5u8 {
        h.push(FogHistoryEntry::capture(&FogRaster::new(16, 16, v)).unwrap());
    }
    assert!(h.total_bytes() <= per * 2);
    assert!(h.len() <= 2);
    assert_eq!(h.pop().unwrap().restore().unwrap().alpha_at(0, 0), Some(4));
}

#[test]
fn newest_entry_survives_tiny_budget() {
    let mut h = FogHistory::with_budget(1);
    h.push(FogHistoryEntry::capture(&FogRaster::new(4, 4, 3)).unwrap());
    assert_eq!(h.len(), 1);
}
