use super::*;

fn ids(n: u64) -> Vec<ItemId> {
    (0..n).map(ItemId).collect()
}

#[test]
fn plain_click_replaces_and_sole_click_defers_clear() {
    let mut sel = Selection::new();
    assert_eq!(sel.press_item(ItemId(1), Modifiers::NONE), None);
    assert_eq!(sel.ids(), &[ItemId(1)]);

    let deferred = sel.press_item(ItemId(1), Modifiers::NONE);
    assert_eq!(deferred, Some(DeferredClick::Clear));
    assert_eq!(sel.ids(), &[ItemId(1)]);
    sel.resolve_deferred(DeferredClick::Clear);
    assert!(sel.is_empty());
}

#[test]
fn shift_appends_once_and_ctrl_toggles() {
    let mut sel = Selection::new();
    sel.press_item(ItemId(1), Modifiers::NONE);
    sel.press_item(ItemId(2), Modifiers::SHIFT);
    sel.press_item(ItemId(2), Modifiers::SHIFT);
    assert_eq!(sel.ids(), &[ItemId(1), ItemId(2)]);

    sel.press_item(ItemId(1), Modifiers::CTRL);
    assert_eq!(sel.ids(), &[ItemId(2)]);
    sel.press_item(ItemId(1), Modifiers::CTRL);
    assert_eq!(sel.ids(), &[ItemId(2), ItemId(1)]);
}

#[test]
fn press_on_group_member_keeps_group_until_release() {
    let mut sel = Selection::new();
    sel.replace(ids(3));
    let d = sel.press_item(ItemId(1), Modifiers::NONE);
    assert_eq!(sel.len(), 3);
    sel.resolve_deferred(d.unwrap());
    assert_eq!(sel.ids(), &[ItemId(1)]);
}

#[test]
fn marquee_union_is_superset_and_subtract_is_disjoint() {
    let hits = vec![ItemId(2), ItemId(3)];

    let mut sel = Selection::new();
    sel.replace([ItemId(1), ItemId(2)]);
    let before = sel.clone();
    sel.merge_marquee(&hits, MarqueeMerge::from_modifiers(Modifiers::SHIFT));
    assert!(before.ids().iter().all(|id| sel.contains(*id)));
    assert!(hits.iter().all(|id| sel.contains(*id)));
    assert_eq!(sel.len(), 3);

    let mut sel = before.clone();
    sel.merge_marquee(&hits, MarqueeMerge::from_modifiers(Modifiers::CTRL));
    assert!(hits.iter().all(|id| !sel.contains(*id)));
    assert_eq!(sel.ids(), &[ItemId(1)]);

    let mut sel = before;
    sel.merge_marquee(&hits, MarqueeMerge::from_modifiers(Modifiers::NONE));
    assert_eq!(sel.ids(), hits.as_slice());
}

#[test]
fn replace_deduplicates_and_keeps_order() {
    let mut sel = Selection::new();
    sel.replace([ItemId(3), ItemId(1), ItemId(3)]);
    assert_eq!(sel.ids(), &[ItemId(3), ItemId(1)]);
}

#[test]
fn graphical_edit_follows_sole_selection() {
    let mut sel = Selection::new();
    sel.begin_graphical_edit(ItemId(4));
    assert_eq!(sel.sole(), Some(ItemId(4)));
    sel.replace([ItemId(5)]);
    assert_eq!(sel.graphical_edit(), None);

    sel.begin_graphical_edit(ItemId(4));
    sel.remove(ItemId(4));
    assert_eq!(sel.graphical_edit(), None);
}

#[test]
fn retain_existing_drops_deleted_items() {
    let mut store = SceneStore::new();
    let a = store.insert(
        crate::scene::item::SceneItem::new(
            crate::foundation::core::Point::new(0.0, 0.0),
            crate::scene::item::ItemKind::Marker(crate::scene::item::Marker::new("a")),
        )
        .unwrap(),
    );
    let mut sel = Selection::new();
    sel.replace([a, ItemId(99)]);
    sel.retain_existing(&store);
    assert_eq!(sel.ids(), &[a]);
}
