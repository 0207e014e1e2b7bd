use super::*;
use crate::foundation::core::Point;
use crate::scene::item::{
    DEFAULT_SHAPE_BORDER, DEFAULT_SHAPE_FILL, DEFAULT_TOKEN_BORDER, Marker, SceneItem, ShapeItem,
    Token,
};
use crate::scene::store::SceneChange;

fn store_with_shape_and_token() -> (SceneStore, ItemId, ItemId) {
    let mut store = SceneStore::new();
    let shape = store.insert(
        SceneItem::new(
            Point::new(0.0, 0.0),
            ItemKind::Rectangle(ShapeItem::new(DEFAULT_SHAPE_FILL, true, DEFAULT_SHAPE_BORDER)),
        )
        .unwrap(),
    );
    let token = store.insert(
        SceneItem::new(
            Point::new(5.0, 5.0),
            ItemKind::Token(Token {
                entity_type: "NPCs".into(),
                entity_id: "Orc".into(),
                image_path: String::new(),
                size: 48.0,
                border_color: DEFAULT_TOKEN_BORDER,
                hp: 10,
                max_hp: 10,
            }),
        )
        .unwrap(),
    );
    store.drain_changes();
    (store, shape, token)
}

#[test]
fn toggle_fill_keeps_color() {
    let (mut store, shape, _) = store_with_shape_and_token();
    assert!(apply_edit(&mut store, shape, ItemEdit::ToggleFill).unwrap());
    let s = store.get(shape).unwrap().shape().unwrap().clone();
    assert_eq!(s.fill(), None);
    apply_edit(&mut store, shape, ItemEdit::ToggleFill).unwrap();
    assert_eq!(
        store.get(shape).unwrap().shape().unwrap().fill(),
        Some(DEFAULT_SHAPE_FILL)
    );
}

#[test]
fn edits_that_do_not_apply_are_ignored() {
    let (mut store, shape, token) = store_with_shape_and_token();
    assert!(!apply_edit(&mut store, token, ItemEdit::ToggleFill).unwrap());
    assert!(!apply_edit(&mut store, shape, ItemEdit::Hp { hp: 1, max_hp: 2 }).unwrap());
    assert!(!apply_edit(&mut store, ItemId(999), ItemEdit::ToggleFill).unwrap());
    assert!(store.drain_changes().is_empty());
}

#[test]
fn hp_is_capped_and_size_validated() {
    let (mut store, _, token) = store_with_shape_and_token();
    apply_edit(&mut store, token, ItemEdit::Hp { hp: 30, max_hp: 12 }).unwrap();
    let ItemKind::Token(t) = &store.get(token).unwrap().kind else {
        panic!("token expected");
    };
    assert_eq!((t.hp, t.max_hp), (12, 12));

    assert!(apply_edit(&mut store, token, ItemEdit::TokenSize(f64::NAN)).is_err());
    apply_edit(&mut store, token, ItemEdit::TokenSize(96.0)).unwrap();
    assert_eq!(store.get(token).unwrap().bounding_box().width(), 96.0);
    assert!(store.drain_changes().contains(&SceneChange::Resized(token)));
}

#[test]
fn marker_link_blank_clears() {
    let mut store = SceneStore::new();
    let m = store.insert(
        SceneItem::new(Point::new(0.0, 0.0), ItemKind::Marker(Marker::new("door"))).unwrap(),
    );
    apply_edit(&mut store, m, ItemEdit::LinkedMap(Some("Crypt".into()))).unwrap();
    apply_edit(&mut store, m, ItemEdit::MarkerText("gate".into())).unwrap();
    let ItemKind::Marker(mk) = &store.get(m).unwrap().kind else {
        panic!("marker expected");
    };
    assert_eq!(mk.linked_map.as_deref(), Some("Crypt"));
    assert_eq!(mk.text, "gate");
    apply_edit(&mut store, m, ItemEdit::LinkedMap(Some("  ".into()))).unwrap();
    let ItemKind::Marker(mk) = &store.get(m).unwrap().kind else {
        panic!("marker expected");
    };
    assert_eq!(mk.linked_map, None);
}
