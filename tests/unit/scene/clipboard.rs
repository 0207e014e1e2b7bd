use super::*;
use crate::foundation::core::Color;
use crate::scene::item::{ItemKind, ShapeItem, TextAnnotation};

fn rect_at(x: f64, y: f64) -> SceneItem {
    SceneItem::new(
        Point::new(x, y),
        ItemKind::Rectangle(ShapeItem::new(Color::WHITE, true, Color::BLACK)),
    )
    .unwrap()
}

#[test]
fn paste_preserves_pairwise_offsets() {
    let mut store = SceneStore::new();
    let a = store.insert(rect_at(10.0, 10.0));
    let b = store.insert(rect_at(40.0, 25.0));
    let c = store.insert(
        SceneItem::new(
            Point::new(-5.0, 100.0),
            ItemKind::TextAnnotation(TextAnnotation {
                text: "x".into(),
                color: Color::WHITE,
                size: 12.0,
            }),
        )
        .unwrap(),
    );
    let originals = [a, b, c];

    let mut clip = Clipboard::new();
    assert_eq!(clip.copy(&store, &originals), 3);
    let pasted = clip.paste(&mut store, Point::new(500.0, 400.0));
    assert_eq!(pasted.len(), 3);
    assert_eq!(store.len(), 6);
    assert_eq!(store.get(pasted[0]).unwrap().position(), Point::new(500.0, 400.0));

    for i in 0..3 {
        for j in 0..3 {
            let orig = store.get(originals[j]).unwrap().position()
                - store.get(originals[i]).unwrap().position();
            let new = store.get(pasted[j]).unwrap().position()
                - store.get(pasted[i]).unwrap().position();
            assert!((orig - new).hypot() < 1e-9);
        }
    }
    assert_eq!(
        store.get(pasted[2]).unwrap().kind,
        store.get(c).unwrap().kind
    );
}

#[test]
fn copying_nothing_keeps_previous_clipboard() {
    let mut store = SceneStore::new();
    let a = store.insert(rect_at(0.0, 0.0));
    let mut clip = Clipboard::new();
    clip.copy(&store, &[a]);
    assert_eq!(clip.copy(&store, &[ItemId(999)]), 0);
    assert_eq!(clip.len(), 1);
}
