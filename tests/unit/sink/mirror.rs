use super::*;
use crate::assets::store::PreparedImage;
use crate::fog::raster::FogRaster;
use crate::foundation::core::Point;
use crate::scene::item::{ItemKind, Marker, SceneItem};
use crate::viewport::mapper::Viewport;

fn snap(revision: u64, fog_alpha: u8, items: Vec<SceneItem>) -> Arc<DocumentSnapshot> {
    Arc::new(DocumentSnapshot {
        name: "m".into(),
        base: Arc::new(PreparedImage::solid(64, 48, [255, 255, 255, 255])),
        fog: FogRaster::new(64, 48, fog_alpha),
        items: Arc::new(items),
        viewport: Viewport::new(64, 48),
        revision,
    })
}

fn mirror() -> MirrorSink {
    MirrorSink::new(Arc::new(AssetStore::new(std::env::temp_dir())))
}

#[test]
fn any_fog_is_opaque_for_players() {
    let mut m = mirror();
    m.refresh(&snap(1, 40, Vec::new()), Redraw::Full, &Decorations::default())
        .unwrap();
    let f = m.frame().unwrap();
    assert_eq!(f.fog_alpha_at(3, 3), Some(255));
    assert_eq!(f.pixel(3, 3), Some([0, 0, 0, 255]));
}

#[test]
fn markers_are_hidden_from_players() {
    let marker = SceneItem::new(Point::new(2.0, 2.0), ItemKind::Marker(Marker::new("secret")))
        .unwrap();
    let mut m = mirror();
    m.refresh(&snap(1, 0, vec![marker]), Redraw::Full, &Decorations::default())
        .unwrap();
    let f = m.frame().unwrap();
    for (x, y) in [(2, 2), (10, 2), (2, 10), (30, 20)] {
        assert_eq!(f.pixel(x, y), Some([255, 255, 255, 255]), "({x},{y})");
    }
}

#[test]
fn overlay_changes_skip_recompose_at_same_revision() {
    let mut m = mirror();
    let d = Decorations::default();
    m.refresh(&snap(1, 0, Vec::new()), Redraw::Full, &d).unwrap();
    m.refresh(&snap(1, 255, Vec::new()), Redraw::Overlay, &d)
        .unwrap();
    assert_eq!(m.frame().unwrap().fog_alpha_at(1, 1), Some(0));

    m.refresh(&snap(2, 255, Vec::new()), Redraw::Overlay, &d)
        .unwrap();
    assert_eq!(m.frame().unwrap().fog_alpha_at(1, 1), Some(255));
    assert_eq!(m.name(), "mirror");
}
