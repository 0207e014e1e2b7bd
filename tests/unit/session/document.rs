use super::*;
use crate::fog::engine::FogMode;
use crate::fog::brush::BrushShape;
use crate::foundation::core::Point;
use crate::scene::item::{ItemKind, Marker};

fn write_png(path: &std::path::Path, w: u32, h: u32) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    image::RgbaImage::from_pixel(w, h, image::Rgba([50, 60, 70, 255]))
        .save(path)
        .unwrap();
}

#[test]
fn missing_assets_open_with_placeholder_and_no_items() {
    let dir = tempfile::tempdir().unwrap();
    let assets = AssetStore::new(dir.path());
    let mut rec = MapRecord::new("Lost", "maps/none.png");
    rec.tokens = "{broken".into();
    let doc = MapDocument::open(&rec, &assets, (800, 600));
    assert_eq!(doc.map_size(), PLACEHOLDER_MAP_SIZE);
    assert_eq!(doc.fog.raster().dimensions(), PLACEHOLDER_MAP_SIZE);
    assert!(doc.store.is_empty());
}

#[test]
fn mismatched_mask_is_resized_on_open() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir.path().join("maps/cave.png"), 40, 30);
    std::fs::create_dir_all(dir.path().join("masks")).unwrap();
    let mask = FogRaster::new(20, 15, 0).encode_mask_png().unwrap();
    std::fs::write(dir.path().join("masks/cave_mask.png"), mask).unwrap();

    let assets = AssetStore::new(dir.path());
    let mut rec = MapRecord::new("Cave", "maps/cave.png");
    rec.fog_mask_path = "masks/cave_mask.png".into();
    rec.zoom = 2.0;
    rec.pan_x = 5.0;
    let doc = MapDocument::open(&rec, &assets, (100, 100));
    assert_eq!(doc.fog.raster().dimensions(), (40, 30));
    assert_eq!(doc.fog.raster().alpha_at(39, 29), Some(0));
    assert_eq!(doc.viewport.zoom(), 2.0);
    assert_eq!(doc.viewport.pan().x, 5.0);
}

#[test]
fn record_reflects_items_and_viewport() {
    let base = Arc::new(PreparedImage::placeholder(10, 10));
    let mut doc = MapDocument::new("A", "maps/a.png", base);
    doc.store.insert(
        SceneItem::new(Point::new(1.0, 2.0), ItemKind::Marker(Marker::new("door"))).unwrap(),
    );
    doc.viewport.set_zoom(1.5);
    let rec = doc.to_record().unwrap();
    assert_eq!(rec.fog_mask_path, "masks/a_mask.png");
    assert_eq!(rec.zoom, 1.5);
    let items = crate::scene::record::items_from_json(&rec.tokens).unwrap();
    assert_eq!(items.len(), 1);
}

#[test]
fn snapshot_is_isolated_from_later_edits() {
    let base = Arc::new(PreparedImage::placeholder(64, 64));
    let mut doc = MapDocument::new("A", "a.png", base);
    let snap = doc.snapshot();
    doc.fog
        .paint(Point::new(32.0, 32.0), 16, BrushShape::Circle, FogMode::Remove)
        .unwrap();
    doc.store.insert(
        SceneItem::new(Point::new(0.0, 0.0), ItemKind::Marker(Marker::new("x"))).unwrap(),
    );
    assert_eq!(snap.fog.alpha_at(32, 32), Some(128));
    assert!(snap.items.is_empty());
    assert_eq!(doc.fog.raster().alpha_at(32, 32), Some(0));
}

#[test]
fn recorded_mask_path_flows_into_record() {
    let dir = tempfile::tempdir().unwrap();
    let assets = AssetStore::new(dir.path());
    let mut doc = MapDocument::open(&MapRecord::new("Hall", "maps/hall.png"), &assets, (64, 64));
    assert_eq!(doc.saved_fog_mask_path(), None);
    assert_eq!(doc.to_record().unwrap().fog_mask_path, "masks/hall_mask.png");

    doc.set_fog_mask_path("masks/custom.png");
    assert_eq!(doc.saved_fog_mask_path(), Some("masks/custom.png"));
    assert_eq!(doc.to_record().unwrap().fog_mask_path, "masks/custom.png");
}
