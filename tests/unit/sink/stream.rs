use super::*;
use crate::assets::store::PreparedImage;
use crate::fog::raster::FogRaster;
use crate::foundation::core::Point;
use crate::scene::item::{DEFAULT_TOKEN_BORDER, Marker, Token};
use crate::viewport::mapper::Viewport;

fn snapshot() -> DocumentSnapshot {
    let token = SceneItem::new(
        Point::new(10.0, 20.0),
        ItemKind::Token(Token {
            entity_type: "NPCs".into(),
            entity_id: "Goblin".into(),
            image_path: String::new(),
            size: 40.0,
            border_color: DEFAULT_TOKEN_BORDER,
            hp: 3,
            max_hp: 7,
        }),
    )
    .unwrap();
    let marker = SceneItem::new(Point::new(0.0, 0.0), ItemKind::Marker(Marker::new("trap"))).unwrap();
    DocumentSnapshot {
        name: "Cave".into(),
        base: Arc::new(PreparedImage::solid(300, 200, [255, 255, 255, 255])),
        fog: FogRaster::occluded(300, 200),
        items: Arc::new(vec![marker, token]),
        viewport: Viewport::new(160, 120).with_zoom(2.0),
        revision: 7,
    }
}

#[test]
fn status_report_skips_markers() {
    let report = StatusReport::from_snapshot(&snapshot(), 200);
    assert_eq!(report.name, "Cave");
    assert_eq!(report.revision, 7);
    assert_eq!((report.map_width, report.map_height), (300, 200));
    assert_eq!((report.render_width, report.render_height), (160, 120));
    assert_eq!(report.zoom, 2.0);
    assert_eq!(report.items.len(), 1);
    let item = &report.items[0];
    assert_eq!(item.kind, "token");
    assert_eq!((item.x, item.y, item.width), (10.0, 20.0, 40.0));
    assert_eq!(item.label.as_deref(), Some("Goblin"));

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["refresh_ms"], 200);
    assert!(json["items"][0].get("label").is_some());
}

#[test]
fn multipart_part_frames_jpeg_bytes() {
    let part = multipart_part(&[1, 2, 3]);
    let text = String::from_utf8_lossy(&part);
    assert!(text.starts_with("--frame\r\nContent-Type: image/jpeg\r\nContent-Length: 3\r\n\r\n"));
    assert!(part.ends_with(&[1, 2, 3, b'\r', b'\n']));
}

#[test]
fn viewer_page_refreshes_at_interval() {
    let html = viewer_page(250);
    assert!(html.contains("src=\"/frame\""));
    assert!(html.contains("}, 250);"));
}

#[test]
fn snapshot_cell_publishes_latest() {
    let cell = SnapshotCell::default();
    assert_eq!(cell.load().revision, 0);
    let reader = cell.clone();
    cell.publish(Arc::new(snapshot()));
    assert_eq!(reader.load().name, "Cave");
}

fn solid_snapshot(name: &str, rgba: [u8; 4]) -> Arc<DocumentSnapshot> {
    Arc::new(DocumentSnapshot {
        name: name.into(),
        base: Arc::new(PreparedImage::solid(40, 30, rgba)),
        fog: FogRaster::new(40, 30, 0),
        items: Arc::new(Vec::new()),
        viewport: Viewport::new(40, 30),
        revision: 0,
    })
}

fn center_rgb(jpeg: &[u8]) -> [u8; 3] {
    let img = image::load_from_memory(jpeg).unwrap().to_rgb8();
    img.get_pixel(img.width() / 2, img.height() / 2).0
}

#[test]
fn jpeg_follows_newly_published_map_at_same_revision() {
    let cell = SnapshotCell::new(DocumentSnapshot::empty());
    let state = StreamState {
        cell: cell.clone(),
        compositor: Mutex::new(Compositor::new(Arc::new(AssetStore::new(std::env::temp_dir())))),
        last_jpeg: Mutex::new(None),
        opts: StreamOpts::default(),
    };

    cell.publish(solid_snapshot("alpha", [0, 200, 0, 255]));
    let first = state.jpeg().unwrap();
    let [r, g, _] = center_rgb(&first);
    assert!(g > 150 && r < 60, "alpha frame {r},{g}");
    assert_eq!(state.jpeg().unwrap(), first);

    cell.publish(solid_snapshot("beta", [200, 0, 0, 255]));
    let [r, g, _] = center_rgb(&state.jpeg().unwrap());
    assert!(r > 150 && g < 60, "beta frame {r},{g}");
}
