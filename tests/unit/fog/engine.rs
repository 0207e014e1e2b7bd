use super::*;

fn max_abs_diff(a: &FogRaster, b: &FogRaster) -> u8 {
    a.alpha()
        .iter()
        .zip(b.alpha())
        .map(|(x, y)| x.abs_diff(*y))
        .max()
        .unwrap_or(0)
}

#[test]
fn remove_circle_reveals_center_only() {
    let mut fog = FogEngine::new(1000, 800);
    let touched = fog
        .paint(
            Point::new(100.0, 100.0),
            64,
            BrushShape::Circle,
            FogMode::Remove,
        )
        .unwrap()
        .unwrap();
    assert_eq!(touched.x0, 68);
    assert_eq!(fog.raster().alpha_at(100, 100), Some(0));
    assert_eq!(fog.raster().alpha_at(300, 100), Some(DEFAULT_FOG_ALPHA));
}

#[test]
fn paint_then_erase_restores_within_rounding() {
    for shape in [BrushShape::Rectangle, BrushShape::Circle, BrushShape::Cloud] {
        for start in [0u8, DEFAULT_FOG_ALPHA] {
            let mut fog = FogEngine::with_raster(FogRaster::new(200, 150, start));
            let before = fog.snapshot();
            let stroke = [(20.0, 30.0), (24.0, 31.0), (60.0, 70.0), (199.0, 149.0)];
            for &(x, y) in &stroke {
                fog.paint(Point::new(x, y), 40, shape, FogMode::Add).unwrap();
            }
            for &(x, y) in stroke.iter().rev() {
                fog.paint(Point::new(x, y), 40, shape, FogMode::Remove)
                    .unwrap();
            }
            let diff = max_abs_diff(fog.raster(), &before);
            if start == 0 {
                assert_eq!(diff, 0, "{shape:?}");
            } else {
                assert!(diff <= 128, "{shape:?} diff={diff}");
                assert!(fog.raster().alpha_at(150, 10) == Some(start));
            }
        }
    }
}

#[test]
fn single_dab_paint_erase_is_exact_when_unsaturated() {
    let mut fog = FogEngine::with_raster(FogRaster::new(64, 64, 100));
    let before = fog.snapshot();
    fog.paint(Point::new(32.0, 32.0), 32, BrushShape::Circle, FogMode::Add)
        .unwrap();
    assert!(fog.raster().alpha_at(32, 32).unwrap() > 100);
    fog.paint(Point::new(32.0, 32.0), 32, BrushShape::Circle, FogMode::Remove)
        .unwrap();
    assert_eq!(fog.raster(), &before);
}

#[test]
fn stamp_outside_raster_is_ignored() {
    let mut fog = FogEngine::new(50, 50);
    let r = fog
        .paint(
            Point::new(-500.0, 10.0),
            32,
            BrushShape::Rectangle,
            FogMode::Remove,
        )
        .unwrap();
    assert!(r.is_none());
    assert!(fog.paint(Point::new(f64::NAN, 0.0), 32, BrushShape::Circle, FogMode::Add).is_err());
}

#[test]
fn push_push_undo_undo_restores_exactly() {
    let mut fog = FogEngine::new(120, 90);
    let original = fog.snapshot();
    fog.push_history().unwrap();
    fog.paint(Point::new(40.0, 40.0), 48, BrushShape::Cloud, FogMode::Remove)
        .unwrap();
    let middle = fog.snapshot();
    fog.push_history().unwrap();
    fog.paint(Point::new(80.0, 60.0), 48, BrushShape::Rectangle, FogMode::Remove)
        .unwrap();

    assert!(fog.undo().unwrap());
    assert_eq!(fog.raster(), &middle);
    assert!(fog.undo().unwrap());
    assert_eq!(fog.raster(), &original);
    assert!(!fog.undo().unwrap());
}

#[test]
fn gesture_pushes_history_once() {
    let mut fog = FogEngine::new(64, 64);
    fog.begin_gesture().unwrap();
    fog.begin_gesture().unwrap();
    fog.paint(Point::new(10.0, 10.0), 8, BrushShape::Circle, FogMode::Remove)
        .unwrap();
    fog.end_gesture();
    assert_eq!(fog.history().len(), 1);
    fog.begin_gesture().unwrap();
    assert_eq!(fog.history().len(), 2);
    fog.undo().unwrap();
    assert!(!fog.gesture_active());
}

#[test]
fn fill_rect_is_hard_edged_and_clipped() {
    let mut fog = FogEngine::new(20, 20);
    fog.clear();
    let r = fog
        .fill_rect(Rect::new(15.0, 15.0, 5.5, 30.0), FogMode::Add)
        .unwrap();
    assert_eq!((r.x0, r.y0, r.x1, r.y1), (5, 15, 15, 20));
    assert_eq!(fog.raster().alpha_at(5, 19), Some(DEFAULT_FOG_ALPHA));
    assert_eq!(fog.raster().alpha_at(4, 19), Some(0));
    fog.fill_rect(Rect::new(0.0, 0.0, 20.0, 20.0), FogMode::Remove);
    assert!(fog.raster().alpha().iter().all(|&a| a == 0));
    assert!(fog.fill_rect(Rect::new(30.0, 30.0, 40.0, 40.0), FogMode::Add).is_none());
}

#[test]
fn fill_rect_with_history_skips_empty_rects() {
    let mut fog = FogEngine::new(20, 20);
    let empty = fog
        .fill_rect_with_history(Rect::new(8.0, 8.0, 8.0, 12.0), FogMode::Remove)
        .unwrap();
    assert!(empty.is_none());
    let outside = fog
        .fill_rect_with_history(Rect::new(30.0, 30.0, 40.0, 40.0), FogMode::Remove)
        .unwrap();
    assert!(outside.is_none());
    assert!(fog.history().is_empty());

    fog.fill_rect_with_history(Rect::new(0.0, 0.0, 10.0, 10.0), FogMode::Remove)
        .unwrap()
        .unwrap();
    assert_eq!(fog.history().len(), 1);
    assert_eq!(fog.raster().alpha_at(5, 5), Some(0));
    assert!(fog.undo().unwrap());
    assert_eq!(fog.raster().alpha_at(5, 5), Some(DEFAULT_FOG_ALPHA));
}

#[test]
fn clear_and_reset() {
    let mut fog = FogEngine::new(8, 8);
    fog.clear();
    assert!(fog.raster().alpha().iter().all(|&a| a == 0));
    fog.reset();
    assert!(fog.raster().alpha().iter().all(|&a| a == DEFAULT_FOG_ALPHA));
}

#[test]
fn undo_resizes_mismatched_snapshot() {
    let mut fog = FogEngine::with_raster(FogRaster::new(10, 10, 7));
    fog.push_history().unwrap();
    fog.load_mask(FogRaster::new(10, 10, 0));
    fog.history.push(FogHistoryEntry::capture(&FogRaster::new(5, 5, 3)).unwrap());
    assert!(fog.undo().unwrap());
    assert_eq!(fog.raster().dimensions(), (10, 10));
    assert_eq!(fog.raster().alpha_at(9, 9), Some(3));
}

#[test]
fn load_mask_resizes_to_base_dimensions() {
    let mut fog = FogEngine::new(40, 30);
    fog.load_mask(FogRaster::new(20, 15, 9));
    assert_eq!(fog.raster().dimensions(), (40, 30));
    assert_eq!(fog.raster().alpha_at(39, 29), Some(9));
}

#[test]
fn snapshot_is_isolated_from_later_paint() {
    let mut fog = FogEngine::new(64, 64);
    let snap = fog.snapshot();
    fog.paint(Point::new(32.0, 32.0), 32, BrushShape::Circle, FogMode::Remove)
        .unwrap();
    assert_eq!(snap.alpha_at(32, 32), Some(DEFAULT_FOG_ALPHA));
}
