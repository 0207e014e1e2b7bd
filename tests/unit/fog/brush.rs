use super::*;

#[test]
fn sizes_are_clamped() {
    assert_eq!(clamp_brush_size(0), MIN_BRUSH_SIZE);
    assert_eq!(clamp_brush_size(32), 32);
    assert_eq!(clamp_brush_size(10_000), MAX_BRUSH_SIZE);
}

#[test]
fn stamps_never_exceed_half_scale() {
    let mut cache = BrushCache::new();
    for shape in [BrushShape::Rectangle, BrushShape::Circle, BrushShape::Cloud] {
        for size in [4, 17, 64, 128] {
            let s = cache.stamp(shape, size, 1).unwrap();
            assert_eq!(s.alpha().len(), (s.size() * s.size()) as usize);
            assert!(s.peak() <= STAMP_PEAK_ALPHA, "{shape:?} {size}");
            assert!(s.peak() > 0, "{shape:?} {size}");
        }
    }
}

#[test]
fn large_stamps_reach_peak_at_center_and_fade_at_corners() {
    let mut cache = BrushCache::new();
    for shape in [BrushShape::Rectangle, BrushShape::Circle, BrushShape::Cloud] {
        let s = cache.stamp(shape, 64, 0).unwrap();
        assert_eq!(s.alpha_at(32, 32), STAMP_PEAK_ALPHA, "{shape:?}");
        assert_eq!(s.alpha_at(0, 0), 0, "{shape:?}");
    }
}

#[test]
fn cache_reuses_stamps_by_shape_and_size() {
    let mut cache = BrushCache::new();
    let a = cache.stamp_for_dab(BrushShape::Circle, 32, (0, 0)).unwrap();
    let b = cache.stamp_for_dab(BrushShape::Circle, 32, (90, -4)).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(cache.len(), 1);
}

#[test]
fn cloud_keeps_at_most_four_variants_per_size() {
    let mut cache = BrushCache::new();
    for i in 0..64 {
        cache.stamp_for_dab(BrushShape::Cloud, 48, (i * 7, i * 3)).unwrap();
    }
    assert!(cache.len() <= CLOUD_VARIANTS as usize);
    assert!(cache.len() > 1);
    let a = cache.stamp(BrushShape::Cloud, 48, 0).unwrap();
    let b = cache.stamp(BrushShape::Cloud, 48, 1).unwrap();
    assert_ne!(a.alpha(), b.alpha());
}

#[test]
fn same_dab_anchor_gives_same_cloud_stamp() {
    let mut cache = BrushCache::new();
    let a = cache.stamp_for_dab(BrushShape::Cloud, 40, (12, 99)).unwrap();
    let b = cache.stamp_for_dab(BrushShape::Cloud, 40, (12, 99)).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
}

#[test]
fn blur_radius_zero_is_identity() {
    let src = vec![1u8, 2, 3, 4, 5, 6];
    assert_eq!(blur_alpha(&src, 3, 2, 0, 1.0).unwrap(), src);
}

#[test]
fn blur_constant_plane_is_identity() {
    let src = vec![77u8; 20];
    assert_eq!(blur_alpha(&src, 5, 4, 2, 1.0).unwrap(), src);
}
