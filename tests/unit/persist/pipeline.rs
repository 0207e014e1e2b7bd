use super::*;
use crate::assets::store::PreparedImage;
use crate::fog::engine::FogMode;
use crate::foundation::core::{Point, Rect};
use crate::persist::repository::MemoryRepository;
use crate::scene::item::{ItemKind, Marker, SceneItem};

fn doc() -> MapDocument {
    MapDocument::new(
        "Cave",
        "maps/cave.png",
        Arc::new(PreparedImage::placeholder(40, 30)),
    )
}

fn opts() -> PersistOpts {
    PersistOpts::default().with_coalesce_delay_ms(10)
}

#[test]
fn write_job_stores_mask_and_upserts_record() {
    let dir = tempfile::tempdir().unwrap();
    let repo = MemoryRepository::with_items(vec![MapRecord::new("Other", "maps/o.png")]);
    let mut d = doc();
    d.fog.fill_rect(Rect::new(0.0, 0.0, 10.0, 10.0), FogMode::Remove);
    d.store.insert(
        SceneItem::new(Point::new(1.0, 2.0), ItemKind::Marker(Marker::new("door"))).unwrap(),
    );

    let job = PersistJob::capture(&d, dir.path()).unwrap();
    write_job(&repo, &job).unwrap();

    let mask = dir.path().join("masks/cave_mask.png");
    let raster = FogRaster::decode(&std::fs::read(mask).unwrap()).unwrap();
    assert_eq!(raster.dimensions(), (40, 30));
    assert_eq!(raster.alpha_at(5, 5), Some(0));
    assert_eq!(raster.alpha_at(20, 20), Some(128));

    let records = repo.snapshot();
    assert_eq!(records.len(), 2);
    let cave = records.iter().find(|r| r.name == "Cave").unwrap();
    assert_eq!(cave.fog_mask_path, "masks/cave_mask.png");
    assert!(cave.tokens.contains("door"));
}

#[test]
fn persist_writes_in_background_and_flush_waits() {
    let dir = tempfile::tempdir().unwrap();
    let repo = Arc::new(MemoryRepository::default());
    let mut p = PersistPipeline::new(repo.clone(), &opts()).unwrap();
    let job = PersistJob::capture(&doc(), dir.path()).unwrap();
    let _ = p.persist(job);
    p.flush();
    assert_eq!(repo.save_count(), 1);
    assert_eq!(p.stats().written, 1);
    assert!(!p.busy());
    p.shutdown();
}

#[test]
fn save_now_supersedes_pending_and_returns_errors() {
    let dir = tempfile::tempdir().unwrap();
    let repo = Arc::new(MemoryRepository::default());
    let p = PersistPipeline::new(repo.clone(), &opts()).unwrap();
    let mut d = doc();
    d.hover_font_size = 20;
    p.save_now(PersistJob::capture(&d, dir.path()).unwrap())
        .unwrap();
    assert_eq!(repo.snapshot()[0].hover_font_size, 20);

    // a file where the masks directory should go makes the write fail
    let blocked = tempfile::tempdir().unwrap();
    std::fs::write(blocked.path().join("masks"), b"x").unwrap();
    let err = p
        .save_now(PersistJob::capture(&d, blocked.path()).unwrap())
        .unwrap_err();
    assert!(matches!(err, FogmapError::Other(_)), "{err}");
    assert_eq!(p.stats().failed, 1);
}

#[test]
fn persist_after_shutdown_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let repo = Arc::new(MemoryRepository::default());
    let mut p = PersistPipeline::new(repo.clone(), &opts()).unwrap();
    p.shutdown();
    p.shutdown();
    let err = p
        .persist(PersistJob::capture(&doc(), dir.path()).unwrap())
        .unwrap_err();
    assert!(matches!(err, FogmapError::Validation(_)));
    p.flush();
    assert_eq!(repo.save_count(), 0);
}
