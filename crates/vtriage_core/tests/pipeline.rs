//! End-to-end pipeline tests: discovery through dispatch, with a fake
//! thumbnail tool standing in for the external binary.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;

use tempfile::tempdir;

use vtriage_core::config::Settings;
use vtriage_core::discovery::{discover, DiscoveryFilter};
use vtriage_core::models::CollisionMode;
use vtriage_core::review::{ReviewManifest, ReviewSelection, MANIFEST_FILE_NAME, NO_ACTION_LABEL};
use vtriage_core::run::{apply_dispositions, run_transforms, RunContext};
use vtriage_core::tools::{ToolOutput, ToolRunner};
use vtriage_core::transform::{ThumbnailTransform, Transform};

/// Stands in for the thumbnail tool: writes the output file named by the
/// last argument and reports success.
struct FakeGifTool;

impl ToolRunner for FakeGifTool {
    fn run(&self, _program: &str, args: &[OsString]) -> io::Result<ToolOutput> {
        if let Some(dest) = args.last() {
            fs::write(dest, b"gif")?;
        }
        Ok(ToolOutput {
            success: true,
            exit_code: 0,
            stdout: String::new(),
            stderr: String::new(),
        })
    }
}

fn touch(dir: &Path, name: &str) {
    fs::write(dir.join(name), b"video").unwrap();
}

fn buckets() -> Vec<String> {
    ["good", "trash"].iter().map(|s| s.to_string()).collect()
}

#[test]
fn scan_review_apply_round_trip() {
    let root = tempdir().unwrap();
    let indir = root.path().join("in");
    fs::create_dir(&indir).unwrap();
    touch(&indir, "a.mp4");
    touch(&indir, "b.mp4");
    touch(&indir, "c.mp4");

    // Discovery
    let found = discover(
        &[indir.clone()],
        &DiscoveryFilter::for_extension(".mp4"),
    );
    assert_eq!(found.items.len(), 3);
    assert_eq!(found.first_dir.as_deref(), Some(indir.as_path()));

    // Transform through a two-worker pool
    let mut settings = Settings::default();
    settings.pool.worker_count = 2;
    let ctx = RunContext::new(settings, root.path().join("logs")).unwrap();

    let stage: Arc<dyn Transform> = Arc::new(ThumbnailTransform::new(Arc::new(FakeGifTool)));
    let results = run_transforms(&ctx, stage, found.items).unwrap();

    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|r| r.is_ok()));
    assert!(indir.join("a-thumb.gif").exists());
    assert!(indir.join("b-thumb.gif").exists());
    assert!(indir.join("c-thumb.gif").exists());

    // Review manifest to disk and back
    let manifest = ReviewManifest::from_results(
        &results,
        &buckets(),
        &indir,
        CollisionMode::Preserve,
        vec![1.0, 2.0],
        String::new(),
    );
    let manifest_path = indir.join(MANIFEST_FILE_NAME);
    manifest.write(&manifest_path).unwrap();
    let manifest = ReviewManifest::load(&manifest_path).unwrap();
    assert_eq!(manifest.items.len(), 3);
    assert_eq!(manifest.labels[0], NO_ACTION_LABEL);

    // Reviewer: a -> good, b -> trash, c -> no action
    let mut selections = BTreeMap::new();
    selections.insert(0, "good".to_string());
    selections.insert(1, "trash".to_string());
    let summary = apply_dispositions(&ctx, &manifest, ReviewSelection { selections });

    assert!(summary.is_clean());
    assert_eq!(summary.bucket_counts.get("good"), Some(&1));
    assert_eq!(summary.bucket_counts.get("trash"), Some(&1));

    assert!(indir.join("good/a.mp4").exists());
    assert!(indir.join("trash/b.mp4").exists());
    // c untouched; thumbnails have their own stem and stay behind
    assert!(indir.join("c.mp4").exists());
    assert!(indir.join("a-thumb.gif").exists());
    assert!(!indir.join("a.mp4").exists());
    ctx.finish();
}

#[test]
fn path_shaped_label_cannot_escape_output_root() {
    let root = tempdir().unwrap();
    let indir = root.path().join("in");
    fs::create_dir(&indir).unwrap();
    touch(&indir, "clip.mp4");

    let ctx = RunContext::new(Settings::default(), root.path().join("logs")).unwrap();
    let stage: Arc<dyn Transform> = Arc::new(ThumbnailTransform::new(Arc::new(FakeGifTool)));
    let found = discover(&[indir.clone()], &DiscoveryFilter::for_extension(".mp4"));
    let results = run_transforms(&ctx, stage, found.items).unwrap();

    let manifest = ReviewManifest::from_results(
        &results,
        &buckets(),
        &indir,
        CollisionMode::Preserve,
        vec![1.0],
        String::new(),
    );

    // A crafted selection label with a path separator must not become a
    // move target outside the output root.
    let mut selections = BTreeMap::new();
    selections.insert(0, "../escaped".to_string());
    let summary = apply_dispositions(&ctx, &manifest, ReviewSelection { selections });

    assert!(summary.bucket_counts.is_empty());
    assert_eq!(summary.moved_files, 0);
    assert!(indir.join("clip.mp4").exists());
    assert!(!root.path().join("escaped").exists());
}

#[test]
fn preserve_mode_keeps_both_files_on_collision() {
    let root = tempdir().unwrap();
    let indir = root.path().join("in");
    fs::create_dir(&indir).unwrap();
    touch(&indir, "clip.mp4");

    // A previous run already placed a clip.mp4 in the bucket.
    fs::create_dir_all(indir.join("good")).unwrap();
    fs::write(indir.join("good/clip.mp4"), b"earlier").unwrap();

    let ctx = RunContext::new(Settings::default(), root.path().join("logs")).unwrap();
    let stage: Arc<dyn Transform> = Arc::new(ThumbnailTransform::new(Arc::new(FakeGifTool)));
    let found = discover(&[indir.clone()], &DiscoveryFilter::for_extension(".mp4"));
    let results = run_transforms(&ctx, stage, found.items).unwrap();

    let manifest = ReviewManifest::from_results(
        &results,
        &buckets(),
        &indir,
        CollisionMode::Preserve,
        vec![1.0],
        String::new(),
    );
    let mut selections = BTreeMap::new();
    selections.insert(0, "good".to_string());
    let summary = apply_dispositions(&ctx, &manifest, ReviewSelection { selections });

    assert!(summary.is_clean());
    assert!(indir.join("good/clip-1.mp4").exists());
    assert_eq!(fs::read(indir.join("good/clip.mp4")).unwrap(), b"earlier");
}

#[test]
fn thumbnail_stage_is_idempotent_across_runs() {
    let root = tempdir().unwrap();
    let indir = root.path().join("in");
    fs::create_dir(&indir).unwrap();
    touch(&indir, "clip.mp4");

    let ctx = RunContext::new(Settings::default(), root.path().join("logs")).unwrap();
    let stage: Arc<dyn Transform> = Arc::new(ThumbnailTransform::new(Arc::new(FakeGifTool)));

    let found = discover(&[indir.clone()], &DiscoveryFilter::for_extension(".mp4"));
    let first = run_transforms(&ctx, stage.clone(), found.items.clone()).unwrap();
    let before = fs::metadata(indir.join("clip-thumb.gif")).unwrap().modified().unwrap();

    let second = run_transforms(&ctx, stage, found.items).unwrap();
    let after = fs::metadata(indir.join("clip-thumb.gif")).unwrap().modified().unwrap();

    assert!(first[0].is_ok());
    assert!(second[0].is_ok());
    // Second run skipped the tool, so the artifact was not rewritten.
    assert_eq!(before, after);
}
