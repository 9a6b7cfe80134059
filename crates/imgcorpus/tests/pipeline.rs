// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! End-to-end tests for corpus building and manifest generation on
//! generated image trees.

use image::{ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use imgcorpus::{
    CorpusOptions, Error, ManifestEntry, ManifestOptions, build_corpus, generate_manifest,
};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tempfile::TempDir;

#[ctor::ctor]
fn init() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .is_test(true)
        .try_init();
}

fn write_rgb(path: &Path, format: ImageFormat) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    RgbImage::from_fn(30, 20, |x, y| Rgb([x as u8 * 8, y as u8 * 12, 64]))
        .save_with_format(path, format)
        .unwrap();
}

fn write_rgba(path: &Path) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    RgbaImage::from_pixel(12, 50, Rgba([255, 0, 0, 100]))
        .save_with_format(path, ImageFormat::Png)
        .unwrap();
}

/// Builds a raw dataset:
///
/// ```text
/// Dataset/
/// ├── Digital/  d1.bmp  d2.tiff
/// ├── Manga/    a.png  b.txt  c.jpg
/// ├── Oil/      p1.png (rgba)  p2.jpg
/// ├── Other/    x.png
/// └── notes.md
/// ```
fn raw_dataset() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("Dataset");

    write_rgb(&input.join("Digital").join("d1.bmp"), ImageFormat::Bmp);
    write_rgb(&input.join("Digital").join("d2.tiff"), ImageFormat::Tiff);
    write_rgb(&input.join("Manga").join("a.png"), ImageFormat::Png);
    fs::write(input.join("Manga").join("b.txt"), "not an image").unwrap();
    write_rgb(&input.join("Manga").join("c.jpg"), ImageFormat::Jpeg);
    write_rgba(&input.join("Oil").join("p1.png"));
    write_rgb(&input.join("Oil").join("p2.jpg"), ImageFormat::Jpeg);
    write_rgb(&input.join("Other").join("x.png"), ImageFormat::Png);
    fs::write(input.join("notes.md"), "# notes").unwrap();

    (dir, input)
}

fn relative_outputs(root: &Path, outputs: &[PathBuf]) -> Vec<String> {
    outputs
        .iter()
        .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
        .collect()
}

#[test]
fn test_build_corpus_names_and_layout() {
    let (dir, input) = raw_dataset();
    let output = dir.path().join("Dataset_resized");

    let report = build_corpus(&input, &output, &CorpusOptions::default(), None).unwrap();

    assert_eq!(report.attempted, 7);
    assert_eq!(report.written, 7);
    assert!(report.failures.is_empty());
    assert_eq!(
        relative_outputs(&output, &report.outputs),
        vec![
            "Digital/digital1.jpg",
            "Digital/digital2.jpg",
            "Manga/manga1.jpg",
            "Manga/manga2.jpg",
            "Oil/oil1.jpg",
            "Oil/oil2.jpg",
            "Other/other1.jpg",
        ]
    );

    let classes: Vec<_> = report
        .classes
        .iter()
        .map(|c| (c.name.as_str(), c.attempted, c.written))
        .collect();
    assert_eq!(
        classes,
        vec![
            ("Digital", 2, 2),
            ("Manga", 2, 2),
            ("Oil", 2, 2),
            ("Other", 1, 1),
        ]
    );

    for path in &report.outputs {
        let img = image::open(path).unwrap();
        assert_eq!((img.width(), img.height()), (256, 256));
        assert_eq!(img.color().channel_count(), 3);
    }
}

#[test]
fn test_build_corpus_is_deterministic() {
    let (dir, input) = raw_dataset();
    let first = dir.path().join("first");
    let second = dir.path().join("second");

    let a = build_corpus(&input, &first, &CorpusOptions::default(), None).unwrap();
    let b = build_corpus(&input, &second, &CorpusOptions::default(), None).unwrap();

    assert_eq!(a.attempted, b.attempted);
    assert_eq!(
        relative_outputs(&first, &a.outputs),
        relative_outputs(&second, &b.outputs)
    );

    // Re-running into the same tree reuses the same names.
    let c = build_corpus(&input, &first, &CorpusOptions::default(), None).unwrap();
    assert_eq!(a.outputs, c.outputs);
}

#[test]
fn test_corrupt_file_leaves_gap_and_continues() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in");
    write_rgb(&input.join("Oil").join("a.png"), ImageFormat::Png);
    fs::create_dir_all(input.join("Oil")).unwrap();
    fs::write(input.join("Oil").join("b.jpg"), b"\xff\xd8 truncated").unwrap();
    write_rgb(&input.join("Oil").join("c.png"), ImageFormat::Png);

    let output = dir.path().join("out");
    let report = build_corpus(&input, &output, &CorpusOptions::default(), None).unwrap();

    assert_eq!(report.attempted, 3);
    assert_eq!(report.written, 2);
    assert_eq!(report.skipped(), 1);
    assert_eq!(report.failures[0].source, input.join("Oil").join("b.jpg"));
    assert_eq!(
        relative_outputs(&output, &report.outputs),
        vec!["Oil/oil1.jpg", "Oil/oil3.jpg"]
    );
    assert!(!output.join("Oil").join("oil2.jpg").exists());
}

#[test]
fn test_stale_outputs_are_kept() {
    let (dir, input) = raw_dataset();
    let output = dir.path().join("out");
    let stale = output.join("Oil").join("oil9.jpg");
    fs::create_dir_all(stale.parent().unwrap()).unwrap();
    fs::write(&stale, b"old").unwrap();

    build_corpus(&input, &output, &CorpusOptions::default(), None).unwrap();
    assert!(stale.exists());
}

#[test]
fn test_missing_input_root_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let result = build_corpus(
        &dir.path().join("Dataset"),
        &dir.path().join("out"),
        &CorpusOptions::default(),
        None,
    );
    assert!(matches!(result, Err(Error::MissingRoot(_))));
}

#[test]
fn test_manifest_from_built_corpus() {
    let (dir, input) = raw_dataset();
    let output = dir.path().join("Dataset_resized");
    build_corpus(&input, &output, &CorpusOptions::default(), None).unwrap();

    let (path, entries) = generate_manifest(&output, &ManifestOptions::default()).unwrap();
    assert_eq!(path, output.join("index.json"));
    assert_eq!(entries.len(), 7);

    // Sorted by x.
    assert!(entries.windows(2).all(|w| w[0].x <= w[1].x));

    // Labels come from the allow-list.
    let labels: Vec<_> = entries.iter().map(|e| e.y.as_str()).collect();
    assert_eq!(
        labels,
        vec!["Digital", "Digital", "Manga", "Manga", "Oil", "Oil", "unknown"]
    );

    // Every entry points at a file of this corpus.
    for entry in &entries {
        let rel = entry.x.trim_start_matches('/');
        assert!(output.join(rel).is_file(), "missing {}", entry.x);
        assert_eq!(entry.x, entry.thumbnail);
    }

    // The written file holds the same entries.
    let written: Vec<ManifestEntry> =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(written, entries);
}

#[test]
fn test_manifest_includes_foreign_files() {
    let (dir, input) = raw_dataset();
    let output = dir.path().join("out");
    build_corpus(&input, &output, &CorpusOptions::default(), None).unwrap();
    write_rgb(&output.join("Studies").join("manual.png"), ImageFormat::Png);

    let (_, entries) = generate_manifest(&output, &ManifestOptions::default()).unwrap();
    let manual = entries
        .iter()
        .find(|e| e.x == "/Studies/manual.png")
        .expect("manual file listed");
    assert_eq!(manual.y, "Studies");
}
