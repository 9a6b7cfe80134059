// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Corpus builder: turns a class-labelled tree of raw images into a tree of
//! uniformly normalized JPEG images with deterministic names.
//!
//! ```text
//! Dataset/                       Dataset_resized/
//! ├── Manga/                     ├── Manga/
//! │   ├── a.png          ──▶     │   ├── manga1.jpg
//! │   ├── b.txt                  │   └── manga2.jpg
//! │   └── c.jpg                  └── Oil/
//! └── Oil/                           └── oil1.jpg
//!     └── portrait.webp
//! ```

use crate::{CorpusOptions, Error, Progress, normalize::normalize_image};
use log::{debug, info, trace, warn};
use std::{
    fs,
    path::{Path, PathBuf},
};
use tokio::sync::mpsc::Sender;

/// One source image and the file name it receives in the corpus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedImage {
    pub source: PathBuf,
    /// `<class name lowercased><sequence>.jpg`
    pub file_name: String,
}

/// The eligible images of one class directory, in processing order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassPlan {
    /// Class directory name, verbatim.
    pub name: String,
    /// Class directory in the raw dataset.
    pub dir: PathBuf,
    pub images: Vec<PlannedImage>,
    /// Why the class directory could not be listed. `images` is empty when
    /// this is set.
    pub error: Option<String>,
}

/// Per-class counts of a corpus build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassSummary {
    pub name: String,
    pub attempted: usize,
    pub written: usize,
}

/// A source image the normalizer rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildFailure {
    pub source: PathBuf,
    pub reason: String,
}

/// Outcome of [`build_corpus`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Number of eligible source images handed to the normalizer.
    pub attempted: usize,
    /// Number of normalized images written.
    pub written: usize,
    pub classes: Vec<ClassSummary>,
    /// Paths of the written images, in processing order.
    pub outputs: Vec<PathBuf>,
    pub failures: Vec<BuildFailure>,
}

impl BuildReport {
    pub fn skipped(&self) -> usize {
        self.failures.len()
    }
}

/// Lists the entries of `dir` sorted by file name.
fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>, Error> {
    let mut entries = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()?;
    entries.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(entries)
}

/// Computes the class plan for `input_root` without touching any image.
///
/// Classes are the immediate subdirectories of `input_root` in lexicographic
/// order; other top-level entries are ignored. Within a class, files are
/// taken in lexicographic order and filtered through
/// `options.extensions`. Only eligible files consume a sequence number.
///
/// A class directory that cannot be listed is kept in the plan with
/// [`ClassPlan::error`] set; only an unreadable `input_root` is an error.
pub fn plan_corpus(input_root: &Path, options: &CorpusOptions) -> Result<Vec<ClassPlan>, Error> {
    if !input_root.is_dir() {
        return Err(Error::MissingRoot(input_root.to_path_buf()));
    }

    let mut plans = Vec::new();

    for class_dir in sorted_entries(input_root)? {
        if !class_dir.is_dir() {
            debug!("Ignoring top-level entry {}", class_dir.display());
            continue;
        }

        let name = match class_dir.file_name() {
            Some(name) => name.to_string_lossy().into_owned(),
            None => continue,
        };
        let prefix = name.to_lowercase();

        let entries = match sorted_entries(&class_dir) {
            Ok(entries) => entries,
            Err(err) => {
                warn!("Cannot list class {}: {}", class_dir.display(), err);
                plans.push(ClassPlan {
                    name,
                    dir: class_dir,
                    images: Vec::new(),
                    error: Some(err.to_string()),
                });
                continue;
            }
        };

        let images = entries
            .into_iter()
            .filter(|path| path.is_file() && options.extensions.matches(path))
            .enumerate()
            .map(|(index, source)| PlannedImage {
                source,
                file_name: format!("{}{}.jpg", prefix, index + 1),
            })
            .collect();

        plans.push(ClassPlan {
            name,
            dir: class_dir,
            images,
            error: None,
        });
    }

    Ok(plans)
}

/// Builds the normalized corpus under `output_root`.
///
/// Every planned image is handed to [`normalize_image`]. A failure is logged,
/// recorded in [`BuildReport::failures`] and the build moves on; the failed
/// image keeps its sequence number, so later names in the class are
/// unaffected and a gap appears in the numbering. Existing files in
/// `output_root` are overwritten when their name is reused and otherwise left
/// in place.
///
/// Progress is sent after each image with [`Sender::try_send`]; an update is
/// dropped when the channel is full, so the build never waits on the
/// receiver and may be called from any context. The build itself does
/// blocking file I/O, so async callers should still run it on
/// [`tokio::task::spawn_blocking`].
///
/// # Errors
///
/// Fails only when `input_root` cannot be enumerated or `output_root` cannot
/// be created.
///
/// # Examples
///
/// ```rust,no_run
/// use imgcorpus::{CorpusOptions, build_corpus};
/// use std::path::Path;
///
/// let report = build_corpus(
///     Path::new("Dataset"),
///     Path::new("Dataset_resized"),
///     &CorpusOptions::default(),
///     None,
/// )?;
/// println!("{} of {} images written", report.written, report.attempted);
/// # Ok::<(), imgcorpus::Error>(())
/// ```
#[cfg_attr(feature = "profiling", tracing::instrument(skip_all))]
pub fn build_corpus(
    input_root: &Path,
    output_root: &Path,
    options: &CorpusOptions,
    progress: Option<Sender<Progress>>,
) -> Result<BuildReport, Error> {
    options.normalize.validate()?;

    let plans = plan_corpus(input_root, options)?;
    fs::create_dir_all(output_root)?;

    let total = plans.iter().map(|plan| plan.images.len()).sum();
    let mut report = BuildReport::default();

    for plan in plans {
        if let Some(reason) = plan.error {
            warn!("Skipped class {}: {}", plan.name, reason);
            report.failures.push(BuildFailure {
                source: plan.dir,
                reason,
            });
            continue;
        }

        info!("Processing class: {} ({} files)", plan.name, plan.images.len());

        let class_dir = output_root.join(&plan.name);
        let mut summary = ClassSummary {
            name: plan.name.clone(),
            attempted: 0,
            written: 0,
        };

        for image in plan.images {
            let dest = class_dir.join(&image.file_name);
            summary.attempted += 1;
            report.attempted += 1;

            match normalize_image(&image.source, &dest, &options.normalize) {
                Ok(()) => {
                    debug!("{} -> {}", image.source.display(), dest.display());
                    summary.written += 1;
                    report.written += 1;
                    report.outputs.push(dest);
                }
                Err(err) => {
                    warn!("Skipped {}: {}", image.source.display(), err);
                    report.failures.push(BuildFailure {
                        source: image.source,
                        reason: err.to_string(),
                    });
                }
            }

            if let Some(progress) = &progress {
                if progress
                    .try_send(Progress {
                        current: report.attempted,
                        total,
                    })
                    .is_err()
                {
                    trace!("Progress update {}/{} dropped", report.attempted, total);
                }
            }
        }

        report.classes.push(summary);
    }

    info!(
        "Normalized {} of {} images into {}",
        report.written,
        report.attempted,
        output_root.display()
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};

    fn write_image(path: &Path, format: ImageFormat) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        RgbImage::from_pixel(6, 4, Rgb([10, 200, 30]))
            .save_with_format(path, format)
            .unwrap();
    }

    fn file_names(plan: &ClassPlan) -> Vec<(&str, &str)> {
        plan.images
            .iter()
            .map(|img| {
                (
                    img.source.file_name().unwrap().to_str().unwrap(),
                    img.file_name.as_str(),
                )
            })
            .collect()
    }

    #[test]
    fn test_plan_skips_unsupported_without_consuming_numbers() {
        let dir = tempfile::tempdir().unwrap();
        let manga = dir.path().join("Manga");
        write_image(&manga.join("a.png"), ImageFormat::Png);
        fs::write(manga.join("b.txt"), "notes").unwrap();
        write_image(&manga.join("c.jpg"), ImageFormat::Jpeg);

        let plans = plan_corpus(dir.path(), &CorpusOptions::default()).unwrap();
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].name, "Manga");
        assert_eq!(
            file_names(&plans[0]),
            vec![("a.png", "manga1.jpg"), ("c.jpg", "manga2.jpg")]
        );
    }

    #[test]
    fn test_plan_orders_classes_and_ignores_loose_files() {
        let dir = tempfile::tempdir().unwrap();
        write_image(&dir.path().join("Oil").join("x.png"), ImageFormat::Png);
        write_image(&dir.path().join("Digital").join("y.png"), ImageFormat::Png);
        fs::write(dir.path().join("README.md"), "loose").unwrap();

        let plans = plan_corpus(dir.path(), &CorpusOptions::default()).unwrap();
        let names: Vec<_> = plans.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Digital", "Oil"]);
    }

    #[test]
    fn test_plan_uppercase_extension_and_case_sensitive_order() {
        let dir = tempfile::tempdir().unwrap();
        let studies = dir.path().join("Studies");
        write_image(&studies.join("b.PNG"), ImageFormat::Png);
        write_image(&studies.join("B.png"), ImageFormat::Png);
        write_image(&studies.join("a.png"), ImageFormat::Png);

        let plans = plan_corpus(dir.path(), &CorpusOptions::default()).unwrap();
        assert_eq!(
            file_names(&plans[0]),
            vec![
                ("B.png", "studies1.jpg"),
                ("a.png", "studies2.jpg"),
                ("b.PNG", "studies3.jpg"),
            ]
        );
    }

    #[test]
    fn test_plan_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let result = plan_corpus(&dir.path().join("nope"), &CorpusOptions::default());
        assert!(matches!(result, Err(Error::MissingRoot(_))));
    }

    #[test]
    fn test_build_reports_progress() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        write_image(&input.join("Oil").join("a.png"), ImageFormat::Png);
        write_image(&input.join("Oil").join("b.bmp"), ImageFormat::Bmp);
        write_image(&input.join("Manga").join("c.png"), ImageFormat::Png);

        let (tx, mut rx) = tokio::sync::mpsc::channel::<Progress>(16);
        let report = build_corpus(
            &input,
            &dir.path().join("out"),
            &CorpusOptions::default(),
            Some(tx),
        )
        .unwrap();
        assert_eq!(report.attempted, 3);

        let mut updates = Vec::new();
        while let Some(progress) = rx.blocking_recv() {
            updates.push((progress.current, progress.total));
        }
        assert_eq!(updates, vec![(1, 3), (2, 3), (3, 3)]);
    }

    #[test]
    fn test_build_rejects_invalid_options() {
        let dir = tempfile::tempdir().unwrap();
        let mut options = CorpusOptions::default();
        options.normalize.quality = 0;

        let result = build_corpus(dir.path(), &dir.path().join("out"), &options, None);
        assert!(matches!(result, Err(Error::InvalidParameters(_))));
    }

    #[tokio::test]
    async fn test_build_inside_runtime_with_full_channel() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        write_image(&input.join("Oil").join("a.png"), ImageFormat::Png);
        write_image(&input.join("Oil").join("b.png"), ImageFormat::Png);
        write_image(&input.join("Oil").join("c.png"), ImageFormat::Png);

        // Nothing drains the channel while the build runs.
        let (tx, mut rx) = tokio::sync::mpsc::channel::<Progress>(1);
        let report = build_corpus(
            &input,
            &dir.path().join("out"),
            &CorpusOptions::default(),
            Some(tx),
        )
        .unwrap();
        assert_eq!(report.written, 3);

        assert_eq!(
            rx.recv().await,
            Some(Progress {
                current: 1,
                total: 3
            })
        );
        assert_eq!(rx.recv().await, None);
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_class_is_skipped() {
        use std::os::unix::fs::PermissionsExt as _;

        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        write_image(&input.join("Manga").join("a.png"), ImageFormat::Png);
        write_image(&input.join("Oil").join("a.png"), ImageFormat::Png);

        let locked = input.join("Manga");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        if fs::read_dir(&locked).is_ok() {
            // Permissions are not enforced for this user (root).
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let plans = plan_corpus(&input, &CorpusOptions::default()).unwrap();
        assert_eq!(plans[0].name, "Manga");
        assert!(plans[0].error.is_some());
        assert!(plans[0].images.is_empty());

        let output = dir.path().join("out");
        let report = build_corpus(&input, &output, &CorpusOptions::default(), None);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        let report = report.unwrap();

        assert_eq!(report.written, 1);
        assert_eq!(report.skipped(), 1);
        assert_eq!(report.failures[0].source, locked);
        assert!(output.join("Oil").join("oil1.jpg").is_file());
    }
}
