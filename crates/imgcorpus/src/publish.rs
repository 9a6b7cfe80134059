// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Publishing a normalized corpus to the remote dataset service.
//!
//! Each image goes through two independent requests: the asset upload and
//! the creation of the dataset record pointing at it. A failed upload skips
//! the record. A failed record leaves the uploaded asset on the server with
//! nothing referring to it; this is reported as [`PublishOutcome::Orphaned`]
//! and no compensating delete is attempted.

use crate::{Client, Error, Progress, PublishOptions};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::Sender;
use walkdir::WalkDir;

/// Dataset record created for every uploaded asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetRecord {
    /// Asset locator assigned by the server.
    pub x: String,
    /// Class label.
    pub y: String,
    /// Same value as `x`.
    pub thumbnail: String,
}

impl DatasetRecord {
    pub fn new(locator: &str, label: &str) -> Self {
        DatasetRecord {
            x: locator.to_owned(),
            y: label.to_owned(),
            thumbnail: locator.to_owned(),
        }
    }
}

/// An image selected for publishing together with its label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishCandidate {
    pub path: PathBuf,
    /// Base name of the containing directory, verbatim.
    pub label: String,
}

/// Result of publishing one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Asset uploaded and record created.
    Published { locator: String },
    /// The upload failed; no record was attempted.
    UploadFailed { reason: String },
    /// The upload succeeded but the record was not created, leaving the
    /// asset at `locator` unreferenced.
    Orphaned { locator: String, reason: String },
}

impl PublishOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, PublishOutcome::Published { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishItem {
    pub path: PathBuf,
    pub label: String,
    pub outcome: PublishOutcome,
}

/// Per-file log of a [`publish`] run, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub items: Vec<PublishItem>,
}

impl PublishReport {
    pub fn attempted(&self) -> usize {
        self.items.len()
    }

    pub fn published(&self) -> usize {
        self.items.iter().filter(|i| i.outcome.is_success()).count()
    }

    pub fn upload_failures(&self) -> usize {
        self.items
            .iter()
            .filter(|i| matches!(i.outcome, PublishOutcome::UploadFailed { .. }))
            .count()
    }

    pub fn orphaned(&self) -> usize {
        self.items
            .iter()
            .filter(|i| matches!(i.outcome, PublishOutcome::Orphaned { .. }))
            .count()
    }

    /// Items that did not end in a created record.
    pub fn failures(&self) -> impl Iterator<Item = &PublishItem> {
        self.items.iter().filter(|i| !i.outcome.is_success())
    }
}

/// Lists the images under `corpus_root` that [`publish`] would send, in
/// file name order.
///
/// Every directory contributes its own files labelled with its base name,
/// the corpus root included. Files in a directory without a base name (for
/// example `.`) are skipped.
pub fn publish_candidates(
    corpus_root: &Path,
    options: &PublishOptions,
) -> Result<Vec<PublishCandidate>, Error> {
    if !corpus_root.is_dir() {
        return Err(Error::MissingRoot(corpus_root.to_path_buf()));
    }

    let mut candidates = Vec::new();

    for entry in WalkDir::new(corpus_root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("Skipping unreadable entry: {}", err);
                continue;
            }
        };

        let path = entry.path();
        if !entry.file_type().is_file() || !options.extensions.matches(path) {
            continue;
        }

        let label = match path.parent().and_then(|p| p.file_name()) {
            Some(name) => name.to_string_lossy().into_owned(),
            None => {
                debug!("No label for {}, skipping", path.display());
                continue;
            }
        };

        candidates.push(PublishCandidate {
            path: path.to_path_buf(),
            label,
        });
    }

    Ok(candidates)
}

/// Publishes one image: upload, then record creation.
async fn publish_one(
    client: &Client,
    candidate: &PublishCandidate,
    options: &PublishOptions,
) -> PublishOutcome {
    let locator = match client.upload_asset(&candidate.path).await {
        Ok(locator) => locator,
        Err(err) => {
            warn!("Error processing {}: {}", candidate.path.display(), err);
            return PublishOutcome::UploadFailed {
                reason: err.to_string(),
            };
        }
    };

    let record = DatasetRecord::new(&locator, &candidate.label);
    match client.create_record(&options.dataset_name, &record).await {
        Ok(()) => {
            info!(
                "Added {} with label \"{}\" (asset path: {})",
                candidate.path.display(),
                candidate.label,
                locator
            );
            PublishOutcome::Published { locator }
        }
        Err(err) => {
            warn!(
                "Error processing {}: {} (asset {} left without a record)",
                candidate.path.display(),
                err,
                locator
            );
            PublishOutcome::Orphaned {
                locator,
                reason: err.to_string(),
            }
        }
    }
}

/// Uploads every publishable image under `corpus_root` and registers a
/// dataset record for it.
///
/// Images are processed one at a time in the order returned by
/// [`publish_candidates`]. A failure on one image is logged, recorded in
/// the report and never stops the run.
///
/// # Errors
///
/// Fails only when `corpus_root` does not exist.
///
/// # Examples
///
/// ```no_run
/// use imgcorpus::{Client, PublishOptions, publish};
/// use std::path::Path;
///
/// # async fn example() -> Result<(), imgcorpus::Error> {
/// let client = Client::new()?;
/// let report = publish(
///     &client,
///     Path::new("Dataset_resized"),
///     &PublishOptions::default(),
///     None,
/// )
/// .await?;
/// println!("{} of {} published", report.published(), report.attempted());
/// # Ok(())
/// # }
/// ```
#[cfg_attr(feature = "profiling", tracing::instrument(skip_all))]
pub async fn publish(
    client: &Client,
    corpus_root: &Path,
    options: &PublishOptions,
    progress: Option<Sender<Progress>>,
) -> Result<PublishReport, Error> {
    let candidates = publish_candidates(corpus_root, options)?;
    let total = candidates.len();

    info!(
        "Loading {} images into dataset {} at {}",
        total,
        options.dataset_name,
        client.url()
    );

    let mut report = PublishReport::default();

    for (index, candidate) in candidates.into_iter().enumerate() {
        let outcome = publish_one(client, &candidate, options).await;
        report.items.push(PublishItem {
            path: candidate.path,
            label: candidate.label,
            outcome,
        });

        if let Some(progress) = &progress {
            let _ = progress
                .send(Progress {
                    current: index + 1,
                    total,
                })
                .await;
        }
    }

    info!(
        "Dataset loading complete: {} published, {} upload failures, {} orphaned assets",
        report.published(),
        report.upload_failures(),
        report.orphaned()
    );

    Ok(report)
}
