// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! # imgcorpus
//!
//! Turns a folder of class-labelled raw images into a uniform training
//! corpus, describes it with a JSON manifest and optionally pushes it to a
//! remote dataset service.
//!
//! ## Stages
//!
//! - **Corpus building** ([`build_corpus`]): every image under
//!   `input/<Class>/` is decoded, converted to RGB, stretched to a fixed size
//!   and re-encoded as JPEG into `output/<Class>/<class><n>.jpg`.
//! - **Manifest generation** ([`generate_manifest`]): the output tree is
//!   scanned and a sorted `index.json` of `{x, y, thumbnail}` entries is
//!   written at its root.
//! - **Publishing** ([`publish`]): each image is uploaded to the dataset
//!   service and a record referencing the uploaded asset is created.
//!
//! All three stages skip a file that fails and carry on with the next one;
//! the returned reports list what was skipped.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use imgcorpus::{Client, Error, Settings, build_corpus, generate_manifest, publish};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Error> {
//!     let settings = Settings::load(None)?;
//!
//!     let report = build_corpus(
//!         &settings.input,
//!         &settings.output,
//!         &settings.corpus_options(),
//!         None,
//!     )?;
//!     println!("Normalized {} images", report.written);
//!
//!     let (path, entries) = generate_manifest(&settings.output, &settings.manifest_options())?;
//!     println!("{} entries in {}", entries.len(), path.display());
//!
//!     let client = Client::new()?.with_server(&settings.backend_url)?;
//!     let report = publish(&client, &settings.output, &settings.publish_options(), None).await?;
//!     println!("Published {} images", report.published());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Optional Features
//!
//! - `profiling`: adds `tracing` spans to the stage entry points.

mod client;
mod config;
mod corpus;
mod error;
mod manifest;
mod normalize;
mod publish;

pub use crate::{
    client::Client,
    config::{
        CorpusOptions, DEFAULT_BACKEND_URL, DEFAULT_DATASET_NAME, DEFAULT_LABELS, DEFAULT_QUALITY,
        DEFAULT_SIZE, ExtensionFilter, MANIFEST_FILE_NAME, ManifestOptions, NormalizeOptions,
        PublishOptions, Settings, UNKNOWN_LABEL, default_config_path,
    },
    corpus::{BuildFailure, BuildReport, ClassPlan, ClassSummary, PlannedImage, build_corpus, plan_corpus},
    error::Error,
    manifest::{ManifestEntry, build_manifest, generate_manifest, manifest_label, write_manifest},
    normalize::normalize_image,
    publish::{
        DatasetRecord, PublishCandidate, PublishItem, PublishOutcome, PublishReport,
        publish, publish_candidates,
    },
};

/// Progress information for long-running operations.
///
/// Sent by [`build_corpus`] and [`publish`] after each processed file when a
/// channel is supplied.
///
/// # Examples
///
/// ```rust
/// use imgcorpus::Progress;
///
/// let progress = Progress {
///     current: 25,
///     total: 100,
/// };
/// let percentage = (progress.current as f64 / progress.total as f64) * 100.0;
/// println!(
///     "Progress: {:.1}% ({}/{})",
///     percentage, progress.current, progress.total
/// );
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Current number of completed items.
    pub current: usize,
    /// Total number of items to process.
    pub total: usize,
}

#[cfg(test)]
#[ctor::ctor]
fn init() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .is_test(true)
        .try_init();
}
