// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Manifest generation for a normalized corpus.
//!
//! The manifest is a JSON array of `{x, y, thumbnail}` entries, one per image
//! under the corpus root, sorted by `x`:
//!
//! ```json
//! [
//!   {
//!     "x": "/Manga/manga1.jpg",
//!     "y": "Manga",
//!     "thumbnail": "/Manga/manga1.jpg"
//!   }
//! ]
//! ```

use crate::{Error, ManifestOptions};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufWriter, Write as _},
    path::{Path, PathBuf},
};
use walkdir::WalkDir;

/// One image of the corpus as seen by a front-end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Image URL, `base_url + "/" + relative path`.
    pub x: String,
    /// Class label.
    pub y: String,
    /// Same value as `x`.
    pub thumbnail: String,
}

/// Derives the manifest label for an image in directory `dir_name`.
///
/// Names matching `options.labels` case-insensitively are returned with the
/// first character uppercased and the rest lowercased; any other name maps
/// to `options.unknown_label`.
///
/// ```rust
/// use imgcorpus::{ManifestOptions, manifest_label};
///
/// let options = ManifestOptions::default();
/// assert_eq!(manifest_label("oil", &options), "Oil");
/// assert_eq!(manifest_label("MANGA", &options), "Manga");
/// assert_eq!(manifest_label("Foo", &options), "unknown");
/// ```
pub fn manifest_label(dir_name: &str, options: &ManifestOptions) -> String {
    let lower = dir_name.to_lowercase();
    if !options.labels.iter().any(|label| label.to_lowercase() == lower) {
        return options.unknown_label.clone();
    }

    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => options.unknown_label.clone(),
    }
}

/// Joins the components of a relative path with `/`.
fn posix_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Scans `corpus_root` and returns the sorted manifest entries.
///
/// Every regular file below the root whose extension passes
/// `options.extensions` is listed, whether or not the corpus builder
/// produced it. Unreadable entries below the root are logged and skipped.
pub fn build_manifest(
    corpus_root: &Path,
    options: &ManifestOptions,
) -> Result<Vec<ManifestEntry>, Error> {
    if !corpus_root.is_dir() {
        return Err(Error::MissingRoot(corpus_root.to_path_buf()));
    }

    let base_url = options.base_url.trim_end_matches('/');
    let mut entries = Vec::new();

    for entry in WalkDir::new(corpus_root).follow_links(true) {
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

        let folder = path
            .parent()
            .and_then(|p| p.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let x = format!("{}/{}", base_url, posix_path(path.strip_prefix(corpus_root)?));
        debug!("Manifest entry {} ({})", x, folder);

        entries.push(ManifestEntry {
            thumbnail: x.clone(),
            y: manifest_label(&folder, options),
            x,
        });
    }

    entries.sort_by(|a, b| a.x.cmp(&b.x));
    Ok(entries)
}

/// Writes `entries` as pretty-printed JSON to `corpus_root/<file_name>`,
/// replacing any previous manifest. Returns the manifest path.
pub fn write_manifest(
    corpus_root: &Path,
    entries: &[ManifestEntry],
    options: &ManifestOptions,
) -> Result<PathBuf, Error> {
    let path = corpus_root.join(&options.file_name);
    let file = File::create(&path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, entries)?;
    writer.flush()?;
    Ok(path)
}

/// Builds and writes the manifest for `corpus_root`.
///
/// # Examples
///
/// ```rust,no_run
/// use imgcorpus::{ManifestOptions, generate_manifest};
/// use std::path::Path;
///
/// let (path, entries) = generate_manifest(
///     Path::new("Dataset_resized"),
///     &ManifestOptions::default(),
/// )?;
/// println!("Wrote {} entries to {}", entries.len(), path.display());
/// # Ok::<(), imgcorpus::Error>(())
/// ```
#[cfg_attr(feature = "profiling", tracing::instrument(skip_all))]
pub fn generate_manifest(
    corpus_root: &Path,
    options: &ManifestOptions,
) -> Result<(PathBuf, Vec<ManifestEntry>), Error> {
    let entries = build_manifest(corpus_root, options)?;
    let path = write_manifest(corpus_root, &entries, options)?;
    info!("Generated index with {} images", entries.len());
    Ok((path, entries))
}
