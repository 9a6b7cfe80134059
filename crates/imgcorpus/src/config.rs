// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Configuration for the corpus pipeline.
//!
//! Each stage takes its own options struct so that several pipelines with
//! different parameters can run in the same process. [`Settings`] is the
//! operator-facing layer: it is loaded from an optional TOML file and
//! `IMGCORPUS_*` environment variables and then split into the per-stage
//! options.
//!
//! ```toml
//! input = "Dataset"
//! output = "Dataset_resized"
//! width = 256
//! height = 256
//! quality = 85
//! base_url = ""
//! backend_url = "http://localhost:3030"
//! dataset_name = "TrainingSet"
//! labels = ["oil", "manga", "digital", "studies"]
//! ```

use crate::Error;
use config::{Config, Environment, File};
use directories::ProjectDirs;
use image::imageops::FilterType;
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default square edge of normalized images.
pub const DEFAULT_SIZE: u32 = 256;

/// Default JPEG quality of normalized images.
pub const DEFAULT_QUALITY: u8 = 85;

/// Default manifest file name, written inside the corpus root.
pub const MANIFEST_FILE_NAME: &str = "index.json";

/// Label assigned to manifest entries outside the allow-list.
pub const UNKNOWN_LABEL: &str = "unknown";

/// Default dataset service endpoint.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:3030";

/// Default remote dataset name.
pub const DEFAULT_DATASET_NAME: &str = "TrainingSet";

/// Class names recognised by the manifest generator.
pub const DEFAULT_LABELS: &[&str] = &["oil", "manga", "digital", "studies"];

const ENV_PREFIX: &str = "IMGCORPUS";

/// Largest image edge a JPEG frame header can describe.
const MAX_JPEG_EDGE: u32 = u16::MAX as u32;

/// Case-insensitive allow-list of file extensions.
///
/// Each stage carries its own filter. The defaults differ per stage:
/// [`decodable`][Self::decodable] for the corpus builder,
/// [`manifest`][Self::manifest] for the manifest generator and
/// [`publishable`][Self::publishable] for the publisher.
///
/// # Examples
///
/// ```rust
/// use imgcorpus::ExtensionFilter;
/// use std::path::Path;
///
/// let filter = ExtensionFilter::publishable();
/// assert!(filter.matches(Path::new("oil/oil1.JPG")));
/// assert!(!filter.matches(Path::new("oil/oil1.png")));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionFilter {
    extensions: Vec<String>,
}

impl ExtensionFilter {
    /// Creates a filter from extensions given with or without the leading dot.
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extensions = extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
        ExtensionFilter { extensions }
    }

    /// Every format the normalizer decodes: png, jpg, jpeg, webp, bmp, tiff.
    pub fn decodable() -> Self {
        Self::new(["png", "jpg", "jpeg", "webp", "bmp", "tiff"])
    }

    /// Files listed in the manifest: jpg, jpeg, png.
    pub fn manifest() -> Self {
        Self::new(["jpg", "jpeg", "png"])
    }

    /// Files pushed to the dataset service: jpg, jpeg.
    pub fn publishable() -> Self {
        Self::new(["jpg", "jpeg"])
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Returns true when the file name ends with `.<ext>` for one of the
    /// allowed extensions, ignoring case.
    pub fn matches(&self, path: &Path) -> bool {
        let Some(name) = path.file_name() else {
            return false;
        };
        let name = name.to_string_lossy().to_lowercase();
        self.extensions
            .iter()
            .any(|ext| name.len() > ext.len() && name.ends_with(&format!(".{}", ext)))
    }
}

/// Parameters of the image normalizer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizeOptions {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// JPEG quality, 1 to 100.
    pub quality: u8,
    /// Resampling filter used for the resize.
    pub filter: FilterType,
    /// Build optimized Huffman tables for each image instead of using the
    /// standard ones.
    pub optimize: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        NormalizeOptions {
            width: DEFAULT_SIZE,
            height: DEFAULT_SIZE,
            quality: DEFAULT_QUALITY,
            filter: FilterType::Lanczos3,
            optimize: true,
        }
    }
}

impl NormalizeOptions {
    pub fn validate(&self) -> Result<(), Error> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::InvalidParameters(format!(
                "target size must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if self.width > MAX_JPEG_EDGE || self.height > MAX_JPEG_EDGE {
            return Err(Error::InvalidParameters(format!(
                "target size exceeds the JPEG limit of {} pixels, got {}x{}",
                MAX_JPEG_EDGE, self.width, self.height
            )));
        }
        if !(1..=100).contains(&self.quality) {
            return Err(Error::InvalidParameters(format!(
                "quality must be between 1 and 100, got {}",
                self.quality
            )));
        }
        Ok(())
    }
}

/// Options of the corpus builder.
#[derive(Debug, Clone, PartialEq)]
pub struct CorpusOptions {
    pub normalize: NormalizeOptions,
    /// Source files eligible for normalization.
    pub extensions: ExtensionFilter,
}

impl Default for CorpusOptions {
    fn default() -> Self {
        CorpusOptions {
            normalize: NormalizeOptions::default(),
            extensions: ExtensionFilter::decodable(),
        }
    }
}

/// Options of the manifest generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestOptions {
    /// Prefix of every `x` and `thumbnail` value.
    pub base_url: String,
    /// Recognised class names, compared case-insensitively.
    pub labels: Vec<String>,
    pub unknown_label: String,
    /// Manifest file name inside the corpus root.
    pub file_name: String,
    pub extensions: ExtensionFilter,
}

impl Default for ManifestOptions {
    fn default() -> Self {
        ManifestOptions {
            base_url: String::new(),
            labels: DEFAULT_LABELS.iter().map(|l| l.to_string()).collect(),
            unknown_label: UNKNOWN_LABEL.to_string(),
            file_name: MANIFEST_FILE_NAME.to_string(),
            extensions: ExtensionFilter::manifest(),
        }
    }
}

/// Options of the publisher. The backend URL lives on the
/// [`Client`][crate::Client].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishOptions {
    pub dataset_name: String,
    pub extensions: ExtensionFilter,
}

impl Default for PublishOptions {
    fn default() -> Self {
        PublishOptions {
            dataset_name: DEFAULT_DATASET_NAME.to_string(),
            extensions: ExtensionFilter::publishable(),
        }
    }
}

/// Operator settings loaded from file and environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Root of the raw class-labelled tree.
    pub input: PathBuf,
    /// Root of the normalized corpus.
    pub output: PathBuf,
    pub width: u32,
    pub height: u32,
    pub quality: u8,
    pub base_url: String,
    pub backend_url: String,
    pub dataset_name: String,
    pub labels: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            input: PathBuf::from("Dataset"),
            output: PathBuf::from("Dataset_resized"),
            width: DEFAULT_SIZE,
            height: DEFAULT_SIZE,
            quality: DEFAULT_QUALITY,
            base_url: String::new(),
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            dataset_name: DEFAULT_DATASET_NAME.to_string(),
            labels: DEFAULT_LABELS.iter().map(|l| l.to_string()).collect(),
        }
    }
}

impl Settings {
    /// Loads settings from `path` (required when given) or from the default
    /// config file when it exists, then applies `IMGCORPUS_*` environment
    /// variables on top. Missing keys keep their defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, Error> {
        let mut builder = Config::builder();

        match path {
            Some(path) => {
                debug!("Loading settings from {}", path.display());
                builder = builder.add_source(File::from(path).required(true));
            }
            None => {
                if let Some(path) = default_config_path() {
                    debug!("Looking for settings in {}", path.display());
                    builder = builder.add_source(File::from(path).required(false));
                }
            }
        }

        let settings: Settings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("labels"),
            )
            .build()?
            .try_deserialize()?;

        Ok(settings)
    }

    pub fn normalize_options(&self) -> NormalizeOptions {
        NormalizeOptions {
            width: self.width,
            height: self.height,
            quality: self.quality,
            ..Default::default()
        }
    }

    pub fn corpus_options(&self) -> CorpusOptions {
        CorpusOptions {
            normalize: self.normalize_options(),
            ..Default::default()
        }
    }

    pub fn manifest_options(&self) -> ManifestOptions {
        ManifestOptions {
            base_url: self.base_url.clone(),
            labels: self.labels.clone(),
            ..Default::default()
        }
    }

    pub fn publish_options(&self) -> PublishOptions {
        PublishOptions {
            dataset_name: self.dataset_name.clone(),
            ..Default::default()
        }
    }
}

/// `<config dir>/imgcorpus/config.toml` for the current platform.
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("ai", "EdgeFirst", "imgcorpus")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}
