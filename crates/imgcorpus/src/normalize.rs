// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Single image normalization: decode, convert to RGB, stretch to the target
//! size and re-encode as JPEG.

use crate::{Error, NormalizeOptions};
use image::{ImageReader, RgbImage, imageops};
use jpeg_encoder::{ColorType, Encoder};
use log::trace;
use std::{fs, path::Path};

/// Normalizes the image at `source` and writes it to `dest`.
///
/// The image is converted to 3-channel RGB (alpha and palettes are dropped)
/// and resized to exactly `options.width × options.height`, ignoring the
/// source aspect ratio. Missing parent directories of `dest` are created.
/// The encoded image is fully built in memory before `dest` is written, so a
/// failure never leaves a partial file behind.
///
/// Every failure is reported as [`Error::DecodeError`] naming the source
/// file; the caller decides whether to skip it.
///
/// # Examples
///
/// ```rust,no_run
/// use imgcorpus::{NormalizeOptions, normalize_image};
/// use std::path::Path;
///
/// normalize_image(
///     Path::new("Dataset/Oil/portrait.png"),
///     Path::new("Dataset_resized/Oil/oil1.jpg"),
///     &NormalizeOptions::default(),
/// )?;
/// # Ok::<(), imgcorpus::Error>(())
/// ```
pub fn normalize_image(
    source: &Path,
    dest: &Path,
    options: &NormalizeOptions,
) -> Result<(), Error> {
    let fail = |reason: String| Error::DecodeError(source.to_path_buf(), reason);

    let image = ImageReader::open(source)
        .map_err(|e| fail(e.to_string()))?
        .with_guessed_format()
        .map_err(|e| fail(e.to_string()))?
        .decode()
        .map_err(|e| fail(e.to_string()))?;

    trace!(
        "Decoded {} ({}x{} {:?})",
        source.display(),
        image.width(),
        image.height(),
        image.color()
    );

    let resized = imageops::resize(
        &image.to_rgb8(),
        options.width,
        options.height,
        options.filter,
    );
    let encoded =
        encode_jpeg(&resized, options.quality, options.optimize).map_err(fail)?;

    if dest.is_dir() {
        return Err(fail(format!(
            "destination {} is a directory",
            dest.display()
        )));
    }

    if let Some(parent) = dest.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .map_err(|e| fail(format!("cannot create {}: {}", parent.display(), e)))?;
    }

    fs::write(dest, &encoded)
        .map_err(|e| fail(format!("cannot write {}: {}", dest.display(), e)))?;

    Ok(())
}

/// Encodes `image` as a baseline JPEG in memory.
fn encode_jpeg(image: &RgbImage, quality: u8, optimize: bool) -> Result<Vec<u8>, String> {
    let (Ok(width), Ok(height)) = (u16::try_from(image.width()), u16::try_from(image.height()))
    else {
        return Err(format!(
            "{}x{} exceeds the JPEG size limit",
            image.width(),
            image.height()
        ));
    };

    let mut encoded = Vec::new();
    let mut encoder = Encoder::new(&mut encoded, quality);
    encoder.set_optimized_huffman_tables(optimize);
    encoder
        .encode(image.as_raw(), width, height, ColorType::Rgb)
        .map_err(|e| e.to_string())?;
    Ok(encoded)
}
