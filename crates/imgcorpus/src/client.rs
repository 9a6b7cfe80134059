// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

use crate::{DEFAULT_BACKEND_URL, Error, publish::DatasetRecord};
use log::{Level, debug, log_enabled, trace};
use reqwest::{
    Response,
    multipart::{Form, Part},
};
use serde_json::Value;
use std::{path::Path, time::Duration};
use url::Url;

const USER_AGENT: &str = concat!("imgcorpus/", env!("CARGO_PKG_VERSION"));

/// HTTP client for the remote dataset service.
///
/// The service exposes two endpoints used by the publisher:
///
/// - `POST {url}/assets` accepts a multipart upload with the image in the
///   `uri` field and answers with a JSON object carrying the asset locator
///   under `uri` (or an `id`).
/// - `POST {url}/{dataset}` creates a dataset record from a JSON body
///   `{x, y, thumbnail}`.
///
/// Every call issues exactly one request. There is no retry and no request
/// timeout; a stalled server stalls the caller.
///
/// # Examples
///
/// ```no_run
/// use imgcorpus::Client;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), imgcorpus::Error> {
/// let client = Client::new()?.with_server("http://localhost:3030")?;
/// let locator = client.upload_asset(Path::new("Dataset_resized/Oil/oil1.jpg")).await?;
/// println!("Uploaded to {}", locator);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct Client {
    http: reqwest::Client,
    url: String,
}

impl Client {
    /// Creates a client for the default backend, `http://localhost:3030`.
    pub fn new() -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Client {
            http,
            url: DEFAULT_BACKEND_URL.to_string(),
        })
    }

    /// Returns a new client pointed at `url`, which must be an absolute
    /// http(s) URL. A trailing slash is dropped.
    pub fn with_server(&self, url: &str) -> Result<Self, Error> {
        let parsed = Url::parse(url)?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::InvalidParameters(format!(
                "unsupported backend scheme: {}",
                parsed.scheme()
            )));
        }

        Ok(Client {
            url: url.trim_end_matches('/').to_string(),
            ..self.clone()
        })
    }

    /// Base URL of the dataset service.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Uploads the file at `path` and returns its asset locator.
    ///
    /// The locator is the `uri` of the response when present and non-empty,
    /// otherwise `/assets/<id>`, otherwise `/assets/<file name>`.
    ///
    /// # Errors
    ///
    /// [`Error::UploadError`] when the server answers with a non-2xx status;
    /// transport, I/O and JSON errors are returned as their own variants.
    pub async fn upload_asset(&self, path: &Path) -> Result<String, Error> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                Error::InvalidParameters(format!("invalid file name: {}", path.display()))
            })?
            .to_owned();

        let part = Part::file(path)
            .await?
            .file_name(file_name.clone())
            .mime_str("image/jpeg")?;
        let form = Form::new().part("uri", part);

        let resp = self
            .http
            .post(format!("{}/assets", self.url))
            .header("Accept", "application/json")
            .header("User-Agent", USER_AGENT)
            .multipart(form)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = error_body(resp).await;
            trace!("Upload Response ({}): {}", status, body);
            return Err(Error::UploadError(Some(status.as_u16()), body));
        }

        let body = resp.text().await?;
        if log_enabled!(Level::Trace) {
            trace!("Upload Response ({}): {}", status, body);
        }

        let response: Value = serde_json::from_str(&body)?;
        let locator = asset_locator(&response, &file_name);
        debug!("Uploaded {} as {}", path.display(), locator);
        Ok(locator)
    }

    /// Creates `record` in the dataset named `dataset`.
    ///
    /// # Errors
    ///
    /// [`Error::RecordCreationError`] when the server answers with a non-2xx
    /// status; transport errors are returned as [`Error::HttpError`].
    pub async fn create_record(&self, dataset: &str, record: &DatasetRecord) -> Result<(), Error> {
        if log_enabled!(Level::Trace) {
            trace!(
                "Record Request: {}",
                serde_json::ser::to_string_pretty(record)?
            );
        }

        let resp = self
            .http
            .post(format!("{}/{}", self.url, dataset))
            .header("Accept", "application/json")
            .header("User-Agent", USER_AGENT)
            .json(record)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = error_body(resp).await;
            trace!("Record Response ({}): {}", status, body);
            return Err(Error::RecordCreationError(Some(status.as_u16()), body));
        }

        let body = resp.text().await?;
        if log_enabled!(Level::Trace) {
            trace!("Record Response ({}): {}", status, body);
        }

        Ok(())
    }
}

/// Body of a rejected request, kept for the error message.
async fn error_body(resp: Response) -> String {
    match resp.text().await {
        Ok(body) => body,
        Err(err) => format!("(response body unavailable: {})", err),
    }
}

/// Extracts the asset locator from an upload response.
fn asset_locator(response: &Value, file_name: &str) -> String {
    if let Some(uri) = response.get("uri").and_then(Value::as_str)
        && !uri.is_empty()
    {
        return uri.to_owned();
    }

    match response.get("id") {
        Some(Value::String(id)) if !id.is_empty() => format!("/assets/{}", id),
        Some(Value::Number(id)) => format!("/assets/{}", id),
        _ => format!("/assets/{}", file_name),
    }
}
