//! HTTP client with JSON helpers and redirect-bounded downloads.

use anyhow::{Context, Result};
use futures_util::StreamExt;
use log::debug;
use reqwest::header::LOCATION;
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::io::Write;

use crate::error::PackageError;

/// Redirect hops followed before a download is abandoned.
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// HTTP client shared by the registry client and the download transport.
///
/// Requests are made exactly once. Nothing here retries.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Creates a new HTTP client wrapping the given reqwest Client.
    ///
    /// `download_file` follows redirects itself, so the wrapped client
    /// should be built with `redirect::Policy::none()` when used for
    /// downloads.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Returns a reference to the underlying reqwest Client.
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Performs a GET request with query parameters and deserializes the JSON response.
    #[tracing::instrument(skip(self, query))]
    pub async fn get_json_with_query<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        debug!("GET JSON from {} with query {:?}...", url, query);

        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(PackageError::Network)?;

        let body = checked_body(response).await?;
        parse_json(&body)
    }

    /// Like [`get_json_with_query`](Self::get_json_with_query), but an empty
    /// body, a JSON `null` or a 404 yields `None`.
    #[tracing::instrument(skip(self, query))]
    pub async fn get_optional_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<Option<T>> {
        debug!("GET optional JSON from {} with query {:?}...", url, query);

        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(PackageError::Network)?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!("{} answered 404", url);
            return Ok(None);
        }

        let body = checked_body(response).await?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        parse_json::<Option<T>>(&body)
    }

    /// POSTs a form-encoded body and deserializes the JSON response.
    #[tracing::instrument(skip(self, form))]
    pub async fn post_form<T: DeserializeOwned>(
        &self,
        url: &str,
        form: &[(&str, &str)],
    ) -> Result<T> {
        debug!("POST form to {}...", url);

        let response = self
            .client
            .post(url)
            .form(form)
            .send()
            .await
            .map_err(PackageError::Network)?;

        let body = checked_body(response).await?;
        parse_json(&body)
    }

    /// Downloads `url`, following at most `max_redirects` redirect hops, and
    /// streams the final body into the writer returned by `create_writer`.
    ///
    /// The writer is only created once a successful response arrives, so a
    /// failed request never leaves a file behind.
    #[tracing::instrument(skip(self, create_writer))]
    pub async fn download_file<W, F>(
        &self,
        url: &str,
        max_redirects: usize,
        create_writer: F,
    ) -> Result<u64>
    where
        W: Write,
        F: FnOnce() -> Result<W>,
    {
        debug!("Downloading file from {}...", url);

        let mut current = Url::parse(url)
            .map_err(|e| PackageError::registry(format!("Invalid download URL '{}': {}", url, e)))?;
        let mut remaining = max_redirects;

        let response = loop {
            let response = self
                .client
                .get(current.clone())
                .send()
                .await
                .map_err(PackageError::Network)?;

            let status = response.status();
            if !is_followed_redirect(status) {
                break response;
            }

            if remaining == 0 {
                return Err(PackageError::RedirectLoop {
                    limit: max_redirects,
                }
                .into());
            }
            remaining -= 1;

            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|value| value.to_str().ok())
                .ok_or(PackageError::HttpStatus {
                    code: status.as_u16(),
                })?;
            current = current.join(location).map_err(|e| {
                PackageError::registry(format!("Invalid redirect location '{}': {}", location, e))
            })?;
            debug!("{} redirect to {}", status.as_u16(), current);
        };

        let status = response.status();
        if !status.is_success() {
            return Err(PackageError::HttpStatus {
                code: status.as_u16(),
            }
            .into());
        }

        let mut writer = create_writer()?;
        let mut downloaded_bytes: u64 = 0;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(PackageError::Network)?;
            writer
                .write_all(&chunk)
                .context("Failed to write chunk to file")
                .map_err(|e| PackageError::filesystem(&e))?;
            downloaded_bytes += chunk.len() as u64;
        }
        writer
            .flush()
            .context("Failed to flush downloaded file")
            .map_err(|e| PackageError::filesystem(&e))?;

        debug!(
            "Downloaded {:.2} MB",
            downloaded_bytes as f64 / (1024.0 * 1024.0)
        );

        Ok(downloaded_bytes)
    }
}

/// Status codes the download transport follows through `Location`.
pub fn is_followed_redirect(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    )
}

async fn checked_body(response: Response) -> Result<String> {
    let status = response.status();
    if !status.is_success() {
        return Err(PackageError::HttpStatus {
            code: status.as_u16(),
        }
        .into());
    }
    Ok(response.text().await.map_err(PackageError::Network)?)
}

fn parse_json<T: DeserializeOwned>(body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| {
        PackageError::registry(format!("Malformed response from registry: {}", e)).into()
    })
}
