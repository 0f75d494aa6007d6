/*
 * SPDX-FileCopyrightText: Copyright (c) 2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
 * SPDX-License-Identifier: LicenseRef-NvidiaProprietary
 *
 * NVIDIA CORPORATION, its affiliates and licensors retain all intellectual
 * property and proprietary rights in and to this material, related
 * documentation and any modifications thereto. Any use, reproduction,
 * disclosure or distribution of this material and related documentation
 * without an express license agreement from NVIDIA CORPORATION or
 * its affiliates is strictly prohibited.
 */

// HTTP and filesystem access to vendor sources. Readers and the materializer get the
// reqwest::Client injected; nothing here builds its own.

use std::path::Path;

use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::checksum;
use crate::error::{CatalogError, CatalogResult};
use crate::model::{Checksum, SourceLocator, VendorCatalogSource};

fn with_token(request: reqwest::RequestBuilder, token: Option<&str>) -> reqwest::RequestBuilder {
    match token {
        // The token is configured already Base64 encoded.
        Some(token) if !token.is_empty() => {
            request.header(reqwest::header::AUTHORIZATION, format!("Basic {token}"))
        }
        _ => request,
    }
}

async fn get(
    client: &reqwest::Client,
    url: &Url,
    token: Option<&str>,
) -> CatalogResult<reqwest::Response> {
    let response = with_token(client.get(url.clone()), token)
        .send()
        .await
        .map_err(|e| CatalogError::http(format!("GET {url}"), e))?;
    let status = response.status();
    if !status.is_success() {
        return Err(CatalogError::HttpStatus {
            context: format!("GET {url}"),
            status,
        });
    }
    Ok(response)
}

/// Fetches a whole document into memory.
pub async fn fetch(
    client: &reqwest::Client,
    url: &Url,
    token: Option<&str>,
) -> CatalogResult<Vec<u8>> {
    let response = get(client, url, token).await?;
    let body = response
        .bytes()
        .await
        .map_err(|e| CatalogError::http(format!("reading body of {url}"), e))?;
    tracing::debug!(%url, bytes = body.len(), "fetched vendor document");
    Ok(body.to_vec())
}

/// POSTs `body` as JSON and returns the raw response body.
pub async fn post_json<T: serde::Serialize + ?Sized>(
    client: &reqwest::Client,
    url: &Url,
    token: Option<&str>,
    body: &T,
) -> CatalogResult<Vec<u8>> {
    let response = with_token(client.post(url.clone()), token)
        .json(body)
        .send()
        .await
        .map_err(|e| CatalogError::http(format!("POST {url}"), e))?;
    let status = response.status();
    if !status.is_success() {
        return Err(CatalogError::HttpStatus {
            context: format!("POST {url}"),
            status,
        });
    }
    let body = response
        .bytes()
        .await
        .map_err(|e| CatalogError::http(format!("reading body of {url}"), e))?;
    Ok(body.to_vec())
}

/// Reads the raw catalog document of `source`, from disk or over HTTP.
pub async fn read_catalog_source(
    client: &reqwest::Client,
    source: &VendorCatalogSource,
) -> CatalogResult<(Vec<u8>, SourceLocator)> {
    let locator = source.locator()?;
    let bytes = match &locator {
        SourceLocator::Path(path) => tokio::fs::read(path)
            .await
            .map_err(|e| CatalogError::io("reading local catalog", path, e))?,
        SourceLocator::Url(url) => fetch(client, url, source.vendor_token.as_deref()).await?,
    };
    Ok((bytes, locator))
}

/// Streams the body of `url` into `destination`, creating parent directories. The body is
/// written to a temporary file next to `destination` and only renamed into place once it
/// matches `checksum`; a failed or corrupt download leaves nothing behind.
/// Returns the number of bytes written.
pub async fn download_to(
    client: &reqwest::Client,
    url: &Url,
    token: Option<&str>,
    destination: &Path,
    checksum: Option<&Checksum>,
) -> CatalogResult<u64> {
    let parent = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    tokio::fs::create_dir_all(parent)
        .await
        .map_err(|e| CatalogError::io("creating download directory", parent, e))?;

    let response = get(client, url, token).await?;
    let partial = tempfile::NamedTempFile::new_in(parent)
        .map_err(|e| CatalogError::io("creating download file", parent, e))?;
    let handle = partial
        .reopen()
        .map_err(|e| CatalogError::io("opening download file", partial.path(), e))?;
    let mut file = tokio::fs::File::from_std(handle);

    let mut written = 0u64;
    let mut body = response.bytes_stream();
    while let Some(segment) = body.next().await {
        let segment = segment.map_err(|e| CatalogError::http(format!("downloading {url}"), e))?;
        file.write_all(&segment)
            .await
            .map_err(|e| CatalogError::io("writing download", partial.path(), e))?;
        written += segment.len() as u64;
    }
    file.flush()
        .await
        .map_err(|e| CatalogError::io("writing download", partial.path(), e))?;
    drop(file);

    if let Some(expected) = checksum {
        checksum::verify_file(partial.path(), expected)?;
    }
    partial
        .persist(destination)
        .map_err(|e| CatalogError::io("moving download into place", destination, e.error))?;

    tracing::info!(%url, path = %destination.display(), bytes = written, "downloaded binary");
    Ok(written)
}
