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

//! Binary materialization: get each firmware payload onto local disk (downloading it or
//! finding it staged) and optionally re-host it in the managed repository.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use url::Url;

use crate::checksum;
use crate::error::{CatalogError, CatalogResult};
use crate::model::FirmwareComponent;
use crate::repository::{RepositoryConnector, RepositorySession};
use crate::transport;

#[derive(Clone, Debug, Default)]
pub struct MaterializeOptions {
    pub download: bool,
    pub upload: bool,
    // Download destination, or where staged binaries are expected when not downloading.
    // Binaries are named by external id below it.
    pub local_binaries_path: Option<PathBuf>,
    pub vendor_token: Option<String>,
    // Base of cache download URLs. Without it the cache URL is the bare external id.
    pub repository_base_url: Option<Url>,
}

impl MaterializeOptions {
    pub fn requested(&self) -> bool {
        self.download || self.upload
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Materialized {
    /// Re-hosted; carries the cache download URL.
    Hosted(String),
    /// On local disk, not uploaded.
    Staged(PathBuf),
    NotRequested,
    /// Per-component anomaly. The component is not submitted.
    Skipped(String),
}

/// Cache download URL of `external_id` below `base`.
pub fn cache_url(base: Option<&Url>, external_id: &str) -> String {
    let Some(base) = base else {
        return external_id.to_string();
    };
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    match base.join(external_id.trim_start_matches('/')) {
        Ok(url) => url.to_string(),
        Err(e) => {
            tracing::warn!(
                %base,
                %external_id,
                error = %e,
                "cannot join repository URL, using the bare external id"
            );
            external_id.to_string()
        }
    }
}

pub struct Materializer {
    http_client: reqwest::Client,
    options: MaterializeOptions,
    connector: Option<Arc<dyn RepositoryConnector>>,
    session: Option<Box<dyn RepositorySession>>,
    staging: Option<tempfile::TempDir>,
}

impl std::fmt::Debug for Materializer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Materializer")
            .field("options", &self.options)
            .field("connector", &self.connector)
            .field("connected", &self.session.is_some())
            .finish()
    }
}

impl Materializer {
    pub fn new(
        http_client: reqwest::Client,
        options: MaterializeOptions,
        connector: Option<Arc<dyn RepositoryConnector>>,
    ) -> Self {
        Materializer {
            http_client,
            options,
            connector,
            session: None,
            staging: None,
        }
    }

    fn staging_dir(&mut self) -> CatalogResult<PathBuf> {
        if let Some(path) = &self.options.local_binaries_path {
            return Ok(path.clone());
        }
        if self.staging.is_none() {
            let dir = tempfile::Builder::new()
                .prefix("firmware-catalog")
                .tempdir()
                .map_err(|e| {
                    CatalogError::io("creating staging directory", &std::env::temp_dir(), e)
                })?;
            self.staging = Some(dir);
        }
        Ok(self
            .staging
            .as_ref()
            .map(|d| d.path().to_path_buf())
            .unwrap_or_else(std::env::temp_dir))
    }

    async fn session(&mut self) -> CatalogResult<&mut Box<dyn RepositorySession>> {
        if self.session.is_none() {
            let Some(connector) = &self.connector else {
                return Err(CatalogError::config(
                    "upload_binaries requires a [repository] section",
                ));
            };
            tracing::info!(?connector, "connecting to binary repository");
            self.session = Some(connector.connect().await?);
        }
        self.session
            .as_mut()
            .ok_or_else(|| CatalogError::config("repository session is not open"))
    }

    /// Puts the payload of `component` on local disk. `Err(reason)` inside the result is a
    /// per-component anomaly. Files already on disk are checked against the component
    /// checksum before they are used.
    async fn stage(
        &mut self,
        component: &FirmwareComponent,
    ) -> CatalogResult<Result<PathBuf, String>> {
        if let Some(path) = &component.local_path
            && path.is_file()
        {
            verify_staged(path, component)?;
            return Ok(Ok(path.clone()));
        }

        if !self.options.download {
            let expected = self
                .options
                .local_binaries_path
                .as_ref()
                .map(|dir| dir.join(&component.external_id));
            return Ok(match expected {
                Some(path) if path.is_file() => {
                    verify_staged(&path, component)?;
                    Ok(path)
                }
                Some(path) => Err(format!("no local binary at {}", path.display())),
                None => Err("no local binary and downloads are disabled".to_string()),
            });
        }

        let Some(url) = component.vendor_download_url.as_deref() else {
            return Ok(Err("no vendor download URL".to_string()));
        };
        let url = Url::parse(url).map_err(|e| {
            CatalogError::parse(format!("download URL of {}", component.external_id), e)
        })?;

        let destination = self.staging_dir()?.join(&component.external_id);
        transport::download_to(
            &self.http_client,
            &url,
            self.options.vendor_token.as_deref(),
            &destination,
            component.checksum.as_ref(),
        )
        .await?;
        Ok(Ok(destination))
    }

    /// Materializes one component, recording the staged path and, once uploaded, the cache
    /// download URL on it. Transport and checksum failures are errors; missing inputs skip
    /// the component.
    pub async fn materialize(
        &mut self,
        component: &mut FirmwareComponent,
    ) -> CatalogResult<Materialized> {
        if !self.options.requested() {
            return Ok(Materialized::NotRequested);
        }

        let path = match self.stage(component).await? {
            Ok(path) => path,
            Err(reason) => {
                tracing::warn!(
                    external_id = %component.external_id,
                    %reason,
                    "skipping component"
                );
                return Ok(Materialized::Skipped(reason));
            }
        };
        component.local_path = Some(path.clone());

        if !self.options.upload {
            return Ok(Materialized::Staged(path));
        }

        let external_id = component.external_id.clone();
        let session = self.session().await?;
        session.upload(&path, &external_id).await?;

        let url = cache_url(self.options.repository_base_url.as_ref(), &external_id);
        tracing::info!(%external_id, cache_download_url = %url, "binary re-hosted");
        component.cache_download_url = Some(url.clone());
        Ok(Materialized::Hosted(url))
    }

    /// Closes the repository session, if one was opened.
    pub async fn finish(&mut self) -> CatalogResult<()> {
        if let Some(session) = self.session.take() {
            session.close().await?;
            tracing::debug!("repository session closed");
        }
        Ok(())
    }
}

fn verify_staged(path: &Path, component: &FirmwareComponent) -> CatalogResult<()> {
    match &component.checksum {
        Some(expected) => checksum::verify_file(path, expected),
        None => Ok(()),
    }
}
