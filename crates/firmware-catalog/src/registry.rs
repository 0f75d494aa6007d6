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

//! Client side of the Catalog Registry: the management API that persists catalogs and
//! their firmware binaries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{CatalogError, CatalogResult};
use crate::model::{CatalogMeta, Descriptor, FirmwareComponent, Severity, UpdateType, Vendor};

pub type CatalogId = i64;
pub type BinaryId = i64;

/// Base URL and credentials of the management API.
#[derive(Clone, Debug)]
pub struct ApiEndpoint {
    base: Url,
    api_key: Option<String>,
}

impl ApiEndpoint {
    pub fn new(base: &str, api_key: Option<String>) -> CatalogResult<Self> {
        // A trailing slash makes Url::join append instead of replacing the last segment.
        let base = if base.ends_with('/') {
            base.to_string()
        } else {
            format!("{base}/")
        };
        let base = Url::parse(&base)
            .map_err(|e| CatalogError::config(format!("invalid API endpoint {base}: {e}")))?;
        Ok(ApiEndpoint { base, api_key })
    }

    pub fn url(&self, path: &str) -> CatalogResult<Url> {
        self.base
            .join(path)
            .map_err(|e| CatalogError::config(format!("invalid API path {path}: {e}")))
    }

    pub fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCatalogRequest {
    pub name: String,
    pub description: Option<String>,
    pub vendor: Vendor,
    pub update_type: UpdateType,
    pub vendor_id: String,
    pub vendor_url: Option<String>,
    pub vendor_release_timestamp: DateTime<Utc>,
    pub vendor_configuration: serde_json::Value,
    pub supported_server_types: Vec<String>,
}

impl CreateCatalogRequest {
    pub fn new(
        name: &str,
        description: Option<&str>,
        update_type: UpdateType,
        meta: &CatalogMeta,
        supported_server_types: &[String],
    ) -> Self {
        CreateCatalogRequest {
            name: name.to_string(),
            description: description.map(str::to_string),
            vendor: meta.vendor,
            update_type,
            vendor_id: meta.vendor_id.clone(),
            vendor_url: meta.vendor_url.clone(),
            vendor_release_timestamp: meta.release_timestamp,
            vendor_configuration: meta.vendor_configuration.clone(),
            supported_server_types: supported_server_types.to_vec(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBinaryRequest {
    pub catalog_id: CatalogId,
    pub external_id: String,
    pub name: String,
    pub package_id: String,
    pub package_version: String,
    pub reboot_required: bool,
    pub update_severity: Severity,
    pub supported_devices: Vec<Descriptor>,
    pub supported_systems: Vec<Descriptor>,
    pub vendor_release_timestamp: DateTime<Utc>,
    pub vendor_download_url: Option<String>,
    pub cache_download_url: Option<String>,
    pub vendor_metadata: serde_json::Value,
}

impl CreateBinaryRequest {
    pub fn new(catalog_id: CatalogId, component: &FirmwareComponent) -> Self {
        CreateBinaryRequest {
            catalog_id,
            external_id: component.external_id.clone(),
            name: component.name.clone(),
            package_id: component.package_id.clone(),
            package_version: component.package_version.clone(),
            reboot_required: component.reboot_required,
            update_severity: component.severity,
            supported_devices: component.supported_devices.clone(),
            supported_systems: component.supported_systems.clone(),
            vendor_release_timestamp: component.release_timestamp,
            vendor_download_url: component.vendor_download_url.clone(),
            cache_download_url: component.cache_download_url.clone(),
            vendor_metadata: component.vendor_metadata.clone(),
        }
    }
}

// trait to create catalog and binary records on the management API
#[async_trait]
pub trait CatalogRegistry: std::fmt::Debug + Send + Sync {
    async fn create_catalog(&self, request: &CreateCatalogRequest) -> CatalogResult<CatalogId>;
    async fn create_binary(&self, request: &CreateBinaryRequest) -> CatalogResult<BinaryId>;
}

#[derive(Debug, Deserialize)]
struct Created {
    id: i64,
}

#[derive(Debug)]
pub struct RestCatalogRegistry {
    endpoint: ApiEndpoint,
    http_client: reqwest::Client,
}

impl RestCatalogRegistry {
    pub fn new(endpoint: ApiEndpoint, http_client: reqwest::Client) -> Self {
        RestCatalogRegistry {
            endpoint,
            http_client,
        }
    }

    async fn post<T: Serialize + Sync>(&self, path: &str, body: &T) -> CatalogResult<i64> {
        let url = self.endpoint.url(path)?;
        let response = self
            .endpoint
            .authorize(self.http_client.post(url.clone()))
            .json(body)
            .send()
            .await
            .map_err(|e| CatalogError::Registry(format!("POST {url}: {e}")))?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .map_err(|e| CatalogError::Registry(format!("POST {url}: {e}")))?;
        if !status.is_success() {
            return Err(CatalogError::Registry(format!(
                "POST {url} returned status {status} and message {response_text}"
            )));
        }

        let created: Created = serde_json::from_str(&response_text).map_err(|e| {
            CatalogError::Registry(format!("POST {url}: unexpected response body: {e}"))
        })?;
        Ok(created.id)
    }
}

#[async_trait]
impl CatalogRegistry for RestCatalogRegistry {
    async fn create_catalog(&self, request: &CreateCatalogRequest) -> CatalogResult<CatalogId> {
        let id = self.post("api/v2/firmware-catalogs", request).await?;
        tracing::info!(catalog_id = id, name = %request.name, "created firmware catalog");
        Ok(id)
    }

    async fn create_binary(&self, request: &CreateBinaryRequest) -> CatalogResult<BinaryId> {
        let id = self.post("api/v2/firmware-binaries", request).await?;
        tracing::info!(
            binary_id = id,
            catalog_id = request.catalog_id,
            external_id = %request.external_id,
            "created firmware binary"
        );
        Ok(id)
    }
}
