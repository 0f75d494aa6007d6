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

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{CatalogError, CatalogResult};
use crate::registry::ApiEndpoint;

/// One registered server as reported by the inventory.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryServer {
    #[serde(default)]
    pub vendor: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub serial_number: Option<String>,
}

// trait to look up registered hardware by server type
#[async_trait]
pub trait Inventory: std::fmt::Debug + Send + Sync {
    async fn servers_of_type(&self, server_type: &str) -> CatalogResult<Vec<InventoryServer>>;
}

#[derive(Debug, Deserialize)]
struct ServerPage {
    #[serde(default)]
    data: Vec<InventoryServer>,
}

#[derive(Debug)]
pub struct RestInventory {
    endpoint: ApiEndpoint,
    http_client: reqwest::Client,
}

impl RestInventory {
    pub fn new(endpoint: ApiEndpoint, http_client: reqwest::Client) -> Self {
        RestInventory {
            endpoint,
            http_client,
        }
    }
}

#[async_trait]
impl Inventory for RestInventory {
    async fn servers_of_type(&self, server_type: &str) -> CatalogResult<Vec<InventoryServer>> {
        let url = self.endpoint.url("api/v2/servers")?;
        let filter = format!("$eq:{server_type}");
        let response = self
            .endpoint
            .authorize(self.http_client.get(url.clone()))
            .query(&[("filter.serverTypeId", filter.as_str())])
            .send()
            .await
            .map_err(|e| CatalogError::Inventory(format!("GET {url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Inventory(format!(
                "GET {url} for server type {server_type} returned status {status}"
            )));
        }

        let page: ServerPage = response
            .json()
            .await
            .map_err(|e| {
                CatalogError::Inventory(format!("decoding servers of {server_type}: {e}"))
            })?;
        tracing::debug!(%server_type, count = page.data.len(), "looked up servers");
        Ok(page.data)
    }
}
