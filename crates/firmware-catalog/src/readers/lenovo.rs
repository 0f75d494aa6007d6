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

//! Lenovo catalog reader. Lenovo has no static catalog: the content service is queried once
//! per machine type (and exemplar serial number) and every answer is cached on disk.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use super::CatalogReader;
use crate::error::{CatalogError, CatalogResult};
use crate::filter::SystemCompatibilityFilter;
use crate::model::{
    Catalog, CatalogMeta, Descriptor, FirmwareComponent, Severity, Vendor, VendorCatalogSource,
    descriptor,
};
use crate::transport;

pub const DEFAULT_ENDPOINT: &str =
    "https://support.lenovo.com/services/ContentService/SearchDrivers";

const CACHE_DIR_NAME: &str = "lenovo-catalog";
const FIRMWARE_COMPONENTS: [&str; 3] = ["XCC", "UEFI", "LXPM"];

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TargetInfo {
    pub machine_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct SearchDriversRequest<'a> {
    query_type: &'a str,
    is_latest: &'a str,
    target_infos: Vec<&'a TargetInfo>,
}

impl<'a> SearchDriversRequest<'a> {
    fn new(target: &'a TargetInfo) -> Self {
        SearchDriversRequest {
            query_type: "SUP",
            is_latest: "true",
            target_infos: vec![target],
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SearchDriversResponse {
    #[serde(default)]
    pub result_code: i64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Vec<LenovoUpdate>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LenovoUpdate {
    #[serde(rename = "FixID", default)]
    pub fix_id: String,
    #[serde(rename = "ComponentID", default)]
    pub component_id: String,
    #[serde(default)]
    pub files: Vec<LenovoFile>,
    #[serde(rename = "RequisitesFixIDs", default)]
    pub requisites_fix_ids: Vec<String>,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub date: Option<LenovoDate>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LenovoFile {
    #[serde(rename = "Type", default)]
    pub file_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "URL", default)]
    pub url: String,
}

#[derive(Clone, Copy, Debug, Default, Deserialize)]
pub struct LenovoDate {
    // Milliseconds since the epoch.
    #[serde(rename = "Unix", default)]
    pub unix: Option<i64>,
}

impl LenovoUpdate {
    fn file(&self, file_type: &str) -> Option<&LenovoFile> {
        self.files.iter().find(|f| f.file_type == file_type)
    }

    fn released(&self) -> Option<DateTime<Utc>> {
        self.date
            .and_then(|d| d.unix)
            .and_then(DateTime::from_timestamp_millis)
    }
}

pub fn severity(value: Option<&str>) -> Severity {
    match value.map(str::trim) {
        Some("Critical") => Severity::Critical,
        Some("Suggested") | Some("Recommended") => Severity::Recommended,
        Some("Non-Critical") | Some("Optional") => Severity::Optional,
        _ => Severity::Unknown,
    }
}

/// Name of the cached response for one target: `lenovo_<type>[_<serial>].json`.
pub fn cache_file_name(target: &TargetInfo) -> String {
    match target.serial_number.as_deref() {
        Some(serial) => format!("lenovo_{}_{serial}.json", target.machine_type),
        None => format!("lenovo_{}.json", target.machine_type),
    }
}

/// One query per machine type. An empty exemplar serial means the query carries no serial.
pub fn targets(filter: &SystemCompatibilityFilter) -> CatalogResult<Vec<TargetInfo>> {
    let mut filter = filter.clone();
    filter.ensure_exemplars();
    if filter.exemplars().is_empty() {
        return Err(CatalogError::config(
            "Lenovo catalogs need at least one machine type in systems_filter or server_types_filter",
        ));
    }
    Ok(filter
        .exemplars()
        .iter()
        .map(|(machine_type, serial)| TargetInfo {
            machine_type: machine_type.clone(),
            serial_number: (!serial.is_empty()).then(|| serial.clone()),
        })
        .collect())
}

fn parse_response(raw: &[u8], what: &str) -> CatalogResult<SearchDriversResponse> {
    let response: SearchDriversResponse =
        serde_json::from_slice(raw).map_err(|e| CatalogError::parse(what, e))?;
    if response.result_code != 0 {
        return Err(CatalogError::VendorResult {
            code: response.result_code,
            message: response.message.unwrap_or_default(),
        });
    }
    Ok(response)
}

fn system_descriptor(target: &TargetInfo) -> Descriptor {
    descriptor([
        ("machineType", target.machine_type.as_str()),
        ("serialNumber", target.serial_number.as_deref().unwrap_or("")),
    ])
}

fn file_name_of(url: &str) -> Option<String> {
    let url = Url::parse(url).ok()?;
    url.path_segments()?
        .next_back()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Clone)]
pub struct LenovoReader {
    http_client: reqwest::Client,
}

impl LenovoReader {
    pub fn new(http_client: reqwest::Client) -> Self {
        LenovoReader { http_client }
    }

    fn endpoint(source: &VendorCatalogSource) -> CatalogResult<Url> {
        match &source.vendor_url {
            Some(url) => Ok(url.clone()),
            None => Url::parse(DEFAULT_ENDPOINT)
                .map_err(|e| CatalogError::config(format!("invalid Lenovo endpoint: {e}"))),
        }
    }

    fn cache_dir(source: &VendorCatalogSource) -> PathBuf {
        source
            .local_catalog_path
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join(CACHE_DIR_NAME))
    }

    /// Answers from the cache when a response for `target` was saved before, otherwise asks
    /// the content service and saves a successful answer.
    async fn query(
        &self,
        endpoint: &Url,
        token: Option<&str>,
        cache_dir: &Path,
        target: &TargetInfo,
    ) -> CatalogResult<SearchDriversResponse> {
        let cache_path = cache_dir.join(cache_file_name(target));
        let cached = tokio::fs::try_exists(&cache_path)
            .await
            .map_err(|e| CatalogError::io("checking Lenovo cache", &cache_path, e))?;

        if cached {
            tracing::debug!(path = %cache_path.display(), "using cached Lenovo response");
            let raw = tokio::fs::read(&cache_path)
                .await
                .map_err(|e| CatalogError::io("reading Lenovo cache", &cache_path, e))?;
            return parse_response(&raw, &cache_path.display().to_string());
        }

        tracing::info!(
            machine_type = %target.machine_type,
            serial_number = target.serial_number.as_deref().unwrap_or(""),
            %endpoint,
            "querying Lenovo content service"
        );
        let raw = transport::post_json(
            &self.http_client,
            endpoint,
            token,
            &SearchDriversRequest::new(target),
        )
        .await?;
        let response = parse_response(&raw, "Lenovo SearchDrivers response")?;

        tokio::fs::create_dir_all(cache_dir)
            .await
            .map_err(|e| CatalogError::io("creating Lenovo cache", cache_dir, e))?;
        tokio::fs::write(&cache_path, &raw)
            .await
            .map_err(|e| CatalogError::io("writing Lenovo cache", &cache_path, e))?;
        Ok(response)
    }
}

#[async_trait]
impl CatalogReader for LenovoReader {
    fn vendor(&self) -> Vendor {
        Vendor::Lenovo
    }

    async fn read(
        &self,
        source: &VendorCatalogSource,
        filter: &SystemCompatibilityFilter,
    ) -> CatalogResult<Catalog> {
        let targets = targets(filter)?;
        let endpoint = Self::endpoint(source)?;
        let cache_dir = Self::cache_dir(source);

        let machine_types: Vec<&str> = targets.iter().map(|t| t.machine_type.as_str()).collect();
        let queried: Vec<_> = targets.iter().map(system_descriptor).collect();
        let mut catalog = Catalog::new(CatalogMeta {
            vendor: Vendor::Lenovo,
            vendor_id: machine_types.join(","),
            vendor_url: Some(endpoint.to_string()),
            release_timestamp: Utc::now(),
            vendor_configuration: serde_json::json!({
                "queryType": "SUP",
                "isLatest": true,
                "targets": queried,
            }),
        });
        let mut latest: Option<DateTime<Utc>> = None;

        for target in &targets {
            let response = self
                .query(&endpoint, source.vendor_token.as_deref(), &cache_dir, target)
                .await?;
            for update in response.data {
                if let Some(binary) = component_from_update(&update, target) {
                    latest = latest.max(update.released());
                    catalog.push_component(binary);
                }
            }
        }

        if let Some(latest) = latest {
            catalog.meta.release_timestamp = latest;
        }
        Ok(catalog)
    }
}

/// Maps one update to a component, or `None` when it is not BMC, UEFI or LXPM firmware or
/// has no Fix file.
pub fn component_from_update(
    update: &LenovoUpdate,
    target: &TargetInfo,
) -> Option<FirmwareComponent> {
    if !FIRMWARE_COMPONENTS.contains(&update.component_id.as_str()) {
        tracing::debug!(
            fix_id = %update.fix_id,
            component = %update.component_id,
            "not a firmware update, skipping"
        );
        return None;
    }
    let Some(fix) = update.file("Fix") else {
        tracing::warn!(fix_id = %update.fix_id, "update has no Fix file, skipping");
        return None;
    };

    let external_id = file_name_of(&fix.url).unwrap_or_else(|| update.fix_id.clone());
    let released = update.released().unwrap_or_else(Utc::now);
    let mut binary = FirmwareComponent::new(external_id, released);
    binary.name = update
        .file("InstallXML")
        .map(|f| f.description.trim())
        .filter(|d| !d.is_empty())
        .unwrap_or(update.fix_id.as_str())
        .to_string();
    binary.package_id = update.fix_id.clone();
    binary.package_version = update.version.clone();
    binary.reboot_required = true;
    binary.severity = severity(update.severity.as_deref());
    binary.vendor_download_url = (!fix.url.is_empty()).then(|| fix.url.clone());
    binary.supported_devices = vec![descriptor([("componentId", update.component_id.as_str())])];
    binary.supported_systems = vec![system_descriptor(target)];
    binary.vendor_metadata = serde_json::json!({
        "fixId": update.fix_id,
        "componentId": update.component_id,
        "requisitesFixIds": update.requisites_fix_ids,
        "files": update.files,
    });
    Some(binary)
}
