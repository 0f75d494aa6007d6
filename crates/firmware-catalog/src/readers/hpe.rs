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

//! HPE catalog reader. The source is the JSON package map of an HPE firmware repository,
//! keyed by package file name.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Deserializer};
use url::Url;

use super::CatalogReader;
use crate::error::{CatalogError, CatalogResult};
use crate::filter::SystemCompatibilityFilter;
use crate::model::{
    Catalog, CatalogMeta, FirmwareComponent, SourceLocator, Vendor, VendorCatalogSource,
    descriptor,
};
use crate::transport;

const PACKAGE_SUFFIX: &str = ".fwpkg";

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct HpePackage {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub deviceclass: String,
    #[serde(default)]
    pub minimum_active_version: Option<String>,
    #[serde(default)]
    pub reboot_required: String,
    #[serde(default, deserialize_with = "string_or_list")]
    pub target: Vec<String>,
    #[serde(default)]
    pub version: String,
}

/// Decoding contract of `target`: a JSON array of strings is taken as is; failing that a
/// single string is wrapped into a one element list; `null` is an empty list. Any other JSON
/// type is an error.
fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Array(values) => values
            .into_iter()
            .map(|v| match v {
                serde_json::Value::String(s) => Ok(s),
                other => Err(D::Error::custom(format!(
                    "target array must hold strings, found {other}"
                ))),
            })
            .collect(),
        serde_json::Value::String(s) => Ok(vec![s]),
        serde_json::Value::Null => Ok(Vec::new()),
        other => Err(D::Error::custom(format!(
            "target must be a string or an array of strings, found {other}"
        ))),
    }
}

pub fn parse_package_map(raw: &[u8]) -> CatalogResult<BTreeMap<String, HpePackage>> {
    serde_json::from_slice(raw).map_err(|e| CatalogError::parse("HPE package map", e))
}

fn parse_date(key: &str, date: &str) -> CatalogResult<DateTime<Utc>> {
    let date = date.trim();
    if let Ok(day) = NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        return Ok(day.and_time(NaiveTime::default()).and_utc());
    }
    DateTime::parse_from_rfc3339(date)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| CatalogError::parse(format!("date '{date}' of {key}"), e))
}

/// Download links live next to the package map: the last path segment of the catalog URL
/// is replaced by the package key.
fn package_url(base: Option<&Url>, key: &str) -> Option<String> {
    base.and_then(|base| base.join(key).ok()).map(|u| u.to_string())
}

#[derive(Debug, Clone)]
pub struct HpeReader {
    http_client: reqwest::Client,
}

impl HpeReader {
    pub fn new(http_client: reqwest::Client) -> Self {
        HpeReader { http_client }
    }
}

#[async_trait]
impl CatalogReader for HpeReader {
    fn vendor(&self) -> Vendor {
        Vendor::Hpe
    }

    async fn read(
        &self,
        source: &VendorCatalogSource,
        filter: &SystemCompatibilityFilter,
    ) -> CatalogResult<Catalog> {
        let (raw, locator) = transport::read_catalog_source(&self.http_client, source).await?;
        let packages = parse_package_map(&raw)?;

        let base = match &locator {
            SourceLocator::Url(url) => Some(url.clone()),
            SourceLocator::Path(_) => source.vendor_url.clone(),
        };
        catalog_from_packages(packages, base.as_ref(), &locator, filter)
    }
}

pub fn catalog_from_packages(
    packages: BTreeMap<String, HpePackage>,
    base: Option<&Url>,
    locator: &SourceLocator,
    filter: &SystemCompatibilityFilter,
) -> CatalogResult<Catalog> {
    let total = packages.len();
    let mut catalog = Catalog::new(CatalogMeta {
        vendor: Vendor::Hpe,
        vendor_id: locator.to_string(),
        vendor_url: base.map(|u| u.to_string()),
        release_timestamp: Utc::now(),
        vendor_configuration: serde_json::json!({ "packageCount": total }),
    });
    let mut latest: Option<DateTime<Utc>> = None;

    for (key, package) in packages {
        if !key.ends_with(PACKAGE_SUFFIX) {
            continue;
        }
        if package.deviceclass.trim().is_empty() || package.target.is_empty() {
            tracing::debug!(%key, "package without device class or target, skipping");
            continue;
        }
        if !filter.accepts_any(package.target.iter().map(String::as_str)) {
            continue;
        }

        let released = parse_date(&key, &package.date)?;
        latest = latest.max(Some(released));

        let mut binary = FirmwareComponent::new(key.as_str(), released);
        if !package.description.trim().is_empty() {
            binary.name = package.description.trim().to_string();
        }
        binary.package_id = key.trim_end_matches(PACKAGE_SUFFIX).to_string();
        binary.package_version = package.version.clone();
        binary.reboot_required = package.reboot_required == "yes";
        binary.vendor_download_url = package_url(base, &key);
        if binary.vendor_download_url.is_none() {
            tracing::debug!(%key, "no vendor URL to build a download link from");
        }
        binary.supported_devices =
            vec![descriptor([("deviceClass", package.deviceclass.as_str())])];
        binary.supported_systems = package
            .target
            .iter()
            .map(|t| descriptor([("target", t.as_str())]))
            .collect();
        binary.vendor_metadata = serde_json::json!({
            "description": package.description,
            "deviceClass": package.deviceclass,
            "minimumActiveVersion": package.minimum_active_version,
            "date": package.date,
        });
        catalog.push_component(binary);
    }

    if let Some(latest) = latest {
        catalog.meta.release_timestamp = latest;
    }
    Ok(catalog)
}
