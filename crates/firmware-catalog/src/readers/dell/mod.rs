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

//! Dell catalog reader. The source is the gzip compressed `Catalog.xml` manifest published
//! by Dell (a plain XML copy is accepted too).

pub mod manifest;
pub mod text;

use std::io::Read;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use flate2::read::GzDecoder;

use self::manifest::{Manifest, SoftwareComponent};
use super::CatalogReader;
use crate::error::{CatalogError, CatalogResult};
use crate::filter::SystemCompatibilityFilter;
use crate::model::{
    Catalog, CatalogMeta, Checksum, FirmwareComponent, Severity, SourceLocator, Vendor,
    VendorCatalogSource, descriptor,
};
use crate::transport;

const FIRMWARE_COMPONENT_TYPE: &str = "FRMW";
const RELEASE_DATE_FORMAT: &str = "%B %d, %Y";
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

#[derive(Debug, Clone)]
pub struct DellReader {
    http_client: reqwest::Client,
}

impl DellReader {
    pub fn new(http_client: reqwest::Client) -> Self {
        DellReader { http_client }
    }
}

#[async_trait]
impl CatalogReader for DellReader {
    fn vendor(&self) -> Vendor {
        Vendor::Dell
    }

    async fn read(
        &self,
        source: &VendorCatalogSource,
        filter: &SystemCompatibilityFilter,
    ) -> CatalogResult<Catalog> {
        let (raw, locator) = transport::read_catalog_source(&self.http_client, source).await?;
        let xml = decompress(&raw)?;
        let manifest = manifest::parse_manifest(&text::decode_manifest(&xml))?;

        let vendor_url = match locator {
            SourceLocator::Url(url) => Some(url.to_string()),
            SourceLocator::Path(_) => source.vendor_url.as_ref().map(|u| u.to_string()),
        };
        catalog_from_manifest(manifest, vendor_url, filter)
    }
}

/// Gunzips `raw` when it carries the gzip magic bytes, otherwise returns it as is.
pub fn decompress(raw: &[u8]) -> CatalogResult<Vec<u8>> {
    if !raw.starts_with(&GZIP_MAGIC) {
        return Ok(raw.to_vec());
    }
    let mut xml = Vec::new();
    GzDecoder::new(raw)
        .read_to_end(&mut xml)
        .map_err(|e| CatalogError::parse("Dell catalog gzip stream", e))?;
    Ok(xml)
}

pub fn severity(criticality: &str) -> Severity {
    match criticality.trim() {
        "2" | "Urgent" => Severity::Critical,
        "1" | "Recommended" => Severity::Recommended,
        "3" | "Optional" => Severity::Optional,
        _ => Severity::Unknown,
    }
}

fn parse_release_date(component: &SoftwareComponent) -> CatalogResult<DateTime<Utc>> {
    NaiveDate::parse_from_str(component.release_date.trim(), RELEASE_DATE_FORMAT)
        .map(|date| date.and_time(NaiveTime::default()).and_utc())
        .map_err(|e| {
            CatalogError::parse(
                format!("release date '{}' of {}", component.release_date, component.path),
                e,
            )
        })
}

fn download_url(manifest: &Manifest, path: &str) -> Option<String> {
    let base = manifest.base_location.trim().trim_end_matches('/');
    if base.is_empty() {
        return None;
    }
    let protocol = manifest
        .base_location_access_protocols
        .split(',')
        .map(str::trim)
        .find(|p| !p.is_empty())
        .unwrap_or("https")
        .to_lowercase();
    Some(format!(
        "{protocol}://{base}/{}",
        path.trim().trim_start_matches('/')
    ))
}

fn is_compatible(component: &SoftwareComponent, filter: &SystemCompatibilityFilter) -> bool {
    if filter.is_empty() {
        return true;
    }
    component
        .brands
        .iter()
        .flat_map(|brand| brand.system_names())
        .any(|name| filter.matches(&name))
}

/// Normalizes a parsed manifest. Only firmware components compatible with `filter` are kept.
pub fn catalog_from_manifest(
    manifest: Manifest,
    vendor_url: Option<String>,
    filter: &SystemCompatibilityFilter,
) -> CatalogResult<Catalog> {
    let release_timestamp = DateTime::parse_from_rfc3339(manifest.date_time.trim())
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());

    let mut catalog = Catalog::new(CatalogMeta {
        vendor: Vendor::Dell,
        vendor_id: manifest.identifier.clone(),
        vendor_url,
        release_timestamp,
        vendor_configuration: serde_json::json!({
            "releaseID": manifest.release_id,
            "version": manifest.version,
            "baseLocation": manifest.base_location,
        }),
    });

    for component in &manifest.components {
        if component.component_type != FIRMWARE_COMPONENT_TYPE {
            continue;
        }
        if !is_compatible(component, filter) {
            tracing::debug!(
                path = %component.path,
                "component not supported by any filtered system"
            );
            continue;
        }
        if component.path.trim().is_empty() {
            tracing::warn!(
                package_id = %component.package_id,
                "Dell component without a path, skipping"
            );
            continue;
        }

        let mut binary =
            FirmwareComponent::new(component.path.trim(), parse_release_date(component)?);
        if !component.name.is_empty() {
            binary.name = component.name.clone();
        }
        binary.package_id = component.package_id.clone();
        binary.package_version = component.vendor_version.clone();
        binary.reboot_required = component.reboot_required;
        binary.severity = severity(&component.criticality);
        binary.vendor_download_url = download_url(&manifest, &component.path);
        binary.supported_devices = component
            .devices
            .iter()
            .map(|d| {
                descriptor([
                    ("componentId", d.component_id.as_str()),
                    ("display", d.display.as_str()),
                ])
            })
            .collect();
        binary.supported_systems = component
            .brands
            .iter()
            .flat_map(|brand| {
                brand.models.iter().map(move |model| {
                    descriptor([
                        ("brandPrefix", brand.prefix.as_str()),
                        ("brand", brand.display.as_str()),
                        ("systemId", model.system_id.as_str()),
                        ("model", model.display.as_str()),
                    ])
                })
            })
            .collect();
        if !component.hash_md5.is_empty() {
            binary.checksum = Some(Checksum::Md5(component.hash_md5.to_lowercase()));
        }
        binary.vendor_metadata = serde_json::json!({
            "size": component.size,
            "hashMD5": component.hash_md5,
            "dellVersion": component.dell_version,
            "releaseID": component.release_id,
            "criticality": component.criticality,
        });
        catalog.push_component(binary);
    }

    Ok(catalog)
}
