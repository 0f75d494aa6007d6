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

//! Supermicro catalog reader. Supermicro firmware is curated by the operator in a local
//! binaries folder of vendor zips; the catalog is either a JSON descriptor of that folder or
//! inferred from the zip file names.
//!
//! No compatibility filter is applied here. Inventory reports SKUs while the zips are named
//! after motherboard models, so the two never line up.

use std::fs::File;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use walkdir::WalkDir;

use super::CatalogReader;
use crate::checksum;
use crate::error::{CatalogError, CatalogResult};
use crate::filter::SystemCompatibilityFilter;
use crate::model::{
    Catalog, CatalogMeta, Checksum, FirmwareComponent, Vendor, VendorCatalogSource, descriptor,
};

pub const EXTRACTED_DIR: &str = ".extracted";

lazy_static! {
    // BIOS_<model>_<date>_<version>_<suffix>.zip and BMC_<model>_<date>_<version>_<suffix>.zip
    static ref FILE_NAME: Regex =
        Regex::new(r"(?i)^(BIOS|BMC)_([^_]+)_([^_]+)_([^_]+)_(.+)\.zip$")
            .expect("BUG: static regex must compile");
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupermicroCatalog {
    #[serde(default)]
    pub catalog_version: String,
    #[serde(default)]
    pub release_date: String,
    #[serde(default)]
    pub components: Vec<SupermicroEntry>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupermicroEntry {
    #[serde(default)]
    pub component_type: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub release_date: String,
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "downloadURL", default)]
    pub download_url: Option<String>,
    #[serde(default)]
    pub md5: Option<String>,
    #[serde(default)]
    pub sha256: Option<String>,
}

impl SupermicroEntry {
    /// Parses a vendor zip file name. `None` when the name does not follow the BIOS or BMC
    /// pattern.
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let captures = FILE_NAME.captures(file_name)?;
        let model = captures.get(2)?.as_str();
        let version = captures.get(4)?.as_str();
        if model.is_empty() || version.is_empty() {
            return None;
        }
        Some(SupermicroEntry {
            component_type: captures.get(1)?.as_str().to_uppercase(),
            model: model.to_string(),
            version: version.to_string(),
            release_date: captures.get(3)?.as_str().to_string(),
            file_name: file_name.to_string(),
            ..Default::default()
        })
    }

    fn checksum(&self) -> Option<Checksum> {
        let non_empty = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        non_empty(&self.sha256)
            .map(Checksum::Sha256)
            .or_else(|| non_empty(&self.md5).map(Checksum::Md5))
    }

    fn released(&self) -> Option<DateTime<Utc>> {
        parse_release_date(&self.release_date)
    }
}

// File names carry compact dates, catalog files ISO or US dates.
fn parse_release_date(date: &str) -> Option<DateTime<Utc>> {
    let date = date.trim();
    ["%Y%m%d", "%Y-%m-%d", "%m/%d/%Y"]
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(date, format).ok())
        .map(|day| day.and_time(NaiveTime::default()).and_utc())
}

/// Cache of `.bin` payloads extracted from vendor zips, rooted in `<binaries>/.extracted`.
/// Each zip gets a directory named after its stem.
#[derive(Clone, Debug)]
pub struct ExtractionCache {
    root: PathBuf,
}

impl ExtractionCache {
    pub fn new(binaries_path: &Path) -> Self {
        ExtractionCache {
            root: binaries_path.join(EXTRACTED_DIR),
        }
    }

    fn cached_bin(dir: &Path) -> CatalogResult<Option<PathBuf>> {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CatalogError::io("listing extraction cache", dir, e)),
        };
        for entry in entries {
            let path = entry
                .map_err(|e| CatalogError::io("listing extraction cache", dir, e))?
                .path();
            if is_bin(&path) && path.is_file() {
                return Ok(Some(path));
            }
        }
        Ok(None)
    }

    /// Returns the extracted `.bin` of `zip_path`, extracting it on first use. A zip without
    /// a `.bin` member yields `None`. The checksum is only verified before an extraction.
    pub fn extract(
        &self,
        zip_path: &Path,
        checksum: Option<&Checksum>,
    ) -> CatalogResult<Option<PathBuf>> {
        let stem = zip_stem(zip_path)?;
        let dir = self.root.join(stem);
        if let Some(hit) = Self::cached_bin(&dir)? {
            tracing::debug!(path = %hit.display(), "extraction cache hit");
            return Ok(Some(hit));
        }

        if let Some(checksum) = checksum {
            checksum::verify_file(zip_path, checksum)?;
        }

        let file = File::open(zip_path).map_err(|e| CatalogError::io("opening zip", zip_path, e))?;
        let mut archive = zip::ZipArchive::new(file)
            .map_err(|e| CatalogError::parse(zip_path.display().to_string(), e))?;

        for index in 0..archive.len() {
            let mut member = archive
                .by_index(index)
                .map_err(|e| CatalogError::parse(zip_path.display().to_string(), e))?;
            if member.is_dir() {
                continue;
            }
            let Some(name) = member
                .enclosed_name()
                .and_then(|p| p.file_name())
                .map(PathBuf::from)
            else {
                continue;
            };
            if !is_bin(&name) {
                continue;
            }

            std::fs::create_dir_all(&dir)
                .map_err(|e| CatalogError::io("creating extraction cache", &dir, e))?;
            let target = dir.join(&name);
            // Written under a unique name and renamed, so a concurrent reader sees either
            // nothing or the complete binary.
            let mut partial = tempfile::NamedTempFile::new_in(&dir)
                .map_err(|e| CatalogError::io("creating temporary file", &dir, e))?;
            std::io::copy(&mut member, &mut partial)
                .map_err(|e| CatalogError::io("extracting", &target, e))?;
            partial
                .persist(&target)
                .map_err(|e| CatalogError::io("moving extracted binary", &target, e.error))?;

            tracing::info!(zip = %zip_path.display(), path = %target.display(), "extracted binary");
            return Ok(Some(target));
        }
        Ok(None)
    }
}

fn is_bin(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("bin"))
}

fn zip_stem(zip_path: &Path) -> CatalogResult<&str> {
    zip_path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| {
            CatalogError::parse(zip_path.display().to_string(), "not a usable zip file name")
        })
}

/// Infers catalog entries from the zip file names under `binaries_path`. The extraction
/// cache is not walked.
pub fn scan_binaries(binaries_path: &Path) -> Vec<SupermicroEntry> {
    WalkDir::new(binaries_path)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.file_name() != EXTRACTED_DIR)
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            let name = e.file_name().to_str()?;
            if !name.to_lowercase().ends_with(".zip") {
                return None;
            }
            let entry = SupermicroEntry::from_file_name(name);
            if entry.is_none() {
                tracing::info!(
                    file = %e.path().display(),
                    "file name is not a BIOS or BMC package, skipping"
                );
            }
            entry.map(|mut entry| {
                // Keep the folder relative path so nested folders resolve.
                if let Ok(relative) = e.path().strip_prefix(binaries_path) {
                    entry.file_name = relative.to_string_lossy().into_owned();
                }
                entry
            })
        })
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct SupermicroReader;

impl SupermicroReader {
    pub fn new() -> Self {
        SupermicroReader
    }
}

#[async_trait]
impl CatalogReader for SupermicroReader {
    fn vendor(&self) -> Vendor {
        Vendor::Supermicro
    }

    async fn read(
        &self,
        source: &VendorCatalogSource,
        _filter: &SystemCompatibilityFilter,
    ) -> CatalogResult<Catalog> {
        let Some(binaries_path) = source.local_binaries_path.as_deref() else {
            return Err(CatalogError::config(
                "Supermicro catalogs need local_binaries_path",
            ));
        };

        let descriptor_file = match &source.local_catalog_path {
            Some(path) => {
                let raw = tokio::fs::read(path)
                    .await
                    .map_err(|e| CatalogError::io("reading Supermicro catalog", path, e))?;
                let catalog: SupermicroCatalog = serde_json::from_slice(&raw)
                    .map_err(|e| CatalogError::parse(path.display().to_string(), e))?;
                Some(catalog)
            }
            None => None,
        };

        let (vendor_id, catalog_release, entries) = match descriptor_file {
            Some(file) => (
                file.catalog_version,
                parse_release_date(&file.release_date),
                file.components,
            ),
            None => (
                binaries_path.display().to_string(),
                None,
                scan_binaries(binaries_path),
            ),
        };
        if entries.is_empty() {
            return Err(CatalogError::NoComponents(format!(
                "no Supermicro catalog entries or BIOS/BMC zips in {}",
                binaries_path.display()
            )));
        }

        let mut catalog = Catalog::new(CatalogMeta {
            vendor: Vendor::Supermicro,
            vendor_id,
            vendor_url: None,
            release_timestamp: catalog_release.unwrap_or_else(Utc::now),
            vendor_configuration: serde_json::json!({
                "localBinariesPath": binaries_path.display().to_string(),
                "entries": entries.len(),
            }),
        });

        let cache = ExtractionCache::new(binaries_path);
        for entry in &entries {
            let zip_path = binaries_path.join(&entry.file_name);
            if !zip_path.is_file() {
                tracing::warn!(
                    zip = %zip_path.display(),
                    "catalog entry has no local zip, skipping"
                );
                continue;
            }
            let Some(bin) = cache.extract(&zip_path, entry.checksum().as_ref())? else {
                tracing::warn!(zip = %zip_path.display(), "zip holds no .bin file, skipping");
                continue;
            };
            catalog.push_component(component_from_entry(entry, &zip_path, bin)?);
        }

        if catalog.is_empty() {
            return Err(CatalogError::NoComponents(format!(
                "no usable Supermicro binaries in {}",
                binaries_path.display()
            )));
        }
        Ok(catalog)
    }
}

fn component_from_entry(
    entry: &SupermicroEntry,
    zip_path: &Path,
    bin: PathBuf,
) -> CatalogResult<FirmwareComponent> {
    let stem = zip_stem(zip_path)?;
    let bin_name = bin
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let released = entry.released().unwrap_or_else(Utc::now);
    let mut binary = FirmwareComponent::new(format!("{stem}/{bin_name}"), released);
    binary.name = if entry.description.trim().is_empty() {
        format!("{} {} {}", entry.model, entry.component_type, entry.version)
    } else {
        entry.description.trim().to_string()
    };
    binary.package_id = stem.to_string();
    binary.package_version = entry.version.clone();
    binary.reboot_required = entry.component_type.eq_ignore_ascii_case("BIOS");
    binary.vendor_download_url = entry.download_url.clone().filter(|u| !u.is_empty());
    binary.supported_devices = vec![descriptor([("componentType", entry.component_type.as_str())])];
    binary.supported_systems = vec![descriptor([("model", entry.model.as_str())])];
    binary.vendor_metadata = serde_json::json!({
        "fileName": entry.file_name,
        "fileSize": entry.file_size,
        "md5": entry.md5,
        "sha256": entry.sha256,
    });
    binary.local_path = Some(bin);
    Ok(binary)
}
