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

//! Normalized firmware catalog model shared by every vendor reader.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{CatalogError, CatalogResult};

#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    PartialEq,
    Hash,
    Ord,
    PartialOrd,
    clap::ValueEnum,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Vendor {
    Dell,
    Hpe,
    Lenovo,
    Supermicro,
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = format!("{self:?}").to_lowercase();
        write!(f, "{s}")
    }
}

impl FromStr for Vendor {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "dell" => Ok(Vendor::Dell),
            "hpe" => Ok(Vendor::Hpe),
            "lenovo" => Ok(Vendor::Lenovo),
            "supermicro" => Ok(Vendor::Supermicro),
            other => Err(CatalogError::config(format!(
                "unsupported vendor '{other}', expected one of dell, hpe, lenovo, supermicro"
            ))),
        }
    }
}

impl Vendor {
    /// Whether a vendor string reported by the server inventory belongs to this vendor.
    /// Inventory data carries the DMI manufacturer, e.g. "Dell Inc." or "Super Micro Computer".
    pub fn matches_inventory_name(&self, name: &str) -> bool {
        let name = name.trim().to_lowercase();
        match self {
            Vendor::Dell => name.starts_with("dell"),
            Vendor::Hpe => name == "hpe" || name.starts_with("hewlett packard enterprise"),
            Vendor::Lenovo => name.starts_with("lenovo"),
            Vendor::Supermicro => name.starts_with("supermicro") || name.starts_with("super micro"),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, clap::ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateType {
    #[default]
    Online,
    Offline,
}

impl fmt::Display for UpdateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = format!("{self:?}").to_lowercase();
        write!(f, "{s}")
    }
}

impl FromStr for UpdateType {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "online" => Ok(UpdateType::Online),
            "offline" => Ok(UpdateType::Offline),
            other => Err(CatalogError::config(format!(
                "unsupported update type '{other}', expected online or offline"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Recommended,
    Optional,
    #[default]
    Unknown,
}

/// Where the vendor catalog is read from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceLocator {
    Url(Url),
    Path(PathBuf),
}

impl fmt::Display for SourceLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceLocator::Url(url) => write!(f, "{url}"),
            SourceLocator::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// The vendor side of a catalog run. Built once from configuration and never mutated.
#[derive(Clone, Debug)]
pub struct VendorCatalogSource {
    pub vendor: Vendor,
    pub update_type: UpdateType,
    // vendor_url is the remote catalog (or content-service endpoint). It is also the base
    // for download links when the catalog itself is read from local_catalog_path.
    pub vendor_url: Option<Url>,
    // local_catalog_path is a local copy of the catalog. For Lenovo it is the directory
    // holding cached content-service responses.
    pub local_catalog_path: Option<PathBuf>,
    // vendor_token is sent as a Basic Authorization header, already encoded.
    pub vendor_token: Option<String>,
    pub local_binaries_path: Option<PathBuf>,
}

impl VendorCatalogSource {
    pub fn new(vendor: Vendor) -> Self {
        VendorCatalogSource {
            vendor,
            update_type: UpdateType::default(),
            vendor_url: None,
            local_catalog_path: None,
            vendor_token: None,
            local_binaries_path: None,
        }
    }

    /// A local copy wins over the remote URL.
    pub fn locator(&self) -> CatalogResult<SourceLocator> {
        if let Some(path) = &self.local_catalog_path {
            return Ok(SourceLocator::Path(path.clone()));
        }
        if let Some(url) = &self.vendor_url {
            return Ok(SourceLocator::Url(url.clone()));
        }
        Err(CatalogError::config(format!(
            "no catalog source configured for {}: set vendor_url or local_catalog_path",
            self.vendor
        )))
    }
}

/// Opaque key/value descriptor of a supported device or system.
pub type Descriptor = BTreeMap<String, String>;

/// Builds a [`Descriptor`] from literal pairs, dropping empty values.
pub fn descriptor<const N: usize>(pairs: [(&str, &str); N]) -> Descriptor {
    pairs
        .into_iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Vendor supplied checksum of a payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "algorithm", content = "value", rename_all = "lowercase")]
pub enum Checksum {
    Md5(String),
    Sha256(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirmwareComponent {
    pub external_id: String,
    pub name: String,
    pub package_id: String,
    pub package_version: String,
    pub reboot_required: bool,
    pub severity: Severity,
    pub vendor_download_url: Option<String>,
    // Only set once the binary is re-hosted in the managed repository.
    pub cache_download_url: Option<String>,
    pub supported_devices: Vec<Descriptor>,
    pub supported_systems: Vec<Descriptor>,
    pub release_timestamp: DateTime<Utc>,
    pub vendor_metadata: serde_json::Value,
    pub checksum: Option<Checksum>,
    #[serde(skip)]
    pub local_path: Option<PathBuf>,
}

impl FirmwareComponent {
    pub fn new(external_id: impl Into<String>, release_timestamp: DateTime<Utc>) -> Self {
        let external_id = external_id.into();
        FirmwareComponent {
            name: external_id.clone(),
            package_id: String::new(),
            package_version: String::new(),
            reboot_required: false,
            severity: Severity::Unknown,
            vendor_download_url: None,
            cache_download_url: None,
            supported_devices: Vec::new(),
            supported_systems: Vec::new(),
            release_timestamp,
            vendor_metadata: serde_json::Value::Null,
            checksum: None,
            local_path: None,
            external_id,
        }
    }

    fn merge_supported(&mut self, other: FirmwareComponent) {
        for device in other.supported_devices {
            if !self.supported_devices.contains(&device) {
                self.supported_devices.push(device);
            }
        }
        for system in other.supported_systems {
            if !self.supported_systems.contains(&system) {
                self.supported_systems.push(system);
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogMeta {
    pub vendor: Vendor,
    pub vendor_id: String,
    pub vendor_url: Option<String>,
    pub release_timestamp: DateTime<Utc>,
    pub vendor_configuration: serde_json::Value,
}

/// A normalized vendor catalog: metadata plus the components that passed the
/// compatibility filter, in vendor order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub meta: CatalogMeta,
    pub components: Vec<FirmwareComponent>,
}

impl Catalog {
    pub fn new(meta: CatalogMeta) -> Self {
        Catalog {
            meta,
            components: Vec::new(),
        }
    }

    /// Appends a component. External ids are unique within a catalog: a second component
    /// with the same id only extends the supported devices and systems of the first one.
    /// Returns false when the component was merged.
    pub fn push_component(&mut self, component: FirmwareComponent) -> bool {
        match self
            .components
            .iter_mut()
            .find(|c| c.external_id == component.external_id)
        {
            Some(existing) => {
                tracing::debug!(
                    external_id = %component.external_id,
                    "merging duplicate component"
                );
                existing.merge_supported(component);
                false
            }
            None => {
                self.components.push(component);
                true
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> CatalogMeta {
        CatalogMeta {
            vendor: Vendor::Lenovo,
            vendor_id: "lenovo".to_string(),
            vendor_url: None,
            release_timestamp: Utc::now(),
            vendor_configuration: serde_json::Value::Null,
        }
    }

    #[test]
    fn test_vendor_parsing() {
        assert_eq!("Dell".parse::<Vendor>().unwrap(), Vendor::Dell);
        assert_eq!(" SUPERMICRO ".parse::<Vendor>().unwrap(), Vendor::Supermicro);
        let err = "ibm".parse::<Vendor>().unwrap_err();
        assert!(matches!(err, CatalogError::Config(_)));
        assert_eq!(Vendor::Hpe.to_string(), "hpe");
    }

    #[test]
    fn test_vendor_inventory_names() {
        assert!(Vendor::Dell.matches_inventory_name("Dell Inc."));
        assert!(Vendor::Hpe.matches_inventory_name("HPE"));
        assert!(Vendor::Hpe.matches_inventory_name("Hewlett Packard Enterprise"));
        assert!(Vendor::Supermicro.matches_inventory_name("Super Micro Computer"));
        assert!(Vendor::Lenovo.matches_inventory_name("LENOVO"));
        assert!(!Vendor::Dell.matches_inventory_name("Lenovo"));
    }

    #[test]
    fn test_locator_prefers_local_path() {
        let mut source = VendorCatalogSource::new(Vendor::Dell);
        assert!(matches!(source.locator(), Err(CatalogError::Config(_))));

        source.vendor_url =
            Some(Url::parse("https://downloads.dell.com/catalog/Catalog.xml.gz").unwrap());
        assert!(matches!(source.locator().unwrap(), SourceLocator::Url(_)));

        source.local_catalog_path = Some(PathBuf::from("/tmp/Catalog.xml.gz"));
        assert_eq!(
            source.locator().unwrap(),
            SourceLocator::Path(PathBuf::from("/tmp/Catalog.xml.gz"))
        );
    }

    #[test]
    fn test_push_component_merges_duplicates() {
        let mut catalog = Catalog::new(meta());
        let mut first = FirmwareComponent::new("lnvgy_fw_xcc.uxz", Utc::now());
        first.supported_systems.push(descriptor([("machineType", "7X06")]));
        let mut second = first.clone();
        second.supported_systems = vec![descriptor([("machineType", "7X07")])];

        assert!(catalog.push_component(first));
        assert!(!catalog.push_component(second));
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.components[0].supported_systems.len(), 2);
    }

    #[test]
    fn test_descriptor_drops_empty_values() {
        let d = descriptor([("machineType", "7X06"), ("serialNumber", "")]);
        assert_eq!(d.len(), 1);
        assert_eq!(d.get("machineType").map(String::as_str), Some("7X06"));
    }
}
