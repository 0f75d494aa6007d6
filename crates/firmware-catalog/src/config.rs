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

use std::path::{Path, PathBuf};

use carbide_ssh::{HostKeyCheck, SftpTarget};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{CatalogError, CatalogResult};
use crate::materializer::MaterializeOptions;
use crate::model::{UpdateType, Vendor, VendorCatalogSource};
use crate::orchestrator::CatalogRequest;
use crate::registry::ApiEndpoint;

/// Configuration of one catalog run. Fields are documented as comments in the output of
/// [`CatalogConfig::into_annotated_config_file`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub vendor: Option<Vendor>,
    #[serde(default)]
    pub update_type: UpdateType,
    #[serde(default)]
    pub vendor_url: Option<String>,
    #[serde(default)]
    pub vendor_token: Option<String>,
    #[serde(default)]
    pub local_catalog_path: Option<PathBuf>,
    #[serde(default)]
    pub local_binaries_path: Option<PathBuf>,
    #[serde(default)]
    pub systems_filter: Vec<String>,
    #[serde(default)]
    pub server_types_filter: Vec<String>,
    #[serde(default)]
    pub download_binaries: bool,
    #[serde(default)]
    pub upload_binaries: bool,
    #[serde(default)]
    pub repository: Option<RepositoryConfig>,
    #[serde(default)]
    pub api: Option<ApiConfig>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    pub ssh_host: String,
    #[serde(default = "Defaults::ssh_port")]
    pub ssh_port: u16,
    #[serde(default = "Defaults::ssh_user")]
    pub ssh_user: String,
    #[serde(default = "Defaults::private_key_path")]
    pub private_key_path: PathBuf,
    #[serde(default)]
    pub private_key_passphrase: Option<String>,
    #[serde(default = "Defaults::known_hosts_path")]
    pub known_hosts_path: PathBuf,
    #[serde(default)]
    pub ignore_host_key_check: bool,
    #[serde(default)]
    pub root_path: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    pub endpoint: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

pub struct Defaults;

impl Defaults {
    pub fn ssh_port() -> u16 {
        22
    }

    pub fn ssh_user() -> String {
        "firmware".to_string()
    }

    pub fn private_key_path() -> PathBuf {
        "/etc/firmware-catalog/id_ed25519".into()
    }

    pub fn known_hosts_path() -> PathBuf {
        "/etc/firmware-catalog/known_hosts".into()
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Could not read config file at {path}: {error}")]
    CouldNotRead { path: String, error: std::io::Error },
    #[error("TOML error reading config file at {path}: {error}")]
    InvalidToml {
        path: String,
        error: toml::de::Error,
    },
}

fn parse_url(what: &str, value: &str) -> CatalogResult<Url> {
    Url::parse(value.trim())
        .map_err(|e| CatalogError::config(format!("invalid {what} '{value}': {e}")))
}

impl RepositoryConfig {
    pub fn sftp_target(&self) -> SftpTarget {
        SftpTarget {
            host: self.ssh_host.clone(),
            port: self.ssh_port,
            username: self.ssh_user.clone(),
            private_key_path: self.private_key_path.clone(),
            private_key_passphrase: self.private_key_passphrase.clone(),
            host_key_check: if self.ignore_host_key_check {
                HostKeyCheck::Disabled
            } else {
                HostKeyCheck::KnownHostsFile(self.known_hosts_path.clone())
            },
        }
    }
}

impl ApiConfig {
    pub fn endpoint(&self) -> CatalogResult<ApiEndpoint> {
        ApiEndpoint::new(&self.endpoint, self.api_key.clone())
    }
}

impl CatalogConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let cfg = std::fs::read_to_string(path).map_err(|error| ConfigError::CouldNotRead {
            path: path.to_string_lossy().to_string(),
            error,
        })?;
        toml::from_str::<Self>(&cfg).map_err(|error| ConfigError::InvalidToml {
            path: path.to_string_lossy().to_string(),
            error,
        })
    }

    /// Checks everything that can be checked without I/O and builds the immutable request
    /// of a submitting run.
    pub fn validate(&self) -> CatalogResult<CatalogRequest> {
        if self.name.trim().is_empty() {
            return Err(CatalogError::config("name must be set"));
        }
        let mut request = self.validate_source()?;
        request.materialize = self.materialize_options()?;
        Ok(request)
    }

    /// Builds the request of a read-only run: the vendor source and the filters. Nothing is
    /// materialized or submitted, so neither a name nor a repository is needed.
    pub fn validate_read(&self) -> CatalogResult<CatalogRequest> {
        self.validate_source()
    }

    fn validate_source(&self) -> CatalogResult<CatalogRequest> {
        let Some(vendor) = self.vendor else {
            return Err(CatalogError::config(
                "vendor must be one of dell, hpe, lenovo, supermicro",
            ));
        };

        let vendor_url = self
            .vendor_url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .map(|u| parse_url("vendor_url", u))
            .transpose()?;

        match vendor {
            Vendor::Dell | Vendor::Hpe => {
                if vendor_url.is_none() && self.local_catalog_path.is_none() {
                    return Err(CatalogError::config(format!(
                        "{vendor} catalogs need vendor_url or local_catalog_path"
                    )));
                }
            }
            Vendor::Lenovo => {
                if self.systems_filter.is_empty() && self.server_types_filter.is_empty() {
                    return Err(CatalogError::config(
                        "Lenovo catalogs need systems_filter or server_types_filter",
                    ));
                }
            }
            Vendor::Supermicro => {
                if self.local_binaries_path.is_none() {
                    return Err(CatalogError::config(
                        "Supermicro catalogs need local_binaries_path",
                    ));
                }
            }
        }

        if !self.server_types_filter.is_empty() && self.api.is_none() {
            return Err(CatalogError::config(
                "server_types_filter needs an [api] section for the inventory lookup",
            ));
        }

        if let Some(api) = &self.api {
            api.endpoint()?;
        }

        Ok(CatalogRequest {
            name: self.name.trim().to_string(),
            description: self.description.clone(),
            source: VendorCatalogSource {
                vendor,
                update_type: self.update_type,
                vendor_url,
                local_catalog_path: self.local_catalog_path.clone(),
                vendor_token: self.vendor_token.clone(),
                local_binaries_path: self.local_binaries_path.clone(),
            },
            systems_filter: self.systems_filter.clone(),
            server_types_filter: self.server_types_filter.clone(),
            materialize: MaterializeOptions::default(),
        })
    }

    fn materialize_options(&self) -> CatalogResult<MaterializeOptions> {
        // Uploads read from local_binaries_path unless binaries are downloaded first.
        if self.upload_binaries && !self.download_binaries && self.local_binaries_path.is_none() {
            return Err(CatalogError::config(
                "upload_binaries needs download_binaries or local_binaries_path",
            ));
        }

        let repository_base_url = match (&self.repository, self.upload_binaries) {
            (None, true) => {
                return Err(CatalogError::config(
                    "upload_binaries needs a [repository] section",
                ));
            }
            (Some(repository), _) => repository
                .base_url
                .as_deref()
                .filter(|u| !u.trim().is_empty())
                .map(|u| parse_url("repository base_url", u))
                .transpose()?,
            (None, false) => None,
        };

        Ok(MaterializeOptions {
            download: self.download_binaries,
            upload: self.upload_binaries,
            local_binaries_path: self.local_binaries_path.clone(),
            vendor_token: self.vendor_token.clone(),
            repository_base_url,
        })
    }

    pub fn into_annotated_config_file(self) -> String {
        let Self {
            name,
            update_type,
            download_binaries,
            upload_binaries,
            ..
        } = self;

        format!(
            r#"
#####
## Example config file for firmware-catalog. Lines with a single `#` are examples of optional
## settings; every other line holds the default value.
#####

## Name of the catalog created in the catalog registry. Required.
name = {name:?}

## Optional description of the catalog.
# description = "Dell PowerEdge firmware, 2024 Q1"

## Vendor of the catalog: dell, hpe, lenovo or supermicro. Required.
# vendor = "dell"

## online or offline.
update_type = "{update_type}"

## Remote vendor catalog. For Lenovo this is the content service endpoint and defaults to
## https://support.lenovo.com/services/ContentService/SearchDrivers.
# vendor_url = "https://downloads.dell.com/catalog/Catalog.xml.gz"

## Already Base64 encoded credentials sent as `Authorization: Basic <token>`.
# vendor_token = "<token>"

## Local copy of the vendor catalog, used instead of vendor_url. For Lenovo, the directory that
## caches content service responses.
# local_catalog_path = "/var/lib/firmware-catalog/Catalog.xml.gz"

## Where binaries are downloaded to, or already staged. Required for Supermicro.
# local_binaries_path = "/var/lib/firmware-catalog/binaries"

## System names the catalog is narrowed to (Dell "PowerEdge R750", HPE target ids, Lenovo
## machine types).
systems_filter = []

## Server types resolved to vendor models through the inventory. Needs [api].
server_types_filter = []

## Download every binary from the vendor.
download_binaries = {download_binaries}

## Re-host every binary in the repository. Needs [repository].
upload_binaries = {upload_binaries}

## Managed binary repository, reached over SFTP.
# [repository]
# base_url = "https://firmware.example.com/catalog/"
# ssh_host = "firmware.example.com"
# ssh_port = {ssh_port}
# ssh_user = {ssh_user:?}
# private_key_path = {private_key_path:?}
# known_hosts_path = {known_hosts_path:?}
# ignore_host_key_check = false
# root_path = "/srv/firmware"

## Catalog registry and inventory API.
# [api]
# endpoint = "https://bmm.example.com"
# api_key = "<key>"
"#,
            ssh_port = Defaults::ssh_port(),
            ssh_user = Defaults::ssh_user(),
            private_key_path = Defaults::private_key_path(),
            known_hosts_path = Defaults::known_hosts_path(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dell_config() -> CatalogConfig {
        toml::from_str(
            r#"
            name = "dell-r750"
            vendor = "dell"
            vendor_url = "https://downloads.dell.com/catalog/Catalog.xml.gz"
            systems_filter = ["PowerEdge R750"]
            download_binaries = true
            upload_binaries = true

            [repository]
            base_url = "https://firmware.example.com/catalog/"
            ssh_host = "firmware.example.com"
            "#,
        )
        .expect("config didn't parse")
    }

    #[test]
    fn test_default_file_is_actually_default() {
        let default_toml: CatalogConfig =
            toml::from_str(&CatalogConfig::default().into_annotated_config_file())
                .expect("default toml didn't parse");
        assert_eq!(default_toml, CatalogConfig::default());
    }

    #[test]
    fn test_empty_config_file_is_default() {
        let empty: CatalogConfig = toml::from_str("").expect("empty toml didn't parse");
        assert_eq!(empty, CatalogConfig::default());
    }

    #[test]
    fn test_repository_defaults() {
        let config = dell_config();
        let repository = config.repository.as_ref().unwrap();
        assert_eq!(repository.ssh_port, 22);
        assert_eq!(repository.ssh_user, Defaults::ssh_user());
        assert_eq!(
            repository.sftp_target().host_key_check,
            HostKeyCheck::KnownHostsFile(Defaults::known_hosts_path())
        );
    }

    #[test]
    fn test_validate_builds_request() {
        let request = dell_config().validate().unwrap();
        assert_eq!(request.source.vendor, Vendor::Dell);
        assert!(request.materialize.upload);
        assert_eq!(
            request.materialize.repository_base_url.unwrap().as_str(),
            "https://firmware.example.com/catalog/"
        );
    }

    #[test]
    fn test_validate_rejects_missing_inputs() {
        let mut config = dell_config();
        config.vendor = None;
        assert!(matches!(config.validate(), Err(CatalogError::Config(_))));

        let mut config = dell_config();
        config.vendor_url = None;
        assert!(matches!(config.validate(), Err(CatalogError::Config(_))));

        let mut config = dell_config();
        config.repository = None;
        assert!(matches!(config.validate(), Err(CatalogError::Config(_))));

        let mut config = dell_config();
        config.server_types_filter = vec!["M.8.8.2".to_string()];
        assert!(matches!(config.validate(), Err(CatalogError::Config(_))));

        let mut config = dell_config();
        config.vendor_url = Some("not a url".to_string());
        assert!(matches!(config.validate(), Err(CatalogError::Config(_))));
    }

    #[test]
    fn test_validate_vendor_specific_requirements() {
        let mut config = CatalogConfig {
            name: "lenovo".to_string(),
            vendor: Some(Vendor::Lenovo),
            ..Default::default()
        };
        assert!(config.validate().is_err());
        config.systems_filter = vec!["7X06".to_string()];
        assert!(config.validate().is_ok());

        let mut config = CatalogConfig {
            name: "smc".to_string(),
            vendor: Some(Vendor::Supermicro),
            ..Default::default()
        };
        assert!(config.validate().is_err());
        config.local_binaries_path = Some(PathBuf::from("/var/lib/firmware"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_reports_bad_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.toml");
        std::fs::write(&path, "name = ").unwrap();
        assert!(matches!(
            CatalogConfig::load(&path),
            Err(ConfigError::InvalidToml { .. })
        ));
        assert!(matches!(
            CatalogConfig::load(&dir.path().join("missing.toml")),
            Err(ConfigError::CouldNotRead { .. })
        ));
    }

    #[test]
    fn test_upload_needs_a_binary_source() {
        let mut config = dell_config();
        config.download_binaries = false;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("local_binaries_path"));

        config.local_binaries_path = Some(PathBuf::from("/var/lib/firmware"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_read_needs_no_name_or_repository() {
        let mut config = dell_config();
        config.name = String::new();
        config.repository = None;
        assert!(config.validate().is_err());

        let request = config.validate_read().unwrap();
        assert_eq!(request.source.vendor, Vendor::Dell);
        assert_eq!(request.systems_filter, vec!["PowerEdge R750".to_string()]);
        assert!(!request.materialize.requested());

        config.vendor_url = None;
        assert!(matches!(config.validate_read(), Err(CatalogError::Config(_))));
    }
}
