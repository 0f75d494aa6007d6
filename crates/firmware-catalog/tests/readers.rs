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

mod common;

use firmware_catalog::readers::dell::manifest::parse_manifest;
use firmware_catalog::readers::dell::text::decode_manifest;
use firmware_catalog::{
    ReaderRegistry, Severity, SystemCompatibilityFilter, Vendor, VendorCatalogSource,
};
use url::Url;

fn dell_source(path: std::path::PathBuf) -> VendorCatalogSource {
    let mut source = VendorCatalogSource::new(Vendor::Dell);
    source.local_catalog_path = Some(path);
    source
}

#[tokio::test]
async fn test_dell_local_catalog_with_system_filter() {
    let dir = tempfile::tempdir().unwrap();
    let catalog_path = common::gzip_fixture("dell_catalog.xml", dir.path());
    let readers = ReaderRegistry::with_defaults(reqwest::Client::new());

    let catalog = readers
        .read(
            &dell_source(catalog_path),
            &SystemCompatibilityFilter::from_systems(["PowerEdge R730"]),
        )
        .await
        .unwrap();

    assert_eq!(catalog.meta.vendor_id, "7f2c1e4a-6b1d-4c2a-9d0e-1a2b3c4d5e6f");
    assert_eq!(catalog.len(), 1);
    let bios = &catalog.components[0];
    assert_eq!(bios.external_id, "FOLDER01/1/BIOS_PT4N9_WN64_2.19.0.EXE");
    assert_eq!(bios.severity, Severity::Recommended);
    assert!(bios.reboot_required);
    assert_eq!(
        bios.vendor_download_url.as_deref(),
        Some("https://downloads.dell.com/FOLDER01/1/BIOS_PT4N9_WN64_2.19.0.EXE")
    );
}

#[tokio::test]
async fn test_dell_unfiltered_keeps_only_firmware() {
    let dir = tempfile::tempdir().unwrap();
    let catalog_path = common::gzip_fixture("dell_catalog.xml", dir.path());
    let readers = ReaderRegistry::with_defaults(reqwest::Client::new());

    let catalog = readers
        .read(&dell_source(catalog_path), &SystemCompatibilityFilter::new())
        .await
        .unwrap();

    // Two of the five components are a driver and an application.
    assert_eq!(catalog.len(), 3);
    let manifest = parse_manifest(&decode_manifest(
        &std::fs::read(common::fixture("dell_catalog.xml")).unwrap(),
    ))
    .unwrap();
    for component in &catalog.components {
        let source = manifest
            .components
            .iter()
            .find(|c| c.path == component.external_id)
            .unwrap();
        assert_eq!(source.component_type, "FRMW");
    }
}

#[tokio::test]
async fn test_dell_bare_model_filter_is_superset() {
    let dir = tempfile::tempdir().unwrap();
    let catalog_path = common::gzip_fixture("dell_catalog.xml", dir.path());
    let readers = ReaderRegistry::with_defaults(reqwest::Client::new());
    let source = dell_source(catalog_path);

    for model in ["R730", "R640", "R750", "R999"] {
        let qualified = readers
            .read(
                &source,
                &SystemCompatibilityFilter::from_systems([format!("PowerEdge {model}")]),
            )
            .await
            .unwrap();
        let bare = readers
            .read(&source, &SystemCompatibilityFilter::from_systems([model]))
            .await
            .unwrap();

        assert!(bare.len() >= qualified.len());
        for component in &qualified.components {
            assert!(
                bare.components
                    .iter()
                    .any(|c| c.external_id == component.external_id)
            );
        }
    }
}

#[tokio::test]
async fn test_dell_catalog_over_http() {
    let mut server = mockito::Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();
    let gz = std::fs::read(common::gzip_fixture("dell_catalog.xml", dir.path())).unwrap();
    let mock = server
        .mock("GET", "/catalog/Catalog.xml.gz")
        .with_status(200)
        .with_body(gz)
        .create_async()
        .await;

    let mut source = VendorCatalogSource::new(Vendor::Dell);
    source.vendor_url =
        Some(Url::parse(&format!("{}/catalog/Catalog.xml.gz", server.url())).unwrap());
    let catalog = ReaderRegistry::with_defaults(reqwest::Client::new())
        .read(&source, &SystemCompatibilityFilter::from_systems(["R750"]))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(catalog.len(), 1);
    assert_eq!(catalog.components[0].package_id, "M2C4P");
    assert_eq!(
        catalog.meta.vendor_url.as_deref(),
        Some(format!("{}/catalog/Catalog.xml.gz", server.url()).as_str())
    );
}
