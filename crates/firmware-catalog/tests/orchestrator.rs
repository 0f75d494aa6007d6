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

use std::sync::Arc;

use common::{MemoryRegistry, MemoryRepository, StaticInventory};
use firmware_catalog::{
    CatalogError, CatalogRequest, ErrorKind, MaterializeOptions, Orchestrator, ReaderRegistry,
    Vendor, VendorCatalogSource,
};
use url::Url;

const HPE_PACKAGES: &str = r#"{
    "U30_2.90_01_20_2023.fwpkg": {
        "date": "2023-01-20",
        "description": "ROM Flash Firmware Package - HPE ProLiant DL380 Gen10 (U30) Servers",
        "deviceclass": "aa148d2e-6e09-453e-bc6f-63baa5f5ccc4",
        "reboot_required": "yes",
        "target": ["DL380 Gen10"],
        "version": "2.90_01-20-2023"
    },
    "ilo5_290.fwpkg": {
        "date": "2023-05-02",
        "description": "HPE Integrated Lights-Out 5",
        "deviceclass": "2f317b9d-c9e3-4d76-bff6-b9d0d085a952",
        "reboot_required": "no",
        "target": ["DL380 Gen10", "DL360 Gen10"],
        "version": "2.90"
    },
    "nic_fw.fwpkg": {
        "date": "2023-05-02",
        "description": "NIC firmware",
        "deviceclass": "d7a1a3a0-0000-4000-8000-000000000001",
        "reboot_required": "no",
        "target": "DL20 Gen10",
        "version": "1.0"
    }
}"#;

async fn hpe_server() -> mockito::ServerGuard {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/fwrepodata/fwrepo.json")
        .with_status(200)
        .with_body(HPE_PACKAGES)
        .create_async()
        .await;
    for package in ["U30_2.90_01_20_2023.fwpkg", "ilo5_290.fwpkg"] {
        server
            .mock("GET", format!("/fwrepodata/{package}").as_str())
            .with_status(200)
            .with_body(format!("payload of {package}"))
            .create_async()
            .await;
    }
    server
}

fn hpe_request(server: &mockito::ServerGuard, binaries: &std::path::Path) -> CatalogRequest {
    let mut source = VendorCatalogSource::new(Vendor::Hpe);
    source.vendor_url =
        Some(Url::parse(&format!("{}/fwrepodata/fwrepo.json", server.url())).unwrap());
    CatalogRequest {
        name: "hpe-gen10".to_string(),
        description: Some("HPE Gen10 firmware".to_string()),
        source,
        systems_filter: vec![],
        server_types_filter: vec!["M.8.8.2".to_string()],
        materialize: MaterializeOptions {
            download: true,
            upload: true,
            local_binaries_path: Some(binaries.to_path_buf()),
            vendor_token: None,
            repository_base_url: Some(Url::parse("https://repo.example.com/firmware/").unwrap()),
        },
    }
}

fn orchestrator(registry: &MemoryRegistry, repository: &MemoryRepository) -> Orchestrator {
    let inventory = StaticInventory::default()
        .with("M.8.8.2", "HPE", "DL380 Gen10", "CZ1234")
        .with("M.8.8.2", "Dell Inc.", "PowerEdge R750", "5XYZ123");
    let http_client = reqwest::Client::new();
    Orchestrator::new(http_client.clone(), ReaderRegistry::with_defaults(http_client))
        .with_registry(Arc::new(registry.clone()))
        .with_inventory(Arc::new(inventory))
        .with_repository(Arc::new(repository.clone()))
}

#[tokio::test]
async fn test_full_run_registers_hosted_binaries() {
    let server = hpe_server().await;
    let binaries = tempfile::tempdir().unwrap();
    let registry = MemoryRegistry::default();
    let repository = MemoryRepository::default();

    let result = orchestrator(&registry, &repository)
        .run(&hpe_request(&server, binaries.path()))
        .await
        .unwrap();

    assert_eq!(result.catalog_id, Some(101));
    assert_eq!(result.binaries.len(), 2);
    assert!(result.skipped.is_empty());

    let log = registry.log.lock().unwrap();
    assert_eq!(log.catalogs.len(), 1);
    assert_eq!(log.catalogs[0].vendor, Vendor::Hpe);
    assert_eq!(log.catalogs[0].supported_server_types, vec!["M.8.8.2".to_string()]);
    for binary in &log.binaries {
        assert_eq!(binary.catalog_id, 101);
        assert_eq!(
            binary.cache_download_url.as_deref(),
            Some(format!("https://repo.example.com/firmware/{}", binary.external_id).as_str())
        );
    }

    let repository = repository.log.lock().unwrap();
    assert_eq!(repository.connects, 1);
    assert_eq!(repository.closes, 1);
    assert_eq!(repository.uploads.len(), 2);
    assert_eq!(
        std::fs::read_to_string(binaries.path().join("ilo5_290.fwpkg")).unwrap(),
        "payload of ilo5_290.fwpkg"
    );
}

#[tokio::test]
async fn test_failure_after_catalog_creation_is_partial_submission() {
    let server = hpe_server().await;
    let binaries = tempfile::tempdir().unwrap();
    let registry = MemoryRegistry {
        fail_binary_at: Some(1),
        ..Default::default()
    };
    let repository = MemoryRepository::default();

    let err = orchestrator(&registry, &repository)
        .run(&hpe_request(&server, binaries.path()))
        .await
        .unwrap_err();

    match &err {
        CatalogError::PartialSubmission {
            catalog_id,
            registered,
            error,
        } => {
            assert_eq!(*catalog_id, 101);
            assert_eq!(*registered, 1);
            assert!(matches!(**error, CatalogError::Registry(_)));
        }
        other => panic!("unexpected error {other}"),
    }
    assert_eq!(err.kind(), ErrorKind::Registry);
    // Nothing is rolled back and the session is still released.
    assert_eq!(registry.log.lock().unwrap().binaries.len(), 1);
    assert_eq!(repository.log.lock().unwrap().closes, 1);
}

#[tokio::test]
async fn test_download_failure_aborts_run() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/fwrepodata/fwrepo.json")
        .with_status(200)
        .with_body(HPE_PACKAGES)
        .create_async()
        .await;
    server
        .mock("GET", mockito::Matcher::Regex(r"^/fwrepodata/.*\.fwpkg$".to_string()))
        .with_status(503)
        .create_async()
        .await;

    let binaries = tempfile::tempdir().unwrap();
    let registry = MemoryRegistry::default();
    let repository = MemoryRepository::default();
    let err = orchestrator(&registry, &repository)
        .run(&hpe_request(&server, binaries.path()))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CatalogError::PartialSubmission { registered: 0, .. }
    ));
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert_eq!(repository.log.lock().unwrap().connects, 0);
}

#[tokio::test]
async fn test_configuration_errors_happen_before_any_submission() {
    let server = hpe_server().await;
    let binaries = tempfile::tempdir().unwrap();
    let registry = MemoryRegistry::default();
    let http_client = reqwest::Client::new();

    // Server type filter but no inventory collaborator.
    let err = Orchestrator::new(http_client.clone(), ReaderRegistry::with_defaults(http_client))
        .with_registry(Arc::new(registry.clone()))
        .run(&hpe_request(&server, binaries.path()))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(registry.log.lock().unwrap().catalogs.is_empty());
}

#[tokio::test]
async fn test_read_only_run_submits_nothing() {
    let server = hpe_server().await;
    let binaries = tempfile::tempdir().unwrap();
    let registry = MemoryRegistry::default();
    let repository = MemoryRepository::default();

    let catalog = orchestrator(&registry, &repository)
        .read(&hpe_request(&server, binaries.path()))
        .await
        .unwrap();

    // Only DL380 Gen10 resolved from the inventory; the Dell server is ignored.
    assert_eq!(catalog.len(), 2);
    assert!(catalog.components.iter().all(|c| c.cache_download_url.is_none()));
    assert!(registry.log.lock().unwrap().catalogs.is_empty());
    assert_eq!(repository.log.lock().unwrap().connects, 0);
}

#[tokio::test]
async fn test_server_type_without_vendor_hardware_submits_nothing() {
    let server = hpe_server().await;
    let binaries = tempfile::tempdir().unwrap();
    let registry = MemoryRegistry::default();
    let repository = MemoryRepository::default();
    let inventory = StaticInventory::default().with("M.1", "Dell Inc.", "PowerEdge R750", "5XYZ");
    let http_client = reqwest::Client::new();
    let orchestrator =
        Orchestrator::new(http_client.clone(), ReaderRegistry::with_defaults(http_client))
            .with_registry(Arc::new(registry.clone()))
            .with_inventory(Arc::new(inventory))
            .with_repository(Arc::new(repository.clone()));

    let mut request = hpe_request(&server, binaries.path());
    request.server_types_filter = vec!["M.1".to_string()];
    let err = orchestrator.run(&request).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert!(registry.log.lock().unwrap().catalogs.is_empty());
    assert_eq!(repository.log.lock().unwrap().connects, 0);
}
