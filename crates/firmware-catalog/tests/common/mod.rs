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

#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use firmware_catalog::inventory::{Inventory, InventoryServer};
use firmware_catalog::registry::{
    BinaryId, CatalogId, CatalogRegistry, CreateBinaryRequest, CreateCatalogRequest,
};
use firmware_catalog::repository::{RepositoryConnector, RepositorySession};
use firmware_catalog::{CatalogError, CatalogResult};
use flate2::Compression;
use flate2::write::GzEncoder;

pub fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

/// Gzips a fixture into `dir`, the way vendors publish their catalogs.
pub fn gzip_fixture(name: &str, dir: &Path) -> PathBuf {
    let raw = std::fs::read(fixture(name)).expect("fixture is readable");
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&raw).expect("gzip write");
    let compressed = encoder.finish().expect("gzip finish");

    let path = dir.join(format!("{name}.gz"));
    std::fs::write(&path, compressed).expect("write gzipped fixture");
    path
}

#[derive(Debug, Default)]
pub struct RegistryLog {
    pub catalogs: Vec<CreateCatalogRequest>,
    pub binaries: Vec<CreateBinaryRequest>,
}

/// Registry that keeps every request. `fail_binary_at` makes the n-th binary submission
/// (0 based) fail.
#[derive(Debug, Default, Clone)]
pub struct MemoryRegistry {
    pub log: Arc<Mutex<RegistryLog>>,
    pub fail_binary_at: Option<usize>,
}

#[async_trait]
impl CatalogRegistry for MemoryRegistry {
    async fn create_catalog(&self, request: &CreateCatalogRequest) -> CatalogResult<CatalogId> {
        let mut log = self.log.lock().unwrap();
        log.catalogs.push(request.clone());
        Ok(100 + log.catalogs.len() as CatalogId)
    }

    async fn create_binary(&self, request: &CreateBinaryRequest) -> CatalogResult<BinaryId> {
        let mut log = self.log.lock().unwrap();
        if self.fail_binary_at == Some(log.binaries.len()) {
            return Err(CatalogError::Registry(format!(
                "rejected {}",
                request.external_id
            )));
        }
        log.binaries.push(request.clone());
        Ok(1000 + log.binaries.len() as BinaryId)
    }
}

#[derive(Debug, Default, Clone)]
pub struct StaticInventory {
    pub servers: Vec<(String, InventoryServer)>,
}

impl StaticInventory {
    pub fn with(mut self, server_type: &str, vendor: &str, model: &str, serial: &str) -> Self {
        self.servers.push((
            server_type.to_string(),
            InventoryServer {
                vendor: vendor.to_string(),
                model: model.to_string(),
                serial_number: Some(serial.to_string()),
            },
        ));
        self
    }
}

#[async_trait]
impl Inventory for StaticInventory {
    async fn servers_of_type(&self, server_type: &str) -> CatalogResult<Vec<InventoryServer>> {
        Ok(self
            .servers
            .iter()
            .filter(|(t, _)| t == server_type)
            .map(|(_, s)| s.clone())
            .collect())
    }
}

#[derive(Debug, Default)]
pub struct RepositoryLog {
    pub connects: usize,
    pub uploads: Vec<(PathBuf, String)>,
    pub closes: usize,
}

#[derive(Debug, Default, Clone)]
pub struct MemoryRepository {
    pub log: Arc<Mutex<RepositoryLog>>,
}

struct MemorySession {
    log: Arc<Mutex<RepositoryLog>>,
}

#[async_trait]
impl RepositoryConnector for MemoryRepository {
    async fn connect(&self) -> CatalogResult<Box<dyn RepositorySession>> {
        self.log.lock().unwrap().connects += 1;
        Ok(Box::new(MemorySession {
            log: self.log.clone(),
        }))
    }
}

#[async_trait]
impl RepositorySession for MemorySession {
    async fn upload(&mut self, local_path: &Path, remote_path: &str) -> CatalogResult<u64> {
        let size = std::fs::metadata(local_path)
            .map_err(|e| CatalogError::io("stat", local_path, e))?
            .len();
        self.log
            .lock()
            .unwrap()
            .uploads
            .push((local_path.to_path_buf(), remote_path.to_string()));
        Ok(size)
    }

    async fn close(self: Box<Self>) -> CatalogResult<()> {
        self.log.lock().unwrap().closes += 1;
        Ok(())
    }
}
