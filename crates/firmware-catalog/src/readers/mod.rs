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

//! Vendor catalog readers. Each reader turns one vendor specific source into a normalized
//! [`Catalog`], applying the compatibility filter while it reads.

pub mod dell;
pub mod hpe;
pub mod lenovo;
pub mod supermicro;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::{CatalogError, CatalogResult};
use crate::filter::SystemCompatibilityFilter;
use crate::model::{Catalog, Vendor, VendorCatalogSource};

#[async_trait]
pub trait CatalogReader: Send + Sync {
    fn vendor(&self) -> Vendor;

    async fn read(
        &self,
        source: &VendorCatalogSource,
        filter: &SystemCompatibilityFilter,
    ) -> CatalogResult<Catalog>;
}

/// Lookup table of readers by vendor. The orchestrator only talks to this table, so a new
/// vendor is added by registering one more reader.
#[derive(Default)]
pub struct ReaderRegistry {
    readers: HashMap<Vendor, Box<dyn CatalogReader>>,
}

impl std::fmt::Debug for ReaderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut vendors: Vec<_> = self.readers.keys().collect();
        vendors.sort();
        f.debug_struct("ReaderRegistry")
            .field("vendors", &vendors)
            .finish()
    }
}

impl ReaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in Dell, HPE, Lenovo and Supermicro readers sharing one
    /// HTTP client.
    pub fn with_defaults(http_client: reqwest::Client) -> Self {
        let mut registry = Self::new();
        registry.register(dell::DellReader::new(http_client.clone()));
        registry.register(hpe::HpeReader::new(http_client.clone()));
        registry.register(lenovo::LenovoReader::new(http_client));
        registry.register(supermicro::SupermicroReader::new());
        registry
    }

    /// Registers `reader`, replacing any reader previously registered for its vendor.
    pub fn register(&mut self, reader: impl CatalogReader + 'static) {
        self.readers.insert(reader.vendor(), Box::new(reader));
    }

    pub fn get(&self, vendor: Vendor) -> CatalogResult<&dyn CatalogReader> {
        self.readers
            .get(&vendor)
            .map(|r| r.as_ref())
            .ok_or_else(|| {
                CatalogError::config(format!("no catalog reader registered for {vendor}"))
            })
    }

    pub async fn read(
        &self,
        source: &VendorCatalogSource,
        filter: &SystemCompatibilityFilter,
    ) -> CatalogResult<Catalog> {
        let reader = self.get(source.vendor)?;
        tracing::info!(
            vendor = %source.vendor,
            systems = ?filter.systems(),
            "reading vendor catalog"
        );
        let catalog = reader.read(source, filter).await?;
        tracing::info!(
            vendor = %source.vendor,
            vendor_id = %catalog.meta.vendor_id,
            components = catalog.len(),
            "read vendor catalog"
        );
        Ok(catalog)
    }
}
