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

//! Runs one catalog ingestion: filter resolution, vendor read, catalog submission, then
//! materialization and submission of every component, strictly in sequence.
//!
//! Submission is not transactional. Once the catalog record exists, any failure is returned
//! as [`CatalogError::PartialSubmission`] and nothing already registered is rolled back.

use std::sync::Arc;

use crate::error::{CatalogError, CatalogResult};
use crate::filter::{SystemCompatibilityFilter, resolve_filter};
use crate::inventory::Inventory;
use crate::materializer::{MaterializeOptions, Materialized, Materializer};
use crate::model::{Catalog, FirmwareComponent, VendorCatalogSource};
use crate::readers::ReaderRegistry;
use crate::registry::{
    BinaryId, CatalogId, CatalogRegistry, CreateBinaryRequest, CreateCatalogRequest,
};
use crate::repository::RepositoryConnector;

/// Everything a run needs to know up front. Never changed once the run starts.
#[derive(Clone, Debug)]
pub struct CatalogRequest {
    pub name: String,
    pub description: Option<String>,
    pub source: VendorCatalogSource,
    pub systems_filter: Vec<String>,
    pub server_types_filter: Vec<String>,
    pub materialize: MaterializeOptions,
}

/// What a run produced.
#[derive(Clone, Debug, Default)]
pub struct CatalogRunResult {
    pub catalog_id: Option<CatalogId>,
    // Registered components, with local paths and cache URLs filled in.
    pub components: Vec<FirmwareComponent>,
    // (external id, reason) of components left out by materialization.
    pub skipped: Vec<(String, String)>,
    // (external id, binary id) audit trail of registry submissions.
    pub binaries: Vec<(String, BinaryId)>,
}

pub struct Orchestrator {
    http_client: reqwest::Client,
    readers: ReaderRegistry,
    registry: Option<Arc<dyn CatalogRegistry>>,
    inventory: Option<Arc<dyn Inventory>>,
    repository: Option<Arc<dyn RepositoryConnector>>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("readers", &self.readers)
            .field("registry", &self.registry)
            .field("inventory", &self.inventory)
            .field("repository", &self.repository)
            .finish()
    }
}

impl Orchestrator {
    pub fn new(http_client: reqwest::Client, readers: ReaderRegistry) -> Self {
        Orchestrator {
            http_client,
            readers,
            registry: None,
            inventory: None,
            repository: None,
        }
    }

    pub fn with_registry(mut self, registry: Arc<dyn CatalogRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_inventory(mut self, inventory: Arc<dyn Inventory>) -> Self {
        self.inventory = Some(inventory);
        self
    }

    pub fn with_repository(mut self, repository: Arc<dyn RepositoryConnector>) -> Self {
        self.repository = Some(repository);
        self
    }

    pub async fn resolve_filter(
        &self,
        request: &CatalogRequest,
    ) -> CatalogResult<SystemCompatibilityFilter> {
        resolve_filter(
            request.source.vendor,
            &request.systems_filter,
            &request.server_types_filter,
            self.inventory.as_deref(),
        )
        .await
    }

    /// Resolves the filter and reads the vendor catalog. Nothing is materialized or
    /// submitted.
    pub async fn read(&self, request: &CatalogRequest) -> CatalogResult<Catalog> {
        let filter = self.resolve_filter(request).await?;
        self.readers.read(&request.source, &filter).await
    }

    pub async fn run(&self, request: &CatalogRequest) -> CatalogResult<CatalogRunResult> {
        let Some(registry) = self.registry.as_deref() else {
            return Err(CatalogError::config(
                "submitting a catalog requires an [api] section",
            ));
        };

        let catalog = self.read(request).await?;
        if catalog.is_empty() {
            tracing::warn!(
                vendor = %request.source.vendor,
                "no components passed the compatibility filter, submitting an empty catalog"
            );
        }

        let catalog_id = registry
            .create_catalog(&CreateCatalogRequest::new(
                &request.name,
                request.description.as_deref(),
                request.source.update_type,
                &catalog.meta,
                &request.server_types_filter,
            ))
            .await?;
        tracing::info!(catalog_id, name = %request.name, "catalog created");

        let mut result = CatalogRunResult {
            catalog_id: Some(catalog_id),
            ..Default::default()
        };
        let mut materializer = Materializer::new(
            self.http_client.clone(),
            request.materialize.clone(),
            self.repository.clone(),
        );

        let submitted = submit_components(
            registry,
            &mut materializer,
            catalog_id,
            catalog.components,
            &mut result,
        )
        .await;
        // The session is released whether or not the submission succeeded.
        let closed = materializer.finish().await;

        if let Err(error) = submitted.and(closed) {
            return Err(CatalogError::PartialSubmission {
                catalog_id,
                registered: result.binaries.len(),
                error: Box::new(error),
            });
        }

        tracing::info!(
            catalog_id,
            registered = result.binaries.len(),
            skipped = result.skipped.len(),
            "catalog submitted"
        );
        Ok(result)
    }
}

async fn submit_components(
    registry: &dyn CatalogRegistry,
    materializer: &mut Materializer,
    catalog_id: CatalogId,
    components: Vec<FirmwareComponent>,
    result: &mut CatalogRunResult,
) -> CatalogResult<()> {
    for mut component in components {
        match materializer.materialize(&mut component).await? {
            Materialized::Skipped(reason) => {
                result.skipped.push((component.external_id, reason));
                continue;
            }
            Materialized::Hosted(_) | Materialized::Staged(_) | Materialized::NotRequested => {}
        }

        let binary_id = registry
            .create_binary(&CreateBinaryRequest::new(catalog_id, &component))
            .await?;
        tracing::debug!(
            catalog_id,
            binary_id,
            external_id = %component.external_id,
            "binary registered"
        );
        result
            .binaries
            .push((component.external_id.clone(), binary_id));
        result.components.push(component);
    }
    Ok(())
}
