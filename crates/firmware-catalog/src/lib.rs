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

//! Vendor firmware catalog ingestion. Dell, HPE, Lenovo and Supermicro firmware
//! descriptions are normalized into one catalog model, narrowed to the target hardware,
//! optionally re-hosted and submitted to the catalog registry.

pub mod checksum;
pub mod config;
pub mod error;
pub mod filter;
pub mod inventory;
pub mod materializer;
pub mod model;
pub mod orchestrator;
pub mod readers;
pub mod registry;
pub mod repository;
pub mod transport;

pub use config::{CatalogConfig, ConfigError};
pub use error::{CatalogError, CatalogResult, ErrorKind};
pub use filter::SystemCompatibilityFilter;
pub use materializer::{MaterializeOptions, Materialized, Materializer};
pub use model::{
    Catalog, CatalogMeta, FirmwareComponent, Severity, UpdateType, Vendor, VendorCatalogSource,
};
pub use orchestrator::{CatalogRequest, CatalogRunResult, Orchestrator};
pub use readers::{CatalogReader, ReaderRegistry};
