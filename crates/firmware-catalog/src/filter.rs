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

// System compatibility filter: the set of target system names a catalog is narrowed to,
// plus one exemplar serial number per resolved vendor model.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{CatalogError, CatalogResult};
use crate::inventory::Inventory;
use crate::model::Vendor;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SystemCompatibilityFilter {
    // systems is an insertion ordered set of system names.
    systems: Vec<String>,
    // exemplars maps a vendor model to one serial number (or SKU) registered for it.
    // An empty string means no serial is known.
    exemplars: BTreeMap<String, String>,
}

impl SystemCompatibilityFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_systems<I, S>(systems: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut filter = Self::new();
        for system in systems {
            filter.add_system(system.as_ref());
        }
        filter
    }

    /// Adds a system name. Blank and duplicate names are ignored.
    pub fn add_system(&mut self, system: &str) {
        let system = system.trim();
        if system.is_empty() || self.systems.iter().any(|s| s == system) {
            return;
        }
        self.systems.push(system.to_string());
    }

    /// Records `serial` as the exemplar of `model` unless one was already recorded.
    /// The model is also added to the system names.
    pub fn add_exemplar(&mut self, model: &str, serial: &str) {
        let model = model.trim();
        if model.is_empty() {
            return;
        }
        self.add_system(model);
        self.exemplars
            .entry(model.to_string())
            .or_insert_with(|| serial.trim().to_string());
    }

    /// Populates the exemplar map with empty serials for every system name when no
    /// exemplar was resolved from inventory. Running it again changes nothing.
    pub fn ensure_exemplars(&mut self) {
        if !self.exemplars.is_empty() {
            return;
        }
        for system in &self.systems {
            self.exemplars.insert(system.clone(), String::new());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    pub fn systems(&self) -> &[String] {
        &self.systems
    }

    pub fn exemplars(&self) -> &BTreeMap<String, String> {
        &self.exemplars
    }

    pub fn matches(&self, candidate: &str) -> bool {
        let candidate = candidate.trim();
        !candidate.is_empty() && self.systems.iter().any(|s| s == candidate)
    }

    /// An empty filter accepts everything.
    pub fn accepts_any<'a, I>(&self, candidates: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.is_empty() || candidates.into_iter().any(|c| self.matches(c))
    }
}

/// Builds the filter for a run. Explicit system names come first; every server type is then
/// looked up in the inventory and the models of matching vendor hardware are appended, each
/// with the first serial number seen for it.
pub async fn resolve_filter(
    vendor: Vendor,
    systems: &[String],
    server_types: &[String],
    inventory: Option<&dyn Inventory>,
) -> CatalogResult<SystemCompatibilityFilter> {
    let mut filter = SystemCompatibilityFilter::from_systems(systems);

    if server_types.is_empty() {
        filter.ensure_exemplars();
        return Ok(filter);
    }

    let Some(inventory) = inventory else {
        return Err(CatalogError::config(
            "a server type filter requires an inventory endpoint ([api] section)",
        ));
    };

    for server_type in server_types {
        let servers = inventory.servers_of_type(server_type).await?;
        let mut matched = 0;
        for server in servers {
            if !vendor.matches_inventory_name(&server.vendor) {
                tracing::debug!(
                    %server_type,
                    vendor = %server.vendor,
                    model = %server.model,
                    "ignoring server from another vendor"
                );
                continue;
            }
            if server.model.trim().is_empty() {
                tracing::warn!(%server_type, "server without a model in inventory, skipping");
                continue;
            }
            filter.add_exemplar(&server.model, server.serial_number.as_deref().unwrap_or(""));
            matched += 1;
        }
        if matched == 0 {
            tracing::warn!(
                %server_type,
                %vendor,
                "no {vendor} hardware registered for server type"
            );
        }
    }

    // An empty filter accepts the whole vendor catalog, which is never what a server type
    // filter asks for.
    if filter.is_empty() {
        return Err(CatalogError::config(format!(
            "server types {} resolve to no {vendor} hardware in the inventory",
            server_types.join(", ")
        )));
    }

    Ok(filter)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::inventory::InventoryServer;

    #[derive(Debug)]
    struct StaticInventory;

    #[async_trait]
    impl Inventory for StaticInventory {
        async fn servers_of_type(&self, server_type: &str) -> CatalogResult<Vec<InventoryServer>> {
            let server = |vendor: &str, model: &str, serial: &str| InventoryServer {
                vendor: vendor.to_string(),
                model: model.to_string(),
                serial_number: Some(serial.to_string()),
            };
            Ok(match server_type {
                "M.8.8.2" => vec![
                    server("Lenovo", "7X06", "J300AAAA"),
                    server("LENOVO", "7X06", "J300BBBB"),
                    server("Dell Inc.", "PowerEdge R640", "5XYZ123"),
                ],
                "M.4.4.1" => vec![server("Lenovo", "7Z70", "J100CCCC")],
                _ => vec![],
            })
        }
    }

    #[test]
    fn test_filter_deduplicates_systems() {
        let filter = SystemCompatibilityFilter::from_systems(["R730", " R730 ", "", "R640"]);
        assert_eq!(filter.systems(), &["R730".to_string(), "R640".to_string()]);
    }

    #[test]
    fn test_empty_filter_accepts_everything() {
        let filter = SystemCompatibilityFilter::new();
        assert!(filter.accepts_any(["anything"]));
        assert!(filter.accepts_any(std::iter::empty()));
    }

    #[test]
    fn test_non_empty_filter_requires_match() {
        let filter = SystemCompatibilityFilter::from_systems(["PowerEdge R730"]);
        assert!(filter.accepts_any(["R730", "PowerEdge R730"]));
        assert!(!filter.accepts_any(["R730", "PowerEdge R640"]));
        assert!(!filter.accepts_any(std::iter::empty()));
    }

    #[test]
    fn test_ensure_exemplars_is_idempotent() {
        let mut filter = SystemCompatibilityFilter::from_systems(["7X06", "7Z70"]);
        assert!(filter.exemplars().is_empty());
        filter.ensure_exemplars();
        assert_eq!(filter.exemplars().len(), 2);
        assert!(filter.exemplars().values().all(String::is_empty));

        let before = filter.clone();
        filter.ensure_exemplars();
        assert_eq!(filter, before);
    }

    #[test]
    fn test_ensure_exemplars_keeps_resolved_serials() {
        let mut filter = SystemCompatibilityFilter::new();
        filter.add_exemplar("7X06", "J300AAAA");
        filter.add_system("7Z70");
        filter.ensure_exemplars();
        assert_eq!(filter.exemplars().len(), 1);
        assert_eq!(filter.exemplars()["7X06"], "J300AAAA");
    }

    #[tokio::test]
    async fn test_resolve_filter_keeps_first_serial_per_model() {
        let filter = resolve_filter(
            Vendor::Lenovo,
            &[],
            &["M.8.8.2".to_string(), "M.4.4.1".to_string()],
            Some(&StaticInventory),
        )
        .await
        .unwrap();

        assert_eq!(filter.systems(), &["7X06".to_string(), "7Z70".to_string()]);
        assert_eq!(filter.exemplars()["7X06"], "J300AAAA");
        assert_eq!(filter.exemplars()["7Z70"], "J100CCCC");
    }

    #[tokio::test]
    async fn test_resolve_filter_without_server_types_uses_fallback() {
        let filter = resolve_filter(Vendor::Lenovo, &["7X06".to_string()], &[], None)
            .await
            .unwrap();
        assert_eq!(filter.exemplars().get("7X06").map(String::as_str), Some(""));
    }

    #[tokio::test]
    async fn test_resolve_filter_requires_inventory() {
        let err = resolve_filter(Vendor::Dell, &[], &["M.8.8.2".to_string()], None)
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Config(_)));
    }

    #[tokio::test]
    async fn test_server_types_without_vendor_hardware_fail() {
        // M.8.8.2 only has Lenovo and Dell hardware.
        let err = resolve_filter(
            Vendor::Hpe,
            &[],
            &["M.8.8.2".to_string()],
            Some(&StaticInventory),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, CatalogError::Config(_)));
        assert!(err.to_string().contains("M.8.8.2"));

        let err = resolve_filter(
            Vendor::Lenovo,
            &[],
            &["M.0.0.0".to_string()],
            Some(&StaticInventory),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, CatalogError::Config(_)));
    }

    #[tokio::test]
    async fn test_explicit_systems_survive_unresolved_server_types() {
        let filter = resolve_filter(
            Vendor::Hpe,
            &["DL380 Gen10".to_string()],
            &["M.8.8.2".to_string()],
            Some(&StaticInventory),
        )
        .await
        .unwrap();
        assert_eq!(filter.systems(), &["DL380 Gen10".to_string()]);
    }
}
