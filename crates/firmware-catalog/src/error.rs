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

use std::path::Path;

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Broad class of a [`CatalogError`]. Configuration errors are raised before any I/O,
/// everything else aborts a run that is already under way.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Transport,
    Parse,
    Registry,
}

#[derive(thiserror::Error, Debug)]
pub enum CatalogError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{context}: {error}")]
    Http {
        context: String,
        #[source]
        error: reqwest::Error,
    },

    #[error("{context}: server returned status {status}")]
    HttpStatus {
        context: String,
        status: reqwest::StatusCode,
    },

    #[error("{context} ({path}): {error}")]
    Io {
        context: String,
        path: String,
        #[source]
        error: std::io::Error,
    },

    #[error("Failed to parse {what}: {reason}")]
    Parse { what: String, reason: String },

    #[error("Vendor content service returned error code {code}: {message}")]
    VendorResult { code: i64, message: String },

    #[error("Checksum mismatch for {path}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    #[error("No firmware components found: {0}")]
    NoComponents(String),

    #[error("Repository transfer failed: {0}")]
    Repository(#[from] carbide_ssh::SshError),

    #[error("Catalog registry request failed: {0}")]
    Registry(String),

    #[error("Inventory lookup failed: {0}")]
    Inventory(String),

    #[error(
        "Catalog {catalog_id} was left partially submitted ({registered} binaries registered): {error}"
    )]
    PartialSubmission {
        catalog_id: i64,
        registered: usize,
        #[source]
        error: Box<CatalogError>,
    },
}

impl CatalogError {
    pub fn config(message: impl Into<String>) -> Self {
        CatalogError::Config(message.into())
    }

    pub fn parse(what: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        CatalogError::Parse {
            what: what.into(),
            reason: reason.to_string(),
        }
    }

    pub fn io(context: impl Into<String>, path: &Path, error: std::io::Error) -> Self {
        CatalogError::Io {
            context: context.into(),
            path: path.display().to_string(),
            error,
        }
    }

    pub fn http(context: impl Into<String>, error: reqwest::Error) -> Self {
        CatalogError::Http {
            context: context.into(),
            error,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CatalogError::Config(_) => ErrorKind::Configuration,
            CatalogError::Http { .. }
            | CatalogError::HttpStatus { .. }
            | CatalogError::Io { .. }
            | CatalogError::Repository(_)
            | CatalogError::Inventory(_) => ErrorKind::Transport,
            CatalogError::Parse { .. }
            | CatalogError::VendorResult { .. }
            | CatalogError::ChecksumMismatch { .. }
            | CatalogError::NoComponents(_) => ErrorKind::Parse,
            CatalogError::Registry(_) => ErrorKind::Registry,
            CatalogError::PartialSubmission { error, .. } => error.kind(),
        }
    }
}
