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

//! The managed binary repository. A connector opens one session per catalog run; the
//! session is shared by every upload of that run.

use std::path::Path;

use async_trait::async_trait;
use carbide_ssh::{SftpTarget, SftpUploader};

use crate::error::CatalogResult;

#[async_trait]
pub trait RepositoryConnector: std::fmt::Debug + Send + Sync {
    async fn connect(&self) -> CatalogResult<Box<dyn RepositorySession>>;
}

#[async_trait]
pub trait RepositorySession: Send + Sync {
    /// Copies `local_path` to `remote_path` (relative to the repository root).
    async fn upload(&mut self, local_path: &Path, remote_path: &str) -> CatalogResult<u64>;

    async fn close(self: Box<Self>) -> CatalogResult<()>;
}

/// Joins a repository relative path onto the configured root directory.
pub fn remote_path(root: &str, relative: &str) -> String {
    let relative = relative.trim_start_matches('/');
    let root = root.trim_end_matches('/');
    if root.is_empty() {
        relative.to_string()
    } else {
        format!("{root}/{relative}")
    }
}

/// SFTP over SSH with public key authentication.
#[derive(Clone, Debug)]
pub struct SshRepository {
    target: SftpTarget,
    root_path: String,
}

impl SshRepository {
    pub fn new(target: SftpTarget, root_path: impl Into<String>) -> Self {
        SshRepository {
            target,
            root_path: root_path.into(),
        }
    }
}

#[async_trait]
impl RepositoryConnector for SshRepository {
    async fn connect(&self) -> CatalogResult<Box<dyn RepositorySession>> {
        let uploader = SftpUploader::connect(&self.target).await?;
        Ok(Box::new(SshRepositorySession {
            uploader,
            root_path: self.root_path.clone(),
        }))
    }
}

#[derive(Debug)]
struct SshRepositorySession {
    uploader: SftpUploader,
    root_path: String,
}

#[async_trait]
impl RepositorySession for SshRepositorySession {
    async fn upload(&mut self, local_path: &Path, remote: &str) -> CatalogResult<u64> {
        let remote = remote_path(&self.root_path, remote);
        Ok(self.uploader.upload(local_path, &remote).await?)
    }

    async fn close(self: Box<Self>) -> CatalogResult<()> {
        Ok(self.uploader.close().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_path() {
        assert_eq!(remote_path("", "FOLDER01/bios.exe"), "FOLDER01/bios.exe");
        assert_eq!(
            remote_path("/srv/firmware/", "FOLDER01/bios.exe"),
            "/srv/firmware/FOLDER01/bios.exe"
        );
        assert_eq!(remote_path("/srv/firmware", "/abs.bin"), "/srv/firmware/abs.bin");
    }
}
