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

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_ssh2_tokio::{AuthMethod, Client, ServerCheckMethod};
use russh_sftp::client::SftpSession;
use tokio::io::AsyncWriteExt;

#[derive(thiserror::Error, Debug)]
pub enum SshError {
    #[error(transparent)]
    Client(#[from] async_ssh2_tokio::Error),
    #[error("SSH channel error: {0}")]
    Channel(#[from] russh::Error),
    #[error("SFTP error: {0}")]
    Sftp(#[from] russh_sftp::client::error::Error),
    #[error("I/O error on {path}: {error}")]
    Io {
        path: String,
        error: std::io::Error,
    },
    #[error("error looking up {host}: {error}")]
    HostLookup { host: String, error: std::io::Error },
    #[error("{host} did not resolve to any addresses")]
    HostNotFound { host: String },
}

/// How the server's host key is checked when connecting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostKeyCheck {
    /// Strict check against an OpenSSH known_hosts file.
    KnownHostsFile(PathBuf),
    /// No verification at all. Only for lab repositories.
    Disabled,
}

/// Where and as whom to open the repository session.
#[derive(Clone, Debug)]
pub struct SftpTarget {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub private_key_path: PathBuf,
    pub private_key_passphrase: Option<String>,
    pub host_key_check: HostKeyCheck,
}

/// Configuration for russh's SSH client connections
fn russh_client_config() -> russh::client::Config {
    russh::client::Config {
        keepalive_interval: Some(Duration::from_secs(60)),
        keepalive_max: 2,
        window_size: 2097152 * 3,
        maximum_packet_size: 65535,
        ..Default::default()
    }
}

/// One SSH connection plus the SFTP session derived from it. Uploads reuse both until
/// [`SftpUploader::close`] is called.
pub struct SftpUploader {
    client: Client,
    sftp: SftpSession,
    target: String,
}

impl std::fmt::Debug for SftpUploader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SftpUploader")
            .field("target", &self.target)
            .finish()
    }
}

impl SftpUploader {
    pub async fn connect(target: &SftpTarget) -> Result<Self, SshError> {
        let address = resolve(&target.host, target.port).await?;
        let auth_method = AuthMethod::with_key_file(
            &target.private_key_path,
            target.private_key_passphrase.as_deref(),
        );
        let server_check = match &target.host_key_check {
            HostKeyCheck::KnownHostsFile(path) => {
                ServerCheckMethod::KnownHostsFile(path.to_string_lossy().to_string())
            }
            HostKeyCheck::Disabled => {
                tracing::warn!(
                    host = %target.host,
                    "host key verification is disabled for the repository connection"
                );
                ServerCheckMethod::NoCheck
            }
        };

        let client = Client::connect_with_config(
            address,
            &target.username,
            auth_method,
            server_check,
            russh_client_config(),
        )
        .await?;

        let channel = client.get_channel().await?;
        channel.request_subsystem(true, "sftp").await?;
        let sftp = SftpSession::new(channel.into_stream()).await?;

        let target = format!("{}@{}:{}", target.username, target.host, target.port);
        tracing::info!(%target, "opened SFTP session");
        Ok(SftpUploader {
            client,
            sftp,
            target,
        })
    }

    /// Creates `remote_dir` and every missing parent, like `mkdir -p`.
    pub async fn create_dir_all(&self, remote_dir: &str) -> Result<(), SshError> {
        let mut dirs = remote_parent_dirs(remote_dir);
        let trimmed = remote_dir.trim_end_matches('/');
        if !trimmed.is_empty() {
            dirs.push(trimmed.to_string());
        }
        for dir in dirs {
            if !self.sftp.try_exists(dir.clone()).await? {
                tracing::debug!(%dir, "creating remote directory");
                self.sftp.create_dir(dir).await?;
            }
        }
        Ok(())
    }

    /// Copies `local_path` to `remote_path`, creating the remote parent directories first.
    /// Returns the number of bytes written.
    pub async fn upload(&self, local_path: &Path, remote_path: &str) -> Result<u64, SshError> {
        if let Some(parent) = remote_parent_dirs(remote_path).pop() {
            self.create_dir_all(&parent).await?;
        }

        let mut local = tokio::fs::File::open(local_path)
            .await
            .map_err(|error| SshError::Io {
                path: local_path.display().to_string(),
                error,
            })?;
        let mut remote = self.sftp.create(remote_path).await?;
        let written = tokio::io::copy(&mut local, &mut remote)
            .await
            .map_err(|error| SshError::Io {
                path: remote_path.to_string(),
                error,
            })?;
        remote.shutdown().await.map_err(|error| SshError::Io {
            path: remote_path.to_string(),
            error,
        })?;

        tracing::info!(target = %self.target, %remote_path, bytes = written, "uploaded binary");
        Ok(written)
    }

    pub async fn close(self) -> Result<(), SshError> {
        self.sftp.close().await?;
        self.client.disconnect().await?;
        tracing::debug!(target = %self.target, "closed SFTP session");
        Ok(())
    }
}

async fn resolve(host: &str, port: u16) -> Result<SocketAddr, SshError> {
    tokio::net::lookup_host((host, port))
        .await
        .map_err(|error| SshError::HostLookup {
            host: host.to_string(),
            error,
        })?
        .next()
        .ok_or_else(|| SshError::HostNotFound {
            host: host.to_string(),
        })
}

/// Every ancestor directory of `path`, outermost first. A leading `/` is kept.
pub fn remote_parent_dirs(path: &str) -> Vec<String> {
    let absolute = path.starts_with('/');
    let components: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();
    let mut dirs = Vec::new();
    let mut current = String::new();
    for component in components.iter().take(components.len().saturating_sub(1)) {
        if !current.is_empty() || absolute {
            current.push('/');
        }
        current.push_str(component);
        dirs.push(current.clone());
    }
    dirs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parent_dirs_relative() {
        assert_eq!(
            remote_parent_dirs("FOLDER01/2/BIOS_1.EXE"),
            vec!["FOLDER01".to_string(), "FOLDER01/2".to_string()]
        );
    }

    #[test]
    fn test_parent_dirs_absolute() {
        assert_eq!(
            remote_parent_dirs("/srv/firmware/dell/bios.exe"),
            vec![
                "/srv".to_string(),
                "/srv/firmware".to_string(),
                "/srv/firmware/dell".to_string()
            ]
        );
    }

    #[test]
    fn test_parent_dirs_bare_file() {
        assert!(remote_parent_dirs("bios.exe").is_empty());
        assert!(remote_parent_dirs("").is_empty());
    }
}
