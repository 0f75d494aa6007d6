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

use sha2::{Digest, Sha256};

use crate::error::{CatalogError, CatalogResult};
use crate::model::Checksum;

/// Lowercase hex digest of the file at `path`, using the algorithm of `checksum`.
pub fn digest_file(path: &Path, checksum: &Checksum) -> CatalogResult<String> {
    // md5 and sha2 are synchronous hashers, so the file is read with std.
    let mut file =
        std::fs::File::open(path).map_err(|e| CatalogError::io("opening for checksum", path, e))?;
    let digest = match checksum {
        Checksum::Md5(_) => {
            let mut context = md5::Context::new();
            std::io::copy(&mut file, &mut context)
                .map_err(|e| CatalogError::io("hashing", path, e))?;
            format!("{:x}", context.compute())
        }
        Checksum::Sha256(_) => {
            let mut hasher = Sha256::new();
            std::io::copy(&mut file, &mut hasher)
                .map_err(|e| CatalogError::io("hashing", path, e))?;
            hex::encode(hasher.finalize())
        }
    };
    Ok(digest)
}

/// Checks the file against the vendor checksum. This guards against corrupt downloads and
/// moved vendor URLs, not against tampering. An empty expected value is not checked.
pub fn verify_file(path: &Path, checksum: &Checksum) -> CatalogResult<()> {
    let expected = match checksum {
        Checksum::Md5(v) | Checksum::Sha256(v) => v.trim().to_lowercase(),
    };
    if expected.is_empty() {
        return Ok(());
    }
    let actual = digest_file(path, checksum)?;
    if actual != expected {
        return Err(CatalogError::ChecksumMismatch {
            path: path.display().to_string(),
            expected,
            actual,
        });
    }
    tracing::debug!(path = %path.display(), "checksum verified");
    Ok(())
}
