// SPDX-License-Identifier: Apache-2.0
// Copyright 2026 Tbpol Authors

use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use std::fmt;
use thiserror::Error;

/// Wire tag for the 160-bit legacy digest.
pub const ALG_TAG_SHA1: u8 = 0x00;

/// Byte length of one SHA-1 digest.
pub const SHA1_LENGTH: usize = 20;

// This error needs to be public because we implement TryFrom for public types
#[derive(Error, Debug)]
pub enum AlgorithmError {
    #[error("Hash algorithm {0} not supported")]
    UnsupportedHashAlgorithm(String),
}

/// Digest algorithm used for every hash value carried by a policy.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HashAlgorithm {
    Sha1,
}

impl HashAlgorithm {
    /// Fixed byte length of one digest under this algorithm.
    pub fn digest_size(&self) -> usize {
        match self {
            HashAlgorithm::Sha1 => SHA1_LENGTH,
        }
    }

    /// Wire tag carried in the policy header.
    pub fn tag(&self) -> u8 {
        match self {
            HashAlgorithm::Sha1 => ALG_TAG_SHA1,
        }
    }
}

/// Returns the digest length for a raw algorithm tag, 0 if the tag is
/// unknown.
///
/// Sizing a policy tail must go through [`HashAlgorithm`] instead, which
/// rejects unknown tags outright rather than shrinking the tail to nothing.
pub fn known_digest_size(tag: u8) -> usize {
    match tag {
        ALG_TAG_SHA1 => SHA1_LENGTH,
        _ => 0,
    }
}

impl TryFrom<u8> for HashAlgorithm {
    type Error = AlgorithmError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            ALG_TAG_SHA1 => Ok(HashAlgorithm::Sha1),
            other => Err(AlgorithmError::UnsupportedHashAlgorithm(format!(
                "{other:#04x}"
            ))),
        }
    }
}

impl TryFrom<&str> for HashAlgorithm {
    type Error = AlgorithmError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "sha1" => Ok(HashAlgorithm::Sha1),
            _ => {
                Err(AlgorithmError::UnsupportedHashAlgorithm(value.into()))
            }
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let value = match self {
            HashAlgorithm::Sha1 => "sha1",
        };
        write!(f, "{value}")
    }
}
