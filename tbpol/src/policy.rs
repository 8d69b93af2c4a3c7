// SPDX-License-Identifier: Apache-2.0
// Copyright 2026 Tbpol Authors

// Packed wire format for verified-launch policies:
//
//   policy header   u8 version, u8 policy_type, u8 hash_alg,
//                   u32 control_flags, u32 reserved, u8 entry_count
//   entry           u8 module_number, u8 pcr, u8 hash_type,
//                   u32 reserved, u8 hash_count,
//                   hash_count digests (length fixed by the policy's
//                   hash_alg, not by per-entry data)
//
// All multi-byte fields are little-endian, nothing is padded. Entries are
// packed back-to-back with no per-entry length or offset table, so the
// layout can only be walked entry-by-entry, in order.

use crate::algorithms::{AlgorithmError, HashAlgorithm, SHA1_LENGTH};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use std::fmt;
use std::io::{Cursor, Read};
use thiserror::Error;

/// Only format version emitted and accepted.
pub const POLICY_VERSION: u8 = 2;

/// Largest supported module number.
pub const MAX_MODULE_NUM: u8 = 127;
/// Matches any module number not otherwise matched (should be last entry).
pub const MODULE_NUM_ANY: u8 = 129;

/// Largest supported PCR number.
pub const MAX_PCR: u8 = 23;
/// Don't extend the measurement into any PCR.
pub const PCR_NONE: u8 = 255;

/// Extend the policy's own digest into PCR 17.
pub const POLCTL_EXTEND_PCR17: u32 = 0x1;

/// Fixed policy header length in bytes.
pub const POLICY_HEADER_LEN: usize = 12;
/// Fixed entry header length in bytes, digests excluded.
pub const ENTRY_HEADER_LEN: usize = 8;

// The sentinels must stay outside their field's ordinary value range.
const_assert!(MODULE_NUM_ANY > MAX_MODULE_NUM);
const_assert!(PCR_NONE > MAX_PCR);

#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("policy version {0} not supported")]
    UnsupportedVersion(u8),

    #[error("unknown policy type tag {0:#04x}")]
    UnknownPolicyType(u8),

    #[error("unknown hash type tag {0:#04x}")]
    UnknownHashType(u8),

    #[error("{0}")]
    Algorithm(#[from] AlgorithmError),

    #[error(
        "record truncated: need {needed} bytes at offset {offset}, \
         {available} available"
    )]
    TruncatedRecord {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("policy holds {0} entries, more than the format can carry")]
    TooManyEntries(usize),

    #[error("entry holds {0} hashes, more than the format can carry")]
    TooManyHashes(usize),

    #[error("digest is {actual} bytes, algorithm requires {expected}")]
    DigestLength { expected: usize, actual: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One digest value, carrying exactly the bytes valid for its algorithm.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Digest {
    Sha1([u8; SHA1_LENGTH]),
}

impl Digest {
    /// Creates a new `Digest` with `algorithm` and `value`.
    pub fn new(
        algorithm: HashAlgorithm,
        value: &[u8],
    ) -> Result<Self, PolicyError> {
        match algorithm {
            HashAlgorithm::Sha1 => {
                let value: [u8; SHA1_LENGTH] =
                    value.try_into().map_err(|_| {
                        PolicyError::DigestLength {
                            expected: SHA1_LENGTH,
                            actual: value.len(),
                        }
                    })?;
                Ok(Digest::Sha1(value))
            }
        }
    }

    /// Algorithm this digest was produced under.
    pub fn algorithm(&self) -> HashAlgorithm {
        match self {
            Digest::Sha1(_) => HashAlgorithm::Sha1,
        }
    }

    /// Retrieves the value held in this `Digest`.
    pub fn value(&self) -> &[u8] {
        match self {
            Digest::Sha1(value) => value,
        }
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm(), hex::encode(self.value()))
    }
}

/// How downstream verification reacts to errors.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolicyType {
    /// Ignore all non-fatal errors and continue.
    ContinueOnNonFatal,
    /// Ignore verification failures, halt otherwise.
    ContinueOnVerifyFailure,
    /// Halt on any error.
    HaltOnAnyError,
}

impl PolicyType {
    pub fn tag(&self) -> u8 {
        match self {
            PolicyType::ContinueOnNonFatal => 0,
            PolicyType::ContinueOnVerifyFailure => 1,
            PolicyType::HaltOnAnyError => 2,
        }
    }
}

impl TryFrom<u8> for PolicyType {
    type Error = PolicyError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(PolicyType::ContinueOnNonFatal),
            1 => Ok(PolicyType::ContinueOnVerifyFailure),
            2 => Ok(PolicyType::HaltOnAnyError),
            other => Err(PolicyError::UnknownPolicyType(other)),
        }
    }
}

impl fmt::Display for PolicyType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let value = match self {
            PolicyType::ContinueOnNonFatal => "continue-non-fatal",
            PolicyType::ContinueOnVerifyFailure => "continue-verify-fail",
            PolicyType::HaltOnAnyError => "halt",
        };
        write!(f, "{value}")
    }
}

/// Whether an entry constrains modules by image hash or matches any image.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HashType {
    Any,
    Image,
}

impl HashType {
    pub fn tag(&self) -> u8 {
        match self {
            HashType::Any => 0,
            HashType::Image => 1,
        }
    }
}

impl TryFrom<u8> for HashType {
    type Error = PolicyError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(HashType::Any),
            1 => Ok(HashType::Image),
            other => Err(PolicyError::UnknownHashType(other)),
        }
    }
}

impl fmt::Display for HashType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let value = match self {
            HashType::Any => "any",
            HashType::Image => "image",
        };
        write!(f, "{value}")
    }
}

/// One measurement rule: which module, which PCR, under what hash match.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyEntry {
    /// Module number, 0-based, or [`MODULE_NUM_ANY`].
    pub module_number: u8,
    /// PCR to extend, 0-23, or [`PCR_NONE`].
    pub pcr: u8,
    pub hash_type: HashType,
    pub hashes: Vec<Digest>,
}

impl PolicyEntry {
    /// Serialized length of this entry: the fixed header plus one
    /// fixed-size digest per hash, sized by the policy's algorithm.
    pub fn encoded_len(&self, algorithm: HashAlgorithm) -> usize {
        ENTRY_HEADER_LEN + self.hashes.len() * algorithm.digest_size()
    }
}

/// Serialized length of an optional entry. An absent entry occupies no
/// bytes.
pub fn entry_size(
    entry: Option<&PolicyEntry>,
    algorithm: HashAlgorithm,
) -> usize {
    match entry {
        Some(entry) => entry.encoded_len(algorithm),
        None => 0,
    }
}

/// A complete launch policy: header fields plus ordered measurement rules.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Format version, currently always [`POLICY_VERSION`].
    pub version: u8,
    pub policy_type: PolicyType,
    /// Applies uniformly to every entry's hashes.
    pub hash_algorithm: HashAlgorithm,
    /// Bitwise OR of `POLCTL_*`.
    pub control_flags: u32,
    pub entries: Vec<PolicyEntry>,
}

impl Policy {
    /// Total serialized length, fixed header plus all entry tails.
    ///
    /// The format carries no offset table, so the entries are walked in
    /// order, each one advancing the running total by its own computed
    /// size.
    pub fn encoded_len(&self) -> usize {
        let mut size = POLICY_HEADER_LEN;
        for entry in &self.entries {
            size += entry.encoded_len(self.hash_algorithm);
        }
        size
    }

    /// Serializes the policy into its packed little-endian layout.
    pub fn to_bytes(&self) -> Result<Vec<u8>, PolicyError> {
        let entry_count = u8::try_from(self.entries.len())
            .map_err(|_| PolicyError::TooManyEntries(self.entries.len()))?;

        let mut buffer = Vec::with_capacity(self.encoded_len());
        buffer.write_u8(self.version)?;
        buffer.write_u8(self.policy_type.tag())?;
        buffer.write_u8(self.hash_algorithm.tag())?;
        buffer.write_u32::<LittleEndian>(self.control_flags)?;
        buffer.write_u32::<LittleEndian>(0)?; // reserved
        buffer.write_u8(entry_count)?;

        for entry in &self.entries {
            let hash_count = u8::try_from(entry.hashes.len()).map_err(
                |_| PolicyError::TooManyHashes(entry.hashes.len()),
            )?;
            buffer.write_u8(entry.module_number)?;
            buffer.write_u8(entry.pcr)?;
            buffer.write_u8(entry.hash_type.tag())?;
            buffer.write_u32::<LittleEndian>(0)?; // reserved
            buffer.write_u8(hash_count)?;
            for digest in &entry.hashes {
                buffer.extend_from_slice(digest.value());
            }
        }

        Ok(buffer)
    }

    /// Parses a packed policy back into its in-memory form.
    ///
    /// Every read is bounds-checked against the buffer length; a declared
    /// count pointing past the end fails with
    /// [`PolicyError::TruncatedRecord`] instead of reading past the end.
    pub fn from_bytes(bytes: &[u8]) -> Result<Policy, PolicyError> {
        let mut cursor = Cursor::new(bytes);

        ensure_remaining(&cursor, POLICY_HEADER_LEN)?;
        let version = cursor.read_u8()?;
        if version != POLICY_VERSION {
            return Err(PolicyError::UnsupportedVersion(version));
        }
        let policy_type = PolicyType::try_from(cursor.read_u8()?)?;
        let hash_algorithm = HashAlgorithm::try_from(cursor.read_u8()?)?;
        let control_flags = cursor.read_u32::<LittleEndian>()?;
        let _reserved = cursor.read_u32::<LittleEndian>()?;
        let entry_count = cursor.read_u8()?;

        let mut entries = Vec::with_capacity(entry_count as usize);
        for _ in 0..entry_count {
            ensure_remaining(&cursor, ENTRY_HEADER_LEN)?;
            let module_number = cursor.read_u8()?;
            let pcr = cursor.read_u8()?;
            let hash_type = HashType::try_from(cursor.read_u8()?)?;
            let _reserved = cursor.read_u32::<LittleEndian>()?;
            let hash_count = cursor.read_u8()?;

            let digest_size = hash_algorithm.digest_size();
            ensure_remaining(
                &cursor,
                hash_count as usize * digest_size,
            )?;
            let mut hashes = Vec::with_capacity(hash_count as usize);
            for _ in 0..hash_count {
                let mut value = vec![0u8; digest_size];
                cursor.read_exact(&mut value)?;
                hashes.push(Digest::new(hash_algorithm, &value)?);
            }

            entries.push(PolicyEntry {
                module_number,
                pcr,
                hash_type,
                hashes,
            });
        }

        Ok(Policy {
            version,
            policy_type,
            hash_algorithm,
            control_flags,
            entries,
        })
    }
}

fn ensure_remaining(
    cursor: &Cursor<&[u8]>,
    needed: usize,
) -> Result<(), PolicyError> {
    let offset = cursor.position() as usize;
    let available = cursor.get_ref().len().saturating_sub(offset);
    if available < needed {
        return Err(PolicyError::TruncatedRecord {
            offset,
            needed,
            available,
        });
    }
    Ok(())
}
