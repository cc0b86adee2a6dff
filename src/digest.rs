// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Digest Engine
//!
//! Hashes caller buffers for an advertised algorithm and computes the
//! register extend function `new = H(old || measurement)` shared by the
//! simulated device and log replay.

use alloc::vec;
use alloc::vec::Vec;
use core::fmt;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Sha256, Sha384};

use crate::error::{TcgError, TcgResult};
use crate::types::algorithm::{AlgorithmBitmap, AlgorithmId};

/// Every algorithm this engine can compute.
pub const ENGINE_ALGORITHMS: AlgorithmBitmap = AlgorithmBitmap::all();

/// A digest tagged with the algorithm that produced it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestValue {
    algorithm: AlgorithmId,
    bytes: Vec<u8>,
}

impl DigestValue {
    /// Wraps precomputed bytes; the length must match the algorithm.
    pub fn new(algorithm: AlgorithmId, bytes: Vec<u8>) -> TcgResult<Self> {
        match algorithm.digest_size() {
            Some(size) if size == bytes.len() => Ok(Self { algorithm, bytes }),
            Some(_) => Err(TcgError::InvalidParameter("digest length does not match algorithm")),
            None => Err(TcgError::UnsupportedAlgorithm(algorithm)),
        }
    }

    /// The all-zero value a register holds after reset.
    pub fn zero(algorithm: AlgorithmId) -> Option<Self> {
        let size = algorithm.digest_size()?;
        Some(Self { algorithm, bytes: vec![0u8; size] })
    }

    pub fn algorithm(&self) -> AlgorithmId {
        self.algorithm
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl AsRef<[u8]> for DigestValue {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::LowerHex for DigestValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.bytes.iter() {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// Hashes buffers for the algorithms one service instance advertises.
#[derive(Clone, Copy, Debug)]
pub struct DigestEngine {
    advertised: AlgorithmBitmap,
}

impl DigestEngine {
    pub fn new(advertised: AlgorithmBitmap) -> Self {
        Self { advertised: advertised & ENGINE_ALGORITHMS }
    }

    pub fn advertised(&self) -> AlgorithmBitmap {
        self.advertised
    }

    /// Validates `algorithm` and returns its digest size.
    ///
    /// Malformed ids (zero or several bits) are `InvalidParameter`;
    /// well-formed ids outside the bitmap are `UnsupportedAlgorithm`.
    pub fn check(&self, algorithm: AlgorithmId) -> TcgResult<usize> {
        if !algorithm.is_well_formed() {
            return Err(TcgError::InvalidParameter("algorithm id must have exactly one bit set"));
        }
        if !self.advertised.advertises(algorithm) {
            return Err(TcgError::UnsupportedAlgorithm(algorithm));
        }
        algorithm.digest_size().ok_or(TcgError::UnsupportedAlgorithm(algorithm))
    }

    pub fn digest(&self, data: &[u8], algorithm: AlgorithmId) -> TcgResult<DigestValue> {
        self.check(algorithm)?;
        let bytes = hash_parts(algorithm, &[data]).ok_or(TcgError::UnsupportedAlgorithm(algorithm))?;
        Ok(DigestValue { algorithm, bytes })
    }
}

/// `H(current || measurement)`: the one-way register extend.
///
/// Returns `None` for an algorithm the engine cannot compute.
pub fn extend_value(algorithm: AlgorithmId, current: &[u8], measurement: &[u8]) -> Option<Vec<u8>> {
    hash_parts(algorithm, &[current, measurement])
}

fn hash_parts(algorithm: AlgorithmId, parts: &[&[u8]]) -> Option<Vec<u8>> {
    match algorithm {
        AlgorithmId::SHA1 => Some(run::<Sha1>(parts)),
        AlgorithmId::SHA256 => Some(run::<Sha256>(parts)),
        AlgorithmId::SHA384 => Some(run::<Sha384>(parts)),
        _ => None,
    }
}

fn run<H: sha2::Digest>(parts: &[&[u8]]) -> Vec<u8> {
    let mut hasher = H::new();
    for part in parts {
        hasher.update(*part);
    }
    hasher.finalize().to_vec()
}
