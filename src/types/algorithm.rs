// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Hash algorithm identifiers and the capability bitmap.
//!
//! An [`AlgorithmId`] is a single bit; the same bit position marks the
//! algorithm in an [`AlgorithmBitmap`].

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct AlgorithmId(pub u32);

impl AlgorithmId {
    pub const SHA1: AlgorithmId = AlgorithmId(1 << 0);
    pub const SHA256: AlgorithmId = AlgorithmId(1 << 1);
    pub const SHA384: AlgorithmId = AlgorithmId(1 << 2);

    /// Exactly one bit set.
    pub fn is_well_formed(&self) -> bool {
        self.0.count_ones() == 1
    }

    pub fn digest_size(&self) -> Option<usize> {
        match *self {
            Self::SHA1 => Some(20),
            Self::SHA256 => Some(32),
            Self::SHA384 => Some(48),
            _ => None,
        }
    }

    /// Algorithm whose digests are `size` bytes wide.
    pub fn from_digest_size(size: usize) -> Option<Self> {
        match size {
            20 => Some(Self::SHA1),
            32 => Some(Self::SHA256),
            48 => Some(Self::SHA384),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match *self {
            Self::SHA1 => "sha1",
            Self::SHA256 => "sha256",
            Self::SHA384 => "sha384",
            _ => "unknown",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "sha1" => Some(Self::SHA1),
            "sha256" => Some(Self::SHA256),
            "sha384" => Some(Self::SHA384),
            _ => None,
        }
    }
}

bitflags! {
    /// Hash algorithms a service instance advertises.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct AlgorithmBitmap: u8 {
        const SHA1 = 1 << 0;
        const SHA256 = 1 << 1;
        const SHA384 = 1 << 2;
    }
}

impl AlgorithmBitmap {
    pub fn advertises(&self, algorithm: AlgorithmId) -> bool {
        if !algorithm.is_well_formed() {
            return false;
        }
        match u8::try_from(algorithm.0) {
            Ok(bit) => self.contains(AlgorithmBitmap::from_bits_retain(bit)),
            Err(_) => false,
        }
    }

    pub fn algorithms(&self) -> impl Iterator<Item = AlgorithmId> + '_ {
        self.iter().map(|flag| AlgorithmId(u32::from(flag.bits())))
    }
}

impl From<AlgorithmId> for AlgorithmBitmap {
    fn from(algorithm: AlgorithmId) -> Self {
        u8::try_from(algorithm.0)
            .map(AlgorithmBitmap::from_bits_truncate)
            .unwrap_or_else(|_| AlgorithmBitmap::empty())
    }
}
