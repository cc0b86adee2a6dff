// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Capability Reporter.
//!
//! # Structure Layout (packed, 12 bytes)
//! ```text
//! size: u8
//! structure_version: [major, minor, rev_major, rev_minor]
//! protocol_spec_version: [major, minor, rev_major, rev_minor]
//! hash_algorithm_bitmap: u8
//! tpm_present: u8
//! tpm_deactivated: u8
//! ```
//! `size` always equals the encoded size, so callers can probe for fields
//! added by later revisions.

use serde::{Deserialize, Serialize};

use crate::channel::{TpmTransport, TrustRootChannel};
use crate::config::{PROTOCOL_SPEC_VERSION, STRUCTURE_VERSION};
use crate::error::{TcgError, TcgResult};
use crate::types::algorithm::AlgorithmBitmap;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TcgVersion {
    pub major: u8,
    pub minor: u8,
    pub rev_major: u8,
    pub rev_minor: u8,
}

impl TcgVersion {
    pub const fn from_bytes(bytes: [u8; 4]) -> Self {
        Self {
            major: bytes[0],
            minor: bytes[1],
            rev_major: bytes[2],
            rev_minor: bytes[3],
        }
    }

    pub const fn to_bytes(self) -> [u8; 4] {
        [self.major, self.minor, self.rev_major, self.rev_minor]
    }
}

/// Snapshot of protocol capability and device state. Built fresh per query.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootServiceCapability {
    pub size: u8,
    pub structure_version: TcgVersion,
    pub protocol_spec_version: TcgVersion,
    pub hash_algorithm_bitmap: AlgorithmBitmap,
    pub tpm_present: bool,
    pub tpm_deactivated: bool,
}

impl BootServiceCapability {
    pub const ENCODED_SIZE: usize = 12;

    pub fn encode(&self) -> [u8; Self::ENCODED_SIZE] {
        let mut out = [0u8; Self::ENCODED_SIZE];
        out[0] = self.size;
        out[1..5].copy_from_slice(&self.structure_version.to_bytes());
        out[5..9].copy_from_slice(&self.protocol_spec_version.to_bytes());
        out[9] = self.hash_algorithm_bitmap.bits();
        out[10] = u8::from(self.tpm_present);
        out[11] = u8::from(self.tpm_deactivated);
        out
    }

    pub fn decode(bytes: &[u8]) -> TcgResult<Self> {
        if bytes.len() < Self::ENCODED_SIZE {
            return Err(TcgError::BufferTooSmall {
                required: Self::ENCODED_SIZE,
            });
        }
        if bytes[0] as usize != Self::ENCODED_SIZE {
            return Err(TcgError::InvalidParameter("capability size field mismatch"));
        }
        let version = |at: usize| TcgVersion::from_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);
        Ok(Self {
            size: bytes[0],
            structure_version: version(1),
            protocol_spec_version: version(5),
            hash_algorithm_bitmap: AlgorithmBitmap::from_bits_retain(bytes[9]),
            tpm_present: bytes[10] != 0,
            tpm_deactivated: bytes[11] != 0,
        })
    }
}

pub struct CapabilityReporter {
    algorithms: AlgorithmBitmap,
}

impl CapabilityReporter {
    pub fn new(algorithms: AlgorithmBitmap) -> Self {
        Self { algorithms }
    }

    /// Assembles the snapshot for a destination declared as `destination_size`
    /// bytes.
    ///
    /// Any size below the encoded size, zero included, gets `BufferTooSmall`
    /// with the exact size. Device absence is a field, never an error.
    pub fn report<T: TpmTransport>(
        &self,
        channel: &TrustRootChannel<T>,
        destination_size: u8,
    ) -> TcgResult<BootServiceCapability> {
        if (destination_size as usize) < BootServiceCapability::ENCODED_SIZE {
            return Err(TcgError::BufferTooSmall {
                required: BootServiceCapability::ENCODED_SIZE,
            });
        }

        let state = channel.query_state()?;
        Ok(BootServiceCapability {
            size: BootServiceCapability::ENCODED_SIZE as u8,
            structure_version: TcgVersion::from_bytes(STRUCTURE_VERSION),
            protocol_spec_version: TcgVersion::from_bytes(PROTOCOL_SPEC_VERSION),
            hash_algorithm_bitmap: self.algorithms,
            tpm_present: state.present,
            tpm_deactivated: state.present && state.deactivated,
        })
    }
}
