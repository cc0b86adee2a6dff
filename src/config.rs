// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Configuration constants and the service profile.

use crate::digest::ENGINE_ALGORITHMS;
use crate::error::{TcgError, TcgResult};
use crate::types::algorithm::AlgorithmBitmap;
use crate::types::id::PhysicalAddress;

/// Number of platform configuration registers on a TPM 1.2 device.
pub const PCR_COUNT: u32 = 24;

/// Largest digest any supported algorithm produces (SHA-384).
pub const MAX_DIGEST_SIZE: usize = 48;

/// Minimum log area a TCG 1.2 platform reserves (64 KiB).
pub const DEFAULT_LOG_CAPACITY: usize = 0x1_0000;

/// Address the boot memory manager hands out when nothing else is configured.
pub const DEFAULT_LOG_BASE: PhysicalAddress = PhysicalAddress(0x7F00_0000);

/// Version of the capability structure layout: 1.2.0.0.
pub const STRUCTURE_VERSION: [u8; 4] = [1, 2, 0, 0];

/// Version of the EFI protocol specification implemented: 1.2.0.0.
pub const PROTOCOL_SPEC_VERSION: [u8; 4] = [1, 2, 0, 0];

/// Runtime profile of one service instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Registers `0..pcr_count` are valid extend targets.
    pub pcr_count: u32,
    /// Algorithms advertised in the capability bitmap.
    pub algorithms: AlgorithmBitmap,
    pub log_base: PhysicalAddress,
    pub log_capacity: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            pcr_count: PCR_COUNT,
            algorithms: AlgorithmBitmap::SHA1,
            log_base: DEFAULT_LOG_BASE,
            log_capacity: DEFAULT_LOG_CAPACITY,
        }
    }
}

impl ServiceConfig {
    pub fn with_pcr_count(mut self, pcr_count: u32) -> Self {
        self.pcr_count = pcr_count;
        self
    }

    pub fn with_algorithms(mut self, algorithms: AlgorithmBitmap) -> Self {
        self.algorithms = algorithms;
        self
    }

    pub fn with_log_region(mut self, base: PhysicalAddress, capacity: usize) -> Self {
        self.log_base = base;
        self.log_capacity = capacity;
        self
    }

    pub fn validate(&self) -> TcgResult<()> {
        if self.pcr_count == 0 || self.pcr_count > PCR_COUNT {
            return Err(TcgError::InvalidParameter("pcr_count outside 1..=24"));
        }
        if self.algorithms.is_empty() {
            return Err(TcgError::InvalidParameter("no hash algorithm advertised"));
        }
        if !ENGINE_ALGORITHMS.contains(self.algorithms) {
            return Err(TcgError::InvalidParameter("advertised algorithm has no digest implementation"));
        }
        if self.log_capacity == 0 {
            return Err(TcgError::InvalidParameter("log capacity is zero"));
        }
        if self.log_base.checked_offset(self.log_capacity).is_none() {
            return Err(TcgError::InvalidParameter("log region overflows the address space"));
        }
        Ok(())
    }
}
