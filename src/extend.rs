// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! PCR Extend Coordinator.
//!
//! Turns an extend request into a device command and sends it through the
//! channel exactly once. A completed extend is never undone.

use alloc::vec::Vec;

use crate::channel::{TpmTransport, TrustRootChannel};
use crate::command;
use crate::digest::DigestValue;
use crate::error::{DeviceFault, TcgError, TcgResult};
use crate::types::id::PcrIndex;

/// One register extend, alive for a single compound call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtendRequest {
    pub pcr_index: PcrIndex,
    pub digest: DigestValue,
}

impl ExtendRequest {
    pub fn new(pcr_index: PcrIndex, digest: DigestValue) -> Self {
        Self { pcr_index, digest }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct PcrExtender {
    pcr_count: u32,
}

impl PcrExtender {
    pub fn new(pcr_count: u32) -> Self {
        Self { pcr_count }
    }

    pub fn pcr_count(&self) -> u32 {
        self.pcr_count
    }

    pub fn check_index(&self, pcr_index: PcrIndex) -> TcgResult<()> {
        if pcr_index.0 >= self.pcr_count {
            return Err(TcgError::InvalidRegisterIndex(pcr_index));
        }
        Ok(())
    }

    /// Extends the register and returns the value the device reports.
    ///
    /// Not idempotent: every call moves the register further.
    pub fn extend<T: TpmTransport>(
        &self,
        channel: &TrustRootChannel<T>,
        request: &ExtendRequest,
    ) -> TcgResult<Vec<u8>> {
        self.check_index(request.pcr_index)?;

        let digest = request.digest.as_bytes();
        let frame = command::extend_command(request.pcr_index, digest);
        let expected = command::extend_response_size(digest.len());

        let response = channel.send(&frame, expected).map_err(|e| match e {
            // The device answered with more than an extend response can hold.
            TcgError::BufferTooSmall { .. } => TcgError::DeviceError(DeviceFault::MalformedResponse),
            other => other,
        })?;

        let value = command::parse_response(&response, digest.len()).map_err(|fault| {
            tracing::warn!(pcr = request.pcr_index.0, "Extend rejected by trust root: {}", fault);
            TcgError::DeviceError(fault)
        })?;

        tracing::trace!(
            pcr = request.pcr_index.0,
            algorithm = request.digest.algorithm().name(),
            "Register extended"
        );
        Ok(value.to_vec())
    }
}
