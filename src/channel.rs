// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Trust-Root Channel
//!
//! The only path from this service to the hardware trust root. Commands are
//! opaque byte blobs; the channel never interprets them.
//!
//! # Invariants
//! - At most one command in flight: the transport sits behind a ticket lock,
//!   so callers are admitted in arrival order.
//! - No retries and no timeouts here; the transport reports its own timeout
//!   as a device error.

use alloc::vec::Vec;
use serde::{Deserialize, Serialize};
use spin::mutex::TicketMutex;

use crate::error::{TcgError, TcgResult, TransportError};

/// Liveness of the trust-root device.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceState {
    pub present: bool,
    pub deactivated: bool,
}

/// Byte-blob-in / byte-blob-out driver for the physical device.
pub trait TpmTransport: Send {
    /// Reports presence and activation without side effects.
    fn device_state(&mut self) -> Result<DeviceState, TransportError>;

    /// Executes one command and returns the complete response frame.
    fn submit(&mut self, command: &[u8]) -> Result<Vec<u8>, TransportError>;
}

pub struct TrustRootChannel<T> {
    transport: TicketMutex<T>,
}

impl<T: TpmTransport> TrustRootChannel<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport: TicketMutex::new(transport),
        }
    }

    /// Absence is reported in the state, not as an error.
    pub fn query_state(&self) -> TcgResult<DeviceState> {
        let mut transport = self.transport.lock();
        match transport.device_state() {
            Ok(state) => Ok(state),
            Err(TransportError::NotPresent) => Ok(DeviceState::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Sends `command` and returns the response if it fits in `capacity`.
    ///
    /// An oversized response yields `BufferTooSmall` with the exact size and
    /// no output. The command has still run on the device.
    pub fn send(&self, command: &[u8], capacity: usize) -> TcgResult<Vec<u8>> {
        if command.is_empty() {
            return Err(TcgError::InvalidParameter("empty command block"));
        }

        let response = {
            let mut transport = self.transport.lock();
            transport.submit(command)
        };

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Trust root transport failure: {}", e);
                return Err(e.into());
            }
        };

        tracing::trace!(
            command_len = command.len(),
            response_len = response.len(),
            "Trust root command completed"
        );

        if response.len() > capacity {
            return Err(TcgError::BufferTooSmall {
                required: response.len(),
            });
        }
        Ok(response)
    }
}
