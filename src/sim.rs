// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Simulated trust root.
//!
//! An in-memory device that speaks the same frames as the hardware. Handles
//! are cheap clones over shared state, so a test can keep one handle for
//! inspection while the service owns another.
//!
//! Registers start at all zeros. Extends with a 20-byte digest land in the
//! SHA-1 bank; wider digests land in the bank of matching width.

use alloc::collections::BTreeMap;
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;
use byteorder::{BigEndian, ByteOrder};
use spin::Mutex;

use crate::channel::{DeviceState, TpmTransport};
use crate::command::{self, rc, FrameHeader};
use crate::config::PCR_COUNT;
use crate::digest::extend_value;
use crate::error::TransportError;
use crate::types::algorithm::AlgorithmId;
use crate::types::id::PcrIndex;

struct SimState {
    present: bool,
    deactivated: bool,
    pcr_count: u32,
    /// Keyed by (register, digest width).
    banks: BTreeMap<(u32, usize), Vec<u8>>,
    pending_fault: Option<TransportError>,
    commands: u64,
}

#[derive(Clone)]
pub struct SimulatedTpm {
    state: Arc<Mutex<SimState>>,
}

impl Default for SimulatedTpm {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedTpm {
    /// A present, active device with the standard register count.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState {
                present: true,
                deactivated: false,
                pcr_count: PCR_COUNT,
                banks: BTreeMap::new(),
                pending_fault: None,
                commands: 0,
            })),
        }
    }

    /// A platform with no trust root attached.
    pub fn absent() -> Self {
        let sim = Self::new();
        sim.set_present(false);
        sim
    }

    pub fn set_present(&self, present: bool) {
        self.state.lock().present = present;
    }

    pub fn set_deactivated(&self, deactivated: bool) {
        self.state.lock().deactivated = deactivated;
    }

    /// Fails the next submitted command with `fault`.
    pub fn fail_next(&self, fault: TransportError) {
        self.state.lock().pending_fault = Some(fault);
    }

    /// Current value of a register bank; zeros if never extended.
    pub fn pcr(&self, pcr_index: PcrIndex, algorithm: AlgorithmId) -> Option<Vec<u8>> {
        let size = algorithm.digest_size()?;
        let state = self.state.lock();
        if pcr_index.0 >= state.pcr_count {
            return None;
        }
        Some(
            state
                .banks
                .get(&(pcr_index.0, size))
                .cloned()
                .unwrap_or_else(|| vec![0u8; size]),
        )
    }

    /// Commands the device has accepted for execution.
    pub fn commands_seen(&self) -> u64 {
        self.state.lock().commands
    }
}

impl SimState {
    fn execute(&mut self, frame: &[u8]) -> Vec<u8> {
        let (header, params) = match FrameHeader::read(frame) {
            Some(parsed) => parsed,
            None => return command::response(rc::TPM_BAD_PARAM_SIZE, &[]),
        };
        if header.param_size as usize != frame.len() {
            return command::response(rc::TPM_BAD_PARAM_SIZE, &[]);
        }
        if header.tag != command::TPM_TAG_RQU_COMMAND {
            return command::response(rc::TPM_BAD_PARAMETER, &[]);
        }

        match header.code {
            command::TPM_ORD_EXTEND => self.extend(params),
            command::TPM_ORD_PCR_READ => self.pcr_read(params),
            _ => command::response(rc::TPM_BAD_ORDINAL, &[]),
        }
    }

    fn extend(&mut self, params: &[u8]) -> Vec<u8> {
        if self.deactivated {
            return command::response(rc::TPM_DEACTIVATED, &[]);
        }
        if params.len() < 4 {
            return command::response(rc::TPM_BAD_PARAM_SIZE, &[]);
        }
        let index = BigEndian::read_u32(&params[0..4]);
        if index >= self.pcr_count {
            return command::response(rc::TPM_BADINDEX, &[]);
        }
        let digest = &params[4..];
        let algorithm = match AlgorithmId::from_digest_size(digest.len()) {
            Some(algorithm) => algorithm,
            None => return command::response(rc::TPM_BAD_PARAM_SIZE, &[]),
        };

        let value = self
            .banks
            .entry((index, digest.len()))
            .or_insert_with(|| vec![0u8; digest.len()]);
        match extend_value(algorithm, value.as_slice(), digest) {
            Some(next) => {
                *value = next;
                command::response(rc::TPM_SUCCESS, &value[..])
            }
            None => command::response(rc::TPM_BAD_PARAM_SIZE, &[]),
        }
    }

    fn pcr_read(&self, params: &[u8]) -> Vec<u8> {
        if params.len() != 4 {
            return command::response(rc::TPM_BAD_PARAM_SIZE, &[]);
        }
        let index = BigEndian::read_u32(params);
        if index >= self.pcr_count {
            return command::response(rc::TPM_BADINDEX, &[]);
        }
        let zero = [0u8; 20];
        let value = self.banks.get(&(index, 20)).map(|v| v.as_slice()).unwrap_or(&zero);
        command::response(rc::TPM_SUCCESS, value)
    }
}

impl TpmTransport for SimulatedTpm {
    fn device_state(&mut self) -> Result<DeviceState, TransportError> {
        let state = self.state.lock();
        if !state.present {
            return Err(TransportError::NotPresent);
        }
        Ok(DeviceState {
            present: true,
            deactivated: state.deactivated,
        })
    }

    fn submit(&mut self, frame: &[u8]) -> Result<Vec<u8>, TransportError> {
        let mut state = self.state.lock();
        if let Some(fault) = state.pending_fault.take() {
            return Err(fault);
        }
        if !state.present {
            return Err(TransportError::NotPresent);
        }
        state.commands += 1;
        Ok(state.execute(frame))
    }
}
