// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Trust-root command framing (TPM 1.2, big-endian).
//!
//! # Frame Format
//! ```text
//! request:  [tag: u16 = 0x00C1][paramSize: u32][ordinal: u32][parameters...]
//! response: [tag: u16 = 0x00C4][paramSize: u32][returnCode: u32][payload...]
//! ```
//!
//! `paramSize` counts the whole frame. `TPM_Extend` frames carry the digest
//! after the register index; its width selects the register bank, so SHA-1
//! frames are bit-exact TPM 1.2 frames.

use alloc::vec;
use alloc::vec::Vec;
use byteorder::{BigEndian, ByteOrder};

use crate::error::DeviceFault;
use crate::types::id::PcrIndex;

pub const TPM_TAG_RQU_COMMAND: u16 = 0x00C1;
pub const TPM_TAG_RSP_COMMAND: u16 = 0x00C4;

pub const TPM_ORD_EXTEND: u32 = 0x0000_0014;
pub const TPM_ORD_PCR_READ: u32 = 0x0000_0015;

/// tag + paramSize + ordinal/returnCode
pub const HEADER_SIZE: usize = 10;

/// Return codes the service and the simulated device use.
pub mod rc {
    pub const TPM_SUCCESS: u32 = 0;
    pub const TPM_BADINDEX: u32 = 2;
    pub const TPM_BAD_PARAMETER: u32 = 3;
    pub const TPM_DEACTIVATED: u32 = 6;
    pub const TPM_BAD_ORDINAL: u32 = 10;
    pub const TPM_BAD_PARAM_SIZE: u32 = 25;
}

/// Decoded frame header; `code` is the ordinal or the return code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameHeader {
    pub tag: u16,
    pub param_size: u32,
    pub code: u32,
}

impl FrameHeader {
    pub fn read(frame: &[u8]) -> Option<(Self, &[u8])> {
        if frame.len() < HEADER_SIZE {
            return None;
        }
        let header = Self {
            tag: BigEndian::read_u16(&frame[0..2]),
            param_size: BigEndian::read_u32(&frame[2..6]),
            code: BigEndian::read_u32(&frame[6..10]),
        };
        Some((header, &frame[HEADER_SIZE..]))
    }

    fn write(&self, out: &mut [u8]) {
        BigEndian::write_u16(&mut out[0..2], self.tag);
        BigEndian::write_u32(&mut out[2..6], self.param_size);
        BigEndian::write_u32(&mut out[6..10], self.code);
    }
}

fn frame(tag: u16, code: u32, payload: &[u8]) -> Vec<u8> {
    let total = HEADER_SIZE + payload.len();
    let mut out = vec![0u8; total];
    FrameHeader {
        tag,
        param_size: total as u32,
        code,
    }
    .write(&mut out);
    out[HEADER_SIZE..].copy_from_slice(payload);
    out
}

/// `TPM_Extend(pcrNum, inDigest)`.
pub fn extend_command(pcr: PcrIndex, digest: &[u8]) -> Vec<u8> {
    let mut params = vec![0u8; 4 + digest.len()];
    BigEndian::write_u32(&mut params[0..4], pcr.0);
    params[4..].copy_from_slice(digest);
    frame(TPM_TAG_RQU_COMMAND, TPM_ORD_EXTEND, &params)
}

/// Size of a successful `TPM_Extend` response for a digest of `digest_len`.
pub const fn extend_response_size(digest_len: usize) -> usize {
    HEADER_SIZE + digest_len
}

/// `TPM_PcrRead(pcrIndex)`, answered from the SHA-1 bank.
pub fn pcr_read_command(pcr: PcrIndex) -> Vec<u8> {
    let mut params = [0u8; 4];
    BigEndian::write_u32(&mut params, pcr.0);
    frame(TPM_TAG_RQU_COMMAND, TPM_ORD_PCR_READ, &params)
}

/// Builds a response frame.
pub fn response(return_code: u32, payload: &[u8]) -> Vec<u8> {
    frame(TPM_TAG_RSP_COMMAND, return_code, payload)
}

/// Validates a response frame and returns its payload.
///
/// The payload must be exactly `payload_len` bytes.
pub fn parse_response(frame: &[u8], payload_len: usize) -> Result<&[u8], DeviceFault> {
    let (header, payload) = FrameHeader::read(frame).ok_or(DeviceFault::MalformedResponse)?;
    if header.tag != TPM_TAG_RSP_COMMAND || header.param_size as usize != frame.len() {
        return Err(DeviceFault::MalformedResponse);
    }
    if header.code != rc::TPM_SUCCESS {
        return Err(DeviceFault::ReturnCode(header.code));
    }
    if payload.len() != payload_len {
        return Err(DeviceFault::MalformedResponse);
    }
    Ok(payload)
}
