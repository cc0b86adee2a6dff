// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Measurement record definition and its in-log encoding.
//!
//! # Entry Layout (little-endian, packed)
//! ```text
//! pcr_index: u32
//! event_type: u32
//! algorithm: u32
//! digest[size(algorithm)]
//! event_data_size: u32
//! event_data[event_data_size]
//! ```

use alloc::vec;
use alloc::vec::Vec;
use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

use crate::digest::DigestValue;
use crate::error::{TcgError, TcgResult};
use crate::types::algorithm::AlgorithmId;
use crate::types::id::{EventType, PcrIndex};

/// One measurement as it is appended to the event log.
///
/// Records are immutable once appended; the log addresses them only by
/// position.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasurementRecord {
    pub pcr_index: PcrIndex,
    pub event_type: EventType,
    pub algorithm: AlgorithmId,
    pub digest: Vec<u8>,
    /// Opaque caller payload, not interpreted here.
    pub event_data: Vec<u8>,
}

impl MeasurementRecord {
    /// pcr_index + event_type + algorithm
    pub const HEADER_SIZE: usize = 12;
    /// event_data_size
    pub const TRAILER_SIZE: usize = 4;

    pub fn new(pcr_index: PcrIndex, event_type: EventType, digest: DigestValue, event_data: Vec<u8>) -> Self {
        Self {
            pcr_index,
            event_type,
            algorithm: digest.algorithm(),
            digest: digest.into_bytes(),
            event_data,
        }
    }

    /// A record to be filled by a hash-log-extend call.
    ///
    /// The digest slot is sized for SHA-1, like a TCG 1.2 `TCG_PCR_EVENT`.
    pub fn template(pcr_index: PcrIndex, event_type: EventType, event_data: Vec<u8>) -> Self {
        Self {
            pcr_index,
            event_type,
            algorithm: AlgorithmId::SHA1,
            digest: vec![0u8; 20],
            event_data,
        }
    }

    /// Resizes the digest slot of a template.
    pub fn with_digest_slot(mut self, size: usize) -> Self {
        self.digest = vec![0u8; size];
        self
    }

    /// Informational records are never extended and never replayed.
    pub fn is_informational(&self) -> bool {
        self.event_type == EventType::EV_NO_ACTION
    }

    pub fn digest_value(&self) -> TcgResult<DigestValue> {
        DigestValue::new(self.algorithm, self.digest.clone())
    }

    pub fn encoded_len(&self) -> usize {
        Self::HEADER_SIZE + self.digest.len() + Self::TRAILER_SIZE + self.event_data.len()
    }

    /// Checks the record is encodable and returns its encoded length.
    pub fn validate(&self) -> TcgResult<usize> {
        match self.algorithm.digest_size() {
            Some(size) if size == self.digest.len() => {}
            Some(_) => return Err(TcgError::InvalidParameter("digest length does not match algorithm")),
            None => return Err(TcgError::InvalidParameter("record algorithm has no defined digest size")),
        }
        if u32::try_from(self.event_data.len()).is_err() {
            return Err(TcgError::InvalidParameter("event data larger than 4 GiB"));
        }
        Ok(self.encoded_len())
    }

    /// Writes the entry into `out`, which must be exactly `encoded_len()` bytes.
    pub(crate) fn encode_into(&self, out: &mut [u8]) {
        let digest_end = Self::HEADER_SIZE + self.digest.len();
        let data_start = digest_end + Self::TRAILER_SIZE;

        LittleEndian::write_u32(&mut out[0..4], self.pcr_index.0);
        LittleEndian::write_u32(&mut out[4..8], self.event_type.0);
        LittleEndian::write_u32(&mut out[8..12], self.algorithm.0);
        out[Self::HEADER_SIZE..digest_end].copy_from_slice(&self.digest);
        LittleEndian::write_u32(&mut out[digest_end..data_start], self.event_data.len() as u32);
        out[data_start..].copy_from_slice(&self.event_data);
    }

    pub fn encode(&self) -> TcgResult<Vec<u8>> {
        let len = self.validate()?;
        let mut out = vec![0u8; len];
        self.encode_into(&mut out);
        Ok(out)
    }

    /// Decodes one entry from the front of `bytes`.
    ///
    /// Returns the record and the number of bytes consumed.
    pub fn decode(bytes: &[u8]) -> TcgResult<(Self, usize)> {
        if bytes.len() < Self::HEADER_SIZE {
            return Err(TcgError::InvalidParameter("truncated entry header"));
        }
        let pcr_index = PcrIndex(LittleEndian::read_u32(&bytes[0..4]));
        let event_type = EventType(LittleEndian::read_u32(&bytes[4..8]));
        let algorithm = AlgorithmId(LittleEndian::read_u32(&bytes[8..12]));

        let digest_len = algorithm
            .digest_size()
            .ok_or(TcgError::InvalidParameter("entry names an unknown algorithm"))?;
        let digest_end = Self::HEADER_SIZE + digest_len;
        let data_start = digest_end + Self::TRAILER_SIZE;
        if bytes.len() < data_start {
            return Err(TcgError::InvalidParameter("truncated entry digest"));
        }

        let data_len = LittleEndian::read_u32(&bytes[digest_end..data_start]) as usize;
        let end = data_start
            .checked_add(data_len)
            .ok_or(TcgError::InvalidParameter("entry size overflows"))?;
        if bytes.len() < end {
            return Err(TcgError::InvalidParameter("truncated entry data"));
        }

        let record = Self {
            pcr_index,
            event_type,
            algorithm,
            digest: bytes[Self::HEADER_SIZE..digest_end].to_vec(),
            event_data: bytes[data_start..end].to_vec(),
        };
        Ok((record, end))
    }
}
