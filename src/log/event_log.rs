// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Append-Only Event Log
//!
//! A single-writer arena over the reserved log region. Entries are packed
//! back to back from the region base; positions are byte offsets, turned
//! into physical addresses only at the boundary.
//!
//! # Invariants
//! - Entries occupy increasing, non-overlapping offsets with no gaps
//! - `tail`, `last` and `count` move only after the full entry, payload
//!   included, is in the region
//! - The entry at offset `o` has event number = appends before it
//! - Entries are never edited, reordered, coalesced or removed

use alloc::boxed::Box;
use alloc::vec;
use serde::{Deserialize, Serialize};

use crate::error::{TcgError, TcgResult};
use crate::log::record::MeasurementRecord;
use crate::types::id::{EventNumber, PhysicalAddress};

/// Fixed-size memory reserved for the log by the boot memory manager.
pub struct LogRegion {
    base: PhysicalAddress,
    bytes: Box<[u8]>,
}

impl LogRegion {
    pub fn new(base: PhysicalAddress, capacity: usize) -> TcgResult<Self> {
        if capacity == 0 {
            return Err(TcgError::InvalidParameter("log capacity is zero"));
        }
        if base.checked_offset(capacity).is_none() {
            return Err(TcgError::InvalidParameter("log region overflows the address space"));
        }
        Ok(Self {
            base,
            bytes: vec![0u8; capacity].into_boxed_slice(),
        })
    }

    pub fn base(&self) -> PhysicalAddress {
        self.base
    }

    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    fn address_of(&self, offset: usize) -> PhysicalAddress {
        // In range by construction: offset <= capacity and base + capacity fits.
        PhysicalAddress(self.base.0 + offset as u64)
    }
}

/// Where an appended entry landed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogPosition {
    pub event_number: EventNumber,
    pub offset: usize,
    pub address: PhysicalAddress,
}

pub struct EventLog {
    region: LogRegion,
    tail: usize,
    last: Option<usize>,
    count: u32,
}

impl EventLog {
    pub fn new(region: LogRegion) -> Self {
        Self {
            region,
            tail: 0,
            last: None,
            count: 0,
        }
    }

    /// Rebuilds a log from the committed bytes of another log.
    ///
    /// Every byte of `image` must belong to a complete entry.
    pub fn from_image(base: PhysicalAddress, capacity: usize, image: &[u8]) -> TcgResult<Self> {
        if image.len() > capacity {
            return Err(TcgError::InvalidParameter("image larger than log capacity"));
        }
        let mut log = Self::new(LogRegion::new(base, capacity)?);
        let mut offset = 0;
        while offset < image.len() {
            let (record, used) = MeasurementRecord::decode(&image[offset..])?;
            log.append(&record)?;
            offset += used;
        }
        Ok(log)
    }

    /// Writes `record` at the tail and returns its position.
    ///
    /// Fails with `LogFull` (nothing written, tail unchanged) when the region
    /// cannot hold the whole entry.
    pub fn append(&mut self, record: &MeasurementRecord) -> TcgResult<LogPosition> {
        let len = record.validate()?;
        let remaining = self.remaining();
        if len > remaining || self.count == u32::MAX {
            return Err(TcgError::LogFull {
                required: len,
                remaining,
                extended: false,
            });
        }

        let start = self.tail;
        record.encode_into(&mut self.region.bytes[start..start + len]);

        // Commit point.
        self.tail = start + len;
        self.last = Some(start);
        let event_number = EventNumber(self.count);
        self.count += 1;

        let position = LogPosition {
            event_number,
            offset: start,
            address: self.region.address_of(start),
        };
        tracing::trace!(
            event_number = event_number.0,
            pcr = record.pcr_index.0,
            offset = start,
            len,
            "Event log entry committed"
        );
        Ok(position)
    }

    /// Base address and number of committed entries.
    pub fn location(&self) -> (PhysicalAddress, u32) {
        (self.region.base(), self.count)
    }

    /// Address of the most recently committed entry, if any.
    pub fn last_entry(&self) -> Option<PhysicalAddress> {
        self.last.map(|offset| self.region.address_of(offset))
    }

    pub fn len(&self) -> u32 {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn capacity(&self) -> usize {
        self.region.capacity()
    }

    pub fn remaining(&self) -> usize {
        self.region.capacity() - self.tail
    }

    /// The committed prefix of the region.
    pub fn as_bytes(&self) -> &[u8] {
        &self.region.bytes[..self.tail]
    }

    pub fn entries(&self) -> Entries<'_> {
        Entries {
            log: self,
            offset: 0,
            number: 0,
        }
    }

    pub fn get(&self, event_number: EventNumber) -> Option<MeasurementRecord> {
        self.entries()
            .nth(event_number.0 as usize)
            .map(|(_, record)| record)
    }
}

/// Iterator over committed entries in log order.
pub struct Entries<'a> {
    log: &'a EventLog,
    offset: usize,
    number: u32,
}

impl<'a> Iterator for Entries<'a> {
    type Item = (LogPosition, MeasurementRecord);

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.log.tail {
            return None;
        }
        // Committed bytes were produced by `append`, so they always decode.
        let (record, used) = MeasurementRecord::decode(&self.log.as_bytes()[self.offset..]).ok()?;
        let position = LogPosition {
            event_number: EventNumber(self.number),
            offset: self.offset,
            address: self.log.region.address_of(self.offset),
        };
        self.offset += used;
        self.number += 1;
        Some((position, record))
    }
}
