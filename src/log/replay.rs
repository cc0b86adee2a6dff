// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Deterministic Replay Logic.
//!
//! Folds log digests into per-register accumulators, starting from all
//! zeros, in log order. The result must equal the hardware registers.

use alloc::collections::BTreeMap;
use alloc::vec;
use alloc::vec::Vec;
use core::borrow::Borrow;

use crate::digest::extend_value;
use crate::error::{TcgError, TcgResult};
use crate::log::event_log::EventLog;
use crate::log::record::MeasurementRecord;
use crate::types::algorithm::AlgorithmId;
use crate::types::id::PcrIndex;

/// Register values reconstructed from a log, keyed by (register, bank).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PcrBanks {
    values: BTreeMap<(PcrIndex, AlgorithmId), Vec<u8>>,
}

/// A register whose replayed value differs from the device.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplayMismatch {
    pub pcr_index: PcrIndex,
    pub algorithm: AlgorithmId,
    pub expected: Vec<u8>,
    pub actual: Option<Vec<u8>>,
}

impl PcrBanks {
    pub fn get(&self, pcr_index: PcrIndex, algorithm: AlgorithmId) -> Option<&[u8]> {
        self.values.get(&(pcr_index, algorithm)).map(|v| v.as_slice())
    }

    /// Touched registers in (index, algorithm) order.
    pub fn iter(&self) -> impl Iterator<Item = (PcrIndex, AlgorithmId, &[u8])> {
        self.values
            .iter()
            .map(|((pcr, alg), value)| (*pcr, *alg, value.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Compares every replayed register against `read`, which returns the
    /// device's current value.
    pub fn verify<F>(&self, mut read: F) -> Vec<ReplayMismatch>
    where
        F: FnMut(PcrIndex, AlgorithmId) -> Option<Vec<u8>>,
    {
        let mut mismatches = Vec::new();
        for (pcr_index, algorithm, expected) in self.iter() {
            let actual = read(pcr_index, algorithm);
            if actual.as_deref() != Some(expected) {
                mismatches.push(ReplayMismatch {
                    pcr_index,
                    algorithm,
                    expected: expected.to_vec(),
                    actual,
                });
            }
        }
        mismatches
    }

    fn extend(&mut self, record: &MeasurementRecord) -> TcgResult<()> {
        let size = record
            .algorithm
            .digest_size()
            .ok_or(TcgError::UnsupportedAlgorithm(record.algorithm))?;
        let value = self
            .values
            .entry((record.pcr_index, record.algorithm))
            .or_insert_with(|| vec![0u8; size]);
        let next = extend_value(record.algorithm, value.as_slice(), &record.digest)
            .ok_or(TcgError::UnsupportedAlgorithm(record.algorithm))?;
        *value = next;
        Ok(())
    }
}

/// Replays `records` in order, skipping informational entries.
pub fn replay<I>(records: I) -> TcgResult<PcrBanks>
where
    I: IntoIterator,
    I::Item: Borrow<MeasurementRecord>,
{
    let mut banks = PcrBanks::default();
    for record in records {
        let record = record.borrow();
        if record.is_informational() {
            continue;
        }
        banks.extend(record)?;
    }
    Ok(banks)
}

pub fn replay_log(log: &EventLog) -> TcgResult<PcrBanks> {
    replay(log.entries().map(|(_, record)| record))
}
