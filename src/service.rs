// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Service Facade
//!
//! The five entry points callers see. The facade validates inputs, sequences
//! the components and owns no state beyond them.
//!
//! # Hash-Log-Extend Protocol
//! 1. Validate algorithm, register, template and device state (no side effects)
//! 2. Hash the data (no side effects)
//! 3. Extend the register. On failure the log is untouched
//! 4. Append the record. On `LogFull` the register stays extended and the
//!    error carries `extended: true`. This is the only window where hardware
//!    and log disagree; upstream policy decides whether to halt
//! 5. Return the address of the new last entry
//!
//! Steps 3 and 4 run under the log lock, so log order equals extend order
//! for every register. Lock order is always log, then channel.

use alloc::vec::Vec;
use serde::{Deserialize, Serialize};
use spin::mutex::TicketMutex;

use crate::capability::{BootServiceCapability, CapabilityReporter};
use crate::channel::{TpmTransport, TrustRootChannel};
use crate::config::ServiceConfig;
use crate::digest::{DigestEngine, DigestValue};
use crate::error::{DeviceFault, TcgError, TcgResult};
use crate::extend::{ExtendRequest, PcrExtender};
use crate::log::event_log::{EventLog, LogRegion};
use crate::log::record::MeasurementRecord;
use crate::types::algorithm::AlgorithmId;
use crate::types::id::{EventNumber, PhysicalAddress};

/// `LogEvent` flag: append without extending. All other bits are reserved.
pub const LOG_ONLY: u32 = 0x1;

/// Output of `StatusCheck`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub capability: BootServiceCapability,
    /// Reserved; always zero.
    pub feature_flags: u32,
    pub event_log_location: PhysicalAddress,
    pub event_log_last_entry: Option<PhysicalAddress>,
}

/// Output of `HashLogExtendEvent`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtendOutcome {
    pub record: MeasurementRecord,
    pub event_number: EventNumber,
    pub last_entry: PhysicalAddress,
}

pub struct TcgService<T> {
    config: ServiceConfig,
    engine: DigestEngine,
    channel: TrustRootChannel<T>,
    extender: PcrExtender,
    reporter: CapabilityReporter,
    log: TicketMutex<EventLog>,
}

impl<T: TpmTransport> TcgService<T> {
    pub fn new(config: ServiceConfig, transport: T) -> TcgResult<Self> {
        config.validate()?;
        let region = LogRegion::new(config.log_base, config.log_capacity)?;
        Ok(Self::with_log(config, transport, EventLog::new(region)))
    }

    /// Installs the service over an existing log, e.g. one handed over by
    /// an earlier boot stage.
    pub fn with_log(config: ServiceConfig, transport: T, log: EventLog) -> Self {
        tracing::debug!(
            pcr_count = config.pcr_count,
            log_capacity = log.capacity(),
            "TCG service installed"
        );
        Self {
            engine: DigestEngine::new(config.algorithms),
            channel: TrustRootChannel::new(transport),
            extender: PcrExtender::new(config.pcr_count),
            reporter: CapabilityReporter::new(config.algorithms),
            log: TicketMutex::new(log),
            config,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Runs `f` with the log locked against appends.
    pub fn with_event_log<R>(&self, f: impl FnOnce(&EventLog) -> R) -> R {
        let log = self.log.lock();
        f(&log)
    }

    /// StatusCheck: capability snapshot plus log location.
    pub fn status_check(&self, capability_size: u8) -> TcgResult<StatusReport> {
        let capability = self.reporter.report(&self.channel, capability_size)?;
        let log = self.log.lock();
        let (event_log_location, _) = log.location();
        Ok(StatusReport {
            capability,
            feature_flags: 0,
            event_log_location,
            event_log_last_entry: log.last_entry(),
        })
    }

    /// HashAll: digest of `data` for a caller buffer of `capacity` bytes.
    ///
    /// A capacity of zero is a size query and gets `BufferTooSmall`.
    pub fn hash_all(&self, data: &[u8], algorithm: AlgorithmId, capacity: usize) -> TcgResult<DigestValue> {
        tracing::debug!(len = data.len(), algorithm = algorithm.0, "HashAll");
        let size = self.engine.check(algorithm)?;
        if capacity < size {
            return Err(TcgError::BufferTooSmall { required: size });
        }
        self.engine.digest(data, algorithm)
    }

    /// LogEvent: appends an informational record without extending.
    ///
    /// `flags` must be exactly [`LOG_ONLY`]. This is narrower than the TCG
    /// protocol, which logs any record with bit 0 set: only `EV_NO_ACTION`
    /// records may bypass the extend here, so the log always replays to the
    /// registers. An event extended through pass-through cannot be logged.
    pub fn log_event(&self, record: &MeasurementRecord, flags: u32) -> TcgResult<EventNumber> {
        tracing::debug!(pcr = record.pcr_index.0, flags, "LogEvent");
        if flags != LOG_ONLY {
            return Err(TcgError::InvalidParameter("flags must be LOG_ONLY"));
        }
        if !self.engine.advertised().advertises(record.algorithm) {
            return Err(TcgError::InvalidParameter("record algorithm not advertised"));
        }
        if self.extender.check_index(record.pcr_index).is_err() {
            return Err(TcgError::InvalidParameter("record register index out of range"));
        }
        if !record.is_informational() {
            return Err(TcgError::InvalidParameter("log-only records must be EV_NO_ACTION"));
        }

        let position = self.log.lock().append(record)?;
        Ok(position.event_number)
    }

    /// PassThroughToTpm: forwards an opaque command block.
    ///
    /// On `BufferTooSmall` the command has already executed; retrying runs
    /// it again.
    pub fn pass_through_to_tpm(&self, input: &[u8], output_capacity: u32) -> TcgResult<Vec<u8>> {
        tracing::debug!(len = input.len(), output_capacity, "PassThroughToTpm");
        if input.is_empty() {
            return Err(TcgError::InvalidParameter("empty input parameter block"));
        }
        if u32::try_from(input.len()).is_err() {
            return Err(TcgError::InvalidParameter("input parameter block exceeds u32"));
        }
        self.channel.send(input, output_capacity as usize)
    }

    /// HashLogExtendEvent: hash, extend, then log.
    ///
    /// `data: None` takes the template digest as already computed.
    /// The template's digest length is the caller's slot capacity.
    pub fn hash_log_extend_event(
        &self,
        data: Option<&[u8]>,
        algorithm: AlgorithmId,
        template: &MeasurementRecord,
    ) -> TcgResult<ExtendOutcome> {
        tracing::debug!(
            pcr = template.pcr_index.0,
            algorithm = algorithm.0,
            len = data.map(|d| d.len()),
            "HashLogExtendEvent"
        );

        // 1. Validate
        let size = self.engine.check(algorithm)?;
        self.extender.check_index(template.pcr_index)?;
        if template.is_informational() {
            return Err(TcgError::InvalidParameter("EV_NO_ACTION events are never extended"));
        }
        if template.digest.len() < size {
            return Err(TcgError::BufferTooSmall { required: size });
        }
        if u32::try_from(template.event_data.len()).is_err() {
            return Err(TcgError::InvalidParameter("event data larger than 4 GiB"));
        }
        let state = self.channel.query_state()?;
        if !state.present {
            return Err(TcgError::DeviceNotPresent);
        }
        if state.deactivated {
            return Err(TcgError::DeviceError(DeviceFault::Deactivated));
        }

        // 2. Hash
        let digest = match data {
            Some(data) => self.engine.digest(data, algorithm)?,
            None => DigestValue::new(algorithm, template.digest.clone())?,
        };
        let record = MeasurementRecord::new(
            template.pcr_index,
            template.event_type,
            digest.clone(),
            template.event_data.clone(),
        );

        let mut log = self.log.lock();

        // 3. Extend
        self.extender
            .extend(&self.channel, &ExtendRequest::new(record.pcr_index, digest))?;

        // 4. Log
        let position = log.append(&record).map_err(|e| match e {
            TcgError::LogFull { required, remaining, .. } => {
                tracing::warn!(
                    pcr = record.pcr_index.0,
                    required,
                    remaining,
                    "Register extended but event log is full; log no longer replays to hardware"
                );
                TcgError::LogFull {
                    required,
                    remaining,
                    extended: true,
                }
            }
            other => other,
        })?;
        drop(log);

        // 5. Report
        Ok(ExtendOutcome {
            record,
            event_number: position.event_number,
            last_entry: position.address,
        })
    }
}
