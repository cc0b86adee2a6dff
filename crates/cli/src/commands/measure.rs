// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tcg_measure::config::MAX_DIGEST_SIZE;
use tcg_measure::log::MeasurementRecord;
use tcg_measure::service::LOG_ONLY;
use tcg_measure::types::algorithm::AlgorithmId;
use tcg_measure::types::id::{EventType, PcrIndex};

use super::Input;
use crate::session::{ProfileArgs, Session};

#[derive(Debug, Clone)]
pub struct MeasureRequest {
    pub log: PathBuf,
    pub pcr: u32,
    pub event_type: EventType,
    pub algorithm: AlgorithmId,
    pub input: Input,
    /// Stored verbatim with the record.
    pub event_data: Vec<u8>,
    /// Append as an informational entry without extending.
    pub note: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeasureReport {
    pub event_number: u32,
    pub pcr: u32,
    pub algorithm: String,
    pub digest: String,
    /// Register value after the extend; absent for notes.
    pub register: Option<String>,
    pub entries: u32,
}

/// Accepts a registered name (`EV_IPL`) or a number (`13`, `0x80000003`).
pub fn parse_event_type(value: &str) -> anyhow::Result<EventType> {
    if let Some(event_type) = EventType::from_name(value) {
        return Ok(event_type);
    }
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => value.parse::<u32>(),
    };
    parsed
        .map(EventType)
        .map_err(|_| anyhow::anyhow!("Unknown event type '{}'", value))
}

pub fn measure(profile: &ProfileArgs, request: &MeasureRequest) -> anyhow::Result<MeasureReport> {
    let session = Session::open(profile.to_config()?, &request.log)?;
    let data = request.input.read()?;
    let pcr = PcrIndex(request.pcr);

    let (event_number, digest, register) = if request.note {
        let digest = session
            .service
            .hash_all(&data, request.algorithm, MAX_DIGEST_SIZE)?;
        let record = MeasurementRecord::new(pcr, EventType::EV_NO_ACTION, digest.clone(), request.event_data.clone());
        let event_number = session.service.log_event(&record, LOG_ONLY)?;
        (event_number, digest.into_bytes(), None)
    } else {
        let template = MeasurementRecord::template(pcr, request.event_type, request.event_data.clone())
            .with_digest_slot(MAX_DIGEST_SIZE);
        let outcome = session
            .service
            .hash_log_extend_event(Some(data.as_slice()), request.algorithm, &template)?;
        let register = session.device.pcr(pcr, request.algorithm);
        (outcome.event_number, outcome.record.digest, register)
    };

    session.save(&request.log)?;
    let entries = session.service.with_event_log(|log| log.len());
    tracing::info!(
        event_number = event_number.0,
        pcr = request.pcr,
        note = request.note,
        "Measurement recorded"
    );

    Ok(MeasureReport {
        event_number: event_number.0,
        pcr: request.pcr,
        algorithm: request.algorithm.name().to_string(),
        digest: hex::encode(digest),
        register: register.map(hex::encode),
        entries,
    })
}

pub fn run(profile: &ProfileArgs, request: &MeasureRequest, json: bool) -> anyhow::Result<()> {
    let report = measure(profile, request)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Event #{} -> PCR[{}] ({})", report.event_number, report.pcr, report.algorithm);
    println!("  digest:   {}", report.digest);
    match &report.register {
        Some(value) => println!("  register: {}", value),
        None => println!("  register: unchanged (informational entry)"),
    }
    println!("  log:      {} entries in {}", report.entries, request.log.display());
    Ok(())
}
