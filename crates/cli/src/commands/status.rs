// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use std::path::Path;
use tcg_measure::capability::{BootServiceCapability, TcgVersion};
use tcg_measure::service::StatusReport;

use crate::session::{ProfileArgs, Session};

pub fn report(profile: &ProfileArgs, log_path: Option<&Path>) -> anyhow::Result<(StatusReport, u32)> {
    let config = profile.to_config()?;
    let session = match log_path {
        Some(path) => Session::open(config, path)?,
        None => Session::new(config)?,
    };
    let report = session
        .service
        .status_check(BootServiceCapability::ENCODED_SIZE as u8)?;
    let entries = session.service.with_event_log(|log| log.len());
    Ok((report, entries))
}

fn version(v: TcgVersion) -> String {
    format!("{}.{}.{}.{}", v.major, v.minor, v.rev_major, v.rev_minor)
}

pub fn run(profile: &ProfileArgs, log_path: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let (report, entries) = report(profile, log_path)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let cap = &report.capability;
    let algorithms: Vec<&str> = cap.hash_algorithm_bitmap.algorithms().map(|a| a.name()).collect();
    let last_entry = report
        .event_log_last_entry
        .map(|a| format!("{:#x}", a))
        .unwrap_or_else(|| "-".to_string());

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Field", "Value"]);
    table.add_row(vec!["Structure version".to_string(), version(cap.structure_version)]);
    table.add_row(vec!["Protocol version".to_string(), version(cap.protocol_spec_version)]);
    table.add_row(vec!["Hash algorithms".to_string(), algorithms.join(", ")]);
    table.add_row(vec!["TPM present".to_string(), cap.tpm_present.to_string()]);
    table.add_row(vec!["TPM deactivated".to_string(), cap.tpm_deactivated.to_string()]);
    table.add_row(vec!["Event log".to_string(), format!("{:#x}", report.event_log_location)]);
    table.add_row(vec!["Last entry".to_string(), last_entry]);
    table.add_row(vec!["Entries".to_string(), entries.to_string()]);

    println!("\nTCG Service Status\n");
    println!("{table}\n");

    Ok(())
}
