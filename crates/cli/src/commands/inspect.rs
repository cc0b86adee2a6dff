// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use std::path::Path;

use super::{read_log, short_hex};

pub fn run(path: &Path) -> anyhow::Result<()> {
    let (image, log) = read_log(path)?;

    println!("\nEvent Log {}", path.display());
    println!("--------------------");
    println!("Base:    {:#x}", image.base);
    println!("Entries: {}", log.len());
    println!("Bytes:   {}", image.body.len());
    println!("blake3:  {}", image.body_hash());

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["#", "Address", "PCR", "Event Type", "Alg", "Digest", "Data"]);

    for (position, record) in log.entries() {
        let event_type = record
            .event_type
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("{:#010x}", record.event_type.0));
        let data = match std::str::from_utf8(&record.event_data) {
            Ok(text) if !text.is_empty() && text.chars().all(|c| !c.is_control()) => text.to_string(),
            _ => format!("{} bytes", record.event_data.len()),
        };

        table.add_row(vec![
            position.event_number.0.to_string(),
            format!("{:#x}", position.address),
            record.pcr_index.0.to_string(),
            event_type,
            record.algorithm.name().to_string(),
            short_hex(&record.digest),
            data,
        ]);
    }

    println!("\n{table}\n");

    Ok(())
}
