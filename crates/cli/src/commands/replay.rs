// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use anyhow::Context;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tcg_measure::log::replay::replay_log;

use super::read_log;

/// One reconstructed register bank.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PcrValue {
    pub pcr: u32,
    pub algorithm: String,
    pub value: String,
}

/// Deterministic summary of a log: identical logs produce identical proofs.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ReplayProof {
    /// blake3 of the committed log bytes.
    pub log_hash: String,
    pub entries: u32,
    pub pcrs: Vec<PcrValue>,
}

pub fn build_proof(path: &Path) -> anyhow::Result<ReplayProof> {
    let (image, log) = read_log(path)?;
    let banks = replay_log(&log).context("Replay failed")?;

    let pcrs = banks
        .iter()
        .map(|(pcr, algorithm, value)| PcrValue {
            pcr: pcr.0,
            algorithm: algorithm.name().to_string(),
            value: hex::encode(value),
        })
        .collect();

    Ok(ReplayProof {
        log_hash: image.body_hash(),
        entries: log.len(),
        pcrs,
    })
}

/// Expected values that the replay does not reproduce, paired with what it
/// produced instead.
pub fn compare(proof: &ReplayProof, expected: &[PcrValue]) -> Vec<(PcrValue, Option<String>)> {
    expected
        .iter()
        .filter_map(|want| {
            let got = proof
                .pcrs
                .iter()
                .find(|p| p.pcr == want.pcr && p.algorithm.eq_ignore_ascii_case(&want.algorithm))
                .map(|p| p.value.clone());
            match &got {
                Some(value) if value.eq_ignore_ascii_case(&want.value) => None,
                _ => Some((want.clone(), got)),
            }
        })
        .collect()
}

pub fn run(path: &Path, expect: Option<&Path>) -> anyhow::Result<()> {
    let proof = build_proof(path)?;
    println!("{}", serde_json::to_string_pretty(&proof)?);

    let expect = match expect {
        Some(expect) => expect,
        None => return Ok(()),
    };
    let raw = std::fs::read(expect).with_context(|| format!("Failed to read {}", expect.display()))?;
    let expected: Vec<PcrValue> =
        serde_json::from_slice(&raw).context("Failed to parse expected PCR values JSON")?;

    let mismatches = compare(&proof, &expected);
    if mismatches.is_empty() {
        eprintln!("\n✅ VERIFIED: {} register(s) match\n", expected.len());
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["PCR", "Alg", "Expected", "Replayed"]);
    for (want, got) in &mismatches {
        table.add_row(vec![
            want.pcr.to_string(),
            want.algorithm.clone(),
            want.value.clone(),
            got.clone().unwrap_or_else(|| "(never extended)".to_string()),
        ]);
    }
    eprintln!("\n❌ MISMATCH\n");
    eprintln!("{table}\n");

    anyhow::bail!("{} register(s) do not replay to the expected value", mismatches.len())
}
