// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use tcg_measure::config::MAX_DIGEST_SIZE;
use tcg_measure::digest::DigestValue;

use super::Input;
use crate::session::{parse_algorithm, ProfileArgs, Session};

pub fn digest(profile: &ProfileArgs, algorithm: &str, input: &Input) -> anyhow::Result<DigestValue> {
    let algorithm = parse_algorithm(algorithm)?;
    let session = Session::new(profile.to_config()?)?;
    let data = input.read()?;
    Ok(session.service.hash_all(&data, algorithm, MAX_DIGEST_SIZE)?)
}

pub fn run(profile: &ProfileArgs, algorithm: &str, input: &Input) -> anyhow::Result<()> {
    let digest = digest(profile, algorithm, input)?;
    println!("{:x}", digest);
    Ok(())
}
