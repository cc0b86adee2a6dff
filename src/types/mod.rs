// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Core value types.

pub mod id;
pub mod algorithm;
