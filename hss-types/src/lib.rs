#![cfg_attr(not(feature = "std"), no_std)]

use serde::{Deserialize, Serialize};

#[cfg(not(feature = "std"))]
extern crate alloc;
#[cfg(not(feature = "std"))]
use alloc::{string::String, vec::Vec};

/// One LMS level's parameter pairing, as reported to tooling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSummary {
    pub lms_type: u32,
    pub lmots_type: u32,
    pub lms_name: String,
    pub lmots_name: String,
    pub hash_function: String,
    pub n: u16,
    pub w: u16,
    pub p: u16,
    pub tree_height: u16,
    pub leaves: u64,
    pub signature_size_bytes: usize,
}

// Key kind is "public" or "private"; remaining is only known for private keys
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeySummary {
    pub kind: String,
    pub levels: u32,
    pub identifier: String, // hex of the level-0 I
    pub root: String,       // hex of the level-0 K
    pub parameters: Vec<ParameterSummary>,
    pub leaf_indices: Vec<u32>,
    pub remaining: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureSummary {
    pub levels: u32,
    // Leaf index used at each level, top first
    pub leaf_indices: Vec<u32>,
    pub lms_types: Vec<u32>,
    pub lmots_types: Vec<u32>,
    pub size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResult {
    pub file: String,
    pub valid: bool,
}
