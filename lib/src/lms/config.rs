// Parameter registry and HSS configuration

use std::fmt;
use std::str::FromStr;

use hss_types::ParameterSummary;
use serde::{Deserialize, Serialize};

use crate::lms::error::{LmsError, Result};

/// Length of the key-pair identifier `I`
pub const ID_LEN: usize = 16;

pub const DEFAULT_LMS_TYPE: LmsAlgorithm = LmsAlgorithm::SHA256_M32_H5;
pub const DEFAULT_LMOTS_TYPE: LmotsAlgorithm = LmotsAlgorithm::SHA256_N32_W8;
pub const DEFAULT_LEVELS: usize = 2;
pub const MAX_LEVELS: usize = 8;

/// Hash function underlying a parameter set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HashFamily {
    Sha256,
    Shake256,
}

impl HashFamily {
    /// Human-readable name for this family truncated to `out_len` bytes
    pub fn name(self, out_len: usize) -> &'static str {
        match (self, out_len) {
            (HashFamily::Sha256, 32) => "SHA-256",
            (HashFamily::Sha256, _) => "SHA-256/192",
            (HashFamily::Shake256, 32) => "SHAKE256/256",
            (HashFamily::Shake256, _) => "SHAKE256/192",
        }
    }
}

/// LM-OTS parameter sets (RFC 8554 section 4.1, NIST SP 800-208 section 4)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(non_camel_case_types)]
#[repr(u32)]
pub enum LmotsAlgorithm {
    SHA256_N32_W1 = 1,
    SHA256_N32_W2 = 2,
    SHA256_N32_W4 = 3,
    SHA256_N32_W8 = 4,
    SHA256_N24_W1 = 5,
    SHA256_N24_W2 = 6,
    SHA256_N24_W4 = 7,
    SHA256_N24_W8 = 8,
    SHAKE_N32_W1 = 9,
    SHAKE_N32_W2 = 10,
    SHAKE_N32_W4 = 11,
    SHAKE_N32_W8 = 12,
    SHAKE_N24_W1 = 13,
    SHAKE_N24_W2 = 14,
    SHAKE_N24_W4 = 15,
    SHAKE_N24_W8 = 16,
}

/// LMS parameter sets (RFC 8554 section 5.1, NIST SP 800-208 section 4)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(non_camel_case_types)]
#[repr(u32)]
pub enum LmsAlgorithm {
    SHA256_M32_H5 = 5,
    SHA256_M32_H10 = 6,
    SHA256_M32_H15 = 7,
    SHA256_M32_H20 = 8,
    SHA256_M32_H25 = 9,
    SHA256_M24_H5 = 10,
    SHA256_M24_H10 = 11,
    SHA256_M24_H15 = 12,
    SHA256_M24_H20 = 13,
    SHA256_M24_H25 = 14,
    SHAKE_M32_H5 = 15,
    SHAKE_M32_H10 = 16,
    SHAKE_M32_H15 = 17,
    SHAKE_M32_H20 = 18,
    SHAKE_M32_H25 = 19,
    SHAKE_M24_H5 = 20,
    SHAKE_M24_H10 = 21,
    SHAKE_M24_H15 = 22,
    SHAKE_M24_H20 = 23,
    SHAKE_M24_H25 = 24,
}

/// Resolved LM-OTS parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LmotsParams {
    pub algorithm: LmotsAlgorithm,
    pub hash: HashFamily,
    /// Hash output length in bytes
    pub n: usize,
    /// Winternitz width in bits
    pub w: usize,
    /// Number of hash chains
    pub p: usize,
    /// Checksum left shift
    pub ls: u32,
}

/// Resolved LMS parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LmsParams {
    pub algorithm: LmsAlgorithm,
    pub hash: HashFamily,
    /// Node hash length in bytes
    pub m: usize,
    /// Tree height
    pub h: u32,
}

/// Compute `(p, ls)` from `n` and `w` (RFC 8554 Appendix B)
pub const fn derive_p_ls(n: usize, w: usize) -> (usize, u32) {
    let u = (8 * n + w - 1) / w;
    let max_sum = ((1usize << w) - 1) * u;
    // floor(lg(max_sum)) + 1
    let bits = (usize::BITS - max_sum.leading_zeros()) as usize;
    let v = (bits + w - 1) / w;
    (u + v, (16 - v * w) as u32)
}

impl LmotsAlgorithm {
    pub const ALL: [LmotsAlgorithm; 16] = [
        LmotsAlgorithm::SHA256_N32_W1,
        LmotsAlgorithm::SHA256_N32_W2,
        LmotsAlgorithm::SHA256_N32_W4,
        LmotsAlgorithm::SHA256_N32_W8,
        LmotsAlgorithm::SHA256_N24_W1,
        LmotsAlgorithm::SHA256_N24_W2,
        LmotsAlgorithm::SHA256_N24_W4,
        LmotsAlgorithm::SHA256_N24_W8,
        LmotsAlgorithm::SHAKE_N32_W1,
        LmotsAlgorithm::SHAKE_N32_W2,
        LmotsAlgorithm::SHAKE_N32_W4,
        LmotsAlgorithm::SHAKE_N32_W8,
        LmotsAlgorithm::SHAKE_N24_W1,
        LmotsAlgorithm::SHAKE_N24_W2,
        LmotsAlgorithm::SHAKE_N24_W4,
        LmotsAlgorithm::SHAKE_N24_W8,
    ];

    pub fn type_id(self) -> u32 {
        self as u32
    }

    /// Registry lookup by wire type identifier
    pub fn lookup(type_id: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|a| a.type_id() == type_id)
    }

    pub fn params(self) -> LmotsParams {
        let index = self.type_id() - 1;
        let (hash, n) = match index / 4 {
            0 => (HashFamily::Sha256, 32),
            1 => (HashFamily::Sha256, 24),
            2 => (HashFamily::Shake256, 32),
            _ => (HashFamily::Shake256, 24),
        };
        let w = 1usize << (index % 4);
        let (p, ls) = derive_p_ls(n, w);
        LmotsParams {
            algorithm: self,
            hash,
            n,
            w,
            p,
            ls,
        }
    }
}

impl LmsAlgorithm {
    pub const ALL: [LmsAlgorithm; 20] = [
        LmsAlgorithm::SHA256_M32_H5,
        LmsAlgorithm::SHA256_M32_H10,
        LmsAlgorithm::SHA256_M32_H15,
        LmsAlgorithm::SHA256_M32_H20,
        LmsAlgorithm::SHA256_M32_H25,
        LmsAlgorithm::SHA256_M24_H5,
        LmsAlgorithm::SHA256_M24_H10,
        LmsAlgorithm::SHA256_M24_H15,
        LmsAlgorithm::SHA256_M24_H20,
        LmsAlgorithm::SHA256_M24_H25,
        LmsAlgorithm::SHAKE_M32_H5,
        LmsAlgorithm::SHAKE_M32_H10,
        LmsAlgorithm::SHAKE_M32_H15,
        LmsAlgorithm::SHAKE_M32_H20,
        LmsAlgorithm::SHAKE_M32_H25,
        LmsAlgorithm::SHAKE_M24_H5,
        LmsAlgorithm::SHAKE_M24_H10,
        LmsAlgorithm::SHAKE_M24_H15,
        LmsAlgorithm::SHAKE_M24_H20,
        LmsAlgorithm::SHAKE_M24_H25,
    ];

    pub fn type_id(self) -> u32 {
        self as u32
    }

    /// Registry lookup by wire type identifier
    pub fn lookup(type_id: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|a| a.type_id() == type_id)
    }

    pub fn params(self) -> LmsParams {
        let index = self.type_id() - 5;
        let (hash, m) = match index / 5 {
            0 => (HashFamily::Sha256, 32),
            1 => (HashFamily::Sha256, 24),
            2 => (HashFamily::Shake256, 32),
            _ => (HashFamily::Shake256, 24),
        };
        LmsParams {
            algorithm: self,
            hash,
            m,
            h: 5 * (index % 5 + 1),
        }
    }
}

impl TryFrom<u32> for LmotsAlgorithm {
    type Error = LmsError;

    fn try_from(type_id: u32) -> Result<Self> {
        Self::lookup(type_id).ok_or_else(|| {
            LmsError::Parameter(format!("unregistered LM-OTS type 0x{type_id:08x}"))
        })
    }
}

impl TryFrom<u32> for LmsAlgorithm {
    type Error = LmsError;

    fn try_from(type_id: u32) -> Result<Self> {
        Self::lookup(type_id)
            .ok_or_else(|| LmsError::Parameter(format!("unregistered LMS type 0x{type_id:08x}")))
    }
}

/// Accepts a numeric id (`4`, `0x4`) or a registry name with an optional
/// `LMOTS_`/`LMS_` prefix, case-insensitive.
fn parse_algorithm<T: Copy + fmt::Debug>(
    s: &str,
    prefix: &str,
    all: &[T],
    lookup: impl Fn(u32) -> Option<T>,
    kind: &str,
) -> Result<T> {
    let trimmed = s.trim();
    let numeric = match trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => trimmed.parse::<u32>().ok(),
    };
    if let Some(id) = numeric {
        return lookup(id)
            .ok_or_else(|| LmsError::Parameter(format!("unregistered {kind} type {id}")));
    }

    let upper = trimmed.to_ascii_uppercase();
    let name = upper.strip_prefix(prefix).unwrap_or(&upper);
    all.iter()
        .copied()
        .find(|a| format!("{a:?}") == name)
        .ok_or_else(|| LmsError::Parameter(format!("unknown {kind} parameter set '{s}'")))
}

impl FromStr for LmotsAlgorithm {
    type Err = LmsError;

    fn from_str(s: &str) -> Result<Self> {
        parse_algorithm(s, "LMOTS_", &Self::ALL, Self::lookup, "LM-OTS")
    }
}

impl FromStr for LmsAlgorithm {
    type Err = LmsError;

    fn from_str(s: &str) -> Result<Self> {
        parse_algorithm(s, "LMS_", &Self::ALL, Self::lookup, "LMS")
    }
}

impl fmt::Display for LmotsAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LMOTS_{self:?}")
    }
}

impl fmt::Display for LmsAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LMS_{self:?}")
    }
}

impl LmotsParams {
    /// Largest chain coefficient, `2^w - 1`
    pub fn max_coefficient(&self) -> usize {
        (1usize << self.w) - 1
    }

    /// `typeId(4) || C(n) || y[0..p)(n each)`
    pub fn signature_len(&self) -> usize {
        4 + self.n * (self.p + 1)
    }

    /// `typeId(4) || I(16) || q(4) || K(n)`
    pub fn public_key_len(&self) -> usize {
        4 + ID_LEN + 4 + self.n
    }
}

impl LmsParams {
    pub fn leaves(&self) -> u64 {
        1u64 << self.h
    }

    /// `q(4) || lmots_signature || lmsType(4) || path(h * m)`
    pub fn signature_len(&self, lmots: &LmotsParams) -> usize {
        4 + lmots.signature_len() + 4 + self.h as usize * self.m
    }

    /// `lmsType(4) || lmotsType(4) || I(16) || K(m)`
    pub fn public_key_len(&self) -> usize {
        4 + 4 + ID_LEN + self.m
    }
}

/// Check that an LMS tree can be built over the given LM-OTS leaves
pub fn check_pairing(lms: LmsAlgorithm, lmots: LmotsAlgorithm) -> Result<()> {
    let lms_params = lms.params();
    let ots_params = lmots.params();
    if lms_params.hash != ots_params.hash || lms_params.m != ots_params.n {
        return Err(LmsError::Parameter(format!(
            "{lms} (m={}) cannot be paired with {lmots} (n={})",
            lms_params.m, ots_params.n
        )));
    }
    Ok(())
}

/// Parameter pairing for one HSS level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelParams {
    pub lms: LmsAlgorithm,
    pub lmots: LmotsAlgorithm,
}

impl LevelParams {
    pub fn new(lms: LmsAlgorithm, lmots: LmotsAlgorithm) -> Result<Self> {
        check_pairing(lms, lmots)?;
        Ok(Self { lms, lmots })
    }

    pub fn summary(&self) -> ParameterSummary {
        let lms = self.lms.params();
        let ots = self.lmots.params();
        ParameterSummary {
            lms_type: self.lms.type_id(),
            lmots_type: self.lmots.type_id(),
            lms_name: format!("{:?}", self.lms),
            lmots_name: format!("{:?}", self.lmots),
            hash_function: ots.hash.name(ots.n).to_string(),
            n: ots.n as u16,
            w: ots.w as u16,
            p: ots.p as u16,
            tree_height: lms.h as u16,
            leaves: lms.leaves(),
            signature_size_bytes: lms.signature_len(&ots),
        }
    }
}

impl Default for LevelParams {
    fn default() -> Self {
        Self {
            lms: DEFAULT_LMS_TYPE,
            lmots: DEFAULT_LMOTS_TYPE,
        }
    }
}

/// Shape of an HSS hierarchy, top level first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HssConfig {
    pub levels: Vec<LevelParams>,
}

impl HssConfig {
    pub fn new(levels: Vec<LevelParams>) -> Result<Self> {
        let config = Self { levels };
        config.validate()?;
        Ok(config)
    }

    /// Same pairing at every level
    pub fn uniform(levels: usize, lms: LmsAlgorithm, lmots: LmotsAlgorithm) -> Result<Self> {
        let level = LevelParams::new(lms, lmots)?;
        Self::new(vec![level; levels])
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: HssConfig = serde_json::from_str(json)
            .map_err(|e| LmsError::Parameter(format!("invalid HSS configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.levels.is_empty() || self.levels.len() > MAX_LEVELS {
            return Err(LmsError::Parameter(format!(
                "HSS levels must be between 1 and {MAX_LEVELS}, got {}",
                self.levels.len()
            )));
        }
        for level in &self.levels {
            check_pairing(level.lms, level.lmots)?;
        }
        Ok(())
    }

    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    /// Total number of message signatures, saturating at `u64::MAX`
    pub fn capacity(&self) -> u64 {
        self.levels
            .iter()
            .fold(1u64, |acc, level| acc.saturating_mul(level.lms.params().leaves()))
    }
}

impl Default for HssConfig {
    fn default() -> Self {
        Self {
            levels: vec![LevelParams::default(); DEFAULT_LEVELS],
        }
    }
}
