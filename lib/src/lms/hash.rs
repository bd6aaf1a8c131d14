// Hash primitives and domain-separated inputs

use sha2::{Digest, Sha256};
use sha3::digest::{ExtendableOutput, Update, XofReader};
use sha3::Shake256;

use crate::lms::config::{HashFamily, ID_LEN};

pub const D_PBLC: [u8; 2] = [0x80, 0x80];
pub const D_MESG: [u8; 2] = [0x81, 0x81];
pub const D_LEAF: [u8; 2] = [0x82, 0x82];
pub const D_INTR: [u8; 2] = [0x83, 0x83];

/// Separator byte in the pseudorandom secret-element derivation
pub const SEED_MARKER: u8 = 0xff;

/// Incremental hash over either family; output is truncated (SHA-256/192)
/// or squeezed (SHAKE256) to the requested length.
#[derive(Clone)]
pub enum Hasher {
    Sha256(Sha256),
    Shake256(Shake256),
}

impl Hasher {
    pub fn new(family: HashFamily) -> Self {
        match family {
            HashFamily::Sha256 => Hasher::Sha256(Sha256::new()),
            HashFamily::Shake256 => Hasher::Shake256(Shake256::default()),
        }
    }

    /// Start a hash with the common `I || u32str(q)` prefix
    pub fn with_prefix(family: HashFamily, id: &[u8; ID_LEN], q: u32) -> Self {
        let mut hasher = Self::new(family);
        hasher.update(id);
        hasher.update(&q.to_be_bytes());
        hasher
    }

    pub fn update(&mut self, data: &[u8]) -> &mut Self {
        match self {
            Hasher::Sha256(h) => Digest::update(h, data),
            Hasher::Shake256(h) => Update::update(h, data),
        }
        self
    }

    /// Write `out.len()` bytes of output; `out.len()` must not exceed 32
    /// for SHA-256.
    pub fn finalize_into(self, out: &mut [u8]) {
        match self {
            Hasher::Sha256(h) => {
                let digest = h.finalize();
                out.copy_from_slice(&digest[..out.len()]);
            }
            Hasher::Shake256(h) => h.finalize_xof().read(out),
        }
    }

    pub fn finalize_vec(self, len: usize) -> Vec<u8> {
        let mut out = vec![0u8; len];
        self.finalize_into(&mut out);
        out
    }
}
