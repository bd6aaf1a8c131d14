// HSS/LMS hash-based signatures (RFC 8554, NIST SP 800-208)
//
// Bottom-up: parameter registry and hashing, LM-OTS one-time keys, LMS
// Merkle trees, the HSS hierarchy, and persisted signing on top.

pub mod codec;
pub mod config;
pub mod display;
pub mod error;
pub mod hash;
pub mod hss;
pub mod lmots;
pub mod persist;
pub mod state;
pub mod tree;

pub use config::{
    HashFamily, HssConfig, LevelParams, LmotsAlgorithm, LmsAlgorithm, DEFAULT_LEVELS,
    DEFAULT_LMOTS_TYPE, DEFAULT_LMS_TYPE, MAX_LEVELS,
};
pub use error::{LmsError, Result};
pub use hss::{HssPrivateKey, HssPublicKey, HssSignature};
pub use lmots::{checksum, LmotsPrivateKey, LmotsPublicKey, LmotsSignature};
pub use persist::{FileStore, HssSigner, MemoryStore, StateStore};
pub use state::{LeafCounter, LeafState};
pub use tree::{LmsPrivateKey, LmsPublicKey, LmsSignature, MerkleTree};
