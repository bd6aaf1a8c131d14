// LMS Merkle trees over LM-OTS leaves (RFC 8554 section 5)

use std::fmt;
use std::sync::{Arc, OnceLock};

use rand::{CryptoRng, RngCore};
use rayon::prelude::*;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::lms::codec::{put_u32, Reader};
use crate::lms::config::{check_pairing, LmotsAlgorithm, LmsAlgorithm, LmsParams, ID_LEN};
use crate::lms::error::{LmsError, Result};
use crate::lms::hash::{Hasher, D_INTR, D_LEAF};
use crate::lms::lmots::{LmotsPrivateKey, LmotsSignature};
use crate::lms::state::{LeafCounter, LeafState, LeafValidator};

/// `T[r] = H(I || u32(r) || D_LEAF || K)`
fn leaf_node(params: &LmsParams, id: &[u8; ID_LEN], r: u32, k: &[u8], out: &mut [u8]) {
    let mut hasher = Hasher::with_prefix(params.hash, id, r);
    hasher.update(&D_LEAF).update(k);
    hasher.finalize_into(out);
}

/// `T[r] = H(I || u32(r) || D_INTR || left || right)`
fn interior_node(
    params: &LmsParams,
    id: &[u8; ID_LEN],
    r: u32,
    left: &[u8],
    right: &[u8],
) -> Vec<u8> {
    let mut hasher = Hasher::with_prefix(params.hash, id, r);
    hasher.update(&D_INTR).update(left).update(right);
    hasher.finalize_vec(params.m)
}

/// Complete binary tree stored as a flat arena; node `r` (1-based, root
/// at 1, leaves at `2^h..2^(h+1)`) occupies bytes `r*m..(r+1)*m`.
pub struct MerkleTree {
    m: usize,
    h: u32,
    nodes: Vec<u8>,
}

impl MerkleTree {
    /// Materialise every node. Leaf public values are computed in parallel.
    pub fn build(
        lms: LmsAlgorithm,
        lmots: LmotsAlgorithm,
        id: &[u8; ID_LEN],
        seed: &[u8],
    ) -> Result<Self> {
        let params = lms.params();
        let m = params.m;
        let leaves = 1usize << params.h;
        let mut nodes = vec![0u8; 2 * leaves * m];

        debug!(lms = %lms, leaves, "building LMS tree");
        nodes[leaves * m..]
            .par_chunks_mut(m)
            .enumerate()
            .try_for_each(|(q, out)| -> Result<()> {
                let ots = LmotsPrivateKey::new(lmots, *id, q as u32, seed)?;
                let r = (leaves + q) as u32;
                leaf_node(&params, id, r, &ots.public_value(), out);
                Ok(())
            })?;

        for r in (1..leaves).rev() {
            let value = interior_node(
                &params,
                id,
                r as u32,
                &nodes[2 * r * m..(2 * r + 1) * m],
                &nodes[(2 * r + 1) * m..(2 * r + 2) * m],
            );
            nodes[r * m..(r + 1) * m].copy_from_slice(&value);
        }

        Ok(Self {
            m,
            h: params.h,
            nodes,
        })
    }

    pub fn node(&self, r: usize) -> &[u8] {
        &self.nodes[r * self.m..(r + 1) * self.m]
    }

    pub fn root(&self) -> &[u8] {
        self.node(1)
    }

    /// Sibling hashes from leaf `q` up to the root, leaf level first
    pub fn auth_path(&self, q: u32) -> Vec<u8> {
        let mut r = (1usize << self.h) + q as usize;
        let mut path = Vec::with_capacity(self.h as usize * self.m);
        for _ in 0..self.h {
            path.extend_from_slice(self.node(r ^ 1));
            r >>= 1;
        }
        path
    }
}

/// LMS private key `{lmsType, lmotsType, I, SEED, q}`
#[derive(Clone)]
pub struct LmsPrivateKey {
    lms: LmsAlgorithm,
    lmots: LmotsAlgorithm,
    id: [u8; ID_LEN],
    seed: Zeroizing<Vec<u8>>,
    counter: LeafCounter,
    tree: OnceLock<Arc<MerkleTree>>,
}

impl LmsPrivateKey {
    pub fn new(
        lms: LmsAlgorithm,
        lmots: LmotsAlgorithm,
        id: [u8; ID_LEN],
        seed: &[u8],
    ) -> Result<Self> {
        check_pairing(lms, lmots)?;
        let m = lms.params().m;
        if seed.len() != m {
            return Err(LmsError::Parameter(format!(
                "{lms} needs a {m}-byte seed, got {}",
                seed.len()
            )));
        }
        Ok(Self {
            lms,
            lmots,
            id,
            seed: Zeroizing::new(seed.to_vec()),
            counter: LeafCounter::new(lms.params().h),
            tree: OnceLock::new(),
        })
    }

    /// Fresh key with random `I` then random `SEED` drawn from `rng`
    pub fn generate<R: RngCore + CryptoRng>(
        lms: LmsAlgorithm,
        lmots: LmotsAlgorithm,
        rng: &mut R,
    ) -> Result<Self> {
        check_pairing(lms, lmots)?;
        let mut id = [0u8; ID_LEN];
        rng.fill_bytes(&mut id);
        let mut seed = Zeroizing::new(vec![0u8; lms.params().m]);
        rng.fill_bytes(&mut seed);
        Self::new(lms, lmots, id, &seed)
    }

    pub fn lms(&self) -> LmsAlgorithm {
        self.lms
    }

    pub fn lmots(&self) -> LmotsAlgorithm {
        self.lmots
    }

    pub fn id(&self) -> &[u8; ID_LEN] {
        &self.id
    }

    /// Index of the next leaf to be used
    pub fn q(&self) -> u32 {
        self.counter.next()
    }

    pub fn remaining(&self) -> u64 {
        self.counter.remaining()
    }

    pub fn is_exhausted(&self) -> bool {
        self.counter.is_exhausted()
    }

    pub fn state(&self) -> LeafState {
        self.counter.state()
    }

    /// Memoized Merkle tree; built on first use
    pub fn tree(&self) -> Result<&MerkleTree> {
        if let Some(tree) = self.tree.get() {
            return Ok(&**tree);
        }
        let built = Arc::new(MerkleTree::build(self.lms, self.lmots, &self.id, &self.seed)?);
        Ok(&**self.tree.get_or_init(|| built))
    }

    pub fn public_key(&self) -> Result<LmsPublicKey> {
        Ok(LmsPublicKey {
            lms: self.lms,
            lmots: self.lmots,
            id: self.id,
            k: self.tree()?.root().to_vec(),
        })
    }

    /// Sign with the next unused leaf
    ///
    /// Postconditions:
    /// - Returns Err(State) if every leaf has been used; q is unchanged
    /// - Otherwise q advances by exactly one
    pub fn sign<R: RngCore + CryptoRng>(
        &mut self,
        message: &[u8],
        rng: &mut R,
    ) -> Result<LmsSignature> {
        let path = if self.counter.is_exhausted() {
            warn!(id = %hex::encode(self.id), "signing attempted with exhausted LMS key");
            Vec::new()
        } else {
            self.tree()?.auth_path(self.counter.next())
        };
        let q = self.counter.reserve()?;
        let mut ots = LmotsPrivateKey::new(self.lmots, self.id, q, &self.seed)?;
        let ots_signature = ots.sign(message, rng)?;
        if self.counter.is_exhausted() {
            info!(id = %hex::encode(self.id), "LMS key used its last leaf");
        }
        Ok(LmsSignature {
            q,
            ots: ots_signature,
            lms: self.lms,
            path,
        })
    }

    /// `lmsType(4) || lmotsType(4) || SEED(m) || I(16) || q(4)`
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + 4 + self.seed.len() + ID_LEN + 4);
        self.write_to(&mut out);
        out
    }

    pub(crate) fn write_to(&self, out: &mut Vec<u8>) {
        put_u32(out, self.lms.type_id());
        put_u32(out, self.lmots.type_id());
        out.extend_from_slice(&self.seed);
        out.extend_from_slice(&self.id);
        put_u32(out, self.counter.next());
    }

    pub(crate) fn read(reader: &mut Reader<'_>) -> Result<Self> {
        let lms = reader.lms_type()?;
        let lmots = reader.lmots_type()?;
        check_pairing(lms, lmots).map_err(|e| LmsError::Format(e.to_string()))?;
        let seed = reader.bytes(lms.params().m)?;
        let id = reader.array::<ID_LEN>()?;
        let q = reader.u32()?;
        let mut key = Self::new(lms, lmots, id, seed)?;
        key.counter = LeafCounter::restore(q, lms.params().h)?;
        Ok(key)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(bytes, "LMS private key");
        let key = Self::read(&mut reader)?;
        reader.finish()?;
        Ok(key)
    }

    #[cfg(test)]
    pub(crate) fn skip_to(&mut self, q: u32) {
        self.counter = LeafCounter::restore(q, self.lms.params().h).expect("valid test counter");
    }
}

impl fmt::Debug for LmsPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LmsPrivateKey")
            .field("lms", &self.lms)
            .field("lmots", &self.lmots)
            .field("id", &hex::encode(self.id))
            .field("seed", &"<redacted>")
            .field("q", &self.counter.next())
            .finish()
    }
}

impl PartialEq for LmsPrivateKey {
    fn eq(&self, other: &Self) -> bool {
        self.lms == other.lms
            && self.lmots == other.lmots
            && self.id == other.id
            && *self.seed == *other.seed
            && self.counter == other.counter
    }
}

impl Eq for LmsPrivateKey {}

/// LMS public key `{lmsType, lmotsType, I, K}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LmsPublicKey {
    lms: LmsAlgorithm,
    lmots: LmotsAlgorithm,
    id: [u8; ID_LEN],
    k: Vec<u8>,
}

impl LmsPublicKey {
    pub fn lms(&self) -> LmsAlgorithm {
        self.lms
    }

    pub fn lmots(&self) -> LmotsAlgorithm {
        self.lmots
    }

    pub fn id(&self) -> &[u8; ID_LEN] {
        &self.id
    }

    pub fn k(&self) -> &[u8] {
        &self.k
    }

    /// Verify an LMS signature. Never errors; any mismatch yields false.
    pub fn verify(&self, message: &[u8], signature: &LmsSignature) -> bool {
        if signature.lms != self.lms || signature.ots.algorithm() != self.lmots {
            debug!(
                lms = %signature.lms,
                lmots = %signature.ots.algorithm(),
                "LMS signature types do not match public key"
            );
            return false;
        }
        let params = self.lms.params();
        if LeafValidator::validate_index(signature.q, params.h).is_err() {
            debug!(q = signature.q, "LMS signature leaf index out of range");
            return false;
        }

        let candidate = signature.ots.build_public(&self.id, signature.q, message);
        let mut r = (1u32 << params.h) + signature.q;
        let mut node = vec![0u8; params.m];
        leaf_node(&params, &self.id, r, &candidate, &mut node);

        for i in 0..params.h as usize {
            let sibling = signature.path_node(i);
            node = if r & 1 == 1 {
                interior_node(&params, &self.id, r >> 1, sibling, &node)
            } else {
                interior_node(&params, &self.id, r >> 1, &node, sibling)
            };
            r >>= 1;
        }

        let valid = node == self.k;
        if !valid {
            debug!(q = signature.q, "LMS root mismatch");
        }
        valid
    }

    pub fn encoded_len(&self) -> usize {
        self.lms.params().public_key_len()
    }

    pub(crate) fn write_to(&self, out: &mut Vec<u8>) {
        put_u32(out, self.lms.type_id());
        put_u32(out, self.lmots.type_id());
        out.extend_from_slice(&self.id);
        out.extend_from_slice(&self.k);
    }

    /// `lmsType(4) || lmotsType(4) || I(16) || K(m)`
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        self.write_to(&mut out);
        out
    }

    pub(crate) fn read(reader: &mut Reader<'_>) -> Result<Self> {
        let lms = reader.lms_type()?;
        let lmots = reader.lmots_type()?;
        check_pairing(lms, lmots).map_err(|e| LmsError::Format(e.to_string()))?;
        let id = reader.array::<ID_LEN>()?;
        let k = reader.bytes(lms.params().m)?.to_vec();
        Ok(Self { lms, lmots, id, k })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(bytes, "LMS public key");
        let key = Self::read(&mut reader)?;
        reader.finish()?;
        Ok(key)
    }
}

/// LMS signature `{q, LM-OTS signature, lmsType, path}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LmsSignature {
    q: u32,
    ots: LmotsSignature,
    lms: LmsAlgorithm,
    path: Vec<u8>,
}

impl LmsSignature {
    pub fn q(&self) -> u32 {
        self.q
    }

    pub fn lms(&self) -> LmsAlgorithm {
        self.lms
    }

    pub fn lmots_signature(&self) -> &LmotsSignature {
        &self.ots
    }

    /// Authentication path entry `i`, leaf level first
    pub fn path_node(&self, i: usize) -> &[u8] {
        let m = self.lms.params().m;
        &self.path[i * m..(i + 1) * m]
    }

    pub fn encoded_len(&self) -> usize {
        4 + self.ots.encoded_len() + 4 + self.path.len()
    }

    pub(crate) fn write_to(&self, out: &mut Vec<u8>) {
        put_u32(out, self.q);
        self.ots.write_to(out);
        put_u32(out, self.lms.type_id());
        out.extend_from_slice(&self.path);
    }

    /// `q(4) || lmots_signature || lmsType(4) || path(h * m)`
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        self.write_to(&mut out);
        out
    }

    pub(crate) fn read(reader: &mut Reader<'_>) -> Result<Self> {
        let q = reader.u32()?;
        let ots = LmotsSignature::read(reader)?;
        let lms = reader.lms_type()?;
        check_pairing(lms, ots.algorithm()).map_err(|e| LmsError::Format(e.to_string()))?;
        let params = lms.params();
        let path = reader.bytes(params.h as usize * params.m)?.to_vec();
        Ok(Self { q, ots, lms, path })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(bytes, "LMS signature");
        let signature = Self::read(&mut reader)?;
        reader.finish()?;
        Ok(signature)
    }
}
