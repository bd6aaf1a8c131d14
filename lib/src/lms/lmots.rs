// LM-OTS one-time signatures (RFC 8554 section 4)

use std::fmt;

use rand::{CryptoRng, RngCore};
use tracing::debug;
use zeroize::Zeroizing;

use crate::lms::codec::{put_u32, Reader};
use crate::lms::config::{LmotsAlgorithm, LmotsParams, ID_LEN};
use crate::lms::error::{LmsError, Result};
use crate::lms::hash::{Hasher, D_MESG, D_PBLC, SEED_MARKER};

/// Extract the `i`-th `w`-bit coefficient of `s`, most significant first
pub fn coefficient(s: &[u8], i: usize, w: usize) -> usize {
    let mask = (1usize << w) - 1;
    let per_byte = 8 / w;
    let shift = 8 - (w * (i % per_byte) + w);
    (usize::from(s[i * w / 8]) >> shift) & mask
}

/// Winternitz checksum of `x`: sum of `2^w - 1 - coef` over every `w`-bit
/// coefficient, shifted left by `ls`.
pub fn checksum(x: &[u8], w: usize, ls: u32) -> u16 {
    let max = (1usize << w) - 1;
    let count = x.len() * 8 / w;
    let sum: usize = (0..count).map(|i| max - coefficient(x, i, w)).sum();
    (sum << ls) as u16
}

/// Advance a hash chain from step `start` up to (not including) `end`
fn iterate_chain(
    params: &LmotsParams,
    id: &[u8; ID_LEN],
    q: u32,
    i: usize,
    start: usize,
    end: usize,
    tmp: &mut [u8],
) {
    let mut prefix = Hasher::with_prefix(params.hash, id, q);
    prefix.update(&(i as u16).to_be_bytes());
    for j in start..end {
        let mut hasher = prefix.clone();
        hasher.update(&[j as u8]).update(tmp);
        hasher.finalize_into(tmp);
    }
}

/// `Q || u16(checksum(Q))`, the source of the chain lengths
fn message_coefficients(
    params: &LmotsParams,
    id: &[u8; ID_LEN],
    q: u32,
    c: &[u8],
    message: &[u8],
) -> Vec<u8> {
    let mut hasher = Hasher::with_prefix(params.hash, id, q);
    hasher.update(&D_MESG).update(c).update(message);
    let mut digest = hasher.finalize_vec(params.n);
    let cksm = checksum(&digest, params.w, params.ls);
    digest.extend_from_slice(&cksm.to_be_bytes());
    digest
}

/// Compress the chain endpoints into the public value `K`
fn public_value<'a>(
    params: &LmotsParams,
    id: &[u8; ID_LEN],
    q: u32,
    ends: impl Iterator<Item = &'a [u8]>,
) -> Vec<u8> {
    let mut hasher = Hasher::with_prefix(params.hash, id, q);
    hasher.update(&D_PBLC);
    for end in ends {
        hasher.update(end);
    }
    hasher.finalize_vec(params.n)
}

/// LM-OTS private key, usable for exactly one signature
#[derive(Clone)]
pub struct LmotsPrivateKey {
    algorithm: LmotsAlgorithm,
    id: [u8; ID_LEN],
    q: u32,
    seed: Zeroizing<Vec<u8>>,
    used: bool,
}

impl LmotsPrivateKey {
    /// Build a key from a supplied identifier, leaf index and seed
    ///
    /// Preconditions:
    /// - seed.len() == n for the algorithm
    pub fn new(algorithm: LmotsAlgorithm, id: [u8; ID_LEN], q: u32, seed: &[u8]) -> Result<Self> {
        let params = algorithm.params();
        if seed.len() != params.n {
            return Err(LmsError::Parameter(format!(
                "{algorithm} needs a {}-byte seed, got {}",
                params.n,
                seed.len()
            )));
        }
        Ok(Self {
            algorithm,
            id,
            q,
            seed: Zeroizing::new(seed.to_vec()),
            used: false,
        })
    }

    /// Standalone key with random `I` and `SEED` at leaf index 0
    pub fn generate<R: RngCore + CryptoRng>(algorithm: LmotsAlgorithm, rng: &mut R) -> Self {
        let mut id = [0u8; ID_LEN];
        rng.fill_bytes(&mut id);
        let mut seed = Zeroizing::new(vec![0u8; algorithm.params().n]);
        rng.fill_bytes(&mut seed);
        Self {
            algorithm,
            id,
            q: 0,
            seed,
            used: false,
        }
    }

    pub fn algorithm(&self) -> LmotsAlgorithm {
        self.algorithm
    }

    pub fn id(&self) -> &[u8; ID_LEN] {
        &self.id
    }

    pub fn q(&self) -> u32 {
        self.q
    }

    pub fn is_used(&self) -> bool {
        self.used
    }

    pub fn remaining(&self) -> u64 {
        if self.used {
            0
        } else {
            1
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.used
    }

    /// `x[i] = H(I || u32(q) || u16(i) || 0xff || SEED)`
    fn secret_element(&self, params: &LmotsParams, i: usize) -> Zeroizing<Vec<u8>> {
        let mut hasher = Hasher::with_prefix(params.hash, &self.id, self.q);
        hasher
            .update(&(i as u16).to_be_bytes())
            .update(&[SEED_MARKER])
            .update(&self.seed);
        Zeroizing::new(hasher.finalize_vec(params.n))
    }

    /// Public value `K` for this key
    pub fn public_value(&self) -> Vec<u8> {
        let params = self.algorithm.params();
        let max = params.max_coefficient();
        let ends: Vec<Vec<u8>> = (0..params.p)
            .map(|i| {
                let mut tmp = self.secret_element(&params, i);
                iterate_chain(&params, &self.id, self.q, i, 0, max, &mut tmp);
                tmp.to_vec()
            })
            .collect();
        public_value(&params, &self.id, self.q, ends.iter().map(Vec::as_slice))
    }

    pub fn public_key(&self) -> LmotsPublicKey {
        LmotsPublicKey {
            algorithm: self.algorithm,
            id: self.id,
            q: self.q,
            k: self.public_value(),
        }
    }

    /// Sign a message, consuming this one-time key
    ///
    /// Postconditions:
    /// - Returns Err(State) without signing if the key was already used
    /// - Otherwise the key is marked used before the signature is returned
    pub fn sign<R: RngCore + CryptoRng>(
        &mut self,
        message: &[u8],
        rng: &mut R,
    ) -> Result<LmotsSignature> {
        if self.used {
            return Err(LmsError::State(format!(
                "LM-OTS private key for leaf {} already used",
                self.q
            )));
        }
        self.used = true;

        let params = self.algorithm.params();
        let mut c = vec![0u8; params.n];
        rng.fill_bytes(&mut c);

        let coefs = message_coefficients(&params, &self.id, self.q, &c, message);
        let mut y = Vec::with_capacity(params.p * params.n);
        for i in 0..params.p {
            let mut tmp = self.secret_element(&params, i);
            let a = coefficient(&coefs, i, params.w);
            iterate_chain(&params, &self.id, self.q, i, 0, a, &mut tmp);
            y.extend_from_slice(&tmp);
        }

        Ok(LmotsSignature {
            algorithm: self.algorithm,
            c,
            y,
        })
    }

    /// `typeId(4) || I(16) || q(4) || SEED(n) || used(1)`
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + ID_LEN + 4 + self.seed.len() + 1);
        put_u32(&mut out, self.algorithm.type_id());
        out.extend_from_slice(&self.id);
        put_u32(&mut out, self.q);
        out.extend_from_slice(&self.seed);
        out.push(u8::from(self.used));
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(bytes, "LM-OTS private key");
        let algorithm = reader.lmots_type()?;
        let id = reader.array::<ID_LEN>()?;
        let q = reader.u32()?;
        let seed = reader.bytes(algorithm.params().n)?;
        let used = match reader.u8()? {
            0 => false,
            1 => true,
            other => {
                return Err(LmsError::Format(format!(
                    "LM-OTS private key: invalid used flag {other}"
                )))
            }
        };
        reader.finish()?;
        let mut key = Self::new(algorithm, id, q, seed)?;
        key.used = used;
        Ok(key)
    }
}

impl fmt::Debug for LmotsPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LmotsPrivateKey")
            .field("algorithm", &self.algorithm)
            .field("id", &hex::encode(self.id))
            .field("q", &self.q)
            .field("seed", &"<redacted>")
            .field("used", &self.used)
            .finish()
    }
}

/// LM-OTS public key `{typeId, I, q, K}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LmotsPublicKey {
    algorithm: LmotsAlgorithm,
    id: [u8; ID_LEN],
    q: u32,
    k: Vec<u8>,
}

impl LmotsPublicKey {
    pub fn algorithm(&self) -> LmotsAlgorithm {
        self.algorithm
    }

    pub fn id(&self) -> &[u8; ID_LEN] {
        &self.id
    }

    pub fn q(&self) -> u32 {
        self.q
    }

    pub fn k(&self) -> &[u8] {
        &self.k
    }

    pub fn verify(&self, message: &[u8], signature: &LmotsSignature) -> bool {
        if signature.algorithm != self.algorithm {
            debug!(
                expected = %self.algorithm,
                got = %signature.algorithm,
                "LM-OTS signature type mismatch"
            );
            return false;
        }
        let candidate = signature.build_public(&self.id, self.q, message);
        let valid = candidate == self.k;
        if !valid {
            debug!(q = self.q, "LM-OTS public value mismatch");
        }
        valid
    }

    /// `typeId(4) || I(16) || q(4) || K(n)`
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.algorithm.params().public_key_len());
        put_u32(&mut out, self.algorithm.type_id());
        out.extend_from_slice(&self.id);
        put_u32(&mut out, self.q);
        out.extend_from_slice(&self.k);
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(bytes, "LM-OTS public key");
        let algorithm = reader.lmots_type()?;
        let id = reader.array::<ID_LEN>()?;
        let q = reader.u32()?;
        let k = reader.bytes(algorithm.params().n)?.to_vec();
        reader.finish()?;
        Ok(Self {
            algorithm,
            id,
            q,
            k,
        })
    }
}

/// LM-OTS signature `{typeId, C, y[0..p)}`; `y` is stored flat, `n` bytes
/// per chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LmotsSignature {
    algorithm: LmotsAlgorithm,
    c: Vec<u8>,
    y: Vec<u8>,
}

impl LmotsSignature {
    pub fn algorithm(&self) -> LmotsAlgorithm {
        self.algorithm
    }

    pub fn randomizer(&self) -> &[u8] {
        &self.c
    }

    /// Chain output `y[i]`
    pub fn chain(&self, i: usize) -> &[u8] {
        let n = self.c.len();
        &self.y[i * n..(i + 1) * n]
    }

    /// Recover the candidate public value `K'` for `(I, q, message)`
    pub fn build_public(&self, id: &[u8; ID_LEN], q: u32, message: &[u8]) -> Vec<u8> {
        let params = self.algorithm.params();
        let max = params.max_coefficient();
        let coefs = message_coefficients(&params, id, q, &self.c, message);
        let ends: Vec<Vec<u8>> = (0..params.p)
            .map(|i| {
                let mut tmp = self.chain(i).to_vec();
                let a = coefficient(&coefs, i, params.w);
                iterate_chain(&params, id, q, i, a, max, &mut tmp);
                tmp
            })
            .collect();
        public_value(&params, id, q, ends.iter().map(Vec::as_slice))
    }

    pub fn encoded_len(&self) -> usize {
        4 + self.c.len() + self.y.len()
    }

    pub(crate) fn write_to(&self, out: &mut Vec<u8>) {
        put_u32(out, self.algorithm.type_id());
        out.extend_from_slice(&self.c);
        out.extend_from_slice(&self.y);
    }

    /// `typeId(4) || C(n) || y[0](n) || ... || y[p-1](n)`
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        self.write_to(&mut out);
        out
    }

    pub(crate) fn read(reader: &mut Reader<'_>) -> Result<Self> {
        let algorithm = reader.lmots_type()?;
        let params = algorithm.params();
        let c = reader.bytes(params.n)?.to_vec();
        let y = reader.bytes(params.p * params.n)?.to_vec();
        Ok(Self { algorithm, c, y })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(bytes, "LM-OTS signature");
        let signature = Self::read(&mut reader)?;
        reader.finish()?;
        Ok(signature)
    }
}
