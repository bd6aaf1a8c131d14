// Hierarchical signatures over a chain of LMS trees (RFC 8554 section 6)

use hss_types::{KeySummary, SignatureSummary};
use rand::{CryptoRng, RngCore};
use tracing::{debug, info, warn};

use crate::lms::codec::{put_u32, Reader};
use crate::lms::config::{HssConfig, LevelParams, MAX_LEVELS};
use crate::lms::error::{LmsError, Result};
use crate::lms::tree::{LmsPrivateKey, LmsPublicKey, LmsSignature};

fn check_levels(levels: u32, what: &str) -> Result<usize> {
    if levels == 0 || levels as usize > MAX_LEVELS {
        return Err(LmsError::Format(format!(
            "{what}: level count {levels} outside 1..={MAX_LEVELS}"
        )));
    }
    Ok(levels as usize)
}

/// HSS private key: one LMS private key per level, top first, plus the
/// linking signatures `sigs[i]` by level `i` over the public key of level
/// `i + 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HssPrivateKey {
    keys: Vec<LmsPrivateKey>,
    pubs: Vec<LmsPublicKey>,
    sigs: Vec<LmsSignature>,
}

impl HssPrivateKey {
    /// Generate every level top to bottom and link them
    pub fn generate<R: RngCore + CryptoRng>(config: &HssConfig, rng: &mut R) -> Result<Self> {
        config.validate()?;
        let top = config.levels[0];
        let root = LmsPrivateKey::generate(top.lms, top.lmots, rng)?;
        Self::from_root(config, root, rng)
    }

    /// Build a hierarchy under an existing level-0 LMS key. Lower levels are
    /// freshly generated.
    pub fn from_root<R: RngCore + CryptoRng>(
        config: &HssConfig,
        root: LmsPrivateKey,
        rng: &mut R,
    ) -> Result<Self> {
        config.validate()?;
        let top = config.levels[0];
        if root.lms() != top.lms || root.lmots() != top.lmots {
            return Err(LmsError::Parameter(format!(
                "root key is {}/{}, configuration expects {}/{}",
                root.lms(),
                root.lmots(),
                top.lms,
                top.lmots
            )));
        }

        let root_pub = root.public_key()?;
        let mut key = Self {
            keys: vec![root],
            pubs: vec![root_pub],
            sigs: Vec::with_capacity(config.depth() - 1),
        };
        for level in &config.levels[1..] {
            let child = LmsPrivateKey::generate(level.lms, level.lmots, rng)?;
            let child_pub = child.public_key()?;
            let parent = key.keys.len() - 1;
            let link = key.keys[parent].sign(&child_pub.to_bytes(), rng)?;
            key.keys.push(child);
            key.pubs.push(child_pub);
            key.sigs.push(link);
        }

        info!(
            levels = key.keys.len(),
            id = %hex::encode(key.pubs[0].id()),
            remaining = key.remaining(),
            "generated HSS key"
        );
        Ok(key)
    }

    /// Import the compact layout `L(4) || maxSignatures(4) || lms_private_0`;
    /// every level reuses the root's parameter pairing.
    pub fn from_compact<R: RngCore + CryptoRng>(bytes: &[u8], rng: &mut R) -> Result<Self> {
        let mut reader = Reader::new(bytes, "compact HSS private key");
        let levels = check_levels(reader.u32()?, "compact HSS private key")?;
        let max_signatures = reader.u32()?;
        let root = LmsPrivateKey::read(&mut reader)?;
        reader.finish()?;

        debug!(levels, max_signatures, "importing compact HSS private key");
        let level = LevelParams::new(root.lms(), root.lmots())?;
        let config = HssConfig::new(vec![level; levels])?;
        Self::from_root(&config, root, rng)
    }

    pub fn levels(&self) -> usize {
        self.keys.len()
    }

    pub fn level_keys(&self) -> &[LmsPrivateKey] {
        &self.keys
    }

    pub fn config(&self) -> HssConfig {
        HssConfig {
            levels: self
                .keys
                .iter()
                .map(|k| LevelParams {
                    lms: k.lms(),
                    lmots: k.lmots(),
                })
                .collect(),
        }
    }

    pub fn public_key(&self) -> HssPublicKey {
        HssPublicKey {
            levels: self.keys.len() as u32,
            root: self.pubs[0].clone(),
        }
    }

    /// Signatures left, counting every future regeneration of lower levels.
    /// Saturates at `u64::MAX`.
    pub fn remaining(&self) -> u64 {
        let mut total = 0u64;
        let mut scale = 1u64;
        for key in self.keys.iter().rev() {
            total = total.saturating_add(key.remaining().saturating_mul(scale));
            scale = scale.saturating_mul(1u64 << key.lms().params().h);
        }
        total
    }

    pub fn is_exhausted(&self) -> bool {
        self.keys.iter().all(LmsPrivateKey::is_exhausted)
    }

    /// Sign with the bottom tree, first regenerating any exhausted levels
    ///
    /// Postconditions:
    /// - Returns Err(State) if every level is exhausted; key unchanged
    /// - Otherwise remaining() decreases by exactly one
    ///
    /// Invariants:
    /// - At most L - 1 levels are regenerated per call
    pub fn sign<R: RngCore + CryptoRng>(
        &mut self,
        message: &[u8],
        rng: &mut R,
    ) -> Result<HssSignature> {
        let depth = self.keys.len();
        let active = match (0..depth).rev().find(|&i| !self.keys[i].is_exhausted()) {
            Some(level) => level,
            None => {
                warn!(id = %hex::encode(self.pubs[0].id()), "HSS key exhausted");
                return Err(LmsError::State("HSS private key is exhausted".to_string()));
            }
        };

        // Levels below `active` are rebuilt on copies and committed only once
        // the bottom signature exists
        let mut keys = self.keys[active..].to_vec();
        let mut pubs = self.pubs[active..].to_vec();
        let mut sigs = self.sigs[active..].to_vec();
        for level in 1..keys.len() {
            let (lms, lmots) = (keys[level].lms(), keys[level].lmots());
            info!(level = active + level, "regenerating exhausted LMS subtree");
            let child = LmsPrivateKey::generate(lms, lmots, rng)?;
            let child_pub = child.public_key()?;
            sigs[level - 1] = keys[level - 1].sign(&child_pub.to_bytes(), rng)?;
            keys[level] = child;
            pubs[level] = child_pub;
        }
        let last = keys.len() - 1;
        let bottom = keys[last].sign(message, rng)?;

        self.keys.truncate(active);
        self.keys.extend(keys);
        self.pubs.truncate(active);
        self.pubs.extend(pubs);
        self.sigs.truncate(active);
        self.sigs.extend(sigs);

        Ok(HssSignature {
            links: self
                .sigs
                .iter()
                .cloned()
                .zip(self.pubs[1..].iter().cloned())
                .collect(),
            bottom,
        })
    }

    /// `L(4) || lms_private_0..L-1 || lms_sig_0..L-2`
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        put_u32(&mut out, self.keys.len() as u32);
        for key in &self.keys {
            key.write_to(&mut out);
        }
        for sig in &self.sigs {
            sig.write_to(&mut out);
        }
        out
    }

    /// Load persisted state. Public keys are recomputed and every linking
    /// signature is checked against them.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let what = "HSS private key";
        let mut reader = Reader::new(bytes, what);
        let levels = check_levels(reader.u32()?, what)?;
        let keys = (0..levels)
            .map(|_| LmsPrivateKey::read(&mut reader))
            .collect::<Result<Vec<_>>>()?;
        let sigs = (1..levels)
            .map(|_| LmsSignature::read(&mut reader))
            .collect::<Result<Vec<_>>>()?;
        reader.finish()?;

        for (i, (key, sig)) in keys.iter().zip(&sigs).enumerate() {
            if key.q() == 0 {
                return Err(LmsError::Format(format!(
                    "{what}: level {i} has never signed the level below"
                )));
            }
            if sig.q() != key.q() - 1 {
                return Err(LmsError::Format(format!(
                    "{what}: level {i} link uses leaf {} but counter is {}",
                    sig.q(),
                    key.q()
                )));
            }
        }

        let pubs = keys
            .iter()
            .map(LmsPrivateKey::public_key)
            .collect::<Result<Vec<_>>>()?;
        for (i, sig) in sigs.iter().enumerate() {
            if !pubs[i].verify(&pubs[i + 1].to_bytes(), sig) {
                return Err(LmsError::Format(format!(
                    "{what}: link between levels {i} and {} does not verify",
                    i + 1
                )));
            }
        }

        Ok(Self { keys, pubs, sigs })
    }

    pub fn summary(&self) -> KeySummary {
        KeySummary {
            kind: "private".to_string(),
            levels: self.keys.len() as u32,
            identifier: hex::encode(self.pubs[0].id()),
            root: hex::encode(self.pubs[0].k()),
            parameters: self.config().levels.iter().map(LevelParams::summary).collect(),
            leaf_indices: self.keys.iter().map(LmsPrivateKey::q).collect(),
            remaining: Some(self.remaining()),
        }
    }

    #[cfg(test)]
    pub(crate) fn skip_level_to(&mut self, level: usize, q: u32) {
        self.keys[level].skip_to(q);
    }
}

/// HSS public key `{L, level-0 LMS public key}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HssPublicKey {
    levels: u32,
    root: LmsPublicKey,
}

impl HssPublicKey {
    pub fn levels(&self) -> u32 {
        self.levels
    }

    pub fn root(&self) -> &LmsPublicKey {
        &self.root
    }

    /// Walk the chain from the trusted root down to the message signature.
    /// Returns false on any mismatch.
    pub fn verify(&self, message: &[u8], signature: &HssSignature) -> bool {
        if signature.levels() != self.levels as usize {
            debug!(
                expected = self.levels,
                got = signature.levels(),
                "HSS signature level count mismatch"
            );
            return false;
        }
        let mut current = &self.root;
        for (i, (link, next)) in signature.links.iter().enumerate() {
            if !current.verify(&next.to_bytes(), link) {
                debug!(level = i, "HSS linking signature rejected");
                return false;
            }
            current = next;
        }
        current.verify(message, &signature.bottom)
    }

    /// Parse and verify an encoded signature; malformed input is invalid
    pub fn verify_bytes(&self, message: &[u8], signature: &[u8]) -> bool {
        match HssSignature::from_bytes(signature) {
            Ok(sig) => self.verify(message, &sig),
            Err(e) => {
                debug!(error = %e, "HSS signature failed to parse");
                false
            }
        }
    }

    /// `L(4) || lms_public_key`
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + self.root.encoded_len());
        put_u32(&mut out, self.levels);
        self.root.write_to(&mut out);
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let what = "HSS public key";
        let mut reader = Reader::new(bytes, what);
        let levels = check_levels(reader.u32()?, what)? as u32;
        let root = LmsPublicKey::read(&mut reader)?;
        reader.finish()?;
        Ok(Self { levels, root })
    }

    pub fn summary(&self) -> KeySummary {
        KeySummary {
            kind: "public".to_string(),
            levels: self.levels,
            identifier: hex::encode(self.root.id()),
            root: hex::encode(self.root.k()),
            parameters: vec![LevelParams {
                lms: self.root.lms(),
                lmots: self.root.lmots(),
            }
            .summary()],
            leaf_indices: Vec::new(),
            remaining: None,
        }
    }
}

/// HSS signature: `(signature, signed public key)` pairs for the upper
/// levels followed by the bottom-level signature over the message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HssSignature {
    links: Vec<(LmsSignature, LmsPublicKey)>,
    bottom: LmsSignature,
}

impl HssSignature {
    pub fn levels(&self) -> usize {
        self.links.len() + 1
    }

    pub fn links(&self) -> &[(LmsSignature, LmsPublicKey)] {
        &self.links
    }

    pub fn bottom(&self) -> &LmsSignature {
        &self.bottom
    }

    /// Leaf index used at each level, top first
    pub fn leaf_indices(&self) -> Vec<u32> {
        self.links
            .iter()
            .map(|(sig, _)| sig.q())
            .chain(std::iter::once(self.bottom.q()))
            .collect()
    }

    pub fn encoded_len(&self) -> usize {
        4 + self
            .links
            .iter()
            .map(|(sig, public)| sig.encoded_len() + public.encoded_len())
            .sum::<usize>()
            + self.bottom.encoded_len()
    }

    /// `Nspk(4) || lms_sig_0 || lms_pub_1 || ... || lms_sig_{L-1}`
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        put_u32(&mut out, self.links.len() as u32);
        for (sig, public) in &self.links {
            sig.write_to(&mut out);
            public.write_to(&mut out);
        }
        self.bottom.write_to(&mut out);
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let what = "HSS signature";
        let mut reader = Reader::new(bytes, what);
        let signed_keys = reader.u32()?;
        if signed_keys as usize >= MAX_LEVELS {
            return Err(LmsError::Format(format!(
                "{what}: {signed_keys} signed public keys exceeds {}",
                MAX_LEVELS - 1
            )));
        }
        let mut links = Vec::with_capacity(signed_keys as usize);
        for _ in 0..signed_keys {
            let sig = LmsSignature::read(&mut reader)?;
            let public = LmsPublicKey::read(&mut reader)?;
            links.push((sig, public));
        }
        let bottom = LmsSignature::read(&mut reader)?;
        reader.finish()?;

        // Each signed public key must carry the types of the signature it certifies
        let next_sigs = links.iter().skip(1).map(|(sig, _)| sig).chain([&bottom]);
        for (level, ((_, public), next)) in links.iter().zip(next_sigs).enumerate() {
            let signed = (next.lms(), next.lmots_signature().algorithm());
            if (public.lms(), public.lmots()) != signed {
                return Err(LmsError::Format(format!(
                    "{what}: level {} public key is {}/{} but its signature is {}/{}",
                    level + 1,
                    public.lms(),
                    public.lmots(),
                    signed.0,
                    signed.1
                )));
            }
        }
        Ok(Self { links, bottom })
    }

    pub fn summary(&self) -> SignatureSummary {
        let sigs = self
            .links
            .iter()
            .map(|(sig, _)| sig)
            .chain(std::iter::once(&self.bottom));
        let (lms_types, lmots_types) = sigs
            .map(|sig| (sig.lms().type_id(), sig.lmots_signature().algorithm().type_id()))
            .unzip();
        SignatureSummary {
            levels: self.levels() as u32,
            leaf_indices: self.leaf_indices(),
            lms_types,
            lmots_types,
            size_bytes: self.encoded_len(),
        }
    }
}
