// Persisted signing: state stores and the atomic HSS signer

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use hss_types::KeySummary;
use rand::{CryptoRng, RngCore};
use tracing::{debug, info, warn};

use crate::lms::config::HssConfig;
use crate::lms::error::{LmsError, Result};
use crate::lms::hss::{HssPrivateKey, HssPublicKey, HssSignature};

/// Storage for one serialized private key state
pub trait StateStore: Send + Sync {
    fn load(&self) -> Result<Vec<u8>>;

    /// Durably replace the stored state. Must not return Ok until the new
    /// state would survive a crash.
    fn save(&self, state: &[u8]) -> Result<()>;
}

/// File-backed store using write-to-temp, fsync, rename
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

/// Flush the directory entry so a completed rename survives a crash
#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::File::open(dir)
        .and_then(|d| d.sync_all())
        .map_err(|e| LmsError::Persistence(format!("failed to sync {}: {e}", dir.display())))
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) -> Result<()> {
    Ok(())
}

impl StateStore for FileStore {
    fn load(&self) -> Result<Vec<u8>> {
        fs::read(&self.path).map_err(|e| {
            LmsError::Persistence(format!("failed to read {}: {e}", self.path.display()))
        })
    }

    fn save(&self, state: &[u8]) -> Result<()> {
        let temp_path = self.temp_path();
        let mut file = fs::File::create(&temp_path).map_err(|e| {
            LmsError::Persistence(format!("failed to create {}: {e}", temp_path.display()))
        })?;
        file.write_all(state)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp_path, &self.path).map_err(|e| {
            LmsError::Persistence(format!(
                "failed to replace {}: {e}",
                self.path.display()
            ))
        })?;
        sync_parent_dir(&self.path)?;
        debug!(path = %self.path.display(), bytes = state.len(), "persisted key state");
        Ok(())
    }
}

/// In-process store
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<Option<Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: Vec<u8>) -> Self {
        Self {
            state: Mutex::new(Some(state)),
        }
    }

    /// Copy of the last saved state
    pub fn snapshot(&self) -> Option<Vec<u8>> {
        self.state.lock().ok().and_then(|s| s.clone())
    }
}

impl StateStore for MemoryStore {
    fn load(&self) -> Result<Vec<u8>> {
        let state = self
            .state
            .lock()
            .map_err(|_| LmsError::Persistence("memory store lock poisoned".to_string()))?;
        state
            .clone()
            .ok_or_else(|| LmsError::Persistence("memory store is empty".to_string()))
    }

    fn save(&self, bytes: &[u8]) -> Result<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| LmsError::Persistence("memory store lock poisoned".to_string()))?;
        *state = Some(bytes.to_vec());
        Ok(())
    }
}

/// HSS private key bound to a state store
///
/// Every signature is one critical section: the advanced state is saved
/// before the signature is released, and a failed save leaves both the
/// in-memory key and the store at their previous state.
pub struct HssSigner<S: StateStore> {
    store: S,
    key: Mutex<HssPrivateKey>,
}

impl<S: StateStore> HssSigner<S> {
    /// Generate a new key and persist it before returning
    pub fn create<R: RngCore + CryptoRng>(
        store: S,
        config: &HssConfig,
        rng: &mut R,
    ) -> Result<Self> {
        let key = HssPrivateKey::generate(config, rng)?;
        Self::import(store, key)
    }

    /// Take ownership of an existing key, persisting it first
    pub fn import(store: S, key: HssPrivateKey) -> Result<Self> {
        store.save(&key.to_bytes()).map_err(into_persistence)?;
        info!(remaining = key.remaining(), "HSS signer ready");
        Ok(Self {
            store,
            key: Mutex::new(key),
        })
    }

    /// Load a previously persisted key
    pub fn open(store: S) -> Result<Self> {
        let bytes = store.load().map_err(into_persistence)?;
        let key = HssPrivateKey::from_bytes(&bytes)?;
        debug!(remaining = key.remaining(), "HSS signer opened");
        Ok(Self {
            store,
            key: Mutex::new(key),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, HssPrivateKey>> {
        self.key
            .lock()
            .map_err(|_| LmsError::Persistence("signer state lock poisoned".to_string()))
    }

    /// Sign and persist atomically
    ///
    /// Postconditions:
    /// - On Ok, the stored state has already advanced past the returned
    ///   signature's leaves
    /// - On Err, neither the in-memory key nor the store has changed
    pub fn sign<R: RngCore + CryptoRng>(
        &self,
        message: &[u8],
        rng: &mut R,
    ) -> Result<HssSignature> {
        let mut guard = self.lock()?;
        let mut next = guard.clone();
        let signature = next.sign(message, rng)?;

        if let Err(e) = self.store.save(&next.to_bytes()) {
            warn!(error = %e, "failed to persist HSS state; signature withheld");
            return Err(into_persistence(e));
        }
        *guard = next;
        Ok(signature)
    }

    pub fn public_key(&self) -> Result<HssPublicKey> {
        Ok(self.lock()?.public_key())
    }

    pub fn remaining(&self) -> Result<u64> {
        Ok(self.lock()?.remaining())
    }

    pub fn is_exhausted(&self) -> Result<bool> {
        Ok(self.lock()?.is_exhausted())
    }

    pub fn summary(&self) -> Result<KeySummary> {
        Ok(self.lock()?.summary())
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

fn into_persistence(err: LmsError) -> LmsError {
    match err {
        LmsError::Persistence(_) => err,
        other => LmsError::Persistence(other.to_string()),
    }
}
