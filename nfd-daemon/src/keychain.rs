//! Security-key store of a session.
//!
//! Lives under `$HOME/.ndn`, which is why the session sets `HOME` before anything touches
//! disk. Holds the default identity key; the key id is the SHA-256 of its public key.

use std::fs;
use std::path::{Path, PathBuf};

use ed25519_dalek::SigningKey;
use nfd_core::{nfd_log_info, nfd_log_init, Error, Result};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

nfd_log_init!("KeyChain");

const STORE_DIR: &str = ".ndn";
const DEFAULT_KEY_FILE: &str = "default.key";

/// The session's key store with its default signing key loaded.
pub struct KeyChain {
    dir: PathBuf,
    signing_key: SigningKey,
}

impl KeyChain {
    /// Open the store under the current `HOME`.
    pub fn open() -> Result<Self> {
        let Some(home) = std::env::var_os("HOME") else {
            return Err(Error::subsystem_init("HOME is not set"));
        };
        Self::open_in(Path::new(&home))
    }

    /// Open (creating if needed) the store under `home`.
    pub fn open_in(home: &Path) -> Result<Self> {
        let dir = home.join(STORE_DIR);
        fs::create_dir_all(&dir).map_err(|e| store_error(&dir, e))?;

        let key_path = dir.join(DEFAULT_KEY_FILE);
        let signing_key = if key_path.exists() {
            load_key(&key_path)?
        } else {
            let key = SigningKey::generate(&mut OsRng);
            save_key(&key_path, &key)?;
            nfd_log_info!("generated default identity key in {}", dir.display());
            key
        };

        Ok(Self { dir, signing_key })
    }

    /// Directory holding the key files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Hex of the default public key.
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.signing_key.verifying_key().to_bytes())
    }

    /// Hex SHA-256 of the default public key.
    pub fn key_id(&self) -> String {
        let digest = Sha256::digest(self.signing_key.verifying_key().to_bytes());
        hex::encode(digest)
    }
}

impl std::fmt::Debug for KeyChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyChain")
            .field("dir", &self.dir)
            .field("key_id", &self.key_id())
            .finish()
    }
}

fn store_error(path: &Path, e: impl std::fmt::Display) -> Error {
    Error::subsystem_init(format!("key store {}: {e}", path.display()))
}

fn load_key(path: &Path) -> Result<SigningKey> {
    let text = fs::read_to_string(path).map_err(|e| store_error(path, e))?;
    let bytes = hex::decode(text.trim()).map_err(|e| store_error(path, e))?;
    let Ok(seed) = <[u8; 32]>::try_from(bytes) else {
        return Err(store_error(path, "seed must be 32 bytes"));
    };
    Ok(SigningKey::from_bytes(&seed))
}

fn save_key(path: &Path, key: &SigningKey) -> Result<()> {
    let text = hex::encode(key.to_bytes());
    fs::write(path, text).map_err(|e| store_error(path, e))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
            .map_err(|e| store_error(path, e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_init_failure(result: Result<KeyChain>) -> bool {
        matches!(result, Err(Error::SubsystemInit(_)))
    }

    #[test]
    fn creates_then_reloads_same_key() {
        let home = tempfile::tempdir().unwrap();
        let first = KeyChain::open_in(home.path()).unwrap();
        assert!(first.dir().join(DEFAULT_KEY_FILE).exists());
        assert_eq!(first.key_id().len(), 64);

        let second = KeyChain::open_in(home.path()).unwrap();
        assert_eq!(first.public_key_hex(), second.public_key_hex());
        assert_eq!(first.key_id(), second.key_id());
    }

    #[test]
    fn corrupt_key_is_init_failure() {
        let home = tempfile::tempdir().unwrap();
        let dir = home.path().join(STORE_DIR);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(DEFAULT_KEY_FILE), "not hex").unwrap();
        assert!(is_init_failure(KeyChain::open_in(home.path())));

        fs::write(dir.join(DEFAULT_KEY_FILE), "abcd").unwrap();
        assert!(is_init_failure(KeyChain::open_in(home.path())));
    }

    #[test]
    fn unusable_home_is_init_failure() {
        let home = tempfile::tempdir().unwrap();
        let file = home.path().join("plain-file");
        fs::write(&file, "x").unwrap();
        assert!(is_init_failure(KeyChain::open_in(&file)));
    }
}
