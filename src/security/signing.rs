use crate::config::SigningConfig;
use crate::error::SigningError;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use zeroize::{Zeroize, ZeroizeOnDrop};

type HmacSha256 = Hmac<Sha256>;

/// Minimum accepted key length in bytes.
pub const MIN_KEY_LEN: usize = 32;

/// Process-held HMAC key. Loaded once at startup and never mutated; the
/// buffer is wiped on drop and never printed.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SigningKey {
    bytes: Vec<u8>,
}

impl SigningKey {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, SigningError> {
        if bytes.len() < MIN_KEY_LEN {
            let len = bytes.len();
            let mut bytes = bytes;
            bytes.zeroize();
            return Err(SigningError::InvalidKey(format!(
                "key has {len} bytes (minimum {MIN_KEY_LEN})"
            )));
        }
        Ok(Self { bytes })
    }

    pub fn from_hex(hex_key: &str) -> Result<Self, SigningError> {
        let bytes = hex::decode(hex_key.trim())
            .map_err(|_| SigningError::InvalidKey("key is not valid hex".into()))?;
        Self::from_bytes(bytes)
    }

    pub fn generate() -> Self {
        use rand::RngCore;
        let mut bytes = vec![0u8; MIN_KEY_LEN];
        rand::rng().fill_bytes(&mut bytes);
        Self { bytes }
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    /// Short public fingerprint for logs; reveals nothing about the key.
    pub fn key_id(&self) -> String {
        let digest = Sha256::digest(&self.bytes);
        hex::encode(&digest[..6])
    }

    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>, SigningError> {
        let mut mac = HmacSha256::new_from_slice(&self.bytes)
            .map_err(|e| SigningError::Sign(e.to_string()))?;
        mac.update(message);
        Ok(mac.finalize().into_bytes().to_vec())
    }

    /// Constant-time signature check.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> bool {
        let Ok(mut mac) = HmacSha256::new_from_slice(&self.bytes) else {
            return false;
        };
        mac.update(message);
        mac.verify_slice(signature).is_ok()
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("key_id", &self.key_id())
            .finish_non_exhaustive()
    }
}

/// Resolve the signing key from config: env var first, then key file.
///
/// `Ok(None)` means no key is configured; the process still starts and
/// every issuance attempt fails with a retryable [`SigningError`].
pub fn load_signing_key(config: &SigningConfig) -> Result<Option<SigningKey>, SigningError> {
    if let Ok(hex_key) = std::env::var(&config.key_env)
        && !hex_key.trim().is_empty()
    {
        tracing::debug!(env = %config.key_env, "signing key loaded from environment");
        return SigningKey::from_hex(&hex_key).map(Some);
    }

    let Some(raw_path) = config.key_file.as_deref().filter(|p| !p.trim().is_empty()) else {
        return Ok(None);
    };
    let path = PathBuf::from(shellexpand::tilde(raw_path).as_ref());

    if path.exists() {
        enforce_key_permissions(&path)?;
        return read_key_file(&path).map(Some);
    }

    if !config.generate_if_missing {
        return Ok(None);
    }

    let key = SigningKey::generate();
    match write_new_key_file(&path, &key) {
        Ok(()) => {
            tracing::info!(path = %path.display(), key_id = %key.key_id(), "generated new signing key");
            Ok(Some(key))
        }
        Err(WriteKeyError::AlreadyExists) => {
            enforce_key_permissions(&path)?;
            read_key_file(&path).map(Some)
        }
        Err(WriteKeyError::Failed(message)) => Err(SigningError::KeyUnavailable(message)),
    }
}

fn read_key_file(path: &Path) -> Result<SigningKey, SigningError> {
    let mut hex_key = fs::read_to_string(path).map_err(|e| {
        SigningError::KeyUnavailable(format!("failed to read key file {}: {e}", path.display()))
    })?;
    let key = SigningKey::from_hex(&hex_key);
    hex_key.zeroize();
    key
}

enum WriteKeyError {
    AlreadyExists,
    Failed(String),
}

fn write_new_key_file(path: &Path, key: &SigningKey) -> Result<(), WriteKeyError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| WriteKeyError::Failed(format!("failed to create key dir: {e}")))?;
    }

    let mut encoded = key.to_hex();

    #[cfg(unix)]
    let result = {
        use std::os::unix::fs::OpenOptionsExt;

        fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut file| {
                file.write_all(encoded.as_bytes())?;
                file.sync_all()
            })
    };

    #[cfg(not(unix))]
    let result = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .and_then(|mut file| file.write_all(encoded.as_bytes()));

    encoded.zeroize();

    match result {
        Ok(()) => enforce_key_permissions(path)
            .map_err(|e| WriteKeyError::Failed(e.to_string())),
        Err(error) if error.kind() == std::io::ErrorKind::AlreadyExists => {
            Err(WriteKeyError::AlreadyExists)
        }
        Err(error) => Err(WriteKeyError::Failed(format!(
            "failed to write key file: {error}"
        ))),
    }
}

fn enforce_key_permissions(path: &Path) -> Result<(), SigningError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(|e| {
            SigningError::KeyUnavailable(format!("failed to set key file permissions: {e}"))
        })?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TEST_KEY_HEX: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

    fn config_with_file(path: &Path, generate: bool) -> SigningConfig {
        SigningConfig {
            key_env: "LOCKGATE_TEST_UNSET_SIGNING_KEY".into(),
            key_file: Some(path.display().to_string()),
            generate_if_missing: generate,
        }
    }

    #[test]
    fn short_keys_are_rejected() {
        let err = SigningKey::from_hex("abcd").unwrap_err();
        assert!(err.to_string().contains("minimum 32"));
    }

    #[test]
    fn non_hex_keys_are_rejected() {
        assert!(SigningKey::from_hex("not-hex").is_err());
    }

    #[test]
    fn sign_then_verify_detects_mutation() {
        let key = SigningKey::from_hex(TEST_KEY_HEX).unwrap();
        let sig = key.sign(b"subject").unwrap();
        assert_eq!(sig.len(), 32);
        assert!(key.verify(b"subject", &sig));
        assert!(!key.verify(b"subjecT", &sig));
    }

    #[test]
    fn different_keys_disagree() {
        let a = SigningKey::from_hex(TEST_KEY_HEX).unwrap();
        let b = SigningKey::generate();
        let sig = a.sign(b"msg").unwrap();
        assert!(!b.verify(b"msg", &sig));
    }

    #[test]
    fn debug_output_hides_key_bytes() {
        let key = SigningKey::from_hex(TEST_KEY_HEX).unwrap();
        let rendered = format!("{key:?}");
        assert!(!rendered.contains(TEST_KEY_HEX));
        assert!(rendered.contains(&key.key_id()));
    }

    #[test]
    fn missing_key_file_without_generation_is_none() {
        let dir = TempDir::new().unwrap();
        let config = config_with_file(&dir.path().join("signing.key"), false);
        assert!(load_signing_key(&config).unwrap().is_none());
    }

    #[test]
    fn generated_key_file_is_reloaded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("keys").join("signing.key");
        let config = config_with_file(&path, true);

        let first = load_signing_key(&config).unwrap().unwrap();
        let second = load_signing_key(&config).unwrap().unwrap();
        assert_eq!(first.key_id(), second.key_id());
    }

    #[cfg(unix)]
    #[test]
    fn generated_key_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("signing.key");
        load_signing_key(&config_with_file(&path, true)).unwrap();

        let metadata = std::fs::metadata(&path).unwrap();
        assert_eq!(metadata.permissions().mode() & 0o777, 0o600);
    }

    #[test]
    fn corrupt_key_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("signing.key");
        std::fs::write(&path, "zz").unwrap();
        assert!(load_signing_key(&config_with_file(&path, false)).is_err());
    }
}
