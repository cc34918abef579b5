//! Machine-bound credential sealing
//!
//! Remote server passwords are kept sealed at rest with AES-256-GCM. The key
//! comes from the machine identifier, so a database copied to another host
//! cannot reveal them. `POLYPHON_MACHINE_ID` replaces the detected identifier
//! (containers often have no `/etc/machine-id`).

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use anyhow::{Context, Result, anyhow, bail};
use base64::{Engine, engine::general_purpose::STANDARD as B64};
use sha2::{Digest, Sha256};

/// Marker in front of every sealed value
const SEALED_MARKER: &str = "sealed:v1:";

const ENV_MACHINE_ID: &str = "POLYPHON_MACHINE_ID";

const KEY_CONTEXT: &[u8] = b"polyphon/credential-key";
const NONCE_CONTEXT: &[u8] = b"polyphon/credential-nonce";
const NONCE_LEN: usize = 12;

fn machine_identity() -> Result<String> {
    let from_env = std::env::var(ENV_MACHINE_ID).unwrap_or_default();
    if !from_env.trim().is_empty() {
        return Ok(from_env.trim().to_owned());
    }

    let candidates: &[&str] = if cfg!(target_os = "linux") {
        &["/etc/machine-id", "/var/lib/dbus/machine-id"]
    } else if cfg!(target_os = "freebsd") {
        &["/etc/hostid"]
    } else {
        &[]
    };

    candidates
        .iter()
        .filter_map(|path| std::fs::read_to_string(path).ok())
        .map(|content| content.trim().to_owned())
        .find(|id| !id.is_empty())
        .ok_or_else(|| anyhow!("No machine identifier found (set {})", ENV_MACHINE_ID))
}

fn digest(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// AES-GCM cipher keyed for one machine
pub struct CredentialCipher {
    cipher: Aes256Gcm,
}

impl CredentialCipher {
    /// Cipher bound to the current machine
    pub fn for_machine() -> Result<Self> {
        Self::with_identity(&machine_identity()?)
    }

    /// Cipher bound to an explicit identity string
    pub fn with_identity(identity: &str) -> Result<Self> {
        let key = digest(&[identity.as_bytes(), KEY_CONTEXT]);
        let cipher = Aes256Gcm::new_from_slice(&key).map_err(|e| anyhow!("Invalid key: {}", e))?;
        Ok(Self { cipher })
    }

    /// Seals `secret` as `sealed:v1:BASE64(nonce || ciphertext)`
    ///
    /// The nonce is a digest of the secret: sealing the same secret twice
    /// gives the same text, so rewriting an unchanged record is a no-op.
    pub fn seal(&self, secret: &str) -> Result<String> {
        let nonce_seed = digest(&[secret.as_bytes(), NONCE_CONTEXT]);
        let nonce = &nonce_seed[..NONCE_LEN];

        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(nonce), secret.as_bytes())
            .map_err(|e| anyhow!("Sealing failed: {}", e))?;

        let payload = [nonce, ciphertext.as_slice()].concat();
        Ok(format!("{}{}", SEALED_MARKER, B64.encode(payload)))
    }

    /// Opens a value produced by [`CredentialCipher::seal`]
    pub fn open(&self, sealed: &str) -> Result<String> {
        let Some(encoded) = sealed.strip_prefix(SEALED_MARKER) else {
            bail!("Value is not sealed");
        };
        let payload = B64.decode(encoded).context("Sealed value is not base64")?;
        if payload.len() <= NONCE_LEN {
            bail!("Sealed value is truncated");
        }

        let (nonce, ciphertext) = payload.split_at(NONCE_LEN);
        let plain = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| anyhow!("Cannot open sealed value (other machine or corrupted)"))?;
        String::from_utf8(plain).context("Sealed value is not UTF-8")
    }
}

/// `true` when `value` was produced by [`encrypt_password`]
pub fn is_encrypted(value: &str) -> bool {
    value.starts_with(SEALED_MARKER)
}

/// Seals a password with the current machine's key
pub fn encrypt_password(password: &str) -> Result<String> {
    CredentialCipher::for_machine()?.seal(password)
}

/// Returns the plain password; values stored unsealed pass through
pub fn get_password(value: &str) -> Result<String> {
    if is_encrypted(value) {
        CredentialCipher::for_machine()?.open(value)
    } else {
        Ok(value.to_owned())
    }
}
