use aes_gcm::{
    Aes256Gcm,
    Key,
    Nonce,
    aead::{Aead, AeadCore, KeyInit, OsRng},
};
use anyhow::{Context, anyhow};
use tracing::warn;

const NONCE_LEN: usize = 12;

/// Symmetric AEAD over stored OAuth tokens.
///
/// Everything outside this module only ever sees ciphertext; the sealed form
/// is hex of `nonce || ciphertext`.
#[derive(Clone)]
pub struct TokenVault {
    key: Key<Aes256Gcm>,
}

impl TokenVault {
    /// Build the vault from a 64-char hex key, or generate an ephemeral key
    /// when none is configured. With an ephemeral key previously stored
    /// tokens become unreadable after a restart, so warn loudly.
    pub fn from_config(configured_key: Option<&str>) -> anyhow::Result<Self> {
        let key = match configured_key {
            Some(hex_key) => {
                let bytes = hex::decode(hex_key).context("token vault key is not valid hex")?;
                if bytes.len() != 32 {
                    return Err(anyhow!("token vault key must be 32 bytes (64 hex chars)"));
                }
                *Key::<Aes256Gcm>::from_slice(&bytes)
            }
            None => {
                warn!(
                    "No token vault key configured - generated an ephemeral one. \
                     Stored tokens will not survive a restart."
                );
                Aes256Gcm::generate_key(&mut OsRng)
            }
        };
        Ok(Self { key })
    }

    pub fn seal(&self, plaintext: &str) -> anyhow::Result<String> {
        let cipher = Aes256Gcm::new(&self.key);
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| anyhow!("failed to seal token: {:?}", e))?;

        let mut sealed = nonce.to_vec();
        sealed.extend_from_slice(&ciphertext);
        Ok(hex::encode(sealed))
    }

    pub fn open(&self, sealed: &str) -> anyhow::Result<String> {
        let bytes = hex::decode(sealed).context("sealed token is not valid hex")?;
        if bytes.len() < NONCE_LEN {
            return Err(anyhow!("sealed token is too short"));
        }
        let (nonce, ciphertext) = bytes.split_at(NONCE_LEN);

        let cipher = Aes256Gcm::new(&self.key);
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|e| anyhow!("failed to open token: {:?}", e))?;

        String::from_utf8(plaintext).context("token plaintext is not utf-8")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn seals_and_opens_a_token() {
        let vault = TokenVault::from_config(None).unwrap();
        let sealed = vault.seal("ya29.secret-access-token").unwrap();
        assert_ne!(sealed, "ya29.secret-access-token");
        assert_eq!(vault.open(&sealed).unwrap(), "ya29.secret-access-token");
    }

    #[test]
    fn sealing_twice_gives_different_ciphertext() {
        let vault = TokenVault::from_config(None).unwrap();
        let s1 = vault.seal("token").unwrap();
        let s2 = vault.seal("token").unwrap();
        assert_ne!(s1, s2);
    }

    #[test]
    fn rejects_tampered_ciphertext() {
        let vault = TokenVault::from_config(None).unwrap();
        let mut sealed = vault.seal("token").unwrap();
        let tail = if sealed.ends_with("00") { "11" } else { "00" };
        sealed.replace_range(sealed.len() - 2.., tail);
        assert!(vault.open(&sealed).is_err());
    }

    #[test]
    fn accepts_a_configured_hex_key() {
        let key = "11".repeat(32);
        let vault = TokenVault::from_config(Some(&key)).unwrap();
        let sealed = vault.seal("token").unwrap();
        let reopened = TokenVault::from_config(Some(&key)).unwrap();
        assert_eq!(reopened.open(&sealed).unwrap(), "token");

        assert!(TokenVault::from_config(Some("deadbeef")).is_err());
        assert!(TokenVault::from_config(Some("zz")).is_err());
    }
}
