use std::fmt;

use hmac::{Hmac, Mac};

use sha2::Sha256;

use secrecy::Secret;

/// HMAC-SHA256 key used to sign admin session tokens
#[derive(Clone)]
pub struct SigningKey(Hmac<Sha256>);

impl SigningKey {
    pub fn new(key: &Secret<String>) -> anyhow::Result<Self> {
        use secrecy::ExposeSecret;

        let secret = key.expose_secret();
        if secret.len() < 16 {
            anyhow::bail!("Signing secret must be at least 16 bytes long");
        }
        let hmac = Hmac::new_from_slice(secret.as_bytes())
            .map_err(|e| anyhow::anyhow!("Invalid signing secret: {}", e))?;

        Ok(Self(hmac))
    }
}

impl AsRef<Hmac<Sha256>> for SigningKey {
    fn as_ref(&self) -> &Hmac<Sha256> {
        &self.0
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningKey(..)")
    }
}
