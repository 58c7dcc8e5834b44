//! HMAC-SHA256 envelope signing for the distributed bus.

use hmac::{Hmac, Mac};
use sha2::Sha256;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SigningError {
    #[error("bus signing secret cannot be empty")]
    EmptySecret,
    #[error("signature is not valid hex")]
    InvalidHex,
    #[error("signature verification failed")]
    Mismatch,
}

/// Signs and verifies canonical envelope strings with a shared secret.
#[derive(Clone)]
pub struct EnvelopeSigner {
    key: Vec<u8>,
}

impl std::fmt::Debug for EnvelopeSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvelopeSigner").finish_non_exhaustive()
    }
}

impl EnvelopeSigner {
    pub fn new(secret: impl Into<Vec<u8>>) -> Result<Self, SigningError> {
        let key = secret.into();
        if key.is_empty() {
            return Err(SigningError::EmptySecret);
        }
        Ok(Self { key })
    }

    /// Hex-encoded HMAC-SHA256 of `canonical`.
    pub fn sign(&self, canonical: &str) -> String {
        let mut mac = self.mac();
        mac.update(canonical.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Constant-time check of `signature_hex` against `canonical`.
    pub fn verify(&self, canonical: &str, signature_hex: &str) -> Result<(), SigningError> {
        let signature = hex::decode(signature_hex).map_err(|_| SigningError::InvalidHex)?;
        let mut mac = self.mac();
        mac.update(canonical.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| SigningError::Mismatch)
    }

    fn mac(&self) -> Hmac<Sha256> {
        // HMAC accepts keys of any length; only an empty key is refused, and
        // that is rejected in `new`.
        match Hmac::<Sha256>::new_from_slice(&self.key) {
            Ok(mac) => mac,
            Err(_) => unreachable!("HMAC-SHA256 accepts keys of any length"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify_roundtrip() {
        let signer = EnvelopeSigner::new(b"shared-secret".to_vec()).expect("signer");
        let signature = signer.sign("abc|HandoffAck|{}");
        assert_eq!(signature.len(), 64);
        signer
            .verify("abc|HandoffAck|{}", &signature)
            .expect("verify");
    }

    #[test]
    fn verify_rejects_tampered_payload() {
        let signer = EnvelopeSigner::new(b"shared-secret".to_vec()).expect("signer");
        let signature = signer.sign("abc|HandoffAck|{\"success\":false}");
        assert_eq!(
            signer.verify("abc|HandoffAck|{\"success\":true}", &signature),
            Err(SigningError::Mismatch)
        );
    }

    #[test]
    fn verify_rejects_other_key() {
        let a = EnvelopeSigner::new(b"key-a".to_vec()).expect("signer");
        let b = EnvelopeSigner::new(b"key-b".to_vec()).expect("signer");
        let signature = a.sign("payload");
        assert_eq!(b.verify("payload", &signature), Err(SigningError::Mismatch));
    }

    #[test]
    fn verify_rejects_non_hex() {
        let signer = EnvelopeSigner::new(b"k".to_vec()).expect("signer");
        assert_eq!(signer.verify("payload", "zz"), Err(SigningError::InvalidHex));
    }

    #[test]
    fn empty_secret_is_refused() {
        assert_eq!(
            EnvelopeSigner::new(Vec::new()).map(|_| ()),
            Err(SigningError::EmptySecret)
        );
    }
}
