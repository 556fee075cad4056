//! Request signing
//!
//! The platform authenticates request bodies and the socket handshake with
//! `base64(prefix || HMAC-SHA1(key, data))`, sent in the `NDC-MSG-SIG` header.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// Version byte prepended to every signature
pub const DEFAULT_SIGNATURE_PREFIX: u8 = 0x19;

/// HMAC key used when none is configured
pub const DEFAULT_SIGNATURE_KEY: &[u8] = &[
    0xDF, 0xA5, 0xED, 0x19, 0x2D, 0xDA, 0x6E, 0x88, 0xA1, 0x2F, 0xE1, 0x21, 0x30, 0xDC, 0x62,
    0x06, 0xB1, 0x25, 0x1E, 0x44,
];

/// Computes message signatures
#[derive(Clone)]
pub struct Signer {
    prefix: u8,
    mac: HmacSha1,
}

impl Signer {
    /// Create a signer with the given version byte and key
    pub fn new(prefix: u8, key: &[u8]) -> Result<Self, SignatureError> {
        let mac = HmacSha1::new_from_slice(key).map_err(|_| SignatureError::InvalidKey)?;
        Ok(Self { prefix, mac })
    }

    /// Sign raw bytes
    #[must_use]
    pub fn sign(&self, data: &[u8]) -> String {
        let mut mac = self.mac.clone();
        mac.update(data);

        let digest = mac.finalize().into_bytes();
        let mut signed = Vec::with_capacity(1 + digest.len());
        signed.push(self.prefix);
        signed.extend_from_slice(&digest);

        STANDARD.encode(signed)
    }

    /// Signature for the socket handshake over `"{device_id}|{timestamp_ms}"`
    #[must_use]
    pub fn sign_handshake(&self, device_id: &str, timestamp_ms: i64) -> String {
        self.sign(format!("{device_id}|{timestamp_ms}").as_bytes())
    }

    /// Version byte
    #[must_use]
    pub fn prefix(&self) -> u8 {
        self.prefix
    }
}

impl Default for Signer {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_SIGNATURE_PREFIX,
            mac: HmacSha1::new_from_slice(DEFAULT_SIGNATURE_KEY)
                .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any length")),
        }
    }
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer")
            .field("prefix", &format_args!("{:#04x}", self.prefix))
            .finish()
    }
}

/// Signing errors
#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    #[error("Invalid signature key")]
    InvalidKey,
}
