use base64::engine::{general_purpose, Engine};
use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;
use tracing::debug;

use crate::error::BookingError;

// Type alias for HMAC-SHA256
type HmacSha256 = Hmac<Sha256>;

/// Issues and verifies the session handles handed to the booking UI.
///
/// A handle is `<session id>.<signature>`, where the signature is the
/// base64 of the hex-encoded HMAC-SHA256 of the id.
#[derive(Clone)]
pub struct SessionSigner {
    secret_key: Vec<u8>,
}

impl SessionSigner {
    pub fn new(secret_key: &str) -> Self {
        Self {
            secret_key: secret_key.as_bytes().to_vec(),
        }
    }

    /// Generate a random session id
    pub fn generate_session_id() -> String {
        let bytes: [u8; 16] = rand::thread_rng().gen();
        hex::encode(bytes)
    }

    fn signature(&self, session_id: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(&self.secret_key)
            .expect("HMAC can take key of any size");
        mac.update(session_id.as_bytes());

        let hex_hash = hex::encode(mac.finalize().into_bytes());
        general_purpose::STANDARD.encode(hex_hash.as_bytes())
    }

    pub fn sign(&self, session_id: &str) -> String {
        format!("{}.{}", session_id, self.signature(session_id))
    }

    /// Return the session id of a handle whose signature checks out.
    pub fn verify(&self, token: &str) -> Result<String, BookingError> {
        let (session_id, signature) = token
            .split_once('.')
            .ok_or(BookingError::SessionNotFound)?;

        let decoded = general_purpose::STANDARD
            .decode(signature)
            .map_err(|_| BookingError::SessionNotFound)?;
        let expected = hex::decode(&decoded).map_err(|_| BookingError::SessionNotFound)?;

        let mut mac = HmacSha256::new_from_slice(&self.secret_key)
            .expect("HMAC can take key of any size");
        mac.update(session_id.as_bytes());

        match mac.verify_slice(&expected) {
            Ok(()) => Ok(session_id.to_string()),
            Err(_) => {
                debug!("Rejected session handle with bad signature");
                Err(BookingError::SessionNotFound)
            }
        }
    }
}
