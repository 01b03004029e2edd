//! Keyed pseudonymization for addresses and mailbox identifiers.
//!
//! Every identifier leaving the mailbox is replaced by an HMAC-SHA256
//! digest under a per-deployment secret, so aggregates can be joined
//! across runs without storing raw addresses.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

use crate::domain::ContactHash;

const SECRET_MIN_LENGTH: usize = 16;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("hashing secret is not configured")]
    MissingSecret,
    #[error("hashing secret must be at least {minimum} characters")]
    WeakSecret { minimum: usize },
}

/// Stateless hasher cloned freely across the pipeline.
#[derive(Clone)]
pub struct Pseudonymizer {
    mac: Hmac<Sha256>,
}

impl std::fmt::Debug for Pseudonymizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pseudonymizer").finish_non_exhaustive()
    }
}

impl Pseudonymizer {
    pub fn new(secret: &str) -> Result<Self, IdentityError> {
        if secret.is_empty() {
            return Err(IdentityError::MissingSecret);
        }
        if secret.chars().count() < SECRET_MIN_LENGTH {
            return Err(IdentityError::WeakSecret {
                minimum: SECRET_MIN_LENGTH,
            });
        }
        let mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .map_err(|_| IdentityError::MissingSecret)?;
        Ok(Self { mac })
    }

    /// Addresses are trimmed and lowercased before hashing so the same
    /// mailbox always maps to the same pseudonym.
    pub fn hash_email(&self, email: &str) -> ContactHash {
        let normalized = email.trim().to_lowercase();
        ContactHash(self.digest("email", &normalized))
    }

    pub fn hash_thread_id(&self, thread_id: &str) -> String {
        self.digest("thread", thread_id)
    }

    pub fn hash_message_id(&self, message_id: &str) -> String {
        self.digest("message", message_id)
    }

    pub fn hash_label(&self, label: &str) -> String {
        self.digest("label", label)
    }

    /// Namespacing keeps digests from different identifier kinds from
    /// ever colliding, even for equal input strings.
    fn digest(&self, namespace: &str, value: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(format!("{namespace}:{value}").as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}
