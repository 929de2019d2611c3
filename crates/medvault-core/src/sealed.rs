use std::fmt;

use serde::{Deserialize, Serialize};

/// Authenticated-encryption output as persisted: nonce, ciphertext and tag,
/// each hex encoded.
///
/// Opaque to everything except the record codec, which is the only producer
/// and the only consumer of the parts.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedPayload {
    #[serde(rename = "iv")]
    nonce: String,
    #[serde(rename = "data")]
    ciphertext: String,
    tag: String,
}

impl SealedPayload {
    pub fn from_parts(
        nonce: impl Into<String>,
        ciphertext: impl Into<String>,
        tag: impl Into<String>,
    ) -> Self {
        Self {
            nonce: nonce.into(),
            ciphertext: ciphertext.into(),
            tag: tag.into(),
        }
    }

    pub fn nonce(&self) -> &str {
        &self.nonce
    }

    pub fn ciphertext(&self) -> &str {
        &self.ciphertext
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }
}

impl fmt::Debug for SealedPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SealedPayload")
            .field("nonce", &self.nonce)
            .field("ciphertext_len", &(self.ciphertext.len() / 2))
            .finish_non_exhaustive()
    }
}
