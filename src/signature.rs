//! Request/notification signature codec.
//!
//! The gateway signs messages by concatenating every field value (signature
//! field excluded) in transport order, appending the shared integration key,
//! hashing with SHA-512 and rendering the digest as uppercase hex. The same
//! canonical string is used on both the signing and verification paths, so
//! both must see values after exactly one round of percent-decoding.

use crate::encoding::Fields;
use sha2::{Digest, Sha512};
use subtle::ConstantTimeEq;

/// Name of the signature field on the wire.
pub const HASH_FIELD: &str = "hash";

/// Secret-keyed signer/verifier for one gateway account.
#[derive(Debug, Clone)]
pub struct SignatureScheme {
    secret: String,
    excluded: Vec<String>,
}

impl SignatureScheme {
    /// Scheme excluding only the `hash` field itself, which is what the
    /// gateway's own verifier does.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            excluded: vec![HASH_FIELD.to_string()],
        }
    }

    /// Override the excluded field names, for gateways that keep their own
    /// reference field out of the canonical string.
    pub fn with_excluded<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded = names.into_iter().map(Into::into).collect();
        self
    }

    fn is_excluded(&self, name: &str) -> bool {
        self.excluded.iter().any(|e| e.eq_ignore_ascii_case(name))
    }

    /// Canonical string: field values in supplied order, excluded fields
    /// skipped, secret appended.
    fn canonical(&self, fields: &Fields) -> String {
        let mut out = String::new();
        for (name, value) in fields.iter() {
            if !self.is_excluded(name) {
                out.push_str(value);
            }
        }
        out.push_str(&self.secret);
        out
    }

    /// Sign an ordered field set, returning the uppercase hex digest.
    pub fn sign(&self, fields: &Fields) -> String {
        let digest = Sha512::digest(self.canonical(fields).as_bytes());
        hex::encode_upper(digest)
    }

    /// Recompute the signature and compare it against `candidate` in
    /// constant time. Case of the candidate hex is not significant.
    pub fn verify(&self, fields: &Fields, candidate: &str) -> bool {
        let expected = self.sign(fields);
        let candidate = candidate.trim().to_ascii_uppercase();
        expected
            .as_bytes()
            .ct_eq(candidate.as_bytes())
            .into()
    }
}
