// Copyright (c) 2025 Cloudflare, Inc.
// Licensed under the BSD-3-Clause license found in the LICENSE file or at https://opensource.org/licenses/BSD-3-Clause

//! Ed25519 signing and verification of log root envelopes.

use crate::{LogRootError, LogRootV1, SignedLogRoot};
use base64::prelude::*;
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey, PUBLIC_KEY_LENGTH};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KeyError {
    #[error(transparent)]
    InvalidBase64(#[from] base64::DecodeError),
    #[error("expected a {PUBLIC_KEY_LENGTH}-byte public key, got {0} bytes")]
    InvalidLength(usize),
    #[error(transparent)]
    InvalidKey(#[from] ed25519_dalek::SignatureError),
}

/// Signs log roots on behalf of a log.
pub struct RootSigner {
    key: SigningKey,
}

impl RootSigner {
    pub fn new(key: SigningKey) -> Self {
        Self { key }
    }

    /// Returns the verifier matching this signer.
    pub fn verifier(&self) -> RootVerifier {
        RootVerifier {
            key: self.key.verifying_key(),
        }
    }

    /// Encodes and signs `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if the root cannot be encoded.
    pub fn sign(&self, root: &LogRootV1) -> Result<SignedLogRoot, LogRootError> {
        let log_root = root.to_bytes()?;
        let log_root_signature = self.key.sign(&log_root).to_bytes().to_vec();
        Ok(SignedLogRoot {
            log_root,
            log_root_signature,
        })
    }
}

/// Verifies log root signatures with a log's public key.
#[derive(Clone, Debug)]
pub struct RootVerifier {
    key: VerifyingKey,
}

impl RootVerifier {
    pub fn new(key: VerifyingKey) -> Self {
        Self { key }
    }

    /// Returns a verifier for the base64-encoded raw Ed25519 public key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is not valid base64 or not a valid Ed25519
    /// public key.
    pub fn from_base64(s: &str) -> Result<Self, KeyError> {
        let raw = BASE64_STANDARD.decode(s)?;
        let bytes: [u8; PUBLIC_KEY_LENGTH] = raw
            .as_slice()
            .try_into()
            .map_err(|_| KeyError::InvalidLength(raw.len()))?;
        Ok(Self::new(VerifyingKey::from_bytes(&bytes)?))
    }

    /// Returns the base64 encoding of the public key.
    pub fn to_base64(&self) -> String {
        BASE64_STANDARD.encode(self.key.as_bytes())
    }

    /// Checks the envelope signature and decodes the root it covers.
    ///
    /// # Errors
    ///
    /// Returns an error if the signature does not verify or the root cannot
    /// be decoded.
    pub fn verify(&self, signed: &SignedLogRoot) -> Result<LogRootV1, LogRootError> {
        let signature = Signature::from_slice(&signed.log_root_signature)
            .map_err(|_| LogRootError::InvalidSignature)?;
        self.key
            .verify_strict(&signed.log_root, &signature)
            .map_err(|_| LogRootError::InvalidSignature)?;
        LogRootV1::from_bytes(&signed.log_root)
    }
}
