use crate::*;

use thiserror::Error;

/// Error types
///
/// Every error is terminal for the operation that raised it: the ledger
/// commits nothing and the relay reports the operation as failed.
#[derive(Debug, Error)]
pub enum Error {
    #[error("blindballot: operation not authorized")]
    Unauthorized,

    #[error("blindballot: credential signature does not verify against stamp")]
    InvalidCredential,

    #[error("blindballot: stamp already registered")]
    AlreadyRegistered,

    #[error("blindballot: owner already has a voter account")]
    AlreadyExists,

    #[error("blindballot: voter account has already voted")]
    AlreadyVoted,

    #[error("blindballot: a vote is already recorded for account {0}")]
    DuplicateVote(Address),

    #[error("blindballot: unknown candidate {0}")]
    UnknownCandidate(CandidateId),

    #[error("blindballot: no usable blinding factor found")]
    InternalBlindingFailure,

    #[error("blindballot: blinding factor is not invertible modulo the authority modulus")]
    InvalidBlindingFactor,

    #[error("blindballot: ledger already initialized")]
    AlreadyInitialized,

    #[error("blindballot: ledger not initialized")]
    NotInitialized,

    #[error("blindballot: unknown account {0}")]
    UnknownAccount(Address),

    #[error("blindballot: bad nonce for {sender}: expected {expected}, got {got}")]
    BadNonce {
        sender: Address,
        expected: u64,
        got: u64,
    },

    #[error("blindballot: sponsor deposit is empty")]
    SponsorUnfunded,

    #[error("blindballot: sponsor does not cover operations from {0}")]
    NotSponsored(Address),

    #[error("blindballot: ledger lock poisoned by a failed transition")]
    LedgerPoisoned,

    #[error("blindballot: invalid address - invalid hexidecimal")]
    AddressBadHex,

    #[error("blindballot: invalid address - wrong length")]
    AddressBadLen,

    #[error("blindballot: signature error: {0}")]
    SignatureError(#[from] ed25519_dalek::SignatureError),

    #[error("blindballot: RSA error: {0}")]
    RSAError(#[from] rsa::errors::Error),

    #[error("blindballot: CBOR error deserializing operation: {0}")]
    CBORDeserialization(#[from] serde_cbor::Error),

    #[error("blindballot: JSON error deserializing operation: {0}")]
    JSONDeserialization(#[from] serde_json::Error),
}
