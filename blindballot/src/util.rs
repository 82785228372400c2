use crate::*;
use ed25519_dalek::Keypair;
use ed25519_dalek::PublicKey;
use ed25519_dalek::SecretKey;
use rand_core::{CryptoRng, RngCore};

/// Generate a voter signing key
pub fn generate_keypair() -> (SecretKey, PublicKey) {
    let mut csprng = rand::rngs::OsRng {};
    generate_keypair_with(&mut csprng)
}

/// Generate a voter signing key from the given source of randomness
pub fn generate_keypair_with<R: CryptoRng + RngCore>(rng: &mut R) -> (SecretKey, PublicKey) {
    let Keypair { public, secret } = Keypair::generate(rng);
    (secret, public)
}

/// The public address of a voter signing key
pub fn voter_address(public_key: &PublicKey) -> Address {
    Address::from_hash(&[public_key.as_bytes()])
}
