//! Blind-signature credentials over a voter's stamp.
//!
//! The voter blinds its stamp with a random factor `r`, the authority signs
//! the blinded value with raw RSA, and the voter strips `r` off again. The
//! result is an ordinary RSA signature on the stamp that the authority has
//! never seen, so it cannot link the credential to the signing session.
//!
//! Signing here is unpadded modular exponentiation. Any padding applied by
//! the signer would not commute with the blinding and unblinding would fail.

use crate::*;
use digest::Digest;
use num_bigint_dig::{ModInverse, RandBigInt, ToBigUint};
use num_traits::{One, Zero};
use rand_core::{CryptoRng, RngCore};
use sha2::Sha256;

/// Bit width of the stamp hash, and of the slice compared by [`verify`]
pub const STAMP_BITS: usize = 256;

/// How many random blinding factors to try before giving up
pub const MAX_BLINDING_ATTEMPTS: usize = 64;

/// Pseudonymous voter identifier: `SHA-256(address)` reduced modulo the authority modulus
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Stamp(#[serde(with = "BigUintHex")] pub BigUint);

impl Stamp {
    /// Whether this stamp fits the hash width and lies below `modulus`
    pub fn is_canonical(&self, modulus: &BigUint) -> bool {
        self.0.bits() <= STAMP_BITS && &self.0 < modulus
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(transparent)]
pub struct BlindedStamp(#[serde(with = "BigUintHex")] pub BigUint);

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(transparent)]
pub struct BlindedSignature(#[serde(with = "BigUintHex")] pub BigUint);

/// The voter's secret blinding factor `r` and its inverse modulo the authority modulus
///
/// Lives only on the voter side, between blinding and unblinding.
#[derive(Clone)]
pub struct BlindingFactor {
    r: BigUint,
    inverse: BigUint,
}

impl BlindingFactor {
    /// Accept `r` as a blinding factor if it is invertible modulo `modulus`
    pub fn new(r: BigUint, modulus: &BigUint) -> Result<Self, Error> {
        if r.is_zero() || &r >= modulus {
            return Err(Error::InvalidBlindingFactor);
        }
        let inverse = mod_inverse(&r, modulus).ok_or(Error::InvalidBlindingFactor)?;
        Ok(BlindingFactor { r, inverse })
    }

    pub fn value(&self) -> &BigUint {
        &self.r
    }
}

impl std::fmt::Debug for BlindingFactor {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str("BlindingFactor(..)")
    }
}

/// An unblinded authority signature over a stamp
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Credential {
    pub stamp: Stamp,

    #[serde(with = "BigUintHex")]
    pub signature: BigUint,
}

/// Anything that can check a credential
pub trait CredentialVerifier {
    fn verify_credential(&self, credential: &Credential) -> bool;
}

impl CredentialVerifier for AuthorityPublicKey {
    /// Besides [`verify`], requires the stamp to be one [`derive_stamp`] can
    /// produce, so a stamp widened above `STAMP_BITS` cannot pose as a new one.
    fn verify_credential(&self, credential: &Credential) -> bool {
        credential.stamp.is_canonical(&self.modulus)
            && verify(
            &credential.stamp,
            &credential.signature,
            &self.exponent,
            &self.modulus,
        )
    }
}

/// Derive the stamp of an address
pub fn derive_stamp(address: &Address, modulus: &BigUint) -> Stamp {
    let hash = Sha256::digest(address.as_bytes());
    Stamp(BigUint::from_bytes_be(&hash) % modulus)
}

/// Blind a stamp with a fresh random factor
///
/// Draws `r` uniformly from `[1, modulus)` and retries while `gcd(r, modulus) != 1`.
pub fn blind<R: CryptoRng + RngCore>(
    rng: &mut R,
    stamp: &Stamp,
    public_key: &AuthorityPublicKey,
) -> Result<(BlindedStamp, BlindingFactor), Error> {
    for attempt in 1..=MAX_BLINDING_ATTEMPTS {
        let r = rng.gen_biguint_below(&public_key.modulus);
        match BlindingFactor::new(r, &public_key.modulus) {
            Ok(factor) => {
                let blinded = blind_with(stamp, &factor, public_key);
                return Ok((blinded, factor));
            }
            Err(_) => debug!("blinding factor rejected on attempt {}", attempt),
        }
    }
    Err(Error::InternalBlindingFailure)
}

/// Blind a stamp with a known factor: `stamp * r^e mod n`
pub fn blind_with(
    stamp: &Stamp,
    factor: &BlindingFactor,
    public_key: &AuthorityPublicKey,
) -> BlindedStamp {
    let n = &public_key.modulus;
    let r_e = factor.r.modpow(&public_key.exponent, n);
    BlindedStamp((&stamp.0 * &r_e) % n)
}

/// Authority side: `blinded^d mod n`, with no padding
pub fn authority_sign(
    blinded: &BlindedStamp,
    private_exponent: &BigUint,
    modulus: &BigUint,
) -> BlindedSignature {
    BlindedSignature(blinded.0.modpow(private_exponent, modulus))
}

/// Strip the blinding factor off an authority signature: `s' * r^-1 mod n`
pub fn unblind(
    blinded_signature: &BlindedSignature,
    factor: &BlindingFactor,
    modulus: &BigUint,
) -> BigUint {
    (&blinded_signature.0 * &factor.inverse) % modulus
}

/// Check a credential signature against a stamp
///
/// Only the low-order `STAMP_BITS` of `signature^e mod n` are compared with the
/// low-order bits of the stamp.
pub fn verify(
    stamp: &Stamp,
    signature: &BigUint,
    public_exponent: &BigUint,
    modulus: &BigUint,
) -> bool {
    let recovered = signature.modpow(public_exponent, modulus);
    low_order_slice(&recovered) == low_order_slice(&stamp.0)
}

fn low_order_slice(n: &BigUint) -> BigUint {
    n % (BigUint::one() << STAMP_BITS)
}

fn mod_inverse(a: &BigUint, modulus: &BigUint) -> Option<BigUint> {
    a.clone().mod_inverse(modulus)?.to_biguint()
}

/// A voter's in-flight credential request: the stamp, its blinded form, and the secret factor
pub struct CredentialRequest {
    pub stamp: Stamp,
    pub blinded: BlindedStamp,
    factor: BlindingFactor,
}

impl CredentialRequest {
    /// Stamp and blind `address` for the given authority
    pub fn new<R: CryptoRng + RngCore>(
        rng: &mut R,
        address: &Address,
        public_key: &AuthorityPublicKey,
    ) -> Result<Self, Error> {
        let stamp = derive_stamp(address, &public_key.modulus);
        let (blinded, factor) = blind(rng, &stamp, public_key)?;
        Ok(CredentialRequest {
            stamp,
            blinded,
            factor,
        })
    }

    /// Unblind the authority's answer into a credential, checking it on the way
    pub fn finalize(
        self,
        blinded_signature: &BlindedSignature,
        public_key: &AuthorityPublicKey,
    ) -> Result<Credential, Error> {
        let signature = unblind(blinded_signature, &self.factor, &public_key.modulus);
        let credential = Credential {
            stamp: self.stamp,
            signature,
        };
        if !public_key.verify_credential(&credential) {
            return Err(Error::InvalidCredential);
        }
        Ok(credential)
    }
}
