use crate::*;
use digest::Digest;
use rand_core::{CryptoRng, RngCore};
use rsa::{Hash, PaddingScheme, PublicKey, PublicKeyParts, RSAPrivateKey, RSAPublicKey};
use sha2::Sha256;

/// Default authority modulus size in bits
pub const DEFAULT_KEY_SIZE: usize = 2048;

/// The election authority's RSA key pair
///
/// One key serves two separate channels: blind signing of stamps
/// ([`AuthorityKeyPair::sign_blinded_stamp`]) and padded signatures that
/// authorize privileged operations ([`AuthorityKeyPair::authorize_operation`]).
/// The two never share a code path.
#[derive(Serialize, Deserialize, Clone)]
pub struct AuthorityKeyPair {
    secret: RSAPrivateKey,
}

impl AuthorityKeyPair {
    /// Generate a new authority key with a modulus of `bits` bits
    pub fn generate<R: CryptoRng + RngCore>(rng: &mut R, bits: usize) -> Result<Self, Error> {
        let secret = RSAPrivateKey::new(rng, bits)?;
        Ok(AuthorityKeyPair { secret })
    }

    /// The published half of the key
    pub fn public_key(&self) -> AuthorityPublicKey {
        AuthorityPublicKey {
            exponent: self.secret.e().clone(),
            modulus: self.secret.n().clone(),
        }
    }

    pub fn private_exponent(&self) -> &BigUint {
        self.secret.d()
    }

    pub fn primes(&self) -> &[BigUint] {
        self.secret.primes()
    }

    /// Blind channel: sign a blinded stamp with raw RSA
    pub fn sign_blinded_stamp(&self, blinded: &BlindedStamp) -> BlindedSignature {
        authority_sign(blinded, self.secret.d(), self.secret.n())
    }

    /// Authorization channel: PKCS#1 v1.5 signature over the operation digest
    pub fn authorize_operation(&self, operation_hash: &OperationHash) -> Result<Vec<u8>, Error> {
        let digest = operation_digest(operation_hash);
        let padding = PaddingScheme::new_pkcs1v15_sign(Some(Hash::SHA2_256));
        Ok(self.secret.sign(padding, &digest)?)
    }

    /// A fixed 1024 bit key, fast enough to generate in every test
    #[cfg(test)]
    pub(crate) fn test_key() -> Self {
        use rand::SeedableRng;
        let mut rng = rand_chacha::ChaCha20Rng::seed_from_u64(0xb10c);
        Self::generate(&mut rng, 1024).unwrap()
    }
}

/// The authority's published RSA parameters
///
/// Encoded as `{"exponent": "0x..", "modulus": "0x.."}`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AuthorityPublicKey {
    #[serde(with = "BigUintHex")]
    pub exponent: BigUint,

    #[serde(with = "BigUintHex")]
    pub modulus: BigUint,
}

impl AuthorityPublicKey {
    /// Build a public key, rejecting parameters RSA would refuse
    pub fn new(exponent: BigUint, modulus: BigUint) -> Result<Self, Error> {
        let key = AuthorityPublicKey { exponent, modulus };
        key.validate()?;
        Ok(key)
    }

    pub fn validate(&self) -> Result<(), Error> {
        self.rsa_key().map(|_| ())
    }

    /// Modulus size in bits
    pub fn bits(&self) -> usize {
        self.modulus.bits()
    }

    /// The ledger address of the authority account holding this key
    pub fn address(&self) -> Address {
        Address::from_hash(&[
            b"blindballot.authority",
            &self.modulus.to_bytes_be(),
            &self.exponent.to_bytes_be(),
        ])
    }

    /// Authorization channel: check an authority signature over an operation hash
    pub fn verify_operation(
        &self,
        operation_hash: &OperationHash,
        signature: &[u8],
    ) -> Result<(), Error> {
        let digest = operation_digest(operation_hash);
        let padding = PaddingScheme::new_pkcs1v15_sign(Some(Hash::SHA2_256));
        self.rsa_key()?
            .verify(padding, &digest, signature)
            .map_err(|_| Error::Unauthorized)
    }

    fn rsa_key(&self) -> Result<RSAPublicKey, Error> {
        Ok(RSAPublicKey::new(
            self.modulus.clone(),
            self.exponent.clone(),
        )?)
    }
}

/// The digest the authorization channel signs: SHA-256 of the `0x`-prefixed
/// lowercase hex rendering of the operation hash
pub fn operation_digest(operation_hash: &OperationHash) -> Vec<u8> {
    let rendered = format!("0x{}", hex::encode(operation_hash));
    Sha256::digest(rendered.as_bytes()).to_vec()
}
