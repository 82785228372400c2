use crate::*;
use digest::Digest;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sha2::Sha256;
use std::str::FromStr;

/// SHA-256 over the CBOR encoding of an operation, excluding its signature
pub type OperationHash = [u8; 32];

/// Call data carried by a relayed operation
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(tag = "type")]
#[serde(rename_all = "snake_case")]
pub enum Call {
    /// Authority call: append a candidate to the registry
    ListCandidate(NewCandidate),

    /// Authority call: redeem a credential and create the voter's account
    SubmitVotingKey(VotingKeySubmission),

    /// Voter-account call: cast the account's single vote
    SubmitVote(VoteSubmission),
}

impl Call {
    /// Get the call type
    pub fn call_type(&self) -> CallType {
        match self {
            Call::ListCandidate(_) => CallType::ListCandidate,
            Call::SubmitVotingKey(_) => CallType::SubmitVotingKey,
            Call::SubmitVote(_) => CallType::SubmitVote,
        }
    }
}

/// A call type
#[derive(Serialize, Deserialize, Copy, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CallType {
    ListCandidate,
    SubmitVotingKey,
    SubmitVote,
}

impl std::fmt::Display for CallType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let name = match self {
            CallType::ListCandidate => "listCandidate",
            CallType::SubmitVotingKey => "submitVotingKey",
            CallType::SubmitVote => "submitVote",
        };
        write!(f, "{}", name)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct VotingKeySubmission {
    /// The key the new voter account will be bound to
    #[serde(with = "EdPublicKeyHex")]
    pub voting_key: ed25519_dalek::PublicKey,

    pub credential: Credential,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug)]
pub struct VoteSubmission {
    pub candidate_id: CandidateId,
}

/// A signed operation as submitted to the relay
///
/// `signature` is checked by whoever owns `sender`: the relay checks voter
/// accounts against their owner key, the ledger checks the authority account
/// against the authority's RSA key.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RelayedOperation {
    pub sender: Address,
    pub nonce: u64,
    pub call: Call,

    /// Sponsor paying for execution, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sponsor: Option<Address>,

    #[serde(with = "BytesHex")]
    pub signature: Vec<u8>,
}

// Everything in an operation except the signature
#[derive(Serialize)]
struct OperationPackage<'a> {
    sender: &'a Address,
    nonce: u64,
    call: &'a Call,
    sponsor: &'a Option<Address>,
}

impl RelayedOperation {
    /// Create a new unsigned, unsponsored operation
    pub fn new(sender: Address, nonce: u64, call: Call) -> Self {
        RelayedOperation {
            sender,
            nonce,
            call,
            sponsor: None,
            signature: vec![],
        }
    }

    /// Set the sponsor that pays for this operation
    pub fn sponsored_by(mut self, sponsor: Address) -> Self {
        self.sponsor = Some(sponsor);
        self
    }

    /// Get the call type
    pub fn call_type(&self) -> CallType {
        self.call.call_type()
    }

    /// The hash every signature over this operation commits to
    pub fn hash(&self) -> OperationHash {
        let package = OperationPackage {
            sender: &self.sender,
            nonce: self.nonce,
            call: &self.call,
            sponsor: &self.sponsor,
        };
        let serialized = serde_cbor::to_vec(&package)
            .expect("blindballot: Unexpected error serializing operation");

        let mut hash = [0u8; 32];
        hash.copy_from_slice(&Sha256::digest(&serialized));
        hash
    }

    /// Pack into bytes
    pub fn as_bytes(&self) -> Vec<u8> {
        serde_cbor::to_vec(self).expect("blindballot: Unexpected error packing operation")
    }

    /// Unpack from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        // If it starts with `{` then it's JSON
        if bytes.first() == Some(&b'{') {
            Ok(serde_json::from_slice(bytes)?)
        } else {
            Ok(serde_cbor::from_slice(bytes)?)
        }
    }
}

/// An operation handed to the ledger by the relay
///
/// `sender_verified` is the relay's verdict on `operation.signature` against
/// the sender account's owner key. The ledger trusts it for voter accounts and
/// ignores it for the authority account, which it authenticates itself.
#[derive(Clone, Debug)]
pub struct RelayedCall {
    pub relay: Address,
    pub operation: RelayedOperation,
    pub sender_verified: bool,
}

/// Account identifier
///
/// Printed as `0x`-prefixed lowercase hex.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// Derive an address from the trailing 20 bytes of a SHA-256 over `parts`
    pub fn from_hash(parts: &[&[u8]]) -> Self {
        let mut sha = Sha256::new();
        for part in parts {
            sha.update(part);
        }
        let digest = sha.finalize();

        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest[12..]);
        Address(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|_| Error::AddressBadHex)?;
        if bytes.len() != 20 {
            return Err(Error::AddressBadLen);
        }

        let mut address = [0u8; 20];
        address.copy_from_slice(&bytes);
        Ok(Address(address))
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        std::str::FromStr::from_str(&s).map_err(de::Error::custom)
    }
}

impl Serialize for Address {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod test {

    use super::*;

    #[test]
    fn test_address() {
        let address = Address::from_hash(&[b"voter"]);
        let stringed = address.to_string();
        assert!(stringed.starts_with("0x"));
        assert_eq!(stringed.len(), 42);

        assert_eq!(Address::from_str(&stringed).unwrap(), address);
        assert_eq!(Address::from_str(&stringed[2..]).unwrap(), address);
        assert!(matches!(
            Address::from_str("0x1234"),
            Err(Error::AddressBadLen)
        ));
        assert!(matches!(
            Address::from_str("0xnothex"),
            Err(Error::AddressBadHex)
        ));
    }

    #[test]
    fn test_operation_encoding() {
        let sender = Address::from_hash(&[b"account"]);
        let mut op = RelayedOperation::new(
            sender,
            3,
            Call::SubmitVote(VoteSubmission { candidate_id: 1 }),
        );
        let unsigned_hash = op.hash();

        // The signature is not part of the hash
        op.signature = vec![1, 2, 3];
        assert_eq!(op.hash(), unsigned_hash);

        // Everything else is
        let sponsored = op.clone().sponsored_by(Address::from_hash(&[b"sponsor"]));
        assert_ne!(sponsored.hash(), unsigned_hash);

        let json = serde_json::to_vec(&op).unwrap();
        let from_json = RelayedOperation::from_bytes(&json).unwrap();
        assert_eq!(from_json.hash(), unsigned_hash);
        assert_eq!(from_json.signature, vec![1, 2, 3]);

        let from_cbor = RelayedOperation::from_bytes(&op.as_bytes()).unwrap();
        assert_eq!(from_cbor.call_type(), CallType::SubmitVote);
        assert_eq!(from_cbor.sender, sender);

        assert!(RelayedOperation::from_bytes(&[]).is_err());
    }
}
