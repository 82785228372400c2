use crate::*;
use ed25519_dalek::{ExpandedSecretKey, PublicKey, SecretKey, Signature};
use std::collections::HashMap;
use std::convert::TryFrom;

/// An in-process relay
///
/// Accepts signed operations, enforces per-sender nonces and sponsorship,
/// authenticates voter-account senders against their owner key, and hands
/// the result to the ledger as a `RelayedCall`.
#[derive(Clone, Debug)]
pub struct LocalRelay {
    address: Address,
    nonces: HashMap<Address, u64>,
}

impl LocalRelay {
    pub fn new(address: Address) -> Self {
        LocalRelay {
            address,
            nonces: HashMap::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// The nonce the next operation from `sender` must carry
    pub fn next_nonce(&self, sender: &Address) -> u64 {
        self.nonces.get(sender).copied().unwrap_or(0)
    }

    /// Relay `operation` to `ledger`
    ///
    /// The sender's nonce is only consumed when the ledger applies the operation.
    pub fn handle<F: AccountFactory, T: TallyEngine>(
        &mut self,
        ledger: &mut AuthorityLedger<F, T>,
        sponsor: Option<&Sponsor>,
        operation: RelayedOperation,
    ) -> Result<Receipt, Error> {
        let expected = self.next_nonce(&operation.sender);
        if operation.nonce != expected {
            return Err(Error::BadNonce {
                sender: operation.sender,
                expected,
                got: operation.nonce,
            });
        }

        match (sponsor, operation.sponsor) {
            (Some(sponsor), _) => sponsor.validate(ledger, &operation)?,
            (None, Some(requested)) => return Err(Error::NotSponsored(requested)),
            (None, None) => {}
        }

        let sender_verified = match ledger.voter_account(&operation.sender) {
            Some(account) => verify_owner(&account.owner, &operation),
            None => false,
        };

        let sender = operation.sender;
        let call = RelayedCall {
            relay: self.address,
            operation,
            sender_verified,
        };
        let receipt = ledger.execute(&call)?;

        self.nonces.insert(sender, expected + 1);
        Ok(receipt)
    }
}

fn verify_owner(owner: &PublicKey, operation: &RelayedOperation) -> bool {
    let signature = match Signature::try_from(operation.signature.as_slice()) {
        Ok(signature) => signature,
        Err(_) => return false,
    };
    owner.verify_strict(&operation.hash(), &signature).is_ok()
}

/// Sign an operation with a voter's ed25519 owner key
pub fn sign_as_voter(secret: &SecretKey, operation: &mut RelayedOperation) {
    let public_key = PublicKey::from(secret);
    let expanded: ExpandedSecretKey = secret.into();
    let signature = expanded.sign(&operation.hash(), &public_key);
    operation.signature = signature.to_bytes().to_vec();
}

/// Sign an operation sent from the authority account
pub fn sign_as_authority(
    authority: &AuthorityKeyPair,
    operation: &mut RelayedOperation,
) -> Result<(), Error> {
    operation.signature = authority.authorize_operation(&operation.hash())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (AuthorityKeyPair, LocalRelay, AuthorityLedger) {
        let authority = AuthorityKeyPair::test_key();
        let relay = LocalRelay::new(Address::from_hash(&[b"relay"]));
        let ledger = AuthorityLedger::setup(relay.address(), authority.public_key()).unwrap();
        (authority, relay, ledger)
    }

    fn list(sender: Address, nonce: u64) -> RelayedOperation {
        RelayedOperation::new(
            sender,
            nonce,
            Call::ListCandidate(NewCandidate { info: b"x".to_vec() }),
        )
    }

    #[test]
    fn nonces_advance_on_success_only() {
        let (authority, mut relay, mut ledger) = setup();
        let sender = ledger.address().unwrap();

        let mut op = list(sender, 1);
        sign_as_authority(&authority, &mut op).unwrap();
        match relay.handle(&mut ledger, None, op) {
            Err(Error::BadNonce { expected, got, .. }) => {
                assert_eq!(expected, 0);
                assert_eq!(got, 1);
            }
            other => panic!("unexpected {:?}", other),
        }

        // Unsigned: rejected by the ledger, nonce not consumed
        let op = list(sender, 0);
        assert!(matches!(relay.handle(&mut ledger, None, op), Err(Error::Unauthorized)));
        assert_eq!(relay.next_nonce(&sender), 0);

        let mut op = list(sender, 0);
        sign_as_authority(&authority, &mut op).unwrap();
        relay.handle(&mut ledger, None, op.clone()).unwrap();
        assert_eq!(relay.next_nonce(&sender), 1);

        // Replay
        assert!(matches!(
            relay.handle(&mut ledger, None, op),
            Err(Error::BadNonce { .. })
        ));
        assert_eq!(ledger.ballots().unwrap().len(), 1);
    }

    #[test]
    fn owner_signature_is_checked() {
        let (authority, mut relay, mut ledger) = setup();
        let authority_address = ledger.address().unwrap();

        let mut op = list(authority_address, 0);
        sign_as_authority(&authority, &mut op).unwrap();
        relay.handle(&mut ledger, None, op).unwrap();

        let (secret, voting_key) = generate_keypair();
        let public = authority.public_key();
        let stamp = derive_stamp(&voter_address(&voting_key), &public.modulus);
        let credential = Credential {
            signature: stamp.0.modpow(authority.private_exponent(), &public.modulus),
            stamp,
        };
        let mut op = RelayedOperation::new(
            authority_address,
            1,
            Call::SubmitVotingKey(VotingKeySubmission {
                voting_key,
                credential,
            }),
        );
        sign_as_authority(&authority, &mut op).unwrap();
        let account = match relay.handle(&mut ledger, None, op).unwrap() {
            Receipt::VoterRegistered { account, .. } => account,
            other => panic!("unexpected {:?}", other),
        };

        let vote = || {
            RelayedOperation::new(account, 0, Call::SubmitVote(VoteSubmission { candidate_id: 0 }))
        };

        // Signed by someone else
        let (impostor, _) = generate_keypair();
        let mut op = vote();
        sign_as_voter(&impostor, &mut op);
        assert!(matches!(relay.handle(&mut ledger, None, op), Err(Error::Unauthorized)));

        // Garbage signature bytes
        let mut op = vote();
        op.signature = vec![1, 2, 3];
        assert!(matches!(relay.handle(&mut ledger, None, op), Err(Error::Unauthorized)));
        assert_eq!(ledger.total_votes().unwrap(), 0);

        let mut op = vote();
        sign_as_voter(&secret, &mut op);
        relay.handle(&mut ledger, None, op).unwrap();
        assert_eq!(ledger.total_votes().unwrap(), 1);
        assert_eq!(relay.next_nonce(&account), 1);
    }

    #[test]
    fn sponsorship_is_enforced() {
        let (authority, mut relay, mut ledger) = setup();
        let sender = ledger.address().unwrap();
        let mut sponsor = Sponsor::new(Address::from_hash(&[b"sponsor"]), sender);

        // Requests a sponsor the relay was not given
        let mut op = list(sender, 0).sponsored_by(sponsor.address());
        sign_as_authority(&authority, &mut op).unwrap();
        assert!(matches!(
            relay.handle(&mut ledger, None, op.clone()),
            Err(Error::NotSponsored(_))
        ));
        assert!(matches!(
            relay.handle(&mut ledger, Some(&sponsor), op.clone()),
            Err(Error::SponsorUnfunded)
        ));

        sponsor.deposit_to(1_000);
        relay.handle(&mut ledger, Some(&sponsor), op).unwrap();
        assert_eq!(ledger.ballots().unwrap().len(), 1);
    }
}
