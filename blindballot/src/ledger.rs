use crate::*;
use ed25519_dalek::PublicKey;
use std::collections::HashSet;

/// Evidence that the authority signed an operation: the operation hash and the
/// authority's PKCS#1 v1.5 signature over its digest
#[derive(Clone, Debug)]
pub struct OperationAuthorization {
    pub operation_hash: OperationHash,
    pub signature: Vec<u8>,
}

impl From<&RelayedOperation> for OperationAuthorization {
    fn from(operation: &RelayedOperation) -> Self {
        OperationAuthorization {
            operation_hash: operation.hash(),
            signature: operation.signature.clone(),
        }
    }
}

/// What a successful relayed call did
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "outcome")]
#[serde(rename_all = "snake_case")]
pub enum Receipt {
    CandidateListed {
        candidate_id: CandidateId,
    },
    VoterRegistered {
        index: usize,
        account: Address,
    },
    VoteRecorded {
        account: Address,
        candidate_id: CandidateId,
    },
}

struct LedgerState<F, T> {
    relay: Address,
    address: Address,
    public_key: AuthorityPublicKey,
    factory: F,
    tally: T,
    ballots: Ballots,
    stamped: HashSet<Stamp>,
}

/// The election authority's ledger state
///
/// Owns the authority's public key, the candidate registry, the set of
/// redeemed stamps, the account factory and the tally. Every mutating
/// operation checks all of its preconditions before it changes anything, so a
/// failed operation leaves the ledger exactly as it was.
pub struct AuthorityLedger<F = VoterAccountFactory, T = Tally> {
    state: Option<LedgerState<F, T>>,
}

impl<F: AccountFactory, T: TallyEngine> Default for AuthorityLedger<F, T> {
    fn default() -> Self {
        AuthorityLedger { state: None }
    }
}

impl AuthorityLedger {
    /// Set up a ledger with a fresh factory, tally and candidate registry
    pub fn setup(relay: Address, public_key: AuthorityPublicKey) -> Result<Self, Error> {
        let factory = VoterAccountFactory::new(Address::from_hash(&[
            b"blindballot.factory",
            public_key.address().as_bytes(),
        ]));

        let mut ledger = AuthorityLedger::new();
        ledger.initialize(relay, factory, Tally::new(), Ballots::new(), public_key)?;
        Ok(ledger)
    }
}

impl<F: AccountFactory, T: TallyEngine> AuthorityLedger<F, T> {
    /// An uninitialized ledger. Everything but `initialize` fails with `NotInitialized`.
    pub fn new() -> Self {
        Self::default()
    }

    /// One-time election setup
    pub fn initialize(
        &mut self,
        relay: Address,
        factory: F,
        tally: T,
        ballots: Ballots,
        public_key: AuthorityPublicKey,
    ) -> Result<(), Error> {
        if self.state.is_some() {
            return Err(Error::AlreadyInitialized);
        }
        public_key.validate()?;

        let address = public_key.address();
        info!(
            "initialized authority {} with a {} bit key, relay {}",
            address,
            public_key.bits(),
            relay
        );

        self.state = Some(LedgerState {
            relay,
            address,
            public_key,
            factory,
            tally,
            ballots,
            stamped: HashSet::new(),
        });
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    fn state(&self) -> Result<&LedgerState<F, T>, Error> {
        self.state.as_ref().ok_or(Error::NotInitialized)
    }

    fn state_mut(&mut self) -> Result<&mut LedgerState<F, T>, Error> {
        self.state.as_mut().ok_or(Error::NotInitialized)
    }

    /// The authority account's address
    pub fn address(&self) -> Result<Address, Error> {
        Ok(self.state()?.address)
    }

    pub fn rsa_pub_key(&self) -> Result<&AuthorityPublicKey, Error> {
        Ok(&self.state()?.public_key)
    }

    /// The stamp of an address under this authority's key
    pub fn stamp(&self, address: &Address) -> Result<Stamp, Error> {
        Ok(derive_stamp(address, &self.state()?.public_key.modulus))
    }

    /// Whether a stamp has already been redeemed
    pub fn is_registered(&self, stamp: &Stamp) -> Result<bool, Error> {
        Ok(self.state()?.stamped.contains(stamp))
    }

    pub fn get_candidate(&self, id: CandidateId) -> Result<&Candidate, Error> {
        self.state()?
            .ballots
            .get(id)
            .ok_or(Error::UnknownCandidate(id))
    }

    pub fn ballots(&self) -> Result<&Ballots, Error> {
        Ok(&self.state()?.ballots)
    }

    pub fn total_votes(&self) -> Result<u64, Error> {
        Ok(self.state()?.tally.total_votes())
    }

    pub fn results(&self) -> Result<TallyResult, Error> {
        let state = self.state()?;
        Ok(state.tally.results(&state.ballots))
    }

    /// Address of the voter account registered `index`-th
    pub fn get_voter_account(&self, index: usize) -> Result<Option<Address>, Error> {
        Ok(self.state()?.factory.get_account(index))
    }

    /// Look up a voter account by address. `None` before initialization.
    pub fn voter_account(&self, address: &Address) -> Option<&VoterAccount> {
        self.state.as_ref()?.factory.account(address)
    }

    pub fn num_voters(&self) -> Result<usize, Error> {
        Ok(self.state()?.factory.len())
    }

    /// Privileged: append a candidate to the registry
    pub fn list_candidate(
        &mut self,
        authorization: &OperationAuthorization,
        candidate: NewCandidate,
    ) -> Result<CandidateId, Error> {
        let state = self.state_mut()?;
        state.authorize(authorization)?;

        Ok(state.ballots.list(candidate))
    }

    /// Redeem a credential and create a voter account bound to `voting_key`
    ///
    /// Returns the registration index and the new account's address.
    pub fn submit_voting_key(
        &mut self,
        authorization: &OperationAuthorization,
        voting_key: PublicKey,
        credential: &Credential,
    ) -> Result<(usize, Address), Error> {
        let state = self.state_mut()?;
        state.authorize(authorization)?;

        if state.stamped.contains(&credential.stamp) {
            return Err(Error::AlreadyRegistered);
        }
        if !state.public_key.verify_credential(credential) {
            return Err(Error::InvalidCredential);
        }
        state.factory.check_create(&voting_key)?;

        let index = state.factory.len();
        let account = state.factory.create_account(voting_key)?;
        state.stamped.insert(credential.stamp.clone());

        Ok((index, account))
    }

    /// Cast the single vote of a voter account
    ///
    /// `is_owner` is the relay's verdict on whether the account owner signed the operation.
    pub fn submit_vote(
        &mut self,
        account: &Address,
        is_owner: bool,
        candidate: CandidateId,
    ) -> Result<(), Error> {
        let LedgerState {
            factory,
            tally,
            ballots,
            ..
        } = self.state_mut()?;

        let voter = factory
            .account_mut(account)
            .ok_or(Error::UnknownAccount(*account))?;
        voter.submit_vote(is_owner, candidate, ballots, tally)
    }

    /// Apply one relayed call
    pub fn execute(&mut self, call: &RelayedCall) -> Result<Receipt, Error> {
        let (relay, authority) = {
            let state = self.state()?;
            (state.relay, state.address)
        };
        let operation = &call.operation;

        let result = if call.relay != relay {
            Err(Error::Unauthorized)
        } else if operation.sender == authority {
            self.execute_as_authority(operation)
        } else {
            self.execute_as_voter(operation, call.sender_verified)
        };

        match &result {
            Ok(receipt) => info!(
                "{} from {} nonce {}: {:?}",
                operation.call_type(),
                operation.sender,
                operation.nonce,
                receipt
            ),
            Err(e) => warn!(
                "{} from {} nonce {} rejected: {}",
                operation.call_type(),
                operation.sender,
                operation.nonce,
                e
            ),
        }
        result
    }

    fn execute_as_authority(&mut self, operation: &RelayedOperation) -> Result<Receipt, Error> {
        let authorization = OperationAuthorization::from(operation);

        match &operation.call {
            Call::ListCandidate(candidate) => {
                let candidate_id = self.list_candidate(&authorization, candidate.clone())?;
                Ok(Receipt::CandidateListed { candidate_id })
            }
            Call::SubmitVotingKey(submission) => {
                let (index, account) = self.submit_voting_key(
                    &authorization,
                    submission.voting_key,
                    &submission.credential,
                )?;
                Ok(Receipt::VoterRegistered { index, account })
            }
            // The authority account has no vote to cast
            Call::SubmitVote(_) => Err(Error::Unauthorized),
        }
    }

    fn execute_as_voter(
        &mut self,
        operation: &RelayedOperation,
        sender_verified: bool,
    ) -> Result<Receipt, Error> {
        let account = operation.sender;
        if self.voter_account(&account).is_none() {
            return Err(Error::UnknownAccount(account));
        }

        match &operation.call {
            Call::SubmitVote(vote) => {
                self.submit_vote(&account, sender_verified, vote.candidate_id)?;
                Ok(Receipt::VoteRecorded {
                    account,
                    candidate_id: vote.candidate_id,
                })
            }
            // Only the authority lists candidates and redeems credentials
            _ => Err(Error::Unauthorized),
        }
    }
}

impl<F, T> LedgerState<F, T> {
    fn authorize(&self, authorization: &OperationAuthorization) -> Result<(), Error> {
        self.public_key
            .verify_operation(&authorization.operation_hash, &authorization.signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    struct Fixture {
        authority: AuthorityKeyPair,
        relay: Address,
        ledger: AuthorityLedger,
        nonce: u64,
    }

    impl Fixture {
        fn new() -> Self {
            let authority = AuthorityKeyPair::test_key();
            let relay = Address::from_hash(&[b"relay"]);
            let ledger = AuthorityLedger::setup(relay, authority.public_key()).unwrap();
            Fixture {
                authority,
                relay,
                ledger,
                nonce: 0,
            }
        }

        fn authority_op(&mut self, call: Call) -> RelayedCall {
            let mut operation = RelayedOperation::new(self.ledger.address().unwrap(), self.nonce, call);
            self.nonce += 1;
            operation.signature = self.authority.authorize_operation(&operation.hash()).unwrap();
            RelayedCall {
                relay: self.relay,
                operation,
                sender_verified: false,
            }
        }

        fn credential(&self, voting_key: &PublicKey) -> Credential {
            let public = self.authority.public_key();
            let mut rng = ChaCha20Rng::seed_from_u64(9);
            let request = CredentialRequest::new(&mut rng, &voter_address(voting_key), &public).unwrap();
            let blinded_signature = self.authority.sign_blinded_stamp(&request.blinded);
            request.finalize(&blinded_signature, &public).unwrap()
        }

        fn register(&mut self, voting_key: PublicKey) -> Result<Receipt, Error> {
            let credential = self.credential(&voting_key);
            let call = self.authority_op(Call::SubmitVotingKey(VotingKeySubmission {
                voting_key,
                credential,
            }));
            self.ledger.execute(&call)
        }

        fn list(&mut self, info: &[u8]) -> Result<Receipt, Error> {
            let call = self.authority_op(Call::ListCandidate(NewCandidate {
                info: info.to_vec(),
            }));
            self.ledger.execute(&call)
        }
    }

    fn vote(account: Address, candidate_id: CandidateId, relay: Address, verified: bool) -> RelayedCall {
        RelayedCall {
            relay,
            operation: RelayedOperation::new(
                account,
                0,
                Call::SubmitVote(VoteSubmission { candidate_id }),
            ),
            sender_verified: verified,
        }
    }

    #[test]
    fn initialize_once() {
        let authority = AuthorityKeyPair::test_key();
        let relay = Address::from_hash(&[b"relay"]);

        let mut ledger: AuthorityLedger = AuthorityLedger::new();
        assert!(!ledger.is_initialized());
        assert!(matches!(ledger.total_votes(), Err(Error::NotInitialized)));

        let factory = VoterAccountFactory::new(Address::from_hash(&[b"factory"]));
        ledger
            .initialize(relay, factory.clone(), Tally::new(), Ballots::new(), authority.public_key())
            .unwrap();
        assert!(matches!(
            ledger.initialize(relay, factory, Tally::new(), Ballots::new(), authority.public_key()),
            Err(Error::AlreadyInitialized)
        ));
        assert_eq!(ledger.rsa_pub_key().unwrap(), &authority.public_key());
    }

    #[test]
    fn list_candidate_requires_authority_signature() {
        let mut fixture = Fixture::new();

        assert_eq!(fixture.list(&[0xab, 0xcd]).unwrap(), Receipt::CandidateListed { candidate_id: 0 });
        assert_eq!(fixture.list(b"second").unwrap(), Receipt::CandidateListed { candidate_id: 1 });
        assert_eq!(fixture.ledger.get_candidate(0).unwrap().info, vec![0xab, 0xcd]);

        // Signature over a different operation
        let mut call = fixture.authority_op(Call::ListCandidate(NewCandidate { info: vec![1] }));
        call.operation.nonce += 100;
        assert!(matches!(fixture.ledger.execute(&call), Err(Error::Unauthorized)));

        // Signed by some other key
        let impostor = AuthorityKeyPair::generate(&mut ChaCha20Rng::seed_from_u64(5), 1024).unwrap();
        let mut call = fixture.authority_op(Call::ListCandidate(NewCandidate { info: vec![1] }));
        call.operation.signature = impostor.authorize_operation(&call.operation.hash()).unwrap();
        assert!(matches!(fixture.ledger.execute(&call), Err(Error::Unauthorized)));

        assert_eq!(fixture.ledger.ballots().unwrap().len(), 2);
        assert!(matches!(fixture.ledger.get_candidate(2), Err(Error::UnknownCandidate(2))));
    }

    #[test]
    fn calls_from_another_relay_are_rejected() {
        let mut fixture = Fixture::new();
        let mut call = fixture.authority_op(Call::ListCandidate(NewCandidate { info: vec![1] }));
        call.relay = Address::from_hash(&[b"rogue relay"]);

        assert!(matches!(fixture.ledger.execute(&call), Err(Error::Unauthorized)));
        assert!(fixture.ledger.ballots().unwrap().is_empty());
    }

    #[test]
    fn stamp_is_redeemed_once() {
        let mut fixture = Fixture::new();
        let (_, voting_key) = generate_keypair();

        let receipt = fixture.register(voting_key).unwrap();
        let account = match receipt {
            Receipt::VoterRegistered { index, account } => {
                assert_eq!(index, 0);
                account
            }
            other => panic!("unexpected receipt {:?}", other),
        };
        assert_eq!(fixture.ledger.get_voter_account(0).unwrap(), Some(account));

        let stamp = fixture.ledger.stamp(&voter_address(&voting_key)).unwrap();
        assert!(fixture.ledger.is_registered(&stamp).unwrap());

        // Same valid credential again
        assert!(matches!(fixture.register(voting_key), Err(Error::AlreadyRegistered)));

        // Same stamp with garbage signature
        let call = fixture.authority_op(Call::SubmitVotingKey(VotingKeySubmission {
            voting_key: generate_keypair().1,
            credential: Credential {
                stamp,
                signature: BigUint::from(42u32),
            },
        }));
        assert!(matches!(fixture.ledger.execute(&call), Err(Error::AlreadyRegistered)));

        assert_eq!(fixture.ledger.num_voters().unwrap(), 1);
    }

    #[test]
    fn widened_stamp_cannot_register_again() {
        let mut fixture = Fixture::new();
        let (_, voting_key) = generate_keypair();
        let credential = fixture.credential(&voting_key);
        fixture.register(voting_key).unwrap();

        for k in 1u32..5 {
            let widened = Credential {
                stamp: Stamp(&credential.stamp.0 + (BigUint::from(k) << STAMP_BITS)),
                signature: credential.signature.clone(),
            };
            let call = fixture.authority_op(Call::SubmitVotingKey(VotingKeySubmission {
                voting_key: generate_keypair().1,
                credential: widened,
            }));
            assert!(matches!(fixture.ledger.execute(&call), Err(Error::InvalidCredential)));
        }

        assert_eq!(fixture.ledger.num_voters().unwrap(), 1);
    }

    #[test]
    fn invalid_credential_registers_nothing() {
        let mut fixture = Fixture::new();
        let (_, voting_key) = generate_keypair();

        let mut credential = fixture.credential(&voting_key);
        credential.signature += 1u32;
        let stamp = credential.stamp.clone();

        let call = fixture.authority_op(Call::SubmitVotingKey(VotingKeySubmission {
            voting_key,
            credential,
        }));
        assert!(matches!(fixture.ledger.execute(&call), Err(Error::InvalidCredential)));
        assert!(!fixture.ledger.is_registered(&stamp).unwrap());
        assert_eq!(fixture.ledger.num_voters().unwrap(), 0);

        // The stamp is still redeemable with the genuine credential
        fixture.register(voting_key).unwrap();
    }

    #[test]
    fn second_credential_for_same_key_is_rejected_atomically() {
        let mut fixture = Fixture::new();
        let (_, voting_key) = generate_keypair();
        fixture.register(voting_key).unwrap();

        // A genuine credential for another stamp, bound to a key that already has an account
        let other = Address::from_hash(&[b"other voter"]);
        let public = fixture.authority.public_key();
        let stamp = derive_stamp(&other, &public.modulus);
        let credential = Credential {
            signature: stamp.0.modpow(fixture.authority.private_exponent(), &public.modulus),
            stamp: stamp.clone(),
        };
        let call = fixture.authority_op(Call::SubmitVotingKey(VotingKeySubmission {
            voting_key,
            credential,
        }));
        assert!(matches!(fixture.ledger.execute(&call), Err(Error::AlreadyExists)));
        assert!(!fixture.ledger.is_registered(&stamp).unwrap());
    }

    #[test]
    fn voter_votes_once() {
        let mut fixture = Fixture::new();
        fixture.list(b"alice").unwrap();
        fixture.list(b"bob").unwrap();

        let (_, voting_key) = generate_keypair();
        fixture.register(voting_key).unwrap();
        let account = fixture.ledger.get_voter_account(0).unwrap().unwrap();
        let relay = fixture.relay;

        // Not signed by the owner
        assert!(matches!(
            fixture.ledger.execute(&vote(account, 1, relay, false)),
            Err(Error::Unauthorized)
        ));

        // Unknown candidate
        assert!(matches!(
            fixture.ledger.execute(&vote(account, 7, relay, true)),
            Err(Error::UnknownCandidate(7))
        ));
        assert_eq!(fixture.ledger.total_votes().unwrap(), 0);

        let receipt = fixture.ledger.execute(&vote(account, 1, relay, true)).unwrap();
        assert_eq!(receipt, Receipt::VoteRecorded { account, candidate_id: 1 });
        assert_eq!(fixture.ledger.total_votes().unwrap(), 1);

        assert!(matches!(
            fixture.ledger.execute(&vote(account, 0, relay, true)),
            Err(Error::AlreadyVoted)
        ));
        assert_eq!(fixture.ledger.total_votes().unwrap(), 1);
        assert!(fixture.ledger.voter_account(&account).unwrap().has_voted());

        let results = fixture.ledger.results().unwrap();
        assert_eq!(results.totals.get(&1), Some(&1));
        assert_eq!(results.totals.get(&0), Some(&0));
    }

    #[test]
    fn calls_are_routed_by_sender() {
        let mut fixture = Fixture::new();
        fixture.list(b"alice").unwrap();
        let relay = fixture.relay;

        // Unknown sender
        let stranger = Address::from_hash(&[b"stranger"]);
        assert!(matches!(
            fixture.ledger.execute(&vote(stranger, 0, relay, true)),
            Err(Error::UnknownAccount(_))
        ));

        // The authority has no vote
        let call = fixture.authority_op(Call::SubmitVote(VoteSubmission { candidate_id: 0 }));
        assert!(matches!(fixture.ledger.execute(&call), Err(Error::Unauthorized)));

        // Voter accounts cannot list candidates
        let (_, voting_key) = generate_keypair();
        fixture.register(voting_key).unwrap();
        let account = fixture.ledger.get_voter_account(0).unwrap().unwrap();
        let call = RelayedCall {
            relay,
            operation: RelayedOperation::new(
                account,
                0,
                Call::ListCandidate(NewCandidate { info: vec![] }),
            ),
            sender_verified: true,
        };
        assert!(matches!(fixture.ledger.execute(&call), Err(Error::Unauthorized)));
        assert_eq!(fixture.ledger.ballots().unwrap().len(), 1);
    }
}
