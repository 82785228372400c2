use crate::*;
use ed25519_dalek::PublicKey;

#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VoteState {
    Unvoted,
    Voted,
}

/// A voter's account, bound to the voter's signing key
///
/// Holds exactly one vote. `Unvoted -> Voted` happens once and is never undone.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct VoterAccount {
    pub address: Address,

    #[serde(with = "EdPublicKeyHex")]
    pub owner: PublicKey,

    state: VoteState,
}

impl VoterAccount {
    pub fn new(address: Address, owner: PublicKey) -> Self {
        VoterAccount {
            address,
            owner,
            state: VoteState::Unvoted,
        }
    }

    pub fn state(&self) -> VoteState {
        self.state
    }

    pub fn has_voted(&self) -> bool {
        self.state == VoteState::Voted
    }

    /// Cast this account's vote and forward it to the tally
    ///
    /// `is_owner` is the relay's verdict on the operation signature. Nothing
    /// changes unless both this account and the tally accept the vote.
    pub fn submit_vote<T: TallyEngine>(
        &mut self,
        is_owner: bool,
        candidate: CandidateId,
        ballots: &Ballots,
        tally: &mut T,
    ) -> Result<(), Error> {
        if !is_owner {
            return Err(Error::Unauthorized);
        }
        if self.has_voted() {
            return Err(Error::AlreadyVoted);
        }

        tally.record_vote(ballots, self.address, candidate)?;
        self.state = VoteState::Voted;

        Ok(())
    }
}
