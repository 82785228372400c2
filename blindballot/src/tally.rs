use crate::*;
use indexmap::IndexMap;
use std::collections::HashSet;

/// Records votes against the candidate registry
pub trait TallyEngine {
    /// Check that `record_vote` would succeed, without recording anything
    fn check_vote(
        &self,
        ballots: &Ballots,
        account: &Address,
        candidate: CandidateId,
    ) -> Result<(), Error>;

    /// Record one vote from `account` for `candidate`
    ///
    /// Fails with `UnknownCandidate` for ids outside the registry and with
    /// `DuplicateVote` for an account that already has a vote on record.
    fn record_vote(
        &mut self,
        ballots: &Ballots,
        account: Address,
        candidate: CandidateId,
    ) -> Result<(), Error>;

    /// Votes recorded for one candidate
    fn votes_for(&self, candidate: CandidateId) -> u64;

    /// Votes recorded in total
    fn total_votes(&self) -> u64;

    /// Totals for every listed candidate, in candidate order
    fn results(&self, ballots: &Ballots) -> TallyResult {
        let mut totals = IndexMap::new();
        for candidate in ballots.iter() {
            totals.insert(candidate.id, self.votes_for(candidate.id));
        }

        TallyResult {
            num_votes: self.total_votes(),
            totals,
        }
    }
}

/// Per-candidate vote counts plus the running total
///
/// `total_votes` always equals the sum of the per-candidate counts; both only grow.
#[derive(Default, Clone, Debug)]
pub struct Tally {
    counts: IndexMap<CandidateId, u64>,
    total: u64,
    voted: HashSet<Address>,
}

impl Tally {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TallyEngine for Tally {
    fn check_vote(
        &self,
        ballots: &Ballots,
        account: &Address,
        candidate: CandidateId,
    ) -> Result<(), Error> {
        if !ballots.contains(candidate) {
            return Err(Error::UnknownCandidate(candidate));
        }
        if self.voted.contains(account) {
            return Err(Error::DuplicateVote(*account));
        }
        Ok(())
    }

    fn record_vote(
        &mut self,
        ballots: &Ballots,
        account: Address,
        candidate: CandidateId,
    ) -> Result<(), Error> {
        self.check_vote(ballots, &account, candidate)?;

        self.voted.insert(account);
        *self.counts.entry(candidate).or_insert(0) += 1;
        self.total += 1;

        debug!("recorded vote for candidate {}, total {}", candidate, self.total);
        Ok(())
    }

    fn votes_for(&self, candidate: CandidateId) -> u64 {
        self.counts.get(&candidate).copied().unwrap_or(0)
    }

    fn total_votes(&self) -> u64 {
        self.total
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TallyResult {
    pub num_votes: u64,
    pub totals: IndexMap<CandidateId, u64>,
}
