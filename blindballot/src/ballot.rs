use crate::*;
use std::convert::TryFrom;

/// Sequential candidate identifier, starting at 0
pub type CandidateId = u64;

/// Payload of a `listCandidate` call
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct NewCandidate {
    /// Opaque candidate description
    #[serde(with = "BytesHex")]
    pub info: Vec<u8>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Candidate {
    pub id: CandidateId,

    #[serde(with = "BytesHex")]
    pub info: Vec<u8>,
}

/// Append-only candidate registry
///
/// Ids are positions in insertion order; nothing is ever removed, so ids are never reused.
#[derive(Serialize, Deserialize, Default, Clone, Debug)]
pub struct Ballots {
    candidates: Vec<Candidate>,
}

impl Ballots {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a candidate and return its id
    pub fn list(&mut self, candidate: NewCandidate) -> CandidateId {
        let id = self.candidates.len() as CandidateId;
        self.candidates.push(Candidate {
            id,
            info: candidate.info,
        });
        id
    }

    /// Get a candidate with the given ID
    pub fn get(&self, id: CandidateId) -> Option<&Candidate> {
        let index = usize::try_from(id).ok()?;
        self.candidates.get(index)
    }

    pub fn contains(&self, id: CandidateId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates.iter()
    }
}
