mod status;

pub use status::ElectionStatus;

/// Our election IDs are integers.
pub type ElectionId = u32;
/// Our candidate IDs are integers.
pub type CandidateId = u32;
/// Our vote IDs are integers.
pub type VoteId = u32;
