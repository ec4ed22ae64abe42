mod desc;
mod results;
mod spec;

pub use desc::{CandidateDescription, CandidateWithVotes, ElectionDescription, ElectionWithCandidates};
pub use results::{CandidateResult, ElectionResults, Winner};
pub use spec::{CandidateSpec, ElectionSpec, StatusChange, VoteSpec};
