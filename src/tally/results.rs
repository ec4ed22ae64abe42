use crate::model::{
    api::election::{CandidateResult, CandidateWithVotes, ElectionResults, Winner},
    common::election::{ElectionId, ElectionStatus},
};

/// `votes` as a whole-number share of `total`, rounded half up. Zero when nobody voted.
pub fn percentage(votes: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    // round(votes * 100 / total) == floor((votes * 200 + total) / (2 * total))
    let rounded = (votes * 200 + total) / (total * 2);
    rounded.min(100) as u8
}

/// Rank candidates and decide the winner.
///
/// `candidates` must be in listing order; equal counts keep that order.
pub fn tally(
    election_id: ElectionId,
    status: ElectionStatus,
    mut candidates: Vec<CandidateWithVotes>,
) -> ElectionResults {
    let total_votes = candidates.iter().map(|c| c.votes).sum();

    // `sort_by` is stable.
    candidates.sort_by(|a, b| b.votes.cmp(&a.votes));

    let winner = match (status, candidates.first()) {
        (ElectionStatus::Completed, Some(first)) => Winner::Decided(first.clone()),
        (ElectionStatus::Ongoing, _) => Winner::InProgress,
        _ => Winner::Undecided,
    };

    let candidates = candidates
        .into_iter()
        .map(|candidate| CandidateResult {
            percentage: percentage(candidate.votes, total_votes),
            candidate,
        })
        .collect();

    ElectionResults {
        election_id,
        status,
        candidates,
        total_votes,
        winner,
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::model::api::election::CandidateDescription;

    use super::*;

    fn candidate(id: u32, votes: u64) -> CandidateWithVotes {
        CandidateWithVotes {
            candidate: CandidateDescription {
                id,
                name: format!("Candidate {id}"),
                position: None,
                election_id: 1,
                created_at: Utc::now(),
            },
            votes,
        }
    }

    fn ids(results: &ElectionResults) -> Vec<u32> {
        results.candidates.iter().map(|c| c.candidate.candidate.id).collect()
    }

    #[test]
    fn percentages_round_half_up() {
        assert_eq!(percentage(0, 0), 0);
        assert_eq!(percentage(3, 4), 75);
        assert_eq!(percentage(1, 4), 25);
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(1, 8), 13);
        assert_eq!(percentage(1, 200), 1);
        assert_eq!(percentage(1, 201), 0);
        assert_eq!(percentage(5, 5), 100);
    }

    #[test]
    fn ties_keep_listing_order() {
        let results = tally(
            1,
            ElectionStatus::Completed,
            vec![candidate(1, 2), candidate(2, 5), candidate(3, 2), candidate(4, 5)],
        );
        assert_eq!(ids(&results), vec![2, 4, 1, 3]);
        assert_eq!(results.total_votes, 14);
        assert_eq!(results.winner, Winner::Decided(candidate_votes(&results, 0)));
    }

    fn candidate_votes(results: &ElectionResults, index: usize) -> CandidateWithVotes {
        results.candidates[index].candidate.clone()
    }

    #[test]
    fn winner_depends_on_status() {
        let cands = || vec![candidate(1, 1), candidate(2, 0)];

        assert_eq!(
            tally(1, ElectionStatus::Upcoming, cands()).winner,
            Winner::Undecided
        );
        assert_eq!(
            tally(1, ElectionStatus::Ongoing, cands()).winner,
            Winner::InProgress
        );
        match tally(1, ElectionStatus::Completed, cands()).winner {
            Winner::Decided(winner) => assert_eq!(winner.candidate.id, 1),
            other => panic!("expected a decided winner, got {other:?}"),
        }
        assert_eq!(
            tally(1, ElectionStatus::Completed, vec![]).winner,
            Winner::Undecided
        );
    }

    #[test]
    fn ordering_is_non_increasing() {
        let results = tally(
            1,
            ElectionStatus::Ongoing,
            vec![candidate(1, 0), candidate(2, 9), candidate(3, 4), candidate(4, 7)],
        );
        let votes: Vec<u64> = results
            .candidates
            .iter()
            .map(|c| c.candidate.votes)
            .collect();
        assert!(votes.windows(2).all(|pair| pair[0] >= pair[1]));
        let percent_sum: u32 = results
            .candidates
            .iter()
            .map(|c| u32::from(c.percentage))
            .sum();
        assert!((99..=101).contains(&percent_sum));
    }
}
