use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::common::election::ElectionStatus;

/// The status a new election starts in, judged against the current time.
pub fn initial_status(
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    now: DateTime<Utc>,
) -> ElectionStatus {
    if now < start_date {
        ElectionStatus::Upcoming
    } else if now <= end_date {
        ElectionStatus::Ongoing
    } else {
        ElectionStatus::Completed
    }
}

/// Which admin-requested status changes are accepted.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionPolicy {
    /// Any status may be set from any status, including reopening a completed election.
    #[default]
    Unrestricted,
    /// Status only moves forward: upcoming, then ongoing, then completed.
    ForwardOnly,
}

impl TransitionPolicy {
    pub fn allows(self, from: ElectionStatus, to: ElectionStatus) -> bool {
        use ElectionStatus::*;

        match self {
            Self::Unrestricted => true,
            Self::ForwardOnly => matches!(
                (from, to),
                (Upcoming, Upcoming)
                    | (Upcoming, Ongoing)
                    | (Upcoming, Completed)
                    | (Ongoing, Ongoing)
                    | (Ongoing, Completed)
                    | (Completed, Completed)
            ),
        }
    }

    /// Fail with `InvalidState` unless the change is allowed.
    pub fn check(self, from: ElectionStatus, to: ElectionStatus) -> Result<()> {
        if self.allows(from, to) {
            Ok(())
        } else {
            Err(Error::invalid_state(format!(
                "Cannot change election status from {from} to {to}"
            )))
        }
    }
}
