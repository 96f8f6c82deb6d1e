use thiserror::Error;

use crate::model::{MatchId, TeamId};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("write rejected for match {match_id}")]
    WriteRejected { match_id: MatchId },
}

#[derive(Debug, Error)]
pub enum SimError {
    #[error("no unplayed matches left to simulate")]
    NoUnplayedMatches,

    #[error("season complete: no remaining fixtures to project")]
    SeasonComplete,

    #[error("team stats unavailable for team {team_id}")]
    StatsUnavailable { team_id: TeamId },

    #[error("season driver stalled after week {week}: {unplayed} fixtures still unplayed")]
    ProgressStall { week: u32, unplayed: usize },

    #[error("persistence error: {0}")]
    Persistence(#[from] StoreError),
}

pub type SimResult<T> = Result<T, SimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_convert_into_persistence() {
        let err: SimError = StoreError::Unavailable("down".to_string()).into();
        assert!(matches!(err, SimError::Persistence(_)));
        assert!(err.to_string().contains("down"));
    }

    #[test]
    fn stall_message_names_week_and_count() {
        let err = SimError::ProgressStall {
            week: 3,
            unplayed: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("week 3"));
        assert!(msg.contains("2 fixtures"));
    }
}
