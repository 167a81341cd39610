use std::fmt;

use influ_db::DbError;
use influ_graph::GraphError;
use thiserror::Error;

/// Pipeline stage an ingestion failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Profile,
    AudienceCity,
    AudienceGenderAge,
    Media,
    Discovery,
    Persist,
}

impl Stage {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Profile => "profile",
            Stage::AudienceCity => "audience_city",
            Stage::AudienceGenderAge => "audience_gender_age",
            Stage::Media => "media",
            Stage::Discovery => "discovery",
            Stage::Persist => "persist",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse classification of [`IngestError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A required field was absent from an API response or identity record.
    UpstreamDataMissing,
    /// Network failure, timeout, or non-2xx status.
    Transport,
    /// A response did not have the expected shape.
    MalformedResponse,
    Store,
    Deadline,
}

/// Terminal failure of one influencer's ingestion. Nothing has been written
/// when one of these is returned.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("influencer {influencer_id}: {stage} request failed: {source}")]
    Upstream {
        influencer_id: i64,
        stage: Stage,
        #[source]
        source: GraphError,
    },

    #[error("influencer {influencer_id}: {stage} response is missing {field}")]
    UpstreamDataMissing {
        influencer_id: i64,
        stage: Stage,
        field: String,
    },

    #[error("influencer {influencer_id}: malformed {stage} response: {reason}")]
    MalformedResponse {
        influencer_id: i64,
        stage: Stage,
        reason: String,
    },

    #[error("influencer {influencer_id} has no Instagram channel")]
    NoInstagramChannel { influencer_id: i64 },

    #[error("influencer {influencer_id}: ingestion exceeded the {secs}s deadline")]
    DeadlineExceeded { influencer_id: i64, secs: u64 },

    #[error("influencer {influencer_id}: failed to persist insights: {source}")]
    Store {
        influencer_id: i64,
        #[source]
        source: DbError,
    },
}

impl IngestError {
    /// Attributes a Graph API failure to an influencer and stage.
    #[must_use]
    pub fn from_graph(influencer_id: i64, stage: Stage, err: GraphError) -> Self {
        match err {
            GraphError::MissingData { context } => Self::UpstreamDataMissing {
                influencer_id,
                stage,
                field: context,
            },
            GraphError::Deserialize { .. }
            | GraphError::PaginationLimit { .. }
            | GraphError::InvalidUrl { .. } => Self::MalformedResponse {
                influencer_id,
                stage,
                reason: err.to_string(),
            },
            GraphError::Http(_) | GraphError::UnexpectedStatus { .. } => Self::Upstream {
                influencer_id,
                stage,
                source: err,
            },
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Upstream { .. } => ErrorKind::Transport,
            Self::UpstreamDataMissing { .. } | Self::NoInstagramChannel { .. } => {
                ErrorKind::UpstreamDataMissing
            }
            Self::MalformedResponse { .. } => ErrorKind::MalformedResponse,
            Self::DeadlineExceeded { .. } => ErrorKind::Deadline,
            Self::Store { .. } => ErrorKind::Store,
        }
    }

    /// The failing stage; `None` when the deadline expired.
    #[must_use]
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Upstream { stage, .. }
            | Self::UpstreamDataMissing { stage, .. }
            | Self::MalformedResponse { stage, .. } => Some(*stage),
            Self::NoInstagramChannel { .. } => Some(Stage::Discovery),
            Self::Store { .. } => Some(Stage::Persist),
            Self::DeadlineExceeded { .. } => None,
        }
    }

    #[must_use]
    pub fn influencer_id(&self) -> i64 {
        match self {
            Self::Upstream { influencer_id, .. }
            | Self::UpstreamDataMissing { influencer_id, .. }
            | Self::MalformedResponse { influencer_id, .. }
            | Self::NoInstagramChannel { influencer_id }
            | Self::DeadlineExceeded { influencer_id, .. }
            | Self::Store { influencer_id, .. } => *influencer_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_data_maps_to_upstream_data_missing() {
        let err = IngestError::from_graph(
            4,
            Stage::AudienceCity,
            GraphError::MissingData {
                context: "audience_city insight".to_owned(),
            },
        );
        assert_eq!(err.kind(), ErrorKind::UpstreamDataMissing);
        assert_eq!(err.stage(), Some(Stage::AudienceCity));
        assert_eq!(err.influencer_id(), 4);
    }

    #[test]
    fn status_errors_are_transport() {
        let err = IngestError::from_graph(
            4,
            Stage::Media,
            GraphError::UnexpectedStatus {
                status: 500,
                url: "https://g.example/1/media".to_owned(),
                message: "boom".to_owned(),
            },
        );
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(err.to_string().contains("media request failed"));
    }

    #[test]
    fn pagination_limit_is_malformed() {
        let err =
            IngestError::from_graph(1, Stage::Media, GraphError::PaginationLimit { max_pages: 2 });
        assert_eq!(err.kind(), ErrorKind::MalformedResponse);
    }

    #[test]
    fn deadline_has_no_stage() {
        let err = IngestError::DeadlineExceeded {
            influencer_id: 9,
            secs: 600,
        };
        assert_eq!(err.kind(), ErrorKind::Deadline);
        assert!(err.stage().is_none());
    }

    #[test]
    fn stage_names_are_snake_case() {
        assert_eq!(Stage::AudienceGenderAge.to_string(), "audience_gender_age");
        assert_eq!(Stage::Persist.as_str(), "persist");
    }
}
