use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettleError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Entity store unavailable: {reason}")]
    StoreUnavailable { reason: String },

    #[error("Invalid period: {reason}")]
    InvalidPeriod { reason: String },

    #[error("Invalid settlement config: {reason}")]
    InvalidConfig { reason: String },

    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SettleError {
    pub fn invalid_period(reason: impl Into<String>) -> Self {
        SettleError::InvalidPeriod { reason: reason.into() }
    }

    pub fn invalid_config(reason: impl Into<String>) -> Self {
        SettleError::InvalidConfig { reason: reason.into() }
    }
}

pub type SettleResult<T> = Result<T, SettleError>;
