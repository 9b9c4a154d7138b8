use thiserror::Error;

#[derive(Error, Debug)]
pub enum AttributionError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unknown attribution model: {model}")]
    UnknownModel { model: String },

    #[error("Deal amount must be positive, got {amount}")]
    InvalidAmount { amount: f64 },

    #[error("Invalid timestamp '{value}': expected ISO-8601")]
    InvalidTimestamp { value: String },

    #[error("Deal '{deal_id}' not found")]
    DealNotFound { deal_id: String },

    #[error("Partner '{partner_id}' not found")]
    PartnerNotFound { partner_id: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type AttributionResult<T> = Result<T, AttributionError>;
