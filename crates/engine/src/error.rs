//! The module contains the errors the engine can throw.
//!
//! Validation errors (the split inputs are inconsistent):
//!
//! - [`PercentageMismatch`] percentages do not sum to 100.
//! - [`ExactAmountMismatch`] exact amounts do not sum to the expense total.
//! - [`ZeroShares`] share weights sum to zero.
//! - [`ParticipantCount`] wrong number of participants for the split method.
//! - [`InvalidOweSide`] two-person owe side is neither `you` nor `other`.
//!
//! Referential errors use [`KeyNotFound`]; a lost optimistic-concurrency race
//! on a settlement write is reported as [`Conflict`].
//!
//!  [`PercentageMismatch`]: EngineError::PercentageMismatch
//!  [`ExactAmountMismatch`]: EngineError::ExactAmountMismatch
//!  [`ZeroShares`]: EngineError::ZeroShares
//!  [`ParticipantCount`]: EngineError::ParticipantCount
//!  [`InvalidOweSide`]: EngineError::InvalidOweSide
//!  [`KeyNotFound`]: EngineError::KeyNotFound
//!  [`Conflict`]: EngineError::Conflict
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Percentages must sum to 100: {0}")]
    PercentageMismatch(String),
    #[error("Exact amounts must sum to the total: {0}")]
    ExactAmountMismatch(String),
    #[error("Total shares must be greater than zero: {0}")]
    ZeroShares(String),
    #[error("Invalid participant count: {0}")]
    ParticipantCount(String),
    #[error("Invalid owe side: {0}")]
    InvalidOweSide(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Concurrent update: {0}")]
    Conflict(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl EngineError {
    /// `true` for errors caused by inconsistent split or settlement input.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::PercentageMismatch(_)
                | Self::ExactAmountMismatch(_)
                | Self::ZeroShares(_)
                | Self::ParticipantCount(_)
                | Self::InvalidOweSide(_)
                | Self::InvalidAmount(_)
        )
    }

    /// `true` for referential failures (unknown user, expense or participant).
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::KeyNotFound(_))
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::PercentageMismatch(a), Self::PercentageMismatch(b)) => a == b,
            (Self::ExactAmountMismatch(a), Self::ExactAmountMismatch(b)) => a == b,
            (Self::ZeroShares(a), Self::ZeroShares(b)) => a == b,
            (Self::ParticipantCount(a), Self::ParticipantCount(b)) => a == b,
            (Self::InvalidOweSide(a), Self::InvalidOweSide(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::Forbidden(a), Self::Forbidden(b)) => a == b,
            (Self::Conflict(a), Self::Conflict(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
