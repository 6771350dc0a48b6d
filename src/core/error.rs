use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};

/// Application-wide Result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Main application error type
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    /// Malformed input: identifiers, monetary strings, missing mandatory fields
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Commission rule not found: {0}")]
    RuleNotFound(String),

    #[error("Advance not found: {0}")]
    AdvanceNotFound(String),

    #[error("Commission item not found: {0}")]
    ItemNotFound(String),

    #[error("Commission period not found: {0}")]
    PeriodNotFound(String),

    #[error("Advance cannot be approved (status: {0})")]
    AdvanceCannotApprove(String),

    #[error("Advance cannot be rejected (status: {0})")]
    AdvanceCannotReject(String),

    #[error("Advance cannot be deducted (status: {0})")]
    AdvanceCannotDeduct(String),

    #[error("Advance cannot be cancelled (status: {0})")]
    AdvanceCannotCancel(String),

    #[error("Advance cannot be deleted (status: {0})")]
    AdvanceCannotDelete(String),

    #[error("Commission item already processed: {0}")]
    ItemAlreadyProcessed(String),

    #[error("Commission item cannot be deleted (status: {0})")]
    ItemCannotDelete(String),

    #[error("Commission item cannot be updated (status: {0})")]
    ItemCannotUpdate(String),

    #[error("Commission period cannot be closed (status: {0})")]
    PeriodCannotClose(String),

    #[error("Commission period cannot be paid (status: {0})")]
    PeriodCannotPay(String),

    #[error("Commission period cannot be deleted (status: {0})")]
    PeriodCannotDelete(String),

    #[error("Commission period cannot be adjusted (status: {0})")]
    PeriodCannotAdjust(String),

    #[error("Commission period is not closed (status: {0})")]
    PeriodNotClosed(String),

    #[error("Commission rule is referenced by commission items: {0}")]
    RuleInUse(String),

    #[error("No commission rule applies: {0}")]
    NoApplicableRule(String),

    /// Database operation errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Failures reported by the financial subsystem or the professional directory
    #[error("Collaborator error: {0}")]
    Collaborator(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let status_code = self.status_code();
        let error_message = self.to_string();

        HttpResponse::build(status_code).json(serde_json::json!({
            "error": {
                "message": error_message,
                "code": status_code.as_u16(),
            }
        }))
    }

    fn status_code(&self) -> StatusCode {
        if self.is_not_found() {
            return StatusCode::NOT_FOUND;
        }
        if self.is_invariant_violation() {
            return StatusCode::CONFLICT;
        }

        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Collaborator(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// Helper functions for common error scenarios
impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn collaborator(msg: impl Into<String>) -> Self {
        AppError::Collaborator(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, AppError::Validation(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            AppError::RuleNotFound(_)
                | AppError::AdvanceNotFound(_)
                | AppError::ItemNotFound(_)
                | AppError::PeriodNotFound(_)
        )
    }

    /// Illegal state transitions and other named domain conditions
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            AppError::AdvanceCannotApprove(_)
                | AppError::AdvanceCannotReject(_)
                | AppError::AdvanceCannotDeduct(_)
                | AppError::AdvanceCannotCancel(_)
                | AppError::AdvanceCannotDelete(_)
                | AppError::ItemAlreadyProcessed(_)
                | AppError::ItemCannotDelete(_)
                | AppError::ItemCannotUpdate(_)
                | AppError::PeriodCannotClose(_)
                | AppError::PeriodCannotPay(_)
                | AppError::PeriodCannotDelete(_)
                | AppError::PeriodCannotAdjust(_)
                | AppError::PeriodNotClosed(_)
                | AppError::RuleInUse(_)
                | AppError::NoApplicableRule(_)
        )
    }
}
