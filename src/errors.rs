use thiserror::Error;
use tokio_cron_scheduler::JobSchedulerError;

use crate::db::DatabaseError;
use crate::validation::ValidationError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] JobSchedulerError),
    #[error("Configuration error: {0}")]
    Config(#[from] envconfig::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Return type of bot endpoints, as the dispatcher expects.
pub type HandlerResult = std::result::Result<(), Box<dyn std::error::Error + Send + Sync>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startup_errors_keep_their_source_message() {
        let err: AppError = ValidationError::InvalidOffset.into();
        assert_eq!(err.to_string(), ValidationError::InvalidOffset.to_string());

        let err: AppError = DatabaseError::NotFound("medication".to_string()).into();
        assert_eq!(err.to_string(), "medication not found");
    }
}
