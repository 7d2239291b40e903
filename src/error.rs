use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use chrono::NaiveDate;
use serde_json::json;
use sqlx::mysql::MySqlDatabaseError;
use thiserror::Error;

use crate::model::payroll::PayrollStatus;

/// Coarse classification callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    InvalidTransition,
    PayrollLocked,
    Validation,
    Fatal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::InvalidTransition => "invalid_transition",
            ErrorKind::PayrollLocked => "payroll_locked",
            ErrorKind::Validation => "validation",
            ErrorKind::Fatal => "fatal",
        }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: u64 },

    #[error("no check-in found for {0}")]
    NotCheckedIn(NaiveDate),

    #[error("already checked in for {0}")]
    AlreadyCheckedIn(NaiveDate),

    #[error("already checked out for {0}")]
    AlreadyCheckedOut(NaiveDate),

    #[error("payroll for employee {employee_id} in {month:02}/{year} already exists")]
    DuplicatePayroll {
        employee_id: u64,
        month: u32,
        year: i32,
    },

    #[error("cannot move payroll from {from} to {to}")]
    InvalidTransition {
        from: PayrollStatus,
        to: PayrollStatus,
    },

    #[error("payroll {0} was changed concurrently, retry")]
    ConcurrentUpdate(u64),

    #[error("payroll {0} is {1} and can no longer be changed")]
    PayrollLocked(u64, PayrollStatus),

    #[error("{0}")]
    Validation(String),

    #[error("configuration fault: {0}")]
    Configuration(String),

    #[error("storage failure: {0}")]
    Storage(#[from] sqlx::Error),
}

impl EngineError {
    pub fn not_found(entity: &'static str, id: u64) -> Self {
        EngineError::NotFound { entity, id }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::NotFound { .. } | EngineError::NotCheckedIn(_) => ErrorKind::NotFound,
            EngineError::AlreadyCheckedIn(_)
            | EngineError::AlreadyCheckedOut(_)
            | EngineError::DuplicatePayroll { .. }
            | EngineError::ConcurrentUpdate(_) => ErrorKind::Conflict,
            EngineError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            EngineError::PayrollLocked(..) => ErrorKind::PayrollLocked,
            EngineError::Validation(_) => ErrorKind::Validation,
            EngineError::Configuration(_) | EngineError::Storage(_) => ErrorKind::Fatal,
        }
    }
}

/// MySQL error number for a duplicate key. SQLSTATE 23000 alone also
/// covers foreign-key and NOT NULL failures.
const ER_DUP_ENTRY: u16 = 1062;

fn is_duplicate_entry(number: u16) -> bool {
    number == ER_DUP_ENTRY
}

/// True when the database rejected a write on a unique key.
pub fn is_unique_violation(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db_err) => db_err
            .try_downcast_ref::<MySqlDatabaseError>()
            .is_some_and(|mysql| is_duplicate_entry(mysql.number())),
        _ => false,
    }
}

impl ResponseError for EngineError {
    fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict | ErrorKind::InvalidTransition | ErrorKind::PayrollLocked => {
                StatusCode::CONFLICT
            }
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Fatal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let kind = self.kind();
        let message = match kind {
            ErrorKind::Fatal => {
                tracing::error!(error = %self, "Engine failure");
                "Internal Server Error".to_string()
            }
            _ => self.to_string(),
        };

        HttpResponse::build(self.status_code()).json(json!({
            "kind": kind.as_str(),
            "message": message,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflicts_are_distinguished_from_generic_failures() {
        let e = EngineError::DuplicatePayroll {
            employee_id: 4,
            month: 3,
            year: 2026,
        };
        assert_eq!(e.kind(), ErrorKind::Conflict);
        assert_eq!(e.status_code(), StatusCode::CONFLICT);
        assert_eq!(e.to_string(), "payroll for employee 4 in 03/2026 already exists");
    }

    #[test]
    fn only_duplicate_keys_are_unique_violations() {
        assert!(is_duplicate_entry(1062));
        // foreign key and NOT NULL failures share SQLSTATE 23000
        assert!(!is_duplicate_entry(1452));
        assert!(!is_duplicate_entry(1048));
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
    }

    #[test]
    fn configuration_faults_are_fatal() {
        let e = EngineError::Configuration("no working days".into());
        assert_eq!(e.kind(), ErrorKind::Fatal);
        assert_eq!(e.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn missing_check_in_is_not_found() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        assert_eq!(EngineError::NotCheckedIn(date).kind(), ErrorKind::NotFound);
        assert_eq!(
            EngineError::Validation("bad span".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }
}
