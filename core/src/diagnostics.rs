//! Error log and static error classification.
//!
//! `ErrorLog` keeps the last `MAX_LOGGED_ERRORS` normalized errors for
//! diagnostics. It is constructed once by the host and shared by `Arc`.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{ApiError, ErrorCode};

pub const MAX_LOGGED_ERRORS: usize = 100;

/// One normalized error, as recorded in the log.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorInfo {
    #[serde(serialize_with = "serialize_code")]
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "userId", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

fn serialize_code<S: serde::Serializer>(code: &ErrorCode, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(code)
}

impl ErrorInfo {
    pub fn from_api_error(err: &ApiError, endpoint: Option<&str>, user_id: Option<i64>) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
            details: err.details(),
            timestamp: Utc::now(),
            user_id,
            endpoint: endpoint.map(str::to_string),
        }
    }

    pub fn user_message(&self) -> &'static str {
        user_friendly_message(self.code)
    }

    pub fn is_recoverable(&self) -> bool {
        is_recoverable(self.code)
    }
}

#[derive(Debug)]
pub struct ErrorLog {
    capacity: usize,
    entries: Mutex<VecDeque<ErrorInfo>>,
}

impl Default for ErrorLog {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorLog {
    pub fn new() -> Self {
        Self::with_capacity(MAX_LOGGED_ERRORS)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(VecDeque::with_capacity(capacity.max(1))),
        }
    }

    pub fn log_error(&self, info: ErrorInfo) {
        tracing::debug!(
            code = %info.code,
            endpoint = info.endpoint.as_deref().unwrap_or("-"),
            message = %info.message,
            "api error recorded"
        );
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.push_back(info);
        while entries.len() > self.capacity {
            entries.pop_front();
        }
    }

    /// Classify `err`, record it, and return the normalized form.
    pub fn handle_api_error(
        &self,
        err: &ApiError,
        endpoint: Option<&str>,
        user_id: Option<i64>,
    ) -> ErrorInfo {
        let info = ErrorInfo::from_api_error(err, endpoint, user_id);
        self.log_error(info.clone());
        info
    }

    /// Logged errors, oldest first.
    pub fn recent(&self) -> Vec<ErrorInfo> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.iter().cloned().collect()
    }

    pub fn last(&self) -> Option<ErrorInfo> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.back().cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

pub fn user_friendly_message(code: ErrorCode) -> &'static str {
    match code {
        ErrorCode::Network => {
            "Impossible de joindre le serveur. Vérifiez votre connexion internet."
        }
        ErrorCode::Timeout => "Le serveur met trop de temps à répondre. Veuillez réessayer.",
        ErrorCode::Status(400) => "Requête invalide. Vérifiez les informations saisies.",
        ErrorCode::Status(401) => "Session expirée. Veuillez vous reconnecter.",
        ErrorCode::Status(403) => "Accès refusé. Vous n'avez pas les droits nécessaires.",
        ErrorCode::Status(404) => "Ressource introuvable.",
        ErrorCode::Status(500..=599) => {
            "Erreur du serveur. Veuillez réessayer dans quelques instants."
        }
        _ => "Une erreur inattendue s'est produite.",
    }
}

pub fn is_recoverable(code: ErrorCode) -> bool {
    matches!(
        code,
        ErrorCode::Network
            | ErrorCode::Timeout
            | ErrorCode::Status(500)
            | ErrorCode::Status(502)
            | ErrorCode::Status(503)
            | ErrorCode::Status(504)
    )
}
