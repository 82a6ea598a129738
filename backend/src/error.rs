use rocket::response::{self, Responder};
use rocket::serde::json::Json;
use rocket::Request;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::models::Race;

/// Request failures. Every variant renders as HTTP 200 with an
/// `{ok: false, error}` body; clients switch on `ok`, not the status code.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Falta código")]
    MissingField,
    #[error("Código inválido")]
    InvalidMesaCode,
    #[error("Mesa no autenticada")]
    MesaNotAuthenticated,
    #[error("No encontrado")]
    VoterNotFound,
    #[error("Bloqueado, dirígete a coordinación")]
    VoterBlocked,
    #[error("PIN incorrecto")]
    InvalidPin,
    #[error("Ya votó {0}")]
    AlreadyVoted(Race),
    #[error("Código inválido")]
    InvalidAdminCode,
    #[error("Error interno")]
    Internal(#[from] diesel::result::Error),
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub ok: bool,
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        ErrorBody {
            ok: false,
            error: error.into(),
        }
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        if let ApiError::Internal(ref source) = self {
            error!("request failed on a database error: {source}");
        }
        Json(ErrorBody::new(self.to_string())).respond_to(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_match_the_wire_contract() {
        assert_eq!(ApiError::MissingField.to_string(), "Falta código");
        assert_eq!(ApiError::InvalidMesaCode.to_string(), "Código inválido");
        assert_eq!(
            ApiError::MesaNotAuthenticated.to_string(),
            "Mesa no autenticada"
        );
        assert_eq!(ApiError::VoterNotFound.to_string(), "No encontrado");
        assert_eq!(
            ApiError::VoterBlocked.to_string(),
            "Bloqueado, dirígete a coordinación"
        );
        assert_eq!(ApiError::InvalidPin.to_string(), "PIN incorrecto");
        assert_eq!(ApiError::InvalidAdminCode.to_string(), "Código inválido");
    }

    #[test]
    fn already_voted_names_the_race() {
        assert_eq!(
            ApiError::AlreadyVoted(Race::Rep).to_string(),
            "Ya votó representante"
        );
        assert_eq!(
            ApiError::AlreadyVoted(Race::Amb).to_string(),
            "Ya votó líder ambiental"
        );
        assert_eq!(
            ApiError::AlreadyVoted(Race::Per).to_string(),
            "Ya votó personería"
        );
    }

    #[test]
    fn error_body_envelope_shape() {
        let body = serde_json::to_value(ErrorBody::new("PIN incorrecto")).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"ok": false, "error": "PIN incorrecto"})
        );
    }
}
