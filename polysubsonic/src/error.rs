//! Gestion des erreurs pour le client Subsonic

use polysource::MediaError;
use thiserror::Error;

/// Type Result personnalisé pour polysubsonic
pub type Result<T> = std::result::Result<T, SubsonicError>;

/// Erreurs possibles lors de l'utilisation de l'API Subsonic
#[derive(Error, Debug)]
pub enum SubsonicError {
    /// Identifiants absents de l'enregistrement serveur
    #[error("Credentials missing")]
    MissingCredentials,

    /// Identifiants refusés par le serveur (codes 40 et 41)
    #[error("Wrong username or password: {0}")]
    InvalidCredentials(String),

    /// Ressource non trouvée (code 70 ou HTTP 404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Erreur HTTP
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Erreur de parsing JSON
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Erreur renvoyée dans l'enveloppe `subsonic-response`
    #[error("Subsonic API error (code {code}): {message}")]
    ApiError { code: u32, message: String },

    /// Statut HTTP inattendu
    #[error("HTTP status {code}: {message}")]
    Status { code: u16, message: String },

    /// URL du serveur invalide
    #[error("Subsonic configuration error: {0}")]
    Configuration(String),
}

impl SubsonicError {
    /// Crée une erreur depuis un code d'erreur Subsonic
    pub fn from_api_code(code: u32, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            10 => Self::MissingCredentials,
            40 | 41 => Self::InvalidCredentials(message),
            70 => Self::NotFound(message),
            _ => Self::ApiError { code, message },
        }
    }

    /// Crée une erreur depuis un code de statut HTTP
    pub fn from_status_code(code: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            401 | 403 => Self::InvalidCredentials(message),
            404 => Self::NotFound(message),
            _ => Self::Status { code, message },
        }
    }

    /// Vérifie si l'erreur concerne l'authentification
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            SubsonicError::MissingCredentials | SubsonicError::InvalidCredentials(_)
        )
    }
}

impl From<SubsonicError> for MediaError {
    fn from(err: SubsonicError) -> Self {
        match err {
            SubsonicError::MissingCredentials => MediaError::AuthenticationRequired,
            SubsonicError::InvalidCredentials(_) => MediaError::InvalidCredentials,
            SubsonicError::NotFound(what) => MediaError::NotFound(what),
            SubsonicError::JsonParse(e) => MediaError::Deserialization(e.to_string()),
            other => MediaError::Io(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_codes() {
        assert!(matches!(
            SubsonicError::from_api_code(40, "bad"),
            SubsonicError::InvalidCredentials(_)
        ));
        assert!(matches!(
            SubsonicError::from_api_code(70, "gone"),
            SubsonicError::NotFound(_)
        ));
        assert!(matches!(
            SubsonicError::from_api_code(0, "boom"),
            SubsonicError::ApiError { code: 0, .. }
        ));
    }

    #[test]
    fn test_media_error_mapping() {
        assert_eq!(
            MediaError::from(SubsonicError::MissingCredentials),
            MediaError::AuthenticationRequired
        );
        assert_eq!(
            MediaError::from(SubsonicError::from_api_code(41, "token auth")),
            MediaError::InvalidCredentials
        );
        assert!(matches!(
            MediaError::from(SubsonicError::from_api_code(10, "missing parameter")),
            MediaError::Io(_)
        ));
    }
}
