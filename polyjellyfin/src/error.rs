//! Gestion des erreurs pour le client Jellyfin

use polysource::MediaError;
use thiserror::Error;

/// Type Result personnalisé pour polyjellyfin
pub type Result<T> = std::result::Result<T, JellyfinError>;

/// Erreurs possibles lors de l'utilisation de l'API Jellyfin
#[derive(Error, Debug)]
pub enum JellyfinError {
    /// Identifiants absents de l'enregistrement serveur
    #[error("Credentials missing")]
    MissingCredentials,

    /// Session refusée (HTTP 401), une reconnexion peut suffire
    #[error("Session rejected: {0}")]
    Unauthorized(String),

    /// Identifiants refusés à la connexion
    #[error("Wrong username or password: {0}")]
    InvalidCredentials(String),

    /// Ressource non trouvée (HTTP 404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Erreur HTTP
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Erreur de parsing JSON
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Statut HTTP inattendu
    #[error("HTTP status {code}: {message}")]
    Status { code: u16, message: String },

    /// URL du serveur invalide
    #[error("Jellyfin configuration error: {0}")]
    Configuration(String),
}

impl JellyfinError {
    /// Crée une erreur depuis un code de statut HTTP
    pub fn from_status_code(code: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            401 => Self::Unauthorized(message),
            403 => Self::InvalidCredentials(message),
            404 => Self::NotFound(message),
            _ => Self::Status { code, message },
        }
    }

    /// Vérifie si l'erreur concerne l'authentification
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            JellyfinError::MissingCredentials
                | JellyfinError::Unauthorized(_)
                | JellyfinError::InvalidCredentials(_)
        )
    }
}

impl From<JellyfinError> for MediaError {
    fn from(err: JellyfinError) -> Self {
        match err {
            JellyfinError::MissingCredentials | JellyfinError::Unauthorized(_) => {
                MediaError::AuthenticationRequired
            }
            JellyfinError::InvalidCredentials(_) => MediaError::InvalidCredentials,
            JellyfinError::NotFound(what) => MediaError::NotFound(what),
            JellyfinError::JsonParse(e) => MediaError::Deserialization(e.to_string()),
            other => MediaError::Io(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            JellyfinError::from_status_code(401, "expired"),
            JellyfinError::Unauthorized(_)
        ));
        assert!(matches!(
            JellyfinError::from_status_code(404, "item"),
            JellyfinError::NotFound(_)
        ));
        assert!(matches!(
            JellyfinError::from_status_code(500, "boom"),
            JellyfinError::Status { code: 500, .. }
        ));
    }

    #[test]
    fn test_media_error_conversion() {
        assert_eq!(
            MediaError::from(JellyfinError::Unauthorized("x".into())),
            MediaError::AuthenticationRequired
        );
        assert_eq!(
            MediaError::from(JellyfinError::InvalidCredentials("x".into())),
            MediaError::InvalidCredentials
        );
        assert!(matches!(
            MediaError::from(JellyfinError::Configuration("bad url".into())),
            MediaError::Io(_)
        ));
    }
}
