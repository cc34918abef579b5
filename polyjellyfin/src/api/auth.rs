//! Module d'authentification pour l'API Jellyfin

use super::{JellyfinApi, Session};
use crate::error::{JellyfinError, Result};
use crate::models::{AuthenticateByName, AuthenticationResult, PublicSystemInfo};
use reqwest::header::AUTHORIZATION;
use serde_json::Value;
use tracing::{debug, info};

impl JellyfinApi {
    /// Retourne la session courante, en l'ouvrant si nécessaire
    ///
    /// Les appels concurrents attendent la même connexion.
    pub async fn session(&self) -> Result<Session> {
        let mut guard = self.session.lock().await;
        if let Some(session) = guard.as_ref() {
            return Ok(session.clone());
        }
        let session = self.authenticate().await?;
        *guard = Some(session.clone());
        Ok(session)
    }

    /// Identifiant de l'utilisateur connecté
    pub async fn user_id(&self) -> Result<String> {
        Ok(self.session().await?.user_id)
    }

    /// Vérifie si une session est ouverte
    pub async fn is_authenticated(&self) -> bool {
        self.session.lock().await.is_some()
    }

    /// Oublie la session courante
    pub async fn logout(&self) {
        debug!("Logging out from {}", self.base_url());
        *self.session.lock().await = None;
    }

    /// Oublie `stale` si c'est toujours la session courante
    pub(crate) async fn invalidate(&self, stale: &Session) {
        let mut guard = self.session.lock().await;
        if guard.as_ref() == Some(stale) {
            *guard = None;
        }
    }

    /// Ouvre une session (`POST /Users/AuthenticateByName`)
    ///
    /// # Errors
    ///
    /// * `JellyfinError::MissingCredentials` - nom d'utilisateur vide
    /// * `JellyfinError::InvalidCredentials` - identifiants refusés
    async fn authenticate(&self) -> Result<Session> {
        if self.settings.username.is_empty() {
            return Err(JellyfinError::MissingCredentials);
        }
        info!(
            "Attempting to login to Jellyfin {} as {}",
            self.base_url(),
            self.settings.username
        );

        let body = AuthenticateByName {
            username: &self.settings.username,
            pw: &self.settings.password,
        };
        let response = self
            .client
            .post(self.url("/Users/AuthenticateByName"))
            .header(AUTHORIZATION, self.authorization(None))
            .json(&body)
            .send()
            .await?;

        let value = self.handle_response(response).await.map_err(|e| match e {
            JellyfinError::Unauthorized(message) => JellyfinError::InvalidCredentials(message),
            other => other,
        })?;
        let result: AuthenticationResult =
            serde_json::from_value(value.unwrap_or(Value::Null))?;

        debug!("Login successful - User ID: {}", result.user.id);
        Ok(Session {
            user_id: result.user.id,
            token: result.access_token,
        })
    }

    /// Informations publiques du serveur (sans authentification)
    pub async fn system_info(&self) -> Result<PublicSystemInfo> {
        let response = self
            .client
            .get(self.url("/System/Info/Public"))
            .header(AUTHORIZATION, self.authorization(None))
            .send()
            .await?;
        let value = self.handle_response(response).await?;
        Ok(serde_json::from_value(
            value.unwrap_or_else(|| Value::Object(Default::default())),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use crate::api::{JellyfinApi, JellyfinSettings};
    use crate::error::JellyfinError;

    #[tokio::test]
    async fn test_missing_username() {
        let api = JellyfinApi::new(JellyfinSettings::new("http://127.0.0.1:9", "", "pw")).unwrap();
        assert!(matches!(
            api.session().await,
            Err(JellyfinError::MissingCredentials)
        ));
        assert!(!api.is_authenticated().await);
    }
}
