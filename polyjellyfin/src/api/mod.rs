//! Couche d'accès à l'API REST Jellyfin
//!
//! Ce module fournit une interface bas-niveau pour communiquer avec un
//! serveur Jellyfin. La session (utilisateur et jeton) est ouverte à la
//! première requête authentifiée, gardée en mémoire, puis rouverte une fois
//! si le serveur la refuse.

pub mod auth;
pub mod library;
pub mod playlist;
pub mod user;

use crate::error::{JellyfinError, Result};
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Method, Response, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Paramètres de connexion à un serveur
#[derive(Debug, Clone)]
pub struct JellyfinSettings {
    /// URL de base du serveur
    pub base_url: String,
    pub username: String,
    pub password: String,
    /// Nom et version du client annoncés au serveur
    pub client_name: String,
    pub client_version: String,
    /// Nom de l'appareil et identifiant stable, affichés dans le tableau de bord
    pub device_name: String,
    pub device_id: String,
    pub timeout: Duration,
}

impl JellyfinSettings {
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            username: username.into(),
            password: password.into(),
            client_name: "Polyphon".to_string(),
            client_version: env!("CARGO_PKG_VERSION").to_string(),
            device_name: "Polyphon".to_string(),
            device_id: "polyphon".to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_client(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.client_name = name.into();
        self.client_version = version.into();
        self
    }

    pub fn with_device(mut self, name: impl Into<String>, id: impl Into<String>) -> Self {
        self.device_name = name.into();
        self.device_id = id.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Session ouverte sur le serveur
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub token: String,
}

/// Client API bas-niveau pour communiquer avec un serveur Jellyfin
#[derive(Debug)]
pub struct JellyfinApi {
    /// Client HTTP
    client: Client,
    /// URL de base, sans `/` final
    base_url: Url,
    settings: JellyfinSettings,
    /// Session courante, ouverte à la demande
    session: Mutex<Option<Session>>,
}

impl JellyfinApi {
    /// Crée une nouvelle instance de l'API, sans se connecter
    ///
    /// # Errors
    ///
    /// * `JellyfinError::Configuration` - URL de base invalide
    pub fn new(settings: JellyfinSettings) -> Result<Self> {
        let trimmed = settings.base_url.trim().trim_end_matches('/');
        let base_url = Url::parse(trimmed)
            .map_err(|e| JellyfinError::Configuration(format!("{}: {}", trimmed, e)))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(JellyfinError::Configuration(format!(
                "unsupported scheme in {}",
                trimmed
            )));
        }

        let client = Client::builder()
            .timeout(settings.timeout)
            .user_agent(format!("{}/{}", settings.client_name, settings.client_version))
            .build()?;

        Ok(Self {
            client,
            base_url,
            settings,
            session: Mutex::new(None),
        })
    }

    /// Retourne l'URL de base du serveur
    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    pub fn username(&self) -> &str {
        &self.settings.username
    }

    pub fn settings(&self) -> &JellyfinSettings {
        &self.settings
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }

    /// En-tête `Authorization: MediaBrowser ...`
    pub(crate) fn authorization(&self, token: Option<&str>) -> String {
        let mut header = format!(
            "MediaBrowser Client=\"{}\", Device=\"{}\", DeviceId=\"{}\", Version=\"{}\"",
            self.settings.client_name,
            self.settings.device_name,
            self.settings.device_id,
            self.settings.client_version
        );
        if let Some(token) = token {
            header.push_str(&format!(", Token=\"{}\"", token));
        }
        header
    }

    /// Effectue une requête GET authentifiée et désérialise la réponse
    ///
    /// Une réponse vide est lue comme un objet vide.
    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let value = self
            .send(Method::GET, path, query, None)
            .await?
            .unwrap_or_else(|| Value::Object(Default::default()));
        serde_json::from_value(value).map_err(|e| {
            warn!("Failed to parse {} response: {}", path, e);
            JellyfinError::JsonParse(e)
        })
    }

    pub(crate) async fn post(
        &self,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Option<Value>> {
        self.send(Method::POST, path, query, body).await
    }

    pub(crate) async fn delete(&self, path: &str, query: &[(&str, String)]) -> Result<()> {
        self.send(Method::DELETE, path, query, None).await.map(|_| ())
    }

    /// Effectue une requête authentifiée
    ///
    /// Un refus de session (401) provoque une reconnexion puis un seul
    /// nouvel essai ; un second refus est rapporté comme identifiants
    /// invalides.
    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Option<Value>> {
        let session = self.session().await?;
        match self.send_with(&session, method.clone(), path, query, body).await {
            Err(JellyfinError::Unauthorized(message)) => {
                warn!("Jellyfin session rejected ({}), logging in again", message);
                self.invalidate(&session).await;
                let session = self.session().await?;
                self.send_with(&session, method, path, query, body)
                    .await
                    .map_err(|e| match e {
                        JellyfinError::Unauthorized(message) => {
                            JellyfinError::InvalidCredentials(message)
                        }
                        other => other,
                    })
            }
            other => other,
        }
    }

    async fn send_with(
        &self,
        session: &Session,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<Option<Value>> {
        let url = self.url(path);
        debug!("{} {} with {} params", method, url, query.len());

        let mut request = self
            .client
            .request(method, &url)
            .header(AUTHORIZATION, self.authorization(Some(&session.token)))
            .query(query);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        self.handle_response(response).await
    }

    /// Traite la réponse HTTP ; `None` pour un corps vide (204)
    pub(crate) async fn handle_response(&self, response: Response) -> Result<Option<Value>> {
        let status = response.status();
        debug!("Response status: {}", status);

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!("Jellyfin HTTP error ({}): {}", status.as_u16(), error_text);
            return Err(JellyfinError::from_status_code(status.as_u16(), error_text));
        }

        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&text)?))
    }
}
