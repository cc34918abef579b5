//! Couche d'accès à l'API REST Subsonic
//!
//! Ce module fournit une interface bas-niveau pour communiquer avec un
//! serveur compatible Subsonic (Navidrome, Gonic, Airsonic...). Toutes les
//! requêtes sont des GET sur `<base>/rest/<endpoint>` avec les paramètres
//! d'authentification et `f=json`.

pub mod auth;
pub mod catalog;
pub mod playlist;
pub mod user;

use crate::error::{Result, SubsonicError};
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Version de l'API annoncée au serveur
pub const API_VERSION: &str = "1.16.1";

/// Nom de l'enveloppe JSON de toute réponse
const ENVELOPE: &str = "subsonic-response";

/// Paramètres de connexion à un serveur
#[derive(Debug, Clone)]
pub struct SubsonicSettings {
    /// URL de base du serveur (sans `/rest`)
    pub base_url: String,
    pub username: String,
    pub password: String,
    /// Envoie le mot de passe (`p=enc:...`) au lieu du token md5
    pub legacy_auth: bool,
    /// Nom du client (`c`)
    pub client_name: String,
    pub timeout: Duration,
}

impl SubsonicSettings {
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            username: username.into(),
            password: password.into(),
            legacy_auth: false,
            client_name: "Polyphon".to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_legacy_auth(mut self, legacy_auth: bool) -> Self {
        self.legacy_auth = legacy_auth;
        self
    }

    pub fn with_client_name(mut self, client_name: impl Into<String>) -> Self {
        self.client_name = client_name.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Client API bas-niveau pour communiquer avec un serveur Subsonic
#[derive(Debug)]
pub struct SubsonicApi {
    /// Client HTTP
    client: Client,
    /// URL de base, sans `/` final
    base_url: Url,
    settings: SubsonicSettings,
}

impl SubsonicApi {
    /// Crée une nouvelle instance de l'API
    ///
    /// # Errors
    ///
    /// * `SubsonicError::Configuration` - URL de base invalide
    pub fn new(settings: SubsonicSettings) -> Result<Self> {
        let trimmed = settings.base_url.trim().trim_end_matches('/');
        let base_url = Url::parse(trimmed)
            .map_err(|e| SubsonicError::Configuration(format!("{}: {}", trimmed, e)))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(SubsonicError::Configuration(format!(
                "unsupported scheme in {}",
                trimmed
            )));
        }

        let client = Client::builder()
            .timeout(settings.timeout)
            .user_agent(format!("{}/{}", settings.client_name, env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url,
            settings,
        })
    }

    /// Retourne l'URL de base du serveur
    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    /// Retourne le nom d'utilisateur
    pub fn username(&self) -> &str {
        &self.settings.username
    }

    fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}/rest/{}", self.base_url(), endpoint)
    }

    /// Construit une URL signée (stream, pochettes) sans l'appeler
    pub fn signed_url(&self, endpoint: &str, params: &[(&str, String)]) -> Result<String> {
        let mut url = Url::parse(&self.endpoint_url(endpoint))
            .map_err(|e| SubsonicError::Configuration(e.to_string()))?;
        {
            let mut query = url.query_pairs_mut();
            for (key, value) in self.auth_params()?.iter() {
                query.append_pair(key, value);
            }
            for (key, value) in params {
                query.append_pair(key, value);
            }
        }
        Ok(url.to_string())
    }

    /// Effectue une requête et retourne le champ `field` de la réponse
    ///
    /// Un champ absent est lu comme un objet vide, ce qui laisse aux
    /// structures de réponse le soin de fournir leurs valeurs par défaut.
    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
        field: &str,
    ) -> Result<T> {
        let mut body = self.request(endpoint, params).await?;
        let value = body
            .get_mut(field)
            .map(Value::take)
            .unwrap_or_else(|| Value::Object(Default::default()));
        serde_json::from_value(value).map_err(|e| {
            warn!("Failed to parse {} response: {}", endpoint, e);
            SubsonicError::JsonParse(e)
        })
    }

    /// Effectue une requête dont seule la réussite importe
    pub(crate) async fn call(&self, endpoint: &str, params: &[(&str, String)]) -> Result<()> {
        self.request(endpoint, params).await.map(|_| ())
    }

    /// Effectue une requête et retourne l'enveloppe `subsonic-response`
    pub(crate) async fn request(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Value> {
        let url = self.endpoint_url(endpoint);
        debug!("GET {} with {} params", url, params.len());

        let mut query: Vec<(&str, String)> = self.auth_params()?;
        query.extend(params.iter().map(|(k, v)| (*k, v.clone())));

        let response = self.client.get(&url).query(&query).send().await?;
        self.handle_response(response).await
    }

    /// Traite la réponse HTTP
    async fn handle_response(&self, response: Response) -> Result<Value> {
        let status = response.status();
        debug!("Response status: {}", status);

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!("Subsonic HTTP error ({}): {}", status.as_u16(), error_text);
            return Err(SubsonicError::from_status_code(status.as_u16(), error_text));
        }

        let mut json: Value = response.json().await?;
        let envelope = json
            .get_mut(ENVELOPE)
            .map(Value::take)
            .ok_or_else(|| SubsonicError::ApiError {
                code: 0,
                message: format!("missing {}", ENVELOPE),
            })?;

        if envelope.get("status").and_then(Value::as_str) != Some("ok") {
            let error = envelope.get("error");
            let code = error
                .and_then(|e| e.get("code"))
                .and_then(Value::as_u64)
                .unwrap_or(0) as u32;
            let message = error
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
                .unwrap_or("Unknown error");
            warn!("Subsonic API error {}: {}", code, message);
            return Err(SubsonicError::from_api_code(code, message));
        }

        Ok(envelope)
    }
}
