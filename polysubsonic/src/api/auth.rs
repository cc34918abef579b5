//! Authentification Subsonic
//!
//! Depuis l'API 1.13.0, le mot de passe n'est plus transmis : chaque
//! requête porte un sel aléatoire `s` et le token `t = md5(password + s)`.
//! Les serveurs plus anciens (ou adossés à un annuaire LDAP) n'acceptent
//! que le mot de passe, envoyé encodé en hexadécimal (`p=enc:...`).

use super::{API_VERSION, SubsonicApi};
use crate::error::{Result, SubsonicError};
use crate::models::ServerInfo;
use md5::{Digest, Md5};
use rand::Rng;
use rand::distr::Alphanumeric;
use tracing::{debug, info};

/// Longueur du sel
const SALT_LENGTH: usize = 12;

/// Génère un sel aléatoire alphanumérique
pub fn generate_salt() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SALT_LENGTH)
        .map(char::from)
        .collect()
}

/// Calcule le token d'authentification `md5(password + salt)`
///
/// # Exemple
///
/// ```
/// use polysubsonic::api::auth::token;
/// // Exemple de la documentation Subsonic
/// assert_eq!(token("sesame", "c19b2d"), "26719a1196d2a940705a59634eb18eab");
/// ```
pub fn token(password: &str, salt: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(password.as_bytes());
    hasher.update(salt.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Encode le mot de passe pour l'authentification historique
pub fn legacy_password(password: &str) -> String {
    format!("enc:{}", hex::encode(password.as_bytes()))
}

impl SubsonicApi {
    /// Paramètres communs à toutes les requêtes
    ///
    /// # Errors
    ///
    /// * `SubsonicError::MissingCredentials` - nom d'utilisateur ou mot de
    ///   passe vide
    pub(crate) fn auth_params(&self) -> Result<Vec<(&'static str, String)>> {
        let settings = &self.settings;
        if settings.username.is_empty() || settings.password.is_empty() {
            return Err(SubsonicError::MissingCredentials);
        }

        let mut params = vec![
            ("u", settings.username.clone()),
            ("v", API_VERSION.to_string()),
            ("c", settings.client_name.clone()),
            ("f", "json".to_string()),
        ];

        if settings.legacy_auth {
            params.push(("p", legacy_password(&settings.password)));
        } else {
            let salt = generate_salt();
            params.push(("t", token(&settings.password, &salt)));
            params.push(("s", salt));
        }

        Ok(params)
    }

    /// Vérifie la connexion et les identifiants
    ///
    /// Retourne les informations d'en-tête du serveur (version de l'API,
    /// type et version du serveur pour les implémentations OpenSubsonic).
    pub async fn ping(&self) -> Result<ServerInfo> {
        debug!("Pinging {}", self.base_url());
        let envelope = self.request("ping", &[]).await?;
        let info: ServerInfo = serde_json::from_value(envelope)?;
        info!(
            "Subsonic server {} reachable (API {})",
            self.base_url(),
            info.version.as_deref().unwrap_or("?")
        );
        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::SubsonicSettings;

    #[test]
    fn test_salt() {
        let a = generate_salt();
        let b = generate_salt();
        assert_eq!(a.len(), SALT_LENGTH);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_legacy_password() {
        assert_eq!(legacy_password("sesame"), "enc:736573616d65");
    }

    #[test]
    fn test_token_params() {
        let api = SubsonicApi::new(SubsonicSettings::new("http://nas", "alice", "sesame")).unwrap();
        let params = api.auth_params().unwrap();
        let get = |k: &str| params.iter().find(|(key, _)| *key == k).map(|(_, v)| v.clone());

        let salt = get("s").unwrap();
        assert_eq!(get("t").unwrap(), token("sesame", &salt));
        assert_eq!(get("f").as_deref(), Some("json"));
        assert!(get("p").is_none());
    }

    #[test]
    fn test_legacy_params() {
        let settings = SubsonicSettings::new("http://nas", "alice", "sesame").with_legacy_auth(true);
        let api = SubsonicApi::new(settings).unwrap();
        let params = api.auth_params().unwrap();
        assert!(params.iter().any(|(k, v)| *k == "p" && v == "enc:736573616d65"));
        assert!(!params.iter().any(|(k, _)| *k == "t"));
    }

    #[test]
    fn test_missing_credentials() {
        let api = SubsonicApi::new(SubsonicSettings::new("http://nas", "alice", "")).unwrap();
        assert!(matches!(
            api.auth_params(),
            Err(SubsonicError::MissingCredentials)
        ));
    }
}
