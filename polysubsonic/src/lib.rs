//! # polysubsonic - Backend Subsonic pour Polyphon
//!
//! Cette crate expose un serveur compatible Subsonic (Navidrome, Gonic,
//! Airsonic...) comme [`MediaBackend`](polysource::MediaBackend), en
//! s'appuyant sur le schéma ID3 de l'API (`getArtists`, `getAlbum`,
//! `getAlbumList2`, `search3`...).
//!
//! ## Vue d'ensemble
//!
//! - Authentification par token (`t = md5(password + salt)`) ou, pour les
//!   serveurs anciens, par mot de passe hexadécimal (`p=enc:...`)
//! - Navigation dans le catalogue (albums, artistes, genres, morceaux)
//! - Playlists du serveur, plus une pseudo-playlist « Favoris » alimentée
//!   par les étoiles (`getStarred2`)
//! - Favoris, écoutes (`scrobble`) et paroles
//! - URL de streaming signées pour le lecteur
//!
//! ## Structure des modules
//!
//! ```text
//! polysubsonic/
//! ├── src/
//! │   ├── lib.rs              # Module principal (ce fichier)
//! │   ├── backend.rs          # Implémentation de MediaBackend
//! │   ├── convert.rs          # Conversion vers le modèle polysource
//! │   ├── models.rs           # Structures des réponses JSON
//! │   ├── api/
//! │   │   ├── mod.rs          # Client HTTP et enveloppe de réponse
//! │   │   ├── auth.rs         # Authentification
//! │   │   ├── catalog.rs      # Accès au catalogue
//! │   │   ├── playlist.rs     # Playlists
//! │   │   └── user.rs         # Favoris et écoutes
//! │   ├── config_ext.rs       # Extension polyconfig
//! │   └── error.rs            # Gestion des erreurs
//! ```
//!
//! ## Identifiants
//!
//! Les éléments sont nommés `subsonic://<instance>/<type>/<id serveur>`,
//! où `<instance>` est l'identifiant de l'enregistrement serveur :
//!
//! ```text
//! subsonic://3/album/al-1234
//! subsonic://3/genre/Jazz
//! subsonic://3/playlist/favorites
//! ```
//!
//! ## Utilisation
//!
//! ```rust,no_run
//! use polysource::{MediaBackend, SortingRule, first};
//! use polysubsonic::{SubsonicBackend, SubsonicSettings};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = SubsonicSettings::new("http://nas:4533", "alice", "secret");
//!     let backend = SubsonicBackend::from_settings(3, settings)?;
//!
//!     let albums = first(backend.albums(SortingRule::default())).await?;
//!     for album in albums {
//!         println!("{} - {:?}", album.title, album.artist);
//!     }
//!     Ok(())
//! }
//! ```

pub mod api;
mod backend;
pub mod config_ext;
mod convert;
pub mod error;
pub mod models;

pub use api::{API_VERSION, SubsonicApi, SubsonicSettings};
pub use backend::SubsonicBackend;
pub use config_ext::SubsonicConfigExt;
pub use error::{Result, SubsonicError};

/// Schéma des identifiants Subsonic
pub const SCHEME: &str = "subsonic";

/// Clé de la pseudo-playlist des favoris
pub const FAVORITES_KEY: &str = "favorites";
