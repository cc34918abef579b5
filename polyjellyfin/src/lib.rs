//! # polyjellyfin - Backend Jellyfin pour Polyphon
//!
//! Cette crate expose la bibliothèque musicale d'un serveur Jellyfin comme
//! [`MediaBackend`](polysource::MediaBackend). L'API Jellyfin est un graphe
//! d'éléments typés (`Audio`, `MusicAlbum`, `MusicArtist`, `MusicGenre`,
//! `Playlist`) interrogé par `/Users/{uid}/Items`.
//!
//! ## Vue d'ensemble
//!
//! - Connexion paresseuse (`POST /Users/AuthenticateByName`) à la première
//!   requête, jeton gardé en mémoire et renouvelé une fois sur refus (401)
//! - Navigation dans la bibliothèque et recherche
//! - Playlists du serveur, plus une pseudo-playlist « Favoris » alimentée
//!   par les favoris de l'utilisateur
//! - Favoris, écoutes et paroles
//! - URL de streaming direct authentifiées pour le lecteur
//!
//! ## Structure des modules
//!
//! ```text
//! polyjellyfin/
//! ├── src/
//! │   ├── lib.rs              # Module principal (ce fichier)
//! │   ├── backend.rs          # Implémentation de MediaBackend
//! │   ├── convert.rs          # Conversion vers le modèle polysource
//! │   ├── models.rs           # DTO Jellyfin
//! │   ├── api/
//! │   │   ├── mod.rs          # Client HTTP, en-tête MediaBrowser, session
//! │   │   ├── auth.rs         # Authentification
//! │   │   ├── library.rs      # Requêtes d'éléments
//! │   │   ├── playlist.rs     # Playlists
//! │   │   └── user.rs         # Favoris et écoutes
//! │   ├── config_ext.rs       # Extension polyconfig
//! │   └── error.rs            # Gestion des erreurs
//! ```
//!
//! ## Identifiants
//!
//! ```text
//! jellyfin://5/album/8c1f0d6a2b3e4f5a9d7c6b5a4e3d2c1b
//! jellyfin://5/playlist/favorites
//! ```
//!
//! ## Utilisation
//!
//! ```rust,no_run
//! use polyjellyfin::{JellyfinBackend, JellyfinSettings};
//! use polysource::{MediaBackend, first};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = JellyfinSettings::new("http://jellyfin:8096", "bob", "secret")
//!         .with_device("Salon", "3d2c1b-device");
//!     let backend = JellyfinBackend::from_settings(5, settings)?;
//!
//!     for item in first(backend.search("coltrane")).await? {
//!         println!("{:?} {}", item.kind(), item.title());
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

pub use api::{JellyfinApi, JellyfinSettings, Session};
pub use backend::JellyfinBackend;
pub use config_ext::JellyfinConfigExt;
pub use error::{JellyfinError, Result};

/// Schéma des identifiants Jellyfin
pub const SCHEME: &str = "jellyfin";

/// Clé de la pseudo-playlist des favoris
pub const FAVORITES_KEY: &str = "favorites";
