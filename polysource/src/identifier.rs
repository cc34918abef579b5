//! Identifiers and provider identity
//!
//! An [`Identifier`] is an opaque string, but every backend builds its own
//! with the same shape so that ownership probes stay cheap:
//!
//! ```text
//! <scheme>://<authority>/<kind>/<key>
//! local://primary/audio/Music/Artist/track.flac
//! subsonic://3/album/al-1234
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque, backend-namespaced name of a media item or collection
///
/// Two identifiers are equal iff their string forms are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(String);

/// Borrowed view of a well-formed identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentifierParts<'a> {
    pub scheme: &'a str,
    pub authority: &'a str,
    pub kind: MediaKind,
    /// Backend-local key; may itself contain `/`
    pub key: &'a str,
}

impl Identifier {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Builds `<scheme>://<authority>/<kind>/<key>`
    pub fn build(scheme: &str, authority: &str, kind: MediaKind, key: &str) -> Self {
        Self(format!("{}://{}/{}/{}", scheme, authority, kind, key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Splits the identifier, or `None` if it does not follow the shared shape
    pub fn parts(&self) -> Option<IdentifierParts<'_>> {
        let (scheme, rest) = self.0.split_once("://")?;
        let (authority, rest) = rest.split_once('/')?;
        let (kind, key) = rest.split_once('/')?;
        if scheme.is_empty() || authority.is_empty() || key.is_empty() {
            return None;
        }
        Some(IdentifierParts {
            scheme,
            authority,
            kind: kind.parse().ok()?,
            key,
        })
    }

    /// Returns the parts if the identifier belongs to `scheme`
    pub fn parts_for(&self, scheme: &str) -> Option<IdentifierParts<'_>> {
        self.parts().filter(|p| p.scheme == scheme)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identifier {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Identifier {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Kind of media item an identifier names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Album,
    Artist,
    Genre,
    Playlist,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Audio => "audio",
            MediaKind::Album => "album",
            MediaKind::Artist => "artist",
            MediaKind::Genre => "genre",
            MediaKind::Playlist => "playlist",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "audio" => Ok(MediaKind::Audio),
            "album" => Ok(MediaKind::Album),
            "artist" => Ok(MediaKind::Artist),
            "genre" => Ok(MediaKind::Genre),
            "playlist" => Ok(MediaKind::Playlist),
            other => Err(format!("unknown media kind: {}", other)),
        }
    }
}

/// The closed set of backend kinds
///
/// Declaration order is the catalog order: local first, then the remote
/// protocols.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// On-device index
    Local,
    /// ID3-tag oriented REST API (Subsonic-compatible)
    Subsonic,
    /// Item-graph oriented REST API (Jellyfin-compatible)
    Jellyfin,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Local => "local",
            BackendKind::Subsonic => "subsonic",
            BackendKind::Jellyfin => "jellyfin",
        }
    }

    pub fn is_remote(&self) -> bool {
        !matches!(self, BackendKind::Local)
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(BackendKind::Local),
            "subsonic" => Ok(BackendKind::Subsonic),
            "jellyfin" => Ok(BackendKind::Jellyfin),
            other => Err(format!("unknown backend kind: {}", other)),
        }
    }
}

/// Identity of one configured backend instance
///
/// Ordering is lexicographic on `(kind, instance_id)`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ProviderIdentifier {
    pub kind: BackendKind,
    pub instance_id: i64,
}

impl ProviderIdentifier {
    pub fn new(kind: BackendKind, instance_id: i64) -> Self {
        Self { kind, instance_id }
    }
}

impl fmt::Display for ProviderIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.instance_id)
    }
}

/// One addressable backend instance as shown to the user
///
/// Equality and hashing use the identifier only; the display name and the
/// visibility flag are not part of identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provider {
    pub id: ProviderIdentifier,
    pub name: String,
    pub visible: bool,
}

impl Provider {
    pub fn new(id: ProviderIdentifier, name: impl Into<String>, visible: bool) -> Self {
        Self {
            id,
            name: name.into(),
            visible,
        }
    }
}

impl PartialEq for Provider {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Provider {}

impl std::hash::Hash for Provider {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_parts() {
        let id = Identifier::build("local", "primary", MediaKind::Audio, "Music/a b/track.flac");
        assert_eq!(id.as_str(), "local://primary/audio/Music/a b/track.flac");

        let parts = id.parts().unwrap();
        assert_eq!(parts.scheme, "local");
        assert_eq!(parts.authority, "primary");
        assert_eq!(parts.kind, MediaKind::Audio);
        assert_eq!(parts.key, "Music/a b/track.flac");
    }

    #[test]
    fn test_malformed_identifiers() {
        assert!(Identifier::new("nothing").parts().is_none());
        assert!(Identifier::new("local://primary/audio").parts().is_none());
        assert!(Identifier::new("local://primary/unknown/x").parts().is_none());
        assert!(Identifier::new("local://primary/audio/x").parts_for("subsonic").is_none());
    }

    #[test]
    fn test_provider_identifier_ordering() {
        let mut ids = vec![
            ProviderIdentifier::new(BackendKind::Jellyfin, 1),
            ProviderIdentifier::new(BackendKind::Subsonic, 7),
            ProviderIdentifier::new(BackendKind::Local, 42),
            ProviderIdentifier::new(BackendKind::Local, -3),
        ];
        ids.sort();
        assert_eq!(
            ids,
            vec![
                ProviderIdentifier::new(BackendKind::Local, -3),
                ProviderIdentifier::new(BackendKind::Local, 42),
                ProviderIdentifier::new(BackendKind::Subsonic, 7),
                ProviderIdentifier::new(BackendKind::Jellyfin, 1),
            ]
        );
    }

    #[test]
    fn test_provider_identity_ignores_name() {
        let id = ProviderIdentifier::new(BackendKind::Subsonic, 1);
        assert_eq!(Provider::new(id, "Home", true), Provider::new(id, "Renamed", false));
    }
}
