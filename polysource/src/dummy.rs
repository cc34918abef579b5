//! Zero-behaviour backend used when no provider is selected

use crate::error::{MediaError, Result};
use crate::identifier::{BackendKind, Identifier, MediaKind};
use crate::live::{once, LiveStream};
use crate::model::*;
use crate::{async_trait, MediaBackend};

/// Backend that owns nothing
///
/// Reads succeed with empty results (single-item lookups report
/// `NotFound`), writes report `NotImplemented`. The aggregator substitutes
/// it whenever the catalog has no visible provider.
#[derive(Debug, Default, Clone, Copy)]
pub struct DummyBackend;

#[async_trait]
impl MediaBackend for DummyBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    async fn identify(&self, _id: &Identifier) -> Option<MediaKind> {
        None
    }

    fn status(&self) -> LiveStream<Vec<DiagnosticField>> {
        once(Ok(vec![]))
    }

    fn audios(&self, _rule: SortingRule) -> LiveStream<Vec<Audio>> {
        once(Ok(vec![]))
    }

    fn albums(&self, _rule: SortingRule) -> LiveStream<Vec<Album>> {
        once(Ok(vec![]))
    }

    fn artists(&self, _rule: SortingRule) -> LiveStream<Vec<Artist>> {
        once(Ok(vec![]))
    }

    fn genres(&self, _rule: SortingRule) -> LiveStream<Vec<Genre>> {
        once(Ok(vec![]))
    }

    fn playlists(&self, _rule: SortingRule) -> LiveStream<Vec<Playlist>> {
        once(Ok(vec![]))
    }

    fn audio(&self, id: &Identifier) -> LiveStream<Audio> {
        once(Err(MediaError::not_found(id)))
    }

    fn album(&self, id: &Identifier) -> LiveStream<AlbumDetail> {
        once(Err(MediaError::not_found(id)))
    }

    fn artist(&self, id: &Identifier) -> LiveStream<ArtistDetail> {
        once(Err(MediaError::not_found(id)))
    }

    fn genre(&self, id: &Identifier) -> LiveStream<GenreDetail> {
        once(Err(MediaError::not_found(id)))
    }

    fn playlist(&self, id: &Identifier) -> LiveStream<PlaylistDetail> {
        once(Err(MediaError::not_found(id)))
    }

    fn search(&self, _query: &str) -> LiveStream<Vec<MediaItem>> {
        once(Ok(vec![]))
    }

    fn activity(&self) -> LiveStream<Activity> {
        once(Ok(Activity::default()))
    }

    fn lyrics(&self, _id: &Identifier) -> LiveStream<Option<String>> {
        once(Ok(None))
    }

    fn audio_playlists_status(&self, _id: &Identifier) -> LiveStream<Vec<PlaylistMembership>> {
        once(Ok(vec![]))
    }

    async fn stream_uri(&self, id: &Identifier) -> Result<String> {
        Err(MediaError::not_found(id))
    }
}
