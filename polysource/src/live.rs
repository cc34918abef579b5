//! Live (re-emitting) streams
//!
//! Every collection or item query of a backend is a [`LiveStream`]: it emits
//! the current result, then emits again each time the backing data changes.
//! Failures are emitted as `Err` items; the stream keeps running.
//!
//! Change detection is a generation counter carried by a `tokio::sync::watch`
//! channel ([`ChangeTracker`]). [`switch_latest`] is the combinator used to
//! follow a changing upstream (navigation provider, catalog) without ever
//! surfacing results from a superseded source.

use crate::error::{MediaError, Result};
use futures::future::BoxFuture;
use futures::stream::{BoxStream, Stream, StreamExt};
use std::future::Future;
use std::sync::Mutex;
use std::time::SystemTime;
use tokio::sync::watch;
use tracing::debug;

/// Stream of results that re-emits when the backing data changes
pub type LiveStream<T> = BoxStream<'static, Result<T>>;

/// Generation counter notifying live streams of data changes
///
/// Mirrors the `update_id` / `last_change` bookkeeping of a content
/// directory: every mutation calls [`ChangeTracker::bump`].
#[derive(Debug)]
pub struct ChangeTracker {
    generation: watch::Sender<u64>,
    last_change: Mutex<Option<SystemTime>>,
}

impl Default for ChangeTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeTracker {
    pub fn new() -> Self {
        let (generation, _) = watch::channel(0);
        Self {
            generation,
            last_change: Mutex::new(None),
        }
    }

    /// Marks the backing data as changed
    pub fn bump(&self) {
        self.generation.send_modify(|g| *g = g.wrapping_add(1));
        *self.last_change.lock().unwrap() = Some(SystemTime::now());
    }

    /// Current generation; wraps around on overflow
    pub fn update_id(&self) -> u64 {
        *self.generation.borrow()
    }

    /// Time of the last [`bump`](Self::bump), `None` if never changed
    pub fn last_change(&self) -> Option<SystemTime> {
        *self.last_change.lock().unwrap()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.generation.subscribe()
    }

    /// Runs `query` now and again after every change
    pub fn live<T, F, Fut>(&self, query: F) -> LiveStream<T>
    where
        T: Send + 'static,
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let signals: Vec<Box<dyn ChangeSignal>> = vec![Box::new(self.subscribe())];
        live_from(signals, query)
    }
}

/// Source of change notifications a live stream waits on
///
/// Implemented for every `watch::Receiver`, so a stream can follow a
/// generation counter and any other watched state (mounted volumes, ...).
pub trait ChangeSignal: Send + 'static {
    /// Marks the current value as seen
    fn acknowledge(&mut self);

    /// Resolves on the next change; `false` once the sender is gone
    fn next_change(&mut self) -> BoxFuture<'_, bool>;
}

impl<T: Send + Sync + 'static> ChangeSignal for watch::Receiver<T> {
    fn acknowledge(&mut self) {
        self.borrow_and_update();
    }

    fn next_change(&mut self) -> BoxFuture<'_, bool> {
        Box::pin(async move { self.changed().await.is_ok() })
    }
}

/// Runs `query` now and again whenever any of `signals` changes
///
/// A change that lands while `query` is running triggers one more run. The
/// stream ends once every sender is gone.
pub fn live_from<T, F, Fut>(mut signals: Vec<Box<dyn ChangeSignal>>, query: F) -> LiveStream<T>
where
    T: Send + 'static,
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    Box::pin(async_stream::stream! {
        loop {
            for signal in signals.iter_mut() {
                signal.acknowledge();
            }
            yield query().await;

            loop {
                if signals.is_empty() {
                    return;
                }
                let (changed, index, rest) = futures::future::select_all(
                    signals.iter_mut().map(|signal| signal.next_change()),
                )
                .await;
                drop(rest);
                if changed {
                    break;
                }
                signals.swap_remove(index);
            }
        }
    })
}

/// Single-emission stream
pub fn once<T: Send + 'static>(value: Result<T>) -> LiveStream<T> {
    futures::stream::once(async move { value }).boxed()
}

/// Flattens a stream of streams, always following the most recent one
///
/// When `outer` yields a new inner stream, the previous inner stream is
/// dropped before anything else is polled, which cancels its in-flight
/// work. Items of a superseded inner stream are never yielded once its
/// successor is known. The result ends when `outer` has ended and the
/// current inner stream is exhausted.
pub fn switch_latest<O, I, T>(outer: O) -> BoxStream<'static, T>
where
    O: Stream<Item = I> + Send + 'static,
    I: Stream<Item = T> + Send + 'static,
    T: Send + 'static,
{
    enum Event<I, T> {
        Outer(Option<I>),
        Inner(Option<T>),
    }

    Box::pin(async_stream::stream! {
        let mut outer = Box::pin(outer);
        let mut outer_done = false;
        let mut inner: Option<std::pin::Pin<Box<I>>> = None;

        loop {
            let event = tokio::select! {
                biased;
                next = outer.next(), if !outer_done => Event::Outer(next),
                item = next_inner(&mut inner) => Event::Inner(item),
            };

            match event {
                Event::Outer(Some(next)) => {
                    if inner.is_some() {
                        debug!("Switching to a newer source, dropping the previous one");
                    }
                    inner = Some(Box::pin(next));
                }
                Event::Outer(None) => {
                    outer_done = true;
                    if inner.is_none() {
                        break;
                    }
                }
                Event::Inner(Some(item)) => yield item,
                Event::Inner(None) => {
                    inner = None;
                    if outer_done {
                        break;
                    }
                }
            }
        }
    })
}

async fn next_inner<I, T>(inner: &mut Option<std::pin::Pin<Box<I>>>) -> Option<T>
where
    I: Stream<Item = T>,
{
    match inner.as_mut() {
        Some(stream) => stream.next().await,
        None => std::future::pending().await,
    }
}

/// First emission of a live stream
///
/// Used by one-shot consumers (queue reconstruction, garbage collection).
/// A stream that ends without emitting yields `NotFound`.
pub async fn first<T>(mut stream: LiveStream<T>) -> Result<T> {
    match stream.next().await {
        Some(result) => result,
        None => Err(MediaError::NotFound("stream ended without a value".to_string())),
    }
}
