//! Lazy result streams produced by query plans.

use crate::graph::{Vertex, VertexIter};
use std::fmt;
use std::sync::Arc;

/// Where a [`VertexStream`] is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Nothing has been evaluated yet.
    Created,
    /// At least one element was requested.
    Evaluating,
    /// The source is drained or the stream was closed.
    Exhausted,
}

type Source<'a> = Box<dyn FnOnce() -> VertexIter<'a> + Send + 'a>;

/// A pull-based stream of vertex snapshots.
///
/// Building a stream does no work: the source is only set up when the first
/// element is requested. Each element is computed on demand, and dropping
/// the stream early releases the source without evaluating the rest.
pub struct VertexStream<'a> {
    operator: &'static str,
    state: StreamState,
    pending: Option<Source<'a>>,
    inner: Option<VertexIter<'a>>,
    yielded: usize,
}

impl<'a> VertexStream<'a> {
    /// Creates a stream whose source is built on first pull.
    pub fn deferred(
        operator: &'static str,
        source: impl FnOnce() -> VertexIter<'a> + Send + 'a,
    ) -> Self {
        Self {
            operator,
            state: StreamState::Created,
            pending: Some(Box::new(source)),
            inner: None,
            yielded: 0,
        }
    }

    /// Creates a stream that yields nothing.
    #[must_use]
    pub fn empty(operator: &'static str) -> Self {
        Self {
            operator,
            state: StreamState::Exhausted,
            pending: None,
            inner: None,
            yielded: 0,
        }
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Returns the name of the operator that produced the stream.
    #[must_use]
    pub fn operator(&self) -> &'static str {
        self.operator
    }

    /// Number of snapshots yielded so far.
    #[must_use]
    pub fn yielded(&self) -> usize {
        self.yielded
    }

    /// Stops the stream and releases its source.
    pub fn close(&mut self) {
        self.pending = None;
        self.inner = None;
        self.state = StreamState::Exhausted;
    }

    /// Converts the stream into a boxed iterator, e.g. to feed another
    /// operator.
    #[must_use]
    pub fn into_iter_boxed(self) -> VertexIter<'a> {
        Box::new(self)
    }
}

impl Iterator for VertexStream<'_> {
    type Item = Arc<Vertex>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.state == StreamState::Created {
            self.inner = self.pending.take().map(|source| source());
            self.state = StreamState::Evaluating;
            tracing::trace!(operator = self.operator, "stream evaluation started");
        }
        let next = self.inner.as_mut().and_then(Iterator::next);
        match next {
            Some(vertex) => {
                self.yielded += 1;
                Some(vertex)
            }
            None => {
                if self.state == StreamState::Evaluating {
                    tracing::trace!(
                        operator = self.operator,
                        yielded = self.yielded,
                        "stream exhausted"
                    );
                }
                self.close();
                None
            }
        }
    }
}

impl Drop for VertexStream<'_> {
    fn drop(&mut self) {
        if self.state == StreamState::Evaluating {
            tracing::trace!(
                operator = self.operator,
                yielded = self.yielded,
                "stream dropped before exhaustion"
            );
        }
    }
}

impl fmt::Debug for VertexStream<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VertexStream")
            .field("operator", &self.operator)
            .field("state", &self.state)
            .field("yielded", &self.yielded)
            .finish_non_exhaustive()
    }
}
