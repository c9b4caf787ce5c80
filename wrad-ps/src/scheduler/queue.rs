//! Playback queue
//!
//! Ordered look-ahead of upcoming tracks, insertion order = play order. The
//! head is the track that is about to play or currently playing; it stays in
//! place until its advance timer fires. The queue has no interior locking;
//! every mutation happens on the scheduler engine task.

use std::collections::VecDeque;

use wrad_common::model::TrackDescriptor;

use crate::error::{Error, Result};

/// FIFO of owned track descriptors.
#[derive(Debug, Default)]
pub struct PlayQueue {
    entries: VecDeque<TrackDescriptor>,
}

impl PlayQueue {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::new(),
        }
    }

    /// Append a fetched batch to the tail, preserving source order.
    pub fn append(&mut self, batch: Vec<TrackDescriptor>) {
        self.entries.extend(batch);
    }

    /// Track at the head, if any.
    pub fn peek_head(&self) -> Option<&TrackDescriptor> {
        self.entries.front()
    }

    /// Remove and return the head.
    ///
    /// The prefetch trigger keeps this from ever failing during playback;
    /// an [`Error::EmptyQueue`] here is an invariant violation upstream.
    pub fn pop_head(&mut self) -> Result<TrackDescriptor> {
        self.entries.pop_front().ok_or(Error::EmptyQueue)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every queued entry (station change or stop).
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
