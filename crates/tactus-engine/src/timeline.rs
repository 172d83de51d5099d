//! Timeline state machine
//!
//! Tracks the active bar and the beat within it, and owns the pending
//! snapshot swap. Both schedulers drive the same cursor: at every beat
//! scheduling decision they first give the cursor a chance to commit a
//! pending swap, then read the active bar, then advance.

use std::sync::Arc;

use tactus_core::ApplyAt;

use crate::snapshot::{CompiledBar, EngineSnapshot};

/// Active bar/beat cursor plus the pending swap slot
#[derive(Debug)]
pub struct TimelineCursor {
    snapshot: Arc<EngineSnapshot>,
    pending: Option<(Arc<EngineSnapshot>, ApplyAt)>,
    bar: usize,
    beat: u32,
}

impl TimelineCursor {
    pub fn new(snapshot: Arc<EngineSnapshot>) -> Self {
        let bar = snapshot.config.start_bar.min(snapshot.bar_count() - 1);
        Self {
            snapshot,
            pending: None,
            bar,
            beat: 0,
        }
    }

    /// The active snapshot
    #[inline]
    pub fn snapshot(&self) -> &Arc<EngineSnapshot> {
        &self.snapshot
    }

    /// Active bar index
    #[inline]
    pub fn bar(&self) -> usize {
        self.bar
    }

    /// Beat within the active bar
    #[inline]
    pub fn beat(&self) -> u32 {
        self.beat
    }

    /// The active compiled bar
    #[inline]
    pub fn current_bar(&self) -> &CompiledBar {
        self.snapshot.bar(self.bar)
    }

    /// Queue a snapshot swap. The last published snapshot for a boundary
    /// wins; an earlier pending swap is replaced wholesale.
    pub fn publish(&mut self, snapshot: Arc<EngineSnapshot>, apply_at: ApplyAt) {
        self.pending = Some((snapshot, apply_at));
    }

    /// Commit the pending swap if its boundary has arrived.
    ///
    /// Called at every beat scheduling decision, before the beat is read.
    /// `Now` commits at any beat; `NextBar` only when the decision is for a
    /// downbeat. Returns true when a swap was committed.
    pub fn commit_pending(&mut self) -> bool {
        let due = match &self.pending {
            Some((_, ApplyAt::Now)) => true,
            Some((_, ApplyAt::NextBar)) => self.beat == 0,
            None => false,
        };
        if !due {
            return false;
        }

        let (snapshot, _) = self.pending.take().expect("pending swap checked above");
        self.bar = self.bar.min(snapshot.bar_count() - 1);
        if self.beat >= snapshot.bar(self.bar).beats() {
            self.beat = 0;
        }
        self.snapshot = snapshot;
        true
    }

    /// Advance one beat.
    ///
    /// Returns the index of the bar being entered when the advance crossed
    /// a bar boundary, `None` otherwise.
    pub fn advance(&mut self) -> Option<usize> {
        self.beat += 1;
        if self.beat < self.current_bar().beats() {
            return None;
        }

        self.beat = 0;
        self.bar = self.snapshot.next_bar_index(self.bar);
        Some(self.bar)
    }
}
