//! Deterministic timer scheduling
//!
//! The engine never sleeps. Everything that would be a callback timer in a
//! browser is an entry here with an absolute deadline in milliseconds; the
//! driver asks for [`Timers::next_deadline`], waits, and hands the current
//! time back so the due entries can be taken and acted on.

/// What a timer is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Re-render relative ages
    AgeRefresh,
    /// Coalesced log redraw
    LogFlush,
    /// Reconnect after the connection dropped
    Reconnect,
    /// The login session runs out
    SessionExpiry,
    /// Reload the page after giving the server time to act
    DelayedReload,
}

/// Cancel handle for a scheduled timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

#[derive(Debug, Clone)]
struct Entry {
    handle: TimerHandle,
    kind: TimerKind,
    due_ms: i64,
}

#[derive(Debug, Default)]
pub struct Timers {
    next_id: u64,
    pending: Vec<Entry>,
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, kind: TimerKind, due_ms: i64) -> TimerHandle {
        self.next_id += 1;
        let handle = TimerHandle(self.next_id);
        self.pending.push(Entry {
            handle,
            kind,
            due_ms,
        });
        handle
    }

    /// Returns false if the timer already fired or was cancelled
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        let before = self.pending.len();
        self.pending.retain(|e| e.handle != handle);
        self.pending.len() != before
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.pending.iter().any(|e| e.handle == handle)
    }

    pub fn pending_of(&self, kind: TimerKind) -> usize {
        self.pending.iter().filter(|e| e.kind == kind).count()
    }

    pub fn due_of(&self, handle: TimerHandle) -> Option<i64> {
        self.pending
            .iter()
            .find(|e| e.handle == handle)
            .map(|e| e.due_ms)
    }

    pub fn next_deadline(&self) -> Option<i64> {
        self.pending.iter().map(|e| e.due_ms).min()
    }

    /// Removes and returns every timer due at `now_ms`, earliest first
    pub fn take_due(&mut self, now_ms: i64) -> Vec<(TimerHandle, TimerKind)> {
        let (mut due, rest): (Vec<Entry>, Vec<Entry>) =
            self.pending.drain(..).partition(|e| e.due_ms <= now_ms);
        self.pending = rest;
        due.sort_by_key(|e| (e.due_ms, e.handle));
        due.into_iter().map(|e| (e.handle, e.kind)).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
