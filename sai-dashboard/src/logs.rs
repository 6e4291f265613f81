//! Log stream assembly
//!
//! Chunks arrive base64 encoded and tagged with a channel and a microsecond
//! timestamp. They are decoded, escaped and appended to three parallel
//! columns: line-number anchors, relative timestamps and the text itself.
//! Redraws are coalesced: the first chunk after a flush arms a timer and
//! everything arriving before it fires goes out in one update.

use std::collections::HashMap;

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64_STANDARD};
use sai_core::domain::log::{LogChannel, LogChunk};
use tracing::debug;

use crate::format::escape_html;
use crate::reconciler::keys;
use crate::router::FrameError;
use crate::timers::{TimerHandle, TimerKind, Timers};
use crate::tree::UiTree;

/// The scrollable surface the log is shown in
pub trait Viewport {
    /// True when the view currently shows the end of the log
    fn at_bottom(&self) -> bool;
    fn scroll_to_bottom(&mut self);
}

/// Headless viewport that follows the output unless unpinned
#[derive(Debug, Clone)]
pub struct FollowingViewport {
    pinned: bool,
    scrolls: u32,
}

impl Default for FollowingViewport {
    fn default() -> Self {
        Self {
            pinned: true,
            scrolls: 0,
        }
    }
}

impl FollowingViewport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates the user scrolling away from (or back to) the end
    pub fn set_pinned(&mut self, pinned: bool) {
        self.pinned = pinned;
    }

    /// How many times the view was pinned to the bottom
    pub fn scrolls(&self) -> u32 {
        self.scrolls
    }
}

impl Viewport for FollowingViewport {
    fn at_bottom(&self) -> bool {
        self.pinned
    }

    fn scroll_to_bottom(&mut self) {
        self.pinned = true;
        self.scrolls += 1;
    }
}

#[derive(Debug)]
pub struct LogAssembler {
    text: String,
    lines: String,
    times: String,
    /// Decoded text not yet handed out by a flush
    plain_pending: String,
    /// Timestamp of the first chunk, the zero for relative labels
    first_ts: Option<u64>,
    /// Newest chunk timestamp, sent back on reconnect
    last_ts: u64,
    next_line: u64,
    /// Per channel: the previous chunk ended mid-line
    continuing: HashMap<u8, bool>,
    flush_timer: Option<TimerHandle>,
    /// Whether the view was at the bottom at the last flush
    locked: bool,
    flush_delay_ms: u64,
}

impl LogAssembler {
    pub fn new(flush_delay_ms: u64) -> Self {
        Self {
            text: String::new(),
            lines: String::new(),
            times: String::new(),
            plain_pending: String::new(),
            first_ts: None,
            last_ts: 0,
            next_line: 1,
            continuing: HashMap::new(),
            flush_timer: None,
            locked: true,
            flush_delay_ms,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn lines(&self) -> &str {
        &self.lines
    }

    pub fn times(&self) -> &str {
        &self.times
    }

    pub fn last_log_ts(&self) -> u64 {
        self.last_ts
    }

    pub fn next_line(&self) -> u64 {
        self.next_line
    }

    pub fn is_flush_pending(&self) -> bool {
        self.flush_timer.is_some()
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Appends a chunk and makes sure a flush is scheduled
    ///
    /// Returns true if this chunk armed the flush timer.
    pub fn push(
        &mut self,
        chunk: &LogChunk,
        timers: &mut Timers,
        now_ms: i64,
    ) -> Result<bool, FrameError> {
        self.append(chunk)?;
        if self.flush_timer.is_some() {
            return Ok(false);
        }
        self.flush_timer = Some(timers.schedule(
            TimerKind::LogFlush,
            now_ms + self.flush_delay_ms as i64,
        ));
        Ok(true)
    }

    /// Decodes and appends one chunk to the buffers
    ///
    /// A chunk that does not decode leaves every buffer untouched.
    pub fn append(&mut self, chunk: &LogChunk) -> Result<(), FrameError> {
        let bytes = BASE64_STANDARD.decode(chunk.log.as_bytes())?;
        let raw = String::from_utf8_lossy(&bytes);
        let escaped = escape_html(&raw);
        let zero = *self.first_ts.get_or_insert(chunk.timestamp);

        match chunk.channel() {
            LogChannel::Stdout => self.text.push_str(&escaped),
            LogChannel::Stderr => {
                self.text.push_str(&format!("<span class=\"stderr\">{escaped}</span>"))
            }
            LogChannel::BuildSystem => self
                .text
                .push_str(&format!("<span class=\"saibuild\">\u{25a0} {escaped}</span>")),
            LogChannel::TtyPrimary => {
                self.text.push_str(&format!("<span class=\"tty0\">{escaped}</span>"))
            }
            LogChannel::TtySecondary(_) => {
                self.text.push_str(&format!("<span class=\"tty1\">{escaped}</span>"))
            }
        }

        let newlines = raw.matches('\n').count();
        let continuing = self.continuing.get(&chunk.channel).copied().unwrap_or(false);
        if !(continuing && chunk.len != 0) {
            let offset_ms = chunk.timestamp.saturating_sub(zero) as f64 / 1_000.0;
            self.times.push_str(&format!("{offset_ms:.4}"));
        }
        self.continuing
            .insert(chunk.channel, chunk.len != 0 && !raw.ends_with('\n'));

        for _ in 0..newlines {
            let n = self.next_line;
            self.lines
                .push_str(&format!("<a id=\"#sn{n}\" href=\"#sn{n}\">{n}</a><br>"));
            self.times.push_str("<br>");
            self.next_line += 1;
        }

        self.last_ts = self.last_ts.max(chunk.timestamp);
        self.plain_pending.push_str(&raw);
        Ok(())
    }

    /// Writes the buffers into the log view nodes, where they exist
    pub fn write(&self, tree: &mut UiTree) {
        let Some(text) = tree.by_key(keys::LOG_TEXT) else {
            return;
        };
        tree.set_text(text, self.text.clone());
        if let Some(lines) = tree.by_key(keys::LOG_LINES) {
            tree.set_text(lines, self.lines.clone());
        }
        if let Some(times) = tree.by_key(keys::LOG_TIMES) {
            tree.set_text(times, self.times.clone());
        }
    }

    /// The flush timer fired: redraw once, keeping the view at the bottom if
    /// it was there before
    ///
    /// Returns the plain text that became visible, if any.
    pub fn flush(&mut self, tree: &mut UiTree, viewport: &mut dyn Viewport) -> Option<String> {
        self.flush_timer = None;
        self.locked = viewport.at_bottom();
        self.write(tree);
        if self.locked {
            viewport.scroll_to_bottom();
        }
        let text = std::mem::take(&mut self.plain_pending);
        debug!("log flush, next line {}", self.next_line);
        (!text.is_empty()).then_some(text)
    }

    /// Forgets everything shown so far, as when the viewed task is rebuilt
    ///
    /// The resume timestamp is kept; the server only replays newer chunks.
    pub fn reset(&mut self, timers: &mut Timers, tree: &mut UiTree) {
        if let Some(handle) = self.flush_timer.take() {
            timers.cancel(handle);
        }
        self.text.clear();
        self.lines.clear();
        self.times.clear();
        self.plain_pending.clear();
        self.first_ts = None;
        self.next_line = 1;
        self.continuing.clear();
        self.write(tree);
    }
}
