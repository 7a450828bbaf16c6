use serde::Deserialize;
use serde::Serialize;

use crate::state::FONT_SIZE_DEFAULT;
use crate::state::LEFT_WIDTH_DEFAULT;
use crate::state::RIGHT_WIDTH_DEFAULT;
use crate::state::TERMINAL_HEIGHT_DEFAULT;

pub const FLUSH_QUANTUM_MS: u64 = 500;

/// Remote-authoritative preference document. The store may return a partial
/// payload; every field falls back to its default independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreferenceRecord {
    pub theme: String,
    pub font_size: u16,
    pub left_panel_width: u16,
    pub right_panel_width: u16,
    pub terminal_panel_height: u16,
    pub default_model: Option<String>,
}

impl Default for PreferenceRecord {
    fn default() -> Self {
        Self {
            theme: "dark".to_string(),
            font_size: FONT_SIZE_DEFAULT,
            left_panel_width: LEFT_WIDTH_DEFAULT,
            right_panel_width: RIGHT_WIDTH_DEFAULT,
            terminal_panel_height: TERMINAL_HEIGHT_DEFAULT,
            default_model: None,
        }
    }
}

impl PreferenceRecord {
    pub fn apply(&mut self, patch: &PreferencePatch) {
        if let Some(theme) = patch.theme.as_ref() {
            self.theme = theme.clone();
        }
        if let Some(font_size) = patch.font_size {
            self.font_size = font_size;
        }
        if let Some(width) = patch.left_panel_width {
            self.left_panel_width = width;
        }
        if let Some(width) = patch.right_panel_width {
            self.right_panel_width = width;
        }
        if let Some(height) = patch.terminal_panel_height {
            self.terminal_panel_height = height;
        }
        if let Some(model) = patch.default_model.as_ref() {
            self.default_model = Some(model.clone());
        }
    }
}

/// Partial preference write. Merging is last-value-wins per field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferencePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub left_panel_width: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub right_panel_width: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terminal_panel_height: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

impl PreferencePatch {
    pub fn is_empty(&self) -> bool {
        self.theme.is_none()
            && self.font_size.is_none()
            && self.left_panel_width.is_none()
            && self.right_panel_width.is_none()
            && self.terminal_panel_height.is_none()
            && self.default_model.is_none()
    }

    /// Overlays `newer` on top of `self`; set fields of `newer` win.
    pub fn merge(&mut self, newer: &PreferencePatch) {
        if newer.theme.is_some() {
            self.theme = newer.theme.clone();
        }
        if newer.font_size.is_some() {
            self.font_size = newer.font_size;
        }
        if newer.left_panel_width.is_some() {
            self.left_panel_width = newer.left_panel_width;
        }
        if newer.right_panel_width.is_some() {
            self.right_panel_width = newer.right_panel_width;
        }
        if newer.terminal_panel_height.is_some() {
            self.terminal_panel_height = newer.terminal_panel_height;
        }
        if newer.default_model.is_some() {
            self.default_model = newer.default_model.clone();
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// Before the one authoritative fetch resolves no flush may be produced;
    /// writing first would clobber remote state with local defaults.
    AwaitingFetch,
    Idle,
    Debouncing { deadline_ms: u64 },
    FlushInFlight,
}

/// Coalesces rapid local preference mutations into single remote writes.
///
/// Deterministic state machine: callers feed it explicit clock values and
/// drive `poll`, so the debounce quantum is testable without real timers.
/// Flushes are serialized; while one is in flight new patches accumulate and
/// wait, which preserves per-field ordering on the wire.
#[derive(Debug, Clone)]
pub struct PreferenceSynchronizer {
    phase: SyncPhase,
    quantum_ms: u64,
    pending: PreferencePatch,
    /// Whether a local mutation since the last flush wants the quantum armed.
    /// Distinguishes mount-time accumulation (flush once the fetch resolves)
    /// from a failed flush's leftovers (flush only on the next mutation).
    armed: bool,
    remote: Option<PreferenceRecord>,
}

impl PreferenceSynchronizer {
    pub fn new(quantum_ms: u64) -> Self {
        Self {
            phase: SyncPhase::AwaitingFetch,
            quantum_ms,
            pending: PreferencePatch::default(),
            armed: false,
            remote: None,
        }
    }

    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    pub fn remote(&self) -> Option<&PreferenceRecord> {
        self.remote.as_ref()
    }

    pub fn pending(&self) -> &PreferencePatch {
        &self.pending
    }

    /// Records a local preference mutation. Re-arms the quantum on every call
    /// (debounce, not throttle) unless gated by the initial fetch or an
    /// in-flight flush.
    pub fn note_patch(&mut self, patch: &PreferencePatch, now_ms: u64) {
        if patch.is_empty() {
            return;
        }
        self.pending.merge(patch);
        self.armed = true;
        match self.phase {
            SyncPhase::AwaitingFetch | SyncPhase::FlushInFlight => {}
            SyncPhase::Idle | SyncPhase::Debouncing { .. } => {
                self.phase = SyncPhase::Debouncing {
                    deadline_ms: now_ms + self.quantum_ms,
                };
            }
        }
    }

    /// The single mount-time fetch resolved. Patches accumulated while gated
    /// become eligible after one quantum.
    pub fn fetch_resolved(&mut self, record: PreferenceRecord, now_ms: u64) {
        self.remote = Some(record);
        self.phase = if self.armed && !self.pending.is_empty() {
            SyncPhase::Debouncing {
                deadline_ms: now_ms + self.quantum_ms,
            }
        } else {
            SyncPhase::Idle
        };
    }

    /// The fetch (initial or resync) failed. Stay write-gated; the caller
    /// retries the fetch on the next local mutation.
    pub fn fetch_failed(&mut self) {
        self.phase = SyncPhase::AwaitingFetch;
    }

    pub fn needs_fetch(&self) -> bool {
        matches!(self.phase, SyncPhase::AwaitingFetch)
    }

    /// Returns the accumulated patch once the quantum has expired with no
    /// further mutations. Taking it moves the machine to `FlushInFlight`.
    pub fn poll(&mut self, now_ms: u64) -> Option<PreferencePatch> {
        let SyncPhase::Debouncing { deadline_ms } = self.phase else {
            return None;
        };
        if now_ms < deadline_ms || self.pending.is_empty() {
            return None;
        }
        self.phase = SyncPhase::FlushInFlight;
        self.armed = false;
        Some(std::mem::take(&mut self.pending))
    }

    /// A flush succeeded; the store returned the merged authoritative record.
    /// Anything that accumulated while the flush was in flight becomes
    /// immediately eligible, preserving ordering.
    pub fn flush_resolved(&mut self, record: PreferenceRecord, now_ms: u64) {
        self.remote = Some(record);
        self.phase = if self.pending.is_empty() {
            SyncPhase::Idle
        } else {
            SyncPhase::Debouncing { deadline_ms: now_ms }
        };
    }

    /// A flush failed. The failed patch is folded back *under* any newer
    /// pending values and the machine returns to the write-gated phase; the
    /// caller must re-fetch the remote record. There is no timed retry: the
    /// leftovers ride the quantum armed by the next local mutation.
    pub fn flush_failed(&mut self, failed: PreferencePatch) {
        let newer = std::mem::take(&mut self.pending);
        self.pending = failed;
        self.pending.merge(&newer);
        self.phase = SyncPhase::AwaitingFetch;
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn left(width: u16) -> PreferencePatch {
        PreferencePatch {
            left_panel_width: Some(width),
            ..PreferencePatch::default()
        }
    }

    fn theme(name: &str) -> PreferencePatch {
        PreferencePatch {
            theme: Some(name.to_string()),
            ..PreferencePatch::default()
        }
    }

    fn resolved(sync: &mut PreferenceSynchronizer, now_ms: u64) {
        sync.fetch_resolved(PreferenceRecord::default(), now_ms);
    }

    #[test]
    fn no_flush_before_initial_fetch_resolves() {
        let mut sync = PreferenceSynchronizer::new(FLUSH_QUANTUM_MS);
        sync.note_patch(&left(350), 0);

        assert_eq!(sync.poll(10_000), None);
        assert_eq!(sync.phase(), SyncPhase::AwaitingFetch);
    }

    #[test]
    fn patches_accumulated_while_gated_flush_after_fetch() {
        let mut sync = PreferenceSynchronizer::new(FLUSH_QUANTUM_MS);
        sync.note_patch(&left(350), 0);
        resolved(&mut sync, 100);

        assert_eq!(sync.poll(100 + FLUSH_QUANTUM_MS - 1), None);
        let patch = sync.poll(100 + FLUSH_QUANTUM_MS).expect("flush due");
        assert_eq!(patch.left_panel_width, Some(350));
    }

    #[test]
    fn rapid_patches_coalesce_into_one_write_last_value_wins() {
        let mut sync = PreferenceSynchronizer::new(FLUSH_QUANTUM_MS);
        resolved(&mut sync, 0);

        sync.note_patch(&left(300), 0);
        sync.note_patch(&left(320), 100);
        sync.note_patch(&theme("light"), 200);
        sync.note_patch(&left(350), 300);

        // Each patch reset the timer; nothing is due one quantum after the
        // first patch.
        assert_eq!(sync.poll(FLUSH_QUANTUM_MS), None);

        let patch = sync.poll(300 + FLUSH_QUANTUM_MS).expect("flush due");
        assert_eq!(patch.left_panel_width, Some(350));
        assert_eq!(patch.theme, Some("light".to_string()));
        // Accumulator drained; nothing further to flush.
        assert_eq!(sync.poll(900_000), None);
    }

    #[test]
    fn flushes_are_serialized_while_one_is_in_flight() {
        let mut sync = PreferenceSynchronizer::new(FLUSH_QUANTUM_MS);
        resolved(&mut sync, 0);

        sync.note_patch(&left(300), 0);
        let first = sync.poll(FLUSH_QUANTUM_MS).expect("first flush");
        assert_eq!(first.left_panel_width, Some(300));

        // New accumulation during the in-flight write must wait for it.
        sync.note_patch(&left(340), FLUSH_QUANTUM_MS + 10);
        assert_eq!(sync.poll(100_000), None);

        sync.flush_resolved(PreferenceRecord::default(), 100_000);
        let second = sync.poll(100_000).expect("queued flush after completion");
        assert_eq!(second.left_panel_width, Some(340));
    }

    #[test]
    fn flush_failure_keeps_patch_but_waits_for_next_mutation() {
        let mut sync = PreferenceSynchronizer::new(FLUSH_QUANTUM_MS);
        resolved(&mut sync, 0);

        sync.note_patch(&left(300), 0);
        let failed = sync.poll(FLUSH_QUANTUM_MS).expect("flush");
        sync.flush_failed(failed);

        assert!(sync.needs_fetch());
        // Resync alone must not retry on its own timer.
        resolved(&mut sync, 1_000);
        assert_eq!(sync.poll(900_000), None);

        // The next local mutation carries the leftovers.
        sync.note_patch(&theme("light"), 2_000);
        let retry = sync.poll(2_000 + FLUSH_QUANTUM_MS).expect("retry flush");
        assert_eq!(retry.left_panel_width, Some(300));
        assert_eq!(retry.theme, Some("light".to_string()));
    }

    #[test]
    fn failed_fields_do_not_overwrite_newer_pending_values() {
        let mut sync = PreferenceSynchronizer::new(FLUSH_QUANTUM_MS);
        resolved(&mut sync, 0);

        sync.note_patch(&left(300), 0);
        let failed = sync.poll(FLUSH_QUANTUM_MS).expect("flush");
        // A newer value for the same field arrived while the write was in
        // flight; it must survive the failure fold-back.
        sync.note_patch(&left(360), FLUSH_QUANTUM_MS + 10);
        sync.flush_failed(failed);

        assert_eq!(sync.pending().left_panel_width, Some(360));
    }

    #[test]
    fn record_applies_patch_per_field() {
        let mut record = PreferenceRecord::default();
        let mut patch = left(350);
        patch.default_model = Some("sonnet".to_string());
        record.apply(&patch);

        assert_eq!(record.left_panel_width, 350);
        assert_eq!(record.default_model, Some("sonnet".to_string()));
        assert_eq!(record.right_panel_width, RIGHT_WIDTH_DEFAULT);
    }

    #[test]
    fn partial_remote_payload_defaults_missing_fields() {
        let record: PreferenceRecord =
            serde_json::from_str(r#"{"theme":"light"}"#).expect("partial payload");
        assert_eq!(record.theme, "light");
        assert_eq!(record.font_size, FONT_SIZE_DEFAULT);
        assert_eq!(record.left_panel_width, LEFT_WIDTH_DEFAULT);
    }
}
