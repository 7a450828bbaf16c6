use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Serialize;
use serde_json::Value;

use crate::state::clamp_font_size;
use crate::state::clamp_panel_size;
use crate::state::ConnectionState;
use crate::state::LayoutState;
use crate::state::Panel;
use crate::state::SessionId;
use crate::state::TerminalTab;
use crate::state::TerminalTabs;
use crate::state::Theme;

#[derive(Debug, Serialize)]
struct PersistedLayout<'a> {
    left_width: u16,
    right_width: u16,
    terminal_height: u16,
    show_left: bool,
    show_right: bool,
    show_terminal: bool,
    theme: &'a str,
    font_size: u16,
}

#[derive(Debug, Serialize)]
struct PersistedTab<'a> {
    id: &'a str,
    name: &'a str,
    instance_id: &'a str,
}

#[derive(Debug, Serialize)]
struct PersistedTabSet<'a> {
    active_id: Option<&'a str>,
    tabs: Vec<PersistedTab<'a>>,
}

/// File-backed store for the device-local blobs: one layout blob, plus one
/// terminal-tab blob per owning coding session so tab sets never leak across
/// unrelated sessions.
///
/// Loads are tolerant field by field: anything missing or ill-typed falls
/// back to that field's default, and a file that fails to parse at all yields
/// full defaults. Loading never hard-fails on content.
#[derive(Debug)]
pub struct WorkbenchStateStore {
    root: PathBuf,
}

impl WorkbenchStateStore {
    pub fn open(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn layout_path(&self) -> PathBuf {
        self.root.join("layout.json")
    }

    // Distinct session ids must never share a blob, so the scope encoding is
    // injective: alphanumerics pass through, every other byte becomes a
    // `-xx` hex escape. A literal `-` is itself escaped, which keeps the
    // escapes unambiguous.
    fn tabs_path(&self, session: &SessionId) -> PathBuf {
        use std::fmt::Write as _;

        let mut scope = String::with_capacity(session.as_str().len());
        for ch in session.as_str().chars() {
            if ch.is_ascii_alphanumeric() {
                scope.push(ch);
            } else {
                let mut buf = [0u8; 4];
                for byte in ch.encode_utf8(&mut buf).bytes() {
                    let _ = write!(scope, "-{byte:02x}");
                }
            }
        }
        self.root.join(format!("terminal-tabs-{scope}.json"))
    }

    pub fn save_layout(&self, layout: &LayoutState) -> std::io::Result<()> {
        let blob = PersistedLayout {
            left_width: layout.left_width,
            right_width: layout.right_width,
            terminal_height: layout.terminal_height,
            show_left: layout.show_left,
            show_right: layout.show_right,
            show_terminal: layout.show_terminal,
            theme: layout.theme.label(),
            font_size: layout.font_size,
        };
        write_blob(&self.layout_path(), &blob)
    }

    pub fn load_layout(&self) -> LayoutState {
        let defaults = LayoutState::default();
        let Some(value) = read_blob(&self.layout_path()) else {
            return defaults;
        };
        LayoutState {
            left_width: clamp_panel_size(
                Panel::Left,
                u16_field(&value, "left_width", defaults.left_width),
            ),
            right_width: clamp_panel_size(
                Panel::Right,
                u16_field(&value, "right_width", defaults.right_width),
            ),
            terminal_height: clamp_panel_size(
                Panel::Terminal,
                u16_field(&value, "terminal_height", defaults.terminal_height),
            ),
            show_left: bool_field(&value, "show_left", defaults.show_left),
            show_right: bool_field(&value, "show_right", defaults.show_right),
            show_terminal: bool_field(&value, "show_terminal", defaults.show_terminal),
            theme: value
                .get("theme")
                .and_then(Value::as_str)
                .and_then(Theme::parse)
                .unwrap_or(defaults.theme),
            font_size: clamp_font_size(u16_field(&value, "font_size", defaults.font_size)),
        }
    }

    pub fn save_tabs(&self, session: &SessionId, tabs: &TerminalTabs) -> std::io::Result<()> {
        let blob = PersistedTabSet {
            active_id: tabs.active_id.as_deref(),
            tabs: tabs
                .tabs
                .iter()
                .map(|tab| PersistedTab {
                    id: &tab.id,
                    name: &tab.name,
                    instance_id: &tab.instance_id,
                })
                .collect(),
        };
        write_blob(&self.tabs_path(session), &blob)
    }

    /// Restores the tab list persisted for `session`. Entries missing any
    /// identity field are skipped; a stale active id falls back to the first
    /// tab. Restored tabs come back as `Connecting` until their transports
    /// reattach.
    pub fn load_tabs(&self, session: &SessionId) -> TerminalTabs {
        let Some(value) = read_blob(&self.tabs_path(session)) else {
            return TerminalTabs::default();
        };

        let tabs: Vec<TerminalTab> = value
            .get("tabs")
            .and_then(Value::as_array)
            .map(|entries| entries.iter().filter_map(tab_from_value).collect())
            .unwrap_or_default();

        // A stale active id falls back to the first tab; a non-empty list
        // always carries an active selection.
        let active_id = value
            .get("active_id")
            .and_then(Value::as_str)
            .filter(|id| tabs.iter().any(|tab| tab.id == *id))
            .map(str::to_string)
            .or_else(|| tabs.first().map(|tab| tab.id.clone()));

        TerminalTabs { tabs, active_id }
    }
}

fn tab_from_value(value: &Value) -> Option<TerminalTab> {
    let id = value.get("id")?.as_str()?;
    let name = value.get("name")?.as_str()?;
    let instance_id = value.get("instance_id")?.as_str()?;
    Some(TerminalTab {
        id: id.to_string(),
        name: name.to_string(),
        instance_id: instance_id.to_string(),
        connection: ConnectionState::Connecting,
    })
}

fn u16_field(value: &Value, key: &str, default: u16) -> u16 {
    value
        .get(key)
        .and_then(Value::as_u64)
        .and_then(|n| u16::try_from(n).ok())
        .unwrap_or(default)
}

fn bool_field(value: &Value, key: &str, default: bool) -> bool {
    value.get(key).and_then(Value::as_bool).unwrap_or(default)
}

fn read_blob(path: &Path) -> Option<Value> {
    let bytes = fs::read(path).ok()?;
    serde_json::from_slice(&bytes).ok()
}

fn write_blob<T: Serialize>(path: &Path, blob: &T) -> std::io::Result<()> {
    let encoded = serde_json::to_vec(blob)
        .map_err(|err| std::io::Error::other(format!("serialize: {err}")))?;
    fs::write(path, encoded)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    use super::*;
    use crate::state::LEFT_WIDTH_DEFAULT;
    use crate::state::LEFT_WIDTH_MAX;

    fn session(id: &str) -> SessionId {
        SessionId(id.to_string())
    }

    fn tab(id: &str, name: &str, instance: &str) -> TerminalTab {
        TerminalTab {
            id: id.to_string(),
            name: name.to_string(),
            instance_id: instance.to_string(),
            connection: ConnectionState::Connected,
        }
    }

    #[test]
    fn layout_round_trip_reproduces_flags_and_sizes() {
        let dir = tempdir().expect("tmpdir");
        let store = WorkbenchStateStore::open(dir.path()).expect("open");

        let mut layout = LayoutState::default();
        layout.set_panel_size(Panel::Left, 350);
        layout.toggle_panel(Panel::Terminal);
        layout.toggle_panel(Panel::Right);
        layout.theme = Theme::Light;
        layout.font_size = 16;

        store.save_layout(&layout).expect("save");
        assert_eq!(store.load_layout(), layout);
    }

    #[test]
    fn hidden_panel_size_survives_round_trip() {
        let dir = tempdir().expect("tmpdir");
        let store = WorkbenchStateStore::open(dir.path()).expect("open");

        let mut layout = LayoutState::default();
        layout.set_panel_size(Panel::Terminal, 400);
        layout.toggle_panel(Panel::Terminal);
        store.save_layout(&layout).expect("save");

        let restored = store.load_layout();
        assert!(!restored.show_terminal);
        assert_eq!(restored.terminal_height, 400);
    }

    #[test]
    fn missing_layout_file_yields_defaults() {
        let dir = tempdir().expect("tmpdir");
        let store = WorkbenchStateStore::open(dir.path()).expect("open");
        assert_eq!(store.load_layout(), LayoutState::default());
    }

    #[test]
    fn corrupt_layout_file_yields_defaults() {
        let dir = tempdir().expect("tmpdir");
        let store = WorkbenchStateStore::open(dir.path()).expect("open");
        fs::write(dir.path().join("layout.json"), b"{not json").expect("write");
        assert_eq!(store.load_layout(), LayoutState::default());
    }

    #[test]
    fn partial_layout_blob_defaults_per_field() {
        let dir = tempdir().expect("tmpdir");
        let store = WorkbenchStateStore::open(dir.path()).expect("open");
        // left_width is ill-typed, theme unknown, font_size missing.
        fs::write(
            dir.path().join("layout.json"),
            br#"{"left_width":"wide","right_width":400,"theme":"sepia","show_left":false}"#,
        )
        .expect("write");

        let restored = store.load_layout();
        assert_eq!(restored.left_width, LEFT_WIDTH_DEFAULT);
        assert_eq!(restored.right_width, 400);
        assert_eq!(restored.theme, Theme::Dark);
        assert!(!restored.show_left);
        assert_eq!(restored.font_size, LayoutState::default().font_size);
    }

    #[test]
    fn out_of_bounds_persisted_sizes_are_clamped_on_restore() {
        let dir = tempdir().expect("tmpdir");
        let store = WorkbenchStateStore::open(dir.path()).expect("open");
        fs::write(
            dir.path().join("layout.json"),
            br#"{"left_width":9000}"#,
        )
        .expect("write");
        assert_eq!(store.load_layout().left_width, LEFT_WIDTH_MAX);
    }

    #[test]
    fn tab_round_trip_preserves_order_and_active_id() {
        let dir = tempdir().expect("tmpdir");
        let store = WorkbenchStateStore::open(dir.path()).expect("open");
        let owning = session("session-a");

        let tabs = TerminalTabs {
            tabs: vec![
                tab("tab-1", "Terminal 1", "term-1"),
                tab("tab-2", "Terminal 2", "term-2"),
            ],
            active_id: Some("tab-2".to_string()),
        };
        store.save_tabs(&owning, &tabs).expect("save");

        let restored = store.load_tabs(&owning);
        assert_eq!(restored.active_id, Some("tab-2".to_string()));
        assert_eq!(restored.len(), 2);
        assert_eq!(restored.tabs[0].instance_id, "term-1");
        // Connection state is not persisted; restored tabs reconnect.
        assert_eq!(restored.tabs[0].connection, ConnectionState::Connecting);
    }

    #[test]
    fn tab_sets_are_scoped_per_session() {
        let dir = tempdir().expect("tmpdir");
        let store = WorkbenchStateStore::open(dir.path()).expect("open");

        let tabs = TerminalTabs {
            tabs: vec![tab("tab-1", "Terminal 1", "term-1")],
            active_id: Some("tab-1".to_string()),
        };
        store.save_tabs(&session("session-a"), &tabs).expect("save");

        assert!(store.load_tabs(&session("session-b")).is_empty());
        assert_eq!(store.load_tabs(&session("session-a")).len(), 1);
    }

    #[test]
    fn punctuation_only_differences_in_session_ids_keep_separate_blobs() {
        let dir = tempdir().expect("tmpdir");
        let store = WorkbenchStateStore::open(dir.path()).expect("open");

        let dotted = TerminalTabs {
            tabs: vec![tab("tab-1", "Terminal 1", "term-1")],
            active_id: Some("tab-1".to_string()),
        };
        let slashed = TerminalTabs {
            tabs: vec![tab("tab-2", "Terminal 1", "term-2")],
            active_id: Some("tab-2".to_string()),
        };
        store.save_tabs(&session("a.b"), &dotted).expect("save");
        store.save_tabs(&session("a/b"), &slashed).expect("save");

        assert_eq!(store.load_tabs(&session("a.b")).tabs[0].id, "tab-1");
        assert_eq!(store.load_tabs(&session("a/b")).tabs[0].id, "tab-2");
        // The hyphenated spelling is yet another session, still empty.
        assert!(store.load_tabs(&session("a-b")).is_empty());
    }

    #[test]
    fn invalid_tab_entries_are_dropped_and_stale_active_id_falls_back() {
        let dir = tempdir().expect("tmpdir");
        let store = WorkbenchStateStore::open(dir.path()).expect("open");
        let owning = session("session-a");
        store
            .save_tabs(&owning, &TerminalTabs::default())
            .expect("seed path");
        fs::write(
            store.tabs_path(&owning),
            br#"{"active_id":"tab-gone","tabs":[{"id":"tab-1","name":"Terminal 1","instance_id":"term-1"},{"name":"no identity"},42]}"#,
        )
        .expect("write");

        let restored = store.load_tabs(&owning);
        assert_eq!(restored.len(), 1);
        assert_eq!(restored.tabs[0].id, "tab-1");
        assert_eq!(restored.active_id, Some("tab-1".to_string()));
    }
}
