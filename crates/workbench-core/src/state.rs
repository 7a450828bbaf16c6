use std::collections::VecDeque;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Panel {
    Left,
    Right,
    Terminal,
}

impl Panel {
    pub fn label(self) -> &'static str {
        match self {
            Self::Left => "explorer",
            Self::Right => "assistant",
            Self::Terminal => "terminal",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Dark,
    Light,
}

impl Theme {
    pub fn label(self) -> &'static str {
        match self {
            Self::Dark => "dark",
            Self::Light => "light",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Self::Dark => Self::Light,
            Self::Light => Self::Dark,
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "dark" => Some(Self::Dark),
            "light" => Some(Self::Light),
            _ => None,
        }
    }
}

pub const LEFT_WIDTH_MIN: u16 = 180;
pub const LEFT_WIDTH_MAX: u16 = 480;
pub const LEFT_WIDTH_DEFAULT: u16 = 280;

pub const RIGHT_WIDTH_MIN: u16 = 220;
pub const RIGHT_WIDTH_MAX: u16 = 560;
pub const RIGHT_WIDTH_DEFAULT: u16 = 320;

pub const TERMINAL_HEIGHT_MIN: u16 = 120;
pub const TERMINAL_HEIGHT_MAX: u16 = 600;
pub const TERMINAL_HEIGHT_DEFAULT: u16 = 240;

pub const FONT_SIZE_MIN: u16 = 10;
pub const FONT_SIZE_MAX: u16 = 24;
pub const FONT_SIZE_DEFAULT: u16 = 14;

pub fn clamp_panel_size(panel: Panel, size: u16) -> u16 {
    match panel {
        Panel::Left => size.clamp(LEFT_WIDTH_MIN, LEFT_WIDTH_MAX),
        Panel::Right => size.clamp(RIGHT_WIDTH_MIN, RIGHT_WIDTH_MAX),
        Panel::Terminal => size.clamp(TERMINAL_HEIGHT_MIN, TERMINAL_HEIGHT_MAX),
    }
}

pub fn clamp_font_size(size: u16) -> u16 {
    size.clamp(FONT_SIZE_MIN, FONT_SIZE_MAX)
}

/// Panel geometry, visibility flags, theme and font size. Hidden panels keep
/// their last stored size; toggling visibility never resets geometry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutState {
    pub left_width: u16,
    pub right_width: u16,
    pub terminal_height: u16,
    pub show_left: bool,
    pub show_right: bool,
    pub show_terminal: bool,
    pub theme: Theme,
    pub font_size: u16,
}

impl Default for LayoutState {
    fn default() -> Self {
        Self {
            left_width: LEFT_WIDTH_DEFAULT,
            right_width: RIGHT_WIDTH_DEFAULT,
            terminal_height: TERMINAL_HEIGHT_DEFAULT,
            show_left: true,
            show_right: true,
            show_terminal: true,
            theme: Theme::Dark,
            font_size: FONT_SIZE_DEFAULT,
        }
    }
}

impl LayoutState {
    pub fn panel_size(&self, panel: Panel) -> u16 {
        match panel {
            Panel::Left => self.left_width,
            Panel::Right => self.right_width,
            Panel::Terminal => self.terminal_height,
        }
    }

    pub fn set_panel_size(&mut self, panel: Panel, size: u16) {
        let size = clamp_panel_size(panel, size);
        match panel {
            Panel::Left => self.left_width = size,
            Panel::Right => self.right_width = size,
            Panel::Terminal => self.terminal_height = size,
        }
    }

    pub fn panel_visible(&self, panel: Panel) -> bool {
        match panel {
            Panel::Left => self.show_left,
            Panel::Right => self.show_right,
            Panel::Terminal => self.show_terminal,
        }
    }

    pub fn toggle_panel(&mut self, panel: Panel) {
        match panel {
            Panel::Left => self.show_left = !self.show_left,
            Panel::Right => self.show_right = !self.show_right,
            Panel::Terminal => self.show_terminal = !self.show_terminal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
}

impl ConnectionState {
    pub fn label(self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalTab {
    pub id: String,
    pub name: String,
    pub instance_id: String,
    pub connection: ConnectionState,
}

/// Freshly generated tab identity. Timestamp plus random suffix so a burst of
/// concurrent creations cannot collide; never a plain counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabIdentity {
    pub tab_id: String,
    pub instance_id: String,
}

pub fn generate_tab_identity() -> TabIdentity {
    let ts_ms = Utc::now().timestamp_millis();
    let tab_suffix = short_suffix();
    let instance_suffix = short_suffix();
    TabIdentity {
        tab_id: format!("tab-{ts_ms}-{tab_suffix}"),
        instance_id: format!("term-{ts_ms}-{instance_suffix}"),
    }
}

fn short_suffix() -> String {
    let mut simple = Uuid::new_v4().simple().to_string();
    simple.truncate(8);
    simple
}

/// Ordered set of open terminal tabs. At most one tab is active, or none when
/// the list is empty. Closed tabs never come back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TerminalTabs {
    pub tabs: Vec<TerminalTab>,
    pub active_id: Option<String>,
}

impl TerminalTabs {
    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn index_of(&self, tab_id: &str) -> Option<usize> {
        self.tabs.iter().position(|tab| tab.id == tab_id)
    }

    pub fn get(&self, tab_id: &str) -> Option<&TerminalTab> {
        self.tabs.iter().find(|tab| tab.id == tab_id)
    }

    pub fn get_by_instance_mut(&mut self, instance_id: &str) -> Option<&mut TerminalTab> {
        self.tabs
            .iter_mut()
            .find(|tab| tab.instance_id == instance_id)
    }

    pub fn active_tab(&self) -> Option<&TerminalTab> {
        let active_id = self.active_id.as_deref()?;
        self.get(active_id)
    }

    pub fn push_active(&mut self, tab: TerminalTab) {
        self.active_id = Some(tab.id.clone());
        self.tabs.push(tab);
    }

    /// Removes a tab. When the removed tab was active, the next active tab is
    /// the one at the removed index clamped into the new list bounds.
    pub fn remove(&mut self, tab_id: &str) -> Option<TerminalTab> {
        let index = self.index_of(tab_id)?;
        let removed = self.tabs.remove(index);
        if self.active_id.as_deref() == Some(tab_id) {
            self.active_id = if self.tabs.is_empty() {
                None
            } else {
                let next = index.min(self.tabs.len() - 1);
                Some(self.tabs[next].id.clone())
            };
        }
        Some(removed)
    }
}

/// Modal interaction surface layered over the workbench. The command palette
/// and the close-terminal confirmation intercept keys ahead of global
/// shortcuts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkbenchOverlay {
    None,
    CommandPalette { selected: usize, query: String },
    ConfirmCloseTerminal { tab_id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn label(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSource {
    Layout,
    Sync,
    Terminal,
    Palette,
}

impl LogSource {
    pub fn label(self) -> &'static str {
        match self {
            Self::Layout => "layout",
            Self::Sync => "sync",
            Self::Terminal => "terminal",
            Self::Palette => "palette",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub seq: u64,
    pub level: LogLevel,
    pub ts_ms: Option<i64>,
    pub source: LogSource,
    pub message: String,
}

impl LogEntry {
    pub fn new(level: LogLevel, source: LogSource, message: impl Into<String>) -> Self {
        Self {
            seq: 0,
            level,
            ts_ms: Some(Utc::now().timestamp_millis()),
            source,
            message: message.into(),
        }
    }
}

/// Bounded ring of structured log entries with monotonic sequence numbers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogBuffer {
    cap: usize,
    next_seq: u64,
    buf: VecDeque<LogEntry>,
}

impl LogBuffer {
    pub fn new(cap: usize) -> Self {
        Self {
            cap,
            next_seq: 1,
            buf: VecDeque::with_capacity(cap),
        }
    }

    pub fn append(&mut self, mut entry: LogEntry) {
        entry.seq = self.next_seq;
        self.next_seq += 1;

        if self.buf.len() == self.cap {
            self.buf.pop_front();
        }
        self.buf.push_back(entry);
    }

    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.buf.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new(2_000)
    }
}

/// Snapshot of the application facts command availability predicates read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvailabilityContext {
    pub document_open: bool,
    pub container_running: bool,
    pub terminal_count: usize,
    pub has_active_terminal: bool,
}

#[derive(Debug, Clone)]
pub struct WorkbenchState {
    pub session: SessionId,
    pub layout: LayoutState,
    pub terminals: TerminalTabs,
    pub overlay: WorkbenchOverlay,
    pub default_model: Option<Arc<str>>,
    pub document_open: bool,
    pub container_running: bool,
    pub logs: LogBuffer,
}

impl WorkbenchState {
    pub fn new(session: SessionId) -> Self {
        Self {
            session,
            layout: LayoutState::default(),
            terminals: TerminalTabs::default(),
            overlay: WorkbenchOverlay::None,
            default_model: None,
            document_open: false,
            container_running: false,
            logs: LogBuffer::default(),
        }
    }

    pub fn availability(&self) -> AvailabilityContext {
        AvailabilityContext {
            document_open: self.document_open,
            container_running: self.container_running,
            terminal_count: self.terminals.len(),
            has_active_terminal: self.terminals.active_id.is_some(),
        }
    }

    pub fn log(&mut self, level: LogLevel, source: LogSource, message: impl Into<String>) {
        self.logs.append(LogEntry::new(level, source, message));
    }
}
