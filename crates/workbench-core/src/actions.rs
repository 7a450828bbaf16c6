use crate::command_registry::CommandId;
use crate::state::Panel;
use crate::state::Theme;
use crate::sync::PreferenceRecord;

#[derive(Debug, Clone)]
pub enum WorkbenchAction {
    User(UserAction),
    Runtime(RuntimeAction),
}

/// Actions originating from direct user interaction: resize handles, panel
/// toggles, palette keys, terminal tab controls.
#[derive(Debug, Clone)]
pub enum UserAction {
    TogglePanel(Panel),
    ResizePanel { panel: Panel, size: u16 },
    SetTheme(Theme),
    CycleTheme,
    SetFontSize(u16),
    IncreaseFontSize,
    DecreaseFontSize,
    SetDefaultModel(String),

    OpenCommandPalette,
    CloseOverlay,
    PaletteQueryInput(char),
    PaletteQueryBackspace,
    PaletteMoveUp,
    PaletteMoveDown,
    PaletteSubmit,
    InvokeCommand(CommandId),

    CreateTerminal,
    CloseTerminal { tab_id: String },
    ConfirmCloseTerminal,
    CancelCloseTerminal,
    SwitchTerminal { tab_id: String },
}

/// Actions fed back by the surrounding runtime: transport callbacks, the
/// preference fetch, collaborator status changes.
#[derive(Debug, Clone)]
pub enum RuntimeAction {
    TerminalConnected { instance_id: String },
    TerminalDisconnected { instance_id: String },
    PreferencesFetched(PreferenceRecord),
    PreferenceFetchFailed { reason: String },
    PreferenceFlushFailed { reason: String },
    SetDocumentOpen(bool),
    SetContainerRunning(bool),
}
