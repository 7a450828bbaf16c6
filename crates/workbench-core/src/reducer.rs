use crate::actions::RuntimeAction;
use crate::actions::UserAction;
use crate::actions::WorkbenchAction;
use crate::command_registry::clamp_selection;
use crate::command_registry::ranked_commands;
use crate::command_registry::CommandId;
use crate::command_registry::CommandRegistry;
use crate::state::clamp_font_size;
use crate::state::generate_tab_identity;
use crate::state::ConnectionState;
use crate::state::LogLevel;
use crate::state::LogSource;
use crate::state::Panel;
use crate::state::TerminalTab;
use crate::state::Theme;
use crate::state::WorkbenchOverlay;
use crate::state::WorkbenchState;
use crate::sync::PreferencePatch;
use crate::sync::PreferenceRecord;

/// Requests handed to external collaborators through injected zero-arg
/// callables; the core knows their names, never their implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
    SaveActiveFile,
    FocusEditor,
    StartContainer,
    StopContainer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkbenchEffect {
    RequestFrame,
    /// Re-serialize the layout blob to local persistence, synchronously.
    PersistLayout,
    /// Re-serialize this session's terminal tab list to local persistence.
    PersistTerminalTabs,
    /// Hand a partial preference write to the debounced synchronizer.
    QueuePreferencePatch(PreferencePatch),
    OpenTerminalTransport { instance_id: String },
    /// The tab closed while its connect was still pending; the attempt must
    /// be aborted so no continuation fires for a departed tab.
    AbortTerminalConnect { instance_id: String },
    CloseTerminalTransport { instance_id: String },
    EmitHostEvent(HostEvent),
}

pub fn reduce(state: &mut WorkbenchState, action: WorkbenchAction) -> Vec<WorkbenchEffect> {
    match action {
        WorkbenchAction::User(user) => reduce_user(state, user),
        WorkbenchAction::Runtime(runtime) => reduce_runtime(state, runtime),
    }
}

fn reduce_user(state: &mut WorkbenchState, action: UserAction) -> Vec<WorkbenchEffect> {
    match action {
        UserAction::TogglePanel(panel) => {
            state.layout.toggle_panel(panel);
            vec![WorkbenchEffect::PersistLayout, WorkbenchEffect::RequestFrame]
        }
        UserAction::ResizePanel { panel, size } => {
            state.layout.set_panel_size(panel, size);
            vec![
                WorkbenchEffect::PersistLayout,
                WorkbenchEffect::QueuePreferencePatch(panel_size_patch(
                    panel,
                    state.layout.panel_size(panel),
                )),
                WorkbenchEffect::RequestFrame,
            ]
        }
        UserAction::SetTheme(theme) => set_theme(state, theme),
        UserAction::CycleTheme => {
            let next = state.layout.theme.next();
            set_theme(state, next)
        }
        UserAction::SetFontSize(size) => set_font_size(state, size),
        UserAction::IncreaseFontSize => set_font_size(state, state.layout.font_size + 1),
        UserAction::DecreaseFontSize => {
            set_font_size(state, state.layout.font_size.saturating_sub(1))
        }
        UserAction::SetDefaultModel(model) => {
            state.default_model = Some(model.clone().into());
            vec![
                WorkbenchEffect::QueuePreferencePatch(PreferencePatch {
                    default_model: Some(model),
                    ..PreferencePatch::default()
                }),
                WorkbenchEffect::RequestFrame,
            ]
        }

        UserAction::OpenCommandPalette => {
            state.overlay = WorkbenchOverlay::CommandPalette {
                selected: 0,
                query: String::new(),
            };
            vec![WorkbenchEffect::RequestFrame]
        }
        UserAction::CloseOverlay => {
            state.overlay = WorkbenchOverlay::None;
            vec![WorkbenchEffect::RequestFrame]
        }
        UserAction::PaletteQueryInput(ch) => {
            let cx = state.availability();
            if let WorkbenchOverlay::CommandPalette { selected, query } = &mut state.overlay {
                query.push(ch);
                *selected = clamp_selection(*selected, ranked_commands(query, &cx).len());
                return vec![WorkbenchEffect::RequestFrame];
            }
            Vec::new()
        }
        UserAction::PaletteQueryBackspace => {
            let cx = state.availability();
            if let WorkbenchOverlay::CommandPalette { selected, query } = &mut state.overlay {
                query.pop();
                *selected = clamp_selection(*selected, ranked_commands(query, &cx).len());
                return vec![WorkbenchEffect::RequestFrame];
            }
            Vec::new()
        }
        UserAction::PaletteMoveUp => {
            if let WorkbenchOverlay::CommandPalette { selected, .. } = &mut state.overlay {
                // Clamped at the top, no wraparound.
                *selected = selected.saturating_sub(1);
                return vec![WorkbenchEffect::RequestFrame];
            }
            Vec::new()
        }
        UserAction::PaletteMoveDown => {
            let cx = state.availability();
            if let WorkbenchOverlay::CommandPalette { selected, query } = &mut state.overlay {
                let count = ranked_commands(query, &cx).len();
                *selected = clamp_selection(*selected + 1, count);
                return vec![WorkbenchEffect::RequestFrame];
            }
            Vec::new()
        }
        UserAction::PaletteSubmit => {
            let (selected, query) = match &state.overlay {
                WorkbenchOverlay::CommandPalette { selected, query } => {
                    (*selected, query.clone())
                }
                _ => return Vec::new(),
            };
            let results = ranked_commands(&query, &state.availability());
            // The result set may have shrunk since the selection last moved;
            // Enter acts on the clamped row, not a stale index.
            let selected = clamp_selection(selected, results.len());
            let Some(id) = results.get(selected).copied() else {
                return Vec::new();
            };
            state.overlay = WorkbenchOverlay::None;
            let mut effects = invoke_command(state, id);
            effects.push(WorkbenchEffect::RequestFrame);
            effects
        }
        UserAction::InvokeCommand(id) => {
            let mut effects = invoke_command(state, id);
            effects.push(WorkbenchEffect::RequestFrame);
            effects
        }

        UserAction::CreateTerminal => {
            let identity = generate_tab_identity();
            // Name derives from the current open count, not a monotonic
            // counter; names can repeat after close/recreate cycles.
            let name = format!("Terminal {}", state.terminals.len() + 1);
            state.log(
                LogLevel::Info,
                LogSource::Terminal,
                format!("opening {name} ({})", identity.instance_id),
            );
            let instance_id = identity.instance_id.clone();
            state.terminals.push_active(TerminalTab {
                id: identity.tab_id,
                name,
                instance_id: identity.instance_id,
                connection: ConnectionState::Connecting,
            });
            vec![
                WorkbenchEffect::OpenTerminalTransport { instance_id },
                WorkbenchEffect::PersistTerminalTabs,
                WorkbenchEffect::RequestFrame,
            ]
        }
        UserAction::CloseTerminal { tab_id } => {
            if state.terminals.get(&tab_id).is_none() {
                return Vec::new();
            }
            let is_active = state.terminals.active_id.as_deref() == Some(tab_id.as_str());
            if is_active && state.terminals.len() > 1 {
                // Closing terminates a live backend process; gate it behind
                // explicit confirmation.
                state.overlay = WorkbenchOverlay::ConfirmCloseTerminal { tab_id };
                return vec![WorkbenchEffect::RequestFrame];
            }
            remove_terminal(state, &tab_id)
        }
        UserAction::ConfirmCloseTerminal => {
            let tab_id = match &state.overlay {
                WorkbenchOverlay::ConfirmCloseTerminal { tab_id } => tab_id.clone(),
                _ => return Vec::new(),
            };
            state.overlay = WorkbenchOverlay::None;
            remove_terminal(state, &tab_id)
        }
        UserAction::CancelCloseTerminal => {
            if let WorkbenchOverlay::ConfirmCloseTerminal { .. } = state.overlay {
                state.overlay = WorkbenchOverlay::None;
                return vec![WorkbenchEffect::RequestFrame];
            }
            Vec::new()
        }
        UserAction::SwitchTerminal { tab_id } => {
            if state.terminals.get(&tab_id).is_none() {
                return Vec::new();
            }
            // Purely a visibility change; background tabs stay connected.
            state.terminals.active_id = Some(tab_id);
            vec![
                WorkbenchEffect::PersistTerminalTabs,
                WorkbenchEffect::RequestFrame,
            ]
        }
    }
}

fn reduce_runtime(state: &mut WorkbenchState, action: RuntimeAction) -> Vec<WorkbenchEffect> {
    match action {
        RuntimeAction::TerminalConnected { instance_id } => {
            // Connect results for tabs closed mid-handshake are dropped.
            match state.terminals.get_by_instance_mut(&instance_id) {
                Some(tab) => {
                    tab.connection = ConnectionState::Connected;
                    vec![WorkbenchEffect::RequestFrame]
                }
                None => Vec::new(),
            }
        }
        RuntimeAction::TerminalDisconnected { instance_id } => {
            match state.terminals.get_by_instance_mut(&instance_id) {
                Some(tab) => {
                    let name = tab.name.clone();
                    tab.connection = ConnectionState::Disconnected;
                    state.log(
                        LogLevel::Warn,
                        LogSource::Terminal,
                        format!("{name} lost its transport ({instance_id})"),
                    );
                    vec![WorkbenchEffect::RequestFrame]
                }
                None => Vec::new(),
            }
        }
        RuntimeAction::PreferencesFetched(record) => {
            apply_preference_record(state, &record);
            vec![WorkbenchEffect::PersistLayout, WorkbenchEffect::RequestFrame]
        }
        RuntimeAction::PreferenceFetchFailed { reason } => {
            state.log(
                LogLevel::Warn,
                LogSource::Sync,
                format!("preference fetch failed: {reason}"),
            );
            Vec::new()
        }
        RuntimeAction::PreferenceFlushFailed { reason } => {
            // Local optimistic state stays as-is; the driver re-fetches and
            // the next mutation retries the write.
            state.log(
                LogLevel::Warn,
                LogSource::Sync,
                format!("preference flush failed: {reason}"),
            );
            Vec::new()
        }
        RuntimeAction::SetDocumentOpen(open) => {
            state.document_open = open;
            reclamp_palette_selection(state);
            vec![WorkbenchEffect::RequestFrame]
        }
        RuntimeAction::SetContainerRunning(running) => {
            state.container_running = running;
            reclamp_palette_selection(state);
            vec![WorkbenchEffect::RequestFrame]
        }
    }
}

/// Maps a dispatched command onto the state mutations and host events it
/// stands for. Availability is re-checked here so a stale palette entry (or a
/// shortcut fired at the wrong moment) degrades to a logged no-op.
fn invoke_command(state: &mut WorkbenchState, id: CommandId) -> Vec<WorkbenchEffect> {
    if !CommandRegistry::is_available(id, &state.availability()) {
        state.log(
            LogLevel::Debug,
            LogSource::Palette,
            format!("command {} not available", id.as_str()),
        );
        return Vec::new();
    }

    match id {
        CommandId::ToggleExplorer => reduce_user(state, UserAction::TogglePanel(Panel::Left)),
        CommandId::ToggleAssistant => reduce_user(state, UserAction::TogglePanel(Panel::Right)),
        CommandId::ToggleTerminalPanel => {
            reduce_user(state, UserAction::TogglePanel(Panel::Terminal))
        }
        CommandId::ThemeDark => set_theme(state, Theme::Dark),
        CommandId::ThemeLight => set_theme(state, Theme::Light),
        CommandId::IncreaseFontSize => reduce_user(state, UserAction::IncreaseFontSize),
        CommandId::DecreaseFontSize => reduce_user(state, UserAction::DecreaseFontSize),
        CommandId::NewTerminal => reduce_user(state, UserAction::CreateTerminal),
        CommandId::CloseActiveTerminal => match state.terminals.active_id.clone() {
            Some(tab_id) => reduce_user(state, UserAction::CloseTerminal { tab_id }),
            None => Vec::new(),
        },
        CommandId::SaveFile => vec![WorkbenchEffect::EmitHostEvent(HostEvent::SaveActiveFile)],
        CommandId::FocusEditor => vec![WorkbenchEffect::EmitHostEvent(HostEvent::FocusEditor)],
        CommandId::StartContainer => {
            vec![WorkbenchEffect::EmitHostEvent(HostEvent::StartContainer)]
        }
        CommandId::StopContainer => {
            vec![WorkbenchEffect::EmitHostEvent(HostEvent::StopContainer)]
        }
    }
}

fn set_theme(state: &mut WorkbenchState, theme: Theme) -> Vec<WorkbenchEffect> {
    state.layout.theme = theme;
    vec![
        WorkbenchEffect::PersistLayout,
        WorkbenchEffect::QueuePreferencePatch(PreferencePatch {
            theme: Some(theme.label().to_string()),
            ..PreferencePatch::default()
        }),
        WorkbenchEffect::RequestFrame,
    ]
}

fn set_font_size(state: &mut WorkbenchState, size: u16) -> Vec<WorkbenchEffect> {
    state.layout.font_size = clamp_font_size(size);
    vec![
        WorkbenchEffect::PersistLayout,
        WorkbenchEffect::QueuePreferencePatch(PreferencePatch {
            font_size: Some(state.layout.font_size),
            ..PreferencePatch::default()
        }),
        WorkbenchEffect::RequestFrame,
    ]
}

/// Availability changes can shrink the filtered result set while the palette
/// is open; the selection must follow it back into bounds.
fn reclamp_palette_selection(state: &mut WorkbenchState) {
    let cx = state.availability();
    if let WorkbenchOverlay::CommandPalette { selected, query } = &mut state.overlay {
        *selected = clamp_selection(*selected, ranked_commands(query, &cx).len());
    }
}

fn panel_size_patch(panel: Panel, size: u16) -> PreferencePatch {
    let mut patch = PreferencePatch::default();
    match panel {
        Panel::Left => patch.left_panel_width = Some(size),
        Panel::Right => patch.right_panel_width = Some(size),
        Panel::Terminal => patch.terminal_panel_height = Some(size),
    }
    patch
}

fn remove_terminal(state: &mut WorkbenchState, tab_id: &str) -> Vec<WorkbenchEffect> {
    let Some(removed) = state.terminals.remove(tab_id) else {
        return Vec::new();
    };
    state.log(
        LogLevel::Info,
        LogSource::Terminal,
        format!("closed {} ({})", removed.name, removed.instance_id),
    );
    let transport = if removed.connection == ConnectionState::Connecting {
        WorkbenchEffect::AbortTerminalConnect {
            instance_id: removed.instance_id,
        }
    } else {
        WorkbenchEffect::CloseTerminalTransport {
            instance_id: removed.instance_id,
        }
    };
    vec![
        transport,
        WorkbenchEffect::PersistTerminalTabs,
        WorkbenchEffect::RequestFrame,
    ]
}

/// Folds the authoritative remote record into local state. Numeric fields go
/// through the same clamps as user input; an unknown theme label falls back
/// to the current one.
pub fn apply_preference_record(state: &mut WorkbenchState, record: &PreferenceRecord) {
    state.layout.set_panel_size(Panel::Left, record.left_panel_width);
    state.layout.set_panel_size(Panel::Right, record.right_panel_width);
    state
        .layout
        .set_panel_size(Panel::Terminal, record.terminal_panel_height);
    state.layout.font_size = clamp_font_size(record.font_size);
    if let Some(theme) = Theme::parse(&record.theme) {
        state.layout.theme = theme;
    }
    if let Some(model) = record.default_model.as_ref() {
        state.default_model = Some(model.clone().into());
    }
}

#[cfg(test)]
mod tests;
