use crate::actions::UserAction;
use crate::command_registry::CommandId;
use crate::state::Panel;
use crate::state::WorkbenchOverlay;
use crate::state::WorkbenchState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Up,
    Down,
    Enter,
    Esc,
    Backspace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyInput {
    pub key: Key,
    pub ctrl: bool,
}

impl KeyInput {
    pub fn plain(key: Key) -> Self {
        Self { key, ctrl: false }
    }

    pub fn ctrl(ch: char) -> Self {
        Self {
            key: Key::Char(ch),
            ctrl: true,
        }
    }
}

/// The single key-routing entry point for a mounted workbench. Priority
/// chain: an open overlay intercepts first (the palette eats plain input, the
/// close confirmation is fully modal), then the ctrl-modified global
/// shortcuts apply. Whoever mounts the workbench installs exactly one
/// subscriber that feeds this function and removes it on unmount.
pub fn route_key(state: &WorkbenchState, input: KeyInput) -> Option<UserAction> {
    match &state.overlay {
        WorkbenchOverlay::CommandPalette { .. } => route_palette_key(input),
        WorkbenchOverlay::ConfirmCloseTerminal { .. } => route_confirm_key(input),
        WorkbenchOverlay::None => route_global_key(input),
    }
}

fn route_palette_key(input: KeyInput) -> Option<UserAction> {
    if input.ctrl {
        return None;
    }
    match input.key {
        Key::Esc => Some(UserAction::CloseOverlay),
        Key::Enter => Some(UserAction::PaletteSubmit),
        Key::Up => Some(UserAction::PaletteMoveUp),
        Key::Down => Some(UserAction::PaletteMoveDown),
        Key::Backspace => Some(UserAction::PaletteQueryBackspace),
        Key::Char(ch) => Some(UserAction::PaletteQueryInput(ch)),
    }
}

fn route_confirm_key(input: KeyInput) -> Option<UserAction> {
    if input.ctrl {
        return None;
    }
    match input.key {
        Key::Enter => Some(UserAction::ConfirmCloseTerminal),
        Key::Esc => Some(UserAction::CancelCloseTerminal),
        _ => None,
    }
}

fn route_global_key(input: KeyInput) -> Option<UserAction> {
    if !input.ctrl {
        return None;
    }
    match input.key {
        Key::Char('k') => Some(UserAction::OpenCommandPalette),
        Key::Char('b') => Some(UserAction::TogglePanel(Panel::Left)),
        Key::Char('r') => Some(UserAction::TogglePanel(Panel::Right)),
        Key::Char('j') => Some(UserAction::TogglePanel(Panel::Terminal)),
        Key::Char('t') => Some(UserAction::CreateTerminal),
        Key::Char('s') => Some(UserAction::InvokeCommand(CommandId::SaveFile)),
        Key::Char('=') => Some(UserAction::IncreaseFontSize),
        Key::Char('-') => Some(UserAction::DecreaseFontSize),
        _ => None,
    }
}
