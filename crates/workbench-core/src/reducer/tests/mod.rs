pub(super) use super::reduce;
pub(super) use super::HostEvent;
pub(super) use super::WorkbenchEffect;
pub(super) use crate::actions::RuntimeAction;
pub(super) use crate::actions::UserAction;
pub(super) use crate::actions::WorkbenchAction;
pub(super) use crate::command_registry::ranked_commands;
pub(super) use crate::command_registry::CommandId;
pub(super) use crate::state::ConnectionState;
pub(super) use crate::state::Panel;
pub(super) use crate::state::SessionId;
pub(super) use crate::state::Theme;
pub(super) use crate::state::WorkbenchOverlay;
pub(super) use crate::state::WorkbenchState;
pub(super) use crate::state::LEFT_WIDTH_MAX;
pub(super) use crate::state::LEFT_WIDTH_MIN;
pub(super) use crate::sync::PreferenceRecord;

mod invariants;

fn state() -> WorkbenchState {
    WorkbenchState::new(SessionId("session-a".to_string()))
}

fn user(state: &mut WorkbenchState, action: UserAction) -> Vec<WorkbenchEffect> {
    reduce(state, WorkbenchAction::User(action))
}

fn runtime(state: &mut WorkbenchState, action: RuntimeAction) -> Vec<WorkbenchEffect> {
    reduce(state, WorkbenchAction::Runtime(action))
}

/// Creates a terminal and returns (tab_id, instance_id).
fn create_terminal(state: &mut WorkbenchState) -> (String, String) {
    user(state, UserAction::CreateTerminal);
    let tab = state.terminals.tabs.last().expect("tab created");
    (tab.id.clone(), tab.instance_id.clone())
}

fn host_events(effects: &[WorkbenchEffect]) -> Vec<HostEvent> {
    effects
        .iter()
        .filter_map(|effect| match effect {
            WorkbenchEffect::EmitHostEvent(event) => Some(*event),
            _ => None,
        })
        .collect()
}

fn queued_patches(effects: &[WorkbenchEffect]) -> Vec<crate::sync::PreferencePatch> {
    effects
        .iter()
        .filter_map(|effect| match effect {
            WorkbenchEffect::QueuePreferencePatch(patch) => Some(patch.clone()),
            _ => None,
        })
        .collect()
}
