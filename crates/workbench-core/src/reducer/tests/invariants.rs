//! Structural checks run over longer action sequences. The per-feature suites
//! pin exact outcomes; these pin the properties that must hold after any
//! interleaving of tab operations.

use std::collections::HashSet;

use pretty_assertions::assert_eq;

use super::*;

fn assert_tab_invariants(state: &WorkbenchState) {
    let ids: HashSet<_> = state.terminals.tabs.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids.len(), state.terminals.len(), "duplicate tab ids");

    let instances: HashSet<_> = state
        .terminals
        .tabs
        .iter()
        .map(|t| t.instance_id.as_str())
        .collect();
    assert_eq!(instances.len(), state.terminals.len(), "duplicate instances");

    match state.terminals.active_id.as_deref() {
        Some(active) => assert!(ids.contains(active), "active id not in the list"),
        None => assert!(state.terminals.is_empty(), "non-empty list without active"),
    }
}

#[test]
fn tab_invariants_hold_across_a_churny_session() {
    let mut state = state();
    let mut closed: Vec<String> = Vec::new();

    let (a, _) = create_terminal(&mut state);
    let (b, _) = create_terminal(&mut state);
    assert_tab_invariants(&state);

    user(&mut state, UserAction::SwitchTerminal { tab_id: a.clone() });
    assert_tab_invariants(&state);

    // Inactive close.
    user(&mut state, UserAction::CloseTerminal { tab_id: b.clone() });
    closed.push(b);
    assert_tab_invariants(&state);

    let (c, _) = create_terminal(&mut state);
    create_terminal(&mut state);
    assert_tab_invariants(&state);

    // Active close through the confirmation gate.
    user(&mut state, UserAction::SwitchTerminal { tab_id: c.clone() });
    user(&mut state, UserAction::CloseTerminal { tab_id: c.clone() });
    user(&mut state, UserAction::ConfirmCloseTerminal);
    closed.push(c);
    assert_tab_invariants(&state);

    // Drain to empty.
    while let Some(tab) = state.terminals.active_tab() {
        let tab_id = tab.id.clone();
        user(
            &mut state,
            UserAction::CloseTerminal {
                tab_id: tab_id.clone(),
            },
        );
        user(&mut state, UserAction::ConfirmCloseTerminal);
        closed.push(tab_id);
        assert_tab_invariants(&state);
    }
    assert!(state.terminals.is_empty());
    assert_eq!(state.terminals.active_id, None);

    // Closed tabs are gone for good; identities are never recycled.
    create_terminal(&mut state);
    for tab_id in &closed {
        assert!(state.terminals.get(tab_id).is_none());
    }
    assert_tab_invariants(&state);
}

#[test]
fn operations_on_departed_tabs_are_inert() {
    let mut state = state();
    let (only, instance) = create_terminal(&mut state);
    user(&mut state, UserAction::CloseTerminal { tab_id: only.clone() });

    for action in [
        UserAction::CloseTerminal {
            tab_id: only.clone(),
        },
        UserAction::SwitchTerminal {
            tab_id: only.clone(),
        },
        UserAction::ConfirmCloseTerminal,
        UserAction::CancelCloseTerminal,
    ] {
        let effects = user(&mut state, action);
        assert!(effects.is_empty());
    }
    let effects = runtime(
        &mut state,
        RuntimeAction::TerminalDisconnected {
            instance_id: instance,
        },
    );
    assert!(effects.is_empty());

    assert!(state.terminals.is_empty());
    assert_eq!(state.overlay, WorkbenchOverlay::None);
}

#[test]
fn confirmation_overlay_survives_only_its_own_resolution() {
    let mut state = state();
    create_terminal(&mut state);
    let (active, _) = create_terminal(&mut state);

    user(
        &mut state,
        UserAction::CloseTerminal {
            tab_id: active.clone(),
        },
    );
    assert!(matches!(
        state.overlay,
        WorkbenchOverlay::ConfirmCloseTerminal { .. }
    ));

    // Layout work does not dismiss the pending question.
    user(
        &mut state,
        UserAction::ResizePanel {
            panel: Panel::Left,
            size: 300,
        },
    );
    assert!(matches!(
        state.overlay,
        WorkbenchOverlay::ConfirmCloseTerminal { .. }
    ));

    user(&mut state, UserAction::ConfirmCloseTerminal);
    assert_eq!(state.overlay, WorkbenchOverlay::None);
    assert!(state.terminals.get(&active).is_none());
    assert_tab_invariants(&state);
}
