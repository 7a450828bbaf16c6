use std::collections::HashMap;
use std::path::Path;

use workbench_core::actions::RuntimeAction;
use workbench_core::actions::WorkbenchAction;
use workbench_core::config::Config;
use workbench_core::keymap::route_key;
use workbench_core::keymap::KeyInput;
use workbench_core::persistence::WorkbenchStateStore;
use workbench_core::reducer::reduce;
use workbench_core::reducer::HostEvent;
use workbench_core::reducer::WorkbenchEffect;
use workbench_core::state::LogLevel;
use workbench_core::state::LogSource;
use workbench_core::state::SessionId;
use workbench_core::state::WorkbenchState;
use workbench_core::sync::PreferenceSynchronizer;

use crate::contracts::TransportError;
use crate::contracts::TransportKey;
use crate::store::PreferenceStore;
use crate::transport::TerminalConn;
use crate::transport::TerminalEndpoint;

/// Host-side callables for commands the workbench cannot perform itself.
/// Unset hooks degrade to no-ops.
#[derive(Default)]
pub struct HostHooks {
    pub on_save_file: Option<Box<dyn FnMut()>>,
    pub on_focus_editor: Option<Box<dyn FnMut()>>,
    pub on_start_container: Option<Box<dyn FnMut()>>,
    pub on_stop_container: Option<Box<dyn FnMut()>>,
}

impl HostHooks {
    fn dispatch(&mut self, event: HostEvent) {
        let hook = match event {
            HostEvent::SaveActiveFile => self.on_save_file.as_mut(),
            HostEvent::FocusEditor => self.on_focus_editor.as_mut(),
            HostEvent::StartContainer => self.on_start_container.as_mut(),
            HostEvent::StopContainer => self.on_stop_container.as_mut(),
        };
        if let Some(hook) = hook {
            hook();
        }
    }
}

/// Owns the workbench state and wires reducer effects to the preference
/// store, the terminal endpoint, local persistence, and host hooks.
///
/// Single-threaded and clock-driven: the embedder passes `now_ms` into
/// `dispatch`/`tick`, and `tick` is where connects resolve and debounced
/// preference flushes go out.
pub struct WorkbenchDriver {
    state: WorkbenchState,
    sync: PreferenceSynchronizer,
    store: Box<dyn PreferenceStore>,
    endpoint: Box<dyn TerminalEndpoint>,
    conns: HashMap<String, Box<dyn TerminalConn>>,
    pending_connects: Vec<String>,
    local: WorkbenchStateStore,
    hooks: HostHooks,
    frame_requested: bool,
    initial_fetch_applied: bool,
    refetch_queued: bool,
}

impl WorkbenchDriver {
    pub fn new(
        session: SessionId,
        config: &Config,
        store: Box<dyn PreferenceStore>,
        endpoint: Box<dyn TerminalEndpoint>,
        data_dir: impl AsRef<Path>,
    ) -> std::io::Result<Self> {
        Ok(Self {
            state: WorkbenchState::new(session),
            sync: PreferenceSynchronizer::new(config.sync.quantum_ms),
            store,
            endpoint,
            conns: HashMap::new(),
            pending_connects: Vec::new(),
            local: WorkbenchStateStore::open(data_dir)?,
            hooks: HostHooks::default(),
            frame_requested: false,
            initial_fetch_applied: false,
            refetch_queued: false,
        })
    }

    pub fn set_hooks(&mut self, hooks: HostHooks) {
        self.hooks = hooks;
    }

    pub fn state(&self) -> &WorkbenchState {
        &self.state
    }

    pub fn sync(&self) -> &PreferenceSynchronizer {
        &self.sync
    }

    /// Returns and clears the pending redraw flag.
    pub fn take_frame_request(&mut self) -> bool {
        std::mem::take(&mut self.frame_requested)
    }

    /// Restores local blobs, schedules reconnects for restored tabs, then
    /// issues the one authoritative preference fetch. No outbound write can
    /// happen before that fetch resolves.
    pub fn bootstrap(&mut self, now_ms: u64) {
        self.state.layout = self.local.load_layout();
        self.state.terminals = self.local.load_tabs(&self.state.session);
        for tab in &self.state.terminals.tabs {
            self.pending_connects.push(tab.instance_id.clone());
        }
        self.frame_requested = true;
        self.attempt_fetch(now_ms);
    }

    pub fn dispatch(&mut self, action: WorkbenchAction, now_ms: u64) {
        let effects = reduce(&mut self.state, action);
        self.apply_effects(effects, now_ms);
    }

    pub fn handle_key(&mut self, input: KeyInput, now_ms: u64) {
        if let Some(action) = route_key(&self.state, input) {
            self.dispatch(WorkbenchAction::User(action), now_ms);
        }
    }

    /// Advances the clock-driven machinery: resolves pending terminal
    /// connects, retries a queued preference resync, and pushes out a
    /// debounce-expired flush.
    pub fn tick(&mut self, now_ms: u64) {
        self.resolve_connects(now_ms);

        if self.sync.needs_fetch() && self.refetch_queued {
            self.refetch_queued = false;
            self.attempt_fetch(now_ms);
        }

        if let Some(patch) = self.sync.poll(now_ms) {
            match self.store.merge_patch(&patch) {
                Ok(record) => self.sync.flush_resolved(record, now_ms),
                Err(err) => {
                    self.sync.flush_failed(patch);
                    self.refetch_queued = true;
                    self.dispatch(
                        WorkbenchAction::Runtime(RuntimeAction::PreferenceFlushFailed {
                            reason: err.to_string(),
                        }),
                        now_ms,
                    );
                }
            }
        }
    }

    /// Sends a line to the active terminal's transport.
    pub fn send_to_active(&mut self, line: &str, now_ms: u64) -> Result<(), TransportError> {
        let Some(instance_id) = self
            .state
            .terminals
            .active_tab()
            .map(|tab| tab.instance_id.clone())
        else {
            return Err(TransportError::Closed);
        };
        let Some(conn) = self.conns.get_mut(&instance_id) else {
            return Err(TransportError::Closed);
        };
        match conn.send_line(line) {
            Ok(()) => Ok(()),
            Err(err) => {
                self.drop_conn(&instance_id, now_ms);
                Err(err)
            }
        }
    }

    /// Drains one pending output line from the active terminal.
    pub fn poll_active_output(&mut self, now_ms: u64) -> Option<String> {
        let instance_id = self
            .state
            .terminals
            .active_tab()
            .map(|tab| tab.instance_id.clone())?;
        let conn = self.conns.get_mut(&instance_id)?;
        match conn.poll_output() {
            Ok(line) => line,
            Err(_) => {
                self.drop_conn(&instance_id, now_ms);
                None
            }
        }
    }

    fn apply_effects(&mut self, effects: Vec<WorkbenchEffect>, now_ms: u64) {
        for effect in effects {
            match effect {
                WorkbenchEffect::RequestFrame => self.frame_requested = true,
                WorkbenchEffect::PersistLayout => {
                    if let Err(err) = self.local.save_layout(&self.state.layout) {
                        self.state.log(
                            LogLevel::Warn,
                            LogSource::Layout,
                            format!("layout persist failed: {err}"),
                        );
                    }
                }
                WorkbenchEffect::PersistTerminalTabs => {
                    if let Err(err) = self
                        .local
                        .save_tabs(&self.state.session, &self.state.terminals)
                    {
                        self.state.log(
                            LogLevel::Warn,
                            LogSource::Terminal,
                            format!("tab persist failed: {err}"),
                        );
                    }
                }
                WorkbenchEffect::QueuePreferencePatch(patch) => {
                    // A mutation while write-gated also queues the fetch
                    // retry; the patch itself waits out the gate.
                    if self.sync.needs_fetch() {
                        self.refetch_queued = true;
                    }
                    self.sync.note_patch(&patch, now_ms);
                }
                WorkbenchEffect::OpenTerminalTransport { instance_id } => {
                    self.pending_connects.push(instance_id);
                }
                WorkbenchEffect::AbortTerminalConnect { instance_id } => {
                    self.pending_connects.retain(|id| *id != instance_id);
                }
                WorkbenchEffect::CloseTerminalTransport { instance_id } => {
                    if let Some(mut conn) = self.conns.remove(&instance_id) {
                        conn.close();
                    }
                }
                WorkbenchEffect::EmitHostEvent(event) => self.hooks.dispatch(event),
            }
        }
    }

    fn attempt_fetch(&mut self, now_ms: u64) {
        match self.store.fetch() {
            Ok(record) => {
                self.sync.fetch_resolved(record.clone(), now_ms);
                // Only the mount-time fetch rewrites local state. A resync
                // after a failed flush would clobber optimistic values the
                // retry is about to carry back up.
                if !self.initial_fetch_applied {
                    self.initial_fetch_applied = true;
                    self.dispatch(
                        WorkbenchAction::Runtime(RuntimeAction::PreferencesFetched(record)),
                        now_ms,
                    );
                }
            }
            Err(err) => {
                self.sync.fetch_failed();
                self.dispatch(
                    WorkbenchAction::Runtime(RuntimeAction::PreferenceFetchFailed {
                        reason: err.to_string(),
                    }),
                    now_ms,
                );
            }
        }
    }

    fn resolve_connects(&mut self, now_ms: u64) {
        let pending = std::mem::take(&mut self.pending_connects);
        for instance_id in pending {
            // Tabs closed since the request was queued are skipped.
            if self
                .state
                .terminals
                .tabs
                .iter()
                .all(|tab| tab.instance_id != instance_id)
            {
                continue;
            }
            let key = TransportKey {
                session_id: self.state.session.as_str().to_string(),
                instance_id: instance_id.clone(),
            };
            match self.endpoint.connect(&key) {
                Ok(conn) => {
                    self.conns.insert(instance_id.clone(), conn);
                    self.dispatch(
                        WorkbenchAction::Runtime(RuntimeAction::TerminalConnected { instance_id }),
                        now_ms,
                    );
                }
                Err(err) => {
                    self.state.log(
                        LogLevel::Warn,
                        LogSource::Terminal,
                        format!("connect failed for {key}: {err}"),
                    );
                    self.dispatch(
                        WorkbenchAction::Runtime(RuntimeAction::TerminalDisconnected {
                            instance_id,
                        }),
                        now_ms,
                    );
                }
            }
        }
    }

    fn drop_conn(&mut self, instance_id: &str, now_ms: u64) {
        if let Some(mut conn) = self.conns.remove(instance_id) {
            conn.close();
        }
        self.dispatch(
            WorkbenchAction::Runtime(RuntimeAction::TerminalDisconnected {
                instance_id: instance_id.to_string(),
            }),
            now_ms,
        );
    }
}
