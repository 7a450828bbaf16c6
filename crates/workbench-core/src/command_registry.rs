use crate::state::AvailabilityContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandId {
    ToggleExplorer,
    ToggleAssistant,
    ToggleTerminalPanel,
    ThemeDark,
    ThemeLight,
    IncreaseFontSize,
    DecreaseFontSize,
    NewTerminal,
    CloseActiveTerminal,
    SaveFile,
    FocusEditor,
    StartContainer,
    StopContainer,
}

impl CommandId {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ToggleExplorer => "toggle_explorer",
            Self::ToggleAssistant => "toggle_assistant",
            Self::ToggleTerminalPanel => "toggle_terminal_panel",
            Self::ThemeDark => "theme_dark",
            Self::ThemeLight => "theme_light",
            Self::IncreaseFontSize => "increase_font_size",
            Self::DecreaseFontSize => "decrease_font_size",
            Self::NewTerminal => "new_terminal",
            Self::CloseActiveTerminal => "close_active_terminal",
            Self::SaveFile => "save_file",
            Self::FocusEditor => "focus_editor",
            Self::StartContainer => "start_container",
            Self::StopContainer => "stop_container",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CommandSpec {
    pub id: CommandId,
    pub label: &'static str,
    pub description: &'static str,
    pub keywords: &'static [&'static str],
    pub is_available: fn(&AvailabilityContext) -> bool,
}

fn always(_cx: &AvailabilityContext) -> bool {
    true
}

fn document_open(cx: &AvailabilityContext) -> bool {
    cx.document_open
}

fn has_active_terminal(cx: &AvailabilityContext) -> bool {
    cx.has_active_terminal
}

fn container_stopped(cx: &AvailabilityContext) -> bool {
    !cx.container_running
}

fn container_running(cx: &AvailabilityContext) -> bool {
    cx.container_running
}

// Declaration order is the tie-break order for ranked results and the display
// order for an empty query.
const COMMAND_SPECS: [CommandSpec; 13] = [
    CommandSpec {
        id: CommandId::ToggleExplorer,
        label: "Toggle Explorer",
        description: "Show or hide the file explorer panel",
        keywords: &["sidebar", "files", "left"],
        is_available: always,
    },
    CommandSpec {
        id: CommandId::ToggleAssistant,
        label: "Toggle Assistant Panel",
        description: "Show or hide the AI assistant panel",
        keywords: &["ai", "chat", "right"],
        is_available: always,
    },
    CommandSpec {
        id: CommandId::ToggleTerminalPanel,
        label: "Toggle Terminal",
        description: "Show or hide the terminal panel",
        keywords: &["console", "shell", "bottom"],
        is_available: always,
    },
    CommandSpec {
        id: CommandId::ThemeDark,
        label: "Theme: Dark",
        description: "Switch to the dark color theme",
        keywords: &["appearance", "color"],
        is_available: always,
    },
    CommandSpec {
        id: CommandId::ThemeLight,
        label: "Theme: Light",
        description: "Switch to the light color theme",
        keywords: &["appearance", "color"],
        is_available: always,
    },
    CommandSpec {
        id: CommandId::IncreaseFontSize,
        label: "Increase Font Size",
        description: "Make the editor text larger",
        keywords: &["zoom", "text"],
        is_available: always,
    },
    CommandSpec {
        id: CommandId::DecreaseFontSize,
        label: "Decrease Font Size",
        description: "Make the editor text smaller",
        keywords: &["zoom", "text"],
        is_available: always,
    },
    CommandSpec {
        id: CommandId::NewTerminal,
        label: "New Terminal",
        description: "Open a new terminal session",
        keywords: &["shell", "create"],
        is_available: always,
    },
    CommandSpec {
        id: CommandId::CloseActiveTerminal,
        label: "Close Terminal",
        description: "Close the active terminal session",
        keywords: &["kill", "shell"],
        is_available: has_active_terminal,
    },
    CommandSpec {
        id: CommandId::SaveFile,
        label: "Save File",
        description: "Save the active document",
        keywords: &["write", "persist"],
        is_available: document_open,
    },
    CommandSpec {
        id: CommandId::FocusEditor,
        label: "Focus Editor",
        description: "Move keyboard focus to the editor",
        keywords: &["editor"],
        is_available: document_open,
    },
    CommandSpec {
        id: CommandId::StartContainer,
        label: "Start Container",
        description: "Start the execution container",
        keywords: &["run", "sandbox"],
        is_available: container_stopped,
    },
    CommandSpec {
        id: CommandId::StopContainer,
        label: "Stop Container",
        description: "Stop the execution container",
        keywords: &["halt", "sandbox"],
        is_available: container_running,
    },
];

pub struct CommandRegistry;

impl CommandRegistry {
    pub fn list() -> &'static [CommandSpec] {
        &COMMAND_SPECS
    }

    pub fn get(id: CommandId) -> &'static CommandSpec {
        COMMAND_SPECS
            .iter()
            .find(|spec| spec.id == id)
            .unwrap_or(&COMMAND_SPECS[0])
    }

    pub fn is_available(id: CommandId, cx: &AvailabilityContext) -> bool {
        (Self::get(id).is_available)(cx)
    }
}

#[derive(Debug, Clone, Copy)]
struct SubsequenceStats {
    consecutive: usize,
    start_boundary: bool,
}

/// Ordered-subsequence match of `query` against `candidate`, both already
/// lowercased. `None` means no match.
fn subsequence_stats(query: &str, candidate: &str) -> Option<SubsequenceStats> {
    let mut query_iter = query.chars().peekable();
    let mut prev_match: Option<usize> = None;
    let mut consecutive = 0usize;
    let mut start_boundary = false;
    let mut prev_char: Option<char> = None;

    for (idx, ch) in candidate.chars().enumerate() {
        let Some(&want) = query_iter.peek() else {
            break;
        };

        if ch == want {
            query_iter.next();

            if prev_match.is_none() {
                start_boundary = prev_char.map_or(true, char::is_whitespace);
            }
            if let Some(prev) = prev_match {
                if idx == prev + 1 {
                    consecutive += 1;
                }
            }
            prev_match = Some(idx);
        }

        prev_char = Some(ch);
    }

    if query_iter.peek().is_some() {
        return None;
    }

    Some(SubsequenceStats {
        consecutive,
        start_boundary,
    })
}

/// Score weighting, strongest first: longer consecutive runs, then a
/// word-boundary start, then shorter candidates. Candidate length stays below
/// the boundary weight so it only breaks ties.
fn score_text(query: &str, candidate: &str) -> Option<i64> {
    let stats = subsequence_stats(query, candidate)?;
    let mut score = (stats.consecutive as i64) * 1_000;
    if stats.start_boundary {
        score += 100;
    }
    score -= candidate.chars().count() as i64;
    Some(score)
}

/// Best per-field score across label, description and keywords.
pub fn command_score(query: &str, spec: &CommandSpec) -> Option<i64> {
    let label = score_text(query, &spec.label.to_lowercase());
    let description = score_text(query, &spec.description.to_lowercase());
    let keyword = spec
        .keywords
        .iter()
        .filter_map(|kw| score_text(query, &kw.to_lowercase()))
        .max();

    [label, description, keyword].into_iter().flatten().max()
}

/// Resolves a free-text query against the currently available command set.
/// Empty query returns every available command in declaration order.
pub fn ranked_commands(query: &str, cx: &AvailabilityContext) -> Vec<CommandId> {
    let query = query.trim().to_lowercase();
    let available = COMMAND_SPECS
        .iter()
        .filter(|spec| (spec.is_available)(cx));

    if query.is_empty() {
        return available.map(|spec| spec.id).collect();
    }

    let mut scored: Vec<(i64, CommandId)> = available
        .filter_map(|spec| command_score(&query, spec).map(|score| (score, spec.id)))
        .collect();
    // Stable sort keeps declaration order for equal scores.
    scored.sort_by(|(a, _), (b, _)| b.cmp(a));
    scored.into_iter().map(|(_, id)| id).collect()
}

/// Keeps the palette selection inside the filtered result set. An empty set
/// has no meaningful selection; zero is returned as a neutral resting index.
pub fn clamp_selection(selected: usize, result_count: usize) -> usize {
    if result_count == 0 {
        0
    } else {
        selected.min(result_count - 1)
    }
}
