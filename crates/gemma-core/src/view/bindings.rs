//! Declarative event bindings
//!
//! The console's interactive elements are wired through one table mounted once,
//! so dispatch can be exercised without a live surface.

use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UiEvent {
    Click,
    Change,
    Input,
    Submit,
}

impl fmt::Display for UiEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Click => write!(f, "click"),
            Self::Change => write!(f, "change"),
            Self::Input => write!(f, "input"),
            Self::Submit => write!(f, "submit"),
        }
    }
}

/// What the console does in response to a bound event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// A filter control changed; refresh the count after the quiet period
    FiltersChanged,
    ToggleEmotion,
    ToggleOrder,
    CycleSort,
    Browse,
    NextPage,
    SetPrompt,
    SetMaxStatements,
    RunStreaming,
    Stop,
    QuickAnalyze,
    LoadArtifacts,
    LoadMoreArtifacts,
    PreviewArtifact,
    SendChat,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub selector: &'static str,
    pub event: UiEvent,
    pub action: Action,
}

const fn bind(selector: &'static str, event: UiEvent, action: Action) -> Binding {
    Binding {
        selector,
        event,
        action,
    }
}

/// Bindings of the transcript analyzer panel
#[derive(Debug, Clone)]
pub struct BindingTable {
    rows: Vec<Binding>,
    mounted: bool,
}

impl Default for BindingTable {
    fn default() -> Self {
        Self::analyzer()
    }
}

impl BindingTable {
    pub fn new(rows: Vec<Binding>) -> Self {
        Self {
            rows,
            mounted: false,
        }
    }

    pub fn analyzer() -> Self {
        use Action::*;
        use UiEvent::*;

        Self::new(vec![
            bind("#gemma-date-start", Change, FiltersChanged),
            bind("#gemma-date-end", Change, FiltersChanged),
            bind("#gemma-all-time", Change, FiltersChanged),
            bind("#gemma-speakers", Input, FiltersChanged),
            bind("#gemma-keywords", Input, FiltersChanged),
            bind("#gemma-match-mode", Change, FiltersChanged),
            bind("#gemma-context", Change, FiltersChanged),
            bind("#gemma-page-size", Change, FiltersChanged),
            bind("#gemma-emotion", Change, ToggleEmotion),
            bind("#gemma-order", Click, ToggleOrder),
            bind("#gemma-sort", Click, CycleSort),
            bind("#gemma-browse", Click, Browse),
            bind("#gemma-next-page", Click, NextPage),
            bind("#gemma-prompt", Input, SetPrompt),
            bind("#gemma-max-statements", Change, SetMaxStatements),
            bind("#gemma-run", Click, RunStreaming),
            bind("#gemma-stop", Click, Stop),
            bind("#gemma-quick", Click, QuickAnalyze),
            bind("#gemma-archive-refresh", Click, LoadArtifacts),
            bind("#gemma-archive-more", Click, LoadMoreArtifacts),
            bind("#gemma-archive-item", Click, PreviewArtifact),
            bind("#gemma-chat-form", Submit, SendChat),
            bind("#gemma-chat-send", Click, SendChat),
        ])
    }

    /// Activate the table. Only the first call has an effect.
    pub fn mount(&mut self) -> bool {
        if self.mounted {
            return false;
        }
        self.mounted = true;
        debug!(bindings = self.rows.len(), "Event bindings mounted");
        true
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Action bound to `event` on `selector`; nothing resolves before mount
    pub fn resolve(&self, selector: &str, event: UiEvent) -> Option<Action> {
        if !self.mounted {
            return None;
        }
        self.rows
            .iter()
            .find(|b| b.selector == selector && b.event == event)
            .map(|b| b.action)
    }

    pub fn rows(&self) -> &[Binding] {
        &self.rows
    }
}
