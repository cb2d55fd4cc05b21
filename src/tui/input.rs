//! Key routing for the dashboard runtime.

#![allow(missing_docs)]

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::dashboard::ControllerAction;
use crate::topics::TopicId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    Quit,
    Controller(ControllerAction),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HelpBinding {
    pub keys: &'static str,
    pub description: &'static str,
}

/// Hints shown in the footer.
pub const FOOTER_BINDINGS: &[HelpBinding] = &[
    HelpBinding {
        keys: "Tab/S-Tab",
        description: "topic",
    },
    HelpBinding {
        keys: "s/S",
        description: "sort column",
    },
    HelpBinding {
        keys: "r",
        description: "reverse",
    },
    HelpBinding {
        keys: "q",
        description: "quit",
    },
];

/// Resolve a key event. Key releases and unbound keys map to `None`.
#[must_use]
pub fn map_key(key: KeyEvent) -> Option<InputAction> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return matches!(key.code, KeyCode::Char('c')).then_some(InputAction::Quit);
    }
    let action = match key.code {
        KeyCode::Char('q') | KeyCode::Esc => return Some(InputAction::Quit),
        KeyCode::Tab => ControllerAction::NextTopic,
        KeyCode::BackTab => ControllerAction::PrevTopic,
        KeyCode::Char('s') => ControllerAction::NextSortColumn,
        KeyCode::Char('S') => ControllerAction::PrevSortColumn,
        KeyCode::Char('r') => ControllerAction::ReverseSort,
        KeyCode::Char(c) => ControllerAction::Select(TopicId::from_hotkey(c)?),
        _ => return None,
    };
    Some(InputAction::Controller(action))
}
