#![forbid(unsafe_code)]

//! Keyboard navigation over the window.
//!
//! [`KeyboardNavigator`] maps [`NavCommand`]s onto [`WindowController`]
//! operations and owns the key bindings used to register those commands.
//! Movement wraps around the full item list, growing the window whenever
//! focus lands past the materialized prefix.

use msgview_core::event::KeyCode;
use msgview_runtime::{CommandSpec, KeyBinding};

use super::window::{FocusChange, WindowController};

/// A navigation command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavCommand {
    Next,
    Previous,
    JumpToFirst,
    JumpToLast,
    Activate,
}

impl NavCommand {
    pub const ALL: [NavCommand; 5] = [
        NavCommand::Next,
        NavCommand::Previous,
        NavCommand::JumpToFirst,
        NavCommand::JumpToLast,
        NavCommand::Activate,
    ];

    /// Short name, used after the component prefix when registering.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Next => "next",
            Self::Previous => "previous",
            Self::JumpToFirst => "jump_to_first",
            Self::JumpToLast => "jump_to_last",
            Self::Activate => "activate",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|cmd| cmd.name() == name)
    }

    /// Built-in key bindings.
    #[must_use]
    pub fn default_bindings(self) -> Vec<KeyBinding> {
        match self {
            Self::Next => vec![KeyBinding::new(KeyCode::Down), KeyBinding::char('j')],
            Self::Previous => vec![KeyBinding::new(KeyCode::Up), KeyBinding::char('k')],
            Self::JumpToFirst => vec![KeyBinding::new(KeyCode::Home), KeyBinding::char('g')],
            Self::JumpToLast => vec![KeyBinding::new(KeyCode::End), KeyBinding::char('G')],
            Self::Activate => vec![KeyBinding::new(KeyCode::Enter)],
        }
    }
}

/// Who, if anyone, currently captures keyboard input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Capture {
    #[default]
    None,
    /// A modal dialog is open.
    Modal,
    /// A nested thread view is open.
    NestedView,
}

impl Capture {
    #[must_use]
    pub fn is_captured(self) -> bool {
        self != Capture::None
    }
}

/// Modality query, polled before every command.
pub trait InputCapture {
    fn capture(&self) -> Capture;
}

impl<F> InputCapture for F
where
    F: Fn() -> Capture,
{
    fn capture(&self) -> Capture {
        self()
    }
}

/// Query for hosts with no modal surfaces.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCapture;

impl InputCapture for NoCapture {
    fn capture(&self) -> Capture {
        Capture::None
    }
}

/// Result of applying a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavOutcome {
    /// Focus moved.
    Moved {
        change: FocusChange,
        /// The window grew to materialize the new focus.
        grew: bool,
    },
    /// `activate` on the focused item.
    Activated(usize),
    /// Input is captured elsewhere; nothing happened.
    Suppressed(Capture),
    /// Valid command with no effect (empty list, no focus, already there).
    Unchanged,
}

#[derive(Debug, Clone)]
struct Binding {
    command: NavCommand,
    keys: Vec<KeyBinding>,
    allow_in_text_input: bool,
}

/// Applies navigation commands to a window.
#[derive(Debug, Clone)]
pub struct KeyboardNavigator {
    bindings: Vec<Binding>,
}

impl Default for KeyboardNavigator {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyboardNavigator {
    /// Navigator with the default keymap. No command fires while a text
    /// field has focus.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bindings: NavCommand::ALL
                .into_iter()
                .map(|command| Binding {
                    command,
                    keys: command.default_bindings(),
                    allow_in_text_input: false,
                })
                .collect(),
        }
    }

    /// Replace the keys bound to `command`.
    #[must_use]
    pub fn with_keys(mut self, command: NavCommand, keys: Vec<KeyBinding>) -> Self {
        if let Some(binding) = self.binding_mut(command) {
            binding.keys = keys;
        }
        self
    }

    /// Let `command` fire while a text field has focus.
    #[must_use]
    pub fn allow_in_text_input(mut self, command: NavCommand, allow: bool) -> Self {
        if let Some(binding) = self.binding_mut(command) {
            binding.allow_in_text_input = allow;
        }
        self
    }

    fn binding_mut(&mut self, command: NavCommand) -> Option<&mut Binding> {
        self.bindings.iter_mut().find(|b| b.command == command)
    }

    /// Fully qualified command name, e.g. `MessageList.next`.
    #[must_use]
    pub fn qualified_name(component: &str, command: NavCommand) -> String {
        format!("{component}.{}", command.name())
    }

    /// Inverse of [`KeyboardNavigator::qualified_name`].
    #[must_use]
    pub fn parse_name(component: &str, name: &str) -> Option<NavCommand> {
        let short = name.strip_prefix(component)?.strip_prefix('.')?;
        NavCommand::from_name(short)
    }

    /// Registration specs for every command with at least one key.
    #[must_use]
    pub fn command_specs(&self, component: &str) -> Vec<CommandSpec> {
        self.bindings
            .iter()
            .filter(|b| !b.keys.is_empty())
            .map(|b| {
                CommandSpec::new(Self::qualified_name(component, b.command))
                    .bindings(b.keys.iter().copied())
                    .allow_in_text_input(b.allow_in_text_input)
            })
            .collect()
    }

    /// Apply `command` unless input is captured.
    pub fn apply(
        &self,
        command: NavCommand,
        window: &mut WindowController,
        capture: &dyn InputCapture,
    ) -> NavOutcome {
        let captured = capture.capture();
        if captured.is_captured() {
            tracing::trace!(command = command.name(), capture = ?captured, "navigation suppressed");
            return NavOutcome::Suppressed(captured);
        }
        if window.is_empty() {
            return NavOutcome::Unchanged;
        }

        let len = window.len();
        let last = len - 1;
        let target = match command {
            NavCommand::Next => match window.focused() {
                None => 0,
                Some(i) if i >= last => 0,
                Some(i) => i + 1,
            },
            NavCommand::Previous => match window.focused() {
                None | Some(0) => last,
                Some(i) => i - 1,
            },
            NavCommand::JumpToFirst => 0,
            NavCommand::JumpToLast => {
                let grew = window.expand_all();
                return match window.focus(last) {
                    Some(change) => NavOutcome::Moved { change, grew },
                    None => NavOutcome::Unchanged,
                };
            }
            NavCommand::Activate => {
                return match window.focused() {
                    Some(i) => NavOutcome::Activated(i),
                    None => NavOutcome::Unchanged,
                };
            }
        };

        let before = window.displayed_count();
        match window.focus(target) {
            Some(change) => NavOutcome::Moved {
                change,
                grew: window.displayed_count() > before,
            },
            None => NavOutcome::Unchanged,
        }
    }
}
