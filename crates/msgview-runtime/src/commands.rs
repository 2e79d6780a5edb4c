#![forbid(unsafe_code)]

//! Keyboard-command registry with scoped registration.
//!
//! Widgets register named commands (for example `MessageList.next`) with one
//! or more key bindings. The host resolves incoming keys against the registry
//! and routes the resulting command name back to the owner.
//!
//! The registry is an explicit instance passed to whoever needs it; there is
//! no process-wide table. Each registration returns a [`CommandGuard`] and the
//! command stays registered exactly as long as its guard is alive, so a
//! widget that drops its guards on detach can never receive keys afterwards.
//!
//! # Resolution
//!
//! - Release events never resolve.
//! - When a text field holds focus, only commands registered with
//!   [`CommandSpec::allow_in_text_input`] resolve.
//! - If two commands share a key, the most recent registration wins.
//!
//! ```
//! use msgview_core::event::{KeyCode, KeyEvent};
//! use msgview_runtime::{CommandRegistry, CommandSpec, KeyBinding};
//!
//! let registry = CommandRegistry::new();
//! let guard = registry
//!     .register(CommandSpec::new("list.next").bind(KeyBinding::new(KeyCode::Down)))
//!     .unwrap();
//!
//! let key = KeyEvent::new(KeyCode::Down);
//! assert_eq!(registry.resolve(&key, false).as_deref(), Some("list.next"));
//!
//! drop(guard);
//! assert_eq!(registry.resolve(&key, false), None);
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use msgview_core::event::{KeyCode, KeyEvent, Modifiers};

/// A key plus the modifiers that must accompany it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyBinding {
    /// Key code to match.
    pub code: KeyCode,
    /// Required modifiers.
    pub modifiers: Modifiers,
}

impl KeyBinding {
    /// Binding for a bare key.
    #[must_use]
    pub const fn new(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: Modifiers::NONE,
        }
    }

    /// Binding for a character key.
    #[must_use]
    pub const fn char(c: char) -> Self {
        Self::new(KeyCode::Char(c))
    }

    /// Require modifiers.
    #[must_use]
    pub const fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Whether `event` triggers this binding.
    ///
    /// Shift is ignored for character keys since terminals already fold it
    /// into the character (`G` arrives as `Char('G')`, sometimes with SHIFT).
    #[must_use]
    pub fn matches(&self, event: &KeyEvent) -> bool {
        if !event.is_actionable() || event.code != self.code {
            return false;
        }
        match self.code {
            KeyCode::Char(_) => {
                event.modifiers.difference(Modifiers::SHIFT)
                    == self.modifiers.difference(Modifiers::SHIFT)
            }
            _ => event.modifiers == self.modifiers,
        }
    }
}

/// Declaration of a named command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    name: String,
    bindings: Vec<KeyBinding>,
    allow_in_text_input: bool,
}

impl CommandSpec {
    /// Start a command declaration with no bindings.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bindings: Vec::new(),
            allow_in_text_input: false,
        }
    }

    /// Add a key binding.
    #[must_use]
    pub fn bind(mut self, binding: KeyBinding) -> Self {
        self.bindings.push(binding);
        self
    }

    /// Add several key bindings.
    #[must_use]
    pub fn bindings(mut self, bindings: impl IntoIterator<Item = KeyBinding>) -> Self {
        self.bindings.extend(bindings);
        self
    }

    /// Let the command fire while a text field has focus.
    #[must_use]
    pub fn allow_in_text_input(mut self, allow: bool) -> Self {
        self.allow_in_text_input = allow;
        self
    }

    /// Command name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Key bindings.
    #[must_use]
    pub fn key_bindings(&self) -> &[KeyBinding] {
        &self.bindings
    }

    /// Whether the command fires while a text field has focus.
    #[must_use]
    pub fn allows_text_input(&self) -> bool {
        self.allow_in_text_input
    }
}

/// Registration failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// A live registration already uses this name.
    Duplicate {
        /// The conflicting command name.
        name: String,
    },
    /// The command declares no key bindings.
    NoBindings {
        /// The offending command name.
        name: String,
    },
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Duplicate { name } => write!(f, "command `{name}` is already registered"),
            Self::NoBindings { name } => write!(f, "command `{name}` has no key bindings"),
        }
    }
}

impl std::error::Error for CommandError {}

#[derive(Debug)]
struct Entry {
    id: u64,
    spec: CommandSpec,
}

#[derive(Debug, Default)]
struct RegistryInner {
    entries: Vec<Entry>,
    next_id: u64,
}

/// Shared, single-threaded command registry.
///
/// Cloning yields another handle to the same registry.
#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
    inner: Rc<RefCell<RegistryInner>>,
}

impl CommandRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command. It stays registered until the guard is dropped.
    ///
    /// # Errors
    ///
    /// [`CommandError::NoBindings`] if `spec` has no key bindings, or
    /// [`CommandError::Duplicate`] if a live registration already uses its
    /// name.
    pub fn register(&self, spec: CommandSpec) -> Result<CommandGuard, CommandError> {
        if spec.bindings.is_empty() {
            return Err(CommandError::NoBindings { name: spec.name });
        }

        let mut inner = self.inner.borrow_mut();
        if inner.entries.iter().any(|e| e.spec.name == spec.name) {
            return Err(CommandError::Duplicate { name: spec.name });
        }

        inner.next_id += 1;
        let id = inner.next_id;
        let name = spec.name.clone();
        tracing::trace!(command = %name, bindings = spec.bindings.len(), "command registered");
        inner.entries.push(Entry { id, spec });

        Ok(CommandGuard {
            id,
            name,
            registry: Rc::downgrade(&self.inner),
        })
    }

    /// Resolve a key to a command name.
    #[must_use]
    pub fn resolve(&self, key: &KeyEvent, text_input_focused: bool) -> Option<String> {
        let inner = self.inner.borrow();
        inner
            .entries
            .iter()
            .rev()
            .filter(|e| !text_input_focused || e.spec.allow_in_text_input)
            .find(|e| e.spec.bindings.iter().any(|b| b.matches(key)))
            .map(|e| e.spec.name.clone())
    }

    /// Whether a live registration uses `name`.
    #[must_use]
    pub fn is_registered(&self, name: &str) -> bool {
        self.inner
            .borrow()
            .entries
            .iter()
            .any(|e| e.spec.name == name)
    }

    /// Names of live registrations, oldest first.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.inner
            .borrow()
            .entries
            .iter()
            .map(|e| e.spec.name.clone())
            .collect()
    }

    /// Number of live registrations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Keeps one command registered. Dropping it unregisters the command.
#[must_use = "the command is unregistered as soon as the guard is dropped"]
#[derive(Debug)]
pub struct CommandGuard {
    id: u64,
    name: String,
    registry: Weak<RefCell<RegistryInner>>,
}

impl CommandGuard {
    /// Name of the guarded command.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Unregister now. Equivalent to dropping the guard.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for CommandGuard {
    fn drop(&mut self) {
        // The registry may already be gone; nothing to clean up then.
        if let Some(inner) = self.registry.upgrade() {
            inner.borrow_mut().entries.retain(|e| e.id != self.id);
            tracing::trace!(command = %self.name, "command unregistered");
        }
    }
}
