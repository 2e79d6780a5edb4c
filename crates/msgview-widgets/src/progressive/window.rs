#![forbid(unsafe_code)]

//! Window controller: how much of the item list is materialized, and which
//! item has focus.
//!
//! The window is a prefix `items[0..displayed_count]` that only ever grows
//! while the item list stays the same. Every operation clamps its input, so
//! no call can leave the controller in an invalid state:
//!
//! - `displayed_count <= len`
//! - `focused` is `None` or `< len`
//! - a focused index is always materialized

use std::ops::Range;

use super::config::ListConfig;

/// Snapshot of window state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowState {
    /// Length of the materialized prefix.
    pub displayed_count: usize,
    /// Focused item, if any.
    pub focused: Option<usize>,
}

/// A change of focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusChange {
    /// Previous focus.
    pub from: Option<usize>,
    /// New focus.
    pub to: Option<usize>,
}

/// What an item-list replacement did to the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Replacement {
    /// The length changed by more than the reset threshold; the window was
    /// re-initialized and focus cleared.
    Reset,
    /// Small change; window and focus kept (clamped to the new length).
    Preserved,
}

/// State machine over `{displayed_count, focused}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowController {
    len: usize,
    displayed: usize,
    focused: Option<usize>,
    initial_load: usize,
    load_increment: usize,
    reset_threshold: usize,
}

impl WindowController {
    /// Create a controller over `len` items.
    ///
    /// Zero load sizes are treated as 1.
    #[must_use]
    pub fn new(len: usize, initial_load: usize, load_increment: usize, reset_threshold: usize) -> Self {
        let mut window = Self {
            len,
            displayed: 0,
            focused: None,
            initial_load: initial_load.max(1),
            load_increment: load_increment.max(1),
            reset_threshold,
        };
        window.initialize();
        window
    }

    /// Create a controller using the sizes from `config`.
    #[must_use]
    pub fn from_config(len: usize, config: &ListConfig) -> Self {
        Self::new(
            len,
            config.initial_load(),
            config.load_increment(),
            config.reset_threshold(),
        )
    }

    /// `displayed = min(initial_load, len)`, focus cleared.
    pub fn initialize(&mut self) {
        self.displayed = self.initial_load.min(self.len);
        self.focused = None;
    }

    /// Total number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the item list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Length of the materialized prefix.
    #[must_use]
    pub fn displayed_count(&self) -> usize {
        self.displayed
    }

    /// Focused index.
    #[must_use]
    pub fn focused(&self) -> Option<usize> {
        self.focused
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> WindowState {
        WindowState {
            displayed_count: self.displayed,
            focused: self.focused,
        }
    }

    /// Index range of materialized items.
    #[must_use]
    pub fn materialized(&self) -> Range<usize> {
        0..self.displayed
    }

    /// Whether every item is materialized.
    #[must_use]
    pub fn is_fully_expanded(&self) -> bool {
        self.displayed == self.len
    }

    /// Whether `index` is materialized.
    #[must_use]
    pub fn is_materialized(&self, index: usize) -> bool {
        index < self.displayed
    }

    /// Items added per growth step.
    #[must_use]
    pub fn load_increment(&self) -> usize {
        self.load_increment
    }

    /// Grow by one increment. Returns `false` once fully expanded.
    pub fn grow(&mut self) -> bool {
        let next = self.displayed.saturating_add(self.load_increment).min(self.len);
        self.set_displayed(next)
    }

    /// Make sure `index` is materialized, growing to
    /// `min(index + load_increment, len)` if it is not.
    ///
    /// `index` is clamped to the last item. Never shrinks the window.
    pub fn grow_to(&mut self, index: usize) -> bool {
        if self.len == 0 {
            return false;
        }
        let index = index.min(self.len - 1);
        if self.is_materialized(index) {
            return false;
        }
        let next = index.saturating_add(self.load_increment).min(self.len);
        self.set_displayed(next)
    }

    /// Materialize every item.
    pub fn expand_all(&mut self) -> bool {
        self.set_displayed(self.len)
    }

    fn set_displayed(&mut self, next: usize) -> bool {
        if next > self.displayed {
            self.displayed = next;
            true
        } else {
            false
        }
    }

    /// Focus `index`, growing the window first if needed.
    ///
    /// `index` is clamped to the last item. Returns the change, or `None` if
    /// focus did not move (including on an empty list).
    pub fn focus(&mut self, index: usize) -> Option<FocusChange> {
        if self.len == 0 {
            return None;
        }
        let index = index.min(self.len - 1);
        self.grow_to(index);
        self.set_focus(Some(index))
    }

    /// Clear focus.
    pub fn clear_focus(&mut self) -> Option<FocusChange> {
        self.set_focus(None)
    }

    fn set_focus(&mut self, to: Option<usize>) -> Option<FocusChange> {
        let from = self.focused;
        if from == to {
            return None;
        }
        self.focused = to;
        Some(FocusChange { from, to })
    }

    /// Apply a wholesale replacement of the item list.
    ///
    /// A length change larger than the reset threshold re-initializes the
    /// window. Anything smaller keeps window and focus, clamped to `new_len`.
    pub fn replace_len(&mut self, new_len: usize) -> Replacement {
        let delta = self.len.abs_diff(new_len);
        self.len = new_len;
        if delta > self.reset_threshold {
            self.initialize();
            return Replacement::Reset;
        }
        self.displayed = self.displayed.min(new_len);
        self.focused = match self.focused {
            Some(_) if new_len == 0 => None,
            Some(f) => Some(f.min(new_len - 1)),
            None => None,
        };
        if let Some(f) = self.focused {
            self.grow_to(f);
        }
        Replacement::Preserved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(len: usize) -> WindowController {
        WindowController::new(len, 50, 50, 10)
    }

    #[test]
    fn initialize_clamps_to_len() {
        assert_eq!(window(500).displayed_count(), 50);
        assert_eq!(window(3).displayed_count(), 3);
        assert_eq!(window(0).displayed_count(), 0);
        assert_eq!(window(500).focused(), None);
    }

    #[test]
    fn grow_converges_then_stops() {
        let mut w = window(120);
        assert!(w.grow());
        assert_eq!(w.displayed_count(), 100);
        assert!(w.grow());
        assert_eq!(w.displayed_count(), 120);
        assert!(w.is_fully_expanded());
        assert!(!w.grow());
        assert_eq!(w.displayed_count(), 120);
    }

    #[test]
    fn grow_on_short_list_is_noop() {
        let mut w = window(3);
        assert!(w.is_fully_expanded());
        assert!(!w.grow());
        assert_eq!(w.displayed_count(), 3);
    }

    #[test]
    fn grow_to_materializes_target_plus_increment() {
        let mut w = window(500);
        assert!(w.grow_to(50));
        assert_eq!(w.displayed_count(), 100);
        // Already materialized: no change.
        assert!(!w.grow_to(10));
        assert_eq!(w.displayed_count(), 100);
        // Near the end clamps to len.
        assert!(w.grow_to(480));
        assert_eq!(w.displayed_count(), 500);
    }

    #[test]
    fn grow_to_clamps_out_of_range_index() {
        let mut w = window(200);
        assert!(w.grow_to(10_000));
        assert_eq!(w.displayed_count(), 200);
    }

    #[test]
    fn focus_grows_window_and_reports_change() {
        let mut w = window(500);
        let change = w.focus(75).expect("focus moved");
        assert_eq!(change, FocusChange { from: None, to: Some(75) });
        assert_eq!(w.displayed_count(), 125);
        assert!(w.focus(75).is_none());
    }

    #[test]
    fn focus_on_empty_list_is_noop() {
        let mut w = window(0);
        assert!(w.focus(0).is_none());
        assert_eq!(w.focused(), None);
    }

    #[test]
    fn small_replacement_preserves_window() {
        let mut w = window(500);
        w.focus(120);
        let before = w.state();
        assert_eq!(w.replace_len(505), Replacement::Preserved);
        assert_eq!(w.state(), before);
        assert_eq!(w.replace_len(495), Replacement::Preserved);
        assert_eq!(w.state(), before);
    }

    #[test]
    fn threshold_is_exclusive() {
        let mut w = window(100);
        w.focus(5);
        assert_eq!(w.replace_len(110), Replacement::Preserved);
        assert_eq!(w.focused(), Some(5));
        assert_eq!(w.replace_len(121), Replacement::Reset);
        assert_eq!(w.focused(), None);
        assert_eq!(w.displayed_count(), 50);
    }

    #[test]
    fn preserved_replacement_clamps_to_new_len() {
        let mut w = window(8);
        w.focus(7);
        assert_eq!(w.replace_len(4), Replacement::Preserved);
        assert_eq!(w.displayed_count(), 4);
        assert_eq!(w.focused(), Some(3));
    }

    #[test]
    fn shrinking_to_empty_clears_focus() {
        let mut w = window(5);
        w.focus(2);
        assert_eq!(w.replace_len(0), Replacement::Preserved);
        assert_eq!(w.state(), WindowState::default());
    }

    #[test]
    fn zero_sizes_are_floored() {
        let mut w = WindowController::new(10, 0, 0, 10);
        assert_eq!(w.displayed_count(), 1);
        assert!(w.grow());
        assert_eq!(w.displayed_count(), 2);
    }

    #[test]
    fn from_config_uses_config_sizes() {
        let config = ListConfig::new(20, 5).unwrap().with_reset_threshold(2);
        let mut w = WindowController::from_config(100, &config);
        assert_eq!(w.displayed_count(), 20);
        w.grow();
        assert_eq!(w.displayed_count(), 25);
        assert_eq!(w.replace_len(103), Replacement::Reset);
    }
}
