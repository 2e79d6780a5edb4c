#![forbid(unsafe_code)]

//! Progressive, focus-aware list.
//!
//! [`ProgressiveList`] materializes a prefix of a potentially long item list
//! and grows it on demand, either when the end of the prefix comes into view
//! (reported by the host's [`VisibilityObserver`]) or when keyboard focus
//! moves past it.
//!
//! # Lifecycle
//!
//! ```text
//! new ──attach──▶ attached ──detach / drop handle / drop list──▶ detached
//! ```
//!
//! While attached the list owns three host resources: its keyboard commands in
//! the [`CommandRegistry`], a visibility observation, and at most one pending
//! render in its [`FrameScheduler`]. Detaching releases all three.
//!
//! # Rendering
//!
//! State changes apply immediately. Rendering is deferred: every change asks
//! the frame scheduler for a render, requests within one frame coalesce, and
//! the host drives [`ProgressiveList::on_frame`] (or sends [`Event::Tick`])
//! at each rendering opportunity.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use msgview_runtime::CommandRegistry;
//! use msgview_widgets::progressive::{
//!     GeometryObserver, ListConfig, ListItem, NavCommand, ProgressiveList,
//! };
//!
//! struct Hit(u32);
//!
//! impl ListItem for Hit {
//!     type Id = u32;
//!     fn id(&self) -> u32 {
//!         self.0
//!     }
//! }
//!
//! let items: Arc<[Hit]> = (0..500).map(Hit).collect();
//! let mut list = ProgressiveList::new(items, ListConfig::default());
//! let registry = CommandRegistry::new();
//! let handle = list.attach(&registry, Box::new(GeometryObserver::new())).unwrap();
//!
//! for _ in 0..60 {
//!     list.execute(NavCommand::Next);
//! }
//! list.on_frame();
//! assert_eq!(list.displayed_count(), 100);
//! assert_eq!(list.focused_index(), Some(59));
//!
//! list.detach(handle);
//! assert!(registry.is_empty());
//! ```

mod config;
mod navigator;
mod sentinel;
mod viewport;
mod window;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use msgview_core::event::{Event, KeyEvent, MouseButton, MouseEvent, MouseEventKind};
use msgview_core::geometry::Rect;
use msgview_runtime::{
    CommandError, CommandGuard, CommandRegistry, FrameScheduler, RenderProbe, RenderSampleSink,
    SchedulerStats,
};

pub use config::{
    ConfigError, DEFAULT_COMPONENT_NAME, DEFAULT_INITIAL_LOAD, DEFAULT_LOAD_INCREMENT,
    DEFAULT_RESET_THRESHOLD, DEFAULT_SENTINEL_MARGIN, INITIAL_LOAD_ENV, LOAD_INCREMENT_ENV,
    ListConfig, RENDER_METRICS_ENV, RESET_THRESHOLD_ENV, SENTINEL_MARGIN_ENV,
};
pub use navigator::{Capture, InputCapture, KeyboardNavigator, NavCommand, NavOutcome, NoCapture};
pub use sentinel::{
    GeometryObserver, MarkerId, ObservationId, ObserveOptions, Unsupported, VisibilityEntry,
    VisibilityError, VisibilityObserver, VisibilitySentinel,
};
pub use viewport::Viewport;
pub use window::{FocusChange, Replacement, WindowController, WindowState};

/// Rows moved per wheel notch.
const WHEEL_STEP: i32 = 3;

/// An item with a stable identity.
pub trait ListItem {
    type Id: Clone + Eq + fmt::Debug;

    fn id(&self) -> Self::Id;
}

/// Receives the materialized window on every render.
pub trait ItemRenderer<I> {
    fn render_window(&mut self, items: &[I], focused: Option<usize>);
}

/// Renderer that draws nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullRenderer;

impl<I> ItemRenderer<I> for NullRenderer {
    fn render_window(&mut self, _items: &[I], _focused: Option<usize>) {}
}

/// Notification for the host, drained with [`ProgressiveList::take_events`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListEvent<Id> {
    FocusChanged {
        from: Option<usize>,
        to: Option<usize>,
    },
    /// An item was activated or clicked.
    SelectionChanged { index: usize, id: Id },
    /// The focused item left the viewport; the host should scroll to `offset`.
    ScrollRequested { index: usize, offset: usize },
    WindowGrew { from: usize, to: usize },
}

/// Attach failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachError {
    /// The list is already attached.
    AlreadyAttached,
    /// A keyboard command could not be registered.
    Commands(CommandError),
}

impl fmt::Display for AttachError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyAttached => write!(f, "list is already attached"),
            Self::Commands(_) => write!(f, "failed to register list commands"),
        }
    }
}

impl std::error::Error for AttachError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::AlreadyAttached => None,
            Self::Commands(err) => Some(err),
        }
    }
}

impl From<CommandError> for AttachError {
    fn from(err: CommandError) -> Self {
        Self::Commands(err)
    }
}

/// Command guards shared by the list and its handle. `None` once released.
type CommandSlot = Rc<RefCell<Option<Vec<CommandGuard>>>>;

/// Proof of attachment.
///
/// Pass it to [`ProgressiveList::detach`], or drop it. Dropping unregisters
/// the list's keyboard commands at once; the pending render and the
/// visibility observation are released on the list's next entry point.
#[must_use = "dropping the handle detaches the list"]
#[derive(Debug)]
pub struct AttachHandle {
    generation: u64,
    commands: CommandSlot,
}

impl Drop for AttachHandle {
    fn drop(&mut self) {
        let guards = self.commands.borrow_mut().take();
        drop(guards);
    }
}

struct Attachment {
    generation: u64,
    registry: CommandRegistry,
    commands: CommandSlot,
}

impl Attachment {
    fn is_released(&self) -> bool {
        self.commands.borrow().is_none()
    }
}

/// The progressive list controller.
pub struct ProgressiveList<I: ListItem + 'static> {
    config: ListConfig,
    items: Arc<[I]>,
    window: WindowController,
    navigator: KeyboardNavigator,
    sentinel: VisibilitySentinel,
    frames: FrameScheduler<ProgressiveList<I>>,
    probe: RenderProbe,
    viewport: Viewport,
    area: Rect,
    capture: Box<dyn InputCapture>,
    renderer: Box<dyn ItemRenderer<I>>,
    attachment: Option<Attachment>,
    generation: u64,
    marker: MarkerId,
    marker_count: usize,
    reveal_focus: bool,
    renders: u64,
    events: Vec<ListEvent<I::Id>>,
}

impl<I: ListItem + 'static> fmt::Debug for ProgressiveList<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressiveList")
            .field("component", &self.config.component_name())
            .field("len", &self.items.len())
            .field("window", &self.window.state())
            .field("attached", &self.is_attached())
            .field("sentinel", &self.sentinel)
            .field("frames", &self.frames)
            .field("probe", &self.probe)
            .field("viewport", &self.viewport)
            .field("pending_events", &self.events.len())
            .finish()
    }
}

impl<I: ListItem + 'static> ProgressiveList<I> {
    /// Create a detached list. Render instrumentation follows the config and
    /// logs through `tracing` unless a sink is set.
    #[must_use]
    pub fn new(items: Arc<[I]>, config: ListConfig) -> Self {
        let window = WindowController::from_config(items.len(), &config);
        let marker_count = window.displayed_count();
        Self {
            probe: RenderProbe::from_flag(config.component_name(), config.instrumentation(), None),
            sentinel: VisibilitySentinel::new(config.sentinel()),
            viewport: Viewport::new(config.item_height()),
            navigator: KeyboardNavigator::new(),
            frames: FrameScheduler::new(),
            area: Rect::default(),
            capture: Box::new(NoCapture),
            renderer: Box::new(NullRenderer),
            attachment: None,
            generation: 0,
            marker: MarkerId(0),
            marker_count,
            reveal_focus: false,
            renders: 0,
            events: Vec::new(),
            window,
            items,
            config,
        }
    }

    #[must_use]
    pub fn with_renderer(mut self, renderer: impl ItemRenderer<I> + 'static) -> Self {
        self.renderer = Box::new(renderer);
        self
    }

    /// Modality query polled before each navigation command.
    #[must_use]
    pub fn with_input_capture(mut self, capture: impl InputCapture + 'static) -> Self {
        self.capture = Box::new(capture);
        self
    }

    /// Custom keymap. Takes effect on the next attach.
    #[must_use]
    pub fn with_navigator(mut self, navigator: KeyboardNavigator) -> Self {
        self.navigator = navigator;
        self
    }

    /// Send render samples to `sink`. Ignored when instrumentation is off.
    #[must_use]
    pub fn with_sample_sink(mut self, sink: Arc<dyn RenderSampleSink>) -> Self {
        self.probe = RenderProbe::from_flag(
            self.config.component_name(),
            self.config.instrumentation(),
            Some(sink),
        );
        self
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Register commands, start observing the boundary marker, and schedule
    /// the first render.
    ///
    /// # Errors
    ///
    /// [`AttachError::AlreadyAttached`] if attached, or
    /// [`AttachError::Commands`] if a command name is already taken. Nothing
    /// stays registered on failure.
    pub fn attach(
        &mut self,
        registry: &CommandRegistry,
        observer: Box<dyn VisibilityObserver>,
    ) -> Result<AttachHandle, AttachError> {
        self.sync_attachment();
        if self.attachment.is_some() {
            return Err(AttachError::AlreadyAttached);
        }

        let commands = self
            .navigator
            .command_specs(self.config.component_name())
            .into_iter()
            .map(|spec| registry.register(spec))
            .collect::<Result<Vec<_>, _>>()?;

        let observing = self.sentinel.connect(observer, self.marker);
        self.generation += 1;
        let commands: CommandSlot = Rc::new(RefCell::new(Some(commands)));
        self.attachment = Some(Attachment {
            generation: self.generation,
            registry: registry.clone(),
            commands: Rc::clone(&commands),
        });
        tracing::debug!(
            component = self.config.component_name(),
            len = self.items.len(),
            displayed = self.window.displayed_count(),
            observing,
            "list attached"
        );
        self.request_render(false);
        Ok(AttachHandle {
            generation: self.generation,
            commands,
        })
    }

    /// Release everything `attach` acquired. Returns `false` if `handle`
    /// belongs to an earlier attachment.
    pub fn detach(&mut self, handle: AttachHandle) -> bool {
        let current = self
            .attachment
            .as_ref()
            .is_some_and(|a| a.generation == handle.generation);
        if current {
            self.teardown();
        }
        current
    }

    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.attachment.as_ref().is_some_and(|a| !a.is_released())
    }

    fn sync_attachment(&mut self) {
        if self.attachment.as_ref().is_some_and(Attachment::is_released) {
            self.teardown();
        }
    }

    fn teardown(&mut self) {
        let Some(attachment) = self.attachment.take() else {
            return;
        };
        self.frames.cancel_all();
        self.sentinel.disconnect();
        let guards = attachment.commands.borrow_mut().take();
        let commands = guards.as_ref().map_or(0, Vec::len);
        drop(guards);
        tracing::debug!(
            component = self.config.component_name(),
            commands,
            "list detached"
        );
    }

    // ------------------------------------------------------------------
    // Input
    // ------------------------------------------------------------------

    /// Route a host event. Returns `true` if the list consumed it.
    pub fn handle_event(&mut self, event: &Event, text_input_focused: bool) -> bool {
        self.sync_attachment();
        match event {
            Event::Key(key) => self.handle_key(key, text_input_focused),
            Event::Mouse(mouse) => self.handle_mouse(mouse),
            Event::Tick => self.on_frame(),
            Event::Resize { .. } | Event::Focus(_) => false,
        }
    }

    /// Route a native terminal event read from `crossterm::event::read`.
    ///
    /// Events with no msgview equivalent (pastes, unmapped keys) are not
    /// consumed.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn handle_crossterm_event(
        &mut self,
        event: crossterm::event::Event,
        text_input_focused: bool,
    ) -> bool {
        Event::from_crossterm(event)
            .is_some_and(|event| self.handle_event(&event, text_input_focused))
    }

    fn handle_key(&mut self, key: &KeyEvent, text_input_focused: bool) -> bool {
        let Some(attachment) = self.attachment.as_ref() else {
            return false;
        };
        let Some(name) = attachment.registry.resolve(key, text_input_focused) else {
            return false;
        };
        let Some(command) = KeyboardNavigator::parse_name(self.config.component_name(), &name)
        else {
            return false;
        };
        self.execute(command);
        true
    }

    fn handle_mouse(&mut self, mouse: &MouseEvent) -> bool {
        let Some(row) = self.area.row_of(mouse.x, mouse.y) else {
            return false;
        };
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => self.select(self.viewport.item_at_row(row)),
            MouseEventKind::ScrollUp => {
                self.scroll_by(-WHEEL_STEP);
                true
            }
            MouseEventKind::ScrollDown => {
                self.scroll_by(WHEEL_STEP);
                true
            }
            _ => false,
        }
    }

    /// Apply a navigation command.
    pub fn execute(&mut self, command: NavCommand) -> NavOutcome {
        self.sync_attachment();
        let before = self.window.displayed_count();
        let outcome = self
            .navigator
            .apply(command, &mut self.window, self.capture.as_ref());
        match outcome {
            NavOutcome::Moved { change, grew } => {
                if grew {
                    self.window_grew(before);
                }
                self.events.push(ListEvent::FocusChanged {
                    from: change.from,
                    to: change.to,
                });
                self.request_render(true);
            }
            NavOutcome::Activated(index) => self.push_selection(index),
            NavOutcome::Suppressed(capture) => {
                tracing::debug!(
                    component = self.config.component_name(),
                    command = command.name(),
                    capture = ?capture,
                    "command suppressed while input is captured"
                );
            }
            NavOutcome::Unchanged => {}
        }
        outcome
    }

    /// Focus and select a materialized item, as a pointer click does.
    ///
    /// Returns `false` for indices past the window.
    pub fn select(&mut self, index: usize) -> bool {
        self.sync_attachment();
        if !self.window.is_materialized(index) {
            return false;
        }
        if let Some(change) = self.window.focus(index) {
            self.events.push(ListEvent::FocusChanged {
                from: change.from,
                to: change.to,
            });
            self.request_render(true);
        }
        self.push_selection(index);
        true
    }

    /// Report from the host's visibility observer.
    ///
    /// Grows the window if the entry says the current marker is in view.
    /// Stale or post-detach entries are ignored.
    pub fn handle_visibility(&mut self, entry: VisibilityEntry) -> bool {
        self.sync_attachment();
        if !self.sentinel.accept(&entry) {
            return false;
        }
        self.load_more()
    }

    /// Grow by one increment. No-op once fully expanded.
    pub fn load_more(&mut self) -> bool {
        let before = self.window.displayed_count();
        if !self.window.grow() {
            return false;
        }
        self.window_grew(before);
        self.request_render(false);
        true
    }

    /// Replace the item list.
    ///
    /// A length change above the reset threshold re-initializes the window
    /// and scrolls to the top; a smaller one keeps window and focus.
    pub fn replace_items(&mut self, items: Arc<[I]>) -> Replacement {
        self.sync_attachment();
        let old_len = self.items.len();
        let before = self.window.state();
        let was_full = before.displayed_count >= old_len;
        self.items = items;
        let replacement = self.window.replace_len(self.items.len());

        if replacement == Replacement::Reset {
            self.viewport.scroll_to_top();
            tracing::debug!(
                component = self.config.component_name(),
                old_len,
                new_len = self.items.len(),
                "list reset after significant change"
            );
        }
        let after = self.window.state();
        if before.focused != after.focused {
            self.events.push(ListEvent::FocusChanged {
                from: before.focused,
                to: after.focused,
            });
        }
        if was_full && self.window.displayed_count() < self.items.len() {
            // The marker was inert at the end of the list; observe it afresh.
            self.rearm_marker();
        } else {
            self.sync_marker();
        }
        self.request_render(false);
        replacement
    }

    /// Scroll the viewport within the materialized prefix.
    pub fn scroll_by(&mut self, rows: i32) {
        let per = u32::from(self.viewport.item_height());
        let steps = i32::try_from(rows.unsigned_abs().div_ceil(per)).unwrap_or(i32::MAX);
        let items = if rows < 0 { -steps } else { steps };
        self.viewport.scroll(items, self.window.displayed_count());
    }

    /// Area the list occupies on screen. Used for hit testing and viewport
    /// height.
    pub fn set_area(&mut self, area: Rect) {
        self.area = area;
        self.viewport.set_height(area.height);
    }

    // ------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------

    /// Run pending render work. Call once per rendering opportunity.
    pub fn on_frame(&mut self) -> bool {
        self.sync_attachment();
        match self.frames.take_due() {
            Some(work) => {
                work.run(self);
                true
            }
            None => false,
        }
    }

    fn request_render(&mut self, reveal_focus: bool) {
        if self.attachment.is_none() {
            return;
        }
        self.reveal_focus |= reveal_focus;
        self.frames.schedule(|list: &mut Self| list.render_window());
    }

    fn render_window(&mut self) {
        let displayed = self.window.displayed_count();
        let focused = self.window.focused();
        let _span = tracing::debug_span!(
            "widget_render",
            widget = self.config.component_name(),
            materialized = displayed
        )
        .entered();

        let timer = self.probe.start();
        self.renderer.render_window(&self.items[..displayed], focused);
        self.probe.finish(timer, displayed);
        self.renders += 1;

        if std::mem::take(&mut self.reveal_focus)
            && let Some(index) = focused
            && let Some(offset) = self.viewport.reveal(index)
        {
            self.events.push(ListEvent::ScrollRequested { index, offset });
        }
    }

    fn window_grew(&mut self, from: usize) {
        let to = self.window.displayed_count();
        self.events.push(ListEvent::WindowGrew { from, to });
        self.sync_marker();
    }

    /// Give the boundary marker a new identity whenever it moves.
    fn sync_marker(&mut self) {
        let displayed = self.window.displayed_count();
        if displayed != self.marker_count {
            self.rearm_marker();
        }
    }

    fn rearm_marker(&mut self) {
        self.marker_count = self.window.displayed_count();
        self.marker = MarkerId(self.marker.0 + 1);
        self.sentinel.rebind(self.marker);
    }

    fn push_selection(&mut self, index: usize) {
        if let Some(item) = self.items.get(index) {
            self.events.push(ListEvent::SelectionChanged {
                index,
                id: item.id(),
            });
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Drain queued events, oldest first.
    pub fn take_events(&mut self) -> Vec<ListEvent<I::Id>> {
        std::mem::take(&mut self.events)
    }

    /// `items[0..displayed_count]`.
    #[must_use]
    pub fn materialized(&self) -> &[I] {
        &self.items[self.window.materialized()]
    }

    #[must_use]
    pub fn items(&self) -> &Arc<[I]> {
        &self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn displayed_count(&self) -> usize {
        self.window.displayed_count()
    }

    #[must_use]
    pub fn focused_index(&self) -> Option<usize> {
        self.window.focused()
    }

    #[must_use]
    pub fn focused_item(&self) -> Option<&I> {
        self.window.focused().and_then(|i| self.items.get(i))
    }

    #[must_use]
    pub fn window_state(&self) -> WindowState {
        self.window.state()
    }

    /// Items on screen, limited to the materialized prefix.
    #[must_use]
    pub fn visible_range(&self) -> std::ops::Range<usize> {
        self.viewport.visible_range(self.window.displayed_count())
    }

    #[must_use]
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Current boundary marker identity.
    #[must_use]
    pub fn marker(&self) -> MarkerId {
        self.marker
    }

    /// Absolute row of the boundary marker, for geometry-based observers.
    #[must_use]
    pub fn marker_row(&self) -> usize {
        self.viewport.marker_row(self.window.displayed_count())
    }

    #[must_use]
    pub fn sentinel(&self) -> &VisibilitySentinel {
        &self.sentinel
    }

    #[must_use]
    pub fn scheduler_stats(&self) -> SchedulerStats {
        self.frames.stats()
    }

    #[must_use]
    pub fn is_render_pending(&self) -> bool {
        self.frames.is_pending()
    }

    /// Completed renders.
    #[must_use]
    pub fn render_count(&self) -> u64 {
        self.renders
    }

    #[must_use]
    pub fn probe(&self) -> &RenderProbe {
        &self.probe
    }

    #[must_use]
    pub fn config(&self) -> &ListConfig {
        &self.config
    }
}

impl<I: ListItem + 'static> Drop for ProgressiveList<I> {
    fn drop(&mut self) {
        self.teardown();
    }
}
