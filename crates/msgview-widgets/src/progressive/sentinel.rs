#![forbid(unsafe_code)]

//! Visibility sentinel: notices when the end of the materialized window comes
//! into view.
//!
//! A boundary marker sits right after the last materialized item. The host
//! supplies a [`VisibilityObserver`] that watches the marker and reports
//! [`VisibilityEntry`] values back to the list. Each growth moves the marker,
//! so the sentinel drops the old observation and observes the new marker.
//!
//! Hosts without an observation primitive pass [`Unsupported`]. The sentinel
//! then never fires and the window grows through keyboard navigation only.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::config::DEFAULT_SENTINEL_MARGIN;
use super::viewport::Viewport;

/// Identity of one boundary marker position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MarkerId(pub u64);

/// Handle for one active observation, issued by the observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObservationId(pub u64);

/// How close to the viewport the marker must come before it counts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObserveOptions {
    /// Rows beyond the viewport edge that still count as visible.
    pub margin: u16,
    /// Fraction of the marker that must be visible, in `[0, 1]`.
    pub threshold: f32,
}

impl Default for ObserveOptions {
    fn default() -> Self {
        Self {
            margin: DEFAULT_SENTINEL_MARGIN,
            threshold: 0.0,
        }
    }
}

/// A visibility report for an observed marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibilityEntry {
    pub observation: ObservationId,
    pub marker: MarkerId,
    pub is_intersecting: bool,
}

/// Observation could not be established.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisibilityError {
    /// The host has no visibility primitive.
    Unavailable,
    /// The host refused to observe the marker.
    Rejected { reason: String },
}

impl fmt::Display for VisibilityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable => write!(f, "visibility observation is not available"),
            Self::Rejected { reason } => write!(f, "marker observation rejected: {reason}"),
        }
    }
}

impl std::error::Error for VisibilityError {}

/// Host-side visibility primitive.
pub trait VisibilityObserver {
    /// Start watching `marker`. Visibility changes are later delivered to
    /// [`ProgressiveList::handle_visibility`](super::ProgressiveList::handle_visibility).
    fn observe(
        &mut self,
        marker: MarkerId,
        options: ObserveOptions,
    ) -> Result<ObservationId, VisibilityError>;

    /// Stop watching. Unknown ids are ignored.
    fn unobserve(&mut self, observation: ObservationId);
}

/// Observer for hosts without a visibility primitive.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unsupported;

impl VisibilityObserver for Unsupported {
    fn observe(
        &mut self,
        _marker: MarkerId,
        _options: ObserveOptions,
    ) -> Result<ObservationId, VisibilityError> {
        Err(VisibilityError::Unavailable)
    }

    fn unobserve(&mut self, _observation: ObservationId) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Observation {
    id: ObservationId,
    marker: MarkerId,
}

/// Keeps exactly one observation alive, on the current marker.
pub struct VisibilitySentinel {
    options: ObserveOptions,
    observer: Option<Box<dyn VisibilityObserver>>,
    active: Option<Observation>,
    degraded: bool,
    warned: bool,
}

impl fmt::Debug for VisibilitySentinel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VisibilitySentinel")
            .field("options", &self.options)
            .field("connected", &self.observer.is_some())
            .field("active", &self.active)
            .field("degraded", &self.degraded)
            .finish()
    }
}

impl VisibilitySentinel {
    #[must_use]
    pub fn new(options: ObserveOptions) -> Self {
        Self {
            options,
            observer: None,
            active: None,
            degraded: false,
            warned: false,
        }
    }

    /// Attach to a host observer and watch `marker`.
    ///
    /// Returns `true` if observation is live. On failure the sentinel is
    /// degraded until the next `connect`.
    pub fn connect(&mut self, observer: Box<dyn VisibilityObserver>, marker: MarkerId) -> bool {
        self.disconnect();
        self.observer = Some(observer);
        self.degraded = false;
        self.observe(marker)
    }

    /// Move observation to a new marker. No-op if unchanged or disconnected.
    pub fn rebind(&mut self, marker: MarkerId) -> bool {
        if self.observer.is_none() || self.degraded {
            return false;
        }
        if self.active.is_some_and(|active| active.marker == marker) {
            return true;
        }
        self.release_active();
        self.observe(marker)
    }

    /// Stop observing and drop the host observer.
    pub fn disconnect(&mut self) {
        self.release_active();
        self.observer = None;
    }

    /// Whether `entry` is a live "marker is near" report for the current marker.
    #[must_use]
    pub fn accept(&self, entry: &VisibilityEntry) -> bool {
        match self.active {
            Some(active) => {
                entry.is_intersecting
                    && entry.observation == active.id
                    && entry.marker == active.marker
            }
            None => false,
        }
    }

    #[must_use]
    pub fn is_observing(&self) -> bool {
        self.active.is_some()
    }

    /// Whether the host could not observe and growth is keyboard-only.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    #[must_use]
    pub fn marker(&self) -> Option<MarkerId> {
        self.active.map(|active| active.marker)
    }

    #[must_use]
    pub fn options(&self) -> ObserveOptions {
        self.options
    }

    fn observe(&mut self, marker: MarkerId) -> bool {
        let Some(observer) = self.observer.as_mut() else {
            return false;
        };
        match observer.observe(marker, self.options) {
            Ok(id) => {
                self.active = Some(Observation { id, marker });
                true
            }
            Err(err) => {
                self.degraded = true;
                if !self.warned {
                    self.warned = true;
                    tracing::warn!(
                        error = %err,
                        "visibility observation unavailable, growing on keyboard navigation only"
                    );
                }
                false
            }
        }
    }

    fn release_active(&mut self) {
        if let Some(active) = self.active.take()
            && let Some(observer) = self.observer.as_mut()
        {
            observer.unobserve(active.id);
        }
    }
}

impl Drop for VisibilitySentinel {
    fn drop(&mut self) {
        self.disconnect();
    }
}

#[derive(Debug, Default)]
struct GeometryState {
    next_id: u64,
    watched: Option<Watched>,
}

#[derive(Debug, Clone, Copy)]
struct Watched {
    id: ObservationId,
    marker: MarkerId,
    options: ObserveOptions,
    last: Option<bool>,
}

/// Visibility observer for terminal hosts, driven by viewport geometry.
///
/// Clones share state: hand one clone to the list, keep another and call
/// [`GeometryObserver::check`] after layout or scrolling. Like a browser
/// observer it reports on a fresh observation and on every change of
/// intersection, not on every check.
#[derive(Debug, Clone, Default)]
pub struct GeometryObserver {
    state: Rc<RefCell<GeometryState>>,
}

impl GeometryObserver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marker currently watched.
    #[must_use]
    pub fn observed_marker(&self) -> Option<MarkerId> {
        self.state.borrow().watched.map(|w| w.marker)
    }

    #[must_use]
    pub fn is_observing(&self) -> bool {
        self.state.borrow().watched.is_some()
    }

    /// Compare the marker position with the viewport.
    ///
    /// `marker_row` is the absolute row of the boundary marker. Returns an
    /// entry when the intersection state changed since the last report.
    pub fn check(&self, viewport: &Viewport, marker_row: usize) -> Option<VisibilityEntry> {
        let mut state = self.state.borrow_mut();
        let watched = state.watched.as_mut()?;
        let intersecting = viewport.is_row_near(marker_row, watched.options.margin);
        if watched.last == Some(intersecting) {
            return None;
        }
        watched.last = Some(intersecting);
        Some(VisibilityEntry {
            observation: watched.id,
            marker: watched.marker,
            is_intersecting: intersecting,
        })
    }
}

impl VisibilityObserver for GeometryObserver {
    fn observe(
        &mut self,
        marker: MarkerId,
        options: ObserveOptions,
    ) -> Result<ObservationId, VisibilityError> {
        let mut state = self.state.borrow_mut();
        state.next_id += 1;
        let id = ObservationId(state.next_id);
        state.watched = Some(Watched {
            id,
            marker,
            options,
            last: None,
        });
        Ok(id)
    }

    fn unobserve(&mut self, observation: ObservationId) {
        let mut state = self.state.borrow_mut();
        if state.watched.is_some_and(|w| w.id == observation) {
            state.watched = None;
        }
    }
}
