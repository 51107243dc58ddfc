//! Event system for the expression stage.
//!
//! Downstream consumers subscribe to stage notifications via
//! [`EventController`]. Each event carries a set of [`EventKind`] flags
//! (bitflags-style) so that a single occurrence can match multiple
//! categories.
//!
//! The subscriber specifies an [`EventFilter`] to receive only the events
//! they care about. The filter is a simple OR mask: an event is delivered
//! when `(event.kinds & filter) != 0`.

use std::sync::mpsc::{Receiver, Sender};
use std::sync::{Arc, Mutex};

use crate::data::samples::DomainMode;

// ─────────────────────────────────────────────────────────────────────────────
// EventKind – bitflags
// ─────────────────────────────────────────────────────────────────────────────

/// Bitflags describing the *categories* an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventKind(pub u64);

impl EventKind {
    /// A recompute finished and `[begin, end)` of the output was rewritten;
    /// downstream stages only need to re-read that slice.
    pub const OUTPUT_RANGE_CHANGED: Self = Self(1 << 0);
    /// A validation or evaluation failure was recovered and the stage keeps
    /// running with stale/partial output.
    pub const ERROR: Self = Self(1 << 1);
    /// A new expression text was installed.
    pub const EXPRESSION_CHANGED: Self = Self(1 << 2);
    /// The domain mode changed and the variable set was re-bound.
    pub const MODE_CHANGED: Self = Self(1 << 3);

    /// Wildcard: matches *every* event kind.
    pub const ALL: Self = Self(u64::MAX);

    /// Combine two event kinds (bitwise OR).
    #[inline]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Check whether `self` contains all bits in `other`.
    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Check whether `self` intersects with `other` (at least one bit in common).
    #[inline]
    pub const fn intersects(self, other: Self) -> bool {
        (self.0 & other.0) != 0
    }

    /// Returns `true` if no bits are set.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for EventKind {
    type Output = Self;
    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for EventKind {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl std::ops::BitAnd for EventKind {
    type Output = Self;
    #[inline]
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "EMPTY");
        }
        if *self == EventKind::ALL {
            return write!(f, "ALL");
        }

        let pairs: &[(EventKind, &str)] = &[
            (EventKind::OUTPUT_RANGE_CHANGED, "OUTPUT_RANGE_CHANGED"),
            (EventKind::ERROR, "ERROR"),
            (EventKind::EXPRESSION_CHANGED, "EXPRESSION_CHANGED"),
            (EventKind::MODE_CHANGED, "MODE_CHANGED"),
        ];

        let mut names = Vec::new();
        let mut known_bits: u64 = 0;
        for (kind, name) in pairs {
            known_bits |= kind.0;
            if self.contains(*kind) {
                names.push((*name).to_string());
            }
        }

        let extra = self.0 & !known_bits;
        if extra != 0 {
            names.push(format!("0x{:x}", extra));
        }

        write!(f, "{}", names.join("|"))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Metadata – per-event-type payloads
// ─────────────────────────────────────────────────────────────────────────────

/// Metadata for output-range-changed events: the half-open index range that
/// was rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeMeta {
    pub begin: usize,
    pub end: usize,
}

/// Metadata for recovered failures.
#[derive(Debug, Clone)]
pub struct ErrorMeta {
    /// Human-readable diagnostic (validation message or the evaluator's).
    pub message: String,
}

/// Metadata for expression changes.
#[derive(Debug, Clone)]
pub struct ExpressionMeta {
    /// The newly installed expression text.
    pub text: String,
}

/// Metadata for domain-mode changes.
#[derive(Debug, Clone, Copy)]
pub struct ModeMeta {
    pub mode: DomainMode,
}

// ─────────────────────────────────────────────────────────────────────────────
// StageEvent – the top-level event type
// ─────────────────────────────────────────────────────────────────────────────

/// An event emitted by the expression stage.
///
/// `kinds` is a bitflag set of [`EventKind`] categories. The `Option<…Meta>`
/// fields carry metadata relevant to the kinds that are set.
#[derive(Debug, Clone)]
pub struct StageEvent {
    pub kinds: EventKind,
    pub range: Option<RangeMeta>,
    pub error: Option<ErrorMeta>,
    pub expression: Option<ExpressionMeta>,
    pub mode: Option<ModeMeta>,
}

impl StageEvent {
    /// Create a new event with the given kinds and no metadata.
    pub fn new(kinds: EventKind) -> Self {
        Self {
            kinds,
            range: None,
            error: None,
            expression: None,
            mode: None,
        }
    }

    /// Convenience constructor for an output-range-changed event.
    pub fn output_range_changed(begin: usize, end: usize) -> Self {
        let mut evt = Self::new(EventKind::OUTPUT_RANGE_CHANGED);
        evt.range = Some(RangeMeta { begin, end });
        evt
    }

    /// Convenience constructor for a recovered failure.
    pub fn error<S: Into<String>>(message: S) -> Self {
        let mut evt = Self::new(EventKind::ERROR);
        evt.error = Some(ErrorMeta {
            message: message.into(),
        });
        evt
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// EventFilter
// ─────────────────────────────────────────────────────────────────────────────

/// A filter that selects which event categories a subscriber receives.
#[derive(Debug, Clone, Copy)]
pub struct EventFilter {
    pub mask: EventKind,
}

impl EventFilter {
    /// Accept all events.
    pub const fn all() -> Self {
        Self {
            mask: EventKind::ALL,
        }
    }

    /// Accept only the specified event kinds.
    pub const fn only(mask: EventKind) -> Self {
        Self { mask }
    }

    /// Check whether an event passes this filter.
    #[inline]
    pub fn matches(&self, event: &StageEvent) -> bool {
        event.kinds.intersects(self.mask)
    }
}

impl Default for EventFilter {
    fn default() -> Self {
        Self::all()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// EventController
// ─────────────────────────────────────────────────────────────────────────────

struct Subscriber {
    filter: EventFilter,
    sender: Sender<StageEvent>,
}

/// Controller that distributes stage events to subscribers.
///
/// Clone it and hand one copy to the stage; then call
/// [`subscribe`](Self::subscribe) (with an optional filter) to receive
/// events on an `mpsc` channel.
#[derive(Clone, Default)]
pub struct EventController {
    inner: Arc<Mutex<Vec<Subscriber>>>,
}

impl EventController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to events matching the given filter.
    pub fn subscribe(&self, filter: EventFilter) -> Receiver<StageEvent> {
        let (tx, rx) = std::sync::mpsc::channel();
        let mut subs = self.inner.lock().unwrap();
        subs.push(Subscriber { filter, sender: tx });
        rx
    }

    /// Subscribe to *all* events (no filtering).
    pub fn subscribe_all(&self) -> Receiver<StageEvent> {
        self.subscribe(EventFilter::all())
    }

    /// Emit an event to all subscribers whose filter matches. Subscribers
    /// whose receiver was dropped are pruned.
    pub fn emit(&self, event: StageEvent) {
        let mut subs = self.inner.lock().unwrap();
        subs.retain(|sub| {
            if sub.filter.matches(&event) {
                sub.sender.send(event.clone()).is_ok()
            } else {
                true
            }
        });
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_kind_union_and_intersection() {
        let range = EventKind::OUTPUT_RANGE_CHANGED;
        let err = EventKind::ERROR;
        let combined = range | err;
        assert!(combined.contains(range));
        assert!(combined.contains(err));
        assert!(combined.intersects(range));
        assert!(!EventKind::MODE_CHANGED.intersects(range));
    }

    #[test]
    fn event_kind_all_matches_everything() {
        assert!(EventKind::ALL.contains(EventKind::OUTPUT_RANGE_CHANGED));
        assert!(EventKind::ALL.contains(EventKind::EXPRESSION_CHANGED));
    }

    #[test]
    fn event_filter_matches() {
        let filter = EventFilter::only(EventKind::ERROR | EventKind::EXPRESSION_CHANGED);
        assert!(filter.matches(&StageEvent::error("bad")));
        assert!(!filter.matches(&StageEvent::output_range_changed(0, 4)));

        let both = StageEvent::new(EventKind::ERROR | EventKind::MODE_CHANGED);
        assert!(filter.matches(&both));
    }

    #[test]
    fn event_controller_subscribe_and_emit() {
        let ctrl = EventController::new();
        let rx_all = ctrl.subscribe_all();
        let rx_err = ctrl.subscribe(EventFilter::only(EventKind::ERROR));
        let rx_mode = ctrl.subscribe(EventFilter::only(EventKind::MODE_CHANGED));

        ctrl.emit(StageEvent::error("boom"));

        assert!(rx_all.try_recv().is_ok());
        assert!(rx_err.try_recv().is_ok());
        assert!(rx_mode.try_recv().is_err());
    }

    #[test]
    fn range_event_carries_bounds() {
        let ctrl = EventController::new();
        let rx = ctrl.subscribe(EventFilter::only(EventKind::OUTPUT_RANGE_CHANGED));
        ctrl.emit(StageEvent::output_range_changed(3, 9));
        let evt = rx.try_recv().unwrap();
        assert_eq!(evt.range, Some(RangeMeta { begin: 3, end: 9 }));
    }

    #[test]
    fn event_kind_display() {
        assert_eq!(format!("{}", EventKind::ERROR), "ERROR");
        let combo = EventKind::OUTPUT_RANGE_CHANGED | EventKind::ERROR;
        assert_eq!(format!("{}", combo), "OUTPUT_RANGE_CHANGED|ERROR");
        assert_eq!(format!("{}", EventKind::ALL), "ALL");
        assert!(format!("{}", EventKind(1 << 40)).starts_with("0x"));
    }

    #[test]
    fn event_kinds_do_not_overlap() {
        let all_kinds = [
            EventKind::OUTPUT_RANGE_CHANGED,
            EventKind::ERROR,
            EventKind::EXPRESSION_CHANGED,
            EventKind::MODE_CHANGED,
        ];
        for (i, a) in all_kinds.iter().enumerate() {
            for (j, b) in all_kinds.iter().enumerate() {
                if i != j {
                    assert!(!a.intersects(*b), "EventKind bits {} and {} overlap", i, j);
                }
            }
        }
    }

    #[test]
    fn dropped_receiver_is_cleaned_up() {
        let ctrl = EventController::new();
        let rx1 = ctrl.subscribe_all();
        let rx2 = ctrl.subscribe_all();

        drop(rx1);

        ctrl.emit(StageEvent::error("first"));
        assert!(rx2.try_recv().is_ok());

        ctrl.emit(StageEvent::error("second"));
        assert!(rx2.try_recv().is_ok());
    }
}
