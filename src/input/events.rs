use crate::{OverlayError, Result};
use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

/// Events a labeled marker forwards from the host marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Click,
    Drag,
    DragStart,
    DragEnd,
}

impl EventKind {
    /// Every event subscribed on the host marker
    pub const MARKER_EVENTS: [EventKind; 4] = [
        EventKind::Click,
        EventKind::Drag,
        EventKind::DragStart,
        EventKind::DragEnd,
    ];

    /// Name used by the host event system
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Click => "click",
            EventKind::Drag => "drag",
            EventKind::DragStart => "dragstart",
            EventKind::DragEnd => "dragend",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = OverlayError;

    fn from_str(s: &str) -> Result<Self> {
        EventKind::MARKER_EVENTS
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| OverlayError::UnknownEvent(s.to_string()))
    }
}

/// Handle returned by [`EventEmitter::add_listener`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId {
    kind: EventKind,
    id: u64,
}

impl ListenerId {
    pub fn kind(&self) -> EventKind {
        self.kind
    }
}

type Listener<E> = Rc<RefCell<dyn FnMut(Option<&E>)>>;

/// Per-object listener registry, dispatched synchronously on the caller's thread.
///
/// Listeners may add or remove listeners (including themselves) while being
/// dispatched; changes take effect from the next `trigger`.
pub struct EventEmitter<E> {
    next_id: Cell<u64>,
    listeners: RefCell<FxHashMap<EventKind, Vec<(u64, Listener<E>)>>>,
}

impl<E> EventEmitter<E> {
    pub fn new() -> Self {
        Self {
            next_id: Cell::new(0),
            listeners: RefCell::new(FxHashMap::default()),
        }
    }

    pub fn add_listener<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: FnMut(Option<&E>) + 'static,
    {
        let id = self.next_id.get();
        self.next_id.set(id + 1);

        let listener: Listener<E> = Rc::new(RefCell::new(listener));
        self.listeners
            .borrow_mut()
            .entry(kind)
            .or_default()
            .push((id, listener));

        ListenerId { kind, id }
    }

    /// Returns false if the listener was already removed
    pub fn remove_listener(&self, listener: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let Some(entries) = listeners.get_mut(&listener.kind) else {
            return false;
        };

        let before = entries.len();
        entries.retain(|(id, _)| *id != listener.id);
        before != entries.len()
    }

    pub fn clear_listeners(&self, kind: EventKind) {
        self.listeners.borrow_mut().remove(&kind);
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.listeners
            .borrow()
            .get(&kind)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Calls every listener registered for `kind`, in registration order
    pub fn trigger(&self, kind: EventKind, payload: Option<&E>) {
        let snapshot: Vec<Listener<E>> = match self.listeners.borrow().get(&kind) {
            Some(entries) => entries.iter().map(|(_, l)| Rc::clone(l)).collect(),
            None => return,
        };

        for listener in snapshot {
            match listener.try_borrow_mut() {
                Ok(mut listener) => (*listener)(payload),
                Err(_) => log::warn!("skipping re-entrant '{}' listener", kind),
            }
        }
    }
}

impl<E> Default for EventEmitter<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for EventEmitter<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners = self.listeners.borrow();
        let mut counts: Vec<(EventKind, usize)> =
            listeners.iter().map(|(k, v)| (*k, v.len())).collect();
        counts.sort_by_key(|(kind, _)| kind.as_str());
        f.debug_struct("EventEmitter").field("listeners", &counts).finish()
    }
}
