//! Fire-and-forget broadcast between linked views.
//!
//! Linked propagation goes through a bus rather than the camera store or the
//! z signals so that a receiver applying an update through its own entry
//! point never publishes again.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use wmm_ui::Subscription;

use crate::model::{Target, ViewId};

type Listener<E> = Rc<dyn Fn(&E)>;

struct BusInner<E> {
    listeners: RefCell<Vec<(u64, Listener<E>)>>,
    next_id: Cell<u64>,
}

/// Broadcast channel for events of type `E`. Cloning shares the channel.
pub struct LinkBus<E> {
    inner: Rc<BusInner<E>>,
}

impl<E> Clone for LinkBus<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<E: 'static> Default for LinkBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: 'static> LinkBus<E> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(BusInner {
                listeners: RefCell::new(Vec::new()),
                next_id: Cell::new(0),
            }),
        }
    }

    /// Deliver `event` to every listener, in subscription order.
    pub fn publish(&self, event: &E) {
        let listeners: Vec<Listener<E>> = self
            .inner
            .listeners
            .borrow()
            .iter()
            .map(|(_, l)| Rc::clone(l))
            .collect();
        for listener in listeners {
            listener(event);
        }
    }

    pub fn subscribe(&self, f: impl Fn(&E) + 'static) -> Subscription {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        self.inner.listeners.borrow_mut().push((id, Rc::new(f)));

        let weak: Weak<BusInner<E>> = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.listeners.borrow_mut().retain(|(lid, _)| *lid != id);
            }
        })
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }
}

/// Pan/zoom change of a linked view, relative to its previous camera.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraLink {
    pub origin: ViewId,
    /// Target delta in image space
    pub pan: Target,
    /// New zoom of the origin; linked views share one zoom
    pub zoom: f64,
}

/// Z window change of the active linked view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZLink {
    pub origin: ViewId,
    pub delta_low: i64,
    pub delta_high: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_reaches_every_listener() {
        let bus: LinkBus<u32> = LinkBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let a = Rc::clone(&seen);
        let b = Rc::clone(&seen);
        let _s1 = bus.subscribe(move |e| a.borrow_mut().push(("a", *e)));
        let _s2 = bus.subscribe(move |e| b.borrow_mut().push(("b", *e)));

        bus.publish(&3);
        assert_eq!(*seen.borrow(), vec![("a", 3), ("b", 3)]);
    }

    #[test]
    fn test_dropped_listener_is_removed() {
        let bus: LinkBus<u32> = LinkBus::new();
        let sub = bus.subscribe(|_| {});
        assert_eq!(bus.listener_count(), 1);
        drop(sub);
        assert_eq!(bus.listener_count(), 0);
        bus.publish(&1);
    }
}
