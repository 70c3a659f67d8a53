//! Typed publish/subscribe bus.
//!
//! Components that produce notifications (visibility engine, streaming
//! client, state store) never hold direct references to their consumers;
//! they publish tagged events here and UI glue subscribes.
//!
//! Dispatch is synchronous and single-threaded: handlers run to completion
//! in subscription order before `publish` returns.

use std::collections::BTreeMap;
use std::fmt;

/// An event with a stable string tag, used for filtered subscriptions.
pub trait Tagged {
    fn tag(&self) -> &'static str;
}

/// Handle returned by `subscribe`; pass to `unsubscribe` to detach.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Subscription(u64);

struct HandlerEntry<E> {
    // `None` receives every event.
    tag: Option<&'static str>,
    callback: Box<dyn FnMut(&E)>,
}

pub struct EventBus<E> {
    handlers: BTreeMap<u64, HandlerEntry<E>>,
    sticky: BTreeMap<&'static str, E>,
    next_id: u64,
}

impl<E> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("handlers", &self.handlers.len())
            .field("sticky", &self.sticky.len())
            .finish()
    }
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> EventBus<E> {
    pub fn new() -> Self {
        Self {
            handlers: BTreeMap::new(),
            sticky: BTreeMap::new(),
            next_id: 0,
        }
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Detach a handler. Returns `false` if the subscription is unknown
    /// (already unsubscribed, or consumed by a sticky replay).
    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        self.handlers.remove(&subscription.0).is_some()
    }

    fn insert(&mut self, tag: Option<&'static str>, callback: Box<dyn FnMut(&E)>) -> Subscription {
        let id = self.next_id;
        self.next_id += 1;
        self.handlers.insert(id, HandlerEntry { tag, callback });
        Subscription(id)
    }
}

impl<E: Tagged + Clone> EventBus<E> {
    /// Register a handler for one event tag.
    ///
    /// If a sticky event with this tag has already been published, the
    /// handler is invoked immediately with the remembered payload and is
    /// not enqueued for future events.
    pub fn subscribe(
        &mut self,
        tag: &'static str,
        mut callback: impl FnMut(&E) + 'static,
    ) -> Subscription {
        if let Some(event) = self.sticky.get(tag) {
            let event = event.clone();
            callback(&event);
            // Spent subscription; unsubscribing it is a no-op.
            let id = self.next_id;
            self.next_id += 1;
            return Subscription(id);
        }
        self.insert(Some(tag), Box::new(callback))
    }

    /// Register a handler for every event regardless of tag.
    pub fn subscribe_all(&mut self, callback: impl FnMut(&E) + 'static) -> Subscription {
        self.insert(None, Box::new(callback))
    }

    /// Invoke all matching handlers with the event.
    pub fn publish(&mut self, event: &E) {
        let tag = event.tag();
        for entry in self.handlers.values_mut() {
            if entry.tag.is_none() || entry.tag == Some(tag) {
                (entry.callback)(event);
            }
        }
    }

    /// Publish and remember the event: current handlers for its tag are
    /// invoked and dropped, and any future `subscribe` with the same tag
    /// fires right away with this payload.
    pub fn publish_sticky(&mut self, event: E) {
        self.publish(&event);
        let tag = event.tag();
        self.handlers.retain(|_, entry| entry.tag != Some(tag));
        self.sticky.insert(tag, event);
    }
}

#[cfg(test)]
mod tests {
    use super::{EventBus, Tagged};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Clone, PartialEq)]
    enum TestEvent {
        Ping(u32),
        Pong,
    }

    impl Tagged for TestEvent {
        fn tag(&self) -> &'static str {
            match self {
                TestEvent::Ping(_) => "ping",
                TestEvent::Pong => "pong",
            }
        }
    }

    fn recorder() -> (Rc<RefCell<Vec<TestEvent>>>, impl FnMut(&TestEvent)) {
        let seen: Rc<RefCell<Vec<TestEvent>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        (seen, move |e: &TestEvent| sink.borrow_mut().push(e.clone()))
    }

    #[test]
    fn tag_filtering() {
        let mut bus = EventBus::new();
        let (seen, handler) = recorder();
        bus.subscribe("ping", handler);

        bus.publish(&TestEvent::Ping(1));
        bus.publish(&TestEvent::Pong);
        bus.publish(&TestEvent::Ping(2));

        assert_eq!(
            *seen.borrow(),
            vec![TestEvent::Ping(1), TestEvent::Ping(2)]
        );
    }

    #[test]
    fn subscribe_all_sees_every_tag() {
        let mut bus = EventBus::new();
        let (seen, handler) = recorder();
        bus.subscribe_all(handler);

        bus.publish(&TestEvent::Ping(7));
        bus.publish(&TestEvent::Pong);

        assert_eq!(seen.borrow().len(), 2);
    }

    #[test]
    fn unsubscribe_detaches() {
        let mut bus = EventBus::new();
        let (seen, handler) = recorder();
        let sub = bus.subscribe("ping", handler);

        bus.publish(&TestEvent::Ping(1));
        assert!(bus.unsubscribe(sub));
        assert!(!bus.unsubscribe(sub));
        bus.publish(&TestEvent::Ping(2));

        assert_eq!(*seen.borrow(), vec![TestEvent::Ping(1)]);
    }

    #[test]
    fn sticky_replays_to_late_subscribers() {
        let mut bus = EventBus::new();
        let (early, early_handler) = recorder();
        bus.subscribe("ping", early_handler);

        bus.publish_sticky(TestEvent::Ping(9));
        assert_eq!(*early.borrow(), vec![TestEvent::Ping(9)]);
        // The early handler was consumed by the sticky publication.
        assert_eq!(bus.handler_count(), 0);

        let (late, late_handler) = recorder();
        let sub = bus.subscribe("ping", late_handler);
        assert_eq!(*late.borrow(), vec![TestEvent::Ping(9)]);
        assert!(!bus.unsubscribe(sub));
    }
}
