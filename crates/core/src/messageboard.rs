// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Type-indexed multi-consumer pub-sub (C5), grounded on
//! `Headers/Client/Messageboard.hpp`: posting a message of type `T` fans it
//! out to every live subscriber's FIFO queue and wakes it.

use std::any::{Any, TypeId};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, Weak};

use tokio::sync::Notify;

struct Subscriber {
    queue: Mutex<VecDeque<Arc<dyn Any + Send + Sync>>>,
    notify: Notify,
}

/// Per-Client single-threaded pub-sub hub.
#[derive(Default)]
pub struct Messageboard {
    subscribers: HashMap<TypeId, Vec<Weak<Subscriber>>>,
}

/// An observer handle for messages of type `T`. Dropping it detaches the
/// subscription with no explicit unregister call: the publisher holds only
/// a `Weak` reference and prunes on next send.
pub struct Observer<T> {
    inner: Arc<Subscriber>,
    _marker: std::marker::PhantomData<T>,
}

impl Messageboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new observer for `T`. Only messages posted *after* this
    /// call are visible to it (§3/§8 invariant 4).
    pub fn observe<T: 'static>(&mut self) -> Observer<T> {
        let inner = Arc::new(Subscriber {
            queue: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
        });
        self.subscribers
            .entry(TypeId::of::<T>())
            .or_default()
            .push(Arc::downgrade(&inner));
        Observer {
            inner,
            _marker: std::marker::PhantomData,
        }
    }

    /// Posts a message to every live subscriber of `T`, returning the
    /// recipient count. Dead weak handles are pruned as a side effect.
    pub fn send<T: Send + Sync + 'static>(&mut self, message: Arc<T>) -> usize {
        let mut count = 0;
        if let Some(list) = self.subscribers.get_mut(&TypeId::of::<T>()) {
            list.retain(|weak| match weak.upgrade() {
                Some(sub) => {
                    sub.queue
                        .lock()
                        .unwrap_or_else(|poison| poison.into_inner())
                        .push_back(message.clone() as Arc<dyn Any + Send + Sync>);
                    sub.notify.notify_one();
                    count += 1;
                    true
                }
                None => false,
            });
        }
        count
    }
}

impl<T: Send + Sync + 'static> Observer<T> {
    /// Pops the next message in FIFO order, or `None` if the queue is empty.
    pub fn fetch(&self) -> Option<Arc<T>> {
        let mut queue = self
            .inner
            .queue
            .lock()
            .unwrap_or_else(|poison| poison.into_inner());
        let front = queue.pop_front()?;
        front.downcast::<T>().ok()
    }

    /// Suspends until at least one message is queued, then returns it.
    pub async fn wait(&self) -> Arc<T> {
        loop {
            if let Some(msg) = self.fetch() {
                return msg;
            }
            self.inner.notify.notified().await;
        }
    }

    pub fn is_woken(&self) -> bool {
        !self
            .inner
            .queue
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Eq)]
    struct Ping(u32);

    #[test]
    fn in_order_delivery_for_same_type() {
        let mut mb = Messageboard::new();
        let obs = mb.observe::<Ping>();
        mb.send(Arc::new(Ping(1)));
        mb.send(Arc::new(Ping(2)));
        assert_eq!(*obs.fetch().expect("first"), Ping(1));
        assert_eq!(*obs.fetch().expect("second"), Ping(2));
        assert!(obs.fetch().is_none());
    }

    #[test]
    fn late_subscriber_does_not_see_earlier_message() {
        let mut mb = Messageboard::new();
        mb.send(Arc::new(Ping(1)));
        let obs = mb.observe::<Ping>();
        assert!(obs.fetch().is_none());
    }

    #[test]
    fn dropped_observer_is_pruned_on_next_send() {
        let mut mb = Messageboard::new();
        {
            let _obs = mb.observe::<Ping>();
        }
        let recipients = mb.send(Arc::new(Ping(1)));
        assert_eq!(recipients, 0);
    }
}
