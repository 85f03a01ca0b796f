// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Change listeners and in-order candidate delivery.
//!
//! Committers enqueue their candidate while holding the commit slot, so the
//! queue order is the commit order. Delivery happens outside every store
//! lock and one thread at a time. A committer delivers everything up to its
//! own candidate and then hands the queue to the next waiting committer, so
//! no `commit` call delivers candidates enqueued after its own.
use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, ThreadId};

use parking_lot::{Condvar, Mutex, RwLock};
use tracing::{trace, warn};

use crate::candidate::DataTreeCandidate;
use crate::path::Path;
use crate::tx::Version;

/// Receives one candidate per commit, in commit order.
///
/// A panic raised here is caught and logged; the commit stays published and
/// the remaining listeners still receive the candidate.
pub trait DataTreeChangeListener: Send + Sync {
    /// Called after the commit's snapshot became current.
    fn on_data_tree_changed(&self, candidate: &DataTreeCandidate);
}

impl<F> DataTreeChangeListener for F
where
    F: Fn(&DataTreeCandidate) + Send + Sync,
{
    fn on_data_tree_changed(&self, candidate: &DataTreeCandidate) {
        self(candidate);
    }
}

struct Registered {
    id: u64,
    scope: Path,
    listener: Arc<dyn DataTreeChangeListener>,
}

#[derive(Default)]
struct DeliveryQueue {
    pending: VecDeque<Arc<DataTreeCandidate>>,
    /// Thread currently delivering, if any.
    drainer: Option<ThreadId>,
    /// Highest version the current drainer delivers before handing off.
    until: Option<Version>,
    delivered: Option<Version>,
}

/// Listener table plus the ordered delivery queue.
#[derive(Default)]
pub(crate) struct Notifier {
    listeners: RwLock<Vec<Registered>>,
    next_id: AtomicU64,
    queue: Mutex<DeliveryQueue>,
    progress: Condvar,
}

impl Notifier {
    pub(crate) fn register(
        self: &Arc<Self>,
        scope: Path,
        listener: Arc<dyn DataTreeChangeListener>,
    ) -> ListenerRegistration {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.write().push(Registered {
            id,
            scope: scope.clone(),
            listener,
        });
        trace!(id, %scope, "listener registered");
        ListenerRegistration {
            id,
            scope,
            notifier: Arc::downgrade(self),
            closed: false,
        }
    }

    fn unregister(&self, id: u64) {
        self.listeners.write().retain(|r| r.id != id);
    }

    pub(crate) fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// Must be called with the commit slot held.
    pub(crate) fn enqueue(&self, candidate: Arc<DataTreeCandidate>) {
        self.queue.lock().pending.push_back(candidate);
    }

    /// Returns once the candidate committed at `version` has been delivered.
    ///
    /// Waits while another thread delivers earlier candidates, then delivers
    /// the rest up to `version` itself. A listener that commits from its
    /// callback only extends the current thread's delivery and returns.
    pub(crate) fn deliver_through(&self, version: Version) {
        let me = thread::current().id();
        {
            let mut queue = self.queue.lock();
            loop {
                if queue.delivered >= Some(version) {
                    return;
                }
                match queue.drainer {
                    None => {
                        queue.drainer = Some(me);
                        queue.until = Some(version);
                        break;
                    }
                    Some(drainer) if drainer == me => {
                        queue.until = queue.until.max(Some(version));
                        return;
                    }
                    Some(_) => self.progress.wait(&mut queue),
                }
            }
        }
        loop {
            let candidate = {
                let mut queue = self.queue.lock();
                let due = queue
                    .pending
                    .front()
                    .is_some_and(|c| Some(c.after_version()) <= queue.until);
                let next = if due { queue.pending.pop_front() } else { None };
                match next {
                    Some(candidate) => candidate,
                    None => {
                        queue.drainer = None;
                        queue.until = None;
                        drop(queue);
                        self.progress.notify_all();
                        return;
                    }
                }
            };
            self.deliver(&candidate);
            self.queue.lock().delivered = Some(candidate.after_version());
            self.progress.notify_all();
        }
    }

    fn deliver(&self, candidate: &DataTreeCandidate) {
        let targets: Vec<(u64, Arc<dyn DataTreeChangeListener>)> = self
            .listeners
            .read()
            .iter()
            .filter(|r| r.scope.is_root() || candidate.touches(&r.scope))
            .map(|r| (r.id, Arc::clone(&r.listener)))
            .collect();
        trace!(
            tx = %candidate.tx(),
            version = %candidate.after_version(),
            listeners = targets.len(),
            "delivering candidate"
        );
        for (id, listener) in targets {
            let delivered =
                catch_unwind(AssertUnwindSafe(|| listener.on_data_tree_changed(candidate)));
            if delivered.is_err() {
                warn!(
                    listener = id,
                    version = %candidate.after_version(),
                    "listener panicked; candidate skipped for it"
                );
            }
        }
    }
}

/// Keeps a listener registered; closing or dropping it unregisters.
#[must_use = "dropping the registration unregisters the listener"]
pub struct ListenerRegistration {
    id: u64,
    scope: Path,
    notifier: Weak<Notifier>,
    closed: bool,
}

impl ListenerRegistration {
    /// Path the listener is scoped to; the root for unscoped listeners.
    #[must_use]
    pub fn scope(&self) -> &Path {
        &self.scope
    }

    /// Returns `true` once [`close`](Self::close) has run.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Unregisters the listener. Candidates already being delivered may
    /// still reach it.
    pub fn close(&mut self) {
        if self.closed {
            warn!(id = self.id, scope = %self.scope, "listener registration closed twice");
            return;
        }
        self.closed = true;
        if let Some(notifier) = self.notifier.upgrade() {
            notifier.unregister(self.id);
        }
    }
}

impl Drop for ListenerRegistration {
    fn drop(&mut self) {
        if !self.closed {
            self.close();
        }
    }
}

impl std::fmt::Debug for ListenerRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistration")
            .field("id", &self.id)
            .field("scope", &self.scope)
            .field("closed", &self.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn drop_unregisters() {
        let notifier = Arc::new(Notifier::default());
        let reg = notifier.register(Path::root(), Arc::new(|_: &DataTreeCandidate| {}));
        assert_eq!(notifier.listener_count(), 1);
        drop(reg);
        assert_eq!(notifier.listener_count(), 0);
    }

    #[test]
    fn close_is_idempotent() {
        let notifier = Arc::new(Notifier::default());
        let hits = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&hits);
        let mut reg = notifier.register(
            Path::root(),
            Arc::new(move |_: &DataTreeCandidate| {
                seen.fetch_add(1, Ordering::SeqCst);
            }),
        );
        reg.close();
        reg.close();
        assert!(reg.is_closed());
        assert_eq!(notifier.listener_count(), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn delivering_an_already_delivered_version_returns_at_once() {
        let notifier = Notifier::default();
        notifier.queue.lock().delivered = Some(Version::from_raw(3));
        notifier.deliver_through(Version::from_raw(2));
        assert!(notifier.queue.lock().drainer.is_none());
    }
}
