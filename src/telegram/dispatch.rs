//! Per-user update queues.
//!
//! Updates of one user are handled one after another on a dedicated worker
//! task, in the order they arrived. Different users are handled in
//! parallel.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::conversation::UserId;

struct UserQueue<T> {
    tx: mpsc::UnboundedSender<T>,

    /// Items sent but not yet fully handled.
    pending: Arc<AtomicUsize>,

    last_used: Instant,
}

/// Routes items to one worker task per user.
pub struct UserDispatcher<T, F> {
    work: Arc<F>,
    queues: HashMap<UserId, UserQueue<T>>,

    /// How long an empty queue is kept before its worker is stopped.
    idle_after: Duration,
}

impl<T, F, Fut> UserDispatcher<T, F>
where
    T: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    /// Creates a dispatcher running `work` for every item.
    pub fn new(idle_after: Duration, work: F) -> Self {
        Self {
            work: Arc::new(work),
            queues: HashMap::new(),
            idle_after,
        }
    }

    /// Queues `item` behind the earlier items of `user`.
    pub fn dispatch(&mut self, user: UserId, item: T) {
        let work = &self.work;
        let queue = self
            .queues
            .entry(user)
            .or_insert_with(|| spawn_worker(user, Arc::clone(work)));

        queue.last_used = Instant::now();
        queue.pending.fetch_add(1, Ordering::SeqCst);
        if let Err(mpsc::error::SendError(item)) = queue.tx.send(item) {
            // The worker only stops early if handling an item panicked
            warn!("Update worker of user {} stopped, restarting it", user);
            *queue = spawn_worker(user, Arc::clone(work));
            queue.pending.fetch_add(1, Ordering::SeqCst);
            let _ = queue.tx.send(item);
        }
    }

    /// Stops the workers of users with no pending items that have been
    /// quiet for longer than the idle timeout. Returns how many stopped.
    pub fn remove_idle(&mut self) -> usize {
        let before = self.queues.len();
        let idle_after = self.idle_after;
        self.queues.retain(|_, queue| {
            queue.pending.load(Ordering::SeqCst) > 0 || queue.last_used.elapsed() < idle_after
        });
        before - self.queues.len()
    }
}

impl<T, F> std::fmt::Debug for UserDispatcher<T, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserDispatcher")
            .field("queues", &self.queues.len())
            .field("idle_after", &self.idle_after)
            .finish_non_exhaustive()
    }
}

fn spawn_worker<T, F, Fut>(user: UserId, work: Arc<F>) -> UserQueue<T>
where
    T: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel();
    let pending = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&pending);

    debug!("Starting update worker for user {}", user);
    tokio::spawn(async move {
        while let Some(item) = rx.recv().await {
            work(item).await;
            counter.fetch_sub(1, Ordering::SeqCst);
        }
        debug!("Update worker for user {} finished", user);
    });

    UserQueue {
        tx,
        pending,
        last_used: Instant::now(),
    }
}
