//! Worker pool that verifies proof-of-work nonces

use std::sync::Arc;
use std::thread;

use crossbeam_channel::{bounded, select, Receiver, Sender, TrySendError};
use tracing::{debug, trace};

use crate::error::PowResult;

/// Checks the proof-of-work seal of one item, typically a block header
pub trait PowVerifier<T>: Send + Sync {
    /// Whether the item's nonce satisfies its difficulty
    fn verify(&self, item: &T) -> bool;
}

impl<T, F> PowVerifier<T> for F
where
    F: Fn(&T) -> bool + Send + Sync,
{
    fn verify(&self, item: &T) -> bool {
        self(item)
    }
}

/// Outcome of verifying the item at `index` of the input
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NonceResult {
    /// Position of the item in the input
    pub index: usize,
    /// Whether its nonce is valid
    pub valid: bool,
}

/// Stops a running verification from handing out more work.
///
/// Items already handed to a worker are still verified and reported.
/// Dropping the handle without calling [`AbortHandle::abort`] lets the
/// verification run to completion.
#[derive(Clone, Debug)]
pub struct AbortHandle {
    tx: Sender<()>,
}

impl AbortHandle {
    /// Signal the feeder to stop. Idempotent, never blocks.
    pub fn abort(&self) {
        match self.tx.try_send(()) {
            Ok(()) => debug!("nonce verification aborted"),
            // already signalled, or the feeder is done
            Err(TrySendError::Full(())) | Err(TrySendError::Disconnected(())) => {}
        }
    }
}

/// Verify `items` on one worker per available CPU, capped at the number
/// of items. See [`verify_nonces_with_workers`].
pub fn verify_nonces<T, V>(
    verifier: Arc<V>,
    items: Arc<Vec<T>>,
) -> PowResult<(AbortHandle, Receiver<NonceResult>)>
where
    T: Send + Sync + 'static,
    V: PowVerifier<T> + ?Sized + 'static,
{
    let workers = thread::available_parallelism().map_or(1, |n| n.get());
    verify_nonces_with_workers(verifier, items, workers)
}

/// Start verifying `items` on `min(workers, items.len())` threads and
/// return at once.
///
/// The results channel holds one slot per item, so workers never block
/// on a consumer that stopped reading. It closes once every worker has
/// exited: after all items are verified or, after an abort, once the
/// items already handed out are done. Empty input yields a closed
/// channel.
pub fn verify_nonces_with_workers<T, V>(
    verifier: Arc<V>,
    items: Arc<Vec<T>>,
    workers: usize,
) -> PowResult<(AbortHandle, Receiver<NonceResult>)>
where
    T: Send + Sync + 'static,
    V: PowVerifier<T> + ?Sized + 'static,
{
    let count = items.len();
    let workers = workers.max(1).min(count);

    let (abort_tx, abort_rx) = bounded::<()>(1);
    let (result_tx, result_rx) = bounded::<NonceResult>(count);
    let (task_tx, task_rx) = bounded::<usize>(workers);

    for id in 0..workers {
        let task_rx = task_rx.clone();
        let result_tx = result_tx.clone();
        let verifier = Arc::clone(&verifier);
        let items = Arc::clone(&items);
        thread::Builder::new()
            .name(format!("pow-verifier-{}", id))
            .spawn(move || {
                for index in task_rx {
                    let valid = verifier.verify(&items[index]);
                    trace!(index, valid, "nonce checked");
                    if result_tx.send(NonceResult { index, valid }).is_err() {
                        break;
                    }
                }
            })?;
    }
    drop(result_tx);

    if count > 0 {
        thread::Builder::new()
            .name("pow-feeder".into())
            .spawn(move || feed(task_tx, abort_rx, count))?;
    }

    debug!(items = count, workers, "nonce verification started");
    Ok((AbortHandle { tx: abort_tx }, result_rx))
}

/// Hand out indices `0..count` until done or aborted. Dropping `tasks`
/// on return lets the workers drain and exit.
fn feed(tasks: Sender<usize>, abort: Receiver<()>, count: usize) {
    let mut index = 0;
    while index < count {
        select! {
            send(tasks, index) -> res => {
                if res.is_err() {
                    return;
                }
                index += 1;
            }
            recv(abort) -> msg => {
                if msg.is_ok() {
                    debug!(fed = index, "feeder stopped by abort");
                    return;
                }
                // every handle dropped: no abort can arrive any more
                break;
            }
        }
    }
    for i in index..count {
        if tasks.send(i).is_err() {
            return;
        }
    }
}
