//! Fixed-size worker pool around two FIFO queues.
//!
//! Fan-out/fan-in: the producer enqueues every work item followed by exactly
//! one end-of-stream marker per worker; each worker consumes one marker and
//! terminates. After all workers are joined, exactly one end-of-stream
//! marker is posted on the result queue for the downstream consumer.
//!
//! Workers share no mutable state beyond the queues; every transform writes
//! to a distinct output path. Merged result order across workers is not
//! guaranteed - consumers re-sort by the per-item `seq` ordinal.
//!
//! There is no mid-run cancellation and no external-tool timeout: a hung
//! child process hangs its worker until the tool exits.

use std::io;
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::models::{ResultMessage, TransformResult, WorkItem, WorkMessage};
use crate::transform::Transform;

/// Fixed-size pool of transform workers.
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    worker_count: usize,
}

impl WorkerPool {
    /// Create a pool. `worker_count` is clamped to at least 1.
    pub fn new(worker_count: usize) -> Self {
        Self {
            worker_count: worker_count.max(1),
        }
    }

    /// Configured worker count.
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Run the transform over all items, returning the result queue.
    ///
    /// The receiver yields exactly one [`ResultMessage::Item`] per input
    /// (failures included) and then a single [`ResultMessage::EndOfStream`].
    /// With `worker_count == 1` the items are processed sequentially on the
    /// coordinator thread; no worker threads are spawned.
    pub fn run(
        &self,
        transform: Arc<dyn Transform>,
        items: Vec<WorkItem>,
    ) -> io::Result<Receiver<ResultMessage>> {
        let (work_tx, work_rx) = unbounded::<WorkMessage>();
        let (result_tx, result_rx) = unbounded::<ResultMessage>();
        let worker_count = self.worker_count;

        thread::Builder::new()
            .name("vtriage-coordinator".to_string())
            .spawn(move || {
                for item in items {
                    let _ = work_tx.send(WorkMessage::Item(item));
                }
                // One terminal marker per worker that needs to stop.
                for _ in 0..worker_count {
                    let _ = work_tx.send(WorkMessage::EndOfStream);
                }
                drop(work_tx);

                if worker_count == 1 {
                    // Strictly sequential: direct call, no pool spun up.
                    worker_loop("worker-0", &work_rx, &result_tx, transform.as_ref());
                } else {
                    let mut handles = Vec::with_capacity(worker_count);
                    for i in 0..worker_count {
                        let rx = work_rx.clone();
                        let tx = result_tx.clone();
                        let t = Arc::clone(&transform);
                        let spawned = thread::Builder::new()
                            .name(format!("vtriage-worker-{}", i))
                            .spawn(move || {
                                worker_loop(&format!("worker-{}", i), &rx, &tx, t.as_ref());
                            });
                        match spawned {
                            Ok(h) => handles.push(h),
                            Err(e) => {
                                tracing::error!("Failed to spawn worker {}: {}", i, e);
                            }
                        }
                    }

                    if handles.is_empty() {
                        // All spawns failed; drain the queue on this thread
                        // so every item still gets a result.
                        worker_loop("worker-0", &work_rx, &result_tx, transform.as_ref());
                    } else {
                        for h in handles {
                            let _ = h.join();
                        }
                    }
                }

                let _ = result_tx.send(ResultMessage::EndOfStream);
            })?;

        Ok(result_rx)
    }
}

/// Worker state machine: Idle -> Processing -> Idle -> ... -> Terminated.
///
/// A worker exits on its first end-of-stream marker without re-enqueueing
/// it; no item is ever processed twice.
fn worker_loop(
    name: &str,
    work_rx: &Receiver<WorkMessage>,
    result_tx: &Sender<ResultMessage>,
    transform: &dyn Transform,
) {
    loop {
        match work_rx.recv() {
            Ok(WorkMessage::Item(work)) => {
                tracing::debug!(
                    "{}: {} {}",
                    name,
                    transform.name(),
                    work.item.path.display()
                );

                let outcome = transform.apply(&work.item).map_err(|e| {
                    tracing::warn!("{}: {} failed: {}", name, work.item.path.display(), e);
                    e.to_string()
                });

                let _ = result_tx.send(ResultMessage::Item(TransformResult {
                    seq: work.seq,
                    item: work.item,
                    outcome,
                }));
            }
            Ok(WorkMessage::EndOfStream) | Err(_) => break,
        }
    }
}

/// Drain a result queue into a list sorted by submission ordinal.
///
/// Stops at the end-of-stream marker (or channel disconnect).
pub fn collect_sorted(rx: &Receiver<ResultMessage>) -> Vec<TransformResult> {
    let mut results = Vec::new();
    for msg in rx.iter() {
        match msg {
            ResultMessage::Item(r) => results.push(r),
            ResultMessage::EndOfStream => break,
        }
    }
    results.sort_by_key(|r| r.seq);
    results
}
