//! Fixed-size worker pool that runs one query per DEX file.
//!
//! Workers never share state; matches travel back to the calling thread
//! over a channel and are handed to the sink as soon as they arrive, so a
//! caller can print while the slower DEX files are still being scanned.

use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
};

use crossbeam::channel;
use log::{debug, error};
use rayon::ThreadPoolBuilder;
use serde::Serialize;

use crate::{apk::DexEntry, errors::QueryError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanFailure {
    pub dex_name: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DexCount {
    pub dex_name: String,
    pub found: usize,
}

#[derive(Debug, Serialize)]
pub struct ScanSummary<T> {
    /// Every match, in arrival order.
    pub matches: Vec<T>,
    /// DEX files that finished without error, in completion order.
    pub completed: Vec<DexCount>,
    pub failures: Vec<ScanFailure>,
}

impl<T> Default for ScanSummary<T> {
    fn default() -> Self {
        Self {
            matches: Vec::new(),
            completed: Vec::new(),
            failures: Vec::new(),
        }
    }
}

enum Event<T> {
    Found(T),
    Finished(DexCount),
    Failed(ScanFailure),
}

/// Runs `worker` for each DEX entry on a pool of `threads` threads
/// (`0` picks one per core). The worker emits matches through the callback
/// it is given. A failing or panicking worker is logged and recorded;
/// matches it emitted before failing are kept.
pub fn scan<T, W, S>(
    entries: &[DexEntry],
    threads: usize,
    worker: W,
    mut sink: S,
) -> Result<ScanSummary<T>, QueryError>
where
    T: Send,
    W: Fn(&DexEntry, &mut dyn FnMut(T)) -> Result<(), QueryError> + Sync,
    S: FnMut(&T),
{
    let pool = ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("dex-scan-{i}"))
        .build()?;
    debug!(
        "Scanning {} DEX files on {} threads",
        entries.len(),
        pool.current_num_threads()
    );

    let (tx, rx) = channel::unbounded();
    let mut summary = ScanSummary::default();
    pool.in_place_scope(|scope| {
        for entry in entries {
            let tx = tx.clone();
            let worker = &worker;
            scope.spawn(move |_| {
                let mut found = 0;
                let result = panic::catch_unwind(AssertUnwindSafe(|| {
                    worker(entry, &mut |item: T| {
                        found += 1;
                        let _ = tx.send(Event::Found(item));
                    })
                }));
                let message = match result {
                    Ok(Ok(())) => None,
                    Ok(Err(e)) => Some(e.to_string()),
                    Err(payload) => Some(format!("worker panicked: {}", panic_message(&*payload))),
                };
                let event = match message {
                    None => Event::Finished(DexCount {
                        dex_name: entry.name.clone(),
                        found,
                    }),
                    Some(message) => {
                        error!("Error processing {}: {message}", entry.name);
                        Event::Failed(ScanFailure {
                            dex_name: entry.name.clone(),
                            message,
                        })
                    }
                };
                let _ = tx.send(event);
            });
        }
        drop(tx);

        for event in rx {
            match event {
                Event::Found(item) => {
                    sink(&item);
                    summary.matches.push(item);
                }
                Event::Finished(count) => summary.completed.push(count),
                Event::Failed(failure) => summary.failures.push(failure),
            }
        }
    });
    Ok(summary)
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown cause"
    }
}

/// Stable-sorts matches into archive order (`classes.dex`, `classes2.dex`,
/// ...), undoing the completion order the pool delivered them in.
pub fn order_by_dex<T>(matches: &mut [T], entries: &[DexEntry], dex_name: impl Fn(&T) -> &str) {
    let position = |item: &T| {
        entries
            .iter()
            .position(|entry| entry.name == dex_name(item))
            .unwrap_or(usize::MAX)
    };
    matches.sort_by_cached_key(|item| position(item));
}
