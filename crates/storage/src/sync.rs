//! Background metadata flush timer
//!
//! A single thread flushes dirty sequence metadata on a fixed interval.
//! The interval bounds how much of the allocated id range a crash can
//! forget. Sleeps are sliced so shutdown is prompt.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, warn};

use greylock_core::metadata::Metadata;

use crate::database::flush_metadata;
use crate::store::Store;

pub(crate) struct MetadataSyncer {
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl MetadataSyncer {
    pub(crate) fn start(docs: Arc<Store>, metadata: Arc<Metadata>, interval: Duration) -> Self {
        let shutdown = Arc::new(AtomicBool::new(false));
        let thread_shutdown = Arc::clone(&shutdown);

        let handle = thread::spawn(move || {
            let slice = Duration::from_millis(100).min(interval);
            loop {
                let mut elapsed = Duration::ZERO;
                while elapsed < interval {
                    if thread_shutdown.load(Ordering::Relaxed) {
                        return;
                    }
                    thread::sleep(slice);
                    elapsed += slice;
                }

                match flush_metadata(&docs, &metadata) {
                    Ok(()) => debug!(seq = metadata.sequence(), "metadata flushed"),
                    Err(e) => warn!(error = %e, "periodic metadata flush failed"),
                }
            }
        });

        MetadataSyncer {
            shutdown,
            handle: Some(handle),
        }
    }

    fn stop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MetadataSyncer {
    fn drop(&mut self) {
        self.stop();
    }
}
