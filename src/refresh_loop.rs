use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::config::StaleWatchConfig;
use std::time::{Duration, Instant};

/// One deferred refresh: fire `notify` once `due` has passed.
struct RefreshJob {
    due: Instant,
    notify: Box<dyn FnOnce() + Send + 'static>,
}

/// Sending half handed to the poll table. Scheduling is fire-and-forget:
/// there is no cancellation handle, a job always fires once its deadline
/// elapses even if the entry that scheduled it has since stopped polling.
#[derive(Clone)]
pub struct RefreshHandle {
    sender: Sender<RefreshJob>,
    retry_delay: Duration,
}

impl RefreshHandle {
    pub fn schedule(&self, notify: Box<dyn FnOnce() + Send + 'static>) {
        let job = RefreshJob {
            due: Instant::now() + self.retry_delay,
            notify,
        };
        // The loop thread outlives every sender, so this cannot fail.
        let _ = self.sender.send(job);
    }
}

pub struct RefreshLoop;

impl RefreshLoop {
    /// RefreshLoop runs on a separate thread and collects scheduled jobs from
    /// the channel. Each round it compares Instant::now() with the deadline of
    /// every pending job and fires the due ones, in arrival order. The thread
    /// exits once all handles are dropped and no job is left pending.
    pub fn run(config: &StaleWatchConfig, tag: &str) -> RefreshHandle {
        let (sender, receiver): (Sender<RefreshJob>, Receiver<RefreshJob>) =
            crossbeam_channel::unbounded();

        let tick_interval = config.get_tick_interval();
        let tag = tag.to_string();

        std::thread::spawn(move || {
            let mut pending: Vec<RefreshJob> = vec![];
            loop {
                let disconnected = match receiver.recv_timeout(tick_interval) {
                    Ok(job) => {
                        pending.push(job);
                        false
                    }
                    Err(RecvTimeoutError::Timeout) => false,
                    Err(RecvTimeoutError::Disconnected) => true,
                };
                while let Ok(job) = receiver.try_recv() {
                    pending.push(job);
                }

                let now = Instant::now();
                let (due, rest): (Vec<_>, Vec<_>) =
                    pending.drain(..).partition(|job| job.due <= now);
                pending = rest;
                for job in due {
                    log::trace!("[{}] firing deferred refresh", tag);
                    (job.notify)();
                }

                if disconnected {
                    if pending.is_empty() {
                        break;
                    }
                    std::thread::sleep(tick_interval);
                }
            }
        });

        RefreshHandle {
            sender,
            retry_delay: config.get_retry_delay(),
        }
    }
}
