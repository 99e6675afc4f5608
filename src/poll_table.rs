pub use main_type::{StaleWatch, StaleWatchBuilder};
pub use poll_key::PollKey;
pub use poll_status::{PollSnapshot, PollStatus};
pub use verdict::PollVerdict;

mod main_type {
    use std::{fmt::Debug, marker::PhantomData, sync::Arc};

    use dashmap::{DashMap, mapref::entry::Entry};

    use crate::{
        config::StaleWatchConfig,
        errors::StaleWatchError,
        refresh_loop::{RefreshHandle, RefreshLoop},
    };

    use super::{poll_key::PollKey, poll_status::{PollSnapshot, PollStatus}, verdict::PollVerdict};

    pub struct StaleWatchBuilder<K: PollKey + Debug, R> {
        tag: Option<String>,
        pending_check: Option<Arc<dyn Fn(&R) -> bool + Send + Sync + 'static>>,
        config: StaleWatchConfig,
        phantom_data: PhantomData<K>,
    }
    impl<K: PollKey + Debug, R> StaleWatchBuilder<K, R> {
        /// Resource tag this coordinator covers. Required. The tag identifies
        /// the resource to the host data layer; here it only scopes log lines,
        /// since the host closes over it in the refresh callbacks it passes to
        /// [`StaleWatch::evaluate_freshness`].
        pub fn tag(&mut self, tag: impl Into<String>) -> &mut Self {
            self.tag = Some(tag.into());
            self
        }
        /// Predicate deciding whether a fetched record is still transitioning.
        /// Optional. Without it, records never keep a poll alive on their own.
        pub fn with_pending_check(
            &mut self,
            pending_check: impl Fn(&R) -> bool + Send + Sync + 'static,
        ) -> &mut Self {
            self.pending_check = Some(Arc::new(pending_check));
            self
        }
        pub fn build(&mut self) -> Result<StaleWatch<K, R>, StaleWatchError> {
            let Some(tag) = self.tag.take() else {
                return Err(StaleWatchError::BuildErrorNoTagSet);
            };

            let config = std::mem::take(&mut self.config);
            let refresh_handle = RefreshLoop::run(&config, &tag);
            Ok(StaleWatch {
                table: Arc::new(DashMap::new()),
                tag,
                pending_check: self.pending_check.take(),
                config,
                refresh_handle,
            })
        }
    }

    pub struct StaleWatch<K: PollKey, R = ()> {
        table: Arc<DashMap<K, PollStatus>>,
        tag: String,
        pending_check: Option<Arc<dyn Fn(&R) -> bool + Send + Sync + 'static>>,
        config: StaleWatchConfig,
        refresh_handle: RefreshHandle,
    }
    impl<K: PollKey, R> Clone for StaleWatch<K, R> {
        fn clone(&self) -> Self {
            Self {
                table: self.table.clone(),
                tag: self.tag.clone(),
                pending_check: self.pending_check.clone(),
                config: self.config.clone(),
                refresh_handle: self.refresh_handle.clone(),
            }
        }
    }

    impl<K: PollKey + Debug, R> StaleWatch<K, R> {
        /// Creates a new [`StaleWatchBuilder<K, R>`] to configure and build a
        /// [`StaleWatch<K, R>`].
        ///
        /// `K` is the caller-chosen key identifying one polled entity under
        /// this coordinator's tag; `R` is the fetched record type inspected by
        /// the optional pending check.
        ///
        /// ### Example
        /// ```rust
        /// use stale_watch::{StaleWatch, StaleWatchConfig};
        ///
        /// let watch = StaleWatch::<usize, ()>::new(StaleWatchConfig::default())
        ///     .tag("todos")
        ///     .build()
        ///     .unwrap();
        /// ```
        pub fn new(config: StaleWatchConfig) -> StaleWatchBuilder<K, R> {
            StaleWatchBuilder {
                tag: None,
                pending_check: None,
                config,
                phantom_data: PhantomData::<K>,
            }
        }

        /// Arms polling for `key`, typically after a mutation completed and
        /// the resource is expected to change shortly.
        ///
        /// Creates the entry if the key was never seen, or re-arms an existing
        /// one: `polling` becomes true and the retry count restarts at zero.
        /// The last observed freshness marker is kept untouched, so the next
        /// [`evaluate_freshness`](Self::evaluate_freshness) call compares
        /// against the value from before the mutation.
        pub fn start_polling(&self, key: K) {
            log::debug!("[{}] start polling key {:?}", self.tag, key);
            self.table
                .entry(key)
                .and_modify(|status| status.start())
                .or_insert(PollStatus::armed());
        }

        /// Disarms polling for `key` without waiting for the poll to settle
        /// naturally. Unknown keys are a no-op, no entry is created.
        ///
        /// The retry count is intentionally left as-is: an external stop is
        /// distinct from natural termination, which always resets it to zero.
        pub fn stop_polling(&self, key: &K) {
            if let Some(mut entry) = self.table.get_mut(key) {
                log::debug!("[{}] stop polling key {:?}", self.tag, key);
                entry.stop();
            }
        }

        /// Current polling flag and retry count for `key`, or `None` if the
        /// key has never been observed. Pure read.
        pub fn status(&self, key: &K) -> Option<PollSnapshot> {
            self.table.get(key).map(|status| status.snapshot())
        }

        /// Decides, from the freshness `marker` a just-completed fetch
        /// returned (and optionally the fetched `records`), whether to keep
        /// polling `key`.
        ///
        /// While the entry is polling, one more attempt is made iff the marker
        /// is unchanged or some record still satisfies the pending check, and
        /// the retry limit is not yet reached. Continuing bumps the retry
        /// count immediately and hands `notify_refresh` to the timer thread
        /// to fire once after the configured retry delay; the caller wires
        /// that callback to invalidate the resource under this coordinator's
        /// tag. Any other case records `marker` and resets the entry to idle.
        ///
        /// The scheduled callback is never cancelled: if the entry stops
        /// polling before the delay elapses, the refresh still fires and the
        /// host sees one redundant invalidation. It does not touch the poll
        /// table.
        pub fn evaluate_freshness(
            &self,
            notify_refresh: impl FnOnce() + Send + 'static,
            key: K,
            marker: &str,
            records: Option<&[R]>,
        ) -> PollVerdict {
            match self.table.entry(key) {
                Entry::Vacant(slot) => {
                    slot.insert(PollStatus::observed(marker));
                    PollVerdict::Observed
                }
                Entry::Occupied(mut slot) => {
                    if !slot.get().is_polling() {
                        slot.get_mut().settle(marker);
                        return PollVerdict::Observed;
                    }

                    let marker_unchanged = slot.get().marker() == marker;
                    let has_pending_record = match (records, &self.pending_check) {
                        (Some(records), Some(check)) => records.iter().any(|r| check(r)),
                        _ => false,
                    };
                    let under_retry_limit = slot.get().retries() < self.config.get_max_retries();

                    if (marker_unchanged || has_pending_record) && under_retry_limit {
                        let status = slot.get_mut();
                        status.bump_retries();
                        let retries = status.retries();
                        log::debug!(
                            "[{}] key {:?} still stale (marker unchanged [{}], pending record [{}]), retry {}/{}",
                            self.tag,
                            slot.key(),
                            marker_unchanged,
                            has_pending_record,
                            retries,
                            self.config.get_max_retries(),
                        );
                        self.refresh_handle.schedule(Box::new(notify_refresh));
                        PollVerdict::Rescheduled { retries }
                    } else {
                        log::debug!("[{}] key {:?} settled on marker [{}]", self.tag, slot.key(), marker);
                        slot.get_mut().settle(marker);
                        PollVerdict::Settled
                    }
                }
            }
        }
    }
}

mod poll_status {
    /// Per-key polling state tracked in the [`StaleWatch`] table.
    ///
    /// Holds the last freshness marker observed from the resource, whether the
    /// key is actively awaiting a refresh, and how many consecutive retries
    /// were made since polling was (re)armed.
    ///
    /// Managed internally; callers read it through [`PollSnapshot`].
    #[derive(Clone)]
    pub struct PollStatus {
        marker: String,
        polling: bool,
        retries: u32,
    }

    impl PollStatus {
        /// Entry born from `start_polling` on an unseen key: armed, no marker
        /// observed yet.
        pub fn armed() -> Self {
            Self {
                marker: String::new(),
                polling: true,
                retries: 0,
            }
        }
        /// Entry born from a fetch completion on an unseen key: idle, marker
        /// recorded.
        pub fn observed(marker: &str) -> Self {
            Self {
                marker: marker.to_string(),
                polling: false,
                retries: 0,
            }
        }
        /// Re-arms polling. The marker is preserved on purpose so the next
        /// evaluation compares against the pre-mutation value.
        pub fn start(&mut self) {
            self.polling = true;
            self.retries = 0;
        }
        /// External stop: the retry count survives, unlike [`settle`](Self::settle).
        pub fn stop(&mut self) {
            self.polling = false;
        }
        /// Natural termination: record the marker, full reset.
        pub fn settle(&mut self, marker: &str) {
            self.marker = marker.to_string();
            self.polling = false;
            self.retries = 0;
        }
        pub fn bump_retries(&mut self) {
            self.retries += 1;
        }
        pub fn is_polling(&self) -> bool {
            self.polling
        }
        pub fn marker(&self) -> &str {
            &self.marker
        }
        pub fn retries(&self) -> u32 {
            self.retries
        }
        pub fn snapshot(&self) -> PollSnapshot {
            PollSnapshot {
                polling: self.polling,
                retries: self.retries,
            }
        }
    }

    /// Point-in-time copy of an entry's observable state.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct PollSnapshot {
        pub polling: bool,
        pub retries: u32,
    }
}

mod verdict {
    use std::fmt::Display;

    /// Outcome of one [`evaluate_freshness`](super::StaleWatch::evaluate_freshness)
    /// call. Informational; the table mutation already happened either way.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub enum PollVerdict {
        /// The entry was not polling (or never seen); the marker was recorded.
        Observed,
        /// Still stale: retry count bumped to `retries`, one refresh scheduled
        /// after the retry delay.
        Rescheduled { retries: u32 },
        /// Polling ended naturally, entry reset to idle.
        Settled,
    }

    impl Display for PollVerdict {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Self::Observed => write!(f, "marker observed"),
                Self::Rescheduled { retries } => {
                    write!(f, "refresh rescheduled (retry {})", retries)
                }
                Self::Settled => write!(f, "poll settled"),
            }
        }
    }
}

mod poll_key {
    use std::hash::Hash;

    /// Trait implemented by types usable as keys in a [`StaleWatch`] instance.
    ///
    /// Keys live in a concurrent map shared with the timer thread, so they
    /// must be `Send + Sync + 'static` on top of the usual map bounds.
    ///
    /// ### Blanket implementation
    /// ```rust
    /// # use std::hash::Hash;
    /// # trait PollKey {}
    /// impl<T: Send + Sync + Clone + Eq + Hash + 'static> PollKey for T {}
    /// ```
    /// `usize`, `String`, `Arc<T>` and friends all qualify.
    pub trait PollKey: Sized + Send + Sync + Clone + Hash + Eq + 'static {}

    impl<T: Send + Sync + Clone + Eq + Hash + 'static> PollKey for T {}
}
