use std::time::Duration;

#[derive(Clone)]
pub struct StaleWatchConfig {
    max_retries: u32,
    retry_delay: Duration,
    tick_interval: Duration,
}

impl Default for StaleWatchConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            retry_delay: Duration::from_millis(1000),
            tick_interval: Duration::from_millis(25),
        }
    }
}
impl StaleWatchConfig {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn get_max_retries(&self) -> u32 {
        self.max_retries
    }
    pub fn get_retry_delay(&self) -> Duration {
        self.retry_delay
    }
    pub fn get_tick_interval(&self) -> Duration {
        self.tick_interval
    }
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
    pub fn retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }
    /// Granularity of the timer thread that fires deferred refreshes.
    pub fn tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }
}
