mod config;
mod errors;
mod poll_table;
mod refresh_loop;

pub use config::StaleWatchConfig;
pub use errors::StaleWatchError;
pub use poll_table::{PollKey, PollSnapshot, PollVerdict, StaleWatch, StaleWatchBuilder};

pub mod prelude {
    pub use super::{
        PollKey, PollSnapshot, PollVerdict, StaleWatch, StaleWatchBuilder, StaleWatchConfig,
        StaleWatchError,
    };
}
