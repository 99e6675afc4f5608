use std::fmt::Display;

#[derive(Debug)]
pub enum StaleWatchError {
    BuildErrorNoTagSet,
    Io(std::io::Error),
}

impl Display for StaleWatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StaleWatchError::BuildErrorNoTagSet => {
                write!(f, "Stale watch : Build error  No resource tag set !")
            }
            StaleWatchError::Io(e) => {
                write!(f, "Io error [{:?}]", e.to_string())
            }
        }
    }
}

impl std::error::Error for StaleWatchError {}

impl From<std::io::Error> for StaleWatchError {
    fn from(value: std::io::Error) -> Self {
        StaleWatchError::Io(value)
    }
}
