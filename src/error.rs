use std::path::PathBuf;
use thiserror::Error;

/// Errors that stop `rebuild` before (or instead of) watching.
///
/// A command exiting non-zero is not one of these; see [`crate::exec::CommandFailure`].
#[derive(Debug, Error)]
pub enum Error {
    #[error("no command given, expected `rebuild <FILE> <PROGRAM> [ARGS]...` or `rebuild <FILE> -- <TOKENS>...`")]
    MissingCommand,

    #[error("invalid command syntax: {0}")]
    InvalidCommandSyntax(String),

    #[error("cannot watch {path:?}: {source}")]
    WatchSetup {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}

impl Error {
    pub fn watch_setup(path: impl Into<PathBuf>, source: notify::Error) -> Self {
        Error::WatchSetup {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
