pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("out of memory allocating {what}")]
    OutOfMemory { what: &'static str },

    #[error("failed to spawn worker {index}: {source}")]
    Spawn {
        index: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("scheduler {label} is shut down")]
    ShutDown { label: String },

    #[error("sync error: {0}")]
    Sync(String),
}

impl Error {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    pub fn sync<S: Into<String>>(msg: S) -> Self {
        Error::Sync(msg.into())
    }

    pub(crate) fn out_of_memory(what: &'static str) -> Self {
        Error::OutOfMemory { what }
    }
}
