use thiserror::Error;

/// Internal failures of the pipeline. Everything the user wrote wrong is
/// a [`Diagnostic`](super::Diagnostic) instead.
#[derive(Error, Debug)]
pub enum Error {
    #[error("The semantic stack is empty while {0}")]
    StackUnderflow(&'static str),

    #[error("A compiler bug was detected: {msg}")]
    CompilerBug { msg: String },

    #[error("No consumer accepted the same input after {0} attempts")]
    Livelock(usize),

    #[error("Could not serialize an object: {0}")]
    Serialize(#[from] postcard::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

macro_rules! compiler_bug {
    ($msg:literal $(, $args: expr)*) => {
        return Err($crate::core::Error::CompilerBug {
            msg: format!($msg $(, $args)*),
        })
    };
}

pub(crate) use compiler_bug;
