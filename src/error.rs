/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Every way encoding can fail.
///
/// All variants are surfaced to the caller; there is no recovery inside
/// the core. A well-formed `(from, to, settings)` triple never produces
/// [`Error::Internal`] -- if it does, it is a bug in the suffix array
/// builder or the bsdiff search, not in caller-supplied data.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Unknown compression selector passed to [`crate::compress::create`].
    #[error("bad compression '{0}'")]
    BadCompression(String),

    /// Unknown patch type passed to the container writer.
    #[error("bad patch type '{0}'")]
    BadPatchType(String),

    /// An in-place planner alignment precondition failed.
    #[error("{field} ({value}) is not a multiple of {modulus}")]
    BadAlignment {
        field: &'static str,
        value: u64,
        modulus: u64,
    },

    /// A size-encoded integer ran past the end of its byte stream.
    #[error("malformed size: stream ended mid-encoding")]
    MalformedSize,

    /// A data-format identifier other than the ones in §6.4 was used.
    #[error("unknown data format id {0}")]
    UnknownDataFormat(u64),

    /// An image ended before the expected number of bytes could be read.
    #[error("short read: expected {expected} bytes, got {got}")]
    ShortRead { expected: usize, got: usize },

    /// An invariant of the SA-IS builder or the bsdiff search was violated.
    #[error("internal invariant violated: {0}")]
    Internal(&'static str),

    /// Propagated I/O failure (e.g. writing the patch to a sink).
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn bad_alignment(field: &'static str, value: u64, modulus: u64) -> Self {
        Error::BadAlignment {
            field,
            value,
            modulus,
        }
    }
}
