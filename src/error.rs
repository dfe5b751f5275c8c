use std::fmt::{self, Debug, Display, Formatter};
use std::io;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A set of errors that can occur while decoding or encoding a multipart
/// stream and in other operations.
#[non_exhaustive]
pub enum Error {
    /// An expected literal (field separator, boundary or stream terminator)
    /// was absent at the expected stream position.
    TokenNotFound { expected: String },

    /// The stream violates the multipart grammar, or an I/O failure happened
    /// while advancing to the next part.
    ParseError { reason: String, cause: Option<BoxError> },

    /// Reading from the underlying source failed.
    StreamReadFailed(io::Error),

    /// The incoming stream size exceeded the maximum limit.
    StreamSizeExceeded { limit: u64 },

    /// A part's content was read after the part was closed.
    AlreadyClosed,

    /// The part sequence was advanced past its end.
    NoMoreParts,

    /// [`close_group`](crate::MultipartEncoder::close_group) was called
    /// without an open group.
    NoOpenGroup,

    /// Raw bytes were requested from a part spilled to disk.
    NotInMemory,

    /// Creating or writing the temporary file of a stored part failed.
    TempFile(io::Error),

    /// Deleting the temporary file of a stored part failed.
    DeleteFailed(io::Error),

    /// No random boundary could be generated.
    RandomBoundary(getrandom::Error),

    /// The `Content-Type` header is not `multipart/form-data`.
    NoMultipart,

    /// Failed to convert the `Content-Type` to [`mime::Mime`] type.
    DecodeContentType(mime::FromStrError),

    /// No boundary found in `Content-Type` header, or an empty boundary was
    /// supplied.
    NoBoundary,

    /// Failed to decode the part data as `JSON` in
    /// [`part.json()`](crate::Part::json) method.
    #[cfg(feature = "json")]
    #[cfg_attr(nightly, doc(cfg(feature = "json")))]
    DecodeJson(serde_json::Error),
}

impl Error {
    pub(crate) fn token_not_found<T: Into<String>>(expected: T) -> Error {
        Error::TokenNotFound {
            expected: expected.into(),
        }
    }

    pub(crate) fn parse<T: Into<String>>(reason: T) -> Error {
        Error::ParseError {
            reason: reason.into(),
            cause: None,
        }
    }

    /// Raw read failures surface as parse errors once they reach the part
    /// iteration layer.
    pub(crate) fn into_parse_error(self) -> Error {
        match self {
            Error::StreamReadFailed(err) => Error::ParseError {
                reason: "failed to read from the underlying stream".to_owned(),
                cause: Some(err.into()),
            },
            other => other,
        }
    }

    pub(crate) fn into_io_error(self) -> io::Error {
        match self {
            Error::StreamReadFailed(err) => err,
            Error::AlreadyClosed => io::Error::new(io::ErrorKind::Other, Error::AlreadyClosed),
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Error::TokenNotFound { expected } => write!(f, "expected token not found: {}", expected),
            Error::ParseError { reason, cause: None } => write!(f, "failed to parse multipart stream: {}", reason),
            Error::ParseError {
                reason,
                cause: Some(cause),
            } => write!(f, "failed to parse multipart stream: {}: {}", reason, cause),
            Error::StreamReadFailed(err) => write!(f, "stream read failed: {}", err),
            Error::StreamSizeExceeded { limit } => {
                write!(f, "stream size exceeded the maximum limit: {} bytes", limit)
            }
            Error::AlreadyClosed => f.write_str("part content already closed"),
            Error::NoMoreParts => f.write_str("no more parts in this multipart stream"),
            Error::NoOpenGroup => f.write_str("no open multipart/mixed group to close"),
            Error::NotInMemory => f.write_str("cannot get bytes from a part stored on disk"),
            Error::TempFile(err) => write!(f, "failed to write temporary file: {}", err),
            Error::DeleteFailed(err) => write!(f, "failed to delete temporary file: {}", err),
            Error::RandomBoundary(err) => write!(f, "failed to generate a random boundary: {}", err),
            Error::NoMultipart => f.write_str("Content-Type is not multipart/form-data"),
            Error::DecodeContentType(err) => {
                write!(f, "Failed to convert Content-Type to `mime::Mime` type: {}", err)
            }
            Error::NoBoundary => f.write_str("multipart boundary not found in Content-Type"),
            #[cfg(feature = "json")]
            Error::DecodeJson(err) => write!(f, "failed to decode part data as JSON: {}", err),
        }
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::ParseError { cause: Some(cause), .. } => Some(cause.as_ref()),
            Error::StreamReadFailed(err) | Error::TempFile(err) | Error::DeleteFailed(err) => Some(err),
            _ => None,
        }
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.to_string().eq(&other.to_string())
    }
}

impl Eq for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_failure_becomes_parse_error() {
        let err = Error::StreamReadFailed(io::Error::new(io::ErrorKind::BrokenPipe, "gone")).into_parse_error();
        assert!(matches!(err, Error::ParseError { cause: Some(_), .. }));
        assert_eq!(
            err.to_string(),
            "failed to parse multipart stream: failed to read from the underlying stream: gone"
        );

        assert_eq!(Error::NoMoreParts.into_parse_error(), Error::NoMoreParts);
    }

    #[test]
    fn test_into_io_error_keeps_kind() {
        let err = Error::StreamReadFailed(io::Error::new(io::ErrorKind::TimedOut, "slow")).into_io_error();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);

        let err = Error::parse("bad").into_io_error();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
