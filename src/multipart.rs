use crate::buffer::TokenBoundedReader;
use crate::constraints::Constraints;
use crate::field::{Part, PartMetadata};
use crate::state::MultipartState;
use crate::store::{StoreOptions, StoredPart};
use std::io::Read;

/// The byte source and the state machine reading it. Borrowed by the open
/// [`Part`] while its content is read.
pub(crate) struct Decoder<R> {
    pub(crate) reader: TokenBoundedReader<R>,
    pub(crate) state: MultipartState,
    /// Set when reading a part's content failed.
    pub(crate) failed: bool,
}

/// A streaming decoder for `multipart/form-data` bodies.
///
/// This will parse the source into [`Part`] instances one at a time. Only the
/// header block of the current part and a small lookahead window are held in
/// memory, so bodies of any size can be processed. Nested `multipart/mixed`
/// groups are flattened: their inner parts are yielded individually.
///
/// Errors are terminal. Once [`next_part`](Multipart::next_part) fails, or
/// after it has returned `Ok(None)`, further calls return
/// [`Error::NoMoreParts`](crate::Error::NoMoreParts).
///
/// # Examples
///
/// ```
/// use multiform::Multipart;
///
/// # fn run() -> multiform::Result<()> {
/// let data = "--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"my_text_field\"\r\n\r\nabcd\r\n--X-BOUNDARY--\r\n";
/// let mut multipart = Multipart::new(data.as_bytes(), "X-BOUNDARY");
///
/// while let Some(part) = multipart.next_part()? {
///     println!("Part: {:?}", part.text()?)
/// }
/// # Ok(())
/// # }
/// # run().unwrap();
/// ```
pub struct Multipart<R> {
    decoder: Decoder<R>,
    pending: Option<PartMetadata>,
    finished: bool,
    empty_boundary: bool,
}

impl<R: Read> Multipart<R> {
    /// Construct a new `Multipart` instance with the given reader and the
    /// boundary, usually taken from the request's `Content-Type` (see
    /// [`parse_boundary`](crate::parse_boundary)).
    ///
    /// The caller stays responsible for closing the source.
    pub fn new<B: AsRef<[u8]>>(reader: R, boundary: B) -> Multipart<R> {
        Multipart::with_constraints(reader, boundary, Constraints::default())
    }

    /// Construct a new `Multipart` instance with the given reader, boundary
    /// and constraints.
    pub fn with_constraints<B: AsRef<[u8]>>(reader: R, boundary: B, constraints: Constraints) -> Multipart<R> {
        let boundary = boundary.as_ref();

        let reader = TokenBoundedReader::new(
            reader,
            constraints.buffer_size,
            constraints.size_limit.whole_stream,
        );
        let state = MultipartState::new(boundary, constraints.size_limit.header_block, constraints.encoding);

        Multipart {
            decoder: Decoder {
                reader,
                state,
                failed: false,
            },
            pending: None,
            finished: false,
            empty_boundary: boundary.is_empty(),
        }
    }

    /// Reads ahead to the next part's headers without handing the part out.
    fn advance(&mut self) -> crate::Result<()> {
        if self.decoder.failed {
            self.finished = true;
        }

        if self.pending.is_some() || self.finished {
            return Ok(());
        }

        if self.empty_boundary {
            self.finished = true;
            return Err(crate::Error::NoBoundary);
        }

        let decoder = &mut self.decoder;
        match decoder.state.next_part(&mut decoder.reader) {
            Ok(meta) => {
                self.pending = meta;
                Ok(())
            }
            Err(err) => {
                debug!("multipart stream failed: {}", err);
                self.finished = true;
                Err(err.into_parse_error())
            }
        }
    }

    /// Returns whether another part follows. Unread content of the previous
    /// part is discarded to find out.
    pub fn has_next(&mut self) -> crate::Result<bool> {
        self.advance()?;
        Ok(self.pending.is_some())
    }

    /// Yields the next [`Part`] if available.
    ///
    /// Returns `Ok(None)` once at the end of the stream.
    pub fn next_part(&mut self) -> crate::Result<Option<Part<'_, R>>> {
        if self.decoder.failed || (self.finished && self.pending.is_none()) {
            self.finished = true;
            return Err(crate::Error::NoMoreParts);
        }

        self.advance()?;

        match self.pending.take() {
            Some(meta) => Ok(Some(Part::new(&mut self.decoder, meta))),
            None => {
                self.finished = true;
                Ok(None)
            }
        }
    }

    /// Stores every remaining part in memory or in temporary files according
    /// to `options`.
    ///
    /// On failure, parts stored so far are dropped and their files removed.
    pub fn store_all(&mut self, options: &StoreOptions) -> crate::Result<Vec<StoredPart>> {
        let mut parts = Vec::new();
        while let Some(part) = self.next_part()? {
            parts.push(part.store(options)?);
        }
        Ok(parts)
    }

    /// Number of bytes of the body consumed so far.
    pub fn bytes_consumed(&self) -> u64 {
        self.decoder.reader.bytes_consumed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATA: &str = "--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"My Field\"\r\n\r\nabcd\r\n--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"File Field\"; filename=\"a-text-file.txt\"\r\nContent-Type: text/plain\r\n\r\nHello world\nHello\r\nWorld\rAgain\r\n--X-BOUNDARY--\r\n";

    #[test]
    fn test_has_next_predicts_next_part() {
        let mut m = Multipart::new(DATA.as_bytes(), "X-BOUNDARY");

        assert_eq!(m.has_next(), Ok(true));
        assert_eq!(m.has_next(), Ok(true));
        assert_eq!(m.next_part().unwrap().unwrap().name(), "My Field");

        assert_eq!(m.has_next(), Ok(true));
        assert_eq!(m.next_part().unwrap().unwrap().name(), "File Field");

        assert_eq!(m.has_next(), Ok(false));
        assert!(m.next_part().unwrap().is_none());
        assert_eq!(m.has_next(), Ok(false));
        assert_eq!(m.next_part().err(), Some(crate::Error::NoMoreParts));
    }

    #[test]
    fn test_failure_is_terminal() {
        let mut m = Multipart::new(&b"--WRONG\r\n"[..], "X-BOUNDARY");
        assert!(matches!(m.next_part(), Err(crate::Error::TokenNotFound { .. })));
        assert_eq!(m.has_next(), Ok(false));
        assert_eq!(m.next_part().err(), Some(crate::Error::NoMoreParts));
    }

    #[test]
    fn test_content_failure_is_terminal() {
        let data = "--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\n0123456789abcdef";
        let constraints = Constraints::new()
            .buffer_size(8)
            .size_limit(crate::SizeLimit::new().whole_stream(66));
        let mut m = Multipart::with_constraints(data.as_bytes(), "X-BOUNDARY", constraints);

        let part = m.next_part().unwrap().unwrap();
        assert!(matches!(part.bytes(), Err(crate::Error::StreamSizeExceeded { .. })));
        assert_eq!(m.has_next(), Ok(false));
        assert_eq!(m.next_part().err(), Some(crate::Error::NoMoreParts));
    }

    #[test]
    fn test_empty_boundary() {
        let mut m = Multipart::new(DATA.as_bytes(), "");
        assert_eq!(m.next_part().err(), Some(crate::Error::NoBoundary));
    }

    #[test]
    fn test_bytes_consumed() {
        let mut m = Multipart::new(DATA.as_bytes(), "X-BOUNDARY");
        while m.next_part().unwrap().is_some() {}
        assert_eq!(m.bytes_consumed(), DATA.len() as u64);
    }
}
