use crate::constants;
use bytes::{Buf, Bytes, BytesMut};
use memchr::memmem;
use std::io::{self, Read};

/// Result of a single content read against a delimiting token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReadOutcome {
    /// This many bytes were copied, all of them strictly before the token.
    Data(usize),
    /// The upcoming bytes are exactly the token; nothing was consumed.
    Token,
    /// The underlying source is exhausted and the token never showed up.
    Eof,
}

/// A lookahead buffer over a blocking byte source.
///
/// Bytes are pulled from the source in chunks of `chunk_size` and kept in
/// `buf` until consumed, so a token straddling two underlying reads is still
/// matched, and a failed match never loses bytes.
pub(crate) struct TokenBoundedReader<R> {
    pub(crate) eof: bool,
    pub(crate) buf: BytesMut,
    pub(crate) reader: R,
    pub(crate) chunk_size: usize,
    pub(crate) whole_stream_size_limit: u64,
    pub(crate) fetched: u64,
    pub(crate) consumed: u64,
}

impl<R: Read> TokenBoundedReader<R> {
    pub fn new(reader: R, chunk_size: usize, whole_stream_size_limit: u64) -> Self {
        TokenBoundedReader {
            eof: false,
            buf: BytesMut::with_capacity(chunk_size),
            reader,
            chunk_size: chunk_size.max(1),
            whole_stream_size_limit,
            fetched: 0,
            consumed: 0,
        }
    }

    /// Number of bytes consumed since construction. Bytes that are only
    /// buffered as lookahead are not counted.
    pub fn bytes_consumed(&self) -> u64 {
        self.consumed
    }

    /// Pulls one more chunk from the source. Never asks the source for more
    /// than one byte past the whole-stream limit, so exceeding it is noticed
    /// right at the crossing point.
    fn fill_chunk(&mut self) -> crate::Result<()> {
        if self.eof {
            return Ok(());
        }

        let remaining = self.whole_stream_size_limit.saturating_sub(self.fetched).saturating_add(1);
        let want = std::cmp::min(self.chunk_size as u64, remaining) as usize;

        let start = self.buf.len();
        self.buf.resize(start + want, 0);

        let read = loop {
            match self.reader.read(&mut self.buf[start..]) {
                Ok(n) => break n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    self.buf.truncate(start);
                    return Err(crate::Error::StreamReadFailed(err));
                }
            }
        };

        self.buf.truncate(start + read);

        if read == 0 {
            self.eof = true;
            return Ok(());
        }

        self.fetched += read as u64;
        if self.fetched > self.whole_stream_size_limit {
            return Err(crate::Error::StreamSizeExceeded {
                limit: self.whole_stream_size_limit,
            });
        }

        Ok(())
    }

    /// Makes sure at least `size` bytes are buffered, unless the source ends first.
    fn fill(&mut self, size: usize) -> crate::Result<()> {
        while self.buf.len() < size && !self.eof {
            self.fill_chunk()?;
        }
        Ok(())
    }

    fn consume(&mut self, size: usize) {
        self.buf.advance(size);
        self.consumed += size as u64;
    }

    /// Consumes `token` if the stream continues with exactly those bytes.
    /// Otherwise nothing is consumed and `false` is returned, including when
    /// the stream ends before a decision can be made.
    pub fn matches(&mut self, token: &[u8]) -> crate::Result<bool> {
        self.fill(token.len())?;

        if self.buf.starts_with(token) {
            self.consume(token.len());
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Reads all bytes up to the next `token`, consuming the token as well but
    /// returning only what precedes it. At most `max_size` bytes may precede
    /// the token.
    pub fn read_until(&mut self, token: &[u8], max_size: usize) -> crate::Result<Bytes> {
        let window_max = max_size.saturating_add(token.len());
        let mut searched: usize = 0;

        loop {
            let window = std::cmp::min(self.buf.len(), window_max);

            // Resume the scan just before the previous window end so a token
            // split across two fills is still found.
            let from = searched.saturating_sub(token.len().saturating_sub(1));
            if let Some(idx) = memmem::find(&self.buf[from..window], token) {
                let idx = from + idx;
                let bytes = self.buf.split_to(idx).freeze();
                self.consumed += idx as u64;
                self.consume(token.len());
                return Ok(bytes);
            }
            searched = window;

            if window >= window_max || self.eof {
                return Err(crate::Error::token_not_found(format!(
                    "{:?} within {} bytes",
                    String::from_utf8_lossy(token),
                    max_size
                )));
            }

            self.fill_chunk()?;
        }
    }

    /// Copies as many bytes as are known to precede `token` into `out`. When
    /// the upcoming bytes are exactly `token` nothing is consumed and
    /// [`ReadOutcome::Token`] is returned; the token itself is left for the
    /// caller to [`match`](Self::matches).
    pub fn read_unless_token(&mut self, token: &[u8], out: &mut [u8]) -> crate::Result<ReadOutcome> {
        if out.is_empty() {
            return Ok(ReadOutcome::Data(0));
        }

        loop {
            self.fill(token.len())?;

            let available = match memmem::find(&self.buf, token) {
                Some(0) => return Ok(ReadOutcome::Token),
                Some(idx) => idx,
                // Everything except a possible token prefix at the very end is content.
                None if !self.eof => self.buf.len().saturating_sub(token.len().saturating_sub(1)),
                None if self.buf.is_empty() => return Ok(ReadOutcome::Eof),
                None => self.buf.len(),
            };

            if available == 0 {
                self.fill_chunk()?;
                continue;
            }

            let size = std::cmp::min(available, out.len());
            out[..size].copy_from_slice(&self.buf[..size]);
            self.consume(size);
            return Ok(ReadOutcome::Data(size));
        }
    }

    /// Discards bytes up to the next `token` or the end of the source.
    pub fn skip_until_token(&mut self, token: &[u8]) -> crate::Result<ReadOutcome> {
        let mut scratch = [0u8; constants::DEFAULT_BUFFER_SIZE];
        loop {
            match self.read_unless_token(token, &mut scratch)? {
                ReadOutcome::Data(_) => continue,
                outcome => return Ok(outcome),
            }
        }
    }
}
