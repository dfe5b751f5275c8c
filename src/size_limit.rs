use crate::constants;

/// Represents size limits of the stream to prevent DoS attacks.
///
/// Please refer [`Constraints`](crate::Constraints) for more info.
#[derive(Debug, Clone)]
pub struct SizeLimit {
    pub(crate) whole_stream: u64,
    pub(crate) header_block: usize,
}

impl SizeLimit {
    /// Creates a default size limit which is [`u64::MAX`] for the whole stream
    /// and 10 KiB for each part's header block.
    pub fn new() -> SizeLimit {
        SizeLimit::default()
    }

    /// Sets size limit for the whole stream. Parsing fails with
    /// [`Error::StreamSizeExceeded`](crate::Error::StreamSizeExceeded) as soon
    /// as more bytes than this are read from the source.
    pub fn whole_stream(mut self, limit: u64) -> SizeLimit {
        self.whole_stream = limit;
        self
    }

    /// Sets size limit for the header block of each part, line terminators
    /// included.
    ///
    /// Headers are the only part of the stream held in memory as a whole, so
    /// this bounds what a single part can make the parser buffer.
    pub fn header_block(mut self, limit: usize) -> SizeLimit {
        self.header_block = limit;
        self
    }
}

impl Default for SizeLimit {
    fn default() -> Self {
        SizeLimit {
            whole_stream: constants::DEFAULT_WHOLE_STREAM_SIZE_LIMIT,
            header_block: constants::DEFAULT_HEADER_BLOCK_SIZE_LIMIT,
        }
    }
}
