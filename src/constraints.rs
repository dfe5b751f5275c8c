use crate::constants;
use crate::size_limit::SizeLimit;
use encoding_rs::{Encoding, UTF_8};

/// Represents the constraints a [`Multipart`](crate::Multipart) decoder is
/// bound to.
///
/// # Examples
///
/// ```
/// use multiform::{Constraints, Multipart, SizeLimit};
///
/// let data = "--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"my_text_field\"\r\n\r\nabcd\r\n--X-BOUNDARY--\r\n";
///
/// let constraints = Constraints::new()
///     .size_limit(SizeLimit::new().whole_stream(15 * 1024 * 1024).header_block(4 * 1024))
///     .encoding(encoding_rs::WINDOWS_1252);
///
/// let mut multipart = Multipart::with_constraints(data.as_bytes(), "X-BOUNDARY", constraints);
/// # let part = multipart.next_part().unwrap().unwrap();
/// # assert_eq!(part.text().unwrap(), "abcd");
/// ```
#[derive(Debug, Clone)]
pub struct Constraints {
    pub(crate) size_limit: SizeLimit,
    pub(crate) encoding: &'static Encoding,
    pub(crate) buffer_size: usize,
}

impl Constraints {
    /// Creates a set of rules with default behaviour.
    pub fn new() -> Constraints {
        Constraints::default()
    }

    /// Applies rules on the stream and header block sizes.
    pub fn size_limit(mut self, size_limit: SizeLimit) -> Constraints {
        self.size_limit = size_limit;
        self
    }

    /// Sets the character encoding used to decode header lines, and the
    /// default charset of [`Part::text`](crate::Part::text).
    pub fn encoding(mut self, encoding: &'static Encoding) -> Constraints {
        self.encoding = encoding;
        self
    }

    /// Sets how many bytes are requested from the source per read.
    pub fn buffer_size(mut self, size: usize) -> Constraints {
        self.buffer_size = size.max(1);
        self
    }
}

impl Default for Constraints {
    fn default() -> Self {
        Constraints {
            size_limit: SizeLimit::default(),
            encoding: UTF_8,
            buffer_size: constants::DEFAULT_BUFFER_SIZE,
        }
    }
}
