use crate::constants;
use crate::helpers::encode;
use bytes::{Buf, Bytes, BytesMut};
use encoding_rs::{Encoding, UTF_8};
use std::collections::VecDeque;
use std::fmt::Write as _;
use std::io::{self, Read};

const CONTENT_DISPOSITION: &str = "Content-Disposition";
const CONTENT_TYPE: &str = "Content-Type";

/// Generates a boundary from 16 random bytes, formatted like a version 4 UUID.
pub fn random_boundary() -> crate::Result<String> {
    let mut raw = [0u8; 16];
    getrandom::getrandom(&mut raw).map_err(crate::Error::RandomBoundary)?;

    raw[6] = (raw[6] & 0x0f) | 0x40;
    raw[8] = (raw[8] & 0x3f) | 0x80;

    let mut boundary = String::with_capacity(36);
    for (i, byte) in raw.iter().enumerate() {
        if i == 4 || i == 6 || i == 8 || i == 10 {
            boundary.push('-');
        }
        let _ = write!(boundary, "{:02x}", byte);
    }
    Ok(boundary)
}

enum Source<'a> {
    Bytes(Bytes),
    Reader(Box<dyn Read + Send + 'a>),
}

/// Builds a `multipart/form-data` body.
///
/// Header bytes are buffered; part contents given as readers are not read
/// until the body returned by [`finish`](MultipartEncoder::finish) is.
///
/// Names, file names and boundaries are written verbatim between double
/// quotes. They must not contain `"` or line breaks.
///
/// # Examples
///
/// ```
/// use multiform::{Multipart, MultipartEncoder};
/// use std::io::Read;
///
/// # fn run() -> multiform::Result<()> {
/// let mut encoder = MultipartEncoder::new("X-BOUNDARY");
/// encoder
///     .field("name", "Larry", &[])
///     .open_group("files", "Y-BOUNDARY")
///     .attachment("file1.txt", "text/plain", "contents of file1".as_bytes(), &[])
///     .close_group()?;
///
/// let mut body = Vec::new();
/// encoder.finish().read_to_end(&mut body).unwrap();
///
/// let mut multipart = Multipart::new(&body[..], "X-BOUNDARY");
/// assert_eq!(multipart.next_part()?.unwrap().text()?, "Larry");
///
/// let part = multipart.next_part()?.unwrap();
/// assert_eq!(part.name(), "files");
/// assert_eq!(part.file_name(), Some("file1.txt"));
/// # Ok(())
/// # }
/// # run().unwrap();
/// ```
pub struct MultipartEncoder<'a> {
    boundary: String,
    encoding: &'static Encoding,
    /// `--boundary` of the root and of every open group, innermost last.
    boundaries: Vec<Bytes>,
    sources: Vec<Source<'a>>,
    pending: BytesMut,
}

impl<'a> MultipartEncoder<'a> {
    /// Creates an encoder writing UTF-8 headers and field values.
    pub fn new<B: Into<String>>(boundary: B) -> MultipartEncoder<'a> {
        MultipartEncoder::with_encoding(boundary, UTF_8)
    }

    /// Creates an encoder writing headers and field values in `encoding`.
    pub fn with_encoding<B: Into<String>>(boundary: B, encoding: &'static Encoding) -> MultipartEncoder<'a> {
        let boundary = boundary.into();
        let root = Bytes::from(constants::prepend_boundary_ext(&encode(encoding, &boundary)));

        MultipartEncoder {
            boundary,
            encoding,
            boundaries: vec![root],
            sources: Vec::new(),
            pending: BytesMut::new(),
        }
    }

    /// Creates an encoder with a [`random_boundary`].
    pub fn with_random_boundary() -> crate::Result<MultipartEncoder<'a>> {
        random_boundary().map(MultipartEncoder::new)
    }

    /// The root boundary.
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// The `Content-Type` value announcing this body.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    fn add(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    fn add_str(&mut self, s: &str) {
        let (bytes, _, _) = self.encoding.encode(s);
        self.pending.extend_from_slice(&bytes);
    }

    fn add_reader(&mut self, reader: Box<dyn Read + Send + 'a>) {
        if !self.pending.is_empty() {
            let bytes = self.pending.split().freeze();
            self.sources.push(Source::Bytes(bytes));
        }
        self.sources.push(Source::Reader(reader));
    }

    fn add_boundary_line(&mut self) {
        let boundary = self.boundaries[self.boundaries.len() - 1].clone();
        self.add(&boundary);
        self.add(constants::CRLF);
    }

    fn add_header(&mut self, name: &str, value: &str) {
        self.add_str(name);
        self.add(b": ");
        self.add_str(value);
        self.add(constants::CRLF);
    }

    fn add_headers(&mut self, headers: &[(&str, &str)]) {
        for &(name, value) in headers {
            self.add_header(name, value);
        }
    }

    /// Writes a part with the given headers, which should include a
    /// `Content-Disposition`.
    pub fn part<C: Read + Send + 'a>(&mut self, contents: C, headers: &[(&str, &str)]) -> &mut Self {
        self.add_boundary_line();
        self.add_headers(headers);
        self.add(constants::CRLF);
        self.add_reader(Box::new(contents));
        self.add(constants::CRLF);
        self
    }

    /// Writes a text field.
    pub fn field(&mut self, name: &str, value: &str, headers: &[(&str, &str)]) -> &mut Self {
        let disposition = format!("form-data; name=\"{}\"", name);

        self.add_boundary_line();
        self.add_header(CONTENT_DISPOSITION, &disposition);
        self.add_headers(headers);
        self.add(constants::CRLF);
        self.add_str(value);
        self.add(constants::CRLF);
        self
    }

    /// Writes a file upload whose content is streamed from `contents`.
    pub fn file<C: Read + Send + 'a>(
        &mut self,
        field_name: &str,
        file_name: &str,
        content_type: &str,
        contents: C,
        headers: &[(&str, &str)],
    ) -> &mut Self {
        let disposition = format!("form-data; name=\"{}\"; filename=\"{}\"", field_name, file_name);
        let mut all = vec![(CONTENT_DISPOSITION, disposition.as_str()), (CONTENT_TYPE, content_type)];
        all.extend_from_slice(headers);
        self.part(contents, &all)
    }

    /// Writes an `attachment` part. Inside a group opened with
    /// [`open_group`](MultipartEncoder::open_group) the decoder names it after
    /// the group.
    pub fn attachment<C: Read + Send + 'a>(
        &mut self,
        file_name: &str,
        content_type: &str,
        contents: C,
        headers: &[(&str, &str)],
    ) -> &mut Self {
        let disposition = format!("attachment; filename=\"{}\"", file_name);
        let mut all = vec![(CONTENT_DISPOSITION, disposition.as_str()), (CONTENT_TYPE, content_type)];
        all.extend_from_slice(headers);
        self.part(contents, &all)
    }

    /// Starts a `multipart/mixed` group named `field_name`. Parts written
    /// until the matching [`close_group`](MultipartEncoder::close_group) use
    /// `sub_boundary`.
    pub fn open_group(&mut self, field_name: &str, sub_boundary: &str) -> &mut Self {
        let disposition = format!("form-data; name=\"{}\"", field_name);
        let content_type = format!("{}; boundary=\"{}\"", constants::MULTIPART_MIXED, sub_boundary);

        self.add_boundary_line();
        self.add_header(CONTENT_DISPOSITION, &disposition);
        self.add_header(CONTENT_TYPE, &content_type);
        self.add(constants::CRLF);

        let sub_boundary = constants::prepend_boundary_ext(&encode(self.encoding, sub_boundary));
        self.boundaries.push(Bytes::from(sub_boundary));
        self
    }

    fn add_terminator(&mut self) {
        let boundary = self.boundaries[self.boundaries.len() - 1].clone();
        self.add(&boundary);
        self.add(constants::BOUNDARY_EXT);
        self.add(constants::CRLF);
    }

    /// Ends the innermost open group.
    pub fn close_group(&mut self) -> crate::Result<&mut Self> {
        if self.boundaries.len() <= 1 {
            return Err(crate::Error::NoOpenGroup);
        }

        self.add_terminator();
        self.boundaries.pop();
        Ok(self)
    }

    /// Ends the body, closing any group still open, and returns it as a
    /// reader.
    pub fn finish(mut self) -> MultipartBody<'a> {
        while self.boundaries.len() > 1 {
            self.add_terminator();
            self.boundaries.pop();
        }
        self.add_terminator();

        let mut sources: VecDeque<Source<'a>> = self.sources.into_iter().collect();
        sources.push_back(Source::Bytes(self.pending.freeze()));

        MultipartBody { sources }
    }
}

/// An encoded multipart body, produced lazily as it is read.
pub struct MultipartBody<'a> {
    sources: VecDeque<Source<'a>>,
}

impl<'a> Read for MultipartBody<'a> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        while let Some(source) = self.sources.front_mut() {
            let n = match source {
                Source::Bytes(bytes) => {
                    let n = std::cmp::min(bytes.len(), buf.len());
                    bytes.copy_to_slice(&mut buf[..n]);
                    n
                }
                Source::Reader(reader) => reader.read(buf)?,
            };

            if n > 0 {
                return Ok(n);
            }
            self.sources.pop_front();
        }

        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(encoder: MultipartEncoder<'_>) -> String {
        let mut out = String::new();
        encoder.finish().read_to_string(&mut out).unwrap();
        out
    }

    #[test]
    fn test_field_and_file() {
        let mut encoder = MultipartEncoder::new("B");
        encoder
            .field("name", "value", &[("X-Extra", "1")])
            .file("upload", "a.txt", "text/plain", "file data".as_bytes(), &[]);

        assert_eq!(
            render(encoder),
            "--B\r\n\
Content-Disposition: form-data; name=\"name\"\r\n\
X-Extra: 1\r\n\
\r\n\
value\r\n\
--B\r\n\
Content-Disposition: form-data; name=\"upload\"; filename=\"a.txt\"\r\n\
Content-Type: text/plain\r\n\
\r\n\
file data\r\n\
--B--\r\n"
        );
    }

    #[test]
    fn test_groups() {
        let mut encoder = MultipartEncoder::new("B");
        encoder
            .open_group("files", "C")
            .attachment("x.gif", "image/gif", &b"GIF"[..], &[])
            .close_group()
            .unwrap();

        assert_eq!(
            render(encoder),
            "--B\r\n\
Content-Disposition: form-data; name=\"files\"\r\n\
Content-Type: multipart/mixed; boundary=\"C\"\r\n\
\r\n\
--C\r\n\
Content-Disposition: attachment; filename=\"x.gif\"\r\n\
Content-Type: image/gif\r\n\
\r\n\
GIF\r\n\
--C--\r\n\
--B--\r\n"
        );
    }

    #[test]
    fn test_close_group_without_open_group() {
        let mut encoder = MultipartEncoder::new("B");
        assert!(matches!(encoder.close_group(), Err(crate::Error::NoOpenGroup)));

        encoder.open_group("g", "C");
        assert!(encoder.close_group().is_ok());
        assert!(matches!(encoder.close_group(), Err(crate::Error::NoOpenGroup)));
    }

    #[test]
    fn test_finish_closes_open_groups() {
        let mut encoder = MultipartEncoder::new("B");
        encoder.open_group("outer", "C").open_group("inner", "D");

        let body = render(encoder);
        assert!(body.ends_with("--D--\r\n--C--\r\n--B--\r\n"));
    }

    #[test]
    fn test_empty_body() {
        assert_eq!(render(MultipartEncoder::new("B")), "--B--\r\n");
    }

    #[test]
    fn test_random_boundary() {
        let a = random_boundary().unwrap();
        let b = random_boundary().unwrap();
        assert_ne!(a, b);
        assert_eq!(a.len(), 36);
        assert_eq!(a.as_bytes()[14], b'4');

        let encoder = MultipartEncoder::with_random_boundary().unwrap();
        assert_eq!(encoder.content_type(), format!("multipart/form-data; boundary={}", encoder.boundary()));
    }

    #[test]
    fn test_body_reads_in_small_chunks() {
        let mut encoder = MultipartEncoder::new("B");
        encoder.file("f", "f.bin", "application/octet-stream", &[0u8, 1, 2, 3, 4][..], &[]);

        let mut body = encoder.finish();
        let mut out = Vec::new();
        let mut buf = [0u8; 3];
        loop {
            let n = body.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }

        assert!(out.windows(5).any(|w| w == [0u8, 1, 2, 3, 4]));
        assert!(out.ends_with(b"\r\n--B--\r\n"));
    }
}
