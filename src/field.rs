use crate::headers::Headers;
use crate::multipart::Decoder;
use bytes::{Bytes, BytesMut};
use encoding_rs::{Encoding, UTF_8};
#[cfg(feature = "json")]
use serde::de::DeserializeOwned;
use std::io::{self, Read};

/// Whether a part carries a plain form value or an uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartKind {
    Field,
    File,
}

/// Everything known about a part once its header block has been read.
#[derive(Debug, Clone)]
pub struct PartMetadata {
    pub(crate) name: String,
    pub(crate) kind: PartKind,
    pub(crate) content_type: Option<String>,
    pub(crate) file_name: Option<String>,
    pub(crate) headers: Headers,
    pub(crate) idx: usize,
}

impl PartMetadata {
    /// The field name, taken from the `Content-Disposition` `name` parameter,
    /// or from the enclosing `multipart/mixed` group for an unnamed
    /// `attachment`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> PartKind {
        self.kind
    }

    pub fn is_file(&self) -> bool {
        self.kind == PartKind::File
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    /// The raw `Content-Type` header value.
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// The `Content-Type` header parsed as [`mime::Mime`], if it is valid.
    pub fn mime(&self) -> Option<mime::Mime> {
        self.content_type.as_deref().and_then(|val| val.parse::<mime::Mime>().ok())
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Position of the part in the stream, counting leaf parts only.
    pub fn index(&self) -> usize {
        self.idx
    }

    pub(crate) fn charset_or(&self, default_encoding: &'static Encoding) -> &'static Encoding {
        self.mime()
            .and_then(|mime| {
                mime.get_param(mime::CHARSET)
                    .and_then(|charset| Encoding::for_label(charset.as_str().as_bytes()))
            })
            .unwrap_or(default_encoding)
    }
}

/// A single part of a multipart stream, with its content readable through
/// [`Read`].
///
/// A `Part` exclusively borrows its [`Multipart`](crate::Multipart), so only
/// one part can be open at a time. Reading stops right before the next
/// boundary; it is impossible to read into the following part.
///
/// Dropping a part without reading all of it is fine: the rest of its content
/// is discarded when the next part is requested. Call [`close`](Part::close)
/// to discard it eagerly and observe any error doing so.
pub struct Part<'a, R> {
    decoder: &'a mut Decoder<R>,
    meta: PartMetadata,
    done: bool,
    closed: bool,
}

impl<'a, R: Read> Part<'a, R> {
    pub(crate) fn new(decoder: &'a mut Decoder<R>, meta: PartMetadata) -> Self {
        Part {
            decoder,
            meta,
            done: false,
            closed: false,
        }
    }

    pub fn metadata(&self) -> &PartMetadata {
        &self.meta
    }

    pub fn name(&self) -> &str {
        self.meta.name()
    }

    pub fn kind(&self) -> PartKind {
        self.meta.kind()
    }

    pub fn file_name(&self) -> Option<&str> {
        self.meta.file_name()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.meta.content_type()
    }

    pub fn mime(&self) -> Option<mime::Mime> {
        self.meta.mime()
    }

    pub fn headers(&self) -> &Headers {
        self.meta.headers()
    }

    pub fn index(&self) -> usize {
        self.meta.index()
    }

    pub(crate) fn encoding(&self) -> &'static Encoding {
        self.decoder.state.encoding
    }

    pub(crate) fn into_metadata(self) -> PartMetadata {
        self.meta
    }

    /// Reads the next chunk of content. `Ok(0)` marks the end of the part.
    pub fn chunk(&mut self, buf: &mut [u8]) -> crate::Result<usize> {
        if self.closed {
            return Err(crate::Error::AlreadyClosed);
        }

        if self.done || buf.is_empty() {
            return Ok(0);
        }

        let decoder = &mut *self.decoder;
        let n = match decoder.state.read_contents(&mut decoder.reader, buf) {
            Ok(n) => n,
            Err(err) => {
                decoder.failed = true;
                return Err(err);
            }
        };
        if n == 0 {
            self.done = true;
        }

        Ok(n)
    }

    /// Reads the whole content into memory.
    pub fn bytes(mut self) -> crate::Result<Bytes> {
        let mut buf = BytesMut::new();
        let mut chunk = vec![0u8; self.decoder.reader.chunk_size];

        loop {
            let n = self.chunk(&mut chunk)?;
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }

        Ok(buf.freeze())
    }

    #[cfg(feature = "json")]
    #[cfg_attr(nightly, doc(cfg(feature = "json")))]
    pub fn json<T: DeserializeOwned>(self) -> crate::Result<T> {
        let bytes = self.bytes()?;
        serde_json::from_slice(&bytes).map_err(crate::Error::DecodeJson)
    }

    /// Reads the whole content as text, using the charset of the part's
    /// `Content-Type` or else the decoder's encoding.
    pub fn text(self) -> crate::Result<String> {
        let fallback = self.encoding();
        self.decode_text(fallback)
    }

    /// Like [`text`](Part::text), falling back to `default_encoding` when the
    /// part declares no known charset.
    pub fn text_with_charset(self, default_encoding: &str) -> crate::Result<String> {
        let fallback = Encoding::for_label(default_encoding.as_bytes()).unwrap_or(UTF_8);
        self.decode_text(fallback)
    }

    fn decode_text(self, fallback: &'static Encoding) -> crate::Result<String> {
        let encoding = self.meta.charset_or(fallback);
        let bytes = self.bytes()?;
        let (text, _, _) = encoding.decode(&bytes);

        Ok(text.into_owned())
    }

    /// Discards any unread content so the decoder is positioned at the next
    /// boundary. Reading after this fails with
    /// [`Error::AlreadyClosed`](crate::Error::AlreadyClosed).
    pub fn close(&mut self) -> crate::Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        if self.done {
            return Ok(());
        }
        self.done = true;

        let decoder = &mut *self.decoder;
        decoder.state.skip_contents(&mut decoder.reader).map_err(|err| {
            decoder.failed = true;
            err.into_parse_error()
        })
    }
}

impl<'a, R: Read> Read for Part<'a, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.chunk(buf).map_err(crate::Error::into_io_error)
    }
}
