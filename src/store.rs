use crate::constants;
use crate::field::{Part, PartKind, PartMetadata};
use crate::headers::Headers;
use bytes::{Bytes, BytesMut};
use encoding_rs::Encoding;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tempfile::TempPath;

/// Decides where [`Part::store`] puts a part's content.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub(crate) disk_threshold: usize,
    pub(crate) temp_dir: Option<PathBuf>,
}

impl StoreOptions {
    /// Keeps parts up to 1000 KiB in memory and spills larger ones into the
    /// system temporary directory.
    pub fn new() -> StoreOptions {
        StoreOptions::default()
    }

    /// Parts whose content exceeds this many bytes are written to disk.
    pub fn disk_threshold(mut self, threshold: usize) -> StoreOptions {
        self.disk_threshold = threshold;
        self
    }

    /// Directory for the temporary files of spilled parts.
    pub fn temp_dir<P: Into<PathBuf>>(mut self, dir: P) -> StoreOptions {
        self.temp_dir = Some(dir.into());
        self
    }
}

impl Default for StoreOptions {
    fn default() -> Self {
        StoreOptions {
            disk_threshold: constants::DEFAULT_DISK_THRESHOLD,
            temp_dir: None,
        }
    }
}

/// Where a stored part's content lives.
#[derive(Debug)]
pub enum StoredContent {
    InMemory(Bytes),
    /// A temporary file owned by the part, removed by [`StoredPart::close`]
    /// (or on drop, ignoring failures).
    OnDisk { path: TempPath, len: u64 },
}

/// A part whose content has been fully read off the stream.
#[derive(Debug)]
pub struct StoredPart {
    meta: PartMetadata,
    content: StoredContent,
    encoding: &'static Encoding,
}

impl<'a, R: Read> Part<'a, R> {
    /// Reads the whole part, keeping it in memory unless it grows past the
    /// configured threshold, in which case everything is written to a
    /// temporary file instead.
    pub fn store(mut self, options: &StoreOptions) -> crate::Result<StoredPart> {
        let encoding = self.encoding();
        let mut buf = BytesMut::new();
        let mut chunk = vec![0u8; constants::DEFAULT_BUFFER_SIZE];

        loop {
            let n = self.chunk(&mut chunk)?;
            if n == 0 {
                return Ok(StoredPart {
                    meta: self.into_metadata(),
                    content: StoredContent::InMemory(buf.freeze()),
                    encoding,
                });
            }

            buf.extend_from_slice(&chunk[..n]);
            if buf.len() > options.disk_threshold {
                break;
            }
        }

        let mut builder = tempfile::Builder::new();
        builder.prefix("multiform-").suffix(".part");
        let mut file = match options.temp_dir {
            Some(ref dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(crate::Error::TempFile)?;

        file.write_all(&buf).map_err(crate::Error::TempFile)?;
        let mut len = buf.len() as u64;

        loop {
            let n = self.chunk(&mut chunk)?;
            if n == 0 {
                break;
            }
            file.write_all(&chunk[..n]).map_err(crate::Error::TempFile)?;
            len += n as u64;
        }
        file.flush().map_err(crate::Error::TempFile)?;

        debug!("stored part {:?} ({} bytes) in {:?}", self.name(), len, file.path());

        Ok(StoredPart {
            meta: self.into_metadata(),
            content: StoredContent::OnDisk {
                path: file.into_temp_path(),
                len,
            },
            encoding,
        })
    }
}

impl StoredPart {
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

    pub fn headers(&self) -> &Headers {
        self.meta.headers()
    }

    pub fn content(&self) -> &StoredContent {
        &self.content
    }

    pub fn is_in_memory(&self) -> bool {
        matches!(self.content, StoredContent::InMemory(_))
    }

    /// Size of the content in bytes.
    pub fn len(&self) -> u64 {
        match self.content {
            StoredContent::InMemory(ref bytes) => bytes.len() as u64,
            StoredContent::OnDisk { len, .. } => len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Path of the temporary file, for parts stored on disk.
    pub fn path(&self) -> Option<&Path> {
        match self.content {
            StoredContent::InMemory(_) => None,
            StoredContent::OnDisk { ref path, .. } => Some(&**path),
        }
    }

    /// The in-memory content. Fails with
    /// [`Error::NotInMemory`](crate::Error::NotInMemory) for parts on disk;
    /// use [`reader`](StoredPart::reader) for those.
    pub fn bytes(&self) -> crate::Result<&Bytes> {
        match self.content {
            StoredContent::InMemory(ref bytes) => Ok(bytes),
            StoredContent::OnDisk { .. } => Err(crate::Error::NotInMemory),
        }
    }

    /// Opens a fresh reader over the content.
    pub fn reader(&self) -> crate::Result<Box<dyn Read + '_>> {
        match self.content {
            StoredContent::InMemory(ref bytes) => Ok(Box::new(&bytes[..])),
            StoredContent::OnDisk { ref path, .. } => {
                let file = File::open(path).map_err(crate::Error::TempFile)?;
                Ok(Box::new(io::BufReader::new(file)))
            }
        }
    }

    /// The content as text, using the part's declared charset or else the
    /// decoder's encoding.
    pub fn text(&self) -> crate::Result<String> {
        let encoding = self.meta.charset_or(self.encoding);

        let mut raw = Vec::with_capacity(self.len() as usize);
        self.reader()?.read_to_end(&mut raw).map_err(crate::Error::TempFile)?;

        let (text, _, _) = encoding.decode(&raw);
        Ok(text.into_owned())
    }

    /// Releases the content, deleting the temporary file of a part stored on
    /// disk. A failed delete is reported.
    pub fn close(self) -> crate::Result<()> {
        match self.content {
            StoredContent::InMemory(_) => Ok(()),
            StoredContent::OnDisk { path, .. } => path.close().map_err(crate::Error::DeleteFailed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Multipart;

    fn body(content: &str) -> String {
        format!(
            "--B\r\nContent-Disposition: form-data; name=\"small\"\r\n\r\nhi\r\n--B\r\nContent-Disposition: form-data; name=\"big\"; filename=\"big.txt\"\r\nContent-Type: text/plain; charset=utf-8\r\n\r\n{}\r\n--B--\r\n",
            content
        )
    }

    #[test]
    fn test_small_parts_stay_in_memory() {
        let data = body("0123456789");
        let mut m = Multipart::new(data.as_bytes(), "B");
        let parts = m.store_all(&StoreOptions::new()).unwrap();

        assert_eq!(parts.len(), 2);
        assert!(parts.iter().all(StoredPart::is_in_memory));
        assert_eq!(parts[0].bytes().unwrap(), &Bytes::from_static(b"hi"));
        assert_eq!(parts[1].text().unwrap(), "0123456789");

        for part in parts {
            part.close().unwrap();
        }
    }

    #[test]
    fn test_large_part_spills_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let content = "x".repeat(10_000);
        let data = body(&content);

        let options = StoreOptions::new().disk_threshold(4096).temp_dir(dir.path());
        let mut m = Multipart::new(data.as_bytes(), "B");
        let parts = m.store_all(&options).unwrap();

        let mut parts = parts.into_iter();
        let small = parts.next().unwrap();
        let big = parts.next().unwrap();

        assert!(small.is_in_memory());
        assert!(!big.is_in_memory());
        assert_eq!(big.len(), 10_000);
        assert_eq!(big.file_name(), Some("big.txt"));
        assert_eq!(big.bytes().unwrap_err(), crate::Error::NotInMemory);
        assert_eq!(big.text().unwrap(), content);

        let path = big.path().unwrap().to_path_buf();
        assert!(path.starts_with(dir.path()));
        assert!(path.exists());

        big.close().unwrap();
        assert!(!path.exists());
        small.close().unwrap();
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let data = body("abcd");
        let mut m = Multipart::new(data.as_bytes(), "B");
        let parts = m.store_all(&StoreOptions::new().disk_threshold(4)).unwrap();
        assert!(parts.iter().all(StoredPart::is_in_memory));
    }

    #[test]
    fn test_delete_failure_is_reported() {
        let data = body(&"y".repeat(64));
        let mut m = Multipart::new(data.as_bytes(), "B");
        let mut parts = m.store_all(&StoreOptions::new().disk_threshold(8)).unwrap();

        let big = parts.pop().unwrap();
        std::fs::remove_file(big.path().unwrap()).unwrap();
        assert!(matches!(big.close(), Err(crate::Error::DeleteFailed(_))));
    }
}
