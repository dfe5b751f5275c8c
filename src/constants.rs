pub(crate) const DEFAULT_WHOLE_STREAM_SIZE_LIMIT: u64 = std::u64::MAX;
pub(crate) const DEFAULT_HEADER_BLOCK_SIZE_LIMIT: usize = 10 * 1024;
pub(crate) const DEFAULT_BUFFER_SIZE: usize = 4096;
pub(crate) const DEFAULT_DISK_THRESHOLD: usize = 1000 * 1024;

/// Follows every boundary that opens a part, and every header line.
pub(crate) const CRLF: &[u8] = b"\r\n";

/// Precedes the boundary value on the wire, and marks a group's final boundary.
pub(crate) const BOUNDARY_EXT: &[u8] = b"--";

pub(crate) const MULTIPART_MIXED: &str = "multipart/mixed";

/// `--` followed by the raw boundary value, as it appears at the start of a boundary line.
pub(crate) fn prepend_boundary_ext(boundary: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(BOUNDARY_EXT.len() + boundary.len());
    out.extend_from_slice(BOUNDARY_EXT);
    out.extend_from_slice(boundary);
    out
}

/// The delimiter that terminates a part's content: `\r\n--boundary`.
pub(crate) fn prepend_crlf(boundary: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(CRLF.len() + boundary.len());
    out.extend_from_slice(CRLF);
    out.extend_from_slice(boundary);
    out
}
