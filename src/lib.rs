//! A streaming `multipart/form-data` decoder and encoder ([RFC 1867](https://www.ietf.org/rfc/rfc1867.txt)),
//! with support for nested `multipart/mixed` groups.
//!
//! The decoder reads from any [`std::io::Read`] source and never buffers more
//! than one part's header block plus a small lookahead window, so bodies of
//! any size are processed in bounded memory. Malformed bodies are rejected
//! with a terminal error; there is no attempt to resynchronize.
//!
//! # Examples
//!
//! ```
//! use multiform::Multipart;
//!
//! # fn run() -> multiform::Result<()> {
//! let data = "--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"my_text_field\"\r\n\r\nabcd\r\n--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"my_file_field\"; filename=\"a-text-file.txt\"\r\nContent-Type: text/plain\r\n\r\nHello world\nHello\r\nWorld\rAgain\r\n--X-BOUNDARY--\r\n";
//! let boundary = multiform::parse_boundary("multipart/form-data; boundary=X-BOUNDARY")?;
//!
//! let mut multipart = Multipart::new(data.as_bytes(), boundary);
//!
//! while let Some(part) = multipart.next_part()? {
//!     println!("Name: {:?}, File Name: {:?}", part.name(), part.file_name());
//!     println!("Content: {:?}", part.text()?);
//! }
//! # Ok(())
//! # }
//! # run().unwrap();
//! ```
//!
//! ## Optional features
//!
//! - `json`: Enables the [`Part::json`] method to deserialize part content.
//! - `log`: Traces boundary transitions through the [`log`](https://docs.rs/log) facade.

#![cfg_attr(nightly, feature(doc_cfg))]

#[cfg(feature = "log")]
macro_rules! trace {
    ($($t:tt)*) => (::log::trace!($($t)*));
}

#[cfg(not(feature = "log"))]
macro_rules! trace {
    ($($t:tt)*) => {{
        if false {
            let _ = format_args!($($t)*);
        }
    }};
}

#[cfg(feature = "log")]
macro_rules! debug {
    ($($t:tt)*) => (::log::debug!($($t)*));
}

#[cfg(not(feature = "log"))]
macro_rules! debug {
    ($($t:tt)*) => {{
        if false {
            let _ = format_args!($($t)*);
        }
    }};
}

pub use bytes;
pub use constraints::Constraints;
pub use encoder::{random_boundary, MultipartBody, MultipartEncoder};
pub use error::Error;
pub use field::{Part, PartKind, PartMetadata};
pub use headers::Headers;
pub use multipart::Multipart;
pub use params::Params;
pub use size_limit::SizeLimit;
pub use store::{StoreOptions, StoredContent, StoredPart};

mod buffer;
mod constants;
mod constraints;
mod content_disposition;
mod encoder;
mod error;
mod field;
mod headers;
mod helpers;
mod multipart;
mod params;
mod size_limit;
mod state;
mod store;

/// A Result type often returned from methods that can have `multiform` errors.
pub type Result<T> = std::result::Result<T, Error>;

/// Parses the `Content-Type` header to extract the boundary value.
pub fn parse_boundary<T: AsRef<str>>(content_type: T) -> Result<String> {
    let m = content_type
        .as_ref()
        .parse::<mime::Mime>()
        .map_err(Error::DecodeContentType)?;

    if !(m.type_() == mime::MULTIPART && m.subtype() == mime::FORM_DATA) {
        return Err(Error::NoMultipart);
    }

    m.get_param(mime::BOUNDARY)
        .map(|name| name.as_str().to_owned())
        .ok_or(Error::NoBoundary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_boundary() {
        let content_type = "multipart/form-data; boundary=ABCDEFG";
        assert_eq!(parse_boundary(content_type), Ok("ABCDEFG".to_owned()));

        let content_type = "multipart/form-data; boundary=------ABCDEFG";
        assert_eq!(parse_boundary(content_type), Ok("------ABCDEFG".to_owned()));

        let content_type = "multipart/form-data; boundary=\"quoted boundary\"";
        assert_eq!(parse_boundary(content_type), Ok("quoted boundary".to_owned()));

        let content_type = "boundary=------ABCDEFG";
        assert!(parse_boundary(content_type).is_err());

        let content_type = "text/plain";
        assert!(parse_boundary(content_type).is_err());

        let content_type = "text/plain; boundary=------ABCDEFG";
        assert_eq!(parse_boundary(content_type), Err(Error::NoMultipart));

        let content_type = "multipart/form-data";
        assert_eq!(parse_boundary(content_type), Err(Error::NoBoundary));
    }
}
