use crate::headers::Headers;
use crate::params::Params;
use http::header;

/// The parameters of a part's `Content-Disposition` header that decide how
/// the part is surfaced.
pub(crate) struct ContentDisposition {
    pub(crate) field_name: Option<String>,
    pub(crate) file_name: Option<String>,
    pub(crate) attachment: bool,
}

impl ContentDisposition {
    pub fn parse(headers: &Headers) -> ContentDisposition {
        let params = headers
            .get(header::CONTENT_DISPOSITION)
            .map(Params::parse)
            .unwrap_or_default();

        let field_name = params.get("name").map(|name| name.trim().to_owned());

        // A bare `filename` still marks the part as a file.
        let file_name = if params.contains("filename") {
            Some(params.get("filename").unwrap_or_default().trim().to_owned())
        } else {
            None
        };

        ContentDisposition {
            field_name,
            file_name,
            attachment: params.contains("attachment"),
        }
    }
}
