use crate::buffer::{ReadOutcome, TokenBoundedReader};
use crate::constants;
use crate::content_disposition::ContentDisposition;
use crate::field::{PartKind, PartMetadata};
use crate::headers::Headers;
use crate::helpers;
use crate::params::Params;
use encoding_rs::Encoding;
use http::header;
use std::io::Read;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StreamingStage {
    /// A part's content hit the end of the source; a field separator and
    /// boundary must still follow.
    FindPrefix,
    /// The next bytes must be the active boundary.
    FindBoundary,
    /// A part's content stopped right before `\r\n--boundary`, which is still
    /// unconsumed.
    BoundaryFound,
    Header,
    Contents,
    Eos,
}

/// One level of boundary nesting. The root frame has no group name.
#[derive(Debug)]
pub(crate) struct BoundaryFrame {
    /// `--boundary`
    pub(crate) boundary: Vec<u8>,
    /// `\r\n--boundary`, the delimiter that ends a part's content.
    pub(crate) boundary_with_prefix: Vec<u8>,
    pub(crate) group_name: Option<String>,
}

impl BoundaryFrame {
    pub(crate) fn new(raw_boundary: &[u8], group_name: Option<String>) -> BoundaryFrame {
        let boundary = constants::prepend_boundary_ext(raw_boundary);
        let boundary_with_prefix = constants::prepend_crlf(&boundary);

        BoundaryFrame {
            boundary,
            boundary_with_prefix,
            group_name,
        }
    }
}

/// What a completed header block turned out to describe.
enum HeaderOutcome {
    Leaf(PartMetadata),
    Group,
}

/// The part-boundary state machine. It owns no I/O; every transition is
/// driven by the reader passed in, so it can be exercised over a canned byte
/// slice.
#[derive(Debug)]
pub(crate) struct MultipartState {
    pub(crate) stage: StreamingStage,
    pub(crate) frames: Vec<BoundaryFrame>,
    pub(crate) at_start: bool,
    pub(crate) next_part_idx: usize,
    pub(crate) header_size_limit: usize,
    pub(crate) encoding: &'static Encoding,
}

impl MultipartState {
    pub(crate) fn new(raw_boundary: &[u8], header_size_limit: usize, encoding: &'static Encoding) -> MultipartState {
        MultipartState {
            stage: StreamingStage::FindBoundary,
            frames: vec![BoundaryFrame::new(raw_boundary, None)],
            at_start: true,
            next_part_idx: 0,
            header_size_limit,
            encoding,
        }
    }

    fn frame(&self) -> &BoundaryFrame {
        // The root frame is never popped.
        &self.frames[self.frames.len() - 1]
    }

    fn describe(&self, token: &[u8]) -> String {
        let (text, _, _) = self.encoding.decode(token);
        format!("<<{}>>", text.escape_debug())
    }

    /// Advances to the metadata of the next leaf part, leaving the stage at
    /// `Contents`, or returns `None` once the root boundary is closed.
    pub(crate) fn next_part<R: Read>(
        &mut self,
        reader: &mut TokenBoundedReader<R>,
    ) -> crate::Result<Option<PartMetadata>> {
        loop {
            match self.stage {
                StreamingStage::Eos => return Ok(None),
                StreamingStage::Contents => {
                    self.skip_contents(reader)?;
                }
                StreamingStage::Header => {
                    let headers = helpers::read_header_block(reader, self.header_size_limit, self.encoding)?;
                    self.stage = StreamingStage::Contents;

                    match self.classify(headers)? {
                        HeaderOutcome::Leaf(meta) => return Ok(Some(meta)),
                        HeaderOutcome::Group => self.stage = StreamingStage::FindBoundary,
                    }
                }
                StreamingStage::FindPrefix | StreamingStage::FindBoundary | StreamingStage::BoundaryFound => {
                    self.find_boundary(reader)?;
                }
            }
        }
    }

    /// Consumes one boundary line and decides what follows it: a header
    /// block, the close of a nested group, or the end of the stream.
    fn find_boundary<R: Read>(&mut self, reader: &mut TokenBoundedReader<R>) -> crate::Result<()> {
        if self.at_start {
            self.at_start = false;
            // A leading field separator before the first boundary is optional.
            reader.matches(constants::CRLF)?;
        }

        match self.stage {
            StreamingStage::FindPrefix => {
                if !reader.matches(constants::CRLF)? {
                    return Err(crate::Error::token_not_found(
                        "field separator before boundary (content ended without a boundary)",
                    ));
                }
                self.expect_boundary(reader)?;
            }
            StreamingStage::FindBoundary => self.expect_boundary(reader)?,
            StreamingStage::BoundaryFound => {
                let token = &self.frame().boundary_with_prefix;
                if !reader.matches(token)? {
                    return Err(crate::Error::token_not_found(self.describe(token)));
                }
            }
            _ => return Ok(()),
        }

        if reader.matches(constants::BOUNDARY_EXT)? {
            if !reader.matches(constants::CRLF)? {
                return Err(crate::Error::token_not_found(
                    "field separator after stream terminator",
                ));
            }

            if self.frames.len() > 1 {
                let frame = self.frames.pop();
                debug!(
                    "closed multipart/mixed group {:?}",
                    frame.and_then(|f| f.group_name).unwrap_or_default()
                );
                self.stage = StreamingStage::FindBoundary;
            } else {
                trace!("reached end of multipart stream");
                self.stage = StreamingStage::Eos;
            }
        } else if reader.matches(constants::CRLF)? {
            self.stage = StreamingStage::Header;
        } else {
            return Err(crate::Error::token_not_found("field separator after boundary"));
        }

        Ok(())
    }

    fn expect_boundary<R: Read>(&self, reader: &mut TokenBoundedReader<R>) -> crate::Result<()> {
        let boundary = &self.frame().boundary;
        if reader.matches(boundary)? {
            Ok(())
        } else {
            Err(crate::Error::token_not_found(format!("boundary {}", self.describe(boundary))))
        }
    }

    fn classify(&mut self, headers: Headers) -> crate::Result<HeaderOutcome> {
        let content_disposition = ContentDisposition::parse(&headers);
        let content_type = headers.get(header::CONTENT_TYPE).map(str::to_owned);

        if let Some(ct) = content_type.as_deref() {
            if is_multipart_mixed(ct) {
                let sub_boundary = Params::parse(ct)
                    .get("boundary")
                    .map(|b| b.trim().to_owned())
                    .filter(|b| !b.is_empty())
                    .ok_or_else(|| crate::Error::parse("multipart/mixed part without a boundary"))?;

                debug!(
                    "opened multipart/mixed group {:?} with boundary {:?}",
                    content_disposition.field_name, sub_boundary
                );

                let raw_boundary = helpers::encode(self.encoding, &sub_boundary);
                self.frames
                    .push(BoundaryFrame::new(&raw_boundary, content_disposition.field_name));
                return Ok(HeaderOutcome::Group);
            }
        }

        let group_name = self.frame().group_name.clone();
        let name = match content_disposition.field_name {
            Some(name) => name,
            None if content_disposition.attachment => {
                group_name.ok_or_else(|| crate::Error::parse("no name for part"))?
            }
            None => return Err(crate::Error::parse("no name for part")),
        };

        let kind = if content_disposition.file_name.is_some() {
            PartKind::File
        } else {
            PartKind::Field
        };

        let idx = self.next_part_idx;
        self.next_part_idx += 1;

        trace!("part {} {:?} ({:?})", idx, name, kind);

        Ok(HeaderOutcome::Leaf(PartMetadata {
            name,
            kind,
            content_type,
            file_name: content_disposition.file_name,
            headers,
            idx,
        }))
    }

    /// Reads content of the current part, stopping before the active
    /// boundary delimiter.
    pub(crate) fn read_contents<R: Read>(
        &mut self,
        reader: &mut TokenBoundedReader<R>,
        out: &mut [u8],
    ) -> crate::Result<usize> {
        if self.stage != StreamingStage::Contents {
            return Ok(0);
        }

        let outcome = reader.read_unless_token(&self.frame().boundary_with_prefix, out)?;
        Ok(self.after_contents(outcome))
    }

    /// Discards the rest of the current part's content.
    pub(crate) fn skip_contents<R: Read>(&mut self, reader: &mut TokenBoundedReader<R>) -> crate::Result<()> {
        if self.stage != StreamingStage::Contents {
            return Ok(());
        }

        let outcome = reader.skip_until_token(&self.frame().boundary_with_prefix)?;
        self.after_contents(outcome);
        Ok(())
    }

    fn after_contents(&mut self, outcome: ReadOutcome) -> usize {
        match outcome {
            ReadOutcome::Data(n) => n,
            ReadOutcome::Token => {
                self.stage = StreamingStage::BoundaryFound;
                0
            }
            ReadOutcome::Eof => {
                self.stage = StreamingStage::FindPrefix;
                0
            }
        }
    }
}

fn is_multipart_mixed(content_type: &str) -> bool {
    content_type
        .get(..constants::MULTIPART_MIXED.len())
        .map_or(false, |prefix| prefix.eq_ignore_ascii_case(constants::MULTIPART_MIXED))
}
