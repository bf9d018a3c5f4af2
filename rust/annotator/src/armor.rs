//! Locating, decoding and re-armoring PEM blocks.
//!
//! Text in front of a block (such as `# Issuer:` comments or `openssl pkcs12` bag attributes) is
//! skipped. Text after the last block is an error.

use pem::{EncodeConfig, HeaderMap, LineEnding, Pem, PemError};
use snafu::{ensure, ResultExt, Snafu};

const BEGIN_MARKER: &[u8] = b"-----BEGIN ";
const END_MARKER: &[u8] = b"-----END ";

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("expected a PEM block at byte offset {offset}, found only non-PEM text"))]
    MissingBlock { offset: usize },

    #[snafu(display("failed to decode PEM block at byte offset {offset}"))]
    DecodeBlock { source: PemError, offset: usize },
}

/// A single decoded PEM block.
#[derive(Clone, Debug, PartialEq)]
pub struct RawBlock(Pem);

impl RawBlock {
    pub fn new(label: &str, contents: impl Into<Vec<u8>>) -> Self {
        Self(Pem::new(label, contents))
    }

    /// The type label from the BEGIN line, such as `CERTIFICATE`.
    pub fn label(&self) -> &str {
        self.0.tag()
    }

    /// The base64-decoded body.
    pub fn contents(&self) -> &[u8] {
        self.0.contents()
    }

    /// `Key: Value` header lines, in the order they appeared.
    pub fn headers(&self) -> &HeaderMap {
        self.0.headers()
    }

    /// Encodes the block as PEM with `\n` line endings, wrapping the body at 64 characters per
    /// line.
    pub fn to_pem(&self) -> String {
        pem::encode_config(&self.0, EncodeConfig::new().set_line_ending(LineEnding::LF))
    }
}

/// Splits `data` into its PEM blocks, in order of appearance.
///
/// Anything between the blocks is skipped. Once no BEGIN line is left, the rest of the input
/// must be whitespace, otherwise the whole call fails and no blocks are returned.
pub fn split(data: &[u8]) -> Result<Vec<RawBlock>, Error> {
    let mut blocks = Vec::new();
    let mut pos = 0;

    while pos < data.len() {
        let rest = &data[pos..];
        let Some(begin) = find_line(rest, BEGIN_MARKER) else {
            let leading_whitespace = rest.len() - rest.trim_ascii_start().len();
            ensure!(
                rest.trim_ascii().is_empty(),
                MissingBlockSnafu {
                    offset: pos + leading_whitespace
                }
            );
            break;
        };
        if !rest[..begin].trim_ascii().is_empty() {
            tracing::debug!(offset = pos, skipped = begin, "Skipping text in front of PEM block");
        }

        let start = pos + begin;
        let end = block_len(&data[start..]).map_or(data.len(), |len| start + len);
        let block = pem::parse(&data[start..end]).context(DecodeBlockSnafu { offset: start })?;
        blocks.push(RawBlock(block));
        pos = end;
    }

    Ok(blocks)
}

/// Offset of the first `marker` that starts a line, ignoring indentation.
fn find_line(data: &[u8], marker: &[u8]) -> Option<usize> {
    let mut line_start = 0;
    loop {
        let line = &data[line_start..];
        let indent = line.len() - line.trim_ascii_start().len();
        let newline = line.iter().position(|&b| b == b'\n');
        // Indentation must not reach into the next line
        if newline.map_or(true, |newline| indent <= newline) && line[indent..].starts_with(marker)
        {
            return Some(line_start + indent);
        }
        line_start += newline? + 1;
    }
}

/// Length of the block starting at `data[0]`, up to and including its END line.
fn block_len(data: &[u8]) -> Option<usize> {
    let body_start = data.iter().position(|&b| b == b'\n')? + 1;
    let end_line = body_start + find_line(&data[body_start..], END_MARKER)?;
    Some(
        data[end_line..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(data.len(), |newline| end_line + newline + 1),
    )
}
