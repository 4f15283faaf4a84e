use core::fmt;
use thiserror::Error;

/// Block introducer bytes, used to name what sits at an offset the grammar could not match.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum Block {
    /// Image separator.
    Image = 0x2C,
    /// Extension introducer.
    Extension = 0x21,
    /// Stream trailer.
    Trailer = 0x3B,
}

/// Known GIF Extension labels.
///
/// Comment extensions are recognised by label only; the grammar has no production for them, so
/// a stream carrying one is rejected as an unrecognized block.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum ExtensionLabel {
    /// Graphic control extension.
    Graphics = 0xf9,
    /// Application extension.
    App = 0xff,
    /// Plain text extension.
    Text = 0x01,
    /// Comment extension
    Comment = 0xfe,
}

impl ExtensionLabel {
    pub fn from_u8(n: u8) -> Option<Self> {
        match n {
            0xf9 => Some(ExtensionLabel::Graphics),
            0xff => Some(ExtensionLabel::App),
            0x01 => Some(ExtensionLabel::Text),
            0xfe => Some(ExtensionLabel::Comment),
            _ => None,
        }
    }
}

impl Block {
    /// Try to parse from u8
    pub fn from_u8(n: u8) -> Option<Self> {
        match n {
            0x2C => Some(Block::Image),
            0x21 => Some(Block::Extension),
            0x3B => Some(Block::Trailer),
            _ => None,
        }
    }
}

pub const EXTENSION_INTRODUCER: u8 = Block::Extension as u8;
pub const TRAILER: u8 = Block::Trailer as u8;
pub const IMAGE_SEPARATOR: u8 = Block::Image as u8;

pub const GRAPHIC_CONTROL_LABEL: u8 = ExtensionLabel::Graphics as u8;
pub const APPLICATION_LABEL: u8 = ExtensionLabel::App as u8;
pub const PLAIN_TEXT_LABEL: u8 = ExtensionLabel::Text as u8;
pub const COMMENT_LABEL: u8 = ExtensionLabel::Comment as u8;

/// Body size of a graphic control extension, excluding the terminator.
pub const GRAPHIC_CONTROL_BODY_SIZE: u8 = 4;
/// Identifier (8 bytes) plus authentication code (3 bytes).
pub const APPLICATION_HEADER_SIZE: u8 = 11;
pub const PLAIN_TEXT_BODY_SIZE: u8 = 12;

/// Result of a grammar production: the parsed value and the offset just past it.
pub type Parsed<T> = Result<(T, usize), ParseError>;

/// Errors that emerge when validating a gif stream.
///
/// Every variant carries the byte offset at which the expectation was violated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The stream does not start with `GIF`.
    #[error("header has unknown signature {found:02x?} at {offset:#x} (missing GIF)")]
    MalformedSignature { offset: usize, found: [u8; 3] },

    /// The version is neither `87a` nor `89a`.
    #[error("header has unknown version {found:02x?} at {offset:#x}, not 87a or 89a")]
    UnsupportedVersion { offset: usize, found: [u8; 3] },

    /// Background colour index set although there is no global colour table.
    #[error(
        "no global colour table, but background colour index is {background_index} at {offset:#x}"
    )]
    DescriptorInvariantViolation { offset: usize, background_index: u8 },

    /// Wrong introducer, separator or label byte.
    #[error("expected {expected:#04x} at {offset:#x}, found {found:#04x}")]
    UnexpectedIntroducerOrLabel {
        offset: usize,
        expected: u8,
        found: u8,
    },

    /// A block size byte that must hold a fixed value does not.
    #[error("unexpected block size {found} at {offset:#x}, expected {expected}")]
    UnexpectedFixedBlockSize {
        offset: usize,
        expected: u8,
        found: u8,
    },

    #[error("missing block terminator at {offset:#x}, found {found:#04x}")]
    MissingBlockTerminator { offset: usize, found: u8 },

    /// A declared length runs past the end of the buffer.
    #[error("{declared} bytes declared at {offset:#x}, but only {remaining} remain")]
    TruncatedBuffer {
        offset: usize,
        declared: usize,
        remaining: usize,
    },

    /// None of special-purpose block, graphic block or trailer matched.
    #[error("unrecognized block at {offset:#x}: {rejections}")]
    UnrecognizedBlock {
        offset: usize,
        rejections: Box<Rejections>,
    },

    /// The buffer ended in the middle of a fixed-size field.
    #[error("stream ended at {offset:#x}, {needed} more byte(s) needed")]
    IncompleteStream { offset: usize, needed: usize },
}

impl ParseError {
    /// Offset at which the error occurred.
    pub fn offset(&self) -> usize {
        match self {
            ParseError::MalformedSignature { offset, .. }
            | ParseError::UnsupportedVersion { offset, .. }
            | ParseError::DescriptorInvariantViolation { offset, .. }
            | ParseError::UnexpectedIntroducerOrLabel { offset, .. }
            | ParseError::UnexpectedFixedBlockSize { offset, .. }
            | ParseError::MissingBlockTerminator { offset, .. }
            | ParseError::TruncatedBuffer { offset, .. }
            | ParseError::UnrecognizedBlock { offset, .. }
            | ParseError::IncompleteStream { offset, .. } => *offset,
        }
    }

    /// True when the data ran out, as opposed to being malformed.
    pub fn is_exhaustion(&self) -> bool {
        matches!(
            self,
            ParseError::TruncatedBuffer { .. } | ParseError::IncompleteStream { .. }
        )
    }
}

/// Why each top-level alternative was rejected at an unrecognized block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejections {
    pub special_purpose: ParseError,
    pub graphic: ParseError,
    pub trailer: ParseError,
}

impl Rejections {
    /// The first rejection (in dispatch order) caused by running out of data.
    pub fn exhaustion(&self) -> Option<&ParseError> {
        [&self.special_purpose, &self.graphic, &self.trailer]
            .into_iter()
            .find(|e| e.is_exhaustion())
    }
}

impl fmt::Display for Rejections {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "not a Special-Purpose Block because: {}; not a Graphic Block because: {}; not a Trailer because: {}",
            self.special_purpose, self.graphic, self.trailer
        )
    }
}
