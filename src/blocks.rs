//! Grammar productions for everything between the logical screen and the trailer.
//!
//! ```text
//! <Data>                    ::= <Graphic Block> | <Special-Purpose Block>
//! <Graphic Block>           ::= [Graphic Control Extension] <Graphic-Rendering Block>
//! <Graphic-Rendering Block> ::= <Table-Based Image> | Plain Text Extension
//! <Table-Based Image>       ::= Image Descriptor [Local Color Table] Image Data
//! <Special-Purpose Block>   ::= Application Extension | Comment Extension
//! ```
//!
//! Every production takes the buffer and a start offset and returns the offset just past what
//! it consumed. A production that fails leaves nothing behind, so the caller can retry the same
//! offset with the next alternative.

use core::ops::{BitAnd, Shr};
use std::borrow::Cow;

use tracing::Level;

use crate::common::{
    ParseError, Parsed, APPLICATION_HEADER_SIZE, APPLICATION_LABEL, EXTENSION_INTRODUCER,
    GRAPHIC_CONTROL_BODY_SIZE, GRAPHIC_CONTROL_LABEL, IMAGE_SEPARATOR, PLAIN_TEXT_BODY_SIZE,
    PLAIN_TEXT_LABEL, TRAILER,
};
use crate::config::Config;
use crate::cursor::ByteCursor;
use crate::header::skip_colour_table;

/// A run of data sub-blocks, located but not interpreted.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct SubBlocks {
    /// Number of non-empty sub-blocks.
    pub count: usize,
    /// Sum of the sub-block lengths.
    pub payload_len: usize,
}

impl SubBlocks {
    /// Length-prefixed runs up to and including the zero-length terminator.
    pub fn parse(data: &[u8], offset: usize, config: &Config) -> Parsed<Self> {
        let mut bytes = ByteCursor::at(data, offset);
        let mut blocks = SubBlocks::default();
        loop {
            match bytes.take_byte()? {
                0 => break,
                len => {
                    emit!(config, Level::TRACE, offset = bytes.offset() - 1, len, "data sub-block");
                    bytes.seek_by(len as usize)?;
                    blocks.count += 1;
                    blocks.payload_len += len as usize;
                }
            }
        }
        Ok((blocks, bytes.offset()))
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct GraphicControlExtension {
    /// Packed disposal, user-input and transparency bits.
    ctrl: u8,
    delay_time: u16,
    /// Only meaningful when the transparency bit of `ctrl` is set.
    transparent_idx: u8,
}

impl GraphicControlExtension {
    pub fn parse(data: &[u8], offset: usize, _config: &Config) -> Parsed<Self> {
        let mut bytes = ByteCursor::at(data, offset);
        bytes.expect_byte(EXTENSION_INTRODUCER)?;
        bytes.expect_byte(GRAPHIC_CONTROL_LABEL)?;
        bytes.expect_size(GRAPHIC_CONTROL_BODY_SIZE)?;

        let ctrl = bytes.take_byte()?;
        let delay_time = bytes.take_u16_le()?;
        let transparent_idx = bytes.take_byte()?;

        expect_terminator(&mut bytes)?;
        Ok((
            Self {
                ctrl,
                delay_time,
                transparent_idx,
            },
            bytes.offset(),
        ))
    }

    pub fn transparent_idx(&self) -> Option<u8> {
        self.ctrl.bitand(1).eq(&1).then_some(self.transparent_idx)
    }

    pub fn disposal_method(&self) -> u8 {
        self.ctrl.shr(2u8).bitand(0x7)
    }

    pub fn user_input(&self) -> bool {
        self.ctrl.bitand(0x2).eq(&0x2)
    }

    /// Delay in hundredths of a second.
    pub fn delay_time(&self) -> u16 {
        self.delay_time
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationExtension {
    pub identifier: [u8; 8],
    pub auth_code: [u8; 3],
    pub data: SubBlocks,
}

impl ApplicationExtension {
    pub fn parse(data: &[u8], offset: usize, config: &Config) -> Parsed<Self> {
        let mut bytes = ByteCursor::at(data, offset);
        bytes.expect_byte(EXTENSION_INTRODUCER)?;
        bytes.expect_byte(APPLICATION_LABEL)?;
        bytes.expect_size(APPLICATION_HEADER_SIZE)?;

        let identifier = bytes.take_arr()?;
        let auth_code = bytes.take_arr()?;
        let (data, next) = SubBlocks::parse(data, bytes.offset(), config)?;

        let ext = Self {
            identifier,
            auth_code,
            data,
        };
        emit!(
            config,
            Level::INFO,
            offset,
            identifier = %ext.identifier(),
            auth_code = %ext.auth_code(),
            "application extension"
        );
        Ok((ext, next))
    }

    /// Identifier as text, e.g. `NETSCAPE`.
    pub fn identifier(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.identifier)
    }

    pub fn auth_code(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.auth_code)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlainTextExtension {
    /// Text grid position, size, cell size and colours.
    pub header: [u8; PLAIN_TEXT_BODY_SIZE as usize],
    pub text: SubBlocks,
}

impl PlainTextExtension {
    pub fn parse(data: &[u8], offset: usize, config: &Config) -> Parsed<Self> {
        let mut bytes = ByteCursor::at(data, offset);
        bytes.expect_byte(EXTENSION_INTRODUCER)?;
        bytes.expect_byte(PLAIN_TEXT_LABEL)?;
        bytes.expect_size(PLAIN_TEXT_BODY_SIZE)?;

        let header = bytes.take_arr()?;
        let (text, next) = SubBlocks::parse(data, bytes.offset(), config)?;
        Ok((Self { header, text }, next))
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ImageDescriptor {
    pub left: u16,
    pub top: u16,
    pub width: u16,
    pub height: u16,
    packed: u8,
}

impl ImageDescriptor {
    pub fn has_local_colour_table(&self) -> bool {
        self.packed.bitand(0x80).eq(&0x80)
    }

    pub fn interlaced(&self) -> bool {
        self.packed.bitand(0x40).eq(&0x40)
    }

    pub fn sorted(&self) -> bool {
        self.packed.bitand(0x20).eq(&0x20)
    }

    pub fn local_colour_table_size_exponent(&self) -> u8 {
        self.packed.bitand(0x07)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableBasedImage {
    pub descriptor: ImageDescriptor,
    pub lzw_min_code_size: u8,
    pub data: SubBlocks,
}

impl TableBasedImage {
    /// Image descriptor, optional local colour table, then the LZW code size and image data.
    /// The LZW stream itself is skipped, not decoded.
    pub fn parse(data: &[u8], offset: usize, config: &Config) -> Parsed<Self> {
        let mut bytes = ByteCursor::at(data, offset);
        bytes.expect_byte(IMAGE_SEPARATOR)?;
        emit!(config, Level::DEBUG, offset, "found table-based image");

        let left = bytes.take_u16_le()?;
        let top = bytes.take_u16_le()?;
        let width = bytes.take_u16_le()?;
        let height = bytes.take_u16_le()?;
        let packed = bytes.take_byte()?;
        let descriptor = ImageDescriptor {
            left,
            top,
            width,
            height,
            packed,
        };

        let mut next = bytes.offset();
        if descriptor.has_local_colour_table() {
            (_, next) = skip_colour_table(
                data,
                next,
                descriptor.local_colour_table_size_exponent(),
                config,
            )?;
        }

        let mut bytes = ByteCursor::at(data, next);
        let lzw_min_code_size = bytes.take_byte()?;
        let (image_data, next) = SubBlocks::parse(data, bytes.offset(), config)?;

        let image = Self {
            descriptor,
            lzw_min_code_size,
            data: image_data,
        };
        emit!(
            config,
            Level::DEBUG,
            code_size = lzw_min_code_size,
            clear_code = ?image.clear_code(),
            end_of_information_code = ?image.end_of_information_code(),
            image_data_len = image_data.payload_len,
            "image data"
        );
        if !(2..=8).contains(&lzw_min_code_size) {
            emit!(config, Level::DEBUG, code_size = lzw_min_code_size, "unusual LZW code size");
        }
        Ok((image, next))
    }

    /// `2^code_size`, or `None` when the stored size is too large to be meaningful.
    pub fn clear_code(&self) -> Option<u32> {
        1u32.checked_shl(u32::from(self.lzw_min_code_size))
    }

    pub fn end_of_information_code(&self) -> Option<u32> {
        self.clear_code().map(|clear| clear + 1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphicRendering {
    Image(TableBasedImage),
    PlainText(PlainTextExtension),
    /// Not allowed by the grammar, but seen in the wild after a graphic control extension.
    Application(ApplicationExtension),
}

impl GraphicRendering {
    /// Table-based image, else plain text, else a misplaced application extension.
    pub fn parse(data: &[u8], offset: usize, config: &Config) -> Parsed<Self> {
        let image = match TableBasedImage::parse(data, offset, config) {
            Ok((image, next)) => return Ok((GraphicRendering::Image(image), next)),
            Err(e) => e,
        };
        let text = match PlainTextExtension::parse(data, offset, config) {
            Ok((text, next)) => return Ok((GraphicRendering::PlainText(text), next)),
            Err(e) => e,
        };
        let app = match ApplicationExtension::parse(data, offset, config) {
            Ok((app, next)) => {
                emit!(config, Level::INFO, offset, "application extension in graphic block");
                return Ok((GraphicRendering::Application(app), next));
            }
            Err(e) => e,
        };
        Err(furthest(furthest(image, text), app))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphicBlock {
    pub control: Option<GraphicControlExtension>,
    pub rendering: GraphicRendering,
}

impl GraphicBlock {
    /// Optional graphic control extension plus a rendering block, committed as a unit.
    pub fn parse(data: &[u8], offset: usize, config: &Config) -> Parsed<Self> {
        let (control, next, control_err) =
            match GraphicControlExtension::parse(data, offset, config) {
                Ok((control, next)) => {
                    emit!(config, Level::DEBUG, offset, "graphic control extension");
                    (Some(control), next, None)
                }
                Err(e) => (None, offset, Some(e)),
            };

        match GraphicRendering::parse(data, next, config) {
            Ok((rendering, next)) => Ok((Self { control, rendering }, next)),
            // A half-read control extension explains the failure better than the rendering
            // block that was never reached.
            Err(e) => Err(match control_err {
                Some(control_err) => furthest(e, control_err),
                None => e,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialPurposeBlock {
    Application(ApplicationExtension),
}

impl SpecialPurposeBlock {
    /// Only application extensions; comment extensions have no production and never match.
    pub fn parse(data: &[u8], offset: usize, config: &Config) -> Parsed<Self> {
        let (app, next) = ApplicationExtension::parse(data, offset, config)?;
        Ok((SpecialPurposeBlock::Application(app), next))
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Trailer;

impl Trailer {
    pub fn parse(data: &[u8], offset: usize, _config: &Config) -> Parsed<Self> {
        let mut bytes = ByteCursor::at(data, offset);
        bytes.expect_byte(TRAILER)?;
        Ok((Trailer, bytes.offset()))
    }
}

fn expect_terminator(bytes: &mut ByteCursor<'_>) -> Result<(), ParseError> {
    let offset = bytes.offset();
    match bytes.take_byte()? {
        0 => Ok(()),
        found => Err(ParseError::MissingBlockTerminator { offset, found }),
    }
}

/// Of two rejections of the same start offset, the one that got further into the data.
fn furthest(a: ParseError, b: ParseError) -> ParseError {
    if b.offset() > a.offset() {
        b
    } else {
        a
    }
}
