use core::fmt;
use core::ops::{BitAnd, Shr};

use tracing::Level;

use crate::common::{ParseError, Parsed};
use crate::config::Config;
use crate::cursor::ByteCursor;

const SIGNATURE: [u8; 3] = *b"GIF";

/// Gif format revision named in the header.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Version {
    V87a,
    V89a,
}

impl Version {
    pub fn as_str(self) -> &'static str {
        match self {
            Version::V87a => "87a",
            Version::V89a => "89a",
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Header {
    pub signature: [u8; 3],
    pub version: Version,
}

impl Header {
    /// `GIF` followed by `87a` or `89a`.
    pub fn parse(data: &[u8], offset: usize, config: &Config) -> Parsed<Header> {
        let mut bytes = ByteCursor::at(data, offset);

        let signature: [u8; 3] = bytes.take_arr()?;
        if signature != SIGNATURE {
            return Err(ParseError::MalformedSignature {
                offset,
                found: signature,
            });
        }

        let version_offset = bytes.offset();
        let version = match &bytes.take_arr::<3>()? {
            b"87a" => Version::V87a,
            b"89a" => Version::V89a,
            found => {
                return Err(ParseError::UnsupportedVersion {
                    offset: version_offset,
                    found: *found,
                })
            }
        };

        emit!(config, Level::INFO, %version, "valid GIF header");
        Ok((Header { signature, version }, bytes.offset()))
    }
}

/// Byte length of a colour table whose packed size field is `exponent`.
///
/// A table holds `2^(exponent + 1)` RGB triplets, so the length ranges from 6 to 768 bytes.
#[inline]
pub fn colour_table_len(exponent: u8) -> usize {
    3 * (1usize << (u32::from(exponent.bitand(0x07)) + 1))
}

/// Skip a global or local colour table; its entries are never interpreted.
pub fn skip_colour_table(data: &[u8], offset: usize, exponent: u8, config: &Config) -> Parsed<()> {
    let len = colour_table_len(exponent);
    emit!(config, Level::DEBUG, offset, len, "colour table");

    let mut bytes = ByteCursor::at(data, offset);
    bytes.seek_by(len)?;
    Ok(((), bytes.offset()))
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct LogicalScreenDescriptor {
    pub width: u16,
    pub height: u16,
    pub has_global_colour_table: bool,
    /// Bits per primary colour, 1..=8.
    pub colour_resolution: u8,
    pub sort_flag: bool,
    /// Table holds `2^(exponent + 1)` entries.
    pub global_colour_table_size_exponent: u8,
    pub background_colour_index: u8,
    pub pixel_aspect_ratio: u8,
}

impl LogicalScreenDescriptor {
    /// The 7 byte descriptor that follows the header.
    ///
    /// A background colour index is meaningless without a global colour table, so a non-zero
    /// index in that case is rejected outright.
    pub fn parse(data: &[u8], offset: usize, config: &Config) -> Parsed<Self> {
        let mut bytes = ByteCursor::at(data, offset);

        let width = bytes.take_u16_le()?;
        let height = bytes.take_u16_le()?;

        let packed = bytes.take_byte()?;
        let has_global_colour_table = packed.bitand(0x80).eq(&0x80);
        let colour_resolution = packed.bitand(0x70u8).shr(4u8) + 1u8;
        let sort_flag = packed.bitand(0x08).eq(&0x08);
        let global_colour_table_size_exponent = packed.bitand(0x07);

        let background_offset = bytes.offset();
        let background_colour_index = bytes.take_byte()?;
        if !has_global_colour_table && background_colour_index != 0 {
            return Err(ParseError::DescriptorInvariantViolation {
                offset: background_offset,
                background_index: background_colour_index,
            });
        }

        let pixel_aspect_ratio = bytes.take_byte()?;

        let descriptor = Self {
            width,
            height,
            has_global_colour_table,
            colour_resolution,
            sort_flag,
            global_colour_table_size_exponent,
            background_colour_index,
            pixel_aspect_ratio,
        };
        emit!(config, Level::INFO, ?descriptor, "logical screen descriptor");
        Ok((descriptor, bytes.offset()))
    }

    /// Length in bytes of the global colour table, if there is one.
    pub fn global_colour_table_len(&self) -> Option<usize> {
        self.has_global_colour_table
            .then(|| colour_table_len(self.global_colour_table_size_exponent))
    }
}
