//! A structural validator for GIF87a / GIF89a streams.
//!
//! `gifcheck` walks a gif buffer against the grammar in Appendix B of the GIF89a specification
//! without decoding any pixel data. Besides plain malformation it looks for one specific
//! manipulation: a mid-stream extension introducer (`0x21`) overwritten with the trailer byte
//! (`0x3b`). Naive decoders stop at such a forged trailer and never see the frames behind it.
//!
//! When a trailer shows up before the end of the buffer, the validator can re-read that byte as
//! an extension introducer. If a graphic block parses from there, the trailer was fake; the
//! substitution is recorded as a [`Patch`] and parsing carries on. Patches can be applied to a
//! copy of the input to get a file that ordinary decoders read in full.
//!
//! ```
//! use gifcheck::{validate, Config};
//!
//! let minimal = b"GIF89a\x01\x00\x01\x00\x00\x00\x00\x3b";
//! let report = validate(minimal, &Config::default()).unwrap();
//! assert!(report.is_clean());
//! assert_eq!(report.final_offset, minimal.len());
//! ```
//!
//! The core does no I/O and holds no global state: logging verbosity and recovery behaviour
//! come from the [`Config`] passed to each call. Log output goes through [`tracing`]; install a
//! subscriber to see it.

#[macro_use]
mod config;

mod blocks;
mod common;
mod cursor;
mod dispatch;
mod header;
mod patch;
#[cfg(test)]
mod test_utils;

use tracing::Level;

pub use blocks::{
    ApplicationExtension, GraphicBlock, GraphicControlExtension, GraphicRendering,
    ImageDescriptor, PlainTextExtension, SpecialPurposeBlock, SubBlocks, TableBasedImage, Trailer,
};
pub use common::{
    Block, ExtensionLabel, ParseError, Parsed, Rejections, APPLICATION_HEADER_SIZE,
    APPLICATION_LABEL, COMMENT_LABEL, EXTENSION_INTRODUCER, GRAPHIC_CONTROL_BODY_SIZE,
    GRAPHIC_CONTROL_LABEL, IMAGE_SEPARATOR, PLAIN_TEXT_BODY_SIZE, PLAIN_TEXT_LABEL, TRAILER,
};
pub use config::Config;
pub use header::{colour_table_len, Header, LogicalScreenDescriptor, Version};
pub use patch::{Patch, PatchLedger, StalePatch};

/// Outcome of a structurally successful parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GifReport {
    pub signature_valid: bool,
    pub version: Version,
    pub screen: LogicalScreenDescriptor,
    pub trailer_seen: bool,
    /// Bytes after the trailer that ended the parse. Non-zero means the stream holds data a
    /// decoder will never reach.
    pub outstanding_byte_count: usize,
    /// Offset just past the trailer that ended the parse.
    pub final_offset: usize,
    pub patches: PatchLedger,
    pub graphic_blocks: usize,
    pub special_purpose_blocks: usize,
    /// The input with every patch applied, when asked for.
    pub corrected: Option<Vec<u8>>,
    /// Patches whose precondition failed while building `corrected`.
    pub skipped_patches: Vec<StalePatch>,
}

impl GifReport {
    /// Nothing after the trailer and nothing patched.
    pub fn is_clean(&self) -> bool {
        self.outstanding_byte_count == 0 && self.patches.is_empty()
    }
}

/// Validate `data` as a complete gif stream.
///
/// ```text
/// <GIF Data Stream> ::= Header <Logical Screen> <Data>* Trailer
/// ```
///
/// Reaching a trailer with bytes still behind it is a success with a non-zero
/// [`GifReport::outstanding_byte_count`]; only data the grammar cannot account for is an error.
pub fn validate(data: &[u8], config: &Config) -> Result<GifReport, ParseError> {
    emit!(config, Level::DEBUG, len = data.len(), "validating gif");
    let mut state = dispatch::GifParseState::default();

    let (gif_header, offset) = Header::parse(data, 0, config)?;
    state.signature_valid = true;

    let (screen, mut offset) = LogicalScreenDescriptor::parse(data, offset, config)?;
    if screen.has_global_colour_table {
        (_, offset) = header::skip_colour_table(
            data,
            offset,
            screen.global_colour_table_size_exponent,
            config,
        )?;
    }

    let final_offset = dispatch::BlockDispatcher::new(data, config, &mut state).run(offset)?;
    debug_assert_eq!(final_offset + state.outstanding_byte_count, data.len());

    let (corrected, skipped_patches) = if config.produce_corrected_output {
        let mut out = data.to_vec();
        let skipped = state.patches.apply_to(&mut out);
        for stale in &skipped {
            emit!(config, Level::DEBUG, %stale, "patch skipped");
        }
        (Some(out), skipped)
    } else {
        (None, Vec::new())
    };

    Ok(GifReport {
        signature_valid: state.signature_valid,
        version: gif_header.version,
        screen,
        trailer_seen: state.trailer_seen,
        outstanding_byte_count: state.outstanding_byte_count,
        final_offset,
        patches: state.patches,
        graphic_blocks: state.graphic_blocks,
        special_purpose_blocks: state.special_purpose_blocks,
        corrected,
        skipped_patches,
    })
}
