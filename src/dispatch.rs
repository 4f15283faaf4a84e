//! The `<Data>* Trailer` loop and forged-trailer recovery.

use std::borrow::Cow;

use tracing::Level;

use crate::blocks::{GraphicBlock, SpecialPurposeBlock, Trailer};
use crate::common::{Block, ExtensionLabel, ParseError, Rejections, EXTENSION_INTRODUCER};
use crate::config::Config;
use crate::patch::{Patch, PatchLedger};

/// Everything one parse learns about a stream, threaded through the block loop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct GifParseState {
    pub signature_valid: bool,
    pub trailer_seen: bool,
    /// Bytes left after the trailer that ended the parse.
    pub outstanding_byte_count: usize,
    pub patches: PatchLedger,
    pub graphic_blocks: usize,
    pub special_purpose_blocks: usize,
}

enum DispatchState {
    Scanning(usize),
    Done(usize),
    Failed(ParseError),
}

/// Reads blocks until a trailer ends the stream or nothing matches.
pub(crate) struct BlockDispatcher<'a, 'c> {
    /// The input, plus any substitutions the heuristic has committed.
    working: Cow<'a, [u8]>,
    config: &'c Config,
    state: &'c mut GifParseState,
}

impl<'a, 'c> BlockDispatcher<'a, 'c> {
    pub fn new(data: &'a [u8], config: &'c Config, state: &'c mut GifParseState) -> Self {
        Self {
            working: Cow::Borrowed(data),
            config,
            state,
        }
    }

    /// Run from `offset` and return the offset just past the trailer that ended the stream.
    pub fn run(mut self, offset: usize) -> Result<usize, ParseError> {
        let mut dispatch = DispatchState::Scanning(offset);
        loop {
            dispatch = match dispatch {
                DispatchState::Scanning(offset) => self.step(offset),
                DispatchState::Done(offset) => return Ok(offset),
                DispatchState::Failed(e) => return Err(e),
            };
        }
    }

    /// Try special-purpose block, graphic block, then trailer, taking the first that matches.
    fn step(&mut self, offset: usize) -> DispatchState {
        let config = self.config;
        if offset >= self.working.len() {
            emit!(config, Level::INFO, offset, "stream ended before a trailer");
            return DispatchState::Failed(ParseError::IncompleteStream { offset, needed: 1 });
        }

        let special_purpose = match SpecialPurposeBlock::parse(&self.working, offset, config) {
            Ok((_, next)) => {
                self.state.special_purpose_blocks += 1;
                emit!(config, Level::INFO, offset, "read special-purpose block");
                return DispatchState::Scanning(next);
            }
            Err(e) => e,
        };

        let graphic = match GraphicBlock::parse(&self.working, offset, config) {
            Ok((_, next)) => {
                emit!(
                    config,
                    Level::INFO,
                    offset,
                    "finished reading graphic block (#{})",
                    self.state.graphic_blocks
                );
                self.state.graphic_blocks += 1;
                return DispatchState::Scanning(next);
            }
            Err(e) => e,
        };

        let trailer = match Trailer::parse(&self.working, offset, config) {
            Ok((_, next)) => return self.on_trailer(offset, next),
            Err(e) => e,
        };

        self.unrecognized(
            offset,
            Rejections {
                special_purpose,
                graphic,
                trailer,
            },
        )
    }

    fn on_trailer(&mut self, trailer_offset: usize, next: usize) -> DispatchState {
        let config = self.config;
        let len = self.working.len();
        self.state.trailer_seen = true;
        self.state.outstanding_byte_count = len - next;

        if self.state.outstanding_byte_count == 0 {
            emit!(config, Level::INFO, offset = trailer_offset, len, "read trailer");
            return DispatchState::Done(next);
        }

        emit!(
            config,
            Level::WARN,
            offset = trailer_offset,
            len,
            outstanding = self.state.outstanding_byte_count,
            "data after the trailer, there may be hidden frames or image data"
        );
        if !config.recover_forged_trailers {
            emit!(
                config,
                Level::WARN,
                "enable forged trailer recovery to reprocess data after the trailer"
            );
            return DispatchState::Done(next);
        }

        match self.recover_forged_trailer(trailer_offset) {
            Some(resume) => DispatchState::Scanning(resume),
            None => DispatchState::Done(next),
        }
    }

    /// Re-read the trailer at `trailer_offset` as an extension introducer.
    ///
    /// The graphic block production runs against a scratch copy carrying the substitution. On
    /// success that copy becomes the working buffer; otherwise it is dropped.
    fn recover_forged_trailer(&mut self, trailer_offset: usize) -> Option<usize> {
        let config = self.config;
        let mut scratch = self.working.to_vec();
        scratch[trailer_offset] = EXTENSION_INTRODUCER;

        match GraphicBlock::parse(&scratch, trailer_offset, config) {
            Ok((_, next)) => {
                self.working = Cow::Owned(scratch);
                self.state.patches.record(Patch::forged_trailer(trailer_offset));
                self.state.graphic_blocks += 1;
                emit!(
                    config,
                    Level::WARN,
                    offset = trailer_offset,
                    end = next,
                    "read a graphic block over the trailer byte, the trailer was fake"
                );
                Some(next)
            }
            Err(e) => {
                emit!(
                    config,
                    Level::DEBUG,
                    offset = trailer_offset,
                    reason = %e,
                    "trailer is genuine"
                );
                None
            }
        }
    }

    fn unrecognized(&self, offset: usize, rejections: Rejections) -> DispatchState {
        let config = self.config;
        let next_bytes = &self.working[offset..self.working.len().min(offset + 2)];
        let block = next_bytes.first().copied().and_then(Block::from_u8);
        let label = next_bytes.get(1).copied().and_then(ExtensionLabel::from_u8);
        emit!(
            config,
            Level::INFO,
            offset,
            next_bytes = ?next_bytes,
            ?block,
            ?label,
            "next bytes are not a graphic block, special-purpose block or trailer"
        );
        emit!(config, Level::INFO, "not a graphic block because: {}", rejections.graphic);
        emit!(
            config,
            Level::INFO,
            "not a special-purpose block because: {}",
            rejections.special_purpose
        );
        emit!(config, Level::INFO, "not a trailer because: {}", rejections.trailer);

        // Running out of data mid-block is truncation, not an unknown block.
        if let Some(exhausted) = rejections.exhaustion() {
            return DispatchState::Failed(exhausted.clone());
        }
        DispatchState::Failed(ParseError::UnrecognizedBlock {
            offset,
            rejections: Box::new(rejections),
        })
    }
}
