use crate::common::ParseError;
use core::mem::size_of;

/// Read position over an immutable gif buffer.
///
/// Reads only ever move forward, and a read that would run past the end of the buffer fails
/// without moving the cursor.
#[derive(Clone, Debug)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn at(data: &'a [u8], offset: usize) -> Self {
        Self { data, offset }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.offset)
    }

    pub fn peek(&self) -> Option<u8> {
        self.data.get(self.offset).copied()
    }

    pub(crate) fn take_byte(&mut self) -> Result<u8, ParseError> {
        let byte = self.peek().ok_or(ParseError::IncompleteStream {
            offset: self.offset,
            needed: size_of::<u8>(),
        })?;
        self.offset += size_of::<u8>();
        Ok(byte)
    }

    pub(crate) fn take_u16_le(&mut self) -> Result<u16, ParseError> {
        self.take_arr().map(u16::from_le_bytes)
    }

    #[inline]
    pub(crate) fn take_arr<const N: usize>(&mut self) -> Result<[u8; N], ParseError> {
        let end = self.offset.saturating_add(N);
        let arr: [u8; N] = self
            .data
            .get(self.offset..end)
            .and_then(|slice| slice.try_into().ok())
            .ok_or(ParseError::IncompleteStream {
                offset: self.offset,
                needed: N - self.remaining().min(N),
            })?;
        self.offset = end;
        Ok(arr)
    }

    /// Consume one byte that must equal `expected`.
    pub(crate) fn expect_byte(&mut self, expected: u8) -> Result<(), ParseError> {
        let offset = self.offset;
        match self.take_byte()? {
            found if found == expected => Ok(()),
            found => Err(ParseError::UnexpectedIntroducerOrLabel {
                offset,
                expected,
                found,
            }),
        }
    }

    /// Consume a size byte that must hold a fixed value.
    pub(crate) fn expect_size(&mut self, expected: u8) -> Result<(), ParseError> {
        let offset = self.offset;
        match self.take_byte()? {
            found if found == expected => Ok(()),
            found => Err(ParseError::UnexpectedFixedBlockSize {
                offset,
                expected,
                found,
            }),
        }
    }

    /// Skip a span whose length was declared by the stream itself.
    pub(crate) fn seek_by(&mut self, len: usize) -> Result<(), ParseError> {
        let remaining = self.remaining();
        if len > remaining {
            return Err(ParseError::TruncatedBuffer {
                offset: self.offset,
                declared: len,
                remaining,
            });
        }
        self.offset += len;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_advance_and_stop_at_the_end() {
        let data = [0x01, 0x02, 0x03];
        let mut bytes = ByteCursor::at(&data, 0);
        assert_eq!(bytes.take_u16_le().unwrap(), 0x0201);
        assert_eq!(bytes.take_byte().unwrap(), 0x03);
        assert_eq!(
            bytes.take_byte(),
            Err(ParseError::IncompleteStream {
                offset: 3,
                needed: 1
            })
        );
        assert_eq!(bytes.offset(), 3);
    }

    #[test]
    fn short_array_reports_missing_bytes_without_moving() {
        let data = [b'G', b'I'];
        let mut bytes = ByteCursor::at(&data, 0);
        assert_eq!(
            bytes.take_arr::<6>(),
            Err(ParseError::IncompleteStream {
                offset: 0,
                needed: 4
            })
        );
        assert_eq!(bytes.offset(), 0);
    }

    #[test]
    fn declared_span_past_the_end_is_truncation() {
        let data = [0u8; 10];
        let mut bytes = ByteCursor::at(&data, 4);
        assert_eq!(
            bytes.seek_by(7),
            Err(ParseError::TruncatedBuffer {
                offset: 4,
                declared: 7,
                remaining: 6
            })
        );
        bytes.seek_by(6).unwrap();
        assert_eq!(bytes.remaining(), 0);
    }

    #[test]
    fn expectations_report_found_byte() {
        let data = [0x21, 0x05];
        let mut bytes = ByteCursor::at(&data, 0);
        bytes.expect_byte(0x21).unwrap();
        assert_eq!(
            bytes.expect_size(0x04),
            Err(ParseError::UnexpectedFixedBlockSize {
                offset: 1,
                expected: 4,
                found: 5
            })
        );
    }
}
