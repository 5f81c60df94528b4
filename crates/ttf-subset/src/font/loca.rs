//! `loca` table processing.

use core::ops;

use super::Cursor;
use crate::{errors::ParseErrorKind, ParseError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LocaFormat {
    Short,
    Long,
}

impl LocaFormat {
    const fn bytes_per_offset(self) -> usize {
        match self {
            Self::Short => 2,
            Self::Long => 4,
        }
    }

    pub(crate) const fn to_raw(self) -> u16 {
        match self {
            Self::Short => 0,
            Self::Long => 1,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct LocaTable<'a> {
    format: LocaFormat,
    cursor: Cursor<'a>,
}

impl<'a> LocaTable<'a> {
    pub(crate) fn new(
        format: LocaFormat,
        glyph_count: u16,
        cursor: Cursor<'a>,
    ) -> Result<Self, ParseError> {
        let expected = format.bytes_per_offset() * (usize::from(glyph_count) + 1);
        // Some fonts pad `loca` beyond the last offset, so only a lower bound is enforced.
        if cursor.len() < expected {
            return Err(cursor.err(ParseErrorKind::UnexpectedTableLen {
                expected,
                actual: cursor.len(),
            }));
        }
        Ok(Self { format, cursor })
    }

    /// Returns the byte range of the glyph in the `glyf` table. The range is not checked against
    /// the `glyf` length.
    pub(crate) fn glyph_range(&self, glyph_idx: u16) -> Result<ops::Range<usize>, ParseError> {
        let glyph_idx = usize::from(glyph_idx);
        let mut cursor = self.cursor;
        let range = match self.format {
            LocaFormat::Short => {
                cursor.skip(glyph_idx * 2)?;
                let start_offset = usize::from(cursor.read_u16()?) * 2;
                let end_offset = usize::from(cursor.read_u16()?) * 2;
                start_offset..end_offset
            }
            LocaFormat::Long => {
                cursor.skip(glyph_idx * 4)?;
                let start_offset = cursor.read_u32()? as usize;
                let end_offset = cursor.read_u32()? as usize;
                start_offset..end_offset
            }
        };

        if range.start > range.end {
            return Err(cursor.err(ParseErrorKind::RangeOutOfBounds {
                range,
                len: self.cursor.len(),
            }));
        }
        Ok(range)
    }
}
