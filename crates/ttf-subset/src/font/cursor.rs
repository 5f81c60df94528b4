//! Bounds-checked reading of big-endian font data.

use core::ops;

use crate::{errors::ParseErrorKind, ParseError, TableTag};

/// Copyable read cursor over a slice of the font data.
///
/// Besides the remaining bytes, the cursor tracks the absolute offset of these bytes in the font
/// and the table they belong to, so that errors can be reported with context.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Cursor<'a> {
    pub(crate) bytes: &'a [u8],
    offset: usize,
    table: Option<TableTag>,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            offset: 0,
            table: None,
        }
    }

    /// Creates a cursor over a table located at the specified `offset` in the font data.
    pub(crate) fn for_table(bytes: &'a [u8], offset: usize, table: TableTag) -> Self {
        Self {
            bytes,
            offset,
            table: Some(table),
        }
    }

    pub(crate) fn err(&self, kind: ParseErrorKind) -> ParseError {
        ParseError {
            kind,
            offset: self.offset,
            table: self.table,
        }
    }

    pub(crate) fn offset(&self) -> usize {
        self.offset
    }

    pub(crate) fn len(&self) -> usize {
        self.bytes.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub(crate) fn skip(&mut self, n: usize) -> Result<(), ParseError> {
        if self.bytes.len() < n {
            Err(self.err(ParseErrorKind::UnexpectedEof))
        } else {
            self.bytes = &self.bytes[n..];
            self.offset += n;
            Ok(())
        }
    }

    pub(crate) fn read_byte_array<const N: usize>(&mut self) -> Result<[u8; N], ParseError> {
        let Some((head, tail)) = self.bytes.split_first_chunk::<N>() else {
            return Err(self.err(ParseErrorKind::UnexpectedEof));
        };
        self.bytes = tail;
        self.offset += N;
        Ok(*head)
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16, ParseError> {
        self.read_byte_array().map(u16::from_be_bytes)
    }

    pub(crate) fn read_i16(&mut self) -> Result<i16, ParseError> {
        self.read_byte_array().map(i16::from_be_bytes)
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32, ParseError> {
        self.read_byte_array().map(u32::from_be_bytes)
    }

    pub(crate) fn read_i32(&mut self) -> Result<i32, ParseError> {
        self.read_byte_array().map(i32::from_be_bytes)
    }

    pub(crate) fn read_tag(&mut self) -> Result<TableTag, ParseError> {
        self.read_byte_array().map(TableTag)
    }

    /// Reads a `u16` value and validates it with the provided closure. Errors are reported
    /// at the offset of the value.
    pub(crate) fn read_u16_checked<T>(
        &mut self,
        check: impl FnOnce(u16) -> Result<T, ParseErrorKind>,
    ) -> Result<T, ParseError> {
        let start = *self;
        let value = self.read_u16()?;
        check(value).map_err(|kind| start.err(kind))
    }

    /// Reads a `u32` value and validates it with the provided closure. Errors are reported
    /// at the offset of the value.
    pub(crate) fn read_u32_checked<T>(
        &mut self,
        check: impl FnOnce(u32) -> Result<T, ParseErrorKind>,
    ) -> Result<T, ParseError> {
        let start = *self;
        let value = self.read_u32()?;
        check(value).map_err(|kind| start.err(kind))
    }

    /// Splits off the first `len` bytes as a separate cursor, advancing this cursor past them.
    pub(crate) fn split_at(&mut self, len: usize) -> Result<Self, ParseError> {
        let head = self.range(0..len)?;
        self.skip(len)?;
        Ok(head)
    }

    /// Returns a cursor over the specified `range` of the remaining bytes.
    pub(crate) fn range(&self, range: ops::Range<usize>) -> Result<Self, ParseError> {
        let bytes = self.bytes.get(range.clone()).ok_or_else(|| {
            self.err(ParseErrorKind::RangeOutOfBounds {
                range: range.clone(),
                len: self.bytes.len(),
            })
        })?;
        Ok(Self {
            bytes,
            offset: self.offset + range.start,
            table: self.table,
        })
    }

    /// Returns a cursor positioned at the specified `offset` from the start of remaining bytes.
    pub(crate) fn seek(&self, offset: usize) -> Result<Self, ParseError> {
        if offset > self.bytes.len() {
            return Err(self.err(ParseErrorKind::OffsetOutOfBounds(offset)));
        }
        self.range(offset..self.bytes.len())
    }
}
