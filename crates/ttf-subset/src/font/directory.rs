//! sfnt table directory.

use crate::{
    alloc::BTreeMap,
    errors::ParseErrorKind,
    font::{Cursor, TableTag},
    ParseError,
};

/// Record in the sfnt table directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableRecord {
    pub(crate) tag: TableTag,
    pub(crate) checksum: u32,
    pub(crate) offset: u32,
    pub(crate) length: u32,
}

impl TableRecord {
    fn parse(cursor: &mut Cursor<'_>) -> Result<Self, ParseError> {
        Ok(Self {
            tag: cursor.read_tag()?,
            checksum: cursor.read_u32()?,
            offset: cursor.read_u32()?,
            length: cursor.read_u32()?,
        })
    }

    /// Returns the table tag.
    pub fn tag(&self) -> TableTag {
        self.tag
    }

    /// Returns the table checksum as recorded in the directory.
    pub fn checksum(&self) -> u32 {
        self.checksum
    }

    /// Returns the offset of the table from the start of the font data.
    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// Returns the unpadded table length in bytes.
    pub fn length(&self) -> u32 {
        self.length
    }

    pub(crate) fn data_range(&self) -> core::ops::Range<usize> {
        let start = self.offset as usize;
        start..start.saturating_add(self.length as usize)
    }
}

/// Table directory of a font: unique tags mapped to their records.
#[derive(Debug, Clone, Default)]
pub(crate) struct FontDirectory {
    records: BTreeMap<TableTag, TableRecord>,
}

impl FontDirectory {
    /// Parses the directory following the 4-byte sfnt version. Checks that every table lies
    /// within `font_len` bytes.
    pub(super) fn parse(cursor: &mut Cursor<'_>, font_len: usize) -> Result<Self, ParseError> {
        let table_count = cursor.read_u16()?;
        cursor.skip(6)?; // searchRange, entrySelector, rangeShift

        let mut records = BTreeMap::new();
        for _ in 0..table_count {
            let record_cursor = *cursor;
            let record = TableRecord::parse(cursor)?;
            let range = record.data_range();
            if range.end > font_len {
                return Err(record_cursor
                    .err(ParseErrorKind::RangeOutOfBounds {
                        range,
                        len: font_len,
                    })
                    .with_table(record.tag));
            }
            if records.insert(record.tag, record).is_some() {
                return Err(record_cursor
                    .err(ParseErrorKind::DuplicateTable)
                    .with_table(record.tag));
            }
        }
        Ok(Self { records })
    }

    pub(crate) fn get(&self, tag: TableTag) -> Option<&TableRecord> {
        self.records.get(&tag)
    }

    pub(crate) fn records(&self) -> impl ExactSizeIterator<Item = &TableRecord> + '_ {
        self.records.values()
    }
}
