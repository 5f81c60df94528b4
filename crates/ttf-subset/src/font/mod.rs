//! TrueType parsing logic.

use core::fmt;

pub(crate) use self::{
    cmap::{parse_unicode_cmap, SegmentWithDelta},
    cursor::Cursor,
    directory::FontDirectory,
    glyph::GlyphRecord,
    hmtx::HmtxTable,
    loca::{LocaFormat, LocaTable},
    tables::{HeadTable, HheaTable, MaxpTable, Os2Table, PostTable},
};
pub use self::{cmap::CharMap, directory::TableRecord};
use crate::{alloc::Vec, errors::ParseErrorKind, write::OutputTables, ParseError};

mod cmap;
mod cursor;
mod directory;
mod glyph;
mod hmtx;
mod loca;
mod tables;

/// Tag of a font table, such as `head` or `glyf`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TableTag(pub(crate) [u8; 4]);

impl fmt::Debug for TableTag {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "TableTag({self})")
    }
}

impl fmt::Display for TableTag {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.iter().all(|&byte| byte.is_ascii_graphic() || byte == b' ') {
            for &byte in &self.0 {
                write!(formatter, "{}", char::from(byte))?;
            }
            Ok(())
        } else {
            write!(formatter, "{:#010x}", u32::from_be_bytes(self.0))
        }
    }
}

impl TableTag {
    /// Character to glyph mapping.
    pub const CMAP: Self = Self(*b"cmap");
    /// Control value table.
    pub const CVT: Self = Self(*b"cvt ");
    /// Font program.
    pub const FPGM: Self = Self(*b"fpgm");
    /// Grid-fitting / scan-conversion procedure.
    pub const GASP: Self = Self(*b"gasp");
    /// Glyph data.
    pub const GLYF: Self = Self(*b"glyf");
    /// Font header.
    pub const HEAD: Self = Self(*b"head");
    /// Horizontal header.
    pub const HHEA: Self = Self(*b"hhea");
    /// Horizontal metrics.
    pub const HMTX: Self = Self(*b"hmtx");
    /// Index to location.
    pub const LOCA: Self = Self(*b"loca");
    /// Maximum profile.
    pub const MAXP: Self = Self(*b"maxp");
    /// Naming table.
    pub const NAME: Self = Self(*b"name");
    /// OS/2 and Windows specific metrics.
    pub const OS2: Self = Self(*b"OS/2");
    /// PostScript information.
    pub const POST: Self = Self(*b"post");
    /// Control value program.
    pub const PREP: Self = Self(*b"prep");

    /// Creates a tag from its byte representation.
    pub const fn new(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    /// Returns the byte representation of this tag.
    pub const fn to_bytes(self) -> [u8; 4] {
        self.0
    }
}

/// TrueType font with a parsed table directory.
///
/// Creating a font only parses the table directory; individual tables are decoded on demand
/// by [`Self::metrics()`], [`Self::char_map()`] and [`FontSubset`](crate::FontSubset).
#[derive(Debug, Clone)]
pub struct Font<'a> {
    bytes: &'a [u8],
    sfnt_version: u32,
    directory: FontDirectory,
}

impl<'a> Font<'a> {
    pub(crate) const TRUETYPE_VERSION: u32 = 0x_0001_0000;
    /// `true` tag used by Apple TrueType fonts.
    pub(crate) const APPLE_VERSION: u32 = 0x_7472_7565;
    /// `OTTO` tag used by fonts with CFF outlines.
    pub(crate) const OTTO_VERSION: u32 = 0x_4f54_544f;
    /// `ttcf` tag used by font collections.
    pub(crate) const COLLECTION_VERSION: u32 = 0x_7474_6366;
    pub(crate) const SFNT_CHECKSUM: u32 = 0x_b1b0_afba;

    /// Parses the sfnt header and the table directory of a font.
    ///
    /// # Errors
    ///
    /// Returns an error if the font data is malformed, or if it's a CFF font or a font collection.
    pub fn new(bytes: &'a [u8]) -> Result<Self, ParseError> {
        let mut cursor = Cursor::new(bytes);
        let sfnt_version = cursor.read_u32_checked(|version| match version {
            Self::TRUETYPE_VERSION | Self::APPLE_VERSION => Ok(version),
            Self::OTTO_VERSION | Self::COLLECTION_VERSION => {
                Err(ParseErrorKind::UnsupportedFontFormat(version))
            }
            _ => Err(ParseErrorKind::UnexpectedFontVersion(version)),
        })?;
        let directory = FontDirectory::parse(&mut cursor, bytes.len())?;

        Ok(Self {
            bytes,
            sfnt_version,
            directory,
        })
    }

    /// Returns the sfnt version tag of the font (`0x00010000` or `'true'`).
    pub fn sfnt_version(&self) -> u32 {
        self.sfnt_version
    }

    /// Iterates over the table records in the ascending tag order.
    pub fn table_records(&self) -> impl ExactSizeIterator<Item = &TableRecord> + '_ {
        self.directory.records()
    }

    /// Returns raw data for the specified table, or `None` if the font doesn't contain the table.
    pub fn table_data(&self, tag: TableTag) -> Option<&'a [u8]> {
        self.optional_table(tag).map(|cursor| cursor.bytes)
    }

    pub(crate) fn optional_table(&self, tag: TableTag) -> Option<Cursor<'a>> {
        let record = self.directory.get(tag)?;
        let range = record.data_range();
        let start = range.start;
        // The range is checked when parsing the directory.
        Some(Cursor::for_table(&self.bytes[range], start, tag))
    }

    pub(crate) fn table(&self, tag: TableTag) -> Result<Cursor<'a>, ParseError> {
        self.optional_table(tag)
            .ok_or_else(|| ParseError::missing_table(tag))
    }

    /// Decodes the Unicode character map of the font.
    ///
    /// # Errors
    ///
    /// Returns an error if the `cmap` table is missing or malformed, or if it doesn't contain
    /// a format-4 Unicode subtable.
    pub fn char_map(&self) -> Result<CharMap, ParseError> {
        let cmap = parse_unicode_cmap(self.table(TableTag::CMAP)?)?;
        Ok(cmap.to_char_map())
    }

    /// Serializes all tables of this font into a new TrueType font. Table data is preserved
    /// verbatim (except for `checksumAdjustment` in the `head` table); the table directory
    /// is normalized.
    pub fn to_truetype(&self) -> Vec<u8> {
        let mut tables = OutputTables::default();
        for record in self.directory.records() {
            let data = &self.bytes[record.data_range()];
            if record.tag == TableTag::HEAD && data.len() >= HeadTable::CHECKSUM_OFFSET + 4 {
                tables.insert_with(TableTag::HEAD, |buffer| {
                    buffer.extend_from_slice(data);
                    let offset = HeadTable::CHECKSUM_OFFSET;
                    buffer[offset..offset + 4].fill(0);
                });
            } else {
                tables.insert(record.tag, data);
            }
        }
        tables.into_writer(self.sfnt_version).into_opentype()
    }

    /// Computes the checksum of the provided data as the wrapping sum of big-endian `u32` words.
    /// The data is implicitly padded with zeros to a 4-byte boundary.
    pub(crate) fn checksum(data: &[u8]) -> u32 {
        data.chunks(4).fold(0_u32, |acc, chunk| {
            let mut word = [0_u8; 4];
            word[..chunk.len()].copy_from_slice(chunk);
            acc.wrapping_add(u32::from_be_bytes(word))
        })
    }
}
