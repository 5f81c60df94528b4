//! `cmap` table processing.

use super::Cursor;
use crate::{
    alloc::{BTreeMap, Vec},
    errors::ParseErrorKind,
    ParseError,
};

/// Bidirectional mapping between character codes and glyph indices, decoded from a Unicode
/// format-4 subtable of the `cmap` table.
///
/// Codes mapped to the missing glyph (glyph #0) are not recorded.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CharMap {
    code_to_glyph: BTreeMap<u16, u16>,
    #[cfg_attr(feature = "serde", serde(skip))]
    glyph_to_codes: BTreeMap<u16, Vec<u16>>,
}

impl CharMap {
    fn insert(&mut self, code: u16, glyph_idx: u16) {
        self.code_to_glyph.insert(code, glyph_idx);
        self.glyph_to_codes.entry(glyph_idx).or_default().push(code);
    }

    /// Returns the glyph index for the specified code, or `None` if the code is not mapped.
    pub fn glyph(&self, code: u16) -> Option<u16> {
        self.code_to_glyph.get(&code).copied()
    }

    /// Returns all codes mapped to the specified glyph in the ascending order.
    pub fn codes(&self, glyph_idx: u16) -> &[u16] {
        self.glyph_to_codes
            .get(&glyph_idx)
            .map_or(&[], Vec::as_slice)
    }

    /// Iterates over (code, glyph index) pairs in the ascending code order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (u16, u16)> + '_ {
        self.code_to_glyph
            .iter()
            .map(|(&code, &glyph_idx)| (code, glyph_idx))
    }

    /// Returns the number of mapped codes.
    pub fn len(&self) -> usize {
        self.code_to_glyph.len()
    }

    /// Checks whether this map is empty.
    pub fn is_empty(&self) -> bool {
        self.code_to_glyph.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SegmentWithDelta {
    pub(crate) start_code: u16,
    pub(crate) end_code: u16,
    pub(crate) id_delta: u16,
    pub(crate) id_range_offset: u16,
}

/// Segment mapping to delta values (format 4) subtable of the `cmap` table.
#[derive(Debug, Clone)]
pub(crate) struct SegmentDeltas<'a> {
    pub(crate) segments: Vec<SegmentWithDelta>,
    /// Subtable bytes starting from the `idRangeOffset` array, up to the subtable end.
    /// `idRangeOffset`s are counted from the position of the corresponding array element.
    pub(crate) id_range_data: &'a [u8],
}

impl<'a> SegmentDeltas<'a> {
    pub(crate) const FORMAT: u16 = 4;

    fn parse(subtable: Cursor<'a>) -> Result<Self, ParseError> {
        let mut cursor = subtable;
        cursor.read_u16_checked(|format| {
            if format != Self::FORMAT {
                return Err(ParseErrorKind::UnexpectedTableFormat(format));
            }
            Ok(())
        })?;
        let subtable_len = usize::from(cursor.read_u16()?);
        // `length` is unreliable in some fonts with large subtables; it's only used as a limit.
        let subtable_len = subtable_len.clamp(4, subtable.len());
        cursor = subtable.range(4..subtable_len)?;

        cursor.skip(2)?; // language
        let segment_count = cursor.read_u16()? / 2;
        cursor.skip(6)?; // searchRange, entrySelector, rangeShift

        let vec_len = 2 * usize::from(segment_count);
        let mut end_codes = cursor.split_at(vec_len)?;
        cursor.skip(2)?; // reserved padding
        let mut start_codes = cursor.split_at(vec_len)?;
        let mut id_deltas = cursor.split_at(vec_len)?;
        let id_range_data = cursor.bytes;
        let mut id_range_offsets = cursor.split_at(vec_len)?;

        let segments = (0..segment_count).map(|_| {
            Ok(SegmentWithDelta {
                start_code: start_codes.read_u16()?,
                end_code: end_codes.read_u16()?,
                id_delta: id_deltas.read_u16()?,
                id_range_offset: id_range_offsets.read_u16()?,
            })
        });

        Ok(Self {
            segments: segments.collect::<Result<_, ParseError>>()?,
            id_range_data,
        })
    }

    fn glyph_idx(&self, segment_idx: usize, code: u16) -> u16 {
        let segment = &self.segments[segment_idx];
        if segment.id_range_offset == 0 {
            return segment.id_delta.wrapping_add(code);
        }

        // Offset is counted from the `idRangeOffset` element for the segment
        let byte_offset = 2 * segment_idx
            + usize::from(segment.id_range_offset)
            + 2 * usize::from(code - segment.start_code);
        let Some(&[hi, lo]) = self.id_range_data.get(byte_offset..byte_offset + 2) else {
            return 0; // out-of-bounds offsets map to the missing glyph
        };
        match u16::from_be_bytes([hi, lo]) {
            0 => 0,
            glyph_idx => segment.id_delta.wrapping_add(glyph_idx),
        }
    }

    pub(crate) fn to_char_map(&self) -> CharMap {
        let mut char_map = CharMap::default();
        // Codes below this value are already covered by previous segments.
        let mut next_code = 0_u32;
        for (segment_idx, segment) in self.segments.iter().enumerate() {
            if segment.start_code > segment.end_code {
                log::warn!(
                    "skipping `cmap` segment #{segment_idx} with start code {:#06x} > end code {:#06x}",
                    segment.start_code,
                    segment.end_code
                );
                continue;
            }

            let start = u32::from(segment.start_code).max(next_code);
            let end = u32::from(segment.end_code);
            for code in start..=end {
                #[allow(clippy::cast_possible_truncation)] // `code <= end_code`, which is `u16`
                let code = code as u16;
                let glyph_idx = self.glyph_idx(segment_idx, code);
                if glyph_idx != 0 {
                    char_map.insert(code, glyph_idx);
                }
            }
            next_code = next_code.max(end + 1);
        }
        char_map
    }
}

/// Finds and parses the Unicode format-4 subtable.
pub(crate) fn parse_unicode_cmap(table: Cursor<'_>) -> Result<SegmentDeltas<'_>, ParseError> {
    const UNICODE_PLATFORM: u16 = 0;
    const WINDOWS_PLATFORM: u16 = 3;
    const WINDOWS_UNICODE_BMP_ENCODING: u16 = 1;

    let mut cursor = table;
    cursor.read_u16_checked(|version| {
        if version != 0 {
            return Err(ParseErrorKind::UnexpectedTableVersion(version.into()));
        }
        Ok(())
    })?;

    let num_tables = cursor.read_u16()?;
    for _ in 0..num_tables {
        let platform_id = cursor.read_u16()?;
        let encoding_id = cursor.read_u16()?;
        let offset = cursor.read_u32()? as usize;
        let is_unicode = platform_id == UNICODE_PLATFORM
            || (platform_id == WINDOWS_PLATFORM && encoding_id == WINDOWS_UNICODE_BMP_ENCODING);
        if !is_unicode {
            continue;
        }

        let subtable = table.seek(offset)?;
        if subtable.range(0..2)?.read_u16()? == SegmentDeltas::FORMAT {
            return SegmentDeltas::parse(subtable);
        }
    }
    Err(cursor.err(ParseErrorKind::NoUnicodeCmap))
}
