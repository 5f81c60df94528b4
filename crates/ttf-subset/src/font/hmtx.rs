//! `hmtx` table processing.

use super::Cursor;
use crate::ParseError;

/// Horizontal metrics: `numberOfHMetrics` (advance, lsb) pairs followed by lsb-only entries
/// that reuse the last advance.
#[derive(Debug, Clone, Copy)]
pub(crate) struct HmtxTable<'a> {
    cursor: Cursor<'a>,
    number_of_h_metrics: u16,
}

impl<'a> HmtxTable<'a> {
    pub(crate) fn new(
        cursor: Cursor<'a>,
        number_of_h_metrics: u16,
        glyph_count: u16,
    ) -> Result<Self, ParseError> {
        // Check that the last glyph can be read so that lookups for valid glyphs cannot fail later.
        let this = Self {
            cursor,
            number_of_h_metrics,
        };
        this.advance_and_lsb(glyph_count - 1)?;
        Ok(this)
    }

    /// Returns raw advance width and left side bearing for the specified glyph.
    pub(crate) fn advance_and_lsb(&self, glyph_idx: u16) -> Result<(u16, u16), ParseError> {
        let (advance, lsb);
        if glyph_idx < self.number_of_h_metrics {
            let mut cursor = self.cursor.seek(usize::from(glyph_idx) * 4)?;
            advance = cursor.read_u16()?;
            lsb = cursor.read_u16()?;
        } else {
            let advance_offset = usize::from(self.number_of_h_metrics - 1) * 4;
            advance = self.cursor.seek(advance_offset)?.read_u16()?;

            let lsb_offset = usize::from(self.number_of_h_metrics) * 4
                + usize::from(glyph_idx - self.number_of_h_metrics) * 2;
            lsb = self.cursor.seek(lsb_offset)?.read_u16()?;
        }
        Ok((advance, lsb))
    }

    /// Iterates over raw advance widths for glyphs `0..glyph_count`.
    pub(crate) fn advances(
        &self,
        glyph_count: u16,
    ) -> impl Iterator<Item = Result<(u16, u16), ParseError>> + '_ {
        let mut cursor = self.cursor;
        let mut last_advance = 0;
        (0..glyph_count).map(move |glyph_idx| {
            if glyph_idx < self.number_of_h_metrics {
                last_advance = cursor.read_u16()?;
                cursor.skip(2)?; // lsb
            }
            Ok((glyph_idx, last_advance))
        })
    }
}
