//! `GlyphRecord` and related types.

use super::Cursor;
use crate::{alloc::Vec, errors::ParseErrorKind, ParseError};

/// Raw `glyf` data for a single glyph.
#[derive(Debug, Clone)]
pub(crate) struct GlyphRecord<'a> {
    pub(crate) raw: &'a [u8],
    pub(crate) kind: GlyphKind,
}

#[derive(Debug, Clone)]
pub(crate) enum GlyphKind {
    Empty,
    Simple,
    Composite(Vec<ComponentRef>),
}

/// Reference to another glyph from a composite glyph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ComponentRef {
    /// Offset of the glyph index field within the glyph record.
    pub(crate) offset: usize,
    pub(crate) glyph_idx: u16,
}

impl<'a> GlyphRecord<'a> {
    pub(crate) fn new(raw: Cursor<'a>) -> Result<Self, ParseError> {
        if raw.is_empty() {
            return Ok(Self {
                raw: raw.bytes,
                kind: GlyphKind::Empty,
            });
        }

        let mut cursor = raw;
        let number_of_contours = cursor.read_i16()?;
        let kind = if number_of_contours < 0 {
            cursor.skip(8)?; // xMin, yMin, xMax, yMax
            let mut components = Vec::with_capacity(1);
            let mut has_more_components = true;
            while has_more_components {
                let offset = cursor.offset() - raw.offset() + 2;
                let (glyph_idx, new_has_more_components) = Self::read_component(&mut cursor)?;
                components.push(ComponentRef { offset, glyph_idx });
                has_more_components = new_has_more_components;
            }
            // Instructions may follow the last component; they're copied verbatim.
            GlyphKind::Composite(components)
        } else {
            GlyphKind::Simple
        };

        Ok(Self {
            raw: raw.bytes,
            kind,
        })
    }

    /// Reads a single component descriptor, returning the referenced glyph index and whether
    /// more components follow.
    fn read_component(cursor: &mut Cursor<'_>) -> Result<(u16, bool), ParseError> {
        const ARG_1_AND_2_ARE_WORDS: u16 = 0x0001;
        const WE_HAVE_A_SCALE: u16 = 0x0008;
        const MORE_COMPONENTS: u16 = 0x0020;
        const WE_HAVE_AN_X_AND_Y_SCALE: u16 = 0x0040;
        const WE_HAVE_A_TWO_BY_TWO: u16 = 0x0080;
        const TRANSFORM_MASK: u16 =
            WE_HAVE_A_SCALE | WE_HAVE_AN_X_AND_Y_SCALE | WE_HAVE_A_TWO_BY_TWO;

        let flags = cursor.read_u16_checked(|flags| {
            if (flags & TRANSFORM_MASK).count_ones() > 1 {
                return Err(ParseErrorKind::UnsupportedComponentFlags(flags));
            }
            Ok(flags)
        })?;
        let glyph_idx = cursor.read_u16()?;

        let args_len = if flags & ARG_1_AND_2_ARE_WORDS != 0 {
            4
        } else {
            2
        };
        let transform_len = match flags & TRANSFORM_MASK {
            WE_HAVE_A_SCALE => 2,
            WE_HAVE_AN_X_AND_Y_SCALE => 4,
            WE_HAVE_A_TWO_BY_TWO => 8,
            _ => 0,
        };
        cursor.skip(args_len + transform_len)?;

        let has_more_components = flags & MORE_COMPONENTS != 0;
        Ok((glyph_idx, has_more_components))
    }

    pub(crate) fn components(&self) -> &[ComponentRef] {
        match &self.kind {
            GlyphKind::Composite(components) => components,
            GlyphKind::Empty | GlyphKind::Simple => &[],
        }
    }

    /// Writes this glyph to `writer`, replacing component glyph indices using `map_glyph`.
    pub(crate) fn write(&self, writer: &mut Vec<u8>, map_glyph: impl Fn(u16) -> u16) {
        let start = writer.len();
        writer.extend_from_slice(self.raw);
        for component in self.components() {
            let new_idx = map_glyph(component.glyph_idx);
            let pos = start + component.offset;
            writer[pos..pos + 2].copy_from_slice(&new_idx.to_be_bytes());
        }
    }
}
