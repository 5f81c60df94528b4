//! Fixed-layout header tables: `head`, `hhea`, `maxp`, `OS/2` and `post`.

use super::{Cursor, LocaFormat};
use crate::{errors::ParseErrorKind, Fixed, ParseError};

/// Parsed `head` table.
#[derive(Debug, Clone, Copy)]
pub(crate) struct HeadTable<'a> {
    pub(crate) raw: &'a [u8],
    pub(crate) units_per_em: u16,
    /// xMin, yMin, xMax, yMax in font units.
    pub(crate) bbox: [i16; 4],
    pub(crate) loca_format: LocaFormat,
}

impl<'a> HeadTable<'a> {
    pub(crate) const CHECKSUM_OFFSET: usize = 8;
    pub(crate) const LOCA_FORMAT_OFFSET: usize = 50;
    const MIN_LEN: usize = 54;

    pub(crate) fn parse(mut cursor: Cursor<'a>) -> Result<Self, ParseError> {
        let raw = cursor.bytes;
        if raw.len() < Self::MIN_LEN {
            return Err(cursor.err(ParseErrorKind::UnexpectedTableLen {
                expected: Self::MIN_LEN,
                actual: raw.len(),
            }));
        }

        cursor.read_u32_checked(|version| {
            if version != 0x_0001_0000 {
                return Err(ParseErrorKind::UnexpectedTableVersion(version));
            }
            Ok(())
        })?;
        cursor.skip(14)?; // fontRevision, checksumAdjustment, magicNumber, flags
        let units_per_em = cursor.read_u16_checked(|value| {
            if value == 0 {
                return Err(ParseErrorKind::UnexpectedValue {
                    field: "unitsPerEm",
                    value: 0,
                });
            }
            Ok(value)
        })?;
        cursor.skip(16)?; // created, modified
        let bbox = [
            cursor.read_i16()?,
            cursor.read_i16()?,
            cursor.read_i16()?,
            cursor.read_i16()?,
        ];
        cursor.skip(6)?; // macStyle, lowestRecPPEM, fontDirectionHint

        let loca_format = cursor.read_u16_checked(|format| match format {
            0 => Ok(LocaFormat::Short),
            1 => Ok(LocaFormat::Long),
            _ => Err(ParseErrorKind::UnexpectedValue {
                field: "indexToLocFormat",
                value: format.into(),
            }),
        })?;
        cursor.read_u16_checked(|format| {
            if format != 0 {
                return Err(ParseErrorKind::UnexpectedTableFormat(format));
            }
            Ok(())
        })?;

        Ok(Self {
            raw,
            units_per_em,
            bbox,
            loca_format,
        })
    }
}

/// Parsed `hhea` table.
#[derive(Debug, Clone, Copy)]
pub(crate) struct HheaTable<'a> {
    pub(crate) raw: &'a [u8],
    pub(crate) ascender: i16,
    pub(crate) descender: i16,
    pub(crate) number_of_h_metrics: u16,
}

impl<'a> HheaTable<'a> {
    pub(crate) const MIN_LEN: usize = 36;

    pub(crate) fn parse(mut cursor: Cursor<'a>) -> Result<Self, ParseError> {
        let raw = cursor.bytes;
        if raw.len() < Self::MIN_LEN {
            return Err(cursor.err(ParseErrorKind::UnexpectedTableLen {
                expected: Self::MIN_LEN,
                actual: raw.len(),
            }));
        }

        cursor.skip(4)?; // version
        let ascender = cursor.read_i16()?;
        let descender = cursor.read_i16()?;
        cursor.skip(24)?; // lineGap .. reserved fields
        cursor.read_u16_checked(|format| {
            if format != 0 {
                return Err(ParseErrorKind::UnexpectedTableFormat(format));
            }
            Ok(())
        })?;
        let number_of_h_metrics = cursor.read_u16_checked(|value| {
            if value == 0 {
                return Err(ParseErrorKind::UnexpectedValue {
                    field: "numberOfHMetrics",
                    value: 0,
                });
            }
            Ok(value)
        })?;

        Ok(Self {
            raw,
            ascender,
            descender,
            number_of_h_metrics,
        })
    }
}

/// Parsed `maxp` table.
#[derive(Debug, Clone, Copy)]
pub(crate) struct MaxpTable<'a> {
    pub(crate) raw: &'a [u8],
    pub(crate) glyph_count: u16,
}

impl<'a> MaxpTable<'a> {
    pub(crate) const GLYPH_COUNT_OFFSET: usize = 4;

    pub(crate) fn parse(mut cursor: Cursor<'a>) -> Result<Self, ParseError> {
        let raw = cursor.bytes;
        cursor.read_u32_checked(|version| {
            if version != 0x_0000_5000 && version != 0x_0001_0000 {
                return Err(ParseErrorKind::UnexpectedTableVersion(version));
            }
            Ok(())
        })?;
        let glyph_count = cursor.read_u16_checked(|count| {
            if count == 0 {
                // The font must contain at least the missing glyph
                return Err(ParseErrorKind::UnexpectedValue {
                    field: "numGlyphs",
                    value: 0,
                });
            }
            Ok(count)
        })?;
        Ok(Self { raw, glyph_count })
    }
}

/// Parsed `OS/2` table.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Os2Table {
    pub(crate) weight_class: u16,
    pub(crate) typo_ascender: i16,
    pub(crate) typo_descender: i16,
    /// Only present for table versions >1.
    pub(crate) cap_height: Option<i16>,
}

impl Os2Table {
    const RESTRICTED_LICENSE: u16 = 0x_0002;
    const NO_SUBSETTING_OR_BITMAP_ONLY: u16 = 0x_0300;

    /// Parses the table, failing if the font license forbids embedding.
    pub(crate) fn parse(mut cursor: Cursor<'_>) -> Result<Self, ParseError> {
        let version = cursor.read_u16()?;
        cursor.skip(2)?; // xAvgCharWidth
        let weight_class = cursor.read_u16()?;
        cursor.skip(2)?; // usWidthClass
        cursor.read_u16_checked(|fs_type| {
            if fs_type == Self::RESTRICTED_LICENSE
                || fs_type & Self::NO_SUBSETTING_OR_BITMAP_ONLY != 0
            {
                return Err(ParseErrorKind::EmbeddingForbidden { fs_type });
            }
            Ok(())
        })?;
        cursor.skip(58)?; // subscript / superscript metrics .. usLastCharIndex
        let typo_ascender = cursor.read_i16()?;
        let typo_descender = cursor.read_i16()?;

        let cap_height = if version > 1 {
            cursor.skip(16)?; // sTypoLineGap .. sxHeight
            Some(cursor.read_i16()?)
        } else {
            None
        };

        Ok(Self {
            weight_class,
            typo_ascender,
            typo_descender,
            cap_height,
        })
    }
}

/// Parsed `post` table.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PostTable<'a> {
    /// Header of the table; the glyph name data is not retained.
    pub(crate) header: &'a [u8],
    pub(crate) italic_angle: Fixed,
    pub(crate) underline_position: i16,
    pub(crate) underline_thickness: i16,
    pub(crate) is_fixed_pitch: bool,
}

impl<'a> PostTable<'a> {
    pub(crate) const HEADER_LEN: usize = 32;

    pub(crate) fn parse(mut cursor: Cursor<'a>) -> Result<Self, ParseError> {
        let header = cursor.range(0..Self::HEADER_LEN)?.bytes;
        cursor.skip(4)?; // version
        let italic_angle = Fixed::from_bits(cursor.read_i32()?);
        let underline_position = cursor.read_i16()?;
        let underline_thickness = cursor.read_i16()?;
        let is_fixed_pitch = cursor.read_u32()? != 0;
        Ok(Self {
            header,
            italic_angle,
            underline_position,
            underline_thickness,
            is_fixed_pitch,
        })
    }
}
