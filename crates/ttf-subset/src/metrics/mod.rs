//! Font-wide metrics and per-character widths used by PDF font descriptors.

use core::{fmt, ops};

pub use self::names::FontNames;
use crate::{
    alloc::{vec, Vec},
    font::{
        parse_unicode_cmap, CharMap, HeadTable, HheaTable, HmtxTable, MaxpTable, Os2Table,
        PostTable,
    },
    Font, ParseError, TableTag,
};

mod names;

/// Signed 16.16 fixed-point number, such as the italic angle in the `post` table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fixed(i32);

impl Fixed {
    /// Creates a number from its raw 16.16 representation.
    pub const fn from_bits(bits: i32) -> Self {
        Self(bits)
    }

    /// Returns the raw 16.16 representation of this number.
    pub const fn to_bits(self) -> i32 {
        self.0
    }

    /// Checks whether this number is zero.
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Converts this number to a floating-point value. The conversion is lossless.
    pub fn to_f64(self) -> f64 {
        f64::from(self.0) / 65_536.0
    }
}

impl fmt::Display for Fixed {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.to_f64(), formatter)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Fixed {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_f64())
    }
}

/// Font bounding box in glyph space units (1/1000 of the em square).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct BoundingBox {
    /// Minimum x coordinate.
    pub x_min: f64,
    /// Minimum y coordinate.
    pub y_min: f64,
    /// Maximum x coordinate.
    pub x_max: f64,
    /// Maximum y coordinate.
    pub y_max: f64,
}

/// Flags of a PDF font descriptor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DescriptorFlags(u32);

impl DescriptorFlags {
    /// All glyphs have the same width.
    pub const FIXED_PITCH: Self = Self(1);
    /// Font uses the standard Latin character set.
    pub const NONSYMBOLIC: Self = Self(1 << 2);
    /// Glyphs have dominant vertical strokes that are slanted.
    pub const ITALIC: Self = Self(1 << 6);
    /// Bold glyphs should be painted with extra pixels even at very small text sizes.
    pub const FORCE_BOLD: Self = Self(1 << 18);

    /// Returns raw flag bits.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Checks whether all flags in `other` are set.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl ops::BitOr for DescriptorFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl ops::BitOrAssign for DescriptorFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Advance widths for all 16-bit character codes, in glyph space units (1/1000 of the em square).
#[derive(Clone, PartialEq)]
pub struct WidthTable {
    /// Indexed by the character code; 0 means the code is not mapped.
    widths: Vec<u16>,
    default_width: f64,
    len: usize,
}

impl fmt::Debug for WidthTable {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("WidthTable")
            .field("default_width", &self.default_width)
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

impl WidthTable {
    /// Width value signalling that the glyph has zero width after scaling. A consumer may
    /// substitute [the default width](Self::default_width()) for it.
    pub const USE_DEFAULT: u16 = u16::MAX;

    fn new(default_width: f64) -> Self {
        Self {
            widths: vec![0; usize::from(u16::MAX) + 1],
            default_width,
            len: 0,
        }
    }

    /// Some fonts store negative advances in this unsigned field; these are treated as 0.
    fn non_negative(advance: u16) -> u16 {
        if advance >= 1 << 15 {
            0
        } else {
            advance
        }
    }

    pub(crate) fn scale(advance: u16, units_per_em: u16) -> u16 {
        let advance = Self::non_negative(advance);
        let units_per_em = u32::from(units_per_em);
        // Round half up; `advance * 2000` cannot overflow since `advance < 1 << 15`.
        let scaled = (u32::from(advance) * 2_000 + units_per_em) / (2 * units_per_em);
        match u16::try_from(scaled) {
            Ok(0) => Self::USE_DEFAULT,
            Ok(width) if width < Self::USE_DEFAULT => width,
            _ => Self::USE_DEFAULT - 1,
        }
    }

    fn insert(&mut self, code: u16, width: u16) {
        let slot = &mut self.widths[usize::from(code)];
        if *slot == 0 {
            self.len += 1;
        }
        *slot = width;
    }

    /// Returns the width of glyph #0 (the missing glyph). Unlike code widths, this value is not rounded.
    pub fn default_width(&self) -> f64 {
        self.default_width
    }

    /// Returns the number of codes with a width.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Checks whether the table has no code widths.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the width for the specified code, or `None` if the code is not mapped.
    /// The returned value may be equal to [`Self::USE_DEFAULT`].
    pub fn get(&self, code: u16) -> Option<u16> {
        match self.widths[usize::from(code)] {
            0 => None,
            width => Some(width),
        }
    }

    /// Iterates over (code, width) pairs in the ascending code order.
    pub fn iter(&self) -> impl Iterator<Item = (u16, u16)> + '_ {
        (0..=u16::MAX).filter_map(|code| Some((code, self.get(code)?)))
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for WidthTable {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct as _;

        struct Widths<'a>(&'a WidthTable);

        impl serde::Serialize for Widths<'_> {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_map(self.0.iter())
            }
        }

        let mut state = serializer.serialize_struct("WidthTable", 3)?;
        state.serialize_field("default_width", &self.default_width)?;
        state.serialize_field("len", &self.len)?;
        state.serialize_field("widths", &Widths(self))?;
        state.end()
    }
}

/// Font metrics and names necessary to describe the font in a PDF document.
///
/// Lengths are expressed in glyph space units (1/1000 of the em square) unless specified otherwise.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[non_exhaustive]
pub struct FontMetrics {
    /// Font names.
    pub names: FontNames,
    /// Number of font units per em square.
    pub units_per_em: u16,
    /// Number of glyphs in the font.
    pub glyph_count: u16,
    /// Maximum height above the baseline.
    pub ascent: i32,
    /// Maximum depth below the baseline (usually negative).
    pub descent: i32,
    /// Height of flat capital letters.
    pub cap_height: i32,
    /// Font bounding box.
    pub bbox: BoundingBox,
    /// Italic angle in degrees counter-clockwise from the vertical.
    pub italic_angle: Fixed,
    /// Position of the underline.
    pub underline_position: f64,
    /// Thickness of the underline.
    pub underline_thickness: f64,
    /// Weight class from the `OS/2` table (e.g., 400 for regular, 700 for bold).
    pub weight_class: u16,
    /// Approximate thickness of dominant vertical stems.
    pub stem_v: u32,
    /// Descriptor flags.
    pub flags: DescriptorFlags,
    /// Per-code advance widths.
    pub widths: WidthTable,
    /// Mapping from character codes to glyph indices.
    pub char_map: CharMap,
}

impl FontMetrics {
    const DEFAULT_WEIGHT_CLASS: u16 = 500;

    fn stem_v(weight_class: u16) -> u32 {
        // Equivalent to `50 + floor((weight_class / 65)^2)`.
        let weight_class = u32::from(weight_class);
        50 + weight_class * weight_class / 4_225
    }
}

/// Converts font units to glyph space units.
#[derive(Debug, Clone, Copy)]
struct Scale(f64);

impl Scale {
    fn new(units_per_em: u16) -> Self {
        Self(1_000.0 / f64::from(units_per_em))
    }

    fn apply(self, value: i16) -> f64 {
        f64::from(value) * self.0
    }

    fn apply_unsigned(self, value: u16) -> f64 {
        f64::from(value) * self.0
    }

    #[allow(clippy::cast_possible_truncation)] // scaled `i16` values always fit
    fn apply_truncated(self, value: i16) -> i32 {
        self.apply(value) as i32
    }
}

impl Font<'_> {
    /// Decodes font-wide metrics, names and per-code widths of this font.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the required tables (`name`, `head`, `hhea`, `post`, `maxp`,
    /// `cmap`, `hmtx`) is missing or malformed, or if the font license forbids embedding.
    pub fn metrics(&self) -> Result<FontMetrics, ParseError> {
        let names = FontNames::parse(self.table(TableTag::NAME)?)?;
        let head = HeadTable::parse(self.table(TableTag::HEAD)?)?;
        let scale = Scale::new(head.units_per_em);
        let [x_min, y_min, x_max, y_max] = head.bbox;
        let bbox = BoundingBox {
            x_min: scale.apply(x_min),
            y_min: scale.apply(y_min),
            x_max: scale.apply(x_max),
            y_max: scale.apply(y_max),
        };

        let hhea = HheaTable::parse(self.table(TableTag::HHEA)?)?;
        let mut ascent = scale.apply_truncated(hhea.ascender);
        let mut descent = scale.apply_truncated(hhea.descender);

        let os2 = self.optional_table(TableTag::OS2).map(Os2Table::parse);
        let (weight_class, cap_height) = if let Some(os2) = os2 {
            let os2 = os2?;
            if ascent == 0 {
                ascent = scale.apply_truncated(os2.typo_ascender);
            }
            if descent == 0 {
                descent = scale.apply_truncated(os2.typo_descender);
            }
            let cap_height = os2
                .cap_height
                .map_or(ascent, |height| scale.apply_truncated(height));
            (os2.weight_class, cap_height)
        } else {
            if ascent == 0 {
                ascent = scale.apply_truncated(y_max);
            }
            if descent == 0 {
                descent = scale.apply_truncated(y_min);
            }
            (FontMetrics::DEFAULT_WEIGHT_CLASS, ascent)
        };

        let post = PostTable::parse(self.table(TableTag::POST)?)?;
        let mut flags = DescriptorFlags::NONSYMBOLIC;
        if !post.italic_angle.is_zero() {
            flags |= DescriptorFlags::ITALIC;
        }
        if weight_class >= 600 {
            flags |= DescriptorFlags::FORCE_BOLD;
        }
        if post.is_fixed_pitch {
            flags |= DescriptorFlags::FIXED_PITCH;
        }

        let maxp = MaxpTable::parse(self.table(TableTag::MAXP)?)?;
        let char_map = parse_unicode_cmap(self.table(TableTag::CMAP)?)?.to_char_map();
        let hmtx = HmtxTable::new(
            self.table(TableTag::HMTX)?,
            hhea.number_of_h_metrics,
            maxp.glyph_count,
        )?;
        let widths = Self::widths(&hmtx, maxp.glyph_count, head.units_per_em, &char_map)?;
        log::debug!(
            "decoded metrics for `{}`: {} glyphs, {} code widths",
            names.postscript,
            maxp.glyph_count,
            widths.len()
        );

        Ok(FontMetrics {
            names,
            units_per_em: head.units_per_em,
            glyph_count: maxp.glyph_count,
            ascent,
            descent,
            cap_height,
            bbox,
            italic_angle: post.italic_angle,
            underline_position: scale.apply(post.underline_position),
            underline_thickness: scale.apply(post.underline_thickness),
            weight_class,
            stem_v: FontMetrics::stem_v(weight_class),
            flags,
            widths,
            char_map,
        })
    }

    fn widths(
        hmtx: &HmtxTable<'_>,
        glyph_count: u16,
        units_per_em: u16,
        char_map: &CharMap,
    ) -> Result<WidthTable, ParseError> {
        let (default_advance, _) = hmtx.advance_and_lsb(0)?;
        let default_advance = WidthTable::non_negative(default_advance);
        let mut widths = WidthTable::new(Scale::new(units_per_em).apply_unsigned(default_advance));

        for advance in hmtx.advances(glyph_count).skip(1) {
            let (glyph_idx, advance) = advance?;
            let codes = char_map.codes(glyph_idx);
            if codes.is_empty() {
                continue;
            }
            let width = WidthTable::scale(advance, units_per_em);
            for &code in codes {
                if code != 0 && code != u16::MAX {
                    widths.insert(code, width);
                }
            }
        }
        Ok(widths)
    }
}
