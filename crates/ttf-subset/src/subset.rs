//! Glyph subsetting.

use crate::{
    alloc::{vec, BTreeMap, BTreeSet, Vec},
    errors::ParseErrorKind,
    font::{
        parse_unicode_cmap, Cursor, GlyphRecord, HeadTable, HheaTable, HmtxTable, LocaTable,
        MaxpTable, Os2Table, PostTable, SegmentWithDelta,
    },
    Font, ParseError, TableTag,
};

/// sfnt version written to the header of subset fonts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum SfntVersion {
    /// `0x00010000` (the version used by Windows and most other platforms).
    #[default]
    TrueType,
    /// `'true'` (the version used by legacy Apple fonts).
    Apple,
}

impl SfntVersion {
    pub(crate) const fn to_raw(self) -> u32 {
        match self {
            Self::TrueType => Font::TRUETYPE_VERSION,
            Self::Apple => Font::APPLE_VERSION,
        }
    }
}

/// Options for [`FontSubset`].
#[derive(Debug, Clone, Copy, Default)]
#[non_exhaustive]
pub struct SubsetOptions {
    /// Whether to write trailing glyphs with the same advance width as left side bearings only
    /// (i.e., reduce `numberOfHMetrics` in the `hhea` table). Off by default.
    pub compress_hmtx: bool,
    /// sfnt version to write in the subset header.
    pub sfnt_version: SfntVersion,
}

impl SubsetOptions {
    /// Sets [`Self::compress_hmtx`].
    #[must_use]
    pub fn with_compressed_hmtx(mut self, compress: bool) -> Self {
        self.compress_hmtx = compress;
        self
    }

    /// Sets [`Self::sfnt_version`].
    #[must_use]
    pub fn with_sfnt_version(mut self, version: SfntVersion) -> Self {
        self.sfnt_version = version;
        self
    }
}

/// Glyph included into a subset.
#[derive(Debug, Clone)]
pub(crate) struct SubsetGlyph<'a> {
    pub(crate) record: GlyphRecord<'a>,
    pub(crate) advance: u16,
    pub(crate) lsb: u16,
}

/// Subset of a [`Font`] containing only glyphs necessary to render the specified character codes.
///
/// Glyphs in the subset are densely renumbered in the ascending order of their original indices;
/// glyph #0 (the missing glyph) is always retained and keeps its index.
#[derive(Debug, Clone)]
pub struct FontSubset<'a> {
    pub(crate) options: SubsetOptions,
    pub(crate) head: HeadTable<'a>,
    pub(crate) hhea: HheaTable<'a>,
    pub(crate) maxp: MaxpTable<'a>,
    pub(crate) post: PostTable<'a>,
    /// Tables copied to the subset verbatim.
    pub(crate) copied_tables: Vec<(TableTag, &'a [u8])>,
    /// Glyphs indexed by new glyph indices.
    pub(crate) glyphs: Vec<SubsetGlyph<'a>>,
    pub(crate) cmap_segments: Vec<SegmentWithDelta>,
    char_map: BTreeMap<u16, u16>,
    glyph_map: BTreeMap<u16, u16>,
}

impl<'a> FontSubset<'a> {
    const COPIED_TABLES: [TableTag; 5] = [
        TableTag::CVT,
        TableTag::FPGM,
        TableTag::PREP,
        TableTag::GASP,
        TableTag::OS2,
    ];

    /// Creates a subset of `font` for the specified character `codes`. Codes not mapped by the font
    /// (as well as 0 and 0xffff) are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the font license forbids embedding, if required tables are missing
    /// or malformed, or if the font has no Unicode format-4 `cmap` subtable.
    pub fn new(
        font: &Font<'a>,
        codes: &BTreeSet<u16>,
        options: SubsetOptions,
    ) -> Result<Self, ParseError> {
        // License restrictions are checked before reading any other table.
        if let Some(os2) = font.optional_table(TableTag::OS2) {
            Os2Table::parse(os2)?;
        }
        let head = HeadTable::parse(font.table(TableTag::HEAD)?)?;
        let hhea = HheaTable::parse(font.table(TableTag::HHEA)?)?;
        let maxp = MaxpTable::parse(font.table(TableTag::MAXP)?)?;
        let glyph_count = maxp.glyph_count;

        let font_char_map = parse_unicode_cmap(font.table(TableTag::CMAP)?)?.to_char_map();
        let mut mapped_codes = Vec::with_capacity(codes.len());
        for &code in codes {
            if code == 0 || code == u16::MAX {
                continue;
            }
            let Some(glyph_idx) = font_char_map.glyph(code) else {
                log::debug!("code {code:#06x} is not mapped by the font; skipping");
                continue;
            };
            if glyph_idx >= glyph_count {
                let err = ParseError::new(ParseErrorKind::GlyphOutOfBounds {
                    glyph_idx,
                    glyph_count,
                });
                return Err(err.with_table(TableTag::CMAP));
            }
            mapped_codes.push((code, glyph_idx));
        }

        let loca = LocaTable::new(head.loca_format, glyph_count, font.table(TableTag::LOCA)?)?;
        let glyf = font.table(TableTag::GLYF)?;
        let initial_glyphs = mapped_codes.iter().map(|&(_, glyph_idx)| glyph_idx);
        let closure = Self::glyph_closure(&loca, glyf, glyph_count, initial_glyphs)?;
        log::debug!(
            "glyph closure for {} mapped codes contains {} glyphs",
            mapped_codes.len(),
            closure.len()
        );

        let hmtx = HmtxTable::new(
            font.table(TableTag::HMTX)?,
            hhea.number_of_h_metrics,
            glyph_count,
        )?;
        let post = PostTable::parse(font.table(TableTag::POST)?)?;

        let mut copied_tables = vec![(TableTag::NAME, font.table(TableTag::NAME)?.bytes)];
        for tag in Self::COPIED_TABLES {
            if let Some(data) = font.table_data(tag) {
                copied_tables.push((tag, data));
            }
        }

        let mut glyph_map = BTreeMap::new();
        let mut glyphs = Vec::with_capacity(closure.len());
        for (new_idx, (old_idx, record)) in closure.into_iter().enumerate() {
            #[allow(clippy::cast_possible_truncation)] // `new_idx < glyph_count`
            let new_idx = new_idx as u16;
            glyph_map.insert(old_idx, new_idx);
            let (advance, lsb) = hmtx.advance_and_lsb(old_idx)?;
            glyphs.push(SubsetGlyph {
                record,
                advance,
                lsb,
            });
        }

        let char_map: BTreeMap<_, _> = mapped_codes
            .into_iter()
            .map(|(code, old_idx)| (code, glyph_map[&old_idx]))
            .collect();
        let cmap_segments = Self::cmap_segments(&char_map)?;

        Ok(Self {
            options,
            head,
            hhea,
            maxp,
            post,
            copied_tables,
            glyphs,
            cmap_segments,
            char_map,
            glyph_map,
        })
    }

    /// Computes the transitive closure of `initial_glyphs` over composite glyph components.
    /// Glyph #0 is always included. Returns glyph records keyed by the original glyph index.
    fn glyph_closure(
        loca: &LocaTable<'_>,
        glyf: Cursor<'a>,
        glyph_count: u16,
        initial_glyphs: impl Iterator<Item = u16>,
    ) -> Result<BTreeMap<u16, GlyphRecord<'a>>, ParseError> {
        let mut visited = BTreeMap::new();
        let mut worklist: Vec<_> = [0].into_iter().chain(initial_glyphs).collect();

        while let Some(glyph_idx) = worklist.pop() {
            if visited.contains_key(&glyph_idx) {
                continue;
            }
            let glyph_data = glyf.range(loca.glyph_range(glyph_idx)?)?;
            let record = GlyphRecord::new(glyph_data)?;
            for component in record.components() {
                if component.glyph_idx >= glyph_count {
                    return Err(glyph_data.err(ParseErrorKind::GlyphOutOfBounds {
                        glyph_idx: component.glyph_idx,
                        glyph_count,
                    }));
                }
                if !visited.contains_key(&component.glyph_idx) {
                    worklist.push(component.glyph_idx);
                }
            }
            visited.insert(glyph_idx, record);
        }
        Ok(visited)
    }

    /// Collapses runs of consecutive codes mapped to consecutive glyphs into `cmap` segments.
    fn cmap_segments(char_map: &BTreeMap<u16, u16>) -> Result<Vec<SegmentWithDelta>, ParseError> {
        const MAX_SEGMENT_COUNT: usize = (u16::MAX as usize - 16) / 8;

        let mut segments: Vec<SegmentWithDelta> = vec![];
        for (&code, &glyph_idx) in char_map {
            let id_delta = glyph_idx.wrapping_sub(code);
            if let Some(last) = segments.last_mut() {
                if u32::from(code) == u32::from(last.end_code) + 1 && last.id_delta == id_delta {
                    last.end_code = code;
                    continue;
                }
            }
            segments.push(SegmentWithDelta {
                start_code: code,
                end_code: code,
                id_delta,
                id_range_offset: 0,
            });
        }
        // Terminating segment mapping 0xffff to the missing glyph.
        segments.push(SegmentWithDelta {
            start_code: u16::MAX,
            end_code: u16::MAX,
            id_delta: 1,
            id_range_offset: 0,
        });

        if segments.len() > MAX_SEGMENT_COUNT {
            let err = ParseError::new(ParseErrorKind::TooManyCmapSegments(segments.len()));
            return Err(err.with_table(TableTag::CMAP));
        }
        Ok(segments)
    }

    /// Returns the mapping of character codes to glyph indices in the subset. Only codes
    /// mapped by the font are present.
    pub fn char_map(&self) -> &BTreeMap<u16, u16> {
        &self.char_map
    }

    /// Returns the mapping of glyph indices in the original font to indices in the subset.
    pub fn glyph_map(&self) -> &BTreeMap<u16, u16> {
        &self.glyph_map
    }

    /// Returns the number of glyphs in the subset.
    pub fn glyph_count(&self) -> usize {
        self.glyphs.len()
    }
}
