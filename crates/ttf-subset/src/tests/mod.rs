//! Synthetic test fonts and crate-level tests.

use std::{
    collections::{BTreeMap, BTreeSet},
    env, fmt,
    io::Write,
    ops,
    process::Command,
    sync::OnceLock,
};

use allsorts::{binary::read::ReadScope, font::MatchingPresentation, font_data::FontData};
use test_casing::{test_casing, Product};

use crate::{
    font::{Cursor, GlyphRecord, LocaFormat, LocaTable},
    Fixed, Font, FontSubset, SubsetOptions, TableTag,
};

fn write_u16(buffer: &mut Vec<u8>, value: u16) {
    buffer.extend_from_slice(&value.to_be_bytes());
}

fn write_i16(buffer: &mut Vec<u8>, value: i16) {
    buffer.extend_from_slice(&value.to_be_bytes());
}

fn write_u32(buffer: &mut Vec<u8>, value: u32) {
    buffer.extend_from_slice(&value.to_be_bytes());
}

fn pad_to_4_bytes(buffer: &mut Vec<u8>) {
    while buffer.len() % 4 != 0 {
        buffer.push(0);
    }
}

/// Returns `(searchRange, entrySelector, rangeShift)` for the binary search headers
/// with the specified item size.
fn search_params(count: u16, item_size: u16) -> (u16, u16, u16) {
    let entry_selector = u16::try_from(count.max(1).ilog2()).unwrap();
    let search_range = item_size << entry_selector;
    (search_range, entry_selector, count * item_size - search_range)
}

/// Builder of format-4 `cmap` subtables.
#[derive(Debug, Default)]
pub(crate) struct Format4Builder {
    /// `(start_code, end_code, id_delta, glyph_ids)`
    segments: Vec<(u16, u16, u16, Option<Vec<u16>>)>,
}

impl Format4Builder {
    /// Adds a segment mapping `start..=end` to consecutive glyphs starting from `first_glyph`.
    pub(crate) fn delta_segment(mut self, start: u16, end: u16, first_glyph: u16) -> Self {
        let id_delta = first_glyph.wrapping_sub(start);
        self.segments.push((start, end, id_delta, None));
        self
    }

    /// Adds a segment using the glyph ID array.
    pub(crate) fn array_segment(mut self, start: u16, glyphs: &[u16], id_delta: u16) -> Self {
        let end = start + u16::try_from(glyphs.len()).unwrap() - 1;
        self.segments
            .push((start, end, id_delta, Some(glyphs.to_vec())));
        self
    }

    fn from_char_map(char_map: &BTreeMap<u16, u16>) -> Self {
        let mut this = Self::default();
        let mut run: Option<(u16, u16, u16)> = None;
        for (&code, &glyph) in char_map {
            run = match run {
                Some((start, end, first_glyph))
                    if end + 1 == code && first_glyph.wrapping_add(code - start) == glyph =>
                {
                    Some((start, code, first_glyph))
                }
                Some((start, end, first_glyph)) => {
                    this = this.delta_segment(start, end, first_glyph);
                    Some((code, code, glyph))
                }
                None => Some((code, code, glyph)),
            };
        }
        if let Some((start, end, first_glyph)) = run {
            this = this.delta_segment(start, end, first_glyph);
        }
        this
    }

    pub(crate) fn build(mut self) -> Vec<u8> {
        self.segments.push((0xffff, 0xffff, 1, None));
        let segment_count = u16::try_from(self.segments.len()).unwrap();

        let mut glyph_array = vec![];
        let mut id_range_offsets = vec![];
        for (i, (_, _, _, glyphs)) in self.segments.iter().enumerate() {
            let Some(glyphs) = glyphs else {
                id_range_offsets.push(0);
                continue;
            };
            let i = u16::try_from(i).unwrap();
            let array_pos = u16::try_from(glyph_array.len()).unwrap();
            id_range_offsets.push(2 * (segment_count - i) + 2 * array_pos);
            glyph_array.extend_from_slice(glyphs);
        }

        let mut buffer = vec![];
        write_u16(&mut buffer, 4);
        let len = 16 + 8 * self.segments.len() + 2 * glyph_array.len();
        write_u16(&mut buffer, u16::try_from(len).unwrap());
        write_u16(&mut buffer, 0); // language
        write_u16(&mut buffer, 2 * segment_count);
        let (search_range, entry_selector, range_shift) = search_params(segment_count, 2);
        write_u16(&mut buffer, search_range);
        write_u16(&mut buffer, entry_selector);
        write_u16(&mut buffer, range_shift);

        for &(_, end, ..) in &self.segments {
            write_u16(&mut buffer, end);
        }
        write_u16(&mut buffer, 0);
        for &(start, ..) in &self.segments {
            write_u16(&mut buffer, start);
        }
        for &(_, _, id_delta, _) in &self.segments {
            write_u16(&mut buffer, id_delta);
        }
        for offset in id_range_offsets {
            write_u16(&mut buffer, offset);
        }
        for glyph in glyph_array {
            write_u16(&mut buffer, glyph);
        }
        debug_assert_eq!(buffer.len(), len);
        buffer
    }
}

/// Builder of `name` tables.
#[derive(Debug, Default)]
pub(crate) struct NameTableBuilder {
    /// `(platform_id, encoding_id, language_id, name_id, raw_name)`
    records: Vec<(u16, u16, u16, u16, Vec<u8>)>,
}

impl NameTableBuilder {
    /// Adds a Windows Unicode BMP name (UTF-16BE encoded).
    pub(crate) fn windows(mut self, name_id: u16, name: &str) -> Self {
        let raw = name.encode_utf16().flat_map(u16::to_be_bytes).collect();
        self.records.push((3, 1, 0x409, name_id, raw));
        self
    }

    /// Adds a Macintosh Roman name. The name is written as UTF-8.
    pub(crate) fn mac(mut self, name_id: u16, name: &str) -> Self {
        self.records.push((1, 0, 0, name_id, name.as_bytes().to_vec()));
        self
    }

    pub(crate) fn build(self) -> Vec<u8> {
        let record_count = u16::try_from(self.records.len()).unwrap();
        let mut buffer = vec![];
        write_u16(&mut buffer, 0); // format
        write_u16(&mut buffer, record_count);
        write_u16(&mut buffer, 6 + 12 * record_count);

        let mut storage = vec![];
        for (platform_id, encoding_id, language_id, name_id, raw) in &self.records {
            write_u16(&mut buffer, *platform_id);
            write_u16(&mut buffer, *encoding_id);
            write_u16(&mut buffer, *language_id);
            write_u16(&mut buffer, *name_id);
            write_u16(&mut buffer, u16::try_from(raw.len()).unwrap());
            write_u16(&mut buffer, u16::try_from(storage.len()).unwrap());
            storage.extend_from_slice(raw);
        }
        buffer.extend(storage);
        buffer
    }
}

/// Builder of small synthetic TrueType fonts.
///
/// The simple font has [`Self::GLYPH_COUNT`] glyphs with the following character mapping:
///
/// - `0x20` (space) -> glyph 3, which is empty
/// - `0x41` (`A`) -> glyph 5
/// - `0x61..=0x7a` (`a..=z`) -> glyphs 10..=35
/// - `0x7e` (`~`) -> glyph 127, which is beyond `numberOfHMetrics`
/// - `0xc0` (`À`) -> glyph 120, a composite of glyphs 5 and 80
/// - `0xc5` (`Å`) -> glyph 125, a composite of glyphs 120 and 6
#[derive(Debug, Clone)]
pub(crate) struct TestFontBuilder {
    sfnt_version: [u8; 4],
    char_map: BTreeMap<u16, u16>,
    composites: BTreeMap<u16, Vec<u16>>,
    long_loca: bool,
    mac_only_cmap: bool,
    italic_angle: Fixed,
    hhea_ascent_descent: (i16, i16),
    weight_class: u16,
    is_fixed_pitch: bool,
    fs_type: u16,
    glyph_data_format: u16,
    removed_tables: BTreeSet<TableTag>,
    raw_tables: BTreeMap<TableTag, Vec<u8>>,
    duplicate_table: Option<TableTag>,
}

impl TestFontBuilder {
    pub(crate) const GLYPH_COUNT: u16 = 130;
    const NUMBER_OF_H_METRICS: u16 = 126;
    const UNITS_PER_EM: u16 = 2_048;
    /// Byte length of the first component in composite glyphs (flags, index and word args).
    pub(crate) const FIRST_COMPONENT_LEN: usize = 8;

    pub(crate) fn simple() -> Self {
        let mut char_map =
            BTreeMap::from([(0x20, 3), (0x41, 5), (0x7e, 127), (0xc0, 120), (0xc5, 125)]);
        char_map.extend((0x61..=0x7a).zip(10..));

        Self {
            sfnt_version: [0, 1, 0, 0],
            char_map,
            composites: BTreeMap::from([(120, vec![5, 80]), (125, vec![120, 6])]),
            long_loca: false,
            mac_only_cmap: false,
            italic_angle: Fixed::default(),
            hhea_ascent_descent: (1_900, -480),
            weight_class: 400,
            is_fixed_pitch: false,
            fs_type: 0,
            glyph_data_format: 0,
            removed_tables: BTreeSet::new(),
            raw_tables: BTreeMap::new(),
            duplicate_table: None,
        }
    }

    /// Returns `(advance, lsb)` for the specified glyph.
    pub(crate) fn glyph_metrics(glyph_idx: u16) -> (u16, u16) {
        let metrics_idx = glyph_idx.min(Self::NUMBER_OF_H_METRICS - 1);
        let advance = if metrics_idx == 0 {
            1_024
        } else {
            1_184 + 9 * metrics_idx
        };
        (advance, 2 * glyph_idx)
    }

    pub(crate) fn sfnt_version(mut self, version: [u8; 4]) -> Self {
        self.sfnt_version = version;
        self
    }

    pub(crate) fn map_code(mut self, code: u16, glyph_idx: u16) -> Self {
        self.char_map.insert(code, glyph_idx);
        self
    }

    pub(crate) fn composite_glyph(mut self, glyph_idx: u16, components: &[u16]) -> Self {
        self.composites.insert(glyph_idx, components.to_vec());
        self
    }

    pub(crate) fn long_loca(mut self) -> Self {
        self.long_loca = true;
        self
    }

    pub(crate) fn mac_only_cmap(mut self) -> Self {
        self.mac_only_cmap = true;
        self
    }

    pub(crate) fn italic_angle(mut self, angle: Fixed) -> Self {
        self.italic_angle = angle;
        self
    }

    pub(crate) fn hhea_ascent_descent(mut self, ascent: i16, descent: i16) -> Self {
        self.hhea_ascent_descent = (ascent, descent);
        self
    }

    pub(crate) fn weight_class(mut self, weight_class: u16) -> Self {
        self.weight_class = weight_class;
        self
    }

    pub(crate) fn fixed_pitch(mut self) -> Self {
        self.is_fixed_pitch = true;
        self
    }

    pub(crate) fn fs_type(mut self, fs_type: u16) -> Self {
        self.fs_type = fs_type;
        self
    }

    pub(crate) fn glyph_data_format(mut self, format: u16) -> Self {
        self.glyph_data_format = format;
        self
    }

    pub(crate) fn without(mut self, tag: TableTag) -> Self {
        self.removed_tables.insert(tag);
        self
    }

    /// Replaces the table contents with raw bytes.
    pub(crate) fn raw_table(mut self, tag: TableTag, data: Vec<u8>) -> Self {
        self.raw_tables.insert(tag, data);
        self
    }

    /// Writes the record for the specified table twice in the table directory.
    pub(crate) fn duplicate(mut self, tag: TableTag) -> Self {
        self.duplicate_table = Some(tag);
        self
    }

    fn simple_glyph(glyph_idx: u16) -> Vec<u8> {
        let mut glyph = vec![];
        write_i16(&mut glyph, 1); // numberOfContours
        for bound in [0, 0, 100, 100] {
            write_i16(&mut glyph, bound);
        }
        write_u16(&mut glyph, 2); // endPtsOfContours
        write_u16(&mut glyph, 2); // instructionLength
        #[allow(clippy::cast_possible_truncation)] // intentional
        glyph.extend_from_slice(&[0xb0, glyph_idx as u8]); // PUSHB[0]
        glyph.extend_from_slice(&[0x31, 0x37, 0x17]); // flags
        glyph.extend_from_slice(&[50, 50]); // x deltas
        glyph.extend_from_slice(&[100, 100]); // y deltas
        glyph
    }

    fn composite_glyph_data(components: &[u16]) -> Vec<u8> {
        const MORE_COMPONENTS: u16 = 0x0020;

        let mut glyph = vec![];
        write_i16(&mut glyph, -1);
        for bound in [0, 0, 100, 100] {
            write_i16(&mut glyph, bound);
        }
        for (i, &component) in components.iter().enumerate() {
            let more = if i + 1 < components.len() {
                MORE_COMPONENTS
            } else {
                0
            };
            if i == 0 {
                write_u16(&mut glyph, 0x0003 | more); // word XY args
                write_u16(&mut glyph, component);
                write_i16(&mut glyph, 0);
                write_i16(&mut glyph, 0);
            } else {
                write_u16(&mut glyph, 0x000a | more); // byte XY args with scale
                write_u16(&mut glyph, component);
                glyph.extend_from_slice(&[10, 0]);
                write_u16(&mut glyph, 0x4000); // 1.0 in F2Dot14
            }
        }
        glyph
    }

    fn glyph_tables(&self) -> (Vec<u8>, Vec<u8>) {
        let mut glyf = vec![];
        let mut locations = vec![0];
        for glyph_idx in 0..Self::GLYPH_COUNT {
            if let Some(components) = self.composites.get(&glyph_idx) {
                glyf.extend(Self::composite_glyph_data(components));
            } else if glyph_idx != 3 {
                glyf.extend(Self::simple_glyph(glyph_idx));
            }
            pad_to_4_bytes(&mut glyf);
            locations.push(glyf.len());
        }

        let mut loca = vec![];
        for location in locations {
            if self.long_loca {
                write_u32(&mut loca, u32::try_from(location).unwrap());
            } else {
                write_u16(&mut loca, u16::try_from(location / 2).unwrap());
            }
        }
        (glyf, loca)
    }

    fn head_table(&self) -> Vec<u8> {
        let mut head = vec![];
        write_u32(&mut head, 0x_0001_0000); // version
        write_u32(&mut head, 0x_0001_0000); // fontRevision
        write_u32(&mut head, 0); // checksumAdjustment
        write_u32(&mut head, 0x_5f0f_3cf5); // magicNumber
        write_u16(&mut head, 0x000b); // flags
        write_u16(&mut head, Self::UNITS_PER_EM);
        head.extend_from_slice(&[0; 16]); // created, modified
        for bound in [-100, -512, 2_200, 2_048] {
            write_i16(&mut head, bound);
        }
        write_u16(&mut head, 0); // macStyle
        write_u16(&mut head, 8); // lowestRecPPEM
        write_i16(&mut head, 2); // fontDirectionHint
        let loca_format = if self.long_loca {
            LocaFormat::Long
        } else {
            LocaFormat::Short
        };
        write_u16(&mut head, loca_format.to_raw());
        write_u16(&mut head, self.glyph_data_format);
        head
    }

    fn hhea_table(&self) -> Vec<u8> {
        let mut hhea = vec![];
        write_u32(&mut hhea, 0x_0001_0000);
        write_i16(&mut hhea, self.hhea_ascent_descent.0);
        write_i16(&mut hhea, self.hhea_ascent_descent.1);
        write_i16(&mut hhea, 0); // lineGap
        let (max_advance, _) = Self::glyph_metrics(Self::NUMBER_OF_H_METRICS - 1);
        write_u16(&mut hhea, max_advance);
        write_i16(&mut hhea, 0); // minLeftSideBearing
        write_i16(&mut hhea, 0); // minRightSideBearing
        write_i16(&mut hhea, 100); // xMaxExtent
        write_i16(&mut hhea, 1); // caretSlopeRise
        write_i16(&mut hhea, 0); // caretSlopeRun
        hhea.extend_from_slice(&[0; 10]); // caretOffset, reserved
        write_i16(&mut hhea, 0); // metricDataFormat
        write_u16(&mut hhea, Self::NUMBER_OF_H_METRICS);
        hhea
    }

    fn hmtx_table() -> Vec<u8> {
        let mut hmtx = vec![];
        for glyph_idx in 0..Self::GLYPH_COUNT {
            let (advance, lsb) = Self::glyph_metrics(glyph_idx);
            if glyph_idx < Self::NUMBER_OF_H_METRICS {
                write_u16(&mut hmtx, advance);
            }
            write_u16(&mut hmtx, lsb);
        }
        hmtx
    }

    fn maxp_table() -> Vec<u8> {
        let mut maxp = vec![];
        write_u32(&mut maxp, 0x_0001_0000);
        write_u16(&mut maxp, Self::GLYPH_COUNT);
        // maxPoints, maxContours, maxCompositePoints, maxCompositeContours, maxZones,
        // maxTwilightPoints, maxStorage, maxFunctionDefs, maxInstructionDefs,
        // maxStackElements, maxSizeOfInstructions, maxComponentElements, maxComponentDepth
        for value in [3, 1, 9, 3, 2, 0, 0, 0, 0, 16, 2, 2, 2] {
            write_u16(&mut maxp, value);
        }
        maxp
    }

    fn os2_table(&self) -> Vec<u8> {
        let mut os2 = vec![];
        write_u16(&mut os2, 4); // version
        write_i16(&mut os2, 1_200); // xAvgCharWidth
        write_u16(&mut os2, self.weight_class);
        write_u16(&mut os2, 5); // usWidthClass
        write_u16(&mut os2, self.fs_type);
        for value in [1_300, 1_400, 0, 280, 1_300, 1_400, 0, 960, 100, 520] {
            write_i16(&mut os2, value); // subscript, superscript and strikeout metrics
        }
        write_i16(&mut os2, 0); // sFamilyClass
        os2.extend_from_slice(&[0; 10]); // panose
        write_u32(&mut os2, 3); // ulUnicodeRange1: Basic Latin, Latin-1 Supplement
        os2.extend_from_slice(&[0; 12]); // ulUnicodeRange2..4
        os2.extend_from_slice(b"TEST"); // achVendID
        write_u16(&mut os2, 0x0040); // fsSelection: REGULAR
        write_u16(&mut os2, 0x20); // usFirstCharIndex
        write_u16(&mut os2, 0xc5); // usLastCharIndex
        write_i16(&mut os2, 1_800); // sTypoAscender
        write_i16(&mut os2, -400); // sTypoDescender
        write_i16(&mut os2, 200); // sTypoLineGap
        write_u16(&mut os2, 1_900); // usWinAscent
        write_u16(&mut os2, 480); // usWinDescent
        write_u32(&mut os2, 1); // ulCodePageRange1: Latin 1
        write_u32(&mut os2, 0); // ulCodePageRange2
        write_i16(&mut os2, 1_024); // sxHeight
        write_i16(&mut os2, 1_434); // sCapHeight
        write_u16(&mut os2, 0); // usDefaultChar
        write_u16(&mut os2, 0x20); // usBreakChar
        write_u16(&mut os2, 2); // usMaxContext
        os2
    }

    fn post_table(&self) -> Vec<u8> {
        let mut post = vec![];
        write_u32(&mut post, 0x_0003_0000);
        post.extend_from_slice(&self.italic_angle.to_bits().to_be_bytes());
        write_i16(&mut post, -256); // underlinePosition
        write_i16(&mut post, 100); // underlineThickness
        write_u32(&mut post, self.is_fixed_pitch.into());
        for mem_value in [1, 2, 3, 4] {
            write_u32(&mut post, mem_value); // minMemType42 .. maxMemType1
        }
        post
    }

    fn cmap_table(&self) -> Vec<u8> {
        let subtable = Format4Builder::from_char_map(&self.char_map).build();
        let encodings: &[(u16, u16)] = if self.mac_only_cmap {
            &[(1, 0)]
        } else {
            &[(0, 3), (3, 1)]
        };

        let mut cmap = vec![];
        write_u16(&mut cmap, 0); // version
        let encoding_count = u16::try_from(encodings.len()).unwrap();
        write_u16(&mut cmap, encoding_count);
        let subtable_offset = 4 + 8 * u32::from(encoding_count);
        for &(platform_id, encoding_id) in encodings {
            write_u16(&mut cmap, platform_id);
            write_u16(&mut cmap, encoding_id);
            write_u32(&mut cmap, subtable_offset);
        }
        cmap.extend(subtable);
        cmap
    }

    fn name_table() -> Vec<u8> {
        NameTableBuilder::default()
            .windows(1, "Test Sans")
            .windows(2, "Regular")
            .windows(3, "1.000;TEST;TestSans-Regular")
            .windows(4, "Test Sans Regular")
            .windows(6, "TestSans-Regular")
            .build()
    }

    fn tables(&self) -> BTreeMap<TableTag, Vec<u8>> {
        let (glyf, loca) = self.glyph_tables();
        let mut tables = BTreeMap::from([
            (TableTag::CMAP, self.cmap_table()),
            (TableTag::CVT, vec![0, 100, 0, 200, 0xff, 0x9c]),
            (TableTag::GASP, vec![0, 0, 0, 1, 0xff, 0xff, 0, 2]),
            (TableTag::GLYF, glyf),
            (TableTag::HEAD, self.head_table()),
            (TableTag::HHEA, self.hhea_table()),
            (TableTag::HMTX, Self::hmtx_table()),
            (TableTag::LOCA, loca),
            (TableTag::MAXP, Self::maxp_table()),
            (TableTag::NAME, Self::name_table()),
            (TableTag::OS2, self.os2_table()),
            (TableTag::POST, self.post_table()),
            (TableTag::PREP, vec![0xb0, 1, 0x21]), // PUSHB[0] 1, POP
        ]);
        for tag in &self.removed_tables {
            tables.remove(tag);
        }
        tables.extend(self.raw_tables.clone());
        tables
    }

    pub(crate) fn build(&self) -> Vec<u8> {
        let tables = self.tables();
        let mut records: Vec<_> = tables.keys().copied().collect();
        if let Some(tag) = self.duplicate_table {
            records.push(tag);
        }
        let table_count = u16::try_from(records.len()).unwrap();

        let mut buffer = self.sfnt_version.to_vec();
        write_u16(&mut buffer, table_count);
        let (search_range, entry_selector, range_shift) = search_params(table_count, 16);
        write_u16(&mut buffer, search_range);
        write_u16(&mut buffer, entry_selector);
        write_u16(&mut buffer, range_shift);

        let mut data = vec![];
        let mut offsets = BTreeMap::new();
        let data_offset = buffer.len() + 16 * records.len();
        for (&tag, table) in &tables {
            offsets.insert(tag, data_offset + data.len());
            data.extend_from_slice(table);
            pad_to_4_bytes(&mut data);
        }
        for tag in records {
            let table = &tables[&tag];
            buffer.extend_from_slice(&tag.to_bytes());
            write_u32(&mut buffer, Font::checksum(table));
            write_u32(&mut buffer, u32::try_from(offsets[&tag]).unwrap());
            write_u32(&mut buffer, u32::try_from(table.len()).unwrap());
        }
        buffer.extend(data);

        if let Some(&head_offset) = offsets.get(&TableTag::HEAD) {
            if tables[&TableTag::HEAD].len() >= 12 {
                let adjustment = Font::SFNT_CHECKSUM.wrapping_sub(Font::checksum(&buffer));
                let pos = head_offset + 8;
                buffer[pos..pos + 4].copy_from_slice(&adjustment.to_be_bytes());
            }
        }
        buffer
    }
}

/// Checks that the whole-font checksum equals the magic value, i.e., `checksumAdjustment`
/// is correct.
pub(crate) fn assert_checksum_adjustment(font_bytes: &[u8]) {
    assert_eq!(
        Font::checksum(font_bytes),
        Font::SFNT_CHECKSUM,
        "invalid checksum adjustment"
    );
}

#[derive(Debug, Clone)]
pub(crate) enum TestCodeSubset {
    Range(ops::RangeInclusive<u16>),
    Str(&'static str),
}

impl TestCodeSubset {
    pub(crate) fn into_set(self) -> BTreeSet<u16> {
        match self {
            Self::Range(range) => range.collect(),
            Self::Str(s) => s.encode_utf16().collect(),
        }
    }
}

pub(crate) const CODE_SUBSETS: [TestCodeSubset; 4] = [
    TestCodeSubset::Range(0x20..=0x7e),
    TestCodeSubset::Range(0x61..=0x7a),
    TestCodeSubset::Str("Hello world!"),
    TestCodeSubset::Str("A\u{c0}\u{c5}"),
];

struct OpenTypeSanitizer {
    path: Option<String>,
}

impl fmt::Debug for OpenTypeSanitizer {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("OpenTypeSanitizer")
            .field("path", &self.path)
            .finish()
    }
}

impl Default for OpenTypeSanitizer {
    fn default() -> Self {
        let Ok(path) = env::var("OTS_SANITIZER") else {
            return Self { path: None };
        };
        let output = Command::new(&path)
            .arg("--version")
            .output()
            .unwrap_or_else(|err| {
                panic!("failed getting version for ots-sanitize at {path}: {err}");
            });
        assert!(
            output.status.success(),
            "failed getting version for ots-sanitize at {path}: non-zero exit code"
        );
        let version = String::from_utf8_lossy(&output.stdout);
        println!("ots-sanitize version: {}", version.trim());
        Self { path: Some(path) }
    }
}

impl OpenTypeSanitizer {
    fn get() -> &'static Self {
        static SANITIZER: OnceLock<OpenTypeSanitizer> = OnceLock::new();
        SANITIZER.get_or_init(Self::default)
    }

    fn validate(&self, content: &[u8]) {
        let Some(path) = &self.path else {
            println!("OTS_SANITIZER env var is missing; skipping checks");
            return;
        };

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.as_file_mut().write_all(content).unwrap();
        file.as_file_mut().flush().unwrap();
        let file_path = file.into_temp_path();

        let output = Command::new(path)
            .arg(&file_path)
            .output()
            .expect("failed running ots-sanitize");
        if !output.status.success() {
            let stdout = String::from_utf8_lossy(&output.stdout);
            let stderr = String::from_utf8_lossy(&output.stderr);
            panic!("ots-sanitize failed:\n--- stdout ---\n{stdout}\n--- stderr ---\n{stderr}");
        }
    }
}

#[test]
fn char_map_matches_reference_parser() {
    let bytes = TestFontBuilder::simple().build();
    let font = Font::new(&bytes).unwrap();
    let char_map = font.char_map().unwrap();
    assert_eq!(char_map.len(), 31);

    let font_file = ReadScope::new(&bytes).read::<FontData>().unwrap();
    let font_provider = font_file.table_provider(0).unwrap();
    let mut reference_font = allsorts::Font::new(font_provider).unwrap();

    for code in (0x20..=0x7e).chain([0xc0, 0xc5, 0x2603]) {
        let ch = char::from_u32(code.into()).unwrap();
        let (expected_idx, _) =
            reference_font.lookup_glyph_index(ch, MatchingPresentation::NotRequired, None);
        assert_eq!(char_map.glyph(code).unwrap_or(0), expected_idx, "{ch:?}");
    }
}

#[test_casing(8, Product((CODE_SUBSETS, [false, true])))]
fn subsetting_font(codes: TestCodeSubset, compress_hmtx: bool) {
    let bytes = TestFontBuilder::simple().build();
    let font = Font::new(&bytes).unwrap();
    let codes = codes.into_set();
    let options = SubsetOptions::default().with_compressed_hmtx(compress_hmtx);
    let subset = FontSubset::new(&font, &codes, options).unwrap();

    let char_map = font.char_map().unwrap();
    let expected_codes: Vec<_> = codes
        .iter()
        .copied()
        .filter(|&code| char_map.glyph(code).is_some())
        .collect();
    assert_eq!(subset.char_map().len(), expected_codes.len());

    let ttf = subset.to_truetype();
    assert_valid_font(&ttf, &expected_codes);
    assert_complete_glyph_closure(&ttf);
    assert_widths_are_preserved(&font, &ttf, &expected_codes);
}

#[test]
fn subsetting_font_with_long_loca() {
    let bytes = TestFontBuilder::simple().long_loca().build();
    let font = Font::new(&bytes).unwrap();
    let codes: BTreeSet<u16> = "Hello \u{c5}".encode_utf16().collect();
    let subset = FontSubset::new(&font, &codes, SubsetOptions::default()).unwrap();
    let ttf = subset.to_truetype();
    assert_complete_glyph_closure(&ttf);
    assert_valid_font(&ttf, &[0x65, 0x6c, 0x6f, 0xc5]);
}

#[test]
fn subset_metrics_match_original() {
    let bytes = TestFontBuilder::simple().build();
    let font = Font::new(&bytes).unwrap();
    let codes: BTreeSet<u16> = (0x61..=0x66).collect();
    let ttf = FontSubset::new(&font, &codes, SubsetOptions::default())
        .unwrap()
        .to_truetype();

    let original = font.metrics().unwrap();
    let metrics = Font::new(&ttf).unwrap().metrics().unwrap();
    assert_eq!(metrics.names, original.names);
    assert_eq!(metrics.units_per_em, original.units_per_em);
    assert_eq!(metrics.glyph_count, 7);
    assert_eq!(metrics.ascent, original.ascent);
    assert_eq!(metrics.descent, original.descent);
    assert_eq!(metrics.bbox, original.bbox);
    assert_eq!(metrics.flags, original.flags);
    assert_eq!(metrics.widths.default_width(), original.widths.default_width());
    assert_eq!(metrics.widths.len(), 6);
}

fn assert_valid_font(raw: &[u8], expected_codes: &[u16]) {
    Font::new(raw).unwrap();
    assert_checksum_adjustment(raw);

    let font_file = ReadScope::new(raw).read::<FontData>().unwrap();
    let font_provider = font_file.table_provider(0).unwrap();
    let mut font = allsorts::Font::new(font_provider).unwrap();
    for &code in expected_codes {
        let ch = char::from_u32(code.into()).unwrap();
        let (glyph_id, _) = font.lookup_glyph_index(ch, MatchingPresentation::NotRequired, None);
        assert_ne!(glyph_id, 0, "{ch:?}");
    }

    OpenTypeSanitizer::get().validate(raw);
}

/// Checks that all composite glyph components are present in the font.
fn assert_complete_glyph_closure(raw: &[u8]) {
    let font = Font::new(raw).unwrap();
    let maxp = font.table_data(TableTag::MAXP).unwrap();
    let glyph_count = u16::from_be_bytes([maxp[4], maxp[5]]);
    let head = font.table_data(TableTag::HEAD).unwrap();
    let loca_format = if head[51] == 0 {
        LocaFormat::Short
    } else {
        LocaFormat::Long
    };
    let loca = LocaTable::new(
        loca_format,
        glyph_count,
        Cursor::new(font.table_data(TableTag::LOCA).unwrap()),
    )
    .unwrap();
    let glyf = font.table_data(TableTag::GLYF).unwrap();

    for glyph_idx in 0..glyph_count {
        let range = loca.glyph_range(glyph_idx).unwrap();
        let glyph = GlyphRecord::new(Cursor::new(&glyf[range])).unwrap();
        for component in glyph.components() {
            assert!(
                component.glyph_idx < glyph_count,
                "glyph #{glyph_idx} references missing glyph #{}",
                component.glyph_idx
            );
        }
    }
}

fn assert_widths_are_preserved(original: &Font<'_>, raw: &[u8], codes: &[u16]) {
    let original = original.metrics().unwrap();
    let metrics = Font::new(raw).unwrap().metrics().unwrap();
    for &code in codes {
        assert_eq!(metrics.widths.get(code), original.widths.get(code), "{code:#x}");
    }
}
