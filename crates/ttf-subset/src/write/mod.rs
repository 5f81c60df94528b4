//! Logic for serializing fonts and `FontSubset`s in the TrueType format.

use core::iter;

use crate::{
    alloc::{vec, BTreeMap, Vec},
    font::{HeadTable, HheaTable, LocaFormat, MaxpTable, PostTable, SegmentWithDelta},
    subset::SubsetGlyph,
    Font, FontSubset, TableTag,
};

fn write_u16(writer: &mut Vec<u8>, value: u16) {
    writer.extend_from_slice(&value.to_be_bytes());
}

fn write_u32(writer: &mut Vec<u8>, value: u32) {
    writer.extend_from_slice(&value.to_be_bytes());
}

fn pad_to_4_bytes(writer: &mut Vec<u8>) {
    if writer.len() % 4 != 0 {
        let padding = 4 - writer.len() % 4;
        writer.extend(iter::repeat_n(0_u8, padding));
    }
}

/// Writes a `cmap` table with a single Windows Unicode BMP (3, 1) encoding record
/// pointing to a format-4 subtable. The last segment must be the `0xffff` sentinel.
fn write_cmap_table(segments: &[SegmentWithDelta], writer: &mut Vec<u8>) {
    write_u16(writer, 0); // table version
    write_u16(writer, 1); // numTables
    write_u16(writer, 3); // platformID
    write_u16(writer, 1); // encodingID
    write_u32(writer, 12); // subtable offset

    let subtable_len = 16 + 8 * segments.len();
    write_u16(writer, 4); // subtable format
    write_u16(
        writer,
        subtable_len
            .try_into()
            .expect("segment count is checked when creating a subset"),
    );
    write_u16(writer, 0); // language

    // `unwrap()` is safe: the subtable length fits into `u16`
    let segment_count = u16::try_from(segments.len()).unwrap();
    write_u16(writer, 2 * segment_count);
    let entry_selector = u16::try_from(segment_count.ilog2()).unwrap();
    let search_range = 1 << (entry_selector + 1);
    write_u16(writer, search_range);
    write_u16(writer, entry_selector);
    write_u16(writer, 2 * segment_count - search_range);

    for segment in segments {
        write_u16(writer, segment.end_code);
    }
    write_u16(writer, 0); // reserved padding
    for segment in segments {
        write_u16(writer, segment.start_code);
    }
    for segment in segments {
        write_u16(writer, segment.id_delta);
    }
    for segment in segments {
        write_u16(writer, segment.id_range_offset);
    }
}

/// Writes the `hmtx` table and returns the number of full metrics (`numberOfHMetrics`).
fn write_hmtx_table(glyphs: &[SubsetGlyph<'_>], compress: bool, writer: &mut Vec<u8>) -> u16 {
    let mut number_of_h_metrics = glyphs.len();
    if compress {
        while let Some([prev, current]) = glyphs[..number_of_h_metrics].last_chunk::<2>() {
            if prev.advance != current.advance {
                break;
            }
            number_of_h_metrics -= 1;
        }
    }

    for (i, glyph) in glyphs.iter().enumerate() {
        if i < number_of_h_metrics {
            write_u16(writer, glyph.advance);
        }
        write_u16(writer, glyph.lsb);
    }

    // `unwrap()` is safe: `number_of_h_metrics` <= number of glyphs, which doesn't exceed u16::MAX
    number_of_h_metrics.try_into().unwrap()
}

/// Writes the `loca` table for the provided glyph offsets, all of which must be even.
fn write_loca_table(locations: &[usize], writer: &mut Vec<u8>) -> LocaFormat {
    let total_len = locations.last().copied().unwrap_or(0);
    if total_len / 2 <= usize::from(u16::MAX) {
        for &loc in locations {
            #[allow(clippy::cast_possible_truncation)] // checked above
            write_u16(writer, (loc / 2) as u16);
        }
        LocaFormat::Short
    } else {
        for &loc in locations {
            write_u32(writer, u32::try_from(loc).expect("glyph location overflow"));
        }
        LocaFormat::Long
    }
}

impl HeadTable<'_> {
    /// Writes the table with zeroed `checksumAdjustment` and the specified `loca` format.
    fn write(&self, loca_format: LocaFormat, writer: &mut Vec<u8>) {
        writer.extend_from_slice(&self.raw[..Self::CHECKSUM_OFFSET]);
        write_u32(writer, 0); // adjusted when the font is assembled
        writer.extend_from_slice(&self.raw[Self::CHECKSUM_OFFSET + 4..Self::LOCA_FORMAT_OFFSET]);
        write_u16(writer, loca_format.to_raw());
        writer.extend_from_slice(&self.raw[Self::LOCA_FORMAT_OFFSET + 2..]);
    }
}

impl HheaTable<'_> {
    fn write(&self, number_of_h_metrics: u16, writer: &mut Vec<u8>) {
        // Trailing bytes beyond the fixed layout are dropped.
        writer.extend_from_slice(&self.raw[..Self::MIN_LEN - 2]);
        write_u16(writer, number_of_h_metrics);
    }
}

impl MaxpTable<'_> {
    fn write(&self, glyph_count: u16, writer: &mut Vec<u8>) {
        // Only `numGlyphs` is patched; other fields are left intact.
        writer.extend_from_slice(&self.raw[..Self::GLYPH_COUNT_OFFSET]);
        write_u16(writer, glyph_count);
        writer.extend_from_slice(&self.raw[Self::GLYPH_COUNT_OFFSET + 2..]);
    }
}

impl PostTable<'_> {
    /// Writes a version 3.0 table (i.e., one without glyph names).
    fn write(&self, writer: &mut Vec<u8>) {
        const MEMORY_FIELDS_OFFSET: usize = 16;

        write_u32(writer, 0x_0003_0000);
        // italicAngle, underlinePosition, underlineThickness, isFixedPitch
        writer.extend_from_slice(&self.header[4..MEMORY_FIELDS_OFFSET]);
        // minMemType42, maxMemType42, minMemType1, maxMemType1
        writer.extend_from_slice(&[0; Self::HEADER_LEN - MEMORY_FIELDS_OFFSET]);
    }
}

impl FontSubset<'_> {
    /// Serializes this subset to the TrueType format.
    pub fn to_truetype(&self) -> Vec<u8> {
        self.to_writer().into_opentype()
    }

    fn to_writer(&self) -> FontWriter {
        self.to_tables()
            .into_writer(self.options.sfnt_version.to_raw())
    }

    pub(crate) fn to_tables(&self) -> OutputTables {
        let mut tables = OutputTables::default();
        tables.insert_with(TableTag::CMAP, |buffer| {
            write_cmap_table(&self.cmap_segments, buffer);
        });

        let number_of_h_metrics = tables.insert_with(TableTag::HMTX, |buffer| {
            write_hmtx_table(&self.glyphs, self.options.compress_hmtx, buffer)
        });
        tables.insert_with(TableTag::HHEA, |buffer| {
            self.hhea.write(number_of_h_metrics, buffer);
        });

        // `unwrap()` is safe: the subset cannot contain more glyphs than the original font.
        let glyph_count = u16::try_from(self.glyphs.len()).unwrap();
        tables.insert_with(TableTag::MAXP, |buffer| self.maxp.write(glyph_count, buffer));
        tables.insert_with(TableTag::POST, |buffer| self.post.write(buffer));
        for &(tag, data) in &self.copied_tables {
            tables.insert(tag, data);
        }

        let locations = tables.insert_with(TableTag::GLYF, |buffer| {
            let mut locations = Vec::with_capacity(self.glyphs.len() + 1);
            locations.push(0);
            for glyph in &self.glyphs {
                glyph
                    .record
                    .write(buffer, |old_idx| self.glyph_map()[&old_idx]);
                pad_to_4_bytes(buffer);
                locations.push(buffer.len());
            }
            locations
        });

        let loca_format = tables.insert_with(TableTag::LOCA, |buffer| {
            write_loca_table(&locations, buffer)
        });
        log::debug!(
            "writing {glyph_count} glyphs ({} bytes) with {loca_format:?} `loca` format",
            locations.last().copied().unwrap_or(0)
        );
        tables.insert_with(TableTag::HEAD, |buffer| {
            self.head.write(loca_format, buffer);
        });
        tables
    }
}

/// Finalized font tables, serialized in the ascending tag order.
#[derive(Debug, Clone, Default)]
pub(crate) struct OutputTables {
    tables: BTreeMap<TableTag, Vec<u8>>,
}

impl OutputTables {
    pub(crate) fn insert(&mut self, tag: TableTag, data: &[u8]) {
        self.tables.insert(tag, data.to_vec());
    }

    pub(crate) fn insert_with<T>(
        &mut self,
        tag: TableTag,
        with: impl FnOnce(&mut Vec<u8>) -> T,
    ) -> T {
        let mut buffer = vec![];
        let output = with(&mut buffer);
        self.tables.insert(tag, buffer);
        output
    }

    pub(crate) fn into_writer(self, sfnt_version: u32) -> FontWriter {
        let mut writer = FontWriter {
            sfnt_version,
            tables: Vec::with_capacity(self.tables.len()),
            table_data: vec![],
        };
        for (tag, data) in self.tables {
            log::trace!("writing table `{tag}` ({} bytes)", data.len());
            writer.write_table(tag, &data);
        }
        writer
    }
}

#[derive(Debug, Clone, Copy)]
#[cfg_attr(test, derive(PartialEq))]
struct TableRecord {
    tag: TableTag,
    checksum: u32,
    /// Offset is initially recorded relative to the table data start. It's always 4-byte aligned.
    offset: u32,
    length: u32,
}

impl TableRecord {
    const BYTE_LEN: usize = 16;

    fn write_opentype(&self, writer: &mut Vec<u8>) {
        writer.extend_from_slice(&self.tag.0);
        write_u32(writer, self.checksum);
        write_u32(writer, self.offset);
        write_u32(writer, self.length);
    }

    fn self_checksum(&self) -> u32 {
        u32::from_be_bytes(self.tag.0)
            .wrapping_add(self.checksum)
            .wrapping_add(self.offset)
            .wrapping_add(self.length)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct FontWriter {
    sfnt_version: u32,
    tables: Vec<TableRecord>,
    /// Contains *aligned* table data
    table_data: Vec<u8>,
}

impl FontWriter {
    const SFNT_HEADER_LEN: usize = 12;

    fn write_table(&mut self, tag: TableTag, content: &[u8]) {
        let offset = self.table_data.len();
        debug_assert_eq!(offset % 4, 0, "unaligned offset: {offset}");

        self.table_data.extend_from_slice(content);
        pad_to_4_bytes(&mut self.table_data);

        let checksum = Font::checksum(&self.table_data[offset..]);
        self.tables.push(TableRecord {
            tag,
            checksum,
            offset: u32::try_from(offset).expect("table offset overflow"),
            length: u32::try_from(content.len()).expect("table length overflow"),
        });
    }

    fn write_sfnt_header(&self) -> Vec<u8> {
        let mut buffer = vec![];
        write_u32(&mut buffer, self.sfnt_version);

        // `unwrap()`s are safe: tables are keyed by unique tags, so there are few of them.
        let table_count = u16::try_from(self.tables.len()).unwrap();
        write_u16(&mut buffer, table_count);
        let entry_selector = u16::try_from(table_count.max(1).ilog2()).unwrap();
        let search_range = 1 << (4 + entry_selector);
        write_u16(&mut buffer, search_range);
        write_u16(&mut buffer, entry_selector);
        let range_shift = (16 * table_count).saturating_sub(search_range);
        write_u16(&mut buffer, range_shift);

        debug_assert_eq!(buffer.len(), Self::SFNT_HEADER_LEN);
        buffer
    }

    /// Returns the starting offset of table data.
    fn data_offset(&self) -> usize {
        Self::SFNT_HEADER_LEN + self.tables.len() * TableRecord::BYTE_LEN
    }

    pub(crate) fn into_opentype(mut self) -> Vec<u8> {
        let mut buffer = self.write_sfnt_header();
        self.adjust_data(Font::checksum(&buffer));

        debug_assert!(self.tables.is_sorted_by_key(|record| record.tag));
        for record in &self.tables {
            record.write_opentype(&mut buffer);
        }
        buffer.extend(self.table_data);
        buffer
    }

    fn adjust_data(&mut self, sfnt_header_checksum: u32) {
        let data_offset = self.data_offset();
        let data_offset_u32 = u32::try_from(data_offset).expect("data_offset overflow");

        let mut file_checksum = sfnt_header_checksum;
        for record in &mut self.tables {
            record.offset += data_offset_u32;
            file_checksum = file_checksum
                .wrapping_add(record.self_checksum())
                .wrapping_add(record.checksum);
        }
        self.patch_head_table(file_checksum, data_offset);
    }

    /// Returns the absolute offset of `checksumAdjustment` in the `head` table, or `None`
    /// if there is no `head` table (or it's too short).
    fn checksum_adjustment_offset(&self) -> Option<usize> {
        let head_table = self.tables.iter().find(|record| {
            record.tag == TableTag::HEAD
                && record.length as usize >= HeadTable::CHECKSUM_OFFSET + 4
        })?;
        Some(head_table.offset as usize + HeadTable::CHECKSUM_OFFSET)
    }

    fn patch_head_table(&mut self, file_checksum: u32, data_offset: usize) {
        let Some(offset) = self.checksum_adjustment_offset() else {
            log::warn!("no `head` table; checksum adjustment is not written");
            return;
        };
        let checksum_adjustment = Font::SFNT_CHECKSUM.wrapping_sub(file_checksum);
        // At this point, the table offset already includes the heap offset, so we need to subtract it.
        let offset = offset - data_offset;
        self.table_data[offset..offset + 4].copy_from_slice(&checksum_adjustment.to_be_bytes());
    }
}
