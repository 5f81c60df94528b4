use core::{fmt, ops};

use crate::TableTag;

/// Broad category of a [`ParseError`].
///
/// Callers may use the category to decide on a fallback: e.g., an [`UnsupportedFeature`]
/// font can be replaced with a non-embedded core font, while a [`PolicyViolation`] must never
/// be embedded.
///
/// [`UnsupportedFeature`]: Self::UnsupportedFeature
/// [`PolicyViolation`]: Self::PolicyViolation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorCategory {
    /// Font data is truncated, inconsistent or otherwise malformed.
    MalformedInput,
    /// Font uses a feature that is not supported (CFF outlines, font collections, etc.).
    UnsupportedFeature,
    /// Font license forbids embedding.
    PolicyViolation,
}

/// Kind of a font [`ParseError`].
#[derive(Debug)]
#[non_exhaustive]
pub enum ParseErrorKind {
    /// Unexpected end of the font data.
    UnexpectedEof,
    /// Unexpected font version, i.e., the data is not a TrueType font.
    UnexpectedFontVersion(u32),
    /// Font format is recognized, but not supported (e.g., CFF outlines or a font collection).
    UnsupportedFontFormat(u32),
    /// Missing required font table (e.g., `head`).
    MissingTable,
    /// The same table is present in the table directory more than once.
    DuplicateTable,
    /// The `name` table doesn't contain a name usable as a PostScript name.
    MissingName,
    /// The `name` table contains an invalid string.
    InvalidName,
    /// No format-4 Unicode subtable in the `cmap` table.
    NoUnicodeCmap,
    /// Font license (`fsType` in the `OS/2` table) forbids embedding.
    EmbeddingForbidden {
        /// Value of the `fsType` field.
        fs_type: u16,
    },
    /// Offset inferred from the table data is out of bounds.
    OffsetOutOfBounds(usize),
    /// Range inferred from the table data is out of bounds.
    RangeOutOfBounds {
        /// Inferred range.
        range: ops::Range<usize>,
        /// Length of the indexed data.
        len: usize,
    },
    /// Glyph index is out of bounds.
    GlyphOutOfBounds {
        /// Referenced glyph index.
        glyph_idx: u16,
        /// Number of glyphs in the font.
        glyph_count: u16,
    },
    /// Unexpected table version.
    UnexpectedTableVersion(u32),
    /// Unexpected table length.
    UnexpectedTableLen {
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },
    /// Unexpected table format (e.g., for a `name` table or glyph data).
    UnexpectedTableFormat(u16),
    /// Unexpected value of a table field.
    UnexpectedValue {
        /// Field name.
        field: &'static str,
        /// Field value.
        value: u32,
    },
    /// Unsupported combination of flags in a composite glyph component.
    UnsupportedComponentFlags(u16),
    /// Subset character map cannot be encoded as a format-4 `cmap` subtable.
    TooManyCmapSegments(usize),
}

impl ParseErrorKind {
    /// Returns the category of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UnsupportedFontFormat(_)
            | Self::NoUnicodeCmap
            | Self::UnexpectedTableFormat(_)
            | Self::UnsupportedComponentFlags(_)
            | Self::TooManyCmapSegments(_) => ErrorCategory::UnsupportedFeature,
            Self::EmbeddingForbidden { .. } => ErrorCategory::PolicyViolation,
            _ => ErrorCategory::MalformedInput,
        }
    }
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEof => formatter.write_str("unexpected end of the font data"),
            Self::UnexpectedFontVersion(val) => {
                write!(formatter, "unexpected font version ({val:#010x})")
            }
            Self::UnsupportedFontFormat(val) => {
                let description = match *val {
                    crate::Font::OTTO_VERSION => "PostScript (CFF) outlines",
                    crate::Font::COLLECTION_VERSION => "TrueType font collections",
                    _ => "font format",
                };
                write!(formatter, "{description} are not supported")
            }
            Self::MissingTable => formatter.write_str("missing required font table"),
            Self::DuplicateTable => formatter.write_str("font table is defined more than once"),
            Self::MissingName => formatter.write_str("cannot find PostScript font name"),
            Self::InvalidName => formatter.write_str("invalid string in the `name` table"),
            Self::NoUnicodeCmap => formatter.write_str(
                "no Unicode subtable in the `cmap` table \
                 (platform 3 / encoding 1 or platform 0, format 4)",
            ),
            Self::EmbeddingForbidden { fs_type } => write!(
                formatter,
                "font license forbids embedding (fsType = {fs_type:#06x})"
            ),
            Self::OffsetOutOfBounds(val) => {
                write!(
                    formatter,
                    "offset ({val}) inferred from the table data is out of bounds"
                )
            }
            Self::RangeOutOfBounds { range, len } => {
                write!(
                    formatter,
                    "range ({range:?}) inferred from the table data is out of bounds (..{len})"
                )
            }
            Self::GlyphOutOfBounds {
                glyph_idx,
                glyph_count,
            } => {
                write!(
                    formatter,
                    "glyph #{glyph_idx} is out of bounds (font has {glyph_count} glyphs)"
                )
            }
            Self::UnexpectedTableVersion(val) => {
                write!(formatter, "unexpected table version ({val})")
            }
            Self::UnexpectedTableLen { expected, actual } => {
                write!(
                    formatter,
                    "unexpected table length: expected {expected}, got {actual}"
                )
            }
            Self::UnexpectedTableFormat(val) => {
                write!(formatter, "unexpected table format ({val})")
            }
            Self::UnexpectedValue { field, value } => {
                write!(formatter, "unexpected value of `{field}`: {value}")
            }
            Self::UnsupportedComponentFlags(flags) => {
                write!(
                    formatter,
                    "unsupported composite glyph component flags ({flags:#06x})"
                )
            }
            Self::TooManyCmapSegments(count) => {
                write!(
                    formatter,
                    "{count} segments do not fit into a format-4 `cmap` subtable"
                )
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ParseErrorKind {}

/// Errors that can occur when parsing or subsetting a TrueType [`Font`](crate::Font).
#[derive(Debug)]
pub struct ParseError {
    pub(crate) kind: ParseErrorKind,
    pub(crate) offset: usize,
    pub(crate) table: Option<TableTag>,
}

impl fmt::Display for ParseError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(table) = self.table {
            write!(formatter, "[{table}] ")?;
        }
        if self.offset > 0 {
            write!(formatter, "{}: ", self.offset)?;
        }
        fmt::Display::fmt(&self.kind, formatter)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

impl ParseError {
    pub(crate) fn new(kind: ParseErrorKind) -> Self {
        Self {
            kind,
            offset: 0,
            table: None,
        }
    }

    pub(crate) fn missing_table(tag: TableTag) -> Self {
        Self {
            kind: ParseErrorKind::MissingTable,
            offset: 0,
            table: Some(tag),
        }
    }

    pub(crate) fn with_table(mut self, tag: TableTag) -> Self {
        self.table.get_or_insert(tag);
        self
    }

    /// Gets the error kind.
    pub fn kind(&self) -> &ParseErrorKind {
        &self.kind
    }

    /// Gets the error category. This is a shortcut for `self.kind().category()`.
    pub fn category(&self) -> ErrorCategory {
        self.kind.category()
    }

    /// Gets the table this error relates to.
    pub fn table(&self) -> Option<TableTag> {
        self.table
    }

    /// Gets the offset in the font data.
    pub fn offset(&self) -> usize {
        self.offset
    }
}
