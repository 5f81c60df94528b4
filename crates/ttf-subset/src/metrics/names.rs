//! `name` table processing.

use crate::{
    alloc::{String, ToOwned, Vec},
    errors::ParseErrorKind,
    font::Cursor,
    ParseError,
};

/// Font names decoded from the `name` table.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[non_exhaustive]
pub struct FontNames {
    /// PostScript name of the font. Never empty.
    pub postscript: String,
    /// Font family name (e.g., `DejaVu Sans`).
    pub family: String,
    /// Font subfamily name (e.g., `Bold`).
    pub style: String,
    /// Full font name. This is the PostScript name if the font specifies one explicitly.
    pub full: String,
    /// Unique font identifier.
    pub unique_id: String,
}

/// Name IDs of interest, in the order they're stored in [`NameSlots`].
const NAME_IDS: [u16; 5] = [
    1, // family
    2, // subfamily
    3, // unique ID
    4, // full name
    6, // PostScript name
];

#[derive(Debug, Default)]
struct NameSlots([Option<String>; NAME_IDS.len()]);

impl NameSlots {
    fn slot_mut(&mut self, name_id: u16) -> Option<&mut Option<String>> {
        let idx = NAME_IDS.iter().position(|&id| id == name_id)?;
        Some(&mut self.0[idx])
    }

    fn take(&mut self, name_id: u16) -> Option<String> {
        self.slot_mut(name_id).and_then(Option::take)
    }

    fn is_full(&self) -> bool {
        self.0.iter().all(Option::is_some)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NameEncoding {
    /// Platform 3 (Windows), encoding 1 (Unicode BMP), language 0x409 (US English).
    Utf16Be,
    /// Platform 1 (Macintosh), encoding 0 (Roman), language 0 (English).
    MacRoman,
}

impl NameEncoding {
    fn new(platform_id: u16, encoding_id: u16, language_id: u16) -> Option<Self> {
        match (platform_id, encoding_id, language_id) {
            (3, 1, 0x409) => Some(Self::Utf16Be),
            (1, 0, 0) => Some(Self::MacRoman),
            _ => None,
        }
    }

    fn decode(self, mut raw: Cursor<'_>) -> Result<String, ParseError> {
        match self {
            Self::Utf16Be => {
                if raw.len() % 2 != 0 {
                    return Err(raw.err(ParseErrorKind::InvalidName));
                }
                let code_units = (0..raw.len() / 2).map(|_| raw.read_u16());
                let code_units = code_units.collect::<Result<Vec<_>, _>>()?;
                Ok(char::decode_utf16(code_units)
                    .map(|ch| ch.unwrap_or(char::REPLACEMENT_CHARACTER))
                    .collect())
            }
            // Only the ASCII subset of Mac Roman is decoded.
            Self::MacRoman => Ok(raw
                .bytes
                .iter()
                .map(|&byte| {
                    if byte.is_ascii() {
                        char::from(byte)
                    } else {
                        char::REPLACEMENT_CHARACTER
                    }
                })
                .collect()),
        }
    }
}

impl FontNames {
    const FORMAT: u16 = 0;

    pub(crate) fn parse(table: Cursor<'_>) -> Result<Self, ParseError> {
        let mut cursor = table;
        cursor.read_u16_checked(|format| {
            if format != Self::FORMAT {
                return Err(ParseErrorKind::UnexpectedTableFormat(format));
            }
            Ok(())
        })?;
        let record_count = cursor.read_u16()?;
        let storage = table.seek(cursor.read_u16()?.into())?;

        let mut slots = NameSlots::default();
        for _ in 0..record_count {
            let platform_id = cursor.read_u16()?;
            let encoding_id = cursor.read_u16()?;
            let language_id = cursor.read_u16()?;
            let name_id = cursor.read_u16()?;
            let len = usize::from(cursor.read_u16()?);
            let offset = usize::from(cursor.read_u16()?);

            let Some(slot) = slots.slot_mut(name_id) else {
                continue;
            };
            if slot.is_some() {
                continue;
            }
            let Some(encoding) = NameEncoding::new(platform_id, encoding_id, language_id) else {
                continue;
            };
            let name = encoding.decode(storage.range(offset..offset + len)?)?;
            if !name.is_empty() {
                *slot = Some(name);
                if slots.is_full() {
                    break;
                }
            }
        }

        Self::from_slots(slots).ok_or_else(|| table.err(ParseErrorKind::MissingName))
    }

    fn from_slots(mut slots: NameSlots) -> Option<Self> {
        let family = slots.take(1);
        let full = slots.take(4);
        let explicit_postscript = slots.take(6);
        let postscript = explicit_postscript
            .clone()
            .or_else(|| full.as_deref().map(|name| name.replace(' ', "-")))
            .or_else(|| family.as_deref().map(|name| name.replace(' ', "-")))?;

        Some(Self {
            family: family.unwrap_or_else(|| postscript.clone()),
            style: slots.take(2).unwrap_or_else(|| "Regular".to_owned()),
            // The explicit PostScript name overrides the full name.
            full: explicit_postscript.or(full).unwrap_or_else(|| postscript.clone()),
            unique_id: slots.take(3).unwrap_or_else(|| postscript.clone()),
            postscript,
        })
    }
}
