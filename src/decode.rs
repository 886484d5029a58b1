//! Entry name decoding.
//!
//! Archive formats rarely say which encoding an entry name uses. Zip in
//! particular only has a single "UTF-8" flag, and archives created on
//! regional Windows installs store names in the local ANSI codepage without
//! setting it. Readers that decode those names with the zip default (CP437)
//! produce mojibake, which can be undone by re-encoding through CP437.

use encoding_rs::Encoding;

use crate::entry::RawName;

/// A fixed single-byte codepage a reader may have decoded names with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Codepage {
    /// IBM PC codepage 437, the zip specification's default.
    Cp437,
}

/// CP437 code points 0x80..=0xFF. The lower half is ASCII.
const CP437_HIGH: [char; 128] = [
    'Ç', 'ü', 'é', 'â', 'ä', 'à', 'å', 'ç', 'ê', 'ë', 'è', 'ï', 'î', 'ì', 'Ä', 'Å', //
    'É', 'æ', 'Æ', 'ô', 'ö', 'ò', 'û', 'ù', 'ÿ', 'Ö', 'Ü', '¢', '£', '¥', '₧', 'ƒ', //
    'á', 'í', 'ó', 'ú', 'ñ', 'Ñ', 'ª', 'º', '¿', '⌐', '¬', '½', '¼', '¡', '«', '»', //
    '░', '▒', '▓', '│', '┤', '╡', '╢', '╖', '╕', '╣', '║', '╗', '╝', '╜', '╛', '┐', //
    '└', '┴', '┬', '├', '─', '┼', '╞', '╟', '╚', '╔', '╩', '╦', '╠', '═', '╬', '╧', //
    '╨', '╤', '╥', '╙', '╘', '╒', '╓', '╫', '╪', '┘', '┌', '█', '▄', '▌', '▐', '▀', //
    'α', 'ß', 'Γ', 'π', 'Σ', 'σ', 'µ', 'τ', 'Φ', 'Θ', 'Ω', 'δ', '∞', 'φ', 'ε', '∩', //
    '≡', '±', '≥', '≤', '⌠', '⌡', '÷', '≈', '°', '∙', '·', '√', 'ⁿ', '²', '■', '\u{a0}',
];

impl Codepage {
    /// Decode bytes with this codepage. Every byte maps to a character.
    pub fn decode(&self, bytes: &[u8]) -> String {
        match self {
            Self::Cp437 => bytes
                .iter()
                .map(|&b| {
                    if b < 0x80 {
                        b as char
                    } else {
                        CP437_HIGH[(b - 0x80) as usize]
                    }
                })
                .collect(),
        }
    }

    /// Encode text back to bytes. Returns `None` if a character has no
    /// representation in this codepage.
    pub fn encode(&self, text: &str) -> Option<Vec<u8>> {
        match self {
            Self::Cp437 => text
                .chars()
                .map(|c| {
                    if c.is_ascii() {
                        Some(c as u8)
                    } else {
                        CP437_HIGH
                            .iter()
                            .position(|&h| h == c)
                            .map(|i| 0x80 + i as u8)
                    }
                })
                .collect(),
        }
    }
}

/// Recovers readable entry names from raw archive names.
///
/// Pure and deterministic: the same raw name always decodes to the same text.
#[derive(Debug, Clone, Copy)]
pub struct FilenameDecoder {
    regional: &'static Encoding,
}

impl Default for FilenameDecoder {
    fn default() -> Self {
        Self::new(encoding_rs::GBK)
    }
}

impl FilenameDecoder {
    /// Create a decoder that falls back to `regional` for non-UTF-8 names.
    pub fn new(regional: &'static Encoding) -> Self {
        Self { regional }
    }

    /// Regional codepage used after UTF-8 fails.
    pub fn regional(&self) -> &'static Encoding {
        self.regional
    }

    /// Decode a raw name. Never fails.
    pub fn decode(&self, raw: &RawName) -> String {
        match raw {
            RawName::Bytes(bytes) => self
                .decode_strict(bytes)
                .unwrap_or_else(|| String::from_utf8_lossy(bytes).into_owned()),
            RawName::Text(text) => text.clone(),
            RawName::Legacy { text, codepage } => {
                if text.is_ascii() {
                    return text.clone();
                }
                codepage
                    .encode(text)
                    .and_then(|bytes| self.decode_strict(&bytes))
                    .unwrap_or_else(|| text.clone())
            }
        }
    }

    /// UTF-8, then the regional codepage. No replacement characters.
    fn decode_strict(&self, bytes: &[u8]) -> Option<String> {
        if let Ok(s) = std::str::from_utf8(bytes) {
            return Some(s.to_string());
        }
        self.regional
            .decode_without_bom_handling_and_without_replacement(bytes)
            .map(|s| s.into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cp437_round_trip_covers_every_byte() {
        let bytes: Vec<u8> = (0u8..=255).collect();
        let text = Codepage::Cp437.decode(&bytes);
        assert_eq!(Codepage::Cp437.encode(&text), Some(bytes));
    }

    #[test]
    fn cp437_rejects_unmapped_chars() {
        assert_eq!(Codepage::Cp437.encode("中"), None);
    }

    #[test]
    fn legacy_ascii_is_untouched() {
        let decoder = FilenameDecoder::default();
        assert_eq!(decoder.regional(), encoding_rs::GBK);
        let raw = RawName::Legacy {
            text: "docs/readme.txt".into(),
            codepage: Codepage::Cp437,
        };
        assert_eq!(decoder.decode(&raw), "docs/readme.txt");
    }
}
