use std::collections::HashMap;

use ttf_parser::Face;

use crate::error::Error;
use crate::model::{LineSpan, MeasuredText, Run, TextLine, TextMeasurer};
use crate::style::ResolvedStyle;

/// (lowercase family name, bold, italic)
pub(crate) type FontKey = (String, bool, bool);

pub(crate) enum FontSource {
    /// One of the standard PDF base fonts; nothing is embedded.
    Builtin { base_name: &'static str },
    /// A registered TrueType font, embedded whole at render time.
    TrueType {
        data: Vec<u8>,
        char_to_gid: HashMap<char, u16>,
    },
}

pub(crate) struct FontMetrics {
    /// Advance widths at 1000 units/em for WinAnsi codes 32..=255.
    pub(crate) widths_1000: Vec<f32>,
    pub(crate) line_h_ratio: f32,
    pub(crate) ascender_ratio: f32,
    pub(crate) source: FontSource,
}

impl FontMetrics {
    fn char_width_1000(&self, ch: char) -> f32 {
        let byte = char_to_winansi(ch);
        if byte >= 32 {
            self.widths_1000[(byte - 32) as usize]
        } else {
            0.0
        }
    }

    pub(crate) fn word_width(&self, word: &str, font_size: f32) -> f32 {
        word.chars()
            .map(|ch| self.char_width_1000(ch) * font_size / 1000.0)
            .sum()
    }

    pub(crate) fn space_width(&self, font_size: f32) -> f32 {
        self.widths_1000[0] * font_size / 1000.0
    }
}

/// Font metrics for measurement plus the data the renderer needs to register
/// each face. Ships deterministic metric tables for the standard Helvetica,
/// Courier and Times families; real TrueType fonts can be registered on top.
pub struct FontCatalog {
    fonts: HashMap<FontKey, FontMetrics>,
}

impl Default for FontCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl FontCatalog {
    pub fn new() -> Self {
        let mut fonts = HashMap::new();
        for (family, variants) in BUILTIN_FAMILIES {
            for &(bold, italic, base_name) in variants.iter() {
                fonts.insert(
                    (family.to_string(), bold, italic),
                    FontMetrics {
                        widths_1000: builtin_widths(family, bold),
                        line_h_ratio: 1.2,
                        ascender_ratio: 0.75,
                        source: FontSource::Builtin { base_name },
                    },
                );
            }
        }
        Self { fonts }
    }

    /// Registers a TrueType font for `family` in the given variant. Metrics
    /// are read with `ttf-parser`; the font data is embedded at render time.
    pub fn register_ttf(
        &mut self,
        family: &str,
        bold: bool,
        italic: bool,
        data: Vec<u8>,
    ) -> Result<(), Error> {
        let face = Face::parse(&data, 0).map_err(|_| Error::InvalidFont {
            family: family.to_string(),
        })?;
        let units = face.units_per_em() as f32;

        let widths_1000: Vec<f32> = (32u8..=255u8)
            .map(|byte| {
                face.glyph_index(winansi_to_char(byte))
                    .and_then(|gid| face.glyph_hor_advance(gid))
                    .map(|adv| adv as f32 / units * 1000.0)
                    .unwrap_or(0.0)
            })
            .collect();

        let mut char_to_gid = HashMap::new();
        for byte in 32u8..=255u8 {
            let ch = winansi_to_char(byte);
            if let Some(gid) = face.glyph_index(ch) {
                char_to_gid.insert(ch, gid.0);
            }
        }

        let line_gap = face.line_gap() as f32;
        let line_h_ratio = (face.ascender() as f32 - face.descender() as f32 + line_gap) / units;
        let ascender_ratio = face.ascender() as f32 / units;

        log::debug!("registered TrueType font {family:?} bold={bold} italic={italic}");
        self.fonts.insert(
            (family.to_lowercase(), bold, italic),
            FontMetrics {
                widths_1000,
                line_h_ratio,
                ascender_ratio,
                source: FontSource::TrueType { data, char_to_gid },
            },
        );
        Ok(())
    }

    /// Looks up the closest registered variant: exact, then the regular cut
    /// of the family, then the matching Helvetica variant.
    pub(crate) fn lookup(&self, family: &str, bold: bool, italic: bool) -> (&FontMetrics, FontKey) {
        let family = family.to_lowercase();
        let requested = (family.clone(), bold, italic);
        let candidates = [
            requested.clone(),
            (family, false, false),
            ("helvetica".to_string(), bold, italic),
            ("helvetica".to_string(), false, false),
        ];
        for key in candidates {
            if self.fonts.contains_key(&key) {
                if key != requested {
                    log::debug!("font {requested:?} not registered, substituting {key:?}");
                }
                return (&self.fonts[&key], key);
            }
        }
        unreachable!("helvetica variants are always registered")
    }

    pub(crate) fn metrics_for(&self, key: &FontKey) -> &FontMetrics {
        &self.fonts[key]
    }
}

const HELVETICA: [(bool, bool, &str); 4] = [
    (false, false, "Helvetica"),
    (true, false, "Helvetica-Bold"),
    (false, true, "Helvetica-Oblique"),
    (true, true, "Helvetica-BoldOblique"),
];
const COURIER: [(bool, bool, &str); 4] = [
    (false, false, "Courier"),
    (true, false, "Courier-Bold"),
    (false, true, "Courier-Oblique"),
    (true, true, "Courier-BoldOblique"),
];
const TIMES: [(bool, bool, &str); 4] = [
    (false, false, "Times-Roman"),
    (true, false, "Times-Bold"),
    (false, true, "Times-Italic"),
    (true, true, "Times-BoldItalic"),
];

const BUILTIN_FAMILIES: [(&str, &[(bool, bool, &str)]); 3] = [
    ("helvetica", &HELVETICA),
    ("courier", &COURIER),
    ("times", &TIMES),
];

fn builtin_widths(family: &str, bold: bool) -> Vec<f32> {
    match family {
        "courier" => vec![600.0; 224],
        "times" => times_widths(),
        _ => helvetica_widths(bold),
    }
}

/// Approximate Helvetica widths at 1000 units/em for WinAnsi chars 32..=255.
fn helvetica_widths(bold: bool) -> Vec<f32> {
    let widen = if bold { 1.04 } else { 1.0 };
    (32u8..=255u8)
        .map(|b| {
            widen
                * match b {
                    32 => 278.0,                          // space
                    33..=47 => 333.0,                     // punctuation
                    48..=57 => 556.0,                     // digits
                    58..=64 => 333.0,                     // more punctuation
                    73 | 74 => 278.0,                     // I J (narrow uppercase)
                    77 => 833.0,                          // M (wide)
                    65..=90 => 667.0,                     // uppercase A-Z (average)
                    91..=96 => 333.0,                     // brackets etc.
                    102 | 105 | 106 | 108 | 116 => 278.0, // narrow lowercase: f i j l t
                    109 | 119 => 833.0,                   // m w (wide)
                    97..=122 => 556.0,                    // lowercase a-z (average)
                    _ => 556.0,
                }
        })
        .collect()
}

/// Approximate Times widths, slightly narrower than Helvetica on average.
fn times_widths() -> Vec<f32> {
    (32u8..=255u8)
        .map(|b| match b {
            32 => 250.0,
            33..=47 => 333.0,
            48..=57 => 500.0,
            58..=64 => 333.0,
            73 | 74 => 333.0,
            77 => 889.0,
            65..=90 => 667.0,
            91..=96 => 333.0,
            102 | 105 | 106 | 108 | 116 => 278.0,
            109 | 119 => 722.0,
            97..=122 => 480.0,
            _ => 500.0,
        })
        .collect()
}

/// WinAnsi code -> char for the non-Latin-1 range 0x80..0x9F.
pub(crate) fn winansi_to_char(byte: u8) -> char {
    match byte {
        0x80 => '\u{20AC}',
        0x82 => '\u{201A}',
        0x83 => '\u{0192}',
        0x84 => '\u{201E}',
        0x85 => '\u{2026}',
        0x86 => '\u{2020}',
        0x87 => '\u{2021}',
        0x88 => '\u{02C6}',
        0x89 => '\u{2030}',
        0x8A => '\u{0160}',
        0x8B => '\u{2039}',
        0x8C => '\u{0152}',
        0x8E => '\u{017D}',
        0x91 => '\u{2018}',
        0x92 => '\u{2019}',
        0x93 => '\u{201C}',
        0x94 => '\u{201D}',
        0x95 => '\u{2022}',
        0x96 => '\u{2013}',
        0x97 => '\u{2014}',
        0x98 => '\u{02DC}',
        0x99 => '\u{2122}',
        0x9A => '\u{0161}',
        0x9B => '\u{203A}',
        0x9C => '\u{0153}',
        0x9E => '\u{017E}',
        0x9F => '\u{0178}',
        _ => byte as char,
    }
}

pub(crate) fn char_to_winansi(c: char) -> u8 {
    let code = c as u32;
    match code {
        0x20..=0x7E => code as u8,
        0xA0..=0xFF => code as u8,
        0x20AC => 0x80,
        0x201A => 0x82,
        0x0192 => 0x83,
        0x201E => 0x84,
        0x2026 => 0x85,
        0x2020 => 0x86,
        0x2021 => 0x87,
        0x02C6 => 0x88,
        0x2030 => 0x89,
        0x0160 => 0x8A,
        0x2039 => 0x8B,
        0x0152 => 0x8C,
        0x017D => 0x8E,
        0x2018 => 0x91,
        0x2019 => 0x92,
        0x201C => 0x93,
        0x201D => 0x94,
        0x2022 => 0x95,
        0x2013 => 0x96,
        0x2014 => 0x97,
        0x02DC => 0x98,
        0x2122 => 0x99,
        0x0161 => 0x9A,
        0x203A => 0x9B,
        0x0153 => 0x9C,
        0x017E => 0x9E,
        0x0178 => 0x9F,
        _ => b'?',
    }
}

pub(crate) fn to_winansi_bytes(s: &str) -> Vec<u8> {
    s.chars().map(char_to_winansi).collect()
}

/// Encode text as big-endian 2-byte glyph IDs for Identity-H content streams.
pub(crate) fn encode_as_gids(text: &str, char_to_gid: &HashMap<char, u16>) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() * 2);
    for ch in text.chars() {
        let gid = char_to_gid.get(&ch).copied().unwrap_or(0);
        out.push((gid >> 8) as u8);
        out.push((gid & 0xFF) as u8);
    }
    out
}

impl TextMeasurer for FontCatalog {
    /// Greedy word wrap. Words never split; a space is inserted between
    /// words only when the joining text actually carried whitespace, so
    /// adjacent runs like "bold" + ", " join without a gap.
    fn measure(&self, runs: &[Run], style: &ResolvedStyle, max_width: f32) -> MeasuredText {
        let (base_metrics, _) = self.lookup(&style.font_family, style.bold, style.italic);
        let line_height = style.font_size * base_metrics.line_h_ratio * style.leading;
        let ascent = style.font_size * base_metrics.ascender_ratio;

        let mut lines: Vec<TextLine> = Vec::new();
        let mut spans: Vec<LineSpan> = Vec::new();
        let mut cursor: f32 = 0.0;
        let mut prev_ended_with_ws = false;
        let mut prev_space_w: f32 = 0.0;

        let finish_line = |spans: &mut Vec<LineSpan>, lines: &mut Vec<TextLine>| {
            let width = spans.last().map(|s| s.x + s.width).unwrap_or(0.0);
            lines.push(TextLine {
                spans: std::mem::take(spans),
                width,
            });
        };

        for run in runs {
            if run.is_break {
                finish_line(&mut spans, &mut lines);
                cursor = 0.0;
                prev_ended_with_ws = false;
                continue;
            }

            let bold = style.bold || run.bold;
            let italic = style.italic || run.italic;
            let (metrics, _) = self.lookup(&style.font_family, bold, italic);
            let space_w = metrics.space_width(style.font_size);
            let starts_with_ws = run.text.starts_with(char::is_whitespace);

            for (i, word) in run.text.split_whitespace().enumerate() {
                let word_w = metrics.word_width(word, style.font_size);

                let need_space =
                    !spans.is_empty() && (i > 0 || starts_with_ws || prev_ended_with_ws);
                // The space belongs to whichever run carried the whitespace.
                let joining_space = if i > 0 || starts_with_ws {
                    space_w
                } else {
                    prev_space_w
                };
                let proposed = if need_space {
                    cursor + joining_space
                } else {
                    cursor
                };

                if !spans.is_empty() && proposed + word_w > max_width {
                    finish_line(&mut spans, &mut lines);
                    cursor = 0.0;
                } else {
                    cursor = proposed;
                }

                spans.push(LineSpan {
                    text: word.to_string(),
                    bold,
                    italic,
                    x: cursor,
                    width: word_w,
                });
                cursor += word_w;
            }

            prev_ended_with_ws = run.text.ends_with(char::is_whitespace);
            prev_space_w = space_w;
        }

        if !spans.is_empty() || lines.is_empty() {
            finish_line(&mut spans, &mut lines);
        }

        MeasuredText {
            lines,
            line_height,
            ascent,
        }
    }
}
