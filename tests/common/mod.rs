#![allow(dead_code)]

use folio_pdf::{
    DocumentConfig, LineSpan, Margins, MeasuredText, PageGeometry, PageSize, ResolvedStyle, Run,
    StyleRegistry, TextLine, TextMeasurer,
};

/// Deterministic measurer for paginator tests: every paragraph or cell is a
/// single line of fixed height, one point of width per character, no
/// wrapping. Keeps the flow tests independent of any real font metrics.
pub struct FixedMeasurer {
    pub line_height: f32,
}

impl FixedMeasurer {
    pub fn new(line_height: f32) -> Self {
        Self { line_height }
    }
}

impl TextMeasurer for FixedMeasurer {
    fn measure(&self, runs: &[Run], _style: &ResolvedStyle, _max_width: f32) -> MeasuredText {
        let mut spans = Vec::new();
        let mut x = 0.0f32;
        for run in runs.iter().filter(|r| !r.is_break) {
            let width = run.text.len() as f32;
            spans.push(LineSpan {
                text: run.text.clone(),
                bold: run.bold,
                italic: run.italic,
                x,
                width,
            });
            x += width;
        }
        MeasuredText {
            lines: vec![TextLine { spans, width: x }],
            line_height: self.line_height,
            ascent: self.line_height * 0.75,
        }
    }
}

/// Page with zero margins so the usable height is exactly `usable`.
pub fn geometry(width: f32, usable: f32) -> PageGeometry {
    PageGeometry::new(
        PageSize::Custom {
            width,
            height: usable,
        },
        Margins::uniform(0.0),
    )
}

pub fn registry() -> StyleRegistry {
    StyleRegistry::new(&DocumentConfig::default())
}
