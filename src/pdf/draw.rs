use std::collections::HashMap;

use pdf_writer::{Content, Name, Ref, Str};

use crate::flow::{Page, PlacedKind};
use crate::fonts::{
    FontCatalog, FontKey, FontSource, encode_as_gids, to_winansi_bytes,
};
use crate::model::{Alignment, BorderSpec, Color, TextLine};
use crate::style::ResolvedStyle;
use crate::table::{CELL_PADDING_X, CELL_PADDING_Y, RowLayout};

pub(super) struct RegisteredFont {
    pub(super) pdf_name: String,
    pub(super) font_ref: Ref,
}

pub(super) struct DrawCtx<'a> {
    pub(super) catalog: &'a FontCatalog,
    pub(super) fonts: &'a HashMap<FontKey, RegisteredFont>,
    /// (page index, placed index) -> XObject name for image blocks.
    pub(super) images: &'a HashMap<(usize, usize), String>,
}

impl DrawCtx<'_> {
    fn select(&self, family: &str, bold: bool, italic: bool) -> (&RegisteredFont, &FontKey) {
        let (_, key) = self.catalog.lookup(family, bold, italic);
        let (key, font) = self
            .fonts
            .get_key_value(&key)
            .expect("font registered during collection");
        (font, key)
    }

    fn encode(&self, key: &FontKey, text: &str) -> Vec<u8> {
        match &self.catalog.metrics_for(key).source {
            FontSource::Builtin { .. } => to_winansi_bytes(text),
            FontSource::TrueType { char_to_gid, .. } => encode_as_gids(text, char_to_gid),
        }
    }
}

/// Per-page graphics state the drawing code tracks to avoid redundant
/// operators.
struct Painter {
    fill: Option<Color>,
}

impl Painter {
    fn new() -> Self {
        Self { fill: None }
    }

    fn set_fill(&mut self, content: &mut Content, color: Color) {
        if self.fill == Some(color) {
            return;
        }
        if color == Color::BLACK {
            content.set_fill_gray(0.0);
        } else {
            content.set_fill_rgb(
                color.r as f32 / 255.0,
                color.g as f32 / 255.0,
                color.b as f32 / 255.0,
            );
        }
        self.fill = Some(color);
    }
}

pub(super) fn draw_page(content: &mut Content, page: &Page, page_idx: usize, ctx: &DrawCtx) {
    let mut painter = Painter::new();
    for (placed_idx, placed) in page.placed.iter().enumerate() {
        match &placed.kind {
            PlacedKind::Spacer => {}
            PlacedKind::Paragraph { text, style, width } => {
                if let Some(background) = style.background {
                    painter.set_fill(content, background);
                    content
                        .rect(placed.x, placed.y_top - placed.height, *width, placed.height)
                        .fill_nonzero();
                }
                draw_lines(
                    content,
                    &mut painter,
                    ctx,
                    &text.lines,
                    style,
                    placed.x,
                    *width,
                    placed.y_top - text.ascent,
                    text.line_height,
                );
            }
            PlacedKind::TableSlice {
                header,
                rows,
                grid,
                width: _,
            } => {
                let mut row_top = placed.y_top;
                for row in header.iter().chain(rows.iter()) {
                    draw_row(content, &mut painter, ctx, row, placed.x, row_top, *grid);
                    row_top -= row.height;
                }
            }
            PlacedKind::Image(img) => {
                if let Some(name) = ctx.images.get(&(page_idx, placed_idx)) {
                    content.save_state();
                    content.transform([
                        img.width,
                        0.0,
                        0.0,
                        img.height,
                        placed.x,
                        placed.y_top - img.height,
                    ]);
                    content.x_object(Name(name.as_bytes()));
                    content.restore_state();
                }
            }
        }
    }
    if painter.fill.is_some() {
        content.set_fill_gray(0.0);
    }
}

fn draw_row(
    content: &mut Content,
    painter: &mut Painter,
    ctx: &DrawCtx,
    row: &RowLayout,
    table_x: f32,
    row_top: f32,
    grid: Option<BorderSpec>,
) {
    let row_bottom = row_top - row.height;

    for cell in &row.cells {
        let cell_x = table_x + cell.x;
        if let Some(background) = cell.style.background {
            painter.set_fill(content, background);
            content
                .rect(cell_x, row_bottom, cell.width, row.height)
                .fill_nonzero();
        }
        if cell.text.lines.iter().any(|l| !l.spans.is_empty()) {
            let text_width = (cell.width - 2.0 * CELL_PADDING_X).max(0.0);
            draw_lines(
                content,
                painter,
                ctx,
                &cell.text.lines,
                &cell.style,
                cell_x + CELL_PADDING_X,
                text_width,
                row_top - CELL_PADDING_Y - cell.text.ascent,
                cell.text.line_height,
            );
        }
    }

    if let Some(border) = grid {
        content.save_state();
        content.set_line_width(border.width);
        if border.color != Color::BLACK {
            content.set_stroke_rgb(
                border.color.r as f32 / 255.0,
                border.color.g as f32 / 255.0,
                border.color.b as f32 / 255.0,
            );
        }
        for cell in &row.cells {
            content
                .rect(table_x + cell.x, row_bottom, cell.width, row.height)
                .stroke();
        }
        content.restore_state();
    }
}

/// Draws pre-measured lines applying the style's alignment. Justified
/// paragraphs stretch inter-span gaps on every line but the last.
#[allow(clippy::too_many_arguments)]
fn draw_lines(
    content: &mut Content,
    painter: &mut Painter,
    ctx: &DrawCtx,
    lines: &[TextLine],
    style: &ResolvedStyle,
    x: f32,
    width: f32,
    first_baseline: f32,
    line_height: f32,
) {
    painter.set_fill(content, style.text_color);

    let last_line = lines.len().saturating_sub(1);
    for (line_idx, line) in lines.iter().enumerate() {
        if line.spans.is_empty() {
            continue;
        }
        let baseline = first_baseline - line_idx as f32 * line_height;

        let line_x = match style.alignment {
            Alignment::Left | Alignment::Justify => x,
            Alignment::Center => x + (width - line.width) / 2.0,
            Alignment::Right => x + width - line.width,
        };
        let extra_per_gap = if style.alignment == Alignment::Justify
            && line_idx != last_line
            && line.spans.len() > 1
        {
            (width - line.width) / (line.spans.len() - 1) as f32
        } else {
            0.0
        };

        content.begin_text();
        let mut cur_font: Option<(String, f32)> = None;
        let mut td_x = 0.0f32;
        let mut td_y = 0.0f32;
        for (span_idx, span) in line.spans.iter().enumerate() {
            let (font, key) = ctx.select(&style.font_family, span.bold, span.italic);
            let wanted = (font.pdf_name.clone(), style.font_size);
            if cur_font.as_ref() != Some(&wanted) {
                content.set_font(Name(font.pdf_name.as_bytes()), style.font_size);
                cur_font = Some(wanted);
            }

            let span_x = line_x + span.x + span_idx as f32 * extra_per_gap;
            content.next_line(span_x - td_x, baseline - td_y);
            td_x = span_x;
            td_y = baseline;

            let bytes = ctx.encode(key, &span.text);
            content.show(Str(&bytes));
        }
        content.end_text();
    }
}
