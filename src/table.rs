use crate::error::Error;
use crate::model::{BorderSpec, MeasuredText, Run, TableSpec, TextMeasurer};
use crate::style::ResolvedStyle;

/// Horizontal padding inside a cell, in points.
pub const CELL_PADDING_X: f32 = 6.0;
/// Vertical padding above and below a cell's text, in points.
pub const CELL_PADDING_Y: f32 = 3.0;

const EPS: f32 = 0.01;

/// One laid-out cell: position relative to the table's left edge, resolved
/// per-cell style (base merged with region overrides) and measured text.
#[derive(Clone, Debug)]
pub struct CellLayout {
    pub x: f32,
    pub width: f32,
    pub style: ResolvedStyle,
    pub text: MeasuredText,
}

#[derive(Clone, Debug)]
pub struct RowLayout {
    pub height: f32,
    pub cells: Vec<CellLayout>,
}

/// A fully measured table: resolved column widths and per-row cell layouts,
/// split into the repeated header region and the body.
#[derive(Clone, Debug)]
pub struct TableLayout {
    pub col_widths: Vec<f32>,
    pub header: Vec<RowLayout>,
    pub body: Vec<RowLayout>,
    pub grid: Option<BorderSpec>,
    pub width: f32,
}

/// Distributes `available` width over the table's columns: explicit widths
/// are kept as-is and the remainder is divided evenly among unspecified
/// columns. Explicit widths that already exceed the available width fail,
/// naming the offending columns.
pub fn resolve_column_widths(spec: &TableSpec, available: f32) -> Result<Vec<f32>, Error> {
    let ncols = spec.ncols();
    if ncols == 0 {
        return Ok(Vec::new());
    }

    let explicit: f32 = (0..ncols)
        .filter_map(|i| spec.col_widths.get(i).copied().flatten())
        .sum();
    if explicit > available + EPS {
        let columns: Vec<usize> = (0..ncols)
            .filter(|&i| spec.col_widths.get(i).copied().flatten().is_some())
            .collect();
        return Err(Error::OverconstrainedWidth {
            available,
            requested: explicit,
            columns,
        });
    }

    let unspecified = (0..ncols)
        .filter(|&i| spec.col_widths.get(i).copied().flatten().is_none())
        .count();
    let share = if unspecified > 0 {
        (available - explicit) / unspecified as f32
    } else {
        0.0
    };

    Ok((0..ncols)
        .map(|i| spec.col_widths.get(i).copied().flatten().unwrap_or(share))
        .collect())
}

/// Merged style for one cell: the table's base style with every region
/// override whose range contains `(row, col)` applied in declaration order,
/// last one winning per attribute.
pub fn style_for_cell(spec: &TableSpec, base: &ResolvedStyle, row: usize, col: usize) -> ResolvedStyle {
    let mut style = base.clone();
    for (range, region) in &spec.regions {
        if !range.contains(row, col) {
            continue;
        }
        if let Some(background) = region.background {
            style.background = Some(background);
        }
        if let Some(color) = region.text_color {
            style.text_color = color;
        }
        if let Some(bold) = region.bold {
            style.bold = bold;
        }
    }
    style
}

impl TableLayout {
    /// Resolves column widths and measures every cell at those widths. Row
    /// height is the tallest wrapped cell in the row plus padding.
    pub fn compute(
        spec: &TableSpec,
        base: &ResolvedStyle,
        available: f32,
        measurer: &dyn TextMeasurer,
    ) -> Result<Self, Error> {
        let col_widths = resolve_column_widths(spec, available)?;
        let width: f32 = col_widths.iter().sum();

        let mut col_x = Vec::with_capacity(col_widths.len());
        let mut x = 0.0f32;
        for w in &col_widths {
            col_x.push(x);
            x += w;
        }

        let mut rows: Vec<RowLayout> = Vec::with_capacity(spec.nrows());
        for (ri, row) in spec.rows.iter().enumerate() {
            let mut max_text_h = 0.0f32;
            let cells: Vec<CellLayout> = row
                .iter()
                .enumerate()
                .map(|(ci, text)| {
                    let style = style_for_cell(spec, base, ri, ci);
                    let text_width = (col_widths[ci] - 2.0 * CELL_PADDING_X).max(0.0);
                    let runs = [Run::text(text.clone(), false, false)];
                    let measured = measurer.measure(&runs, &style, text_width);
                    max_text_h = max_text_h.max(measured.height());
                    CellLayout {
                        x: col_x[ci],
                        width: col_widths[ci],
                        style,
                        text: measured,
                    }
                })
                .collect();
            rows.push(RowLayout {
                height: max_text_h + 2.0 * CELL_PADDING_Y,
                cells,
            });
        }

        let header_rows = spec.header_rows.min(rows.len());
        let body = rows.split_off(header_rows);
        Ok(Self {
            col_widths,
            header: rows,
            body,
            grid: spec.grid,
            width,
        })
    }

    pub fn header_height(&self) -> f32 {
        self.header.iter().map(|r| r.height).sum()
    }

    pub fn total_height(&self) -> f32 {
        self.header_height() + self.body.iter().map(|r| r.height).sum::<f32>()
    }

    /// Plans page slices for a table taller than one page: each slice starts
    /// with the header region and takes as many body rows as fit in
    /// `page_budget`. Splits happen only at row boundaries and every slice
    /// makes progress, so a row taller than the budget still occupies a
    /// slice by itself (the caller reports that as overflow).
    pub fn plan_slices(&self, page_budget: f32) -> Vec<(usize, usize)> {
        let mut slices = Vec::new();
        let header_h = self.header_height();
        let mut start = 0;
        while start < self.body.len() {
            let mut used = header_h;
            let mut end = start;
            while end < self.body.len() && used + self.body[end].height <= page_budget + EPS {
                used += self.body[end].height;
                end += 1;
            }
            if end == start {
                // Single row exceeds the budget; never split mid-row.
                end = start + 1;
            }
            slices.push((start, end));
            start = end;
        }
        if slices.is_empty() {
            // Header-only table.
            slices.push((0, 0));
        }
        slices
    }

    /// Height of the slice covering body rows `start..end`, header included.
    pub fn slice_height(&self, start: usize, end: usize) -> f32 {
        self.header_height() + self.body[start..end].iter().map(|r| r.height).sum::<f32>()
    }
}
