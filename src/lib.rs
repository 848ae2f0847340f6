mod content;
mod error;
mod flow;
mod fonts;
mod model;
mod pdf;
mod style;
mod table;

pub use content::{ContentModel, ContentSequence, parse_markup};
pub use error::Error;
pub use flow::{ContentOverflowWarning, Document, Page, Placed, PlacedKind, paginate};
pub use fonts::FontCatalog;
pub use model::{
    Alignment, Block, BorderSpec, CellRange, Color, DocumentConfig, ImageBlock, ImageFormat,
    LineSpan, Margins, MeasuredText, POINTS_PER_INCH, PageGeometry, PageSize, RegionStyle, Run,
    TableSpec, TextLine, TextMeasurer,
};
pub use pdf::render;
pub use style::{BASE_STYLE, ResolvedStyle, StyleAttrs, StyleRegistry};
pub use table::{
    CELL_PADDING_X, CELL_PADDING_Y, CellLayout, RowLayout, TableLayout, resolve_column_widths,
    style_for_cell,
};

use std::path::Path;
use std::time::Instant;

/// Renders the paginated document and writes it to `output`. The bytes are
/// staged in a sibling temp file and renamed into place, so a failed render
/// or write never leaves a readable partial document behind.
pub fn render_to_file(
    document: &Document,
    fonts: &FontCatalog,
    output: &Path,
) -> Result<(), Error> {
    let t0 = Instant::now();

    let bytes = pdf::render(document, fonts)?;
    let t_render = t0.elapsed();

    let mut tmp = output.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = std::path::PathBuf::from(tmp);

    let staged = std::fs::write(&tmp, &bytes).and_then(|_| std::fs::rename(&tmp, output));
    if let Err(e) = staged {
        let _ = std::fs::remove_file(&tmp);
        return Err(Error::Io(e));
    }
    let t_total = t0.elapsed();

    log::info!(
        "Timing: render={:.1}ms, write={:.1}ms, total={:.1}ms ({} pages, {} bytes)",
        t_render.as_secs_f64() * 1000.0,
        (t_total - t_render).as_secs_f64() * 1000.0,
        t_total.as_secs_f64() * 1000.0,
        document.pages.len(),
        bytes.len(),
    );

    Ok(())
}
