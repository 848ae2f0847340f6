use crate::content::ContentSequence;
use crate::error::Error;
use crate::model::{Block, BorderSpec, ImageBlock, MeasuredText, PageGeometry, TextMeasurer};
use crate::style::{ResolvedStyle, StyleRegistry};
use crate::table::{RowLayout, TableLayout};

const EPS: f32 = 0.01;

/// A block placed on a page, fully measured. `y_top` is the top edge of the
/// block in page coordinates (PDF origin bottom-left).
#[derive(Clone, Debug)]
pub struct Placed {
    pub x: f32,
    pub y_top: f32,
    pub height: f32,
    pub kind: PlacedKind,
}

#[derive(Clone, Debug)]
pub enum PlacedKind {
    Paragraph {
        text: MeasuredText,
        style: ResolvedStyle,
        width: f32,
    },
    TableSlice {
        header: Vec<RowLayout>,
        rows: Vec<RowLayout>,
        grid: Option<BorderSpec>,
        width: f32,
    },
    Image(ImageBlock),
    Spacer,
}

/// One sealed page.
#[derive(Clone, Debug, Default)]
pub struct Page {
    pub placed: Vec<Placed>,
}

impl Page {
    pub fn is_empty(&self) -> bool {
        self.placed.is_empty()
    }
}

/// Non-fatal layout diagnostics. Content is never dropped; a block that
/// cannot fit any page is placed anyway and reported here.
#[derive(Clone, Debug, PartialEq)]
pub struct ContentOverflowWarning {
    pub block_index: usize,
    pub required: f32,
    pub available: f32,
}

/// The paginated document: sealed pages in model order plus the geometry
/// they were laid out against.
#[derive(Clone, Debug)]
pub struct Document {
    pub geometry: PageGeometry,
    pub pages: Vec<Page>,
    pub warnings: Vec<ContentOverflowWarning>,
}

struct FlowState {
    pages: Vec<Page>,
    current: Page,
    cursor: f32,
    prev_space_after: f32,
    top: f32,
    bottom: f32,
}

impl FlowState {
    fn at_page_top(&self) -> bool {
        (self.cursor - self.top).abs() < EPS
    }

    fn remaining(&self) -> f32 {
        self.cursor - self.bottom
    }

    /// Seals the current page, empty or not, and starts a fresh one.
    fn seal(&mut self) {
        log::debug!(
            "page {} sealed ({} blocks)",
            self.pages.len() + 1,
            self.current.placed.len()
        );
        self.pages.push(std::mem::take(&mut self.current));
        self.cursor = self.top;
        self.prev_space_after = 0.0;
    }

    fn place(&mut self, x: f32, height: f32, kind: PlacedKind) {
        self.current.placed.push(Placed {
            x,
            y_top: self.cursor,
            height,
            kind,
        });
        self.cursor -= height;
    }
}

/// Lays the frozen block sequence out into pages. Single-pass and
/// deterministic: identical input always yields identical pagination.
pub fn paginate(
    content: &ContentSequence,
    registry: &StyleRegistry,
    geometry: &PageGeometry,
    measurer: &dyn TextMeasurer,
) -> Result<Document, Error> {
    let full_budget = geometry.content_height();
    let mut warnings: Vec<ContentOverflowWarning> = Vec::new();
    let mut state = FlowState {
        pages: Vec::new(),
        current: Page::default(),
        cursor: geometry.content_top(),
        prev_space_after: 0.0,
        top: geometry.content_top(),
        bottom: geometry.margins.bottom,
    };

    let mut warn_overflow = |state_pages: usize, index: usize, required: f32| {
        log::warn!(
            "block {index} needs {required:.1}pt but a full page offers {full_budget:.1}pt \
             (page {}); placing it anyway",
            state_pages + 1
        );
        warnings.push(ContentOverflowWarning {
            block_index: index,
            required,
            available: full_budget,
        });
    };

    for (index, block) in content.blocks().iter().enumerate() {
        match block {
            Block::PageBreak => {
                // An explicit break always seals, even an empty page, so
                // back-to-back breaks keep their meaning.
                state.seal();
            }

            Block::Spacer { height } => {
                let gap = if state.at_page_top() {
                    0.0
                } else {
                    state.prev_space_after
                };
                if gap + height > state.remaining() + EPS {
                    if *height > full_budget + EPS {
                        if !state.at_page_top() {
                            state.seal();
                        }
                        warn_overflow(state.pages.len(), index, *height);
                    } else {
                        state.seal();
                    }
                } else {
                    state.cursor -= gap;
                }
                state.place(geometry.margins.left, *height, PlacedKind::Spacer);
                state.prev_space_after = 0.0;
            }

            Block::Image(image) => {
                let gap = if state.at_page_top() {
                    0.0
                } else {
                    state.prev_space_after
                };
                if gap + image.height > state.remaining() + EPS {
                    if image.height > full_budget + EPS {
                        if !state.at_page_top() {
                            state.seal();
                        }
                        warn_overflow(state.pages.len(), index, image.height);
                    } else {
                        state.seal();
                    }
                } else {
                    state.cursor -= gap;
                }
                state.place(
                    geometry.margins.left,
                    image.height,
                    PlacedKind::Image(image.clone()),
                );
                state.prev_space_after = 0.0;
            }

            Block::Paragraph { runs, style } => {
                let style = registry.resolve(style)?;
                let x = geometry.margins.left + style.indent_left;
                let width =
                    (geometry.content_width() - style.indent_left - style.indent_right).max(1.0);
                let text = measurer.measure(runs, &style, width);
                let height = text.height();

                let gap = if state.at_page_top() {
                    0.0
                } else {
                    f32::max(state.prev_space_after, style.space_before)
                };
                if gap + height > state.remaining() + EPS {
                    if height > full_budget + EPS {
                        if !state.at_page_top() {
                            state.seal();
                        }
                        warn_overflow(state.pages.len(), index, height);
                    } else {
                        state.seal();
                    }
                } else {
                    state.cursor -= gap;
                }
                log::debug!(
                    "paragraph {index}: {} lines, {height:.1}pt at y={:.1}",
                    text.lines.len(),
                    state.cursor
                );
                let space_after = style.space_after;
                state.place(
                    x,
                    height,
                    PlacedKind::Paragraph { text, style, width },
                );
                state.prev_space_after = space_after;
            }

            Block::Table { spec, style } => {
                let style = registry.resolve(style)?;
                let layout =
                    TableLayout::compute(spec, &style, geometry.content_width(), measurer)?;
                let total = layout.total_height();
                let x = geometry.margins.left;

                let gap = if state.at_page_top() {
                    0.0
                } else {
                    f32::max(state.prev_space_after, style.space_before)
                };

                if gap + total <= state.remaining() + EPS {
                    // Fits where we are.
                    state.cursor -= gap;
                    let height = total;
                    state.place(
                        x,
                        height,
                        PlacedKind::TableSlice {
                            header: layout.header.clone(),
                            rows: layout.body.clone(),
                            grid: layout.grid,
                            width: layout.width,
                        },
                    );
                } else if total <= full_budget + EPS {
                    // Fits a fresh page whole; never split a table that a
                    // full page can hold.
                    state.seal();
                    state.place(
                        x,
                        total,
                        PlacedKind::TableSlice {
                            header: layout.header.clone(),
                            rows: layout.body.clone(),
                            grid: layout.grid,
                            width: layout.width,
                        },
                    );
                } else {
                    // Taller than any page: split at row boundaries, header
                    // repeated on every continuation slice.
                    if !state.at_page_top() {
                        state.seal();
                    }
                    let slices = layout.plan_slices(full_budget);
                    log::debug!(
                        "table {index}: {total:.1}pt split into {} slices",
                        slices.len()
                    );
                    let mut overflowed = false;
                    for (si, &(start, end)) in slices.iter().enumerate() {
                        if si > 0 {
                            state.seal();
                        }
                        let height = layout.slice_height(start, end);
                        if height > full_budget + EPS && !overflowed {
                            overflowed = true;
                            warn_overflow(state.pages.len(), index, height);
                        }
                        state.place(
                            x,
                            height,
                            PlacedKind::TableSlice {
                                header: layout.header.clone(),
                                rows: layout.body[start..end].to_vec(),
                                grid: layout.grid,
                                width: layout.width,
                            },
                        );
                    }
                }
                state.prev_space_after = style.space_after;
            }
        }
    }

    // Seal whatever is left, even a partially filled or empty page, so a
    // trailing explicit break keeps its blank page.
    state.pages.push(state.current);

    log::debug!("pagination complete: {} pages", state.pages.len());
    Ok(Document {
        geometry: *geometry,
        pages: state.pages,
        warnings,
    })
}
