use crate::error::Error;
use crate::model::{Block, ImageBlock, ImageFormat, Run, TableSpec};
use crate::style::StyleRegistry;

/// Ordered, append-only builder for the document body. Every `add_*` call
/// validates its style name against the registry so bad references surface
/// at build time, not at layout time.
pub struct ContentModel<'a> {
    registry: &'a StyleRegistry,
    blocks: Vec<Block>,
    frozen: bool,
}

/// The immutable block sequence consumed by the paginator.
#[derive(Clone, Debug)]
pub struct ContentSequence {
    blocks: Vec<Block>,
}

impl ContentSequence {
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

impl<'a> ContentModel<'a> {
    pub fn new(registry: &'a StyleRegistry) -> Self {
        Self {
            registry,
            blocks: Vec::new(),
            frozen: false,
        }
    }

    fn check_open(&self) -> Result<(), Error> {
        if self.frozen {
            return Err(Error::FrozenModel);
        }
        Ok(())
    }

    fn check_style(&self, name: &str) -> Result<(), Error> {
        if !self.registry.contains(name) {
            return Err(Error::UnknownStyle(name.to_string()));
        }
        Ok(())
    }

    /// Appends a paragraph. Inline markup (`<b>`, `<i>`, `<br/>`) is parsed
    /// into the run list here, once; downstream stages see only runs.
    pub fn add_paragraph(&mut self, text: &str, style: &str) -> Result<&mut Self, Error> {
        self.check_open()?;
        self.check_style(style)?;
        self.blocks.push(Block::Paragraph {
            runs: parse_markup(text),
            style: style.to_string(),
        });
        Ok(self)
    }

    pub fn add_table(&mut self, spec: TableSpec, style: &str) -> Result<&mut Self, Error> {
        self.check_open()?;
        self.check_style(style)?;
        validate_table(&spec)?;
        self.blocks.push(Block::Table {
            spec,
            style: style.to_string(),
        });
        Ok(self)
    }

    pub fn add_spacer(&mut self, height: f32) -> Result<&mut Self, Error> {
        self.check_open()?;
        self.blocks.push(Block::Spacer { height });
        Ok(self)
    }

    pub fn add_page_break(&mut self) -> Result<&mut Self, Error> {
        self.check_open()?;
        self.blocks.push(Block::PageBreak);
        Ok(self)
    }

    /// Appends an image scaled to `width` x `height` points. The format is
    /// sniffed from the data and the pixel dimensions are probed up front so
    /// a corrupt image fails here rather than mid-render.
    pub fn add_image(&mut self, data: Vec<u8>, width: f32, height: f32) -> Result<&mut Self, Error> {
        self.check_open()?;
        let format = sniff_image_format(&data)
            .ok_or_else(|| Error::InvalidImage("unrecognized format (expected PNG or JPEG)".into()))?;
        let (pixel_width, pixel_height) = probe_dimensions(&data)?;
        self.blocks.push(Block::Image(ImageBlock {
            data,
            format,
            pixel_width,
            pixel_height,
            width,
            height,
        }));
        Ok(self)
    }

    /// Seals the model and hands out the block sequence. Any later `add_*`
    /// call fails with [`Error::FrozenModel`].
    pub fn freeze(&mut self) -> ContentSequence {
        self.frozen = true;
        log::debug!("content model frozen with {} blocks", self.blocks.len());
        ContentSequence {
            blocks: std::mem::take(&mut self.blocks),
        }
    }
}

fn validate_table(spec: &TableSpec) -> Result<(), Error> {
    let ncols = spec.ncols();
    for (i, row) in spec.rows.iter().enumerate() {
        if row.len() != ncols {
            return Err(Error::RaggedTable {
                row: i,
                found: row.len(),
                expected: ncols,
            });
        }
    }
    let nrows = spec.nrows();
    for (range, _) in &spec.regions {
        let row_ok = range.rows.0 <= range.rows.1 && range.rows.0 < nrows;
        let col_ok = range.cols.0 <= range.cols.1 && range.cols.0 < ncols;
        // Open-ended ranges (usize::MAX) are clamped during layout.
        let row_end_ok = range.rows.1 == usize::MAX || range.rows.1 < nrows;
        let col_end_ok = range.cols.1 == usize::MAX || range.cols.1 < ncols;
        if !(row_ok && col_ok && row_end_ok && col_end_ok) {
            return Err(Error::InvalidRegion {
                rows: range.rows,
                cols: range.cols,
                nrows,
                ncols,
            });
        }
    }
    Ok(())
}

fn sniff_image_format(data: &[u8]) -> Option<ImageFormat> {
    if data.starts_with(&[0x89, b'P', b'N', b'G']) {
        Some(ImageFormat::Png)
    } else if data.starts_with(&[0xFF, 0xD8]) {
        Some(ImageFormat::Jpeg)
    } else {
        None
    }
}

fn probe_dimensions(data: &[u8]) -> Result<(u32, u32), Error> {
    let cursor = std::io::Cursor::new(data);
    image::ImageReader::new(std::io::BufReader::new(cursor))
        .with_guessed_format()
        .map_err(|e| Error::InvalidImage(e.to_string()))?
        .into_dimensions()
        .map_err(|e| Error::InvalidImage(e.to_string()))
}

/// Parses the inline markup subset into a flat run list. Recognized markers
/// are `<b>`/`</b>`, `<i>`/`</i>` and `<br/>` (or `<br>`); any other angle
/// bracket is literal text. Nesting is tracked by depth, so stray close tags
/// never underflow.
pub fn parse_markup(text: &str) -> Vec<Run> {
    let mut runs: Vec<Run> = Vec::new();
    let mut buf = String::new();
    let mut bold = 0usize;
    let mut italic = 0usize;

    let flush = |buf: &mut String, runs: &mut Vec<Run>, bold: usize, italic: usize| {
        if !buf.is_empty() {
            runs.push(Run::text(std::mem::take(buf), bold > 0, italic > 0));
        }
    };

    let mut rest = text;
    while let Some(pos) = rest.find('<') {
        buf.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        if let Some(after) = tail.strip_prefix("<b>") {
            flush(&mut buf, &mut runs, bold, italic);
            bold += 1;
            rest = after;
        } else if let Some(after) = tail.strip_prefix("</b>") {
            flush(&mut buf, &mut runs, bold, italic);
            bold = bold.saturating_sub(1);
            rest = after;
        } else if let Some(after) = tail.strip_prefix("<i>") {
            flush(&mut buf, &mut runs, bold, italic);
            italic += 1;
            rest = after;
        } else if let Some(after) = tail.strip_prefix("</i>") {
            flush(&mut buf, &mut runs, bold, italic);
            italic = italic.saturating_sub(1);
            rest = after;
        } else if let Some(after) = tail.strip_prefix("<br/>").or_else(|| tail.strip_prefix("<br>")) {
            flush(&mut buf, &mut runs, bold, italic);
            runs.push(Run::line_break());
            rest = after;
        } else {
            buf.push('<');
            rest = &tail[1..];
        }
    }
    buf.push_str(rest);
    flush(&mut buf, &mut runs, bold, italic);
    runs
}
