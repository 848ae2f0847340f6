mod draw;

use std::collections::{HashMap, HashSet};

use pdf_writer::{Content, Filter, Name, Pdf, Rect, Ref};
use ttf_parser::Face;

use crate::error::Error;
use crate::flow::{Document, PlacedKind};
use crate::fonts::{FontCatalog, FontKey, FontSource};
use crate::model::{ImageBlock, ImageFormat};

use draw::{DrawCtx, RegisteredFont};

struct RefAllocator {
    next: i32,
}

impl RefAllocator {
    fn new() -> Self {
        Self { next: 1 }
    }

    fn next_ref(&mut self) -> Ref {
        let r = Ref::new(self.next);
        self.next += 1;
        r
    }
}

/// Renders the paginated document into a complete PDF byte buffer. Nothing
/// touches the filesystem here; writing the buffer out (atomically) is the
/// caller's job.
pub fn render(doc: &Document, catalog: &FontCatalog) -> Result<Vec<u8>, Error> {
    let t0 = std::time::Instant::now();
    let mut pdf = Pdf::new();
    let mut alloc = RefAllocator::new();

    let catalog_id = alloc.next_ref();
    let pages_id = alloc.next_ref();

    // Phase 1: register every font variant the placed content uses.
    let mut fonts: HashMap<FontKey, RegisteredFont> = HashMap::new();
    let mut font_order: Vec<FontKey> = Vec::new();
    for key in collect_font_keys(doc, catalog) {
        let pdf_name = format!("F{}", font_order.len() + 1);
        let font = register_font(&mut pdf, &mut alloc, catalog, &key, pdf_name)?;
        fonts.insert(key.clone(), font);
        font_order.push(key);
    }
    let t_fonts = t0.elapsed();

    // Phase 2: embed image XObjects, one per placed image block.
    let mut image_xobjects: Vec<(String, Ref)> = Vec::new();
    let mut image_names: HashMap<(usize, usize), String> = HashMap::new();
    for (page_idx, page) in doc.pages.iter().enumerate() {
        for (placed_idx, placed) in page.placed.iter().enumerate() {
            if let PlacedKind::Image(img) = &placed.kind {
                let name = embed_image(&mut pdf, &mut alloc, img, &mut image_xobjects)?;
                image_names.insert((page_idx, placed_idx), name);
            }
        }
    }
    let t_images = t0.elapsed();

    // Phase 3: draw each sealed page into its content stream.
    let ctx = DrawCtx {
        catalog,
        fonts: &fonts,
        images: &image_names,
    };
    let n = doc.pages.len();
    let page_ids: Vec<Ref> = (0..n).map(|_| alloc.next_ref()).collect();
    let content_ids: Vec<Ref> = (0..n).map(|_| alloc.next_ref()).collect();
    for (page_idx, page) in doc.pages.iter().enumerate() {
        let mut content = Content::new();
        draw::draw_page(&mut content, page, page_idx, &ctx);
        let raw = content.finish();
        let compressed = miniz_oxide::deflate::compress_to_vec_zlib(raw.as_slice(), 6);
        pdf.stream(content_ids[page_idx], &compressed)
            .filter(Filter::FlateDecode);
    }
    let t_draw = t0.elapsed();

    // Phase 4: page tree and shared resources.
    pdf.catalog(catalog_id).pages(pages_id);
    pdf.pages(pages_id)
        .kids(page_ids.iter().copied())
        .count(n as i32);

    let media_box = Rect::new(0.0, 0.0, doc.geometry.page_width, doc.geometry.page_height);
    for i in 0..n {
        let mut page = pdf.page(page_ids[i]);
        page.media_box(media_box)
            .parent(pages_id)
            .contents(content_ids[i]);
        let mut resources = page.resources();
        {
            let mut fonts_dict = resources.fonts();
            for key in &font_order {
                let font = &fonts[key];
                fonts_dict.pair(Name(font.pdf_name.as_bytes()), font.font_ref);
            }
        }
        if !image_xobjects.is_empty() {
            let mut xobjects = resources.x_objects();
            for (name, xobj_ref) in &image_xobjects {
                xobjects.pair(Name(name.as_bytes()), *xobj_ref);
            }
        }
    }
    let t_assembly = t0.elapsed();

    log::info!(
        "Render phases: fonts={:.1}ms, images={:.1}ms, draw={:.1}ms, assembly={:.1}ms ({n} pages)",
        t_fonts.as_secs_f64() * 1000.0,
        (t_images - t_fonts).as_secs_f64() * 1000.0,
        (t_draw - t_images).as_secs_f64() * 1000.0,
        (t_assembly - t_draw).as_secs_f64() * 1000.0,
    );

    Ok(pdf.finish())
}

/// Unique font variants used by the placed content, in first-use order so
/// output is deterministic.
fn collect_font_keys(doc: &Document, catalog: &FontCatalog) -> Vec<FontKey> {
    let mut seen: HashSet<FontKey> = HashSet::new();
    let mut order: Vec<FontKey> = Vec::new();
    let mut add = |family: &str, bold: bool, italic: bool| {
        let (_, key) = catalog.lookup(family, bold, italic);
        if seen.insert(key.clone()) {
            order.push(key);
        }
    };

    for page in &doc.pages {
        for placed in &page.placed {
            match &placed.kind {
                PlacedKind::Paragraph { text, style, .. } => {
                    for line in &text.lines {
                        for span in &line.spans {
                            add(&style.font_family, span.bold, span.italic);
                        }
                    }
                }
                PlacedKind::TableSlice { header, rows, .. } => {
                    for row in header.iter().chain(rows.iter()) {
                        for cell in &row.cells {
                            for line in &cell.text.lines {
                                for span in &line.spans {
                                    add(&cell.style.font_family, span.bold, span.italic);
                                }
                            }
                        }
                    }
                }
                PlacedKind::Spacer | PlacedKind::Image(_) => {}
            }
        }
    }

    if order.is_empty() {
        add("helvetica", false, false);
    }
    order
}

fn register_font(
    pdf: &mut Pdf,
    alloc: &mut RefAllocator,
    catalog: &FontCatalog,
    key: &FontKey,
    pdf_name: String,
) -> Result<RegisteredFont, Error> {
    let font_ref = alloc.next_ref();
    match &catalog.metrics_for(key).source {
        FontSource::Builtin { base_name } => {
            pdf.type1_font(font_ref)
                .base_font(Name(base_name.as_bytes()))
                .encoding_predefined(Name(b"WinAnsiEncoding"));
        }
        FontSource::TrueType { data, char_to_gid } => {
            embed_truetype(pdf, alloc, font_ref, key, data, char_to_gid)?;
        }
    }
    Ok(RegisteredFont { pdf_name, font_ref })
}

fn postscript_name(key: &FontKey) -> String {
    let base: String = key.0.split_whitespace().collect();
    match (key.1, key.2) {
        (true, true) => format!("{base}-BoldItalic"),
        (true, false) => format!("{base}-Bold"),
        (false, true) => format!("{base}-Italic"),
        (false, false) => base,
    }
}

/// Embed a registered TrueType font whole as a CIDFont (Type0 composite)
/// with Identity-H encoding and a ToUnicode CMap.
fn embed_truetype(
    pdf: &mut Pdf,
    alloc: &mut RefAllocator,
    font_ref: Ref,
    key: &FontKey,
    data: &[u8],
    char_to_gid: &HashMap<char, u16>,
) -> Result<(), Error> {
    let face = Face::parse(data, 0).map_err(|_| Error::InvalidFont {
        family: key.0.clone(),
    })?;
    let units = face.units_per_em() as f32;
    let ascent = face.ascender() as f32 / units * 1000.0;
    let descent = face.descender() as f32 / units * 1000.0;
    let cap_height = face
        .capital_height()
        .map(|h| h as f32 / units * 1000.0)
        .unwrap_or(700.0);
    let bb = face.global_bounding_box();
    let bbox = Rect::new(
        bb.x_min as f32 / units * 1000.0,
        bb.y_min as f32 / units * 1000.0,
        bb.x_max as f32 / units * 1000.0,
        bb.y_max as f32 / units * 1000.0,
    );

    let descriptor_ref = alloc.next_ref();
    let data_ref = alloc.next_ref();
    let data_len = i32::try_from(data.len()).map_err(|_| Error::InvalidFont {
        family: key.0.clone(),
    })?;
    pdf.stream(data_ref, data).pair(Name(b"Length1"), data_len);

    let ps_name = postscript_name(key);

    pdf.font_descriptor(descriptor_ref)
        .name(Name(ps_name.as_bytes()))
        .flags(pdf_writer::types::FontFlags::NON_SYMBOLIC)
        .bbox(bbox)
        .italic_angle(0.0)
        .ascent(ascent)
        .descent(descent)
        .cap_height(cap_height)
        .stem_v(80.0)
        .font_file2(data_ref);

    let cid_font_ref = alloc.next_ref();
    let system_info = pdf_writer::types::SystemInfo {
        registry: pdf_writer::Str(b"Adobe"),
        ordering: pdf_writer::Str(b"Identity"),
        supplement: 0,
    };
    {
        let mut cid = pdf.cid_font(cid_font_ref);
        cid.subtype(pdf_writer::types::CidFontType::Type2);
        cid.base_font(Name(ps_name.as_bytes()));
        cid.system_info(system_info);
        cid.font_descriptor(descriptor_ref);
        cid.default_width(0.0);
        cid.cid_to_gid_map_predefined(Name(b"Identity"));

        let mut gid_widths: Vec<(u16, f32)> = char_to_gid
            .iter()
            .filter_map(|(_, &gid)| {
                face.glyph_hor_advance(ttf_parser::GlyphId(gid))
                    .map(|adv| (gid, adv as f32 / units * 1000.0))
            })
            .collect();
        gid_widths.sort_by_key(|&(gid, _)| gid);
        gid_widths.dedup_by_key(|&mut (gid, _)| gid);
        if !gid_widths.is_empty() {
            let mut w = cid.widths();
            for &(gid, width) in &gid_widths {
                w.consecutive(gid, [width]);
            }
        }
    }

    let tounicode_ref = alloc.next_ref();
    let cmap_name = format!("{ps_name}-UTF16");
    let mut cmap = pdf_writer::types::UnicodeCmap::new(
        Name(cmap_name.as_bytes()),
        pdf_writer::types::SystemInfo {
            registry: pdf_writer::Str(b"Adobe"),
            ordering: pdf_writer::Str(b"Identity"),
            supplement: 0,
        },
    );
    let mut pairs: Vec<(u16, char)> = char_to_gid.iter().map(|(&ch, &gid)| (gid, ch)).collect();
    pairs.sort_unstable();
    for (gid, ch) in pairs {
        cmap.pair(gid, ch);
    }
    let cmap_data = cmap.finish();
    pdf.stream(tounicode_ref, cmap_data.as_slice());

    pdf.type0_font(font_ref)
        .base_font(Name(ps_name.as_bytes()))
        .encoding_predefined(Name(b"Identity-H"))
        .descendant_font(cid_font_ref)
        .to_unicode(tounicode_ref);

    Ok(())
}

fn embed_image(
    pdf: &mut Pdf,
    alloc: &mut RefAllocator,
    img: &ImageBlock,
    image_xobjects: &mut Vec<(String, Ref)>,
) -> Result<String, Error> {
    let xobj_ref = alloc.next_ref();
    let pdf_name = format!("Im{}", image_xobjects.len() + 1);

    match img.format {
        ImageFormat::Jpeg => {
            let mut xobj = pdf.image_xobject(xobj_ref, &img.data);
            xobj.filter(Filter::DctDecode);
            xobj.width(img.pixel_width as i32);
            xobj.height(img.pixel_height as i32);
            xobj.color_space().device_rgb();
            xobj.bits_per_component(8);
        }
        ImageFormat::Png => {
            let cursor = std::io::Cursor::new(&img.data);
            let reader = image::ImageReader::with_format(
                std::io::BufReader::new(cursor),
                image::ImageFormat::Png,
            );
            let decoded = reader
                .decode()
                .map_err(|e| Error::InvalidImage(e.to_string()))?;
            let rgba: image::RgbaImage = decoded.to_rgba8();
            let (w, h) = (rgba.width(), rgba.height());
            let has_alpha = rgba.pixels().any(|p| p.0[3] < 255);

            let rgb_data: Vec<u8> = rgba
                .pixels()
                .flat_map(|p| [p.0[0], p.0[1], p.0[2]])
                .collect();
            let compressed_rgb = miniz_oxide::deflate::compress_to_vec_zlib(&rgb_data, 6);

            let smask_ref = if has_alpha {
                let alpha_data: Vec<u8> = rgba.pixels().map(|p| p.0[3]).collect();
                let compressed_alpha =
                    miniz_oxide::deflate::compress_to_vec_zlib(&alpha_data, 6);
                let mask_ref = alloc.next_ref();
                let mut mask = pdf.image_xobject(mask_ref, &compressed_alpha);
                mask.filter(Filter::FlateDecode);
                mask.width(w as i32);
                mask.height(h as i32);
                mask.color_space().device_gray();
                mask.bits_per_component(8);
                Some(mask_ref)
            } else {
                None
            };

            let mut xobj = pdf.image_xobject(xobj_ref, &compressed_rgb);
            xobj.filter(Filter::FlateDecode);
            xobj.width(w as i32);
            xobj.height(h as i32);
            xobj.color_space().device_rgb();
            xobj.bits_per_component(8);
            if let Some(mask_ref) = smask_ref {
                xobj.s_mask(mask_ref);
            }
        }
    }

    image_xobjects.push((pdf_name.clone(), xobj_ref));
    Ok(pdf_name)
}
