mod common;

use common::{FixedMeasurer, geometry};
use folio_pdf::{
    ContentModel, ContentSequence, Document, PlacedKind, StyleAttrs, StyleRegistry, TableSpec,
    paginate,
};

const LH: f32 = 4.0;

fn measurer() -> FixedMeasurer {
    FixedMeasurer::new(LH)
}

fn body_registry() -> StyleRegistry {
    let mut registry = common::registry();
    registry
        .define("Body", StyleAttrs::default(), None)
        .unwrap();
    registry
}

fn spacers(registry: &StyleRegistry, heights: &[f32]) -> ContentSequence {
    let mut model = ContentModel::new(registry);
    for &h in heights {
        model.add_spacer(h).unwrap();
    }
    model.freeze()
}

fn placements(doc: &Document) -> Vec<Vec<(f32, f32, f32)>> {
    doc.pages
        .iter()
        .map(|p| p.placed.iter().map(|b| (b.x, b.y_top, b.height)).collect())
        .collect()
}

#[test]
fn spacers_fill_the_page_exactly_then_overflow() {
    let registry = body_registry();
    let geo = geometry(200.0, 100.0);

    let five = spacers(&registry, &[20.0; 5]);
    let doc = paginate(&five, &registry, &geo, &measurer()).unwrap();
    assert_eq!(doc.pages.len(), 1);
    assert_eq!(doc.pages[0].placed.len(), 5);
    assert_eq!(doc.pages[0].placed[4].y_top, 20.0);

    let six = spacers(&registry, &[20.0; 6]);
    let doc = paginate(&six, &registry, &geo, &measurer()).unwrap();
    assert_eq!(doc.pages.len(), 2);
    assert_eq!(doc.pages[1].placed.len(), 1);
    assert_eq!(doc.pages[1].placed[0].y_top, 100.0);
}

#[test]
fn empty_model_yields_a_single_empty_page() {
    let registry = body_registry();
    let mut model = ContentModel::new(&registry);
    let blocks = model.freeze();
    let doc = paginate(&blocks, &registry, &geometry(200.0, 100.0), &measurer()).unwrap();
    assert_eq!(doc.pages.len(), 1);
    assert!(doc.pages[0].is_empty());
}

#[test]
fn explicit_breaks_seal_even_empty_pages() {
    let registry = body_registry();
    let mut model = ContentModel::new(&registry);
    model.add_page_break().unwrap();
    model.add_page_break().unwrap();
    let blocks = model.freeze();

    let doc = paginate(&blocks, &registry, &geometry(200.0, 100.0), &measurer()).unwrap();
    assert_eq!(doc.pages.len(), 3);
    assert!(doc.pages.iter().all(|p| p.is_empty()));
}

#[test]
fn break_starts_content_at_the_top_of_a_fresh_page() {
    let registry = body_registry();
    let mut model = ContentModel::new(&registry);
    model.add_paragraph("one", "Body").unwrap();
    model.add_page_break().unwrap();
    model.add_paragraph("two", "Body").unwrap();
    let blocks = model.freeze();

    let doc = paginate(&blocks, &registry, &geometry(200.0, 100.0), &measurer()).unwrap();
    assert_eq!(doc.pages.len(), 2);
    assert_eq!(doc.pages[1].placed[0].y_top, 100.0);
}

#[test]
fn vertical_gaps_collapse_and_vanish_at_page_top() {
    let mut registry = common::registry();
    registry
        .define(
            "After10",
            StyleAttrs {
                space_before: Some(50.0), // suppressed on the first page
                space_after: Some(10.0),
                ..Default::default()
            },
            None,
        )
        .unwrap();
    registry
        .define(
            "Before6",
            StyleAttrs {
                space_before: Some(6.0),
                ..Default::default()
            },
            None,
        )
        .unwrap();

    let mut model = ContentModel::new(&registry);
    model.add_paragraph("first", "After10").unwrap();
    model.add_paragraph("second", "Before6").unwrap();
    let blocks = model.freeze();

    let doc = paginate(&blocks, &registry, &geometry(200.0, 100.0), &measurer()).unwrap();
    let placed = &doc.pages[0].placed;
    // First paragraph sits at the very top despite its space_before.
    assert_eq!(placed[0].y_top, 100.0);
    // Gap below it is max(10, 6) = 10, not 16.
    assert_eq!(placed[1].y_top, 100.0 - LH - 10.0);
}

#[test]
fn oversize_block_is_placed_and_warned_exactly_once() {
    let registry = body_registry();
    let geo = geometry(200.0, 100.0);

    let blocks = spacers(&registry, &[20.0, 500.0]);
    let doc = paginate(&blocks, &registry, &geo, &measurer()).unwrap();
    assert_eq!(doc.pages.len(), 2);
    assert_eq!(doc.pages[1].placed[0].height, 500.0);
    assert_eq!(doc.warnings.len(), 1);
    assert_eq!(doc.warnings[0].block_index, 1);
    assert_eq!(doc.warnings[0].required, 500.0);

    // Already at the top of an empty page: no extra blank page appears.
    let blocks = spacers(&registry, &[500.0]);
    let doc = paginate(&blocks, &registry, &geo, &measurer()).unwrap();
    assert_eq!(doc.pages.len(), 1);
    assert_eq!(doc.warnings.len(), 1);
}

fn tall_table(data_rows: usize) -> TableSpec {
    let mut rows = vec![vec!["h1".into(), "h2".into(), "h3".into()]];
    for i in 0..data_rows {
        rows.push(vec![format!("r{i}a"), format!("r{i}b"), format!("r{i}c")]);
    }
    TableSpec::new(rows).with_header_rows(1)
}

#[test]
fn table_that_fits_a_full_page_moves_whole() {
    let registry = body_registry();
    let geo = geometry(300.0, 100.0);

    let mut model = ContentModel::new(&registry);
    model.add_spacer(60.0).unwrap();
    // Header plus five data rows at 10pt each: 60pt total, too tall for the
    // 40pt that remains but well within a fresh page.
    model.add_table(tall_table(5), "Body").unwrap();
    let blocks = model.freeze();

    let doc = paginate(&blocks, &registry, &geo, &measurer()).unwrap();
    assert_eq!(doc.pages.len(), 2);
    assert!(doc.warnings.is_empty());
    let placed = &doc.pages[1].placed[0];
    assert_eq!(placed.y_top, 100.0);
    match &placed.kind {
        PlacedKind::TableSlice { header, rows, .. } => {
            assert_eq!(header.len(), 1);
            assert_eq!(rows.len(), 5);
        }
        other => panic!("expected a table slice, got {other:?}"),
    }
}

#[test]
fn oversize_table_splits_at_rows_with_repeated_header() {
    let registry = body_registry();
    let geo = geometry(300.0, 120.0);

    let mut model = ContentModel::new(&registry);
    model.add_table(tall_table(49), "Body").unwrap();
    model.add_spacer(20.0).unwrap();
    let blocks = model.freeze();

    let doc = paginate(&blocks, &registry, &geo, &measurer()).unwrap();
    assert_eq!(doc.pages.len(), 5);
    assert!(doc.warnings.is_empty());

    let expected_rows = [11, 11, 11, 11, 5];
    for (page, &expected) in doc.pages.iter().zip(expected_rows.iter()) {
        match &page.placed[0].kind {
            PlacedKind::TableSlice { header, rows, .. } => {
                assert_eq!(header.len(), 1, "header repeats on every slice");
                assert_eq!(rows.len(), expected);
            }
            other => panic!("expected a table slice, got {other:?}"),
        }
    }

    // The trailing spacer flows below the final slice on the last page.
    assert_eq!(doc.pages[4].placed.len(), 2);
    assert_eq!(doc.pages[4].placed[1].y_top, 120.0 - 60.0);
}

#[test]
fn pagination_is_deterministic() {
    let registry = body_registry();
    let geo = geometry(300.0, 120.0);

    let mut model = ContentModel::new(&registry);
    model.add_paragraph("alpha beta", "Body").unwrap();
    model.add_table(tall_table(20), "Body").unwrap();
    model.add_page_break().unwrap();
    model.add_spacer(30.0).unwrap();
    model.add_paragraph("gamma", "Body").unwrap();
    let blocks = model.freeze();

    let a = paginate(&blocks, &registry, &geo, &measurer()).unwrap();
    let b = paginate(&blocks, &registry, &geo, &measurer()).unwrap();
    assert_eq!(a.pages.len(), b.pages.len());
    assert_eq!(placements(&a), placements(&b));
    assert_eq!(a.warnings, b.warnings);
}

#[test]
fn blocks_keep_model_order_on_their_pages() {
    let registry = body_registry();
    let geo = geometry(300.0, 100.0);

    let mut model = ContentModel::new(&registry);
    model.add_paragraph("a", "Body").unwrap();
    model.add_spacer(10.0).unwrap();
    model.add_paragraph("b", "Body").unwrap();
    let blocks = model.freeze();

    let doc = paginate(&blocks, &registry, &geo, &measurer()).unwrap();
    let page = &doc.pages[0];
    assert_eq!(page.placed.len(), 3);
    let mut last_top = f32::INFINITY;
    for placed in &page.placed {
        assert!(placed.y_top <= last_top);
        last_top = placed.y_top;
    }
    assert!(matches!(page.placed[0].kind, PlacedKind::Paragraph { .. }));
    assert!(matches!(page.placed[1].kind, PlacedKind::Spacer));
    assert!(matches!(page.placed[2].kind, PlacedKind::Paragraph { .. }));
}
