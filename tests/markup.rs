use folio_pdf::{
    CellRange, ContentModel, DocumentConfig, Error, RegionStyle, Run, StyleAttrs, StyleRegistry,
    TableSpec, parse_markup,
};

#[test]
fn plain_text_is_one_run() {
    let runs = parse_markup("hello world");
    assert_eq!(runs, vec![Run::text("hello world", false, false)]);
}

#[test]
fn bold_and_italic_markers_split_runs() {
    let runs = parse_markup("a <b>b</b> <i>c</i>");
    assert_eq!(
        runs,
        vec![
            Run::text("a ", false, false),
            Run::text("b", true, false),
            Run::text(" ", false, false),
            Run::text("c", false, true),
        ]
    );
}

#[test]
fn nested_emphasis_combines() {
    let runs = parse_markup("<b>x<i>y</i></b>");
    assert_eq!(
        runs,
        vec![Run::text("x", true, false), Run::text("y", true, true)]
    );
}

#[test]
fn line_break_markers_become_break_runs() {
    let runs = parse_markup("one<br/>two<br>three");
    assert_eq!(
        runs,
        vec![
            Run::text("one", false, false),
            Run::line_break(),
            Run::text("two", false, false),
            Run::line_break(),
            Run::text("three", false, false),
        ]
    );
}

#[test]
fn unrecognized_tags_are_literal_text() {
    let runs = parse_markup("1 <x> 2");
    assert_eq!(runs, vec![Run::text("1 <x> 2", false, false)]);
}

#[test]
fn stray_close_tags_never_underflow() {
    let runs = parse_markup("</b>plain");
    assert_eq!(runs, vec![Run::text("plain", false, false)]);
}

fn registry_with_body() -> StyleRegistry {
    let mut registry = StyleRegistry::new(&DocumentConfig::default());
    registry
        .define("Body", StyleAttrs::default(), None)
        .unwrap();
    registry
}

#[test]
fn add_with_unknown_style_fails() {
    let registry = registry_with_body();
    let mut model = ContentModel::new(&registry);
    let err = model.add_paragraph("x", "Missing").unwrap_err();
    assert!(matches!(err, Error::UnknownStyle(name) if name == "Missing"));
}

#[test]
fn mutation_after_freeze_fails() {
    let registry = registry_with_body();
    let mut model = ContentModel::new(&registry);
    model.add_paragraph("x", "Body").unwrap();
    let frozen = model.freeze();
    assert_eq!(frozen.len(), 1);

    let err = model.add_paragraph("y", "Body").unwrap_err();
    assert!(matches!(err, Error::FrozenModel));
    let err = model.add_spacer(10.0).unwrap_err();
    assert!(matches!(err, Error::FrozenModel));
    let err = model.add_page_break().unwrap_err();
    assert!(matches!(err, Error::FrozenModel));
}

#[test]
fn ragged_table_is_rejected() {
    let registry = registry_with_body();
    let mut model = ContentModel::new(&registry);
    let spec = TableSpec::new(vec![
        vec!["a".into(), "b".into()],
        vec!["only-one".into()],
    ]);
    let err = model.add_table(spec, "Body").unwrap_err();
    assert!(matches!(
        err,
        Error::RaggedTable {
            row: 1,
            found: 1,
            expected: 2
        }
    ));
}

#[test]
fn out_of_bounds_region_is_rejected() {
    let registry = registry_with_body();
    let mut model = ContentModel::new(&registry);
    let spec = TableSpec::new(vec![vec!["a".into(), "b".into()]])
        .with_region(CellRange::new((0, 0), (2, 2)), RegionStyle::default());
    let err = model.add_table(spec, "Body").unwrap_err();
    assert!(matches!(err, Error::InvalidRegion { ncols: 2, .. }));
}

#[test]
fn open_ended_regions_are_accepted() {
    let registry = registry_with_body();
    let mut model = ContentModel::new(&registry);
    let spec = TableSpec::new(vec![
        vec!["h1".into(), "h2".into()],
        vec!["a".into(), "b".into()],
    ])
    .with_region(CellRange::row(0), RegionStyle::default())
    .with_region(CellRange::col(1), RegionStyle::default());
    model.add_table(spec, "Body").unwrap();
}

#[test]
fn invalid_image_data_is_rejected() {
    let registry = registry_with_body();
    let mut model = ContentModel::new(&registry);
    let err = model
        .add_image(b"not an image".to_vec(), 100.0, 50.0)
        .unwrap_err();
    assert!(matches!(err, Error::InvalidImage(_)));
}
