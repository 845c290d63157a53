
use lopdf::content::Operation;
use lopdf::{Document, Object};
use pdf_stamp::error::StampError;
use pdf_stamp::matcher::find_run;
use pdf_stamp::overlay::TextExtractor;
use pdf_stamp::parse::{page_content, text_fragments, LopdfExtractor, PageContent, TextFragment};
use pretty_assertions::assert_eq;

use crate::setup::{create_test_pdf, create_test_pdf_with_config, text_object, PdfConfig};

fn assert_anchor(fragment: &TextFragment, x: f32, y: f32) {
    let (ax, ay) = fragment.anchor();
    assert!(
        (ax - x).abs() < 0.01 && (ay - y).abs() < 0.01,
        "{} expected at ({}, {})",
        fragment,
        x,
        y
    );
}

#[test]
fn test_get_page_text() {
    let doc = Document::load_mem(&create_test_pdf()).unwrap();
    let fragments = text_fragments(page_content(&doc, 1).unwrap());

    let texts: Vec<&str> = fragments.iter().map(|f| f.text.as_str()).collect();
    assert_eq!(texts, vec!["Name:", "Da", "te:", "Total Due"]);

    for fragment in &fragments {
        assert_eq!(fragment.page_number, 1);
        assert_eq!(fragment.font_name.as_deref(), Some("Courier"));
    }
    assert_eq!(fragments[0].font_size, 12.0);
    assert_eq!(fragments[3].font_size, 10.0);
}

#[test]
fn test_fragment_anchors() {
    let doc = Document::load_mem(&create_test_pdf()).unwrap();
    let fragments = text_fragments(page_content(&doc, 1).unwrap());

    assert_anchor(&fragments[0], 100.0, 700.0);
    assert_anchor(&fragments[1], 100.0, 680.0);
    // Courier glyphs are 600 units wide: "Da" at 12pt advances 14.4
    assert_anchor(&fragments[2], 114.4, 680.0);
    assert_anchor(&fragments[3], 300.0, 500.0);
}

#[test]
fn test_marked_content_is_kept_in_order_and_filtered_for_matching() {
    let doc = Document::load_mem(&create_test_pdf()).unwrap();
    let contents = page_content(&doc, 1).unwrap();

    assert_eq!(contents.len(), 6);
    assert_eq!(
        contents[3],
        PageContent::BeginMarkedContent {
            tag: "Span".to_string()
        }
    );
    assert_eq!(contents[5], PageContent::EndMarkedContent);
    assert!(contents[3].as_text().is_none());
    assert_eq!(contents[4].as_text().map(|f| f.text.as_str()), Some("Total Due"));
}

#[test]
fn test_kerning_gaps_read_as_word_spaces() {
    let operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), 10.into()]),
        Operation::new("Td", vec![50.into(), 400.into()]),
        Operation::new(
            "TJ",
            vec![Object::Array(vec![
                Object::string_literal("Total"),
                Object::Integer(-1000),
                Object::string_literal("Due"),
                Object::Integer(-120),
                Object::string_literal(":"),
            ])],
        ),
        Operation::new("ET", vec![]),
    ];
    let bytes = create_test_pdf_with_config(PdfConfig {
        operations,
        ..PdfConfig::default()
    });
    let doc = Document::load_mem(&bytes).unwrap();
    let fragments = text_fragments(page_content(&doc, 1).unwrap());

    // -120 is tighter than a word gap and stays joined
    assert_eq!(fragments.len(), 1);
    assert_eq!(fragments[0].text, "Total Due:");
    assert!(find_run("Total Due", &fragments).is_found());
}

#[test]
fn test_gap_between_show_operators_on_one_line() {
    let mut operations = text_object(12.0, 100.0, 700.0, &["Name:"]);
    operations.extend(text_object(12.0, 200.0, 700.0, &["Jane"]));
    operations.extend(text_object(12.0, 100.0, 680.0, &["Da", "te:"]));

    let bytes = create_test_pdf_with_config(PdfConfig {
        operations,
        ..PdfConfig::default()
    });
    let doc = Document::load_mem(&bytes).unwrap();
    let fragments = text_fragments(page_content(&doc, 1).unwrap());

    let texts: Vec<&str> = fragments.iter().map(|f| f.text.as_str()).collect();
    assert_eq!(texts, vec!["Name: ", "Jane", "Da", "te:"]);
    assert_anchor(&fragments[1], 200.0, 700.0);

    let run = find_run("Name: Jane", &fragments);
    assert_eq!(run.last().map(|f| f.text.as_str()), Some("Jane"));
    assert!(find_run("Name:", &fragments).is_found());
}

#[test]
fn test_cm_and_next_line_operators() {
    let mut operations = vec![
        Operation::new("q", vec![]),
        Operation::new("cm", vec![1.into(), 0.into(), 0.into(), 1.into(), 50.into(), 20.into()]),
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), 12.into()]),
        Operation::new("TL", vec![14.into()]),
        Operation::new("Td", vec![10.into(), 100.into()]),
        Operation::new("Tj", vec![Object::string_literal("first")]),
        Operation::new("'", vec![Object::string_literal("second")]),
        Operation::new("ET", vec![]),
        Operation::new("Q", vec![]),
    ];
    operations.extend(text_object(12.0, 10.0, 100.0, &["after restore"]));

    let bytes = create_test_pdf_with_config(PdfConfig {
        operations,
        ..PdfConfig::default()
    });
    let doc = Document::load_mem(&bytes).unwrap();
    let fragments = text_fragments(page_content(&doc, 1).unwrap());

    assert_eq!(fragments.len(), 3);
    assert_anchor(&fragments[0], 60.0, 120.0);
    assert_anchor(&fragments[1], 60.0, 106.0);
    assert_anchor(&fragments[2], 10.0, 100.0);
}

#[test]
fn test_extractor_reads_requested_page() {
    let bytes = create_test_pdf_with_config(PdfConfig {
        page_count: 2,
        ..PdfConfig::default()
    });
    let extractor = LopdfExtractor::load_mem(&bytes).unwrap();

    let fragments = extractor.page_fragments(2).unwrap();
    assert_eq!(fragments[0].text, "Name:");
    assert_eq!(fragments[0].page_number, 2);
}

#[test]
fn test_missing_page_is_an_error() {
    let extractor = LopdfExtractor::load_mem(&create_test_pdf()).unwrap();

    let err = extractor.page_fragments(3).unwrap_err();
    assert!(matches!(
        err,
        StampError::PageNotFound {
            page: 3,
            page_count: 1
        }
    ));
}

#[test]
fn test_corrupt_pdf_fails_to_load() {
    let result = LopdfExtractor::load_mem(b"not a pdf");
    assert!(matches!(result, Err(StampError::Pdf(_))));
}

#[test]
fn test_text_fragment_display() {
    let fragment = TextFragment {
        text: "Sample text".to_string(),
        transform: [12.0, 0.0, 0.0, 12.0, 100.0, 200.0],
        font_name: Some("Courier".to_string()),
        font_size: 12.0,
        page_number: 1,
    };

    assert_eq!(
        fragment.to_string(),
        "\"Sample text\" at (100.00, 200.00) 12pt Courier"
    );
}
