/*!
 * Tests for content segmentation through the public API
 */

use doc_mt::translation::markup::NonTranslatableRules;
use doc_mt::translation::{ContentSegmenter, FragmentKind, MediaType};

fn brand_segmenter() -> ContentSegmenter {
    let rules = NonTranslatableRules {
        classes: vec!["brand".to_string()],
        ..NonTranslatableRules::default()
    };
    ContentSegmenter::new(rules, "KEEP")
}

#[test]
fn test_segment_withConfiguredClass_shouldMaskWithConfiguredPrefix() {
    let html = r#"<p>Buy <span class="brand">Acme Rockets</span> today.</p>"#;

    let segmented = brand_segmenter().segment(3, html, MediaType::Html, 1000).unwrap();

    assert_eq!(segmented.placeholders.len(), 1);
    assert_eq!(segmented.placeholders[0].id, "KEEP-3-0");
    let sent: Vec<&str> = segmented.sendable().map(|f| f.text.as_str()).collect();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].contains("KEEP-3-0"));
    assert!(!sent[0].contains("Acme Rockets"));

    let echoed: Vec<String> = sent.iter().map(|s| s.to_string()).collect();
    let output = segmented.reassemble(&echoed).unwrap();
    assert!(output.contains(r#"<span class="brand">Acme Rockets</span>"#));
}

#[test]
fn test_segment_withDefaultRules_shouldNotMaskConfiguredClassOnly() {
    let html = r#"<p>Buy <span class="brand">Acme</span> today.</p>"#;

    let segmented = ContentSegmenter::default()
        .segment(0, html, MediaType::Html, 1000)
        .unwrap();

    assert!(segmented.placeholders.is_empty());
    assert_eq!(segmented.sendable().next().map(|f| f.text.as_str()), Some(html));
}

#[test]
fn test_segment_withPlainText_shouldNeverMask() {
    let text = "Use <code>x</code> here.";

    let segmented = brand_segmenter().segment(0, text, MediaType::Plain, 1000).unwrap();

    assert!(segmented.placeholders.is_empty());
    let fragments: Vec<_> = segmented.sendable().collect();
    assert_eq!(fragments.len(), 1);
    assert_eq!(fragments[0].kind, FragmentKind::Plain);
    assert_eq!(fragments[0].text, text);
}

#[test]
fn test_segment_fragmentsWithinLimit_shouldNeverExceedIt() {
    let text = "One short sentence. Another short one! A third? And a last sentence here.";

    let segmented = ContentSegmenter::default()
        .segment(0, text, MediaType::Plain, 30)
        .unwrap();

    assert!(segmented.warnings.is_empty());
    for fragment in segmented.sendable() {
        assert!(fragment.text.chars().count() <= 30, "{:?} too long", fragment.text);
    }
    let joined: String = segmented.sendable().map(|f| f.text.as_str()).collect();
    assert_eq!(joined, text);
}
