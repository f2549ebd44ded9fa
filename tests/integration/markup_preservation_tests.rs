/*!
 * Integration tests for non-translatable markup.
 *
 * Masked elements must never reach a backend and must come back exactly as
 * they were written, entities and attribute quoting included.
 */

use doc_mt::ContentUnit;
use doc_mt::providers::mock::MockBackend;

use crate::common::{self, page};

const HTML: &str = "<p>Run <code class='x'>a&nbsp;b &lt;T&gt;</code> now</p>";
const XML: &str = "<doc>Run <code lang='sh'>a &#38; b</code> now</doc>";

#[tokio::test]
async fn test_translate_shouldReturnMaskedMarkupUnchanged() {
    let backend = MockBackend::working();
    let service = common::service_with(vec![backend.clone()]);
    let request = page(vec![
        ContentUnit::new(HTML, "text/html"),
        ContentUnit::new(XML, "text/xml"),
    ]);

    let result = service.translate_document(request, "de", None).await.unwrap();

    assert_eq!(result.contents[0].value, format!("[de] {}", HTML));
    assert_eq!(result.contents[1].value, format!("[de] {}", XML));
    for source in backend.sent_sources() {
        assert!(!source.contains("<code"), "masked element sent: {}", source);
        assert!(source.contains(r#"translate="no""#));
    }
}

#[tokio::test]
async fn test_translate_fromStore_shouldReturnSameBytes() {
    let backend = MockBackend::working();
    let service = common::service_with(vec![backend.clone()]);
    let request = page(vec![ContentUnit::new(HTML, "text/html")]);

    let first = service.translate_document(request.clone(), "de", None).await.unwrap();
    let second = service.translate_document(request, "de", None).await.unwrap();

    assert_eq!(backend.request_count(), 1);
    assert_eq!(first.contents[0].value, second.contents[0].value);
    assert_eq!(second.contents[0].value, format!("[de] {}", HTML));
}

#[tokio::test]
async fn test_translate_withDecomposedHtml_shouldKeepMaskedSource() {
    let backend = MockBackend::working().with_char_limit(40);
    let service = common::service_with(vec![backend.clone()]);
    let code = "<code class='cmd'>echo &quot;hi&quot; &amp;&amp; exit</code>";
    let html = format!("<div><p>Open the shell first.</p><p>Then run {} once.</p></div>", code);
    let request = page(vec![ContentUnit::new(html.as_str(), "text/html")]);

    let result = service.translate_document(request, "de", None).await.unwrap();

    assert!(backend.request_count() > 0);
    assert!(backend.sent_sources().iter().all(|s| !s.contains("echo")));
    assert!(result.contents[0].value.contains(code));
    assert!(result.contents[0].value.contains("[de] <p>Open the shell first.</p>"));
}
