/*!
 * Integration tests for reuse of stored translations.
 *
 * Every test runs full requests through the translation service and checks
 * how many strings actually reached the backend.
 */

use doc_mt::database::Repository;
use doc_mt::providers::mock::MockBackend;
use doc_mt::translation::DocumentProcessManager;
use doc_mt::{BackendId, ContentUnit, DocumentContent, TranslationError};

use crate::common::{self, PAGE_URL, page, plain_units};

#[tokio::test]
async fn test_sameRequestTwice_shouldNotCallBackendAgain() {
    let backend = MockBackend::working();
    let service = common::service_with(vec![backend.clone()]);
    let request = page(plain_units(&["Hello", "World"]));

    let first = service.translate_document(request.clone(), "de", None).await.unwrap();
    let calls_after_first = backend.request_count();
    let second = service.translate_document(request, "de", None).await.unwrap();

    assert_eq!(first.contents, second.contents);
    assert_eq!(calls_after_first, 1);
    assert_eq!(backend.request_count(), 1);

    let documents = service
        .repository()
        .find_documents_by_url(PAGE_URL, Some("en"), Some("de"))
        .await
        .unwrap();
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].used_count, 2);
}

#[tokio::test]
async fn test_sharedText_shouldBeReusedAcrossDocuments() {
    let backend = MockBackend::working();
    let service = common::service_with(vec![backend.clone()]);

    service
        .translate_document(page(plain_units(&["Shared footer"])), "de", None)
        .await
        .unwrap();
    let other = DocumentContent::new(
        plain_units(&["Shared footer", "Only here"]),
        "https://example.com/other",
        "en",
    );
    let result = service.translate_document(other, "de", None).await.unwrap();

    assert_eq!(result.contents[0].value, "[de] Shared footer");
    assert_eq!(result.contents[1].value, "[de] Only here");
    assert_eq!(backend.sent_sources(), vec!["Shared footer", "Only here"]);

    let stats = service.repository().connection().stats().unwrap();
    assert_eq!(stats.document_count, 2);
    assert_eq!(stats.text_flow_count, 3);
}

#[tokio::test]
async fn test_otherTargetLocale_shouldTranslateAgain() {
    let backend = MockBackend::working();
    let service = common::service_with(vec![backend.clone()]);
    let request = page(plain_units(&["Hello"]));

    service.translate_document(request.clone(), "de", None).await.unwrap();
    let french = service.translate_document(request, "fr", None).await.unwrap();

    assert_eq!(french.contents[0].value, "[fr] Hello");
    assert_eq!(backend.request_count(), 2);
}

#[tokio::test]
async fn test_otherBackend_shouldNotReuseTranslation() {
    let dev = MockBackend::working();
    let google = MockBackend::working().with_id(BackendId::Google);
    let service = common::service_with(vec![dev.clone(), google.clone()]);
    let request = page(plain_units(&["Hello"]));

    service.translate_document(request.clone(), "de", None).await.unwrap();
    let result = service
        .translate_document(request, "de", Some("google"))
        .await
        .unwrap();

    assert_eq!(result.backend_id.as_deref(), Some("google"));
    assert_eq!(dev.request_count(), 1);
    assert_eq!(google.request_count(), 1);
    assert_eq!(service.repository().connection().stats().unwrap().target_count, 2);
}

#[tokio::test]
async fn test_repeatedText_shouldBeSentOnce() {
    let backend = MockBackend::working();
    let service = common::service_with(vec![backend.clone()]);

    let result = service
        .translate_document(page(plain_units(&["Buy now", "Buy now", "Buy now"])), "de", None)
        .await
        .unwrap();

    assert!(result.contents.iter().all(|u| u.value == "[de] Buy now"));
    assert_eq!(backend.sent_sources(), vec!["Buy now"]);
}

#[tokio::test]
async fn test_smallCharLimit_shouldBatchAndRecordEachRequest() {
    let backend = MockBackend::working().with_char_limit(12);
    let service = common::service_with(vec![backend.clone()]);

    service
        .translate_document(page(plain_units(&["First", "Second", "Third one"])), "de", None)
        .await
        .unwrap();

    let calls = backend.calls();
    assert_eq!(calls.len(), 2);
    for call in &calls {
        let chars: usize = call.sources.iter().map(|s| s.chars().count()).sum();
        assert!(chars <= 12);
    }
    let usage = service.repository().mt_request_stats().await.unwrap();
    assert_eq!(usage.len(), 1);
    assert_eq!(usage[0].backend_id, "dev");
    assert_eq!(usage[0].request_count, 2);
}

#[tokio::test]
async fn test_failingBackend_shouldStoreNothingAndAllowRetry() {
    let repository = Repository::new_in_memory().unwrap();
    let failing = common::service_on(
        repository.clone(),
        vec![MockBackend::failing()],
        DocumentProcessManager::in_memory(),
    );
    let request = page(plain_units(&["Hello"]));

    let err = failing.translate_document(request.clone(), "de", None).await.unwrap_err();
    assert!(matches!(err, TranslationError::Provider(_)));
    let stats = repository.connection().stats().unwrap();
    assert_eq!(stats.text_flow_count, 0);
    assert_eq!(stats.mt_request_count, 0);

    let working = MockBackend::working();
    let retry = common::service_on(repository, vec![working.clone()], DocumentProcessManager::in_memory());
    let result = retry.translate_document(request, "de", None).await.unwrap();
    assert_eq!(result.contents[0].value, "[de] Hello");
    assert_eq!(working.request_count(), 1);
}

#[tokio::test]
async fn test_fixedTranslation_shouldBeStoredAsReturned() {
    let backend = MockBackend::working().with_translation("Good morning", "Guten Morgen");
    let service = common::service_with(vec![backend.clone()]);

    let result = service
        .translate_document(
            page(vec![
                ContentUnit::new("Good morning", "text/plain"),
                ContentUnit::new("<p>Good morning</p>", "text/html"),
            ]),
            "de",
            None,
        )
        .await
        .unwrap();

    assert_eq!(result.contents[0].value, "Guten Morgen");
    assert_eq!(result.contents[1].value, "[de] <p>Good morning</p>");
    assert_eq!(result.contents[1].media_type, "text/html");
}

#[tokio::test]
async fn test_htmlUnits_shouldReuseAcrossRequestsWithNewUnits() {
    let backend = MockBackend::working();
    let service = common::service_with(vec![backend.clone()]);
    let header = ContentUnit::new("<h1>Welcome</h1>", "text/html");

    service
        .translate_document(page(vec![header.clone()]), "de", None)
        .await
        .unwrap();
    let result = service
        .translate_document(
            page(vec![header, ContentUnit::new("<p>New paragraph</p>", "text/html")]),
            "de",
            None,
        )
        .await
        .unwrap();

    assert_eq!(result.contents[0].value, "[de] <h1>Welcome</h1>");
    assert_eq!(result.contents[1].value, "[de] <p>New paragraph</p>");
    assert_eq!(backend.sent_sources(), vec!["<h1>Welcome</h1>", "<p>New paragraph</p>"]);
}
