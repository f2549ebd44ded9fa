/*!
 * Integration tests for per-document request coordination
 */

use std::sync::Arc;
use std::time::Duration;

use doc_mt::database::{DatabaseConnection, Repository};
use doc_mt::providers::mock::MockBackend;
use doc_mt::translation::{
    DocumentProcessKey, DocumentProcessManager, InMemoryLockStore, LockStore, SqliteLockStore,
};
use doc_mt::{DocumentContent, TranslationError};

use crate::common::{self, page, plain_units};

#[tokio::test]
async fn test_concurrentSameDocument_shouldTranslateOnce() {
    let backend = MockBackend::working().with_delay(Duration::from_millis(50));
    let service = common::service_with(vec![backend.clone()]);
    let request = page(plain_units(&["Hello", "World"]));

    let mut handles = Vec::new();
    for _ in 0..4 {
        let service = service.clone();
        let request = request.clone();
        handles.push(tokio::spawn(async move {
            service.translate_document(request, "de", None).await
        }));
    }

    for handle in handles {
        let result = handle.await.unwrap().unwrap();
        assert_eq!(result.contents[0].value, "[de] Hello");
    }
    assert_eq!(backend.request_count(), 1);
    assert_eq!(service.lock_manager().total_lock_count().await, 0);
}

#[tokio::test]
async fn test_concurrentOtherDocuments_shouldRunInParallel() {
    let backend = MockBackend::working().with_delay(Duration::from_millis(200));
    let service = common::service_with(vec![backend.clone()]);

    let first = page(plain_units(&["Hello"]));
    let second = DocumentContent::new(plain_units(&["Bye"]), "https://example.com/other", "en");
    let started = std::time::Instant::now();
    let (a, b) = tokio::join!(
        service.translate_document(first, "de", None),
        service.translate_document(second, "de", None)
    );

    a.unwrap();
    b.unwrap();
    assert_eq!(backend.request_count(), 2);
    assert!(started.elapsed() < Duration::from_millis(390));
}

#[tokio::test]
async fn test_busyDocument_shouldTimeOutWaitingRequest() {
    let backend = MockBackend::working().with_delay(Duration::from_millis(300));
    let locks = common::quick_locks(Duration::from_secs(60), Duration::from_millis(50));
    let service = common::service_with_locks(vec![backend.clone()], locks);
    let request = page(plain_units(&["Hello"]));

    let slow = {
        let service = service.clone();
        let request = request.clone();
        tokio::spawn(async move { service.translate_document(request, "de", None).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    let waiting = service.translate_document(request, "de", None).await;

    assert!(matches!(waiting, Err(TranslationError::LockTimeout(_))));
    assert!(slow.await.unwrap().is_ok());
    assert_eq!(backend.request_count(), 1);
}

#[tokio::test]
async fn test_expiredLease_shouldLetNextRequestIn() {
    let store = Arc::new(InMemoryLockStore::new());
    let locks = DocumentProcessManager::new(
        store.clone(),
        Duration::from_secs(60),
        Duration::from_secs(2),
        Duration::from_millis(10),
    );
    let key = DocumentProcessKey::new(common::PAGE_URL, "en", "de");

    // A holder that died without releasing
    assert!(store.try_acquire(&key.lock_key(), "crashed-process", Duration::from_millis(30)).unwrap());
    assert!(locks.is_locked(&key).await);

    let result = locks.with_lock(&key, async { Ok::<_, TranslationError>(42) }).await;

    assert_eq!(result.unwrap(), 42);
    assert!(!locks.is_locked(&key).await);
}

#[tokio::test]
async fn test_slowTranslation_shouldKeepLeaseUntilDone() {
    let backend = MockBackend::working().with_delay(Duration::from_millis(200));
    let locks = common::quick_locks(Duration::from_millis(40), Duration::from_secs(5));
    let service = common::service_with_locks(vec![backend.clone()], locks);
    let request = page(plain_units(&["Hello"]));

    let (a, b) = tokio::join!(
        service.translate_document(request.clone(), "de", None),
        service.translate_document(request, "de", None)
    );

    assert_eq!(a.unwrap().contents[0].value, "[de] Hello");
    assert_eq!(b.unwrap().contents[0].value, "[de] Hello");
    assert_eq!(backend.request_count(), 1);
    assert_eq!(service.lock_manager().total_lock_count().await, 0);
}

#[tokio::test]
async fn test_sqliteLocks_shouldBeSharedBetweenServices() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shared.db");
    let db_a = DatabaseConnection::new(&path).unwrap();
    let db_b = DatabaseConnection::new(&path).unwrap();
    let locks_a = DocumentProcessManager::new(
        Arc::new(SqliteLockStore::new(db_a.clone())),
        Duration::from_secs(60),
        Duration::from_millis(100),
        Duration::from_millis(10),
    );
    let store_b = SqliteLockStore::new(db_b.clone());
    let key = DocumentProcessKey::new(common::PAGE_URL, "en", "de");

    assert!(store_b.try_acquire(&key.lock_key(), "other-process", Duration::from_secs(60)).unwrap());
    let blocked = locks_a.with_lock(&key, async { Ok::<_, TranslationError>(()) }).await;
    assert!(matches!(blocked, Err(TranslationError::LockTimeout(_))));

    store_b.release(&key.lock_key(), "other-process").unwrap();
    let service = common::service_on(Repository::new(db_a), vec![MockBackend::working()], locks_a);
    let result = service
        .translate_document(page(plain_units(&["Hello"])), "de", None)
        .await
        .unwrap();
    assert_eq!(result.contents[0].value, "[de] Hello");
    assert!(!store_b.contains(&key.lock_key()).unwrap());
}
