/*!
 * Full app lifecycle tests through the controller
 */

use anyhow::Result;
use std::path::PathBuf;

use doc_mt::app_config::{Config, LockStoreKind};
use doc_mt::app_controller::Controller;
use doc_mt::{AppError, ContentUnit, DocumentContent};

use crate::common::{self, PAGE_URL};

fn file_config(dir: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.database.path = Some(dir.join("doc-mt.db"));
    config.lock.store = LockStoreKind::Database;
    config
}

fn sample_payload() -> DocumentContent {
    DocumentContent::new(
        vec![
            ContentUnit::new("Welcome", "text/plain").with_metadata("title"),
            ContentUnit::new(
                "<p>Read the <code>README</code> first. Then start.</p>",
                "text/html",
            ),
        ],
        PAGE_URL,
        "en",
    )
}

#[tokio::test]
async fn test_translateFile_shouldProduceTranslatedPayload() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let input = common::write_payload(dir.path(), "page.json", &sample_payload())?;
    let output = dir.path().join("page.de.json");
    let controller = Controller::with_config(file_config(dir.path()))?;

    let translated = controller
        .translate_file(&input, "de", None, Some(&output))
        .await?;

    assert_eq!(translated.locale, "de");
    assert_eq!(translated.backend_id.as_deref(), Some("dev"));
    assert_eq!(translated.contents[0].value, "translated[网 Welcome 网]");
    assert_eq!(translated.contents[0].metadata.as_deref(), Some("title"));
    assert!(translated.contents[1].value.contains("<code>README</code>"));
    assert!(translated.contents[1].value.contains("translated[网"));

    let written: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&output)?)?;
    assert_eq!(written["locale"], "de");
    assert_eq!(written["backendId"], "dev");
    assert_eq!(written["contents"][1]["type"], "text/html");
    Ok(())
}

#[tokio::test]
async fn test_restartedController_shouldReuseStoredTranslations() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let input = common::write_payload(dir.path(), "page.json", &sample_payload())?;

    let first = {
        let controller = Controller::with_config(file_config(dir.path()))?;
        controller.translate_file(&input, "de", None, None).await?
    };
    let controller = Controller::with_config(file_config(dir.path()))?;
    let second = controller.translate_file(&input, "de", None, None).await?;

    assert_eq!(first.contents, second.contents);
    let report = controller.stats_report(Some(PAGE_URL)).await?;
    assert!(report.contains("dev: 2 requests"), "{}", report);
    assert!(report.contains("used 2 times"), "{}", report);
    Ok(())
}

#[tokio::test]
async fn test_translateFile_withInvalidPayload_shouldNotTouchStore() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut payload = sample_payload();
    payload.url = "relative/page".to_string();
    let input = common::write_payload(dir.path(), "bad.json", &payload)?;
    let controller = Controller::with_config(file_config(dir.path()))?;

    let result = controller.translate_file(&input, "de", None, None).await;

    match result {
        Err(AppError::Translation(e)) => assert!(e.is_invalid_input()),
        other => panic!("expected invalid input, got {:?}", other),
    }
    let report = controller.stats_report(None).await?;
    assert!(report.starts_with("Documents: 0"), "{}", report);
    Ok(())
}

#[tokio::test]
async fn test_translateFile_withUnconfiguredBackend_shouldFail() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let input = common::write_payload(dir.path(), "page.json", &sample_payload())?;
    let controller = Controller::with_config(file_config(dir.path()))?;

    let result = controller.translate_file(&input, "de", Some("deepl"), None).await;

    assert!(matches!(result, Err(AppError::Translation(_))));
    Ok(())
}

#[tokio::test]
async fn test_translateFile_withNonJsonPayload_shouldBeFileError() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let input: PathBuf = dir.path().join("page.json");
    std::fs::write(&input, "<html></html>")?;
    let controller = Controller::with_config(file_config(dir.path()))?;

    let result = controller.translate_file(&input, "de", None, None).await;

    assert!(matches!(result, Err(AppError::File(_))));
    Ok(())
}
