mod common;

use anyhow::Result;
use axum::http::StatusCode;
use common::Harness;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn download_url_defaults_to_a_short_lifetime() -> Result<()> {
    let h = Harness::new();
    let (_, token) = h.admin();
    let customer = h.platform.seed_customer("a@acme.it", "Acme Srl");
    let document = h.platform.seed_document(&customer, "fattura.pdf");

    let path = format!("/api/documents/{}/download-url", document.id);
    let (status, body) = h.post(&path, Some(&token), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["expires_in"], 60);

    let url = body["data"]["signed_url"].as_str().expect("url string");
    assert!(url.contains(&document.file_path), "url was {}", url);
    Ok(())
}

#[tokio::test]
async fn download_url_honors_a_ttl_override() -> Result<()> {
    let h = Harness::new();
    let (_, token) = h.admin();
    let customer = h.platform.seed_customer("a@acme.it", "Acme Srl");
    let document = h.platform.seed_document(&customer, "fattura.pdf");

    let path = format!("/api/documents/{}/download-url", document.id);
    let (status, body) = h
        .post(&path, Some(&token), Some(json!({ "ttl": 300 })))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["expires_in"], 300);
    Ok(())
}

#[tokio::test]
async fn download_url_for_unknown_document_is_not_found() -> Result<()> {
    let h = Harness::new();
    let (_, token) = h.admin();

    let path = format!("/api/documents/{}/download-url", Uuid::new_v4());
    let (status, body) = h.post(&path, Some(&token), None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Document not found");
    Ok(())
}

#[tokio::test]
async fn delete_removes_the_object_and_the_row() -> Result<()> {
    let h = Harness::new();
    let (_, token) = h.admin();
    let customer = h.platform.seed_customer("a@acme.it", "Acme Srl");
    let document = h.platform.seed_document(&customer, "fattura.pdf");

    let path = format!("/api/documents/{}", document.id);
    let (status, body) = h.delete(&path, Some(&token)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["deleted"], document.id.to_string());
    assert!(!h.platform.has_object(&document.file_path));
    assert!(!h.platform.has_document_row(document.id));
    Ok(())
}

#[tokio::test]
async fn storage_failure_leaves_the_row_untouched() -> Result<()> {
    let h = Harness::new();
    let (_, token) = h.admin();
    let customer = h.platform.seed_customer("a@acme.it", "Acme Srl");
    let document = h.platform.seed_document(&customer, "fattura.pdf");
    h.platform.set_fail_storage_remove(true);

    let path = format!("/api/documents/{}", document.id);
    let (status, _) = h.delete(&path, Some(&token)).await?;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    // Object removal never happened, so the document must still be listed
    assert!(h.platform.has_object(&document.file_path));
    assert!(h.platform.has_document_row(document.id));
    Ok(())
}

#[tokio::test]
async fn row_delete_failure_after_object_removal_is_surfaced() -> Result<()> {
    let h = Harness::new();
    let (_, token) = h.admin();
    let customer = h.platform.seed_customer("a@acme.it", "Acme Srl");
    let document = h.platform.seed_document(&customer, "fattura.pdf");
    h.platform.set_fail_row_delete(true);

    let path = format!("/api/documents/{}", document.id);
    let (status, _) = h.delete(&path, Some(&token)).await?;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    // The object is gone and the row dangles; the error must not be hidden
    assert!(!h.platform.has_object(&document.file_path));
    assert!(h.platform.has_document_row(document.id));
    Ok(())
}

#[tokio::test]
async fn delete_of_unknown_document_is_not_found() -> Result<()> {
    let h = Harness::new();
    let (_, token) = h.admin();

    let path = format!("/api/documents/{}", Uuid::new_v4());
    let (status, body) = h.delete(&path, Some(&token)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Document not found");
    Ok(())
}
