mod common;

use anyhow::Result;
use axum::http::StatusCode;
use common::Harness;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn directory_lists_customers_but_never_admins() -> Result<()> {
    let h = Harness::new();
    let (_, token) = h.admin();
    h.platform.seed_customer("a@acme.it", "Acme Srl");
    h.platform.seed_customer("b@beta.it", "Beta SpA");

    let (status, body) = h.get("/api/customers", Some(&token)).await?;
    assert_eq!(status, StatusCode::OK);

    let profiles = body["data"]["profiles"].as_array().expect("profiles array");
    assert_eq!(profiles.len(), 2);
    assert!(profiles.iter().all(|p| p["role"] == "customer"));
    Ok(())
}

#[tokio::test]
async fn directory_search_matches_company_and_email_case_insensitively() -> Result<()> {
    let h = Harness::new();
    let (_, token) = h.admin();
    h.platform.seed_customer("a@acme.it", "Acme Srl");
    h.platform.seed_customer("b@beta.it", "Beta SpA");

    let (_, body) = h.get("/api/customers?q=ACME", Some(&token)).await?;
    let profiles = body["data"]["profiles"].as_array().expect("profiles array");
    assert_eq!(profiles.len(), 1);
    assert_eq!(profiles[0]["email"], "a@acme.it");

    // Email matches too
    let (_, body) = h.get("/api/customers?q=b%40beta", Some(&token)).await?;
    let profiles = body["data"]["profiles"].as_array().expect("profiles array");
    assert_eq!(profiles.len(), 1);

    let (_, body) = h.get("/api/customers?q=nomatch", Some(&token)).await?;
    assert_eq!(body["data"]["profiles"].as_array().map(Vec::len), Some(0));
    Ok(())
}

#[tokio::test]
async fn detail_returns_the_profile_with_its_documents() -> Result<()> {
    let h = Harness::new();
    let (_, token) = h.admin();
    let customer = h.platform.seed_customer("a@acme.it", "Acme Srl");
    h.platform.seed_document(&customer, "fattura-marzo.pdf");
    h.platform.seed_document(&customer, "bilancio-2024.pdf");

    let path = format!("/api/customers/{}", customer.id);
    let (status, body) = h.get(&path, Some(&token)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["profile"]["email"], "a@acme.it");
    assert_eq!(
        body["data"]["documents"].as_array().map(Vec::len),
        Some(2)
    );
    Ok(())
}

#[tokio::test]
async fn unknown_customer_is_not_found() -> Result<()> {
    let h = Harness::new();
    let (_, token) = h.admin();

    let path = format!("/api/customers/{}", Uuid::new_v4());
    let (status, body) = h.get(&path, Some(&token)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
    assert_eq!(body["message"], "Customer not found");
    Ok(())
}

#[tokio::test]
async fn invite_confirms_the_invited_address() -> Result<()> {
    let h = Harness::new();
    let (_, token) = h.admin();

    let (status, body) = h
        .post(
            "/api/customers/invite",
            Some(&token),
            Some(json!({ "email": "nuovo@cliente.it" })),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["message"], "Invite sent to nuovo@cliente.it");
    assert_eq!(h.platform.invited_emails(), vec!["nuovo@cliente.it"]);
    Ok(())
}

#[tokio::test]
async fn invite_requires_an_email() -> Result<()> {
    let h = Harness::new();
    let (_, token) = h.admin();

    let (status, body) = h
        .post(
            "/api/customers/invite",
            Some(&token),
            Some(json!({ "email": "   " })),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Email is required");
    Ok(())
}

#[tokio::test]
async fn invite_surfaces_the_platform_message_verbatim() -> Result<()> {
    let h = Harness::new();
    let (_, token) = h.admin();
    h.platform
        .set_fail_invite(Some("A user with this email address has already been registered"));

    let (status, body) = h
        .post(
            "/api/customers/invite",
            Some(&token),
            Some(json!({ "email": "esiste@cliente.it" })),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let message = body["message"].as_str().expect("message string");
    assert!(
        message.contains("already been registered"),
        "unexpected message: {}",
        message
    );
    Ok(())
}
