//! HTTP surface tests
//!
//! Bearer auth, JSON error bodies, redirect + attribution cookie round trip.

mod common;

use std::sync::Arc;

use actix_web::http::{StatusCode, header};
use actix_web::test::{self, TestRequest};
use actix_web::{App, web};
use serde_json::{Value, json};

use common::{JWT_SECRET, setup};
use tracklinker::api::jwt::IdentityVerifier;
use tracklinker::api::middleware::RequestIdMiddleware;
use tracklinker::api::services::{AppStartTime, api_routes, health_routes, redirect_routes};
use tracklinker::storage::Role;

fn verifier() -> Arc<IdentityVerifier> {
    Arc::new(IdentityVerifier::new(JWT_SECRET, None))
}

fn bearer(profile_id: &str) -> (header::HeaderName, String) {
    let token = verifier()
        .issue(profile_id, chrono::Duration::minutes(5))
        .unwrap();
    (header::AUTHORIZATION, format!("Bearer {}", token))
}

macro_rules! init_app {
    ($env:expr) => {
        test::init_service(
            App::new()
                .wrap(RequestIdMiddleware)
                .app_data(web::Data::new($env.services.clone()))
                .app_data(web::Data::new(AppStartTime {
                    start_datetime: chrono::Utc::now(),
                }))
                .service(health_routes())
                .service(api_routes(verifier()))
                .service(redirect_routes()),
        )
        .await
    };
}

#[actix_web::test]
async fn test_protected_routes_require_bearer_token() {
    let env = setup().await;
    let app = init_app!(env);

    let resp = test::call_service(&app, TestRequest::get().uri("/api/tracking-code").to_request()).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], 2000);
    assert!(body["error"].is_string());

    let req = TestRequest::get()
        .uri("/api/links")
        .insert_header((header::AUTHORIZATION, "Bearer not-a-jwt"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_tracking_code_endpoints() {
    let env = setup().await;
    env.profile("p-jane", Role::TaxPreparer, "Jane Doe", Some("janedoe"))
        .await;
    env.profile("p-john", Role::TaxPreparer, "John Roe", None).await;
    let app = init_app!(env);

    let req = TestRequest::get()
        .uri("/api/tracking-code")
        .insert_header(bearer("p-jane"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["code"], "jane-doe");
    assert_eq!(body["isCustom"], false);
    assert_eq!(body["finalized"], false);

    let req = TestRequest::get()
        .uri("/api/tracking-code/check?code=jane-doe")
        .insert_header(bearer("p-john"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["available"], false);

    let req = TestRequest::patch()
        .uri("/api/tracking-code")
        .insert_header(bearer("p-jane"))
        .set_json(json!({ "customCode": "jane-tax" }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["code"], "jane-tax");
    assert_eq!(body["isCustom"], true);

    let req = TestRequest::patch()
        .uri("/api/tracking-code")
        .insert_header(bearer("p-jane"))
        .set_json(json!({ "customCode": "jane-again" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], 3002);

    let req = TestRequest::post()
        .uri("/api/tracking-code/finalize")
        .insert_header(bearer("p-jane"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["trackingCode"]["finalized"], true);
    assert!(body["shortLinks"].is_array());
}

#[actix_web::test]
async fn test_forbidden_role_and_bad_json() {
    let env = setup().await;
    env.profile("p-client", Role::Client, "Carl Client", None).await;
    let app = init_app!(env);

    let req = TestRequest::post()
        .uri("/api/links")
        .insert_header(bearer("p-client"))
        .set_json(json!({ "targetUrl": "https://example.com" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = TestRequest::post()
        .uri("/api/links")
        .insert_header(bearer("p-client"))
        .insert_header((header::CONTENT_TYPE, "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], 1000);
}

#[actix_web::test]
async fn test_redirect_sets_cookie_and_lead_uses_it() {
    let env = setup().await;
    env.profile("p-jane", Role::TaxPreparer, "Jane Doe", Some("janedoe"))
        .await;
    let app = init_app!(env);

    let req = TestRequest::post()
        .uri("/api/links")
        .insert_header(bearer("p-jane"))
        .set_json(json!({ "code": "abc123", "targetUrl": "https://example.com/intake" }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["link"]["code"], "abc123");
    assert_eq!(body["link"]["isActive"], true);

    let resp = test::call_service(&app, TestRequest::get().uri("/abc123").to_request()).await;
    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        resp.headers().get(header::LOCATION).unwrap(),
        "https://example.com/intake"
    );
    assert!(resp.headers().get("x-request-id").is_some());
    let cookie = resp
        .response()
        .cookies()
        .find(|c| c.name() == "tl_attribution")
        .expect("attribution cookie")
        .into_owned();
    assert!(cookie.http_only().unwrap_or(false));

    let req = TestRequest::post()
        .uri("/api/leads")
        .cookie(cookie.clone())
        .set_json(json!({ "fullName": "Lee Lead", "email": "lee@example.com" }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["created"], true);
    assert_eq!(body["attribution"]["attribution"]["attributionMethod"], "COOKIE");
    assert_eq!(body["attribution"]["attribution"]["referrerUsername"], "janedoe");

    let req = TestRequest::get()
        .uri("/api/links")
        .insert_header(bearer("p-jane"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["links"][0]["clicks"], 1);
    assert_eq!(body["links"][0]["conversions"], 1);

    // 无 cookie、无联系方式：DIRECT
    let req = TestRequest::post().uri("/api/attribution").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["attribution"]["attributionMethod"], "DIRECT");
}

#[actix_web::test]
async fn test_tracking_code_redirects_to_landing_page() {
    let env = setup().await;
    env.profile("p-jane", Role::TaxPreparer, "Jane Doe", Some("janedoe"))
        .await;
    env.services
        .tracking_codes
        .assign("p-jane", common::BASE_URL)
        .await
        .unwrap();
    let app = init_app!(env);

    let resp = test::call_service(&app, TestRequest::get().uri("/jane-doe").to_request()).await;
    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
    let location = resp
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(location.ends_with("/?ref=jane-doe"), "{}", location);
}

#[actix_web::test]
async fn test_unknown_and_invalid_codes_are_not_found() {
    let env = setup().await;
    let app = init_app!(env);

    for uri in ["/missing-code", "/UPPER", "/ab"] {
        let resp = test::call_service(&app, TestRequest::get().uri(uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{}", uri);
        assert!(resp.response().cookies().next().is_none());
    }
}

#[actix_web::test]
async fn test_username_claim_reports_can_change() {
    let env = setup().await;
    env.profile("p-rita", Role::Referrer, "Rita Ref", None).await;
    env.profile("p-amy", Role::Affiliate, "Amy Aff", None).await;
    let app = init_app!(env);

    let req = TestRequest::post()
        .uri("/api/username")
        .insert_header(bearer("p-rita"))
        .set_json(json!({ "slug": "TaxPro" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = TestRequest::post()
        .uri("/api/username")
        .insert_header(bearer("p-amy"))
        .set_json(json!({ "slug": "taxpro" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["canChange"], true);
    assert_eq!(body["code"], 3001);

    let req = TestRequest::get()
        .uri("/api/username")
        .insert_header(bearer("p-rita"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["username"]["slug"], "TaxPro");
    assert_eq!(body["canChange"], true);
}

#[actix_web::test]
async fn test_health_endpoints() {
    let env = setup().await;
    let app = init_app!(env);

    let resp = test::call_service(&app, TestRequest::get().uri("/health").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["storage"]["backend"], "sqlite");

    let resp = test::call_service(&app, TestRequest::get().uri("/health/live").to_request()).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}

#[actix_web::test]
async fn test_anonymous_caller_cannot_read_other_lead_attribution() {
    let env = setup().await;
    env.profile("p-rita", Role::Referrer, "Rita Ref", Some("rita"))
        .await;
    env.services
        .short_links
        .create(
            "p-rita",
            tracklinker::services::CreateLinkRequest {
                code: Some("rita01".to_string()),
                target_url: "https://example.com".to_string(),
                title: None,
            },
        )
        .await
        .unwrap();
    let visit = env
        .services
        .short_links
        .visit("rita01", None, 1_000)
        .await
        .unwrap();
    env.services
        .leads
        .submit_lead(
            tracklinker::services::LeadSubmission {
                full_name: None,
                email: Some("victim@example.com".to_string()),
                phone: Some("555-444-9999".to_string()),
            },
            Some(&visit.payload),
            2_000,
        )
        .await
        .unwrap();
    let app = init_app!(env);

    let req = TestRequest::post()
        .uri("/api/attribution")
        .set_json(json!({ "email": "victim@example.com", "phone": "555-444-9999" }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["attribution"]["attributionMethod"], "DIRECT");
    assert!(body["attribution"]["referrerUsername"].is_null());

    // 重复提交同一 email 也不回显已记录的归因
    let req = TestRequest::post()
        .uri("/api/leads")
        .set_json(json!({ "email": "victim@example.com" }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["created"], false);
    assert_eq!(body["attribution"]["attribution"]["attributionMethod"], "DIRECT");
    assert!(body.get("lead").is_none());

    // 已记录的归因保持不变
    let stored = env
        .services
        .leads
        .get_attribution(None, Some("victim@example.com"), None, 3_000)
        .await
        .unwrap();
    assert_eq!(stored.attribution.referrer_username.as_deref(), Some("rita"));
}
