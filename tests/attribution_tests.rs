//! Attribution and lead capture tests
//!
//! Precedence COOKIE → EMAIL_MATCH → PHONE_MATCH → DIRECT, conversion
//! counting and the first-attribution-wins policy.

mod common;

use common::{BASE_URL, setup, setup_with, test_config};
use tracklinker::attribution::{AttributionMethod, AttributionPayload};
use tracklinker::attribution::payload::DAY_MS;
use tracklinker::errors::TrackerError;
use tracklinker::services::{CreateLinkRequest, LeadSubmission};
use tracklinker::storage::Role;
use tracklinker::storage::traits::ShortLinkStore;

fn submission(email: Option<&str>, phone: Option<&str>) -> LeadSubmission {
    LeadSubmission {
        full_name: Some("Lee Lead".to_string()),
        email: email.map(str::to_string),
        phone: phone.map(str::to_string),
    }
}

async fn seed_link(env: &common::TestEnv, profile: &str, code: &str) {
    env.services
        .short_links
        .create(
            profile,
            CreateLinkRequest {
                code: Some(code.to_string()),
                target_url: "https://example.com/intake".to_string(),
                title: None,
            },
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_visit_then_lead_is_cookie_attributed_with_conversion() {
    let env = setup().await;
    env.profile("p-jane", Role::TaxPreparer, "Jane Doe", Some("janedoe"))
        .await;
    seed_link(&env, "p-jane", "abc123").await;

    let visit = env
        .services
        .short_links
        .visit("abc123", None, 1_000)
        .await
        .unwrap();
    let link = env.storage.get_short_link("abc123").await.unwrap().unwrap();
    assert_eq!(link.clicks, 1);

    let result = env
        .services
        .leads
        .submit_lead(
            submission(Some("Lead@Example.com"), None),
            Some(&visit.payload),
            2_000,
        )
        .await
        .unwrap();

    assert!(result.created);
    let attribution = &result.attribution.attribution;
    assert_eq!(attribution.attribution_method, AttributionMethod::Cookie);
    assert_eq!(attribution.referrer_username.as_deref(), Some("janedoe"));
    assert_eq!(attribution.referrer_type, Some(Role::TaxPreparer));
    assert_eq!(attribution.tracking_code.as_deref(), Some("abc123"));
    assert_eq!(result.lead.email.as_deref(), Some("lead@example.com"));
    assert_eq!(result.lead.tracking_code.as_deref(), Some("abc123"));

    let link = env.storage.get_short_link("abc123").await.unwrap().unwrap();
    assert_eq!(link.conversions, 1);

    // 重复提交不会再次计入转化
    let again = env
        .services
        .leads
        .submit_lead(
            submission(Some("lead@example.com"), None),
            Some(&visit.payload),
            3_000,
        )
        .await
        .unwrap();
    assert!(!again.created);
    let link = env.storage.get_short_link("abc123").await.unwrap().unwrap();
    assert_eq!(link.conversions, 1);
}

#[tokio::test]
async fn test_tracking_code_cookie_attributes_without_conversion() {
    let env = setup().await;
    env.profile("p-jane", Role::TaxPreparer, "Jane Doe", Some("janedoe"))
        .await;
    env.services
        .tracking_codes
        .assign("p-jane", BASE_URL)
        .await
        .unwrap();

    let visit = env
        .services
        .short_links
        .visit("jane-doe", None, 1_000)
        .await
        .unwrap();
    let result = env
        .services
        .leads
        .submit_lead(submission(None, Some("(555) 123-4567")), Some(&visit.payload), 2_000)
        .await
        .unwrap();

    assert_eq!(
        result.attribution.attribution.attribution_method,
        AttributionMethod::Cookie
    );
    assert_eq!(result.lead.phone.as_deref(), Some("5551234567"));
}

#[tokio::test]
async fn test_expired_cookie_falls_back_to_direct() {
    let env = setup().await;
    env.profile("p-jane", Role::TaxPreparer, "Jane Doe", Some("janedoe"))
        .await;
    seed_link(&env, "p-jane", "abc123").await;

    let payload = AttributionPayload::new("abc123", 0, Some("janedoe".into()), None);
    let window = i64::from(test_config().attribution.window_days);
    let result = env
        .services
        .leads
        .get_attribution(Some(&payload), None, None, (window + 1) * DAY_MS)
        .await
        .unwrap();

    assert!(result.success);
    assert!(result.attribution.is_direct());
    assert_eq!(result.attribution.referrer_username, None);
}

#[tokio::test]
async fn test_email_and_phone_match_reuse_prior_attribution() {
    let env = setup().await;
    env.profile("p-rita", Role::Referrer, "Rita Ref", Some("rita"))
        .await;
    seed_link(&env, "p-rita", "rita-spring").await;

    let visit = env
        .services
        .short_links
        .visit("rita-spring", None, 1_000)
        .await
        .unwrap();
    env.services
        .leads
        .submit_lead(
            submission(Some("pat@example.com"), Some("555-000-1111")),
            Some(&visit.payload),
            2_000,
        )
        .await
        .unwrap();

    let by_email = env
        .services
        .leads
        .get_attribution(None, Some("PAT@example.com"), None, 3_000)
        .await
        .unwrap();
    assert_eq!(
        by_email.attribution.attribution_method,
        AttributionMethod::EmailMatch
    );
    assert_eq!(by_email.attribution.referrer_username.as_deref(), Some("rita"));
    assert_eq!(by_email.attribution.referrer_type, Some(Role::Referrer));

    let by_phone = env
        .services
        .leads
        .get_attribution(None, None, Some("+1 555 000 1111"), 3_000)
        .await
        .unwrap();
    assert_eq!(
        by_phone.attribution.attribution_method,
        AttributionMethod::PhoneMatch
    );

    let nobody = env
        .services
        .leads
        .get_attribution(None, Some("stranger@example.com"), None, 3_000)
        .await
        .unwrap();
    assert!(nobody.attribution.is_direct());
}

#[tokio::test]
async fn test_first_attribution_wins_on_resubmit() {
    let env = setup().await;
    env.profile("p-jane", Role::TaxPreparer, "Jane Doe", Some("janedoe"))
        .await;
    env.profile("p-bob", Role::Affiliate, "Bob Broker", Some("bob"))
        .await;
    seed_link(&env, "p-jane", "jane-link").await;
    seed_link(&env, "p-bob", "bob-link").await;

    let jane_visit = env
        .services
        .short_links
        .visit("jane-link", None, 1_000)
        .await
        .unwrap();
    env.services
        .leads
        .submit_lead(submission(Some("sam@example.com"), None), Some(&jane_visit.payload), 2_000)
        .await
        .unwrap();

    let bob_visit = env
        .services
        .short_links
        .visit("bob-link", Some(&jane_visit.payload), 3_000)
        .await
        .unwrap();
    assert!(bob_visit.unique);
    let resubmit = env
        .services
        .leads
        .submit_lead(submission(Some("sam@example.com"), None), Some(&bob_visit.payload), 4_000)
        .await
        .unwrap();

    assert!(!resubmit.created);
    assert_eq!(resubmit.lead.referrer_username.as_deref(), Some("janedoe"));
    assert_eq!(resubmit.lead.tracking_code.as_deref(), Some("jane-link"));
    let bob_link = env.storage.get_short_link("bob-link").await.unwrap().unwrap();
    assert_eq!(bob_link.conversions, 0);
}

#[tokio::test]
async fn test_reattribution_when_enabled() {
    let mut config = test_config();
    config.attribution.reattribute_on_resubmit = true;
    let env = setup_with(config).await;
    env.profile("p-jane", Role::TaxPreparer, "Jane Doe", Some("janedoe"))
        .await;
    env.profile("p-bob", Role::Affiliate, "Bob Broker", Some("bob"))
        .await;
    seed_link(&env, "p-jane", "jane-link").await;
    seed_link(&env, "p-bob", "bob-link").await;

    let jane_visit = env.services.short_links.visit("jane-link", None, 1_000).await.unwrap();
    env.services
        .leads
        .submit_lead(submission(Some("sam@example.com"), None), Some(&jane_visit.payload), 2_000)
        .await
        .unwrap();

    let bob_visit = env.services.short_links.visit("bob-link", None, 3_000).await.unwrap();
    let resubmit = env
        .services
        .leads
        .submit_lead(submission(Some("sam@example.com"), None), Some(&bob_visit.payload), 4_000)
        .await
        .unwrap();
    assert_eq!(resubmit.lead.referrer_username.as_deref(), Some("bob"));
}

#[tokio::test]
async fn test_cookie_survives_customize_of_tracking_code() {
    let env = setup().await;
    env.profile("p-jane", Role::TaxPreparer, "Jane Doe", Some("janedoe"))
        .await;
    let tracking = &env.services.tracking_codes;
    tracking.assign("p-jane", BASE_URL).await.unwrap();

    let visit = env.services.short_links.visit("jane-doe", None, 1_000).await.unwrap();
    tracking.customize("p-jane", "jane-tax", BASE_URL).await.unwrap();

    // 旧码已释放，退回 cookie 中记录的 referrer
    let result = env
        .services
        .leads
        .get_attribution(Some(&visit.payload), None, None, 2_000)
        .await
        .unwrap();
    assert_eq!(
        result.attribution.attribution_method,
        AttributionMethod::Cookie
    );
    assert_eq!(result.attribution.referrer_username.as_deref(), Some("janedoe"));
}

#[tokio::test]
async fn test_lead_requires_contact() {
    let env = setup().await;

    let err = env
        .services
        .leads
        .submit_lead(submission(None, None), None, 0)
        .await
        .unwrap_err();
    assert!(matches!(err, TrackerError::InvalidFormat(_)));

    let err = env
        .services
        .leads
        .submit_lead(submission(Some("not-an-email"), None), None, 0)
        .await
        .unwrap_err();
    assert!(matches!(err, TrackerError::InvalidFormat(_)));
}

#[tokio::test]
async fn test_cookie_credits_owner_without_username() {
    let env = setup().await;
    // 报税员没有 vanity slug
    env.profile("p-jane", Role::TaxPreparer, "Jane Doe", None).await;
    seed_link(&env, "p-jane", "abc123").await;

    let visit = env
        .services
        .short_links
        .visit("abc123", None, 1_000)
        .await
        .unwrap();
    assert_eq!(visit.payload.referrer_username.as_deref(), Some("p-jane"));

    let result = env
        .services
        .leads
        .submit_lead(
            submission(Some("new@example.com"), None),
            Some(&visit.payload),
            2_000,
        )
        .await
        .unwrap();

    let attribution = &result.attribution.attribution;
    assert_eq!(attribution.attribution_method, AttributionMethod::Cookie);
    assert_eq!(attribution.referrer_username.as_deref(), Some("p-jane"));
    assert_eq!(attribution.referrer_type, Some(Role::TaxPreparer));
    assert_eq!(attribution.tracking_code.as_deref(), Some("abc123"));

    let link = env.storage.get_short_link("abc123").await.unwrap().unwrap();
    assert_eq!(link.conversions, 1);

    // 之后凭 email 匹配仍能取回同一 referrer
    let by_email = env
        .services
        .leads
        .get_attribution(None, Some("new@example.com"), None, 3_000)
        .await
        .unwrap();
    assert_eq!(
        by_email.attribution.attribution_method,
        AttributionMethod::EmailMatch
    );
    assert_eq!(by_email.attribution.referrer_type, Some(Role::TaxPreparer));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_phone_only_leads_collapse_to_one() {
    use migration::entities::lead;
    use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};

    const SUBMISSIONS: usize = 8;

    let env = setup().await;
    let mut handles = Vec::with_capacity(SUBMISSIONS);
    for i in 0..SUBMISSIONS {
        let leads = env.services.leads.clone();
        handles.push(tokio::spawn(async move {
            leads
                .submit_lead(submission(None, Some("555-222-3333")), None, i as i64)
                .await
        }));
    }

    let mut created = 0;
    for handle in handles {
        if handle.await.unwrap().unwrap().created {
            created += 1;
        }
    }
    assert_eq!(created, 1);

    let rows = lead::Entity::find()
        .filter(lead::Column::Phone.eq("5552223333"))
        .count(env.storage.get_db())
        .await
        .unwrap();
    assert_eq!(rows, 1);
}
