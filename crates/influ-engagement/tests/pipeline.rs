//! End-to-end ingestion tests against a mocked Graph API and an in-memory
//! insight store.

use std::sync::Mutex;
use std::time::Duration;

use influ_core::{Channel, Credentials, Influencer};
use influ_db::{DbError, InfluencerInsights, InsightStore};
use influ_engagement::{
    ingest, run_batch, simple_engagement_rate, ErrorKind, IngestContext, IngestOutcome, Stage,
};
use influ_graph::GraphClient;
use serde_json::json;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

#[derive(Default)]
struct MemoryStore {
    writes: Mutex<Vec<InfluencerInsights>>,
}

impl MemoryStore {
    fn writes(&self) -> Vec<InfluencerInsights> {
        self.writes.lock().unwrap().clone()
    }
}

impl InsightStore for MemoryStore {
    async fn upsert_insights(&self, insights: &InfluencerInsights) -> Result<(), DbError> {
        self.writes.lock().unwrap().push(insights.clone());
        Ok(())
    }
}

fn context(server: &MockServer) -> IngestContext {
    IngestContext {
        graph: GraphClient::with_base_url(&format!("{}/v7.0", server.uri()), 5, "influ-test/0.1")
            .expect("client construction should not fail"),
        post_cap: Some(25),
        max_pages: 50,
        deadline: Duration::from_secs(10),
        discovery_account: None,
    }
}

fn influencer(id: i64, account_id: &str) -> Influencer {
    Influencer {
        id,
        name: format!("Influencer {id}"),
        email: format!("i{id}@example.com"),
        social_account_id: Some(account_id.to_owned()),
        access_token: Some("tok".to_owned()),
        channels: vec![Channel {
            platform: "instagram".to_owned(),
            link: format!("https://www.instagram.com/user{id}/"),
        }],
    }
}

async fn mount_profile(server: &MockServer, account: &str, followers: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/v7.0/{account}")))
        .and(query_param("fields", "profile_picture_url,followers_count"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": account,
            "followers_count": followers,
            "profile_picture_url": format!("https://cdn.example/{account}.jpg")
        })))
        .mount(server)
        .await;
}

async fn mount_insight(server: &MockServer, account: &str, metric: &str, value: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(format!("/v7.0/{account}/insights")))
        .and(query_param("metric", metric))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "name": metric, "period": "lifetime", "values": [{ "value": value }] }]
        })))
        .mount(server)
        .await;
}

async fn mount_audience(server: &MockServer, account: &str, followers: u64) {
    mount_profile(server, account, followers).await;
    mount_insight(
        server,
        account,
        "audience_city",
        json!({ "Sofia, Bulgaria": 300, "Varna, Bulgaria": 80 }),
    )
    .await;
    mount_insight(
        server,
        account,
        "audience_gender_age",
        json!({ "M.25-34": 10, "F.25-34": 5, "M.35-44": 3 }),
    )
    .await;
}

fn posts(prefix: &str, n: usize) -> Vec<serde_json::Value> {
    (0..n)
        .map(|i| {
            json!({
                "id": format!("{prefix}{i}"),
                "timestamp": "2020-06-01T10:00:00+0000",
                "caption": "Morning run #fit with @coach",
                "like_count": 1,
                "comments_count": 1,
                "comments": { "data": [ { "text": "#fit forever" } ] }
            })
        })
        .collect()
}

async fn mount_media_pages(server: &MockServer, account: &str, first: usize, second: usize) {
    let next = format!(
        "{}/v7.0/{account}/media?after=PAGE2&access_token=tok",
        server.uri()
    );
    Mock::given(method("GET"))
        .and(path(format!("/v7.0/{account}/media")))
        .and(query_param_is_missing("after"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": posts("a", first),
            "paging": { "cursors": { "after": "PAGE2" }, "next": next }
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/v7.0/{account}/media")))
        .and(query_param("after", "PAGE2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": posts("b", second),
            "paging": { "cursors": { "before": "PAGE2" } }
        })))
        .mount(server)
        .await;
}

// ---------------------------------------------------------------------------
// ingest
// ---------------------------------------------------------------------------

#[tokio::test]
async fn ingest_writes_one_merged_document() {
    let server = MockServer::start().await;
    mount_audience(&server, "1784", 200).await;
    mount_media_pages(&server, "1784", 20, 20).await;
    let store = MemoryStore::default();

    let outcome = ingest(&context(&server), &store, &influencer(1, "1784"))
        .await
        .expect("ingestion should succeed");

    let IngestOutcome::Ingested(report) = outcome else {
        panic!("expected Ingested, got {outcome:?}");
    };
    assert_eq!(report.posts_considered, 25);
    assert_eq!(report.pages_fetched, 2);

    let writes = store.writes();
    assert_eq!(writes.len(), 1, "exactly one write per ingestion");
    let doc = &writes[0];
    assert_eq!(doc.influencer_id, 1);
    assert_eq!(doc.total_followers, 200);
    assert_eq!(doc.profile_picture, "https://cdn.example/1784.jpg");
    assert_eq!(doc.cities_by_audience_share[0].city, "Sofia, Bulgaria");
    assert_eq!(doc.gender_split.male, 13);
    assert_eq!(doc.top_gender, "male");
    assert_eq!(doc.top_age_bucket, "25-34");
    assert_eq!(doc.hashtags, vec!["fit"]);
    assert_eq!(doc.mentions, vec!["coach"]);
    assert_eq!(doc.posts.len(), 25);
    // 50 engagement / 25 posts / 200 followers * 100
    assert!((doc.engagement_rate - 1.0).abs() < 1e-9);
}

#[tokio::test]
async fn media_transport_failure_after_profile_writes_nothing() {
    let server = MockServer::start().await;
    mount_audience(&server, "1784", 200).await;
    Mock::given(method("GET"))
        .and(path("/v7.0/1784/media"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let store = MemoryStore::default();

    let err = ingest(&context(&server), &store, &influencer(1, "1784"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transport);
    assert_eq!(err.stage(), Some(Stage::Media));
    assert!(store.writes().is_empty());
}

#[tokio::test]
async fn influencer_without_credentials_is_skipped_without_requests() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let store = MemoryStore::default();

    let mut no_token = influencer(1, "1784");
    no_token.access_token = Some("   ".to_owned());
    let mut no_account = influencer(2, "1784");
    no_account.social_account_id = None;

    for identity in [no_token, no_account] {
        let outcome = ingest(&context(&server), &store, &identity).await.unwrap();
        assert_eq!(outcome, IngestOutcome::Skipped);
    }
    assert!(store.writes().is_empty());
}

#[tokio::test]
async fn missing_follower_count_aborts_at_profile_stage() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v7.0/1784"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "1784",
            "profile_picture_url": "https://cdn.example/p.jpg"
        })))
        .mount(&server)
        .await;
    let store = MemoryStore::default();

    let err = ingest(&context(&server), &store, &influencer(1, "1784"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::UpstreamDataMissing);
    assert_eq!(err.stage(), Some(Stage::Profile));
    assert!(err.to_string().contains("followers_count"));
    assert!(store.writes().is_empty());
}

#[tokio::test]
async fn empty_city_insight_is_upstream_data_missing() {
    let server = MockServer::start().await;
    mount_profile(&server, "1784", 200).await;
    Mock::given(method("GET"))
        .and(path("/v7.0/1784/insights"))
        .and(query_param("metric", "audience_city"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .mount(&server)
        .await;
    let store = MemoryStore::default();

    let err = ingest(&context(&server), &store, &influencer(1, "1784"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::UpstreamDataMissing);
    assert_eq!(err.stage(), Some(Stage::AudienceCity));
}

#[tokio::test]
async fn unsplittable_gender_key_is_malformed() {
    let server = MockServer::start().await;
    mount_profile(&server, "1784", 200).await;
    mount_insight(&server, "1784", "audience_city", json!({ "Sofia": 1 })).await;
    mount_insight(&server, "1784", "audience_gender_age", json!({ "M25-34": 1 })).await;
    let store = MemoryStore::default();

    let err = ingest(&context(&server), &store, &influencer(1, "1784"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::MalformedResponse);
    assert_eq!(err.stage(), Some(Stage::AudienceGenderAge));
}

#[tokio::test]
async fn capped_crawl_does_not_fetch_past_the_cap() {
    let server = MockServer::start().await;
    mount_audience(&server, "1784", 200).await;
    let next = format!("{}/v7.0/1784/media?after=PAGE2&access_token=tok", server.uri());
    Mock::given(method("GET"))
        .and(path("/v7.0/1784/media"))
        .and(query_param_is_missing("after"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": posts("a", 30),
            "paging": { "next": next }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v7.0/1784/media"))
        .and(query_param("after", "PAGE2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .expect(0)
        .mount(&server)
        .await;
    let store = MemoryStore::default();

    let outcome = ingest(&context(&server), &store, &influencer(1, "1784"))
        .await
        .unwrap();

    let IngestOutcome::Ingested(report) = outcome else {
        panic!("expected Ingested");
    };
    assert_eq!(report.posts_considered, 25);
    assert_eq!(report.pages_fetched, 1);
}

#[tokio::test]
async fn slow_upstream_hits_the_deadline_without_writing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "followers_count": 1, "profile_picture_url": "x" }))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;
    let store = MemoryStore::default();
    let mut ctx = context(&server);
    ctx.deadline = Duration::from_millis(200);

    let err = ingest(&ctx, &store, &influencer(1, "1784"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Deadline);
    assert!(store.writes().is_empty());
}

// ---------------------------------------------------------------------------
// simple_engagement_rate
// ---------------------------------------------------------------------------

#[tokio::test]
async fn simple_rate_crawls_all_discovery_pages() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v7.0/9000"))
        .and(query_param(
            "fields",
            "business_discovery.username(user7){followers_count,media{comments_count,like_count}}",
        ))
        .and(query_param("access_token", "discovery-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "business_discovery": {
                "followers_count": 100,
                "media": {
                    "data": [
                        { "id": "m1", "like_count": 8, "comments_count": 2 },
                        { "id": "m2", "like_count": 4, "comments_count": 0 }
                    ],
                    "paging": { "cursors": { "after": "A1" } }
                }
            }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v7.0/9000"))
        .and(query_param(
            "fields",
            "business_discovery.username(user7){media.after(A1){comments_count,like_count}}",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "business_discovery": {
                "media": { "data": [ { "id": "m3", "like_count": 6, "comments_count": 0 } ] }
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut ctx = context(&server);
    ctx.discovery_account = Some(Credentials {
        account_id: "9000".to_owned(),
        access_token: "discovery-token".to_owned(),
    });

    let payload = simple_engagement_rate(&ctx, &influencer(7, "1784"))
        .await
        .unwrap()
        .expect("discovery account is configured");

    assert_eq!(payload.username, "user7");
    assert_eq!(payload.followers_count, 100);
    assert_eq!(payload.posts_considered, 3);
    assert_eq!(payload.total_engagement, 20);
    // 20 / 3 / 100 * 100
    assert!((payload.engagement_rate - 20.0 / 3.0).abs() < 1e-9);
}

#[tokio::test]
async fn simple_rate_past_the_page_limit_fails_instead_of_truncating() {
    let server = MockServer::start().await;
    // Every page points at another one, so the crawl never exhausts.
    Mock::given(method("GET"))
        .and(path("/v7.0/1784"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "business_discovery": {
                "followers_count": 100,
                "media": {
                    "data": [ { "id": "m1", "like_count": 8, "comments_count": 2 } ],
                    "paging": { "cursors": { "after": "MORE" } }
                }
            }
        })))
        .expect(2)
        .mount(&server)
        .await;

    let mut ctx = context(&server);
    ctx.max_pages = 2;

    let err = simple_engagement_rate(&ctx, &influencer(7, "1784"))
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Some(Stage::Discovery));
    assert_eq!(err.kind(), ErrorKind::MalformedResponse);
    assert!(err.to_string().contains("pagination limit"), "got: {err}");
}

#[tokio::test]
async fn simple_rate_requires_an_instagram_channel() {
    let server = MockServer::start().await;
    let mut identity = influencer(3, "1784");
    identity.channels.clear();

    let err = simple_engagement_rate(&context(&server), &identity)
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Some(Stage::Discovery));
    assert!(err.to_string().contains("no Instagram channel"));
}

// ---------------------------------------------------------------------------
// run_batch
// ---------------------------------------------------------------------------

#[tokio::test]
async fn batch_collects_failures_and_dedupes_identities() {
    let server = MockServer::start().await;
    mount_audience(&server, "111", 200).await;
    mount_media_pages(&server, "111", 2, 0).await;
    Mock::given(method("GET"))
        .and(path("/v7.0/222"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": { "message": "Invalid OAuth access token." }
        })))
        .expect(1)
        .mount(&server)
        .await;
    let store = MemoryStore::default();

    let mut skipped = influencer(3, "333");
    skipped.access_token = None;
    let ok = influencer(1, "111");
    let failing = influencer(2, "222");
    let batch = vec![ok.clone(), failing.clone(), skipped, failing, ok];

    let report = run_batch(&context(&server), &store, &batch, 2).await;

    assert_eq!(report.total(), 3);
    assert_eq!(report.succeeded.len(), 1);
    assert_eq!(report.succeeded[0].influencer_id, 1);
    assert_eq!(report.skipped, vec![3]);
    assert_eq!(report.failures.len(), 1);
    let failure = &report.failures[0];
    assert_eq!(failure.influencer_id, 2);
    assert_eq!(failure.stage, Some(Stage::Profile));
    assert_eq!(failure.kind, ErrorKind::Transport);
    assert!(failure.message.contains("Invalid OAuth"));
    assert!(!report.all_failed());

    assert_eq!(store.writes().len(), 1);
}
