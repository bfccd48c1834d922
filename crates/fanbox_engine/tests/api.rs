use fanbox_engine::{ApiError, FanboxApi, FetchSettings, ReqwestApi};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn api(server: &MockServer) -> ReqwestApi {
    ReqwestApi::new(server.uri(), &FetchSettings::default()).expect("client")
}

#[tokio::test]
async fn plans_are_unwrapped_from_the_body_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/plan.listCreator"))
        .and(query_param("creatorId", "artist"))
        .and(header("origin", "https://www.fanbox.cc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "body": [
                { "id": "1", "title": "Fan", "fee": 100, "description": "" },
                { "id": "2", "title": "Supporter", "fee": 500 }
            ]
        })))
        .mount(&server)
        .await;

    let plans = api(&server).list_plans("artist").await.unwrap();

    let fees: Vec<(u32, &str)> = plans.iter().map(|p| (p.fee, p.title.as_str())).collect();
    assert_eq!(fees, vec![(100, "Fan"), (500, "Supporter")]);
}

#[tokio::test]
async fn missing_tag_body_yields_no_tags() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tag.getFeatured"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "body": null })))
        .mount(&server)
        .await;

    let tags = api(&server).featured_tags("artist").await.unwrap();
    assert!(tags.is_empty());
}

#[tokio::test]
async fn paginated_index_and_page_lists_are_read() {
    let server = MockServer::start().await;
    let page_url = format!("{}/post.listCreator?creatorId=artist&maxId=9", server.uri());
    Mock::given(method("GET"))
        .and(path("/post.paginateCreator"))
        .and(query_param("creatorId", "artist"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "body": [page_url] })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/post.listCreator"))
        .and(query_param("maxId", "9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "body": [
                { "id": "9", "title": "newest", "feeRequired": 0, "isRestricted": false,
                  "type": "text", "body": null }
            ]
        })))
        .mount(&server)
        .await;

    let client = api(&server);
    let pages = client.paginate_creator("artist").await.unwrap();
    assert_eq!(pages, vec![page_url.clone()]);

    let posts = client.post_list(&pages[0]).await.unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].id, "9");
    assert!(!posts[0].has_body());
}

#[tokio::test]
async fn paged_post_list_shape_is_accepted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/post.listCreator"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "body": { "items": [ { "id": "3", "type": "image" } ], "nextUrl": null }
        })))
        .mount(&server)
        .await;

    let url = format!("{}/post.listCreator?creatorId=artist", server.uri());
    let posts = api(&server).post_list(&url).await.unwrap();
    assert_eq!(posts[0].id, "3");
}

#[tokio::test]
async fn post_info_decodes_full_post() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/post.info"))
        .and(query_param("postId", "42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "body": {
                "id": "42", "title": "hello", "creatorId": "artist", "feeRequired": 300,
                "isRestricted": false, "tags": ["x"], "type": "text",
                "body": { "text": "content" }
            }
        })))
        .mount(&server)
        .await;

    let post = api(&server).post_info("42").await.unwrap();

    assert_eq!(post.title, "hello");
    assert_eq!(post.fee_required, 300);
    assert!(post.has_body());
}

#[tokio::test]
async fn http_and_decode_failures_are_distinguished() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/post.info"))
        .and(query_param("postId", "1"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/post.info"))
        .and(query_param("postId", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let client = api(&server);
    assert!(matches!(
        client.post_info("1").await,
        Err(ApiError::Fetch(ref err)) if err.kind == fanbox_engine::FailureKind::HttpStatus(403)
    ));
    assert!(matches!(
        client.post_info("2").await,
        Err(ApiError::Decode { .. })
    ));
}

#[tokio::test]
async fn session_cookie_is_sent_when_configured() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tag.getFeatured"))
        .and(header("cookie", "FANBOXSESSID=secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "body": [{ "tag": "sketch", "count": 2 }]
        })))
        .mount(&server)
        .await;

    let settings = FetchSettings {
        session_id: Some("secret".to_string()),
        ..FetchSettings::default()
    };
    let client = ReqwestApi::new(server.uri(), &settings).unwrap();

    let tags = client.featured_tags("artist").await.unwrap();
    assert_eq!(tags[0].tag, "sketch");
}
