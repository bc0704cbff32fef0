//! Integration tests for the content pages server
//!
//! These tests start the real router on a local port and drive it over HTTP
//! with redirects disabled, so every redirect, 404 and 304 the resolution
//! pipeline produces is observed exactly as a browser would see it.

use std::sync::Arc;

use content_pages::db::ContentSnapshot;
use content_pages::server::{self, AppState, USER_CACHE_KEY_HEADER};
use reqwest::{header, StatusCode};

// ==================== Test Helpers ====================

const SITE: &str = r#"{
    "languages": [
        {"code": "en", "name": "English", "is_default": true},
        {"code": "fr", "name": "Français"}
    ],
    "pages": [
        {"id": 1, "urlname": "home", "language_code": "en", "title": "Home",
         "published": true, "is_root": true,
         "published_at": "2024-01-15T10:30:00Z", "updated_at": "2024-01-15T10:30:00Z"},
        {"id": 2, "urlname": "accueil", "language_code": "fr", "title": "Accueil",
         "published": true, "is_root": true,
         "published_at": "2024-01-15T10:30:00Z", "updated_at": "2024-01-15T10:30:00Z"},
        {"id": 3, "urlname": "about", "language_code": "en", "title": "About us",
         "published": true, "public_until": "2099-01-01T00:00:00Z",
         "published_at": "2024-01-15T10:30:00Z", "updated_at": "2024-01-15T10:30:00Z"},
        {"id": 4, "urlname": "a-propos", "language_code": "fr", "title": "À propos",
         "published": true,
         "published_at": "2024-01-15T10:30:00Z", "updated_at": "2024-01-15T10:30:00Z"},
        {"id": 5, "urlname": "news", "language_code": "en", "title": "News",
         "published": true, "contains_feed": true,
         "published_at": "2024-01-15T10:30:00Z", "updated_at": "2024-01-15T10:30:00Z"},
        {"id": 6, "urlname": "draft", "language_code": "en", "title": "Draft",
         "published": false, "updated_at": "2024-01-15T10:30:00Z"},
        {"id": 7, "urlname": "members", "language_code": "en", "title": "Members",
         "published": true, "restricted": true,
         "published_at": "2024-01-15T10:30:00Z", "updated_at": "2024-01-15T10:30:00Z"},
        {"id": 8, "urlname": "live", "language_code": "en", "title": "Live",
         "published": true, "cache_page": false,
         "published_at": "2024-01-15T10:30:00Z", "updated_at": "2024-01-15T10:30:00Z"}
    ],
    "translations": [[3, 4]]
}"#;

const SINGLE_LANGUAGE_SITE: &str = r#"{
    "languages": [{"code": "en", "name": "English", "is_default": true}],
    "pages": [
        {"id": 1, "urlname": "about", "language_code": "en", "title": "About",
         "published": true, "public_until": "2099-01-01T00:00:00Z",
         "published_at": "2024-01-15T10:30:00Z", "updated_at": "2024-01-15T10:30:00Z"}
    ]
}"#;

/// Start the server on an ephemeral port and return its base URL
async fn spawn_server(snapshot: &str, default_locale: &str) -> String {
    let (registry, store) = ContentSnapshot::from_json_str(snapshot)
        .expect("valid snapshot")
        .into_parts()
        .expect("valid content");
    let state = Arc::new(AppState::new(registry, default_locale, Arc::new(store)));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, server::router(state))
            .await
            .expect("server");
    });

    format!("http://{}", addr)
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("client")
}

fn location(response: &reqwest::Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

fn cache_control(response: &reqwest::Response) -> &str {
    response
        .headers()
        .get(header::CACHE_CONTROL)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

// ==================== Render Tests ====================

#[tokio::test]
async fn test_single_language_about_renders_public_cacheable() {
    let base = spawn_server(SINGLE_LANGUAGE_SITE, "en").await;

    let response = client().get(format!("{}/about", base)).send().await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let cache = cache_control(&response).to_string();
    assert!(cache.starts_with("max-age="), "got {}", cache);
    assert!(cache.ends_with("public, must-revalidate"), "got {}", cache);
    assert!(response.headers().contains_key(header::ETAG));
    assert_eq!(
        response.headers().get(header::LAST_MODIFIED).unwrap(),
        "Mon, 15 Jan 2024 10:30:00 GMT"
    );
    let body = response.text().await.unwrap();
    assert!(body.contains("<title>About</title>"));
}

#[tokio::test]
async fn test_index_renders_root_page() {
    let base = spawn_server(SITE, "en").await;

    let response = client().get(format!("{}/", base)).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.text().await.unwrap().contains("<title>Home</title>"));

    let response = client().get(format!("{}/fr", base)).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.text().await.unwrap().contains("<title>Accueil</title>"));
}

#[tokio::test]
async fn test_restricted_page_is_private() {
    let base = spawn_server(SITE, "en").await;

    let response = client().get(format!("{}/members", base)).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(cache_control(&response), "max-age=0, private, must-revalidate");
}

#[tokio::test]
async fn test_partial_fetch_omits_layout() {
    let base = spawn_server(SITE, "en").await;

    let body = client()
        .get(format!("{}/about", base))
        .header("X-Requested-With", "XMLHttpRequest")
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(body.starts_with("<main"));
    assert!(!body.contains("<html"));
}

// ==================== Redirect Tests ====================

#[tokio::test]
async fn test_default_locale_prefix_is_stripped() {
    let base = spawn_server(SITE, "en").await;

    let response = client()
        .get(format!("{}/en/about?ref=mail&page=2", base))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(location(&response), "/about?ref=mail&page=2");
}

#[tokio::test]
async fn test_redirects_keep_repeated_query_params() {
    let base = spawn_server(SITE, "en").await;

    let response = client()
        .get(format!("{}/en/about?tag=a&tag=b&ids[]=1&ids[]=2", base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(
        location(&response),
        "/about?tag=a&tag=b&ids%5B%5D=1&ids%5B%5D=2"
    );

    let response = client()
        .get(format!("{}/fr/about?tag=a&tag=b", base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(location(&response), "/fr/a-propos?tag=a&tag=b");
}

#[tokio::test]
async fn test_translation_fallback_redirects_to_localized_slug() {
    let base = spawn_server(SITE, "en").await;

    let response = client().get(format!("{}/fr/about", base)).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(location(&response), "/fr/a-propos");

    let followed = client()
        .get(format!("{}{}", base, location(&response)))
        .send()
        .await
        .unwrap();
    assert_eq!(followed.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_missing_prefix_redirects_when_default_locale_differs() {
    // Requests without a locale bind English, but the system default is French.
    let base = spawn_server(SITE, "fr").await;

    let response = client()
        .get(format!("{}/about?x=1&x=2", base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(location(&response), "/en/about?x=1&x=2");

    let followed = client()
        .get(format!("{}{}", base, location(&response)))
        .send()
        .await
        .unwrap();
    assert_eq!(followed.status(), StatusCode::OK);
}

// ==================== Not Found Tests ====================

#[tokio::test]
async fn test_unpublished_page_is_not_found() {
    let base = spawn_server(SITE, "en").await;

    for path in ["/draft", "/fr/draft", "/draft.rss"] {
        let response = client().get(format!("{}{}", base, path)).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", path);
    }

    // The redundant prefix is stripped before the page is ever looked up.
    let response = client().get(format!("{}/en/draft", base)).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(location(&response), "/draft");
}

#[tokio::test]
async fn test_unknown_locale_is_not_found() {
    let base = spawn_server(SITE, "en").await;

    let response = client().get(format!("{}/xx/about", base)).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_feed_requires_feed_content() {
    let base = spawn_server(SITE, "en").await;

    let response = client().get(format!("{}/about.rss", base)).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(response.text().await.unwrap().contains("<error>Not found</error>"));

    let response = client().get(format!("{}/news.rss", base)).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/rss+xml; charset=utf-8"
    );
    let channel = rss::Channel::read_from(&response.bytes().await.unwrap()[..]).unwrap();
    assert_eq!(channel.title(), "News");
}

#[tokio::test]
async fn test_unsupported_format_is_not_found() {
    let base = spawn_server(SITE, "en").await;

    let response = client().get(format!("{}/about.pdf", base)).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ==================== Freshness Tests ====================

#[tokio::test]
async fn test_conditional_request_is_not_modified() {
    let base = spawn_server(SITE, "en").await;
    let client = client();

    let first = client
        .get(format!("{}/about", base))
        .header(USER_CACHE_KEY_HEADER, "users/1-100")
        .send()
        .await
        .unwrap();
    let etag = first.headers().get(header::ETAG).unwrap().clone();
    let last_modified = first.headers().get(header::LAST_MODIFIED).unwrap().clone();

    let second = client
        .get(format!("{}/about", base))
        .header(USER_CACHE_KEY_HEADER, "users/1-100")
        .header(header::IF_NONE_MATCH, etag.clone())
        .header(header::IF_MODIFIED_SINCE, last_modified.clone())
        .send()
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::NOT_MODIFIED);

    // Another user never gets the first user's cached copy.
    let other_user = client
        .get(format!("{}/about", base))
        .header(USER_CACHE_KEY_HEADER, "users/2-100")
        .header(header::IF_NONE_MATCH, etag.clone())
        .header(header::IF_MODIFIED_SINCE, last_modified.clone())
        .send()
        .await
        .unwrap();
    assert_eq!(other_user.status(), StatusCode::OK);

    // A pending notice disables caching.
    let with_flash = client
        .get(format!("{}/about", base))
        .header(USER_CACHE_KEY_HEADER, "users/1-100")
        .header(header::IF_NONE_MATCH, etag)
        .header(header::IF_MODIFIED_SINCE, last_modified)
        .header(header::COOKIE, "flash=Saved")
        .send()
        .await
        .unwrap();
    assert_eq!(with_flash.status(), StatusCode::OK);
    assert_eq!(cache_control(&with_flash), "no-cache");
}

#[tokio::test]
async fn test_uncached_page_always_renders() {
    let base = spawn_server(SITE, "en").await;

    let response = client()
        .get(format!("{}/live", base))
        .header(header::IF_NONE_MATCH, "*")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(cache_control(&response), "no-cache");
    assert!(!response.headers().contains_key(header::ETAG));
}
