//! HTTP serving layer: turns requests into [`RequestParams`] and
//! resolution outcomes into responses.

use crate::canonical::{CanonicalizationPolicy, LocalePrefix};
use crate::error::{NotFoundReason, PipelineError};
use crate::freshness::{CacheHeaders, ConditionalHeaders, Requester};
use crate::i18n::{LanguageRegistry, LocalePolicy};
use crate::pipeline::{
    AllowAll, Authorizer, RenderFormat, RenderPlan, RequestParams, RequestPipeline,
    ResolutionOutcome,
};
use crate::render::{BasicRenderer, PageRenderer};
use crate::store::PageStore;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use chrono::Utc;
use regex::Regex;
use std::sync::{Arc, OnceLock};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

/// Header carrying the signed-in user's cache fingerprint, set by the
/// authenticating proxy in front of this service.
pub const USER_CACHE_KEY_HEADER: &str = "x-user-cache-key";

/// Cookie holding a one-shot notice for the next page view.
pub const FLASH_COOKIE: &str = "flash";

/// Shared, read-only state for all request handlers.
pub struct AppState {
    pub registry: LanguageRegistry,
    pub policy: LocalePolicy,
    pub store: Arc<dyn PageStore>,
    pub authorizer: Arc<dyn Authorizer>,
    pub renderer: Arc<dyn PageRenderer>,
}

impl AppState {
    /// State with the bundled renderer and no access restrictions.
    pub fn new(registry: LanguageRegistry, default_locale: &str, store: Arc<dyn PageStore>) -> Self {
        Self {
            policy: LocalePolicy::for_registry(default_locale, &registry),
            registry,
            store,
            authorizer: Arc::new(AllowAll),
            renderer: Arc::new(BasicRenderer),
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(show_page))
        .route("/*path", get(show_page))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Locale, urlname and format taken from a request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutedPath {
    pub locale: Option<String>,
    pub urlname: Option<String>,
    pub format: String,
}

fn locale_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-z]{2}(-[a-zA-Z]{2})?$").expect("valid locale regex"))
}

/// Split `(/:locale)(/*urlname)(.:format)`.
///
/// A leading segment shaped like a locale code is always taken as the
/// locale, so two-letter urlnames need a parent segment.
pub fn parse_route(path: &str) -> RoutedPath {
    let mut segments: Vec<String> = path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            urlencoding::decode(segment)
                .map(|decoded| decoded.into_owned())
                .unwrap_or_else(|_| segment.to_string())
        })
        .collect();

    let mut format = "html".to_string();
    if let Some(last) = segments.last_mut() {
        if let Some((stem, ext)) = last.rsplit_once('.') {
            if !stem.is_empty() && !ext.is_empty() {
                format = ext.to_ascii_lowercase();
                *last = stem.to_string();
            }
        }
    }

    let locale = match segments.first() {
        Some(first) if locale_pattern().is_match(first) => Some(segments.remove(0)),
        _ => None,
    };

    RoutedPath {
        locale,
        urlname: if segments.is_empty() {
            None
        } else {
            Some(segments.join("/"))
        },
        format,
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: impl header::AsHeaderName) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn has_flash(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|cookie| cookie.trim().split_once('='))
        .any(|(name, value)| name == FLASH_COOKIE && !value.is_empty())
}

/// Build pipeline input from the request parts.
pub fn request_params(
    uri: &Uri,
    query: Vec<(String, String)>,
    headers: &HeaderMap,
) -> RequestParams {
    let route = parse_route(uri.path());

    RequestParams {
        locale: route.locale,
        urlname: route.urlname,
        format: route.format,
        partial: header_str(headers, "x-requested-with")
            .map(|value| value.eq_ignore_ascii_case("XMLHttpRequest"))
            .unwrap_or(false),
        extra: query,
        conditional: ConditionalHeaders {
            if_none_match: header_str(headers, header::IF_NONE_MATCH).map(str::to_string),
            if_modified_since: header_str(headers, header::IF_MODIFIED_SINCE).map(str::to_string),
        },
        requester: Requester {
            cache_key: header_str(headers, USER_CACHE_KEY_HEADER).map(str::to_string),
        },
        pending_notice: has_flash(headers),
        now: Utc::now(),
    }
}

async fn show_page(
    State(state): State<Arc<AppState>>,
    uri: Uri,
    Query(query): Query<Vec<(String, String)>>,
    headers: HeaderMap,
) -> Response {
    let params = request_params(&uri, query, &headers);
    let format = params.format.clone();

    let pipeline = RequestPipeline::new(
        &state.registry,
        &state.policy,
        state.store.as_ref(),
        state.authorizer.as_ref(),
    );

    match pipeline.resolve(params) {
        Ok(outcome) => respond(&state, outcome, &format),
        Err(PipelineError::AccessDenied { page_id }) => {
            warn!("Access denied to page {} at {}", page_id, uri.path());
            (StatusCode::FORBIDDEN, "Forbidden").into_response()
        }
        Err(e) => {
            error!("Failed to resolve {}: {}", uri.path(), e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
        }
    }
}

fn respond(state: &AppState, outcome: ResolutionOutcome, format: &str) -> Response {
    match outcome {
        ResolutionOutcome::Redirect { location } => match HeaderValue::from_str(&location) {
            Ok(location) => {
                (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, location)]).into_response()
            }
            Err(e) => {
                error!("Invalid redirect location {}: {}", location, e);
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        },
        ResolutionOutcome::NotFound(reason) => not_found(&reason, format),
        ResolutionOutcome::NotModified(headers) => {
            let mut response = StatusCode::NOT_MODIFIED.into_response();
            apply_cache_headers(response.headers_mut(), &headers);
            response
        }
        ResolutionOutcome::Render(plan) => render(state, &plan),
    }
}

fn not_found(reason: &NotFoundReason, format: &str) -> Response {
    if format == "rss" || matches!(reason, NotFoundReason::FeedUnavailable { .. }) {
        (
            StatusCode::NOT_FOUND,
            [(header::CONTENT_TYPE, "application/xml; charset=utf-8")],
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<hash><error>Not found</error></hash>",
        )
            .into_response()
    } else {
        (StatusCode::NOT_FOUND, "Not found").into_response()
    }
}

fn render(state: &AppState, plan: &RenderPlan) -> Response {
    let (content_type, body) = match plan.format {
        RenderFormat::Html { .. } => (
            "text/html; charset=utf-8",
            state.renderer.render_html(plan),
        ),
        RenderFormat::Feed => {
            let url = CanonicalizationPolicy::new(&state.policy).page_url(
                &plan.page,
                Some(&plan.page.urlname),
                LocalePrefix::Auto,
                &[],
            );
            (
                "application/rss+xml; charset=utf-8",
                state.renderer.render_feed(plan, &url),
            )
        }
    };

    let mut response = (StatusCode::OK, body).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    apply_cache_headers(headers, &plan.headers);
    response
}

fn apply_cache_headers(headers: &mut HeaderMap, cache: &CacheHeaders) {
    let values: [(HeaderName, Option<String>); 3] = [
        (header::CACHE_CONTROL, Some(cache.cache_control.header_value())),
        (header::ETAG, cache.etag.clone()),
        (header::LAST_MODIFIED, cache.last_modified_header()),
    ];

    for (name, value) in values {
        let Some(value) = value else { continue };
        match HeaderValue::from_str(&value) {
            Ok(value) => {
                headers.insert(name, value);
            }
            Err(e) => warn!("Skipping invalid {} header: {}", name.as_str(), e),
        }
    }
}
