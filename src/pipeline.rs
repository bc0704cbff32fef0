//! Request resolution state machine.
//!
//! A request walks these states strictly in order, and any of them may end
//! it early:
//!
//! 1. `BindLanguage`: unknown locale is a 404
//! 2. `StripPrefix`: redundant locale prefix redirects
//! 3. `LookupPage`: a translation found in another locale redirects
//! 4. `Publication`: missing or unpublished page is a 404
//! 5. `AddPrefix`: missing locale prefix redirects
//! 6. `BindRoot`
//! 7. `Authorize`
//! 8. `Freshness`: 304, or render with cache headers
//!
//! No state runs before the one above it has passed, so canonical URLs and
//! cache headers are only ever computed for a public page.

use crate::canonical::{build_path, CanonicalizationPolicy, LocalePrefix};
use crate::error::{NotFoundReason, PipelineError};
use crate::freshness::{CacheHeaders, ConditionalHeaders, FreshnessEvaluator, Requester};
use crate::i18n::{Language, LanguageRegistry, LocalePolicy, LocaleResolver};
use crate::lookup::PageLookup;
use crate::page::{Page, PublicationGate};
use crate::store::PageStore;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

/// Decides whether the requester may see a page.
pub trait Authorizer: Send + Sync {
    fn authorize_show(&self, page: &Page, requester: &Requester) -> bool;
}

/// Lets everyone see every public page.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl Authorizer for AllowAll {
    fn authorize_show(&self, _page: &Page, _requester: &Requester) -> bool {
        true
    }
}

/// Everything the serving layer extracts from an incoming request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestParams {
    pub locale: Option<String>,
    /// `None` for the index (home page) request
    pub urlname: Option<String>,
    /// File extension of the request, "html" when absent
    pub format: String,
    /// XHR-style fetch; the page is rendered without its layout
    pub partial: bool,
    /// Query parameters in request order, kept on redirects
    pub extra: Vec<(String, String)>,
    pub conditional: ConditionalHeaders,
    pub requester: Requester,
    /// A one-shot notice is waiting to be shown; disables caching
    pub pending_notice: bool,
    pub now: DateTime<Utc>,
}

impl RequestParams {
    pub fn index(now: DateTime<Utc>) -> Self {
        Self {
            locale: None,
            urlname: None,
            format: "html".to_string(),
            partial: false,
            extra: Vec::new(),
            conditional: ConditionalHeaders::default(),
            requester: Requester::anonymous(),
            pending_notice: false,
            now,
        }
    }

    pub fn show(urlname: &str, now: DateTime<Utc>) -> Self {
        Self {
            urlname: Some(urlname.to_string()),
            ..Self::index(now)
        }
    }

    pub fn with_locale(mut self, locale: &str) -> Self {
        self.locale = Some(locale.to_string());
        self
    }

    pub fn with_format(mut self, format: &str) -> Self {
        self.format = format.to_string();
        self
    }

    pub fn with_param(mut self, key: &str, value: &str) -> Self {
        self.extra.push((key.to_string(), value.to_string()));
        self
    }

    fn path(&self) -> String {
        build_path(
            self.locale.as_deref(),
            self.urlname.as_deref(),
            &[],
        )
    }
}

/// Per-request state, owned by the handling task.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub params: RequestParams,
    pub language: Option<Language>,
    pub page: Option<Page>,
    pub root_page: Option<Page>,
}

impl RequestContext {
    fn new(params: RequestParams) -> Self {
        Self {
            params,
            language: None,
            page: None,
            root_page: None,
        }
    }
}

/// How the page body should be produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderFormat {
    Html { with_layout: bool },
    Feed,
}

/// A confirmed public page ready for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderPlan {
    pub page: Page,
    pub root_page: Option<Page>,
    pub language: Language,
    pub format: RenderFormat,
    pub headers: CacheHeaders,
}

/// Terminal result of resolving one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionOutcome {
    /// 301 Moved Permanently
    Redirect { location: String },
    NotFound(NotFoundReason),
    NotModified(CacheHeaders),
    Render(Box<RenderPlan>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    BindLanguage,
    StripPrefix,
    LookupPage,
    Publication,
    AddPrefix,
    BindRoot,
    Authorize,
    Freshness,
}

enum Transition {
    Next(State),
    Done(ResolutionOutcome),
}

impl From<NotFoundReason> for Transition {
    fn from(reason: NotFoundReason) -> Self {
        Transition::Done(ResolutionOutcome::NotFound(reason))
    }
}

pub struct RequestPipeline<'a, S: PageStore + ?Sized> {
    registry: &'a LanguageRegistry,
    policy: &'a LocalePolicy,
    store: &'a S,
    authorizer: &'a dyn Authorizer,
}

impl<'a, S: PageStore + ?Sized> RequestPipeline<'a, S> {
    pub fn new(
        registry: &'a LanguageRegistry,
        policy: &'a LocalePolicy,
        store: &'a S,
        authorizer: &'a dyn Authorizer,
    ) -> Self {
        Self {
            registry,
            policy,
            store,
            authorizer,
        }
    }

    /// Resolve a request to exactly one outcome.
    pub fn resolve(&self, params: RequestParams) -> Result<ResolutionOutcome, PipelineError> {
        let mut ctx = RequestContext::new(params);
        let mut state = State::BindLanguage;

        loop {
            debug!("Resolving {} at {:?}", ctx.params.path(), state);
            match self.step(&mut ctx, state)? {
                Transition::Next(next) => state = next,
                Transition::Done(outcome) => {
                    log_outcome(&ctx, &outcome);
                    return Ok(outcome);
                }
            }
        }
    }

    fn step(&self, ctx: &mut RequestContext, state: State) -> Result<Transition, PipelineError> {
        match state {
            State::BindLanguage => Ok(self.bind_language(ctx)),
            State::StripPrefix => Ok(self.strip_prefix(ctx)),
            State::LookupPage => self.lookup_page(ctx),
            State::Publication => Ok(self.publication(ctx)),
            State::AddPrefix => Ok(self.add_prefix(ctx)),
            State::BindRoot => self.bind_root(ctx),
            State::Authorize => self.authorize(ctx),
            State::Freshness => Ok(self.freshness(ctx)),
        }
    }

    fn canonical(&self) -> CanonicalizationPolicy<'a> {
        CanonicalizationPolicy::new(self.policy)
    }

    fn bind_language(&self, ctx: &mut RequestContext) -> Transition {
        match LocaleResolver::new(self.registry).resolve(ctx.params.locale.as_deref()) {
            Ok(language) => {
                ctx.language = Some(language);
                Transition::Next(State::StripPrefix)
            }
            Err(reason) => reason.into(),
        }
    }

    fn strip_prefix(&self, ctx: &mut RequestContext) -> Transition {
        let params = &ctx.params;
        match self.canonical().strip_disallowed_prefix(
            params.locale.as_deref(),
            params.urlname.as_deref(),
            &params.extra,
        ) {
            Some(location) => Transition::Done(ResolutionOutcome::Redirect { location }),
            None => Transition::Next(State::LookupPage),
        }
    }

    fn lookup_page(&self, ctx: &mut RequestContext) -> Result<Transition, PipelineError> {
        let Some(language) = ctx.language.as_ref() else {
            return Ok(NotFoundReason::PageNotFound {
                path: ctx.params.path(),
            }
            .into());
        };
        let lookup = PageLookup::new(self.store);

        let Some(urlname) = ctx.params.urlname.as_deref() else {
            ctx.page = lookup.find_root_page(language)?;
            return Ok(Transition::Next(State::Publication));
        };

        ctx.page = lookup.find_by_urlname(language, urlname, ctx.params.locale.as_deref())?;
        if ctx.page.is_some() {
            return Ok(Transition::Next(State::Publication));
        }

        if let Some(sibling) = lookup.find_translation_across_locales(urlname, language.code())? {
            let location = self.canonical().page_url(
                &sibling,
                Some(&sibling.urlname),
                LocalePrefix::Auto,
                &ctx.params.extra,
            );
            return Ok(Transition::Done(ResolutionOutcome::Redirect { location }));
        }

        Ok(Transition::Next(State::Publication))
    }

    fn publication(&self, ctx: &mut RequestContext) -> Transition {
        match PublicationGate::admit(ctx.page.take(), &ctx.params.path()) {
            Ok(page) => {
                ctx.page = Some(page);
                Transition::Next(State::AddPrefix)
            }
            Err(reason) => reason.into(),
        }
    }

    fn add_prefix(&self, ctx: &mut RequestContext) -> Transition {
        let Some(page) = ctx.page.as_ref() else {
            return NotFoundReason::PageNotFound {
                path: ctx.params.path(),
            }
            .into();
        };
        let params = &ctx.params;
        match self.canonical().add_missing_prefix(
            params.locale.as_deref(),
            page,
            params.urlname.as_deref(),
            &params.extra,
        ) {
            Some(location) => Transition::Done(ResolutionOutcome::Redirect { location }),
            None => Transition::Next(State::BindRoot),
        }
    }

    fn bind_root(&self, ctx: &mut RequestContext) -> Result<Transition, PipelineError> {
        if let Some(language) = ctx.language.as_ref() {
            ctx.root_page = PageLookup::new(self.store).find_root_page(language)?;
        }
        Ok(Transition::Next(State::Authorize))
    }

    fn authorize(&self, ctx: &mut RequestContext) -> Result<Transition, PipelineError> {
        if let Some(page) = ctx.page.as_ref() {
            if !self.authorizer.authorize_show(page, &ctx.params.requester) {
                return Err(PipelineError::AccessDenied { page_id: page.id });
            }
        }
        Ok(Transition::Next(State::Freshness))
    }

    fn freshness(&self, ctx: &mut RequestContext) -> Transition {
        let (Some(page), Some(language)) = (ctx.page.take(), ctx.language.clone()) else {
            return NotFoundReason::PageNotFound {
                path: ctx.params.path(),
            }
            .into();
        };
        let params = &ctx.params;

        let freshness = FreshnessEvaluator::evaluate(
            &page,
            &params.requester,
            params.pending_notice,
            &params.conditional,
            params.now,
        );
        let headers = freshness.headers().clone();
        if !freshness.should_render() {
            return Transition::Done(ResolutionOutcome::NotModified(headers));
        }

        let format = match params.format.as_str() {
            "html" => RenderFormat::Html {
                with_layout: !params.partial,
            },
            "rss" if page.contains_feed => RenderFormat::Feed,
            "rss" => return NotFoundReason::FeedUnavailable { page_id: page.id }.into(),
            other => {
                return NotFoundReason::UnsupportedFormat {
                    format: other.to_string(),
                }
                .into()
            }
        };

        Transition::Done(ResolutionOutcome::Render(Box::new(RenderPlan {
            page,
            root_page: ctx.root_page.take(),
            language,
            format,
            headers,
        })))
    }
}

fn log_outcome(ctx: &RequestContext, outcome: &ResolutionOutcome) {
    let path = ctx.params.path();
    match outcome {
        ResolutionOutcome::Redirect { location } => {
            info!("Redirecting {} -> {} (301)", path, location)
        }
        ResolutionOutcome::NotFound(reason) => debug!("Not found {}: {}", path, reason),
        ResolutionOutcome::NotModified(_) => debug!("Not modified {}", path),
        ResolutionOutcome::Render(plan) => {
            debug!("Rendering page {} for {}", plan.page.id, path)
        }
    }
}
