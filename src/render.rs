//! Minimal page rendering used by the bundled server.
//!
//! Real sites plug in their own templates through [`PageRenderer`].

use crate::pipeline::{RenderFormat, RenderPlan};
use maud::{html, Markup, DOCTYPE};

/// Produces response bodies for resolved pages.
pub trait PageRenderer: Send + Sync {
    fn render_html(&self, plan: &RenderPlan) -> String;

    /// RSS document for a page with feed content. `url` is the page's
    /// absolute or site-relative address.
    fn render_feed(&self, plan: &RenderPlan, url: &str) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BasicRenderer;

impl PageRenderer for BasicRenderer {
    fn render_html(&self, plan: &RenderPlan) -> String {
        let main = page_main(plan);

        if !matches!(plan.format, RenderFormat::Html { with_layout: true }) {
            return main.into_string();
        }

        let page = &plan.page;
        html! {
            (DOCTYPE)
            html lang=(plan.language.code()) {
                head {
                    meta charset="utf-8";
                    title { (page.title) }
                }
                body {
                    @if let Some(root) = &plan.root_page {
                        nav { a href="/" { (root.title) } }
                    }
                    (main)
                }
            }
        }
        .into_string()
    }

    fn render_feed(&self, plan: &RenderPlan, url: &str) -> String {
        let page = &plan.page;
        let item = rss::ItemBuilder::default()
            .title(Some(page.title.clone()))
            .link(Some(url.to_string()))
            .description(Some(page.body.clone()))
            .pub_date(page.published_at.map(|at| at.to_rfc2822()))
            .guid(Some(
                rss::GuidBuilder::default()
                    .value(page.cache_version())
                    .permalink(false)
                    .build(),
            ))
            .build();

        rss::ChannelBuilder::default()
            .title(page.title.clone())
            .link(url.to_string())
            .description(page.title.clone())
            .language(Some(plan.language.code().to_string()))
            .last_build_date(page.published_at.map(|at| at.to_rfc2822()))
            .items(vec![item])
            .build()
            .to_string()
    }
}

/// Page content without the surrounding layout.
fn page_main(plan: &RenderPlan) -> Markup {
    let page = &plan.page;
    html! {
        main data-page-id=(page.id) {
            h1 { (page.title) }
            (page.body)
        }
    }
}
