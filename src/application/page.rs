//! Full-page assembly of the blog index for the HTTP and CLI surfaces.

use askama::Template;
use metrics::counter;

use crate::application::blog::{BlogService, index_path};
use crate::application::chrome::ChromeService;
use crate::application::error::HttpError;
use crate::domain::tags::TagFilter;
use crate::presentation::views::{IndexTemplate, LayoutContext, TemplateRenderError};

/// Where a blog section render ends up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderSurface {
    Page,
    Partial,
    Sse,
    Cli,
}

impl RenderSurface {
    pub const fn as_str(self) -> &'static str {
        match self {
            RenderSurface::Page => "page",
            RenderSurface::Partial => "partial",
            RenderSurface::Sse => "sse",
            RenderSurface::Cli => "cli",
        }
    }

    pub fn record(self) {
        counter!("postgrid_blog_render_total", "surface" => self.as_str()).increment(1);
    }
}

pub fn index_template(
    blog: &BlogService,
    chrome: &ChromeService,
    tag: TagFilter,
) -> Result<IndexTemplate, HttpError> {
    let section = blog.section(tag);
    let view = LayoutContext::new(chrome.load(&index_path(tag)), section);
    IndexTemplate::new(view)
}

/// Render the complete index document for `tag`.
pub fn render_index_html(
    blog: &BlogService,
    chrome: &ChromeService,
    tag: TagFilter,
    surface: RenderSurface,
) -> Result<String, HttpError> {
    let html = render_template(index_template(blog, chrome, tag)?)?;
    surface.record();
    Ok(html)
}

/// Render a self-contained document for `tag`: the stylesheet is inlined and
/// tag buttons are plain links, so the file works without the server.
pub fn render_standalone_html(
    blog: &BlogService,
    chrome: &ChromeService,
    tag: TagFilter,
    stylesheet: &str,
) -> Result<String, HttpError> {
    let mut section = blog.section(tag);
    section.interactive = false;
    let layout = chrome
        .load(&index_path(tag))
        .with_inline_stylesheet(stylesheet);
    let html = render_template(IndexTemplate::new(LayoutContext::new(layout, section))?)?;
    RenderSurface::Cli.record();
    Ok(html)
}

fn render_template(template: IndexTemplate) -> Result<String, HttpError> {
    template.render().map_err(|err| {
        HttpError::from(TemplateRenderError::new(
            "application::page::render_index_html",
            "Template rendering failed",
            err,
        ))
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use url::Url;

    use crate::application::chrome::SiteIdentity;
    use crate::application::store::{PostSource, PostStore};
    use crate::domain::posts::fixtures::post;
    use crate::util::timezone::DateDisplay;

    use super::*;

    fn services() -> (BlogService, ChromeService) {
        let source: Arc<dyn PostSource> = Arc::new(
            PostStore::from_posts(vec![
                post("alpha", &["tech"]),
                post("beta", &["thought", "tech"]),
            ])
            .expect("valid fixtures"),
        );
        let public_url = Url::parse("https://example.com/").expect("valid url");
        let blog = BlogService::new(
            source,
            DateDisplay::default(),
            "Blog",
            "Notes",
            public_url.clone(),
        );
        let chrome = ChromeService::new(SiteIdentity {
            title: "Blog".to_string(),
            description: "Notes".to_string(),
            public_url,
        });
        (blog, chrome)
    }

    #[test]
    fn page_embeds_section_and_canonical() {
        let (blog, chrome) = services();
        let html = render_index_html(&blog, &chrome, TagFilter::Thought, RenderSurface::Cli)
            .expect("rendered");

        assert!(html.contains(r#"id="blog""#));
        assert!(html.contains(r#"<link rel="canonical" href="https://example.com/?tag=thought">"#));
        assert!(html.contains("application/ld+json"));
        assert!(html.contains("#blog/beta"));
        assert!(!html.contains("#blog/alpha"));
    }

    #[test]
    fn served_page_links_assets_and_wires_tag_buttons() {
        let (blog, chrome) = services();
        let html = render_index_html(&blog, &chrome, TagFilter::All, RenderSurface::Page)
            .expect("rendered");

        assert!(html.contains("/static/public/blog.css"));
        assert!(html.contains("datastar"));
        assert!(html.contains("data-on:click__prevent"));
        assert!(!html.contains("<style>"));
    }

    #[test]
    fn standalone_page_needs_no_server() {
        let (blog, chrome) = services();
        let html = render_standalone_html(&blog, &chrome, TagFilter::Tech, ".blog { color: red; }")
            .expect("rendered");

        assert!(html.contains("<style>.blog { color: red; }</style>"));
        assert!(!html.contains("/static/public/blog.css"));
        assert!(!html.contains("datastar"));
        assert!(!html.contains("data-on:click"));
        assert!(!html.contains("/ui/blog"));
        assert!(html.contains(r#"href="/?tag=thought#blog""#));
        assert!(html.contains("#blog/alpha"));
    }
}
