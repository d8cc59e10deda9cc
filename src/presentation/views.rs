use crate::application::error::{ErrorReport, HttpError};
use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(chrome: LayoutChrome, detail: &str) -> Response {
    let view = LayoutContext::new(chrome, ErrorPageView::not_found());
    let mut response = render_template_response(ErrorTemplate { view }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        detail,
    )
    .attach(&mut response);
    response
}

#[derive(Clone)]
pub struct BrandView {
    pub title: String,
    pub href: String,
}

#[derive(Clone)]
pub struct PageMetaView {
    pub title: String,
    pub description: String,
    pub canonical: String,
}

#[derive(Clone)]
pub struct LayoutChrome {
    pub brand: BrandView,
    pub meta: PageMetaView,
    /// Stylesheet embedded in the page instead of linked; also drops the datastar runtime.
    pub inline_stylesheet: Option<String>,
}

impl LayoutChrome {
    pub fn with_inline_stylesheet(mut self, css: impl Into<String>) -> Self {
        self.inline_stylesheet = Some(css.into());
        self
    }
}

#[derive(Clone)]
pub struct LayoutContext<T> {
    pub brand: BrandView,
    pub meta: PageMetaView,
    pub inline_stylesheet: Option<String>,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(chrome: LayoutChrome, content: T) -> Self {
        Self {
            brand: chrome.brand,
            meta: chrome.meta,
            inline_stylesheet: chrome.inline_stylesheet,
            content,
        }
    }
}

/// One control of the tag selector.
#[derive(Clone)]
pub struct TagButtonView {
    pub value: &'static str,
    pub label: String,
    pub is_active: bool,
    /// Full-page fallback link.
    pub href: String,
    /// Datastar partial endpoint.
    pub ui_href: String,
}

#[derive(Clone)]
pub struct PostCardView {
    pub id: String,
    pub title: String,
    pub excerpt: String,
    pub image: String,
    pub author_name: String,
    pub author_avatar: String,
    pub published: String,
    pub iso_date: String,
    pub read_time: String,
    pub badges: Vec<String>,
    pub read_more_href: String,
}

#[derive(Clone)]
pub struct BlogSectionContext {
    pub anchor: &'static str,
    pub heading: String,
    pub intro: String,
    pub active_tag: &'static str,
    pub tags: Vec<TagButtonView>,
    pub posts: Vec<PostCardView>,
    pub post_count: usize,
    pub has_results: bool,
    pub posts_ld_json: Option<String>,
    /// Whether tag buttons carry datastar handlers.
    pub interactive: bool,
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub view: LayoutContext<BlogSectionContext>,
    pub section_html: String,
}

impl IndexTemplate {
    /// Pre-renders the blog section so the page and the partial share one markup source.
    pub fn new(view: LayoutContext<BlogSectionContext>) -> Result<Self, HttpError> {
        let section_html = BlogSectionPartial {
            content: &view.content,
        }
        .render()
        .map_err(|err| {
            HttpError::from(TemplateRenderError::new(
                "presentation::views::IndexTemplate::new",
                "Template rendering failed",
                err,
            ))
        })?;
        Ok(Self { view, section_html })
    }
}

#[derive(Template)]
#[template(path = "partials/blog_section.html")]
pub struct BlogSectionPartial<'a> {
    pub content: &'a BlogSectionContext,
}

#[derive(Template)]
#[template(path = "partials/tag_bar.html")]
pub struct TagBarPartial<'a> {
    pub content: &'a BlogSectionContext,
}

#[derive(Template)]
#[template(path = "partials/post_grid.html")]
pub struct PostGridPartial<'a> {
    pub content: &'a BlogSectionContext,
}

pub struct ErrorPageView {
    pub title: String,
    pub message: String,
    pub primary_action: Option<ErrorAction>,
}

impl ErrorPageView {
    pub fn not_found() -> Self {
        Self {
            title: "Page Not Found".to_string(),
            message: "The page you requested does not exist. Try returning to the blog to continue exploring.".to_string(),
            primary_action: Some(ErrorAction::home()),
        }
    }
}

pub struct ErrorAction {
    pub href: String,
    pub label: String,
}

impl ErrorAction {
    pub fn home() -> Self {
        Self {
            href: "/#blog".to_string(),
            label: "Back to the blog".to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub view: LayoutContext<ErrorPageView>,
}
