use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::{Query, State, rejection::QueryRejection},
    http::{HeaderMap, Request, StatusCode},
    middleware,
    response::{Html, IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;

use crate::{
    application::{
        blog::{self, BlogService},
        chrome::ChromeService,
        error::HttpError,
        page::{self, RenderSurface},
    },
    domain::tags::TagFilter,
    presentation::views::{BlogSectionPartial, render_not_found_response, render_template},
};

use super::{DATASTAR_REQUEST_HEADER, middleware::trace_requests};

#[derive(Clone)]
pub struct HttpState {
    pub blog: Arc<BlogService>,
    pub chrome: Arc<ChromeService>,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/ui/blog", get(blog_partial))
        .route("/_health", get(health))
        .route(
            "/static/public/{*path}",
            get(crate::infra::assets::serve_public),
        )
        .fallback(fallback_router)
        .with_state(state)
        .layer(middleware::from_fn(trace_requests))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TagQuery {
    tag: Option<String>,
}

impl TagQuery {
    /// A query string axum cannot decode (a repeated `tag`, say) names no tag.
    fn resolve(query: Result<Query<TagQuery>, QueryRejection>) -> Result<TagFilter, String> {
        let Query(query) = query.map_err(|rejection| rejection.body_text())?;
        TagFilter::from_query(query.tag.as_deref()).map_err(|err| err.to_string())
    }
}

async fn index(
    State(state): State<HttpState>,
    query: Result<Query<TagQuery>, QueryRejection>,
) -> Response {
    let tag = match TagQuery::resolve(query) {
        Ok(tag) => tag,
        Err(detail) => return render_not_found_response(state.chrome.load("/"), &detail),
    };

    match page::render_index_html(&state.blog, &state.chrome, tag, RenderSurface::Page) {
        Ok(html) => (StatusCode::OK, Html(html)).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn blog_partial(
    State(state): State<HttpState>,
    headers: HeaderMap,
    query: Result<Query<TagQuery>, QueryRejection>,
) -> Result<Response, HttpError> {
    let tag = TagQuery::resolve(query).map_err(|detail| {
        HttpError::new(
            "infra::http::blog_partial",
            StatusCode::NOT_FOUND,
            "Unknown tag",
            detail,
        )
    })?;
    let section = state.blog.section(tag);

    if headers.contains_key(DATASTAR_REQUEST_HEADER) {
        let response = blog::build_datastar_select_response(&section)?;
        RenderSurface::Sse.record();
        return Ok(response);
    }

    let html = render_template(BlogSectionPartial { content: &section })?;
    RenderSurface::Partial.record();
    Ok((StatusCode::OK, html).into_response())
}

async fn health() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn fallback_router(State(state): State<HttpState>, request: Request<Body>) -> Response {
    let detail = format!("no route for `{}`", request.uri().path());
    render_not_found_response(state.chrome.load("/"), &detail)
}
