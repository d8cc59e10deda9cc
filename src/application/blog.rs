//! Blog index state: the active tag, its memoized filter, and the view model.

use std::{
    convert::Infallible,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use askama::Template;
use async_stream::stream;
use axum::response::{
    IntoResponse, Response,
    sse::{Event, Sse},
};
use datastar::prelude::{ElementPatchMode, ExecuteScript, PatchElements, PatchSignals};
use metrics::counter;
use once_cell::sync::OnceCell;
use serde_json::json;
use tracing::debug;
use url::Url;

use crate::application::chrome::canonical_url;
use crate::application::error::HttpError;
use crate::application::store::PostSource;
use crate::domain::posts::{self, Post};
use crate::domain::tags::TagFilter;
use crate::presentation::views::{
    BlogSectionContext, PostCardView, PostGridPartial, TagBarPartial, TagButtonView,
    TemplateRenderError,
};
use crate::util::timezone::DateDisplay;

pub const BLOG_ANCHOR: &str = "blog";
pub const TAG_BAR_SELECTOR: &str = "#blog-tags";
pub const POST_GRID_SELECTOR: &str = "#blog-grid";

/// Per-tag filter results over one post source.
///
/// Each slot is computed at most once; the source is immutable, so the tag
/// is the only input the result depends on.
pub struct FilterMemo {
    source: Arc<dyn PostSource>,
    slots: [OnceCell<Arc<[usize]>>; 6],
    computations: AtomicUsize,
}

impl FilterMemo {
    pub fn new(source: Arc<dyn PostSource>) -> Self {
        Self {
            source,
            slots: Default::default(),
            computations: AtomicUsize::new(0),
        }
    }

    pub fn posts(&self) -> &[Post] {
        self.source.posts()
    }

    /// Indices into [`FilterMemo::posts`] visible under `tag`.
    pub fn visible(&self, tag: TagFilter) -> Arc<[usize]> {
        self.slots[tag.ordinal()]
            .get_or_init(|| {
                self.computations.fetch_add(1, Ordering::Relaxed);
                counter!("postgrid_filter_compute_total", "tag" => tag.as_str()).increment(1);
                let indices = posts::filter_indices(self.source.posts(), tag);
                debug!(
                    target = "postgrid::blog",
                    tag = tag.as_str(),
                    visible = indices.len(),
                    "Computed tag filter"
                );
                indices.into()
            })
            .clone()
    }

    /// Number of filter evaluations performed so far.
    pub fn computations(&self) -> usize {
        self.computations.load(Ordering::Relaxed)
    }
}

/// One instance of the blog index with its selected tag.
#[derive(Clone)]
pub struct BlogView {
    memo: Arc<FilterMemo>,
    active: TagFilter,
    visible: Arc<[usize]>,
}

impl BlogView {
    pub fn new(source: Arc<dyn PostSource>) -> Self {
        Self::with_memo(Arc::new(FilterMemo::new(source)), TagFilter::All)
    }

    pub fn with_memo(memo: Arc<FilterMemo>, active: TagFilter) -> Self {
        let visible = memo.visible(active);
        Self {
            memo,
            active,
            visible,
        }
    }

    pub fn active(&self) -> TagFilter {
        self.active
    }

    /// Make `tag` the active filter. Returns `false` when it already was.
    pub fn select(&mut self, tag: TagFilter) -> bool {
        if tag == self.active {
            return false;
        }
        self.active = tag;
        self.visible = self.memo.visible(tag);
        true
    }

    pub fn visible_posts(&self) -> impl Iterator<Item = &Post> + '_ {
        let posts = self.memo.posts();
        self.visible.iter().filter_map(move |&index| posts.get(index))
    }

    pub fn visible_count(&self) -> usize {
        self.visible.len()
    }

    pub fn memo(&self) -> &Arc<FilterMemo> {
        &self.memo
    }
}

/// Builds blog section view models for the HTTP and CLI surfaces.
#[derive(Clone)]
pub struct BlogService {
    memo: Arc<FilterMemo>,
    dates: DateDisplay,
    heading: String,
    intro: String,
    public_url: Url,
}

impl BlogService {
    pub fn new(
        source: Arc<dyn PostSource>,
        dates: DateDisplay,
        heading: impl Into<String>,
        intro: impl Into<String>,
        public_url: Url,
    ) -> Self {
        Self {
            memo: Arc::new(FilterMemo::new(source)),
            dates,
            heading: heading.into(),
            intro: intro.into(),
            public_url,
        }
    }

    pub fn view(&self, tag: TagFilter) -> BlogView {
        BlogView::with_memo(self.memo.clone(), tag)
    }

    pub fn memo(&self) -> &Arc<FilterMemo> {
        &self.memo
    }

    pub fn section(&self, tag: TagFilter) -> BlogSectionContext {
        self.section_for(&self.view(tag))
    }

    pub fn section_for(&self, view: &BlogView) -> BlogSectionContext {
        let active = view.active();
        let cards = view
            .visible_posts()
            .map(|post| post_to_card(post, &self.dates))
            .collect::<Vec<_>>();
        let posts_ld_json = build_posts_ld_json(&cards, &self.blog_url(active), &self.heading);
        let post_count = cards.len();

        BlogSectionContext {
            anchor: BLOG_ANCHOR,
            heading: self.heading.clone(),
            intro: self.intro.clone(),
            active_tag: active.as_str(),
            tags: build_tag_buttons(active),
            posts: cards,
            post_count,
            has_results: post_count > 0,
            posts_ld_json,
            interactive: true,
        }
    }

    /// Absolute URL of the index filtered by `tag`.
    pub fn blog_url(&self, tag: TagFilter) -> String {
        canonical_url(&self.public_url, &index_path(tag))
    }
}

pub fn build_tag_buttons(active: TagFilter) -> Vec<TagButtonView> {
    TagFilter::CATALOG
        .into_iter()
        .map(|tag| TagButtonView {
            value: tag.as_str(),
            label: tag.label(),
            is_active: tag == active,
            href: format!("{}#{BLOG_ANCHOR}", index_path(tag)),
            ui_href: ui_href(tag),
        })
        .collect()
}

/// Site-relative path of the index filtered by `tag`; every tag link derives from it.
pub fn index_path(tag: TagFilter) -> String {
    if tag.is_all() {
        "/".to_string()
    } else {
        format!("/?tag={}", tag.as_str())
    }
}

fn ui_href(tag: TagFilter) -> String {
    format!("/ui/blog?tag={}", tag.as_str())
}

pub fn read_more_href(post: &Post) -> String {
    format!("#{BLOG_ANCHOR}/{}", post.id)
}

fn post_to_card(post: &Post, dates: &DateDisplay) -> PostCardView {
    PostCardView {
        id: post.id.to_string(),
        title: post.title.clone(),
        excerpt: post.excerpt.clone(),
        image: post.image.clone(),
        author_name: post.author.name.clone(),
        author_avatar: post.author.avatar.clone(),
        published: dates.format(post.date),
        iso_date: dates.iso(post.date),
        read_time: post.read_time.clone(),
        badges: post.tags.clone(),
        read_more_href: read_more_href(post),
    }
}

fn build_posts_ld_json(cards: &[PostCardView], blog_url: &str, blog_name: &str) -> Option<String> {
    if cards.is_empty() {
        return None;
    }

    let blog_posts = cards
        .iter()
        .map(|card| {
            json!({
                "@type": "BlogPosting",
                "identifier": card.id,
                "headline": card.title,
                "description": card.excerpt,
                "image": card.image,
                "datePublished": card.iso_date,
                "author": { "@type": "Person", "name": card.author_name },
                "keywords": card.badges,
            })
        })
        .collect::<Vec<_>>();

    serde_json::to_string(&json!({
        "@context": "https://schema.org",
        "@type": "Blog",
        "name": blog_name,
        "url": blog_url,
        "blogPost": blog_posts,
    }))
    .ok()
    .map(|encoded| encoded.replace("</", "<\\/"))
}

/// SSE response swapping the tag bar and grid for the newly selected tag.
///
/// Emits, in order: the tag bar patch, the grid patch, a `replaceState` to the
/// tag's shareable URL, and the `activeTag` signal.
pub fn build_datastar_select_response(section: &BlogSectionContext) -> Result<Response, HttpError> {
    let events = selection_events(section)?;
    let stream = stream! {
        for event in events {
            yield Ok::<Event, Infallible>(event);
        }
    };
    Ok(Sse::new(stream).into_response())
}

fn selection_events(section: &BlogSectionContext) -> Result<Vec<Event>, HttpError> {
    let tags_html = TagBarPartial { content: section }
        .render()
        .map_err(render_failure)?;
    let grid_html = PostGridPartial { content: section }
        .render()
        .map_err(render_failure)?;

    let active = section
        .active_tag
        .parse::<TagFilter>()
        .unwrap_or_default();
    let location = json!(format!("{}#{BLOG_ANCHOR}", index_path(active)));
    let signals = json!({ "activeTag": section.active_tag }).to_string();

    Ok(vec![
        PatchElements::new(tags_html)
            .selector(TAG_BAR_SELECTOR)
            .mode(ElementPatchMode::Outer)
            .write_as_axum_sse_event(),
        PatchElements::new(grid_html)
            .selector(POST_GRID_SELECTOR)
            .mode(ElementPatchMode::Outer)
            .write_as_axum_sse_event(),
        ExecuteScript::new(format!("window.history.replaceState(null, '', {location});"))
            .write_as_axum_sse_event(),
        PatchSignals::new(signals).write_as_axum_sse_event(),
    ])
}

fn render_failure(err: askama::Error) -> HttpError {
    HttpError::from(TemplateRenderError::new(
        "application::blog::build_datastar_select_response",
        "Template rendering failed",
        err,
    ))
}

#[cfg(test)]
mod tests {
    use crate::application::store::PostStore;
    use crate::domain::posts::fixtures::post;

    use super::*;

    fn source() -> Arc<dyn PostSource> {
        Arc::new(
            PostStore::from_posts(vec![
                post("1", &["tech"]),
                post("2", &["productivity", "thought"]),
                post("3", &["tech", "resources"]),
            ])
            .expect("valid fixtures"),
        )
    }

    fn service() -> BlogService {
        BlogService::new(
            source(),
            DateDisplay::default(),
            "Blog",
            "Notes",
            Url::parse("https://example.com/").expect("valid url"),
        )
    }

    #[test]
    fn view_starts_on_all() {
        let view = BlogView::new(source());
        assert_eq!(view.active(), TagFilter::All);
        assert_eq!(view.visible_count(), 3);
    }

    #[test]
    fn reselecting_the_active_tag_does_not_recompute() {
        let mut view = BlogView::new(source());
        assert!(view.select(TagFilter::Tech));
        let computed = view.memo().computations();
        assert!(!view.select(TagFilter::Tech));
        assert_eq!(view.memo().computations(), computed);
    }

    #[test]
    fn each_tag_is_computed_once() {
        let mut view = BlogView::new(source());
        view.select(TagFilter::Tech);
        view.select(TagFilter::All);
        view.select(TagFilter::Tech);
        assert_eq!(view.memo().computations(), 2);
    }

    #[test]
    fn exactly_one_button_is_active() {
        for tag in TagFilter::CATALOG {
            let buttons = build_tag_buttons(tag);
            assert_eq!(buttons.len(), TagFilter::CATALOG.len());
            let active = buttons
                .iter()
                .filter(|button| button.is_active)
                .map(|button| button.value)
                .collect::<Vec<_>>();
            assert_eq!(active, [tag.as_str()]);
        }
    }

    #[test]
    fn cards_link_to_post_fragments() {
        let section = service().section(TagFilter::Resources);
        assert_eq!(section.post_count, 1);
        assert_eq!(section.posts[0].read_more_href, "#blog/3");
        assert_eq!(section.posts[0].badges, ["tech", "resources"]);
    }

    #[test]
    fn empty_filter_has_no_ld_json() {
        let section = service().section(TagFilter::BookReview);
        assert!(!section.has_results);
        assert!(section.posts.is_empty());
        assert!(section.posts_ld_json.is_none());
    }

    #[test]
    fn blog_url_carries_the_tag() {
        let service = service();
        assert_eq!(service.blog_url(TagFilter::All), "https://example.com/");
        assert_eq!(
            service.blog_url(TagFilter::BookReview),
            "https://example.com/?tag=book-review"
        );
    }

    #[test]
    fn tag_links_share_one_path() {
        let service = service();
        for button in build_tag_buttons(TagFilter::Thought) {
            let tag = button.value.parse::<TagFilter>().expect("catalog tag");
            assert_eq!(button.href, format!("{}#blog", index_path(tag)));
            assert_eq!(
                service.blog_url(tag),
                format!("https://example.com{}", index_path(tag))
            );
        }
        assert_eq!(index_path(TagFilter::All), "/");
        assert_eq!(index_path(TagFilter::BookReview), "/?tag=book-review");
    }

    #[test]
    fn selection_emits_patches_then_location_then_signal() {
        let section = service().section(TagFilter::Tech);
        let events = selection_events(&section).expect("events");
        assert_eq!(events.len(), 4);
    }

    #[test]
    fn ld_json_escapes_closing_tags() {
        let mut tricky = post("x", &["tech"]);
        tricky.title = "</script><b>".to_string();
        let source: Arc<dyn PostSource> =
            Arc::new(PostStore::from_posts(vec![tricky]).expect("valid"));
        let service = BlogService::new(
            source,
            DateDisplay::default(),
            "Blog",
            "Notes",
            Url::parse("https://example.com/").expect("valid url"),
        );
        let json = service
            .section(TagFilter::All)
            .posts_ld_json
            .expect("ld json");
        assert!(!json.contains("</script>"));
    }
}
