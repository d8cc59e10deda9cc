use url::Url;

use crate::presentation::views::{BrandView, LayoutChrome, PageMetaView};

/// Site-wide identity shared by every rendered page.
#[derive(Debug, Clone)]
pub struct SiteIdentity {
    pub title: String,
    pub description: String,
    pub public_url: Url,
}

#[derive(Debug, Clone)]
pub struct ChromeService {
    site: SiteIdentity,
}

impl ChromeService {
    pub fn new(site: SiteIdentity) -> Self {
        Self { site }
    }

    /// Layout chrome whose canonical link points at `path` under the public URL.
    pub fn load(&self, path: &str) -> LayoutChrome {
        LayoutChrome {
            brand: BrandView {
                title: self.site.title.clone(),
                href: "/".to_string(),
            },
            meta: PageMetaView {
                title: self.site.title.clone(),
                description: self.site.description.clone(),
                canonical: canonical_url(&self.site.public_url, path),
            },
            inline_stylesheet: None,
        }
    }
}

pub(crate) fn canonical_url(base: &Url, path: &str) -> String {
    let trimmed = path.trim_start_matches('/');
    if trimmed.is_empty() {
        return base.to_string();
    }
    base.join(trimmed)
        .map(|url| url.to_string())
        .unwrap_or_else(|_| base.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chrome() -> ChromeService {
        ChromeService::new(SiteIdentity {
            title: "Blog".to_string(),
            description: "Notes".to_string(),
            public_url: Url::parse("https://example.com/notes/").expect("valid url"),
        })
    }

    #[test]
    fn canonical_is_relative_to_public_url() {
        let layout = chrome().load("/?tag=tech");
        assert_eq!(layout.meta.canonical, "https://example.com/notes/?tag=tech");
    }

    #[test]
    fn root_canonical_is_the_public_url() {
        let layout = chrome().load("/");
        assert_eq!(layout.meta.canonical, "https://example.com/notes/");
        assert_eq!(layout.brand.title, "Blog");
    }
}
