use std::sync::LazyLock;

use regex::Regex;
use url::{Position, Url};

static NOJS_SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/nojs(/|$|\?|#)").expect("nojs pattern is valid")
});

/// Rewrite `/nojs` path segments to `/ajax` so the server knows the request
/// came from the enhanced client. Matches `/nojs/`, a trailing `/nojs`, and
/// `/nojs` followed by a query or fragment.
pub fn rewrite_nojs(url: &str) -> String {
    NOJS_SEGMENT.replace_all(url, "/ajax$1").into_owned()
}

/// Whether `url` points inside this site: same scheme, host and port as the
/// page (an http page may also target https), under `base_path`.
pub fn url_is_local(url: &str, page_url: &str, base_path: &str) -> bool {
    let Ok(page) = Url::parse(page_url) else {
        return false;
    };
    let Ok(absolute) = page.join(url) else {
        return false;
    };

    let scheme = if page.scheme() == "http" && absolute.scheme() == "https" {
        "https"
    } else {
        page.scheme()
    };
    let authority = &page[Position::BeforeHost..Position::AfterPort];
    if authority.is_empty() {
        return false;
    }
    let base = format!(
        "{}://{}{}",
        scheme,
        authority,
        base_path.trim_end_matches('/')
    );
    let target = absolute.as_str();
    target == base || target.starts_with(&format!("{}/", base))
}
