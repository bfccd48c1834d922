use url::Url;

const RESERVED_SUBDOMAINS: &[&str] = &["www", "api", "downloads"];

/// What a FANBOX page address points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageKind {
    Creator { creator_id: String },
    Post { creator_id: String, post_id: String },
}

impl PageKind {
    pub fn creator_id(&self) -> &str {
        match self {
            PageKind::Creator { creator_id } | PageKind::Post { creator_id, .. } => creator_id,
        }
    }

    pub fn post_id(&self) -> Option<&str> {
        match self {
            PageKind::Creator { .. } => None,
            PageKind::Post { post_id, .. } => Some(post_id),
        }
    }
}

/// Classifies `www.fanbox.cc/@creator[/posts/id]` and
/// `creator.fanbox.cc[/posts/id]` addresses. The scheme may be omitted.
pub fn detect_page(address: &str) -> Option<PageKind> {
    let address = address.trim();
    let url = if address.contains("://") {
        Url::parse(address)
    } else {
        Url::parse(&format!("https://{address}"))
    }
    .ok()?;
    let host = url.host_str()?.to_ascii_lowercase();
    let segments: Vec<&str> = url
        .path_segments()
        .map(|segments| segments.filter(|s| !s.is_empty()).collect())
        .unwrap_or_default();

    if host == "www.fanbox.cc" || host == "fanbox.cc" {
        let creator_id = segments.first()?.strip_prefix('@')?;
        if creator_id.is_empty() {
            return None;
        }
        return Some(classify(creator_id, segments.get(1..).unwrap_or_default()));
    }

    let creator_id = host.strip_suffix(".fanbox.cc")?;
    if creator_id.is_empty() || creator_id.contains('.') || RESERVED_SUBDOMAINS.contains(&creator_id)
    {
        return None;
    }
    Some(classify(creator_id, &segments))
}

fn classify(creator_id: &str, rest: &[&str]) -> PageKind {
    match rest {
        ["posts", post_id, ..] if is_post_id(post_id) => PageKind::Post {
            creator_id: creator_id.to_string(),
            post_id: post_id.to_string(),
        },
        _ => PageKind::Creator {
            creator_id: creator_id.to_string(),
        },
    }
}

fn is_post_id(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}
