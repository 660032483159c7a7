//! Image path resolution for the preview
//!
//! Posts reference images the way Hexo sources do (`/img/18/1.jpg`,
//! `../img/18/1.jpg`, `18/1.jpg`, ...). The editor serves the image root
//! flattened under [`IMAGE_API_PREFIX`], so every authored reference is mapped
//! onto that prefix. This is purely syntactic: containment of `..` is checked
//! by the image route of the server, not here.

/// URL prefix the server serves image files from
pub const IMAGE_API_PREFIX: &str = "/api/image/";

/// Directory names that mark the start of the image root in an authored path
const IMAGE_DIR_NAMES: [&str; 2] = ["img", "images"];

/// Map an authored image reference to the path the preview should fetch.
///
/// Rules, first match wins:
/// 1. `<...>` is unwrapped
/// 2. `/api/image/...` and `api/image/...` are returned with one leading `/`
/// 3. `http...`, `//...` and `data:...` are returned unchanged
/// 4. a path segment named `img` or `images` (any case) followed by more
///    path: the remainder after the first such segment is served
/// 5. otherwise leading `./`, `../` and one leading slash are dropped
pub fn resolve_image_path(src: &str) -> String {
    let mut src = src.trim();
    if let Some(inner) = src.strip_prefix('<').and_then(|s| s.strip_suffix('>')) {
        src = inner.trim();
    }

    let api_prefix = &IMAGE_API_PREFIX[1..];
    if src.starts_with(IMAGE_API_PREFIX) {
        return src.to_string();
    }
    if src.starts_with(api_prefix) {
        return format!("/{}", src);
    }

    if is_external(src) {
        return src.to_string();
    }

    if let Some(rest) = after_image_dir(src) {
        return format!("{}{}", IMAGE_API_PREFIX, to_forward_slashes(rest));
    }

    format!("{}{}", IMAGE_API_PREFIX, to_forward_slashes(strip_relative(src)))
}

/// References that are never rewritten
pub fn is_external(src: &str) -> bool {
    src.starts_with("http") || src.starts_with("//") || src.starts_with("data:")
}

/// Remainder after the first `img`/`images` segment, if it is non-empty
fn after_image_dir(src: &str) -> Option<&str> {
    let mut start = 0;
    for (i, c) in src.char_indices() {
        if c != '/' && c != '\\' {
            continue;
        }
        let segment = &src[start..i];
        let rest = &src[i + 1..];
        if !rest.is_empty()
            && IMAGE_DIR_NAMES
                .iter()
                .any(|name| segment.eq_ignore_ascii_case(name))
        {
            return Some(rest);
        }
        start = i + 1;
    }
    None
}

/// Drop leading `./` and `../` runs (either slash style), then one leading slash
fn strip_relative(src: &str) -> &str {
    let mut rest = src;
    loop {
        let next = ["../", "..\\", "./", ".\\"]
            .iter()
            .find_map(|prefix| rest.strip_prefix(prefix));
        match next {
            Some(r) => rest = r,
            None => break,
        }
    }
    rest.strip_prefix(['/', '\\']).unwrap_or(rest)
}

fn to_forward_slashes(path: &str) -> String {
    path.replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_resolved_is_unchanged() {
        assert_eq!(resolve_image_path("/api/image/18/1.jpg"), "/api/image/18/1.jpg");
        assert_eq!(resolve_image_path("api/image/18/1.jpg"), "/api/image/18/1.jpg");
        let once = resolve_image_path("../img/18/1.jpg");
        assert_eq!(resolve_image_path(&once), once);
    }

    #[test]
    fn test_external_passthrough() {
        assert_eq!(resolve_image_path("http://x.com/a.png"), "http://x.com/a.png");
        assert_eq!(resolve_image_path("https://x.com/img/a.png"), "https://x.com/img/a.png");
        assert_eq!(resolve_image_path("//cdn.x.com/a.png"), "//cdn.x.com/a.png");
        assert_eq!(
            resolve_image_path("data:image/png;base64,AAA"),
            "data:image/png;base64,AAA"
        );
    }

    #[test]
    fn test_image_dir_convention() {
        assert_eq!(resolve_image_path("../img/18/1.jpg"), "/api/image/18/1.jpg");
        assert_eq!(resolve_image_path("/img/18/1.jpg"), "/api/image/18/1.jpg");
        assert_eq!(resolve_image_path("img/1.jpg"), "/api/image/1.jpg");
        assert_eq!(resolve_image_path("images\\18\\1.jpg"), "/api/image/18/1.jpg");
        assert_eq!(resolve_image_path("../../source/IMG/a/b.png"), "/api/image/a/b.png");
    }

    #[test]
    fn test_first_image_dir_wins() {
        assert_eq!(resolve_image_path("img/images/x.png"), "/api/image/images/x.png");
    }

    #[test]
    fn test_image_dir_must_be_whole_segment() {
        assert_eq!(resolve_image_path("myimg/x.png"), "/api/image/myimg/x.png");
        assert_eq!(resolve_image_path("img"), "/api/image/img");
    }

    #[test]
    fn test_relative_fallback() {
        assert_eq!(resolve_image_path("18/3.png"), "/api/image/18/3.png");
        assert_eq!(resolve_image_path("../18/3.png"), "/api/image/18/3.png");
        assert_eq!(resolve_image_path("./../18/3.png"), "/api/image/18/3.png");
        assert_eq!(resolve_image_path("..\\18\\3.png"), "/api/image/18/3.png");
        assert_eq!(resolve_image_path("/18/3.png"), "/api/image/18/3.png");
    }

    #[test]
    fn test_angle_brackets_and_whitespace() {
        assert_eq!(resolve_image_path("  <../img/5/my pic.jpg> "), "/api/image/5/my pic.jpg");
        assert_eq!(resolve_image_path("<http://x.com/a.png>"), "http://x.com/a.png");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(resolve_image_path(""), "/api/image/");
        assert_eq!(resolve_image_path("<>"), "/api/image/");
    }

    #[test]
    fn test_dot_dot_is_not_blocked() {
        assert_eq!(resolve_image_path("a/../b.png"), "/api/image/a/../b.png");
    }
}
