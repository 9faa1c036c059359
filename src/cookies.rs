use axum::http::{header, HeaderMap};

/// Reads a single cookie value out of the request `Cookie` header.
pub fn get(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get(header::COOKIE)?.to_str().ok()?;
    for pair in raw.split(';') {
        if let Some((k, v)) = pair.trim().split_once('=') {
            if k == name {
                return Some(v.to_string());
            }
        }
    }
    None
}

/// Builds a `Set-Cookie` value scoped to the whole site. `max_age` of `None`
/// yields a browser-session cookie.
pub fn set(name: &str, value: &str, max_age: Option<i64>) -> String {
    match max_age {
        Some(secs) => format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            name, value, secs
        ),
        None => format!("{}={}; Path=/; HttpOnly; SameSite=Lax", name, value),
    }
}

/// Builds a `Set-Cookie` value that removes the cookie.
pub fn clear(name: &str) -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with_cookie(raw: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(raw).unwrap());
        headers
    }

    #[test]
    fn get_finds_cookie_among_many() {
        let headers = headers_with_cookie("a=1; session=tok-123; b=2");
        assert_eq!(get(&headers, "session").as_deref(), Some("tok-123"));
        assert_eq!(get(&headers, "a").as_deref(), Some("1"));
        assert_eq!(get(&headers, "missing"), None);
    }

    #[test]
    fn get_returns_none_without_cookie_header() {
        assert_eq!(get(&HeaderMap::new(), "session"), None);
    }

    #[test]
    fn set_and_clear_shape() {
        assert_eq!(
            set("session", "tok", Some(60)),
            "session=tok; Path=/; HttpOnly; SameSite=Lax; Max-Age=60"
        );
        assert_eq!(
            set("session", "tok", None),
            "session=tok; Path=/; HttpOnly; SameSite=Lax"
        );
        assert!(clear("session").contains("Max-Age=0"));
    }
}
