//! One-shot flash messages carried in a cookie: queued on redirect, shown by
//! the next rendered page, then cleared.

use std::convert::Infallible;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::SET_COOKIE, request::Parts, HeaderMap},
    response::Redirect,
};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use crate::cookies;

pub const FLASH_COOKIE: &str = "flash";

fn encode(messages: &[String]) -> String {
    let json = serde_json::to_vec(messages).unwrap_or_default();
    URL_SAFE_NO_PAD.encode(json)
}

fn decode(value: &str) -> Vec<String> {
    URL_SAFE_NO_PAD
        .decode(value)
        .ok()
        .and_then(|bytes| serde_json::from_slice(&bytes).ok())
        .unwrap_or_default()
}

/// Redirects to `dest` with `msg` queued for the next page load.
pub fn redirect(dest: &str, msg: &str) -> (HeaderMap, Redirect) {
    let mut headers = HeaderMap::new();
    let cookie = cookies::set(FLASH_COOKIE, &encode(&[msg.to_string()]), None);
    headers.insert(SET_COOKIE, cookie.parse().unwrap());
    (headers, Redirect::to(dest))
}

/// Pending flash messages extracted from the request cookie.
pub struct FlashMessages(pub Vec<String>);

#[async_trait]
impl<S> FromRequestParts<S> for FlashMessages
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let messages = cookies::get(&parts.headers, FLASH_COOKIE)
            .map(|v| decode(&v))
            .unwrap_or_default();
        Ok(FlashMessages(messages))
    }
}

impl FlashMessages {
    /// Consumes the pending messages; the returned headers clear the cookie so
    /// the messages show only once.
    pub fn take(self) -> (HeaderMap, Vec<String>) {
        let mut headers = HeaderMap::new();
        if !self.0.is_empty() {
            headers.insert(SET_COOKIE, cookies::clear(FLASH_COOKIE).parse().unwrap());
        }
        (headers, self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_roundtrip() {
        let messages = vec![
            "Your post is now live!".to_string(),
            "punctuation; and = signs survive".to_string(),
        ];
        assert_eq!(decode(&encode(&messages)), messages);
    }

    #[test]
    fn decode_garbage_yields_no_messages() {
        assert!(decode("not-base64!!!").is_empty());
        assert!(decode("").is_empty());
    }

    #[test]
    fn redirect_queues_flash_cookie() {
        let (headers, _) = redirect("/login", "Invalid username or password");
        let cookie = headers.get(SET_COOKIE).unwrap().to_str().unwrap();
        assert!(cookie.starts_with("flash="));
        assert!(cookie.contains("HttpOnly"));
    }

    #[test]
    fn take_clears_only_when_messages_present() {
        let (headers, messages) = FlashMessages(vec!["hi".into()]).take();
        assert_eq!(messages, vec!["hi".to_string()]);
        assert!(headers
            .get(SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .contains("Max-Age=0"));

        let (headers, messages) = FlashMessages(Vec::new()).take();
        assert!(messages.is_empty());
        assert!(headers.get(SET_COOKIE).is_none());
    }
}
