//! Request inspection and redirect responses.

use super::links::escape_html;
use axum::{
    body::Body,
    http::{self, HeaderMap, HeaderValue, StatusCode, header},
    response::Response,
};
use std::net::SocketAddr;
use thiserror::Error;

const NO_CACHE: &str =
    "no-cache, private, no-store, must-revalidate, post-check=0, pre-check=0, max-age=0";

/// Failures while building a redirect.
#[derive(Debug, Error)]
pub enum RedirectError {
    /// Part of the response was already written.
    #[error("cannot redirect after the response body has been sent")]
    BodyAlreadySent,
    /// Redirects need a 3xx status.
    #[error("status {0} is not a redirection")]
    NotARedirect(StatusCode),
    /// The target cannot be used as a header value.
    #[error("invalid redirect location: {0}")]
    InvalidLocation(String),
    /// The response could not be assembled.
    #[error(transparent)]
    Http(#[from] http::Error),
}

/// `Referer` of the request, or an empty string. Optionally escapes `&` for HTML output.
pub fn get_referer(headers: &HeaderMap, replace_ampersands: bool) -> String {
    let referer = headers
        .get(header::REFERER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    if replace_ampersands {
        referer.replace('&', "&amp;")
    } else {
        referer.to_string()
    }
}

/// Client IP address as text.
pub fn client_ip_address(peer: &SocketAddr) -> String {
    peer.ip().to_string()
}

/// Build a redirect to `url`, `302 Found` unless another 3xx status is given.
///
/// The response disables caching and carries over any `Set-Cookie` headers already queued in
/// `pending`.
pub fn redirect_to_url(
    url: &str,
    status: Option<StatusCode>,
    pending: &HeaderMap,
    body_sent: bool,
) -> Result<Response, RedirectError> {
    if body_sent {
        return Err(RedirectError::BodyAlreadySent);
    }
    let status = status.unwrap_or(StatusCode::FOUND);
    if !status.is_redirection() {
        return Err(RedirectError::NotARedirect(status));
    }
    let location =
        HeaderValue::from_str(url).map_err(|_| RedirectError::InvalidLocation(url.to_string()))?;

    let mut builder = http::Response::builder()
        .status(status)
        .header(header::LOCATION, location)
        .header(header::CACHE_CONTROL, NO_CACHE)
        .header(header::PRAGMA, "no-cache")
        .header(header::CONTENT_TYPE, "text/html; charset=utf-8");
    for cookie in pending.get_all(header::SET_COOKIE) {
        builder = builder.header(header::SET_COOKIE, cookie.clone());
    }

    tracing::debug!(%status, location = url, "Redirecting");
    let body = format!(
        "<p>Please go to <a href=\"{}\">here</a></p>\n",
        escape_html(url, true)
    );
    Ok(builder.body(Body::from(body))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn referer_is_optional_and_escapable() {
        let mut headers = HeaderMap::new();
        assert_eq!(get_referer(&headers, true), "");

        headers.insert(
            header::REFERER,
            HeaderValue::from_static("http://x/search?p=a&of=hb"),
        );
        assert_eq!(get_referer(&headers, false), "http://x/search?p=a&of=hb");
        assert_eq!(get_referer(&headers, true), "http://x/search?p=a&amp;of=hb");
    }

    #[test]
    fn client_ip_drops_the_port() {
        let peer: SocketAddr = "192.0.2.7:51234".parse().expect("socket address");
        assert_eq!(client_ip_address(&peer), "192.0.2.7");
    }

    #[tokio::test]
    async fn redirect_sets_location_and_cache_headers() {
        let mut pending = HeaderMap::new();
        pending.append(header::SET_COOKIE, HeaderValue::from_static("a=1"));
        pending.append(header::SET_COOKIE, HeaderValue::from_static("b=2"));

        let response =
            redirect_to_url("/status?x=1&y=2", None, &pending, false).expect("redirect");
        assert_eq!(response.status(), StatusCode::FOUND);
        let headers = response.headers();
        assert_eq!(headers[header::LOCATION], "/status?x=1&y=2");
        assert_eq!(headers[header::PRAGMA], "no-cache");
        assert_eq!(headers[header::CACHE_CONTROL], NO_CACHE);
        assert_eq!(headers.get_all(header::SET_COOKIE).iter().count(), 2);

        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        assert_eq!(
            std::str::from_utf8(&body).expect("utf8"),
            "<p>Please go to <a href=\"/status?x=1&amp;y=2\">here</a></p>\n"
        );
    }

    #[test]
    fn redirect_rejects_bad_input() {
        let pending = HeaderMap::new();
        assert!(matches!(
            redirect_to_url("/x", None, &pending, true),
            Err(RedirectError::BodyAlreadySent)
        ));
        assert!(matches!(
            redirect_to_url("/x", Some(StatusCode::OK), &pending, false),
            Err(RedirectError::NotARedirect(status)) if status == StatusCode::OK
        ));
        assert!(matches!(
            redirect_to_url("/x\ny", None, &pending, false),
            Err(RedirectError::InvalidLocation(_))
        ));
        let moved = redirect_to_url("/x", Some(StatusCode::MOVED_PERMANENTLY), &pending, false)
            .expect("redirect");
        assert_eq!(moved.status(), StatusCode::MOVED_PERMANENTLY);
    }
}
