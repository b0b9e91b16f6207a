use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use reqwest::Response;
use tracing::warn;

use super::SourceError;

/// Several sources serve stripped pages (or nothing) to non-browser agents.
pub(crate) const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36";

const MAX_RESPONSE_BYTES: usize = 5_000_000;

/// Characters to percent-encode inside a single URL path segment.
const SEGMENT_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'/')
    .add(b'?')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'+')
    .add(b'[')
    .add(b']')
    .add(b';')
    .add(b'=');

pub(super) fn encode_segment(s: &str) -> String {
    utf8_percent_encode(s, SEGMENT_ENCODE_SET).to_string()
}

/// Pass 2xx responses through; turn anything else into [`SourceError::Upstream`].
pub(super) async fn require_success(response: Response) -> Result<Response, SourceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let snippet: String = body.chars().take(200).collect();
    warn!(status = %status, "upstream returned non-success status");
    let message = if snippet.trim().is_empty() {
        format!("HTTP {status}")
    } else {
        format!("HTTP {status}: {}", snippet.trim())
    };
    Err(SourceError::upstream(status.as_u16(), message))
}

/// Read the body as text, refusing anything larger than [`MAX_RESPONSE_BYTES`].
pub(super) async fn read_body(response: Response) -> Result<String, SourceError> {
    let status = response.status().as_u16();
    if let Some(len) = response.content_length()
        && len as usize > MAX_RESPONSE_BYTES
    {
        return Err(SourceError::upstream(status, "response too large"));
    }

    let mut body = Vec::new();
    let mut stream = response;
    while let Some(chunk) = stream.chunk().await? {
        body.extend_from_slice(&chunk);
        if body.len() > MAX_RESPONSE_BYTES {
            return Err(SourceError::upstream(status, "response too large"));
        }
    }
    Ok(String::from_utf8_lossy(&body).into_owned())
}

/// Read the body as a JSON document. Malformed JSON is an upstream fault.
pub(super) async fn read_json(response: Response) -> Result<serde_json::Value, SourceError> {
    let status = response.status().as_u16();
    let body = read_body(response).await?;
    serde_json::from_str(&body)
        .map_err(|e| SourceError::upstream(status, format!("unexpected response format: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Client;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn encode_segment_escapes_path_breakers() {
        assert_eq!(encode_segment("MH12AB1234"), "MH12AB1234");
        assert_eq!(encode_segment("a/b?c#d"), "a%2Fb%3Fc%23d");
        assert_eq!(encode_segment("x y"), "x%20y");
    }

    #[tokio::test]
    async fn require_success_maps_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/down"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let response = Client::new()
            .get(format!("{}/down", server.uri()))
            .send()
            .await
            .unwrap();
        match require_success(response).await {
            Err(SourceError::Upstream { code, message }) => {
                assert_eq!(code, 503);
                assert!(message.contains("maintenance"), "got: {message}");
            }
            other => panic!("expected Upstream, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn read_json_rejects_html() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/html"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(&server)
            .await;

        let response = Client::new()
            .get(format!("{}/html", server.uri()))
            .send()
            .await
            .unwrap();
        let err = read_json(response).await.unwrap_err();
        assert!(matches!(err, SourceError::Upstream { code: 200, .. }));
    }

    #[tokio::test]
    async fn read_body_rejects_oversized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/huge"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("x".repeat(MAX_RESPONSE_BYTES + 1)),
            )
            .mount(&server)
            .await;

        let response = Client::new()
            .get(format!("{}/huge", server.uri()))
            .send()
            .await
            .unwrap();
        let err = read_body(response).await.unwrap_err();
        assert!(err.to_string().contains("too large"), "got: {err}");
    }
}
