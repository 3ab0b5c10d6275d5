//! Source clients and the shared HTTP fetcher for upstream medication APIs.

use std::borrow::Cow;
use std::sync::OnceLock;
use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, HeaderValue};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::error::MedQueryError;

pub mod medlineplus;
pub mod openfda;
pub(crate) mod rate_limit;
pub mod rximage;
pub mod rxnav;

const ERROR_BODY_MAX_BYTES: usize = 2048;
pub(crate) const DEFAULT_MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

static HTTP_CLIENT: OnceLock<ClientWithMiddleware> = OnceLock::new();

pub(crate) fn env_base(default: &'static str, env_var: &str) -> Cow<'static, str> {
    std::env::var(env_var)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .map(Cow::Owned)
        .unwrap_or_else(|| Cow::Borrowed(default))
}

pub(crate) fn join_endpoint(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Returns the shared HTTP client with per-host request spacing.
///
/// One request goes out per call. There is no retry layer and no response cache.
pub(crate) fn shared_client() -> Result<ClientWithMiddleware, MedQueryError> {
    if let Some(client) = HTTP_CLIENT.get() {
        return Ok(client.clone());
    }

    let base_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .user_agent(concat!("medquery/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(MedQueryError::HttpClientInit)?;

    let client = ClientBuilder::new(base_client)
        .with(rate_limit::RateLimitMiddleware::new())
        .build();

    match HTTP_CLIENT.set(client.clone()) {
        Ok(()) => Ok(client),
        Err(_) => HTTP_CLIENT.get().cloned().ok_or_else(|| MedQueryError::Api {
            api: "http-client".into(),
            message: "Shared HTTP client initialization race".into(),
        }),
    }
}

/// Issues one GET against `url` with `params` and returns the raw body.
///
/// A 404 yields `Ok(None)` so callers can treat "no matches" as empty. Every
/// other non-success status is an `Api` error carrying a body excerpt.
pub(crate) async fn fetch_optional(
    client: &ClientWithMiddleware,
    api: &str,
    url: &str,
    params: &[(&str, &str)],
) -> Result<Option<Vec<u8>>, MedQueryError> {
    let resp = client.get(url).query(params).send().await?;
    let status = resp.status();
    let content_type = resp.headers().get(CONTENT_TYPE).cloned();
    let bytes = read_limited_body(resp, api).await?;

    if status == reqwest::StatusCode::NOT_FOUND {
        return Ok(None);
    }

    if !status.is_success() {
        let excerpt = body_excerpt(&bytes);
        return Err(MedQueryError::Api {
            api: api.to_string(),
            message: format!("HTTP {status}: {excerpt}"),
        });
    }

    ensure_json_content_type(api, content_type.as_ref(), &bytes)?;
    Ok(Some(bytes))
}

/// Like [`fetch_optional`], but a 404 is an error.
pub(crate) async fn fetch(
    client: &ClientWithMiddleware,
    api: &str,
    url: &str,
    params: &[(&str, &str)],
) -> Result<Vec<u8>, MedQueryError> {
    fetch_optional(client, api, url, params)
        .await?
        .ok_or_else(|| MedQueryError::Api {
            api: api.to_string(),
            message: format!("HTTP 404 Not Found: {url}"),
        })
}

pub(crate) fn decode_json<T: DeserializeOwned>(api: &str, bytes: &[u8]) -> Result<T, MedQueryError> {
    serde_json::from_slice(bytes).map_err(|source| MedQueryError::ApiJson {
        api: api.to_string(),
        source,
    })
}

pub(crate) fn required_arg<'a>(value: &'a str, what: &str, example: &str) -> Result<&'a str, MedQueryError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(MedQueryError::InvalidArgument(format!(
            "{what} is required. Example: {example}"
        )));
    }
    if value.len() > 256 {
        return Err(MedQueryError::InvalidArgument(format!("{what} is too long.")));
    }
    Ok(value)
}

pub(crate) fn body_excerpt(bytes: &[u8]) -> String {
    let full = String::from_utf8_lossy(bytes);

    let truncated: &str = if full.len() > ERROR_BODY_MAX_BYTES {
        let mut end = ERROR_BODY_MAX_BYTES;
        while end > 0 && !full.is_char_boundary(end) {
            end -= 1;
        }
        &full[..end]
    } else {
        full.as_ref()
    };

    let mut s = truncated.trim().replace(['\n', '\r', '\t'], " ");
    if full.len() > ERROR_BODY_MAX_BYTES {
        s.push_str(" …");
    }
    s
}

pub(crate) fn ensure_json_content_type(
    api: &str,
    content_type: Option<&HeaderValue>,
    body: &[u8],
) -> Result<(), MedQueryError> {
    let Some(content_type) = content_type else {
        return Ok(());
    };

    let raw = match content_type.to_str() {
        Ok(v) => v.trim(),
        Err(_) => {
            warn!(
                source = api,
                "Response content-type header was not valid UTF-8; attempting JSON parse"
            );
            return Ok(());
        }
    };
    if raw.is_empty() {
        return Ok(());
    }

    let media_type = raw
        .split(';')
        .next()
        .map(str::trim)
        .unwrap_or_default()
        .to_ascii_lowercase();
    let is_html = matches!(media_type.as_str(), "text/html" | "application/xhtml+xml");
    if is_html {
        return Err(MedQueryError::Api {
            api: api.to_string(),
            message: format!(
                "Unexpected HTML response (content-type: {raw}): {}",
                body_excerpt(body)
            ),
        });
    }

    let is_json = media_type == "application/json"
        || media_type == "text/json"
        || media_type.ends_with("+json");
    if !is_json {
        warn!(
            source = api,
            content_type = raw,
            "Unexpected non-JSON content type; attempting JSON parse for compatibility"
        );
    }

    Ok(())
}

pub(crate) async fn read_limited_body(
    mut resp: reqwest::Response,
    api: &str,
) -> Result<Vec<u8>, MedQueryError> {
    let mut body: Vec<u8> = Vec::new();

    while let Some(chunk) = resp.chunk().await? {
        let next_len = body.len().saturating_add(chunk.len());
        if next_len > DEFAULT_MAX_BODY_BYTES {
            return Err(MedQueryError::Api {
                api: api.to_string(),
                message: format!("Response body exceeded {DEFAULT_MAX_BODY_BYTES} bytes"),
            });
        }
        body.extend_from_slice(&chunk);
    }

    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn ensure_json_content_type_rejects_html() {
        let err = ensure_json_content_type(
            "rxnav",
            Some(&HeaderValue::from_static("text/html; charset=utf-8")),
            b"<html><body>upstream error</body></html>",
        )
        .expect_err("html should be rejected");
        let msg = err.to_string();
        assert!(msg.contains("rxnav"));
        assert!(msg.contains("HTML"));
    }

    #[test]
    fn ensure_json_content_type_accepts_json() {
        let ok = ensure_json_content_type(
            "rxnav",
            Some(&HeaderValue::from_static("application/json; charset=utf-8")),
            b"{\"ok\":true}",
        );
        assert!(ok.is_ok());
    }

    #[test]
    fn ensure_json_content_type_allows_non_json_compat_mode() {
        let ok = ensure_json_content_type(
            "medlineplus",
            Some(&HeaderValue::from_static("text/plain")),
            b"{\"ok\":true}",
        );
        assert!(ok.is_ok());
    }

    #[test]
    fn body_excerpt_flattens_whitespace() {
        assert_eq!(body_excerpt(b"  line one\nline\ttwo \r\n"), "line one line two");
    }

    #[test]
    fn join_endpoint_normalizes_slashes() {
        assert_eq!(
            join_endpoint("https://rxnav.nlm.nih.gov/REST/", "/drugs.json"),
            "https://rxnav.nlm.nih.gov/REST/drugs.json"
        );
    }

    #[test]
    fn required_arg_trims_and_rejects_blank() {
        assert_eq!(required_arg("  aspirin ", "Drug name", "x").unwrap(), "aspirin");
        let err = required_arg("   ", "Drug name", "medquery drugs aspirin").unwrap_err();
        assert!(matches!(err, MedQueryError::InvalidArgument(_)));
        assert!(err.to_string().contains("medquery drugs aspirin"));
    }

    #[test]
    fn decode_json_reports_api_on_parse_failure() {
        let err = decode_json::<serde_json::Value>("rxnav", b"not json").unwrap_err();
        assert!(matches!(err, MedQueryError::ApiJson { ref api, .. } if api == "rxnav"));
    }

    #[tokio::test]
    async fn fetch_optional_maps_not_found_to_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing.json"))
            .respond_with(ResponseTemplate::new(404).set_body_string("{}"))
            .mount(&server)
            .await;

        let client = shared_client().unwrap();
        let url = format!("{}/missing.json", server.uri());
        let body = fetch_optional(&client, "test-api", &url, &[]).await.unwrap();
        assert!(body.is_none());

        let err = fetch(&client, "test-api", &url, &[]).await.unwrap_err();
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn fetch_reports_server_errors_with_excerpt() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/broken.json"))
            .and(query_param("name", "aspirin"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance window"))
            .expect(1)
            .mount(&server)
            .await;

        let client = shared_client().unwrap();
        let url = format!("{}/broken.json", server.uri());
        let err = fetch(&client, "test-api", &url, &[("name", "aspirin")])
            .await
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("test-api"));
        assert!(msg.contains("503"));
        assert!(msg.contains("maintenance window"));
    }
}
