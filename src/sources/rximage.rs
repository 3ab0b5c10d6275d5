use std::borrow::Cow;

use serde::Deserialize;

use crate::error::MedQueryError;

pub(crate) const RXIMAGE_BASE: &str = "https://rximage.nlm.nih.gov/api/rximage/1";
const RXIMAGE_API: &str = "rximage";
pub(crate) const RXIMAGE_BASE_ENV: &str = "MEDQUERY_RXIMAGE_BASE";

const IMAGE_RESOLUTION: &str = "600";

pub struct RxImageClient {
    client: reqwest_middleware::ClientWithMiddleware,
    base: Cow<'static, str>,
}

impl RxImageClient {
    pub fn new() -> Result<Self, MedQueryError> {
        Ok(Self {
            client: crate::sources::shared_client()?,
            base: crate::sources::env_base(RXIMAGE_BASE, RXIMAGE_BASE_ENV),
        })
    }

    #[cfg(test)]
    fn new_for_test(base: String) -> Result<Self, MedQueryError> {
        Ok(Self {
            client: crate::sources::shared_client()?,
            base: Cow::Owned(base),
        })
    }

    /// Pill images for a concept at 600px resolution.
    pub async fn images_by_rxcui(&self, rxcui: &str) -> Result<RxImageResponse, MedQueryError> {
        let rxcui = crate::sources::required_arg(rxcui, "RxCUI", "medquery images 197381")?;
        let url = crate::sources::join_endpoint(&self.base, "rxbase");
        let bytes = crate::sources::fetch(
            &self.client,
            RXIMAGE_API,
            &url,
            &[("rxcui", rxcui), ("resolution", IMAGE_RESOLUTION)],
        )
        .await?;
        crate::sources::decode_json(RXIMAGE_API, &bytes)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RxImageResponse {
    #[serde(default)]
    pub nlm_rx_images: Vec<RxImageRecord>,
    #[serde(default)]
    pub reply_status: Option<RxImageReplyStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RxImageRecord {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub labeler: Option<String>,
    #[serde(default)]
    pub ndc11: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    // Upstream emits this as a number for some records and a string for others.
    #[serde(default)]
    pub rxcui: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RxImageReplyStatus {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub image_count: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn images_by_rxcui_requests_600px_images() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rxbase"))
            .and(query_param("rxcui", "197381"))
            .and(query_param("resolution", "600"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "nlmRxImages": [{
                    "name": "Atenolol 50 MG Oral Tablet",
                    "labeler": "Example Labs",
                    "ndc11": "00000-0000-00",
                    "imageUrl": "https://example.org/pill.jpg",
                    "rxcui": 197381
                }],
                "replyStatus": {"success": true, "imageCount": 1}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = RxImageClient::new_for_test(server.uri()).unwrap();
        let resp = client.images_by_rxcui("197381").await.unwrap();
        assert_eq!(resp.nlm_rx_images.len(), 1);
        assert_eq!(
            resp.nlm_rx_images[0].image_url.as_deref(),
            Some("https://example.org/pill.jpg")
        );
        assert_eq!(resp.reply_status.unwrap().image_count, Some(1));
    }
}
