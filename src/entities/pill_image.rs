use serde::{Deserialize, Serialize};

use crate::error::MedQueryError;
use crate::sources::rximage::{RxImageClient, RxImageResponse};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PillImage {
    pub image_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labeler: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ndc11: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PillImages {
    pub rxcui: String,
    pub images: Vec<PillImage>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn images_from_response(resp: RxImageResponse) -> Vec<PillImage> {
    resp.nlm_rx_images
        .into_iter()
        .filter_map(|record| {
            let image_url = non_blank(record.image_url)?;
            Some(PillImage {
                image_url,
                name: non_blank(record.name),
                labeler: non_blank(record.labeler),
                ndc11: non_blank(record.ndc11),
            })
        })
        .collect()
}

/// Pill images published for an RxNorm concept.
///
/// # Errors
///
/// Returns an error when the request fails or the body is not JSON.
pub async fn images(rxcui: &str) -> Result<PillImages, MedQueryError> {
    let client = RxImageClient::new()?;
    let resp = client.images_by_rxcui(rxcui).await?;
    Ok(PillImages {
        rxcui: rxcui.trim().to_string(),
        images: images_from_response(resp),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_without_image_url_are_skipped() {
        let resp: RxImageResponse = serde_json::from_value(serde_json::json!({
            "nlmRxImages": [
                {"name": "Atenolol 50 MG Oral Tablet", "imageUrl": "https://example.org/a.jpg", "labeler": " "},
                {"name": "No picture", "imageUrl": ""},
                {"name": "Also none"}
            ]
        }))
        .unwrap();

        let images = images_from_response(resp);
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].image_url, "https://example.org/a.jpg");
        assert!(images[0].labeler.is_none());
    }
}
