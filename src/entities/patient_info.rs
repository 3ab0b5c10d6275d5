use serde::{Deserialize, Serialize};

use crate::error::MedQueryError;
use crate::sources::medlineplus::MedlinePlusClient;
use crate::transform;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientInfoEntry {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientInfo {
    pub rxcui: String,
    pub entries: Vec<PatientInfoEntry>,
}

/// MedlinePlus patient-information pages for an RxNorm concept.
///
/// # Errors
///
/// Returns an error when the request fails or the body is not JSON.
pub async fn get(rxcui: &str, display_name: Option<&str>) -> Result<PatientInfo, MedQueryError> {
    let client = MedlinePlusClient::new()?;
    let resp = client.connect(rxcui, display_name).await?;
    let entries = resp
        .feed
        .map(|feed| feed.entry)
        .unwrap_or_default()
        .iter()
        .filter_map(transform::patient_info::entry_from_medlineplus)
        .collect();
    Ok(PatientInfo {
        rxcui: rxcui.trim().to_string(),
        entries,
    })
}
