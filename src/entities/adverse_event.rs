use serde::{Deserialize, Serialize};

use crate::error::MedQueryError;
use crate::sources::openfda::{OpenFdaClient, OpenFdaCountResponse, REACTION_COUNT_FIELD};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionCount {
    pub reaction: String,
    pub count: usize,
}

/// Reported reactions across FAERS reports matching one drug.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionSummary {
    pub query: String,
    pub count_field: String,
    pub reactions: Vec<ReactionCount>,
}

impl ReactionSummary {
    pub fn total_reports(&self) -> usize {
        self.reactions.iter().map(|r| r.count).sum()
    }
}

fn summarize(query: String, resp: Option<OpenFdaCountResponse>) -> ReactionSummary {
    let reactions = resp
        .map(|value| value.results)
        .unwrap_or_default()
        .into_iter()
        .map(|row| ReactionCount {
            reaction: row.term,
            count: row.count,
        })
        .collect();
    ReactionSummary {
        query,
        count_field: REACTION_COUNT_FIELD.to_string(),
        reactions,
    }
}

/// Counts FAERS reactions for reports that list the RxNorm concept.
///
/// # Errors
///
/// Returns an error when the request fails or openFDA returns malformed JSON.
/// A drug with no reports yields an empty summary.
pub async fn reactions_by_rxcui(rxcui: &str) -> Result<ReactionSummary, MedQueryError> {
    let client = OpenFdaClient::new()?;
    let resp = client.reactions_by_rxcui(rxcui).await?;
    Ok(summarize(format!("rxcui {}", rxcui.trim()), resp))
}

/// Counts FAERS reactions for reports naming the drug as generic or brand.
///
/// # Errors
///
/// Returns an error when the request fails or openFDA returns malformed JSON.
pub async fn reactions_by_name(name: &str) -> Result<ReactionSummary, MedQueryError> {
    let client = OpenFdaClient::new()?;
    let resp = client.reactions_by_name(name).await?;
    Ok(summarize(name.trim().to_string(), resp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::openfda::OpenFdaCountBucket;

    #[test]
    fn summarize_maps_buckets_in_order() {
        let resp = OpenFdaCountResponse {
            meta: serde_json::Value::Null,
            results: vec![
                OpenFdaCountBucket {
                    term: "NAUSEA".into(),
                    count: 10,
                },
                OpenFdaCountBucket {
                    term: "DIZZINESS".into(),
                    count: 4,
                },
            ],
        };
        let summary = summarize("ibuprofen".into(), Some(resp));
        assert_eq!(summary.reactions.len(), 2);
        assert_eq!(summary.reactions[1].reaction, "DIZZINESS");
        assert_eq!(summary.total_reports(), 14);
        assert_eq!(summary.count_field, REACTION_COUNT_FIELD);
    }

    #[test]
    fn summarize_treats_missing_response_as_empty() {
        let summary = summarize("rxcui 0".into(), None);
        assert!(summary.reactions.is_empty());
        assert_eq!(summary.total_reports(), 0);
    }
}
