use std::borrow::Cow;

use serde::Deserialize;

use crate::error::MedQueryError;

pub(crate) const RXNAV_BASE: &str = "https://rxnav.nlm.nih.gov/REST";
const RXNAV_API: &str = "rxnav";
pub(crate) const RXNAV_BASE_ENV: &str = "MEDQUERY_RXNAV_BASE";

pub(crate) const DEFAULT_APPROXIMATE_MAX_ENTRIES: usize = 5;

pub struct RxNavClient {
    client: reqwest_middleware::ClientWithMiddleware,
    base: Cow<'static, str>,
}

impl RxNavClient {
    pub fn new() -> Result<Self, MedQueryError> {
        Ok(Self {
            client: crate::sources::shared_client()?,
            base: crate::sources::env_base(RXNAV_BASE, RXNAV_BASE_ENV),
        })
    }

    #[cfg(test)]
    pub(crate) fn new_for_test(base: String) -> Result<Self, MedQueryError> {
        Ok(Self {
            client: crate::sources::shared_client()?,
            base: Cow::Owned(base),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, MedQueryError> {
        let url = crate::sources::join_endpoint(&self.base, path);
        let bytes = crate::sources::fetch(&self.client, RXNAV_API, &url, params).await?;
        crate::sources::decode_json(RXNAV_API, &bytes)
    }

    /// Exact-name concept lookup (`rxcui.json`).
    pub async fn rxcui_by_name(&self, name: &str) -> Result<RxNormIdResponse, MedQueryError> {
        let name = crate::sources::required_arg(name, "Drug name", "medquery rxcui lipitor")?;
        self.get_json("rxcui.json", &[("name", name)]).await
    }

    pub async fn spelling_suggestions(
        &self,
        name: &str,
    ) -> Result<RxNormSpellingResponse, MedQueryError> {
        let name =
            crate::sources::required_arg(name, "Drug name", "medquery spelling ambienn")?;
        self.get_json("spellingsuggestions.json", &[("name", name)])
            .await
    }

    /// Approximate-term match; `max_entries` defaults to 5.
    pub async fn approximate_term(
        &self,
        term: &str,
        max_entries: Option<usize>,
    ) -> Result<RxNormApproximateResponse, MedQueryError> {
        let term = crate::sources::required_arg(term, "Term", "medquery approximate zocor")?;
        let max_entries = max_entries
            .unwrap_or(DEFAULT_APPROXIMATE_MAX_ENTRIES)
            .to_string();
        self.get_json(
            "approximateTerm.json",
            &[("term", term), ("maxEntries", max_entries.as_str())],
        )
        .await
    }

    /// Dose-form groups related to a concept (`related.json?tty=DFG`).
    pub async fn related_dose_form_groups(
        &self,
        rxcui: &str,
    ) -> Result<RxNormRelatedResponse, MedQueryError> {
        let rxcui =
            crate::sources::required_arg(rxcui, "RxCUI", "medquery dose-form-groups 161")?;
        if !rxcui.chars().all(|c| c.is_ascii_digit()) {
            return Err(MedQueryError::InvalidArgument(format!(
                "RxCUI must be numeric, got '{rxcui}'"
            )));
        }
        let path = format!("rxcui/{rxcui}/related.json");
        self.get_json(&path, &[("tty", "DFG")]).await
    }

    /// Drug-group search (`drugs.json`), the input to catalog compilation.
    pub async fn drugs(&self, name: &str) -> Result<RxNormDrugsResponse, MedQueryError> {
        let name = crate::sources::required_arg(name, "Drug name", "medquery drugs cymbalta")?;
        self.get_json("drugs.json", &[("name", name)]).await
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RxNormIdResponse {
    #[serde(default)]
    pub id_group: Option<RxNormIdGroup>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RxNormIdGroup {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub rxnorm_id: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RxNormSpellingResponse {
    #[serde(default)]
    pub suggestion_group: Option<RxNormSuggestionGroup>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RxNormSuggestionGroup {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub suggestion_list: Option<RxNormSuggestionList>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RxNormSuggestionList {
    #[serde(default)]
    pub suggestion: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RxNormApproximateResponse {
    #[serde(default)]
    pub approximate_group: Option<RxNormApproximateGroup>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RxNormApproximateGroup {
    #[serde(default)]
    pub input_term: Option<String>,
    #[serde(default)]
    pub candidate: Vec<RxNormCandidate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RxNormCandidate {
    #[serde(default)]
    pub rxcui: String,
    #[serde(default)]
    pub rxaui: Option<String>,
    #[serde(default)]
    pub score: Option<String>,
    #[serde(default)]
    pub rank: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RxNormRelatedResponse {
    #[serde(default)]
    pub related_group: Option<RxNormRelatedGroup>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RxNormRelatedGroup {
    #[serde(default)]
    pub rxcui: Option<String>,
    #[serde(default)]
    pub concept_group: Vec<RxNormConceptGroup>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RxNormDrugsResponse {
    #[serde(default)]
    pub drug_group: Option<RxNormDrugGroup>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RxNormDrugGroup {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub concept_group: Option<Vec<RxNormConceptGroup>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RxNormConceptGroup {
    #[serde(default)]
    pub tty: Option<String>,
    #[serde(default)]
    pub concept_properties: Option<Vec<RxNormConcept>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RxNormConcept {
    #[serde(default)]
    pub rxcui: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub synonym: String,
    #[serde(default)]
    pub tty: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub suppress: Option<String>,
    #[serde(default)]
    pub umlscui: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn rxcui_by_name_reads_id_group() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rxcui.json"))
            .and(query_param("name", "lipitor"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "idGroup": {"name": "lipitor", "rxnormId": ["153165"]}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = RxNavClient::new_for_test(server.uri()).unwrap();
        let resp = client.rxcui_by_name(" lipitor ").await.unwrap();
        let group = resp.id_group.unwrap();
        assert_eq!(group.rxnorm_id, vec!["153165"]);
    }

    #[tokio::test]
    async fn spelling_suggestions_tolerates_missing_list() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/spellingsuggestions.json"))
            .and(query_param("name", "zzzz"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "suggestionGroup": {"name": "zzzz", "suggestionList": null}
            })))
            .mount(&server)
            .await;

        let client = RxNavClient::new_for_test(server.uri()).unwrap();
        let resp = client.spelling_suggestions("zzzz").await.unwrap();
        assert!(resp.suggestion_group.unwrap().suggestion_list.is_none());
    }

    #[tokio::test]
    async fn approximate_term_defaults_max_entries_to_five() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/approximateTerm.json"))
            .and(query_param("term", "zocor"))
            .and(query_param("maxEntries", "5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "approximateGroup": {
                    "inputTerm": "zocor",
                    "candidate": [
                        {"rxcui": "196503", "rxaui": "2514537", "score": "100", "rank": "1"}
                    ]
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = RxNavClient::new_for_test(server.uri()).unwrap();
        let resp = client.approximate_term("zocor", None).await.unwrap();
        let group = resp.approximate_group.unwrap();
        assert_eq!(group.candidate.len(), 1);
        assert_eq!(group.candidate[0].rxcui, "196503");
        assert_eq!(group.candidate[0].score.as_deref(), Some("100"));
    }

    #[tokio::test]
    async fn approximate_term_forwards_explicit_max_entries() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/approximateTerm.json"))
            .and(query_param("maxEntries", "12"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "approximateGroup": {"inputTerm": "zocor"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = RxNavClient::new_for_test(server.uri()).unwrap();
        let resp = client.approximate_term("zocor", Some(12)).await.unwrap();
        assert!(resp.approximate_group.unwrap().candidate.is_empty());
    }

    #[tokio::test]
    async fn related_dose_form_groups_uses_rxcui_path() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rxcui/161/related.json"))
            .and(query_param("tty", "DFG"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "relatedGroup": {
                    "rxcui": "161",
                    "termType": ["DFG"],
                    "conceptGroup": [{
                        "tty": "DFG",
                        "conceptProperties": [
                            {"rxcui": "1151131", "name": "Oral Product", "synonym": "", "tty": "DFG"}
                        ]
                    }]
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = RxNavClient::new_for_test(server.uri()).unwrap();
        let resp = client.related_dose_form_groups("161").await.unwrap();
        let group = resp.related_group.unwrap();
        assert_eq!(group.concept_group.len(), 1);
        let concepts = group.concept_group[0].concept_properties.as_ref().unwrap();
        assert_eq!(concepts[0].name, "Oral Product");
    }

    #[tokio::test]
    async fn related_dose_form_groups_rejects_non_numeric_rxcui() {
        let client = RxNavClient::new_for_test("http://127.0.0.1".into()).unwrap();
        let err = client
            .related_dose_form_groups("161/../drugs")
            .await
            .unwrap_err();
        assert!(matches!(err, MedQueryError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn drugs_reports_invalid_json_as_parse_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/drugs.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<<not json>>"))
            .mount(&server)
            .await;

        let client = RxNavClient::new_for_test(server.uri()).unwrap();
        let err = client.drugs("cymbalta").await.unwrap_err();
        assert!(matches!(err, MedQueryError::ApiJson { .. }));
    }

    #[test]
    fn drugs_response_tolerates_missing_groups() {
        let resp: RxNormDrugsResponse =
            serde_json::from_str(r#"{"drugGroup": {"name": null}}"#).unwrap();
        let group = resp.drug_group.unwrap();
        assert!(group.concept_group.is_none());

        let resp: RxNormDrugsResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.drug_group.is_none());
    }
}
