use std::borrow::Cow;

use serde::Deserialize;

use crate::error::MedQueryError;

pub(crate) const OPENFDA_BASE: &str = "https://api.fda.gov";
const OPENFDA_API: &str = "openfda";
pub(crate) const OPENFDA_BASE_ENV: &str = "MEDQUERY_OPENFDA_BASE";

pub(crate) const REACTION_COUNT_FIELD: &str = "patient.reaction.reactionmeddrapt.exact";

pub struct OpenFdaClient {
    client: reqwest_middleware::ClientWithMiddleware,
    base: Cow<'static, str>,
}

impl OpenFdaClient {
    pub fn new() -> Result<Self, MedQueryError> {
        Ok(Self {
            client: crate::sources::shared_client()?,
            base: crate::sources::env_base(OPENFDA_BASE, OPENFDA_BASE_ENV),
        })
    }

    #[cfg(test)]
    fn new_for_test(base: String) -> Result<Self, MedQueryError> {
        Ok(Self {
            client: crate::sources::shared_client()?,
            base: Cow::Owned(base),
        })
    }

    pub(crate) fn escape_query_value(value: &str) -> String {
        crate::utils::query::escape_lucene_value(value)
    }

    /// Search expression matching reports that list the RxNorm concept.
    pub(crate) fn rxcui_query(rxcui: &str) -> String {
        format!("patient.drug.openfda.rxcui:{}", Self::escape_query_value(rxcui))
    }

    /// Search expression matching reports by generic or brand name.
    pub(crate) fn name_query(name: &str) -> String {
        let escaped = Self::escape_query_value(name);
        format!(
            "patient.drug.openfda.generic_name:\"{escaped}\"+patient.drug.openfda.brand_name:\"{escaped}\""
        )
    }

    async fn reaction_counts(
        &self,
        search: &str,
    ) -> Result<Option<OpenFdaCountResponse>, MedQueryError> {
        let url = crate::sources::join_endpoint(&self.base, "drug/event.json");
        let body = crate::sources::fetch_optional(
            &self.client,
            OPENFDA_API,
            &url,
            &[("search", search), ("count", REACTION_COUNT_FIELD)],
        )
        .await?;
        let Some(bytes) = body else {
            return Ok(None);
        };

        let value: serde_json::Value = crate::sources::decode_json(OPENFDA_API, &bytes)?;
        // openFDA reports "no matches" as an error object, sometimes with a 200.
        if value
            .get("error")
            .and_then(serde_json::Value::as_object)
            .is_some()
        {
            return Ok(None);
        }

        serde_json::from_value::<OpenFdaCountResponse>(value)
            .map(Some)
            .map_err(|source| MedQueryError::ApiJson {
                api: OPENFDA_API.to_string(),
                source,
            })
    }

    /// Counts reported reactions for adverse-event reports naming `rxcui`.
    pub async fn reactions_by_rxcui(
        &self,
        rxcui: &str,
    ) -> Result<Option<OpenFdaCountResponse>, MedQueryError> {
        let rxcui = crate::sources::required_arg(
            rxcui,
            "RxCUI",
            "medquery adverse-events --rxcui 161",
        )?;
        self.reaction_counts(&Self::rxcui_query(rxcui)).await
    }

    /// Counts reported reactions for adverse-event reports naming the drug
    /// by generic or brand name.
    pub async fn reactions_by_name(
        &self,
        name: &str,
    ) -> Result<Option<OpenFdaCountResponse>, MedQueryError> {
        let name = crate::sources::required_arg(
            name,
            "Drug name",
            "medquery adverse-events --name ibuprofen",
        )?;
        self.reaction_counts(&Self::name_query(name)).await
    }
}

#[derive(Debug, Deserialize)]
pub struct OpenFdaCountResponse {
    #[serde(default)]
    #[allow(dead_code)]
    pub meta: serde_json::Value,
    #[serde(default)]
    pub results: Vec<OpenFdaCountBucket>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenFdaCountBucket {
    pub term: String,
    pub count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn rxcui_query_targets_openfda_rxcui_field() {
        assert_eq!(
            OpenFdaClient::rxcui_query("161"),
            "patient.drug.openfda.rxcui:161"
        );
    }

    #[test]
    fn name_query_escapes_and_quotes_both_fields() {
        assert_eq!(
            OpenFdaClient::name_query("co-trimoxazole"),
            r#"patient.drug.openfda.generic_name:"co\-trimoxazole"+patient.drug.openfda.brand_name:"co\-trimoxazole""#
        );
    }

    #[tokio::test]
    async fn reactions_by_rxcui_requests_count_endpoint() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/drug/event.json"))
            .and(query_param("search", "patient.drug.openfda.rxcui:161"))
            .and(query_param("count", REACTION_COUNT_FIELD))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "meta": {"disclaimer": "Do not rely on openFDA to make decisions"},
                "results": [
                    {"term": "NAUSEA", "count": 812},
                    {"term": "HEADACHE", "count": 455}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenFdaClient::new_for_test(server.uri()).unwrap();
        let resp = client.reactions_by_rxcui("161").await.unwrap().unwrap();
        assert_eq!(resp.results.len(), 2);
        assert_eq!(resp.results[0].term, "NAUSEA");
        assert_eq!(resp.results[0].count, 812);
    }

    #[tokio::test]
    async fn reactions_by_name_treats_not_found_as_empty() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/drug/event.json"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "error": {"code": "NOT_FOUND", "message": "No matches found!"}
            })))
            .mount(&server)
            .await;

        let client = OpenFdaClient::new_for_test(server.uri()).unwrap();
        let resp = client.reactions_by_name("notadrug").await.unwrap();
        assert!(resp.is_none());
    }

    #[tokio::test]
    async fn reactions_by_name_rejects_blank_name() {
        let client = OpenFdaClient::new_for_test("http://127.0.0.1".into()).unwrap();
        let err = client.reactions_by_name("  ").await.unwrap_err();
        assert!(matches!(err, MedQueryError::InvalidArgument(_)));
    }
}
