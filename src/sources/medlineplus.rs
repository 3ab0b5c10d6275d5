use std::borrow::Cow;

use serde::Deserialize;

use crate::error::MedQueryError;

pub(crate) const MEDLINEPLUS_BASE: &str =
    "https://apps.nlm.nih.gov/medlineplus/services/mpconnect_service.cfm";
const MEDLINEPLUS_API: &str = "medlineplus";
pub(crate) const MEDLINEPLUS_BASE_ENV: &str = "MEDQUERY_MEDLINEPLUS_BASE";

/// HL7 OID for the RxNorm code system.
const RXNORM_CODE_SYSTEM: &str = "2.16.840.1.113883.6.88";

pub struct MedlinePlusClient {
    client: reqwest_middleware::ClientWithMiddleware,
    base: Cow<'static, str>,
}

impl MedlinePlusClient {
    pub fn new() -> Result<Self, MedQueryError> {
        Ok(Self {
            client: crate::sources::shared_client()?,
            base: crate::sources::env_base(MEDLINEPLUS_BASE, MEDLINEPLUS_BASE_ENV),
        })
    }

    #[cfg(test)]
    fn new_for_test(base: String) -> Result<Self, MedQueryError> {
        Ok(Self {
            client: crate::sources::shared_client()?,
            base: Cow::Owned(base),
        })
    }

    /// MedlinePlus Connect lookup for an RxNorm concept.
    ///
    /// `display_name` is forwarded as the concept display name when present.
    pub async fn connect(
        &self,
        rxcui: &str,
        display_name: Option<&str>,
    ) -> Result<MedlinePlusResponse, MedQueryError> {
        let rxcui =
            crate::sources::required_arg(rxcui, "RxCUI", "medquery patient-info 637188")?;
        let display_name = display_name.map(str::trim).unwrap_or_default();
        let bytes = crate::sources::fetch(
            &self.client,
            MEDLINEPLUS_API,
            self.base.as_ref(),
            &[
                ("mainSearchCriteria.v.cs", RXNORM_CODE_SYSTEM),
                ("mainSearchCriteria.v.c", rxcui),
                ("mainSearchCriteria.v.dn", display_name),
                ("informationRecipient.languageCode.c", "en"),
                ("knowledgeResponseType", "application/json"),
            ],
        )
        .await?;
        crate::sources::decode_json(MEDLINEPLUS_API, &bytes)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MedlinePlusResponse {
    #[serde(default)]
    pub feed: Option<MedlinePlusFeed>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MedlinePlusFeed {
    #[serde(default)]
    pub title: Option<MedlinePlusText>,
    #[serde(default)]
    pub entry: Vec<MedlinePlusEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MedlinePlusEntry {
    #[serde(default)]
    pub title: Option<MedlinePlusText>,
    #[serde(default)]
    pub link: Vec<MedlinePlusLink>,
    #[serde(default)]
    pub summary: Option<MedlinePlusText>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MedlinePlusText {
    #[serde(rename = "_value", default)]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MedlinePlusLink {
    #[serde(default)]
    pub href: Option<String>,
    #[serde(default)]
    pub rel: Option<String>,
}
