use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::entities::dose_form::{self, DoseFormVocabulary};
use crate::error::MedQueryError;
use crate::sources::rxnav::RxNavClient;
use crate::transform;

/// One non-package RxNorm concept annotated with dose forms and brand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledDrugConcept {
    pub rxcui: String,
    pub name: String,
    pub synonym: String,
    pub tty: String,
    pub dfg: Vec<String>,
    pub brand: String,
    #[serde(rename = "modifiedname")]
    pub modified_name: String,
}

/// Classified view of one drugs search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledCatalog {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "compiled")]
    pub concepts: Vec<CompiledDrugConcept>,
    pub dfg: Vec<String>,
    pub brand: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DoseFormSection<'a> {
    pub label: &'a str,
    pub concepts: Vec<&'a CompiledDrugConcept>,
}

impl CompiledCatalog {
    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }

    /// Concepts grouped under each catalog dose form, in catalog order.
    /// A concept with several dose forms appears in each of their sections.
    pub fn sections(&self) -> Vec<DoseFormSection<'_>> {
        self.dfg
            .iter()
            .map(|label| DoseFormSection {
                label,
                concepts: self
                    .concepts
                    .iter()
                    .filter(|c| c.dfg.iter().any(|d| d == label))
                    .collect(),
            })
            .collect()
    }

    pub fn concepts_for_brand<'a>(
        &'a self,
        brand: &'a str,
    ) -> impl Iterator<Item = &'a CompiledDrugConcept> + 'a {
        self.concepts.iter().filter(move |c| c.brand == brand)
    }
}

/// Fetches the RxNorm drug group for `name` and classifies it.
///
/// # Errors
///
/// Returns an error when the upstream request fails or the body is not JSON.
pub async fn search(
    name: &str,
    vocabulary: &DoseFormVocabulary,
) -> Result<CompiledCatalog, MedQueryError> {
    let client = RxNavClient::new()?;
    search_with_client(&client, name, vocabulary).await
}

/// Like [`search`], resolving the vocabulary first (see [`dose_form::resolve`]).
///
/// # Errors
///
/// Also fails when the selected vocabulary file cannot be read.
pub async fn search_with_vocabulary_path(
    name: &str,
    vocabulary_path: Option<&Path>,
) -> Result<CompiledCatalog, MedQueryError> {
    let vocabulary = dose_form::resolve(vocabulary_path).await?;
    search(name, &vocabulary).await
}

pub(crate) async fn search_with_client(
    client: &RxNavClient,
    name: &str,
    vocabulary: &DoseFormVocabulary,
) -> Result<CompiledCatalog, MedQueryError> {
    let resp = client.drugs(name).await?;
    let catalog = transform::drug_group::compile_catalog(&resp, vocabulary);
    debug!(
        query = name.trim(),
        concepts = catalog.concepts.len(),
        dose_forms = catalog.dfg.len(),
        brands = catalog.brand.len(),
        "Compiled drug catalog"
    );
    Ok(catalog)
}
