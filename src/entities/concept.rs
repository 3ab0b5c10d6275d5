use serde::{Deserialize, Serialize};

use crate::error::MedQueryError;
use crate::sources::rxnav::{DEFAULT_APPROXIMATE_MAX_ENTRIES, RxNavClient};
use crate::transform;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConceptIds {
    pub name: String,
    pub rxcuis: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpellingSuggestions {
    pub name: String,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApproximateCandidate {
    pub rxcui: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rxaui: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApproximateMatches {
    pub term: String,
    pub max_entries: usize,
    pub candidates: Vec<ApproximateCandidate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoseFormGroup {
    pub rxcui: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelatedDoseFormGroups {
    pub rxcui: String,
    pub groups: Vec<DoseFormGroup>,
}

/// Resolves an exact drug name to RxNorm concept ids.
///
/// # Errors
///
/// Returns [`MedQueryError::NotFound`] when RxNorm has no concept for the name.
pub async fn lookup(name: &str) -> Result<ConceptIds, MedQueryError> {
    let client = RxNavClient::new()?;
    let resp = client.rxcui_by_name(name).await?;
    let name = name.trim().to_string();
    let rxcuis = resp
        .id_group
        .map(|group| group.rxnorm_id)
        .unwrap_or_default();
    if rxcuis.is_empty() {
        return Err(MedQueryError::NotFound {
            entity: "drug".into(),
            suggestion: format!(
                "Try: medquery spelling \"{name}\" or medquery approximate \"{name}\""
            ),
            id: name,
        });
    }
    Ok(ConceptIds { name, rxcuis })
}

/// # Errors
///
/// Returns an error when the request fails or the body is not JSON.
pub async fn spelling(name: &str) -> Result<SpellingSuggestions, MedQueryError> {
    let client = RxNavClient::new()?;
    let resp = client.spelling_suggestions(name).await?;
    let suggestions = resp
        .suggestion_group
        .and_then(|group| group.suggestion_list)
        .map(|list| list.suggestion)
        .unwrap_or_default();
    Ok(SpellingSuggestions {
        name: name.trim().to_string(),
        suggestions,
    })
}

/// Approximate-term candidates; `max_entries` defaults to 5.
///
/// # Errors
///
/// Returns an error when `max_entries` is zero, the request fails, or the body is not JSON.
pub async fn approximate(
    term: &str,
    max_entries: Option<usize>,
) -> Result<ApproximateMatches, MedQueryError> {
    if max_entries == Some(0) {
        return Err(MedQueryError::InvalidArgument(
            "--max-entries must be at least 1".into(),
        ));
    }
    let client = RxNavClient::new()?;
    let resp = client.approximate_term(term, max_entries).await?;
    let candidates = resp
        .approximate_group
        .map(|group| group.candidate)
        .unwrap_or_default()
        .iter()
        .filter_map(transform::concept::approximate_candidate)
        .collect();
    Ok(ApproximateMatches {
        term: term.trim().to_string(),
        max_entries: max_entries.unwrap_or(DEFAULT_APPROXIMATE_MAX_ENTRIES),
        candidates,
    })
}

/// Dose-form groups RxNorm relates to a concept.
///
/// # Errors
///
/// Returns an error for a non-numeric RxCUI, a failed request, or a non-JSON body.
pub async fn dose_form_groups(rxcui: &str) -> Result<RelatedDoseFormGroups, MedQueryError> {
    let client = RxNavClient::new()?;
    let resp = client.related_dose_form_groups(rxcui).await?;
    let groups = resp
        .related_group
        .map(|group| transform::concept::dose_form_groups(&group))
        .unwrap_or_default();
    Ok(RelatedDoseFormGroups {
        rxcui: rxcui.trim().to_string(),
        groups,
    })
}
