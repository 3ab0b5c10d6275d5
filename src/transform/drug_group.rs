//! Dose-form and brand classification of RxNorm drug-group search results.
//!
//! Matching is plain case-sensitive substring search over the vocabulary, in
//! vocabulary order. A label that is a substring of another label matches
//! inside it too ("Tablet" inside "Chewable Tablet"); whichever comes first in
//! the vocabulary is recorded first.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::entities::dose_form::DoseFormVocabulary;
use crate::entities::drug_group::{CompiledCatalog, CompiledDrugConcept};
use crate::sources::rxnav::{RxNormConcept, RxNormDrugsResponse};

pub(crate) const OTHER_DOSE_FORM: &str = "Other";
pub(crate) const GENERIC_BRAND: &str = "Generic";

const PACKAGE_TTYS: [&str; 2] = ["GPCK", "BPCK"];

fn brand_pattern() -> &'static Regex {
    static BRAND_RE: OnceLock<Regex> = OnceLock::new();
    BRAND_RE.get_or_init(|| Regex::new(r"\[([^\]]+)\]").expect("valid regex"))
}

fn is_package(tty: &str) -> bool {
    PACKAGE_TTYS.contains(&tty)
}

/// Catalog-level lists, deduplicated in first-seen order.
#[derive(Debug, Default)]
struct CatalogAccumulator {
    concepts: Vec<CompiledDrugConcept>,
    dfg: Vec<String>,
    brand: Vec<String>,
    seen_dfg: HashSet<String>,
    seen_brand: HashSet<String>,
}

impl CatalogAccumulator {
    fn record(&mut self, classified: ClassifiedConcept) {
        let ClassifiedConcept { concept, bracketed } = classified;
        for label in &concept.dfg {
            if self.seen_dfg.insert(label.clone()) {
                self.dfg.push(label.clone());
            }
        }
        if bracketed && self.seen_brand.insert(concept.brand.clone()) {
            self.brand.push(concept.brand.clone());
        }
        self.concepts.push(concept);
    }

    fn finish(self, name: Option<String>) -> CompiledCatalog {
        CompiledCatalog {
            name,
            concepts: self.concepts,
            dfg: self.dfg,
            brand: self.brand,
        }
    }
}

struct ClassifiedConcept {
    concept: CompiledDrugConcept,
    /// The brand came from a bracketed name annotation rather than the fallback.
    bracketed: bool,
}

fn dedup_preserving_order<'a>(labels: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    labels
        .into_iter()
        .filter(|label| seen.insert(*label))
        .map(str::to_string)
        .collect()
}

/// Matches vocabulary labels against the name, then the synonym.
///
/// Returns the deduplicated labels and the name with the first occurrence of
/// each name-matched label removed. "Other" is used only when neither pass
/// matched anything.
fn match_dose_forms(
    name: &str,
    synonym: &str,
    vocabulary: &DoseFormVocabulary,
) -> (Vec<String>, String) {
    let labels = || {
        vocabulary
            .labels()
            .iter()
            .map(String::as_str)
            .filter(|label| !label.is_empty())
    };

    let mut matched: Vec<&str> = Vec::new();
    let mut stripped = name.to_string();
    for label in labels().filter(|label| name.contains(label)) {
        matched.push(label);
        stripped = stripped.replacen(label, "", 1);
    }
    matched.extend(labels().filter(|label| synonym.contains(label)));

    if matched.is_empty() {
        matched.push(OTHER_DOSE_FORM);
    }
    (dedup_preserving_order(matched), stripped)
}

/// Inner text of the last `[...]` annotation in `name`.
fn extract_brand(name: &str) -> Option<&str> {
    brand_pattern()
        .captures_iter(name)
        .last()
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

fn strip_brand_annotation(display: &str, brand: &str) -> String {
    let annotation = format!("[{brand}]");
    match display.rfind(&annotation) {
        Some(start) => {
            let mut out = String::with_capacity(display.len());
            out.push_str(&display[..start]);
            out.push_str(&display[start + annotation.len()..]);
            out
        }
        None => display.to_string(),
    }
}

fn classify_concept(concept: &RxNormConcept, vocabulary: &DoseFormVocabulary) -> ClassifiedConcept {
    let (dfg, stripped) = match_dose_forms(&concept.name, &concept.synonym, vocabulary);
    let bracketed_brand = extract_brand(&concept.name);
    let brand = bracketed_brand.unwrap_or(GENERIC_BRAND).to_string();
    let modified_name = match bracketed_brand {
        Some(b) => strip_brand_annotation(&stripped, b),
        None => stripped,
    };

    ClassifiedConcept {
        concept: CompiledDrugConcept {
            rxcui: concept.rxcui.clone(),
            name: concept.name.clone(),
            synonym: concept.synonym.clone(),
            tty: concept.tty.clone(),
            dfg,
            brand,
            modified_name,
        },
        bracketed: bracketed_brand.is_some(),
    }
}

fn non_package_concepts(response: &RxNormDrugsResponse) -> impl Iterator<Item = &RxNormConcept> {
    response
        .drug_group
        .iter()
        .flat_map(|group| group.concept_group.iter().flatten())
        .flat_map(|group| group.concept_properties.iter().flatten())
        .filter(|concept| !is_package(&concept.tty))
}

/// Builds the classified catalog for one drugs search response.
///
/// Absent drug or concept groups yield an empty catalog.
pub(crate) fn compile_catalog(
    response: &RxNormDrugsResponse,
    vocabulary: &DoseFormVocabulary,
) -> CompiledCatalog {
    let mut acc = CatalogAccumulator::default();
    for concept in non_package_concepts(response) {
        acc.record(classify_concept(concept, vocabulary));
    }
    let name = response
        .drug_group
        .as_ref()
        .and_then(|group| group.name.clone())
        .filter(|name| !name.trim().is_empty());
    acc.finish(name)
}
