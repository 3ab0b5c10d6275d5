use std::collections::HashSet;

use crate::entities::concept::{ApproximateCandidate, DoseFormGroup};
use crate::sources::rxnav::{RxNormCandidate, RxNormRelatedGroup};

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub(crate) fn approximate_candidate(candidate: &RxNormCandidate) -> Option<ApproximateCandidate> {
    let rxcui = candidate.rxcui.trim();
    if rxcui.is_empty() {
        return None;
    }
    Some(ApproximateCandidate {
        rxcui: rxcui.to_string(),
        rxaui: non_blank(candidate.rxaui.as_deref()),
        name: non_blank(candidate.name.as_deref()),
        score: candidate
            .score
            .as_deref()
            .and_then(|v| v.trim().parse::<f64>().ok()),
        rank: candidate
            .rank
            .as_deref()
            .and_then(|v| v.trim().parse::<u32>().ok()),
    })
}

/// DFG concepts from a related-concepts response, first occurrence wins.
pub(crate) fn dose_form_groups(group: &RxNormRelatedGroup) -> Vec<DoseFormGroup> {
    let mut seen: HashSet<&str> = HashSet::new();
    group
        .concept_group
        .iter()
        .filter(|g| g.tty.as_deref().is_none_or(|tty| tty == "DFG"))
        .flat_map(|g| g.concept_properties.iter().flatten())
        .filter(|c| !c.name.trim().is_empty() && seen.insert(c.rxcui.as_str()))
        .map(|c| DoseFormGroup {
            rxcui: c.rxcui.clone(),
            name: c.name.trim().to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approximate_candidate_parses_numeric_strings() {
        let candidate = RxNormCandidate {
            rxcui: "196503".into(),
            rxaui: Some("2514537".into()),
            score: Some("8.5".into()),
            rank: Some("1".into()),
            name: None,
            source: None,
        };
        let out = approximate_candidate(&candidate).unwrap();
        assert_eq!(out.score, Some(8.5));
        assert_eq!(out.rank, Some(1));
        assert!(out.name.is_none());
    }

    #[test]
    fn approximate_candidate_skips_blank_rxcui() {
        let candidate = RxNormCandidate {
            rxcui: " ".into(),
            ..RxNormCandidate::default()
        };
        assert!(approximate_candidate(&candidate).is_none());
    }

    #[test]
    fn dose_form_groups_dedupes_and_skips_empty_groups() {
        let group: RxNormRelatedGroup = serde_json::from_value(serde_json::json!({
            "rxcui": "161",
            "conceptGroup": [
                {"tty": "DFG", "conceptProperties": [
                    {"rxcui": "1151131", "name": "Oral Product", "tty": "DFG"},
                    {"rxcui": "1151133", "name": "Pill", "tty": "DFG"},
                    {"rxcui": "1151131", "name": "Oral Product", "tty": "DFG"}
                ]},
                {"tty": "DFG"}
            ]
        }))
        .unwrap();

        let groups = dose_form_groups(&group);
        assert_eq!(
            groups,
            vec![
                DoseFormGroup {
                    rxcui: "1151131".into(),
                    name: "Oral Product".into()
                },
                DoseFormGroup {
                    rxcui: "1151133".into(),
                    name: "Pill".into()
                },
            ]
        );
    }
}
