use std::sync::OnceLock;

use minijinja::{Environment, context};

use crate::entities::adverse_event::ReactionSummary;
use crate::entities::concept::{
    ApproximateMatches, ConceptIds, RelatedDoseFormGroups, SpellingSuggestions,
};
use crate::entities::drug_group::CompiledCatalog;
use crate::entities::patient_info::PatientInfo;
use crate::entities::pill_image::PillImages;
use crate::error::MedQueryError;

static ENV: OnceLock<Environment<'static>> = OnceLock::new();

fn env() -> Result<&'static Environment<'static>, MedQueryError> {
    if let Some(env) = ENV.get() {
        return Ok(env);
    }

    let mut env = Environment::new();
    env.add_filter("truncate", |s: String, max_bytes: usize| -> String {
        if s.len() <= max_bytes {
            return s;
        }
        if max_bytes == 0 {
            return "…".to_string();
        }
        let mut boundary = max_bytes;
        while boundary > 0 && !s.is_char_boundary(boundary) {
            boundary -= 1;
        }
        let mut out = s[..boundary].trim_end().to_string();
        out.push('…');
        out
    });
    env.add_filter("score", |v: f64| -> String {
        let mut out = format!("{v:.2}");
        while out.contains('.') && out.ends_with('0') {
            out.pop();
        }
        if out.ends_with('.') {
            out.pop();
        }
        out
    });
    env.add_template(
        "drug_catalog.md.j2",
        include_str!("../../templates/drug_catalog.md.j2"),
    )?;
    env.add_template(
        "reactions.md.j2",
        include_str!("../../templates/reactions.md.j2"),
    )?;
    env.add_template(
        "concept_ids.md.j2",
        include_str!("../../templates/concept_ids.md.j2"),
    )?;
    env.add_template(
        "spelling.md.j2",
        include_str!("../../templates/spelling.md.j2"),
    )?;
    env.add_template(
        "approximate.md.j2",
        include_str!("../../templates/approximate.md.j2"),
    )?;
    env.add_template(
        "dose_form_groups.md.j2",
        include_str!("../../templates/dose_form_groups.md.j2"),
    )?;
    env.add_template(
        "pill_images.md.j2",
        include_str!("../../templates/pill_images.md.j2"),
    )?;
    env.add_template(
        "patient_info.md.j2",
        include_str!("../../templates/patient_info.md.j2"),
    )?;

    let _ = ENV.set(env);
    Ok(ENV
        .get()
        .expect("ENV should be initialized by the time this is reached"))
}

pub fn drug_catalog_markdown(query: &str, catalog: &CompiledCatalog) -> Result<String, MedQueryError> {
    let tmpl = env()?.get_template("drug_catalog.md.j2")?;
    Ok(tmpl.render(context! {
        query => query.trim(),
        name => &catalog.name,
        concepts => catalog.concepts.len(),
        dfg => &catalog.dfg,
        brand => &catalog.brand,
        sections => catalog.sections(),
    })?)
}

pub fn reactions_markdown(summary: &ReactionSummary) -> Result<String, MedQueryError> {
    let tmpl = env()?.get_template("reactions.md.j2")?;
    Ok(tmpl.render(context! {
        query => &summary.query,
        count_field => &summary.count_field,
        reactions => &summary.reactions,
    })?)
}

pub fn concept_ids_markdown(ids: &ConceptIds) -> Result<String, MedQueryError> {
    let tmpl = env()?.get_template("concept_ids.md.j2")?;
    Ok(tmpl.render(context! {
        name => &ids.name,
        rxcuis => &ids.rxcuis,
    })?)
}

pub fn spelling_markdown(suggestions: &SpellingSuggestions) -> Result<String, MedQueryError> {
    let tmpl = env()?.get_template("spelling.md.j2")?;
    Ok(tmpl.render(context! {
        name => &suggestions.name,
        suggestions => &suggestions.suggestions,
    })?)
}

pub fn approximate_markdown(matches: &ApproximateMatches) -> Result<String, MedQueryError> {
    let tmpl = env()?.get_template("approximate.md.j2")?;
    Ok(tmpl.render(context! {
        term => &matches.term,
        max_entries => matches.max_entries,
        candidates => &matches.candidates,
    })?)
}

pub fn dose_form_groups_markdown(related: &RelatedDoseFormGroups) -> Result<String, MedQueryError> {
    let tmpl = env()?.get_template("dose_form_groups.md.j2")?;
    Ok(tmpl.render(context! {
        rxcui => &related.rxcui,
        groups => &related.groups,
    })?)
}

pub fn pill_images_markdown(images: &PillImages) -> Result<String, MedQueryError> {
    let tmpl = env()?.get_template("pill_images.md.j2")?;
    Ok(tmpl.render(context! {
        rxcui => &images.rxcui,
        images => &images.images,
    })?)
}

pub fn patient_info_markdown(info: &PatientInfo) -> Result<String, MedQueryError> {
    let tmpl = env()?.get_template("patient_info.md.j2")?;
    Ok(tmpl.render(context! {
        rxcui => &info.rxcui,
        entries => &info.entries,
    })?)
}
