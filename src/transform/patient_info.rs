use std::sync::OnceLock;

use regex::Regex;

use crate::entities::patient_info::PatientInfoEntry;
use crate::sources::medlineplus::{MedlinePlusEntry, MedlinePlusText};

fn decode_html_entities(value: &str) -> String {
    value
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
}

fn strip_html_tags(value: &str) -> String {
    static HTML_TAG_RE: OnceLock<Regex> = OnceLock::new();
    let re = HTML_TAG_RE.get_or_init(|| Regex::new(r"(?is)<[^>]+>").expect("valid regex"));
    re.replace_all(value, " ").to_string()
}

fn clean_text(value: Option<&MedlinePlusText>) -> Option<String> {
    let raw = value?.value.as_deref()?;
    let text = decode_html_entities(&strip_html_tags(raw));
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.is_empty() { None } else { Some(text) }
}

/// Prefers the `alternate` link, else the first link with an href.
fn entry_url(entry: &MedlinePlusEntry) -> Option<String> {
    let hrefs = || {
        entry
            .link
            .iter()
            .filter(|l| l.href.as_deref().is_some_and(|h| !h.trim().is_empty()))
    };
    hrefs()
        .find(|l| l.rel.as_deref() == Some("alternate"))
        .or_else(|| hrefs().next())
        .and_then(|l| l.href.as_deref())
        .map(|h| h.trim().to_string())
}

pub(crate) fn entry_from_medlineplus(entry: &MedlinePlusEntry) -> Option<PatientInfoEntry> {
    let title = clean_text(entry.title.as_ref())?;
    Some(PatientInfoEntry {
        title,
        url: entry_url(entry),
        summary: clean_text(entry.summary.as_ref()),
    })
}
