use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::error::MedQueryError;

const BUNDLED_DOSE_FORMS: &str = include_str!("../../data/dose_form_groups.txt");
const DOSE_FORMS_ENV: &str = "MEDQUERY_DOSE_FORMS";

/// Ordered list of known dose-form labels.
///
/// Order is significant: when several labels occur in a drug name, they are
/// recorded in vocabulary order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DoseFormVocabulary {
    labels: Vec<String>,
}

impl DoseFormVocabulary {
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    /// One label per line; lines are trimmed and blank lines skipped.
    /// Duplicates are kept as-is.
    pub fn parse(text: &str) -> Self {
        Self::from_labels(
            text.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty()),
        )
    }

    pub fn bundled() -> Self {
        Self::parse(BUNDLED_DOSE_FORMS)
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self, MedQueryError> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| MedQueryError::Vocabulary {
                path: path.to_path_buf(),
                source,
            })?;
        let vocabulary = Self::parse(&text);
        debug!(
            path = %path.display(),
            labels = vocabulary.len(),
            "Loaded dose-form vocabulary"
        );
        Ok(vocabulary)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VocabularySource {
    Explicit(PathBuf),
    Env(PathBuf),
    UserConfig(PathBuf),
    Bundled,
}

fn select_source(
    explicit: Option<&Path>,
    env_value: Option<String>,
    user_path: PathBuf,
    user_path_exists: bool,
) -> VocabularySource {
    if let Some(path) = explicit {
        return VocabularySource::Explicit(path.to_path_buf());
    }
    if let Some(value) = env_value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
    {
        return VocabularySource::Env(PathBuf::from(value));
    }
    if user_path_exists {
        return VocabularySource::UserConfig(user_path);
    }
    VocabularySource::Bundled
}

/// Picks the vocabulary: explicit path, then `MEDQUERY_DOSE_FORMS`, then the
/// per-user config file, then the bundled list.
///
/// # Errors
///
/// Returns [`MedQueryError::Vocabulary`] when a selected file cannot be read.
pub async fn resolve(explicit: Option<&Path>) -> Result<DoseFormVocabulary, MedQueryError> {
    let user_path = crate::utils::paths::user_dose_forms_path();
    let user_path_exists = tokio::fs::metadata(&user_path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false);
    let source = select_source(
        explicit,
        std::env::var(DOSE_FORMS_ENV).ok(),
        user_path,
        user_path_exists,
    );

    match source {
        VocabularySource::Explicit(path)
        | VocabularySource::Env(path)
        | VocabularySource::UserConfig(path) => DoseFormVocabulary::load(path).await,
        VocabularySource::Bundled => Ok(DoseFormVocabulary::bundled()),
    }
}
