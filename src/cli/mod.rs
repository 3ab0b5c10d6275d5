//! Command-line front-end: argument parsing and per-command dispatch.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use crate::entities;
use crate::error::MedQueryError;
use crate::render;

pub mod health;

#[derive(Parser, Debug)]
#[command(
    name = "medquery",
    version,
    about = "Medication information from openFDA, RxNorm, RxImage and MedlinePlus"
)]
pub struct Cli {
    /// Print JSON instead of markdown
    #[arg(long, global = true)]
    pub json: bool,

    /// Dose-form vocabulary file (one label per line)
    #[arg(long, global = true, value_name = "PATH")]
    pub dose_forms: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Most-reported adverse reactions from openFDA FAERS
    AdverseEvents(AdverseEventsArgs),
    /// Resolve an exact drug name to RxNorm concept ids
    Rxcui {
        /// Drug name (e.g. lipitor)
        name: String,
    },
    /// RxNorm spelling suggestions for a drug name
    Spelling {
        /// Possibly misspelled drug name
        name: String,
    },
    /// Ranked approximate RxNorm matches for a term
    Approximate {
        /// Free-text term (e.g. "zocor 10 mg")
        term: String,
        /// Maximum number of candidates (default: 5)
        #[arg(long)]
        max_entries: Option<usize>,
    },
    /// Dose-form groups related to an RxNorm concept
    DoseFormGroups {
        /// RxNorm concept id
        rxcui: String,
    },
    /// Pill images for an RxNorm concept
    Images {
        /// RxNorm concept id
        rxcui: String,
    },
    /// MedlinePlus patient information for an RxNorm concept
    PatientInfo {
        /// RxNorm concept id
        rxcui: String,
        /// Display name sent alongside the concept id
        #[arg(long)]
        name: Option<String>,
    },
    /// Drug concepts for a name, classified by dose form and brand
    Drugs {
        /// Drug name (e.g. ibuprofen)
        name: String,
    },
    /// Check upstream connectivity and the dose-form vocabulary
    Health {
        /// Skip the vocabulary check
        #[arg(long)]
        apis_only: bool,
    },
    /// Show version
    Version,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct AdverseEventsArgs {
    /// RxNorm concept id listed on the reports
    #[arg(long)]
    pub rxcui: Option<String>,
    /// Generic or brand name listed on the reports
    #[arg(long)]
    pub name: Option<String>,
}

fn render_output<T: Serialize>(
    json: bool,
    value: &T,
    markdown: impl FnOnce(&T) -> Result<String, MedQueryError>,
) -> Result<String, MedQueryError> {
    if json {
        render::json::to_pretty(value)
    } else {
        markdown(value)
    }
}

/// Runs one parsed command and returns the text to print.
///
/// # Errors
///
/// Returns the underlying [`MedQueryError`] (wrapped in `anyhow`) when a
/// request, the vocabulary, or rendering fails.
pub async fn run(cli: Cli) -> anyhow::Result<String> {
    let Cli {
        json,
        dose_forms,
        command,
    } = cli;

    let out = match command {
        Commands::AdverseEvents(AdverseEventsArgs { rxcui, name }) => {
            let summary = match (rxcui, name) {
                (Some(rxcui), _) => entities::adverse_event::reactions_by_rxcui(&rxcui).await?,
                (None, Some(name)) => entities::adverse_event::reactions_by_name(&name).await?,
                (None, None) => {
                    return Err(MedQueryError::InvalidArgument(
                        "Provide --rxcui or --name".into(),
                    )
                    .into());
                }
            };
            render_output(json, &summary, render::markdown::reactions_markdown)?
        }
        Commands::Rxcui { name } => {
            let ids = entities::concept::lookup(&name).await?;
            render_output(json, &ids, render::markdown::concept_ids_markdown)?
        }
        Commands::Spelling { name } => {
            let suggestions = entities::concept::spelling(&name).await?;
            render_output(json, &suggestions, render::markdown::spelling_markdown)?
        }
        Commands::Approximate { term, max_entries } => {
            let matches = entities::concept::approximate(&term, max_entries).await?;
            render_output(json, &matches, render::markdown::approximate_markdown)?
        }
        Commands::DoseFormGroups { rxcui } => {
            let related = entities::concept::dose_form_groups(&rxcui).await?;
            render_output(json, &related, render::markdown::dose_form_groups_markdown)?
        }
        Commands::Images { rxcui } => {
            let images = entities::pill_image::images(&rxcui).await?;
            render_output(json, &images, render::markdown::pill_images_markdown)?
        }
        Commands::PatientInfo { rxcui, name } => {
            let info = entities::patient_info::get(&rxcui, name.as_deref()).await?;
            render_output(json, &info, render::markdown::patient_info_markdown)?
        }
        Commands::Drugs { name } => {
            let catalog =
                entities::drug_group::search_with_vocabulary_path(&name, dose_forms.as_deref())
                    .await?;
            render_output(json, &catalog, |catalog| {
                render::markdown::drug_catalog_markdown(&name, catalog)
            })?
        }
        Commands::Health { apis_only } => {
            let report = health::check(apis_only, dose_forms.as_deref()).await?;
            if json {
                render::json::to_pretty(&report)?
            } else {
                report.to_markdown()
            }
        }
        Commands::Version => format!("medquery {}", env!("CARGO_PKG_VERSION")),
    };
    Ok(out)
}
