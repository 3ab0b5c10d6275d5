use std::path::Path;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use futures::future::join_all;

use crate::entities::dose_form;
use crate::error::MedQueryError;
use crate::sources::{
    env_base, join_endpoint, medlineplus, openfda, rximage, rxnav,
};

#[derive(Debug, Clone, serde::Serialize)]
pub struct HealthRow {
    pub api: String,
    pub status: String,
    pub latency: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct HealthReport {
    pub healthy: usize,
    pub total: usize,
    pub rows: Vec<HealthRow>,
}

impl HealthReport {
    fn from_rows(rows: Vec<HealthRow>) -> Self {
        let healthy = rows.iter().filter(|r| r.status == "ok").count();
        Self {
            healthy,
            total: rows.len(),
            rows,
        }
    }

    pub fn all_healthy(&self) -> bool {
        self.healthy == self.total
    }

    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str("# MedQuery Health Check\n\n");
        out.push_str("| API | Status | Latency |\n");
        out.push_str("|-----|--------|---------|\n");
        for row in &self.rows {
            out.push_str(&format!(
                "| {} | {} | {} |\n",
                row.api, row.status, row.latency
            ));
        }
        out.push_str(&format!(
            "\nStatus: {}/{} checks healthy\n",
            self.healthy, self.total
        ));
        out
    }
}

struct Probe {
    api: &'static str,
    url: String,
}

/// One cheap request per upstream, honoring the `MEDQUERY_*_BASE` overrides.
fn probes() -> Vec<Probe> {
    let openfda_base = env_base(openfda::OPENFDA_BASE, openfda::OPENFDA_BASE_ENV);
    let rxnav_base = env_base(rxnav::RXNAV_BASE, rxnav::RXNAV_BASE_ENV);
    let rximage_base = env_base(rximage::RXIMAGE_BASE, rximage::RXIMAGE_BASE_ENV);
    let medlineplus_base = env_base(
        medlineplus::MEDLINEPLUS_BASE,
        medlineplus::MEDLINEPLUS_BASE_ENV,
    );

    vec![
        Probe {
            api: "openFDA",
            url: format!("{}?limit=1", join_endpoint(&openfda_base, "drug/event.json")),
        },
        Probe {
            api: "RxNav",
            url: format!("{}?name=aspirin", join_endpoint(&rxnav_base, "rxcui.json")),
        },
        Probe {
            api: "RxImage",
            url: format!(
                "{}?rxcui=197381&resolution=600",
                join_endpoint(&rximage_base, "rxbase")
            ),
        },
        Probe {
            api: "MedlinePlus Connect",
            url: format!(
                "{medlineplus_base}?mainSearchCriteria.v.cs=2.16.840.1.113883.6.88\
                 &mainSearchCriteria.v.c=637188\
                 &knowledgeResponseType=application/json"
            ),
        },
    ]
}

async fn check_one(client: reqwest::Client, probe: Probe) -> HealthRow {
    let start = Instant::now();
    let resp = client
        .get(&probe.url)
        .header(reqwest::header::ACCEPT, "application/json")
        .send()
        .await;

    match resp {
        Ok(resp) => {
            let status = resp.status();
            let elapsed = start.elapsed().as_millis();
            if status.is_success() {
                HealthRow {
                    api: probe.api.to_string(),
                    status: "ok".into(),
                    latency: format!("{elapsed}ms"),
                }
            } else {
                HealthRow {
                    api: probe.api.to_string(),
                    status: "error".into(),
                    latency: format!("{elapsed}ms (HTTP {})", status.as_u16()),
                }
            }
        }
        Err(err) => {
            let reason = if err.is_timeout() {
                "timeout"
            } else if err.is_connect() {
                "connect"
            } else {
                "error"
            };
            HealthRow {
                api: probe.api.to_string(),
                status: "error".into(),
                latency: reason.into(),
            }
        }
    }
}

// Health probes bypass the rate limiter and use tighter timeouts.
fn health_http_client() -> Result<reqwest::Client, MedQueryError> {
    static HEALTH_HTTP_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

    if let Some(client) = HEALTH_HTTP_CLIENT.get() {
        return Ok(client.clone());
    }

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .connect_timeout(Duration::from_secs(5))
        .user_agent(concat!("medquery/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(MedQueryError::HttpClientInit)?;

    match HEALTH_HTTP_CLIENT.set(client.clone()) {
        Ok(()) => Ok(client),
        Err(_) => HEALTH_HTTP_CLIENT
            .get()
            .cloned()
            .ok_or_else(|| MedQueryError::Api {
                api: "health".into(),
                message: "Health HTTP client initialization race".into(),
            }),
    }
}

async fn check_vocabulary(explicit: Option<&Path>) -> HealthRow {
    let start = Instant::now();
    match dose_form::resolve(explicit).await {
        Ok(vocabulary) if vocabulary.is_empty() => HealthRow {
            api: "Dose-form vocabulary".into(),
            status: "error".into(),
            latency: "empty".into(),
        },
        Ok(vocabulary) => HealthRow {
            api: format!("Dose-form vocabulary ({} labels)", vocabulary.len()),
            status: "ok".into(),
            latency: format!("{}ms", start.elapsed().as_millis()),
        },
        Err(err) => HealthRow {
            api: "Dose-form vocabulary".into(),
            status: "error".into(),
            latency: err.to_string(),
        },
    }
}

/// Probes every upstream concurrently, then the dose-form vocabulary unless
/// `apis_only` is set.
///
/// # Errors
///
/// Returns an error when the health HTTP client cannot be created.
pub async fn check(
    apis_only: bool,
    vocabulary_path: Option<&Path>,
) -> Result<HealthReport, MedQueryError> {
    let client = health_http_client()?;

    let mut rows = join_all(
        probes()
            .into_iter()
            .map(|probe| check_one(client.clone(), probe)),
    )
    .await;
    if !apis_only {
        rows.push(check_vocabulary(vocabulary_path).await);
    }
    Ok(HealthReport::from_rows(rows))
}
