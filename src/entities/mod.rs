//! Entity-level query workflows used by the CLI.

pub mod adverse_event;
pub mod concept;
pub mod dose_form;
pub mod drug_group;
pub mod patient_info;
pub mod pill_image;
