//! Transform adapters from upstream API shapes into CLI-facing entity models.

pub(crate) mod concept;
pub(crate) mod drug_group;
pub(crate) mod patient_info;
