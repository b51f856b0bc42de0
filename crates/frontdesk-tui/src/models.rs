//! Dashboard payload shown behind the login.

use serde::Deserialize;

/// One patient row from `GET /dashboard`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatientRow {
    pub patient_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub queue_reason: String,
    #[serde(default)]
    pub alerts: String,
    #[serde(default)]
    pub is_new: bool,
}

impl PatientRow {
    pub fn has_alerts(&self) -> bool {
        !self.alerts.trim().is_empty()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DashboardResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub all: Vec<PatientRow>,
    #[serde(default)]
    pub queue: Vec<PatientRow>,
}
