use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TriageResult {
    pub severity: Severity,
    pub appointment_needed: bool,
    /// Keyword that decided the severity; `None` when nothing matched.
    pub matched_keyword: Option<String>,
}

impl TriageResult {
    pub fn recommendation(&self) -> &'static str {
        match self.severity {
            Severity::High => {
                "Your symptoms may need urgent attention. Please book an appointment now, \
                 or call emergency services if you are in danger."
            }
            Severity::Medium => {
                "It would be a good idea to see a doctor. Would you like me to help you book an appointment?"
            }
            Severity::Low => {
                "This sounds mild. Rest, stay hydrated and book an appointment if symptoms persist or get worse."
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassifyRequest {
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassifyResponse {
    pub severity: Severity,
    pub appointment_needed: bool,
    pub matched_keyword: Option<String>,
    pub recommendation: String,
}

impl From<TriageResult> for ClassifyResponse {
    fn from(result: TriageResult) -> Self {
        Self {
            recommendation: result.recommendation().to_string(),
            severity: result.severity,
            appointment_needed: result.appointment_needed,
            matched_keyword: result.matched_keyword,
        }
    }
}
