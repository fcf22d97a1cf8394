use serde::{Deserialize, Serialize};

/// Successful analysis response. Both text fields are markdown-flavored and
/// are the sole inputs to the markup converter and the reveal controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub analysis_result: String,
    pub health_recommendations: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time: Option<f64>,
}
