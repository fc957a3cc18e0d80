/// Configuration of data distributions.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct DistributionConfig {
    /// Maximum distance from 1 accepted for the sum of explicit significances.
    #[serde(default = "default_significance_tolerance")]
    pub significance_tolerance: f64,
}

impl Default for DistributionConfig {
    fn default() -> Self {
        Self {
            significance_tolerance: default_significance_tolerance(),
        }
    }
}

fn default_significance_tolerance() -> f64 {
    1e-10
}
