/// Analysis settings loaded from JSON, with defaults for every field
use crate::cross_section::CrossSectionConfig;
use crate::error::Result;
use crate::lod::{LodConfig, PerformanceMode};
use crate::profile::ProfileParams;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub performance_mode: PerformanceMode,
    /// Explicit threshold table; the performance mode preset is used when absent.
    pub lod: Option<LodConfig>,
    pub profile: ProfileParams,
    pub cross_section: CrossSectionConfig,
}

impl AnalysisConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        Self::from_json_str(&fs::read_to_string(path)?)
    }

    /// Threshold table in effect
    pub fn lod_config(&self) -> LodConfig {
        self.lod
            .clone()
            .unwrap_or_else(|| LodConfig::for_mode(self.performance_mode))
    }

    pub fn validate(&self) -> Result<()> {
        self.lod_config().validate()?;
        self.profile.validate()?;
        self.cross_section.validate()
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cross_section::SearchStrategy;
    use crate::error::ProfilerError;

    #[test]
    fn test_empty_json_gives_defaults() {
        let config = AnalysisConfig::from_json_str("{}").unwrap();
        assert_eq!(config, AnalysisConfig::default());
        assert_eq!(config.profile.num_samples, 100);
        assert_eq!(config.lod_config().far.stride, 20);
    }

    #[test]
    fn test_partial_overrides() {
        let config = AnalysisConfig::from_json_str(
            r#"{
                "performance_mode": "quality",
                "profile": { "tolerance": 0.25 },
                "cross_section": { "strategy": "point_index" }
            }"#,
        )
        .unwrap();
        assert_eq!(config.profile.tolerance, 0.25);
        assert_eq!(config.profile.num_samples, 100);
        assert_eq!(config.cross_section.strategy, SearchStrategy::PointIndex);
        assert_eq!(config.lod_config().far.distance, 8.0);
    }

    #[test]
    fn test_explicit_lod_table() {
        let config = AnalysisConfig::from_json_str(
            r#"{ "lod": { "far": { "distance": 9.0, "stride": 40 } } }"#,
        )
        .unwrap();
        let lod = config.lod_config();
        assert_eq!(lod.far.stride, 40);
        assert_eq!(lod.medium.stride, 5);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = AnalysisConfig::from_json_str(r#"{ "profile": { "num_samples": 1 } }"#)
            .unwrap_err();
        assert!(matches!(err, ProfilerError::InvalidArgument(_)));

        let err = AnalysisConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, ProfilerError::Json(_)));
    }

    #[test]
    fn test_round_trip_through_json() {
        let config = AnalysisConfig {
            performance_mode: PerformanceMode::Performance,
            ..Default::default()
        };
        let json = config.to_json_pretty().unwrap();
        assert_eq!(AnalysisConfig::from_json_str(&json).unwrap(), config);
    }
}
