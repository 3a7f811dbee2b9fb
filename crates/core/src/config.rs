use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::{PulseError, PulseResult};

/// Root configuration for the analysis engine. Loaded from an optional TOML
/// file overlaid by environment variables with the prefix `PULSE__`.
#[derive(Debug, Clone, Deserialize)]
pub struct PulseConfig {
    #[serde(default)]
    pub cohort: CohortConfig,
    #[serde(default)]
    pub funnel: FunnelConfig,
    #[serde(default)]
    pub keywords: KeywordConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CohortConfig {
    #[serde(default = "default_max_cohorts")]
    pub max_cohorts: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FunnelConfig {
    #[serde(default = "default_top_journeys")]
    pub top_journeys: usize,
    /// Separator between pages in a journey string. `->` is always accepted
    /// in addition to this one.
    #[serde(default = "default_path_delimiter")]
    pub path_delimiter: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KeywordConfig {
    #[serde(default = "default_opportunity_min_position")]
    pub opportunity_min_position: f64,
    #[serde(default = "default_opportunity_max_position")]
    pub opportunity_max_position: f64,
    #[serde(default = "default_list_limit")]
    pub list_limit: usize,
    /// Evaluated in order; the first rule with a matching term wins.
    #[serde(default = "default_categories")]
    pub categories: Vec<CategoryRuleConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CategoryRuleConfig {
    pub label: String,
    pub terms: Vec<String>,
}

// Default functions
fn default_max_cohorts() -> usize {
    50
}
fn default_top_journeys() -> usize {
    5
}
fn default_path_delimiter() -> String {
    "→".to_string()
}
fn default_opportunity_min_position() -> f64 {
    4.0
}
fn default_opportunity_max_position() -> f64 {
    10.0
}
fn default_list_limit() -> usize {
    10
}

fn default_categories() -> Vec<CategoryRuleConfig> {
    let rule = |label: &str, terms: &[&str]| CategoryRuleConfig {
        label: label.to_string(),
        terms: terms.iter().map(|t| t.to_string()).collect(),
    };
    vec![
        rule("Pricing", &["price", "pricing", "cost", "cheap", "discount"]),
        rule("Comparison", &[" vs ", "versus", "alternative", "compare"]),
        rule("How-To", &["how to", "guide", "tutorial", "what is"]),
        rule("Reviews", &["review", "best", "top", "rating"]),
        rule("Local", &["near me", "nearby", "local"]),
    ]
}

impl Default for CohortConfig {
    fn default() -> Self {
        Self {
            max_cohorts: default_max_cohorts(),
        }
    }
}

impl Default for FunnelConfig {
    fn default() -> Self {
        Self {
            top_journeys: default_top_journeys(),
            path_delimiter: default_path_delimiter(),
        }
    }
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            opportunity_min_position: default_opportunity_min_position(),
            opportunity_max_position: default_opportunity_max_position(),
            list_limit: default_list_limit(),
            categories: default_categories(),
        }
    }
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self {
            cohort: CohortConfig::default(),
            funnel: FunnelConfig::default(),
            keywords: KeywordConfig::default(),
        }
    }
}

impl PulseConfig {
    /// Load configuration from an optional TOML file and environment variables.
    pub fn load(path: Option<&Path>) -> PulseResult<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("PULSE")
                .separator("__")
                .try_parsing(true),
        );

        let loaded: Self = builder.build()?.try_deserialize()?;
        loaded.validate()?;
        debug!(
            max_cohorts = loaded.cohort.max_cohorts,
            top_journeys = loaded.funnel.top_journeys,
            categories = loaded.keywords.categories.len(),
            "Configuration loaded"
        );
        Ok(loaded)
    }

    pub fn validate(&self) -> PulseResult<()> {
        if self.funnel.path_delimiter.trim().is_empty() {
            return Err(PulseError::Config(
                "funnel.path_delimiter must not be blank".into(),
            ));
        }
        let kw = &self.keywords;
        if kw.opportunity_min_position > kw.opportunity_max_position {
            return Err(PulseError::Config(format!(
                "keywords.opportunity_min_position ({}) exceeds opportunity_max_position ({})",
                kw.opportunity_min_position, kw.opportunity_max_position
            )));
        }
        if let Some(rule) = kw.categories.iter().find(|r| r.terms.is_empty()) {
            return Err(PulseError::Config(format!(
                "keyword category '{}' has no terms",
                rule.label
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_display_limits() {
        let config = PulseConfig::default();
        assert_eq!(config.cohort.max_cohorts, 50);
        assert_eq!(config.funnel.top_journeys, 5);
        assert_eq!(config.funnel.path_delimiter, "→");
        assert_eq!(config.keywords.list_limit, 10);
        assert_eq!(config.keywords.categories[0].label, "Pricing");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[cohort]
max_cohorts = 12

[funnel]
path_delimiter = ">"

[[keywords.categories]]
label = "Shoes"
terms = ["sneaker", "boot"]
"#
        )
        .unwrap();

        let config = PulseConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.cohort.max_cohorts, 12);
        assert_eq!(config.funnel.path_delimiter, ">");
        assert_eq!(config.funnel.top_journeys, 5);
        assert_eq!(
            config.keywords.categories,
            vec![CategoryRuleConfig {
                label: "Shoes".into(),
                terms: vec!["sneaker".into(), "boot".into()],
            }]
        );
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = PulseConfig::load(Some(Path::new("/nonexistent/pulse.toml")));
        assert!(matches!(result, Err(PulseError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_inverted_opportunity_window() {
        let mut config = PulseConfig::default();
        config.keywords.opportunity_min_position = 12.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_blank_delimiter_and_empty_terms() {
        let mut config = PulseConfig::default();
        config.funnel.path_delimiter = "  ".into();
        assert!(config.validate().is_err());

        let mut config = PulseConfig::default();
        config.keywords.categories.push(CategoryRuleConfig {
            label: "Empty".into(),
            terms: vec![],
        });
        assert!(config.validate().is_err());
    }
}
