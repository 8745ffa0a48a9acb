use std::collections::{HashMap, HashSet};
use thiserror::Error;

use crate::agents::config::{
    DatabaseConfig, LimitsConfig, LlmProviderConfig, ModelRoutingConfig, OrchestratorConfig,
};
use crate::agents::llm::DEFAULT_PROVIDER;
use crate::config::Settings;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Cross-reference error: {0}")]
    CrossReference(String),

    #[error("Duplicate entry: {0}")]
    Duplicate(String),
}

pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate(settings: &Settings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = Self::validate_llm("llm", &settings.llm) {
            errors.extend(e);
        }

        if let Err(e) = Self::validate_providers(&settings.providers) {
            errors.extend(e);
        }

        if let Err(e) = Self::validate_routing(&settings.routing, &settings.providers) {
            errors.extend(e);
        }

        if let Err(e) = Self::validate_orchestrator(&settings.orchestrator) {
            errors.extend(e);
        }

        if let Err(e) = Self::validate_limits(&settings.limits) {
            errors.extend(e);
        }

        if let Err(e) = Self::validate_databases(&settings.databases) {
            errors.extend(e);
        }

        if settings.media.whisper_model.trim().is_empty() {
            errors.push(ValidationError::MissingField("media.whisper_model".to_string()));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_llm(section: &str, llm: &LlmProviderConfig) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if llm.model.trim().is_empty() {
            errors.push(ValidationError::MissingField(format!("{}.model", section)));
        }

        if let Some(temperature) = llm.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                errors.push(ValidationError::InvalidValue {
                    field: format!("{}.temperature", section),
                    reason: format!("{} is outside 0.0..=2.0", temperature),
                });
            }
        }

        if llm.max_tokens == Some(0) {
            errors.push(ValidationError::InvalidValue {
                field: format!("{}.max_tokens", section),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_providers(providers: &HashMap<String, LlmProviderConfig>) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        let mut names = HashSet::new();

        for (name, config) in providers {
            let key = name.to_lowercase();
            if key == DEFAULT_PROVIDER {
                errors.push(ValidationError::Duplicate(format!(
                    "Provider name '{}' is reserved for the [llm] section",
                    name
                )));
            } else if !names.insert(key) {
                errors.push(ValidationError::Duplicate(format!(
                    "Provider name '{}' is defined more than once",
                    name
                )));
            }

            if let Err(e) = Self::validate_llm(&format!("providers.{}", name), config) {
                errors.extend(e);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_routing(
        routing: &ModelRoutingConfig,
        providers: &HashMap<String, LlmProviderConfig>,
    ) -> Result<(), Vec<ValidationError>> {
        let errors: Vec<ValidationError> = routing
            .entries()
            .into_iter()
            .filter(|(_, name)| {
                !name.eq_ignore_ascii_case(DEFAULT_PROVIDER)
                    && !providers.keys().any(|p| p.eq_ignore_ascii_case(name))
            })
            .map(|(key, name)| {
                ValidationError::CrossReference(format!(
                    "routing.{} references unknown provider '{}'",
                    key, name
                ))
            })
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_orchestrator(orchestrator: &OrchestratorConfig) -> Result<(), Vec<ValidationError>> {
        if orchestrator.max_iterations == 0 {
            return Err(vec![ValidationError::InvalidValue {
                field: "orchestrator.max_iterations".to_string(),
                reason: "At least one iteration is required".to_string(),
            }]);
        }
        Ok(())
    }

    fn validate_limits(limits: &LimitsConfig) -> Result<(), Vec<ValidationError>> {
        if limits.max_calls == Some(0) {
            return Err(vec![ValidationError::InvalidValue {
                field: "limits.max_calls".to_string(),
                reason: "Must be greater than 0 when set".to_string(),
            }]);
        }
        Ok(())
    }

    fn validate_databases(databases: &[DatabaseConfig]) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        let mut names = HashSet::new();

        for (i, database) in databases.iter().enumerate() {
            if database.name.trim().is_empty() {
                errors.push(ValidationError::MissingField(format!("databases[{}].name", i)));
            } else if !names.insert(database.name.to_lowercase()) {
                errors.push(ValidationError::Duplicate(format!(
                    "Database name '{}' is defined more than once",
                    database.name
                )));
            }

            if database.url.trim().is_empty() {
                errors.push(ValidationError::MissingField(format!("databases[{}].url", i)));
            } else if !database.url.starts_with("sqlite:") {
                errors.push(ValidationError::InvalidValue {
                    field: format!("databases[{}].url", i),
                    reason: format!("Only sqlite URLs are supported, got '{}'", database.url),
                });
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn database(name: &str, url: &str) -> DatabaseConfig {
        DatabaseConfig {
            name: name.to_string(),
            url: url.to_string(),
        }
    }

    #[test]
    fn test_valid_config() {
        let settings = Settings {
            databases: vec![database("sales", "sqlite://sales.db")],
            ..Default::default()
        };
        assert!(ConfigValidator::validate(&settings).is_ok());
    }

    #[test]
    fn test_empty_model() {
        let mut settings = Settings::default();
        settings.llm.model = " ".to_string();

        let errors = ConfigValidator::validate(&settings).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(matches!(&errors[0], ValidationError::MissingField(f) if f == "llm.model"));
    }

    #[test]
    fn test_temperature_out_of_range() {
        let mut settings = Settings::default();
        settings.llm.temperature = Some(2.5);

        let errors = ConfigValidator::validate(&settings).unwrap_err();
        assert!(matches!(
            &errors[0],
            ValidationError::InvalidValue { field, .. } if field == "llm.temperature"
        ));
    }

    #[test]
    fn test_zero_limits() {
        let mut settings = Settings::default();
        settings.orchestrator.max_iterations = 0;
        settings.limits.max_calls = Some(0);

        let errors = ConfigValidator::validate(&settings).unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_duplicate_database_names() {
        let settings = Settings {
            databases: vec![
                database("sales", "sqlite://a.db"),
                database("Sales", "sqlite://b.db"),
            ],
            ..Default::default()
        };

        let errors = ConfigValidator::validate(&settings).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(matches!(&errors[0], ValidationError::Duplicate(_)));
    }

    #[test]
    fn test_routing_to_unknown_provider() {
        let mut settings = Settings::default();
        settings.providers.insert(
            "gpt4o".to_string(),
            LlmProviderConfig {
                model: "gpt-4o".to_string(),
                ..Default::default()
            },
        );
        settings.routing.sql_query = Some("GPT4o".to_string());
        settings.routing.summary = Some("default".to_string());
        assert!(ConfigValidator::validate(&settings).is_ok());

        settings.routing.sql = Some("claude".to_string());
        let errors = ConfigValidator::validate(&settings).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(matches!(&errors[0], ValidationError::CrossReference(m) if m.contains("routing.sql ")));
    }

    #[test]
    fn test_named_provider_checks() {
        let mut settings = Settings::default();
        settings.providers.insert(
            "Default".to_string(),
            LlmProviderConfig {
                model: "gpt-4o".to_string(),
                ..Default::default()
            },
        );
        settings.providers.insert(
            "local".to_string(),
            LlmProviderConfig {
                model: String::new(),
                ..Default::default()
            },
        );

        let errors = ConfigValidator::validate(&settings).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().any(|e| matches!(e, ValidationError::Duplicate(_))));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::MissingField(f) if f == "providers.local.model")));
    }

    #[test]
    fn test_non_sqlite_url() {
        let settings = Settings {
            databases: vec![database("hr", "postgres://localhost/hr"), database("", "")],
            ..Default::default()
        };

        let errors = ConfigValidator::validate(&settings).unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors[0].to_string().contains("Only sqlite URLs are supported"));
    }
}
