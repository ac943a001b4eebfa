use super::settings::EngineConfig;
use crate::core::errors::ApiError;

pub fn validate_config(config: &EngineConfig) -> Result<(), ApiError> {
    let temperature = config.llm.temperature;
    if !temperature.is_finite() || temperature < 0.0 {
        return Err(config_error("llm.temperature", "a finite non-negative number"));
    }

    if config.embedding.dimension == 0 {
        return Err(config_error("embedding.dimension", "greater than zero"));
    }

    if config.worker.queue_capacity == 0 {
        return Err(config_error("worker.queue_capacity", "greater than zero"));
    }

    let training = &config.training;
    if !(1.0..=5.0).contains(&training.min_rating) {
        return Err(config_error("training.min_rating", "between 1 and 5"));
    }
    if !training.learning_rate.is_finite() || training.learning_rate <= 0.0 {
        return Err(config_error("training.learning_rate", "a positive number"));
    }

    Ok(())
}

fn config_error(field: &str, expected: &str) -> ApiError {
    ApiError::Validation(format!("Config field '{}' must be {}", field, expected))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        validate_config(&EngineConfig::default()).unwrap();
    }

    #[test]
    fn rejects_out_of_range_fields() {
        let mut config = EngineConfig::default();
        config.training.min_rating = 6.0;
        assert!(matches!(
            validate_config(&config),
            Err(ApiError::Validation(msg)) if msg.contains("training.min_rating")
        ));

        let mut config = EngineConfig::default();
        config.embedding.dimension = 0;
        assert!(validate_config(&config).is_err());

        let mut config = EngineConfig::default();
        config.llm.temperature = f64::NAN;
        assert!(validate_config(&config).is_err());
    }
}
