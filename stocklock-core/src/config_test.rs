#[cfg(test)]
mod tests {
    use crate::config::LockConfig;
    use crate::error::LockError;

    #[test]
    fn defaults_match_redlock_settings() {
        let config = LockConfig::default();
        assert_eq!(config.ttl_ms, 5000);
        assert_eq!(config.retry_count, 10);
        assert_eq!(config.retry_delay_ms, 200);
        assert_eq!(config.retry_jitter_ms, 200);
        assert_eq!(config.drift_factor, 0.01);
        assert_eq!(config.extension_threshold_ms, 500);
        assert_eq!(config.retry_budget_ms, None);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = LockConfig::from_json(r#"{"ttl_ms": 8000}"#).unwrap();
        assert_eq!(config.ttl_ms, 8000);
        assert_eq!(config.retry_count, 10);
    }

    #[test]
    fn camel_case_options_are_accepted() {
        let config = LockConfig::from_json(
            r#"{"driftFactor": 0.02, "retryCount": 3, "retryDelay": 50,
                "retryJitter": 10, "automaticExtensionThreshold": 250,
                "retryBudgetMs": 1000}"#,
        )
        .unwrap();
        assert_eq!(config.drift_factor, 0.02);
        assert_eq!(config.retry_count, 3);
        assert_eq!(config.retry_delay_ms, 50);
        assert_eq!(config.retry_jitter_ms, 10);
        assert_eq!(config.extension_threshold_ms, 250);
        assert_eq!(config.retry_budget_ms, Some(1000));
    }

    #[test]
    fn zero_ttl_is_rejected() {
        let err = LockConfig::from_json(r#"{"ttl_ms": 0}"#).unwrap_err();
        assert!(matches!(err, LockError::Config(_)));
    }

    #[test]
    fn drift_factor_must_be_a_fraction() {
        assert!(LockConfig::from_json(r#"{"drift_factor": 1.0}"#).is_err());
        assert!(LockConfig::from_json(r#"{"drift_factor": -0.1}"#).is_err());
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let err = LockConfig::from_json("{not json").unwrap_err();
        assert!(matches!(err, LockError::Config(_)));
    }
}
