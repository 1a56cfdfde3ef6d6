use crate::diagnostics::ConfigWarning;
use crate::{CompilationMode, DesugarConfig, LoggingConfig};

impl DesugarConfig {
    /// Semantic checks that do not prevent the config from loading.
    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut out = Vec::new();
        validate_conversion(self, &mut out);
        validate_logging(&self.logging, &mut out);
        out
    }
}

fn validate_conversion(config: &DesugarConfig, out: &mut Vec<ConfigWarning>) {
    let conversion = &config.conversion;
    if conversion.worker_threads == Some(0) {
        out.push(ConfigWarning::InvalidValue {
            toml_path: "conversion.worker_threads".to_owned(),
            message: "must be >= 1; using the global worker pool".to_owned(),
        });
    }
    if conversion.mode == CompilationMode::DesugaredLibrary && conversion.track_api_conversions {
        out.push(ConfigWarning::InvalidValue {
            toml_path: "conversion.track_api_conversions".to_owned(),
            message: "tracking is only meaningful for application builds; ignored".to_owned(),
        });
    }
}

fn validate_logging(logging: &LoggingConfig, out: &mut Vec<ConfigWarning>) {
    let normalized = LoggingConfig::normalize_level_directives(&logging.level);
    if tracing_subscriber::EnvFilter::try_new(&normalized).is_err() {
        out.push(ConfigWarning::LoggingLevelInvalid {
            value: logging.level.clone(),
            normalized,
        });
    }
}
