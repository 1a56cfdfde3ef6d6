use desugar_config::{CompilationMode, ConversionConfig};

/// Knobs of the API conversion pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionOptions {
    pub mode: CompilationMode,
    pub whole_program: bool,
    pub supports_default_interface_methods: bool,
    pub outline_api_conversions: bool,
    pub track_api_conversions: bool,
    pub worker_threads: Option<usize>,
}

impl ConversionOptions {
    pub fn is_desugared_library_compilation(&self) -> bool {
        self.mode.is_desugared_library()
    }
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self::from(&ConversionConfig::default())
    }
}

impl From<&ConversionConfig> for ConversionOptions {
    fn from(config: &ConversionConfig) -> Self {
        Self {
            mode: config.mode,
            whole_program: config.whole_program,
            supports_default_interface_methods: config.supports_default_interface_methods,
            outline_api_conversions: config.outline_api_conversions,
            track_api_conversions: config.track_api_conversions
                && !config.mode.is_desugared_library(),
            worker_threads: config.worker_threads.filter(|threads| *threads > 0),
        }
    }
}
