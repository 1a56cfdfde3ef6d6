use std::fmt;

/// Tags classes and methods produced by the API conversion machinery so later
/// passes can recognize them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SyntheticKind {
    /// Implements the vivified type and wraps a value of the original type.
    Wrapper,
    /// Implements the original type and wraps a value of the vivified type.
    VivifiedWrapper,
    EnumConversion,
    ArrayConversion,
    /// Holder of outlined call-site conversions.
    ApiConversion,
    ApiConversionParameters,
    ApiConversionCallback,
}

impl SyntheticKind {
    pub const ALL: [SyntheticKind; 7] = [
        SyntheticKind::Wrapper,
        SyntheticKind::VivifiedWrapper,
        SyntheticKind::EnumConversion,
        SyntheticKind::ArrayConversion,
        SyntheticKind::ApiConversion,
        SyntheticKind::ApiConversionParameters,
        SyntheticKind::ApiConversionCallback,
    ];

    /// Suffix appended to the context class name for synthesized classes.
    pub fn class_suffix(self) -> &'static str {
        match self {
            SyntheticKind::Wrapper => "$-WRP",
            SyntheticKind::VivifiedWrapper => "$-V-WRP",
            SyntheticKind::EnumConversion => "$-EC",
            SyntheticKind::ArrayConversion => "$-AC",
            SyntheticKind::ApiConversion | SyntheticKind::ApiConversionParameters => "$-API-CONV",
            SyntheticKind::ApiConversionCallback => "",
        }
    }

    pub fn is_wrapper(self) -> bool {
        matches!(self, SyntheticKind::Wrapper | SyntheticKind::VivifiedWrapper)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SyntheticKind::Wrapper => "wrapper",
            SyntheticKind::VivifiedWrapper => "vivified-wrapper",
            SyntheticKind::EnumConversion => "enum-conversion",
            SyntheticKind::ArrayConversion => "array-conversion",
            SyntheticKind::ApiConversion => "api-conversion",
            SyntheticKind::ApiConversionParameters => "api-conversion-parameters",
            SyntheticKind::ApiConversionCallback => "api-conversion-callback",
        }
    }
}

impl fmt::Display for SyntheticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
