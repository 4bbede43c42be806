/// API version segment of the endpoint path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiVersion {
    V1,
    V1Beta,
}

impl ApiVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiVersion::V1 => "v1",
            ApiVersion::V1Beta => "v1beta",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "v1" => Some(ApiVersion::V1),
            "v1beta" => Some(ApiVersion::V1Beta),
            _ => None,
        }
    }
}

/// Known model/endpoint pairings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelPreset {
    Flash,
    Pro,
}

impl ModelPreset {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelPreset::Flash => "flash",
            ModelPreset::Pro => "pro",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "flash" => Some(ModelPreset::Flash),
            "pro" => Some(ModelPreset::Pro),
            _ => None,
        }
    }

    pub fn all() -> Vec<ModelPreset> {
        vec![ModelPreset::Flash, ModelPreset::Pro]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ModelPreset::Flash => "Gemini 2.0 Flash",
            ModelPreset::Pro => "Gemini 2.5 Pro",
        }
    }

    pub fn model_id(&self) -> &'static str {
        match self {
            ModelPreset::Flash => "gemini-2.0-flash-001",
            ModelPreset::Pro => "gemini-2.5-pro",
        }
    }

    pub fn api_version(&self) -> ApiVersion {
        match self {
            ModelPreset::Flash => ApiVersion::V1Beta,
            ModelPreset::Pro => ApiVersion::V1,
        }
    }

    /// The preset after this one, wrapping around.
    pub fn next(&self) -> ModelPreset {
        let all = Self::all();
        let idx = all.iter().position(|p| p == self).unwrap_or(0);
        all[(idx + 1) % all.len()]
    }
}
