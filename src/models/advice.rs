use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// AI provider types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvisorProvider {
    OpenAi,
    Ollama,
    Anthropic,
}

impl AdvisorProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Ollama => "ollama",
            Self::Anthropic => "anthropic",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.openai.com/v1",
            Self::Ollama => "http://localhost:11434",
            Self::Anthropic => "https://api.anthropic.com",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Self::OpenAi => "gpt-4o-mini",
            Self::Ollama => "llama3.2",
            Self::Anthropic => "claude-sonnet-4-20250514",
        }
    }

    pub fn requires_api_key(&self) -> bool {
        match self {
            Self::OpenAi | Self::Anthropic => true,
            Self::Ollama => false,
        }
    }
}

impl FromStr for AdvisorProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "openai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            "anthropic" => Ok(Self::Anthropic),
            _ => Err(()),
        }
    }
}

/// Connection settings for the advisory text service. With no provider the
/// advisor answers with a fixed "not configured" message.
#[derive(Debug, Clone, Default)]
pub struct AdvisorSettings {
    pub provider: Option<AdvisorProvider>,
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl AdvisorSettings {
    pub fn new(
        provider: Option<AdvisorProvider>,
        base_url: Option<String>,
        api_key: String,
        model: Option<String>,
    ) -> Self {
        let Some(p) = provider else {
            return Self::default();
        };
        Self {
            provider,
            base_url: base_url
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| p.default_base_url().to_string()),
            api_key,
            model: model
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| p.default_model().to_string()),
        }
    }

    pub fn is_configured(&self) -> bool {
        match self.provider {
            Some(p) => {
                !self.base_url.is_empty()
                    && !self.model.is_empty()
                    && (!p.requires_api_key() || !self.api_key.is_empty())
            }
            None => false,
        }
    }
}

/// Kind of free-text observation an operator records against an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationKind {
    Trend,
    HolidayImpact,
    SalesPattern,
    Competitor,
    Note,
}

impl ObservationKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Trend => "Trend analysis",
            Self::HolidayImpact => "Holiday impact",
            Self::SalesPattern => "Sales pattern",
            Self::Competitor => "Competitor move",
            Self::Note => "Note",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservationRecord {
    pub kind: ObservationKind,
    pub content: String,
}
