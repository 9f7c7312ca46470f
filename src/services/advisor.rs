//! Client for the generative-text advisory service.
//!
//! Plain strings in, plain strings out. Transport and parse failures are
//! logged and answered with a fixed fallback message; they never reach the
//! caller as errors.

use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};
use crate::models::{AdvisorProvider, AdvisorSettings, ObservationRecord};

const REQUEST_TIMEOUT_SECS: u64 = 60;

pub const ADVICE_NOT_CONFIGURED: &str = "Configure an AI provider to get planning advice.";
pub const ADVICE_UNAVAILABLE: &str = "AI advice is temporarily unavailable, please try again later.";
pub const ADVICE_EMPTY: &str = "No insight was generated.";
pub const ANALYSIS_NOT_CONFIGURED: &str = "Configure an AI provider to use sales analysis.";
pub const ANALYSIS_FAILED: &str = "Could not analyse the data; check its format and try again.";

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```(?:json)?").expect("static regex"));

/// Summary and replenishment advice for one retail event.
pub async fn planning_advice(
    settings: &AdvisorSettings,
    title: &str,
    period: &str,
    tags: &[String],
    records: &[ObservationRecord],
) -> String {
    if !settings.is_configured() {
        return ADVICE_NOT_CONFIGURED.to_string();
    }

    let user_prompt = build_advice_prompt(title, period, tags, records);
    match complete(settings, ADVICE_SYSTEM_PROMPT, &user_prompt, false).await {
        Ok(text) if text.trim().is_empty() => ADVICE_EMPTY.to_string(),
        Ok(text) => text.trim().to_string(),
        Err(e) => {
            warn!(error = %e, "Planning advice request failed");
            ADVICE_UNAVAILABLE.to_string()
        }
    }
}

/// Short review bullet points for a pasted block of sales figures.
pub async fn analyze_sales_data(settings: &AdvisorSettings, data: &str, prompt: &str) -> Vec<String> {
    if !settings.is_configured() {
        return vec![ANALYSIS_NOT_CONFIGURED.to_string()];
    }

    let user_prompt = build_analysis_prompt(data, prompt);
    let result = complete(settings, ANALYSIS_SYSTEM_PROMPT, &user_prompt, true)
        .await
        .and_then(|content| parse_insights(&content));

    match result {
        Ok(insights) => insights,
        Err(e) => {
            warn!(error = %e, "Sales analysis request failed");
            vec![ANALYSIS_FAILED.to_string()]
        }
    }
}

const ADVICE_SYSTEM_PROMPT: &str = "You are a senior retail merchandise planner and store \
replenishment expert. The user plans replenishment from their own post-event reviews.";

const ANALYSIS_SYSTEM_PROMPT: &str = "You are a data analyst. Respond only with a JSON array \
of strings, no markdown and no other text.";

fn build_advice_prompt(
    title: &str,
    period: &str,
    tags: &[String],
    records: &[ObservationRecord],
) -> String {
    let records_text = if records.is_empty() {
        "(No records yet; answer from general industry experience.)".to_string()
    } else {
        records
            .iter()
            .map(|r| format!("- [{}] {}", r.kind.label(), r.content))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        r#"Combine the event details with the user's recorded history into a review summary and replenishment advice.

Event: {}
Period: {}
Tags: {}

Recorded history:
"""
{}
"""

1. Review summary: if there are records, distil the recurring sales pattern, pain points or opportunities. Omit this section when there are none.
2. Replenishment advice: concrete actions on opening order depth, replenishment frequency, size mix and logistics cut-off times.

Format:
**Review summary**
...
**Replenishment advice**
...

Stay under 150 words."#,
        title,
        period,
        tags.join(", "),
        records_text
    )
}

fn build_analysis_prompt(data: &str, prompt: &str) -> String {
    format!(
        r#"The user pasted sales figures copied from a spreadsheet.

1. Identify the key metrics (total sales, year-on-year and period-on-period growth, sell-through, per-category performance).
2. Extract notable trends, such as a category surging or the total missing plan.
3. Address the user's extra instructions.

Instructions: "{}"

Data:
"""
{}
"""

Return a JSON array of strings, one short review point (at most 30 words) each.
Example: ["Total sales up 15% year on year, 102% of plan", "Frozen lagged after a warm week"]"#,
        prompt, data
    )
}

/// Pull the JSON string array out of a model reply, tolerating code fences
/// and surrounding chatter.
fn parse_insights(content: &str) -> AppResult<Vec<String>> {
    let cleaned = CODE_FENCE.replace_all(content, "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return Ok(Vec::new());
    }

    let json = match (cleaned.find('['), cleaned.rfind(']')) {
        (Some(start), Some(end)) if start < end => &cleaned[start..=end],
        _ => cleaned,
    };

    serde_json::from_str(json).map_err(|e| {
        warn!(content = %content, error = %e, "Failed to parse AI response as JSON");
        AppError::Internal(format!("Failed to parse AI response: {}", e))
    })
}

fn create_client() -> AppResult<Client> {
    Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()
        .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))
}

async fn complete(
    settings: &AdvisorSettings,
    system: &str,
    user: &str,
    json: bool,
) -> AppResult<String> {
    let provider = settings
        .provider
        .ok_or_else(|| AppError::Internal("No AI provider configured".into()))?;
    let client = create_client()?;
    debug!(provider = provider.as_str(), model = %settings.model, "Sending advisory request");

    match provider {
        AdvisorProvider::Ollama => complete_with_ollama(&client, settings, system, user, json).await,
        AdvisorProvider::OpenAi => complete_with_openai(&client, settings, system, user, json).await,
        AdvisorProvider::Anthropic => complete_with_anthropic(&client, settings, system, user).await,
    }
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

async fn complete_with_ollama(
    client: &Client,
    settings: &AdvisorSettings,
    system: &str,
    user: &str,
    json: bool,
) -> AppResult<String> {
    #[derive(Serialize)]
    struct OllamaRequest<'a> {
        model: &'a str,
        prompt: &'a str,
        system: &'a str,
        stream: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        format: Option<&'a str>,
    }

    #[derive(Deserialize)]
    struct OllamaResponse {
        response: String,
    }

    let url = format!("{}/api/generate", settings.base_url.trim_end_matches('/'));
    let request = OllamaRequest {
        model: &settings.model,
        prompt: user,
        system,
        stream: false,
        format: json.then_some("json"),
    };

    let response = client
        .post(&url)
        .json(&request)
        .send()
        .await
        .map_err(|e| AppError::Internal(format!("Ollama request failed: {}", e)))?;
    let response: OllamaResponse = read_json(response, "Ollama").await?;
    Ok(response.response)
}

async fn complete_with_openai(
    client: &Client,
    settings: &AdvisorSettings,
    system: &str,
    user: &str,
    json: bool,
) -> AppResult<String> {
    #[derive(Serialize)]
    struct OpenAiRequest<'a> {
        model: &'a str,
        messages: Vec<Message<'a>>,
        temperature: f64,
    }

    #[derive(Deserialize)]
    struct OpenAiResponse {
        choices: Vec<Choice>,
    }

    #[derive(Deserialize)]
    struct Choice {
        message: ChoiceMessage,
    }

    #[derive(Deserialize)]
    struct ChoiceMessage {
        content: String,
    }

    let url = format!("{}/chat/completions", settings.base_url.trim_end_matches('/'));
    let request = OpenAiRequest {
        model: &settings.model,
        messages: vec![
            Message {
                role: "system",
                content: system,
            },
            Message {
                role: "user",
                content: user,
            },
        ],
        temperature: if json { 0.2 } else { 0.7 },
    };

    let response = client
        .post(&url)
        .header("Authorization", format!("Bearer {}", settings.api_key))
        .json(&request)
        .send()
        .await
        .map_err(|e| AppError::Internal(format!("OpenAI request failed: {}", e)))?;
    let response: OpenAiResponse = read_json(response, "OpenAI").await?;

    Ok(response
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content)
        .unwrap_or_default())
}

async fn complete_with_anthropic(
    client: &Client,
    settings: &AdvisorSettings,
    system: &str,
    user: &str,
) -> AppResult<String> {
    #[derive(Serialize)]
    struct AnthropicRequest<'a> {
        model: &'a str,
        max_tokens: i32,
        system: &'a str,
        messages: Vec<Message<'a>>,
    }

    #[derive(Deserialize)]
    struct AnthropicResponse {
        content: Vec<ContentBlock>,
    }

    #[derive(Deserialize)]
    struct ContentBlock {
        text: Option<String>,
    }

    let url = format!("{}/v1/messages", settings.base_url.trim_end_matches('/'));
    let request = AnthropicRequest {
        model: &settings.model,
        max_tokens: 1024,
        system,
        messages: vec![Message {
            role: "user",
            content: user,
        }],
    };

    let response = client
        .post(&url)
        .header("x-api-key", &settings.api_key)
        .header("anthropic-version", "2023-06-01")
        .json(&request)
        .send()
        .await
        .map_err(|e| AppError::Internal(format!("Anthropic request failed: {}", e)))?;
    let response: AnthropicResponse = read_json(response, "Anthropic").await?;

    Ok(response
        .content
        .into_iter()
        .find_map(|c| c.text)
        .unwrap_or_default())
}

async fn read_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
    provider: &str,
) -> AppResult<T> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(AppError::Internal(format!(
            "{} returned {}: {}",
            provider, status, body
        )));
    }
    response
        .json()
        .await
        .map_err(|e| AppError::Internal(format!("Failed to parse {} response: {}", provider, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ObservationKind;

    #[test]
    fn test_parse_insights_plain_array() {
        let parsed = parse_insights(r#"["Total up 15%", "Frozen lagged"]"#).unwrap();
        assert_eq!(parsed, vec!["Total up 15%", "Frozen lagged"]);
    }

    #[test]
    fn test_parse_insights_strips_fences_and_chatter() {
        let content = "Sure!\n```json\n[\"Dairy beat plan\"]\n```\n";
        assert_eq!(parse_insights(content).unwrap(), vec!["Dairy beat plan"]);
    }

    #[test]
    fn test_parse_insights_empty_and_invalid() {
        assert!(parse_insights("  ").unwrap().is_empty());
        assert!(parse_insights("not json at all").is_err());
    }

    #[test]
    fn test_advice_prompt_lists_records() {
        let records = vec![ObservationRecord {
            kind: ObservationKind::SalesPattern,
            content: "Down jackets sold out by day two".into(),
        }];
        let prompt = build_advice_prompt("Spring Festival", "Lunar 1/1", &["holiday".into()], &records);
        assert!(prompt.contains("[Sales pattern] Down jackets sold out by day two"));
        assert!(prompt.contains("Tags: holiday"));

        let empty = build_advice_prompt("New Year", "Jan 1", &[], &[]);
        assert!(empty.contains("No records yet"));
    }

    #[tokio::test]
    async fn test_unconfigured_advisor_answers_with_fixed_messages() {
        let settings = AdvisorSettings::default();
        assert_eq!(
            planning_advice(&settings, "New Year", "Jan 1", &[], &[]).await,
            ADVICE_NOT_CONFIGURED
        );
        assert_eq!(
            analyze_sales_data(&settings, "a,b\n1,2", "").await,
            vec![ANALYSIS_NOT_CONFIGURED.to_string()]
        );
    }

    #[test]
    fn test_openai_needs_key() {
        let settings = AdvisorSettings::new(Some(AdvisorProvider::OpenAi), None, String::new(), None);
        assert!(!settings.is_configured());
        let settings = AdvisorSettings::new(Some(AdvisorProvider::Ollama), None, String::new(), None);
        assert!(settings.is_configured());
        assert_eq!(settings.model, "llama3.2");
    }
}
