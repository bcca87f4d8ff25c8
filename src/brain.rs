//! AI content generator for the daily report.

use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::ContentError;
use crate::types::{Report, ReportField, Thresholds, trimmed_len};

const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const REFERER: &str = "https://github.com/dhyoprd/AutoAbsen";

pub trait ContentGenerator {
    /// Turn the intern's notes for the day into a three-part report.
    fn generate(
        &self,
        context: &str,
        input: &str,
    ) -> impl Future<Output = Result<Report, ContentError>> + Send;
}

fn report_prompt(context: &str, activity: &str, thresholds: &Thresholds) -> String {
    format!(
        r#"Kamu adalah asisten yang membantu membuat laporan harian magang.

Konteks Magang:
{context}

Aktivitas hari ini:
{activity}

Buatkan 3 bagian laporan harian dengan format JSON.
Setiap bagian minimal {min} karakter, maksimal {max} karakter.
Gunakan bahasa Indonesia yang profesional namun mengalir (seperti manusia).
Jangan gunakan bullet points.

Format output (JSON murni):
{{
    "activity": "Uraian detail aktivitas...",
    "learning": "Pembelajaran yang didapat...",
    "obstacles": "Kendala (jika ada) atau tantangan..."
}}"#,
        min = thresholds.min_field_length,
        max = thresholds.max_field_length,
    )
}

fn extend_prompt(text: &str, field: ReportField, thresholds: &Thresholds) -> String {
    format!(
        "Kembangkan teks berikut menjadi minimal {min} karakter (maks {max}) dengan bahasa profesional:\n\n\
         Tipe: {field}\nTeks asli: {text}\n\nOutput hanya teks hasil pengembangan.",
        min = thresholds.min_field_length,
        max = thresholds.max_field_length,
    )
}

/// Remove the markdown fences models like to wrap JSON in.
pub fn strip_fences(content: &str) -> &str {
    content
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
}

#[derive(Debug, Deserialize)]
struct Draft {
    #[serde(default)]
    activity: String,
    #[serde(default)]
    learning: String,
    #[serde(default)]
    obstacles: String,
}

pub fn parse_report(content: &str) -> Result<Report, ContentError> {
    let cleaned = strip_fences(content);
    let draft: Draft = serde_json::from_str(cleaned)
        .map_err(|e| ContentError::Parse(format!("{e}: {cleaned}")))?;
    Ok(Report::new(draft.activity, draft.learning, draft.obstacles))
}

/// `error.message` from a JSON error body, else the raw body text.
fn api_error_message(text: &str) -> String {
    let from_json = serde_json::from_str::<Value>(text)
        .ok()
        .and_then(|body| body["error"]["message"].as_str().map(str::to_string));
    match from_json {
        Some(message) => message,
        None if !text.trim().is_empty() => text.trim().to_string(),
        None => "Unknown API error".to_string(),
    }
}

/// OpenAI-compatible chat completion client pointed at OpenRouter.
pub struct OpenRouterGenerator {
    client: Client,
    api_key: String,
    model: String,
    endpoint: String,
    thresholds: Thresholds,
}

impl OpenRouterGenerator {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, ContentError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            endpoint: OPENROUTER_URL.to_string(),
            thresholds: Thresholds::default(),
        })
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    async fn complete(&self, prompt: &str) -> Result<String, ContentError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header("HTTP-Referer", REFERER)
            .json(&json!({
                "model": self.model,
                "messages": [{ "role": "user", "content": prompt }],
                "temperature": 0.7,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await?;
            return Err(ContentError::Api {
                status: status.as_u16(),
                message: api_error_message(&text),
            });
        }
        let body: Value = response.json().await?;

        body["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ContentError::Parse(format!("no content in response: {body}")))
    }

    /// One extension round trip for a short field; keeps the original on failure.
    async fn ensure_length(&self, field: ReportField, text: String) -> String {
        if trimmed_len(&text) >= self.thresholds.extend_floor {
            return text;
        }
        info!(%field, length = trimmed_len(&text), "extending short field");
        match self.complete(&extend_prompt(&text, field, &self.thresholds)).await {
            Ok(extended) => extended.trim().to_string(),
            Err(e) => {
                warn!(%field, error = %e, "extension failed, keeping original text");
                text
            }
        }
    }
}

impl ContentGenerator for OpenRouterGenerator {
    async fn generate(&self, context: &str, input: &str) -> Result<Report, ContentError> {
        let content = self
            .complete(&report_prompt(context, input, &self.thresholds))
            .await?;
        debug!(%content, "model reply");
        let draft = parse_report(&content)?;

        Ok(Report {
            activity: self.ensure_length(ReportField::Activity, draft.activity).await,
            learning: self.ensure_length(ReportField::Learning, draft.learning).await,
            obstacles: self.ensure_length(ReportField::Obstacles, draft.obstacles).await,
        })
    }
}
