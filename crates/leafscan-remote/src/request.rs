//! `generateContent` request bodies and the prompts that go in them.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;

/// Request body for a `generateContent` call.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    pub contents: Vec<Content>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Content {
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Debug, Clone, Serialize)]
pub struct InlineData {
    pub mime_type: String,
    /// Base64 (standard alphabet, padded).
    pub data: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
}

impl GenerationConfig {
    /// Sampling settings for conversational replies.
    pub fn chat() -> Self {
        Self {
            temperature: 0.7,
            top_k: 40,
            top_p: 0.95,
            max_output_tokens: 1024,
        }
    }
}

/// Diagnosis prompt for a low-confidence local guess.
pub fn plant_analysis_prompt(local_guess: &str, confidence: f64) -> String {
    format!(
        "You are a plant disease expert. Analyze this plant image and provide a COMPLETE diagnosis.

The ML model predicted: {local_guess} with only {confidence:.1}% confidence (very low - likely wrong).

Analyze the image and provide these details in this EXACT format:

PLANT: [specific plant name or general type like \"Medicinal Herb\", \"Leafy Vegetable\"]
DISEASE: [Yes - disease name] or [No - Healthy]
CONFIDENCE: [your confidence 0-100]
SEVERITY: [Low or Medium or High]
SYMPTOMS: [symptom 1] | [symptom 2] | [symptom 3]
RECOMMENDATIONS: [action 1] | [action 2] | [action 3] | [action 4]
ANALYSIS: [2-3 sentences explaining what you see and your diagnosis]

Be specific and practical."
    )
}

/// Image analysis request: template prompt plus the raw upload, inlined.
pub fn plant_analysis_request(
    image: &[u8],
    mime_type: &str,
    local_guess: &str,
    confidence: f64,
) -> GenerateRequest {
    GenerateRequest {
        contents: vec![Content {
            parts: vec![
                Part::Text {
                    text: plant_analysis_prompt(local_guess, confidence),
                },
                Part::InlineData {
                    inline_data: InlineData {
                        mime_type: mime_type.to_string(),
                        data: STANDARD.encode(image),
                    },
                },
            ],
        }],
        generation_config: None,
    }
}

/// Free-form chat request, optionally grounded in a previous analysis.
pub fn chat_request(prompt: &str, analysis_context: Option<&serde_json::Value>) -> GenerateRequest {
    let text = match analysis_context {
        Some(ctx) if !ctx.is_null() => {
            format!("Context from the latest plant analysis (JSON):\n{ctx}\n\n{prompt}")
        }
        _ => prompt.to_string(),
    };

    GenerateRequest {
        contents: vec![Content {
            parts: vec![Part::Text { text }],
        }],
        generation_config: Some(GenerationConfig::chat()),
    }
}
