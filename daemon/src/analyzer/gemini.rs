//! Gemini `generateContent` client
//!
//! Sends the frame as inline base64 JPEG with a fixed system instruction and
//! a response schema, then parses the first candidate strictly.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::camera::Frame;
use crate::config::AnalyzerConfig;
use crate::detection::{rank_objects, DetectionResponse};

use super::{AnalysisError, Analyzer};

const API_KEY_HEADER: &str = "x-goog-api-key";
const IMAGE_MIME_TYPE: &str = "image/jpeg";

const SYSTEM_INSTRUCTION: &str = "You are an AI assistant for a blind person. \
Your task is to analyze an image from their wearable camera and identify potential \
obstacles and hazards. Provide a concise, clear description of the immediate \
environment. Prioritize safety and immediate threats. Describe objects with their \
name, estimated distance, and position. Keep the summary very brief. Respond ONLY \
with a JSON object.";

/// Analyzer backed by the Gemini REST API
pub struct GeminiAnalyzer {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl GeminiAnalyzer {
    pub fn new(config: &AnalyzerConfig, api_key: String) -> Result<Self, AnalysisError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(5))
            .build()?;

        let endpoint = format!(
            "{}/models/{}:generateContent",
            config.base_url.trim_end_matches('/'),
            config.model
        );

        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }
}

#[async_trait]
impl Analyzer for GeminiAnalyzer {
    async fn analyze(&self, frame: &Frame) -> Result<DetectionResponse, AnalysisError> {
        let body = build_request(frame);
        debug!(bytes = frame.len(), endpoint = %self.endpoint, "sending frame for analysis");

        let response = self
            .client
            .post(&self.endpoint)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "analysis request rejected");
            return Err(AnalysisError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let reply: GenerateContentResponse = response.json().await?;
        let text = reply.first_text().ok_or(AnalysisError::EmptyResponse)?;
        parse_detection(text)
    }
}

/// Parse the model's JSON text into a ranked detection response
pub fn parse_detection(text: &str) -> Result<DetectionResponse, AnalysisError> {
    let mut detection: DetectionResponse = serde_json::from_str(text.trim())?;
    rank_objects(&mut detection.objects);
    Ok(detection)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    system_instruction: Content,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: Value,
    thinking_config: ThinkingConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    thinking_budget: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl GenerateContentResponse {
    fn first_text(&self) -> Option<&str> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .iter()
            .find_map(|part| part.text.as_deref())
            .filter(|text| !text.trim().is_empty())
    }
}

fn build_request(frame: &Frame) -> GenerateContentRequest {
    GenerateContentRequest {
        system_instruction: Content {
            parts: vec![Part {
                text: Some(SYSTEM_INSTRUCTION.to_string()),
                inline_data: None,
            }],
        },
        contents: vec![Content {
            parts: vec![Part {
                text: None,
                inline_data: Some(InlineData {
                    mime_type: IMAGE_MIME_TYPE.to_string(),
                    data: STANDARD.encode(frame.as_bytes()),
                }),
            }],
        }],
        generation_config: GenerationConfig {
            response_mime_type: "application/json",
            response_schema: response_schema(),
            // Thinking adds latency the user can't afford
            thinking_config: ThinkingConfig { thinking_budget: 0 },
        },
    }
}

fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "objects": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "name": {
                            "type": "STRING",
                            "description": "The name of the detected object (e.g., \"car\", \"person\", \"curb\")."
                        },
                        "distance": {
                            "type": "STRING",
                            "enum": ["immediate", "near", "medium", "far"],
                            "description": "Estimated distance: immediate (0-2 ft), near (2-10 ft), medium (10-30 ft), far (30+ ft)."
                        },
                        "position": {
                            "type": "STRING",
                            "enum": ["left", "center", "right", "full"],
                            "description": "The object's position in the user's field of view."
                        },
                        "urgency": {
                            "type": "STRING",
                            "enum": ["low", "medium", "high"],
                            "description": "Urgency level. High for moving objects or immediate obstacles."
                        }
                    },
                    "required": ["name", "distance", "position", "urgency"]
                }
            },
            "summary": {
                "type": "STRING",
                "description": "A very brief overall summary of the scene, like \"Path clear\" or \"Obstacle ahead\"."
            }
        },
        "required": ["objects", "summary"]
    })
}
