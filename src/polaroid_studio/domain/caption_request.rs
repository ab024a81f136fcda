use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;

/// Wire format of a caption request (client -> proxy).
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct CaptionRequest {
    #[serde(rename = "imageData", default, skip_serializing_if = "Option::is_none")]
    pub image_data: Option<String>,
    #[serde(rename = "mimeType", default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    English,
    Indonesian,
}

impl Language {
    /// Only `"id"` selects Indonesian.
    pub fn from_code(code: Option<&str>) -> Self {
        match code {
            Some("id") => Language::Indonesian,
            _ => Language::English,
        }
    }

    fn prompt_phrase(&self) -> &'static str {
        match self {
            Language::English => "in English",
            Language::Indonesian => "dalam Bahasa Indonesia",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedCaptionRequest {
    pub image_data: String,
    pub mime_type: String,
    pub language: Language,
}

fn required(value: Option<String>, field: &str) -> Result<String, DomainError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(DomainError::Validation(format!("missing field `{field}`"))),
    }
}

impl CaptionRequest {
    /// Buffered mode: image, MIME type and language are all required.
    pub fn validate_strict(self) -> Result<ValidatedCaptionRequest, DomainError> {
        let image_data = required(self.image_data, "imageData")?;
        let mime_type = required(self.mime_type, "mimeType")?;
        let language = required(self.language, "language")?;
        Ok(ValidatedCaptionRequest {
            image_data,
            mime_type,
            language: Language::from_code(Some(language.as_str())),
        })
    }

    /// Streaming mode: a missing language falls back to English.
    pub fn validate_lenient(self) -> Result<ValidatedCaptionRequest, DomainError> {
        let image_data = required(self.image_data, "imageData")?;
        let mime_type = required(self.mime_type, "mimeType")?;
        Ok(ValidatedCaptionRequest {
            image_data,
            mime_type,
            language: Language::from_code(self.language.as_deref()),
        })
    }
}

pub fn caption_prompt(language: Language) -> String {
    format!(
        "Generate a short, creative, and nostalgic caption for this image, {}, under 100 characters. \
         The caption should feel like it was handwritten on a polaroid. Do not use quotes and emojis.",
        language.prompt_phrase()
    )
}

// --- upstream (Gemini generateContent) request body ---

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GeneratePayload {
    pub contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Content {
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct InlineData {
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GenerationConfig {
    pub temperature: f32,
    #[serde(rename = "topP")]
    pub top_p: f32,
    #[serde(rename = "topK")]
    pub top_k: u32,
    #[serde(rename = "maxOutputTokens")]
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.4,
            top_p: 1.0,
            top_k: 32,
            max_output_tokens: 50,
        }
    }
}

impl GeneratePayload {
    pub fn for_request(request: &ValidatedCaptionRequest) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![
                    Part::Text {
                        text: caption_prompt(request.language),
                    },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: request.mime_type.clone(),
                            data: request.image_data.clone(),
                        },
                    },
                ],
            }],
            generation_config: GenerationConfig::default(),
        }
    }
}
