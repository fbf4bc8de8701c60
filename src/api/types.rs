//! API request and response types

use crate::state_machine::ImageData;
use crate::subject::Subject;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Request to send a chat message
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    /// Overrides the subject derived from the referring page
    #[serde(default)]
    pub subject: Option<Subject>,
    #[serde(default)]
    pub image: Option<ImageAttachment>,
}

/// Request from the photo upload form
#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub subject: Option<Subject>,
    #[serde(default)]
    pub image: Option<ImageAttachment>,
}

/// Image attachment in a request
#[derive(Debug, Clone, Deserialize)]
pub struct ImageAttachment {
    /// Base64 payload, or a full `data:<type>;base64,<payload>` URL
    pub data: String,
    #[serde(default)]
    pub media_type: Option<String>,
}

impl ImageAttachment {
    /// Validate the attachment and normalise it to a bare base64 payload
    pub fn into_image_data(self) -> Result<ImageData, String> {
        let (media_type, data) = match self.data.strip_prefix("data:") {
            Some(rest) => {
                let (header, payload) = rest
                    .split_once(',')
                    .ok_or_else(|| "malformed data URL".to_string())?;
                let media_type = header
                    .strip_suffix(";base64")
                    .ok_or_else(|| "data URL must be base64 encoded".to_string())?;
                (Some(media_type.to_string()), payload.to_string())
            }
            None => (None, self.data),
        };

        let media_type = self
            .media_type
            .or(media_type)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| "image/png".to_string());
        if !media_type.starts_with("image/") {
            return Err(format!("unsupported media type: {media_type}"));
        }

        let data = data.trim().to_string();
        if data.is_empty() {
            return Err("image data is empty".to_string());
        }
        STANDARD
            .decode(&data)
            .map_err(|e| format!("image data is not valid base64: {e}"))?;

        Ok(ImageData { data, media_type })
    }
}

/// Reply to a chat or upload request
#[derive(Debug, Serialize)]
pub struct ReplyResponse {
    pub reply: String,
}

/// Whether the client is in the middle of a step plan
#[derive(Debug, Serialize)]
pub struct ActiveResponse {
    pub active: bool,
}

/// One selectable subject
#[derive(Debug, Serialize)]
pub struct SubjectInfo {
    pub id: Subject,
    pub name: &'static str,
}

/// Response for subject list
#[derive(Debug, Serialize)]
pub struct SubjectsResponse {
    pub subjects: Vec<SubjectInfo>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
