//! The operations offered to the form, and how the form displays results.

use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    /// Free text, sent as `{text}` or `{prompt}`.
    Text,
    /// Text plus a target language code.
    Translate,
    /// Multipart upload in field `file`.
    File,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Service {
    pub value: &'static str,
    pub label: &'static str,
    pub input: InputKind,
}

pub static SERVICES: [Service; 8] = [
    Service {
        value: "tts",
        label: "Text to Speech",
        input: InputKind::Text,
    },
    Service {
        value: "stt",
        label: "Speech to Text",
        input: InputKind::File,
    },
    Service {
        value: "translate",
        label: "Translate",
        input: InputKind::Translate,
    },
    Service {
        value: "vision",
        label: "Vision",
        input: InputKind::File,
    },
    Service {
        value: "video",
        label: "Video Intelligence",
        input: InputKind::File,
    },
    Service {
        value: "gemini",
        label: "Gemini",
        input: InputKind::Text,
    },
    Service {
        value: "imagen",
        label: "Imagen",
        input: InputKind::Text,
    },
    Service {
        value: "veo",
        label: "Veo",
        input: InputKind::Text,
    },
];

/// Result-view selection from `renderResult` in `static/index.html`, kept
/// here so the rule and the gateway's payload shapes are checked together.
#[cfg(test)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultView {
    Audio,
    Image,
    Video,
    Raw,
}

#[cfg(test)]
impl ResultView {
    pub fn for_payload(payload: &Value) -> Self {
        if is_set(payload.get("audio")) {
            Self::Audio
        } else if is_set(payload.get("image")) {
            Self::Image
        } else if is_set(payload.get("video")) {
            Self::Video
        } else {
            Self::Raw
        }
    }
}

#[cfg(test)]
fn is_set(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Number(n)) => n.as_f64() != Some(0.0),
        Some(_) => true,
    }
}
