use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IsSpam {
    Spam,
    NotSpam,
    NotSure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallbackRequired {
    Yes,
    No,
    NotSure,
}

/// Appointment the caller asked for
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
}

/// Service and price range discussed on the call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicePricing {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub price_from: Option<i64>,
    #[serde(default)]
    pub price_to: Option<i64>,
}

/// Structured analytics extracted from a call transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallClassification {
    pub is_spam: IsSpam,
    pub reason_for_call: String,
    pub callback_required: CallbackRequired,
    pub callback_required_reason: String,
    #[serde(default)]
    pub caller_name: Option<String>,
    #[serde(default)]
    pub calendar_event: Option<CalendarEvent>,
    #[serde(default)]
    pub service_pricing: Option<ServicePricing>,
}

fn nullable_string() -> Value {
    json!({ "type": ["string", "null"] })
}

fn nullable_integer() -> Value {
    json!({ "type": ["integer", "null"] })
}

impl CallClassification {
    /// JSON schema handed to the inference service as the response format
    pub fn json_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "is_spam": { "type": "string", "enum": ["SPAM", "NOT_SPAM", "NOT_SURE"] },
                "reason_for_call": { "type": "string" },
                "callback_required": { "type": "string", "enum": ["YES", "NO", "NOT_SURE"] },
                "callback_required_reason": { "type": "string" },
                "caller_name": nullable_string(),
                "calendar_event": {
                    "type": ["object", "null"],
                    "properties": {
                        "title": nullable_string(),
                        "description": nullable_string(),
                        "start_time": nullable_string(),
                        "end_time": nullable_string(),
                    },
                },
                "service_pricing": {
                    "type": ["object", "null"],
                    "properties": {
                        "name": nullable_string(),
                        "price_from": nullable_integer(),
                        "price_to": nullable_integer(),
                    },
                },
            },
            "required": ["is_spam", "reason_for_call", "callback_required", "callback_required_reason"],
        })
    }
}
