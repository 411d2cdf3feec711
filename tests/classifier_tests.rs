// Post-call classification over a scripted inference service

mod common;

use common::{ScriptedInference, NOT_SURE_CLASSIFICATION};
use std::sync::Arc;
use std::time::Duration;
use voice_call_agent::classify::{CallClassifier, CallbackRequired, IsSpam};
use voice_call_agent::conversation::ConversationItem;
use voice_call_agent::inference::ChatRole;

const BOOKING_CLASSIFICATION: &str = r#"```json
{
    "is_spam": "NOT_SPAM",
    "reason_for_call": "Book a dental cleaning",
    "callback_required": "YES",
    "callback_required_reason": "Confirm the appointment time",
    "caller_name": "Dana",
    "calendar_event": {
        "title": "Dental cleaning",
        "description": null,
        "start_time": "2025-03-15T10:00:00",
        "end_time": "2025-03-15T10:30:00"
    },
    "service_pricing": { "name": "Cleaning", "price_from": 80, "price_to": 120 }
}
```"#;

fn classifier(inference: &Arc<ScriptedInference>) -> CallClassifier {
    CallClassifier::new(inference.clone(), Duration::from_secs(30))
}

#[tokio::test]
async fn test_empty_transcript_skips_inference() {
    let inference = Arc::new(ScriptedInference::replying(NOT_SURE_CLASSIFICATION));

    assert!(classifier(&inference).classify_transcript("").await.is_none());
    assert_eq!(inference.request_count(), 0);
}

#[tokio::test]
async fn test_history_without_dialog_skips_inference() {
    let inference = Arc::new(ScriptedInference::replying(NOT_SURE_CLASSIFICATION));
    let history = vec![ConversationItem::user("")];

    assert!(classifier(&inference).classify(&history).await.is_none());
    assert_eq!(inference.request_count(), 0);
}

#[tokio::test]
async fn test_streamed_fragments_are_reassembled() {
    let inference = Arc::new(ScriptedInference::replying(NOT_SURE_CLASSIFICATION));

    let classification = classifier(&inference)
        .classify_transcript("user: hello?")
        .await
        .expect("classification");

    assert_eq!(classification.is_spam, IsSpam::NotSure);
    assert_eq!(classification.callback_required, CallbackRequired::NotSure);
    assert_eq!(classification.caller_name, None);

    let requests = inference.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].messages.len(), 2);
    assert_eq!(requests[0].messages[0].role, ChatRole::System);
    assert_eq!(requests[0].messages[1].content, "user: hello?");
    assert!(requests[0].response_format.is_some());
}

#[tokio::test]
async fn test_fenced_output_with_nested_objects() {
    let inference = Arc::new(ScriptedInference::replying(BOOKING_CLASSIFICATION));

    let classification = classifier(&inference)
        .classify_transcript("user: I'd like a cleaning on Saturday")
        .await
        .expect("classification");

    assert_eq!(classification.is_spam, IsSpam::NotSpam);
    assert_eq!(classification.callback_required, CallbackRequired::Yes);
    assert_eq!(classification.caller_name.as_deref(), Some("Dana"));

    let event = classification.calendar_event.expect("calendar event");
    assert_eq!(event.title.as_deref(), Some("Dental cleaning"));
    assert_eq!(event.description, None);

    let pricing = classification.service_pricing.expect("pricing");
    assert_eq!(pricing.price_from, Some(80));
    assert_eq!(pricing.price_to, Some(120));
}

#[tokio::test]
async fn test_inference_failure_yields_none() {
    let inference = Arc::new(ScriptedInference::failing());

    assert!(classifier(&inference)
        .classify_transcript("user: hello")
        .await
        .is_none());
    assert_eq!(inference.request_count(), 1);
}

#[tokio::test]
async fn test_unparseable_output_yields_none() {
    let inference = Arc::new(ScriptedInference::replying("I think this was a spam call."));

    assert!(classifier(&inference)
        .classify_transcript("user: hello")
        .await
        .is_none());
}

#[tokio::test]
async fn test_blank_output_yields_none() {
    let inference = Arc::new(ScriptedInference::replying("   "));

    assert!(classifier(&inference)
        .classify_transcript("user: hello")
        .await
        .is_none());
}

#[tokio::test(start_paused = true)]
async fn test_slow_inference_times_out() {
    let inference = Arc::new(ScriptedInference::slow(
        NOT_SURE_CLASSIFICATION,
        Duration::from_secs(120),
    ));
    let classifier = CallClassifier::new(inference.clone(), Duration::from_secs(30));

    let start = tokio::time::Instant::now();
    assert!(classifier.classify_transcript("user: hello").await.is_none());
    assert!(start.elapsed() < Duration::from_secs(31));
}
