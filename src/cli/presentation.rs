//! CLI presentation: text formatters for journeys and server replies.

use crate::types::Journey;
use serde_json::Value;

/// Human-readable journey summary.
pub fn format_journey_text(journey: &Journey) -> String {
    let total_m: f64 = journey.segments().iter().map(|s| s.distance_meters).sum();
    let mut lines = vec![
        format!("Bottle:   {}", journey.id()),
        format!("Launched: {}", journey.created_at().to_rfc3339()),
        format!("Origin:   {:.5}, {:.5}", journey.origin().lon, journey.origin().lat),
        format!("Endpoint: {:.5}, {:.5}", journey.endpoint().lon, journey.endpoint().lat),
        format!(
            "Segments: {} ({:.1} km traveled)",
            journey.segments().len(),
            total_m / 1000.0
        ),
    ];
    for (index, segment) in journey.segments().iter().enumerate() {
        lines.push(format!(
            "  {:>3}. {:>9.1} m, {} points",
            index + 1,
            segment.distance_meters,
            segment.path.len()
        ));
    }
    lines.join("\n")
}

/// Render a server reply: journeys as text, anything else pretty-printed.
pub fn format_response_body(body: &Value) -> String {
    if let Ok(journey) = serde_json::from_value::<Journey>(body.clone()) {
        return format_journey_text(&journey);
    }
    if let Some(message) = body.get("message").and_then(Value::as_str) {
        return message.to_string();
    }
    serde_json::to_string_pretty(body).unwrap_or_else(|_| body.to_string())
}
