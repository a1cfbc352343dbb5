use chrono::Utc;
use serde_json::Value;

/// Event name for dashboard navigation events. Frames submitted with this
/// target are broadcast live but never written into history — dashboard
/// events are ephemeral, not stateful widget values.
pub const DASHBOARD_TARGET: &str = "dashboards";

/// Format a serialized JSON body as a server-sent-event wire frame:
///
/// ```text
/// event: <name>\n     (only when a target name is given)
/// data: <json>\n
/// \n
/// ```
///
/// This is the complete unit delivered per event; no other framing exists.
pub fn format_frame(body: &str, name: Option<&str>) -> String {
    let mut frame = String::with_capacity(body.len() + 16);
    if let Some(name) = name {
        frame.push_str("event: ");
        frame.push_str(name);
        frame.push('\n');
    }
    frame.push_str("data: ");
    frame.push_str(body);
    frame.push_str("\n\n");
    frame
}

/// Stamp the identifying fields onto a submitted event body:
/// `id` is always set from the URL key, `updatedAt` defaults to the current
/// unix timestamp when the producer did not supply one.
pub fn stamp_event(key: &str, body: &mut Value) {
    if let Some(obj) = body.as_object_mut() {
        obj.insert("id".to_string(), Value::from(key));
        obj.entry("updatedAt")
            .or_insert_with(|| Value::from(Utc::now().timestamp()));
    }
}
