//! Log redaction for dispatched commands and renderer log lines.

use pod_shell_core::{ApiCmd, InboundMessage};
use serde_json::{Map, Value};

/// Placeholder written in place of sensitive values.
pub const REDACTED: &str = "<redacted>";

/// Fields replaced wholesale, per command.
fn sensitive_fields(cmd: ApiCmd) -> &'static [&'static str] {
    match cmd {
        ApiCmd::ShowNotification => &["title", "body", "data", "image"],
        ApiCmd::BadgeDataUrl => &["dataUrl"],
        ApiCmd::WriteCloud9Pipe => &["data"],
        ApiCmd::UpdateThumbnail => &["thumbnail"],
        ApiCmd::UploadSnippet => &["mergedImageData"],
        ApiCmd::AboutAppClipBoardData => &["clipboard"],
        _ => &[],
    }
}

/// Copy of `message` safe to log: sensitive fields become [`REDACTED`],
/// renderer log details pass through [`redact_sensitive`] and log file
/// entries keep their names but lose their contents.
pub fn redact_message(message: &InboundMessage) -> Value {
    let mut record = Map::with_capacity(message.fields.len() + 1);
    record.insert("cmd".to_string(), Value::from(message.cmd.as_str()));

    let hidden = sensitive_fields(message.cmd);
    for (key, value) in &message.fields {
        let value = if hidden.contains(&key.as_str()) {
            Value::from(REDACTED)
        } else if message.cmd == ApiCmd::SendLogs && key == "logFiles" {
            redact_log_files(value)
        } else if message.cmd == ApiCmd::Log && key == "msgs" {
            redact_log_entries(value)
        } else {
            value.clone()
        };
        record.insert(key.clone(), value);
    }

    Value::Object(record)
}

/// Serialized form of [`redact_message`] for a single log field.
pub fn redacted_record(message: &InboundMessage) -> String {
    redact_message(message).to_string()
}

fn redact_log_files(value: &Value) -> Value {
    let Some(files) = value.as_array() else {
        return Value::from(REDACTED);
    };

    files
        .iter()
        .map(|file| match file {
            Value::Object(entry) => {
                let mut entry = entry.clone();
                if entry.contains_key("contents") {
                    entry.insert("contents".to_string(), Value::from(REDACTED));
                }
                Value::Object(entry)
            }
            _ => Value::from(REDACTED),
        })
        .collect()
}

fn redact_log_entries(value: &Value) -> Value {
    let Some(entries) = value.as_array() else {
        return Value::from(REDACTED);
    };

    entries
        .iter()
        .map(|entry| match entry {
            Value::Object(entry) => {
                let mut entry = entry.clone();
                if let Some(details) = entry.get_mut("details") {
                    let text = match &*details {
                        Value::String(text) => redact_sensitive(text),
                        other => redact_sensitive(&other.to_string()),
                    };
                    *details = Value::from(text);
                }
                Value::Object(entry)
            }
            _ => Value::from(REDACTED),
        })
        .collect()
}

/// Redacts common secret markers in free-form log text. Everything after
/// the first marker is dropped.
pub fn redact_sensitive(input: &str) -> String {
    let mut redacted = input.to_string();
    for key in ["password", "token", "authorization", "bearer", "cookie"] {
        redacted = redact_key_value(&redacted, key);
    }
    redacted
}

fn redact_key_value(input: &str, key: &str) -> String {
    let lower = input.to_ascii_lowercase();
    if let Some(position) = lower.find(key) {
        let prefix = &input[..position];
        return format!("{prefix}{key}={REDACTED}");
    }

    input.to_string()
}
