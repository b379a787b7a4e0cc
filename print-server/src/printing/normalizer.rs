//! Submission normalizer
//!
//! Teams send print bodies in whatever shape their client happens to
//! produce. Everything is mapped onto canonical [`PrinterCommand`]s,
//! trying the shapes in priority order:
//!
//! 1. `{"commands": [{"type": ...}, ...]}`
//! 2. `{"elements": ["line", ...]}`
//! 3. `{"content": "text"}`
//! 4. `["line", ...]`
//! 5. plain text, including bodies that only look like JSON
//! 6. `"a JSON string"`
//!
//! A shape that fails to parse falls through to the next one. The result is
//! never empty: blank input yields a placeholder line.

use receipt_printer::{
    Alignment, BarcodeOptions, BarcodeType, ImageOptions, QrCodeOptions, QrErrorCorrection,
    TextSize, TextStyle,
};
use serde_json::{Map, Value};
use shared::error::{AppError, ErrorCode};
use shared::models::PrinterCommand;
use thiserror::Error;
use tracing::{debug, warn};

/// Placeholder printed for blank submissions
pub const EMPTY_REQUEST_TEXT: &str = "Empty print request";

const RULE: &str = "================================";

/// Why a body could not be turned into commands
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectionReason {
    #[error("Malformed print request: {0}")]
    Malformed(String),

    #[error("Print request too large: {0}")]
    TooLarge(String),
}

impl From<RejectionReason> for AppError {
    fn from(reason: RejectionReason) -> Self {
        let code = match reason {
            RejectionReason::Malformed(_) => ErrorCode::MalformedSubmission,
            RejectionReason::TooLarge(_) => ErrorCode::SubmissionTooLarge,
        };
        AppError::with_message(code, reason.to_string())
    }
}

/// Converts raw request bodies into command sequences
#[derive(Debug, Clone)]
pub struct Normalizer {
    max_body_bytes: usize,
    max_commands: usize,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(64 * 1024, 512)
    }
}

impl Normalizer {
    pub fn new(max_body_bytes: usize, max_commands: usize) -> Self {
        Self {
            max_body_bytes,
            max_commands: max_commands.max(1),
        }
    }

    /// Normalize one print request body for `team_id`
    pub fn normalize(
        &self,
        raw: &[u8],
        team_id: &str,
    ) -> Result<Vec<PrinterCommand>, RejectionReason> {
        if raw.len() > self.max_body_bytes {
            return Err(RejectionReason::TooLarge(format!(
                "body is {} bytes, limit is {}",
                raw.len(),
                self.max_body_bytes
            )));
        }

        let text = std::str::from_utf8(raw)
            .map_err(|e| RejectionReason::Malformed(format!("body is not valid UTF-8: {e}")))?;
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let trimmed = text.trim();

        if trimmed.is_empty() {
            warn!(team_id, "Received blank print request");
            return Ok(placeholder());
        }

        let commands = if looks_like_json(trimmed) {
            match serde_json::from_str::<Value>(trimmed) {
                Ok(value) => from_json(value, team_id)?,
                // Looked like JSON but is not; print it as written
                Err(e) => {
                    debug!(team_id, error = %e, "Body is not JSON, using it as plain text");
                    vec![PrinterCommand::text(text)]
                }
            }
        } else {
            debug!(team_id, "Using raw body as plain text");
            vec![PrinterCommand::text(text)]
        };

        if commands.len() > self.max_commands {
            return Err(RejectionReason::TooLarge(format!(
                "{} commands, limit is {}",
                commands.len(),
                self.max_commands
            )));
        }

        Ok(if commands.is_empty() {
            placeholder()
        } else {
            commands
        })
    }
}

fn looks_like_json(s: &str) -> bool {
    s.starts_with('{') || s.starts_with('[') || s.starts_with('"')
}

fn placeholder() -> Vec<PrinterCommand> {
    vec![PrinterCommand::text(EMPTY_REQUEST_TEXT)]
}

/// Printed for an empty `elements` array so the team can see their request arrived
fn test_receipt(team_id: &str) -> PrinterCommand {
    let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
    PrinterCommand::text(format!(
        "{RULE}\nTEST RECEIPT\nTeam: {team_id}\nTime: {now}\n{RULE}\nNo data provided\n{RULE}"
    ))
}

fn from_json(value: Value, team_id: &str) -> Result<Vec<PrinterCommand>, RejectionReason> {
    match value {
        Value::Object(map) => from_object(map, team_id),
        Value::Array(items) => Ok(from_array(items)),
        Value::String(s) => Ok(lines_or_placeholder(std::iter::once(s))),
        Value::Null => Ok(placeholder()),
        scalar => Ok(vec![PrinterCommand::text(scalar.to_string())]),
    }
}

fn from_object(
    mut map: Map<String, Value>,
    team_id: &str,
) -> Result<Vec<PrinterCommand>, RejectionReason> {
    if let Some(Value::Array(entries)) = map.remove("commands") {
        return Ok(entries.into_iter().map(parse_command).collect());
    }

    if let Some(Value::Array(elements)) = map.remove("elements") {
        if elements.is_empty() {
            warn!(team_id, "Received empty elements array, printing test receipt");
            return Ok(vec![test_receipt(team_id)]);
        }
        return Ok(lines_or_placeholder(elements.into_iter().filter_map(scalar_text)));
    }

    match map.remove("content") {
        Some(Value::Null) => return Ok(placeholder()),
        Some(content) => {
            if let Some(text) = scalar_text(content) {
                return Ok(lines_or_placeholder(std::iter::once(text)));
            }
        }
        None => {}
    }

    let keys: Vec<&str> = map.keys().map(String::as_str).collect();
    Err(RejectionReason::Malformed(format!(
        "object with keys [{}] matches no known shape",
        keys.join(", ")
    )))
}

/// A bare array: a command list if every entry is a typed object, else lines
fn from_array(items: Vec<Value>) -> Vec<PrinterCommand> {
    let all_typed = !items.is_empty()
        && items
            .iter()
            .all(|v| v.as_object().is_some_and(|o| o.contains_key("type")));
    if all_typed {
        return items.into_iter().map(parse_command).collect();
    }
    lines_or_placeholder(items.into_iter().filter_map(scalar_text))
}

fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn lines_or_placeholder(lines: impl Iterator<Item = String>) -> Vec<PrinterCommand> {
    let commands: Vec<_> = lines
        .filter(|l| !l.trim().is_empty())
        .map(PrinterCommand::text)
        .collect();
    if commands.is_empty() {
        placeholder()
    } else {
        commands
    }
}

// ========== Command entries ==========

/// Uppercase with separators removed, so `addText`, `ADD_TEXT` and `add-text` agree
fn fold(name: &str) -> String {
    name.trim()
        .chars()
        .filter(|c| !matches!(c, '_' | '-' | ' ' | '.'))
        .flat_map(char::to_uppercase)
        .collect()
}

fn field<'a>(obj: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names.iter().find_map(|n| obj.get(*n)).filter(|v| !v.is_null())
}

fn str_field(obj: &Map<String, Value>, names: &[&str]) -> Option<String> {
    match field(obj, names)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn uint_field(obj: &Map<String, Value>, names: &[&str]) -> Option<u64> {
    match field(obj, names)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn bool_field(obj: &Map<String, Value>, name: &str) -> Option<bool> {
    match obj.get(name)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Style from a nested `style` object or from top-level fields
fn parse_style(obj: &Map<String, Value>) -> Option<TextStyle> {
    let source = match obj.get("style") {
        Some(Value::Object(style)) => style,
        _ if ["bold", "underline", "size"].iter().any(|k| obj.contains_key(*k)) => obj,
        _ => return None,
    };
    Some(TextStyle {
        bold: bool_field(source, "bold").unwrap_or(false),
        underline: bool_field(source, "underline").unwrap_or(false),
        size: str_field(source, &["size"])
            .and_then(|s| TextSize::parse(&s))
            .unwrap_or_default(),
    })
}

fn options<T: serde::de::DeserializeOwned + Default>(obj: &Map<String, Value>) -> T {
    obj.get("options")
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default()
}

/// Map one `commands` entry; anything unusable becomes [`PrinterCommand::Unknown`]
fn parse_command(entry: Value) -> PrinterCommand {
    let obj = match entry {
        Value::Object(obj) => obj,
        Value::String(s) => return PrinterCommand::text(s),
        other => {
            warn!(entry = %other, "Command entry is not an object");
            return PrinterCommand::Unknown {
                raw_type: String::new(),
            };
        }
    };

    let raw_type = str_field(&obj, &["type", "command", "cmd"]).unwrap_or_default();
    let command = match fold(&raw_type).as_str() {
        "TEXT" | "ADDTEXT" | "PRINTTEXT" | "LINE" => {
            str_field(&obj, &["content", "text", "data", "value"]).map(|content| {
                PrinterCommand::Text {
                    content,
                    style: parse_style(&obj),
                }
            })
        }
        "SETSTYLE" | "ADDTEXTSTYLE" | "STYLE" | "TEXTSTYLE" => {
            let style = parse_style(&obj).unwrap_or_default();
            Some(PrinterCommand::set_style(style))
        }
        "SETALIGN" | "ADDTEXTALIGN" | "ALIGN" | "ALIGNMENT" | "TEXTALIGN" => {
            str_field(&obj, &["alignment", "align", "value"])
                .and_then(|a| Alignment::parse(&a))
                .map(|alignment| PrinterCommand::SetAlign { alignment })
        }
        "BARCODE" | "ADDBARCODE" => str_field(&obj, &["data", "content", "value"]).map(|data| {
            let symbology = str_field(&obj, &["symbology", "barcodeType", "format"])
                .and_then(|s| BarcodeType::parse(&s))
                .unwrap_or_default();
            PrinterCommand::Barcode {
                data,
                symbology,
                options: options::<BarcodeOptions>(&obj),
            }
        }),
        "QRCODE" | "ADDQRCODE" | "QR" => str_field(&obj, &["data", "content", "value"]).map(|data| {
            let defaults: QrCodeOptions = options(&obj);
            PrinterCommand::QrCode {
                data,
                size: uint_field(&obj, &["size"])
                    .map(|s| s.clamp(1, 16) as u8)
                    .unwrap_or(defaults.size),
                error_correction: str_field(&obj, &["errorCorrection", "error_correction"])
                    .and_then(|e| QrErrorCorrection::parse(&e))
                    .unwrap_or(defaults.error_correction),
            }
        }),
        "IMAGE" | "ADDIMAGE" => str_field(&obj, &["data", "content"]).map(|data| {
            PrinterCommand::Image {
                data,
                options: options::<ImageOptions>(&obj),
            }
        }),
        "FEEDLINES" | "FEEDLINE" | "ADDFEEDLINE" | "FEED" => {
            let lines = uint_field(&obj, &["lines", "count", "value"]).unwrap_or(1);
            Some(PrinterCommand::FeedLines {
                lines: lines.min(u8::MAX as u64) as u8,
            })
        }
        "CUT" | "CUTPAPER" | "ADDCUT" => Some(PrinterCommand::Cut),
        "UNKNOWN" => {
            return PrinterCommand::Unknown {
                raw_type: str_field(&obj, &["rawType", "raw_type"]).unwrap_or_default(),
            };
        }
        _ => None,
    };

    command.unwrap_or_else(|| {
        warn!(command_type = %raw_type, "Unrecognized or incomplete command");
        PrinterCommand::Unknown { raw_type }
    })
}
