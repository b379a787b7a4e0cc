//! Team interpreter scripts
//!
//! Teams upload a Kotlin-flavoured function:
//!
//! ```text
//! fun interpret(jsonString: String, printer: EpsonPrinter) {
//!     printer.addTextAlign(Alignment.CENTER)
//!     printer.addText("Hello", TextStyle(bold = true, size = TextSize.LARGE))
//!     printer.addFeedLine(2)
//!     printer.cutPaper()
//! }
//! ```
//!
//! Nothing is evaluated. The body is split into statements and each one is
//! matched against a small fixed set of printer calls; everything else is
//! skipped.

use receipt_printer::{Alignment, QrCodeOptions, TextSize, TextStyle};
use shared::error::{AppError, ErrorCode};
use shared::models::PrinterCommand;
use thiserror::Error;
use tracing::debug;

const SIGNATURE_HINT: &str = "fun interpret(jsonString: String, printer: EpsonPrinter)";

/// Structural problems found before a script may run
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptValidationError {
    #[error("Invalid interpreter code. Must define: {SIGNATURE_HINT}")]
    MissingSignature,

    #[error("Mismatched braces in interpreter code")]
    UnbalancedBraces,

    #[error("Unclosed string literal in interpreter code")]
    UnterminatedString,

    #[error("Could not find the body of the interpret function")]
    MissingBody,

    #[error("Script has {count} statements, limit is {limit}")]
    TooManyStatements { count: usize, limit: usize },
}

impl From<ScriptValidationError> for AppError {
    fn from(err: ScriptValidationError) -> Self {
        AppError::with_message(ErrorCode::ScriptInvalid, err.to_string())
    }
}

/// A recognized call whose arguments make no sense
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {message} in `{statement}`")]
pub struct ScriptError {
    pub line: usize,
    pub statement: String,
    pub message: String,
}

/// Check the script shape without translating anything
///
/// Requires the `interpret` entry signature, balanced braces outside string
/// literals and no unterminated string.
pub fn validate(source: &str) -> Result<(), ScriptValidationError> {
    if !source.contains("fun interpret")
        || !source.contains("jsonString")
        || !source.contains("printer")
    {
        return Err(ScriptValidationError::MissingSignature);
    }

    let mut depth: i64 = 0;
    let mut in_string = false;
    let mut escaped = false;
    let mut chars = source.chars().peekable();
    while let Some(c) = chars.next() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth < 0 {
                    return Err(ScriptValidationError::UnbalancedBraces);
                }
            }
            // Line comments may hold anything
            '/' if chars.peek() == Some(&'/') => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            _ => {}
        }
    }

    if in_string {
        return Err(ScriptValidationError::UnterminatedString);
    }
    if depth != 0 {
        return Err(ScriptValidationError::UnbalancedBraces);
    }
    Ok(())
}

/// One source statement and the line it starts on
#[derive(Debug, Clone, PartialEq, Eq)]
struct SourceStatement {
    line: usize,
    text: String,
}

/// A validated script, split into statements
#[derive(Debug, Clone)]
pub struct Program {
    statements: Vec<SourceStatement>,
}

impl Program {
    /// Validate `source` and split the `interpret` body into statements
    pub fn compile(source: &str, max_statements: usize) -> Result<Self, ScriptValidationError> {
        validate(source)?;

        let (body, first_line) = function_body(source).ok_or(ScriptValidationError::MissingBody)?;
        let statements = split_statements(body, first_line);
        if statements.len() > max_statements {
            return Err(ScriptValidationError::TooManyStatements {
                count: statements.len(),
                limit: max_statements,
            });
        }
        Ok(Self { statements })
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Translate every recognized statement into one printer command
    pub fn translate(&self) -> Result<Vec<PrinterCommand>, ScriptError> {
        let mut commands = Vec::new();
        for statement in &self.statements {
            match translate_statement(&statement.text) {
                Ok(Some(command)) => commands.push(command),
                Ok(None) => debug!(line = statement.line, statement = %statement.text, "Skipping statement"),
                Err(message) => {
                    return Err(ScriptError {
                        line: statement.line,
                        statement: statement.text.clone(),
                        message,
                    });
                }
            }
        }
        Ok(commands)
    }
}

/// Text between the first `{` after the signature and the last `}`
fn function_body(source: &str) -> Option<(&str, usize)> {
    let signature = source.find("fun interpret")?;
    let open = signature + source[signature..].find('{')?;
    let close = source.rfind('}')?;
    if close <= open {
        return None;
    }
    let first_line = source[..=open].matches('\n').count() + 1;
    Some((&source[open + 1..close], first_line))
}

/// Split on `;` and newlines outside string literals, dropping `//` comments
fn split_statements(body: &str, first_line: usize) -> Vec<SourceStatement> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut line = first_line;
    let mut start_line = line;
    let mut in_string = false;
    let mut escaped = false;
    let mut in_comment = false;

    let mut flush = |current: &mut String, start_line: usize| {
        let text = current.trim();
        if !text.is_empty() {
            statements.push(SourceStatement {
                line: start_line,
                text: text.to_string(),
            });
        }
        current.clear();
    };

    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\n' {
            in_comment = false;
            in_string = false;
            flush(&mut current, start_line);
            line += 1;
            start_line = line;
            continue;
        }
        if in_comment {
            continue;
        }
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            current.push(c);
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                current.push(c);
            }
            '/' if chars.peek() == Some(&'/') => in_comment = true,
            ';' => {
                flush(&mut current, start_line);
                start_line = line;
            }
            _ => current.push(c),
        }
    }
    flush(&mut current, start_line);
    statements
}

// ========== Statement grammar ==========

/// Statement forms the interpreter understands
#[derive(Debug, Clone, PartialEq, Eq)]
enum Call<'a> {
    AddText(&'a str),
    AddTextAlign(&'a str),
    AddTextStyle(&'a str),
    AddFeedLine(&'a str),
    CutPaper,
    AddQrCode(&'a str),
}

/// Find `printer.<method>(<args>)` in a statement
fn parse_call(statement: &str) -> Option<Call<'_>> {
    let start = statement.find("printer.")? + "printer.".len();
    let rest = &statement[start..];
    let paren = rest.find('(')?;
    let method = rest[..paren].trim();
    let args = rest[paren + 1..]
        .rfind(')')
        .map(|end| rest[paren + 1..paren + 1 + end].trim())?;

    Some(match method {
        "addText" => Call::AddText(args),
        "addTextAlign" => Call::AddTextAlign(args),
        "addTextStyle" => Call::AddTextStyle(args),
        "addFeedLine" => Call::AddFeedLine(args),
        "cutPaper" => Call::CutPaper,
        "addQRCode" => Call::AddQrCode(args),
        _ => return None,
    })
}

fn translate_statement(statement: &str) -> Result<Option<PrinterCommand>, String> {
    let Some(call) = parse_call(statement) else {
        return Ok(None);
    };

    let command = match call {
        Call::AddText(args) => {
            let args = split_args(args);
            let Some(text) = args.first().and_then(|a| string_literal(a)) else {
                // Expressions cannot be evaluated
                return Ok(None);
            };
            let style = match args.get(1) {
                Some(style) => Some(parse_text_style(style)?),
                None => None,
            };
            PrinterCommand::Text {
                content: text,
                style,
            }
        }
        Call::AddTextAlign(args) => {
            let name = enum_value(args, "Alignment");
            let alignment =
                Alignment::parse(&name).ok_or_else(|| format!("unknown alignment `{args}`"))?;
            PrinterCommand::SetAlign { alignment }
        }
        Call::AddTextStyle(args) => PrinterCommand::set_style(parse_text_style(args)?),
        Call::AddFeedLine(args) => {
            let lines: u8 = args
                .trim()
                .parse()
                .map_err(|_| format!("feed line count `{args}` is not a number from 0 to 255"))?;
            PrinterCommand::FeedLines { lines }
        }
        Call::CutPaper => PrinterCommand::Cut,
        Call::AddQrCode(args) => {
            let Some(data) = split_args(args).first().and_then(|a| string_literal(a)) else {
                return Ok(None);
            };
            let options = QrCodeOptions::default();
            PrinterCommand::QrCode {
                data,
                size: options.size,
                error_correction: options.error_correction,
            }
        }
    };
    Ok(Some(command))
}

/// Split call arguments on top-level commas
fn split_args(args: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut start = 0;
    for (i, c) in args.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(args[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    let last = args[start..].trim();
    if !last.is_empty() {
        parts.push(last);
    }
    parts
}

/// Contents of a `"..."` literal with escapes resolved
fn string_literal(arg: &str) -> Option<String> {
    let inner = arg.trim().strip_prefix('"')?.strip_suffix('"')?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => {}
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    Some(out)
}

/// `Alignment.CENTER` -> `CENTER`; a string literal or bare name works too
fn enum_value(arg: &str, type_name: &str) -> String {
    let arg = arg.trim();
    if let Some(literal) = string_literal(arg) {
        return literal;
    }
    arg.strip_prefix(type_name)
        .and_then(|rest| rest.strip_prefix('.'))
        .unwrap_or(arg)
        .to_string()
}

/// `TextStyle(bold = true, underline = false, size = TextSize.LARGE)`
fn parse_text_style(arg: &str) -> Result<TextStyle, String> {
    let arg = arg.trim();
    let inner = arg
        .strip_prefix("TextStyle")
        .map(str::trim_start)
        .and_then(|rest| rest.strip_prefix('('))
        .and_then(|rest| rest.strip_suffix(')'))
        .ok_or_else(|| format!("expected TextStyle(...), found `{arg}`"))?;

    let mut style = TextStyle::default();
    for part in split_args(inner) {
        let (name, value) = part
            .split_once('=')
            .map(|(n, v)| (n.trim(), v.trim()))
            .ok_or_else(|| format!("style argument `{part}` is not `name = value`"))?;
        match name {
            "bold" => style.bold = parse_bool(value)?,
            "underline" => style.underline = parse_bool(value)?,
            "size" => {
                let size = enum_value(value, "TextSize");
                style.size =
                    TextSize::parse(&size).ok_or_else(|| format!("unknown text size `{value}`"))?;
            }
            other => return Err(format!("unknown style argument `{other}`")),
        }
    }
    Ok(style)
}

fn parse_bool(value: &str) -> Result<bool, String> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(format!("`{value}` is not true or false")),
    }
}
