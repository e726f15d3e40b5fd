//! Call-control documents
//!
//! A call-control document is the XML the telephony platform expects in reply
//! to a voice webhook. It tells the platform what to do with the live call
//! leg: dial a number, ring a browser client, or speak a message.
//!
//! The platform treats any non-200 or malformed reply as a failed leg, so
//! callers should go through [`render_or_fallback`], which always yields a
//! valid document.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Cursor;
use tracing::warn;

use super::shared::{DomainError, Result};

/// Message spoken when a document cannot be built
pub const APOLOGY_MESSAGE: &str = "We're sorry, an application error has occurred. Goodbye.";

/// Pre-rendered apology document, used when rendering itself fails
pub const FALLBACK_DOCUMENT: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response><Say>We&apos;re sorry, an application error has occurred. Goodbye.</Say></Response>";

/// Content type of call-control documents
pub const CONTENT_TYPE: &str = "text/xml";

/// Recording behaviour for a dialed leg
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordMode {
    /// One channel per party, starting when the callee answers
    RecordFromAnswerDual,
}

impl RecordMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordMode::RecordFromAnswerDual => "record-from-answer-dual",
        }
    }
}

/// What a `<Dial>` connects to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialTarget {
    Number(String),
    Client(String),
}

impl DialTarget {
    /// Classify a webhook `To` value.
    ///
    /// Phone-number shaped values are dialed as numbers. Anything else rings
    /// a browser client, with an optional `client:` prefix stripped.
    pub fn from_destination(destination: &str) -> Option<Self> {
        let destination = destination.trim();
        if destination.is_empty() {
            return None;
        }

        if let Some(client) = destination.strip_prefix("client:") {
            let client = client.trim();
            return (!client.is_empty()).then(|| DialTarget::Client(client.to_string()));
        }

        if is_phone_number(destination) {
            Some(DialTarget::Number(destination.to_string()))
        } else {
            Some(DialTarget::Client(destination.to_string()))
        }
    }

    fn element(&self) -> (&'static str, &str) {
        match self {
            DialTarget::Number(number) => ("Number", number),
            DialTarget::Client(identity) => ("Client", identity),
        }
    }
}

/// Optional leading `+`, then digits and the usual separators
fn is_phone_number(value: &str) -> bool {
    let digits = value.strip_prefix('+').unwrap_or(value);
    digits.chars().any(|c| c.is_ascii_digit())
        && digits
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '-' | '.' | '(' | ')'))
}

/// `<Dial>` verb
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dial {
    pub target: DialTarget,
    pub caller_id: Option<String>,
    pub record: Option<RecordMode>,
    pub recording_status_callback: Option<String>,
}

impl Dial {
    pub fn new(target: DialTarget) -> Self {
        Self {
            target,
            caller_id: None,
            record: None,
            recording_status_callback: None,
        }
    }

    pub fn with_caller_id(mut self, caller_id: impl Into<String>) -> Self {
        self.caller_id = Some(caller_id.into());
        self
    }

    /// Record the leg and report completed recordings to `callback`
    pub fn with_recording(mut self, mode: RecordMode, callback: impl Into<String>) -> Self {
        self.record = Some(mode);
        self.recording_status_callback = Some(callback.into());
        self
    }
}

/// A single instruction in a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verb {
    Dial(Dial),
    Say(String),
}

/// Root `<Response>` of a call-control document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoiceResponse {
    verbs: Vec<Verb>,
}

impl VoiceResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dial(mut self, dial: Dial) -> Self {
        self.verbs.push(Verb::Dial(dial));
        self
    }

    pub fn say(mut self, text: impl Into<String>) -> Self {
        self.verbs.push(Verb::Say(text.into()));
        self
    }

    pub fn apology() -> Self {
        Self::new().say(APOLOGY_MESSAGE)
    }

    pub fn verbs(&self) -> &[Verb] {
        &self.verbs
    }

    /// Render the document as XML
    pub fn to_xml(&self) -> Result<String> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));

        write(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        write(&mut writer, Event::Start(BytesStart::new("Response")))?;

        for verb in &self.verbs {
            match verb {
                Verb::Say(text) => {
                    write(&mut writer, Event::Start(BytesStart::new("Say")))?;
                    write(&mut writer, Event::Text(BytesText::new(text)))?;
                    write(&mut writer, Event::End(BytesEnd::new("Say")))?;
                }
                Verb::Dial(dial) => write_dial(&mut writer, dial)?,
            }
        }

        write(&mut writer, Event::End(BytesEnd::new("Response")))?;

        String::from_utf8(writer.into_inner().into_inner())
            .map_err(|e| DomainError::Document(e.to_string()))
    }
}

fn write_dial(writer: &mut Writer<Cursor<Vec<u8>>>, dial: &Dial) -> Result<()> {
    let mut start = BytesStart::new("Dial");
    if let Some(caller_id) = &dial.caller_id {
        start.push_attribute(("callerId", caller_id.as_str()));
    }
    if let Some(record) = dial.record {
        start.push_attribute(("record", record.as_str()));
    }
    if let Some(callback) = &dial.recording_status_callback {
        start.push_attribute(("recordingStatusCallback", callback.as_str()));
        start.push_attribute(("recordingStatusCallbackEvent", "completed"));
    }
    write(writer, Event::Start(start))?;

    let (name, value) = dial.target.element();
    write(writer, Event::Start(BytesStart::new(name)))?;
    write(writer, Event::Text(BytesText::new(value)))?;
    write(writer, Event::End(BytesEnd::new(name)))?;

    write(writer, Event::End(BytesEnd::new("Dial")))
}

fn write(writer: &mut Writer<Cursor<Vec<u8>>>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| DomainError::Document(e.to_string()))
}

/// Render a built document, degrading to the spoken apology on any error
pub fn render_or_fallback(document: Result<VoiceResponse>) -> String {
    match document.and_then(|doc| doc.to_xml()) {
        Ok(xml) => xml,
        Err(e) => {
            warn!("Falling back to apology document: {}", e);
            VoiceResponse::apology()
                .to_xml()
                .unwrap_or_else(|_| FALLBACK_DOCUMENT.to_string())
        }
    }
}
