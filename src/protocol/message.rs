use super::error::CodecError;
use super::record::Record;
use super::value::Value;
use serde::Serialize;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Every message kind exchanged between front end and back end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MessageKind {
    ToplevelCommand,
    DebuggerCommand,
    InlineCommand,
    InputSubmission,
    ToplevelResponse,
    DebuggerResponse,
    InputRequest,
    InlineResponse,
    OutputEvent,
}

impl MessageKind {
    pub const ALL: [MessageKind; 9] = [
        MessageKind::ToplevelCommand,
        MessageKind::DebuggerCommand,
        MessageKind::InlineCommand,
        MessageKind::InputSubmission,
        MessageKind::ToplevelResponse,
        MessageKind::DebuggerResponse,
        MessageKind::InputRequest,
        MessageKind::InlineResponse,
        MessageKind::OutputEvent,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MessageKind::ToplevelCommand => "ToplevelCommand",
            MessageKind::DebuggerCommand => "DebuggerCommand",
            MessageKind::InlineCommand => "InlineCommand",
            MessageKind::InputSubmission => "InputSubmission",
            MessageKind::ToplevelResponse => "ToplevelResponse",
            MessageKind::DebuggerResponse => "DebuggerResponse",
            MessageKind::InputRequest => "InputRequest",
            MessageKind::InlineResponse => "InlineResponse",
            MessageKind::OutputEvent => "OutputEvent",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Commands that advance program state.
    pub fn is_action_command(self) -> bool {
        matches!(self, MessageKind::ToplevelCommand | MessageKind::DebuggerCommand)
    }

    /// Replies to an action command.
    pub fn is_action_response(self) -> bool {
        matches!(self, MessageKind::ToplevelResponse | MessageKind::DebuggerResponse)
    }

    /// The back end has stopped and waits for the next command.
    pub fn is_pause_message(self) -> bool {
        self.is_action_response() || self == MessageKind::InputRequest
    }

    /// The `vm_state` this kind always carries, if any.
    pub fn vm_state(self) -> Option<&'static str> {
        match self {
            MessageKind::ToplevelResponse => Some("toplevel"),
            MessageKind::DebuggerResponse => Some("debug"),
            MessageKind::InputRequest => Some("input"),
            _ => None,
        }
    }

    /// Fields a message of this kind cannot do without.
    pub fn required_fields(self) -> &'static [&'static str] {
        match self {
            MessageKind::ToplevelCommand
            | MessageKind::DebuggerCommand
            | MessageKind::InlineCommand => &["command"],
            MessageKind::InputSubmission => &["data"],
            MessageKind::OutputEvent => &["stream_name", "data"],
            MessageKind::ToplevelResponse
            | MessageKind::DebuggerResponse
            | MessageKind::InputRequest => &["vm_state"],
            MessageKind::InlineResponse => &[],
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub kind: MessageKind,
    #[serde(rename = "fields")]
    record: Record,
}

impl Message {
    /// Creates a message from the caller's fields. Kinds that carry a fixed
    /// `vm_state` get it stamped over whatever the caller passed.
    pub fn new(kind: MessageKind, record: Record) -> Self {
        let mut message = Self { kind, record };
        message.stamp();
        message
    }

    /// Wraps already-validated parts without stamping.
    pub(crate) fn from_parts(kind: MessageKind, record: Record) -> Self {
        Self { kind, record }
    }

    fn stamp(&mut self) {
        if let Some(state) = self.kind.vm_state() {
            self.record.set("vm_state", state);
        }
    }

    pub fn toplevel_command(command: &str) -> Self {
        Self::new(MessageKind::ToplevelCommand, Record::new().with("command", command))
    }

    pub fn debugger_command(command: &str) -> Self {
        Self::new(MessageKind::DebuggerCommand, Record::new().with("command", command))
    }

    pub fn inline_command(command: &str) -> Self {
        Self::new(MessageKind::InlineCommand, Record::new().with("command", command))
    }

    pub fn input_submission(data: &str) -> Self {
        Self::new(MessageKind::InputSubmission, Record::new().with("data", data))
    }

    pub fn output_event(stream_name: &str, data: &str) -> Self {
        Self::new(
            MessageKind::OutputEvent,
            Record::new()
                .with("stream_name", stream_name)
                .with("data", data),
        )
    }

    /// Builder-style field insert; a stamped `vm_state` cannot be replaced.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.record.set(name, value);
        self.stamp();
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.record.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.record.get_str(name)
    }

    /// The `command` field of a command message.
    pub fn command(&self) -> Option<&str> {
        self.get_str("command")
    }

    pub fn vm_state(&self) -> Option<&str> {
        self.get_str("vm_state")
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    /// Checks the fields this kind requires, and that a stamped kind carries
    /// its own `vm_state`.
    pub fn validate(&self) -> Result<(), CodecError> {
        let kind = self.kind.name();
        for &field in self.kind.required_fields() {
            match self.record.get(field) {
                None => return Err(CodecError::MissingField { kind, field }),
                Some(Value::Str(_)) => {}
                Some(_) => {
                    return Err(CodecError::WrongFieldType {
                        kind,
                        field,
                        expected: "a string",
                    })
                }
            }
        }
        if let Some(state) = self.kind.vm_state() {
            if self.vm_state() != Some(state) {
                return Err(CodecError::WrongFieldType {
                    kind,
                    field: "vm_state",
                    expected: state,
                });
            }
        }
        Ok(())
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind, self.record)
    }
}

impl Hash for Message {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.record.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stamped_kinds_override_vm_state() {
        let record = Record::new().with("vm_state", "bogus").with("value", 3);
        let response = Message::new(MessageKind::ToplevelResponse, record.clone());
        assert_eq!(response.vm_state(), Some("toplevel"));
        assert_eq!(response.get("value"), Some(&Value::Int(3)));

        let debug = Message::new(MessageKind::DebuggerResponse, record.clone());
        assert_eq!(debug.vm_state(), Some("debug"));
        let input = Message::new(MessageKind::InputRequest, Record::new()).with("vm_state", "x");
        assert_eq!(input.vm_state(), Some("input"));

        let inline = Message::new(MessageKind::InlineResponse, record);
        assert_eq!(inline.vm_state(), Some("bogus"));
    }

    #[test]
    fn test_hierarchy() {
        use MessageKind::*;
        let commands: Vec<_> = MessageKind::ALL.into_iter().filter(|k| k.is_action_command()).collect();
        assert_eq!(commands, [ToplevelCommand, DebuggerCommand]);
        let pauses: Vec<_> = MessageKind::ALL.into_iter().filter(|k| k.is_pause_message()).collect();
        assert_eq!(pauses, [ToplevelResponse, DebuggerResponse, InputRequest]);
        assert!(!InputRequest.is_action_response());
        assert!(!InlineResponse.is_pause_message());
        for kind in MessageKind::ALL {
            assert_eq!(MessageKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(MessageKind::from_name("ActionCommand"), None);
    }

    #[test]
    fn test_validate() {
        assert!(Message::toplevel_command("pass").validate().is_ok());
        assert!(Message::output_event("stdout", "hi\n").validate().is_ok());
        assert!(matches!(
            Message::new(MessageKind::DebuggerCommand, Record::new()).validate(),
            Err(CodecError::MissingField { field: "command", .. })
        ));
        assert!(matches!(
            Message::new(MessageKind::InputSubmission, Record::new().with("data", 5)).validate(),
            Err(CodecError::WrongFieldType { field: "data", .. })
        ));
        let unstamped = Message::from_parts(
            MessageKind::InputRequest,
            Record::new().with("vm_state", "debug"),
        );
        assert!(unstamped.validate().is_err());
    }

    #[test]
    fn test_equality_needs_same_kind() {
        let a = Message::new(MessageKind::InlineCommand, Record::new().with("command", "x"));
        let b = Message::new(MessageKind::ToplevelCommand, Record::new().with("command", "x"));
        assert_ne!(a, b);
        assert_eq!(a, Message::inline_command("x"));
        assert_eq!(a.to_string(), "InlineCommand(command='x')");
    }

    #[test]
    fn test_equal_messages_hash_equal() {
        use std::collections::hash_map::DefaultHasher;

        fn hash_of(message: &Message) -> u64 {
            let mut hasher = DefaultHasher::new();
            message.hash(&mut hasher);
            hasher.finish()
        }

        let a = Message::inline_command("get_value").with("id", 1).with("frame", 2);
        let b = Message::inline_command("get_value").with("frame", 2).with("id", 1);
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));

        let c = Message::new(MessageKind::ToplevelCommand, a.record().clone());
        assert_ne!(hash_of(&a), hash_of(&c));
    }
}
