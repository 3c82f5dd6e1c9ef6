//! Messages exchanged between the front end and the back end, and their
//! wire form.

mod codec;
mod error;
mod message;
mod record;
mod shell;
mod value;

pub use codec::{parse_message, parse_value, serialize_message};
pub use error::{CodecError, ShellCommandError};
pub use message::{Message, MessageKind};
pub use record::Record;
pub use shell::{parse_shell_command, quote_path_for_shell, split_shell_words, unquote_path};
pub use value::Value;
