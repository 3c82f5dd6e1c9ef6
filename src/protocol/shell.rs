//! The interactive command line: `%` magic commands, blank lines and raw
//! statements, each turned into a `ToplevelCommand`.

use super::error::ShellCommandError;
use super::message::Message;
use super::value::Value;
use tracing::debug;

/// Turns one line typed at the shell prompt into a command message.
pub fn parse_shell_command(line: &str) -> Result<Message, ShellCommandError> {
    if line.starts_with('%') {
        let parts = split_shell_words(line.trim())?;
        let Some(command) = parts.first().and_then(|word| word.strip_prefix('%')) else {
            return Err(ShellCommandError::Syntax(format!("empty command in '{line}'")));
        };
        debug!(command, args = parts.len() - 1, "magic command");

        match command {
            "Reset" => {
                if parts.len() != 1 {
                    return Err(ShellCommandError::Syntax(format!(
                        "Reset takes no arguments: '{line}'"
                    )));
                }
                Ok(Message::toplevel_command("Reset"))
            }
            "cd" => {
                let path = match parts.len() {
                    1 => {
                        return Err(ShellCommandError::Syntax(format!(
                            "Directory missing in '{line}'"
                        )))
                    }
                    2 => unquote_path(&parts[1]),
                    // unquoted path with spaces: take the rest of the line
                    _ => unquote_path(rest_after_first_word(line.trim())),
                };
                Ok(Message::toplevel_command("cd").with("path", path))
            }
            _ if command.eq_ignore_ascii_case("run") || command.eq_ignore_ascii_case("debug") => {
                if parts.len() < 2 {
                    return Err(ShellCommandError::Syntax(format!(
                        "Filename missing in '{line}'"
                    )));
                }
                Ok(Message::toplevel_command(command)
                    .with("filename", unquote_path(&parts[1]))
                    .with("args", Value::str_list(parts[2..].iter().cloned())))
            }
            _ => Err(ShellCommandError::UnknownCommand(command.to_string())),
        }
    } else if line.trim().is_empty() {
        Ok(Message::toplevel_command("pass"))
    } else {
        Ok(Message::toplevel_command("python").with("cmd_line", line))
    }
}

fn rest_after_first_word(line: &str) -> &str {
    line.split_once(char::is_whitespace)
        .map_or("", |(_, rest)| rest.trim_start())
}

/// Splits `line` at whitespace, keeping quoted sections together.
///
/// Quote characters stay in the words and there are no escapes. A quote that
/// opens a word runs to its closing quote and ends the word there; a quote in
/// the middle of a word is an ordinary character.
pub fn split_shell_words(line: &str) -> Result<Vec<String>, ShellCommandError> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars();

    while let Some(ch) = chars.next() {
        if ch.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }

        if current.is_empty() && (ch == '"' || ch == '\'') {
            current.push(ch);
            loop {
                match chars.next() {
                    Some(c) => {
                        current.push(c);
                        if c == ch {
                            break;
                        }
                    }
                    None => {
                        return Err(ShellCommandError::Syntax(format!(
                            "No closing quotation in '{line}'"
                        )))
                    }
                }
            }
            words.push(std::mem::take(&mut current));
            continue;
        }

        current.push(ch);
    }

    if !current.is_empty() {
        words.push(current);
    }
    Ok(words)
}

/// Removes a single layer of surrounding `'` quotes, then of `"` quotes, and
/// turns doubled backslashes into single ones.
pub fn unquote_path(path: &str) -> String {
    let path = strip_one(path, '\'');
    let path = strip_one(path, '"');
    path.replace("\\\\", "\\")
}

fn strip_one(s: &str, quote: char) -> &str {
    let s = s.strip_prefix(quote).unwrap_or(s);
    s.strip_suffix(quote).unwrap_or(s)
}

/// Quotes `path` so a POSIX shell reads it back as a single word.
pub fn quote_path_for_shell(path: &str) -> Result<String, ShellCommandError> {
    shlex::try_quote(path)
        .map(|quoted| quoted.into_owned())
        .map_err(|err| ShellCommandError::Syntax(format!("cannot quote {path:?}: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::MessageKind;

    #[test]
    fn test_split_keeps_quotes() {
        assert_eq!(
            split_shell_words(r#"%cd "my folder" 'x y' a"b"#).unwrap(),
            [r#"%cd"#, r#""my folder""#, "'x y'", r#"a"b"#]
        );
        assert_eq!(split_shell_words(r#""ab"cd"#).unwrap(), [r#""ab""#, "cd"]);
        assert!(matches!(
            split_shell_words("%cd \"open"),
            Err(ShellCommandError::Syntax(_))
        ));
    }

    #[test]
    fn test_cd() {
        let msg = parse_shell_command(r#"%cd "my folder""#).unwrap();
        assert_eq!(msg.kind, MessageKind::ToplevelCommand);
        assert_eq!(msg.command(), Some("cd"));
        assert_eq!(msg.get_str("path"), Some("my folder"));

        let msg = parse_shell_command("%cd my folder").unwrap();
        assert_eq!(msg.get_str("path"), Some("my folder"));

        let msg = parse_shell_command(r"%cd C:\\Users\\me").unwrap();
        assert_eq!(msg.get_str("path"), Some(r"C:\Users\me"));

        assert!(matches!(
            parse_shell_command("%cd"),
            Err(ShellCommandError::Syntax(_))
        ));
    }

    #[test]
    fn test_run_and_debug() {
        let msg = parse_shell_command("%run foo.py 1 2").unwrap();
        assert_eq!(msg.command(), Some("run"));
        assert_eq!(msg.get_str("filename"), Some("foo.py"));
        assert_eq!(msg.get("args"), Some(&Value::str_list(["1", "2"])));

        let msg = parse_shell_command("%Debug 'my script.py'").unwrap();
        assert_eq!(msg.command(), Some("Debug"));
        assert_eq!(msg.get_str("filename"), Some("my script.py"));
        assert_eq!(msg.get("args"), Some(&Value::List(vec![])));

        assert!(matches!(
            parse_shell_command("%run"),
            Err(ShellCommandError::Syntax(_))
        ));
    }

    #[test]
    fn test_reset_and_unknown() {
        assert_eq!(
            parse_shell_command("%Reset").unwrap(),
            Message::toplevel_command("Reset")
        );
        assert!(matches!(
            parse_shell_command("%Reset extra"),
            Err(ShellCommandError::Syntax(_))
        ));
        assert_eq!(
            parse_shell_command("%frobnicate"),
            Err(ShellCommandError::UnknownCommand("frobnicate".into()))
        );
    }

    #[test]
    fn test_blank_and_python_lines() {
        assert_eq!(parse_shell_command("   ").unwrap(), Message::toplevel_command("pass"));
        let msg = parse_shell_command("print(1)  ").unwrap();
        assert_eq!(msg.command(), Some("python"));
        assert_eq!(msg.get_str("cmd_line"), Some("print(1)  "));
    }

    #[test]
    fn test_unquote_and_quote() {
        assert_eq!(unquote_path("'a b'"), "a b");
        assert_eq!(unquote_path("\"a b\""), "a b");
        assert_eq!(unquote_path("''x''"), "'x'");
        assert_eq!(unquote_path(r"a\\b"), r"a\b");

        let plain = quote_path_for_shell("plain.py").unwrap();
        assert_eq!(shlex::split(&plain), Some(vec!["plain.py".to_string()]));
        let quoted = quote_path_for_shell("my file's.py").unwrap();
        assert_eq!(shlex::split(&quoted), Some(vec!["my file's.py".to_string()]));
        assert!(quote_path_for_shell("nul\0byte").is_err());
    }
}
