//! Text frames of the messaging protocol spoken over `/ws`.
//!
//! A frame is a command line, header lines, a blank line, a body and a
//! terminating NUL:
//!
//! ```text
//! SEND
//! destination:/app/activities
//! content-type:application/json
//!
//! {"action":"login","details":"from web"}\0
//! ```
//!
//! Header values are escaped (`\\`, `\n`, `\r`, `\c`) on every frame except
//! `CONNECT` and `CONNECTED`. Lines may end in `\n` or `\r\n`, and bare end of
//! line octets before a frame are heart-beats.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Well-known header names.
pub mod headers {
    pub const AUTHORIZATION: &str = "Authorization";
    pub const ACCEPT_VERSION: &str = "accept-version";
    pub const CONTENT_LENGTH: &str = "content-length";
    pub const CONTENT_TYPE: &str = "content-type";
    pub const DESTINATION: &str = "destination";
    pub const HEART_BEAT: &str = "heart-beat";
    pub const ID: &str = "id";
    pub const MESSAGE: &str = "message";
    pub const MESSAGE_ID: &str = "message-id";
    pub const RECEIPT: &str = "receipt";
    pub const RECEIPT_ID: &str = "receipt-id";
    pub const SUBSCRIPTION: &str = "subscription";
    pub const USER_NAME: &str = "user-name";
    pub const VERSION: &str = "version";
}

/// Protocol version negotiated on `CONNECTED`.
pub const STOMP_VERSION: &str = "1.2";

/// Frame commands, client and server side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Connect,
    Stomp,
    Connected,
    Send,
    Subscribe,
    Unsubscribe,
    Ack,
    Nack,
    Begin,
    Commit,
    Abort,
    Disconnect,
    Message,
    Receipt,
    Error,
}

impl Command {
    /// Wire spelling of the command.
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Connect => "CONNECT",
            Command::Stomp => "STOMP",
            Command::Connected => "CONNECTED",
            Command::Send => "SEND",
            Command::Subscribe => "SUBSCRIBE",
            Command::Unsubscribe => "UNSUBSCRIBE",
            Command::Ack => "ACK",
            Command::Nack => "NACK",
            Command::Begin => "BEGIN",
            Command::Commit => "COMMIT",
            Command::Abort => "ABORT",
            Command::Disconnect => "DISCONNECT",
            Command::Message => "MESSAGE",
            Command::Receipt => "RECEIPT",
            Command::Error => "ERROR",
        }
    }

    /// Whether this command opens a logical session.
    pub fn is_connect(&self) -> bool {
        matches!(self, Command::Connect | Command::Stomp)
    }

    fn escapes_headers(&self) -> bool {
        !matches!(self, Command::Connect | Command::Connected)
    }
}

impl FromStr for Command {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let command = match s {
            "CONNECT" => Command::Connect,
            "STOMP" => Command::Stomp,
            "CONNECTED" => Command::Connected,
            "SEND" => Command::Send,
            "SUBSCRIBE" => Command::Subscribe,
            "UNSUBSCRIBE" => Command::Unsubscribe,
            "ACK" => Command::Ack,
            "NACK" => Command::Nack,
            "BEGIN" => Command::Begin,
            "COMMIT" => Command::Commit,
            "ABORT" => Command::Abort,
            "DISCONNECT" => Command::Disconnect,
            "MESSAGE" => Command::Message,
            "RECEIPT" => Command::Receipt,
            "ERROR" => Command::Error,
            other => return Err(Error::UnknownCommand(other.to_string())),
        };
        Ok(command)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single protocol frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame command.
    pub command: Command,
    /// Headers in wire order. Repeated names keep the first value on lookup.
    pub headers: Vec<(String, String)>,
    /// Frame body.
    pub body: String,
}

impl Frame {
    /// Create an empty frame.
    pub fn new(command: Command) -> Self {
        Self {
            command,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    /// Append a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the body.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// First value of the named header.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// `CONNECTED` reply for an admitted logical session.
    pub fn connected(user_name: &str) -> Self {
        Frame::new(Command::Connected)
            .with_header(headers::VERSION, STOMP_VERSION)
            .with_header(headers::HEART_BEAT, "0,0")
            .with_header(headers::USER_NAME, user_name)
    }

    /// `MESSAGE` delivered to a subscription.
    pub fn message(
        destination: &str,
        subscription: &str,
        message_id: &str,
        body: impl Into<String>,
    ) -> Self {
        Frame::new(Command::Message)
            .with_header(headers::DESTINATION, destination)
            .with_header(headers::SUBSCRIPTION, subscription)
            .with_header(headers::MESSAGE_ID, message_id)
            .with_header(headers::CONTENT_TYPE, "application/json")
            .with_body(body)
    }

    /// `RECEIPT` acknowledging a client frame.
    pub fn receipt(receipt_id: &str) -> Self {
        Frame::new(Command::Receipt).with_header(headers::RECEIPT_ID, receipt_id)
    }

    /// `ERROR` with a short message header and a longer body.
    pub fn error(message: &str, details: impl Into<String>) -> Self {
        Frame::new(Command::Error)
            .with_header(headers::MESSAGE, message)
            .with_header(headers::CONTENT_TYPE, "text/plain")
            .with_body(details)
    }

    /// Encode the frame, including the NUL terminator.
    pub fn encode(&self) -> String {
        let escape = self.command.escapes_headers();
        let mut out = String::with_capacity(32 + self.body.len());
        out.push_str(self.command.as_str());
        out.push('\n');
        for (name, value) in &self.headers {
            if escape {
                push_escaped(&mut out, name);
                out.push(':');
                push_escaped(&mut out, value);
            } else {
                out.push_str(name);
                out.push(':');
                out.push_str(value);
            }
            out.push('\n');
        }
        out.push('\n');
        out.push_str(&self.body);
        out.push('\0');
        out
    }

    /// Decode one frame from a text message.
    ///
    /// Returns `Ok(None)` when the message holds only heart-beats.
    pub fn decode(input: &str) -> Result<Option<Frame>, Error> {
        let input = input.trim_start_matches(['\r', '\n']);
        if input.is_empty() {
            return Ok(None);
        }

        let (command_line, mut rest) = next_line(input).ok_or(Error::Truncated)?;
        let command: Command = command_line.parse()?;
        let escape = command.escapes_headers();

        let mut parsed = Vec::new();
        loop {
            let (line, remaining) = next_line(rest).ok_or(Error::Truncated)?;
            rest = remaining;
            if line.is_empty() {
                break;
            }
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| Error::MalformedHeader(line.to_string()))?;
            if escape {
                parsed.push((unescape(name)?, unescape(value)?));
            } else {
                parsed.push((name.to_string(), value.to_string()));
            }
        }

        let content_length = parsed
            .iter()
            .find(|(name, _)| name == headers::CONTENT_LENGTH)
            .map(|(_, value)| value.clone());

        let body = match content_length {
            Some(raw) => {
                let len: usize = raw
                    .trim()
                    .parse()
                    .map_err(|_| Error::InvalidContentLength(raw.clone()))?;
                let body = rest
                    .get(..len)
                    .ok_or_else(|| Error::InvalidContentLength(raw.clone()))?;
                if !rest[len..].starts_with('\0') {
                    return Err(Error::MissingTerminator);
                }
                body
            }
            None => {
                let end = rest.find('\0').ok_or(Error::MissingTerminator)?;
                &rest[..end]
            }
        };

        Ok(Some(Frame {
            command,
            headers: parsed,
            body: body.to_string(),
        }))
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.command)?;
        if let Some(destination) = self.header(headers::DESTINATION) {
            write!(f, " {}", destination)?;
        }
        Ok(())
    }
}

/// Split off one line, accepting `\n` or `\r\n`.
fn next_line(input: &str) -> Option<(&str, &str)> {
    let idx = input.find('\n')?;
    let line = &input[..idx];
    let line = line.strip_suffix('\r').unwrap_or(line);
    Some((line, &input[idx + 1..]))
}

fn push_escaped(out: &mut String, raw: &str) {
    for ch in raw.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ':' => out.push_str("\\c"),
            other => out.push(other),
        }
    }
}

fn unescape(raw: &str) -> Result<String, Error> {
    if !raw.contains('\\') {
        return Ok(raw.to_string());
    }
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('c') => out.push(':'),
            Some(other) => return Err(Error::InvalidEscape(other)),
            None => return Err(Error::InvalidEscape(' ')),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_connect_with_authorization() {
        let raw = "CONNECT\naccept-version:1.2\nAuthorization:Bearer abc.def.ghi\n\n\0";
        let frame = Frame::decode(raw).unwrap().unwrap();

        assert_eq!(frame.command, Command::Connect);
        assert!(frame.command.is_connect());
        assert_eq!(frame.header("Authorization"), Some("Bearer abc.def.ghi"));
        assert_eq!(frame.header("accept-version"), Some("1.2"));
        assert!(frame.body.is_empty());
    }

    #[test]
    fn test_decode_crlf_and_heartbeats() {
        let raw = "\r\n\nSEND\r\ndestination:/app/activities\r\n\r\n{\"a\":1}\0\n";
        let frame = Frame::decode(raw).unwrap().unwrap();

        assert_eq!(frame.command, Command::Send);
        assert_eq!(frame.header("destination"), Some("/app/activities"));
        assert_eq!(frame.body, "{\"a\":1}");
    }

    #[test]
    fn test_heartbeat_only() {
        assert_eq!(Frame::decode("\n").unwrap(), None);
        assert_eq!(Frame::decode("\r\n\r\n").unwrap(), None);
    }

    #[test]
    fn test_repeated_header_first_wins() {
        let raw = "SEND\ndestination:/a\ndestination:/b\n\n\0";
        let frame = Frame::decode(raw).unwrap().unwrap();
        assert_eq!(frame.header("destination"), Some("/a"));
    }

    #[test]
    fn test_header_escaping() {
        let frame = Frame::new(Command::Message).with_header("note", "a:b\nc\\d");
        let encoded = frame.encode();
        assert!(encoded.contains("note:a\\cb\\nc\\\\d\n"));

        let decoded = Frame::decode(&encoded).unwrap().unwrap();
        assert_eq!(decoded.header("note"), Some("a:b\nc\\d"));
    }

    #[test]
    fn test_connect_headers_are_not_unescaped() {
        let raw = "CONNECT\nlogin:a\\cb\n\n\0";
        let frame = Frame::decode(raw).unwrap().unwrap();
        assert_eq!(frame.header("login"), Some("a\\cb"));
    }

    #[test]
    fn test_content_length_body() {
        let raw = "SEND\ncontent-length:3\n\na\0b\0";
        let frame = Frame::decode(raw).unwrap().unwrap();
        assert_eq!(frame.body, "a\0b");
    }

    #[test]
    fn test_decode_errors() {
        assert_eq!(
            Frame::decode("HELLO\n\n\0"),
            Err(Error::UnknownCommand("HELLO".to_string()))
        );
        assert_eq!(
            Frame::decode("SEND\nnocolon\n\n\0"),
            Err(Error::MalformedHeader("nocolon".to_string()))
        );
        assert_eq!(Frame::decode("SEND\n\nbody"), Err(Error::MissingTerminator));
        assert_eq!(Frame::decode("SEND\nx:y\n"), Err(Error::Truncated));
        assert_eq!(
            Frame::decode("SEND\nx:\\t\n\n\0"),
            Err(Error::InvalidEscape('t'))
        );
        assert!(matches!(
            Frame::decode("SEND\ncontent-length:99\n\nab\0"),
            Err(Error::InvalidContentLength(_))
        ));
    }

    #[test]
    fn test_connected_frame() {
        let encoded = Frame::connected("alice").encode();
        assert!(encoded.starts_with("CONNECTED\nversion:1.2\n"));
        assert!(encoded.contains("user-name:alice\n"));
        assert!(encoded.ends_with("\n\n\0"));
    }

    #[test]
    fn test_display() {
        let frame = Frame::new(Command::Subscribe).with_header("destination", "/topic/activities");
        assert_eq!(frame.to_string(), "SUBSCRIBE /topic/activities");
    }
}
