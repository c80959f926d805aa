use serde::{Deserialize, Deserializer, Serialize};

/// One JSON message on the cloud channel.
///
/// ```
/// use followsync::ChannelMessage;
///
/// let set = ChannelMessage::parse(r#"{"method":"set","name":"☁request","value":42}"#);
/// assert_eq!(
///     set,
///     ChannelMessage::SlotSet {
///         name: "☁request".into(),
///         value: "42".into()
///     }
/// );
/// assert_eq!(ChannelMessage::parse("not json"), ChannelMessage::Unknown);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum ChannelMessage {
    Handshake {
        user: String,
        project_id: String,
    },
    #[serde(rename = "ping")]
    Heartbeat,
    #[serde(rename = "set")]
    SlotSet {
        name: String,
        #[serde(deserialize_with = "text_or_number")]
        value: String,
    },
    /// Any other method, or anything that is not a well-formed message.
    #[serde(other)]
    Unknown,
}

impl ChannelMessage {
    pub fn set(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::SlotSet {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Parses one message. Malformed input reads as [`ChannelMessage::Unknown`].
    pub fn parse(line: &str) -> Self {
        serde_json::from_str(line).unwrap_or(Self::Unknown)
    }

    /// Parses every message in a text frame. The server may batch several
    /// newline-separated messages into one frame.
    pub fn parse_frame(text: &str) -> impl Iterator<Item = Self> + '_ {
        text.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(Self::parse)
    }

    /// Serializes the message for a text frame.
    ///
    /// # Errors
    ///
    /// Propagates the [`serde_json::Error`] from serialization.
    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// Slot values arrive as either JSON strings or JSON numbers.
fn text_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(text) => text,
        Raw::Number(number) => number.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outbound_messages_match_the_wire_format() {
        let handshake = ChannelMessage::Handshake {
            user: "FollowSync123".into(),
            project_id: "1279558192".into(),
        };
        assert_eq!(
            handshake.to_text().unwrap(),
            r#"{"method":"handshake","user":"FollowSync123","project_id":"1279558192"}"#
        );
        assert_eq!(
            ChannelMessage::Heartbeat.to_text().unwrap(),
            r#"{"method":"ping"}"#
        );
        assert_eq!(
            ChannelMessage::set("☁return1", "0").to_text().unwrap(),
            r#"{"method":"set","name":"☁return1","value":"0"}"#
        );
    }

    #[test]
    fn set_values_accept_strings_and_numbers() {
        assert_eq!(
            ChannelMessage::parse(r#"{"method":"set","name":"x","value":"0123"}"#),
            ChannelMessage::set("x", "0123")
        );
        assert_eq!(
            ChannelMessage::parse(r#"{"method":"set","name":"x","value":214101127711240}"#),
            ChannelMessage::set("x", "214101127711240")
        );
    }

    #[test]
    fn extra_fields_are_ignored() {
        assert_eq!(
            ChannelMessage::parse(r#"{"method":"set","project_id":"1","name":"x","value":"1"}"#),
            ChannelMessage::set("x", "1")
        );
    }

    #[test]
    fn unrecognized_input_is_unknown() {
        for line in [
            "",
            "{",
            "[]",
            r#"{"name":"x","value":"1"}"#,
            r#"{"method":"rename","name":"x","new_name":"y"}"#,
            r#"{"method":"set","name":"x"}"#,
            r#"{"method":"set","name":"x","value":[1]}"#,
        ] {
            assert_eq!(ChannelMessage::parse(line), ChannelMessage::Unknown, "{line}");
        }
    }

    #[test]
    fn frames_split_on_newlines() {
        let frame = concat!(
            r#"{"method":"set","name":"a","value":"1"}"#,
            "\n",
            "garbage\n",
            "\n",
            r#"{"method":"set","name":"b","value":2}"#,
            "\n",
        );
        let messages: Vec<_> = ChannelMessage::parse_frame(frame).collect();
        assert_eq!(
            messages,
            [
                ChannelMessage::set("a", "1"),
                ChannelMessage::Unknown,
                ChannelMessage::set("b", "2"),
            ]
        );
    }
}
