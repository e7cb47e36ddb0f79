use std::io;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

const LINE_ENDINGS: &[char] = &['\n', '\r'];

/// Sender identity carried by server-generated announcements.
pub const SYSTEM_SENDER: &str = "system";

/// Discriminates chat traffic from join/leave announcements.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Kind {
    #[serde(rename = "msg")]
    Message,
    #[serde(rename = "system")]
    System,
}

/// One chat message or system notice as it travels over the wire.
///
/// Whatever a client puts in `from`, `timestamp`, and `kind` is overwritten
/// by the server on receipt; only `text` survives as submitted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Envelope {
    #[serde(default)]
    pub from: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: Kind,
}

impl Envelope {
    /// Chat message as a client submits it. The `from` field is left empty
    /// and the timestamp is provisional until the server re-stamps both.
    pub fn message(text: impl Into<String>) -> Self {
        Self {
            from: String::new(),
            text: text.into(),
            timestamp: Utc::now(),
            kind: Kind::Message,
        }
    }

    /// Server-generated join/leave announcement.
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            from: SYSTEM_SENDER.to_string(),
            text: text.into(),
            timestamp: Utc::now(),
            kind: Kind::System,
        }
    }
}

/// Reads the next envelope, skipping blank lines. Returns `None` once the
/// peer closes the connection; a line that is not a valid envelope is an
/// `InvalidData` error.
pub async fn read_envelope<R>(reader: &mut R) -> io::Result<Option<Envelope>>
where
    R: AsyncBufRead + Unpin,
{
    // One JSON envelope per line keeps interoperability with netcat-style tools.
    let mut line = String::new();
    loop {
        line.clear();
        let bytes = reader.read_line(&mut line).await?;
        if bytes == 0 {
            return Ok(None);
        }

        let trimmed = line.trim_end_matches(LINE_ENDINGS);
        if trimmed.is_empty() {
            continue;
        }

        let envelope = serde_json::from_str(trimmed).map_err(invalid_data)?;
        return Ok(Some(envelope));
    }
}

/// Writes one envelope followed by a newline delimiter and flushes so peers
/// see it immediately.
pub async fn write_envelope<W>(writer: &mut W, envelope: &Envelope) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut encoded = serde_json::to_vec(envelope).map_err(invalid_data)?;
    encoded.push(b'\n');
    writer.write_all(&encoded).await?;
    writer.flush().await?;
    Ok(())
}

fn invalid_data(err: serde_json::Error) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, err)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn wire_format_uses_short_field_names() {
        let envelope = Envelope {
            from: "1".to_string(),
            text: "hello".to_string(),
            timestamp: Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap(),
            kind: Kind::Message,
        };

        let json = serde_json::to_string(&envelope).expect("serialize envelope");

        assert!(json.contains(r#""from":"1""#));
        assert!(json.contains(r#""text":"hello""#));
        assert!(json.contains(r#""timestamp":"2023-01-01T00:00:00Z""#));
        assert!(json.contains(r#""type":"msg""#));
    }

    #[test]
    fn system_envelope_is_tagged_and_attributed() {
        let json = serde_json::to_string(&Envelope::system("User [1] joined"))
            .expect("serialize envelope");

        assert!(json.contains(r#""type":"system""#));
        assert!(json.contains(r#""from":"system""#));
    }

    #[tokio::test]
    async fn roundtrip_envelope() {
        let (mut writer, reader) = tokio::io::duplex(1024);
        let mut reader = tokio::io::BufReader::new(reader);
        let envelope = Envelope::message("hello");

        write_envelope(&mut writer, &envelope)
            .await
            .expect("write envelope");
        let parsed = read_envelope(&mut reader)
            .await
            .expect("read envelope")
            .expect("expected envelope");

        assert_eq!(envelope, parsed);
    }

    #[tokio::test]
    async fn blank_lines_are_skipped() {
        let (mut writer, reader) = tokio::io::duplex(1024);
        let mut reader = tokio::io::BufReader::new(reader);

        writer.write_all(b"\n\r\n").await.expect("write padding");
        write_envelope(&mut writer, &Envelope::message("after blanks"))
            .await
            .expect("write envelope");

        let parsed = read_envelope(&mut reader)
            .await
            .expect("read envelope")
            .expect("expected envelope");
        assert_eq!(parsed.text, "after blanks");
    }

    #[tokio::test]
    async fn malformed_line_is_invalid_data() {
        let (mut writer, reader) = tokio::io::duplex(1024);
        let mut reader = tokio::io::BufReader::new(reader);

        writer.write_all(b"not json\n").await.expect("write junk");

        let err = read_envelope(&mut reader)
            .await
            .expect_err("junk should not decode");
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[tokio::test]
    async fn closed_connection_reads_none() {
        let (writer, reader) = tokio::io::duplex(1024);
        let mut reader = tokio::io::BufReader::new(reader);
        drop(writer);

        let parsed = read_envelope(&mut reader).await.expect("read envelope");
        assert!(parsed.is_none());
    }
}
