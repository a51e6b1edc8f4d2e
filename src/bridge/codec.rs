//! Length-prefixed JSON framing used by browser native-messaging hosts: a
//! little-endian `u32` byte count followed by that many bytes of UTF-8 JSON.

use std::io::ErrorKind;

use anyhow::{bail, Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest inbound frame accepted.
pub const MAX_MESSAGE_BYTES: u32 = 1024 * 1024;

/// Read one frame. `Ok(None)` means the peer closed the stream between frames.
pub async fn read_message<R, T>(reader: &mut R) -> Result<Option<T>>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let length = match reader.read_u32_le().await {
        Ok(length) => length,
        Err(err) if err.kind() == ErrorKind::UnexpectedEof => return Ok(None),
        Err(err) => return Err(err).context("failed to read message length"),
    };

    if length > MAX_MESSAGE_BYTES {
        bail!("message of {length} bytes exceeds the {MAX_MESSAGE_BYTES} byte limit");
    }

    let mut payload = vec![0u8; length as usize];
    reader
        .read_exact(&mut payload)
        .await
        .context("stream closed mid-message")?;

    let message = serde_json::from_slice(&payload).context("invalid message payload")?;
    Ok(Some(message))
}

pub async fn write_message<W, T>(writer: &mut W, message: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize + ?Sized,
{
    let payload = serde_json::to_vec(message).context("failed to encode message")?;
    let length = u32::try_from(payload.len()).context("outbound message too large")?;

    writer.write_u32_le(length).await?;
    writer.write_all(&payload).await?;
    writer.flush().await.context("failed to flush message")
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;

    #[tokio::test]
    async fn frames_are_length_prefixed_little_endian() {
        let mut buffer = Vec::new();
        write_message(&mut buffer, &json!({"type": "tick"})).await.unwrap();

        let body = br#"{"type":"tick"}"#;
        assert_eq!(&buffer[..4], &(body.len() as u32).to_le_bytes());
        assert_eq!(&buffer[4..], body);
    }

    #[tokio::test]
    async fn reads_consecutive_frames_then_eof() {
        let mut buffer = Vec::new();
        write_message(&mut buffer, &json!({"n": 1})).await.unwrap();
        write_message(&mut buffer, &json!({"n": 2})).await.unwrap();

        let mut reader = buffer.as_slice();
        let first: Option<Value> = read_message(&mut reader).await.unwrap();
        let second: Option<Value> = read_message(&mut reader).await.unwrap();
        let end: Option<Value> = read_message(&mut reader).await.unwrap();

        assert_eq!(first, Some(json!({"n": 1})));
        assert_eq!(second, Some(json!({"n": 2})));
        assert_eq!(end, None);
    }

    #[tokio::test]
    async fn oversized_and_truncated_frames_are_errors() {
        let oversized = (MAX_MESSAGE_BYTES + 1).to_le_bytes();
        let result: Result<Option<Value>> = read_message(&mut oversized.as_slice()).await;
        assert!(result.is_err());

        let mut truncated = 10u32.to_le_bytes().to_vec();
        truncated.extend_from_slice(b"{\"a\"");
        let result: Result<Option<Value>> = read_message(&mut truncated.as_slice()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn works_over_a_duplex_pipe() {
        let (mut client, mut server) = tokio::io::duplex(64);
        let payload = json!({"type": "navigate", "url": "https://youtu.be/abc"});

        let writer = tokio::spawn(async move {
            write_message(&mut client, &payload).await.unwrap();
        });
        let received: Option<Value> = read_message(&mut server).await.unwrap();
        writer.await.unwrap();

        assert_eq!(received.unwrap()["url"], "https://youtu.be/abc");
    }
}
