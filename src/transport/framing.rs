//! Length-prefixed JSON framing.
//!
//! Every message on the wire is a 4-byte **little-endian** `u32` length
//! prefix followed by that many bytes of UTF-8 JSON payload.
//!
//! ```text
//! +----------------+------------------+
//! | Length (4B LE) | JSON Payload     |
//! +----------------+------------------+
//! ```

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Error, Result};
use crate::transport::protocol::MAX_MESSAGE_SIZE;

/// Reads one message.
///
/// Returns `Ok(None)` if the stream ends before any byte of the length
/// prefix (clean disconnect).
pub async fn read_message<T, R>(reader: &mut R) -> Result<Option<T>>
where
    T: DeserializeOwned,
    R: AsyncRead + Unpin,
{
    let len = match reader.read_u32_le().await {
        Ok(len) => len as usize,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    if len > MAX_MESSAGE_SIZE {
        return Err(too_large(len));
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;

    serde_json::from_slice(&payload)
        .map(Some)
        .map_err(|e| Error::Deserialize(e.to_string()))
}

/// Writes one message and flushes.
pub async fn write_message<T, W>(writer: &mut W, msg: &T) -> Result<()>
where
    T: Serialize,
    W: AsyncWrite + Unpin,
{
    let payload = serde_json::to_vec(msg).map_err(|e| Error::Serialize(e.to_string()))?;
    if payload.len() > MAX_MESSAGE_SIZE {
        return Err(too_large(payload.len()));
    }

    // MAX_MESSAGE_SIZE fits in u32.
    let len = u32::try_from(payload.len()).map_err(|_| too_large(payload.len()))?;
    writer.write_u32_le(len).await?;
    writer.write_all(&payload).await?;
    writer.flush().await?;
    Ok(())
}

fn too_large(size: usize) -> Error {
    Error::Transport(format!(
        "frame of {size} bytes exceeds the {MAX_MESSAGE_SIZE} byte limit"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::protocol::{Request, Response};
    use serde_json::json;
    use std::io::Cursor;

    #[tokio::test]
    async fn messages_stream_in_order() {
        let mut buf = Vec::new();
        write_message(&mut buf, &Request::Info).await.unwrap();
        write_message(&mut buf, &Response::Result { data: json!("ready") })
            .await
            .unwrap();

        let mut cursor = Cursor::new(buf);
        let first: Request = read_message(&mut cursor).await.unwrap().unwrap();
        assert!(matches!(first, Request::Info));
        let second: Response = read_message(&mut cursor).await.unwrap().unwrap();
        assert!(matches!(second, Response::Result { data } if data == json!("ready")));

        let end: Option<Request> = read_message(&mut cursor).await.unwrap();
        assert!(end.is_none());
    }

    #[tokio::test]
    async fn length_prefix_is_little_endian() {
        let mut buf = Vec::new();
        write_message(&mut buf, &Request::Info).await.unwrap();
        let len = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
        assert_eq!(len, buf.len() - 4);
    }

    #[tokio::test]
    async fn oversize_prefix_is_rejected() {
        let fake = (MAX_MESSAGE_SIZE as u32 + 1).to_le_bytes();
        let mut cursor = Cursor::new(fake.to_vec());
        let err = read_message::<Request, _>(&mut cursor).await.unwrap_err();
        assert!(matches!(err, Error::Transport(m) if m.contains("exceeds")));
    }

    #[tokio::test]
    async fn truncated_payload_is_a_transport_error() {
        let mut data = 10u32.to_le_bytes().to_vec();
        data.extend_from_slice(b"{\"ty");
        let mut cursor = Cursor::new(data);
        let err = read_message::<Request, _>(&mut cursor).await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }

    #[tokio::test]
    async fn garbage_is_a_deserialize_error() {
        let garbage = b"not json at all";
        let mut data = (garbage.len() as u32).to_le_bytes().to_vec();
        data.extend_from_slice(garbage);
        let mut cursor = Cursor::new(data);
        let err = read_message::<Request, _>(&mut cursor).await.unwrap_err();
        assert!(matches!(err, Error::Deserialize(_)));
    }
}
