//! Length-prefixed message framing.
//!
//! A frame is a little-endian `u32` body length followed by the canonical
//! encoding of one [`Message`].

use ripple_core::encoding::{CanonicalDecode, CanonicalEncode};
use ripple_core::MAX_FRAME_SIZE;
use ripple_proto::Message;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::TransportError;

/// Writes one message as a frame and flushes.
pub async fn write_frame<W>(io: &mut W, message: &Message) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
{
    let body = message.to_bytes();
    if body.len() > MAX_FRAME_SIZE {
        return Err(TransportError::FrameTooLarge(body.len()));
    }
    io.write_u32_le(body.len() as u32).await?;
    io.write_all(&body).await?;
    io.flush().await?;
    Ok(())
}

/// Reads one frame and decodes its message.
pub async fn read_frame<R>(io: &mut R) -> Result<Message, TransportError>
where
    R: AsyncRead + Unpin,
{
    let len = io.read_u32_le().await? as usize;
    if len > MAX_FRAME_SIZE {
        return Err(TransportError::FrameTooLarge(len));
    }
    let mut body = vec![0u8; len];
    io.read_exact(&mut body).await?;
    Ok(Message::from_bytes(&body)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use ripple_core::{History, PeerAddr};
    use ripple_proto::MessagePayload;

    #[tokio::test]
    async fn test_frame_roundtrip_over_duplex() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        let message = Message::new(
            11,
            MessagePayload::Query {
                name: "a.txt".to_string(),
                history: History::from(vec![PeerAddr::new("127.0.0.1:1").unwrap()]),
            },
        );

        write_frame(&mut client, &message).await.unwrap();
        let received = read_frame(&mut server).await.unwrap();
        assert_eq!(received, message);
    }

    #[tokio::test]
    async fn test_oversized_length_rejected() {
        let (mut client, mut server) = tokio::io::duplex(64);
        client
            .write_u32_le((MAX_FRAME_SIZE + 1) as u32)
            .await
            .unwrap();

        assert!(matches!(
            read_frame(&mut server).await,
            Err(TransportError::FrameTooLarge(_))
        ));
    }

    #[tokio::test]
    async fn test_oversized_message_is_refused_before_writing() {
        let (mut client, _server) = tokio::io::duplex(64);
        let message = Message::new(
            1,
            MessagePayload::QueryResponse {
                content: Bytes::from(vec![0u8; MAX_FRAME_SIZE]),
            },
        );

        assert!(matches!(
            write_frame(&mut client, &message).await,
            Err(TransportError::FrameTooLarge(size)) if size > MAX_FRAME_SIZE
        ));
    }

    #[tokio::test]
    async fn test_garbage_body_is_decode_error() {
        let (mut client, mut server) = tokio::io::duplex(64);
        client.write_u32_le(3).await.unwrap();
        client.write_all(&[1, 2, 3]).await.unwrap();

        assert!(matches!(
            read_frame(&mut server).await,
            Err(TransportError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn test_truncated_stream_is_io_error() {
        let (mut client, mut server) = tokio::io::duplex(64);
        client.write_u32_le(10).await.unwrap();
        client.write_all(&[0, 0]).await.unwrap();
        drop(client);

        assert!(matches!(
            read_frame(&mut server).await,
            Err(TransportError::Io(_))
        ));
    }
}
