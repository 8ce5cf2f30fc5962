// Copyright (c) The testwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The framing used on collector connections.
//!
//! A request frame is:
//!
//! ```text
//! u16 path length | path (UTF-8) | u32 payload length | payload
//! ```
//!
//! and a response frame is:
//!
//! ```text
//! u8 status | u32 body length | body
//! ```
//!
//! All integers are big-endian. A status of [`STATUS_OK`] means success; for any other status the
//! body is an error message.

use bytes::Bytes;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// The status of a successful response.
pub const STATUS_OK: u8 = 0;

/// The status used when a request could not be handled.
pub const STATUS_ERROR: u8 = 1;

/// The largest payload or body accepted in a frame.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Writes a request frame.
pub async fn write_request<W>(writer: &mut W, path: &str, payload: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let path_len = u16::try_from(path.len()).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("method path is {} bytes, maximum is {}", path.len(), u16::MAX),
        )
    })?;
    let payload_len = checked_len(payload.len())?;

    writer.write_u16(path_len).await?;
    writer.write_all(path.as_bytes()).await?;
    writer.write_u32(payload_len).await?;
    writer.write_all(payload).await?;
    writer.flush().await
}

/// Reads a request frame.
///
/// Returns `Ok(None)` if the connection was closed cleanly before a new frame started.
pub async fn read_request<R>(reader: &mut R) -> io::Result<Option<(String, Bytes)>>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 2];
    if reader.read(&mut len_buf[..1]).await? == 0 {
        return Ok(None);
    }
    reader.read_exact(&mut len_buf[1..]).await?;
    let path_len = u16::from_be_bytes(len_buf) as usize;

    let mut path = vec![0u8; path_len];
    reader.read_exact(&mut path).await?;
    let path = String::from_utf8(path)
        .map_err(|error| io::Error::new(io::ErrorKind::InvalidData, error))?;

    let payload = read_body(reader).await?;
    Ok(Some((path, payload)))
}

/// Writes a response frame.
pub async fn write_response<W>(writer: &mut W, status: u8, body: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let body_len = checked_len(body.len())?;
    writer.write_u8(status).await?;
    writer.write_u32(body_len).await?;
    writer.write_all(body).await?;
    writer.flush().await
}

/// Reads a response frame, returning the status and the body.
pub async fn read_response<R>(reader: &mut R) -> io::Result<(u8, Bytes)>
where
    R: AsyncRead + Unpin,
{
    let status = reader.read_u8().await?;
    let body = read_body(reader).await?;
    Ok((status, body))
}

async fn read_body<R>(reader: &mut R) -> io::Result<Bytes>
where
    R: AsyncRead + Unpin,
{
    let len = reader.read_u32().await? as usize;
    if len > MAX_FRAME_LEN {
        return Err(too_large(len));
    }
    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    Ok(Bytes::from(body))
}

fn checked_len(len: usize) -> io::Result<u32> {
    if len > MAX_FRAME_LEN {
        return Err(too_large(len));
    }
    // MAX_FRAME_LEN fits in a u32.
    Ok(len as u32)
}

fn too_large(len: usize) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("frame of {len} bytes exceeds maximum of {MAX_FRAME_LEN} bytes"),
    )
}
