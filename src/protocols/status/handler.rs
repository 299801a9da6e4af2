//! Status protocol handler for the Tokio runtime.

use bytes::{Bytes, BytesMut};
use std::convert::Infallible;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{info, trace};

use super::message::{reply_for, Message, Reply};
use crate::config::Config;

/// Handle a status protocol connection.
///
/// Reads up to `config.read_size` bytes, then writes the reply for the
/// current iteration, forever. A read of zero bytes is treated like any
/// other read. The only way out is an I/O error, which is returned.
pub async fn handle_connection<S>(
    mut stream: S,
    config: &Config,
) -> Result<Infallible, SessionError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let status = Bytes::from(Message::status().encode());
    let bye = Bytes::from(Message::bye().encode());
    let mut buffer = BytesMut::zeroed(config.read_size);
    let mut iteration: u64 = 0;

    loop {
        info!(iteration, "receiving");

        let n = stream
            .read(&mut buffer[..])
            .await
            .map_err(|source| SessionError::Read { iteration, source })?;

        if n > 0 {
            let data = Bytes::copy_from_slice(&buffer[..n]);
            info!(len = n, ?data, "received");
        } else {
            trace!(iteration, "read returned no data");
        }

        if reply_for(iteration, config.bye_at) == Reply::ByeThenStatus {
            stream
                .write_all(&bye)
                .await
                .map_err(|source| SessionError::Write { iteration, source })?;
        }

        stream
            .write_all(&status)
            .await
            .map_err(|source| SessionError::Write { iteration, source })?;

        info!(iteration, "done");
        iteration += 1;
    }
}

/// I/O failure that ended a session.
#[derive(Debug)]
pub enum SessionError {
    Read {
        iteration: u64,
        source: std::io::Error,
    },
    Write {
        iteration: u64,
        source: std::io::Error,
    },
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::Read { iteration, source } => {
                write!(f, "read failed on iteration {iteration}: {source}")
            }
            SessionError::Write { iteration, source } => {
                write!(f, "write failed on iteration {iteration}: {source}")
            }
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::Read { source, .. } | SessionError::Write { source, .. } => Some(source),
        }
    }
}
