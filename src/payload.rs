use std::fmt;

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::{RequestError, Result};

/// Request body as configured on the builder.
///
/// A streamed body is read into memory once, before the first attempt, so
/// every attempt sends the same bytes.
#[derive(Default)]
pub(crate) enum Payload {
    #[default]
    Empty,
    Bytes(Vec<u8>),
    Reader(Box<dyn AsyncRead + Send + Unpin>),
}

impl Payload {
    /// Reads a streamed body fully into memory.
    ///
    /// Returns `None` when no body was configured.
    pub(crate) async fn materialize(self) -> Result<Option<Vec<u8>>> {
        match self {
            Self::Empty => Ok(None),
            Self::Bytes(bytes) => Ok(Some(bytes)),
            Self::Reader(mut reader) => {
                let mut buffer = Vec::new();
                reader
                    .read_to_end(&mut buffer)
                    .await
                    .map_err(RequestError::BodyRead)?;
                Ok(Some(buffer))
            }
        }
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
            Self::Reader(_) => f.write_str("Reader(<pending>)"),
        }
    }
}
