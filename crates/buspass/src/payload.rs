//! Message body loading.

use crate::config::BodySource;
use crate::error::BuspassError;
use bytes::Bytes;
use std::path::Path;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::info;

/// Load the message body from the configured source.
pub async fn load_body(source: &BodySource) -> Result<Bytes, BuspassError> {
    match source {
        BodySource::File(path) => read_file(path).await,
        BodySource::Stdin => {
            info!("reading message body from standard in");
            let body = read_lines(BufReader::new(tokio::io::stdin())).await?;
            info!(bytes = body.len(), "read message body from stdin");
            Ok(body)
        }
    }
}

/// Read a whole file as the message body.
pub async fn read_file(path: &Path) -> Result<Bytes, BuspassError> {
    let data = tokio::fs::read(path)
        .await
        .map_err(|e| BuspassError::from_io_error(e, &format!("file '{}'", path.display())))?;
    Ok(Bytes::from(data))
}

/// Concatenate every line of `reader`, dropping the line terminators.
///
/// Both `\n` and `\r\n` endings are removed, so `"ab\ncd\n"` becomes `"abcd"`.
/// Lines are raw bytes; no UTF-8 check is applied.
pub async fn read_lines<R>(reader: R) -> Result<Bytes, BuspassError>
where
    R: AsyncBufRead + Unpin,
{
    let mut segments = reader.split(b'\n');
    let mut data = Vec::new();
    while let Some(mut line) = segments
        .next_segment()
        .await
        .map_err(|e| BuspassError::from_io_error(e, "standard input"))?
    {
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        data.extend_from_slice(&line);
    }
    Ok(Bytes::from(data))
}
