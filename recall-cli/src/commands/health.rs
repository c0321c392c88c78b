use anyhow::{bail, Context};
use recall_core::RecallConfig;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

/// Open a short-lived connection, send one `health.ping`, print the reply.
pub async fn run(config: &RecallConfig) -> anyhow::Result<()> {
    let stream = UnixStream::connect(&config.socket_path)
        .await
        .with_context(|| format!("connecting to {}", config.socket_path.display()))?;
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let request = json!({
        "jsonrpc": "2.0",
        "method": "health.ping",
        "params": {},
        "id": 1,
    });
    let mut payload = serde_json::to_vec(&request)?;
    payload.push(b'\n');
    write_half.write_all(&payload).await?;

    let mut line = String::new();
    reader.read_line(&mut line).await?;
    let response: Value = serde_json::from_str(line.trim())?;

    if let Some(error) = response.get("error") {
        bail!("daemon reported an error: {error}");
    }
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
