//! Framed Unix-socket wire protocol a signal subprocess speaks, preserved
//! verbatim from `autoscaler/signals.py` so existing external signal
//! binaries keep working against this control plane (spec.md §4.3/§6.4).

use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::error::SignalError;

pub const ACK: u8 = 0x01;
pub const SOCKET_MESSAGE_SIZE: usize = 4096;
pub const SOCKET_TIMEOUT_SECONDS: u64 = 60;

/// Abstract-namespace socket name the parent binds and the subprocess
/// connects to: `\0<namespace>-<signal-name>-socket`.
pub fn abstract_socket_name(namespace: &str, signal_name: &str) -> String {
    format!("\0{namespace}-{signal_name}-socket")
}

/// Sent once, right after connect: the signal's configured parameters.
pub async fn send_parameters<S>(stream: &mut S, parameters: &Value) -> Result<(), SignalError>
where
    S: tokio::io::AsyncWrite + Unpin,
{
    let payload = serde_json::json!({ "parameters": parameters }).to_string();
    stream.write_all(payload.as_bytes()).await.map_err(|e| SignalError::Connection(e.to_string()))?;
    Ok(())
}

/// One evaluation round-trip: send the length-prefixed metrics body
/// (chunked to `SOCKET_MESSAGE_SIZE`), wait for the two ACK bytes, then
/// parse the `{"Resources": {...}}` response. Handles the case where the
/// body ACK and the start of the response arrive concatenated in a single
/// `recv`.
pub async fn evaluate_over_stream<S>(stream: &mut S, metrics: &Value, timestamp: i64) -> Result<Value, SignalError>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    let body = serde_json::json!({ "metrics": metrics, "timestamp": timestamp }).to_string().into_bytes();
    let len_prefix = (body.len() as u32).to_be_bytes();

    stream.write_all(&len_prefix).await.map_err(|e| SignalError::Connection(e.to_string()))?;
    let mut ack_buf = [0u8; SOCKET_MESSAGE_SIZE];
    let n = stream.read(&mut ack_buf).await.map_err(|e| SignalError::Connection(e.to_string()))?;
    if n == 0 || ack_buf[0] != ACK {
        return Err(SignalError::Connection(format!("unexpected response to length prefix (n={n})")));
    }

    for chunk in body.chunks(SOCKET_MESSAGE_SIZE) {
        stream.write_all(chunk).await.map_err(|e| SignalError::Connection(e.to_string()))?;
    }

    let mut resp_buf = [0u8; SOCKET_MESSAGE_SIZE];
    let n = stream.read(&mut resp_buf).await.map_err(|e| SignalError::Connection(e.to_string()))?;
    if n == 0 || resp_buf[0] != ACK {
        return Err(SignalError::Connection(format!("unexpected response to metric body (n={n})")));
    }

    // The child sometimes sends the ACK and its JSON response in the same
    // segment; use whatever followed the ACK byte, or read again if there
    // was nothing more in this segment.
    let leftover = &resp_buf[1..n];
    let response_bytes: Vec<u8> = if leftover.is_empty() {
        let mut more = [0u8; SOCKET_MESSAGE_SIZE];
        let m = stream.read(&mut more).await.map_err(|e| SignalError::Connection(e.to_string()))?;
        more[..m].to_vec()
    } else {
        leftover.to_vec()
    };

    let parsed: Value = serde_json::from_slice(&response_bytes)
        .map_err(|e| SignalError::Evaluation(format!("malformed signal response: {e}")))?;
    parsed
        .get("Resources")
        .cloned()
        .ok_or_else(|| SignalError::Evaluation("signal response missing \"Resources\" key".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::UnixStream;

    async fn serve_child(mut child: UnixStream) {
        let mut len_buf = [0u8; 4];
        child.read_exact(&mut len_buf).await.unwrap();
        child.write_all(&[ACK]).await.unwrap();
        let len = u32::from_be_bytes(len_buf) as usize;
        let mut body = vec![0u8; len];
        child.read_exact(&mut body).await.unwrap();
        // Concatenate ACK and response in one write, matching the race the
        // protocol has to tolerate.
        let mut reply = vec![ACK];
        reply.extend_from_slice(br#"{"Resources": {"cpus": 4.0}}"#);
        child.write_all(&reply).await.unwrap();
    }

    #[tokio::test]
    async fn round_trip_with_concatenated_ack_and_response() {
        let (mut parent, child) = UnixStream::pair().unwrap();
        let server = tokio::spawn(serve_child(child));
        let metrics = serde_json::json!({});
        let resources = evaluate_over_stream(&mut parent, &metrics, 1_700_000_000).await.unwrap();
        server.await.unwrap();
        assert_eq!(resources["cpus"], 4.0);
    }
}
