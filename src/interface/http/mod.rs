use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

use crate::shared::ports::CallEventSink;

pub mod events;
pub mod webhook;

pub use events::{to_inbound, EventPayload, InboundEvent};
pub use webhook::HttpWebhookClient;

const MAX_REQUEST_BYTES: usize = 64 * 1024;
const EVENTS_PATH: &str = "/events";

/// Platform event ingress: `POST /events` with a JSON [`EventPayload`].
pub async fn spawn_events_server(
    bind: &str,
    sink: Arc<dyn CallEventSink>,
) -> std::io::Result<JoinHandle<()>> {
    let listener = TcpListener::bind(bind).await?;
    log::info!("[http] accepting platform events on {}", listener.local_addr()?);
    Ok(spawn_events_server_with_listener(listener, sink))
}

pub fn spawn_events_server_with_listener(
    listener: TcpListener,
    sink: Arc<dyn CallEventSink>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = run_with_listener(listener, sink).await {
            log::error!("[http] events server error: {:?}", e);
        }
    })
}

async fn run_with_listener(
    listener: TcpListener,
    sink: Arc<dyn CallEventSink>,
) -> std::io::Result<()> {
    loop {
        let (mut socket, peer) = listener.accept().await?;
        let sink = sink.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_conn(&mut socket, sink.as_ref()).await {
                log::debug!("[http] connection from {} failed: {}", peer, e);
            }
        });
    }
}

struct RawRequest {
    method: String,
    path: String,
    body: Vec<u8>,
}

enum ReadOutcome {
    Request(RawRequest),
    Closed,
    TooLarge,
    Malformed,
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

async fn read_request(socket: &mut TcpStream) -> std::io::Result<ReadOutcome> {
    let mut buf = vec![0u8; 4096];
    let mut read_len = 0usize;
    let header_end = loop {
        if let Some(pos) = find_header_end(&buf[..read_len]) {
            break pos;
        }
        if read_len == buf.len() {
            if buf.len() >= MAX_REQUEST_BYTES {
                return Ok(ReadOutcome::TooLarge);
            }
            buf.resize(buf.len() + 4096, 0);
        }
        let n = socket.read(&mut buf[read_len..]).await?;
        if n == 0 {
            return Ok(ReadOutcome::Closed);
        }
        read_len += n;
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.lines();
    let Some(first_line) = lines.next() else {
        return Ok(ReadOutcome::Malformed);
    };
    let mut parts = first_line.split_whitespace();
    let (Some(method), Some(target)) = (parts.next(), parts.next()) else {
        return Ok(ReadOutcome::Malformed);
    };
    let mut headers = HashMap::new();
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }
    }

    let content_length = match headers.get("content-length") {
        Some(value) => match value.parse::<usize>() {
            Ok(len) => len,
            Err(_) => return Ok(ReadOutcome::Malformed),
        },
        None => 0,
    };
    let body_start = header_end + 4;
    if body_start + content_length > MAX_REQUEST_BYTES {
        return Ok(ReadOutcome::TooLarge);
    }

    let mut body = buf[body_start..read_len].to_vec();
    while body.len() < content_length {
        let mut chunk = [0u8; 4096];
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            return Ok(ReadOutcome::Malformed);
        }
        body.extend_from_slice(&chunk[..n]);
    }
    body.truncate(content_length);

    let path = target.split('?').next().unwrap_or(target).to_string();
    Ok(ReadOutcome::Request(RawRequest {
        method: method.to_string(),
        path,
        body,
    }))
}

async fn handle_conn(socket: &mut TcpStream, sink: &dyn CallEventSink) -> std::io::Result<()> {
    let request = match read_request(socket).await? {
        ReadOutcome::Request(request) => request,
        ReadOutcome::Closed => return Ok(()),
        ReadOutcome::TooLarge => {
            return write_json(socket, 413, "Payload Too Large", json!({"error": "too large"}))
                .await
        }
        ReadOutcome::Malformed => {
            return write_json(socket, 400, "Bad Request", json!({"error": "malformed request"}))
                .await
        }
    };

    if request.path != EVENTS_PATH {
        return write_json(socket, 404, "Not Found", json!({"error": "not found"})).await;
    }
    if request.method != "POST" {
        return write_json(
            socket,
            405,
            "Method Not Allowed",
            json!({"error": "method not allowed"}),
        )
        .await;
    }

    let (status, reason, body) = route_event(&request.body, sink);
    write_json(socket, status, reason, body).await
}

fn route_event(body: &[u8], sink: &dyn CallEventSink) -> (u16, &'static str, serde_json::Value) {
    let payload = match serde_json::from_slice::<EventPayload>(body) {
        Ok(payload) => payload,
        Err(err) => {
            log::warn!("[http] invalid event body: {}", err);
            return (400, "Bad Request", json!({"error": format!("invalid body: {err}")}));
        }
    };
    let inbound = match to_inbound(payload) {
        Ok(inbound) => inbound,
        Err(err) => {
            log::warn!("[http] rejected event: {}", err);
            return (400, "Bad Request", json!({"error": err}));
        }
    };
    match inbound {
        InboundEvent::Alerting(info) => {
            if sink.call_alerting(info) {
                (202, "Accepted", json!({"status": "accepted"}))
            } else {
                (409, "Conflict", json!({"error": "call already active"}))
            }
        }
        InboundEvent::Call(call_id, event) => {
            if sink.call_event(&call_id, event) {
                (202, "Accepted", json!({"status": "accepted"}))
            } else {
                (404, "Not Found", json!({"error": "unknown call"}))
            }
        }
    }
}

async fn write_json(
    socket: &mut TcpStream,
    status: u16,
    reason: &str,
    body: serde_json::Value,
) -> std::io::Result<()> {
    let body = body.to_string();
    let mut resp = Vec::new();
    resp.extend_from_slice(format!("HTTP/1.1 {} {}\r\n", status, reason).as_bytes());
    resp.extend_from_slice(b"Content-Type: application/json\r\n");
    resp.extend_from_slice(format!("Content-Length: {}\r\n", body.len()).as_bytes());
    resp.extend_from_slice(b"Connection: close\r\n\r\n");
    resp.extend_from_slice(body.as_bytes());
    socket.write_all(&resp).await?;
    socket.flush().await
}
