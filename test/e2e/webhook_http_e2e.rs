use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use tenant_voicebot::entities::{CallId, TenantSlug};
use tenant_voicebot::error::WebhookError;
use tenant_voicebot::http::HttpWebhookClient;
use tenant_voicebot::ports::WebhookPort;
use tenant_voicebot::webhook::{ReplyAction, WebhookRequest};

struct ServerGuard(tokio::task::JoinHandle<()>);

impl Drop for ServerGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

async fn read_body(socket: &mut TcpStream) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 2048];
    loop {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            return Ok(buf);
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..pos]).to_ascii_lowercase();
            let len = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            while buf.len() < pos + 4 + len {
                let n = socket.read(&mut chunk).await?;
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
            }
            return Ok(buf[pos + 4..].to_vec());
        }
    }
}

/// Answers every request with the given status and body, forwarding request bodies to `seen`.
fn spawn_fake_webhook(
    listener: TcpListener,
    status: u16,
    body: String,
    seen: mpsc::UnboundedSender<Value>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let Ok(request) = read_body(&mut socket).await else {
                continue;
            };
            if let Ok(json) = serde_json::from_slice::<Value>(&request) {
                let _ = seen.send(json);
            }
            let resp = format!(
                "HTTP/1.1 {} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            let _ = socket.write_all(resp.as_bytes()).await;
        }
    })
}

#[tokio::test]
async fn webhook_http_e2e() -> Result<(), Box<dyn std::error::Error>> {
    let tenant = TenantSlug::new("acme")?;
    let call_id = CallId::new("call-e2e-1")?;

    // Lambda-proxy style envelope: the reply payload is itself a JSON string.
    let inner = serde_json::json!({
        "text": "Соединяю с оператором",
        "action": "transfer",
        "phone_number": "+79990001122"
    })
    .to_string();
    let envelope = serde_json::json!({"statusCode": 200, "body": inner}).to_string();

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let url = format!("http://{}/hook", listener.local_addr()?);
    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
    let _guard = ServerGuard(spawn_fake_webhook(listener, 200, envelope, seen_tx));

    let client = HttpWebhookClient::new(url, Duration::from_secs(5))?;
    let reply = client
        .post(WebhookRequest::speech_recognized(
            &call_id,
            "позовите оператора",
            &tenant,
        ))
        .await?;
    assert_eq!(reply.text.as_deref(), Some("Соединяю с оператором"));
    assert_eq!(
        reply.action,
        ReplyAction::Transfer {
            phone_number: "+79990001122".to_string()
        }
    );

    let sent = seen_rx.recv().await.ok_or("no request seen")?;
    assert_eq!(sent["event_type"], "speech_recognized");
    assert_eq!(sent["call_id"], "call-e2e-1");
    assert_eq!(sent["text"], "позовите оператора");
    assert_eq!(sent["tenant_slug"], "acme");
    assert!(sent.get("phone_number").is_none());

    Ok(())
}

#[tokio::test]
async fn webhook_error_status_is_reported() -> Result<(), Box<dyn std::error::Error>> {
    let tenant = TenantSlug::new("acme")?;
    let call_id = CallId::new("call-e2e-2")?;

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let url = format!("http://{}/hook", listener.local_addr()?);
    let (seen_tx, _seen_rx) = mpsc::unbounded_channel();
    let _guard = ServerGuard(spawn_fake_webhook(
        listener,
        502,
        "{\"message\":\"bad gateway\"}".to_string(),
        seen_tx,
    ));

    let client = HttpWebhookClient::new(url, Duration::from_secs(5))?;
    let err = client
        .post(WebhookRequest::call_started(&call_id, Some("+79990001122"), &tenant))
        .await
        .err()
        .ok_or("expected an error")?;
    match err {
        WebhookError::Status { status, body } => {
            assert_eq!(status, 502);
            assert!(body.contains("bad gateway"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn unreachable_webhook_is_a_transport_error() -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let url = format!("http://{}/hook", listener.local_addr()?);
    drop(listener);

    let client = HttpWebhookClient::new(url, Duration::from_secs(2))?;
    let call_id = CallId::new("call-e2e-3")?;
    let tenant = TenantSlug::new("acme")?;
    let result = client.post(WebhookRequest::call_ended(&call_id, &tenant)).await;
    assert!(matches!(result, Err(WebhookError::Transport(_))));
    Ok(())
}

#[tokio::test]
async fn silent_webhook_times_out() -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let url = format!("http://{}/hook", listener.local_addr()?);
    // Accepts connections and never answers.
    let _guard = ServerGuard(tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    }));

    let client = HttpWebhookClient::new(url, Duration::from_millis(100))?;
    let call_id = CallId::new("call-e2e-4")?;
    let tenant = TenantSlug::new("acme")?;
    let started = std::time::Instant::now();
    let result = client
        .post(WebhookRequest::speech_recognized(&call_id, "алло", &tenant))
        .await;
    assert!(matches!(result, Err(WebhookError::Timeout)));
    assert!(started.elapsed() < Duration::from_secs(5));
    Ok(())
}
