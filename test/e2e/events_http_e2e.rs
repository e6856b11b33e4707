use std::env;
use std::fs;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::StatusCode;
use serde_json::{json, Value};
use tempfile::tempdir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use tenant_voicebot::config::VoiceConfig;
use tenant_voicebot::entities::{CallId, TenantSlug};
use tenant_voicebot::http::{self, HttpWebhookClient};
use tenant_voicebot::logging;
use tenant_voicebot::ports::telephony::TelephonyResult;
use tenant_voicebot::ports::{CallEventSink, PortFuture, TelephonyPort};
use tenant_voicebot::session::CallDispatcher;

struct ServerGuard(tokio::task::JoinHandle<()>);

impl Drop for ServerGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

#[derive(Default)]
struct RecordingTelephony {
    commands: Mutex<Vec<String>>,
}

impl RecordingTelephony {
    fn record(&self, command: String) -> PortFuture<TelephonyResult> {
        self.commands.lock().unwrap().push(command);
        Box::pin(async { Ok(()) })
    }

    fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    fn has(&self, command: &str) -> bool {
        self.commands().iter().any(|c| c == command)
    }
}

impl TelephonyPort for RecordingTelephony {
    fn answer(&self, _call_id: CallId) -> PortFuture<TelephonyResult> {
        self.record("answer".to_string())
    }

    fn say(&self, _call_id: CallId, text: String, _voice: String) -> PortFuture<TelephonyResult> {
        self.record(format!("say:{text}"))
    }

    fn start_recognition(&self, _call_id: CallId, language: String) -> PortFuture<TelephonyResult> {
        self.record(format!("asr_start:{language}"))
    }

    fn stop_recognition(&self, _call_id: CallId) -> PortFuture<TelephonyResult> {
        self.record("asr_stop".to_string())
    }

    fn start_forwarding(
        &self,
        _call_id: CallId,
        phone_number: String,
    ) -> PortFuture<TelephonyResult> {
        self.record(format!("forward:{phone_number}"))
    }

    fn hangup(&self, _call_id: CallId) -> PortFuture<TelephonyResult> {
        self.record("hangup".to_string())
    }
}

async fn eventually(cond: impl Fn() -> bool) -> Result<(), Box<dyn std::error::Error>> {
    for _ in 0..400 {
        if cond() {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    Err("condition not reached".into())
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

/// Tenant webhook double: greets with a gateway-wrapped reply and transfers on the first turn.
fn spawn_tenant_webhook(
    listener: TcpListener,
    seen: Arc<Mutex<Vec<Value>>>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let seen = seen.clone();
            tokio::spawn(async move {
                let Ok(body) = read_body(&mut socket).await else {
                    return;
                };
                let request: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
                let reply = match request["event_type"].as_str() {
                    Some("call_started") => json!({
                        "statusCode": 200,
                        "body": json!({"text": "Привет 😀 чем помочь?"}).to_string()
                    })
                    .to_string(),
                    Some("speech_recognized") => json!({
                        "text": "Соединяю с оператором",
                        "action": "transfer",
                        "phone_number": "+79990001122"
                    })
                    .to_string(),
                    _ => String::new(),
                };
                seen.lock().unwrap().push(request);
                let resp = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    reply.len(),
                    reply
                );
                let _ = socket.write_all(resp.as_bytes()).await;
            });
        }
    })
}

#[tokio::test]
async fn events_http_e2e() -> Result<(), Box<dyn std::error::Error>> {
    let temp = tempdir()?;
    let log_dir = match env::var("E2E_LOG_DIR") {
        Ok(dir) => std::path::PathBuf::from(dir),
        Err(_) => temp.path().join("logs"),
    };
    env::set_var("LOG_MODE", "file");
    env::set_var("LOG_DIR", log_dir.to_string_lossy().as_ref());
    env::set_var("LOG_FORMAT", "json");
    env::set_var("RUST_LOG", "info");
    logging::init();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let webhook_listener = TcpListener::bind("127.0.0.1:0").await?;
    let webhook_url = format!("http://{}/voice", webhook_listener.local_addr()?);
    let _webhook_guard = ServerGuard(spawn_tenant_webhook(webhook_listener, seen.clone()));

    let telephony = Arc::new(RecordingTelephony::default());
    let dispatcher = Arc::new(CallDispatcher::new(
        TenantSlug::new("acme")?,
        telephony.clone(),
        Arc::new(HttpWebhookClient::new(webhook_url, Duration::from_secs(5))?),
        Arc::new(VoiceConfig::default()),
    ));
    let sink: Arc<dyn CallEventSink> = dispatcher.clone();
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let events_addr = listener.local_addr()?;
    let events_url = format!("http://{}/events", events_addr);
    let _server_guard = ServerGuard(http::spawn_events_server_with_listener(listener, sink));

    let client = reqwest::Client::new();
    let post = |body: Value| client.post(&events_url).json(&body).send();

    let res = post(json!({
        "call_id": "call-e2e",
        "event": "call_alerting",
        "caller_id": "+79161234567"
    }))
    .await?;
    assert_eq!(res.status(), StatusCode::ACCEPTED);
    let res = post(json!({"call_id": "call-e2e", "event": "call_alerting"})).await?;
    assert_eq!(res.status(), StatusCode::CONFLICT);
    eventually(|| telephony.has("answer")).await?;

    let res = post(json!({"call_id": "call-e2e", "event": "CallEvents.Connected"})).await?;
    assert_eq!(res.status(), StatusCode::ACCEPTED);
    eventually(|| telephony.has("say:Привет чем помочь?")).await?;

    post(json!({"call_id": "call-e2e", "event": "playback_finished"})).await?;
    eventually(|| telephony.has("asr_start:ru-RU")).await?;

    let res = post(json!({
        "call_id": "call-e2e",
        "event": "ASR.Result",
        "text": "позовите оператора",
        "confidence": 91.5
    }))
    .await?;
    assert_eq!(res.status(), StatusCode::ACCEPTED);
    eventually(|| telephony.has("say:Соединяю с оператором")).await?;

    post(json!({"call_id": "call-e2e", "event": "playback_finished"})).await?;
    eventually(|| telephony.has("forward:+79990001122")).await?;

    post(json!({"call_id": "call-e2e", "event": "disconnected"})).await?;
    eventually(|| dispatcher.registry().is_empty()).await?;
    eventually(|| seen.lock().unwrap().len() == 3).await?;

    assert_eq!(
        telephony.commands(),
        vec![
            "answer",
            "say:Привет чем помочь?",
            "asr_start:ru-RU",
            "asr_stop",
            "say:Соединяю с оператором",
            "forward:+79990001122",
        ]
    );
    let requests = seen.lock().unwrap().clone();
    let kinds: Vec<&str> = requests
        .iter()
        .filter_map(|r| r["event_type"].as_str())
        .collect();
    assert_eq!(kinds, vec!["call_started", "speech_recognized", "call_ended"]);
    assert_eq!(requests[0]["phone_number"], "+79161234567");
    assert_eq!(requests[1]["text"], "позовите оператора");
    assert!(requests.iter().all(|r| r["tenant_slug"] == "acme"));

    // Events for a finished call are rejected.
    let res = post(json!({"call_id": "call-e2e", "event": "playback_finished"})).await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = post(json!({"call_id": "call-e2e", "event": "fax_received"})).await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .post(&events_url)
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client.get(&events_url).send().await?;
    assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);

    let other_url = events_url.replace("/events", "/status");
    let res = client.post(&other_url).send().await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // Oversized bodies are refused from the headers alone.
    let mut raw = TcpStream::connect(events_addr).await?;
    raw.write_all(
        format!(
            "POST /events HTTP/1.1\r\nHost: {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n",
            events_addr,
            70 * 1024
        )
        .as_bytes(),
    )
    .await?;
    let mut response = Vec::new();
    raw.read_to_end(&mut response).await?;
    let response = String::from_utf8_lossy(&response);
    assert!(response.starts_with("HTTP/1.1 413"), "{response}");

    log::logger().flush();
    let logs = fs::read_to_string(log_dir.join("voicebot.log"))?;
    assert!(logs.contains("\"call_id\":\"call-e2e\""));
    assert!(logs.contains("forwarding to"));
    assert!(!logs.contains("+79161234567"));

    Ok(())
}
