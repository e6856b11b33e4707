use std::sync::Arc;

use tenant_voicebot::http::{self, HttpWebhookClient};
use tenant_voicebot::session::CallDispatcher;
use tenant_voicebot::shared::ports::{CallEventSink, TelephonyPort};
use tenant_voicebot::telephony::{HttpTelephonyBridge, LogOnlyTelephony};
use tenant_voicebot::{config, logging};

/// Starts the call-flow service for one tenant.
///
/// Loads configuration, builds the webhook client and telephony adapter, and accepts platform
/// events over HTTP until a shutdown signal is received.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let cfg = config::Config::from_env()?;
    let timeouts = config::timeouts().clone();
    let voice = Arc::new(config::voice_config().clone());

    let webhook = Arc::new(HttpWebhookClient::new(
        cfg.webhook_url.clone(),
        timeouts.webhook_http,
    )?);
    let telephony: Arc<dyn TelephonyPort> = match cfg.telephony_control_url.as_deref() {
        Some(url) => {
            log::info!("[main] telephony control via {}", url);
            Arc::new(HttpTelephonyBridge::new(url, timeouts.telephony_http)?)
        }
        None => {
            log::warn!("[main] TELEPHONY_CONTROL_URL not set, telephony commands are only logged");
            Arc::new(LogOnlyTelephony::new())
        }
    };

    log::info!(
        "[main] tenant={} webhook={} asr_language={} failure_policy={:?}",
        cfg.tenant_slug,
        webhook.url(),
        voice.asr_language,
        voice.failure_policy
    );

    let dispatcher = Arc::new(CallDispatcher::new(
        cfg.tenant_slug.clone(),
        telephony,
        webhook,
        voice,
    ));
    let sink: Arc<dyn CallEventSink> = dispatcher.clone();
    let server = http::spawn_events_server(&cfg.events_http_addr, sink).await?;

    tokio::signal::ctrl_c().await?;
    log::info!(
        "[main] shutdown requested, active calls={}",
        dispatcher.registry().len()
    );
    server.abort();
    Ok(())
}
