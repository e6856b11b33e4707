use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use crate::shared::entities::TenantSlug;

#[derive(Clone, Debug)]
pub struct Config {
    pub events_http_addr: String,
    pub webhook_url: String,
    pub tenant_slug: TenantSlug,
    pub telephony_control_url: Option<String>,
}

impl Config {
    /// Reads the service configuration from environment variables.
    ///
    /// - `EVENTS_HTTP_ADDR` (default `"0.0.0.0:8088"`): where platform events are accepted.
    /// - `WEBHOOK_URL` (required): the tenant AI webhook.
    /// - `TENANT_SLUG` (required): tenant identifier sent with every webhook request.
    /// - `TELEPHONY_CONTROL_URL` (optional): platform media-control base URL. When absent the
    ///   service runs with a log-only telephony adapter.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use tenant_voicebot::config::Config;
    ///
    /// let cfg = Config::from_env().unwrap();
    /// let _addr = cfg.events_http_addr;
    /// ```
    pub fn from_env() -> Result<Self> {
        let events_http_addr =
            std::env::var("EVENTS_HTTP_ADDR").unwrap_or_else(|_| "0.0.0.0:8088".to_string());
        let webhook_url =
            env_non_empty("WEBHOOK_URL").ok_or_else(|| anyhow!("WEBHOOK_URL is required"))?;
        let tenant_slug = TenantSlug::new(
            env_non_empty("TENANT_SLUG").ok_or_else(|| anyhow!("TENANT_SLUG is required"))?,
        )?;
        let telephony_control_url = env_non_empty("TELEPHONY_CONTROL_URL")
            .map(|url| url.trim_end_matches('/').to_string());

        Ok(Self {
            events_http_addr,
            webhook_url,
            tenant_slug,
            telephony_control_url,
        })
    }
}

#[derive(Clone, Debug)]
pub struct Timeouts {
    pub webhook_http: Duration,
    pub telephony_http: Duration,
}

impl Timeouts {
    fn from_env() -> Self {
        // Defaults: webhook 20s, telephony control 5s.
        // Timeout behavior: the client returns an error and the call takes the apology path.
        Self {
            webhook_http: env_duration_ms("WEBHOOK_HTTP_TIMEOUT_MS", 20_000),
            telephony_http: env_duration_ms("TELEPHONY_HTTP_TIMEOUT_MS", 5_000),
        }
    }
}

static TIMEOUTS: OnceLock<Timeouts> = OnceLock::new();

pub fn timeouts() -> &'static Timeouts {
    TIMEOUTS.get_or_init(Timeouts::from_env)
}

/// What a call does after the apology for a failed webhook turn or recognition error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailurePolicy {
    Hangup,
    ResumeListening,
}

impl FailurePolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "hangup" | "hang_up" => Some(Self::Hangup),
            "resume" | "resume_listening" | "listen" => Some(Self::ResumeListening),
            _ => None,
        }
    }
}

/// Spoken phrases. Every field can be overridden from the YAML file at `VOICE_PROMPTS_PATH`.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct VoicePrompts {
    pub greeting: String,
    pub no_input: String,
    pub turn_fallback: String,
    pub service_unavailable: String,
    pub turn_failed: String,
    pub recognition_failed: String,
    pub transfer_failed: String,
}

impl Default for VoicePrompts {
    fn default() -> Self {
        Self {
            greeting: "Здравствуйте! Чем могу помочь?".to_string(),
            no_input: "Извините, я вас не расслышал. Повторите, пожалуйста.".to_string(),
            turn_fallback: "Извините, не смог обработать запрос.".to_string(),
            service_unavailable: "Извините, сервис временно недоступен.".to_string(),
            turn_failed: "Извините, произошла ошибка. Попробуйте позже.".to_string(),
            recognition_failed: "Извините, произошла ошибка распознавания.".to_string(),
            transfer_failed: "Извините, не удалось соединить с оператором. Попробуйте позже."
                .to_string(),
        }
    }
}

impl VoicePrompts {
    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str::<VoicePrompts>(text)?)
    }

    fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(text) => match Self::from_yaml(&text) {
                Ok(prompts) => prompts,
                Err(err) => {
                    log::warn!(
                        "[config] failed to parse voice prompts {:?}: {:?}. Using default.",
                        path,
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[config] voice prompts not found {:?}: {:?}. Using default.",
                    path,
                    err
                );
                Self::default()
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct VoiceConfig {
    pub asr_language: String,
    pub tts_voice: String,
    /// Results at or below this confidence (0-100) are discarded.
    pub min_confidence: f32,
    pub failure_policy: FailurePolicy,
    pub prompts: VoicePrompts,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            asr_language: "ru-RU".to_string(),
            tts_voice: "ru_RU_male".to_string(),
            min_confidence: 50.0,
            failure_policy: FailurePolicy::Hangup,
            prompts: VoicePrompts::default(),
        }
    }
}

impl VoiceConfig {
    /// Env: ASR_LANGUAGE / TTS_VOICE / ASR_MIN_CONFIDENCE / CALL_FAILURE_POLICY / VOICE_PROMPTS_PATH.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let failure_policy = match env_non_empty("CALL_FAILURE_POLICY") {
            Some(value) => FailurePolicy::parse(&value).unwrap_or_else(|| {
                log::warn!(
                    "[config] unknown CALL_FAILURE_POLICY={}, using hangup",
                    value
                );
                FailurePolicy::Hangup
            }),
            None => defaults.failure_policy,
        };
        let prompts = match env_non_empty("VOICE_PROMPTS_PATH") {
            Some(path) => VoicePrompts::load(&PathBuf::from(path)),
            None => defaults.prompts,
        };
        Self {
            asr_language: env_non_empty("ASR_LANGUAGE").unwrap_or(defaults.asr_language),
            tts_voice: env_non_empty("TTS_VOICE").unwrap_or(defaults.tts_voice),
            min_confidence: env_f32("ASR_MIN_CONFIDENCE", defaults.min_confidence),
            failure_policy,
            prompts,
        }
    }
}

static VOICE_CONFIG: OnceLock<VoiceConfig> = OnceLock::new();

pub fn voice_config() -> &'static VoiceConfig {
    VOICE_CONFIG.get_or_init(VoiceConfig::from_env)
}

#[derive(Clone, Debug)]
pub enum LogMode {
    Stdout,
    File,
}

#[derive(Clone, Debug)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub mode: LogMode,
    pub format: LogFormat,
    pub dir: Option<String>,
    pub file_name: String,
}

impl LoggingConfig {
    fn from_env() -> Self {
        let dir_env = std::env::var("LOG_DIR").ok();
        let mode_env = std::env::var("LOG_MODE").ok();
        let format_env = std::env::var("LOG_FORMAT").ok();

        let format = match format_env.as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        let mode = match mode_env.as_deref() {
            Some("file") => LogMode::File,
            Some("stdout") => LogMode::Stdout,
            _ => {
                if dir_env.is_some() {
                    LogMode::File
                } else {
                    LogMode::Stdout
                }
            }
        };

        let dir = match mode {
            LogMode::File => Some(dir_env.unwrap_or_else(|| "logs".to_string())),
            LogMode::Stdout => None,
        };

        let file_name =
            std::env::var("LOG_FILE_NAME").unwrap_or_else(|_| "voicebot.log".to_string());

        Self {
            mode,
            format,
            dir,
            file_name,
        }
    }
}

static LOGGING: OnceLock<LoggingConfig> = OnceLock::new();

pub fn logging_config() -> &'static LoggingConfig {
    LOGGING.get_or_init(LoggingConfig::from_env)
}

fn env_duration_ms(key: &str, default_ms: u64) -> Duration {
    let ms = std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default_ms);
    Duration::from_millis(ms)
}

fn env_f32(key: &str, default_value: f32) -> f32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<f32>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(default_value)
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
