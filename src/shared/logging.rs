use std::fs::OpenOptions;
use std::io::Write;
use std::sync::Once;

use chrono::Utc;
use log::Level;

use crate::config::{self, LogFormat, LogMode};

static INIT: Once = Once::new();

/// Initializes the global logger once using the logging configuration from the environment.
///
/// Supports JSON or plain-text lines and writes to stdout or to an append-only file under
/// `LOG_DIR`. Problems creating the directory or opening the file fall back to stdout and
/// are reported as warnings once the logger is up.
///
/// # Examples
///
/// ```
/// // Safe to call multiple times.
/// tenant_voicebot::logging::init();
/// log::info!("logger initialized");
/// ```
pub fn init() {
    INIT.call_once(|| {
        let mut init_warnings = Vec::new();
        let cfg = config::logging_config().clone();
        let mut builder =
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));

        builder.format(move |buf, record| {
            let ts = Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
            let line = format_line(
                &cfg.format,
                &ts,
                record.level(),
                record.target(),
                &record.args().to_string(),
            );
            writeln!(buf, "{}", line)
        });

        match cfg.mode {
            LogMode::Stdout => {
                builder.target(env_logger::Target::Stdout);
            }
            LogMode::File => {
                if let Some(dir) = cfg.dir.as_ref() {
                    if let Err(err) = std::fs::create_dir_all(dir) {
                        init_warnings.push(format!("[logging] failed to create log dir: {}", err));
                    }
                    let path = std::path::Path::new(dir).join(&cfg.file_name);
                    match OpenOptions::new().create(true).append(true).open(&path) {
                        Ok(file) => {
                            builder.target(env_logger::Target::Pipe(Box::new(file)));
                        }
                        Err(err) => {
                            init_warnings.push(format!(
                                "[logging] failed to open log file ({}): {}",
                                path.display(),
                                err
                            ));
                            builder.target(env_logger::Target::Stdout);
                        }
                    }
                } else {
                    builder.target(env_logger::Target::Stdout);
                }
            }
        }

        let _ = builder.try_init();
        for warning in init_warnings {
            log::warn!("{}", warning);
        }
    });
}

/// Splits a leading `[call <id>]` tag off a message so JSON lines can carry it as a field.
fn split_call_tag(msg: &str) -> (Option<&str>, &str) {
    let Some(rest) = msg.strip_prefix("[call ") else {
        return (None, msg);
    };
    match rest.split_once(']') {
        Some((call_id, tail)) if !call_id.is_empty() && !call_id.contains(' ') => {
            (Some(call_id), tail.trim_start())
        }
        _ => (None, msg),
    }
}

fn format_line(format: &LogFormat, ts: &str, level: Level, target: &str, msg: &str) -> String {
    match format {
        LogFormat::Json => {
            let (call_id, text) = split_call_tag(msg);
            let mut obj = serde_json::json!({
                "ts": ts,
                "level": level.to_string(),
                "target": target,
                "msg": text,
            });
            if let Some(call_id) = call_id {
                obj["call_id"] = serde_json::Value::String(call_id.to_string());
            }
            obj.to_string()
        }
        LogFormat::Text => format!("{} {} {} {}", ts, level, target, msg),
    }
}
