use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::executor::DEFAULT_DOUBLE_CLICK_INTERVAL;
use crate::wait::PollOptions;

/// Which input backend the bootstrap wires in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Enigo,
    DryRun,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub host: String,
    pub poll: PollOptions,
    pub double_click_interval: Duration,
    pub input: InputMode,
    /// Accessibility tree snapshot to serve. Without one the server starts
    /// with no session.
    pub tree_file: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from any key lookup; `from_env` uses the process
    /// environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let millis = |key: &str, default: Duration| match lookup(key) {
            None => default,
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(ms) => Duration::from_millis(ms),
                Err(_) => {
                    tracing::warn!("Ignoring malformed {}={:?}", key, raw);
                    default
                }
            },
        };

        let port = match lookup("UIAUTO_PORT") {
            None => defaults.port,
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                tracing::warn!("Ignoring malformed UIAUTO_PORT={:?}", raw);
                defaults.port
            }),
        };

        let input = match lookup("UIAUTO_INPUT").as_deref().map(str::trim) {
            None | Some("enigo") => InputMode::Enigo,
            Some("dry-run") => InputMode::DryRun,
            Some(other) => {
                tracing::warn!("Unknown UIAUTO_INPUT={:?}, using enigo", other);
                InputMode::Enigo
            }
        };

        Self {
            port,
            host: lookup("UIAUTO_HOST").unwrap_or(defaults.host),
            poll: PollOptions::new(
                millis("UIAUTO_POLL_TIMEOUT_MS", defaults.poll.timeout),
                match millis("UIAUTO_POLL_INTERVAL_MS", defaults.poll.interval) {
                    interval if interval.is_zero() => {
                        tracing::warn!("Ignoring UIAUTO_POLL_INTERVAL_MS=0");
                        defaults.poll.interval
                    }
                    interval => interval,
                },
            ),
            double_click_interval: millis(
                "UIAUTO_DOUBLE_CLICK_INTERVAL_MS",
                defaults.double_click_interval,
            ),
            input,
            tree_file: lookup("UIAUTO_TREE_FILE")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8765,
            host: "127.0.0.1".to_string(),
            poll: PollOptions::default(),
            double_click_interval: DEFAULT_DOUBLE_CLICK_INTERVAL,
            input: InputMode::Enigo,
            tree_file: None,
        }
    }
}
