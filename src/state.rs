//! # Application State Management
//!
//! Shared state that every request handler can reach through
//! `web::Data<AppState>`.
//!
//! ## Contents:
//! - **config**: runtime configuration, replaceable through `PUT /api/v1/config`
//! - **metrics**: request, error, and voice-session counters
//! - **chatbot**: the remote API client, built on first use
//!
//! ## Arc<RwLock<T>> Pattern:
//! Each worker thread holds a clone of `AppState`; the `Arc`s point at the same
//! data, and the `RwLock`s let many readers through while updates take turns.

use crate::chatbot::ChatbotClient;
use crate::config::AppConfig;
use crate::error::AppResult;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Instant;
use tracing::info;

#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration (can be updated at runtime)
    pub config: Arc<RwLock<AppConfig>>,

    /// Performance metrics, updated by the metrics middleware and voice handlers
    pub metrics: Arc<RwLock<AppMetrics>>,

    /// Remote API client, created lazily and dropped when `remote` settings change
    chatbot: Arc<RwLock<Option<ChatbotClient>>>,

    /// When the gateway started
    pub start_time: Instant,
}

/// Counters collected across all requests.
#[derive(Debug, Default, Clone)]
pub struct AppMetrics {
    /// Total number of HTTP requests processed since start
    pub request_count: u64,

    /// Total number of 4xx/5xx responses since start
    pub error_count: u64,

    /// Voice uploads currently being captured, converted, or forwarded
    pub active_sessions: u32,

    /// Recordings successfully converted to the upload format
    pub recordings_converted: u64,

    /// Seconds of audio produced by those conversions
    pub audio_seconds_converted: f64,

    /// Key: route pattern (e.g., "POST /api/v1/voice")
    pub endpoint_metrics: HashMap<String, EndpointMetric>,
}

/// Per-route request statistics.
#[derive(Debug, Default, Clone)]
pub struct EndpointMetric {
    pub request_count: u64,
    pub total_duration_ms: u64,
    pub error_count: u64,
}

/// Keeps `active_sessions` incremented for as long as it lives.
///
/// Handlers hold one for the whole voice request so early returns and
/// errors still decrement the counter.
pub struct ActiveSessionGuard {
    state: AppState,
}

impl Drop for ActiveSessionGuard {
    fn drop(&mut self) {
        let mut metrics = self.state.metrics.write().unwrap();
        metrics.active_sessions = metrics.active_sessions.saturating_sub(1);
    }
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
            metrics: Arc::new(RwLock::new(AppMetrics::default())),
            chatbot: Arc::new(RwLock::new(None)),
            start_time: Instant::now(),
        }
    }

    /// Get a copy of the current configuration.
    ///
    /// Cloning releases the read lock immediately.
    pub fn get_config(&self) -> AppConfig {
        self.config.read().unwrap().clone()
    }

    /// Edit the configuration in place and validate the result.
    ///
    /// `apply` runs on a copy while the write lock is held, so concurrent
    /// updates serialise instead of overwriting each other. The copy only
    /// replaces the live config when `apply` and validation both succeed.
    /// A change to the `remote` base URL or timeout discards the cached
    /// chatbot client so the next request builds one against the new settings.
    pub fn update_config<F>(&self, apply: F) -> Result<AppConfig, String>
    where
        F: FnOnce(&mut AppConfig) -> anyhow::Result<()>,
    {
        let (updated, remote_changed) = {
            let mut config = self.config.write().unwrap();
            let mut candidate = config.clone();
            apply(&mut candidate).map_err(|e| e.to_string())?;
            candidate.validate().map_err(|e| e.to_string())?;

            let remote_changed = config.remote.base_url != candidate.remote.base_url
                || config.remote.timeout_secs != candidate.remote.timeout_secs;
            *config = candidate.clone();
            (candidate, remote_changed)
        };

        if remote_changed {
            *self.chatbot.write().unwrap() = None;
            info!("Remote API settings changed, chatbot client will be rebuilt");
        }

        Ok(updated)
    }

    /// Get the chatbot client, building it on first use.
    pub fn chatbot(&self) -> AppResult<ChatbotClient> {
        if let Some(client) = self.chatbot.read().unwrap().as_ref() {
            return Ok(client.clone());
        }

        // Read the config before taking the client slot: update_config locks
        // config first, then the slot.
        let config = self.get_config();
        let mut slot = self.chatbot.write().unwrap();
        if let Some(client) = slot.as_ref() {
            return Ok(client.clone());
        }

        let client = ChatbotClient::new(&config)?;
        info!(url = %client.chat_url(), "Chatbot client initialized");
        *slot = Some(client.clone());
        Ok(client)
    }

    pub fn chatbot_initialized(&self) -> bool {
        self.chatbot.read().unwrap().is_some()
    }

    pub fn increment_request_count(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.request_count += 1;
    }

    pub fn increment_error_count(&self) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.error_count += 1;
    }

    /// Record one finished request against its route.
    pub fn record_endpoint_request(&self, endpoint: &str, duration_ms: u64, is_error: bool) {
        let mut metrics = self.metrics.write().unwrap();
        let endpoint_metric = metrics.endpoint_metrics.entry(endpoint.to_string()).or_default();

        endpoint_metric.request_count += 1;
        endpoint_metric.total_duration_ms += duration_ms;

        if is_error {
            endpoint_metric.error_count += 1;
        }
    }

    /// Count a voice session as active until the returned guard is dropped.
    pub fn begin_session(&self) -> ActiveSessionGuard {
        self.metrics.write().unwrap().active_sessions += 1;
        ActiveSessionGuard { state: self.clone() }
    }

    pub fn record_conversion(&self, duration_seconds: f64) {
        let mut metrics = self.metrics.write().unwrap();
        metrics.recordings_converted += 1;
        metrics.audio_seconds_converted += duration_seconds;
    }

    /// Consistent copy of the metrics, taken under one read lock.
    pub fn get_metrics_snapshot(&self) -> AppMetrics {
        self.metrics.read().unwrap().clone()
    }

    pub fn get_uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

impl EndpointMetric {
    pub fn average_duration_ms(&self) -> f64 {
        if self.request_count > 0 {
            self.total_duration_ms as f64 / self.request_count as f64
        } else {
            0.0
        }
    }

    /// Fraction of requests that failed (0.0 to 1.0).
    pub fn error_rate(&self) -> f64 {
        if self.request_count > 0 {
            self.error_count as f64 / self.request_count as f64
        } else {
            0.0
        }
    }
}
