use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Orchestrator bounds (`SPEC_FULL.md` §4.5) — not meant to be tuned per
/// deployment, but kept as config rather than literals so tests can shrink
/// them.
pub const MAX_TOTAL_CALLS: u32 = 10;
pub const MAX_CONSECUTIVE_SAME_TOOL: u32 = 3;

/// Deferred-dispatcher timing constants (`SPEC_FULL.md` §4.7).
pub const ACTIVE_SESSION_REQUEUE_SECS: i64 = 60;
pub const TEXT_MESSAGE_INGRESS_DELAY_SECS: i64 = 60;

/// Echo-filter ring size (`SPEC_FULL.md` §4.6).
pub const ECHO_FILTER_WINDOW: usize = 10;

/// Top-level configuration: a TOML file with `VOXA_`-prefixed environment
/// variable overrides, the same file-then-env layering this codebase's
/// config loader has always used.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoxaConfig {
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    pub provider: ProviderConfig,
    #[serde(default)]
    pub dispatcher: DispatcherConfig,
    #[serde(default)]
    pub device_channel: DeviceChannelConfig,
    #[serde(default)]
    pub live_model: LiveModelConfig,
}

impl Default for VoxaConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            database: DatabaseConfig::default(),
            provider: ProviderConfig::default(),
            dispatcher: DispatcherConfig::default(),
            device_channel: DeviceChannelConfig::default(),
            live_model: LiveModelConfig::default(),
        }
    }
}

/// Session-gateway bind address and audio framing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
    /// PCM sample rate the gateway expects on the client→model path.
    #[serde(default = "default_send_rate")]
    pub send_sample_rate_hz: u32,
    /// PCM sample rate the gateway emits on the model→client path.
    #[serde(default = "default_receive_rate")]
    pub receive_sample_rate_hz: u32,
    /// End-of-conversation playback drain ceiling, per §5.
    #[serde(default = "default_drain_ceiling_ms")]
    pub drain_ceiling_ms: u64,
    /// Quiescence window used to detect "model finished speaking" after
    /// `end_conversation`, per §4.6.
    #[serde(default = "default_quiescence_ms")]
    pub quiescence_ms: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
            send_sample_rate_hz: default_send_rate(),
            receive_sample_rate_hz: default_receive_rate(),
            drain_ceiling_ms: default_drain_ceiling_ms(),
            quiescence_ms: default_quiescence_ms(),
        }
    }
}

/// Auxiliary language-model call configuration (structured-argument
/// extraction, selector, compose-reply — §4.3/4.4; distinct from the
/// full-duplex live model session, which is an external collaborator
/// per §6 and has no config of its own here).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Which backend to use for the auxiliary calls: "anthropic", "openai",
    /// or "ollama". The core works against any model exposing the chat
    /// contract — this just picks which adapter to construct.
    #[serde(default = "default_provider_kind")]
    pub kind: String,
    #[serde(default = "default_model")]
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: default_provider_kind(),
            model: default_model(),
            api_key: None,
            base_url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Deferred Dispatcher (C7) tick cadence and job-requeue behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherConfig {
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,
    #[serde(default = "default_requeue_secs")]
    pub active_session_requeue_secs: i64,
    #[serde(default = "default_text_message_delay_secs")]
    pub text_message_delay_secs: i64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            tick_secs: default_tick_secs(),
            active_session_requeue_secs: default_requeue_secs(),
            text_message_delay_secs: default_text_message_delay_secs(),
        }
    }
}

/// Out-of-band device-wake control channel (C8).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DeviceChannelConfig {
    /// Endpoint of the authenticated device-management channel. `None`
    /// disables wake delivery (jobs are logged and dropped) — useful in
    /// environments without a provisioned IoT fleet.
    pub wake_endpoint: Option<String>,
    pub auth_token: Option<String>,
}

/// Outbound connection to the full-duplex live model provider (§4.2). This
/// is a distinct collaborator from `ProviderConfig`'s auxiliary chat calls —
/// it speaks a streaming audio/event protocol over a WebSocket, not a
/// request/response chat contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveModelConfig {
    #[serde(default = "default_live_model_url")]
    pub url: String,
    pub api_key: Option<String>,
    #[serde(default = "default_live_model_name")]
    pub model: String,
}

impl Default for LiveModelConfig {
    fn default() -> Self {
        Self {
            url: default_live_model_url(),
            api_key: None,
            model: default_live_model_name(),
        }
    }
}

fn default_live_model_url() -> String {
    "wss://api.anthropic.com/v1/live".to_string()
}
fn default_live_model_name() -> String {
    "claude-sonnet-4-5".to_string()
}

fn default_port() -> u16 {
    8700
}
fn default_bind() -> String {
    "0.0.0.0".to_string()
}
fn default_send_rate() -> u32 {
    16_000
}
fn default_receive_rate() -> u32 {
    24_000
}
fn default_drain_ceiling_ms() -> u64 {
    10_000
}
fn default_quiescence_ms() -> u64 {
    1_000
}
fn default_provider_kind() -> String {
    "anthropic".to_string()
}
fn default_model() -> String {
    "claude-sonnet-4-5".to_string()
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.voxa/voxa.db", home)
}
fn default_tick_secs() -> u64 {
    1
}
fn default_requeue_secs() -> i64 {
    ACTIVE_SESSION_REQUEUE_SECS
}
fn default_text_message_delay_secs() -> i64 {
    TEXT_MESSAGE_INGRESS_DELAY_SECS
}

impl VoxaConfig {
    /// Load config from a TOML file with `VOXA_*` env var overrides.
    ///
    /// Checks, in order: an explicit path argument, then `~/.voxa/voxa.toml`.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: VoxaConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("VOXA_").split("_"))
            .extract()
            .map_err(|e| crate::error::SkynetError::Config(e.to_string()))?;

        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.voxa/voxa.toml", home)
}
