use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct PanelConfig {
    pub server: ServerSettings,
    #[serde(default)]
    pub websocket: WebSocketSettings,
    #[serde(default)]
    pub listen: ListenSettings,
    #[serde(default)]
    pub builder: BuilderSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub base_url: String,
    /// Derived from `base_url` when absent
    pub ws_url: Option<String>,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WebSocketSettings {
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
}

impl Default for WebSocketSettings {
    fn default() -> Self {
        Self {
            reconnect_delay_ms: default_reconnect_delay_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ListenSettings {
    #[serde(default = "default_listen_addr")]
    pub addr: String,
}

impl Default for ListenSettings {
    fn default() -> Self {
        Self {
            addr: default_listen_addr(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct BuilderSettings {
    #[serde(default = "default_min_cell_px")]
    pub min_cell_px: f64,
    #[serde(default = "default_cell_px")]
    pub default_cell_px: f64,
}

impl Default for BuilderSettings {
    fn default() -> Self {
        Self {
            min_cell_px: default_min_cell_px(),
            default_cell_px: default_cell_px(),
        }
    }
}

fn default_request_timeout_ms() -> u64 {
    5000
}

fn default_reconnect_delay_ms() -> u64 {
    3000
}

fn default_listen_addr() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_min_cell_px() -> f64 {
    10.0
}

fn default_cell_px() -> f64 {
    30.0
}

impl ServerSettings {
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// `http(s)://host/...` becomes `ws(s)://host/.../ws`
    pub fn ws_url(&self) -> String {
        if let Some(url) = &self.ws_url {
            return url.clone();
        }
        let base = self.base_url();
        let ws = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            base.to_string()
        };
        format!("{}/ws", ws)
    }
}

/// `config/panel.toml` (optional) overlaid with `SPLITFLAP_SERVER__BASE_URL`-style variables
pub fn load_panel_config() -> anyhow::Result<PanelConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/panel").required(false))
        .add_source(config::Environment::with_prefix("SPLITFLAP").separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}
