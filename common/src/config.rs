use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EndpointConfig {
    pub host: String,
    pub username: String,
    pub password: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            host: "192.168.0.23".to_string(),
            username: String::new(),
            password: "199312".to_string(),
        }
    }
}

impl EndpointConfig {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.host.trim_end_matches('/'), path)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PollConfig {
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            retry_delay_ms: 2_000,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BacklightConfig {
    pub active_level: u8,
    pub dim_level: u8,
    pub idle_timeout_ms: u64,
}

impl Default for BacklightConfig {
    fn default() -> Self {
        Self {
            active_level: 255,
            dim_level: 5,
            idle_timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScreenConfig {
    pub width: u16,
    pub height: u16,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            width: 240,
            height: 240,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct NetworkConfig {
    pub wifi_ssid: String,
    pub wifi_pass: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct PanelConfig {
    pub endpoint: EndpointConfig,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub backlight: BacklightConfig,
    #[serde(default)]
    pub screen: ScreenConfig,
    #[serde(default)]
    pub network: NetworkConfig,
}

impl PanelConfig {
    pub fn sanitize(&mut self) {
        if self.endpoint.host.trim().is_empty() {
            self.endpoint.host = EndpointConfig::default().host;
        }

        if self.poll.max_attempts == 0 {
            self.poll.max_attempts = PollConfig::default().max_attempts;
        }

        if self.backlight.dim_level > self.backlight.active_level {
            self.backlight.dim_level = self.backlight.active_level;
        }

        if self.screen.width == 0 || self.screen.height == 0 {
            self.screen = ScreenConfig::default();
        }
    }
}
