use serde::{Deserialize, Serialize};

/// Device-side dashboard tuning. Persisted on the device as JSON in NVS;
/// field names stay camelCase on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(rename = "serverUrl")]
    pub server_url: String,
    pub room: String,
    /// GPIO armed as the external wake source before every deep-sleep
    /// entry.
    #[serde(rename = "wakePin")]
    pub wake_pin: i32,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            server_url: "http://192.168.1.100:8080".to_string(),
            room: "livingroom".to_string(),
            wake_pin: 39,
        }
    }
}

impl DashboardConfig {
    pub fn sanitize(&mut self) {
        if self.server_url.trim().is_empty() {
            self.server_url = DashboardConfig::default().server_url;
        }
        if self.room.trim().is_empty() {
            self.room = DashboardConfig::default().room;
        }
        if !(0..=48).contains(&self.wake_pin) {
            self.wake_pin = DashboardConfig::default().wake_pin;
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(rename = "wifiSsid")]
    pub wifi_ssid: String,
    #[serde(rename = "wifiPass")]
    pub wifi_pass: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub network: NetworkConfig,
}
