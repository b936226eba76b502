use core::sync::atomic::{AtomicU32, Ordering};
use std::{thread, time::Duration};

use anyhow::{anyhow, Context};
use embedded_svc::{
    http::{client::Client as HttpClient, Method, Status},
    io::Read,
    wifi::{AuthMethod, ClientConfiguration, Configuration},
};
use esp_idf_hal::{modem::Modem, prelude::Peripherals};
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    http::client::{Configuration as HttpClientConfiguration, EspHttpConnection},
    log::EspLogger,
    nvs::{EspDefaultNvsPartition, EspNvs},
    wifi::{BlockingWifi, EspWifi},
};
use log::{info, warn};

use dashboard_common::{
    sleep, ConfigFetcher, HttpFetch, HttpResponse, NetworkConfig, Panel, PowerControl,
    RuntimeConfig, SleepArmed, TransportError, WakeCause, WakeCounter, WakeCycleController,
};

const NVS_NAMESPACE: &str = "dashboard";
const NVS_RUNTIME_KEY: &str = "runtime_json";
const MAX_DESCRIPTOR_BODY: usize = 4096;
const MAX_IMAGE_BODY: usize = 512 * 1024;
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
const WIFI_CONNECT_ATTEMPTS: u32 = 5;
const WIFI_RETRY_DELAY_MS: u64 = 3_000;

// Lives in RTC fast memory: survives deep sleep, zeroed on cold power-on.
#[link_section = ".rtc.data"]
static WAKEUP_COUNTER: AtomicU32 = AtomicU32::new(0);

struct RtcWakeCounter;

impl WakeCounter for RtcWakeCounter {
    fn get(&self) -> u32 {
        WAKEUP_COUNTER.load(Ordering::Relaxed)
    }

    fn increment(&mut self) -> u32 {
        WAKEUP_COUNTER.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn reset(&mut self) {
        WAKEUP_COUNTER.store(0, Ordering::Relaxed);
    }
}

struct NvsStore {
    partition: EspDefaultNvsPartition,
}

impl NvsStore {
    fn load_runtime_config(&self) -> anyhow::Result<RuntimeConfig> {
        let mut nvs = EspNvs::new(self.partition.clone(), NVS_NAMESPACE, true)?;
        let mut buffer = vec![0_u8; 4096];

        match nvs.get_str(NVS_RUNTIME_KEY, &mut buffer)? {
            Some(value) => Ok(serde_json::from_str::<RuntimeConfig>(value)?),
            None => Ok(RuntimeConfig::default()),
        }
    }
}

struct EspPowerControl {
    wake_pin: i32,
}

impl PowerControl for EspPowerControl {
    fn wake_cause(&self) -> WakeCause {
        use esp_idf_svc::sys;

        match unsafe { sys::esp_sleep_get_wakeup_cause() } {
            sys::esp_sleep_source_t_ESP_SLEEP_WAKEUP_TIMER => WakeCause::TimerAlarm,
            sys::esp_sleep_source_t_ESP_SLEEP_WAKEUP_EXT0 => WakeCause::ExternalPin,
            sys::esp_sleep_source_t_ESP_SLEEP_WAKEUP_UNDEFINED => WakeCause::PowerOn,
            _ => WakeCause::Other,
        }
    }

    fn enter_deep_sleep(&mut self, duration_secs: u32) -> SleepArmed {
        info!(
            "entering deep sleep for {duration_secs} s, wake pin GPIO{}",
            self.wake_pin
        );
        unsafe {
            esp_idf_svc::sys::esp_sleep_enable_timer_wakeup(u64::from(duration_secs) * 1_000_000);
            esp_idf_svc::sys::esp_sleep_enable_ext0_wakeup(self.wake_pin, 0);
            esp_idf_svc::sys::esp_deep_sleep_start();
        }
        unreachable!("deep sleep entry returned");
    }
}

struct EspHttpFetch {
    client: HttpClient<EspHttpConnection>,
}

impl EspHttpFetch {
    fn new() -> anyhow::Result<Self> {
        Ok(Self {
            client: new_http_client()?,
        })
    }
}

impl HttpFetch for EspHttpFetch {
    fn get(&mut self, url: &str) -> Result<HttpResponse, TransportError> {
        let request = self
            .client
            .request(Method::Get, url, &[])
            .map_err(transport_err)?;
        let mut response = request.submit().map_err(transport_err)?;
        let status = response.status();
        let body = read_body(&mut response, MAX_DESCRIPTOR_BODY)?;
        Ok(HttpResponse { status, body })
    }

    fn pause(&mut self, delay: Duration) {
        thread::sleep(delay);
    }
}

/// Working frame state for the e-paper glass. Image bytes are fetched over
/// HTTP here; pushing the committed frame through the board's panel driver
/// (SPI setup, waveform selection, pixel packing) is the integration point
/// left to the display layer.
struct EpdPanel {
    client: HttpClient<EspHttpConnection>,
    frame: Vec<u8>,
    /// Last committed frame, restored before a partial update so the
    /// commit only touches changed regions.
    baseline: Vec<u8>,
    banner: Option<String>,
}

impl EpdPanel {
    fn new() -> anyhow::Result<Self> {
        Ok(Self {
            client: new_http_client()?,
            frame: Vec::new(),
            baseline: Vec::new(),
            banner: None,
        })
    }

    fn download(&mut self, url: &str) -> Result<Vec<u8>, TransportError> {
        let request = self
            .client
            .request(Method::Get, url, &[])
            .map_err(transport_err)?;
        let mut response = request.submit().map_err(transport_err)?;
        let status = response.status();
        if status != 200 {
            return Err(TransportError(format!(
                "image request returned HTTP {status}"
            )));
        }
        read_body(&mut response, MAX_IMAGE_BODY)
    }
}

impl Panel for EpdPanel {
    fn clear_frame(&mut self) {
        self.frame.clear();
        self.banner = None;
    }

    fn draw_image(&mut self, url: &str) -> bool {
        match self.download(url) {
            Ok(bytes) if !bytes.is_empty() => {
                info!("image `{url}` loaded, {} bytes", bytes.len());
                self.frame = bytes;
                true
            }
            Ok(_) => {
                warn!("image `{url}` came back empty");
                false
            }
            Err(err) => {
                warn!("image `{url}` failed to load: {err}");
                false
            }
        }
    }

    fn restore_prior_frame(&mut self, url: &str) -> bool {
        match self.download(url) {
            Ok(bytes) if !bytes.is_empty() => {
                info!("archived frame `{url}` restored as baseline");
                self.baseline = bytes;
                true
            }
            Ok(_) => {
                warn!("archived frame `{url}` came back empty");
                false
            }
            Err(err) => {
                warn!("archived frame `{url}` unavailable: {err}");
                false
            }
        }
    }

    fn draw_error_banner(&mut self, message: &str) {
        self.banner = Some(message.to_string());
    }

    fn commit_partial(&mut self) {
        info!(
            "partial panel commit, {} bytes against {} baseline bytes",
            self.frame.len(),
            self.baseline.len()
        );
    }

    fn commit_full(&mut self) {
        match &self.banner {
            Some(banner) => info!("full panel commit with banner `{banner}`"),
            None => info!("full panel commit, {} bytes", self.frame.len()),
        }
    }
}

pub fn run() -> anyhow::Result<()> {
    esp_idf_svc::sys::link_patches();
    EspLogger::initialize_default();

    let sys_loop = EspSystemEventLoop::take()?;
    let nvs_partition = EspDefaultNvsPartition::take()?;
    let nvs_store = NvsStore {
        partition: nvs_partition.clone(),
    };

    let mut runtime = nvs_store.load_runtime_config().unwrap_or_else(|err| {
        warn!("failed to load runtime config from NVS: {err:#}");
        RuntimeConfig::default()
    });
    runtime.dashboard.sanitize();
    ensure_wifi_defaults(&mut runtime);

    info!(
        "dashboard config: server `{}`, room `{}`, ssid `{}`",
        runtime.dashboard.server_url, runtime.dashboard.room, runtime.network.wifi_ssid
    );

    let Peripherals { modem, .. } = Peripherals::take()?;

    let mut counter = RtcWakeCounter;
    let mut power = EspPowerControl {
        wake_pin: runtime.dashboard.wake_pin,
    };
    let mut panel = EpdPanel::new().context("failed to initialize panel image client")?;

    let _wifi = match connect_wifi(modem, sys_loop, nvs_partition, &runtime.network) {
        Ok(wifi) => wifi,
        Err(err) => {
            // Never stay awake on battery: surface the failure on the
            // panel and retry after the fallback interval.
            warn!("wifi startup failed: {err:#}");
            panel.clear_frame();
            panel.draw_error_banner("network unavailable");
            panel.commit_full();
            sleep::schedule_fallback(&mut power);
            return Ok(());
        }
    };

    let fetcher = ConfigFetcher::new(&runtime.dashboard.server_url, &runtime.dashboard.room);
    let mut transport = EspHttpFetch::new().context("failed to initialize descriptor client")?;
    let mut controller = WakeCycleController::new(fetcher);

    // enter_deep_sleep is terminal on hardware; the report is only ever
    // observed by the host and test backends.
    let _report = controller.run(&mut transport, &mut panel, &mut power, &mut counter);
    Ok(())
}

fn ensure_wifi_defaults(runtime: &mut RuntimeConfig) {
    if runtime.network.wifi_ssid.is_empty() {
        if let Some(ssid) = option_env!("WIFI_SSID") {
            runtime.network.wifi_ssid = ssid.to_string();
        }
    }

    if runtime.network.wifi_pass.is_empty() {
        if let Some(pass) = option_env!("WIFI_PASS") {
            runtime.network.wifi_pass = pass.to_string();
        }
    }
}

fn new_http_client() -> anyhow::Result<HttpClient<EspHttpConnection>> {
    let conf = HttpClientConfiguration {
        timeout: Some(HTTP_TIMEOUT),
        crt_bundle_attach: Some(esp_idf_svc::sys::esp_crt_bundle_attach),
        ..Default::default()
    };
    Ok(HttpClient::wrap(EspHttpConnection::new(&conf)?))
}

fn transport_err(err: impl core::fmt::Debug) -> TransportError {
    TransportError(format!("{err:?}"))
}

fn read_body<R>(reader: &mut R, cap: usize) -> Result<Vec<u8>, TransportError>
where
    R: Read,
    R::Error: core::fmt::Debug,
{
    let mut body = Vec::new();
    let mut chunk = [0_u8; 1024];

    loop {
        let read = reader.read(&mut chunk).map_err(transport_err)?;
        if read == 0 {
            break;
        }
        if body.len() + read > cap {
            return Err(TransportError(format!("response body exceeds {cap} bytes")));
        }
        body.extend_from_slice(&chunk[..read]);
    }

    Ok(body)
}

fn connect_wifi(
    modem: Modem,
    sys_loop: EspSystemEventLoop,
    nvs_partition: EspDefaultNvsPartition,
    network: &NetworkConfig,
) -> anyhow::Result<EspWifi<'static>> {
    let mut esp_wifi = EspWifi::new(modem, sys_loop.clone(), Some(nvs_partition))?;
    let mut wifi = BlockingWifi::wrap(&mut esp_wifi, sys_loop)?;

    if network.wifi_ssid.trim().is_empty() {
        return Err(anyhow!("wifi credentials missing"));
    }

    let auth_method = if network.wifi_pass.is_empty() {
        AuthMethod::None
    } else {
        AuthMethod::WPAWPA2Personal
    };

    wifi.set_configuration(&Configuration::Client(ClientConfiguration {
        ssid: network
            .wifi_ssid
            .as_str()
            .try_into()
            .map_err(|_| anyhow!("wifi ssid too long"))?,
        password: network
            .wifi_pass
            .as_str()
            .try_into()
            .map_err(|_| anyhow!("wifi password too long"))?,
        auth_method,
        ..Default::default()
    }))?;

    wifi.start()?;
    info!("wifi started, connecting to `{}`", network.wifi_ssid);

    let mut last_err = None;
    for attempt in 1..=WIFI_CONNECT_ATTEMPTS {
        info!("wifi connect attempt {attempt}/{WIFI_CONNECT_ATTEMPTS}");
        match wifi.connect() {
            Ok(()) => match wifi.wait_netif_up() {
                Ok(()) => {
                    info!("wifi connected and netif up on attempt {attempt}");
                    last_err = None;
                    break;
                }
                Err(err) => {
                    warn!("wifi netif up failed on attempt {attempt}: {err:#}");
                    last_err = Some(err);
                }
            },
            Err(err) => {
                warn!("wifi connect failed on attempt {attempt}: {err:#}");
                last_err = Some(err);
            }
        }

        if attempt < WIFI_CONNECT_ATTEMPTS {
            let _ = wifi.disconnect();
            thread::sleep(Duration::from_millis(WIFI_RETRY_DELAY_MS));
        }
    }

    match last_err {
        None => Ok(esp_wifi),
        Some(err) => {
            Err(anyhow::Error::from(err)
                .context(format!("all {WIFI_CONNECT_ATTEMPTS} wifi connect attempts failed")))
        }
    }
}
