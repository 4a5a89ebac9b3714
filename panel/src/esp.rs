use core::convert::TryInto;
use std::{
    sync::OnceLock,
    thread,
    time::{Duration, Instant},
};

use anyhow::{anyhow, Context};
use embedded_svc::{
    http::{client::Client as HttpClient, Method, Status},
    io::Read,
    wifi::{AuthMethod, ClientConfiguration, Configuration},
};
use esp_idf_hal::{
    delay::{Ets, BLOCK},
    gpio::{AnyIOPin, IOPin, Output, PinDriver},
    i2c::{config::Config as I2cConfig, I2cDriver},
    ledc::{config::TimerConfig, LedcDriver, LedcTimerDriver},
    prelude::*,
    spi::{
        config::{Config as SpiConfig, DriverConfig as SpiDriverConfig, MODE_0},
        SpiDeviceDriver,
    },
};
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    hal::modem::Modem,
    http::client::{Configuration as HttpClientConfiguration, EspHttpConnection},
    log::EspLogger,
    nvs::EspDefaultNvsPartition,
    wifi::{BlockingWifi, EspWifi},
};
use log::{debug, error, info, warn};
use mipidsi::{
    interface::SpiInterface,
    models::GC9A01,
    options::{ColorInversion, ColorOrder},
    Builder,
};

use setpoint_common::{
    basic_auth_value,
    touch::{CST816_ADDR_7BIT, CST816_REG_GESTURE, CST816_REPORT_LEN},
    Backlight, Delay, EndpointConfig, HttpResponse, InactivityMonitor, NetworkConfig,
    PanelConfig, RoundPanel, SyncController, SyncError, TouchDispatcher, TouchPoint, Transport,
    TransportError,
};

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_HTTP_BODY: usize = 8192;
const HTTP_CHUNK_SIZE: usize = 512;
const WIFI_RETRY_DELAY_MS: u64 = 1_000;
const LOOP_TICK_MS: u64 = 10;
const RESTART_GRACE_MS: u64 = 1_000;

const LCD_SIZE: u16 = 240;
const BACKLIGHT_PWM_HZ: u32 = 5_000;

struct EspTransport {
    endpoint: EndpointConfig,
    authorization: String,
}

impl EspTransport {
    fn new(endpoint: EndpointConfig) -> Self {
        let authorization = basic_auth_value(&endpoint.username, &endpoint.password);
        Self {
            endpoint,
            authorization,
        }
    }
}

impl Transport for EspTransport {
    fn get(&mut self, path: &str) -> Result<HttpResponse, TransportError> {
        let url = self.endpoint.url(path);
        let connect_err = |reason: String| TransportError::Connect {
            url: url.clone(),
            reason,
        };

        // The connection lives only for this call and closes on drop.
        let connection = EspHttpConnection::new(&HttpClientConfiguration {
            timeout: Some(HTTP_TIMEOUT),
            ..Default::default()
        })
        .map_err(|err| connect_err(format!("{err:?}")))?;
        let mut client = HttpClient::wrap(connection);

        let headers = [("Authorization", self.authorization.as_str())];
        let request = client
            .request(Method::Get, &url, &headers)
            .map_err(|err| connect_err(format!("{err:?}")))?;
        let mut response = request
            .submit()
            .map_err(|err| connect_err(format!("{err:?}")))?;

        let status = response.status();
        let mut body = Vec::new();
        let mut chunk = [0_u8; HTTP_CHUNK_SIZE];
        loop {
            let read = response
                .read(&mut chunk)
                .map_err(|err| TransportError::Body(format!("{err:?}")))?;
            if read == 0 {
                break;
            }
            if body.len() + read > MAX_HTTP_BODY {
                warn!("response from {url} exceeds {MAX_HTTP_BODY} bytes; truncating");
                break;
            }
            body.extend_from_slice(&chunk[..read]);
        }

        Ok(HttpResponse {
            status,
            body: String::from_utf8_lossy(&body).into_owned(),
        })
    }
}

struct ThreadDelay;

impl Delay for ThreadDelay {
    fn delay_ms(&mut self, ms: u64) {
        thread::sleep(Duration::from_millis(ms));
    }
}

struct PwmBacklight {
    channel: LedcDriver<'static>,
}

impl Backlight for PwmBacklight {
    fn set_level(&mut self, level: u8) {
        let duty = self.channel.get_max_duty() * u32::from(level) / 255;
        if let Err(err) = self.channel.set_duty(duty) {
            warn!("failed to set backlight duty {duty}: {err:?}");
        }
    }
}

struct Cst816 {
    i2c: I2cDriver<'static>,
    _reset: PinDriver<'static, AnyIOPin, Output>,
}

impl Cst816 {
    fn new(i2c: I2cDriver<'static>, reset: AnyIOPin) -> anyhow::Result<Self> {
        let mut reset = PinDriver::output(reset)?;
        reset.set_low()?;
        thread::sleep(Duration::from_millis(10));
        reset.set_high()?;
        thread::sleep(Duration::from_millis(50));
        Ok(Self { i2c, _reset: reset })
    }

    fn read(&mut self) -> Option<TouchPoint> {
        let mut raw = [0_u8; CST816_REPORT_LEN];
        // The controller NACKs while asleep between touches.
        if let Err(err) =
            self.i2c
                .write_read(CST816_ADDR_7BIT, &[CST816_REG_GESTURE], &mut raw, BLOCK)
        {
            debug!("cst816 read failed: {err:?}");
            return None;
        }
        setpoint_common::parse_cst816_report(&raw)
    }
}

pub fn run() -> anyhow::Result<()> {
    esp_idf_svc::sys::link_patches();
    EspLogger::initialize_default();

    let mut config = PanelConfig::default();
    ensure_wifi_defaults(&mut config.network);
    config.sanitize();

    let peripherals = Peripherals::take()?;
    let pins = peripherals.pins;
    let sys_loop = EspSystemEventLoop::take()?;
    let nvs_partition = EspDefaultNvsPartition::take()?;

    let ledc_timer = LedcTimerDriver::new(
        peripherals.ledc.timer0,
        &TimerConfig::default().frequency(BACKLIGHT_PWM_HZ.Hz().into()),
    )?;
    let backlight = PwmBacklight {
        channel: LedcDriver::new(peripherals.ledc.channel0, ledc_timer, pins.gpio3)?,
    };
    let mut monitor = InactivityMonitor::new(backlight, config.backlight);
    monitor.wake(monotonic_ms());

    let _wifi = connect_wifi(peripherals.modem, sys_loop, nvs_partition, &config.network)
        .context("wifi startup failed")?;

    let spi = SpiDeviceDriver::new_single(
        peripherals.spi2,
        pins.gpio6,
        pins.gpio7,
        Option::<AnyIOPin>::None,
        Some(pins.gpio10),
        &SpiDriverConfig::new(),
        &SpiConfig::new().baudrate(40.MHz().into()).data_mode(MODE_0),
    )
    .context("failed to init LCD SPI")?;
    let dc = PinDriver::output(pins.gpio2)?;
    let mut spi_buffer = [0_u8; 512];
    let mut delay = Ets;
    let lcd = Builder::new(GC9A01, SpiInterface::new(spi, dc, &mut spi_buffer))
        .display_size(LCD_SIZE, LCD_SIZE)
        .color_order(ColorOrder::Bgr)
        .invert_colors(ColorInversion::Inverted)
        .init(&mut delay)
        .map_err(|err| anyhow!("failed to init GC9A01 display: {err:?}"))?;

    let touch_i2c = I2cDriver::new(
        peripherals.i2c0,
        pins.gpio4,
        pins.gpio5,
        &I2cConfig::new().baudrate(400.kHz().into()),
    )
    .context("failed to init touch I2C")?;
    let mut touch = Cst816::new(touch_i2c, pins.gpio1.downgrade())?;

    let mut sync = SyncController::new(
        EspTransport::new(config.endpoint.clone()),
        RoundPanel::new(lcd, config.screen),
        ThreadDelay,
        config.poll,
    );
    let dispatcher = TouchDispatcher::new(config.screen);

    info!("panel polling {}", config.endpoint.url("/"));

    loop {
        if let Err(err) = sync.poll_until_initial() {
            restart_device(err);
        }

        monitor.check(monotonic_ms());

        if let Some(point) = touch.read() {
            if let Err(err) = dispatcher.dispatch(point, monotonic_ms(), &mut sync, &mut monitor)
            {
                restart_device(err);
            }
        }

        thread::sleep(Duration::from_millis(LOOP_TICK_MS));
    }
}

fn restart_device(reason: SyncError) -> ! {
    error!("{reason}; restarting device");
    thread::sleep(Duration::from_millis(RESTART_GRACE_MS));
    unsafe { esp_idf_svc::sys::esp_restart() };
    #[allow(unreachable_code)]
    loop {
        thread::sleep(Duration::from_secs(1));
    }
}

fn ensure_wifi_defaults(network: &mut NetworkConfig) {
    if network.wifi_ssid.is_empty() {
        network.wifi_ssid = option_env!("WIFI_SSID").unwrap_or("CHANGE_ME").to_string();
    }

    if network.wifi_pass.is_empty() {
        network.wifi_pass = option_env!("WIFI_PASS").unwrap_or("CHANGE_ME").to_string();
    }
}

fn connect_wifi(
    modem: Modem,
    sys_loop: EspSystemEventLoop,
    nvs_partition: EspDefaultNvsPartition,
    network: &NetworkConfig,
) -> anyhow::Result<Box<EspWifi<'static>>> {
    let mut esp_wifi = Box::new(EspWifi::new(modem, sys_loop.clone(), Some(nvs_partition))?);
    let mut wifi = BlockingWifi::wrap(esp_wifi.as_mut(), sys_loop)?;

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

    let mut attempt: u32 = 0;
    loop {
        attempt = attempt.saturating_add(1);
        match wifi.connect().and_then(|()| wifi.wait_netif_up()) {
            Ok(()) => {
                info!("wifi connected on attempt {attempt}");
                break;
            }
            Err(err) => {
                warn!("wifi connect attempt {attempt} failed: {err:#}");
                let _ = wifi.disconnect();
                thread::sleep(Duration::from_millis(WIFI_RETRY_DELAY_MS));
            }
        }
    }

    drop(wifi);
    Ok(esp_wifi)
}

fn monotonic_ms() -> u64 {
    static START: OnceLock<Instant> = OnceLock::new();
    START
        .get_or_init(Instant::now)
        .elapsed()
        .as_millis()
        .try_into()
        .unwrap_or(u64::MAX)
}
