use std::{
    io::BufRead,
    path::Path,
    sync::{
        mpsc::{self, Receiver, RecvTimeoutError},
        OnceLock,
    },
    thread,
    time::{Duration, Instant},
};

use anyhow::Context;
use tracing::{info, warn};

use setpoint_common::{
    basic_auth_value, Backlight, Command, Delay, Display, EndpointConfig, FrameBuffer,
    HttpResponse, InactivityMonitor, PanelConfig, RoundPanel, SyncController, TouchDispatcher,
    TouchPoint, Transport, TransportError,
};

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);
const LOOP_TICK: Duration = Duration::from_millis(20);

struct UreqTransport {
    agent: ureq::Agent,
    endpoint: EndpointConfig,
    authorization: String,
}

impl UreqTransport {
    fn new(endpoint: EndpointConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(HTTP_TIMEOUT)
            .max_idle_connections(0)
            .build();
        let authorization = basic_auth_value(&endpoint.username, &endpoint.password);
        Self {
            agent,
            endpoint,
            authorization,
        }
    }
}

impl Transport for UreqTransport {
    fn get(&mut self, path: &str) -> Result<HttpResponse, TransportError> {
        let url = self.endpoint.url(path);
        let response = match self
            .agent
            .get(&url)
            .set("Authorization", &self.authorization)
            .call()
        {
            Ok(response) | Err(ureq::Error::Status(_, response)) => response,
            Err(ureq::Error::Transport(err)) => {
                return Err(TransportError::Connect {
                    url,
                    reason: err.to_string(),
                })
            }
        };

        let status = response.status();
        let body = response
            .into_string()
            .map_err(|err| TransportError::Body(err.to_string()))?;
        Ok(HttpResponse { status, body })
    }
}

struct SleepDelay;

impl Delay for SleepDelay {
    fn delay_ms(&mut self, ms: u64) {
        thread::sleep(Duration::from_millis(ms));
    }
}

struct HostDisplay {
    panel: RoundPanel<FrameBuffer>,
}

impl Display for HostDisplay {
    fn show_setpoint(&mut self, setpoint: &str) {
        info!("[screen] Temp Set: {setpoint} F");
        self.panel.show_setpoint(setpoint);
    }

    fn show_error(&mut self, message: &str) {
        info!("[screen] {message}");
        self.panel.show_error(message);
    }

    fn show_status_code(&mut self, status: u16) {
        info!("[screen] {status}");
        self.panel.show_status_code(status);
    }

    fn show_button(&mut self, command: Command, pressed: bool) {
        self.panel.show_button(command, pressed);
    }
}

#[derive(Default)]
struct HostBacklight {
    level: Option<u8>,
}

impl Backlight for HostBacklight {
    fn set_level(&mut self, level: u8) {
        if self.level != Some(level) {
            info!("[backlight] {level}");
        }
        self.level = Some(level);
    }
}

pub fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = load_config()?;
    info!(
        "panel polling {} (max {} attempts, {}ms backoff)",
        config.endpoint.url("/"),
        config.poll.max_attempts,
        config.poll.retry_delay_ms
    );

    let display = HostDisplay {
        panel: RoundPanel::new(
            FrameBuffer::new(
                u32::from(config.screen.width),
                u32::from(config.screen.height),
            ),
            config.screen,
        ),
    };
    let mut sync = SyncController::new(
        UreqTransport::new(config.endpoint.clone()),
        display,
        SleepDelay,
        config.poll,
    );
    let mut monitor = InactivityMonitor::new(HostBacklight::default(), config.backlight);
    monitor.wake(monotonic_ms());
    let dispatcher = TouchDispatcher::new(config.screen);

    let touches = spawn_touch_reader()?;
    info!("type `x y` and press enter to touch the panel");

    loop {
        sync.poll_until_initial()
            .context("status fetch exhausted its retries; restart requested")?;

        monitor.check(monotonic_ms());

        match touches.recv_timeout(LOOP_TICK) {
            Ok(point) => {
                dispatcher
                    .dispatch(point, monotonic_ms(), &mut sync, &mut monitor)
                    .context("refresh after touch exhausted its retries; restart requested")?;
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => thread::sleep(LOOP_TICK),
        }
    }
}

fn load_config() -> anyhow::Result<PanelConfig> {
    let mut config = match std::env::var("PANEL_CONFIG") {
        Ok(path) => read_config_file(Path::new(&path))?,
        Err(_) => PanelConfig::default(),
    };

    if let Ok(host) = std::env::var("THERMOSTAT_HOST") {
        config.endpoint.host = host;
    }
    if let Ok(password) = std::env::var("THERMOSTAT_PASSWORD") {
        config.endpoint.password = password;
    }

    config.sanitize();
    Ok(config)
}

fn read_config_file(path: &Path) -> anyhow::Result<PanelConfig> {
    let raw = std::fs::read(path)
        .with_context(|| format!("failed to read panel config {}", path.display()))?;
    serde_json::from_slice(&raw)
        .with_context(|| format!("invalid panel config {}", path.display()))
}

fn spawn_touch_reader() -> anyhow::Result<Receiver<TouchPoint>> {
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("touch-stdin".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                match parse_touch_line(&line) {
                    Some(point) => {
                        if tx.send(point).is_err() {
                            break;
                        }
                    }
                    None => warn!("ignoring touch input {line:?}; expected `x y`"),
                }
            }
            info!("touch input closed");
        })
        .context("failed to spawn touch reader")?;
    Ok(rx)
}

fn parse_touch_line(line: &str) -> Option<TouchPoint> {
    let mut parts = line.split_whitespace();
    let x = parts.next()?.parse().ok()?;
    let y = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(TouchPoint { x, y, gesture: 0 })
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
