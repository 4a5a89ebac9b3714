use log::{error, info, warn};

use crate::{
    config::PollConfig,
    error::{ExtractError, SyncError, TransportError},
    extract::extract_setpoint,
    render::Display,
    transport::{Transport, STATUS_PATH},
    types::Command,
};

pub const RETRY_MESSAGE: &str = "HTTP GET failed, retrying...";

/// Blocking wait used between failed fetches.
pub trait Delay {
    fn delay_ms(&mut self, ms: u64);
}

/// What the panel last showed for the remote setpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayState {
    last_setpoint: String,
    initial_fetch_done: bool,
}

impl DisplayState {
    pub fn last_setpoint(&self) -> &str {
        &self.last_setpoint
    }

    pub fn initial_fetch_done(&self) -> bool {
        self.initial_fetch_done
    }

    // Returns whether the screen needs a repaint for `setpoint`.
    fn record(&mut self, setpoint: &str) -> bool {
        let repaint = !self.initial_fetch_done || self.last_setpoint != setpoint;
        self.initial_fetch_done = true;
        self.last_setpoint.clear();
        self.last_setpoint.push_str(setpoint);
        repaint
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Repainted(String),
    Unchanged,
    ParseFailed(ExtractError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Refreshed(PollOutcome),
    Rejected(u16),
    Failed(TransportError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PollStep {
    Fetching { attempt: u32 },
    Backoff { attempt: u32 },
    Done(PollOutcome),
    Exhausted { attempts: u32 },
}

pub struct SyncController<T, D, W> {
    transport: T,
    display: D,
    delay: W,
    config: PollConfig,
    state: DisplayState,
}

impl<T, D, W> SyncController<T, D, W>
where
    T: Transport,
    D: Display,
    W: Delay,
{
    pub fn new(transport: T, display: D, delay: W, config: PollConfig) -> Self {
        Self {
            transport,
            display,
            delay,
            config,
            state: DisplayState::default(),
        }
    }

    pub fn state(&self) -> &DisplayState {
        &self.state
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }

    pub fn delay(&self) -> &W {
        &self.delay
    }

    /// Runs one poll cycle unless a setpoint has already been shown.
    pub fn poll_until_initial(&mut self) -> Result<Option<PollOutcome>, SyncError> {
        if self.state.initial_fetch_done() {
            return Ok(None);
        }
        self.poll().map(Some)
    }

    /// Fetch, parse and conditionally repaint, retrying HTTP failures with a
    /// fixed backoff. Exhausting the attempts is fatal: the caller is expected
    /// to restart the device.
    pub fn poll(&mut self) -> Result<PollOutcome, SyncError> {
        let mut step = PollStep::Fetching { attempt: 1 };
        loop {
            step = match step {
                PollStep::Fetching { attempt } => self.fetch(attempt),
                PollStep::Backoff { attempt } => self.backoff(attempt),
                PollStep::Done(outcome) => return Ok(outcome),
                PollStep::Exhausted { attempts } => {
                    let err = SyncError::RetriesExhausted { attempts };
                    error!("{err}");
                    self.display.show_error(&err.to_string());
                    return Err(err);
                }
            };
        }
    }

    /// Sends a single increase/decrease request and re-reads the setpoint
    /// from the thermostat when it is accepted.
    pub fn send_command(&mut self, command: Command) -> Result<CommandOutcome, SyncError> {
        match self.transport.get(command.path()) {
            Ok(response) if response.is_ok() => {
                info!("{} accepted", command.as_str());
                self.poll().map(CommandOutcome::Refreshed)
            }
            Ok(response) => {
                warn!("{} rejected with HTTP {}", command.as_str(), response.status);
                self.display.show_status_code(response.status);
                Ok(CommandOutcome::Rejected(response.status))
            }
            Err(err) => {
                warn!("{} request failed: {err}", command.as_str());
                self.display.show_error(&err.to_string());
                Ok(CommandOutcome::Failed(err))
            }
        }
    }

    fn fetch(&mut self, attempt: u32) -> PollStep {
        let failure = match self.transport.get(STATUS_PATH) {
            Ok(response) if response.is_ok() => {
                return match extract_setpoint(&response.body) {
                    Ok(setpoint) => PollStep::Done(self.apply(setpoint)),
                    Err(err) => {
                        warn!("setpoint parse failed: {err}");
                        self.display.show_error(&err.to_string());
                        PollStep::Done(PollOutcome::ParseFailed(err))
                    }
                };
            }
            Ok(response) => format!("HTTP {}", response.status),
            Err(err) => err.to_string(),
        };

        warn!(
            "status fetch attempt {attempt}/{} failed: {failure}",
            self.config.max_attempts
        );
        self.display.show_error(RETRY_MESSAGE);
        PollStep::Backoff { attempt }
    }

    fn backoff(&mut self, attempt: u32) -> PollStep {
        self.delay.delay_ms(self.config.retry_delay_ms);
        if attempt >= self.config.max_attempts {
            PollStep::Exhausted { attempts: attempt }
        } else {
            PollStep::Fetching {
                attempt: attempt + 1,
            }
        }
    }

    fn apply(&mut self, setpoint: &str) -> PollOutcome {
        if self.state.record(setpoint) {
            info!("setpoint now {setpoint}");
            self.display.show_setpoint(setpoint);
            PollOutcome::Repainted(setpoint.to_string())
        } else {
            PollOutcome::Unchanged
        }
    }
}
