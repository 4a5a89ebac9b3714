//! Recording stand-ins for the panel's hardware seams, shared by unit tests.

use std::collections::VecDeque;

use crate::{
    error::TransportError,
    inactivity::Backlight,
    render::Display,
    sync::Delay,
    transport::{HttpResponse, Transport},
    types::Command,
};

pub fn page(setpoint: &str) -> String {
    format!("<html><body><span id='tempSet'>{setpoint}</span> F</body></html>")
}

#[derive(Debug, Default)]
pub struct FakeTransport {
    scripted: VecDeque<Result<HttpResponse, TransportError>>,
    fallback: Option<HttpResponse>,
    pub requests: Vec<String>,
}

impl FakeTransport {
    pub fn serving(body: String) -> Self {
        Self {
            fallback: Some(HttpResponse { status: 200, body }),
            ..Self::default()
        }
    }

    pub fn failing_with(status: u16) -> Self {
        Self {
            fallback: Some(HttpResponse {
                status,
                body: String::new(),
            }),
            ..Self::default()
        }
    }

    pub fn push_ok(&mut self, body: String) {
        self.scripted
            .push_back(Ok(HttpResponse { status: 200, body }));
    }

    pub fn push_status(&mut self, status: u16) {
        self.scripted.push_back(Ok(HttpResponse {
            status,
            body: String::new(),
        }));
    }

    pub fn push_connect_error(&mut self) {
        self.scripted.push_back(Err(TransportError::Connect {
            url: "http://thermostat/".to_string(),
            reason: "connection refused".to_string(),
        }));
    }

    pub fn status_polls(&self) -> usize {
        self.requests.iter().filter(|path| *path == "/").count()
    }
}

impl Transport for FakeTransport {
    fn get(&mut self, path: &str) -> Result<HttpResponse, TransportError> {
        self.requests.push(path.to_string());
        if let Some(next) = self.scripted.pop_front() {
            return next;
        }
        self.fallback.clone().ok_or_else(|| TransportError::Connect {
            url: path.to_string(),
            reason: "no scripted response".to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    Setpoint(String),
    Error(String),
    Status(u16),
    Button(Command, bool),
}

#[derive(Debug, Default)]
pub struct RecordingDisplay {
    pub screens: Vec<Screen>,
}

impl RecordingDisplay {
    pub fn setpoint_repaints(&self) -> usize {
        self.screens
            .iter()
            .filter(|screen| matches!(screen, Screen::Setpoint(_)))
            .count()
    }
}

impl Display for RecordingDisplay {
    fn show_setpoint(&mut self, setpoint: &str) {
        self.screens.push(Screen::Setpoint(setpoint.to_string()));
    }

    fn show_error(&mut self, message: &str) {
        self.screens.push(Screen::Error(message.to_string()));
    }

    fn show_status_code(&mut self, status: u16) {
        self.screens.push(Screen::Status(status));
    }

    fn show_button(&mut self, command: Command, pressed: bool) {
        self.screens.push(Screen::Button(command, pressed));
    }
}

#[derive(Debug, Default)]
pub struct RecordingDelay {
    pub waits: Vec<u64>,
}

impl Delay for RecordingDelay {
    fn delay_ms(&mut self, ms: u64) {
        self.waits.push(ms);
    }
}

#[derive(Debug, Default)]
pub struct RecordingBacklight {
    pub levels: Vec<u8>,
}

impl Backlight for RecordingBacklight {
    fn set_level(&mut self, level: u8) {
        self.levels.push(level);
    }
}
