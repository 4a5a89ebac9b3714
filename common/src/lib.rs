pub mod config;
pub mod error;
pub mod extract;
pub mod inactivity;
pub mod render;
pub mod sync;
pub mod touch;
pub mod transport;
pub mod types;

#[cfg(test)]
mod fakes;

pub use config::{
    BacklightConfig, EndpointConfig, NetworkConfig, PanelConfig, PollConfig, ScreenConfig,
};
pub use error::{ExtractError, SyncError, TransportError};
pub use extract::extract_setpoint;
pub use inactivity::{ActivityTimestamp, Backlight, InactivityMonitor};
pub use render::{Display, FrameBuffer, RoundPanel};
pub use sync::{CommandOutcome, Delay, DisplayState, PollOutcome, SyncController};
pub use touch::{classify, parse_cst816_report, TouchDispatcher, TouchOutcome};
pub use transport::{basic_auth_value, HttpResponse, Transport, HTTP_OK, STATUS_PATH};
pub use types::{Command, TouchPoint, TouchZone};
