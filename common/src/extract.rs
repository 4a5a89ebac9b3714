use crate::error::ExtractError;

pub const SETPOINT_MARKER: &str = "id='tempSet'>";
pub const SETPOINT_TERMINATOR: &str = "</span>";

/// Returns the raw setpoint text between `id='tempSet'>` and the next `</span>`.
///
/// The value is passed through untouched; callers compare it as text.
pub fn extract_setpoint(body: &str) -> Result<&str, ExtractError> {
    let start = body
        .find(SETPOINT_MARKER)
        .ok_or(ExtractError::MarkerNotFound)?
        + SETPOINT_MARKER.len();

    let len = body[start..]
        .find(SETPOINT_TERMINATOR)
        .ok_or(ExtractError::TerminatorNotFound)?;

    Ok(&body[start..start + len])
}
