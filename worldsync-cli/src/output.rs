//! JSON envelopes printed by every command.

use std::io::Write;
use std::time::SystemTime;

use serde::Serialize;
use worldsync_core::{Envelope, ErrorBody, ResponseMetadata, unix_seconds};

use crate::CliError;

pub(crate) const INVALID_CODE: &str = "INVALID_CODE";
pub(crate) const NOT_FOUND: &str = "NOT_FOUND";
pub(crate) const NO_ELIGIBLE_COUNTRIES: &str = "NO_ELIGIBLE_COUNTRIES";
pub(crate) const STORE_ERROR: &str = "STORE_ERROR";
pub(crate) const SYNC_FAILED: &str = "SYNC_FAILED";

/// Print `data` in a success envelope.
pub(crate) fn success<T: Serialize>(writer: &mut dyn Write, data: T) -> Result<bool, CliError> {
    let envelope = Envelope::success(data, &ResponseMetadata::default(), now());
    write_envelope(writer, &envelope)
}

/// Print `error` in a failure envelope.
pub(crate) fn failure(writer: &mut dyn Write, error: ErrorBody) -> Result<bool, CliError> {
    let envelope = Envelope::<()>::failure(error, &ResponseMetadata::default(), now());
    write_envelope(writer, &envelope)
}

/// Print `error` together with the partial `data` gathered before it.
pub(crate) fn partial_failure<T: Serialize>(
    writer: &mut dyn Write,
    error: ErrorBody,
    data: T,
) -> Result<bool, CliError> {
    let envelope = Envelope::partial_failure(error, data, &ResponseMetadata::default(), now());
    write_envelope(writer, &envelope)
}

fn now() -> u64 {
    unix_seconds(SystemTime::now())
}

fn write_envelope<T: Serialize>(
    writer: &mut dyn Write,
    envelope: &Envelope<T>,
) -> Result<bool, CliError> {
    let payload = serde_json::to_string_pretty(envelope).map_err(CliError::SerialiseOutput)?;
    writer
        .write_all(payload.as_bytes())
        .map_err(CliError::WriteOutput)?;
    writer.write_all(b"\n").map_err(CliError::WriteOutput)?;
    Ok(envelope.is_success())
}
