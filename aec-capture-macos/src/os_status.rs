//! Classification of Core Audio `OSStatus` codes into `CaptureError`s.
//!
//! Kept free of framework bindings so the mapping is testable on any host.

use aec_capture_core::models::error::CaptureError;

/// `kAudioHardwareIllegalOperationError` ('nope'), returned when the
/// process may not use the microphone.
pub const ILLEGAL_OPERATION: i32 = 0x6E6F_7065;
/// `kAudioHardwareBadDeviceError` ('!dev').
pub const BAD_DEVICE: i32 = 0x2164_6576;
/// `kAudioHardwareNotRunningError` ('stop').
pub const HARDWARE_NOT_RUNNING: i32 = 0x7374_6F70;
/// `kAudioUnitErr_NoConnection`.
pub const NO_CONNECTION: i32 = -10876;
/// `kAudioUnitErr_FormatNotSupported`.
pub const FORMAT_NOT_SUPPORTED: i32 = -10868;
/// `kAudio_ParamError`.
pub const PARAM_ERROR: i32 = -50;

/// Map a failed setup step to the error reported by `start`.
pub fn classify(step: &str, status: i32) -> CaptureError {
    match status {
        ILLEGAL_OPERATION => CaptureError::PermissionDenied,
        BAD_DEVICE | NO_CONNECTION | HARDWARE_NOT_RUNNING => CaptureError::DeviceNotAvailable,
        _ => CaptureError::ConfigurationFailed(format!("{}: {}", step, describe(status))),
    }
}

/// Render a status for logs, showing the four-character code when it has one.
pub fn describe(status: i32) -> String {
    match four_char_code(status) {
        Some(code) => format!("OSStatus {} ('{}')", status, code),
        None => format!("OSStatus {}", status),
    }
}

fn four_char_code(status: i32) -> Option<String> {
    let bytes = status.to_be_bytes();
    if bytes.iter().all(|b| b.is_ascii_graphic() || *b == b' ') {
        Some(bytes.iter().map(|&b| b as char).collect())
    } else {
        None
    }
}
