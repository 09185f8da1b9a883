//! Server state-change events carried in one-byte Event packets.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum Event {
    Connected = 1,
    ConnectionClosed = 2,
    CaptureStarted = 3,
    CaptureStopped = 4,
    CaptureFetchingFinished = 5,
    CalibrationStarted = 6,
    CalibrationStopped = 7,
    RtFromFileStarted = 8,
    RtFromFileStopped = 9,
    WaitingForTrigger = 10,
    CameraSettingsChanged = 11,
    QtmShuttingDown = 12,
    CaptureSaved = 13,
    ReprocessingStarted = 14,
    ReprocessingStopped = 15,
    Trigger = 16,
    /// Sentinel the server uses for "no event".
    None = 17,
}

impl Event {
    pub const ALL: [Event; 17] = [
        Event::Connected,
        Event::ConnectionClosed,
        Event::CaptureStarted,
        Event::CaptureStopped,
        Event::CaptureFetchingFinished,
        Event::CalibrationStarted,
        Event::CalibrationStopped,
        Event::RtFromFileStarted,
        Event::RtFromFileStopped,
        Event::WaitingForTrigger,
        Event::CameraSettingsChanged,
        Event::QtmShuttingDown,
        Event::CaptureSaved,
        Event::ReprocessingStarted,
        Event::ReprocessingStopped,
        Event::Trigger,
        Event::None,
    ];

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(value: u8) -> Option<Event> {
        Event::ALL.iter().copied().find(|event| event.as_u8() == value)
    }

    pub fn name(self) -> &'static str {
        match self {
            Event::Connected => "Connected",
            Event::ConnectionClosed => "ConnectionClosed",
            Event::CaptureStarted => "CaptureStarted",
            Event::CaptureStopped => "CaptureStopped",
            Event::CaptureFetchingFinished => "CaptureFetchingFinished",
            Event::CalibrationStarted => "CalibrationStarted",
            Event::CalibrationStopped => "CalibrationStopped",
            Event::RtFromFileStarted => "RTfromFileStarted",
            Event::RtFromFileStopped => "RTfromFileStopped",
            Event::WaitingForTrigger => "WaitingForTrigger",
            Event::CameraSettingsChanged => "CameraSettingsChanged",
            Event::QtmShuttingDown => "QTMShuttingDown",
            Event::CaptureSaved => "CaptureSaved",
            Event::ReprocessingStarted => "ReprocessingStarted",
            Event::ReprocessingStopped => "ReprocessingStopped",
            Event::Trigger => "Trigger",
            Event::None => "None",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parses event names case-insensitively (`capturestarted`, `QTMShuttingDown`).
impl FromStr for Event {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Event::ALL
            .iter()
            .copied()
            .find(|event| event.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("unknown event '{s}'"))
    }
}
