use chrono::{DateTime, Timelike, Utc};
use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Coarse time-of-day bucket (UTC), boundaries at 06:00, 12:00, 17:00 and 22:00.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeOfDay {
    #[display("morning")]
    Morning, // 06:00 - 12:00 UTC
    #[display("midday")]
    Midday, // 12:00 - 17:00 UTC
    #[display("evening")]
    Evening, // 17:00 - 22:00 UTC
    #[display("night")]
    Night, // 22:00 - 06:00 UTC
}

impl TimeOfDay {
    pub const ALL: [TimeOfDay; 4] = [
        TimeOfDay::Morning,
        TimeOfDay::Midday,
        TimeOfDay::Evening,
        TimeOfDay::Night,
    ];

    pub fn from_utc_hour(hour: u32) -> Self {
        match hour {
            6..=11 => TimeOfDay::Morning,
            12..=16 => TimeOfDay::Midday,
            17..=21 => TimeOfDay::Evening,
            _ => TimeOfDay::Night,
        }
    }

    pub fn at(now: DateTime<Utc>) -> Self {
        Self::from_utc_hour(now.hour())
    }
}

/// Exchange session approximated by UTC hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionSlot {
    #[display("asia_open")]
    AsiaOpen,
    #[display("asia_mid")]
    AsiaMid,
    #[display("europe_open")]
    EuropeOpen,
    #[display("us_open")]
    UsOpen,
    #[display("us_power")]
    UsPower,
    #[display("overnight")]
    Overnight,
}

/// Half-open `[start, end)` UTC hour windows. `AsiaOpen` wraps past midnight.
const SESSION_WINDOWS: [(SessionSlot, u32, u32); 6] = [
    (SessionSlot::AsiaOpen, 23, 2),
    (SessionSlot::AsiaMid, 2, 7),
    (SessionSlot::EuropeOpen, 7, 12),
    (SessionSlot::UsOpen, 12, 16),
    (SessionSlot::UsPower, 16, 20),
    (SessionSlot::Overnight, 20, 23),
];

impl SessionSlot {
    pub const ALL: [SessionSlot; 6] = [
        SessionSlot::AsiaOpen,
        SessionSlot::AsiaMid,
        SessionSlot::EuropeOpen,
        SessionSlot::UsOpen,
        SessionSlot::UsPower,
        SessionSlot::Overnight,
    ];

    pub fn from_utc_hour(hour: u32) -> Self {
        let hour = hour % 24;
        SESSION_WINDOWS
            .iter()
            .find(|(_, start, end)| window_contains(*start, *end, hour))
            .map(|(slot, _, _)| *slot)
            .unwrap_or(SessionSlot::Overnight)
    }

    pub fn at(now: DateTime<Utc>) -> Self {
        Self::from_utc_hour(now.hour())
    }

    pub fn label(&self) -> &'static str {
        match self {
            SessionSlot::AsiaOpen => "ASIA-OPEN",
            SessionSlot::AsiaMid => "ASIA",
            SessionSlot::EuropeOpen => "EU",
            SessionSlot::UsOpen => "US-OPEN",
            SessionSlot::UsPower => "US-POWER",
            SessionSlot::Overnight => "OVERNIGHT",
        }
    }

    /// Sessions where human desks are most active.
    pub fn is_peak(&self) -> bool {
        matches!(
            self,
            SessionSlot::EuropeOpen | SessionSlot::UsOpen | SessionSlot::UsPower
        )
    }
}

fn window_contains(start: u32, end: u32, hour: u32) -> bool {
    if start < end {
        (start..end).contains(&hour)
    } else {
        hour >= start || hour < end
    }
}
