use crate::{
    random::RandomSource,
    template::{Category, EventTemplate, Priority},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

const ID_SUFFIX_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_SUFFIX_LEN: usize = 6;

/// Emitted simulation event, as rendered by the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedEvent {
    pub id: String,
    pub template_id: SmolStr,
    pub category: Category,
    pub priority: Priority,
    pub body: String,
    pub timestamp: DateTime<Utc>,
    pub symbol: SmolStr,
}

impl GeneratedEvent {
    pub fn new(
        template: &EventTemplate,
        body: String,
        symbol: SmolStr,
        timestamp: DateTime<Utc>,
        rng: &mut dyn RandomSource,
    ) -> Self {
        Self {
            id: event_id(template.id, timestamp, rng),
            template_id: SmolStr::new_static(template.id),
            category: template.category,
            priority: template.priority,
            body,
            timestamp,
            symbol,
        }
    }
}

/// `<template id>-<unix millis>-<base36 suffix>`
fn event_id(template_id: &str, timestamp: DateTime<Utc>, rng: &mut dyn RandomSource) -> String {
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| char::from(ID_SUFFIX_ALPHABET[rng.index(ID_SUFFIX_ALPHABET.len())]))
        .collect();
    format!("{}-{}-{}", template_id, timestamp.timestamp_millis(), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{random::ScriptedRandom, template::activity};
    use chrono::TimeZone;

    #[test]
    fn test_event_id_layout() {
        let template = &activity::TEMPLATES[0];
        let timestamp = Utc.timestamp_millis_opt(1_714_550_400_123).unwrap();
        let mut rng = ScriptedRandom::constant(0.0);

        let event =
            GeneratedEvent::new(template, "body".into(), "BTC/USDT".into(), timestamp, &mut rng);

        assert_eq!(event.id, format!("{}-1714550400123-000000", template.id));
        assert_eq!(event.template_id, template.id);
        assert_eq!(event.category, template.category);
    }

    #[test]
    fn test_serialises_category_label() {
        let template = &crate::template::alert::TEMPLATES[0];
        let timestamp = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        let mut rng = ScriptedRandom::constant(0.5);

        let event =
            GeneratedEvent::new(template, "body".into(), "ETH/USDT".into(), timestamp, &mut rng);
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["category"], "Market Volatility");
        assert_eq!(json["priority"], "high");
        assert_eq!(json["timestamp"], "2024-05-01T09:00:00Z");
        assert_eq!(json["symbol"], "ETH/USDT");
    }
}
