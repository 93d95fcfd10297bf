//! Telemetry token parsing shared by the reply grammars.
//!
//! Telemetry arrives as whitespace separated `KEY:value` tokens, either on
//! its own line (`T:210.4 B:60.0`) or trailing an acknowledgement
//! (`ok T:210 B:60`). Keys the engine does not know are skipped, and a
//! `Count` marker ends the interesting part of a position report.

use rrlink_core::ReplyKind;

/// One telemetry token.
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryToken {
    /// Known key with a parsed value
    Value(ReplyKind, f32),
    /// Known key whose value did not parse; holds the offending text
    Malformed(String),
}

/// Parse every telemetry token in `text`.
pub fn parse_tokens(text: &str) -> Vec<TelemetryToken> {
    let mut tokens = Vec::new();
    let mut words = text.split_whitespace().peekable();

    while let Some(word) = words.next() {
        if word.get(..5).is_some_and(|head| head.eq_ignore_ascii_case("count")) {
            break;
        }
        let Some((key, value)) = word.split_once(':') else {
            continue;
        };
        let Some(kind) = ReplyKind::from_key(key) else {
            continue;
        };

        // "T: 210" puts the value in the next word.
        let (value, text) = if value.is_empty() {
            match words.peek() {
                Some(next) if !next.contains(':') => {
                    let next = words.next().unwrap_or_default();
                    (next, format!("{} {}", word, next))
                }
                _ => (value, word.to_string()),
            }
        } else {
            (value, word.to_string())
        };

        match value.parse::<f32>() {
            Ok(v) => tokens.push(TelemetryToken::Value(kind, v)),
            Err(_) => tokens.push(TelemetryToken::Malformed(text)),
        }
    }

    tokens
}

/// Whether the line opens with a known `KEY:` token.
pub fn starts_with_telemetry(line: &str) -> bool {
    line.split_whitespace()
        .next()
        .and_then(|word| word.split_once(':'))
        .is_some_and(|(key, _)| ReplyKind::from_key(key).is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_temperature_report() {
        let tokens = parse_tokens("T:210.4 B:60.0");
        assert_eq!(
            tokens,
            vec![
                TelemetryToken::Value(ReplyKind::NozzleTemp, 210.4),
                TelemetryToken::Value(ReplyKind::BedTemp, 60.0),
            ]
        );
    }

    #[test]
    fn test_parse_skips_unknown_keys_and_targets() {
        let tokens = parse_tokens(" T:205.0 /210.0 B:59.8 /60.0 @:127 B@:0");
        assert_eq!(
            tokens,
            vec![
                TelemetryToken::Value(ReplyKind::NozzleTemp, 205.0),
                TelemetryToken::Value(ReplyKind::BedTemp, 59.8),
            ]
        );
    }

    #[test]
    fn test_parse_position_stops_at_count() {
        let tokens = parse_tokens("X:10.00 Y:20.00 Z:0.30 E:1.50 Count X:800 Y:1600 Z:120");
        assert_eq!(tokens.len(), 4);
        assert_eq!(tokens[2], TelemetryToken::Value(ReplyKind::ZPos, 0.3));
        assert_eq!(tokens[3], TelemetryToken::Value(ReplyKind::EPos, 1.5));
    }

    #[test]
    fn test_parse_value_in_next_word() {
        assert_eq!(
            parse_tokens("T: 199.5"),
            vec![TelemetryToken::Value(ReplyKind::NozzleTemp, 199.5)]
        );
    }

    #[test]
    fn test_parse_malformed_value() {
        assert_eq!(
            parse_tokens("T:hot B:60"),
            vec![
                TelemetryToken::Malformed("T:hot".to_string()),
                TelemetryToken::Value(ReplyKind::BedTemp, 60.0),
            ]
        );
    }

    #[test]
    fn test_starts_with_telemetry() {
        assert!(starts_with_telemetry("T:210"));
        assert!(starts_with_telemetry("x:1.0 y:2.0"));
        assert!(!starts_with_telemetry("echo:busy"));
        assert!(!starts_with_telemetry("ok"));
        assert!(!starts_with_telemetry(""));
    }
}
