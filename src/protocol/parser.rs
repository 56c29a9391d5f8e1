//! Status line parsing for the `RadioRA` protocol.
//!
//! Only output-level pushes are decoded:
//! ```text
//! ~OUTPUT,<id>,1,<level>
//! ```
//! The controller may print its `GNET> ` prompt in front of a status line,
//! so the pattern is searched for anywhere in the line.

use crate::error::ParseError;
use crate::protocol::command::ACTION_LEVEL;
use crate::types::{OutputId, StatusEvent};

const OUTPUT_STATUS: &str = "~OUTPUT,";

/// Parses one authenticated-state line.
///
/// Returns `Ok(None)` for lines of any other shape, including output
/// pushes for actions other than level.
pub fn parse_status(line: &str) -> Result<Option<StatusEvent>, ParseError> {
    let Some(start) = line.find(OUTPUT_STATUS) else {
        return Ok(None);
    };

    let mut fields = line[start + OUTPUT_STATUS.len()..].trim_end().split(',');

    let id = next_field(&mut fields, "output id", line)?;
    let action = next_field(&mut fields, "action", line)?;
    if action.parse::<u32>().ok() != Some(ACTION_LEVEL) {
        return Ok(None);
    }
    let level = next_field(&mut fields, "level", line)?;

    let id = id
        .parse::<u32>()
        .map_err(|_| invalid("output id", id, line))?;
    let level = level
        .parse::<f64>()
        .ok()
        .filter(|level| level.is_finite())
        .ok_or_else(|| invalid("level", level, line))?;

    Ok(Some(StatusEvent {
        id: OutputId(id),
        level,
    }))
}

fn next_field<'a>(
    fields: &mut impl Iterator<Item = &'a str>,
    field: &'static str,
    line: &str,
) -> Result<&'a str, ParseError> {
    fields
        .next()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ParseError::MissingField {
            field,
            line: line.to_owned(),
        })
}

fn invalid(field: &'static str, value: &str, line: &str) -> ParseError {
    ParseError::InvalidField {
        field,
        value: value.to_owned(),
        line: line.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level_status() {
        let event = parse_status("~OUTPUT,5,1,75.00").unwrap().unwrap();
        assert_eq!(event.id, OutputId(5));
        assert!((event.level - 75.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_with_prompt_prefix() {
        let event = parse_status("GNET> ~OUTPUT,12,1,0.00").unwrap().unwrap();
        assert_eq!(event.id, OutputId(12));
        assert!(event.level.abs() < f64::EPSILON);
    }

    #[test]
    fn test_ignores_other_lines() {
        assert_eq!(parse_status("GNET> "), Ok(None));
        assert_eq!(parse_status("~DEVICE,1,2,3"), Ok(None));
        assert_eq!(parse_status("~OUTPUT,5,29,6"), Ok(None));
    }

    #[test]
    fn test_malformed_lines_are_errors() {
        assert!(matches!(
            parse_status("~OUTPUT,abc,1,50.00"),
            Err(ParseError::InvalidField {
                field: "output id",
                ..
            })
        ));
        assert!(matches!(
            parse_status("~OUTPUT,5,1,high"),
            Err(ParseError::InvalidField { field: "level", .. })
        ));
        assert!(matches!(
            parse_status("~OUTPUT,5,1"),
            Err(ParseError::MissingField { field: "level", .. })
        ));
        assert!(matches!(
            parse_status("~OUTPUT,"),
            Err(ParseError::MissingField {
                field: "output id",
                ..
            })
        ));
    }
}
