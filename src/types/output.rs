//! Output (lighting/shade channel) types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Controller-addressable output number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutputId(pub u32);

impl OutputId {
    /// Returns the raw output number.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl From<u32> for OutputId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for OutputId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Output level status pushed by the controller (`~OUTPUT,<id>,1,<level>`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusEvent {
    /// Output the status refers to.
    pub id: OutputId,
    /// Level on the 0-100 scale.
    pub level: f64,
}

/// Parameters of a set-level request.
///
/// Fade and delay are protocol-native timing fields. The delay is only
/// transmitted when a fade is present, since the fields are positional.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SetLevel {
    /// Target level on the 0-100 scale.
    pub level: f64,
    /// Transition time.
    pub fade: Option<f64>,
    /// Start offset.
    pub delay: Option<f64>,
}

impl SetLevel {
    /// Creates a set request with no fade or delay.
    #[must_use]
    pub const fn new(level: f64) -> Self {
        Self {
            level,
            fade: None,
            delay: None,
        }
    }

    /// Sets the fade time.
    #[must_use]
    pub const fn fade(mut self, fade: f64) -> Self {
        self.fade = Some(fade);
        self
    }

    /// Sets the delay.
    #[must_use]
    pub const fn delay(mut self, delay: f64) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_level_builder() {
        let set = SetLevel::new(50.0).fade(2.0).delay(1.0);
        assert!((set.level - 50.0).abs() < f64::EPSILON);
        assert_eq!(set.fade, Some(2.0));
        assert_eq!(set.delay, Some(1.0));
    }

    #[test]
    fn test_output_id_display() {
        assert_eq!(OutputId(12).to_string(), "12");
        assert_eq!(OutputId::from(7).get(), 7);
    }
}
