//! Scheduling priority

use serde::{Deserialize, Serialize};
use std::fmt;

/// Scheduling priority
///
/// Higher values are more important. Comparisons order priorities
/// accordingly, so `Priority::new(5) > Priority::new(1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Priority(i32);

impl Priority {
    pub fn new(value: i32) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i32 {
        self.0
    }

    /// Adds `delta` priority steps, saturating at the representable bounds
    ///
    /// Used by the aging and inheritance extensions to raise an effective
    /// priority without wrapping.
    pub fn saturating_add(&self, delta: i64) -> Self {
        let raised = (self.0 as i64).saturating_add(delta);
        Self(raised.clamp(i32::MIN as i64, i32::MAX as i64) as i32)
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "priority {}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_higher_value_is_more_important() {
        assert!(Priority::new(5) > Priority::new(1));
        assert!(Priority::new(-3) < Priority::new(0));
    }

    #[test]
    fn test_saturating_add_clamps() {
        let top = Priority::new(i32::MAX);
        assert_eq!(top.saturating_add(10), top);

        let boosted = Priority::new(2).saturating_add(3);
        assert_eq!(boosted, Priority::new(5));
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Priority::new(8)), "priority 8");
    }
}
