// File: olivia-common/src/models/availability.rs

use std::fmt;
use serde::{Deserialize, Serialize};

/// Traffic-light fill level shown next to every bookable session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AvailabilityColor {
    Green,
    Amber,
    Red,
}

impl fmt::Display for AvailabilityColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AvailabilityColor::Green => write!(f, "green"),
            AvailabilityColor::Amber => write!(f, "amber"),
            AvailabilityColor::Red => write!(f, "red"),
        }
    }
}

/// Amber from 80% full, red once full. A session without capacity is always red.
///
/// Integer arithmetic only, so the 80% boundary is exact for every capacity.
pub fn availability_color(enrolled: i32, capacity: i32) -> AvailabilityColor {
    if capacity <= 0 {
        return AvailabilityColor::Red;
    }
    let enrolled = i64::from(enrolled);
    let capacity = i64::from(capacity);
    if enrolled >= capacity {
        AvailabilityColor::Red
    } else if 5 * enrolled >= 4 * capacity {
        AvailabilityColor::Amber
    } else {
        AvailabilityColor::Green
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_capacity_is_red() {
        assert_eq!(availability_color(0, 0), AvailabilityColor::Red);
        assert_eq!(availability_color(3, 0), AvailabilityColor::Red);
        assert_eq!(availability_color(0, -1), AvailabilityColor::Red);
    }

    #[test]
    fn boundaries_follow_eighty_percent_rule() {
        assert_eq!(availability_color(7, 10), AvailabilityColor::Green);
        assert_eq!(availability_color(8, 10), AvailabilityColor::Amber);
        assert_eq!(availability_color(9, 10), AvailabilityColor::Amber);
        assert_eq!(availability_color(10, 10), AvailabilityColor::Red);
        assert_eq!(availability_color(11, 10), AvailabilityColor::Red);
        // 0.8 * 12 = 9.6, so 9 is still green and 10 is amber
        assert_eq!(availability_color(9, 12), AvailabilityColor::Green);
        assert_eq!(availability_color(10, 12), AvailabilityColor::Amber);
    }

    #[test]
    fn exhaustive_small_grid_matches_ratio_definition() {
        for capacity in 1..=40 {
            for enrolled in 0..=capacity + 2 {
                let expected = if enrolled >= capacity {
                    AvailabilityColor::Red
                } else if f64::from(enrolled) >= 0.8 * f64::from(capacity) - 1e-9 {
                    AvailabilityColor::Amber
                } else {
                    AvailabilityColor::Green
                };
                assert_eq!(
                    availability_color(enrolled, capacity),
                    expected,
                    "enrolled={enrolled} capacity={capacity}"
                );
            }
        }
    }
}
