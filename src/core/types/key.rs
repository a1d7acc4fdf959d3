//! Typed identifiers for pose variables.
//!
//! Every pose variable in the fleet is identified by the robot that owns it
//! and the keyframe index assigned by that robot's front-end. Keys embed the
//! robot id, so they are globally unique without coordination.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tag character for pose-graph variables in display form.
pub const POSE_TAG: char = 'x';

const LABEL_BASE: u8 = b'a';

/// Printable label for a robot id.
///
/// Round-trips with [`label_to_robot`] for every supported id.
pub fn robot_label(robot: u32) -> char {
    (LABEL_BASE + robot as u8) as char
}

/// Robot id for a printable label, if the label is in range.
pub fn label_to_robot(label: char) -> Option<u32> {
    let c = label as u32;
    let base = LABEL_BASE as u32;
    if (base..=b'~' as u32).contains(&c) {
        Some(c - base)
    } else {
        None
    }
}

/// Identifier of a single pose variable: owning robot plus keyframe index.
///
/// Totally ordered and hashable so it can key estimate maps directly.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct PoseKey {
    /// Id of the robot that owns this variable.
    pub robot: u32,
    /// Keyframe index assigned by the owning robot's front-end.
    pub index: u32,
}

impl PoseKey {
    /// Create a key for `robot`'s keyframe `index`.
    #[inline]
    pub fn new(robot: u32, index: u32) -> Self {
        Self { robot, index }
    }
}

impl fmt::Display for PoseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", POSE_TAG, robot_label(self.robot), self.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_roundtrip() {
        for robot in 0..16 {
            assert_eq!(label_to_robot(robot_label(robot)), Some(robot));
        }
    }

    #[test]
    fn test_label_rejects_out_of_range() {
        assert_eq!(label_to_robot('A'), None);
        assert_eq!(label_to_robot(' '), None);
    }

    #[test]
    fn test_key_ordering() {
        let a = PoseKey::new(0, 5);
        let b = PoseKey::new(0, 6);
        let c = PoseKey::new(1, 0);
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn test_display() {
        assert_eq!(PoseKey::new(0, 12).to_string(), "xa12");
        assert_eq!(PoseKey::new(2, 0).to_string(), "xc0");
    }
}
