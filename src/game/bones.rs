//! Explicit foot bone mapping.
//!
//! Each foot has an ordered list of candidate bone names. Resolution takes the
//! first candidate that exists in the skeleton, compared exactly; there is no
//! substring matching. The default order covers Mixamo exports first, then
//! generic Blender/Unreal style names.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Foot {
    Left,
    Right,
}

impl Foot {
    pub const BOTH: [Foot; 2] = [Foot::Left, Foot::Right];

    pub fn index(self) -> usize {
        match self {
            Foot::Left => 0,
            Foot::Right => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FootBoneMap {
    pub left: Vec<String>,
    pub right: Vec<String>,
}

impl Default for FootBoneMap {
    fn default() -> Self {
        Self {
            left: ["mixamorigLeftFoot", "LeftFoot", "foot_l", "Foot.L"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            right: ["mixamorigRightFoot", "RightFoot", "foot_r", "Foot.R"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Skeleton indices of the resolved foot bones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResolvedFeet {
    pub left: Option<usize>,
    pub right: Option<usize>,
}

impl ResolvedFeet {
    pub fn get(&self, foot: Foot) -> Option<usize> {
        match foot {
            Foot::Left => self.left,
            Foot::Right => self.right,
        }
    }
}

impl FootBoneMap {
    pub fn candidates(&self, foot: Foot) -> &[String] {
        match foot {
            Foot::Left => &self.left,
            Foot::Right => &self.right,
        }
    }

    /// Resolves both feet against a skeleton's bone names. A foot with no
    /// matching candidate is logged and left unresolved; footsteps for it are
    /// skipped rather than failing the load.
    pub fn resolve<S: AsRef<str>>(&self, bone_names: &[S]) -> ResolvedFeet {
        let mut resolved = ResolvedFeet::default();
        for foot in Foot::BOTH {
            let found = self.candidates(foot).iter().find_map(|candidate| {
                bone_names
                    .iter()
                    .position(|name| name.as_ref() == candidate.as_str())
            });
            if found.is_none() {
                log::warn!(
                    "[Bones] No {:?} foot bone among candidates {:?}",
                    foot,
                    self.candidates(foot)
                );
            }
            match foot {
                Foot::Left => resolved.left = found,
                Foot::Right => resolved.right = found,
            }
        }
        resolved
    }
}
