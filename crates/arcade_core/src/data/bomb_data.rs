//! Bomb definitions.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::math::{fixed_decimal, option_fixed_decimal, Fixed};

/// Trigger mechanism of a bomb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BombKind {
    /// Detonates when an eligible entity comes within the trigger radius.
    Proximity,
    /// Detonates a fixed time after arming.
    Timed,
    /// Detonates on command and chains to nearby armed bombs.
    Remote,
}

impl fmt::Display for BombKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Proximity => "proximity",
            Self::Timed => "timed",
            Self::Remote => "remote",
        };
        f.write_str(name)
    }
}

/// Data-driven bomb definition.
///
/// # Example RON
///
/// ```ron
/// BombDef(
///     kind: Timed,
///     damage: 100,
///     splash_radius: 120.0,
///     arm_ms: 500,
///     fuse_ms: Some(3000),
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BombDef {
    /// Trigger mechanism this definition applies to.
    pub kind: BombKind,

    /// Damage at the centre of the blast.
    pub damage: u32,

    /// Blast radius in world units.
    #[serde(with = "fixed_decimal")]
    pub splash_radius: Fixed,

    /// Milliseconds from placement until armed.
    pub arm_ms: u32,

    /// Milliseconds armed before a timed bomb goes off.
    #[serde(default)]
    pub fuse_ms: Option<u32>,

    /// Proximity trigger distance.
    #[serde(default, with = "option_fixed_decimal")]
    pub trigger_radius: Option<Fixed>,

    /// Chain propagation distance for remote bombs.
    #[serde(default, with = "option_fixed_decimal")]
    pub chain_radius: Option<Fixed>,
}

impl BombDef {
    /// Check that the fields required by the bomb's kind are present.
    pub fn validate(&self) -> Result<()> {
        let missing = match self.kind {
            BombKind::Proximity if self.trigger_radius.is_none() => Some("trigger_radius"),
            BombKind::Timed if self.fuse_ms.is_none() => Some("fuse_ms"),
            _ => None,
        };
        if let Some(field) = missing {
            return Err(GameError::InvalidDefinition {
                id: self.kind.to_string(),
                reason: format!("{field} is required for {} bombs", self.kind),
            });
        }
        if self.splash_radius < Fixed::ZERO {
            return Err(GameError::InvalidDefinition {
                id: self.kind.to_string(),
                reason: "splash_radius must not be negative".into(),
            });
        }
        Ok(())
    }
}

/// Stock bomb set.
#[must_use]
pub fn builtin_bombs() -> Vec<BombDef> {
    let int = Fixed::from_num::<i32>;
    vec![
        BombDef {
            kind: BombKind::Proximity,
            damage: 80,
            splash_radius: int(100),
            arm_ms: 1000,
            fuse_ms: None,
            trigger_radius: Some(int(60)),
            chain_radius: None,
        },
        BombDef {
            kind: BombKind::Timed,
            damage: 100,
            splash_radius: int(120),
            arm_ms: 500,
            fuse_ms: Some(3000),
            trigger_radius: None,
            chain_radius: None,
        },
        BombDef {
            kind: BombKind::Remote,
            damage: 90,
            splash_radius: int(110),
            arm_ms: 200,
            fuse_ms: None,
            trigger_radius: None,
            chain_radius: Some(int(150)),
        },
    ]
}
