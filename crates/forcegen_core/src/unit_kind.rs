//! Unit classification used by every stage of generation.
//!
//! This module provides the small closed vocabularies that catalog entries,
//! table queries and formation predicates share:
//! - [`UnitType`]: broad unit family (Mek, Tank, AeroSpace fighter, ...)
//! - [`WeightClass`]: tonnage bucket used for balancing and distributions
//! - [`MovementMode`]: motive type, relevant for vehicle and infantry formations
//! - [`NetworkMask`]: bitflags for C3-family networking equipment
//! - [`CombatRole`]: battlefield role assigned to a model
//!
//! # Design Goals
//!
//! - **Cheap**: everything is `Copy` and usable as a map key
//! - **Data-driven**: all of them deserialize directly from RON
//! - **Ordered**: `Ord` is derived so sets iterate deterministically

use serde::{Deserialize, Serialize};

/// Broad unit family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum UnitType {
    /// BattleMek.
    Mek,
    /// Combat vehicle.
    Tank,
    /// Battle armor.
    BattleArmor,
    /// Conventional infantry.
    Infantry,
    /// ProtoMek.
    ProtoMek,
    /// VTOL aircraft.
    Vtol,
    /// Surface or submarine naval vessel.
    Naval,
    /// Conventional fighter.
    ConvFighter,
    /// Aerospace fighter.
    AeroSpaceFighter,
    /// Small craft.
    SmallCraft,
    /// DropShip.
    DropShip,
}

impl UnitType {
    /// All unit types, in declaration order.
    pub const ALL: [Self; 11] = [
        Self::Mek,
        Self::Tank,
        Self::BattleArmor,
        Self::Infantry,
        Self::ProtoMek,
        Self::Vtol,
        Self::Naval,
        Self::ConvFighter,
        Self::AeroSpaceFighter,
        Self::SmallCraft,
        Self::DropShip,
    ];

    /// Get the display name for this unit type.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Mek => "Mek",
            Self::Tank => "Tank",
            Self::BattleArmor => "BattleArmor",
            Self::Infantry => "Infantry",
            Self::ProtoMek => "ProtoMek",
            Self::Vtol => "VTOL",
            Self::Naval => "Naval",
            Self::ConvFighter => "Conventional Fighter",
            Self::AeroSpaceFighter => "AeroSpaceFighter",
            Self::SmallCraft => "Small Craft",
            Self::DropShip => "Dropship",
        }
    }

    /// Aerospace units (fighters and craft).
    #[must_use]
    pub const fn is_aero(&self) -> bool {
        matches!(
            self,
            Self::ConvFighter | Self::AeroSpaceFighter | Self::SmallCraft | Self::DropShip
        )
    }

    /// Ground vehicles: tracked, wheeled, hover and similar.
    #[must_use]
    pub const fn is_vehicle(&self) -> bool {
        matches!(self, Self::Tank | Self::Vtol | Self::Naval)
    }

    /// Conventional infantry and battle armor.
    #[must_use]
    pub const fn is_infantry(&self) -> bool {
        matches!(self, Self::Infantry | Self::BattleArmor)
    }

    /// Motive types a formation of this unit type can plausibly share.
    ///
    /// Empty for unit types whose formations are not split by motive type.
    #[must_use]
    pub const fn motive_choices(&self) -> &'static [MovementMode] {
        match self {
            Self::Tank => &[
                MovementMode::Tracked,
                MovementMode::Wheeled,
                MovementMode::Hover,
                MovementMode::Wige,
            ],
            Self::Infantry => &[
                MovementMode::Leg,
                MovementMode::Motorized,
                MovementMode::Jump,
                MovementMode::Tracked,
                MovementMode::Wheeled,
                MovementMode::Hover,
            ],
            Self::BattleArmor => &[MovementMode::Leg, MovementMode::Jump, MovementMode::Vtol],
            _ => &[],
        }
    }
}

impl std::fmt::Display for UnitType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Tonnage bucket.
///
/// The numeric index (`UltraLight` = 0) is also the position of the class in
/// a faction's weight distribution list.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum WeightClass {
    /// Ultra light (10-15 tons for Meks).
    UltraLight,
    /// Light.
    Light,
    /// Medium.
    #[default]
    Medium,
    /// Heavy.
    Heavy,
    /// Assault.
    Assault,
    /// Super heavy.
    SuperHeavy,
}

impl WeightClass {
    /// All weight classes from lightest to heaviest.
    pub const ALL: [Self; 6] = [
        Self::UltraLight,
        Self::Light,
        Self::Medium,
        Self::Heavy,
        Self::Assault,
        Self::SuperHeavy,
    ];

    /// Position in [`WeightClass::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Weight class at the given index, if any.
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// This class and its direct neighbours.
    #[must_use]
    pub fn with_neighbours(self) -> Vec<Self> {
        let i = self.index();
        Self::ALL
            .iter()
            .copied()
            .filter(|w| w.index() + 1 >= i && w.index() <= i + 1)
            .collect()
    }

    /// Classify a Mek-scale tonnage.
    #[must_use]
    pub fn from_tonnage(tons: u32) -> Self {
        match tons {
            0..=15 => Self::UltraLight,
            16..=35 => Self::Light,
            36..=55 => Self::Medium,
            56..=75 => Self::Heavy,
            76..=100 => Self::Assault,
            _ => Self::SuperHeavy,
        }
    }
}

/// Motive type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MovementMode {
    /// Two legs.
    Biped,
    /// Four legs.
    Quad,
    /// Three legs.
    Tripod,
    /// Tracked vehicle.
    Tracked,
    /// Wheeled vehicle.
    Wheeled,
    /// Hovercraft.
    Hover,
    /// Rotorcraft.
    Vtol,
    /// Surface naval.
    Naval,
    /// Hydrofoil.
    Hydrofoil,
    /// Submarine.
    Submarine,
    /// Wing-in-ground-effect.
    Wige,
    /// Foot infantry.
    Leg,
    /// Jump infantry.
    Jump,
    /// Motorized infantry.
    Motorized,
    /// Aerodyne craft.
    Aerodyne,
    /// Spheroid craft.
    Spheroid,
}

/// Bitflags for C3-family network equipment.
///
/// Computed from equipment tags at catalog load time and cached per model.
///
/// # Example
///
/// ```
/// use forcegen_core::unit_kind::NetworkMask;
///
/// let mask = NetworkMask::C3_MASTER | NetworkMask::BOOSTED;
/// assert!(mask.contains(NetworkMask::C3_MASTER));
/// assert!(!mask.contains(NetworkMask::C3I));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct NetworkMask(u32);

impl NetworkMask {
    /// No network equipment.
    pub const NONE: Self = Self(0);
    /// Standard C3 slave unit.
    pub const C3_SLAVE: Self = Self(1 << 0);
    /// Standard C3 master computer.
    pub const C3_MASTER: Self = Self(1 << 1);
    /// Improved C3.
    pub const C3I: Self = Self(1 << 2);
    /// Nova combat electronic warfare system.
    pub const NOVA: Self = Self(1 << 3);
    /// Boosted variant of C3 equipment.
    pub const BOOSTED: Self = Self(1 << 4);
    /// Two C3 masters, able to command a company-level network.
    pub const COMPANY_COMMAND: Self = Self(1 << 5);

    /// Empty mask.
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// No flags set.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Check if all flags in `other` are set in `self`.
    #[inline]
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Check if any flags in `other` are set in `self`.
    #[inline]
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        (self.0 & other.0) != 0
    }

    /// Union of flags.
    #[inline]
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Flags of `self` not present in `other`.
    #[inline]
    #[must_use]
    pub const fn difference(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// Raw bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Create from raw bits.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Build network flags from equipment tags.
    ///
    /// Unknown tags are ignored so equipment can carry tags meant for other
    /// metrics.
    #[must_use]
    pub fn from_tags<S: AsRef<str>>(tags: &[S]) -> Self {
        let mut mask = Self::empty();
        for tag in tags {
            let flag = match tag.as_ref() {
                "c3_slave" => Self::C3_SLAVE,
                "c3_master" => Self::C3_MASTER,
                "c3_company" => Self::C3_MASTER | Self::COMPANY_COMMAND,
                "c3i" => Self::C3I,
                "nova" => Self::NOVA,
                "boosted" => Self::BOOSTED,
                _ => Self::empty(),
            };
            mask |= flag;
        }
        mask
    }
}

impl std::ops::BitOr for NetworkMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

impl std::ops::BitOrAssign for NetworkMask {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.union(rhs);
    }
}

/// Battlefield role of a model, as assigned in the catalog.
///
/// Formation templates express most of their requirements in these terms.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum CombatRole {
    /// No role assigned.
    #[default]
    Undetermined,
    /// Ambusher.
    Ambusher,
    /// Brawler.
    Brawler,
    /// Juggernaut.
    Juggernaut,
    /// Missile boat.
    MissileBoat,
    /// Scout.
    Scout,
    /// Skirmisher.
    Skirmisher,
    /// Sniper.
    Sniper,
    /// Striker.
    Striker,
    /// Attack fighter.
    AttackFighter,
    /// Dogfighter.
    Dogfighter,
    /// Fast dogfighter.
    FastDogfighter,
    /// Fire support fighter.
    FireSupport,
    /// Interceptor.
    Interceptor,
    /// Transport.
    Transport,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_from_tags() {
        let mask = NetworkMask::from_tags(&["c3_master", "boosted", "flak"]);
        assert!(mask.contains(NetworkMask::C3_MASTER | NetworkMask::BOOSTED));
        assert!(!mask.intersects(NetworkMask::C3_SLAVE));

        let company = NetworkMask::from_tags(&["c3_company"]);
        assert!(company.contains(NetworkMask::COMPANY_COMMAND));
        assert!(company.contains(NetworkMask::C3_MASTER));
    }

    #[test]
    fn test_weight_class_neighbours() {
        assert_eq!(
            WeightClass::UltraLight.with_neighbours(),
            vec![WeightClass::UltraLight, WeightClass::Light]
        );
        assert_eq!(
            WeightClass::Heavy.with_neighbours(),
            vec![WeightClass::Medium, WeightClass::Heavy, WeightClass::Assault]
        );
    }

    #[test]
    fn test_weight_class_from_tonnage() {
        assert_eq!(WeightClass::from_tonnage(20), WeightClass::Light);
        assert_eq!(WeightClass::from_tonnage(55), WeightClass::Medium);
        assert_eq!(WeightClass::from_tonnage(100), WeightClass::Assault);
        assert_eq!(WeightClass::from_index(3), Some(WeightClass::Heavy));
    }

    #[test]
    fn test_motive_choices_only_for_split_types() {
        assert!(UnitType::Mek.motive_choices().is_empty());
        assert!(UnitType::Tank.motive_choices().contains(&MovementMode::Hover));
    }
}
