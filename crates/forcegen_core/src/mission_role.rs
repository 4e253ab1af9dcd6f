//! Mission roles and role-based availability adjustment.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::config::RoleTuning;
use crate::records::ModelRecord;

/// Tactical specialization declared for a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MissionRole {
    /// Reconnaissance.
    Recon,
    /// Long range fire support.
    FireSupport,
    /// Short range fire support.
    SrFireSupport,
    /// Tube artillery.
    Artillery,
    /// Missile artillery.
    MissileArtillery,
    /// Anti-aircraft.
    AntiAircraft,
    /// Anti-infantry.
    AntiInfantry,
    /// Infantry support.
    InfSupport,
    /// Armored personnel carrier.
    Apc,
    /// Cavalry.
    Cavalry,
    /// Raider.
    Raider,
    /// Urban combat.
    Urban,
    /// Command unit.
    Command,
    /// Engineering vehicle.
    Engineer,
    /// Mountain troops.
    Mountaineer,
    /// Airborne troops.
    Paratrooper,
    /// Marines.
    Marine,
    /// Extreme conditions troops.
    Xct,
    /// Special operations.
    SpecOps,
    /// Incendiary weapons.
    Incendiary,
    /// Electronic warfare.
    EwSupport,
    /// Spotter.
    Spotter,
    /// Field gun infantry.
    FieldGun,
    /// Mechanized battle armor (can ride OmniMeks).
    MechanizedBa,
    /// Magnetic clamp battle armor.
    MagClamp,
    /// Escort craft.
    Escort,
    /// Interceptor.
    Interceptor,
    /// Ground support aircraft.
    GroundSupport,
    /// Assault craft.
    Assault,
    /// Support vehicle.
    Support,
    /// Cargo carrier.
    Cargo,
    /// Tug.
    Tug,
    /// Civilian design.
    Civilian,
    /// Training design.
    Training,
}

/// How a desired role changes a model's availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RoleRule {
    /// The model must declare the role.
    Gate,
    /// Ranged-fire share above thresholds.
    LongRange,
    /// Short-ranged-fire share above thresholds.
    ShortRange,
    /// Flak share above thresholds.
    Flak,
    /// Speed above thresholds.
    Speed { fast: u8, adequate: u8 },
    /// Low ammunition dependency and decent speed.
    Raiding,
    /// Anti-personnel weapons.
    AntiPersonnel,
    /// Slow, short ranged or jump capable.
    Urban,
    /// Incendiary weapons.
    Incendiary,
    /// Declared, or old enough to be training stock.
    Training,
}

impl MissionRole {
    fn rule(self) -> RoleRule {
        match self {
            Self::FireSupport => RoleRule::LongRange,
            Self::SrFireSupport => RoleRule::ShortRange,
            Self::AntiAircraft => RoleRule::Flak,
            Self::Recon => RoleRule::Speed {
                fast: 7,
                adequate: 5,
            },
            Self::Cavalry => RoleRule::Speed {
                fast: 6,
                adequate: 4,
            },
            Self::Raider => RoleRule::Raiding,
            Self::AntiInfantry | Self::InfSupport => RoleRule::AntiPersonnel,
            Self::Urban => RoleRule::Urban,
            Self::Incendiary => RoleRule::Incendiary,
            Self::Training => RoleRule::Training,
            _ => RoleRule::Gate,
        }
    }
}

/// Tiered bonus for a fraction: `{2, 1, 0} * step` at the
/// `0.75 / 0.5 / 0.2` thresholds, `None` below the last one.
fn fraction_bonus(fraction: f64, step: f64) -> Option<f64> {
    if fraction > 0.75 {
        Some(2.0 * step)
    } else if fraction > 0.5 {
        Some(step)
    } else if fraction > 0.2 {
        Some(0.0)
    } else {
        None
    }
}

/// Adjust a model's availability for the requested mission roles.
///
/// Returns `None` when the model is excluded. `strictness` scales every
/// bonus and penalty; a model that declares a desired role gets the full
/// `strictness` as bonus, otherwise continuous roles grant tiered bonuses
/// of `strictness / divisor` from its derived metrics and subtract
/// `strictness` when it falls short.
///
/// When no desired role was met, each unrequested niche category the model
/// belongs to costs `n * penalty_step` for the n-th category matched.
#[must_use]
pub fn adjust_availability_by_role(
    availability: f64,
    desired: &BTreeSet<MissionRole>,
    model: &ModelRecord,
    year: i32,
    strictness: u8,
    tuning: &RoleTuning,
) -> Option<f64> {
    if tuning
        .excluded_unless_requested
        .iter()
        .any(|role| model.has_role(*role) && !desired.contains(role))
    {
        return None;
    }

    let full = f64::from(strictness);
    let step = if tuning.strictness_divisor > 0.0 {
        full / tuning.strictness_divisor
    } else {
        full
    };
    let metrics = &model.metrics;
    let mut av = availability;
    let mut matched = false;

    for &role in desired {
        if model.has_role(role) {
            av += full;
            matched = true;
            continue;
        }
        let bonus = match role.rule() {
            RoleRule::Gate => return None,
            RoleRule::LongRange => fraction_bonus(metrics.long_range, step),
            RoleRule::ShortRange => fraction_bonus(metrics.short_range, step),
            RoleRule::Flak => fraction_bonus(metrics.flak, step),
            RoleRule::Speed { fast, adequate } => {
                if metrics.speed >= fast {
                    Some(step)
                } else if metrics.speed >= adequate {
                    Some(0.0)
                } else {
                    None
                }
            }
            RoleRule::Raiding => {
                if metrics.speed < 5 {
                    None
                } else if metrics.ammo_dependency < 0.2 {
                    Some(2.0 * step)
                } else if metrics.ammo_dependency < 0.5 {
                    Some(step)
                } else {
                    None
                }
            }
            RoleRule::AntiPersonnel => metrics.anti_personnel.then_some(step),
            RoleRule::Urban => {
                if model.jump_mp > 0 || (metrics.speed <= 4 && metrics.short_range >= 0.5) {
                    Some(step)
                } else {
                    None
                }
            }
            RoleRule::Incendiary => {
                if metrics.incendiary {
                    Some(step)
                } else {
                    return None;
                }
            }
            RoleRule::Training => {
                if model.intro_year + tuning.training_age <= year {
                    Some(0.0)
                } else {
                    return None;
                }
            }
        };
        match bonus {
            Some(b) => {
                av += b;
                matched = true;
            }
            None => av -= full,
        }
    }

    if !matched {
        let mut tier = 0.0;
        for category in &tuning.penalty_categories {
            if category
                .roles
                .iter()
                .any(|r| model.has_role(*r) && !desired.contains(r))
            {
                tier += 1.0;
                av -= tier * tuning.penalty_step;
                tracing::trace!("{} penalized as {}", model.key, category.name);
            }
        }
    }
    Some(av)
}
