//! C3-family network plans.

use crate::config::NetworkSizes;
use crate::records::ModelRecord;
use crate::unit_kind::NetworkMask;

/// Network family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NetworkKind {
    /// Master and slave C3.
    C3,
    /// Improved C3; every member is a peer.
    C3i,
    /// Nova CEWS; every member is a peer.
    Nova,
}

/// Part a unit plays in a network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum NetworkRole {
    /// Not networked.
    #[default]
    None,
    /// C3 master.
    Master,
    /// Company command master (two master computers).
    DualMaster,
    /// C3 slave.
    Slave,
    /// C3i or Nova member.
    Peer,
}

/// How many units of each role a network needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkPlan {
    /// Network family.
    pub kind: NetworkKind,
    /// Boosted equipment required on every member.
    pub boosted: bool,
    /// Company command variant of C3.
    pub company_command: bool,
    /// Networked units.
    pub size: usize,
}

impl NetworkPlan {
    /// Plan for the network requested by `mask` in a formation of `total`
    /// units, or `None` when no network is requested or it cannot form.
    #[must_use]
    pub fn for_mask(mask: NetworkMask, total: usize, sizes: &NetworkSizes) -> Option<Self> {
        let (kind, max) = if mask.intersects(NetworkMask::C3I) {
            (NetworkKind::C3i, sizes.c3i)
        } else if mask.intersects(NetworkMask::NOVA) {
            (NetworkKind::Nova, sizes.nova)
        } else if mask.intersects(
            NetworkMask::C3_MASTER | NetworkMask::C3_SLAVE | NetworkMask::COMPANY_COMMAND,
        ) {
            (NetworkKind::C3, sizes.c3)
        } else {
            return None;
        };
        let size = total.min(max);
        (size >= 2).then_some(Self {
            kind,
            boosted: mask.contains(NetworkMask::BOOSTED),
            company_command: mask.contains(NetworkMask::COMPANY_COMMAND),
            size,
        })
    }

    /// The same network with fewer members.
    #[must_use]
    pub fn resized(&self, size: usize) -> Self {
        Self {
            size,
            ..self.clone()
        }
    }

    /// Role counts, summing to `size`.
    #[must_use]
    pub fn roles(&self) -> Vec<(NetworkRole, usize)> {
        match self.kind {
            NetworkKind::C3 => {
                let master = if self.company_command {
                    NetworkRole::DualMaster
                } else {
                    NetworkRole::Master
                };
                vec![(master, 1), (NetworkRole::Slave, self.size - 1)]
            }
            NetworkKind::C3i | NetworkKind::Nova => vec![(NetworkRole::Peer, self.size)],
        }
    }

    /// Role counts for a formation of `total` units, padding with
    /// [`NetworkRole::None`].
    #[must_use]
    pub fn roles_for(plan: Option<&Self>, total: usize) -> Vec<(NetworkRole, usize)> {
        let mut roles = plan.map(Self::roles).unwrap_or_default();
        let networked: usize = roles.iter().map(|(_, n)| n).sum();
        roles.push((NetworkRole::None, total.saturating_sub(networked)));
        roles.retain(|(_, n)| *n > 0);
        roles
    }

    /// Whether a model can fill `role` in this network.
    #[must_use]
    pub fn accepts(&self, role: NetworkRole, model: &ModelRecord) -> bool {
        let needed = match (role, self.kind) {
            (NetworkRole::None, _) => return true,
            (NetworkRole::Master, _) => NetworkMask::C3_MASTER,
            (NetworkRole::DualMaster, _) => NetworkMask::COMPANY_COMMAND,
            (NetworkRole::Slave, _) => NetworkMask::C3_SLAVE,
            (NetworkRole::Peer, NetworkKind::Nova) => NetworkMask::NOVA,
            (NetworkRole::Peer, _) => NetworkMask::C3I,
        };
        let needed = if self.boosted && self.kind == NetworkKind::C3 {
            needed | NetworkMask::BOOSTED
        } else {
            needed
        };
        model.network.contains(needed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_c3_plan_is_one_master_and_slaves() {
        let plan = NetworkPlan::for_mask(NetworkMask::C3_MASTER, 6, &NetworkSizes::default())
            .expect("plan");
        assert_eq!(plan.size, 4);
        assert_eq!(
            plan.roles(),
            vec![(NetworkRole::Master, 1), (NetworkRole::Slave, 3)]
        );
        assert_eq!(
            NetworkPlan::roles_for(Some(&plan), 6),
            vec![
                (NetworkRole::Master, 1),
                (NetworkRole::Slave, 3),
                (NetworkRole::None, 2)
            ]
        );
    }

    #[test]
    fn test_peer_networks() {
        let sizes = NetworkSizes::default();
        let c3i = NetworkPlan::for_mask(NetworkMask::C3I, 4, &sizes).expect("plan");
        assert_eq!(c3i.roles(), vec![(NetworkRole::Peer, 4)]);
        let nova = NetworkPlan::for_mask(NetworkMask::NOVA, 5, &sizes).expect("plan");
        assert_eq!(nova.size, 3);
    }

    #[test]
    fn test_no_plan() {
        let sizes = NetworkSizes::default();
        assert!(NetworkPlan::for_mask(NetworkMask::NONE, 4, &sizes).is_none());
        assert!(NetworkPlan::for_mask(NetworkMask::C3I, 1, &sizes).is_none());
        assert_eq!(
            NetworkPlan::roles_for(None, 4),
            vec![(NetworkRole::None, 4)]
        );
    }

    #[test]
    fn test_company_command_uses_dual_master() {
        let plan = NetworkPlan::for_mask(
            NetworkMask::COMPANY_COMMAND,
            4,
            &NetworkSizes::default(),
        )
        .expect("plan");
        assert_eq!(plan.roles()[0], (NetworkRole::DualMaster, 1));
    }
}
