//! Known peers and whether they are still in the session.
//!
//! Entries are never removed: a peer that leaves is only deactivated, so
//! score tables keyed by address stay meaningful after it disconnects.

use std::collections::BTreeMap;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub address: IpAddr,
    pub active: bool,
}

#[derive(Debug, Clone)]
pub struct Registry {
    local: IpAddr,
    participants: BTreeMap<IpAddr, bool>,
}

impl Registry {
    /// A registry that already contains the local peer, active.
    pub fn new(local: IpAddr) -> Self {
        let mut participants = BTreeMap::new();
        participants.insert(local, true);
        Self {
            local,
            participants,
        }
    }

    pub fn local_address(&self) -> IpAddr {
        self.local
    }

    /// Mark `address` active, inserting it if unseen. Returns whether
    /// anything changed.
    pub fn upsert_active(&mut self, address: IpAddr) -> bool {
        match self.participants.insert(address, true) {
            Some(was_active) => !was_active,
            None => true,
        }
    }

    /// Insert `address` as active only if it has never been seen.
    pub fn observe(&mut self, address: IpAddr) -> bool {
        if self.participants.contains_key(&address) {
            return false;
        }
        self.participants.insert(address, true);
        true
    }

    /// Deactivate a known peer. Unknown addresses and the local peer are
    /// left alone.
    pub fn mark_inactive(&mut self, address: IpAddr) -> bool {
        if address == self.local {
            return false;
        }
        match self.participants.get_mut(&address) {
            Some(active) if *active => {
                *active = false;
                true
            }
            _ => false,
        }
    }

    pub fn contains(&self, address: IpAddr) -> bool {
        self.participants.contains_key(&address)
    }

    pub fn is_active(&self, address: IpAddr) -> bool {
        self.participants.get(&address).copied().unwrap_or(false)
    }

    /// Active participants, self included, sorted by address.
    pub fn list_active(&self) -> Vec<Participant> {
        self.participants
            .iter()
            .filter(|(_, active)| **active)
            .map(|(&address, &active)| Participant { address, active })
            .collect()
    }

    /// Active participants other than the local peer, sorted by address.
    pub fn active_peers(&self) -> impl Iterator<Item = IpAddr> + '_ {
        self.participants
            .iter()
            .filter(move |(addr, active)| **active && **addr != self.local)
            .map(|(addr, _)| *addr)
    }

    pub fn active_count(&self) -> usize {
        self.participants.values().filter(|a| **a).count()
    }

    /// Every participant ever seen, active or not, self included.
    pub fn count(&self) -> usize {
        self.participants.len()
    }

    pub fn known_addresses(&self) -> Vec<IpAddr> {
        self.participants.keys().copied().collect()
    }

    /// Full roster, sorted by address.
    pub fn snapshot(&self) -> Vec<Participant> {
        self.participants
            .iter()
            .map(|(&address, &active)| Participant { address, active })
            .collect()
    }
}
