//! Tiny team_id -> role registry. Populated by the validation worker as
//! teams submit orders, and consulted by the trade processor so a trade's
//! passive (maker) counterparty — who has no live pending request at match
//! time — can still be fee-rated and position-updated correctly.

use dashmap::DashMap;

use crate::core_types::TeamId;

#[derive(Default)]
pub struct TeamDirectory {
    roles: DashMap<TeamId, String>,
}

impl TeamDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, team_id: TeamId, role: &str) {
        self.roles.insert(team_id, role.to_string());
    }

    pub fn role_of(&self, team_id: TeamId) -> Option<String> {
        self.roles.get(&team_id).map(|r| r.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_then_lookup_round_trips() {
        let dir = TeamDirectory::new();
        dir.upsert(1, "market_maker");
        assert_eq!(dir.role_of(1).as_deref(), Some("market_maker"));
    }

    #[test]
    fn unknown_team_has_no_role() {
        let dir = TeamDirectory::new();
        assert_eq!(dir.role_of(999), None);
    }
}
