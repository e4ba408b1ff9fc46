use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::snapshot::{CountryTally, Snapshot};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Member {
    pub external_id: String,
    pub display_name: String,
    pub snapshot: Snapshot,
}

/// A named group of listeners addressed by its join code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Community {
    pub join_code: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub members: Vec<Member>,
}

impl Community {
    pub fn new(join_code: String, name: String) -> Self {
        Self {
            join_code,
            name,
            created_at: Utc::now(),
            members: Vec::new(),
        }
    }

    /// Drops any member with the same `external_id`, appends `member`, returns the member count.
    pub fn upsert_member(&mut self, member: Member) -> usize {
        self.members
            .retain(|existing| existing.external_id != member.external_id);
        self.members.push(member);
        self.members.len()
    }

    pub fn tally(&self) -> CountryTally {
        let mut tally = CountryTally::default();
        for member in &self.members {
            tally.absorb(&member.snapshot);
        }
        tally
    }
}
