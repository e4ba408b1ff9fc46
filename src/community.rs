use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tracing::info;
use uuid::Uuid;

use crate::error::PassportError;
use crate::models::{Community, Member, Snapshot};
use crate::passport::RegionRollup;

const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
const CODE_LENGTH: usize = 6;

/// In-memory registry of communities keyed by join code. Lives as long as the process.
///
/// The registry map and each community's member list have separate locks, so joins to
/// different communities do not contend.
pub struct CommunityStore {
    communities: RwLock<HashMap<String, Arc<Mutex<Community>>>>,
    rollup: RegionRollup,
    name_max: usize,
}

impl CommunityStore {
    pub fn new(rollup: RegionRollup, name_max: usize) -> Self {
        Self {
            communities: RwLock::new(HashMap::new()),
            rollup,
            name_max,
        }
    }

    /// Registers a new community and returns its join code.
    pub fn create(&self, name: &str) -> Result<String, PassportError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PassportError::invalid("community name must not be empty"));
        }
        if name.chars().count() > self.name_max {
            return Err(PassportError::invalid(format!(
                "community name must be at most {} characters",
                self.name_max
            )));
        }

        let mut communities = self
            .communities
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let code = loop {
            let candidate = generate_code();
            if !communities.contains_key(&candidate) {
                break candidate;
            }
        };
        communities.insert(
            code.clone(),
            Arc::new(Mutex::new(Community::new(code.clone(), name.to_string()))),
        );

        info!(code = %code, name = %name, "community created");
        Ok(code)
    }

    /// Adds or replaces the member with `external_id`. Returns the new member count.
    pub fn join(
        &self,
        code: &str,
        external_id: &str,
        display_name: &str,
        snapshot: Snapshot,
    ) -> Result<usize, PassportError> {
        let external_id = external_id.trim();
        if external_id.is_empty() {
            return Err(PassportError::invalid("member id must not be empty"));
        }

        let community = self.lookup(code)?;
        let mut community = community.lock().unwrap_or_else(PoisonError::into_inner);
        let display_name = match display_name.trim() {
            "" => external_id,
            trimmed => trimmed,
        };
        let count = community.upsert_member(Member {
            external_id: external_id.to_string(),
            display_name: display_name.to_string(),
            snapshot,
        });

        info!(code = %code, member = %external_id, members = count, "member joined community");
        Ok(count)
    }

    /// Group snapshot: members' country counts summed, then rolled up once.
    pub fn aggregate(&self, code: &str) -> Result<Snapshot, PassportError> {
        self.get_with_aggregate(code).map(|(_, snapshot)| snapshot)
    }

    /// The community and its group snapshot, both taken under one lock so the member list
    /// and the totals always agree.
    pub fn get_with_aggregate(&self, code: &str) -> Result<(Community, Snapshot), PassportError> {
        let community = self.lookup(code)?;
        let community = community
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let snapshot = self.rollup.snapshot(community.tally());
        Ok((community, snapshot))
    }

    /// Copy of the community as it is right now.
    pub fn get(&self, code: &str) -> Result<Community, PassportError> {
        let community = self.lookup(code)?;
        let community = community
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        Ok(community)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.lookup(code).is_ok()
    }

    pub fn len(&self) -> usize {
        self.communities
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, code: &str) -> Result<Arc<Mutex<Community>>, PassportError> {
        let code = code.trim().to_ascii_uppercase();
        self.communities
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&code)
            .cloned()
            .ok_or(PassportError::NotFound(code))
    }
}

// Bytes 9..16 of a v4 UUID carry no version or variant bits.
const RANDOM_BITS: u32 = 56;

fn generate_code() -> String {
    let bytes = Uuid::new_v4().into_bytes();
    let mut raw = [0u8; 8];
    raw[1..].copy_from_slice(&bytes[9..]);
    encode_code(u64::from_be_bytes(raw))
}

/// Writes `value` in base 31 over the code alphabet, keeping the low `CODE_LENGTH` digits.
///
/// 56 random bits reduced modulo 31^6 leaves a bias below one part in 10^7 per code.
fn encode_code(mut value: u64) -> String {
    debug_assert!(value < 1 << RANDOM_BITS);
    let base = CODE_ALPHABET.len() as u64;
    let mut code = [0u8; CODE_LENGTH];
    for slot in code.iter_mut().rev() {
        *slot = CODE_ALPHABET[(value % base) as usize];
        value /= base;
    }
    code.iter().map(|&byte| byte as char).collect()
}
