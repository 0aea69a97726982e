use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::Db;
use tracing::warn;

use crate::models::{CompanyProfile, QueueState};

type BoxError = Box<dyn std::error::Error>;

/// Keyed storage adapter over Sled.
///
/// One tree per record kind, one JSON entry per company id:
/// - `queues`: company id -> QueueState
/// - `profiles`: company id -> CompanyProfile
/// - `credentials`: company id -> plaintext password
///
/// Records are created lazily; a missing or unparsable entry reads as the
/// synthesized default and is never an error.
#[allow(dead_code)] // db kept for future ops like flush/close on Sled
#[derive(Clone)] // Sled internals are cheap to clone; shared across handlers
pub struct Storage {
    db: Db,
    queue_tree: sled::Tree,
    profile_tree: sled::Tree,
    credential_tree: sled::Tree,
}

impl Storage {
    /// Open or create the Sled database at the given path and seed the
    /// default credentials/profiles on first-ever use.
    pub fn open(path: &str) -> Result<Self, BoxError> {
        let db = sled::open(path)?;
        let queue_tree = db.open_tree("queues")?;
        let profile_tree = db.open_tree("profiles")?;
        let credential_tree = db.open_tree("credentials")?;

        let storage = Self {
            db,
            queue_tree,
            profile_tree,
            credential_tree,
        };
        storage.seed_defaults()?;
        Ok(storage)
    }

    /// First-run seeding: if no credential entry exists at all, create the
    /// stock `admin`/`admin` and `fluxo`/`fluxo` logins and their display
    /// profiles. A non-empty credential tree is left untouched.
    fn seed_defaults(&self) -> Result<(), BoxError> {
        if !self.credential_tree.is_empty() {
            return Ok(());
        }
        self.set_password("admin", "admin")?;
        self.set_password("fluxo", "fluxo")?;
        self.put_profile(
            "admin",
            &CompanyProfile {
                display_name: "Admin Control".to_string(),
                ..CompanyProfile::named("admin")
            },
        )?;
        self.put_profile(
            "fluxo",
            &CompanyProfile {
                display_name: "FluxoÁgil Demo".to_string(),
                ..CompanyProfile::named("fluxo")
            },
        )?;
        Ok(())
    }

    /// Read a JSON record, substituting `default` when the entry is missing
    /// or fails to parse. Parse failures are logged and treated as no data.
    fn read_json<T: DeserializeOwned>(
        tree: &sled::Tree,
        key: &str,
        default: impl FnOnce() -> T,
    ) -> Result<T, BoxError> {
        match tree.get(key.as_bytes())? {
            Some(bytes) => match serde_json::from_slice(&bytes) {
                Ok(value) => Ok(value),
                Err(e) => {
                    warn!(key, error = %e, "unparsable record, falling back to default");
                    Ok(default())
                }
            },
            None => Ok(default()),
        }
    }

    fn write_json<T: Serialize>(tree: &sled::Tree, key: &str, value: &T) -> Result<(), BoxError> {
        let bytes = serde_json::to_vec(value)?;
        tree.insert(key.as_bytes(), bytes)?;
        Ok(())
    }

    // --- Queue state ---

    pub fn queue_state(&self, company_id: &str) -> Result<QueueState, BoxError> {
        Self::read_json(&self.queue_tree, company_id, QueueState::default)
    }

    pub fn put_queue_state(&self, company_id: &str, state: &QueueState) -> Result<(), BoxError> {
        Self::write_json(&self.queue_tree, company_id, state)
    }

    // --- Profiles ---

    pub fn profile(&self, company_id: &str) -> Result<CompanyProfile, BoxError> {
        Self::read_json(&self.profile_tree, company_id, || {
            CompanyProfile::named(company_id)
        })
    }

    pub fn put_profile(&self, company_id: &str, profile: &CompanyProfile) -> Result<(), BoxError> {
        Self::write_json(&self.profile_tree, company_id, profile)
    }

    /// Whether a profile was ever explicitly saved (rename migration skips
    /// companies that only ever had the synthesized default).
    pub fn has_profile(&self, company_id: &str) -> Result<bool, BoxError> {
        Ok(self.profile_tree.contains_key(company_id.as_bytes())?)
    }

    // --- Credentials (plaintext, see DESIGN.md) ---

    pub fn password_for(&self, company_id: &str) -> Result<Option<String>, BoxError> {
        match self.credential_tree.get(company_id.as_bytes())? {
            Some(bytes) => Ok(Some(String::from_utf8(bytes.to_vec())?)),
            None => Ok(None),
        }
    }

    pub fn set_password(&self, company_id: &str, password: &str) -> Result<(), BoxError> {
        self.credential_tree
            .insert(company_id.as_bytes(), password.as_bytes())?;
        Ok(())
    }

    // --- Rename migration primitives ---

    /// Move the raw entry for `old_id` (if any) to `new_id` in every tree.
    /// Not transactional across trees; see DESIGN.md on atomicity.
    pub fn move_company_records(&self, old_id: &str, new_id: &str) -> Result<(), BoxError> {
        for tree in [&self.queue_tree, &self.profile_tree, &self.credential_tree] {
            if let Some(bytes) = tree.get(old_id.as_bytes())? {
                tree.insert(new_id.as_bytes(), bytes)?;
                tree.remove(old_id.as_bytes())?;
            }
        }
        Ok(())
    }
}
