//! Company profile store: display metadata CRUD and the company-id rename
//! migration.

use std::sync::Arc;

use thiserror::Error;

use crate::events::{EventBus, RecordKind};
use crate::models::{CompanyProfile, ProfilePatch};
use crate::storage::Storage;

type BoxError = Box<dyn std::error::Error>;

/// User-facing failures of `rename_company_id`. Everything here aborts the
/// operation before any record moves.
#[derive(Error, Debug)]
pub enum RenameError {
    #[error("new company id is empty")]
    EmptyTarget,
    #[error("new company id is the same as the current one")]
    SameId,
    #[error("company id \"{0}\" is already taken")]
    Taken(String),
    #[error("storage error: {0}")]
    Storage(String),
}

#[derive(Clone)]
pub struct ProfileStore {
    storage: Arc<Storage>,
    events: EventBus,
}

impl ProfileStore {
    pub fn new(storage: Arc<Storage>, events: EventBus) -> Self {
        Self { storage, events }
    }

    /// Stored profile, or the synthesized `{display_name: company_id}`
    /// default when none was ever saved.
    pub fn load(&self, company_id: &str) -> Result<CompanyProfile, BoxError> {
        self.storage.profile(company_id)
    }

    /// Shallow merge of the patch into the stored profile. `socials` is
    /// replaced wholesale when supplied, never deep-merged. Silent no-op
    /// without a company id.
    pub fn update(&self, company_id: &str, patch: ProfilePatch) -> Result<(), BoxError> {
        if company_id.is_empty() {
            return Ok(());
        }
        let mut profile = self.storage.profile(company_id)?;
        if let Some(display_name) = patch.display_name {
            profile.display_name = display_name;
        }
        if let Some(logo) = patch.logo_base64 {
            profile.logo_base64 = Some(logo);
        }
        if let Some(address) = patch.address {
            profile.address = Some(address);
        }
        if let Some(phone) = patch.phone {
            profile.phone = Some(phone);
        }
        if let Some(socials) = patch.socials {
            profile.socials = Some(socials);
        }
        self.storage.put_profile(company_id, &profile)?;
        self.events.publish(company_id, RecordKind::Profile);
        Ok(())
    }

    /// Move queue state, profile and credential from `old_id` to the
    /// normalized `new_id` and delete the old keys. Returns the id actually
    /// used. The moves are not transactional across record kinds; the
    /// collision guard runs before anything is touched.
    pub fn rename_company_id(&self, old_id: &str, new_id: &str) -> Result<String, RenameError> {
        // Same normalization as the admin form: trimmed, lowercased.
        let new_id = new_id.trim().to_lowercase();
        if new_id.is_empty() {
            return Err(RenameError::EmptyTarget);
        }
        if new_id == old_id {
            return Err(RenameError::SameId);
        }
        let collision = self
            .storage
            .password_for(&new_id)
            .map_err(|e| RenameError::Storage(e.to_string()))?;
        if collision.is_some() {
            return Err(RenameError::Taken(new_id));
        }

        self.storage
            .move_company_records(old_id, &new_id)
            .map_err(|e| RenameError::Storage(e.to_string()))?;

        self.events.publish(old_id, RecordKind::Profile);
        self.events.publish(&new_id, RecordKind::Profile);
        Ok(new_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Socials;
    use crate::storage::tests::temp_db;
    use std::fs;

    fn profile_store(name: &str) -> (ProfileStore, Arc<Storage>, std::path::PathBuf) {
        let (storage, dir) = temp_db(name);
        let storage = Arc::new(storage);
        (
            ProfileStore::new(storage.clone(), EventBus::new()),
            storage,
            dir,
        )
    }

    #[test]
    fn load_synthesizes_a_default() {
        let (store, _, dir) = profile_store("default");

        let profile = store.load("acme").unwrap();
        assert_eq!(profile.display_name, "acme");
        assert!(profile.logo_base64.is_none());

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn update_merges_shallowly() {
        let (store, _, dir) = profile_store("merge");

        store
            .update(
                "acme",
                ProfilePatch {
                    display_name: Some("Acme Inc".to_string()),
                    phone: Some("555-0100".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        store
            .update(
                "acme",
                ProfilePatch {
                    address: Some("Main St 1".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();

        let profile = store.load("acme").unwrap();
        assert_eq!(profile.display_name, "Acme Inc");
        assert_eq!(profile.phone.as_deref(), Some("555-0100"));
        assert_eq!(profile.address.as_deref(), Some("Main St 1"));

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn socials_are_replaced_wholesale() {
        let (store, _, dir) = profile_store("socials");

        store
            .update(
                "acme",
                ProfilePatch {
                    socials: Some(Socials {
                        website: Some("https://acme.example".to_string()),
                        instagram: Some("@acme".to_string()),
                        facebook: None,
                    }),
                    ..Default::default()
                },
            )
            .unwrap();
        store
            .update(
                "acme",
                ProfilePatch {
                    socials: Some(Socials {
                        website: Some("https://new.example".to_string()),
                        instagram: None,
                        facebook: None,
                    }),
                    ..Default::default()
                },
            )
            .unwrap();

        let socials = store.load("acme").unwrap().socials.unwrap();
        assert_eq!(socials.website.as_deref(), Some("https://new.example"));
        // Not deep-merged: the old instagram handle is gone.
        assert!(socials.instagram.is_none());

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn rename_moves_all_three_records() {
        let (store, storage, dir) = profile_store("rename");

        store
            .update(
                "old",
                ProfilePatch {
                    display_name: Some("Old Co".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        storage.set_password("old", "pw").unwrap();
        storage
            .put_queue_state("old", &{
                let mut s = crate::models::QueueState::default();
                s.queue.push("A-001".to_string());
                s.next_ticket_number = 2;
                s
            })
            .unwrap();

        let used = store.rename_company_id("old", "  New  ").unwrap();
        assert_eq!(used, "new");

        assert_eq!(store.load("new").unwrap().display_name, "Old Co");
        assert_eq!(storage.password_for("new").unwrap().as_deref(), Some("pw"));
        assert_eq!(storage.queue_state("new").unwrap().queue, vec!["A-001"]);

        // Old id reads back as synthesized defaults.
        assert_eq!(store.load("old").unwrap().display_name, "old");
        assert!(storage.password_for("old").unwrap().is_none());

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn rename_rejects_bad_targets() {
        let (store, storage, dir) = profile_store("rename_reject");

        storage.set_password("old", "pw").unwrap();

        assert!(matches!(
            store.rename_company_id("old", "   "),
            Err(RenameError::EmptyTarget)
        ));
        assert!(matches!(
            store.rename_company_id("old", "OLD"),
            Err(RenameError::SameId)
        ));
        // "fluxo" is seeded, so it collides.
        assert!(matches!(
            store.rename_company_id("old", "fluxo"),
            Err(RenameError::Taken(_))
        ));

        // Nothing moved.
        assert_eq!(storage.password_for("old").unwrap().as_deref(), Some("pw"));

        let _ = fs::remove_dir_all(dir);
    }
}
