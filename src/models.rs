use serde::{Deserialize, Serialize};

/// Per-company queue record, one instance per company id.
///
/// An issued ticket lives in exactly one of `queue`, `current_ticket` or
/// `history` at any time; only a full reset discards tickets.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct QueueState {
    pub current_ticket: Option<String>,
    /// Waiting tickets, FIFO, head is called next.
    pub queue: Vec<String>,
    /// Monotonic counter, never reused; back to 1 only on a full reset.
    pub next_ticket_number: u32,
    /// Finished tickets, most recent first, capped at 50.
    // default for records written before history existed
    #[serde(default)]
    pub history: Vec<String>,
}

impl Default for QueueState {
    fn default() -> Self {
        Self {
            current_ticket: None,
            queue: vec![],
            next_ticket_number: 1,
            history: vec![],
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Socials {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instagram: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facebook: Option<String>,
}

/// Display metadata for one company. `display_name` falls back to the
/// company id when nothing has been stored yet.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CompanyProfile {
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_base64: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub socials: Option<Socials>,
}

impl CompanyProfile {
    /// Synthesized default for a company that never saved a profile.
    pub fn named(company_id: &str) -> Self {
        Self {
            display_name: company_id.to_string(),
            logo_base64: None,
            address: None,
            phone: None,
            socials: None,
        }
    }
}

/// Partial profile update. Fields left as `None` keep their stored value;
/// `socials` is replaced wholesale when supplied, not deep-merged.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct ProfilePatch {
    pub display_name: Option<String>,
    pub logo_base64: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub socials: Option<Socials>,
}

/// JWT claims for an authenticated admin session.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AuthPayload {
    pub sub: String, // company id
    pub exp: usize,
}
