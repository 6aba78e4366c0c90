use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The canonical columns every import source is mapped onto.
///
/// Declaration order doubles as resolution priority: fields earlier in `ALL`
/// get first pick of the header columns, and a column claimed by an earlier
/// field is no longer available to later ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CanonicalField {
    FirstName,
    LastName,
    Email,
    PhoneNo,
    Source,
    Notes,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 6] = [
        CanonicalField::FirstName,
        CanonicalField::LastName,
        CanonicalField::Email,
        CanonicalField::PhoneNo,
        CanonicalField::Source,
        CanonicalField::Notes,
    ];

    /// Accepted header spellings, most specific first. Matching is
    /// substring-based in both directions, so order matters.
    pub fn variants(&self) -> &'static [&'static str] {
        match self {
            CanonicalField::FirstName => &["firstname", "first_name", "fname", "first name"],
            CanonicalField::LastName => &["lastname", "last_name", "lname", "last name"],
            CanonicalField::Email => &["email", "email_address", "mail"],
            CanonicalField::PhoneNo => &["phoneno", "phone_no", "phone", "mobile", "contact"],
            CanonicalField::Source => &["source", "lead_source", "origin"],
            CanonicalField::Notes => &["notes", "note", "remarks", "comments", "description"],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CanonicalField::FirstName => "firstName",
            CanonicalField::LastName => "lastName",
            CanonicalField::Email => "email",
            CanonicalField::PhoneNo => "phoneNo",
            CanonicalField::Source => "source",
            CanonicalField::Notes => "notes",
        }
    }

    pub(crate) fn index(&self) -> usize {
        *self as usize
    }
}

/// One normalized lead, ready for persistence or webhook dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LeadRecord {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_no: String,
    pub source: String,
    pub notes: Option<String>,
}

/// Authenticated caller. Passed explicitly into every storage call instead of
/// being read from ambient session state.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: Uuid,
    pub email: Option<String>,
    /// Bearer token forwarded to row-secured platform endpoints.
    pub access_token: String,
}

/// Result of making sure the caller has a tenant workspace.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TenantProvision {
    pub tenant_id: Uuid,
    /// True when the workspace was created by this call rather than found.
    pub created: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantInfo {
    pub id: Uuid,
    pub name: Option<String>,
    pub sheet_id: Option<String>,
}

/// Optional attributes for a freshly provisioned workspace.
#[derive(Debug, Clone, Default)]
pub struct TenantOptions {
    pub client_name: Option<String>,
    pub sheet_id: Option<String>,
}

/// Unique throwaway address for rows that arrive without an email column.
/// Keeps the (owner, email) conflict key usable for such rows.
pub fn placeholder_email() -> String {
    let millis = Utc::now().timestamp_millis();
    let tag = Uuid::new_v4().simple().to_string();
    format!("unknown_{}_{}@example.com", millis, &tag[..9])
}
