//! Core data models used throughout Physician Finder.
//!
//! These types represent the physician records imported from the NPPES
//! registry and the account rows (users, organizations, memberships) that
//! partner organizations manage. JSON field names are camelCase on the wire.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Implements `as_str`, `Display` and `FromStr` for a registry code enum.
macro_rules! registry_code {
    ($ty:ident { $($variant:ident => $code:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $code),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = anyhow::Error;

            fn from_str(s: &str) -> anyhow::Result<Self> {
                match s {
                    $($code => Ok(Self::$variant),)+
                    other => anyhow::bail!("invalid {} code: '{}'", stringify!($ty), other),
                }
            }
        }
    };
}

/// Gender as recorded in the NPPES registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
    #[serde(rename = "X")]
    Unspecified,
}

registry_code!(Gender {
    Male => "M",
    Female => "F",
    Unspecified => "X",
});

/// Enumeration status of an NPI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProviderStatus {
    #[default]
    #[serde(rename = "A")]
    Active,
    #[serde(rename = "I")]
    Inactive,
    #[serde(rename = "D")]
    Deactivated,
    #[serde(rename = "R")]
    Retired,
}

registry_code!(ProviderStatus {
    Active => "A",
    Inactive => "I",
    Deactivated => "D",
    Retired => "R",
});

/// Role of a user, either platform-wide or within one organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    #[default]
    Member,
}

registry_code!(UserRole {
    Admin => "admin",
    Member => "member",
});

/// A taxonomy (specialty) entry from the NUCC code set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecialtyInfo {
    pub taxonomy_code: String,
    pub taxonomy_description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_state: Option<String>,
    pub primary_specialty: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board_certified: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AddressType {
    Location,
    Mailing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AddressPurpose {
    Practice,
    Home,
    Administrative,
}

/// A practice or mailing address in NPPES shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeAddress {
    pub address_line1: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_line2: Option<String>,
    pub city: String,
    /// Two-letter state code.
    pub state: String,
    /// ZIP or ZIP+4.
    pub zip_code: String,
    /// ISO 3166-1 alpha-2.
    pub country_code: String,
    pub address_type: AddressType,
    pub address_purpose: AddressPurpose,
    pub is_primary: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PhoneType {
    Practice,
    Fax,
    Direct,
    Mobile,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhoneNumber {
    pub number: String,
    #[serde(rename = "type")]
    pub phone_type: PhoneType,
    pub is_primary: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_id: Option<String>,
}

/// WGS 84 point for the primary practice location.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// A physician record keyed by NPI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Physician {
    pub npi: String,
    pub first_name: String,
    pub last_name: String,
    pub middle_name: Option<String>,
    pub suffix: Option<String>,
    pub credential: Option<String>,
    pub gender: Option<Gender>,
    #[serde(default)]
    pub status: ProviderStatus,

    pub enumeration_date: NaiveDate,
    #[serde(rename = "lastUpdatedNPPES")]
    pub last_updated_nppes: Option<NaiveDate>,
    pub deactivation_date: Option<NaiveDate>,
    pub deactivation_reason: Option<String>,
    pub reactivation_date: Option<NaiveDate>,

    pub primary_specialty: Option<SpecialtyInfo>,
    #[serde(default)]
    pub secondary_specialties: Vec<SpecialtyInfo>,
    #[serde(default)]
    pub addresses: Vec<PracticeAddress>,
    #[serde(default)]
    pub phone_numbers: Vec<PhoneNumber>,

    /// Primary practice state, uppercased at import time.
    pub address_state: Option<String>,
    /// Primary practice 5-digit ZIP.
    pub address_zip5: Option<String>,
    pub location: Option<GeoPoint>,

    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub accepts_telehealth: bool,

    pub ai_bio: Option<String>,
    pub ai_bio_source: Option<String>,
    pub ai_bio_version: Option<String>,
    pub ai_bio_enriched_at: Option<DateTime<Utc>>,
    pub geo_enriched_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Physician {
    /// A minimal active record, used by importers and tests as a starting point.
    pub fn new(
        npi: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        enumeration_date: NaiveDate,
    ) -> Self {
        let now = Utc::now();
        Self {
            npi: npi.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            middle_name: None,
            suffix: None,
            credential: None,
            gender: None,
            status: ProviderStatus::Active,
            enumeration_date,
            last_updated_nppes: None,
            deactivation_date: None,
            deactivation_reason: None,
            reactivation_date: None,
            primary_specialty: None,
            secondary_specialties: Vec::new(),
            addresses: Vec::new(),
            phone_numbers: Vec::new(),
            address_state: None,
            address_zip5: None,
            location: None,
            languages: Vec::new(),
            accepts_telehealth: false,
            ai_bio: None,
            ai_bio_source: None,
            ai_bio_version: None,
            ai_bio_enriched_at: None,
            geo_enriched_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// "First Middle Last, Credential" for display.
    pub fn display_name(&self) -> String {
        let mut name = self.first_name.clone();
        if let Some(ref middle) = self.middle_name {
            name.push(' ');
            name.push_str(middle);
        }
        name.push(' ');
        name.push_str(&self.last_name);
        if let Some(ref suffix) = self.suffix {
            name.push(' ');
            name.push_str(suffix);
        }
        if let Some(ref credential) = self.credential {
            name.push_str(", ");
            name.push_str(credential);
        }
        name
    }

    pub fn primary_specialty_description(&self) -> Option<&str> {
        self.primary_specialty
            .as_ref()
            .map(|s| s.taxonomy_description.as_str())
    }
}

/// A platform user, keyed by the authentication provider's user id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: String,
    pub platform_role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub user_id: String,
    #[serde(default)]
    pub platform_role: Option<UserRole>,
}

/// Field replacement for a user. `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    #[serde(default)]
    pub platform_role: Option<UserRole>,
}

impl UserUpdate {
    pub fn is_empty(&self) -> bool {
        self.platform_role.is_none()
    }
}

/// A partner organization that owns finder instances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrganization {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
}

impl OrganizationUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.slug.is_none()
    }
}

/// Links a user to an organization with a role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationMembership {
    pub user_id: String,
    pub organization_id: Uuid,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Derives a URL slug from an organization name: lowercase alphanumeric
/// words joined by `-`.
pub fn slugify(name: &str) -> String {
    name.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join("-")
}
