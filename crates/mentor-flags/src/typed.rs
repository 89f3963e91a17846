//! Typed accessors for the structured well-known flags

use crate::error::{FlagError, FlagResult};
use crate::names;
use crate::store::FlagStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::info;

/// Signed-in role, a client-side flag only
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Mentor,
    Mentee,
    /// Platform staff
    Admin,
}

impl Role {
    /// Wire name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mentor => "mentor",
            Self::Mentee => "mentee",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = FlagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mentor" => Ok(Self::Mentor),
            "mentee" => Ok(Self::Mentee),
            "admin" => Ok(Self::Admin),
            _ => Err(FlagError::invalid_value(
                names::ROLE,
                format!("unknown role '{s}'"),
            )),
        }
    }
}

/// Decision recorded for an agreement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsentStatus {
    Accepted,
    Declined,
}

/// One consent decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentRecord {
    /// Agreement version, e.g. `v1.0`
    pub version: String,
    /// Decision
    pub status: ConsentStatus,
    /// When the decision was made
    pub timestamp: DateTime<Utc>,
}

impl ConsentRecord {
    /// Acceptance of `version` now
    pub fn accepted(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            status: ConsentStatus::Accepted,
            timestamp: Utc::now(),
        }
    }
}

/// Consent records keyed by agreement name
pub type Consents = BTreeMap<String, ConsentRecord>;

impl FlagStore {
    /// Stored role, [`Role::Mentor`] when unset or unreadable
    #[must_use]
    pub fn role(&self) -> Role {
        self.get(names::ROLE, Role::default())
    }

    /// Store the role
    pub fn set_role(&self, role: Role) -> bool {
        self.set(names::ROLE, &role)
    }

    /// Consent map stored under `flag`, empty when unset or unreadable
    #[must_use]
    pub fn consents(&self, flag: &str) -> Consents {
        self.get(flag, Consents::new())
    }

    /// Record a consent decision for `agreement` under `flag`
    ///
    /// Other agreements in the map are preserved.
    pub fn record_consent(&self, flag: &str, agreement: &str, record: ConsentRecord) -> bool {
        let mut consents = self.consents(flag);
        let accepted = record.status == ConsentStatus::Accepted;
        consents.insert(agreement.to_string(), record);
        let stored = self.set(flag, &consents);
        if stored && flag == names::MENTOR_LEGAL_CONSENTS && accepted {
            self.set(names::MENTOR_AGREEMENT_ACCEPTED, &true);
        }
        stored
    }

    /// Whether `agreement` under `flag` is accepted at `version`
    #[must_use]
    pub fn has_accepted(&self, flag: &str, agreement: &str, version: &str) -> bool {
        self.consents(flag)
            .get(agreement)
            .is_some_and(|r| r.status == ConsentStatus::Accepted && r.version == version)
    }

    /// Email left on the Instagram waitlist
    #[must_use]
    pub fn waitlist_email(&self) -> Option<String> {
        self.try_get(names::INSTAGRAM_WAITLIST_EMAIL)
    }

    /// Join the Instagram waitlist with `email`
    ///
    /// # Errors
    ///
    /// Returns [`FlagError::InvalidValue`] if `email` is not an address.
    pub fn join_waitlist(&self, email: &str) -> FlagResult<bool> {
        let email = email.trim();
        let valid = email.split_once('@').is_some_and(|(user, domain)| {
            !user.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        });
        if !valid {
            return Err(FlagError::invalid_value(
                names::INSTAGRAM_WAITLIST_EMAIL,
                format!("'{email}' is not an email address"),
            ));
        }

        let stored = self.set(names::INSTAGRAM_WAITLIST_EMAIL, email);
        if stored {
            info!("joined instagram waitlist");
        }
        Ok(stored)
    }

    /// Store a flag given as text
    ///
    /// `role` and the waitlist email go through their typed setters. Any
    /// other value is stored as JSON when it parses, else as a string.
    ///
    /// # Errors
    ///
    /// Returns [`FlagError::InvalidValue`] for a bad role or email and
    /// [`FlagError::Unavailable`] when the backend did not store the value.
    pub fn set_text(&self, name: &str, text: &str) -> FlagResult<()> {
        let stored = match name {
            names::ROLE => self.set_role(text.parse()?),
            names::INSTAGRAM_WAITLIST_EMAIL => self.join_waitlist(text)?,
            _ => {
                let value: serde_json::Value = serde_json::from_str(text)
                    .unwrap_or_else(|_| serde_json::Value::String(text.to_string()));
                self.set(name, &value)
            }
        };
        if stored {
            Ok(())
        } else {
            Err(FlagError::Unavailable(format!("{name} was not stored")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MemoryBackend, UnavailableBackend};
    use std::sync::Arc;

    fn store() -> FlagStore {
        FlagStore::new(Arc::new(MemoryBackend::new()))
    }

    #[test]
    fn text_values_use_typed_setters() {
        let store = store();
        store.set_text(names::ROLE, "Admin").unwrap();
        assert_eq!(store.role(), Role::Admin);
        store.set_text(names::DEMO_MODE, "true").unwrap();
        assert_eq!(store.try_get::<bool>(names::DEMO_MODE), Some(true));
        store.set_text(names::THEME, "dark").unwrap();
        assert_eq!(store.try_get::<String>(names::THEME).as_deref(), Some("dark"));
        assert!(store.set_text(names::ROLE, "owner").is_err());
    }

    #[test]
    fn text_values_report_unavailable_storage() {
        let store = FlagStore::new(Arc::new(UnavailableBackend::default()));
        for (name, text) in [
            (names::ROLE, "mentor"),
            (names::INSTAGRAM_WAITLIST_EMAIL, "dr.khan@example.nhs.uk"),
            (names::THEME, "\"dark\""),
        ] {
            let err = store.set_text(name, text).unwrap_err();
            assert!(err.is_unavailable(), "{name}: {err}");
        }
    }

    #[test]
    fn role_defaults_to_mentor() {
        let store = store();
        assert_eq!(store.role(), Role::Mentor);
        store.set_role(Role::Admin);
        assert_eq!(store.role(), Role::Admin);
    }

    #[test]
    fn role_parses_case_insensitively() {
        assert_eq!("Mentee".parse::<Role>().unwrap(), Role::Mentee);
        assert!("guest".parse::<Role>().is_err());
    }

    #[test]
    fn consents_keep_other_agreements() {
        let store = store();
        store.record_consent(names::LEGAL_CONSENTS, "terms", ConsentRecord::accepted("v1.0"));
        store.record_consent(names::LEGAL_CONSENTS, "privacy", ConsentRecord::accepted("v2.1"));

        let consents = store.consents(names::LEGAL_CONSENTS);
        assert_eq!(consents.len(), 2);
        assert!(store.has_accepted(names::LEGAL_CONSENTS, "terms", "v1.0"));
        assert!(!store.has_accepted(names::LEGAL_CONSENTS, "terms", "v2.0"));
        assert!(!store.has(names::MENTOR_AGREEMENT_ACCEPTED));
    }

    #[test]
    fn mentor_agreement_sets_accepted_flag() {
        let store = store();
        store.record_consent(
            names::MENTOR_LEGAL_CONSENTS,
            "mentor_agreement",
            ConsentRecord::accepted("v1.0"),
        );
        assert!(store.get(names::MENTOR_AGREEMENT_ACCEPTED, false));
    }

    #[test]
    fn declined_consent_is_not_accepted() {
        let store = store();
        let record = ConsentRecord {
            status: ConsentStatus::Declined,
            ..ConsentRecord::accepted("v1.0")
        };
        store.record_consent(names::MENTOR_LEGAL_CONSENTS, "mentor_agreement", record);
        assert!(!store.has_accepted(names::MENTOR_LEGAL_CONSENTS, "mentor_agreement", "v1.0"));
        assert!(!store.has(names::MENTOR_AGREEMENT_ACCEPTED));
    }

    #[test]
    fn waitlist_validates_email() {
        let store = store();
        assert!(store.join_waitlist("not-an-email").is_err());
        assert!(store.join_waitlist("a@b").is_err());
        assert_eq!(store.waitlist_email(), None);

        assert!(store.join_waitlist(" dr.khan@example.nhs.uk ").unwrap());
        assert_eq!(store.waitlist_email().as_deref(), Some("dr.khan@example.nhs.uk"));
    }
}
