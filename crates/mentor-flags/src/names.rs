//! Well-known flag names

/// Backend access token
pub const AUTH_TOKEN: &str = "auth_token";
/// Backend refresh token
pub const REFRESH_TOKEN: &str = "refresh_token";
/// Mentee legal consents, keyed by agreement
pub const LEGAL_CONSENTS: &str = "legal_consents";
/// Mentor legal consents, keyed by agreement
pub const MENTOR_LEGAL_CONSENTS: &str = "mentor_legal_consents";
/// Mentor agreement accepted at least once
pub const MENTOR_AGREEMENT_ACCEPTED: &str = "mentor_agreement_accepted";
/// Email left on the Instagram waitlist
pub const INSTAGRAM_WAITLIST_EMAIL: &str = "instagram_waitlist_email";
/// UI theme
pub const THEME: &str = "theme";
/// Sidebar collapsed state
pub const SIDEBAR_COLLAPSED: &str = "sidebar_collapsed";
/// Onboarding finished
pub const ONBOARDING_COMPLETE: &str = "onboarding_complete";
/// Demo data enabled
pub const DEMO_MODE: &str = "demo_mode";
/// Signed-in role
pub const ROLE: &str = "role";

/// Every well-known name
pub const ALL: [&str; 11] = [
    AUTH_TOKEN,
    REFRESH_TOKEN,
    LEGAL_CONSENTS,
    MENTOR_LEGAL_CONSENTS,
    MENTOR_AGREEMENT_ACCEPTED,
    INSTAGRAM_WAITLIST_EMAIL,
    THEME,
    SIDEBAR_COLLAPSED,
    ONBOARDING_COMPLETE,
    DEMO_MODE,
    ROLE,
];

/// Whether `name` is one of the well-known names
#[must_use]
pub fn is_well_known(name: &str) -> bool {
    ALL.contains(&name)
}
