//! Player-facing message catalog.
//!
//! A deliberately small surface: keyed plain strings with `%1%`-style
//! positional substitution. Full localization (multiple languages, rich
//! text) belongs to the embedding; this catalog exists so every refusal
//! and notification resolves through exactly one key, and so tests can
//! assert on delivered text.

use std::collections::HashMap;
use tracing::warn;

/// Built-in en-us strings, overridable per key.
const DEFAULTS: &[(&str, &str)] = &[
    // Town notifications.
    ("town_deleted", "Your town, %1%, has been deleted"),
    ("town_renamed", "Your town is now called %1%"),
    ("town_level_up", "%1% has reached level %2%!"),
    ("town_transferred", "%1% has transferred ownership of %2%"),
    ("town_member_joined", "%1% has joined the town"),
    ("member_left", "%1% has left the town"),
    ("member_evicted", "%1% was evicted from the town"),
    ("member_promoted", "%1% is now a %2%"),
    ("member_demoted", "%1% is now a %2%"),
    ("town_chat_format", "[%1%] %2%: %3%"),
    // Personal notifications.
    ("invite_received", "%1% has invited you to join %2%"),
    ("invite_declined_by", "%1% declined your town invite"),
    ("you_promoted", "You are now a %1% of %2%"),
    ("you_demoted", "You have been demoted to %1% of %2%"),
    ("you_evicted", "You have been evicted from %1%"),
    // Direct feedback.
    ("town_created", "Town %1% founded"),
    ("invite_sent", "Invited %1% to join the town"),
    ("invite_accepted", "You joined %1%!"),
    ("invite_declined", "Invite declined"),
    ("town_left", "You left %1%"),
    ("claim_created", "Claimed chunk %1% for %2%"),
    ("claim_deleted", "Unclaimed chunk %1%"),
    ("claims_deleted_all", "Removed all %1% claims of %2%"),
    ("deposit_made", "Deposited %1% into the town coffers"),
    ("withdrawal_made", "Withdrew %1% from the town coffers"),
    ("bio_updated", "Town bio updated"),
    ("greeting_updated", "Town greeting updated"),
    ("farewell_updated", "Town farewell updated"),
    ("color_updated", "Town color is now %1%"),
    ("admin_town_deleted", "Deleted town %1%"),
    ("admin_town_taken_over", "You are now the mayor of %1%"),
    // Refusals.
    ("error_not_in_town", "You are not in a town"),
    ("error_already_in_town", "You are already in a town"),
    ("error_no_privilege", "You do not have permission to do that in your town"),
    ("error_not_mayor", "Only the town mayor can do that"),
    ("error_invalid_name", "That town name is invalid"),
    ("error_invalid_color", "That is not a valid #rrggbb color"),
    ("error_name_taken", "A town with that name already exists"),
    ("error_town_not_found", "No town named %1%"),
    ("error_user_not_found", "No user named %1%"),
    ("error_not_in_your_town", "%1% is not a member of your town"),
    ("error_role_too_high", "You cannot target a member of equal or higher rank"),
    ("error_role_limit", "That member's role cannot change further that way"),
    ("error_mayor_cannot_leave", "Transfer ownership or delete the town before leaving"),
    ("error_town_full", "The town has no room for more members"),
    ("error_claim_limit", "The town cannot support more claims"),
    ("error_max_level", "The town is already at the level cap"),
    ("error_invalid_amount", "That amount is invalid"),
    ("error_chunk_not_claimed", "This chunk is not claimed"),
    ("error_chunk_claimed", "This chunk is already claimed by %1%"),
    ("error_claim_not_yours", "This chunk belongs to another town"),
    ("error_world_not_claimable", "Claims cannot be made in %1%"),
    ("error_insufficient_funds", "The town cannot afford that (needs %1%)"),
    ("error_no_invite", "You have no pending town invite"),
    ("error_invite_target_in_town", "%1% is already in a town"),
    ("error_internal", "Something went wrong; try again later"),
];

/// Keyed message catalog with positional substitution.
#[derive(Debug, Clone)]
pub struct Locales {
    raw: HashMap<String, String>,
}

impl Default for Locales {
    fn default() -> Self {
        Self {
            raw: DEFAULTS
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
        }
    }
}

impl Locales {
    /// The built-in catalog with some keys replaced.
    pub fn with_overrides(overrides: HashMap<String, String>) -> Self {
        let mut locales = Self::default();
        locales.raw.extend(overrides);
        locales
    }

    /// Resolves a key with no arguments.
    pub fn get(&self, key: &str) -> String {
        self.get_with(key, &[])
    }

    /// Resolves a key, substituting `%1%`, `%2%`, ... with `args`.
    ///
    /// A missing key resolves to the bracketed key itself so broken
    /// references show up in chat instead of vanishing.
    pub fn get_with(&self, key: &str, args: &[&str]) -> String {
        let Some(template) = self.raw.get(key) else {
            warn!(key, "missing locale key");
            return format!("<{key}>");
        };
        let mut text = template.clone();
        for (index, arg) in args.iter().enumerate() {
            text = text.replace(&format!("%{}%", index + 1), arg);
        }
        text
    }
}
