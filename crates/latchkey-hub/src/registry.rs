//! Registered credentials.
//!
//! The hub's view of which keypad credential hashes and card UIDs are
//! valid. Provisioning comes from the out-of-scope management plane; the
//! verifier only reads. Card UIDs are keyed by their lowercase hex
//! rendering, the same form logs and audit records use.

use std::collections::HashMap;

/// A registered card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardRecord {
    /// Operator-visible card label.
    pub label: String,
    /// False for cards that were revoked without deleting their history.
    pub authorized: bool,
}

/// In-memory credential store.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    credentials: HashMap<String, String>,
    cards: HashMap<String, CardRecord>,
}

impl Registry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or replaces a keypad client's credential hash
    /// (lowercase hex of the salted digest, as `latchkey-crypto`
    /// produces it).
    pub fn register_client(&mut self, client_id: impl Into<String>, credential_hash: impl Into<String>) {
        self.credentials.insert(client_id.into(), credential_hash.into());
    }

    /// Removes a keypad client.
    pub fn remove_client(&mut self, client_id: &str) {
        self.credentials.remove(client_id);
    }

    /// The stored credential hash for a client.
    #[must_use]
    pub fn credential_hash(&self, client_id: &str) -> Option<&str> {
        self.credentials.get(client_id).map(String::as_str)
    }

    /// Registers a card UID as authorized.
    pub fn register_card(&mut self, uid: &[u8], label: impl Into<String>) {
        self.cards.insert(
            hex::encode(uid),
            CardRecord { label: label.into(), authorized: true },
        );
    }

    /// Marks a card as revoked; it stays known but no longer grants.
    pub fn revoke_card(&mut self, uid: &[u8]) {
        if let Some(card) = self.cards.get_mut(&hex::encode(uid)) {
            card.authorized = false;
        }
    }

    /// Looks up a card by raw UID.
    #[must_use]
    pub fn card(&self, uid: &[u8]) -> Option<&CardRecord> {
        self.cards.get(&hex::encode(uid))
    }

    /// Whether the card exists and is currently authorized.
    #[must_use]
    pub fn authorizes_card(&self, uid: &[u8]) -> bool {
        self.card(uid).is_some_and(|card| card.authorized)
    }
}
