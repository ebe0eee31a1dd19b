//! store::message
//!
//! Change descriptions recorded in the store's history (commit messages).
//!
//! Format: `[webapp] <action> <path> <version> for <actor>`, e.g.
//!
//! ```text
//! [webapp] adding version repositories/cork-kube.json v1.2.0 for alice
//! ```
//!
//! The tag is kept stable so history written by earlier registry clients
//! and by this crate reads the same.

use crate::core::types::Actor;

/// Prefix identifying registry-originated changes.
pub const MESSAGE_TAG: &str = "[webapp]";

/// Build the change description for a write.
pub fn change_description(actor: &Actor, action: &str, path: &str, version: &str) -> String {
    format!("{MESSAGE_TAG} {action} {path} {version} for {actor}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_all_parts() {
        let actor = Actor::new("alice").unwrap();
        assert_eq!(
            change_description(&actor, "adding version", "repositories/app.json", "v1.0.0"),
            "[webapp] adding version repositories/app.json v1.0.0 for alice"
        );
    }

    #[test]
    fn actor_is_last() {
        let actor = Actor::new("bob@example.org").unwrap();
        let msg = change_description(&actor, "creating repository", "repositories/x.json", "x");
        assert!(msg.ends_with("for bob@example.org"));
        assert!(msg.starts_with(MESSAGE_TAG));
    }
}
