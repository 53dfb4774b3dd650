//! Courtroom participants.
//!
//! A participant is an immutable record resolved once per session: who
//! speaks, with which synthesized voice, and (for generated turns) in
//! what character.

use serde::{Deserialize, Serialize};

/// Role of a participant in the courtroom.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Judge,
    Prosecutor,
    Defense,
    Witness,
    Jury,
    /// The live human participant. Speaks with their own voice, so
    /// `voice_id` is empty and synthesis is skipped for their turns.
    User,
}

impl Role {
    pub fn display_name(&self) -> &'static str {
        match self {
            Role::Judge => "judge",
            Role::Prosecutor => "prosecutor",
            Role::Defense => "defense",
            Role::Witness => "witness",
            Role::Jury => "jury",
            Role::User => "user",
        }
    }

    pub fn is_user(&self) -> bool {
        matches!(self, Role::User)
    }

    /// Context hints fed to turn generation for this role.
    ///
    /// Fixed per-role lookup with a generic fallback for roles that have
    /// no tailored hints.
    pub fn context_hints(&self) -> Vec<String> {
        let hints: &[&str] = match self {
            Role::Judge => &[
                "You are presiding over a courtroom proceeding.",
                "Maintain order and ensure proper legal procedure.",
            ],
            Role::Defense => &[
                "You are representing the defendant in this case.",
                "Present a strong, logical defense.",
            ],
            Role::Jury => &[
                "You are part of the jury evaluating this case.",
                "Provide thoughtful, impartial observations.",
            ],
            _ => &["Participate in the courtroom proceedings."],
        };
        hints.iter().map(|h| h.to_string()).collect()
    }
}

/// A participant in the simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    /// Stable identity within the session.
    pub id: String,
    /// Role this participant fills.
    pub role: Role,
    /// Name shown in events and transcripts.
    pub display_name: String,
    /// Voice used for synthesis. Empty for the user role.
    #[serde(default)]
    pub voice_id: String,
    /// Character description used only for generated turns.
    #[serde(default)]
    pub persona: String,
    /// Optional avatar reference for UI consumers.
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl Participant {
    pub fn new(id: impl Into<String>, role: Role, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role,
            display_name: display_name.into(),
            voice_id: String::new(),
            persona: String::new(),
            avatar_url: None,
        }
    }

    /// Set the synthesis voice.
    pub fn with_voice(mut self, voice_id: impl Into<String>) -> Self {
        self.voice_id = voice_id.into();
        self
    }

    /// Set the persona used for generated turns.
    pub fn with_persona(mut self, persona: impl Into<String>) -> Self {
        self.persona = persona.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_hints_known_role() {
        let hints = Role::Judge.context_hints();
        assert_eq!(hints.len(), 2);
        assert!(hints[0].contains("presiding"));
    }

    #[test]
    fn test_context_hints_generic_fallback() {
        let hints = Role::Witness.context_hints();
        assert_eq!(hints, vec!["Participate in the courtroom proceedings."]);
    }

    #[test]
    fn test_role_serde_lowercase() {
        let role: Role = serde_json::from_str("\"prosecutor\"").unwrap();
        assert_eq!(role, Role::Prosecutor);
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
    }

    #[test]
    fn test_participant_builder() {
        let p = Participant::new("1", Role::Judge, "Judge")
            .with_voice("pNInz6obpgDQGcFmaJgB")
            .with_persona("A presiding judge.");
        assert_eq!(p.voice_id, "pNInz6obpgDQGcFmaJgB");
        assert!(p.avatar_url.is_none());
        assert!(!p.role.is_user());
    }
}
