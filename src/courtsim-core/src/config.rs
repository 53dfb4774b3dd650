//! Configuration module for loading TOML scenario files.

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::SimError;
use crate::participant::{Participant, Role};
use crate::scenario::{DialogueLine, Scenario};

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct SimConfig {
    pub participants: Vec<Participant>,
    pub scenarios: Vec<ScenarioConfig>,
}

/// A scenario together with its scripted lines.
#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioConfig {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub lines: Vec<LineConfig>,
}

/// A scripted line as written in the config file.
#[derive(Debug, Clone, Deserialize)]
pub struct LineConfig {
    pub id: String,
    pub role: Role,
    pub text: String,
    pub order_index: u32,
}

impl SimConfig {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, SimError> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| SimError::ConfigError(format!("Failed to read config: {}", e)))?;

        Self::from_str(&content)
    }

    /// Load configuration from string content.
    pub fn from_str(content: &str) -> Result<Self, SimError> {
        toml::from_str(content)
            .map_err(|e| SimError::ConfigError(format!("Failed to parse config: {}", e)))
    }

    /// All scenarios, without their lines.
    pub fn scenarios(&self) -> Vec<Scenario> {
        self.scenarios
            .iter()
            .map(|s| Scenario {
                id: s.id.clone(),
                name: s.name.clone(),
                description: s.description.clone(),
            })
            .collect()
    }

    /// Find a scenario by name, falling back to id.
    pub fn find_scenario(&self, name: &str) -> Result<&ScenarioConfig, SimError> {
        self.scenarios
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name) || s.id == name)
            .ok_or_else(|| SimError::UnknownScenario(name.to_string()))
    }

    /// Script lines for a scenario, in config order (sorting happens at
    /// playback time).
    pub fn lines_for(&self, scenario: &ScenarioConfig) -> Vec<DialogueLine> {
        scenario
            .lines
            .iter()
            .map(|l| DialogueLine {
                id: l.id.clone(),
                scenario_id: scenario.id.clone(),
                role: l.role,
                text: l.text.clone(),
                order_index: l.order_index,
            })
            .collect()
    }
}

/// Default configuration embedded in the binary: the seed courtroom cast
/// and opening-statements script.
pub fn default_config() -> SimConfig {
    SimConfig {
        participants: vec![
            Participant::new("1", Role::Judge, "Judge")
                .with_voice("pNInz6obpgDQGcFmaJgB")
                .with_persona(
                    "You are a presiding judge, maintaining order and ensuring proper legal procedure.",
                ),
            Participant::new("2", Role::Prosecutor, "Prosecutor")
                .with_voice("21m00Tcm4TlvDq8ikWAM")
                .with_persona(
                    "You are a prosecutor presenting the case against the defendant. Present evidence clearly and persuasively.",
                ),
            Participant::new("3", Role::Defense, "Defense Attorney")
                .with_voice("21m00Tcm4TlvDq8ikWAM")
                .with_persona(
                    "You are a defense attorney representing the defendant. Present a strong, logical defense.",
                ),
            Participant::new("4", Role::Witness, "Witness")
                .with_voice("AZnzlk1XvdvUeBnXmlld")
                .with_persona("You are a witness testifying in court. Answer questions truthfully and clearly."),
            Participant::new("5", Role::User, "You")
                .with_persona("You are participating in the courtroom simulation."),
        ],
        scenarios: vec![
            ScenarioConfig {
                id: "1".to_string(),
                name: "Opening Statements".to_string(),
                description: "Initial arguments from both sides.".to_string(),
                lines: vec![
                    LineConfig {
                        id: "dl1".to_string(),
                        role: Role::Judge,
                        text: "Good morning, ladies and gentlemen. We are here today to hear the case of..."
                            .to_string(),
                        order_index: 0,
                    },
                    LineConfig {
                        id: "dl2".to_string(),
                        role: Role::Defense,
                        text: "Your Honor, members of the jury, the defense will prove that the prosecution lacks sufficient evidence."
                            .to_string(),
                        order_index: 1,
                    },
                    LineConfig {
                        id: "dl3".to_string(),
                        role: Role::Jury,
                        text: "We acknowledge the proceedings and are ready to hear the case.".to_string(),
                        order_index: 2,
                    },
                ],
            },
            ScenarioConfig {
                id: "2".to_string(),
                name: "Witness Examination".to_string(),
                description: "Questioning of a witness.".to_string(),
                lines: Vec::new(),
            },
            ScenarioConfig {
                id: "3".to_string(),
                name: "Closing Arguments".to_string(),
                description: "Final summaries and appeals.".to_string(),
                lines: Vec::new(),
            },
        ],
    }
}
