//! Scenarios and their scripted dialogue lines.

use serde::{Deserialize, Serialize};

use crate::participant::Role;

/// A selectable courtroom scene. Selects which set of scripted lines is
/// active; immutable once loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// One pre-authored line of a scenario's script.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueLine {
    pub id: String,
    pub scenario_id: String,
    /// Role expected to speak this line.
    pub role: Role,
    pub text: String,
    /// Position in the script. Indices need not be contiguous; lines are
    /// ordered ascending, ties keeping input order.
    pub order_index: u32,
}

/// Sort a script into playback order.
///
/// Stable ascending sort by `order_index`: lines sharing an index keep
/// their original relative order.
pub fn sorted_lines(lines: &[DialogueLine]) -> Vec<DialogueLine> {
    let mut sorted = lines.to_vec();
    sorted.sort_by_key(|line| line.order_index);
    sorted
}
