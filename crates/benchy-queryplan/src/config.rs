//! Parser configuration

use serde::{Deserialize, Serialize};

/// Options shared by every engine parser.
///
/// Deserializable with per-field defaults so the driving service can embed
/// it in its own configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParserOptions {
    /// Attach an engine-native snapshot of each raw node to the canonical node
    #[serde(default)]
    pub include_system_representation: bool,
    /// Maximum raw plan depth accepted before the parse is aborted
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

fn default_max_depth() -> usize {
    512
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            include_system_representation: false,
            max_depth: default_max_depth(),
        }
    }
}

impl ParserOptions {
    /// Sets whether per-node system representations are retained
    pub fn with_system_representation(mut self, include: bool) -> Self {
        self.include_system_representation = include;
        self
    }

    /// Sets the recursion bound
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}
