//! Drift and output interpretation
//!
//! The auxiliary channel of a command is both an opaque trigger, compared
//! between reads to detect drift, and an optional structured result.

use std::collections::BTreeMap;

use tracing::debug;

/// Result of parsing command output as a flat string map
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructuredOutput {
    Structured(BTreeMap<String, String>),
    Unstructured,
}

impl StructuredOutput {
    /// Output attribute value; unstructured output becomes an empty map
    pub fn into_map(self) -> BTreeMap<String, String> {
        match self {
            StructuredOutput::Structured(map) => map,
            StructuredOutput::Unstructured => BTreeMap::new(),
        }
    }

    pub fn is_structured(&self) -> bool {
        matches!(self, StructuredOutput::Structured(_))
    }
}

/// Classified auxiliary output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpretation {
    /// The raw output, used verbatim as the next `update_trigger`
    pub trigger: String,
    pub output: StructuredOutput,
}

impl Interpretation {
    /// Empty output means the resource no longer exists
    pub fn resource_exists(&self) -> bool {
        !self.trigger.is_empty()
    }
}

/// Classify the auxiliary output of a command. Never fails.
pub fn classify(extraout: &str) -> Interpretation {
    let output = match serde_json::from_str::<BTreeMap<String, String>>(extraout) {
        Ok(map) => StructuredOutput::Structured(map),
        Err(e) => {
            debug!("error parsing extraout into json: {}", e);
            StructuredOutput::Unstructured
        }
    };

    Interpretation {
        trigger: extraout.to_string(),
        output,
    }
}
