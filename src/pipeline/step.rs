use std::fmt;

use serde::Serialize;

/// States visited by one pipeline run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Inspect the collection and decide between Setup and loading the index.
    Start,
    /// Read every document and write its chunks into the collection.
    Setup,
    /// Retrieve context for the query and render the prompt.
    CreatePrompt,
    /// Ask the reply generator for the answer. Terminal.
    GenerateReply,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Start => "start",
            Step::Setup => "setup",
            Step::CreatePrompt => "create_prompt",
            Step::GenerateReply => "generate_reply",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_serialized_name() {
        for step in [Step::Start, Step::Setup, Step::CreatePrompt, Step::GenerateReply] {
            let json = serde_json::to_value(step).unwrap();
            assert_eq!(json, step.to_string());
        }
    }
}
