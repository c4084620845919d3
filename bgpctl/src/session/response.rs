//! Response type for command execution results.

use std::time::Duration;

/// Response from a single command on an SSH session.
#[derive(Debug, Clone)]
pub struct Response {
    /// The command that was executed.
    pub command: String,

    /// The command output with the echo and trailing prompt removed.
    pub result: String,

    /// The raw output before normalization.
    pub raw_result: String,

    /// The prompt that was matched at the end.
    pub prompt: String,

    /// Time taken to execute the command.
    pub elapsed: Duration,
}

impl Response {
    /// Build a response from raw output, normalizing it.
    pub fn from_raw(
        command: impl Into<String>,
        raw_result: String,
        prompt: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        let command = command.into();
        let result = normalize_output(&raw_result, &command);
        Self {
            command,
            result,
            raw_result,
            prompt: prompt.into(),
            elapsed,
        }
    }
}

impl std::fmt::Display for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.result)
    }
}

/// Strip the command echo from the start and the prompt line from the end.
fn normalize_output(raw: &str, command: &str) -> String {
    let text = raw.replace("\r\n", "\n").replace('\r', "");
    let mut lines: Vec<&str> = text.lines().collect();

    // Trailing prompt
    lines.pop();

    if !command.is_empty() && lines.first().is_some_and(|first| first.trim_end().ends_with(command))
    {
        lines.remove(0);
    }

    lines.join("\n")
}
