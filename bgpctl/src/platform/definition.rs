//! Platform definition for device-family specific CLI behaviour.

use regex::bytes::Regex;

/// CLI mode derived from a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptMode {
    /// User EXEC, `>` prompt
    Exec,
    /// Privileged EXEC, `#` prompt
    Privileged,
    /// Global or sub-mode configuration, `(config*)#` prompt
    Configuration,
}

impl PromptMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromptMode::Exec => "exec",
            PromptMode::Privileged => "privileged",
            PromptMode::Configuration => "configuration",
        }
    }
}

/// Everything the session and orchestrator need to know about a family's
/// command dialect.
#[derive(Debug, Clone)]
pub struct PlatformDefinition {
    /// Platform name (e.g. "cisco_iosxe").
    pub name: String,

    /// Matches any prompt at the very end of the output.
    pub prompt_pattern: Regex,

    /// Matches a configuration-mode prompt.
    pub config_pattern: Regex,

    /// Matches a user EXEC prompt.
    pub exec_pattern: Regex,

    /// Command to go from EXEC to privileged EXEC.
    pub enable_command: String,

    /// Password prompt shown after the enable command.
    pub enable_auth_pattern: Regex,

    /// Command entering configuration mode from privileged EXEC.
    pub config_enter: String,

    /// Command leaving configuration mode back to privileged EXEC.
    pub config_exit: String,

    /// Marks a configuration line the device refused.
    pub config_error_pattern: Regex,

    /// Output filter that keeps only BGP-sourced routes.
    pub bgp_route_filter: String,

    /// Commands to run when the session opens.
    pub on_open_commands: Vec<String>,

    /// Terminal width for PTY.
    pub terminal_width: u32,

    /// Terminal height for PTY.
    pub terminal_height: u32,
}

impl PlatformDefinition {
    /// Create a platform with generic prompt handling and IOS-style commands.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prompt_pattern: Regex::new(r"(?m)^[\w.\-@/:]{1,63}(?:\([\w.\-@/:+]{1,63}\))?[>#]\s?\z")
                .unwrap(),
            config_pattern: Regex::new(r"\(conf[\w.\-@/:+]{0,63}\)#\s?$").unwrap(),
            exec_pattern: Regex::new(r">\s?$").unwrap(),
            enable_command: "enable".to_string(),
            enable_auth_pattern: Regex::new(r"(?mi)^password:\s?\z").unwrap(),
            config_enter: "configure terminal".to_string(),
            config_exit: "end".to_string(),
            config_error_pattern: Regex::new(r"% Invalid|% Incomplete").unwrap(),
            bgp_route_filter: "include ^B".to_string(),
            on_open_commands: vec![],
            terminal_width: 511,
            terminal_height: 24,
        }
    }

    /// Replace the pattern that flags rejected configuration lines.
    pub fn with_config_error_pattern(mut self, pattern: &str) -> Result<Self, regex::Error> {
        self.config_error_pattern = Regex::new(pattern)?;
        Ok(self)
    }

    /// Set the routing-table filter for BGP routes.
    pub fn with_bgp_route_filter(mut self, filter: impl Into<String>) -> Self {
        self.bgp_route_filter = filter.into();
        self
    }

    /// Add an on_open command.
    pub fn with_on_open_command(mut self, command: impl Into<String>) -> Self {
        self.on_open_commands.push(command.into());
        self
    }

    /// Set terminal dimensions.
    pub fn with_terminal_size(mut self, width: u32, height: u32) -> Self {
        self.terminal_width = width;
        self.terminal_height = height;
        self
    }

    /// Classify a prompt line into a CLI mode.
    pub fn mode_of(&self, prompt: &str) -> PromptMode {
        let prompt = prompt.trim_end().as_bytes();
        if self.config_pattern.is_match(prompt) {
            PromptMode::Configuration
        } else if self.exec_pattern.is_match(prompt) {
            PromptMode::Exec
        } else {
            PromptMode::Privileged
        }
    }

    /// Derive the device identity from a prompt: the prompt text without
    /// its mode suffix, lowercased (`R1#` and `R1(config)#` both give `r1`).
    pub fn hostname_of(&self, prompt: &str) -> String {
        let prompt = prompt.trim();
        let prompt = prompt
            .strip_suffix(['#', '>'])
            .unwrap_or(prompt);
        let prompt = match prompt.find('(') {
            Some(pos) if prompt.ends_with(')') => &prompt[..pos],
            _ => prompt,
        };
        prompt.to_lowercase()
    }
}
