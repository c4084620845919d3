//! Cisco IOS / IOS-XE platform definition.
//!
//! ```text
//! R1>                       # exec
//! R1#                       # privileged
//! R1(config)#               # configuration
//! R1(config-router)#        # configuration sub-mode
//! ```

use crate::platform::PlatformDefinition;

pub const PLATFORM_NAME: &str = "cisco_iosxe";

pub fn platform() -> PlatformDefinition {
    PlatformDefinition::new(PLATFORM_NAME)
        .with_bgp_route_filter("include ^B")
        .with_on_open_command("terminal length 0")
        .with_on_open_command("terminal width 511")
        .with_terminal_size(511, 24)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::PromptMode;

    #[test]
    fn test_prompt_pattern_matches_end_of_output() {
        let platform = platform();
        assert!(platform.prompt_pattern.is_match(b"show clock\r\n*10:00:01.123 UTC\r\nR1#"));
        assert!(platform.prompt_pattern.is_match(b"R1>"));
        assert!(platform.prompt_pattern.is_match(b"R1(config)#"));
        assert!(platform.prompt_pattern.is_match(b"R1(config-router)# "));

        // Prompt-like text that is not at the end
        assert!(!platform.prompt_pattern.is_match(b"R1#\r\nstill running"));
        // Banner line with spaces
        assert!(!platform.prompt_pattern.is_match(b"banner motd #"));
    }

    #[test]
    fn test_mode_classification() {
        let platform = platform();
        assert_eq!(platform.mode_of("R1>"), PromptMode::Exec);
        assert_eq!(platform.mode_of("R1#"), PromptMode::Privileged);
        assert_eq!(platform.mode_of("R1(config)#"), PromptMode::Configuration);
        assert_eq!(platform.mode_of("R1(config-router)# "), PromptMode::Configuration);
    }

    #[test]
    fn test_hostname_of() {
        let platform = platform();
        assert_eq!(platform.hostname_of("R1#"), "r1");
        assert_eq!(platform.hostname_of("R2> "), "r2");
        assert_eq!(platform.hostname_of("Core-01(config-router)#"), "core-01");
    }

    #[test]
    fn test_config_error_pattern() {
        let platform = platform();
        assert!(platform.config_error_pattern.is_match(b"% Invalid input detected at '^' marker."));
        assert!(platform.config_error_pattern.is_match(b"% Incomplete command."));
        assert!(!platform.config_error_pattern.is_match(b"R1(config-router)#"));
    }

    #[test]
    fn test_on_open_commands() {
        let platform = platform();
        assert_eq!(platform.on_open_commands[0], "terminal length 0");
    }
}
