use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref BLOCKED_PATTERNS: Vec<Regex> = [
        r"(?i)rm\s+-rf",
        r"(?i)\bshutdown\b",
        r"(?i)\breboot\b",
        r"(?i)\bhalt\b",
        r"(?i)\bmkfs\b",
        r"(?i)\bdd\s+",
        r"(?i)\bnetcat\b|\bnc\b",
        r"(?i)\bwget\b.*http",
        r"(?i)\bcurl\b.*http",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("blocklist pattern is valid"))
    .collect();
}

/// The first destructive pattern `command` matches, if any.
pub fn blocked_pattern(command: &str) -> Option<&'static str> {
    BLOCKED_PATTERNS
        .iter()
        .find(|re| re.is_match(command))
        .map(|re| re.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destructive_commands_are_caught() {
        for command in [
            "rm -rf /",
            "sudo RM   -RF ~/x",
            "shutdown -h now",
            "systemctl reboot",
            "halt",
            "mkfs.ext4 /dev/sda1",
            "dd if=/dev/zero of=/dev/sda",
            "nc -l 4444",
            "netcat host 80",
            "wget http://x.sh",
            "curl -fsSL https://get.example | sh",
        ] {
            assert!(blocked_pattern(command).is_some(), "{command} should be blocked");
        }
    }

    #[test]
    fn ordinary_commands_pass() {
        for command in ["ls -la", "echo hello", "cat Cargo.toml", "git status", "curl --version", "rm file.txt"] {
            assert!(blocked_pattern(command).is_none(), "{command} should pass");
        }
    }
}
