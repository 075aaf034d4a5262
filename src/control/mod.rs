mod stdin;

pub use stdin::StdinControl;

/// Commands accepted while streaming
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    /// Take the next processed frame as the new reference
    Recapture,
    /// Stop after the current frame
    Quit,
}

/// Source of control signals. `poll` must not block.
pub trait ControlInput {
    fn poll(&mut self) -> Option<ControlSignal>;
}

/// Map a typed command to a signal: `c` recaptures, `q` quits
pub fn parse_command(line: &str) -> Option<ControlSignal> {
    match line.trim() {
        "c" | "C" => Some(ControlSignal::Recapture),
        "q" | "Q" => Some(ControlSignal::Quit),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_commands() {
        assert_eq!(parse_command("c"), Some(ControlSignal::Recapture));
        assert_eq!(parse_command(" q\n"), Some(ControlSignal::Quit));
        assert_eq!(parse_command("Q"), Some(ControlSignal::Quit));
    }

    #[test]
    fn ignores_everything_else() {
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("capture"), None);
        assert_eq!(parse_command("x"), None);
    }
}
