//! Thread status transitions.

use warden_core::{ThreadMarker, ThreadStatus};

/// What happened in a thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadInput {
    /// An ordinary message
    Message,
    /// A suggestion was posted
    Suggested,
    /// An authorized solve or unsolve marker
    Marker(ThreadMarker),
}

/// Next status after `input`.
///
/// Status only moves forward, with one exception: a message in a
/// MarkedUnsolved thread reopens it. A message in a MarkedSolved thread does
/// not; only an unsolve marker does. Closed never changes.
pub fn transition(status: ThreadStatus, input: ThreadInput) -> ThreadStatus {
    use ThreadInput::*;
    use ThreadStatus::*;

    match (status, input) {
        (Closed, _) => Closed,
        (_, Marker(ThreadMarker::Solved)) => MarkedSolved,
        (_, Marker(ThreadMarker::Unsolved)) => MarkedUnsolved,
        (Open, Suggested) | (MarkedUnsolved, Suggested) => AiSuggested,
        (MarkedUnsolved, Message) => Open,
        (current, Message | Suggested) => current,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ThreadStatus::*;

    #[test]
    fn test_solved_thread_ignores_messages() {
        assert_eq!(transition(MarkedSolved, ThreadInput::Message), MarkedSolved);
        assert_eq!(transition(MarkedSolved, ThreadInput::Suggested), MarkedSolved);
    }

    #[test]
    fn test_unsolved_thread_reopens_on_message() {
        assert_eq!(transition(MarkedUnsolved, ThreadInput::Message), Open);
    }

    #[test]
    fn test_forward_path() {
        let status = transition(Open, ThreadInput::Suggested);
        assert_eq!(status, AiSuggested);
        assert_eq!(transition(status, ThreadInput::Message), AiSuggested);
        let solved = transition(status, ThreadInput::Marker(ThreadMarker::Solved));
        assert_eq!(solved, MarkedSolved);
        let unsolved = transition(solved, ThreadInput::Marker(ThreadMarker::Unsolved));
        assert_eq!(unsolved, MarkedUnsolved);
    }

    #[test]
    fn test_closed_is_terminal() {
        for input in [
            ThreadInput::Message,
            ThreadInput::Suggested,
            ThreadInput::Marker(ThreadMarker::Solved),
            ThreadInput::Marker(ThreadMarker::Unsolved),
        ] {
            assert_eq!(transition(Closed, input), Closed);
        }
    }
}
