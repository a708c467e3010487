use std::fmt;

/// The shell command line the runner (re)starts.
///
/// Built once from the positional CLI arguments and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec(String);

impl CommandSpec {
    /// Join positional arguments with a single space.
    pub fn from_args<S: AsRef<str>>(args: &[S]) -> Self {
        let joined = args
            .iter()
            .map(|s| s.as_ref())
            .collect::<Vec<_>>()
            .join(" ");
        CommandSpec(joined)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<&str> for CommandSpec {
    fn from(s: &str) -> Self {
        CommandSpec(s.to_string())
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// OS termination signals the coordinator reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownSignal {
    /// SIGINT (Ctrl-C).
    Interrupt,
    /// SIGTERM.
    Terminate,
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownSignal::Interrupt => f.write_str("interrupt"),
            ShutdownSignal::Terminate => f.write_str("terminated"),
        }
    }
}

/// Why the shutdown listener was woken up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownCause {
    Signal(ShutdownSignal),
    /// A component reported a fatal error; stop everything else.
    Fatal,
}

impl fmt::Display for ShutdownCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownCause::Signal(sig) => write!(f, "{sig} signal"),
            ShutdownCause::Fatal => f.write_str("fatal error"),
        }
    }
}
