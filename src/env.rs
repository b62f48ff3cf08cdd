use std::env as stdenv;

/// The two environment strings the shell tracks, plus the loop's exit flag.
///
/// `path` and `home` are captured once at startup and mutated only by the
/// `set` builtin; children always inherit the real process environment, so
/// reassigning `path` changes command resolution without leaking into
/// spawned programs.
#[derive(Debug, Clone)]
pub struct ShellEnv {
    pub path: String,
    pub home: String,
    pub should_exit: bool,
}

impl ShellEnv {
    /// Capture `PATH` and `HOME` from the process environment.
    /// A missing variable becomes an empty string.
    pub fn from_process() -> Self {
        let path = stdenv::var("PATH").unwrap_or_default();
        let home = stdenv::var("HOME").unwrap_or_default();
        tracing::debug!(%path, %home, "captured environment");
        Self {
            path,
            home,
            should_exit: false,
        }
    }

    /// Directory prefixes of the search path, in order. Empty prefixes
    /// (leading, trailing, or doubled colons) are skipped.
    pub fn prefixes(&self) -> impl Iterator<Item = &str> {
        self.path.split(':').filter(|p| !p.is_empty())
    }
}
