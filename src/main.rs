use anyhow::Result;
use quash::jobs::SharedJobs;
use quash::{reaper, Interpreter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Diagnostics go to stderr so the stdout protocol stays byte-exact.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    // SIGCHLD must be blocked before any thread or child exists; the
    // watcher claims it with sigwait from then on.
    reaper::block_sigchld()?;
    let jobs = SharedJobs::new();
    reaper::spawn_watcher(jobs.clone())?;

    Interpreter::new(jobs).repl()
}
