//! The background-job table.
//!
//! A fixed number of slots, filled first-fit from index 0; job numbers
//! are 1-based slot indices, so `jobs` output order is insertion order
//! and a number is reused only after its slot has been reaped. The table
//! owns the [`Child`] handles of the processes it tracks, which is what
//! lets the reap scan use non-blocking [`Child::try_wait`] without ever
//! racing a foreground wait for the same pid.
//!
//! Exactly two actors touch the table: the dispatcher inserts on the
//! foreground path, the termination watcher removes. [`SharedJobs`] is
//! the mutex-guarded handle threaded to both (and to the `jobs`/`kill`
//! builtins).

use std::io::Write;
use std::process::Child;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;

/// Number of background jobs trackable at once.
pub const CAPACITY: usize = 16;

struct Job {
    pid: u32,
    text: String,
    child: Child,
    upstream: Option<Child>,
}

/// Outcome of a signal-delivery request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalOutcome {
    /// Delivery was attempted (errors are logged, never reported).
    Sent,
    /// The job number names a free or out-of-range slot.
    NoSuchJob,
    /// Either the job number or the signal number was zero.
    InvalidArguments,
}

/// Fixed-capacity registry of in-flight background processes.
pub struct JobTable {
    slots: [Option<Job>; CAPACITY],
    /// Processes reaped silently: pipeline upstream stages and anything
    /// that could not get a slot.
    orphans: Vec<Child>,
}

impl JobTable {
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
            orphans: Vec::new(),
        }
    }

    /// Track a background process in the first free slot, returning its
    /// 1-based job number. A full table returns `None`; the processes
    /// join the orphan list so they are still reaped.
    pub fn insert(&mut self, child: Child, upstream: Option<Child>, text: String) -> Option<usize> {
        let Some(free) = self.slots.iter().position(Option::is_none) else {
            tracing::debug!(pid = child.id(), "job table full, adopting as orphan");
            self.orphans.push(child);
            self.orphans.extend(upstream);
            return None;
        };
        let pid = child.id();
        self.slots[free] = Some(Job {
            pid,
            text,
            child,
            upstream,
        });
        Some(free + 1)
    }

    /// Hand a process over for silent reaping.
    pub fn adopt(&mut self, child: Child) {
        self.orphans.push(child);
    }

    /// Snapshot of the occupied slots as `(number, pid, text)`, in slot
    /// order.
    pub fn entries(&self) -> Vec<(usize, u32, String)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| {
                slot.as_ref()
                    .map(|job| (index + 1, job.pid, job.text.clone()))
            })
            .collect()
    }

    /// Number of occupied slots.
    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Deliver `signum` to the job with the given 1-based `number`.
    ///
    /// Zero for either argument is invalid; a free or out-of-range slot
    /// is no-such-job. Delivery itself is best-effort: an unmappable
    /// signal number or a kill failure is logged at debug only.
    pub fn signal(&self, number: i32, signum: i32) -> SignalOutcome {
        if number == 0 || signum == 0 {
            return SignalOutcome::InvalidArguments;
        }
        let Some(job) = usize::try_from(number)
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|slot| self.slots.get(slot))
            .and_then(Option::as_ref)
        else {
            return SignalOutcome::NoSuchJob;
        };
        let pid = Pid::from_raw(job.pid as i32);
        match Signal::try_from(signum) {
            Ok(sig) => {
                if let Err(err) = signal::kill(pid, sig) {
                    tracing::debug!(%err, %pid, "signal delivery failed");
                }
            }
            Err(err) => tracing::debug!(%err, signum, "unmappable signal number"),
        }
        SignalOutcome::Sent
    }

    /// One reconciliation pass: drain dead orphans silently, then resolve
    /// at most one slot, writing its termination or error report to
    /// `report`.
    ///
    /// One slot per pass mirrors the delivery model: each pass answers
    /// exactly one child-termination notification.
    pub fn reap_one(&mut self, report: &mut dyn Write) -> std::io::Result<()> {
        self.orphans
            .retain_mut(|child| matches!(child.try_wait(), Ok(None)));

        for (index, slot) in self.slots.iter_mut().enumerate() {
            let Some(job) = slot else { continue };
            match job.child.try_wait() {
                Ok(None) => continue,
                Ok(Some(_)) => {
                    writeln!(report, "[{}] {} finished {}", index + 1, job.pid, job.text)?;
                }
                Err(err) => {
                    writeln!(
                        report,
                        "[{}] {} {} encountered an error. ERROR {}",
                        index + 1,
                        job.pid,
                        job.text,
                        err.raw_os_error().unwrap_or(0)
                    )?;
                }
            }
            // A surviving upstream stage keeps getting polled silently.
            if let Some(upstream) = job.upstream.take() {
                self.orphans.push(upstream);
            }
            *slot = None;
            break;
        }
        Ok(())
    }
}

impl Default for JobTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloneable handle to the process-wide job table.
#[derive(Clone)]
pub struct SharedJobs(Arc<Mutex<JobTable>>);

impl SharedJobs {
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(JobTable::new())))
    }

    /// Lock the table. A poisoned lock is recovered: no table method can
    /// leave it in an inconsistent state.
    pub fn lock(&self) -> MutexGuard<'_, JobTable> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for SharedJobs {
    fn default() -> Self {
        Self::new()
    }
}
