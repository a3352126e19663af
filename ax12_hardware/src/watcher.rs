//! Arrival watcher: the background thread that turns "the servo stopped"
//! into completion-token fires.
//!
//! Safety: each transport spawns exactly one watcher thread, signalled and
//! joined when the transport is dropped, so no thread or token leaks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use ax12_traits::CompletionToken;

use crate::transport::{Engine, WATCH_CAPACITY};

/// One sweep over the watch table per cycle.
const POLL_CYCLE: Duration = Duration::from_millis(100);
/// Exchange-time budget per cycle; a crowded table resumes next cycle
/// instead of blowing the pacing.
const CYCLE_BUDGET: Duration = Duration::from_millis(3);
/// How close to the goal still counts as arrived.
const GOAL_TOLERANCE_DEG: f64 = 1.5;
/// Grace period before declaring a stop final when the goal is off.
const FALSE_ALARM_RECHECK: Duration = Duration::from_millis(20);

#[derive(Clone)]
struct Watch {
    seq: u64,
    id: u8,
    goal_deg: f64,
    token: CompletionToken,
}

pub(crate) struct ArrivalWatcher {
    watches: Arc<Mutex<Vec<Watch>>>,
    next_seq: u64,
    shutdown: Arc<AtomicBool>,
    join_handle: Option<thread::JoinHandle<()>>,
}

impl ArrivalWatcher {
    pub(crate) fn spawn(engine: Arc<Mutex<Engine>>) -> std::io::Result<Self> {
        let watches = Arc::new(Mutex::new(Vec::new()));
        let shutdown = Arc::new(AtomicBool::new(false));
        let table = Arc::clone(&watches);
        let stop = Arc::clone(&shutdown);
        let join_handle = thread::Builder::new()
            .name("ax12-arrival".into())
            .spawn(move || watch_loop(&engine, &table, &stop))?;
        Ok(Self {
            watches,
            next_seq: 0,
            shutdown,
            join_handle: Some(join_handle),
        })
    }

    /// Register a watch. False when the table is at capacity, in which case
    /// the caller must not hand over the token.
    pub(crate) fn watch(&mut self, id: u8, goal_deg: f64, token: CompletionToken) -> bool {
        let mut table = lock_watches(&self.watches);
        if table.len() >= WATCH_CAPACITY {
            return false;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        table.push(Watch {
            seq,
            id,
            goal_deg,
            token,
        });
        true
    }

    /// Drop every watch on `id`. No-op when nothing is watched.
    pub(crate) fn unwatch(&mut self, id: u8) {
        lock_watches(&self.watches).retain(|w| w.id != id);
    }
}

impl Drop for ArrivalWatcher {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => tracing::trace!("arrival watcher joined"),
                Err(e) => tracing::warn!(?e, "arrival watcher panicked during shutdown"),
            }
        }
    }
}

fn watch_loop(engine: &Mutex<Engine>, watches: &Mutex<Vec<Watch>>, shutdown: &AtomicBool) {
    // Sequence number to resume from when a cycle ran out of budget.
    let mut resume_at: u64 = 0;
    loop {
        if shutdown.load(Ordering::Relaxed) {
            tracing::debug!("arrival watcher received shutdown signal");
            break;
        }
        let cycle_start = Instant::now();

        let snapshot: Vec<Watch> = lock_watches(watches).clone();
        let mut idx = snapshot
            .iter()
            .position(|w| w.seq >= resume_at)
            .unwrap_or(0);
        while idx < snapshot.len() {
            if cycle_start.elapsed() > CYCLE_BUDGET {
                break;
            }
            check_arrival(engine, watches, &snapshot[idx]);
            idx += 1;
        }
        resume_at = snapshot.get(idx).map_or(0, |w| w.seq);

        if shutdown.load(Ordering::Relaxed) {
            break;
        }
        let elapsed = cycle_start.elapsed();
        if elapsed < POLL_CYCLE {
            thread::sleep(POLL_CYCLE - elapsed);
        }
    }
    tracing::trace!("arrival watcher exiting");
}

/// Decide whether one watched servo has finished its move, and fire its
/// token if so. Fires on arrival *or* on a confirmed stall: a servo blocked
/// short of its goal still completes, callers read the position if they
/// care.
fn check_arrival(engine: &Mutex<Engine>, watches: &Mutex<Vec<Watch>>, watch: &Watch) {
    let position = {
        let mut eng = lock_engine(engine);
        if eng.moving(watch.id) {
            return;
        }
        eng.position_deg(watch.id)
    };

    if (position - watch.goal_deg).abs() > GOAL_TOLERANCE_DEG {
        // The stop may be a sampling artifact mid-move; give the servo a
        // moment and ask again.
        thread::sleep(FALSE_ALARM_RECHECK);
        if lock_engine(engine).moving(watch.id) {
            return;
        }
        tracing::debug!(
            id = watch.id,
            position,
            goal = watch.goal_deg,
            "servo stopped short of its goal"
        );
    }

    // Claim our table entry; losing the race to a cancel or a newer move
    // means staying silent.
    let claimed = {
        let mut table = lock_watches(watches);
        let before = table.len();
        table.retain(|w| w.seq != watch.seq);
        table.len() < before
    };
    if claimed {
        tracing::debug!(id = watch.id, goal = watch.goal_deg, "move complete");
        watch.token.fire();
    }
}

fn lock_watches(watches: &Mutex<Vec<Watch>>) -> MutexGuard<'_, Vec<Watch>> {
    watches.lock().unwrap_or_else(PoisonError::into_inner)
}

fn lock_engine(engine: &Mutex<Engine>) -> MutexGuard<'_, Engine> {
    engine.lock().unwrap_or_else(PoisonError::into_inner)
}
