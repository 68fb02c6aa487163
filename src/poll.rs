use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::logging::{log, obj, v_num, v_str, Domain, Level};
use crate::sync::{DashboardSync, StructureOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub cycle: u64,
    pub outcome: StructureOutcome,
}

#[derive(Default)]
struct StopSignal {
    stopped: AtomicBool,
    notify: Notify,
}

/// Handle to a running poll loop. Dropping it leaves the loop running.
pub struct PollHandle {
    stop: Arc<StopSignal>,
    task: JoinHandle<()>,
}

impl PollHandle {
    /// Stop scheduling new cycles. Cycles already in flight still complete.
    pub fn stop(&self) {
        self.stop.stopped.store(true, Ordering::SeqCst);
        // notify_one keeps a permit if the loop is not waiting yet
        self.stop.notify.notify_one();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub async fn join(self) {
        let _ = self.task.await;
    }
}

/// Refresh immediately, then every `poll_interval`, until stopped.
pub fn start(sync: DashboardSync) -> PollHandle {
    spawn_loop(sync, None)
}

/// Like [`start`], reporting the outcome of every cycle on `reports`.
pub fn start_reporting(sync: DashboardSync, reports: mpsc::UnboundedSender<CycleReport>) -> PollHandle {
    spawn_loop(sync, Some(reports))
}

fn spawn_loop(sync: DashboardSync, reports: Option<mpsc::UnboundedSender<CycleReport>>) -> PollHandle {
    let stop = Arc::new(StopSignal::default());
    let task = tokio::spawn(run(sync, stop.clone(), reports));
    PollHandle { stop, task }
}

async fn run(sync: DashboardSync, stop: Arc<StopSignal>, reports: Option<mpsc::UnboundedSender<CycleReport>>) {
    let period = sync.config().poll_interval.max(Duration::from_millis(1));
    log(
        Level::Info,
        Domain::Poll,
        "started",
        obj(&[
            ("source", v_str(&sync.config().source)),
            ("interval_ms", v_num(period.as_millis() as f64)),
        ]),
    );

    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut cycle = 0u64;
    loop {
        tokio::select! {
            _ = stop.notify.notified() => {}
            _ = ticker.tick() => {}
        }
        if stop.stopped.load(Ordering::SeqCst) {
            break;
        }
        cycle += 1;
        // cycles are not awaited here; a slow cycle may overlap the next one
        let sync = sync.clone();
        let reports = reports.clone();
        tokio::spawn(async move {
            let outcome = sync.refresh_structure().await;
            if let Some(tx) = reports {
                let _ = tx.send(CycleReport { cycle, outcome });
            }
        });
    }

    log(
        Level::Info,
        Domain::Poll,
        "stopped",
        obj(&[("cycles", v_num(cycle as f64))]),
    );
}
