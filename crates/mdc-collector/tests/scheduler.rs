//! Scheduler timing tests.
//!
//! Every test runs on a paused tokio clock, so intervals of tens of seconds
//! complete instantly and pass start times are exact.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mdc_collector::{BatchCoordinator, Scheduler, SchedulerPhase};
use mdc_core::ProductRecord;
use mdc_dataset::{DatasetError, RecordSource};
use mdc_queue::{Publisher, QueueError};
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;

fn record(name: &str) -> ProductRecord {
    ProductRecord {
        name: name.to_string(),
        brand: "Polar".to_string(),
        date: "2024-01-15".to_string(),
        sales_quantity: 1,
        price: 2999.0,
        original_price: 3499.0,
        discount_percentage: 14.0,
        stock_level: 8,
        region: "Novosibirsk".to_string(),
        category: "Sports".to_string(),
        customer_rating: 4.8,
        review_count: 54,
        delivery_days: 4,
        seller: "Polar Outdoor".to_string(),
        is_weekend: false,
        is_holiday: true,
    }
}

/// Source that records the clock reading of every read.
#[derive(Clone)]
struct TimedSource {
    records: Vec<ProductRecord>,
    fail_reads: HashSet<usize>,
    reads: Arc<Mutex<Vec<Instant>>>,
}

impl TimedSource {
    fn with_records(n: usize) -> Self {
        Self {
            records: (0..n).map(|i| record(&format!("sku-{i}"))).collect(),
            fail_reads: HashSet::new(),
            reads: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn failing_reads(mut self, reads: &[usize]) -> Self {
        self.fail_reads = reads.iter().copied().collect();
        self
    }

    /// Read times relative to `start`.
    fn offsets(&self, start: Instant) -> Vec<Duration> {
        self.reads
            .lock()
            .unwrap()
            .iter()
            .map(|t| t.duration_since(start))
            .collect()
    }
}

impl RecordSource for TimedSource {
    fn read(&self) -> Result<Vec<ProductRecord>, DatasetError> {
        let mut reads = self.reads.lock().unwrap();
        let n = reads.len();
        reads.push(Instant::now());
        if self.fail_reads.contains(&n) {
            return Err(DatasetError::SourceUnavailable {
                path: PathBuf::from("./dataset/ozon.csv"),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
            });
        }
        Ok(self.records.clone())
    }
}

/// Publisher that sleeps for a scripted duration on selected calls and
/// tracks how many publishes are in flight at once.
#[derive(Clone, Default)]
struct SlowPublisher {
    delays: Arc<Vec<Duration>>,
    calls: Arc<AtomicUsize>,
    completed: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl SlowPublisher {
    fn with_delays(delays: Vec<Duration>) -> Self {
        Self {
            delays: Arc::new(delays),
            ..Self::default()
        }
    }
}

impl Publisher for SlowPublisher {
    async fn publish(&self, _record: &ProductRecord) -> Result<(), QueueError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delays.get(call) {
            sleep(*delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.completed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn secs(s: u64) -> Duration {
    Duration::from_secs(s)
}

// ----- Startup -----

#[tokio::test(start_paused = true)]
async fn startup_pass_runs_without_waiting_for_the_interval() {
    let source = TimedSource::with_records(2);
    let publisher = SlowPublisher::default();
    let scheduler = Scheduler::new(
        BatchCoordinator::new(source.clone(), publisher.clone()),
        secs(3600),
    );
    let start = Instant::now();

    let handle = scheduler.spawn(CancellationToken::new());
    let report = handle.shutdown().await.unwrap();

    assert_eq!(report.passes, 1);
    assert_eq!(source.offsets(start), vec![Duration::ZERO]);
    assert_eq!(publisher.completed.load(Ordering::SeqCst), 2);
    assert_eq!(Instant::now(), start, "no time should pass");
}

#[tokio::test(start_paused = true)]
async fn startup_pass_runs_even_when_already_cancelled() {
    let source = TimedSource::with_records(1);
    let scheduler = Scheduler::new(
        BatchCoordinator::new(source.clone(), SlowPublisher::default()),
        secs(10),
    );
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = scheduler.run(cancel).await;

    assert_eq!(report.passes, 1);
    assert_eq!(report.records_published, 1);
    assert_eq!(report.state.phase, SchedulerPhase::Stopped);
}

// ----- Interval -----

#[tokio::test(start_paused = true)]
async fn runs_one_pass_per_interval_after_startup() {
    let source = TimedSource::with_records(1);
    let scheduler = Scheduler::new(
        BatchCoordinator::new(source.clone(), SlowPublisher::default()),
        secs(60),
    );
    let start = Instant::now();

    let handle = scheduler.spawn(CancellationToken::new());
    sleep(secs(150)).await;
    let report = handle.shutdown().await.unwrap();

    assert_eq!(report.passes, 3);
    assert_eq!(source.offsets(start), vec![secs(0), secs(60), secs(120)]);
}

#[tokio::test(start_paused = true)]
async fn cancel_during_wait_stops_without_another_pass() {
    let source = TimedSource::with_records(1);
    let scheduler = Scheduler::new(
        BatchCoordinator::new(source.clone(), SlowPublisher::default()),
        secs(60),
    );
    let start = Instant::now();

    let handle = scheduler.spawn(CancellationToken::new());
    sleep(secs(90)).await;
    let report = handle.shutdown().await.unwrap();

    assert_eq!(report.passes, 2);
    assert_eq!(
        Instant::now().duration_since(start),
        secs(90),
        "shutdown should not wait for the next tick"
    );

    sleep(secs(600)).await;
    assert_eq!(source.offsets(start).len(), 2);
}

// ----- Cancellation during a pass -----

#[tokio::test(start_paused = true)]
async fn cancel_during_pass_lets_the_pass_finish() {
    let source = TimedSource::with_records(3);
    let publisher = SlowPublisher::with_delays(vec![secs(1), secs(1), secs(1)]);
    let scheduler = Scheduler::new(
        BatchCoordinator::new(source.clone(), publisher.clone()),
        secs(60),
    );
    let start = Instant::now();

    let handle = scheduler.spawn(CancellationToken::new());
    sleep(Duration::from_millis(1500)).await;
    assert_eq!(publisher.completed.load(Ordering::SeqCst), 1);

    let report = handle.shutdown().await.unwrap();

    assert_eq!(publisher.completed.load(Ordering::SeqCst), 3);
    assert_eq!(report.passes, 1);
    assert_eq!(report.records_published, 3);
    assert_eq!(Instant::now().duration_since(start), secs(3));
}

// ----- Overrun -----

#[tokio::test(start_paused = true)]
async fn overrunning_pass_coalesces_missed_ticks() {
    // Pass 1 (startup) is instant, pass 2 takes 35s, later passes are instant.
    let source = TimedSource::with_records(1);
    let publisher = SlowPublisher::with_delays(vec![Duration::ZERO, secs(35)]);
    let scheduler = Scheduler::new(
        BatchCoordinator::new(source.clone(), publisher.clone()),
        secs(10),
    );
    let start = Instant::now();

    let handle = scheduler.spawn(CancellationToken::new());
    sleep(secs(52)).await;
    let report = handle.shutdown().await.unwrap();

    // Ticks at 20s, 30s and 40s were missed while pass 2 ran; they collapse
    // into one catch-up pass at 45s, then the grid resumes at 50s.
    assert_eq!(
        source.offsets(start),
        vec![secs(0), secs(10), secs(45), secs(50)]
    );
    assert_eq!(report.passes, 4);
    assert_eq!(publisher.max_in_flight.load(Ordering::SeqCst), 1);
}

// ----- Failures -----

#[tokio::test(start_paused = true)]
async fn failed_read_does_not_stop_the_scheduler() {
    let source = TimedSource::with_records(2).failing_reads(&[0, 1]);
    let publisher = SlowPublisher::default();
    let scheduler = Scheduler::new(
        BatchCoordinator::new(source.clone(), publisher.clone()),
        secs(10),
    );

    let handle = scheduler.spawn(CancellationToken::new());
    sleep(secs(25)).await;
    let report = handle.shutdown().await.unwrap();

    assert_eq!(report.passes, 3);
    assert_eq!(report.failed_passes, 2);
    assert_eq!(report.records_published, 2);
    assert_eq!(publisher.calls.load(Ordering::SeqCst), 2);
}

// ----- State -----

#[tokio::test(start_paused = true)]
async fn phase_moves_from_idle_to_stopped() {
    let scheduler = Scheduler::new(
        BatchCoordinator::new(TimedSource::with_records(0), SlowPublisher::default()),
        secs(5),
    );
    assert_eq!(scheduler.state().phase, SchedulerPhase::Idle);
    assert_eq!(scheduler.state().interval, secs(5));

    let cancel = CancellationToken::new();
    let handle = scheduler.spawn(cancel.clone());
    assert!(!handle.is_finished());

    cancel.cancel();
    let report = handle.join().await.unwrap();

    assert_eq!(report.state.phase, SchedulerPhase::Stopped);
    assert_eq!(report.state.interval, secs(5));
}

#[tokio::test(start_paused = true)]
async fn zero_interval_falls_back_to_default() {
    let scheduler = Scheduler::new(
        BatchCoordinator::new(TimedSource::with_records(0), SlowPublisher::default()),
        Duration::ZERO,
    );

    assert_eq!(
        scheduler.state().interval,
        mdc_core::DEFAULT_SCHEDULER_INTERVAL
    );
}
