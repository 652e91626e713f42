//! Periodic remote-write push loop.
//!
//! The scheduler waits a short grace period, polls the local server until it
//! answers (or the attempts run out), pushes once immediately and then once
//! per interval. Cycles run one at a time on a single task, so a slow push
//! delays the next tick instead of overlapping it.
//!
//! Only the first successful push is logged; failures are always logged.
//! Reading the source is bounded by `fetch_timeout`, and shutdown abandons a
//! cycle that is still running.

use crate::metrics::{parse_snapshot, remote_write, SnapshotSource};
use crate::push::config::ScheduleSettings;
use crate::push::transport::PushTransport;
use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// What a single push cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The snapshot had nothing to send; no request was made.
    Skipped,
    /// The batch was accepted. `first` is set for the first success only.
    Pushed { first: bool },
    /// The cycle was aborted and logged.
    Failed,
}

/// Drives push cycles for one source and transport.
pub struct PushScheduler<S, T> {
    source: S,
    transport: T,
    hostname: String,
    settings: ScheduleSettings,
    announced_success: bool,
}

impl<S, T> PushScheduler<S, T>
where
    S: SnapshotSource,
    T: PushTransport,
{
    pub fn new(source: S, transport: T, hostname: impl Into<String>, settings: ScheduleSettings) -> Self {
        Self {
            source,
            transport,
            hostname: hostname.into(),
            settings,
            announced_success: false,
        }
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Run until `shutdown` flips to `true` or its sender is dropped.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        if *shutdown.borrow() {
            return;
        }

        tokio::select! {
            _ = self.prepare() => {}
            _ = shutdown.changed() => {
                debug!("Push scheduler stopped before the first push");
                return;
            }
        }

        if self.settings.interval.is_zero() {
            warn!(
                "Push: interval must be greater than zero, using {:?}",
                self.settings.effective_interval()
            );
        }
        let mut ticker = time::interval(self.settings.effective_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.changed() => break,
            }
            // A cycle in progress is abandoned on shutdown
            tokio::select! {
                _ = self.push_once() => {}
                _ = shutdown.changed() => break,
            }
        }
        info!("Push scheduler shutting down");
    }

    async fn prepare(&self) {
        time::sleep(self.settings.grace_period).await;
        self.wait_for_readiness().await;
    }

    /// Poll the local server. Running out of attempts is not fatal.
    pub async fn wait_for_readiness(&self) -> bool {
        let attempts = self.settings.readiness_attempts.max(1);

        for attempt in 1..=attempts {
            if self.transport.probe().await {
                debug!("Local server ready after {} probe(s)", attempt);
                return true;
            }
            if attempt < attempts {
                time::sleep(self.settings.readiness_backoff).await;
            }
        }

        warn!(
            "Push: HTTP server not ready after {} retries, will retry on next interval",
            attempts
        );
        false
    }

    /// Read, encode and send one snapshot.
    pub async fn push_once(&mut self) -> CycleOutcome {
        let raw = match time::timeout(self.settings.fetch_timeout, self.source.fetch_json()).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => {
                error!("Push: failed to get JSON data: {}", e);
                return CycleOutcome::Failed;
            }
            Err(_) => {
                error!(
                    "Push: failed to get JSON data: no response within {:?}",
                    self.settings.fetch_timeout
                );
                return CycleOutcome::Failed;
            }
        };

        let snapshot = match parse_snapshot(&raw) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!("Push: failed to parse JSON data: {}", e);
                return CycleOutcome::Failed;
            }
        };

        let timestamp_millis = chrono::Utc::now().timestamp_millis();
        let body = match remote_write::encode(&snapshot, &self.hostname, timestamp_millis) {
            Ok(Some(body)) => body,
            Ok(None) => return CycleOutcome::Skipped,
            Err(e) => {
                error!("Push: {}", e);
                return CycleOutcome::Failed;
            }
        };

        match self.transport.push(body).await {
            Ok(()) => {
                let first = !self.announced_success;
                if first {
                    info!("Push: metrics pushed successfully (subsequent successful pushes will be silent)");
                    self.announced_success = true;
                }
                CycleOutcome::Pushed { first }
            }
            Err(e) => {
                error!("Push: failed: {}", e);
                CycleOutcome::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ExporterError, Result};
    use crate::metrics::ReportView;
    use std::collections::VecDeque;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tracing_subscriber::fmt::MakeWriter;

    const SNAPSHOT: &[u8] =
        br#"{"interfaces":[{"name":"eth0","traffic":{"total":{"rx":100,"tx":50}}}]}"#;

    struct StaticSource(&'static [u8]);

    impl SnapshotSource for StaticSource {
        async fn fetch(&self, _view: ReportView) -> Result<Vec<u8>> {
            Ok(self.0.to_vec())
        }
    }

    /// Never answers, like a wedged vnstat process.
    struct HangingSource;

    impl SnapshotSource for HangingSource {
        async fn fetch(&self, _view: ReportView) -> Result<Vec<u8>> {
            std::future::pending().await
        }
    }

    #[derive(Default)]
    struct ScriptedTransport {
        ready: bool,
        rejections: Mutex<VecDeque<bool>>,
        probes: AtomicUsize,
        pushes: AtomicUsize,
        delay: Duration,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl ScriptedTransport {
        /// `true` entries reject the corresponding push with a 500.
        fn scripted(rejections: &[bool]) -> Self {
            Self {
                ready: true,
                rejections: Mutex::new(rejections.iter().copied().collect()),
                ..Default::default()
            }
        }
    }

    impl PushTransport for Arc<ScriptedTransport> {
        async fn probe(&self) -> bool {
            self.probes.fetch_add(1, Ordering::SeqCst);
            self.ready
        }

        async fn push(&self, _body: Vec<u8>) -> Result<()> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            if !self.delay.is_zero() {
                time::sleep(self.delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.pushes.fetch_add(1, Ordering::SeqCst);

            let reject = self.rejections.lock().unwrap().pop_front().unwrap_or(false);
            if reject {
                Err(ExporterError::PushRejected {
                    status: 500,
                    body: "ingester unavailable".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl LogBuffer {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for LogBuffer {
        type Writer = LogBuffer;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn fast_settings() -> ScheduleSettings {
        ScheduleSettings::default()
            .with_interval(Duration::from_millis(10))
            .with_grace_period(Duration::from_millis(1))
            .with_readiness(3, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_success_logged_once_and_failures_always() {
        let logs = LogBuffer::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let mut script = vec![false; 11];
        script[5] = true;
        script[8] = true;
        let transport = Arc::new(ScriptedTransport::scripted(&script));
        let mut scheduler =
            PushScheduler::new(StaticSource(SNAPSHOT), transport.clone(), "host", fast_settings());

        let mut outcomes = Vec::new();
        for _ in 0..script.len() {
            outcomes.push(scheduler.push_once().await);
        }

        assert_eq!(outcomes[0], CycleOutcome::Pushed { first: true });
        assert_eq!(outcomes[5], CycleOutcome::Failed);
        assert_eq!(
            outcomes
                .iter()
                .filter(|o| **o == CycleOutcome::Pushed { first: false })
                .count(),
            8
        );

        let text = logs.contents();
        assert_eq!(text.matches("pushed successfully").count(), 1);
        assert_eq!(text.matches("Push: failed").count(), 2);
        assert!(text.contains("status: 500"));
    }

    #[tokio::test]
    async fn test_consecutive_successes_logged_once() {
        let logs = LogBuffer::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let transport = Arc::new(ScriptedTransport::scripted(&[]));
        let mut scheduler =
            PushScheduler::new(StaticSource(SNAPSHOT), transport.clone(), "host", fast_settings());

        assert_eq!(scheduler.push_once().await, CycleOutcome::Pushed { first: true });
        for _ in 0..10 {
            assert_eq!(scheduler.push_once().await, CycleOutcome::Pushed { first: false });
        }

        let text = logs.contents();
        assert_eq!(transport.pushes.load(Ordering::SeqCst), 11);
        assert_eq!(text.matches("pushed successfully").count(), 1);
        assert_eq!(text.lines().count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_falls_back_to_default() {
        let transport = Arc::new(ScriptedTransport::scripted(&[]));
        let settings = fast_settings().with_interval(Duration::ZERO);
        let scheduler = PushScheduler::new(StaticSource(SNAPSHOT), transport.clone(), "host", settings);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(scheduler.run(shutdown_rx));

        time::sleep(Duration::from_secs(45)).await;
        shutdown_tx.send(true).unwrap();
        handle.await.expect("scheduler task must not panic");

        // Immediate push plus one at the 30s default
        assert_eq!(transport.pushes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_source_times_out() {
        let transport = Arc::new(ScriptedTransport::scripted(&[]));
        let settings = fast_settings().with_fetch_timeout(Duration::from_secs(5));
        let mut scheduler = PushScheduler::new(HangingSource, transport.clone(), "host", settings);

        assert_eq!(scheduler.push_once().await, CycleOutcome::Failed);
        assert_eq!(transport.pushes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_interrupts_running_cycle() {
        let transport = Arc::new(ScriptedTransport::scripted(&[]));
        let settings = fast_settings().with_fetch_timeout(Duration::from_secs(3600));
        let scheduler = PushScheduler::new(HangingSource, transport.clone(), "host", settings);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(scheduler.run(shutdown_rx));

        // Let the first cycle start and block on the source
        time::sleep(Duration::from_millis(50)).await;
        shutdown_tx.send(true).unwrap();

        time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("scheduler must stop without waiting for the source")
            .unwrap();
        assert_eq!(transport.pushes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_interface_list_skips_push() {
        let transport = Arc::new(ScriptedTransport::scripted(&[]));
        let mut scheduler =
            PushScheduler::new(StaticSource(b"{}"), transport.clone(), "host", fast_settings());

        assert_eq!(scheduler.push_once().await, CycleOutcome::Skipped);
        assert_eq!(transport.pushes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_malformed_source_output_fails_cycle() {
        let transport = Arc::new(ScriptedTransport::scripted(&[]));
        let mut scheduler =
            PushScheduler::new(StaticSource(b"not json"), transport.clone(), "host", fast_settings());

        assert_eq!(scheduler.push_once().await, CycleOutcome::Failed);
        assert_eq!(transport.pushes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_readiness_exhaustion_is_not_fatal() {
        let transport = Arc::new(ScriptedTransport {
            ready: false,
            ..Default::default()
        });
        let scheduler =
            PushScheduler::new(StaticSource(SNAPSHOT), transport.clone(), "host", fast_settings());

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(scheduler.run(shutdown_rx));

        time::sleep(Duration::from_millis(50)).await;
        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();

        assert_eq!(transport.probes.load(Ordering::SeqCst), 3);
        assert!(transport.pushes.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_pushes_never_overlap() {
        let transport = Arc::new(ScriptedTransport {
            ready: true,
            delay: Duration::from_millis(35),
            ..Default::default()
        });
        let scheduler =
            PushScheduler::new(StaticSource(SNAPSHOT), transport.clone(), "host", fast_settings());

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(scheduler.run(shutdown_rx));

        time::sleep(Duration::from_millis(300)).await;
        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();

        assert!(transport.pushes.load(Ordering::SeqCst) >= 3);
        assert_eq!(transport.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_shutdown_before_start() {
        let transport = Arc::new(ScriptedTransport::scripted(&[]));
        let scheduler =
            PushScheduler::new(StaticSource(SNAPSHOT), transport.clone(), "host", fast_settings());

        let (_shutdown_tx, shutdown_rx) = watch::channel(true);
        scheduler.run(shutdown_rx).await;
        assert_eq!(transport.probes.load(Ordering::SeqCst), 0);
    }
}
