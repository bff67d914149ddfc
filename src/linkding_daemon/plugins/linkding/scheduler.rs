use std::{
    io,
    sync::mpsc::{self, RecvTimeoutError, Sender},
    thread::{self, JoinHandle},
    time::Duration,
};

use tracing::{debug, warn};

/// Calls a refresh callback every `interval` on its own thread until stopped.
pub struct RefreshScheduler {
    interval: Duration,
    stop: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl RefreshScheduler {
    pub fn start(
        interval: Duration,
        refresh_first: bool,
        callback: impl Fn() + Send + 'static,
    ) -> io::Result<Self> {
        let (stop, stopped) = mpsc::channel();
        let handle = thread::Builder::new()
            .name("linkding-refresh".into())
            .spawn(move || {
                if refresh_first {
                    callback();
                }
                loop {
                    match stopped.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => callback(),
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
                    }
                }
            })?;
        debug!("Refreshing every {}s", interval.as_secs());

        Ok(Self {
            interval,
            stop,
            handle: Some(handle),
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Signals the loop and waits for it. A refresh that is already running
    /// is not interrupted.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        // the loop may be gone already
        let _ = self.stop.send(());
        if handle.join().is_err() {
            warn!("Refresh thread panicked");
        }
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
        time::Instant,
    };

    fn counter() -> (Arc<AtomicUsize>, impl Fn() + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = Arc::clone(&count);
        (count, move || {
            inner.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn refreshes_every_interval() {
        let (count, callback) = counter();
        let scheduler = RefreshScheduler::start(Duration::from_millis(20), false, callback).unwrap();
        thread::sleep(Duration::from_millis(200));
        scheduler.stop();
        assert!(count.load(Ordering::SeqCst) >= 2);
    }

    #[test]
    fn waits_a_full_interval_before_the_first_refresh() {
        let (count, callback) = counter();
        let scheduler = RefreshScheduler::start(Duration::from_secs(60), false, callback).unwrap();
        thread::sleep(Duration::from_millis(50));
        scheduler.stop();
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn refresh_first_runs_once_immediately() {
        let (count, callback) = counter();
        let scheduler = RefreshScheduler::start(Duration::from_secs(60), true, callback).unwrap();
        thread::sleep(Duration::from_millis(50));
        scheduler.stop();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn stop_does_not_wait_for_the_interval() {
        let (_count, callback) = counter();
        let scheduler = RefreshScheduler::start(Duration::from_secs(3600), false, callback).unwrap();
        let started = Instant::now();
        drop(scheduler);
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
