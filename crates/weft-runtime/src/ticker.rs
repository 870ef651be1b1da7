#![forbid(unsafe_code)]

//! Tick scheduling for the renderer.
//!
//! One background thread wakes at the framerate and runs the tick
//! callback until signaled to stop. The signal/trigger pair is a condvar
//! so the thread blocks efficiently between ticks and reacts to a stop
//! without waiting out the current interval.

use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

/// Receiving side of the stop handshake, owned by the ticker thread.
pub(crate) struct StopSignal {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl StopSignal {
    pub(crate) fn new() -> (Self, StopTrigger) {
        let inner = Arc::new((Mutex::new(false), Condvar::new()));
        let signal = Self {
            inner: Arc::clone(&inner),
        };
        (signal, StopTrigger { inner })
    }

    /// Wait for either the stop signal or a timeout.
    ///
    /// Returns `true` if stopped, `false` if the interval elapsed.
    /// Loops on the condvar to absorb spurious wakeups.
    pub(crate) fn wait_timeout(&self, duration: Duration) -> bool {
        let (lock, cvar) = &*self.inner;
        let mut stopped = lock.lock().unwrap();
        if *stopped {
            return true;
        }

        let start = Instant::now();
        let mut remaining = duration;
        loop {
            let (guard, result) = cvar.wait_timeout(stopped, remaining).unwrap();
            stopped = guard;
            if *stopped {
                return true;
            }
            if result.timed_out() {
                return false;
            }
            let elapsed = start.elapsed();
            if elapsed >= duration {
                return false;
            }
            remaining = duration - elapsed;
        }
    }
}

/// Sending side of the stop handshake.
pub(crate) struct StopTrigger {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl StopTrigger {
    pub(crate) fn stop(&self) {
        let (lock, cvar) = &*self.inner;
        let mut stopped = lock.lock().unwrap();
        *stopped = true;
        cvar.notify_all();
    }
}

/// A running ticker thread.
pub(crate) struct Ticker {
    trigger: StopTrigger,
    thread: Option<thread::JoinHandle<()>>,
}

impl Ticker {
    /// Spawn a thread that runs `tick` every `framerate` until stopped.
    pub(crate) fn spawn<F>(framerate: Duration, tick: F) -> Self
    where
        F: Fn() + Send + 'static,
    {
        let (signal, trigger) = StopSignal::new();
        let thread = thread::spawn(move || {
            debug!(?framerate, "ticker started");
            while !signal.wait_timeout(framerate) {
                tick();
            }
            debug!("ticker stopped");
        });
        Self {
            trigger,
            thread: Some(thread),
        }
    }

    /// Signal the thread and wait for it to exit.
    pub(crate) fn stop(mut self) {
        self.trigger.stop();
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        // Signal without joining; the thread exits on its next wakeup.
        self.trigger.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn wait_timeout_times_out() {
        let (signal, _trigger) = StopSignal::new();
        assert!(!signal.wait_timeout(Duration::from_millis(5)));
    }

    #[test]
    fn wait_timeout_sees_stop() {
        let (signal, trigger) = StopSignal::new();
        trigger.stop();
        assert!(signal.wait_timeout(Duration::from_secs(60)));
    }

    #[test]
    fn ticker_ticks_then_stops() {
        let count = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&count);
        let ticker = Ticker::spawn(Duration::from_millis(1), move || {
            counted.fetch_add(1, Ordering::SeqCst);
        });

        while count.load(Ordering::SeqCst) < 3 {
            thread::sleep(Duration::from_millis(1));
        }
        ticker.stop();

        let settled = count.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(10));
        assert_eq!(count.load(Ordering::SeqCst), settled, "no ticks after stop");
    }
}
