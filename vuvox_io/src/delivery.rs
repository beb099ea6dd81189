use std::{
    thread::{self, JoinHandle},
    time::Duration,
};

use crossbeam::channel::{Sender, bounded, select, tick};

const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Runs a callback once per analysis interval on its own thread. Stops on
/// drop.
pub struct Delivery {
    interval: Duration,
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Delivery {
    pub fn spawn<F>(name: &str, interval: Duration, mut on_tick: F) -> std::io::Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let interval = interval.max(MIN_INTERVAL);
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let ticker = tick(interval);

        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                log::debug!("delivery started, interval {interval:?}");
                loop {
                    select! {
                        recv(ticker) -> _ => on_tick(),
                        recv(stop_rx) -> _ => break,
                    }
                }
                log::debug!("delivery stopped");
            })?;

        Ok(Delivery {
            interval,
            stop: Some(stop_tx),
            handle: Some(handle),
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        // Disconnecting the stop channel wakes the select.
        self.stop.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::warn!("delivery thread panicked");
            }
        }
    }
}

impl Drop for Delivery {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    #[test]
    fn test_ticks_until_stopped() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);

        let delivery = Delivery::spawn("test-delivery", Duration::from_millis(2), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        thread::sleep(Duration::from_millis(60));
        delivery.stop();

        let after_stop = count.load(Ordering::SeqCst);
        assert!(after_stop > 0);

        thread::sleep(Duration::from_millis(20));
        assert_eq!(count.load(Ordering::SeqCst), after_stop);
    }

    #[test]
    fn test_zero_interval_is_raised() {
        let delivery = Delivery::spawn("test-zero", Duration::ZERO, || {}).unwrap();
        assert_eq!(delivery.interval(), MIN_INTERVAL);
        assert!(delivery.is_running());
    }
}
