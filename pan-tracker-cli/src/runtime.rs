//! Event loop wiring
//!
//! One task owns the control loop and feeds it, one event at a time, from the
//! calibration timer, the serial open signal, the message bus and the
//! test-mode ticker. The serial and bus tasks only move bytes.

use crate::bus::{self, BusMessage};
use crate::config::AppConfig;
use crate::serial::{self, SerialSink};
use anyhow::{bail, Result};
use pan_tracker_core::bearing::remap;
use pan_tracker_core::{CommandSink, ControlEvent, ControlLoop};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::future::Future;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Uniformly random bench-test angle in [-180, 180]
pub fn random_angle<R: Rng>(rng: &mut R) -> f64 {
    remap(rng.gen::<f64>(), (0.0, 1.0), (-180.0, 180.0))
}

/// Run until interrupted
pub async fn run(config: AppConfig) -> Result<()> {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (open_tx, open_rx) = oneshot::channel();
    tokio::spawn(serial::run(config.serial.clone(), open_tx, command_rx));
    let mut sink = SerialSink::new(command_tx);

    let (bus_tx, bus_rx) = mpsc::unbounded_channel();
    tokio::spawn(bus::run(config.bus.clone(), config.app_name.clone(), bus_tx));

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Could not listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    };

    run_with(&config, open_rx, bus_rx, &mut sink, shutdown).await
}

/// Drive the control loop from the given inputs until `shutdown` completes
///
/// The zero-point delay starts on entry. Calibration signals are polled
/// before bus traffic, so with a zero delay and an immediate open the zero
/// point precedes every queued subject command.
pub async fn run_with<S, F>(
    config: &AppConfig,
    mut open_rx: oneshot::Receiver<()>,
    mut bus_rx: mpsc::UnboundedReceiver<BusMessage>,
    sink: &mut S,
    shutdown: F,
) -> Result<()>
where
    S: CommandSink,
    F: Future<Output = ()>,
{
    let delay = tokio::time::sleep(Duration::from_millis(config.wait_to_zero));
    tokio::pin!(delay);
    tokio::pin!(shutdown);

    let mut control = ControlLoop::new(config.control());

    let period = Duration::from_millis(config.test_interval);
    let mut test_ticker = interval_at(Instant::now() + period, period);
    test_ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut rng = StdRng::from_entropy();
    if config.test_mode {
        log::info!("Test mode: sending a random angle every {}ms", config.test_interval);
    }

    // A zero delay is applied before anything else is polled; a timer
    // rounded up to the next tick could otherwise lose to queued traffic
    let mut delay_done = config.wait_to_zero == 0;
    if delay_done {
        if let Err(e) = control.dispatch(ControlEvent::DelayElapsed, &mut *sink) {
            log::error!("Could not send motor command: {}", e);
        }
    }
    let mut open_done = false;

    loop {
        let event = tokio::select! {
            biased;

            _ = &mut delay, if !delay_done => {
                delay_done = true;
                ControlEvent::DelayElapsed
            }
            opened = &mut open_rx, if !open_done => {
                open_done = true;
                match opened {
                    Ok(()) => ControlEvent::TransportOpened,
                    Err(_) => {
                        log::error!("Serial task ended before the port opened");
                        continue;
                    }
                }
            }
            message = bus_rx.recv() => match message {
                Some(BusMessage::Tracking(batch)) => ControlEvent::Batch(batch),
                Some(BusMessage::Target(id)) => ControlEvent::Override(id),
                None => bail!("message bus task stopped"),
            },
            _ = test_ticker.tick(), if config.test_mode => {
                ControlEvent::TestTick(random_angle(&mut rng))
            }
            _ = &mut shutdown => {
                log::info!("Shutting down");
                return Ok(());
            }
        };

        if let Err(e) = control.dispatch(event, &mut *sink) {
            log::error!("Could not send motor command: {}", e);
        }
    }
}
