// End-to-end scenarios through the public API
use pan_tracker_core::{
    CalibrationState, CommandGate, CommandSink, ControlConfig, ControlEvent, ControlLoop,
    MotorCommand, Result, SelectionOutcome, TargetSelector, TrackedBatch, TrackedSubject,
};

/// Sink that records the exact bytes written to the link
#[derive(Default)]
struct SerialRecorder {
    written: String,
}

impl CommandSink for SerialRecorder {
    fn transmit(&mut self, command: MotorCommand) -> Result<()> {
        self.written.push_str(&command.to_line());
        Ok(())
    }
}

fn subjects(list: &[(i64, f64)]) -> TrackedBatch {
    list.iter()
        .map(|&(id, bearing)| TrackedSubject::new(id, bearing).with_position(1.0, 2.0))
        .collect::<Vec<_>>()
        .into()
}

#[test]
fn calibration_then_tracking_session() {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut control = ControlLoop::new(ControlConfig::new().with_wait_to_zero(0));
    let mut serial = SerialRecorder::default();

    let events = vec![
        ControlEvent::DelayElapsed,
        ControlEvent::TransportOpened,
        ControlEvent::Batch(subjects(&[(5, 30.0)])),
        ControlEvent::Batch(subjects(&[(5, 28.5), (6, -3.0)])),
        // Subject 5 drops out; 6 has the smallest bearing
        ControlEvent::Batch(subjects(&[(6, -2.0), (8, 4.0)])),
        ControlEvent::Override(8),
        ControlEvent::Batch(subjects(&[(6, -1.0), (8, 5.0)])),
    ];

    for event in events {
        control.dispatch(event, &mut serial).unwrap();
    }

    assert_eq!(serial.written, "0\n30\n28.5\n-2\n5\n");
    assert_eq!(control.calibration_state(), CalibrationState::Running);
    assert_eq!(control.selector_state().current_target_id, 8);
}

#[test]
fn zero_point_first_with_immediate_link() {
    let mut control = ControlLoop::new(ControlConfig::new().with_wait_to_zero(0));
    let mut serial = SerialRecorder::default();

    control.dispatch(ControlEvent::DelayElapsed, &mut serial).unwrap();
    control.dispatch(ControlEvent::TransportOpened, &mut serial).unwrap();
    for bearing in [10.0, 11.0, 12.0] {
        control
            .dispatch(ControlEvent::Batch(subjects(&[(1, bearing)])), &mut serial)
            .unwrap();
    }

    let lines: Vec<&str> = serial.written.lines().collect();
    assert_eq!(lines, vec!["0", "10", "11", "12"]);
    assert_eq!(lines.iter().filter(|l| **l == "0").count(), 1);
}

#[test]
fn link_never_opens_is_tolerated() {
    let mut control = ControlLoop::new(ControlConfig::new().with_test_mode(true));
    let mut serial = SerialRecorder::default();

    control.dispatch(ControlEvent::DelayElapsed, &mut serial).unwrap();
    control.dispatch(ControlEvent::Batch(subjects(&[(3, 7.0)])), &mut serial).unwrap();
    control.dispatch(ControlEvent::TestTick(90.0), &mut serial).unwrap();

    assert!(serial.written.is_empty());
    assert_eq!(control.calibration_state(), CalibrationState::AwaitingZero);
    assert_eq!(control.selector_state().current_target_id, 3);
}

#[test]
fn gated_session_waits_for_zero() {
    let config = ControlConfig::new()
        .with_command_gate(CommandGate::UntilZeroed)
        .with_flip_direction(false);
    let mut control = ControlLoop::new(config);
    let mut serial = SerialRecorder::default();

    control.dispatch(ControlEvent::TransportOpened, &mut serial).unwrap();
    control.dispatch(ControlEvent::Batch(subjects(&[(2, 15.0)])), &mut serial).unwrap();
    control.dispatch(ControlEvent::DelayElapsed, &mut serial).unwrap();
    control.dispatch(ControlEvent::Batch(subjects(&[(2, 15.0)])), &mut serial).unwrap();

    assert_eq!(serial.written, "0\n-15\n");
}

#[test]
fn selector_fallback_example() {
    let mut selector = TargetSelector::new();

    let outcome = selector.resolve(&subjects(&[(1, 10.0), (2, -5.0), (3, 170.0)]));

    assert_eq!(outcome, SelectionOutcome::Reacquired(2));
    assert_eq!(selector.resolve(&subjects(&[(2, 0.0)])), SelectionOutcome::Confirmed(2));
}
