use std::thread;
use std::time::Duration;

use ax12_core::mocks::MockTransport;
use ax12_core::{Actuator, Bus, HardwareActuator, SimTiming, SimulatedActuator};

#[test]
fn returns_true_once_the_move_settles() {
    let timing = SimTiming {
        settle: Duration::from_millis(40),
        startup_delay: Duration::ZERO,
    };
    let mut servo = SimulatedActuator::with_timing(5, timing);

    let arrived = servo
        .move_and_wait(80.0, Duration::from_secs(2))
        .expect("request accepted");

    assert!(arrived);
    assert_eq!(servo.position(), 80.0);
    assert!(!servo.is_moving());
}

#[test]
fn returns_false_on_timeout_and_cancels_the_notification() {
    let timing = SimTiming {
        settle: Duration::from_millis(250),
        startup_delay: Duration::ZERO,
    };
    let mut servo = SimulatedActuator::with_timing(6, timing);

    let arrived = servo
        .move_and_wait(40.0, Duration::from_millis(20))
        .expect("request accepted");
    assert!(!arrived, "settle takes far longer than the wait");

    // The motion itself still finishes on its own schedule.
    thread::sleep(Duration::from_millis(600));
    assert_eq!(servo.position(), 40.0);
    assert!(!servo.is_moving());
}

#[test]
fn propagates_request_failures() {
    let timing = SimTiming {
        settle: Duration::from_millis(40),
        startup_delay: Duration::ZERO,
    };
    let mut servo = SimulatedActuator::with_timing(7, timing);

    servo
        .move_and_wait(999.0, Duration::from_secs(1))
        .expect_err("out-of-range target");
}

#[test]
fn works_against_the_hardware_backend() {
    let transport = MockTransport::new();
    let bus = Bus::open(transport.clone(), 115_200).expect("open bus");
    let mut servo =
        HardwareActuator::with_startup_delay(bus, 3, Duration::ZERO).expect("construct");

    let arriver = {
        let transport = transport.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            transport.complete_move(3);
        })
    };

    let arrived = servo
        .move_and_wait(60.0, Duration::from_secs(2))
        .expect("request accepted");

    arriver.join().expect("arrival thread");
    assert!(arrived);
    assert_eq!(servo.position(), 60.0);
}
