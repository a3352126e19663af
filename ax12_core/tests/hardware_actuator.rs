use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use ax12_core::mocks::MockTransport;
use ax12_core::{Actuator, AxError, Bus, CommError, HardwareActuator, Mode};
use rstest::rstest;

fn servo_on(transport: &MockTransport, id: u8) -> HardwareActuator {
    let bus = Bus::open(transport.clone(), 115_200).expect("open bus");
    HardwareActuator::with_startup_delay(bus, id, Duration::ZERO).expect("construct servo")
}

fn counter_pair() -> (Arc<AtomicUsize>, Box<dyn FnOnce() + Send>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let h = hits.clone();
    (
        hits,
        Box::new(move || {
            h.fetch_add(1, Ordering::SeqCst);
        }),
    )
}

#[test]
fn construction_primes_with_a_self_move() {
    let transport = MockTransport::new();
    transport.set_position(7, 42.0);

    let _servo = servo_on(&transport, 7);

    assert_eq!(
        transport.goal_writes(),
        vec![(7, 42.0)],
        "self-move targets the current position"
    );
    assert_eq!(
        transport.mode_writes(),
        vec![(7, Mode::Default)],
        "first move establishes joint mode"
    );
    assert_eq!(transport.watch_count(), 0, "no callback, nothing watched");
}

#[test]
fn construction_fails_when_the_wire_does() {
    let transport = MockTransport::new();
    let bus = Bus::open(transport.clone(), 115_200).expect("open bus");

    transport.fail_with(-4);
    let err = HardwareActuator::with_startup_delay(bus, 3, Duration::ZERO)
        .expect_err("priming move cannot reach the servo");

    let ax = err.downcast_ref::<AxError>().expect("typed error");
    assert!(matches!(ax, AxError::Comm(CommError::Timeout)));
}

#[test]
fn getters_read_through_to_the_device() {
    let transport = MockTransport::new();
    transport.set_position(5, -12.5);
    transport.set_speed_reading(5, 33.0);
    transport.set_load(5, -7.0);
    transport.set_voltage(5, 11.8);
    transport.set_temperature(5, 46);
    transport.set_status(5, 0b0000_0100);

    let mut servo = servo_on(&transport, 5);

    assert_eq!(servo.position(), -12.5);
    assert_eq!(servo.speed(), 33.0);
    assert_eq!(servo.load(), -7.0);
    assert_eq!(servo.voltage(), 11.8);
    assert_eq!(servo.temperature(), 46);
    assert_eq!(servo.status(), 0b0000_0100);
    assert_eq!(servo.ping(), 0);
}

#[test]
fn mode_writes_are_cached_per_instance() {
    let transport = MockTransport::new();
    let mut servo = servo_on(&transport, 7);
    assert_eq!(transport.mode_writes().len(), 1, "priming set joint mode");

    servo.move_to(10.0, None).expect("move");
    servo.move_to(20.0, None).expect("move");
    assert_eq!(transport.mode_writes().len(), 1, "cache suppresses rewrites");

    servo.turn(40.0).expect("turn");
    assert_eq!(
        transport.mode_writes().last(),
        Some(&(7, Mode::Wheel)),
        "turn switches to wheel mode"
    );

    servo.move_to(0.0, None).expect("move back");
    assert_eq!(
        transport.mode_writes().last(),
        Some(&(7, Mode::Default)),
        "move switches back to joint mode"
    );
    assert_eq!(transport.mode_writes().len(), 3);
}

#[test]
fn completion_fires_via_the_transport_watch() {
    let transport = MockTransport::new();
    let mut servo = servo_on(&transport, 9);

    let (hits, cb) = counter_pair();
    servo.move_to(77.0, Some(cb)).expect("move accepted");
    assert!(transport.has_watch(9));
    assert!(servo.is_moving(), "device reports motion");

    transport.complete_move(9);

    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(servo.position(), 77.0);
    assert!(!servo.is_moving());
}

#[rstest]
#[case(-1, CommError::NotInitialized)]
#[case(-2, CommError::BadChecksum)]
#[case(-3, CommError::IdMismatch)]
#[case(-4, CommError::Timeout)]
#[case(-5, CommError::CallbackBufferFull)]
#[case(-9, CommError::Unknown(-9))]
fn setter_failures_map_by_status_code(#[case] code: i32, #[case] want: CommError) {
    let transport = MockTransport::new();
    let mut servo = servo_on(&transport, 4);

    transport.fail_with(code);
    let err = servo.set_led(true).expect_err("forced failure");
    let ax = err.downcast_ref::<AxError>().expect("typed error");
    assert!(matches!(ax, AxError::Comm(c) if *c == want), "got {ax:?}");
}

#[test]
fn failed_move_leaves_no_pending_completion() {
    let transport = MockTransport::new();
    let mut servo = servo_on(&transport, 6);

    let (old_hits, old_cb) = counter_pair();
    servo.move_to(50.0, Some(old_cb)).expect("first move");

    transport.fail_with(-4);
    let (new_hits, new_cb) = counter_pair();
    let err = servo.move_to(60.0, Some(new_cb)).expect_err("wire down");
    let ax = err.downcast_ref::<AxError>().expect("typed error");
    assert!(matches!(ax, AxError::Comm(CommError::Timeout)));

    transport.clear_failure();
    transport.complete_move(6);
    assert_eq!(old_hits.load(Ordering::SeqCst), 0, "superseded by the failed request");
    assert_eq!(new_hits.load(Ordering::SeqCst), 0, "failed request never completes");
}

#[test]
fn same_id_hardware_actuators_alias_the_device() {
    let transport = MockTransport::new();
    let bus = Bus::open(transport.clone(), 115_200).expect("open bus");
    let mut a = HardwareActuator::with_startup_delay(Arc::clone(&bus), 2, Duration::ZERO)
        .expect("first alias");
    let mut b =
        HardwareActuator::with_startup_delay(bus, 2, Duration::ZERO).expect("second alias");

    a.move_to(90.0, None).expect("move through a");
    transport.complete_move(2);

    assert_eq!(b.position(), 90.0, "one physical device behind both");
    assert_eq!(a.position(), b.position());
}

#[test]
fn turn_forwards_the_signed_speed() {
    let transport = MockTransport::new();
    let mut servo = servo_on(&transport, 8);

    servo.turn(-35.0).expect("turn");
    assert_eq!(transport.turn_writes(), vec![(8, -35.0)]);
    assert!(servo.is_moving());

    servo.turn(0.0).expect("stop");
    assert!(!servo.is_moving());
}
