use ax12_core::mocks::MockTransport;
use ax12_core::{AxError, Bus, InitError};

#[test]
fn open_configures_the_transport_once() {
    let transport = MockTransport::new();
    let bus = Bus::open(transport.clone(), 115_200).expect("open bus");

    assert_eq!(bus.baud_rate(), 115_200);
    assert_eq!(transport.opened_rates(), vec![115_200]);
    assert_eq!(transport.reset_all_count(), 1, "default profile broadcast");
}

#[test]
fn ensure_same_rate_is_a_silent_noop() {
    let transport = MockTransport::new();
    let bus = Bus::open(transport.clone(), 115_200).expect("open bus");

    bus.ensure_baud_rate(115_200).expect("same rate");
    bus.ensure_baud_rate(115_200).expect("same rate again");

    assert_eq!(
        transport.opened_rates(),
        vec![115_200],
        "idempotent ensure must not reopen the transport"
    );
}

#[test]
fn ensure_different_rate_reopens_and_updates() {
    let transport = MockTransport::new();
    let bus = Bus::open(transport.clone(), 115_200).expect("open bus");

    bus.ensure_baud_rate(1_000_000).expect("reconfigure");

    assert_eq!(bus.baud_rate(), 1_000_000);
    assert_eq!(transport.opened_rates(), vec![115_200, 1_000_000]);
    assert_eq!(transport.reset_all_count(), 2, "profile re-applied");
}

#[test]
fn open_rejects_baud_outside_window() {
    for baud in [0u32, 7_342, 1_000_001, 2_000_000] {
        let err = Bus::open(MockTransport::new(), baud).expect_err("out-of-window baud");
        let ax = err.downcast_ref::<AxError>().expect("typed error");
        assert!(
            matches!(ax, AxError::InvalidArgument(_)),
            "baud {baud}: got {ax:?}"
        );
    }
}

#[test]
fn ensure_rejects_baud_outside_window_without_touching_transport() {
    let transport = MockTransport::new();
    let bus = Bus::open(transport.clone(), 115_200).expect("open bus");

    let err = bus.ensure_baud_rate(5_000).expect_err("invalid rate");
    let ax = err.downcast_ref::<AxError>().expect("typed error");
    assert!(matches!(ax, AxError::InvalidArgument(_)));
    assert_eq!(bus.baud_rate(), 115_200, "rate unchanged after rejection");
    assert_eq!(transport.opened_rates(), vec![115_200]);
}

#[test]
fn open_failure_maps_to_init_taxonomy() {
    let transport = MockTransport::new();
    transport.fail_with(-1);
    let err = Bus::open(transport, 115_200).expect_err("port open failure");
    let ax = err.downcast_ref::<AxError>().expect("typed error");
    assert!(matches!(ax, AxError::Init(InitError::PortOpenFailed)));

    let transport = MockTransport::new();
    transport.fail_with(-2);
    let err = Bus::open(transport, 115_200).expect_err("mutex failure");
    let ax = err.downcast_ref::<AxError>().expect("typed error");
    assert!(matches!(ax, AxError::Init(InitError::MutexCreateFailed)));

    let transport = MockTransport::new();
    transport.fail_with(-9);
    let err = Bus::open(transport, 115_200).expect_err("unknown failure");
    let ax = err.downcast_ref::<AxError>().expect("typed error");
    assert!(matches!(ax, AxError::Init(InitError::Unknown(-9))));
}

#[test]
fn ping_reports_raw_status_without_error() {
    let transport = MockTransport::responding([5]);
    let bus = Bus::open(transport, 115_200).expect("open bus");

    assert_eq!(bus.ping(5), 0);
    assert!(bus.ping(6) < 0, "silent id is a negative status, not an Err");
}

#[test]
fn scan_sweeps_all_ids_and_accumulates_ascending() {
    // Deliberately unsorted wiring; the sweep itself imposes the order.
    let transport = MockTransport::responding([200, 3, 17]);
    let bus = Bus::open(transport.clone(), 115_200).expect("open bus");

    let found = bus.scan();

    assert_eq!(found, vec![3, 17, 200]);
    assert_eq!(transport.ping_count(), 254, "ids 0..=253, one ping each");
}

#[test]
fn scan_with_streams_hits_in_discovery_order() {
    let transport = MockTransport::responding([44, 2]);
    let bus = Bus::open(transport, 115_200).expect("open bus");

    let mut streamed = Vec::new();
    let found = bus.scan_with(|id| streamed.push(id));

    assert_eq!(found, vec![2, 44]);
    assert_eq!(streamed, found, "observer sees each hit as it is found");
}

#[test]
fn scan_on_a_dead_chain_is_empty() {
    let transport = MockTransport::responding([]);
    let bus = Bus::open(transport, 115_200).expect("open bus");
    assert!(bus.scan().is_empty());
}
