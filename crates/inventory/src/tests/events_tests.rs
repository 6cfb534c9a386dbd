use super::*;

use anyhow::anyhow;
use shared::domain::{PalletId, PalletSummary};

fn pallet(id: i64) -> PalletSummary {
    PalletSummary {
        pallet_id: PalletId(id),
        code: format!("P{id}"),
    }
}

fn recorder() -> (Arc<Mutex<Vec<String>>>, impl Fn(&str) -> Listener<PalletEvent>) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let make = {
        let log = Arc::clone(&log);
        move |name: &str| -> Listener<PalletEvent> {
            let log = Arc::clone(&log);
            let name = name.to_string();
            Arc::new(move |event: &PalletEvent| -> Result<()> {
                log.lock().expect("log").push(format!("{name}:{:?}", event.tag()));
                Ok(())
            })
        }
    };
    (log, make)
}

#[test]
fn delivers_in_registration_order_to_matching_tag_only() {
    let bus = EventBus::new();
    let (log, make) = recorder();
    bus.listen(ControllerEvent::Added, make("first"));
    bus.listen(ControllerEvent::Added, make("second"));
    bus.listen(ControllerEvent::Listed, make("lister"));

    bus.notify(&PalletEvent::Added(pallet(1))).expect("notify");

    assert_eq!(
        *log.lock().expect("log"),
        vec!["first:Added".to_string(), "second:Added".to_string()]
    );
}

#[test]
fn registering_same_listener_twice_is_idempotent() {
    let bus = EventBus::new();
    let (log, make) = recorder();
    let listener = make("once");

    let first = bus.listen(ControllerEvent::Added, Arc::clone(&listener));
    let second = bus.listen(ControllerEvent::Added, Arc::clone(&listener));
    assert_eq!(first, second);
    assert_eq!(bus.listener_count(ControllerEvent::Added), 1);

    // The same handle under a different tag is a separate subscription.
    let other = bus.listen(ControllerEvent::Listed, listener);
    assert_ne!(first, other);

    bus.notify(&PalletEvent::Added(pallet(1))).expect("notify");
    assert_eq!(log.lock().expect("log").len(), 1);
}

#[test]
fn unsubscribe_stops_delivery() {
    let bus = EventBus::new();
    let (log, make) = recorder();
    let id = bus.listen(ControllerEvent::Added, make("gone"));
    bus.listen(ControllerEvent::Added, make("stays"));

    assert!(bus.unsubscribe(id));
    assert!(!bus.unsubscribe(id));

    bus.notify(&PalletEvent::Added(pallet(2))).expect("notify");
    assert_eq!(*log.lock().expect("log"), vec!["stays:Added".to_string()]);
}

#[test]
fn listener_error_propagates_and_stops_delivery() {
    let bus = EventBus::new();
    let (log, make) = recorder();
    bus.listen_fn(ControllerEvent::Listed, |_event: &PalletEvent| {
        Err(anyhow!("widget refused the rows"))
    });
    bus.listen(ControllerEvent::Listed, make("after"));

    let err = bus
        .notify(&PalletEvent::Listed(vec![pallet(1)]))
        .expect_err("listener error");
    assert_eq!(err.to_string(), "widget refused the rows");
    assert!(log.lock().expect("log").is_empty());
}

#[test]
fn notify_without_listeners_is_a_no_op() {
    let bus: EventBus<PalletEvent> = EventBus::new();
    bus.notify(&PalletEvent::Added(pallet(3))).expect("notify");
    assert_eq!(bus.listener_count(ControllerEvent::Added), 0);
}

#[test]
fn listener_may_subscribe_while_being_notified() {
    let bus = Arc::new(EventBus::new());
    let inner = Arc::clone(&bus);
    bus.listen_fn(ControllerEvent::Added, move |_event: &PalletEvent| {
        inner.listen_fn(ControllerEvent::Listed, |_event: &PalletEvent| Ok(()));
        Ok(())
    });

    bus.notify(&PalletEvent::Added(pallet(1))).expect("notify");
    assert_eq!(bus.listener_count(ControllerEvent::Listed), 1);
}

#[test]
fn events_serialize_with_type_and_payload() {
    let json = serde_json::to_value(PalletEvent::Added(pallet(4))).expect("json");
    assert_eq!(json["type"], "added");
    assert_eq!(json["payload"]["code"], "P4");
}
