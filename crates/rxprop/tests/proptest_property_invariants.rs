//! Property-based invariant tests for the write pipeline and multicast.
//!
//! 1. A filter rejecting a value leaves the stored value untouched and
//!    notifies nobody.
//! 2. Every accepted write reaches every live subscriber exactly once, in
//!    write order.
//! 3. Empty writes produce error events, never next events.
//! 4. Terminated subscribers receive nothing after termination.
//! 5. `set` always echoes its argument.
//! 6. A consumable never yields the same stored value twice.

use std::rc::Rc;

use proptest::prelude::*;
use rxprop::testing::{Event, RecordingSink};
use rxprop::{Consumable, Property};

// ── Strategies ────────────────────────────────────────────────────────────

fn writes_strategy(max_len: usize) -> impl Strategy<Value = Vec<Option<i16>>> {
    proptest::collection::vec(proptest::option::weighted(0.85, any::<i16>()), 0..=max_len)
}

fn expected_events(
    initial: i16,
    writes: &[Option<i16>],
    accept: impl Fn(i16) -> bool,
) -> Vec<Event<i16>> {
    let mut events = vec![Event::Next(initial)];
    for write in writes {
        match write {
            Some(v) if accept(*v) => events.push(Event::Next(*v)),
            Some(_) => {}
            None => events.push(Event::Error("value set to empty".to_owned())),
        }
    }
    events
}

proptest! {
    #[test]
    fn filter_rejections_are_invisible(
        initial in any::<i16>(),
        writes in proptest::collection::vec(any::<i16>(), 0..64),
    ) {
        let property = Property::new(initial);
        property.filter(|v| Ok(v.is_some_and(|n| n % 3 == 0)));
        let sink = Rc::new(RecordingSink::new());
        property.as_observable().subscribe(&sink);

        let mut last = initial;
        for value in &writes {
            prop_assert_eq!(property.set(*value).unwrap(), Some(*value));
            if value % 3 == 0 {
                last = *value;
            }
            prop_assert_eq!(property.get().unwrap(), Some(last));
        }

        let expected: Vec<i16> = std::iter::once(initial)
            .chain(writes.iter().copied().filter(|v| v % 3 == 0))
            .collect();
        prop_assert_eq!(sink.values(), expected);
    }

    #[test]
    fn every_subscriber_sees_every_write_in_order(
        initial in any::<i16>(),
        writes in writes_strategy(48),
        subscribers in 1usize..6,
    ) {
        let property = Property::new(initial);
        let sinks: Vec<Rc<RecordingSink<i16>>> =
            (0..subscribers).map(|_| Rc::new(RecordingSink::new())).collect();
        for sink in &sinks {
            property.as_observable().subscribe(sink);
        }

        for write in &writes {
            prop_assert_eq!(property.set(*write).unwrap(), *write);
        }

        let expected = expected_events(initial, &writes, |_| true);
        for sink in &sinks {
            prop_assert_eq!(sink.events(), expected.clone());
        }
    }

    #[test]
    fn terminated_subscribers_receive_nothing_after(
        writes in proptest::collection::vec(any::<i16>(), 1..32),
        cut in 0usize..32,
    ) {
        let cut = cut.min(writes.len());
        let property = Property::empty();
        let stays = Rc::new(RecordingSink::new());
        let leaves = Rc::new(RecordingSink::new());
        property.as_observable().subscribe(&stays);
        property.as_observable().subscribe(&leaves);

        for (index, value) in writes.iter().enumerate() {
            if index == cut {
                leaves.terminate();
            }
            property.set(*value).unwrap();
        }

        prop_assert_eq!(stays.values(), writes.clone());
        prop_assert_eq!(leaves.values(), writes[..cut].to_vec());
        prop_assert_eq!(property.subscriber_count(), if cut < writes.len() { 1 } else { 2 });
    }

    #[test]
    fn consumable_hands_each_value_out_once(values in proptest::collection::vec(any::<u8>(), 0..32)) {
        let inbox = Consumable::empty();
        for value in &values {
            inbox.set(*value).unwrap();
            prop_assert_eq!(inbox.get().unwrap(), Some(*value));
            prop_assert_eq!(inbox.get().unwrap(), None);
            prop_assert!(inbox.consume().is_err());
        }
    }
}
