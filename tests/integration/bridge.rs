//! Bridge integration tests
//!
//! Ordering, overflow accounting and delivery between real threads.

use duetto::plugin::bridge;
use duetto::{ControlTag, EditorMessage, MidiMessage, PluginError, ProcessorMessage};
use proptest::prelude::*;
use std::thread;

fn note(n: u8) -> EditorMessage {
    EditorMessage::MidiFromUi(MidiMessage::note_on(0, 0, n, 100))
}

proptest! {
    /// Any sequence that fits is drained in exactly the order it was sent.
    #[test]
    fn test_fifo_order_preserved(notes in proptest::collection::vec(0u8..128, 0..64)) {
        let (editor, processor) = bridge::channel(64);
        for &n in &notes {
            editor.send(note(n)).unwrap();
        }

        let mut received = Vec::new();
        processor.drain(|m| received.push(m));
        let expected: Vec<_> = notes.iter().map(|&n| note(n)).collect();
        prop_assert_eq!(received, expected);
        prop_assert_eq!(editor.stats().to_processor_dropped, 0);
    }

    /// Overflow keeps the oldest messages and counts every rejected one.
    #[test]
    fn test_overflow_drops_newest(capacity in 1usize..16, extra in 1usize..16) {
        let (_editor, processor) = bridge::channel(capacity);
        for i in 0..capacity + extra {
            let accepted = processor.send(ProcessorMessage::ParamValueToUi {
                param_index: i,
                normalized: 0.0,
            });
            prop_assert_eq!(accepted, i < capacity);
        }
        prop_assert_eq!(processor.stats().to_editor_dropped, extra as u64);
    }
}

#[test]
fn test_editor_overflow_is_an_error() {
    let (editor, processor) = bridge::channel(2);
    editor.send(note(1)).unwrap();
    editor.send(note(2)).unwrap();
    assert!(matches!(
        editor.send(note(3)),
        Err(PluginError::QueueFull(_))
    ));

    let mut received = Vec::new();
    processor.drain(|m| received.push(m));
    assert_eq!(received, vec![note(1), note(2)]);
    assert_eq!(processor.stats().to_processor_dropped, 1);
}

#[test]
fn test_delivery_between_threads() {
    const COUNT: usize = 2000;
    let (editor, processor) = bridge::channel(32);

    let producer = thread::spawn(move || {
        let mut sent = 0;
        while sent < COUNT {
            let msg = EditorMessage::ControlValueChanged {
                control_tag: ControlTag(sent as i32),
                param_index: None,
                normalized: 0.5,
            };
            if editor.send(msg).is_ok() {
                sent += 1;
            } else {
                thread::yield_now();
            }
        }
        editor
    });

    let mut next = 0;
    while next < COUNT {
        processor.drain(|m| match m {
            EditorMessage::ControlValueChanged { control_tag, .. } => {
                assert_eq!(control_tag, ControlTag(next as i32));
                next += 1;
            }
            other => panic!("unexpected {:?}", other),
        });
        thread::yield_now();
    }

    producer.join().unwrap();
    assert_eq!(next, COUNT);
    assert_eq!(processor.pending(), 0);
}
