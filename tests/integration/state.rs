//! State persistence integration tests
//!
//! Save and restore through the host component, including blobs written by
//! an older build with fewer parameters and blobs that must be refused.

use crate::helpers::*;
use duetto::core::{state_size, write_state, STATE_HEADER_SIZE};
use duetto::prelude::*;
use proptest::prelude::*;

fn saved(component: &PluginComponent<TestPlugin>) -> Vec<u8> {
    let mut blob = Vec::new();
    assert_eq!(component.get_state(&mut blob), ResultCode::Ok);
    blob
}

fn values(component: &PluginComponent<TestPlugin>) -> Vec<f64> {
    component
        .processor()
        .registry()
        .iter()
        .map(|p| p.normalized())
        .collect()
}

#[test]
fn test_save_load_is_bit_exact() {
    let (mut c, _host) = active_component();
    let registry = c.processor().registry();
    registry.set_normalized(GAIN, 0.123_456_789_012_345).unwrap();
    registry.set_normalized(CUTOFF, 1.0 / 3.0).unwrap();
    registry.set_normalized(MODE, 0.75).unwrap();
    c.processor_mut().plugin_mut().preset = 42;

    let before = values(&c);
    let blob = saved(&c);
    assert_eq!(blob.len(), state_size(4, 4));

    c.processor().registry().reset_to_defaults();
    c.processor_mut().plugin_mut().preset = 0;
    assert_eq!(c.set_state(&blob), ResultCode::Ok);

    let after = values(&c);
    assert_eq!(
        before.iter().map(|v| v.to_bits()).collect::<Vec<_>>(),
        after.iter().map(|v| v.to_bits()).collect::<Vec<_>>()
    );
    assert_eq!(c.processor().plugin().preset, 42);
    assert_eq!(saved(&c), blob);
}

#[test]
fn test_load_notifies_plugin_of_every_parameter() {
    let (mut c, _host) = active_component();
    c.processor().registry().set_normalized(GAIN, 0.8).unwrap();
    let blob = saved(&c);
    c.processor_mut().plugin_mut().changes.clear();

    assert_eq!(c.set_state(&blob), ResultCode::Ok);
    let changed: Vec<usize> = c
        .processor()
        .plugin()
        .changes
        .iter()
        .map(|(i, _)| *i)
        .collect();
    assert_eq!(changed, vec![GAIN, CUTOFF, MODE]);
    assert_eq!(c.processor().plugin().gain, 0.8);
}

#[test]
fn test_bypass_is_saved_with_the_parameters() {
    let (mut c, _host) = active_component();
    c.processor().registry().set_normalized(BYPASS, 1.0).unwrap();
    let blob = saved(&c);

    c.processor().registry().reset_to_defaults();
    assert!(!c.processor().is_bypassed());
    assert_eq!(c.set_state(&blob), ResultCode::Ok);
    assert!(c.processor().is_bypassed());
    assert!(c.processor().plugin().changes.iter().all(|(i, _)| *i != BYPASS));
}

#[test]
fn test_older_blob_resets_missing_parameters() {
    let (mut c, _host) = active_component();

    // Written by a build that only had Gain and Cutoff.
    let mut older = ParameterRegistry::new();
    older
        .push(ParameterDescriptor::new("Gain", ParameterRange::linear(0.0, 1.0, 0.5)))
        .unwrap();
    older
        .push(ParameterDescriptor::new("Cutoff", ParameterRange::logarithmic(20.0, 20000.0, 1000.0)))
        .unwrap();
    older.set_normalized(0, 0.2).unwrap();
    older.set_normalized(1, 0.6).unwrap();
    let mut blob = Vec::new();
    write_state(&older, &7u32.to_le_bytes(), &mut blob);

    c.processor().registry().set_normalized(MODE, 1.0).unwrap();
    assert_eq!(c.set_state(&blob), ResultCode::Ok);
    assert_eq!(values(&c), vec![0.2, 0.6, 0.0, 0.0]);
    assert_eq!(c.processor().plugin().preset, 7);
}

#[test]
fn test_rejected_blobs_leave_state_untouched() {
    let (mut c, _host) = active_component();
    c.processor().registry().set_normalized(GAIN, 0.9).unwrap();
    let good = saved(&c);
    c.processor().registry().set_normalized(GAIN, 0.1).unwrap();
    let before = values(&c);

    let mut bad_magic = good.clone();
    bad_magic[0] = b'X';

    let mut out_of_range = good.clone();
    out_of_range[STATE_HEADER_SIZE..STATE_HEADER_SIZE + 8].copy_from_slice(&1.5f64.to_le_bytes());

    let mut bad_trailer = good.clone();
    bad_trailer.truncate(good.len() - 4);
    bad_trailer[good.len() - 8..].copy_from_slice(&0u32.to_le_bytes());

    let mut trailing = good.clone();
    trailing.push(0);

    for blob in [
        Vec::new(),
        bad_magic,
        good[..good.len() - 1].to_vec(),
        out_of_range,
        bad_trailer,
        trailing,
    ] {
        assert_eq!(c.set_state(&blob), ResultCode::False);
        assert_eq!(values(&c), before);
    }
    assert_eq!(c.set_state(&good), ResultCode::Ok);
}

#[test]
fn test_failed_load_does_not_resync_editor() {
    let (mut c, _host) = active_component();
    let log = ControlLog::default();
    let (editor, _probe) = RecordingEditor::new(knob_per_param(3, &log));
    c.attach_editor(editor);
    log.lock().clear();

    assert_eq!(c.set_state(b"not a state"), ResultCode::False);
    assert_eq!(value_events(&log), 0);
}

#[test]
fn test_state_survives_reactivation() {
    let (mut c, _host) = active_component();
    c.processor().registry().set_normalized(CUTOFF, 0.4).unwrap();
    let blob = saved(&c);

    c.set_active(false);
    c.processor().registry().reset_to_defaults();
    assert_eq!(c.set_state(&blob), ResultCode::Ok);
    c.set_active(true);
    assert_eq!(c.processor().registry().normalized(CUTOFF).unwrap(), 0.4);
}

proptest! {
    /// Whatever the bytes, a load either succeeds or changes nothing.
    #[test]
    fn test_arbitrary_bytes_never_partially_apply(bytes in proptest::collection::vec(any::<u8>(), 0..96)) {
        let (mut c, _host) = active_component();
        c.processor().registry().set_normalized(GAIN, 0.3).unwrap();
        let before = values(&c);
        if c.set_state(&bytes) != ResultCode::Ok {
            prop_assert_eq!(values(&c), before);
        }
    }
}
