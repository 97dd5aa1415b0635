//! Editor delegate integration tests
//!
//! The delegate sits between the host, the processor and the editor's
//! controls. These tests drive it through a full component and check what
//! each control and the host observed.

use crate::helpers::tolerances::{GAIN_EPSILON, NORMALIZED_EPSILON};
use crate::helpers::*;
use approx::assert_abs_diff_eq;
use duetto::prelude::*;
use duetto::{ParameterChanges, ParameterQueue};

fn attach(
    component: &mut PluginComponent<TestPlugin>,
    controls: Vec<Box<dyn Control>>,
) -> std::sync::Arc<EditorProbe> {
    let (editor, probe) = RecordingEditor::new(controls);
    assert_eq!(component.attach_editor(editor), ResultCode::Ok);
    probe
}

#[test]
fn test_attach_resyncs_every_parameter_then_scales() {
    let (mut component, _host) = active_component();
    let log = ControlLog::default();
    let probe = attach(&mut component, knob_per_param(4, &log));

    assert_eq!(value_events(&log), 4);
    assert_eq!(values_for(&log, 100), vec![0.5]);
    assert_eq!(values_for(&log, 102), vec![0.0]);
    assert_eq!(values_for(&log, 100 + BYPASS as i32), vec![0.0]);
    let cutoff = ParameterRange::logarithmic(20.0, 20000.0, 1000.0).default_normalized();
    assert_abs_diff_eq!(values_for(&log, 101)[0], cutoff, epsilon = NORMALIZED_EPSILON);
    assert_eq!(EditorProbe::get(&probe.display_scale), 1);
}

#[test]
fn test_state_restore_resyncs_exactly_once() {
    let (mut component, _host) = active_component();
    let mut blob = Vec::new();
    component.processor().registry().set_normalized(GAIN, 0.9).unwrap();
    assert_eq!(component.get_state(&mut blob), ResultCode::Ok);
    component.processor().registry().reset_to_defaults();

    let log = ControlLog::default();
    attach(&mut component, knob_per_param(4, &log));
    log.lock().clear();

    assert_eq!(component.set_state(&blob), ResultCode::Ok);
    assert_eq!(value_events(&log), 4);
    assert_eq!(values_for(&log, 100), vec![0.9]);

    // Nothing else queued behind the restore.
    component.idle();
    assert_eq!(value_events(&log), 4);
}

#[test]
fn test_dirty_parameters_bracket_one_group() {
    let (component, host) = active_component();
    let delegate = component.delegate().unwrap();
    delegate
        .dirty_parameters_from_ui(&[(GAIN, 0.1), (CUTOFF, 0.2), (MODE, 0.5)])
        .unwrap();

    assert_eq!(
        host.calls(),
        vec![
            HostCall::BeginGroup,
            HostCall::PerformEdit(GAIN, 0.1),
            HostCall::PerformEdit(CUTOFF, 0.2),
            HostCall::PerformEdit(MODE, 0.5),
            HostCall::EndGroup,
        ]
    );
}

#[test]
fn test_empty_batch_makes_no_host_calls() {
    let (component, host) = active_component();
    component.delegate().unwrap().dirty_parameters_from_ui(&[]).unwrap();
    assert!(host.calls().is_empty());
}

#[test]
fn test_batch_with_unknown_parameter_still_closes_group() {
    let (component, host) = active_component();
    let delegate = component.delegate().unwrap();
    assert!(delegate
        .dirty_parameters_from_ui(&[(GAIN, 0.2), (42, 0.5), (MODE, 0.25)])
        .is_err());
    assert_eq!(host.count(|c| matches!(c, HostCall::PerformEdit(..))), 2);
    assert_eq!(host.calls().last(), Some(&HostCall::EndGroup));
}

#[test]
fn test_gesture_reports_begin_perform_end() {
    let (component, host) = active_component();
    let delegate = component.delegate().unwrap();
    delegate.begin_parameter_edit(GAIN).unwrap();
    delegate.parameter_changed_from_ui(GAIN, 0.3).unwrap();
    delegate.end_parameter_edit(GAIN).unwrap();

    assert_eq!(
        host.calls(),
        vec![
            HostCall::BeginEdit(GAIN),
            HostCall::PerformEdit(GAIN, 0.3),
            HostCall::EndEdit(GAIN),
        ]
    );
    assert!(delegate.begin_parameter_edit(99).is_err());
}

#[test]
fn test_stepped_edit_is_snapped_before_reporting() {
    let (component, host) = active_component();
    component
        .delegate()
        .unwrap()
        .parameter_changed_from_ui(MODE, 0.3)
        .unwrap();
    // Five positions: 0.3 lands on 1/4.
    assert_eq!(host.calls(), vec![HostCall::PerformEdit(MODE, 0.25)]);
}

#[test]
fn test_edit_reaches_every_control_bound_to_parameter() {
    let (mut component, host) = active_component();
    let log = ControlLog::default();
    attach(
        &mut component,
        vec![
            RecordingControl::knob(10, MODE, &log),
            RecordingControl::knob(11, MODE, &log),
            RecordingControl::knob(12, GAIN, &log),
        ],
    );
    log.lock().clear();

    component
        .delegate()
        .unwrap()
        .parameter_changed_from_ui(MODE, 0.75)
        .unwrap();
    assert_eq!(run_empty_block(&mut component).code, ResultCode::Ok);
    assert!(component.processor().plugin().changes.contains(&(MODE, 0.75)));

    component.idle();
    assert_eq!(values_for(&log, 10), vec![0.75]);
    assert_eq!(values_for(&log, 11), vec![0.75]);
    assert!(values_for(&log, 12).is_empty());
    assert_eq!(host.calls(), vec![HostCall::PerformEdit(MODE, 0.75)]);
}

#[test]
fn test_unknown_control_tag_is_ignored() {
    let (mut component, _host) = active_component();
    let log = ControlLog::default();
    attach(&mut component, vec![RecordingControl::display(12, false, &log)]);

    let delegate = component.delegate().unwrap();
    delegate
        .send_control_msg_from_ui(ControlTag(99), PING, b"lost")
        .unwrap();
    delegate
        .send_control_msg_from_ui(ControlTag(12), PING, b"hi")
        .unwrap();
    run_empty_block(&mut component);
    component.idle();

    assert_eq!(
        *log.lock(),
        vec![ControlEvent::Message(12, PING, b"hi".to_vec())]
    );
    let delegate = component.delegate_mut().unwrap();
    assert_eq!(delegate.send_control_value_from_delegate(ControlTag(99), 0.5), 0);
    assert_eq!(delegate.send_control_value_from_delegate(ControlTag::NONE, 0.5), 0);
}

#[test]
fn test_arbitrary_message_round_trip() {
    let (mut component, _host) = active_component();
    let probe = attach(&mut component, Vec::new());

    component
        .delegate()
        .unwrap()
        .send_arbitrary_msg_from_ui(PING, &[])
        .unwrap();
    run_empty_block(&mut component);
    component.idle();

    assert_eq!(*probe.arbitrary.lock(), vec![(PING, Vec::new())]);
}

#[test]
fn test_unbound_control_value_reaches_plugin() {
    let (mut component, _host) = active_component();
    component
        .delegate()
        .unwrap()
        .control_value_changed_from_ui(ControlTag(5), 0.4)
        .unwrap();
    run_empty_block(&mut component);
    assert_eq!(
        component.processor().plugin().control_values,
        vec![(ControlTag(5), 0.4)]
    );
    assert!(component.processor().plugin().changes.is_empty());
}

#[test]
fn test_ui_midi_goes_to_host_and_listening_controls() {
    let (mut component, _host) = active_component();
    let log = ControlLog::default();
    attach(
        &mut component,
        vec![
            RecordingControl::display(50, true, &log),
            RecordingControl::display(51, false, &log),
        ],
    );

    let note = MidiMessage::note_on(0, 0, 64, 100);
    component.delegate().unwrap().send_midi_msg_from_ui(note).unwrap();
    let out = run_empty_block(&mut component);
    assert_eq!(out.events.midi, vec![note]);

    component.idle();
    assert_eq!(*log.lock(), vec![ControlEvent::Midi(50, note)]);
}

#[test]
fn test_host_midi_and_sysex_reach_editor() {
    let (mut component, _host) = active_component();
    let log = ControlLog::default();
    attach(&mut component, vec![RecordingControl::display(50, true, &log)]);

    let note = MidiMessage::control_change(3, 1, 74, 20);
    let sysex = SysExData::new(0, &[0xF0, 0x7D, 0x01, 0xF7]).unwrap();
    let out = run_block(
        &mut component,
        BlockIo {
            midi: &[note],
            sysex: std::slice::from_ref(&sysex),
            ..Default::default()
        },
    );
    assert_eq!(out.events.midi, vec![note]);
    assert_eq!(out.events.sysex, vec![sysex.clone()]);

    component.idle();
    assert_eq!(
        *log.lock(),
        vec![
            ControlEvent::Midi(50, note),
            ControlEvent::SysEx(50, sysex.bytes().to_vec()),
        ]
    );
}

#[test]
fn test_host_automation_is_reflected_to_controls() {
    let (mut component, _host) = active_component();
    let log = ControlLog::default();
    attach(&mut component, knob_per_param(3, &log));
    log.lock().clear();

    let mut changes = ParameterChanges::new();
    let mut queue = ParameterQueue::new(GAIN);
    queue.add_point(0, 0.8);
    queue.add_point(16, 0.25);
    changes.add_queue(queue);

    let out = run_block(
        &mut component,
        BlockIo {
            changes: Some(&changes),
            ..Default::default()
        },
    );
    for sample in &out.samples {
        assert_abs_diff_eq!(*sample, 0.25, epsilon = GAIN_EPSILON);
    }

    component.idle();
    assert_eq!(values_for(&log, 100), vec![0.25]);
    assert_eq!(value_events(&log), 1);
}

#[test]
fn test_resize_forwarded_only_on_change() {
    let (mut component, host) = active_component();
    let delegate = component.delegate_mut().unwrap();
    assert_eq!(delegate.size(), Some((400, 300)));

    assert!(!delegate.resize_from_ui(400, 300).unwrap());
    assert!(delegate.resize_from_ui(640, 480).unwrap());
    assert!(!delegate.resize_from_ui(640, 480).unwrap());
    assert!(delegate.resize_from_ui(0, 480).is_err());

    assert_eq!(host.calls(), vec![HostCall::Resize(640, 480)]);
    assert_eq!(delegate.size(), Some((640, 480)));
}

#[test]
fn test_rejected_resize_is_reported_once() {
    let host = RecordingHost::rejecting_resize();
    let mut component = PluginComponent::new(TestPlugin::default(), test_config(), host.clone());
    assert_eq!(component.initialize(&host_context()), ResultCode::Ok);

    let delegate = component.delegate_mut().unwrap();
    assert!(!delegate.resize_from_ui(800, 600).unwrap());
    assert_eq!(host.calls(), vec![HostCall::Resize(800, 600)]);
}

#[test]
fn test_window_lifecycle_and_release() {
    let (mut component, _host) = active_component();
    let probe = attach(&mut component, Vec::new());

    assert_eq!(component.open_window(WindowHandle(1)), Some(WindowHandle(2)));
    assert_eq!(component.open_window(WindowHandle(5)), Some(WindowHandle(6)));
    assert_eq!(EditorProbe::get(&probe.closed), 1);

    assert_eq!(component.terminate(), ResultCode::Ok);
    assert_eq!(EditorProbe::get(&probe.closed), 2);
    assert_eq!(EditorProbe::get(&probe.released), 1);

    drop(component);
    assert_eq!(EditorProbe::get(&probe.released), 1);
}

#[test]
fn test_replacing_editor_releases_previous() {
    let (mut component, _host) = active_component();
    let first = attach(&mut component, Vec::new());
    let second = attach(&mut component, Vec::new());

    assert_eq!(EditorProbe::get(&first.released), 1);
    assert_eq!(EditorProbe::get(&second.released), 0);
    assert_eq!(EditorProbe::get(&second.display_scale), 1);
}

#[test]
fn test_attach_before_initialize_fails() {
    let mut component =
        PluginComponent::new(TestPlugin::default(), test_config(), RecordingHost::new());
    let (editor, probe) = RecordingEditor::new(Vec::new());
    assert_eq!(component.attach_editor(editor), ResultCode::NotInitialized);
    assert_eq!(EditorProbe::get(&probe.released), 1);
}
