//! Lifecycle integration tests
//!
//! Host call sequences against a full component, with the result codes a
//! host would see at each step.

use crate::helpers::tolerances::GAIN_EPSILON;
use crate::helpers::*;
use approx::assert_abs_diff_eq;
use duetto::plugin::{AudioBuffer, BusDirection, MediaType, ProcessBlock, BYPASS_PARAM_NAME};
use duetto::prelude::*;
use duetto::{ParameterChanges, ParameterQueue, ProcessorState, RestartReason, SpeakerArrangement};

fn component() -> (PluginComponent<TestPlugin>, std::sync::Arc<RecordingHost>) {
    let host = RecordingHost::new();
    let component = PluginComponent::new(TestPlugin::default(), test_config(), host.clone());
    (component, host)
}

#[test]
fn test_full_host_sequence() {
    let (mut c, _host) = component();
    assert_eq!(c.initialize(&host_context()), ResultCode::Ok);
    assert_eq!(c.processor().plugin().host.as_deref(), Some("Test Host"));
    assert_eq!(c.can_process_sample_size(SampleFormat::Float32), ResultCode::Ok);
    assert_eq!(
        c.set_bus_arrangements(&[SpeakerArrangement::MONO], &[SpeakerArrangement::MONO]),
        ResultCode::Ok
    );
    assert_eq!(
        c.setup_processing(ProcessSetup::new(TEST_SAMPLE_RATE, TEST_BLOCK_SIZE)),
        ResultCode::Ok
    );
    assert_eq!(c.set_active(true), ResultCode::Ok);
    assert_eq!(c.processor().state(), ProcessorState::Active);

    let out = run_block(&mut c, BlockIo { input: 0.5, ..Default::default() });
    assert_eq!(out.code, ResultCode::Ok);
    for sample in &out.samples {
        assert_abs_diff_eq!(*sample, 0.25, epsilon = GAIN_EPSILON);
    }

    assert_eq!(c.set_active(false), ResultCode::Ok);
    assert_eq!(c.processor().state(), ProcessorState::Inactive);
    assert_eq!(c.terminate(), ResultCode::Ok);
    assert_eq!(c.processor().state(), ProcessorState::Terminated);
    assert!(c.processor().plugin().terminated);
    assert!(c.delegate().is_none());
}

#[test]
fn test_calls_out_of_order() {
    let (mut c, _host) = component();
    assert_eq!(run_empty_block(&mut c).code, ResultCode::NotInitialized);
    assert_eq!(c.set_active(true), ResultCode::NotInitialized);
    let mut blob = Vec::new();
    assert_eq!(c.get_state(&mut blob), ResultCode::NotInitialized);

    assert_eq!(c.initialize(&host_context()), ResultCode::Ok);
    assert_eq!(c.initialize(&host_context()), ResultCode::False);
    // No setup_processing yet.
    assert_eq!(c.set_active(true), ResultCode::InvalidArgument);
    assert_eq!(run_empty_block(&mut c).code, ResultCode::False);
}

#[test]
fn test_set_active_is_idempotent() {
    let (mut c, _host) = active_component();
    assert_eq!(c.set_active(true), ResultCode::Ok);
    assert_eq!(c.processor().plugin().resets, 1);

    assert_eq!(c.set_active(false), ResultCode::Ok);
    assert_eq!(c.set_active(false), ResultCode::Ok);
    assert_eq!(run_empty_block(&mut c).code, ResultCode::False);

    assert_eq!(c.set_active(true), ResultCode::Ok);
    assert_eq!(c.processor().plugin().resets, 2);
    assert_eq!(run_empty_block(&mut c).code, ResultCode::Ok);
}

#[test]
fn test_setup_rejected_while_active() {
    let (mut c, _host) = active_component();
    assert_eq!(
        c.setup_processing(ProcessSetup::new(96000.0, 64)),
        ResultCode::False
    );
    assert_eq!(c.processor().setup().map(|s| s.sample_rate), Some(TEST_SAMPLE_RATE));
    assert_eq!(
        c.set_bus_arrangements(&[SpeakerArrangement::MONO], &[SpeakerArrangement::MONO]),
        ResultCode::False
    );
}

#[test]
fn test_invalid_setup_values() {
    let (mut c, _host) = component();
    c.initialize(&host_context());
    assert_eq!(
        c.setup_processing(ProcessSetup::new(0.0, 64)),
        ResultCode::InvalidArgument
    );
    assert_eq!(
        c.setup_processing(ProcessSetup::new(TEST_SAMPLE_RATE, 0)),
        ResultCode::InvalidArgument
    );
    assert!(c.processor().setup().is_none());
}

#[test]
fn test_unsupported_bus_arrangement() {
    let (mut c, _host) = component();
    c.initialize(&host_context());
    assert_eq!(
        c.set_bus_arrangements(&[SpeakerArrangement::STEREO], &[SpeakerArrangement::STEREO]),
        ResultCode::InvalidArgument
    );
    let (inputs, outputs) = c.processor().bus_arrangements();
    assert_eq!(inputs, &[SpeakerArrangement::MONO]);
    assert_eq!(outputs, &[SpeakerArrangement::MONO]);
}

#[test]
fn test_block_format_must_match_setup() {
    let (mut c, _host) = active_component();
    let input = vec![1.0f64; TEST_BLOCK_SIZE];
    let mut output = vec![0.0f64; TEST_BLOCK_SIZE];
    let changes = ParameterChanges::new();
    let inputs = [input.as_slice()];
    let mut outputs = [output.as_mut_slice()];
    let mut block = ProcessBlock::new(
        AudioBlock::F64(AudioBuffer {
            inputs: &inputs,
            outputs: &mut outputs,
            num_samples: TEST_BLOCK_SIZE,
        }),
        &changes,
    );
    assert_eq!(c.process(&mut block), ResultCode::InvalidArgument);
}

#[test]
fn test_double_precision_processing() {
    let host = RecordingHost::new();
    let mut c = PluginComponent::new(TestPlugin::default(), test_config(), host);
    c.initialize(&host_context());
    assert_eq!(c.can_process_sample_size(SampleFormat::Float64), ResultCode::Ok);
    assert_eq!(
        c.setup_processing(
            ProcessSetup::new(TEST_SAMPLE_RATE, TEST_BLOCK_SIZE).sample_format(SampleFormat::Float64)
        ),
        ResultCode::Ok
    );
    c.set_active(true);

    let mut output = vec![0.0f64; TEST_BLOCK_SIZE];
    let changes = ParameterChanges::new();
    let mut outputs = [output.as_mut_slice()];
    let mut block = ProcessBlock::new(
        AudioBlock::F64(AudioBuffer {
            inputs: &[],
            outputs: &mut outputs,
            num_samples: TEST_BLOCK_SIZE,
        }),
        &changes,
    );
    assert_eq!(c.process(&mut block), ResultCode::Ok);
}

#[test]
fn test_unsupported_sample_format_rejected() {
    let host = RecordingHost::new();
    let config = test_config().sample_formats(&[SampleFormat::Float32]);
    let mut c = PluginComponent::new(TestPlugin::default(), config, host);
    c.initialize(&host_context());
    assert_eq!(c.can_process_sample_size(SampleFormat::Float64), ResultCode::False);
    assert_eq!(
        c.setup_processing(ProcessSetup::default().sample_format(SampleFormat::Float64)),
        ResultCode::InvalidArgument
    );
}

#[test]
fn test_terminate_is_idempotent() {
    let (mut c, _host) = active_component();
    assert_eq!(c.terminate(), ResultCode::Ok);
    assert_eq!(c.terminate(), ResultCode::Ok);
    assert_eq!(c.set_active(true), ResultCode::NotInitialized);
    assert_eq!(run_empty_block(&mut c).code, ResultCode::NotInitialized);
}

#[test]
fn test_latency_change_restarts_once() {
    let (mut c, host) = active_component();
    assert_eq!(c.latency_samples(), 0);

    c.set_latency(0);
    assert!(host.calls().is_empty());

    c.set_latency(256);
    c.set_latency(256);
    assert_eq!(c.latency_samples(), 256);
    assert_eq!(
        host.calls(),
        vec![HostCall::Restart(RestartReason::LatencyChanged)]
    );
}

#[test]
fn test_parameter_details_changed_restarts() {
    let (c, host) = active_component();
    assert!(c.processor().notify_parameter_details_changed());
    assert_eq!(
        host.calls(),
        vec![HostCall::Restart(RestartReason::ParamTitlesChanged)]
    );
}

#[test]
fn test_units_follow_parameter_groups() {
    let (c, _host) = active_component();
    assert_eq!(c.unit_count(), 2);

    let root = c.unit_info(0).unwrap();
    assert_eq!(root.id, UnitId::ROOT);

    let filter = c.unit_info(1).unwrap();
    assert_eq!(filter.name, "Filter");
    assert_eq!(filter.parent_id, UnitId::ROOT);
    assert!(c.unit_info(2).is_none());

    let registry = c.processor().registry();
    assert_eq!(registry.get(GAIN).unwrap().unit_id(), UnitId::ROOT);
    assert_eq!(registry.get(CUTOFF).unwrap().unit_id(), filter.id);
    assert_eq!(registry.get(MODE).unwrap().unit_id(), filter.id);
}

#[test]
fn test_bus_counts() {
    let (c, _host) = active_component();
    assert_eq!(c.bus_count(MediaType::Audio, BusDirection::Input), 1);
    assert_eq!(c.bus_count(MediaType::Audio, BusDirection::Output), 1);
    assert_eq!(c.bus_count(MediaType::Event, BusDirection::Input), 1);
    assert_eq!(c.bus_count(MediaType::Event, BusDirection::Output), 1);

    let host = RecordingHost::new();
    let mut effect = PluginComponent::new(
        TestPlugin::default(),
        PluginConfig::new("Effect"),
        host,
    );
    effect.initialize(&host_context());
    assert_eq!(effect.bus_count(MediaType::Event, BusDirection::Input), 0);
    assert_eq!(effect.bus_count(MediaType::Audio, BusDirection::Output), 1);
}

#[test]
fn test_effects_expose_a_bypass_parameter() {
    let (effect, _host) = active_component();
    assert_eq!(effect.parameter_count(), 4);
    let bypass = effect.parameter_info(BYPASS).unwrap();
    assert_eq!(bypass.name, BYPASS_PARAM_NAME);
    assert!(bypass.flags.bypass);
    assert_eq!(effect.processor().registry().get(BYPASS).unwrap().unit_id(), UnitId::ROOT);

    let host = RecordingHost::new();
    let mut instrument =
        PluginComponent::new(TestPlugin::default(), test_config().audio_io(0, 1), host);
    assert_eq!(instrument.initialize(&host_context()), ResultCode::Ok);
    assert_eq!(instrument.parameter_count(), 3);
    assert!(instrument.parameter_info(BYPASS).is_none());
}

#[test]
fn test_bypassed_effect_passes_input_through() {
    let (mut c, _host) = active_component();
    let mut changes = ParameterChanges::new();
    let mut queue = ParameterQueue::new(BYPASS);
    queue.add_point(0, 1.0);
    changes.add_queue(queue);

    let out = run_block(
        &mut c,
        BlockIo {
            input: 0.5,
            changes: Some(&changes),
            ..Default::default()
        },
    );
    assert_eq!(out.code, ResultCode::Ok);
    assert_eq!(out.samples, vec![0.5; TEST_BLOCK_SIZE]);

    // Stays bypassed until the host switches it off.
    assert_eq!(run_empty_block(&mut c).samples, vec![1.0; TEST_BLOCK_SIZE]);
    c.processor().registry().set_normalized(BYPASS, 0.0).unwrap();
    for sample in run_empty_block(&mut c).samples {
        assert_abs_diff_eq!(sample, 0.5, epsilon = GAIN_EPSILON);
    }
}

#[test]
fn test_invalid_config_fails_initialize() {
    let host = RecordingHost::new();
    let mut c = PluginComponent::new(
        TestPlugin::default(),
        test_config().queue_capacity(0),
        host,
    );
    assert_eq!(c.initialize(&host_context()), ResultCode::InvalidArgument);
    assert_eq!(c.processor().state(), ProcessorState::Uninitialized);
}
