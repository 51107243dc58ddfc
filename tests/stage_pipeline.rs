use num_complex::Complex64;

use tracemath::{
    channel_source, DomainMode, EventFilter, EventKind, ExpressionStage, MathPipeline,
    PipelineRoot, Sample, StageConfig, StageStatus, VarRefEvaluator,
};

struct SpeedOfLightHalf;

impl PipelineRoot for SpeedOfLightHalf {
    fn time_to_distance(&self, t: f64) -> f64 {
        // One-way distance at half the propagation speed, as a pipeline
        // root typically provides for time-domain traces.
        t * 1.5e8
    }
}

fn samples(n: usize) -> Vec<Sample> {
    (0..n)
        .map(|i| Sample::new(i as f64, Complex64::from_polar(0.3, 0.2 * i as f64)))
        .collect()
}

fn pipeline() -> (tracemath::SourceSink, MathPipeline<VarRefEvaluator>) {
    let (sink, rx) = channel_source();
    let stage = ExpressionStage::new(VarRefEvaluator::default(), StageConfig::default());
    (sink, MathPipeline::new(stage, rx))
}

#[test]
fn data_then_expression_produces_full_output() {
    let (sink, mut pipe) = pipeline();
    sink.set_data(samples(4)).unwrap();

    // Data arrives before any expression is set: the recompute is skipped
    // and the failure recovered; the pipeline keeps running.
    assert_eq!(pipe.poll(&SpeedOfLightHalf), 1);
    assert!(!pipe.stage().status().is_ok());
    assert!(pipe.stage().output().is_empty());

    pipe.set_expression("x", &SpeedOfLightHalf);
    assert!(pipe.stage().status().is_ok());
    assert_eq!(pipe.stage().output().len(), 4);
    for (out, inp) in pipe.stage().output().iter().zip(samples(4)) {
        assert_eq!(out.x, inp.x);
        assert_eq!(out.y, inp.y);
    }
}

#[test]
fn partial_update_recomputes_only_the_notified_range() {
    let (sink, mut pipe) = pipeline();
    sink.set_data(samples(6)).unwrap();
    pipe.poll(&SpeedOfLightHalf);
    pipe.set_expression("x", &SpeedOfLightHalf);

    let rx = pipe
        .stage()
        .events()
        .subscribe(EventFilter::only(EventKind::OUTPUT_RANGE_CHANGED));

    sink.update_range(2, vec![Sample::new(2.0, Complex64::new(0.9, 0.1))])
        .unwrap();
    pipe.poll(&SpeedOfLightHalf);

    let evt = rx.try_recv().unwrap();
    let range = evt.range.unwrap();
    assert_eq!((range.begin, range.end), (2, 3));
    assert_eq!(pipe.stage().output()[2].y, Complex64::new(0.9, 0.1));
}

#[test]
fn expression_change_recomputes_the_whole_input() {
    let (sink, mut pipe) = pipeline();
    sink.set_data(samples(5)).unwrap();
    pipe.poll(&SpeedOfLightHalf);
    pipe.set_expression("x", &SpeedOfLightHalf);

    let rx = pipe
        .stage()
        .events()
        .subscribe(EventFilter::only(EventKind::OUTPUT_RANGE_CHANGED));

    pipe.set_expression("z", &SpeedOfLightHalf);
    let evt = rx.try_recv().unwrap();
    let range = evt.range.unwrap();
    assert_eq!((range.begin, range.end), (0, 5));
}

#[test]
fn mode_controls_which_variables_evaluate() {
    let (sink, mut pipe) = pipeline();
    sink.set_data(samples(3)).unwrap();
    pipe.poll(&SpeedOfLightHalf);
    pipe.set_expression("f", &SpeedOfLightHalf);
    assert!(pipe.stage().status().is_ok(), "default mode is frequency");

    pipe.set_mode(DomainMode::Time, &SpeedOfLightHalf);
    assert!(
        !pipe.stage().status().is_ok(),
        "f is unbound in the time domain"
    );

    pipe.set_mode(DomainMode::Frequency, &SpeedOfLightHalf);
    assert!(pipe.stage().status().is_ok());
    assert_eq!(pipe.stage().output()[2].y, Complex64::new(2.0, 0.0));
}

#[test]
fn time_domain_distance_comes_from_the_root() {
    let (sink, mut pipe) = pipeline();
    sink.set_data(samples(2)).unwrap();
    pipe.poll(&SpeedOfLightHalf);
    pipe.set_mode(DomainMode::Time, &SpeedOfLightHalf);
    pipe.set_expression("d", &SpeedOfLightHalf);

    assert!(pipe.stage().status().is_ok());
    assert_eq!(pipe.stage().output()[1].y, Complex64::new(1.5e8, 0.0));
}

#[test]
fn empty_expression_is_recovered_and_pipeline_continues() {
    let (sink, mut pipe) = pipeline();
    sink.set_data(samples(3)).unwrap();
    pipe.poll(&SpeedOfLightHalf);

    let rx = pipe
        .stage()
        .events()
        .subscribe(EventFilter::only(EventKind::ERROR));

    pipe.set_expression("", &SpeedOfLightHalf);
    assert_eq!(
        pipe.stage().status(),
        &StageStatus::Error("empty expression".to_string())
    );
    assert!(pipe.stage().output().is_empty());
    assert!(rx.try_recv().is_ok());

    // A later valid edit brings the stage back.
    pipe.set_expression("x", &SpeedOfLightHalf);
    assert!(pipe.stage().status().is_ok());
    assert_eq!(pipe.stage().output().len(), 3);
}

#[test]
fn clear_empties_the_output() {
    let (sink, mut pipe) = pipeline();
    sink.set_data(samples(3)).unwrap();
    pipe.poll(&SpeedOfLightHalf);
    pipe.set_expression("x", &SpeedOfLightHalf);
    assert_eq!(pipe.stage().output().len(), 3);

    sink.clear().unwrap();
    pipe.poll(&SpeedOfLightHalf);
    assert!(pipe.input().is_empty());
    assert!(pipe.stage().output().is_empty());
}
