// SPDX-FileCopyrightText: 2026 Sluice Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests loading and running whole pipelines.
//!
//! Each test builds its own pipeline from the mock registry, so tests are
//! independent and order-insensitive.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use serial_test::serial;
use sluice_config::GlobalConfig;
use sluice_core::{PluginCategory, PluginHelper, SluiceError};
use sluice_pipeline::{CategoryConfig, Pipeline, RunnerHandle};
use sluice_test_utils::{Recorder, mock_registry};

const WAIT: Duration = Duration::from_secs(5);

fn pipeline(recorder: &Recorder) -> Arc<Pipeline> {
    pipeline_with(recorder, GlobalConfig::default())
}

fn pipeline_with(recorder: &Recorder, globals: GlobalConfig) -> Arc<Pipeline> {
    Pipeline::new(Arc::new(mock_registry(recorder)), globals)
}

fn maker_names(pipeline: &Pipeline, category: PluginCategory) -> Vec<String> {
    pipeline
        .makers(category)
        .iter()
        .map(|maker| maker.name().to_string())
        .collect()
}

// ---- Defaults ----

#[test]
fn empty_config_still_registers_default_codecs() {
    let pipeline = pipeline(&Recorder::new());
    pipeline.load_from_str("").unwrap();

    assert_eq!(maker_names(&pipeline, PluginCategory::Decoder), vec!["NativeDecoder"]);
    assert_eq!(maker_names(&pipeline, PluginCategory::Encoder), vec!["NativeEncoder"]);
    assert!(pipeline.log_messages().is_empty());
}

#[test]
fn declared_default_codec_is_not_duplicated() {
    let pipeline = pipeline(&Recorder::new());
    pipeline
        .load_from_str("[sluiced]\npool_size = 10\n\n[NativeDecoder]\n")
        .unwrap();

    assert_eq!(maker_names(&pipeline, PluginCategory::Decoder), vec!["NativeDecoder"]);
    assert_eq!(maker_names(&pipeline, PluginCategory::Encoder), vec!["NativeEncoder"]);
}

// ---- Multi-decoder ordering ----

#[test]
fn sub_multi_decoder_loads_before_its_parent() {
    let pipeline = pipeline(&Recorder::new());
    pipeline
        .load_from_str(
            r#"
            [A]
            type = "MultiDecoder"
            subs = ["B"]

            [UppercaseDecoder]

            [B]
            type = "MultiDecoder"
            subs = ["UppercaseDecoder"]
            "#,
        )
        .unwrap();

    assert_eq!(
        pipeline.decoder_order(),
        vec!["UppercaseDecoder", "NativeDecoder", "B", "A"]
    );
    assert!(pipeline.decoder("A").is_some());
}

#[test]
fn multi_decoder_cycle_aborts_load() {
    let pipeline = pipeline(&Recorder::new());
    let err = pipeline
        .load_from_str(
            r#"
            [A]
            type = "MultiDecoder"
            subs = ["B"]

            [B]
            type = "MultiDecoder"
            subs = ["A"]
            "#,
        )
        .unwrap_err();

    assert!(matches!(err, SluiceError::CyclicDependency { .. }));
    assert!(pipeline.decoder_order().is_empty());
}

// ---- Error accumulation ----

#[test]
fn unknown_key_is_counted_once() {
    let pipeline = pipeline(&Recorder::new());
    let err = pipeline
        .load_from_str(
            r#"
            [strict]
            type = "StrictFilter"
            bogus = 1
            "#,
        )
        .unwrap_err();

    assert!(matches!(err, SluiceError::LoadFailed { count: 1 }));
    assert_eq!(err.to_string(), "1 errors loading plugins");
    let log = pipeline.log_messages();
    assert_eq!(log, vec!["unknown config setting for 'strict': bogus"]);
    // the maker is registered even though preparation failed
    assert!(pipeline.maker(PluginCategory::Filter, "strict").is_some());
    assert!(pipeline.filter_runner("strict").is_none());
}

#[test]
fn failing_sections_do_not_stop_the_rest() {
    let pipeline = pipeline(&Recorder::new());
    let err = pipeline
        .load_from_str(
            r#"
            [mystery]
            type = "MysteryInput"

            [broken]
            type = "FailingOutput"
            message_matcher = "TRUE"

            [sink]
            type = "RecordingOutput"
            message_matcher = "TRUE"
            "#,
        )
        .unwrap_err();

    assert!(matches!(err, SluiceError::LoadFailed { count: 2 }));
    let log = pipeline.log_messages();
    assert!(log.contains(&"no registered plugin type: MysteryInput".to_string()));
    assert!(log.iter().any(|line| line.starts_with("Error making runner for broken:")));
    assert!(pipeline.output_runner("sink").is_some());
}

#[test]
fn syntax_errors_abort_load() {
    let pipeline = pipeline(&Recorder::new());
    let err = pipeline.load_from_str("[sink\ntype = 1").unwrap_err();
    assert!(matches!(err, SluiceError::ConfigParse(_)));
}

#[test]
fn unterminated_env_reference_aborts_load() {
    let pipeline = pipeline(&Recorder::new());
    let err = pipeline
        .load_from_str("[sink]\nmessage_matcher = \"%ENV[MATCHER\"")
        .unwrap_err();
    assert!(matches!(err, SluiceError::MissingDelimiter));
}

// ---- Config files ----

#[test]
#[serial]
fn file_references_are_substituted() {
    // SAFETY: serialized with every other env-mutating test.
    unsafe { std::env::set_var("SLUICE_PIPELINE_TEST_MATCHER", "Type == 'count'") };

    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        "[sink]\ntype = \"RecordingOutput\"\nmessage_matcher = \"%ENV[SLUICE_PIPELINE_TEST_MATCHER]\"\n"
    )
    .unwrap();

    let pipeline = pipeline(&Recorder::new());
    pipeline.load_from_file(file.path()).unwrap();
    let sink = pipeline.output_runner("sink").unwrap();
    assert_eq!(sink.config().message_matcher, "Type == 'count'");

    unsafe { std::env::remove_var("SLUICE_PIPELINE_TEST_MATCHER") };
}

#[test]
fn missing_file_is_an_io_error() {
    let pipeline = pipeline(&Recorder::new());
    let err = pipeline
        .load_from_file(std::path::Path::new("/nonexistent/sluice.toml"))
        .unwrap_err();
    assert!(matches!(err, SluiceError::Io(_)));
}

// ---- Plugin defaults ----

#[test]
fn plugin_defaults_reach_the_runner() {
    let pipeline = pipeline(&Recorder::new());
    pipeline
        .load_from_str("[strict]\ntype = \"StrictFilter\"\nthreshold = 2\n")
        .unwrap();

    let runner = pipeline.filter_runner("strict").unwrap();
    assert_eq!(runner.config().message_matcher, "Type == 'metric'");
    assert_eq!(runner.config().ticker_interval, 5);
    assert_eq!(runner.config().can_exit, Some(true));

    let maker = pipeline.maker(PluginCategory::Filter, "strict").unwrap();
    assert!(matches!(maker.category_config().unwrap(), CategoryConfig::Fo(_)));
}

// ---- Running pipelines ----

#[tokio::test]
async fn messages_flow_through_decoder_to_output() {
    let recorder = Recorder::new();
    let pipeline = pipeline(&recorder);
    pipeline
        .load_from_str(
            r#"
            [UppercaseDecoder]

            [counter]
            type = "CountingInput"
            count = 3
            decoder = "UppercaseDecoder"

            [sink]
            type = "RecordingOutput"
            message_matcher = "Type == 'count'"
            encoder = "NativeEncoder"
            "#,
        )
        .unwrap();
    pipeline.start().unwrap();

    assert!(recorder.wait_for(3, WAIT).await);
    let mut payloads: Vec<String> = recorder
        .messages()
        .await
        .into_iter()
        .map(|message| message.payload)
        .collect();
    payloads.sort();
    assert_eq!(payloads, vec!["COUNT-0", "COUNT-1", "COUNT-2"]);

    let messages = recorder.messages().await;
    let first = &messages[0];
    assert_eq!(first.hostname, pipeline.globals().hostname);
    assert!(first.field("encoded_len").is_some());
    assert_eq!(pipeline.decoder_runner_count(), 1);
    assert_eq!(pipeline.encoder_names(), vec!["sink-NativeEncoder"]);

    pipeline.shutdown().await;
    assert!(pipeline.is_shutting_down());
    assert_eq!(pipeline.decoder_runner_count(), 0);
}

#[tokio::test]
async fn synchronous_decode_skips_decoder_runner() {
    let recorder = Recorder::new();
    let pipeline = pipeline(&recorder);
    pipeline
        .load_from_str(
            r#"
            [UppercaseDecoder]

            [counter]
            type = "CountingInput"
            count = 2
            decoder = "UppercaseDecoder"
            synchronous_decode = true

            [tap]
            type = "RecordingFilter"
            message_matcher = "TRUE"
            "#,
        )
        .unwrap();
    pipeline.start().unwrap();

    assert!(recorder.wait_for(2, WAIT).await);
    assert!(recorder.messages().await.iter().all(|m| m.payload.starts_with("COUNT-")));
    assert_eq!(pipeline.decoder_runner_count(), 0);
    pipeline.shutdown().await;
}

#[tokio::test]
async fn output_with_missing_encoder_fails_to_start() {
    let pipeline = pipeline(&Recorder::new());
    pipeline
        .load_from_str("[sink]\ntype = \"RecordingOutput\"\nmessage_matcher = \"TRUE\"\nencoder = \"GhostEncoder\"\n")
        .unwrap();

    let err = pipeline.start().unwrap_err();
    assert!(matches!(err, SluiceError::RunnerStartFailed { .. }));
    assert!(pipeline.output_runner("sink").is_none());
    assert_eq!(pipeline.router().output_count(), 0);
    pipeline.shutdown().await;
}

// ---- Dynamic runners ----

const FILTER_CONFIG: &str = r#"
[tap]
type = "RecordingFilter"
message_matcher = "TRUE"
"#;

#[tokio::test]
async fn remove_filter_is_refused_while_shutting_down() {
    let pipeline = pipeline(&Recorder::new());
    pipeline.load_from_str(FILTER_CONFIG).unwrap();
    pipeline.start().unwrap();

    pipeline.context().shutdown.cancel();
    assert!(pipeline.is_shutting_down());
    assert!(!pipeline.remove_filter_runner("tap"));
    assert!(pipeline.filter_runner("tap").is_some());
    assert!(pipeline.filter("tap").is_some());

    pipeline.shutdown().await;
}

#[tokio::test]
async fn filters_can_be_added_and_removed() {
    let recorder = Recorder::new();
    let pipeline = pipeline(&recorder);
    pipeline.load_from_str(FILTER_CONFIG).unwrap();
    pipeline.start().unwrap();
    assert_eq!(pipeline.router().filter_count(), 1);

    let maker = pipeline.maker(PluginCategory::Filter, "tap").unwrap();
    let RunnerHandle::Filter(extra) = maker.make_runner(Some("tap-2"), pipeline.context()).unwrap()
    else {
        panic!("expected a filter runner");
    };
    pipeline.add_filter_runner(extra).unwrap();
    assert_eq!(pipeline.router().filter_count(), 2);
    assert!(pipeline.filter("tap-2").is_some());

    assert!(pipeline.remove_filter_runner("tap"));
    assert!(!pipeline.remove_filter_runner("tap"));
    assert_eq!(pipeline.router().filter_count(), 1);
    assert!(pipeline.filter("tap").is_none());

    pipeline.shutdown().await;
}

#[tokio::test]
async fn duplicate_filter_name_is_refused() {
    let pipeline = pipeline(&Recorder::new());
    pipeline.load_from_str(FILTER_CONFIG).unwrap();
    pipeline.start().unwrap();

    let maker = pipeline.maker(PluginCategory::Filter, "tap").unwrap();
    let RunnerHandle::Filter(twin) = maker.make_runner(None, pipeline.context()).unwrap() else {
        panic!("expected a filter runner");
    };
    let err = pipeline.add_filter_runner(twin).unwrap_err();
    assert!(matches!(
        err,
        SluiceError::DuplicateRunner { category: PluginCategory::Filter, ref name } if name == "tap"
    ));
    assert_eq!(pipeline.router().filter_count(), 1);

    // the original is still the one that gets removed, leaving nothing behind
    assert!(pipeline.remove_filter_runner("tap"));
    assert_eq!(pipeline.router().filter_count(), 0);
    assert!(pipeline.filter_runner("tap").is_none());

    pipeline.shutdown().await;
}

#[tokio::test]
async fn starting_twice_keeps_running_runners() {
    let pipeline = pipeline(&Recorder::new());
    pipeline
        .load_from_str(
            "[tap]\ntype = \"RecordingFilter\"\nmessage_matcher = \"TRUE\"\n\n[sink]\ntype = \"RecordingOutput\"\nmessage_matcher = \"TRUE\"\n",
        )
        .unwrap();
    pipeline.start().unwrap();
    pipeline.start().unwrap();

    assert_eq!(pipeline.filter_names(), vec!["tap"]);
    assert_eq!(pipeline.output_names(), vec!["sink"]);
    assert_eq!(pipeline.router().filter_count(), 1);
    assert_eq!(pipeline.router().output_count(), 1);
    assert!(pipeline.log_messages().is_empty());

    pipeline.shutdown().await;
}

#[tokio::test]
async fn removing_an_input_stops_its_decoder() {
    let pipeline = pipeline(&Recorder::new());
    pipeline
        .load_from_str(
            "[UppercaseDecoder]\n\n[counter]\ntype = \"CountingInput\"\ndecoder = \"UppercaseDecoder\"\n",
        )
        .unwrap();
    pipeline.start().unwrap();
    assert_eq!(pipeline.decoder_runner_count(), 1);

    let input = pipeline.input("counter").unwrap();
    assert!(pipeline.remove_input_runner(&input));
    assert!(input.is_stopped());
    assert!(pipeline.input("counter").is_none());
    assert!(pipeline.maker(PluginCategory::Input, "counter").is_none());
    assert_eq!(pipeline.decoder_runner_count(), 0);

    pipeline.shutdown().await;
}

#[tokio::test]
async fn removing_an_output_detaches_it() {
    let pipeline = pipeline(&Recorder::new());
    pipeline
        .load_from_str("[sink]\ntype = \"RecordingOutput\"\nmessage_matcher = \"TRUE\"\n")
        .unwrap();
    pipeline.start().unwrap();
    assert_eq!(pipeline.router().output_count(), 1);

    let sink = pipeline.output_runner("sink").unwrap();
    assert!(pipeline.remove_output_runner(&sink));
    assert_eq!(pipeline.router().output_count(), 0);
    assert!(pipeline.output("sink").is_none());
    assert!(pipeline.maker(PluginCategory::Output, "sink").is_none());

    pipeline.shutdown().await;
}

#[tokio::test]
async fn inputs_can_be_added_at_runtime() {
    let recorder = Recorder::new();
    let pipeline = pipeline(&recorder);
    pipeline
        .load_from_str(
            "[counter]\ntype = \"CountingInput\"\ncount = 1\n\n[tap]\ntype = \"RecordingFilter\"\nmessage_matcher = \"TRUE\"\n",
        )
        .unwrap();
    pipeline.start().unwrap();
    assert!(recorder.wait_for(1, WAIT).await);

    let maker = pipeline.maker(PluginCategory::Input, "counter").unwrap();
    let RunnerHandle::Input(extra) = maker.make_runner(Some("counter-2"), pipeline.context()).unwrap()
    else {
        panic!("expected an input runner");
    };
    pipeline.add_input_runner(extra).unwrap();
    assert!(recorder.wait_for(2, WAIT).await);
    assert_eq!(pipeline.input_names(), vec!["counter", "counter-2"]);

    pipeline.shutdown().await;
}

// ---- Envelopes ----

#[tokio::test]
async fn reinjection_depth_is_bounded() {
    let globals = GlobalConfig {
        max_msg_loops: 2,
        ..GlobalConfig::default()
    };
    let pipeline = pipeline_with(&Recorder::new(), globals);

    let envelope = pipeline.acquire_envelope(1).await.unwrap();
    assert_eq!(envelope.msg_loop_count(), 2);
    assert_eq!(envelope.hostname, pipeline.hostname());
    assert!(pipeline.acquire_envelope(2).await.is_none());
    assert!(pipeline.pipeline_pack(5).await.is_none());
}

#[tokio::test]
async fn shutdown_is_idempotent() {
    let pipeline = pipeline(&Recorder::new());
    pipeline.load_from_str(FILTER_CONFIG).unwrap();
    pipeline.start().unwrap();

    pipeline.shutdown().await;
    pipeline.shutdown().await;
    assert!(pipeline.filter_names().is_empty());
    assert!(pipeline.acquire_envelope(0).await.is_none());
}
