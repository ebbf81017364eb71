//! Builder and configuration-file tests

use std::io::Write;

use tandem::prelude::*;
use tandem::AnalysisWindow;

#[test]
fn test_builder_reads_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "original_tempo_bpm = 96.0\nstart_lookahead_sec = 0.08\nanalysis_window = \"small\""
    )
    .unwrap();

    let controller = Controller::builder(HeadlessEngine::new())
        .config_file(file.path())
        .unwrap()
        .build()
        .unwrap();

    let config = controller.config();
    assert_eq!(config.original_tempo_bpm, 96.0);
    assert_eq!(config.start_lookahead_sec, 0.08);
    assert_eq!(config.analysis_window, AnalysisWindow::Small);
    assert_eq!(config.max_voices, TandemConfig::default().max_voices);
    assert_eq!(controller.tempo_bpm(), 96.0);
}

#[test]
fn test_builder_rejects_invalid_config() {
    let config = TandemConfig {
        poll_interval_ms: 0,
        ..TandemConfig::default()
    };

    let result = Controller::builder(HeadlessEngine::new())
        .config(config)
        .build();

    assert!(matches!(
        result,
        Err(Error::Core(tandem::core::Error::InvalidConfig(_)))
    ));
}

#[test]
fn test_missing_config_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = Controller::builder(HeadlessEngine::new()).config_file(dir.path().join("absent.toml"));
    assert!(result.is_err());
}

#[test]
fn test_visual_callback_called_on_registration() {
    let controller = Controller::builder(HeadlessEngine::new()).build().unwrap();
    controller.seek(4.5);

    let calls = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
    let sink = calls.clone();
    controller.register_visual_callback(move |time| sink.borrow_mut().push(time));
    assert_eq!(*calls.borrow(), vec![4.5]);

    controller.clear_visual_callback();
    controller.seek(1.0);
    assert_eq!(*calls.borrow(), vec![4.5]);
}
