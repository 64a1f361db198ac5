mod common;

use common::{hd_clip, Behaviour, Rig, ScriptedLauncher, StubLibrary};
use synoid_forge::engine::EngineKind;
use synoid_forge::error::ForgeError;
use synoid_forge::forge::request::{ConvertParams, Quality, Speed};
use synoid_forge::forge::{Completed, Destination, Dispatcher, ForgeWorker, Operation, Progress, TransformRequest};

fn convert() -> Operation {
    Operation::Convert(ConvertParams { quality: Quality::Medium, speed: Speed::Fast, gif: None })
}

#[tokio::test]
async fn missing_input_fails_before_any_engine() {
    let rig = Rig::new(ScriptedLauncher::new(hd_clip()), StubLibrary::new(hd_clip()));
    let dispatcher = Dispatcher::new(rig.ctx.clone());
    let request = TransformRequest::single(rig.work.path().join("ghost.mp4"), rig.out("x.mp4"), convert());

    let err = dispatcher.dispatch(&request, &Progress::silent()).await.unwrap_err();
    assert!(matches!(err, ForgeError::Configuration(_)));
    assert!(rig.launcher.calls().is_empty());
}

#[tokio::test]
async fn batch_convert_collects_failures() {
    let launcher = ScriptedLauncher::new(hd_clip()).then(EngineKind::Ffmpeg, Behaviour::Crash);
    let rig = Rig::new(launcher, StubLibrary::new(hd_clip()));
    let a = rig.input("a.mov");
    let b = rig.input("b_converted.mov");
    let out_dir = rig.work.path().join("batch");

    let request = TransformRequest {
        inputs: vec![a.clone(), b],
        destination: Destination::Directory { dir: out_dir.clone(), extension: "mp4".into() },
        operation: convert(),
    };
    let done = Dispatcher::new(rig.ctx.clone())
        .dispatch(&request, &Progress::silent())
        .await
        .unwrap();

    let Completed::Batch(report) = done else { panic!("expected a batch report") };
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].input, a);
    assert_eq!(report.succeeded, vec![out_dir.join("b_conv.mp4")]);
    assert!(out_dir.join("b_conv.mp4").exists());
}

#[tokio::test]
async fn worker_refuses_reentrant_submit() {
    let rig = Rig::new(ScriptedLauncher::new(hd_clip()), StubLibrary::new(hd_clip()));
    let input = rig.input("clip.mp4");
    let worker = ForgeWorker::new(Dispatcher::new(rig.ctx.clone()));

    let trim = |name: &str| {
        TransformRequest::single(&input, rig.out(name), Operation::Trim { start: 0.0, end: 1.0 })
    };

    let first = worker.submit(trim("one.mp4")).await.unwrap();
    assert!(worker.job_status(first.id).await.is_some(), "submitted job must be recorded");
    assert!(worker.is_busy());
    assert!(matches!(worker.submit(trim("two.mp4")).await, Err(ForgeError::Busy)));

    let id = first.id;
    let mut updates = 0;
    let done = first.wait_with(|_| updates += 1).await.unwrap();
    assert!(matches!(done, Completed::Single(ref p) if p.ends_with("one.mp4")));
    assert!(updates > 0);
    assert!(!worker.is_busy());
    assert!(matches!(
        worker.job_status(id).await,
        Some(synoid_forge::forge::worker::JobStatus::Completed { .. })
    ));

    let second = worker.submit(trim("two.mp4")).await.unwrap();
    assert!(second.wait_with(|_| {}).await.is_ok());
}

#[tokio::test]
async fn worker_reports_failures_through_the_handle() {
    let launcher = ScriptedLauncher::new(hd_clip()).then(EngineKind::Ffmpeg, Behaviour::Crash);
    let rig = Rig::new(launcher, StubLibrary::failing());
    let input = rig.input("clip.mp4");
    let worker = ForgeWorker::new(Dispatcher::new(rig.ctx.clone()));

    let handle = worker
        .submit(TransformRequest::single(&input, rig.out("x.mp4"), Operation::Trim { start: 0.0, end: 1.0 }))
        .await
        .unwrap();
    let err = handle.wait_with(|_| {}).await.unwrap_err();
    assert!(matches!(err, ForgeError::EngineExecution { .. }));
    assert!(!worker.is_busy());
}
