use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use sketch_core::model::{
    MemoryType, SessionConfig, SessionMode, Step, StepId, TimerSettingsDraft,
};
use sketch_core::time::fixed_now;
use services::{
    AppServices, Clock, HistoryError, ImageSet, PlanService, PlanServiceError, SessionError,
    SessionEvent,
};
use storage::repository::{KeyValueStore, Storage, StorageError};

fn warmup() -> Vec<Step> {
    vec![
        Step::pose(StepId::new(1), 2, 3).unwrap(),
        Step::pause(StepId::new(2), 2).unwrap(),
        Step::pose(StepId::new(3), 1, 4).unwrap(),
    ]
}

async fn services() -> AppServices {
    let app = AppServices::in_memory(Clock::fixed(fixed_now()));
    app.settings()
        .update(TimerSettingsDraft {
            shuffle_images: Some(false),
            ..TimerSettingsDraft::default()
        })
        .await
        .unwrap();
    app
}

#[tokio::test]
async fn plan_session_is_recorded_and_replayable() {
    let app = services().await;
    app.plans().save_plan("Warmup", warmup()).await.unwrap();

    let loop_svc = app.session_loop();
    let mut runner = loop_svc
        .start_from_plan("Warmup", ImageSet::new(4))
        .await
        .unwrap();

    let mut events = Vec::new();
    while !runner.is_complete() {
        events.extend(runner.tick());
    }
    assert_eq!(runner.elapsed_secs(), 3 * 2 + 2 + 4);
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, SessionEvent::ImageChanged { .. }))
            .count(),
        2
    );
    assert!(events.contains(&SessionEvent::PauseStarted { seconds: 2 }));

    let record = loop_svc.complete(runner).await.unwrap();
    assert_eq!(record.poses, 3);
    assert_eq!(record.time, 12);

    let history = app.history().list().await.unwrap();
    assert_eq!(history.len(), 1);

    let replay = loop_svc.start_replay(0, ImageSet::new(4)).await.unwrap();
    assert_eq!(replay.state().session_mode, SessionMode::Custom);
    assert_eq!(replay.state().custom_queue, warmup());
    assert_eq!(replay.remaining_seconds(), Some(12));
}

#[tokio::test]
async fn memory_replay_keeps_memory_type() {
    let app = services().await;
    let loop_svc = app.session_loop();
    let mut runner = loop_svc
        .start(SessionConfig {
            session_mode: SessionMode::Memory,
            memory_type: MemoryType::Progressive,
            selected_duration: 2,
            images_len: 3,
            memory_poses_count: 2,
            ..SessionConfig::default()
        })
        .await
        .unwrap();
    while !runner.is_complete() {
        runner.tick();
    }
    let record = loop_svc.complete(runner).await.unwrap();
    assert_eq!(record.memory_type.as_deref(), Some("progressive"));

    let options = app.history().replay_options(0).await.unwrap();
    assert_eq!(options.mode, SessionMode::Memory);
    assert_eq!(options.memory_type, Some(MemoryType::Progressive));
    assert_eq!(options.duration, Some(2));
}

#[tokio::test]
async fn flash_override_applies_to_every_image() {
    let app = services().await;
    assert_eq!(app.settings().load().await.unwrap().memory_flash_duration(), 10);

    let mut runner = app
        .session_loop()
        .start(SessionConfig {
            session_mode: SessionMode::Memory,
            memory_type: MemoryType::Flash,
            selected_duration: 5,
            images_len: 4,
            memory_poses_count: 3,
            memory_flash_duration: Some(4),
            ..SessionConfig::default()
        })
        .await
        .unwrap();
    assert_eq!(runner.state().time_remaining, 4);
    assert_eq!(runner.remaining_seconds(), Some(3 * (5 + 6)));

    assert_eq!(runner.next().unwrap(), vec![SessionEvent::ImageHidden]);
    assert_eq!(
        runner.next().unwrap(),
        vec![SessionEvent::ImageChanged { image: 1 }]
    );
    assert_eq!(runner.state().time_remaining, 4);
    assert_eq!(runner.remaining_seconds(), Some(2 * (5 + 6)));
}

#[tokio::test]
async fn empty_or_missing_sources_do_not_start() {
    let app = services().await;
    let loop_svc = app.session_loop();

    let err = loop_svc
        .start(SessionConfig {
            session_mode: SessionMode::Custom,
            ..SessionConfig::default()
        })
        .await
        .err()
        .unwrap();
    assert!(matches!(err, SessionError::Start(_)));

    let err = loop_svc
        .start_from_plan("Nope", ImageSet::new(1))
        .await
        .err()
        .unwrap();
    assert!(matches!(
        err,
        SessionError::Plan(PlanServiceError::NotFound { .. })
    ));

    let err = loop_svc
        .start_replay(3, ImageSet::new(1))
        .await
        .err()
        .unwrap();
    assert!(matches!(
        err,
        SessionError::History(HistoryError::NotFound { index: 3 })
    ));
}

#[tokio::test]
async fn untouched_session_is_not_recorded() {
    let app = services().await;
    let loop_svc = app.session_loop();
    let runner = loop_svc.start(SessionConfig::default()).await.unwrap();
    loop_svc.complete(runner).await.unwrap();
    assert!(app.history().list().await.unwrap().is_empty());
}

struct BrokenStore;

#[async_trait]
impl KeyValueStore for BrokenStore {
    async fn get(&self, _key: &str) -> Result<Option<Value>, StorageError> {
        Err(StorageError::Connection("offline".into()))
    }

    async fn set(&self, _key: &str, _value: &Value) -> Result<(), StorageError> {
        Err(StorageError::Connection("offline".into()))
    }

    async fn remove(&self, _key: &str) -> Result<bool, StorageError> {
        Err(StorageError::Connection("offline".into()))
    }
}

#[tokio::test]
async fn storage_failures_surface_as_errors() {
    let storage = Storage {
        kv: Arc::new(BrokenStore),
    };
    let plans = PlanService::new(Clock::fixed(fixed_now()), Arc::clone(&storage.kv));
    assert!(matches!(
        plans.load_plans().await,
        Err(PlanServiceError::Storage(StorageError::Connection(_)))
    ));

    let app = AppServices::from_storage(&storage, Clock::fixed(fixed_now()));
    let err = app
        .session_loop()
        .start(SessionConfig::default())
        .await
        .err()
        .unwrap();
    assert!(matches!(err, SessionError::Settings(_)));
}
