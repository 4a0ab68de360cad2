mod common;

use common::*;
use gemini_file_chat::{FileHandle, FileState, FilesError, ProcessingTimeout};
use serde_json::json;
use std::time::Duration;
use wiremock::MockServer;

const POLL: Duration = Duration::from_millis(10);

async fn uploaded(server: &MockServer, file_id: &str) -> FileHandle {
    upload_start(server, file_id).mount(server).await;
    upload_finalize(file_id, "PROCESSING").mount(server).await;

    gemini_for(server)
        .create_file(vec![0u8; 64])
        .display_name("clip.mp4")
        .upload()
        .await
        .unwrap()
}

#[tokio::test]
async fn waits_until_active() {
    let server = MockServer::start().await;
    let mut handle = uploaded(&server, "vid1").await;

    file_status("vid1", processing("vid1"))
        .up_to_n_times(2)
        .with_priority(1)
        .expect(2)
        .mount(&server)
        .await;
    file_status("vid1", active("vid1"))
        .expect(1)
        .mount(&server)
        .await;

    handle
        .wait_until_active(ProcessingTimeout::from_secs(10).unwrap(), POLL)
        .await
        .unwrap();

    assert_eq!(handle.state(), FileState::Active);
}

#[tokio::test]
async fn failed_state_stops_polling_immediately() {
    let server = MockServer::start().await;
    let mut handle = uploaded(&server, "vid2").await;

    file_status(
        "vid2",
        json!({
            "name": "files/vid2",
            "state": "FAILED",
            "error": { "code": 3, "message": "unsupported codec" }
        }),
    )
    .expect(1)
    .mount(&server)
    .await;

    let error = handle
        .wait_until_active(ProcessingTimeout::from_secs(30).unwrap(), POLL)
        .await
        .unwrap_err();

    match error {
        FilesError::ProcessingFailed { name, message } => {
            assert_eq!(name, "vid2");
            assert_eq!(message, "unsupported codec");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn failed_state_without_message() {
    let server = MockServer::start().await;
    let mut handle = uploaded(&server, "vid3").await;

    file_status("vid3", json!({ "state": "FAILED" }))
        .mount(&server)
        .await;

    let error = handle
        .wait_until_active(ProcessingTimeout::default(), POLL)
        .await
        .unwrap_err();

    assert!(
        matches!(
            &error,
            FilesError::ProcessingFailed { message, .. } if message == "unknown error"
        ),
        "got {error:?}"
    );
}

#[tokio::test]
async fn polling_is_bounded_by_the_timeout() {
    let server = MockServer::start().await;
    let mut handle = uploaded(&server, "vid4").await;

    file_status("vid4", processing("vid4"))
        .expect(5)
        .mount(&server)
        .await;

    let error = handle
        .wait_until_active(ProcessingTimeout::from_secs(5).unwrap(), POLL)
        .await
        .unwrap_err();

    match error {
        FilesError::ProcessingTimeout {
            name,
            last_state,
            attempts,
        } => {
            assert_eq!(name, "vid4");
            assert_eq!(last_state, FileState::Processing);
            assert_eq!(attempts, 5);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn unknown_states_keep_polling() {
    let server = MockServer::start().await;
    let mut handle = uploaded(&server, "vid5").await;

    file_status("vid5", json!({ "state": "TRANSCODING" }))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    file_status("vid5", active("vid5")).mount(&server).await;

    handle
        .wait_until_active(ProcessingTimeout::from_secs(5).unwrap(), POLL)
        .await
        .unwrap();
}

#[test]
fn timeout_outside_bounds_is_rejected() {
    let error = ProcessingTimeout::from_secs(3).unwrap_err();
    assert!(matches!(error, FilesError::InvalidTimeout { secs: 3 }));
}
