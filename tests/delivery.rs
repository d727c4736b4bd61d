//! Delivery Integration Tests
//!
//! Drives the dispatcher against a recording messenger: oversize re-checks,
//! per-chunk failure isolation, captions, and post-send removal.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use tempfile::TempDir;

use vidrelay::dispatch;
use vidrelay::telegram::Messenger;
use vidrelay::{DeliveryLimits, RelayError};

#[derive(Default)]
struct RecordingMessenger {
    texts: Mutex<Vec<(i64, String)>>,
    videos: Mutex<Vec<(i64, PathBuf, Option<String>)>>,
    /// 0-based send_video call index that should fail
    fail_video_call: Option<usize>,
    video_calls: AtomicUsize,
}

impl RecordingMessenger {
    fn failing_on(call: usize) -> Self {
        Self {
            fail_video_call: Some(call),
            ..Default::default()
        }
    }

    fn texts(&self) -> Vec<String> {
        self.texts
            .lock()
            .unwrap()
            .iter()
            .map(|(_, text)| text.clone())
            .collect()
    }

    fn captions(&self) -> Vec<Option<String>> {
        self.videos
            .lock()
            .unwrap()
            .iter()
            .map(|(_, _, caption)| caption.clone())
            .collect()
    }

    fn sent_files(&self) -> Vec<String> {
        self.videos
            .lock()
            .unwrap()
            .iter()
            .map(|(_, path, _)| path.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<()> {
        self.texts.lock().unwrap().push((chat_id, text.to_string()));
        Ok(())
    }

    async fn send_video(&self, chat_id: i64, video: &Path, caption: Option<&str>) -> Result<()> {
        let call = self.video_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_video_call == Some(call) {
            anyhow::bail!("synthetic send failure");
        }
        self.videos.lock().unwrap().push((
            chat_id,
            video.to_path_buf(),
            caption.map(str::to_string),
        ));
        Ok(())
    }
}

fn write_chunks(dir: &TempDir, sizes: &[usize]) -> Vec<PathBuf> {
    sizes
        .iter()
        .enumerate()
        .map(|(i, size)| {
            let path = dir.path().join(format!("chunk_{}.mp4", i + 1));
            std::fs::write(&path, vec![0u8; *size]).unwrap();
            path
        })
        .collect()
}

#[tokio::test]
async fn test_chunks_delivered_in_order_with_captions() {
    let dir = TempDir::new().unwrap();
    let chunks = write_chunks(&dir, &[1024 * 1024, 1024 * 1024]);
    let messenger = RecordingMessenger::default();

    let report =
        dispatch::deliver_chunks(&messenger, 42, &chunks, &DeliveryLimits::default()).await;

    assert_eq!(report.sent, 2);
    assert_eq!(report.skipped, 0);
    assert_eq!(report.failed, 0);

    assert_eq!(messenger.sent_files(), vec!["chunk_1.mp4", "chunk_2.mp4"]);
    assert_eq!(
        messenger.captions(),
        vec![
            Some("Part 1/2 (1.0MB)".to_string()),
            Some("Part 2/2 (1.0MB)".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_oversized_chunk_skipped_but_rest_delivered() {
    let dir = TempDir::new().unwrap();
    let chunks = write_chunks(&dir, &[5, 20, 5]);
    let limits = DeliveryLimits {
        max_upload_bytes: 10,
        ..Default::default()
    };
    let messenger = RecordingMessenger::default();

    let report = dispatch::deliver_chunks(&messenger, 42, &chunks, &limits).await;

    assert_eq!(report.sent, 2);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.failed, 0);

    // the oversized middle chunk was never uploaded
    assert_eq!(messenger.sent_files(), vec!["chunk_1.mp4", "chunk_3.mp4"]);

    // and the user heard about it
    let texts = messenger.texts();
    assert_eq!(texts.len(), 1);
    assert!(texts[0].contains("Part 2/3"), "got: {}", texts[0]);
}

#[tokio::test]
async fn test_failed_send_does_not_abort_siblings() {
    let dir = TempDir::new().unwrap();
    let chunks = write_chunks(&dir, &[5, 5]);
    let messenger = RecordingMessenger::failing_on(0);

    let report =
        dispatch::deliver_chunks(&messenger, 42, &chunks, &DeliveryLimits::default()).await;

    assert_eq!(report.sent, 1);
    assert_eq!(report.failed, 1);

    assert_eq!(messenger.sent_files(), vec!["chunk_2.mp4"]);

    let texts = messenger.texts();
    assert_eq!(texts.len(), 1);
    assert!(texts[0].contains("part 1/2"), "got: {}", texts[0]);
}

#[tokio::test]
async fn test_chunks_removed_after_delivery_pass() {
    let dir = TempDir::new().unwrap();
    let chunks = write_chunks(&dir, &[5, 20, 5]);
    let limits = DeliveryLimits {
        max_upload_bytes: 10,
        ..Default::default()
    };
    let messenger = RecordingMessenger::default();

    dispatch::deliver_chunks(&messenger, 42, &chunks, &limits).await;

    // sent, skipped, and failed chunks are all gone afterwards
    for chunk in &chunks {
        assert!(!chunk.exists(), "chunk left behind: {}", chunk.display());
    }
}

#[tokio::test]
async fn test_single_delivery_maps_failure_to_send_failed() {
    let dir = TempDir::new().unwrap();
    let artifact = dir.path().join("video.mp4");
    std::fs::write(&artifact, b"data").unwrap();

    let messenger = RecordingMessenger::failing_on(0);
    let result = dispatch::deliver_single(&messenger, 42, &artifact).await;

    assert!(matches!(result, Err(RelayError::SendFailed { .. })));
}
