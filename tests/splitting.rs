//! Splitting Integration Tests
//!
//! Exercises chunk planning and the all-or-nothing split loop with a
//! scripted encoder standing in for ffmpeg.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use tempfile::TempDir;

use vidrelay::splitter::{self, ChunkPlan};
use vidrelay::tools::ChunkEncoder;
use vidrelay::{DeliveryLimits, RelayError};

#[derive(Clone, Copy)]
enum Step {
    Write(usize),
    WriteEmpty,
    Fail,
}

/// Encoder that follows a per-call script instead of invoking ffmpeg.
struct ScriptedEncoder {
    script: Vec<Step>,
    calls: AtomicUsize,
}

impl ScriptedEncoder {
    fn new(script: Vec<Step>) -> Self {
        Self {
            script,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ChunkEncoder for ScriptedEncoder {
    async fn encode_chunk(
        &self,
        _src: &Path,
        _start: f64,
        _duration: f64,
        dest: &Path,
    ) -> Result<()> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        match self.script[call] {
            Step::Write(bytes) => std::fs::write(dest, vec![0u8; bytes])?,
            Step::WriteEmpty => std::fs::write(dest, b"")?,
            Step::Fail => anyhow::bail!("scripted encoder failure"),
        }
        Ok(())
    }
}

fn workdir_with_source() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let src = dir.path().join("video.mp4");
    std::fs::write(&src, b"source bytes").unwrap();
    (dir, src)
}

fn chunk_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .flatten()
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with("chunk_"))
        .collect();
    names.sort();
    names
}

#[test]
fn test_scenario_oversized_video() {
    // 400s at 80MB with the default 40MB target: 200s chunks, three of them
    let limits = DeliveryLimits::default();
    let size = 80 * 1024 * 1024;

    assert!(limits.needs_split(size));

    let plan = ChunkPlan::compute(400.0, size, &limits);
    assert_eq!(plan.chunk_duration, 200.0);
    assert_eq!(plan.num_chunks, 3);
}

#[test]
fn test_split_not_triggered_at_or_below_limit() {
    let limits = DeliveryLimits::default();

    assert!(!limits.needs_split(limits.max_upload_bytes));
    assert!(!limits.needs_split(1));
    assert!(limits.needs_split(limits.max_upload_bytes + 1));
}

#[test]
fn test_plan_covers_full_duration() {
    let limits = DeliveryLimits::default();

    for (duration, size) in [
        (400.0, 80 * 1024 * 1024u64),
        (3600.0, 500 * 1024 * 1024),
        (55.0, 52 * 1024 * 1024),
    ] {
        let plan = ChunkPlan::compute(duration, size, &limits);
        assert!(
            plan.chunk_duration * plan.num_chunks as f64 >= duration,
            "plan {plan:?} does not cover {duration}s"
        );
    }
}

#[tokio::test]
async fn test_split_produces_ordered_chunks() {
    let (dir, src) = workdir_with_source();
    let encoder = ScriptedEncoder::new(vec![Step::Write(10), Step::Write(10), Step::Write(10)]);
    let plan = ChunkPlan {
        chunk_duration: 200.0,
        num_chunks: 3,
    };

    let chunks = splitter::split(&src, dir.path(), &plan, &encoder)
        .await
        .unwrap();

    let names: Vec<_> = chunks
        .iter()
        .map(|c| c.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["chunk_1.mp4", "chunk_2.mp4", "chunk_3.mp4"]);

    for chunk in &chunks {
        assert!(chunk.exists());
    }
}

#[tokio::test]
async fn test_zero_byte_chunk_is_skipped() {
    let (dir, src) = workdir_with_source();
    let encoder = ScriptedEncoder::new(vec![Step::Write(10), Step::WriteEmpty, Step::Write(10)]);
    let plan = ChunkPlan {
        chunk_duration: 100.0,
        num_chunks: 3,
    };

    let chunks = splitter::split(&src, dir.path(), &plan, &encoder)
        .await
        .unwrap();

    assert_eq!(chunks.len(), 2);
    // the empty output is removed rather than left to block cleanup
    assert_eq!(chunk_files(dir.path()), vec!["chunk_1.mp4", "chunk_3.mp4"]);
}

#[tokio::test]
async fn test_failed_encode_removes_earlier_chunks() {
    let (dir, src) = workdir_with_source();
    let encoder = ScriptedEncoder::new(vec![Step::Write(10), Step::Write(10), Step::Fail]);
    let plan = ChunkPlan {
        chunk_duration: 100.0,
        num_chunks: 3,
    };

    let result = splitter::split(&src, dir.path(), &plan, &encoder).await;

    assert!(matches!(result, Err(RelayError::SplitFailed { .. })));
    // no chunk file remains on disk, only the source artifact
    assert!(chunk_files(dir.path()).is_empty());
    assert!(src.exists());
}
