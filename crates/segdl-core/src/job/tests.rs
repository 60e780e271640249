use super::*;
use crate::config::SegdlConfig;
use crate::transport::memory::MemoryTransport;
use std::sync::atomic::{AtomicUsize, Ordering};

const URL: &str = "http://example.com/files/data.bin";

fn body(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

fn options(dir: &tempfile::TempDir) -> JobOptions {
    JobOptions::from_config(&SegdlConfig::default(), URL, dir.path())
        .part_size(8 * 1024)
        .max_connections(4)
        .part_backoff(Duration::from_millis(10))
        .speed_interval(Duration::from_millis(20))
        .probe_attempts(1)
}

fn wait_done(job: &DownloadJob) {
    let deadline = Instant::now() + Duration::from_secs(20);
    while job.wait(Duration::from_millis(50)) {
        assert!(Instant::now() < deadline, "download did not finish");
    }
}

/// Wait for the job to finish, checking that progress never goes backwards.
fn wait_done_monotonic(job: &DownloadJob) {
    let deadline = Instant::now() + Duration::from_secs(20);
    let mut last = job.downloaded();
    while job.wait(Duration::from_millis(1)) {
        let now = job.downloaded();
        assert!(now >= last, "downloaded went from {} to {}", last, now);
        last = now;
        assert!(Instant::now() < deadline, "download did not finish");
    }
}

fn wait_for_bytes(job: &DownloadJob, bytes: u64) {
    let deadline = Instant::now() + Duration::from_secs(20);
    while job.downloaded() < bytes {
        assert!(Instant::now() < deadline, "no progress");
        std::thread::sleep(Duration::from_millis(2));
    }
}

#[test]
fn probe_failure_is_terminal() {
    let dir = tempfile::tempdir().unwrap();
    let mut transport = MemoryTransport::new(body(100));
    transport.fail_probe = true;
    let transport = Arc::new(transport);

    let job = DownloadJob::open(options(&dir), transport.clone()).unwrap();
    assert_eq!(job.state(), JobState::Error);
    assert!(job.failure().unwrap().contains("probe failed"));
    job.start().unwrap();
    assert_eq!(job.state(), JobState::Error);
    assert!(transport.requests().is_empty());
    assert!(!job.full_path().exists());
    assert_eq!(transport.probes.load(Ordering::SeqCst), 1);
}

#[test]
fn fresh_download_completes() {
    let dir = tempfile::tempdir().unwrap();
    let data = body(100 * 1024);
    let transport = Arc::new(MemoryTransport::new(data.clone()));

    let job = DownloadJob::open(options(&dir), transport).unwrap();
    assert_eq!(job.state(), JobState::Stopped);
    assert_eq!(job.filename(), "data.bin");
    assert_eq!(job.parts().len(), 13);
    assert_eq!(job.size(), Some(100 * 1024));
    job.start().unwrap();
    wait_done(&job);

    assert_eq!(job.state(), JobState::Completed);
    assert_eq!(job.downloaded(), data.len() as u64);
    assert_eq!(job.progress(), 100.0);
    assert!(job
        .parts()
        .iter()
        .all(|p| p.status == PartStatus::Completed));
    assert_eq!(std::fs::read(job.full_path()).unwrap(), data);
    job.stop(false).unwrap();
    assert_eq!(std::fs::read(job.full_path()).unwrap(), data);
}

#[test]
fn range_mismatch_is_retried() {
    let dir = tempfile::tempdir().unwrap();
    let data = body(40 * 1024);
    let mut transport = MemoryTransport::new(data.clone());
    transport.mismatches = AtomicUsize::new(3);
    let transport = Arc::new(transport);

    let job = DownloadJob::open(options(&dir), transport.clone()).unwrap();
    job.start().unwrap();
    wait_done(&job);

    assert_eq!(job.state(), JobState::Completed);
    assert_eq!(std::fs::read(job.full_path()).unwrap(), data);
    // Five parts plus three rejected responses.
    assert_eq!(transport.requests().len(), 8);
}

#[test]
fn connect_failures_back_off_and_recover() {
    let dir = tempfile::tempdir().unwrap();
    let data = body(40 * 1024);
    let mut transport = MemoryTransport::new(data.clone());
    transport.connect_failures = AtomicUsize::new(4);
    let transport = Arc::new(transport);

    let job = DownloadJob::open(options(&dir).max_connections(2), transport.clone()).unwrap();
    job.start().unwrap();
    wait_done(&job);

    assert_eq!(job.state(), JobState::Completed);
    assert_eq!(std::fs::read(job.full_path()).unwrap(), data);
    assert_eq!(transport.requests().len(), 9);
}

#[test]
fn no_range_support_degrades_to_one_part() {
    let dir = tempfile::tempdir().unwrap();
    let data = body(30 * 1024);
    let mut transport = MemoryTransport::new(data.clone());
    transport.accept_ranges = false;
    let transport = Arc::new(transport);

    let job = DownloadJob::open(options(&dir).start_from(50.0), transport).unwrap();
    assert!(!job.is_resumable());
    assert_eq!(job.connections(), (0, 1));
    let parts = job.parts();
    assert_eq!(parts.len(), 1);
    assert_eq!(parts[0].start, 0);
    assert_eq!(parts[0].end, Some(data.len() as u64 - 1));

    job.start().unwrap();
    wait_done(&job);
    assert_eq!(job.state(), JobState::Completed);
    assert_eq!(std::fs::read(job.full_path()).unwrap(), data);
}

#[test]
fn stop_persists_and_resume_skips_completed_parts() {
    let dir = tempfile::tempdir().unwrap();
    let data = body(128 * 1024);
    let mut transport = MemoryTransport::new(data.clone());
    transport.chunk_size = 512;
    transport.chunk_delay = Duration::from_millis(3);
    let transport = Arc::new(transport);

    let job = DownloadJob::open(options(&dir).max_connections(2), transport.clone()).unwrap();
    job.start().unwrap();
    wait_for_bytes(&job, 20 * 1024);
    job.stop(false).unwrap();
    assert_eq!(job.state(), JobState::Stopped);
    let at_stop = job.downloaded();
    let completed: Vec<Part> = job
        .parts()
        .into_iter()
        .filter(|p| p.status == PartStatus::Completed)
        .collect();
    assert!(!completed.is_empty());
    assert!(job.parts().iter().all(|p| !p.status.is_active()));
    let path = job.full_path().to_path_buf();
    drop(job);

    let stored = resume::read_snapshot(&path).unwrap();
    assert_eq!(stored.downloaded(), at_stop);

    let before = transport.requests().len();
    let job = DownloadJob::open(options(&dir).max_connections(2), transport.clone()).unwrap();
    assert_eq!(job.start_downloaded(), at_stop);
    assert_eq!(job.downloaded(), at_stop);
    job.start().unwrap();
    wait_done(&job);

    assert_eq!(job.state(), JobState::Completed);
    assert_eq!(std::fs::read(&path).unwrap(), data);
    for (start, _) in &transport.requests()[before..] {
        assert!(
            completed
                .iter()
                .all(|p| !(p.start..=p.end.unwrap()).contains(start)),
            "completed range re-fetched at {}",
            start
        );
    }
}

#[test]
fn erase_then_open_starts_fresh() {
    let dir = tempfile::tempdir().unwrap();
    let data = body(64 * 1024);
    let mut transport = MemoryTransport::new(data.clone());
    transport.chunk_size = 512;
    transport.chunk_delay = Duration::from_millis(3);
    let transport = Arc::new(transport);

    let job = DownloadJob::open(options(&dir), transport.clone()).unwrap();
    job.start().unwrap();
    wait_for_bytes(&job, 4 * 1024);
    job.stop(true).unwrap();
    assert!(!job.full_path().exists());
    drop(job);

    let job = DownloadJob::open(options(&dir), transport).unwrap();
    assert_eq!(job.start_downloaded(), 0);
    assert!(job.parts().iter().all(|p| p.current == p.start));
}

#[test]
fn start_after_stop_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let transport = Arc::new(MemoryTransport::new(body(1024)));
    let job = DownloadJob::open(options(&dir), transport).unwrap();
    job.stop(false).unwrap();
    assert!(matches!(job.start(), Err(JobError::Closed)));
    job.stop(false).unwrap();
}

#[test]
fn unstarted_job_keeps_its_resume_state() {
    let dir = tempfile::tempdir().unwrap();
    let data = body(64 * 1024);
    let mut transport = MemoryTransport::new(data);
    transport.chunk_size = 512;
    transport.chunk_delay = Duration::from_millis(3);
    let transport = Arc::new(transport);

    let job = DownloadJob::open(options(&dir), transport.clone()).unwrap();
    job.start().unwrap();
    wait_for_bytes(&job, 8 * 1024);
    job.stop(false).unwrap();
    let at_stop = job.downloaded();
    drop(job);

    // Opening consumes the trailer; stopping without starting writes it back.
    let job = DownloadJob::open(options(&dir), transport.clone()).unwrap();
    job.stop(false).unwrap();
    drop(job);

    let job = DownloadJob::open(options(&dir), transport).unwrap();
    assert_eq!(job.start_downloaded(), at_stop);
}

#[test]
fn inline_headers_are_stripped_from_url() {
    let dir = tempfile::tempdir().unwrap();
    let transport = Arc::new(MemoryTransport::new(body(1024)));
    let mut opts = options(&dir);
    opts.url = format!("{}|Referer=http%3A%2F%2Fexample.com%2F", URL);
    let job = DownloadJob::open(opts, transport).unwrap();
    assert_eq!(job.url(), URL);
    assert_eq!(job.filename(), "data.bin");
}

#[test]
fn metadata_request_retries_tls_failures() {
    let dir = tempfile::tempdir().unwrap();
    let mut transport = MemoryTransport::new(body(1024));
    transport.tls_failures = AtomicUsize::new(2);
    let transport = Arc::new(transport);

    let job = DownloadJob::open(options(&dir).probe_attempts(3), transport.clone()).unwrap();
    assert_eq!(job.state(), JobState::Stopped);
    assert_eq!(transport.probes.load(Ordering::SeqCst), 3);
}

#[test]
fn read_failure_resumes_part_from_written_offset() {
    let dir = tempfile::tempdir().unwrap();
    let data = body(40 * 1024);
    let mut transport = MemoryTransport::new(data.clone());
    transport.chunk_delay = Duration::from_millis(1);
    transport.read_failures = AtomicUsize::new(3);
    let transport = Arc::new(transport);

    let job = DownloadJob::open(options(&dir).max_connections(2), transport.clone()).unwrap();
    job.start().unwrap();
    wait_done_monotonic(&job);

    assert_eq!(job.state(), JobState::Completed);
    assert_eq!(std::fs::read(job.full_path()).unwrap(), data);
    let requests = transport.requests();
    assert_eq!(requests.len(), 8);
    // Retries pick up after the bytes that made it to disk.
    let mid_part = requests
        .iter()
        .filter(|(start, _)| start % (8 * 1024) != 0)
        .count();
    assert_eq!(mid_part, 3);
}

#[test]
fn early_end_of_bounded_part_is_retried() {
    let dir = tempfile::tempdir().unwrap();
    let data = body(40 * 1024);
    let mut transport = MemoryTransport::new(data.clone());
    transport.early_ends = AtomicUsize::new(2);
    let transport = Arc::new(transport);

    let job = DownloadJob::open(options(&dir), transport.clone()).unwrap();
    job.start().unwrap();
    wait_done_monotonic(&job);

    assert_eq!(job.state(), JobState::Completed);
    assert_eq!(job.downloaded(), data.len() as u64);
    assert_eq!(std::fs::read(job.full_path()).unwrap(), data);
    assert_eq!(transport.requests().len(), 7);
}

#[test]
fn no_range_failure_restarts_from_first_byte() {
    let dir = tempfile::tempdir().unwrap();
    let data = body(30 * 1024);
    let mut transport = MemoryTransport::new(data.clone());
    transport.accept_ranges = false;
    transport.read_failures = AtomicUsize::new(1);
    let transport = Arc::new(transport);

    let job = DownloadJob::open(options(&dir), transport.clone()).unwrap();
    job.start().unwrap();
    wait_done(&job);

    assert_eq!(job.state(), JobState::Completed);
    assert_eq!(std::fs::read(job.full_path()).unwrap(), data);
    let end = Some(data.len() as u64 - 1);
    assert_eq!(transport.requests(), vec![(0, end), (0, end)]);
}
