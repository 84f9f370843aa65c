mod common;

use std::fs;
use std::time::Duration;

use common::{Fault, MockService, client, client_with, config, sha256, write_file};
use haul::{
    ArtifactState, CancellationToken, DownloadOptions, ErrorKind, PackageFormat, RetrySettings, TransferOutcome,
    TransferResult, UploadOptions,
};
use haul_transfer::{Method, TransportError};
use tempfile::TempDir;

fn workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "logs/a.txt", "alpha\n");
    write_file(dir.path(), "logs/b.txt", "bravo\n");
    write_file(dir.path(), "logs/c.csv", "x,y\n");
    dir
}

fn upload_options(dir: &TempDir) -> UploadOptions { UploadOptions::default().working_dir(dir.path()) }

fn uploaded_id(result: &TransferResult) -> String { result.uploaded().unwrap().id.clone() }

#[tokio::test]
async fn upload_then_extract_roundtrip() {
    let service = MockService::new();
    let client = client(&service);
    let src = workspace();

    let result = client.upload("test-logs", &["logs/*.txt"], upload_options(&src)).await.unwrap();
    assert!(result.success);
    assert_eq!(result.attempts, 1);
    let Some(TransferOutcome::Uploaded { artifact, files }) = &result.outcome else {
        panic!("expected upload outcome, got {result:?}");
    };
    assert_eq!(*files, 2);
    assert_eq!(artifact.format, PackageFormat::Tar);

    let sent = &service.requests()[0];
    assert_eq!(sent.method, Method::Post);
    assert_eq!(sent.path, "/artifacts");
    assert_eq!(sent.header("x-artifact-name"), Some("test-logs"));
    assert_eq!(sent.header("x-artifact-format"), Some("tar"));
    assert_eq!(sent.header("x-artifact-retention-days"), None);
    assert_eq!(sent.header("x-artifact-digest").map(str::to_string), result.checksum.as_ref().map(|c| c.to_string()));

    let out = TempDir::new().unwrap();
    let downloaded = client
        .download(&artifact.id, out.path().join("restored"), DownloadOptions::default().extract(true))
        .await
        .unwrap();
    let Some(TransferOutcome::Downloaded { extracted_files, .. }) = downloaded.outcome else {
        panic!("expected download outcome");
    };
    assert_eq!(extracted_files, Some(2));
    assert_eq!(downloaded.checksum, result.checksum);

    let restored = out.path().join("restored");
    assert_eq!(fs::read_to_string(restored.join("a.txt")).unwrap(), "alpha\n");
    assert_eq!(fs::read_to_string(restored.join("b.txt")).unwrap(), "bravo\n");
    assert!(!restored.join("c.csv").exists());
}

#[tokio::test]
async fn single_file_is_sent_raw_and_lands_in_directory() {
    let service = MockService::new();
    let client = client(&service);
    let src = workspace();

    let result = client.upload("report", &["logs/c.csv"], upload_options(&src)).await.unwrap();
    let id = uploaded_id(&result);
    assert_eq!(service.content_of(&id).unwrap().as_ref(), b"x,y\n");

    let out = TempDir::new().unwrap();
    let downloaded = client.download(&id, out.path(), DownloadOptions::default()).await.unwrap();

    let path = downloaded.downloaded_path().unwrap();
    assert_eq!(path, &out.path().join("report"));
    assert_eq!(fs::read_to_string(path).unwrap(), "x,y\n");
    let leftovers: Vec<_> = fs::read_dir(out.path()).unwrap().collect();
    assert_eq!(leftovers.len(), 1);
}

#[tokio::test]
async fn retention_is_sent_when_set() {
    let service = MockService::new();
    let client = client(&service);
    let src = workspace();

    let result = client
        .upload("kept", &["logs"], upload_options(&src).retention_days(7).compress(true))
        .await
        .unwrap();

    let sent = &service.requests()[0];
    assert_eq!(sent.header("x-artifact-retention-days"), Some("7"));
    assert_eq!(sent.header("x-artifact-format"), Some("tar+gzip"));
    assert_eq!(result.uploaded().unwrap().format, PackageFormat::TarGzip);
    assert!(result.uploaded().unwrap().expires_at.is_some());
}

#[tokio::test]
async fn nothing_is_sent_when_nothing_matches() {
    let service = MockService::new();
    let client = client(&service);
    let src = workspace();

    let err = client.upload("empty", &["logs/*.bin"], upload_options(&src)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Selection);
    assert_eq!(err.attempts(), 0);
    assert_eq!(service.request_count(), 0);
}

#[tokio::test]
async fn invalid_input_is_rejected_locally() {
    let service = MockService::new();
    let client = client(&service);
    let src = workspace();

    let err = client.upload("bad/name", &["logs"], upload_options(&src)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRequest);

    let err = client
        .upload("logs", &["logs"], upload_options(&src).retention_days(365))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRequest);

    let err = client.get("../etc").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRequest);

    assert_eq!(service.request_count(), 0);
}

#[tokio::test]
async fn upload_size_ceiling_is_enforced_before_sending() {
    let service = MockService::new();
    let mut config = config();
    config.max_upload_bytes = Some(8);
    let client = client_with(&service, config);
    let src = workspace();

    let err = client.upload("logs", &["logs/*.txt"], upload_options(&src)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Packaging);
    assert_eq!(service.request_count(), 0);
}

#[tokio::test]
async fn duplicate_name_is_a_conflict() {
    let service = MockService::new();
    let client = client(&service);
    let src = workspace();

    client.upload("logs", &["logs/a.txt"], upload_options(&src)).await.unwrap();
    let err = client.upload("logs", &["logs/b.txt"], upload_options(&src)).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(service.request_count(), 2);
}

#[tokio::test]
async fn misreported_upload_digest_is_an_integrity_error() {
    let service = MockService::new();
    service.misreport_digest(1);
    let client = client(&service);
    let src = workspace();

    let err = client.upload("logs", &["logs/a.txt"], upload_options(&src)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Integrity);

    let removed = service.requests().into_iter().find(|r| r.method == Method::Delete).unwrap();
    assert_eq!(removed.path, "/artifacts/art-1");
    assert!(client.list_all(None).await.unwrap().is_empty());

    let again = client.upload("logs", &["logs/a.txt"], upload_options(&src)).await.unwrap();
    assert!(again.success);
    assert_eq!(again.uploaded().unwrap().name, "logs");
}

#[tokio::test]
async fn configured_chunk_size_keeps_digests_stable() {
    let service = MockService::new();
    let mut config = config();
    config.chunk_size = 3;
    let client = client_with(&service, config);
    let src = workspace();

    let result = client.upload("report", &["logs/c.csv"], upload_options(&src)).await.unwrap();
    assert_eq!(result.checksum, Some(sha256(b"x,y\n")));
}

#[tokio::test]
async fn corrupted_expected_checksum_leaves_no_file() {
    let service = MockService::new();
    let client = client(&service);
    let artifact = service.seed("notes", b"the real content", |_| {});

    let out = TempDir::new().unwrap();
    let target = out.path().join("notes.txt");
    let options = DownloadOptions::default().expected_checksum(sha256(b"something else"));
    let err = client.download(&artifact.id, &target, options).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Integrity);
    let record = TransferResult::failed(&err);
    assert_eq!(record.checksum, Some(sha256(b"the real content")));
    assert!(!target.exists());
    assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);

    let nested = out.path().join("deeper/still/notes.txt");
    let options = DownloadOptions::default().expected_checksum(sha256(b"something else"));
    let err = client.download(&artifact.id, &nested, options).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Integrity);
    assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);

    let bundle = service.seed("bundle", b"archive bytes", |d| d.format = PackageFormat::Tar);
    let restored = out.path().join("restored");
    let options = DownloadOptions::default().expected_checksum(sha256(b"bogus")).extract(true);
    let err = client.download(&bundle.id, &restored, options).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Integrity);
    assert!(!restored.exists());
    assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
}

/// A tar holding `good.txt` followed by a symlink entry.
fn tar_with_link() -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    let mut header = tar::Header::new_gnu();
    header.set_size(5);
    header.set_mode(0o644);
    header.set_cksum();
    builder.append_data(&mut header, "good.txt", &b"good\n"[..]).unwrap();

    let mut link = tar::Header::new_gnu();
    link.set_entry_type(tar::EntryType::Symlink);
    link.set_size(0);
    builder.append_link(&mut link, "evil", "/etc/passwd").unwrap();
    builder.into_inner().unwrap()
}

fn entries(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn failed_extraction_leaves_nothing_behind() {
    let service = MockService::new();
    let client = client(&service);
    let artifact = service.seed("bundle", &tar_with_link(), |d| d.format = PackageFormat::Tar);
    let out = TempDir::new().unwrap();

    let fresh = out.path().join("restored");
    let err = client
        .download(&artifact.id, &fresh, DownloadOptions::default().extract(true))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Packaging);
    assert!(!fresh.exists());
    assert!(entries(out.path()).is_empty());

    write_file(out.path(), "keep.txt", "mine\n");
    let err = client
        .download(&artifact.id, out.path(), DownloadOptions::default().extract(true))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Packaging);
    assert_eq!(entries(out.path()), ["keep.txt"]);
}

#[tokio::test]
async fn extraction_merges_into_an_existing_directory() {
    let service = MockService::new();
    let client = client(&service);
    let src = workspace();
    let result = client.upload("test-logs", &["logs/*.txt"], upload_options(&src)).await.unwrap();

    let out = TempDir::new().unwrap();
    write_file(out.path(), "keep.txt", "mine\n");
    write_file(out.path(), "a.txt", "stale\n");

    client
        .download(&uploaded_id(&result), out.path(), DownloadOptions::default().extract(true))
        .await
        .unwrap();
    assert_eq!(entries(out.path()), ["a.txt", "b.txt", "keep.txt"]);
    assert_eq!(fs::read_to_string(out.path().join("a.txt")).unwrap(), "alpha\n");
    assert_eq!(fs::read_to_string(out.path().join("keep.txt")).unwrap(), "mine\n");
}

#[tokio::test]
async fn tampered_content_fails_verification() {
    let service = MockService::new();
    service.tamper_content();
    let client = client(&service);
    let artifact = service.seed("notes", b"the real content", |_| {});

    let out = TempDir::new().unwrap();
    let err = client
        .download(&artifact.id, out.path(), DownloadOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Integrity);
    assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn verification_needs_a_reference_digest() {
    let service = MockService::new();
    let client = client(&service);
    let artifact = service.seed("notes", b"no digest recorded", |d| d.digest = None);
    let out = TempDir::new().unwrap();

    let err = client
        .download(&artifact.id, out.path(), DownloadOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Integrity);
    assert!(!service.requests().iter().any(|r| r.path.ends_with("/content")));

    let result = client
        .download(&artifact.id, out.path(), DownloadOptions::default().verify_checksum(false))
        .await
        .unwrap();
    assert_eq!(fs::read(result.downloaded_path().unwrap()).unwrap(), b"no digest recorded");
}

#[tokio::test]
async fn raw_artifact_extracts_under_its_name() {
    let service = MockService::new();
    let client = client(&service);
    let artifact = service.seed("single.bin", b"\x00\x01\x02", |_| {});
    let out = TempDir::new().unwrap();
    let dest = out.path().join("fresh");

    let result = client
        .download(&artifact.id, &dest, DownloadOptions::default().extract(true))
        .await
        .unwrap();
    assert_eq!(result.downloaded_path(), Some(&dest.join("single.bin")));
    assert_eq!(fs::read(dest.join("single.bin")).unwrap(), b"\x00\x01\x02");
}

#[tokio::test]
async fn truncated_body_is_fetched_again() {
    let service = MockService::new();
    let client = client(&service);
    let artifact = service.seed("notes", b"0123456789abcdefghij", |_| {});
    service.truncate_content(1);

    let out = TempDir::new().unwrap();
    let result = client
        .download(&artifact.id, out.path().join("notes"), DownloadOptions::default())
        .await
        .unwrap();

    assert_eq!(result.attempts, 2);
    let content_requests = service.requests().iter().filter(|r| r.path.ends_with("/content")).count();
    assert_eq!(content_requests, 2);
    assert_eq!(fs::read(result.downloaded_path().unwrap()).unwrap(), b"0123456789abcdefghij");
}

#[tokio::test]
async fn delete_is_idempotent() {
    let service = MockService::new();
    let client = client(&service);
    let artifact = service.seed("old", b"bytes", |_| {});

    let first = client.delete(&artifact.id).await.unwrap();
    assert!(matches!(first.outcome, Some(TransferOutcome::Deleted { existed: true, .. })));

    let second = client.delete(&artifact.id).await.unwrap();
    assert!(second.success);
    assert!(matches!(second.outcome, Some(TransferOutcome::Deleted { existed: false, .. })));

    assert_eq!(client.get(&artifact.id).await.unwrap_err().kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn get_hides_unavailable_artifacts() {
    let service = MockService::new();
    let client = client(&service);
    let expired = service.seed("a", b"1", |d| d.state = ArtifactState::Expired);
    let past = service.seed("b", b"2", |d| d.expires_at = Some(common::epoch()));
    let live = service.seed("c", b"3", |_| {});

    assert_eq!(client.get(&expired.id).await.unwrap_err().kind(), ErrorKind::NotFound);
    assert_eq!(client.get(&past.id).await.unwrap_err().kind(), ErrorKind::NotFound);
    assert_eq!(client.get(&live.id).await.unwrap(), live);
    assert_eq!(client.get("art-999").await.unwrap_err().kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn find_returns_newest_available() {
    let service = MockService::new();
    let client = client(&service);
    service.seed("nightly", b"1", |_| {});
    let newer = service.seed("nightly", b"2", |_| {});
    service.seed("nightly", b"3", |d| d.state = ArtifactState::Deleted);
    service.seed("other", b"4", |_| {});

    assert_eq!(client.find("nightly").await.unwrap(), Some(newer));
    assert_eq!(client.find("missing").await.unwrap(), None);
}

#[tokio::test]
async fn pagination_yields_each_descriptor_once() {
    let service = MockService::new();
    let mut config = config();
    config.page_size = 3;
    let client = client_with(&service, config);
    let seeded: Vec<_> = (0..7).map(|i| service.seed(&format!("build-{i}"), b"x", |_| {})).collect();

    let listed = client.list_all(None).await.unwrap();
    assert_eq!(listed, seeded);

    let pages: Vec<_> = service.requests().into_iter().filter(|r| r.path == "/artifacts").collect();
    assert_eq!(pages.len(), 3);
    assert_eq!(pages[0].query, [("per_page".to_string(), "3".to_string())]);
    assert_eq!(pages[2].query[1], ("cursor".to_string(), "6".to_string()));
}

#[tokio::test]
async fn list_filters_names_with_a_glob() {
    let service = MockService::new();
    let client = client(&service);
    service.seed("logs-linux", b"1", |_| {});
    service.seed("dist", b"2", |_| {});
    service.seed("logs-macos", b"3", |_| {});

    let names: Vec<String> = client
        .list_all(Some("logs-*"))
        .await
        .unwrap()
        .into_iter()
        .map(|d| d.name)
        .collect();
    assert_eq!(names, ["logs-linux", "logs-macos"]);

    assert_eq!(client.list(Some("[")).err().map(|e| e.kind()), Some(ErrorKind::InvalidRequest));
}

#[tokio::test]
async fn repeated_cursor_stops_the_listing() {
    let service = MockService::new();
    service.loop_cursor();
    let mut config = config();
    config.page_size = 2;
    let client = client_with(&service, config);
    for i in 0..5 {
        service.seed(&format!("a{i}"), b"x", |_| {});
    }

    let err = client.list_all(None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Protocol);
    assert!(service.request_count() <= 3);
}

#[tokio::test]
async fn terminal_failure_is_not_retried() {
    let service = MockService::new();
    let client = client(&service);
    let artifact = service.seed("x", b"1", |_| {});

    service.fail_next([Fault::Status(400)]);
    let err = client.get(&artifact.id).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transfer);
    assert_eq!(err.attempts(), 1);
    assert_eq!(service.request_count(), 1);
    assert!(err.to_string().contains("HTTP 400"));
}

#[tokio::test]
async fn retries_stop_at_the_attempt_ceiling() {
    let service = MockService::new();
    let client = client(&service);
    let artifact = service.seed("x", b"1", |_| {});

    service.fail_next([
        Fault::Status(502),
        Fault::Transport(TransportError::connect("refused")),
        Fault::Status(503),
    ]);
    let err = client.delete(&artifact.id).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transfer);
    assert_eq!(err.attempts(), 3);
    assert_eq!(service.request_count(), 3);
    assert!(service.content_of(&artifact.id).is_some());
}

#[tokio::test(start_paused = true)]
async fn transient_failures_are_retried_with_backoff() {
    let service = MockService::new();
    let client = client_with(
        &service,
        config().retry(RetrySettings {
            max_attempts:  5,
            base_delay_ms: 1_000,
            max_delay_ms:  30_000,
            deadline_secs: None,
        }),
    );
    let src = workspace();

    service.fail_next([Fault::Status(503), Fault::Status(503)]);
    let started = tokio::time::Instant::now();
    let result = client.upload("logs", &["logs/*.txt"], upload_options(&src)).await.unwrap();

    assert!(result.success);
    assert_eq!(result.attempts, 3);
    assert!(started.elapsed() >= Duration::from_secs(3));
    assert_eq!(service.request_count(), 3);
    let sizes: Vec<u64> = service.requests().iter().map(|r| r.body_len).collect();
    assert!(sizes.iter().all(|len| *len == sizes[0] && *len > 0));
}

#[tokio::test]
async fn cancelled_before_start_sends_nothing() {
    let service = MockService::new();
    let token = CancellationToken::new();
    token.cancel();
    let client = client(&service).with_cancellation(token);
    let src = workspace();

    let err = client.upload("logs", &["logs/*.txt"], upload_options(&src)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);
    assert_eq!(err.attempts(), 0);
    assert_eq!(service.request_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn cancellation_interrupts_backoff() {
    let service = MockService::new();
    let token = CancellationToken::new();
    let client = client_with(
        &service,
        config().retry(RetrySettings {
            max_attempts:  5,
            base_delay_ms: 1_000,
            max_delay_ms:  30_000,
            deadline_secs: None,
        }),
    )
    .with_cancellation(token.clone());
    let artifact = service.seed("x", b"1", |_| {});

    service.fail_next([Fault::Status(503), Fault::Status(503), Fault::Status(503), Fault::Status(503)]);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        token.cancel();
    });

    let err = client.get(&artifact.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);
    assert_eq!(err.attempts(), 2);
    assert_eq!(service.request_count(), 2);
}
