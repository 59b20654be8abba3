//! End-to-end download tests against a mock Drive API.

use std::io::Write;

use gdrive_fetch::{
    Authenticator, Config, DownloadOptions, DownloadOutcome, Downloader, DriveClient, DriveError,
    SkipReason,
};
use mockito::{Matcher, Server, ServerGuard};
use tempfile::{NamedTempFile, TempDir};

fn downloader_for(server: &ServerGuard) -> Downloader {
    Downloader::with_client(DriveClient::new(
        Authenticator::from_access_token("test-token"),
        server.url(),
    ))
}

fn options(chunk_size: u64) -> DownloadOptions {
    DownloadOptions {
        overwrite_existing: false,
        chunk_size,
    }
}

/// Mock resolving `gdrive://My Drive/<name>` to `file_id`.
async fn mock_resolution(server: &mut ServerGuard, name: &str, file_id: &str) -> mockito::Mock {
    server
        .mock("GET", "/files")
        .match_query(Matcher::UrlEncoded(
            "q".into(),
            format!(
                "name = '{}' and 'root' in parents and trashed = false",
                name
            ),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(format!(r#"{{"files": [{{"id": "{}"}}]}}"#, file_id))
        .create_async()
        .await
}

async fn mock_size(server: &mut ServerGuard, file_id: &str, size: u64) -> mockito::Mock {
    server
        .mock("GET", format!("/files/{}", file_id).as_str())
        .match_query(Matcher::UrlEncoded("fields".into(), "size".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(format!(r#"{{"size": "{}"}}"#, size))
        .create_async()
        .await
}

async fn mock_chunk(
    server: &mut ServerGuard,
    file_id: &str,
    range: &str,
    body: &[u8],
    content_range: &str,
) -> mockito::Mock {
    server
        .mock("GET", format!("/files/{}", file_id).as_str())
        .match_query(Matcher::UrlEncoded("alt".into(), "media".into()))
        .match_header("range", range)
        .with_status(206)
        .with_header("content-range", content_range)
        .with_body(body)
        .create_async()
        .await
}

mod skip_existing {
    use super::*;

    #[tokio::test]
    async fn existing_file_skips_without_any_request() {
        let mut server = Server::new_async().await;
        let api = server
            .mock("GET", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let local = dir.path().join("present.dat");
        std::fs::write(&local, b"old contents").unwrap();

        let downloader = downloader_for(&server);
        let outcome = downloader
            .download(
                "gdrive://My Drive/present.dat",
                &local,
                &options(1024),
                |_, _| {},
            )
            .await;

        assert_eq!(outcome, DownloadOutcome::Skipped(SkipReason::AlreadyExists));
        assert_eq!(std::fs::read(&local).unwrap(), b"old contents");
        api.assert_async().await;
    }

    #[tokio::test]
    async fn second_download_of_same_file_skips() {
        let mut server = Server::new_async().await;
        let resolution = mock_resolution(&mut server, "once.dat", "file1").await;
        let size = mock_size(&mut server, "file1", 4).await;
        let chunk = mock_chunk(&mut server, "file1", "bytes=0-1023", b"data", "bytes 0-3/4").await;

        let dir = TempDir::new().unwrap();
        let local = dir.path().join("once.dat");
        let downloader = downloader_for(&server);

        let first = downloader
            .download("gdrive://My Drive/once.dat", &local, &options(1024), |_, _| {})
            .await;
        let second = downloader
            .download("gdrive://My Drive/once.dat", &local, &options(1024), |_, _| {})
            .await;

        assert_eq!(first, DownloadOutcome::Completed { bytes_written: 4 });
        assert_eq!(second, DownloadOutcome::Skipped(SkipReason::AlreadyExists));

        // Each endpoint was hit exactly once, by the first download.
        resolution.assert_async().await;
        size.assert_async().await;
        chunk.assert_async().await;
    }

    #[tokio::test]
    async fn overwrite_replaces_existing_file() {
        let mut server = Server::new_async().await;
        let _resolution = mock_resolution(&mut server, "fresh.dat", "file2").await;
        let _size = mock_size(&mut server, "file2", 5).await;
        let _chunk = mock_chunk(&mut server, "file2", "bytes=0-1023", b"fresh", "bytes 0-4/5").await;

        let dir = TempDir::new().unwrap();
        let local = dir.path().join("fresh.dat");
        std::fs::write(&local, b"stale").unwrap();

        let downloader = downloader_for(&server);
        let outcome = downloader
            .download(
                "gdrive://My Drive/fresh.dat",
                &local,
                &DownloadOptions {
                    overwrite_existing: true,
                    chunk_size: 1024,
                },
                |_, _| {},
            )
            .await;

        assert_eq!(outcome, DownloadOutcome::Completed { bytes_written: 5 });
        assert_eq!(std::fs::read(&local).unwrap(), b"fresh");
    }
}

mod completed {
    use super::*;

    #[tokio::test]
    async fn single_chunk_download() {
        let payload = vec![7u8; 1024];

        let mut server = Server::new_async().await;
        let _resolution = mock_resolution(&mut server, "session1.nix", "file1").await;
        let _size = mock_size(&mut server, "file1", 1024).await;
        let _chunk = mock_chunk(
            &mut server,
            "file1",
            "bytes=0-2047",
            &payload,
            "bytes 0-1023/1024",
        )
        .await;

        let dir = TempDir::new().unwrap();
        let local = dir.path().join("session1.nix");
        let mut calls: Vec<(u64, u64)> = Vec::new();

        let downloader = downloader_for(&server);
        let outcome = downloader
            .download(
                "gdrive://My Drive/session1.nix",
                &local,
                &options(2048),
                |transferred, total| calls.push((transferred, total)),
            )
            .await;

        assert_eq!(outcome, DownloadOutcome::Completed { bytes_written: 1024 });
        assert_eq!(calls, vec![(1024, 1024)]);
        assert_eq!(std::fs::read(&local).unwrap(), payload);
    }

    #[tokio::test]
    async fn multi_chunk_progress_is_cumulative() {
        let mut server = Server::new_async().await;
        let _resolution = mock_resolution(&mut server, "split.dat", "file5").await;
        let _size = mock_size(&mut server, "file5", 10).await;
        let c1 = mock_chunk(&mut server, "file5", "bytes=0-3", b"abcd", "bytes 0-3/10").await;
        let c2 = mock_chunk(&mut server, "file5", "bytes=4-7", b"efgh", "bytes 4-7/10").await;
        let c3 = mock_chunk(&mut server, "file5", "bytes=8-11", b"ij", "bytes 8-9/10").await;

        let dir = TempDir::new().unwrap();
        let local = dir.path().join("split.dat");
        let mut calls: Vec<(u64, u64)> = Vec::new();

        let downloader = downloader_for(&server);
        let outcome = downloader
            .download(
                "gdrive://My Drive/split.dat",
                &local,
                &options(4),
                |transferred, total| calls.push((transferred, total)),
            )
            .await;

        assert_eq!(outcome, DownloadOutcome::Completed { bytes_written: 10 });
        // Cumulative byte offsets, ending at the exact file size.
        assert_eq!(calls, vec![(4, 10), (8, 10), (10, 10)]);
        assert_eq!(std::fs::read(&local).unwrap(), b"abcdefghij");

        c1.assert_async().await;
        c2.assert_async().await;
        c3.assert_async().await;
    }

    #[tokio::test]
    async fn creates_parent_directories() {
        let mut server = Server::new_async().await;
        let _resolution = mock_resolution(&mut server, "deep.dat", "file6").await;
        let _size = mock_size(&mut server, "file6", 3).await;
        let _chunk = mock_chunk(&mut server, "file6", "bytes=0-1023", b"abc", "bytes 0-2/3").await;

        let dir = TempDir::new().unwrap();
        let local = dir.path().join("a/b/deep.dat");

        let downloader = downloader_for(&server);
        let outcome = downloader
            .download("gdrive://My Drive/deep.dat", &local, &options(1024), |_, _| {})
            .await;

        assert_eq!(outcome, DownloadOutcome::Completed { bytes_written: 3 });
        assert_eq!(std::fs::read(&local).unwrap(), b"abc");
    }

    #[tokio::test]
    async fn zero_byte_file() {
        let mut server = Server::new_async().await;
        let _resolution = mock_resolution(&mut server, "empty.dat", "file0").await;
        let _size = mock_size(&mut server, "file0", 0).await;
        // A ranged request on an empty object has no first byte to ask for.
        let _media = server
            .mock("GET", "/files/file0")
            .match_query(Matcher::UrlEncoded("alt".into(), "media".into()))
            .match_header("range", "bytes=0-1023")
            .with_status(416)
            .with_header("content-range", "bytes */0")
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let local = dir.path().join("empty.dat");
        let mut calls: Vec<(u64, u64)> = Vec::new();

        let downloader = downloader_for(&server);
        let outcome = downloader
            .download(
                "gdrive://My Drive/empty.dat",
                &local,
                &options(1024),
                |transferred, total| calls.push((transferred, total)),
            )
            .await;

        assert_eq!(outcome, DownloadOutcome::Completed { bytes_written: 0 });
        assert_eq!(calls, vec![(0, 0)]);
        assert_eq!(std::fs::read(&local).unwrap(), b"");
    }

    #[tokio::test]
    async fn whole_body_response_finishes_in_one_chunk() {
        let mut server = Server::new_async().await;
        let _resolution = mock_resolution(&mut server, "small.dat", "file7").await;
        let _size = mock_size(&mut server, "file7", 6).await;
        // Some servers ignore Range and reply 200 with the full object.
        let _media = server
            .mock("GET", "/files/file7")
            .match_query(Matcher::UrlEncoded("alt".into(), "media".into()))
            .with_status(200)
            .with_body(b"sixbyt")
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let local = dir.path().join("small.dat");
        let mut calls: Vec<(u64, u64)> = Vec::new();

        let downloader = downloader_for(&server);
        let outcome = downloader
            .download(
                "gdrive://My Drive/small.dat",
                &local,
                &options(4),
                |transferred, total| calls.push((transferred, total)),
            )
            .await;

        assert_eq!(outcome, DownloadOutcome::Completed { bytes_written: 6 });
        assert_eq!(calls, vec![(6, 6)]);
        assert_eq!(std::fs::read(&local).unwrap(), b"sixbyt");
    }
}

mod skipped {
    use super::*;

    #[tokio::test]
    async fn missing_drive_is_not_found_and_writes_nothing() {
        let mut server = Server::new_async().await;
        let _drives = server
            .mock("GET", "/drives")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"drives": []}"#)
            .create_async()
            .await;
        let _about = server
            .mock("GET", "/about")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"user": {"emailAddress": "svc@project.iam.gserviceaccount.com"}}"#)
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let local = dir.path().join("data.bin");

        let downloader = downloader_for(&server);
        let outcome = downloader
            .download(
                "gdrive://Nonexistent/data.bin",
                &local,
                &options(1024),
                |_, _| {},
            )
            .await;

        match &outcome {
            DownloadOutcome::Skipped(SkipReason::NotFound { detail }) => {
                assert!(detail.contains("drive \"Nonexistent\" not found"));
                assert!(detail.contains("svc@project.iam.gserviceaccount.com"));
            }
            other => panic!("expected not-found skip, got {:?}", other),
        }
        assert!(!local.exists());
    }

    #[tokio::test]
    async fn ambiguous_drive_is_generic_error_skip() {
        let mut server = Server::new_async().await;
        let _drives = server
            .mock("GET", "/drives")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"drives": [
                    {"id": "d1", "name": "Shared"},
                    {"id": "d2", "name": "Shared"}
                ]}"#,
            )
            .create_async()
            .await;
        let _about = server
            .mock("GET", "/about")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"user": {"emailAddress": "svc@project.iam.gserviceaccount.com"}}"#)
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let local = dir.path().join("file.txt");

        let downloader = downloader_for(&server);
        let outcome = downloader
            .download("gdrive://Shared/file.txt", &local, &options(1024), |_, _| {})
            .await;

        match &outcome {
            DownloadOutcome::Skipped(SkipReason::Error { detail }) => {
                assert!(detail.contains("ambiguous path"));
                assert!(detail.contains("drives named \"Shared\""));
            }
            other => panic!("expected generic error skip, got {:?}", other),
        }
        assert!(!local.exists());
    }

    #[tokio::test]
    async fn api_404_is_not_found_with_email() {
        let mut server = Server::new_async().await;
        let _resolution = mock_resolution(&mut server, "gone.dat", "file8").await;
        let _size = server
            .mock("GET", "/files/file8")
            .match_query(Matcher::UrlEncoded("fields".into(), "size".into()))
            .with_status(404)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error": {"code": 404, "message": "File not found: file8."}}"#)
            .create_async()
            .await;
        let _about = server
            .mock("GET", "/about")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"user": {"emailAddress": "svc@project.iam.gserviceaccount.com"}}"#)
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let local = dir.path().join("gone.dat");

        let downloader = downloader_for(&server);
        let outcome = downloader
            .download("gdrive://My Drive/gone.dat", &local, &options(1024), |_, _| {})
            .await;

        match &outcome {
            DownloadOutcome::Skipped(SkipReason::NotFound { detail }) => {
                assert_eq!(
                    detail,
                    "not found on server for account \"svc@project.iam.gserviceaccount.com\""
                );
            }
            other => panic!("expected not-found skip, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn malformed_url_is_error_skip_without_requests() {
        let mut server = Server::new_async().await;
        let api = server
            .mock("GET", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let local = dir.path().join("x.txt");

        let downloader = downloader_for(&server);
        let outcome = downloader
            .download("https://example.com/x.txt", &local, &options(1024), |_, _| {})
            .await;

        match &outcome {
            DownloadOutcome::Skipped(SkipReason::Error { detail }) => {
                assert!(detail.contains("malformed URL"));
            }
            other => panic!("expected generic error skip, got {:?}", other),
        }
        assert!(!local.exists());
        api.assert_async().await;
    }
}

mod setup {
    use super::*;

    #[test]
    fn missing_credentials_file_fails_eagerly() {
        let config = Config::new("/nonexistent/credentials.json");
        let err = Downloader::new(&config).unwrap_err();

        assert!(matches!(err, DriveError::MissingCredentialsFile(_)));
        assert!(format!("{}", err).contains("/nonexistent/credentials.json"));
    }

    #[test]
    fn valid_credentials_file_constructs() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(
                br#"{"client_email": "svc@project.iam.gserviceaccount.com", "private_key": "key"}"#,
            )
            .unwrap();

        let config = Config::new(temp_file.path());
        assert!(Downloader::new(&config).is_ok());
    }
}
