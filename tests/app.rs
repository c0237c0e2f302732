use std::collections::HashMap;
use std::io::Write;
use std::sync::Mutex;

use assert_matches::assert_matches;
use camino::{Utf8Path, Utf8PathBuf};

use metabolights_mirror::app::{
    self, FetchAction, ProgressEvent, ProgressSink, fetch_if_missing, fetch_manifest_driven_set,
};
use metabolights_mirror::domain::Application;
use metabolights_mirror::error::MirrorError;
use metabolights_mirror::remote::{RemoteSession, Session, SessionState};

struct NoopSink;

impl ProgressSink for NoopSink {
    fn event(&self, _event: ProgressEvent) {}
}

#[derive(Default)]
struct MockSession {
    files: HashMap<String, Vec<u8>>,
    calls: Mutex<Vec<String>>,
}

impl MockSession {
    fn with_files(files: &[(&str, &[u8])]) -> Self {
        Self {
            files: files
                .iter()
                .map(|(name, content)| (name.to_string(), content.to_vec()))
                .collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl RemoteSession for MockSession {
    fn retrieve(&mut self, remote_path: &str, sink: &mut dyn Write) -> Result<u64, MirrorError> {
        self.calls.lock().unwrap().push(remote_path.to_string());
        let content = self
            .files
            .get(remote_path)
            .ok_or_else(|| MirrorError::Transfer {
                path: remote_path.to_string(),
                message: "550 file not found".to_string(),
            })?;
        sink.write_all(content)
            .map_err(|err| MirrorError::Filesystem(err.to_string()))?;
        Ok(content.len() as u64)
    }

    fn close(&mut self) -> Result<(), MirrorError> {
        Ok(())
    }
}

fn temp_root() -> (tempfile::TempDir, Utf8PathBuf) {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().join("data")).unwrap();
    (temp, root)
}

fn write(path: &Utf8Path, content: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent.as_std_path()).unwrap();
    }
    std::fs::write(path.as_std_path(), content).unwrap();
}

#[test]
fn second_fetch_performs_no_transfer() {
    let (_temp, root) = temp_root();
    std::fs::create_dir_all(root.as_std_path()).unwrap();
    let mut session = MockSession::with_files(&[("NIST001.csv", b"mz,rt\n")]);

    let first = fetch_if_missing(&mut session, "NIST001.csv", &root, &NoopSink).unwrap();
    assert_eq!(first.action, FetchAction::Downloaded);
    assert_eq!(first.bytes, 6);

    let second = fetch_if_missing(&mut session, "NIST001.csv", &root, &NoopSink).unwrap();
    assert_eq!(second.action, FetchAction::Skipped);
    assert_eq!(session.calls(), vec!["NIST001.csv"]);
    assert_eq!(
        std::fs::read(root.join("NIST001.csv").as_std_path()).unwrap(),
        b"mz,rt\n"
    );
}

#[test]
fn manifest_set_downloads_only_missing() {
    let (_temp, root) = temp_root();
    let manifest = root.join("sample_list.csv");
    write(&manifest, "id,class\nA1,QC\nA2,sample\nA3,sample\nA4,QC\n");
    let cent = root.join("cent");
    write(&cent.join("A2.mzML"), "present");
    write(&cent.join("A4.mzML"), "present");

    let mut session = MockSession::with_files(&[
        ("Centroid_data/A1.mzML", b"one"),
        ("Centroid_data/A3.mzML", b"three"),
    ]);
    let result = fetch_manifest_driven_set(
        &mut session,
        &manifest,
        "id",
        "mzML",
        "Centroid_data",
        &cent,
        &NoopSink,
    )
    .unwrap();

    assert_eq!(
        session.calls(),
        vec!["Centroid_data/A1.mzML", "Centroid_data/A3.mzML"]
    );
    assert_eq!(result.downloaded(), 2);
    assert_eq!(result.skipped(), 2);
    assert_eq!(
        std::fs::read_to_string(cent.join("A2.mzML").as_std_path()).unwrap(),
        "present"
    );
}

#[test]
fn complete_manifest_set_is_skipped_whole() {
    let (_temp, root) = temp_root();
    let manifest = root.join("sample_list.csv");
    write(&manifest, "id\nA1\nA2\n");
    let cent = root.join("cent");
    write(&cent.join("A1.mzML"), "");
    write(&cent.join("A2.mzML"), "");

    let mut session = MockSession::default();
    let result = fetch_manifest_driven_set(
        &mut session,
        &manifest,
        "id",
        "mzML",
        "Centroid_data",
        &cent,
        &NoopSink,
    )
    .unwrap();

    assert!(session.calls().is_empty());
    assert_eq!(result.skipped(), 2);
    assert_eq!(result.downloaded(), 0);
}

#[test]
fn missing_target_dir_is_created_only_when_needed() {
    let (_temp, root) = temp_root();
    let manifest = root.join("sample_list.csv");
    write(&manifest, "id\nA1\n");
    let cent = root.join("cent");

    let mut session = MockSession::with_files(&[("Centroid_data/A1.mzML", b"x")]);
    fetch_manifest_driven_set(
        &mut session,
        &manifest,
        "id",
        "mzML",
        "Centroid_data",
        &cent,
        &NoopSink,
    )
    .unwrap();
    assert!(cent.join("A1.mzML").as_std_path().is_file());
}

#[test]
fn empty_manifest_leaves_target_dir_absent() {
    let (_temp, root) = temp_root();
    let manifest = root.join("sample_list.csv");
    write(&manifest, "id,class\n");
    let cent = root.join("cent");

    let mut session = MockSession::default();
    let result = fetch_manifest_driven_set(
        &mut session,
        &manifest,
        "id",
        "mzML",
        "Centroid_data",
        &cent,
        &NoopSink,
    )
    .unwrap();

    assert!(result.items.is_empty());
    assert!(session.calls().is_empty());
    assert!(!cent.as_std_path().exists());
}

#[test]
fn unsafe_identifier_aborts_before_any_transfer() {
    let (_temp, root) = temp_root();
    let manifest = root.join("sample_list.csv");
    write(&manifest, "id\nA1\nsub/A2\n");

    let mut session = MockSession::with_files(&[("Centroid_data/A1.mzML", b"x")]);
    let err = fetch_manifest_driven_set(
        &mut session,
        &manifest,
        "id",
        "mzML",
        "Centroid_data",
        &root.join("cent"),
        &NoopSink,
    )
    .unwrap_err();

    assert_matches!(err, MirrorError::UnsafeIdentifier(_));
    assert!(session.calls().is_empty());
    assert!(!root.join("cent").as_std_path().exists());
}

#[test]
fn failed_transfer_leaves_nothing_behind() {
    let (_temp, root) = temp_root();
    std::fs::create_dir_all(root.as_std_path()).unwrap();
    let mut session = MockSession::default();

    let err = fetch_if_missing(&mut session, "run-order-data.csv", &root, &NoopSink).unwrap_err();
    assert_matches!(err, MirrorError::Transfer { .. });
    assert!(!root.join("run-order-data.csv").as_std_path().exists());
}

#[test]
fn application1_fetches_manifest_then_samples() {
    let (_temp, root) = temp_root();
    let mut session = Session::new(MockSession::with_files(&[
        ("sample_list.csv", b"id,order\nQC1,1\nS1,2\n"),
        ("Centroid_data/QC1.mzML", b"<mzML/>"),
        ("Centroid_data/S1.mzML", b"<mzML/>"),
    ]));

    let result =
        app::fetch_application(&mut session, Application::Application1, &root, &NoopSink).unwrap();
    assert_eq!(result.downloaded(), 3);
    assert!(root.join("cent/S1.mzML").as_std_path().is_file());

    let again =
        app::fetch_application(&mut session, Application::Application1, &root, &NoopSink).unwrap();
    assert_eq!(again.downloaded(), 0);
    assert_eq!(again.skipped(), 3);
    assert_eq!(session.get_ref().calls().len(), 3);

    session.close().unwrap();
    assert_eq!(session.state(), SessionState::Closed);
}

#[test]
fn application2_fetches_fixed_files() {
    let (_temp, root) = temp_root();
    let mut session = MockSession::with_files(&[
        ("NIST001.csv", b"a"),
        ("run-order-data.csv", b"b"),
    ]);

    let result =
        app::fetch_application(&mut session, Application::Application2, &root, &NoopSink).unwrap();
    assert_eq!(result.downloaded(), 2);
    assert_eq!(session.calls(), vec!["NIST001.csv", "run-order-data.csv"]);
}
