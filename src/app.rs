use std::time::{Duration, Instant};

use camino::Utf8Path;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::ResolvedConfig;
use crate::domain::{Application, SampleId};
use crate::error::MirrorError;
use crate::manifest;
use crate::mirror::{Mirror, ensure_directory};
use crate::remote::{self, RemoteSession};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchAction {
    Skipped,
    Downloaded,
}

#[derive(Debug, Clone, Serialize)]
pub struct FetchItemResult {
    pub file: String,
    pub remote_path: String,
    pub local_path: String,
    pub action: FetchAction,
    pub bytes: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FetchResult {
    pub items: Vec<FetchItemResult>,
}

impl FetchResult {
    pub fn downloaded(&self) -> usize {
        self.count(FetchAction::Downloaded)
    }

    pub fn skipped(&self) -> usize {
        self.count(FetchAction::Skipped)
    }

    fn count(&self, action: FetchAction) -> usize {
        self.items.iter().filter(|item| item.action == action).count()
    }

    fn extend(&mut self, other: FetchResult) {
        self.items.extend(other.items);
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplicationResult {
    pub application: Application,
    pub host: String,
    pub data_dir: String,
    pub started_at: String,
    pub finished_at: String,
    pub fetch: FetchResult,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

/// Outcome of the existence sweep over a derived file set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Audit {
    pub present: Vec<String>,
    pub missing: Vec<String>,
}

impl Audit {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Splits `files` into those already in `target` and those to download,
/// keeping the input order in both lists.
pub fn audit(target: &Mirror, files: &[String]) -> Audit {
    let (present, missing) = files
        .iter()
        .cloned()
        .partition(|file| target.contains(file));
    Audit { present, missing }
}

/// Fetches `file_name` from the session's working directory into
/// `target_dir` unless a file of that name is already there.
pub fn fetch_if_missing(
    session: &mut dyn RemoteSession,
    file_name: &str,
    target_dir: &Utf8Path,
    sink: &dyn ProgressSink,
) -> Result<FetchItemResult, MirrorError> {
    let target = Mirror::new(target_dir);
    if target.contains(file_name) {
        debug!(file = file_name, "already present, skipping");
        sink.event(ProgressEvent {
            message: format!("phase=Audit; {file_name} found"),
            elapsed: None,
        });
        return Ok(skipped(&target, file_name, file_name));
    }
    sink.event(ProgressEvent {
        message: format!("phase=Audit; {file_name} missing"),
        elapsed: None,
    });
    download(session, file_name, file_name, &target, sink)
}

/// Reads `id_column` from the manifest, derives `<id>.<extension>` and
/// fetches the missing ones from `remote_subdir` into `target_dir`.
///
/// The existence audit runs once up front. When every derived file is present
/// nothing else happens, not even directory creation. Otherwise exactly the
/// missing files are transferred, in manifest order.
pub fn fetch_manifest_driven_set(
    session: &mut dyn RemoteSession,
    manifest_path: &Utf8Path,
    id_column: &str,
    extension: &str,
    remote_subdir: &str,
    target_dir: &Utf8Path,
    sink: &dyn ProgressSink,
) -> Result<FetchResult, MirrorError> {
    let ids = manifest::read_identifiers(manifest_path, id_column)?;
    let files: Vec<String> = ids.iter().map(|id: &SampleId| id.file_name(extension)).collect();
    let target = Mirror::new(target_dir);

    let audit = audit(&target, &files);
    let mut result = FetchResult {
        items: audit
            .present
            .iter()
            .map(|file| skipped(&target, &remote_path(remote_subdir, file), file))
            .collect(),
    };

    if audit.is_complete() {
        sink.event(ProgressEvent {
            message: format!("phase=Audit; all {} files found in {target_dir}", files.len()),
            elapsed: None,
        });
        return Ok(result);
    }

    sink.event(ProgressEvent {
        message: format!(
            "phase=Audit; {} of {} files missing in {target_dir}",
            audit.missing.len(),
            files.len()
        ),
        elapsed: None,
    });
    ensure_directory(target_dir)?;
    for file in &audit.missing {
        let remote = remote_path(remote_subdir, file);
        result.items.push(download(session, &remote, file, &target, sink)?);
    }
    Ok(result)
}

/// Runs a study preset against an open session, rooted at `data_dir`.
pub fn fetch_application(
    session: &mut dyn RemoteSession,
    application: Application,
    data_dir: &Utf8Path,
    sink: &dyn ProgressSink,
) -> Result<FetchResult, MirrorError> {
    if ensure_directory(data_dir)? {
        info!("created {data_dir}");
    }
    let plan = application.plan();
    let mut result = FetchResult::default();
    for file in &plan.files {
        result.items.push(fetch_if_missing(session, file, data_dir, sink)?);
    }
    if let Some(set) = &plan.manifest {
        result.extend(fetch_manifest_driven_set(
            session,
            &data_dir.join(&set.manifest),
            &set.id_column,
            &set.extension,
            &set.remote_subdir,
            &data_dir.join(&set.local_subdir),
            sink,
        )?);
    }
    Ok(result)
}

/// Fetches named files from the remote working directory into `data_dir`.
pub fn fetch_files(
    session: &mut dyn RemoteSession,
    files: &[String],
    data_dir: &Utf8Path,
    sink: &dyn ProgressSink,
) -> Result<FetchResult, MirrorError> {
    ensure_directory(data_dir)?;
    let mut result = FetchResult::default();
    for file in files {
        result.items.push(fetch_if_missing(session, file, data_dir, sink)?);
    }
    Ok(result)
}

/// Connects, runs `application`, and closes the session whether or not the
/// run succeeded.
pub fn run_application(
    config: &ResolvedConfig,
    application: Application,
    sink: &dyn ProgressSink,
) -> Result<ApplicationResult, MirrorError> {
    let started_at = iso_timestamp();
    sink.event(ProgressEvent {
        message: format!(
            "phase=Connect; {}://{}/{}",
            config.remote.transport, config.remote.host, config.remote.remote_dir
        ),
        elapsed: None,
    });
    let mut session = remote::connect(&config.remote)?;
    let fetched = fetch_application(&mut session, application, &config.data_dir, sink);
    let closed = session.close();
    let fetch = fetched?;
    closed?;

    Ok(ApplicationResult {
        application,
        host: config.remote.host.clone(),
        data_dir: config.data_dir.to_string(),
        started_at,
        finished_at: iso_timestamp(),
        fetch,
    })
}

fn download(
    session: &mut dyn RemoteSession,
    remote: &str,
    file_name: &str,
    target: &Mirror,
    sink: &dyn ProgressSink,
) -> Result<FetchItemResult, MirrorError> {
    info!(remote, target = %target.root(), "downloading");
    sink.event(ProgressEvent {
        message: format!("phase=Download; {file_name} into {}", target.root()),
        elapsed: None,
    });
    let start = Instant::now();
    let bytes = target.write_atomic(file_name, |out| session.retrieve(remote, out))?;
    let elapsed = start.elapsed();
    sink.event(ProgressEvent {
        message: format!("phase=Store; {file_name} bytes={bytes}"),
        elapsed: Some(elapsed),
    });
    Ok(FetchItemResult {
        file: file_name.to_string(),
        remote_path: remote.to_string(),
        local_path: target.path_of(file_name).to_string(),
        action: FetchAction::Downloaded,
        bytes,
    })
}

fn skipped(target: &Mirror, remote: &str, file_name: &str) -> FetchItemResult {
    FetchItemResult {
        file: file_name.to_string(),
        remote_path: remote.to_string(),
        local_path: target.path_of(file_name).to_string(),
        action: FetchAction::Skipped,
        bytes: 0,
    }
}

fn remote_path(remote_subdir: &str, file_name: &str) -> String {
    let subdir = remote_subdir.trim_matches('/');
    if subdir.is_empty() {
        file_name.to_string()
    } else {
        format!("{subdir}/{file_name}")
    }
}

fn iso_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}
