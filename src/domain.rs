use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::MirrorError;

/// Wire transport used to reach the remote archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    #[default]
    Ftp,
    Https,
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::Ftp => write!(f, "ftp"),
            Transport::Https => write!(f, "https"),
        }
    }
}

/// A manifest identifier that is safe to use as a file stem.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SampleId(String);

impl SampleId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn file_name(&self, extension: &str) -> String {
        let extension = extension.trim_start_matches('.');
        if extension.is_empty() {
            return self.0.clone();
        }
        format!("{}.{extension}", self.0)
    }
}

impl fmt::Display for SampleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SampleId {
    type Err = MirrorError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let is_valid = !trimmed.is_empty()
            && trimmed != "."
            && trimmed != ".."
            && !trimmed
                .chars()
                .any(|ch| ch == '/' || ch == '\\' || ch.is_control());
        if !is_valid {
            return Err(MirrorError::UnsafeIdentifier(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

/// Fixed fetch plans shipped with the MTBLS1919 study.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Application {
    Application1,
    Application2,
}

impl Application {
    pub fn plan(&self) -> FetchPlan {
        match self {
            Application::Application1 => FetchPlan {
                files: vec!["sample_list.csv".to_string()],
                manifest: Some(ManifestSet {
                    manifest: "sample_list.csv".to_string(),
                    id_column: "id".to_string(),
                    extension: "mzML".to_string(),
                    remote_subdir: "Centroid_data".to_string(),
                    local_subdir: "cent".to_string(),
                }),
            },
            Application::Application2 => FetchPlan {
                files: vec!["NIST001.csv".to_string(), "run-order-data.csv".to_string()],
                manifest: None,
            },
        }
    }
}

impl fmt::Display for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Application::Application1 => write!(f, "application1"),
            Application::Application2 => write!(f, "application2"),
        }
    }
}

/// Files fetched straight into the data directory, then an optional
/// manifest-driven set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchPlan {
    pub files: Vec<String>,
    pub manifest: Option<ManifestSet>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestSet {
    /// Manifest filename relative to the data directory.
    pub manifest: String,
    pub id_column: String,
    pub extension: String,
    pub remote_subdir: String,
    pub local_subdir: String,
}
