use std::path::{Path, PathBuf};

/// Default number of base64 characters kept from a failure screenshot
pub const SCREENSHOT_LIMIT: usize = 1000;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP port for the relay server
    pub port: u16,

    /// Directory the runner executes in. Relative paths below resolve against it.
    pub workdir: PathBuf,

    /// Working file holding the most recent run request
    pub request_file: PathBuf,

    /// Result tree written by the runner
    pub results_file: PathBuf,

    /// Directory of timestamped archived reports
    pub archive_dir: PathBuf,

    /// Report of the most recent run, overwritten every run
    pub latest_file: PathBuf,

    /// Fallback fixtures used when no run request is present
    pub static_data_file: PathBuf,

    /// Command line used to start the test runner
    pub runner_command: String,

    /// Max base64 characters kept per screenshot
    pub screenshot_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            workdir: PathBuf::from("."),
            request_file: PathBuf::from("current-test-data.json"),
            results_file: PathBuf::from("test-results.json"),
            archive_dir: PathBuf::from("results"),
            latest_file: PathBuf::from("latest-results.json"),
            static_data_file: PathBuf::from("testdata.json"),
            runner_command: "npx playwright test".to_string(),
            screenshot_limit: SCREENSHOT_LIMIT,
        }
    }
}

impl Config {
    /// Default layout rooted at `workdir`
    pub fn with_workdir(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            ..Self::default()
        }
    }

    /// Resolve a configured path against the working directory
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workdir.join(path)
        }
    }

    pub fn request_path(&self) -> PathBuf {
        self.resolve(&self.request_file)
    }

    pub fn results_path(&self) -> PathBuf {
        self.resolve(&self.results_file)
    }

    pub fn archive_path(&self) -> PathBuf {
        self.resolve(&self.archive_dir)
    }

    pub fn latest_path(&self) -> PathBuf {
        self.resolve(&self.latest_file)
    }

    pub fn static_data_path(&self) -> PathBuf {
        self.resolve(&self.static_data_file)
    }
}
