// system-tests/tests/helpers/artifacts.rs
// ============================================================================
// Module: Test Artifacts
// Description: Per-test artifact directories and run summaries.
// Purpose: Record outcome, target, screenshots, and artifacts of each test.
// Dependencies: system-tests, serde, serde_jcs
// ============================================================================

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::time::Instant;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;
use system_tests::config::HarnessConfig;

/// Files the reporter writes itself.
const SUMMARY_FILES: [&str; 2] = ["summary.json", "summary.md"];
/// Directory under the test root that receives UI failure screenshots.
const SCREENSHOT_DIR: &str = "screenshots";

// ============================================================================
// SECTION: Summary
// ============================================================================

#[derive(Debug, Serialize)]
struct ArtifactEntry {
    name: String,
    present: bool,
}

#[derive(Debug, Serialize)]
struct TestSummary {
    test: String,
    status: String,
    target: String,
    started_at_ms: u128,
    duration_ms: u128,
    notes: Vec<String>,
    artifacts: Vec<ArtifactEntry>,
    screenshots: Vec<String>,
}

impl TestSummary {
    fn markdown(&self) -> String {
        let mut out = format!("# {}\n\n", self.test);
        out.push_str("| Field | Value |\n|---|---|\n");
        let _ = writeln!(out, "| Status | {} |", self.status);
        let _ = writeln!(out, "| Target | {} |", self.target);
        let _ = writeln!(out, "| Duration (ms) | {} |", self.duration_ms);
        for note in &self.notes {
            let _ = writeln!(out, "| Note | {note} |");
        }
        for artifact in &self.artifacts {
            let state = if artifact.present { "written" } else { "missing" };
            let _ = writeln!(out, "| Artifact | {} ({state}) |", artifact.name);
        }
        for shot in &self.screenshots {
            let _ = writeln!(out, "| Screenshot | {shot} |");
        }
        out
    }
}

fn epoch_millis() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

// ============================================================================
// SECTION: Artifacts
// ============================================================================

/// Artifact directory for a single suite test.
#[derive(Debug, Clone)]
pub struct TestArtifacts {
    root: PathBuf,
}

impl TestArtifacts {
    /// Creates the artifact root for a test.
    ///
    /// `DATAKWIP_RUN_ROOT` is shared by every test, so the test name is
    /// appended; without it each test gets a timestamped directory under
    /// `target/system-tests`.
    pub fn new(test_name: &str) -> io::Result<Self> {
        let config = HarnessConfig::load().map_err(io::Error::other)?;
        let base = config.run_root.unwrap_or_else(|| {
            PathBuf::from("target/system-tests").join(format!("run_{}", epoch_millis()))
        });
        let root = base.join(test_name);
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
        })
    }

    /// Returns the root directory for the test artifacts.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the directory handed to the UI client for failure screenshots.
    pub fn screenshot_dir(&self) -> PathBuf {
        self.root.join(SCREENSHOT_DIR)
    }

    /// Writes a JSON artifact using canonical JCS serialization.
    pub fn write_json<T: Serialize>(&self, name: &str, value: &T) -> io::Result<PathBuf> {
        let bytes = serde_jcs::to_vec(value).map_err(|err| io::Error::other(err.to_string()))?;
        self.write_bytes(name, &bytes)
    }

    /// Writes a UTF-8 text artifact.
    pub fn write_text(&self, name: &str, value: &str) -> io::Result<PathBuf> {
        self.write_bytes(name, value.as_bytes())
    }

    fn write_bytes(&self, name: &str, bytes: &[u8]) -> io::Result<PathBuf> {
        let path = self.root.join(name);
        fs::write(&path, bytes)?;
        Ok(path)
    }

    /// Lists captured screenshots relative to the test root, sorted by name.
    fn screenshots(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(self.screenshot_dir()) else {
            return Vec::new();
        };
        let mut shots: Vec<String> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".png"))
            .map(|name| format!("{SCREENSHOT_DIR}/{name}"))
            .collect();
        shots.sort();
        shots
    }

    fn entry(&self, name: String) -> ArtifactEntry {
        let present = SUMMARY_FILES.contains(&name.as_str()) || self.root.join(&name).exists();
        ArtifactEntry {
            name,
            present,
        }
    }
}

// ============================================================================
// SECTION: Reporter
// ============================================================================

/// Writes `summary.json` and `summary.md` for a test, even when it panics.
pub struct TestReporter {
    artifacts: TestArtifacts,
    test: String,
    target: String,
    started_at_ms: u128,
    started: Instant,
    finalized: bool,
}

impl TestReporter {
    /// Creates a reporter for the named test.
    pub fn new(test_name: &str) -> io::Result<Self> {
        Ok(Self {
            artifacts: TestArtifacts::new(test_name)?,
            test: test_name.to_string(),
            target: "unresolved".to_string(),
            started_at_ms: epoch_millis(),
            started: Instant::now(),
            finalized: false,
        })
    }

    /// Returns the artifact directory.
    pub fn artifacts(&self) -> &TestArtifacts {
        &self.artifacts
    }

    /// Records which deployment (`stub` or `live`) the test ran against.
    pub fn set_target(&mut self, target: &str) {
        target.clone_into(&mut self.target);
    }

    /// Writes the final summary. Screenshots found on disk are listed even
    /// when the test did not name them.
    pub fn finish(
        &mut self,
        status: &str,
        notes: Vec<String>,
        artifacts: Vec<String>,
    ) -> io::Result<()> {
        let summary = TestSummary {
            test: self.test.clone(),
            status: status.to_string(),
            target: self.target.clone(),
            started_at_ms: self.started_at_ms,
            duration_ms: self.started.elapsed().as_millis(),
            notes,
            artifacts: artifacts.into_iter().map(|name| self.artifacts.entry(name)).collect(),
            screenshots: self.artifacts.screenshots(),
        };
        self.artifacts.write_json(SUMMARY_FILES[0], &summary)?;
        self.artifacts.write_text(SUMMARY_FILES[1], &summary.markdown())?;
        self.finalized = true;
        Ok(())
    }
}

impl Drop for TestReporter {
    fn drop(&mut self) {
        if self.finalized {
            return;
        }
        let status = if std::thread::panicking() { "panic" } else { "abandoned" };
        let _ = self.finish(status, vec!["no summary recorded before exit".to_string()], Vec::new());
    }
}
