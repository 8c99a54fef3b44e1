//! Test runner and statistics

use std::path::Path;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::FixtureConfig;
use crate::error::{TestError, TestResult};
use crate::state_test::StateTestRunner;
use crate::types::{StateTestFile, VmTestFile};
use crate::vm_test::VmTestRunner;

/// Results of one fixture file
#[derive(Debug, Default)]
pub struct FileResults {
    /// File path
    pub file: String,
    /// Passed tests
    pub passed: Vec<String>,
    /// Failed tests (name, reason)
    pub failed: Vec<(String, String)>,
    /// Skipped tests (name, reason)
    pub skipped: Vec<(String, String)>,
}

impl FileResults {
    /// Empty results for `file`
    pub fn new(file: String) -> Self {
        Self {
            file,
            ..Self::default()
        }
    }

    /// Tests that ran
    pub fn executed(&self) -> usize {
        self.passed.len() + self.failed.len()
    }

    /// Tests including skipped ones
    pub fn total(&self) -> usize {
        self.executed() + self.skipped.len()
    }

    pub(crate) fn record(&mut self, name: String, result: TestResult<()>) {
        match result {
            Ok(()) => {
                info!(test = %name, "PASS");
                self.passed.push(name);
            }
            Err(e) => {
                warn!(test = %name, error = %e, "FAIL");
                self.failed.push((name, e.to_string()));
            }
        }
    }
}

/// Aggregated test statistics
#[derive(Debug, Default)]
pub struct TestStats {
    /// Total tests seen
    pub total: usize,
    /// Tests passed
    pub passed: usize,
    /// Tests failed
    pub failed: usize,
    /// Tests skipped
    pub skipped: usize,
    /// Total execution time
    pub duration: Duration,
    /// Failed test names with reasons
    pub failures: Vec<(String, String)>,
}

impl TestStats {
    /// Create empty stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold in the results of one file
    pub fn add_results(&mut self, results: &FileResults) {
        self.total += results.total();
        self.passed += results.passed.len();
        self.failed += results.failed.len();
        self.skipped += results.skipped.len();
        for (name, reason) in &results.failed {
            self.failures.push((format!("{}::{}", results.file, name), reason.clone()));
        }
    }

    /// Pass rate as percentage
    pub fn pass_rate(&self) -> f64 {
        let executed = self.passed + self.failed;
        if executed == 0 {
            return 100.0;
        }
        (self.passed as f64 / executed as f64) * 100.0
    }

    /// No test failed
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Print summary
    pub fn print_summary(&self) {
        println!("\n========================================");
        println!("Test Summary");
        println!("========================================");
        println!("Total:   {}", self.total);
        println!("Passed:  {}", self.passed);
        println!("Failed:  {}", self.failed);
        println!("Skipped: {}", self.skipped);
        println!("Pass Rate: {:.2}%", self.pass_rate());
        println!("Duration: {:.2}s", self.duration.as_secs_f64());

        if !self.failures.is_empty() {
            println!("\nFailed tests:");
            for (name, reason) in &self.failures {
                println!("  - {}: {}", name, reason);
            }
        }
    }
}

/// Fixture format, told apart by the fields of the first case
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FixtureKind {
    /// Single frame run in the interpreter
    Vm,
    /// Signed transaction run through the state transition
    State,
}

impl FixtureKind {
    /// Kind of a parsed fixture file; `None` for anything else
    pub fn detect(file: &Value) -> Option<Self> {
        let case = file.as_object()?.values().next()?.as_object()?;
        if case.contains_key("exec") {
            Some(FixtureKind::Vm)
        } else if case.contains_key("transaction") {
            Some(FixtureKind::State)
        } else {
            None
        }
    }
}

/// Runs every fixture under a path
pub struct TestRunner {
    config: FixtureConfig,
    vm_runner: VmTestRunner,
    state_runner: StateTestRunner,
}

impl TestRunner {
    /// Create a runner for `config`
    pub fn new(config: FixtureConfig) -> Self {
        Self {
            vm_runner: VmTestRunner::new(config.rules.clone()),
            state_runner: StateTestRunner::new(config.rules.clone(), config.fork.as_deref()),
            config,
        }
    }

    /// Run a single fixture file, or every `.json` file below a directory
    pub fn run_path(&self, path: &Path) -> TestResult<TestStats> {
        let mut stats = TestStats::new();
        let start = Instant::now();

        info!(path = %path.display(), fork = ?self.config.fork, "running fixtures");
        if std::fs::metadata(path)?.is_dir() {
            self.run_dir(path, &mut stats)?;
        } else {
            self.run_one(path, &mut stats);
        }

        stats.duration = start.elapsed();
        Ok(stats)
    }

    fn run_dir(&self, dir: &Path, stats: &mut TestStats) -> TestResult<()> {
        let mut entries = std::fs::read_dir(dir)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<Result<Vec<_>, _>>()?;
        entries.sort();

        for path in entries {
            if path.is_dir() {
                self.run_dir(&path, stats)?;
            } else if path.extension().is_some_and(|e| e == "json") {
                self.run_one(&path, stats);
            }
        }
        Ok(())
    }

    fn run_one(&self, path: &Path, stats: &mut TestStats) {
        match self.run_file(path) {
            Ok(results) => {
                if !results.failed.is_empty() {
                    warn!(
                        file = %path.display(),
                        passed = results.passed.len(),
                        failed = results.failed.len(),
                        "file has failures"
                    );
                }
                stats.add_results(&results);
            }
            Err(TestError::Unsupported(reason)) => {
                debug!(file = %path.display(), %reason, "not a fixture");
            }
            Err(e) => {
                warn!(file = %path.display(), error = %e, "could not load fixture");
                stats.total += 1;
                stats.failed += 1;
                stats.failures.push((path.display().to_string(), e.to_string()));
            }
        }
    }

    /// Parse and run one fixture file
    pub fn run_file(&self, path: &Path) -> TestResult<FileResults> {
        let content = std::fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&content)?;
        if value.as_object().is_some_and(|cases| cases.is_empty()) {
            return Ok(FileResults::new(path.display().to_string()));
        }

        let filter = |name: &str| self.config.matches(name);
        match FixtureKind::detect(&value) {
            Some(FixtureKind::Vm) => {
                let tests: VmTestFile = serde_json::from_value(value)?;
                Ok(self.vm_runner.run_file(path, &tests, filter))
            }
            Some(FixtureKind::State) => {
                let tests: StateTestFile = serde_json::from_value(value)?;
                Ok(self.state_runner.run_file(path, &tests, filter))
            }
            None => Err(TestError::Unsupported(format!("{} is not a VM or state test", path.display()))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stats_pass_rate() {
        let mut stats = TestStats::new();
        stats.passed = 90;
        stats.failed = 10;
        assert!((stats.pass_rate() - 90.0).abs() < 0.01);
        assert!(!stats.is_success());
    }

    #[test]
    fn test_stats_empty() {
        let stats = TestStats::new();
        assert_eq!(stats.pass_rate(), 100.0);
        assert!(stats.is_success());
    }

    #[test]
    fn test_add_results() {
        let mut results = FileResults::new("a.json".into());
        results.passed.push("ok".into());
        results.failed.push(("bad".into(), "gas mismatch".into()));
        results.skipped.push(("later".into(), "fork".into()));

        let mut stats = TestStats::new();
        stats.add_results(&results);
        assert_eq!((stats.total, stats.passed, stats.failed, stats.skipped), (3, 1, 1, 1));
        assert_eq!(stats.failures[0].0, "a.json::bad");
    }

    #[test]
    fn test_detect_kind() {
        assert_eq!(FixtureKind::detect(&json!({"t": {"exec": {}, "env": {}}})), Some(FixtureKind::Vm));
        assert_eq!(FixtureKind::detect(&json!({"t": {"transaction": {}}})), Some(FixtureKind::State));
        assert_eq!(FixtureKind::detect(&json!({"t": {"blocks": []}})), None);
        assert_eq!(FixtureKind::detect(&json!([1, 2])), None);
    }

    #[test]
    fn test_missing_path_is_an_error() {
        let runner = TestRunner::new(FixtureConfig::for_fork("frontier").unwrap());
        assert!(matches!(
            runner.run_path(Path::new("/nonexistent/fixtures")),
            Err(TestError::Io(_))
        ));
    }

    #[test]
    fn test_run_directory() {
        let dir = std::env::temp_dir().join(format!("ember-fixtures-{}", std::process::id()));
        std::fs::create_dir_all(dir.join("nested")).unwrap();
        let vm = json!({
            "push": {
                "env": {
                    "currentCoinbase": "2adc25665018aa1fe0e6bc666dac8fc2697ff9ba",
                    "currentDifficulty": "0x0100",
                    "currentGasLimit": "0x0f4240",
                    "currentNumber": "0x00",
                    "currentTimestamp": "0x01"
                },
                "exec": {
                    "address": "0x0f572e5295c57f15886f9b263e2f6d2d6c7b5ec6",
                    "caller": "0xcd1722f3947def4cf144679da39c4c32bdc35681",
                    "code": "0x6001",
                    "data": "0x",
                    "gas": "0x64",
                    "gasPrice": "0x01",
                    "origin": "0xcd1722f3947def4cf144679da39c4c32bdc35681",
                    "value": "0x00"
                },
                "gas": "0x61",
                "out": "0x",
                "pre": {}
            }
        });
        std::fs::write(dir.join("nested").join("push.json"), vm.to_string()).unwrap();
        std::fs::write(dir.join("notes.json"), r#"{"readme": {"text": "filler"}}"#).unwrap();
        std::fs::write(dir.join("broken.json"), "{").unwrap();

        let runner = TestRunner::new(FixtureConfig::for_fork("frontier").unwrap());
        let stats = runner.run_path(&dir).unwrap();
        std::fs::remove_dir_all(&dir).unwrap();

        assert_eq!(stats.passed, 1);
        // the unparsable file counts as one failure, the filler is ignored
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.total, 2);
    }
}
