//! JUnit XML export of a suite report.

use std::path::Path;

use junit_report::{Duration, ReportBuilder, TestCaseBuilder, TestSuiteBuilder};

use crate::error::HarnessError;
use crate::test::SuiteReport;

/// Writes `report` as a JUnit XML file, one test case per bench run.
pub fn write_junit_xml(report: &SuiteReport, path: &Path) -> Result<(), HarnessError> {
    let test_cases: Vec<_> = report
        .results
        .iter()
        .map(|r| {
            let time = Duration::seconds_f64(r.time_secs);
            match r.verdict.failure() {
                None => TestCaseBuilder::success(&r.name, time),
                Some(failure) => TestCaseBuilder::failure(
                    &r.name,
                    time,
                    "failure",
                    &format!("{failure} ({})", r.verdict.summary()),
                ),
            }
            .build()
        })
        .collect();

    let suite = TestSuiteBuilder::new(&report.name)
        .add_testcases(test_cases)
        .build();
    let xml = ReportBuilder::new().add_testsuite(suite).build();
    let file = std::fs::File::create(path)?;
    xml.write_xml(file)
        .map_err(|e| HarnessError::Report(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::{Failure, RunSummary, Verdict};
    use crate::test::TestResult;

    #[test]
    fn writes_pass_and_failure_cases() {
        let report = SuiteReport {
            name: "hstb".to_string(),
            results: vec![
                TestResult {
                    name: "fifo".to_string(),
                    verdict: Verdict::Pass(RunSummary::default()),
                    time_secs: 0.25,
                },
                TestResult {
                    name: "biased_mux".to_string(),
                    verdict: Verdict::Fail(
                        Failure::DrainIncomplete { expected: 2, backlog: 0 },
                        RunSummary::default(),
                    ),
                    time_secs: 0.5,
                },
            ],
            time_secs: 0.75,
        };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.xml");
        write_junit_xml(&report, &path).unwrap();
        let xml = std::fs::read_to_string(&path).unwrap();
        assert!(xml.contains("testsuite"));
        assert!(xml.contains("name=\"fifo\""));
        assert!(xml.contains("name=\"biased_mux\""));
        assert!(xml.contains("<failure"));
    }
}
