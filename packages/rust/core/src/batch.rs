//! CSV batch driver: input rows → melt calculator → annotated output rows.
//!
//! Rows are processed strictly in order, one remote call at a time. Every
//! output row is flushed as soon as it is written so an interrupted run keeps
//! everything computed so far.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::time::{Duration, Instant};

use oligocalc_client::Calculator;
use oligocalc_shared::{
    ConcentrationParameters, OligoCalcError, Result, RowErrorPolicy, ThermoField,
    ThermodynamicResult,
};
use tracing::{error, info, instrument, warn};

// ---------------------------------------------------------------------------
// Options and results
// ---------------------------------------------------------------------------

/// Configuration for a batch run.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Solution conditions sent with every row.
    pub params: ConcentrationParameters,
    /// What to do when a row fails.
    pub on_error: RowErrorPolicy,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            params: ConcentrationParameters::primer(),
            on_error: RowErrorPolicy::Abort,
        }
    }
}

/// A row left out of the output under [`RowErrorPolicy::Skip`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    /// 1-based line number in the input file.
    pub line: usize,
    /// Rendered error.
    pub error: String,
}

/// Summary of a completed batch run.
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    /// Data rows read (header excluded).
    pub rows_read: usize,
    /// Rows written with results appended.
    pub rows_written: usize,
    /// Rows that failed and were skipped.
    pub skipped: Vec<SkippedRow>,
    /// Wall time of the run.
    pub elapsed: Duration,
}

/// Progress callback for reporting batch status.
pub trait BatchProgress: Send + Sync {
    /// Called before the remote call for a row.
    fn row_started(&self, line: usize, sequence: &str);
    /// Called after a row's output has been written.
    fn row_finished(&self, line: usize, result: &ThermodynamicResult);
    /// Called when a row fails under the skip policy.
    fn row_skipped(&self, line: usize, error: &OligoCalcError);
    /// Called when the run completes.
    fn done(&self, summary: &BatchSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl BatchProgress for SilentProgress {
    fn row_started(&self, _line: usize, _sequence: &str) {}
    fn row_finished(&self, _line: usize, _result: &ThermodynamicResult) {}
    fn row_skipped(&self, _line: usize, _error: &OligoCalcError) {}
    fn done(&self, _summary: &BatchSummary) {}
}

// ---------------------------------------------------------------------------
// BatchDriver
// ---------------------------------------------------------------------------

/// Runs a calculator over every row of a sequence table.
pub struct BatchDriver<'a, C> {
    calculator: &'a C,
    options: BatchOptions,
    progress: &'a dyn BatchProgress,
}

impl<'a, C: Calculator> BatchDriver<'a, C> {
    /// Create a driver.
    pub fn new(calculator: &'a C, options: BatchOptions, progress: &'a dyn BatchProgress) -> Self {
        Self {
            calculator,
            options,
            progress,
        }
    }

    /// Process `input` into `output`, creating or truncating the output file.
    ///
    /// Fails without touching either file when both paths name the same file.
    #[instrument(skip_all, fields(input = %input.display(), output = %output.display()))]
    pub async fn run(&self, input: &Path, output: &Path) -> Result<BatchSummary> {
        let reader = File::open(input)
            .map(BufReader::new)
            .map_err(|e| OligoCalcError::io(input, e))?;

        if let (Ok(src), Ok(dst)) = (std::fs::canonicalize(input), std::fs::canonicalize(output)) {
            if src == dst {
                return Err(OligoCalcError::validation(format!(
                    "input and output must differ: {}",
                    src.display()
                )));
            }
        }

        let writer = File::create(output)
            .map(BufWriter::new)
            .map_err(|e| OligoCalcError::io(output, e))?;

        self.process(reader, input, writer, output).await
    }

    /// Process rows from `reader` into `writer`.
    ///
    /// `input` and `output` label I/O errors.
    pub async fn process<R: BufRead, W: Write>(
        &self,
        reader: R,
        input: &Path,
        mut writer: W,
        output: &Path,
    ) -> Result<BatchSummary> {
        let start = Instant::now();
        let mut lines = reader.split(b'\n');

        let header = match lines.next() {
            Some(bytes) => decode_line(bytes.map_err(|e| OligoCalcError::io(input, e))?, 1)?,
            None => {
                return Err(OligoCalcError::validation(format!(
                    "{} has no header line",
                    input.display()
                )));
            }
        };

        write_line(&mut writer, &format_header(&header), output)?;

        info!(
            policy = %self.options.on_error,
            oligo = self.options.params.oligo,
            target = self.options.params.target,
            na = self.options.params.na,
            mg = self.options.params.mg,
            dntp = self.options.params.dntp,
            "starting batch"
        );

        let mut summary = BatchSummary::default();

        // Header is line 1.
        for (line_no, bytes) in (2..).zip(lines) {
            let bytes = bytes.map_err(|e| OligoCalcError::io(input, e))?;
            summary.rows_read += 1;

            let outcome = match decode_line(bytes, line_no) {
                Ok(line) => self.process_row(&line, line_no).await,
                Err(e) => Err(e),
            };

            match outcome {
                Ok((row, result)) => {
                    write_line(&mut writer, &row, output)?;
                    summary.rows_written += 1;
                    self.progress.row_finished(line_no, &result);
                }
                Err(e) => match self.options.on_error {
                    RowErrorPolicy::Abort => {
                        error!(line = line_no, policy = "abort", error = %e, "row failed, aborting batch");
                        return Err(e);
                    }
                    RowErrorPolicy::Skip => {
                        warn!(line = line_no, policy = "skip", error = %e, "row failed, skipping");
                        self.progress.row_skipped(line_no, &e);
                        summary.skipped.push(SkippedRow {
                            line: line_no,
                            error: e.to_string(),
                        });
                    }
                },
            }
        }

        summary.elapsed = start.elapsed();

        info!(
            rows_read = summary.rows_read,
            rows_written = summary.rows_written,
            rows_skipped = summary.skipped.len(),
            duration_ms = summary.elapsed.as_millis() as u64,
            "batch completed"
        );

        self.progress.done(&summary);
        Ok(summary)
    }

    async fn process_row(
        &self,
        line: &str,
        line_no: usize,
    ) -> Result<(String, ThermodynamicResult)> {
        let sequence = parse_sequence(line, line_no)?;
        self.progress.row_started(line_no, sequence);

        let result = self
            .calculator
            .compute(sequence, &self.options.params)
            .await?;

        Ok((format_row(line, &result), result))
    }
}

/// Run a batch from `input` to `output` in one call.
pub async fn run_batch<C: Calculator>(
    input: &Path,
    output: &Path,
    calculator: &C,
    options: BatchOptions,
    progress: &dyn BatchProgress,
) -> Result<BatchSummary> {
    BatchDriver::new(calculator, options, progress)
        .run(input, output)
        .await
}

// ---------------------------------------------------------------------------
// Row handling
// ---------------------------------------------------------------------------

/// Extract the sequence from a data line: the first comma-delimited field
/// with its surrounding double quotes removed.
pub fn parse_sequence(line: &str, line_no: usize) -> Result<&str> {
    let Some((first, _rest)) = line.split_once(',') else {
        return Err(OligoCalcError::malformed_row(
            line_no,
            "no comma-delimited fields",
        ));
    };

    let field = first.trim();
    let sequence = field
        .strip_prefix('"')
        .and_then(|f| f.strip_suffix('"'))
        .unwrap_or(field)
        .trim();

    if sequence.is_empty() {
        return Err(OligoCalcError::malformed_row(line_no, "empty sequence"));
    }

    Ok(sequence)
}

/// Header line with the four quoted result columns appended.
pub fn format_header(header: &str) -> String {
    let mut out = header.trim_end().to_string();
    for field in ThermoField::ALL {
        out.push_str(",\"");
        out.push_str(field.label());
        out.push('"');
    }
    out
}

/// Data line with Tm, dG, dH and dS appended.
pub fn format_row(line: &str, result: &ThermodynamicResult) -> String {
    let mut out = line.trim_end().to_string();
    for field in ThermoField::ALL {
        out.push(',');
        out.push_str(&format_value(result.get(field)));
    }
    out
}

/// Decimal text that always carries a fractional part (`-6.0`, `26.66`).
pub fn format_value(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

/// Line bytes without the terminator; undecodable text is a malformed row.
fn decode_line(mut bytes: Vec<u8>, line_no: usize) -> Result<String> {
    if bytes.last() == Some(&b'\r') {
        bytes.pop();
    }
    String::from_utf8(bytes)
        .map_err(|_| OligoCalcError::malformed_row(line_no, "line is not valid UTF-8"))
}

fn write_line<W: Write>(writer: &mut W, line: &str, path: &Path) -> Result<()> {
    writeln!(writer, "{line}")
        .and_then(|()| writer.flush())
        .map_err(|e| OligoCalcError::io(path, e))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    // -----------------------------------------------------------------------
    // Stub calculator
    // -----------------------------------------------------------------------

    struct StubCalculator {
        results: HashMap<String, ThermodynamicResult>,
        calls: Mutex<Vec<(String, ConcentrationParameters)>>,
    }

    impl StubCalculator {
        fn new() -> Self {
            let mut results = HashMap::new();
            results.insert(
                "AAAAAAAAAAAAAAAA".to_string(),
                ThermodynamicResult {
                    tm: 26.66,
                    dg: -6.0,
                    dh: -112.7,
                    ds: -344.1,
                },
            );
            results.insert(
                "ATTGCTGATGCGGGATTAGCTGATGTAG".to_string(),
                ThermodynamicResult {
                    tm: 60.45,
                    dg: -25.34,
                    dh: -212.4,
                    ds: -603.1,
                },
            );
            Self {
                results,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl Calculator for StubCalculator {
        async fn compute(
            &self,
            sequence: &str,
            params: &ConcentrationParameters,
        ) -> Result<ThermodynamicResult> {
            self.calls
                .lock()
                .unwrap()
                .push((sequence.to_string(), *params));
            self.results
                .get(&sequence.to_uppercase())
                .copied()
                .ok_or(OligoCalcError::Extraction {
                    field: ThermoField::Tm,
                })
        }
    }

    const INPUT: &str = "\"Sequence\",\"Name\",\"Strand\"\n\
                         \"AAAAAAAAAAAAAAAA\",\"polyA\",\"+\"\n\
                         \"ATTGCTGATGCGGGATTAGCTGATGTAG\",\"amp_12\",\"-\"\n";

    async fn process_str(
        calc: &StubCalculator,
        input: &str,
        options: BatchOptions,
    ) -> (Result<BatchSummary>, String) {
        let mut out = Vec::new();
        let driver = BatchDriver::new(calc, options, &SilentProgress);
        let result = driver
            .process(
                input.as_bytes(),
                Path::new("input.csv"),
                &mut out,
                Path::new("output.csv"),
            )
            .await;
        (result, String::from_utf8(out).unwrap())
    }

    fn skip_options() -> BatchOptions {
        BatchOptions {
            on_error: RowErrorPolicy::Skip,
            ..BatchOptions::default()
        }
    }

    // -----------------------------------------------------------------------
    // Row helpers
    // -----------------------------------------------------------------------

    #[test]
    fn test_parse_sequence_strips_quotes() {
        assert_eq!(parse_sequence("\"ACGT\",x", 2).unwrap(), "ACGT");
        assert_eq!(parse_sequence("ACGT,x,y", 2).unwrap(), "ACGT");
        assert_eq!(parse_sequence(" \"acgt\" ,x", 2).unwrap(), "acgt");
    }

    #[test]
    fn test_parse_sequence_malformed() {
        for line in ["", "ACGT", "\"ACGT\"", "no comma here"] {
            match parse_sequence(line, 4) {
                Err(OligoCalcError::MalformedRow { line: 4, .. }) => {}
                other => panic!("expected MalformedRow for {line:?}, got {other:?}"),
            }
        }
        assert!(matches!(
            parse_sequence("\"\",x", 3),
            Err(OligoCalcError::MalformedRow { line: 3, .. })
        ));
        assert!(matches!(
            parse_sequence(",x", 3),
            Err(OligoCalcError::MalformedRow { .. })
        ));
    }

    #[test]
    fn test_format_header() {
        assert_eq!(
            format_header("\"Sequence\",\"Name\"\r"),
            "\"Sequence\",\"Name\",\"Tm\",\"dG\",\"dH\",\"dS\""
        );
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(26.66), "26.66");
        assert_eq!(format_value(-6.0), "-6.0");
        assert_eq!(format_value(100.0), "100.0");
        assert_eq!(format_value(-25.34), "-25.34");
    }

    #[test]
    fn test_format_row_appends_in_order() {
        let r = ThermodynamicResult {
            tm: 60.45,
            dg: -25.34,
            dh: -212.4,
            ds: -603.1,
        };
        assert_eq!(
            format_row("\"ACGT\",\"amp\"\r", &r),
            "\"ACGT\",\"amp\",60.45,-25.34,-212.4,-603.1"
        );
    }

    // -----------------------------------------------------------------------
    // Driver
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_process_appends_results() {
        let calc = StubCalculator::new();
        let (result, out) = process_str(&calc, INPUT, BatchOptions::default()).await;
        let summary = result.unwrap();

        assert_eq!(summary.rows_read, 2);
        assert_eq!(summary.rows_written, 2);
        assert!(summary.skipped.is_empty());

        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            lines,
            [
                "\"Sequence\",\"Name\",\"Strand\",\"Tm\",\"dG\",\"dH\",\"dS\"",
                "\"AAAAAAAAAAAAAAAA\",\"polyA\",\"+\",26.66,-6.0,-112.7,-344.1",
                "\"ATTGCTGATGCGGGATTAGCTGATGTAG\",\"amp_12\",\"-\",60.45,-25.34,-212.4,-603.1",
            ]
        );
    }

    #[tokio::test]
    async fn test_output_row_is_input_plus_four_values() {
        let calc = StubCalculator::new();
        let (result, out) = process_str(&calc, INPUT, BatchOptions::default()).await;
        result.unwrap();

        for (input_line, output_line) in INPUT.lines().skip(1).zip(out.lines().skip(1)) {
            let appended = output_line
                .strip_prefix(input_line)
                .expect("output row starts with input row");
            let values: Vec<&str> = appended
                .strip_prefix(',')
                .expect("separator")
                .split(',')
                .collect();
            assert_eq!(values.len(), 4);
            for v in values {
                v.parse::<f64>().expect("decimal value");
            }
        }
    }

    #[tokio::test]
    async fn test_uses_primer_preset_and_calls_every_row() {
        let calc = StubCalculator::new();
        let input = format!("{INPUT}\"AAAAAAAAAAAAAAAA\",\"polyA-dup\",\"+\"\n");
        let (result, _) = process_str(&calc, &input, BatchOptions::default()).await;
        result.unwrap();

        let calls = calc.calls.lock().unwrap();
        // No dedupe: the repeated sequence is computed again.
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].0, "AAAAAAAAAAAAAAAA");
        assert!(
            calls
                .iter()
                .all(|(_, p)| *p == ConcentrationParameters::primer())
        );
    }

    #[tokio::test]
    async fn test_custom_params_are_forwarded() {
        let calc = StubCalculator::new();
        let params = ConcentrationParameters {
            mg: 3.0,
            ..ConcentrationParameters::primer()
        };
        let options = BatchOptions {
            params,
            ..BatchOptions::default()
        };
        let (result, _) = process_str(&calc, INPUT, options).await;
        result.unwrap();

        assert!(calc.calls.lock().unwrap().iter().all(|(_, p)| p.mg == 3.0));
    }

    #[tokio::test]
    async fn test_empty_input_is_validation_error() {
        let calc = StubCalculator::new();
        let (result, out) = process_str(&calc, "", BatchOptions::default()).await;
        assert!(matches!(result, Err(OligoCalcError::Validation { .. })));
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_header_only_input() {
        let calc = StubCalculator::new();
        let (result, out) = process_str(&calc, "\"Sequence\"\n", BatchOptions::default()).await;
        let summary = result.unwrap();
        assert_eq!(summary.rows_read, 0);
        assert_eq!(out, "\"Sequence\",\"Tm\",\"dG\",\"dH\",\"dS\"\n");
        assert_eq!(calc.call_count(), 0);
    }

    #[tokio::test]
    async fn test_malformed_row_aborts_by_default() {
        let calc = StubCalculator::new();
        let input = "\"Sequence\",\"Name\"\n\
                     \"AAAAAAAAAAAAAAAA\",\"polyA\"\n\
                     no-comma-here\n\
                     \"ATTGCTGATGCGGGATTAGCTGATGTAG\",\"amp_12\"\n";
        let (result, out) = process_str(&calc, input, BatchOptions::default()).await;

        match result {
            Err(OligoCalcError::MalformedRow { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected MalformedRow, got {other:?}"),
        }
        // Rows before the failure are kept; nothing after it is attempted.
        assert_eq!(out.lines().count(), 2);
        assert_eq!(calc.call_count(), 1);
        assert!(!out.contains(",,"));
    }

    #[tokio::test]
    async fn test_malformed_row_skipped_under_skip_policy() {
        let calc = StubCalculator::new();
        let input = "\"Sequence\",\"Name\"\n\
                     no-comma-here\n\
                     \n\
                     \"ATTGCTGATGCGGGATTAGCTGATGTAG\",\"amp_12\"\n";
        let (result, out) = process_str(&calc, input, skip_options()).await;
        let summary = result.unwrap();

        assert_eq!(summary.rows_read, 3);
        assert_eq!(summary.rows_written, 1);
        let skipped_lines: Vec<usize> = summary.skipped.iter().map(|s| s.line).collect();
        assert_eq!(skipped_lines, [2, 3]);
        assert!(summary.skipped[0].error.contains("malformed row"));

        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("\"ATTGCTGATGCGGGATTAGCTGATGTAG\""));
    }

    #[tokio::test]
    async fn test_calculator_error_policies() {
        let input = "\"Sequence\",\"Name\"\n\
                     \"GGGGCCCC\",\"unknown\"\n\
                     \"AAAAAAAAAAAAAAAA\",\"polyA\"\n";

        let calc = StubCalculator::new();
        let (result, out) = process_str(&calc, input, BatchOptions::default()).await;
        assert!(matches!(result, Err(OligoCalcError::Extraction { .. })));
        assert_eq!(out.lines().count(), 1);

        let calc = StubCalculator::new();
        let (result, out) = process_str(&calc, input, skip_options()).await;
        let summary = result.unwrap();
        assert_eq!(summary.skipped.len(), 1);
        assert_eq!(summary.skipped[0].line, 2);
        assert_eq!(out.lines().count(), 2);
    }

    /// Records what had been written each time the driver flushed.
    #[derive(Default)]
    struct FlushRecorder {
        data: Vec<u8>,
        flushed: Vec<String>,
    }

    impl Write for FlushRecorder {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            self.flushed
                .push(String::from_utf8(self.data.clone()).expect("utf-8 output"));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_each_row_is_flushed_as_written() {
        let calc = StubCalculator::new();
        let mut recorder = FlushRecorder::default();
        let driver = BatchDriver::new(&calc, BatchOptions::default(), &SilentProgress);
        let summary = driver
            .process(
                INPUT.as_bytes(),
                Path::new("input.csv"),
                &mut recorder,
                Path::new("output.csv"),
            )
            .await
            .unwrap();

        // Header plus one flush per written row.
        assert_eq!(summary.rows_written, 2);
        assert_eq!(recorder.flushed.len(), 3);

        let expected: Vec<String> = recorder
            .data
            .split(|b| *b == b'\n')
            .filter(|l| !l.is_empty())
            .map(|l| format!("{}\n", String::from_utf8_lossy(l)))
            .collect();
        for (i, snapshot) in recorder.flushed.iter().enumerate() {
            assert!(
                snapshot.ends_with(&expected[i]),
                "flush {i} should end with {:?}, got {snapshot:?}",
                expected[i]
            );
            assert_eq!(snapshot.lines().count(), i + 1);
        }
    }

    #[tokio::test]
    async fn test_invalid_utf8_row_follows_policy() {
        let mut input = b"\"Sequence\",\"Name\"\n\"AC\xffGT\",\"bad\"\n".to_vec();
        input.extend_from_slice(b"\"AAAAAAAAAAAAAAAA\",\"polyA\"\r\n");

        let calc = StubCalculator::new();
        let mut out = Vec::new();
        let err = BatchDriver::new(&calc, BatchOptions::default(), &SilentProgress)
            .process(
                input.as_slice(),
                Path::new("input.csv"),
                &mut out,
                Path::new("output.csv"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, OligoCalcError::MalformedRow { line: 2, .. }));

        let calc = StubCalculator::new();
        let mut out = Vec::new();
        let summary = BatchDriver::new(&calc, skip_options(), &SilentProgress)
            .process(
                input.as_slice(),
                Path::new("input.csv"),
                &mut out,
                Path::new("output.csv"),
            )
            .await
            .unwrap();
        assert_eq!(summary.skipped.len(), 1);
        assert!(summary.skipped[0].error.contains("UTF-8"));
        assert_eq!(summary.rows_written, 1);

        let out = String::from_utf8(out).unwrap();
        assert!(out.ends_with("\"AAAAAAAAAAAAAAAA\",\"polyA\",26.66,-6.0,-112.7,-344.1\n"));
    }

    // -----------------------------------------------------------------------
    // Files and end-to-end
    // -----------------------------------------------------------------------

    fn temp_dir(prefix: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("{prefix}-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn test_run_keeps_rows_written_before_abort() {
        let dir = temp_dir("oligocalc-abort-test");
        let input = dir.join("ForThermoBLAST.csv");
        let output = dir.join("OligoFeatures.csv");
        std::fs::write(
            &input,
            "\"Sequence\",\"Name\"\n\
             \"AAAAAAAAAAAAAAAA\",\"polyA\"\n\
             \"TTTT\",\"unknown\"\n",
        )
        .unwrap();

        let calc = StubCalculator::new();
        let err = run_batch(&input, &output, &calc, BatchOptions::default(), &SilentProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, OligoCalcError::Extraction { .. }));

        let written = std::fs::read_to_string(&output).unwrap();
        assert_eq!(written.lines().count(), 2);
        assert!(written.contains("26.66,-6.0"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_run_missing_input_is_io_error() {
        let dir = temp_dir("oligocalc-missing-test");
        let calc = StubCalculator::new();
        let err = run_batch(
            &dir.join("absent.csv"),
            &dir.join("out.csv"),
            &calc,
            BatchOptions::default(),
            &SilentProgress,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, OligoCalcError::Io { .. }));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_run_refuses_same_input_and_output() {
        let dir = temp_dir("oligocalc-same-path-test");
        let path = dir.join("seqs.csv");
        let content = "\"Sequence\",\"Name\"\n\"AAAAAAAAAAAAAAAA\",\"polyA\"\n";
        std::fs::write(&path, content).unwrap();

        let calc = StubCalculator::new();
        let err = run_batch(&path, &path, &calc, BatchOptions::default(), &SilentProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, OligoCalcError::Validation { .. }));
        assert!(err.to_string().contains("must differ"));

        // Same file reached through a different spelling of the path.
        let aliased = dir.join(".").join("seqs.csv");
        let err = run_batch(&path, &aliased, &calc, BatchOptions::default(), &SilentProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, OligoCalcError::Validation { .. }));

        assert_eq!(std::fs::read_to_string(&path).unwrap(), content);
        assert_eq!(calc.call_count(), 0);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_run_with_mock_server() {
        use oligocalc_client::{ClientOptions, MeltClient};
        use wiremock::matchers::{body_string_contains, method};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        let primer_page = std::fs::read_to_string("../../../fixtures/melt/primer.html")
            .expect("read primer fixture");

        Mock::given(method("POST"))
            .and(body_string_contains("sequence=ATTGCTGATGCGGGATTAGCTGATGTAG"))
            .and(body_string_contains("MgConc=2.5"))
            .and(body_string_contains("dNTPsConc=0.2"))
            .respond_with(ResponseTemplate::new(200).set_body_string(primer_page))
            .expect(1)
            .mount(&server)
            .await;

        let dir = temp_dir("oligocalc-e2e-test");
        let input = dir.join("in.csv");
        let output = dir.join("out.csv");
        std::fs::write(
            &input,
            "\"Sequence\",\"Amplicon\"\n\"ATTGCTGATGCGGGATTAGCTGATGTAG\",\"amp_12\"\n",
        )
        .unwrap();

        let client = MeltClient::new(ClientOptions {
            endpoint: url::Url::parse(&server.uri()).unwrap(),
            timeout: Some(Duration::from_secs(5)),
            max_retries: 0,
            retry_delay: Duration::ZERO,
        })
        .unwrap();

        let summary = run_batch(&input, &output, &client, BatchOptions::default(), &SilentProgress)
            .await
            .unwrap();
        assert_eq!(summary.rows_written, 1);

        let written = std::fs::read_to_string(&output).unwrap();
        assert_eq!(
            written,
            "\"Sequence\",\"Amplicon\",\"Tm\",\"dG\",\"dH\",\"dS\"\n\
             \"ATTGCTGATGCGGGATTAGCTGATGTAG\",\"amp_12\",60.45,-25.34,-212.4,-603.1\n"
        );

        let _ = std::fs::remove_dir_all(&dir);
    }
}
