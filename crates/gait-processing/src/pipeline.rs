//! Trial-level phase annotation and batch orchestration

use crate::config::PhaseConfig;
use crate::processor::{process_unit, SkipReason, UnitMetrics, UnitOutcome};
use crate::sink::{TableSink, WriteMode};
use gait_core::{Column, GaitError, GaitResult, Leg, Table, Trial, TrialMetadata};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Outcome of one leg of a trial
#[derive(Debug, Clone, PartialEq)]
pub struct LegOutcome {
    pub leg: Leg,
    pub outcome: UnitOutcome,
}

/// Phase annotation of one trial
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseInfo {
    /// Trial columns plus `time` and one `phase_<leg>` column per leg
    pub time_indexed: Table,
    /// Every cycle of every leg, reference leg first
    pub phase_indexed: Table,
    pub legs: Vec<LegOutcome>,
}

impl PhaseInfo {
    pub fn cycle_count(&self) -> usize {
        self.legs.iter().map(|l| l.outcome.cycles().len()).sum()
    }
}

/// Name of the time-indexed phase column for `leg`
pub fn phase_column_name(leg: Leg) -> String {
    format!("phase_{}", leg.token())
}

/// Within-stride phase for each sample, NaN outside accepted strides
fn time_indexed_phase(trial: &Trial, outcome: &UnitOutcome, config: &PhaseConfig) -> Vec<f64> {
    let time = trial.time();
    let scale = config.phase_units.scale();
    let mut phase = vec![f64::NAN; time.len()];

    for cycle in outcome.cycles() {
        let stride = &cycle.stride;
        let start_time = time[stride.start_index];
        for i in stride.start_index..stride.end_index {
            phase[i] = scale * (time[i] - start_time) / stride.duration_s;
        }
    }
    phase
}

/// Annotate every leg of `trial` with gait phase.
///
/// Legs that cannot be processed are reported in `legs` and contribute NaN
/// phase and no cycles. Errors are returned only for an invalid
/// configuration or output tables that cannot be assembled.
pub fn add_phase_info(trial: &Trial, config: &PhaseConfig) -> GaitResult<PhaseInfo> {
    config.validate()?;

    let legs: Vec<LegOutcome> = config
        .leg_naming
        .legs()
        .into_iter()
        .map(|leg| LegOutcome {
            leg,
            outcome: process_unit(trial, leg, config),
        })
        .collect();

    let mut time_indexed = trial.to_table();
    for leg in &legs {
        let phase = time_indexed_phase(trial, &leg.outcome, config);
        time_indexed.push_column(Column::float(phase_column_name(leg.leg), phase))?;
    }

    let phase_indexed = Table::concat(
        legs.iter()
            .flat_map(|l| l.outcome.cycles())
            .map(|cycle| &cycle.table),
    )?;

    Ok(PhaseInfo {
        time_indexed,
        phase_indexed,
        legs,
    })
}

/// Status of one unit in a batch report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum UnitStatus {
    Processed { cycles: usize },
    Skipped(SkipReason),
    Failed(String),
}

/// One (subject, task, leg) unit of a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitReport {
    pub subject: String,
    pub task: String,
    pub leg: Leg,
    pub status: UnitStatus,
    pub metrics: UnitMetrics,
}

impl UnitReport {
    fn new(metadata: &TrialMetadata, leg: &LegOutcome) -> Self {
        let status = match &leg.outcome {
            UnitOutcome::Processed { cycles, .. } => UnitStatus::Processed { cycles: cycles.len() },
            UnitOutcome::Skipped { reason, .. } => UnitStatus::Skipped(reason.clone()),
            UnitOutcome::Failed { error, .. } => UnitStatus::Failed(error.to_string()),
        };
        Self {
            subject: metadata.subject.clone(),
            task: metadata.task.clone(),
            leg: leg.leg,
            status,
            metrics: leg.outcome.metrics().clone(),
        }
    }
}

/// Trial that could not be loaded, annotated or written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialFailure {
    pub subject: String,
    pub task: String,
    pub reason: String,
}

/// Batch-level counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchMetrics {
    pub trials_seen: usize,
    pub trials_processed: usize,
    pub units_processed: usize,
    pub units_skipped: usize,
    pub units_failed: usize,
    pub cycles: usize,
    pub rows_written: usize,
    pub elapsed_us: u64,
}

/// Result of a batch run; produced even when every unit is skipped
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub units: Vec<UnitReport>,
    pub failures: Vec<TrialFailure>,
    /// Concatenated phase-indexed output; empty unless output is retained
    pub phase_table: Table,
    pub metrics: BatchMetrics,
}

impl BatchReport {
    pub fn skipped_units(&self) -> Vec<&UnitReport> {
        self.units
            .iter()
            .filter(|u| matches!(u.status, UnitStatus::Skipped(_)))
            .collect()
    }

    /// Subjects with at least one processed unit
    pub fn processed_subjects(&self) -> Vec<String> {
        self.units
            .iter()
            .filter(|u| matches!(u.status, UnitStatus::Processed { .. }))
            .map(|u| u.subject.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Subjects whose units were all skipped
    pub fn skipped_subjects(&self) -> Vec<String> {
        let processed: BTreeSet<String> = self.processed_subjects().into_iter().collect();
        self.skipped_units()
            .into_iter()
            .map(|u| u.subject.clone())
            .filter(|s| !processed.contains(s))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.metrics.units_skipped == 0 && self.metrics.units_failed == 0
    }

    pub fn summary(&self) -> String {
        let m = &self.metrics;
        format!(
            "{} trials ({} failed): {} units processed, {} skipped, {} failed; {} cycles, {} rows written in {:.1} ms",
            m.trials_seen,
            self.failures.len(),
            m.units_processed,
            m.units_skipped,
            m.units_failed,
            m.cycles,
            m.rows_written,
            m.elapsed_us as f64 / 1000.0
        )
    }
}

/// Runs `add_phase_info` over a sequence of trials and streams the output
pub struct Orchestrator {
    config: PhaseConfig,
    sink: Option<Box<dyn TableSink>>,
    retain_output: bool,
    writes: usize,
}

/// Builder for [`Orchestrator`]
pub struct OrchestratorBuilder {
    config: PhaseConfig,
    sink: Option<Box<dyn TableSink>>,
    retain_output: bool,
}

impl OrchestratorBuilder {
    pub fn new() -> Self {
        Self {
            config: PhaseConfig::default(),
            sink: None,
            retain_output: true,
        }
    }

    pub fn config(mut self, config: PhaseConfig) -> Self {
        self.config = config;
        self
    }

    pub fn sink(mut self, sink: Box<dyn TableSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Keep the concatenated phase table in the report
    pub fn retain_output(mut self, retain: bool) -> Self {
        self.retain_output = retain;
        self
    }

    pub fn build(self) -> GaitResult<Orchestrator> {
        self.config.validate()?;
        Ok(Orchestrator {
            config: self.config,
            sink: self.sink,
            retain_output: self.retain_output,
            writes: 0,
        })
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Orchestrator {
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::new()
    }

    pub fn config(&self) -> &PhaseConfig {
        &self.config
    }

    /// Give back the sink, e.g. to inspect a `MemorySink`
    pub fn into_sink(self) -> Option<Box<dyn TableSink>> {
        self.sink
    }

    /// Process trials one after another
    pub fn run<I>(&mut self, trials: I) -> BatchReport
    where
        I: IntoIterator<Item = GaitResult<Trial>>,
    {
        let started = Instant::now();
        let mut report = BatchReport::default();

        for item in trials {
            match item {
                Ok(trial) => {
                    let result = add_phase_info(&trial, &self.config);
                    self.absorb(trial.metadata(), result, &mut report);
                }
                Err(error) => {
                    report.metrics.trials_seen += 1;
                    Self::record_failure(&mut report, loader_failure(error));
                }
            }
        }

        self.finish(report, started)
    }

    /// Process trials on the blocking thread pool, at most
    /// `max_parallel_units` at a time. Output order follows input order;
    /// each result is written as soon as every earlier trial has been.
    pub async fn run_concurrent(&mut self, trials: Vec<Trial>) -> BatchReport {
        let started = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.config.max_parallel_units));
        let mut tasks = JoinSet::new();

        for (position, trial) in trials.into_iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let config = self.config.clone();
            tasks.spawn(async move {
                let metadata = trial.metadata().clone();
                let result = match semaphore.acquire_owned().await {
                    Ok(_permit) => tokio::task::spawn_blocking(move || add_phase_info(&trial, &config))
                        .await
                        .unwrap_or_else(|e| {
                            Err(GaitError::Worker {
                                reason: format!("trial task failed: {}", e),
                            })
                        }),
                    Err(e) => Err(GaitError::Worker {
                        reason: format!("worker pool closed: {}", e),
                    }),
                };
                (position, metadata, result)
            });
        }

        let mut report = BatchReport::default();
        let mut pending = BTreeMap::new();
        let mut next = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((position, metadata, result)) => {
                    pending.insert(position, (metadata, result));
                }
                Err(e) => {
                    report.metrics.trials_seen += 1;
                    Self::record_failure(
                        &mut report,
                        TrialFailure {
                            subject: "unknown".to_string(),
                            task: "unknown".to_string(),
                            reason: GaitError::Worker { reason: e.to_string() }.to_string(),
                        },
                    );
                }
            }
            while let Some((metadata, result)) = pending.remove(&next) {
                self.absorb(&metadata, result, &mut report);
                next += 1;
            }
        }

        // Positions behind a lost task
        for (_, (metadata, result)) in pending {
            self.absorb(&metadata, result, &mut report);
        }

        self.finish(report, started)
    }

    /// Fold one trial into the report. Units count only once the trial's
    /// cycles have reached the sink and the retained table.
    fn absorb(&mut self, metadata: &TrialMetadata, result: GaitResult<PhaseInfo>, report: &mut BatchReport) {
        report.metrics.trials_seen += 1;

        let info = match result {
            Ok(info) => info,
            Err(error) => {
                Self::record_failure(report, TrialFailure::new(metadata, &error));
                return;
            }
        };

        if let Err(error) = self.emit(&info.phase_indexed, report) {
            Self::record_failure(report, TrialFailure::new(metadata, &error));
            return;
        }

        for leg in &info.legs {
            let unit = UnitReport::new(metadata, leg);
            match unit.status {
                UnitStatus::Processed { cycles } => {
                    report.metrics.units_processed += 1;
                    report.metrics.cycles += cycles;
                }
                UnitStatus::Skipped(_) => report.metrics.units_skipped += 1,
                UnitStatus::Failed(_) => report.metrics.units_failed += 1,
            }
            report.units.push(unit);
        }

        report.metrics.trials_processed += 1;
        debug!(
            subject = %metadata.subject,
            task = %metadata.task,
            cycles = info.cycle_count(),
            "Trial processed"
        );
    }

    /// Write a trial's cycles and keep them if output is retained.
    /// Nothing is written when the retained table would reject them.
    fn emit(&mut self, table: &Table, report: &mut BatchReport) -> GaitResult<()> {
        if table.is_empty() {
            return Ok(());
        }
        if self.retain_output {
            report.phase_table.check_appendable(table)?;
        }
        report.metrics.rows_written += self.write(table)?;
        if self.retain_output {
            report.phase_table.append(table)?;
        }
        Ok(())
    }

    /// First write uses the configured mode, later writes append
    fn write(&mut self, table: &Table) -> GaitResult<usize> {
        let Some(sink) = self.sink.as_mut() else {
            return Ok(0);
        };
        let mode = if self.writes == 0 {
            self.config.write_mode
        } else {
            WriteMode::Append
        };
        sink.write(table, mode)?;
        self.writes += 1;
        Ok(table.n_rows())
    }

    fn record_failure(report: &mut BatchReport, failure: TrialFailure) {
        warn!(
            subject = %failure.subject,
            task = %failure.task,
            reason = %failure.reason,
            "Trial failed"
        );
        report.failures.push(failure);
    }

    fn finish(&self, mut report: BatchReport, started: Instant) -> BatchReport {
        report.metrics.elapsed_us = started.elapsed().as_micros() as u64;
        info!(
            trials = report.metrics.trials_seen,
            failures = report.failures.len(),
            units_processed = report.metrics.units_processed,
            units_skipped = report.metrics.units_skipped,
            cycles = report.metrics.cycles,
            "Batch complete"
        );
        report
    }
}

impl TrialFailure {
    fn new(metadata: &TrialMetadata, error: &GaitError) -> Self {
        Self {
            subject: metadata.subject.clone(),
            task: metadata.task.clone(),
            reason: error.to_string(),
        }
    }
}

fn loader_failure(error: GaitError) -> TrialFailure {
    match error {
        GaitError::Loader { subject, reason } => TrialFailure {
            subject,
            task: "unknown".to_string(),
            reason,
        },
        other => TrialFailure {
            subject: "unknown".to_string(),
            task: "unknown".to_string(),
            reason: other.to_string(),
        },
    }
}
