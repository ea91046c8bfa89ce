//! Resampling of strides onto a fixed-length normalized phase axis

use crate::derivative::{
    acceleration_channel_name, velocity_channel_name, DerivativeConfig, DerivativeEstimator,
};
use crate::strides::Stride;
use gait_core::{Column, ColumnData, GaitError, GaitResult, Leg, Table, Trial};
use serde::{Deserialize, Serialize};

pub const PHASE_COLUMN: &str = "phase";
pub const LEADING_LEG_COLUMN: &str = "phase_leading_leg";
pub const SUBJECT_COLUMN: &str = "subject";
pub const TASK_COLUMN: &str = "task";
pub const TASK_INFO_COLUMN: &str = "task_info";
pub const STRIDE_COLUMN: &str = "stride";

/// Units of the emitted phase axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhaseUnits {
    /// `[0, 1)`
    Fraction,
    /// `[0, 100)`
    Percent,
}

impl PhaseUnits {
    pub fn scale(&self) -> f64 {
        match self {
            PhaseUnits::Fraction => 1.0,
            PhaseUnits::Percent => 100.0,
        }
    }
}

impl Default for PhaseUnits {
    fn default() -> Self {
        PhaseUnits::Fraction
    }
}

/// `n` evenly spaced phase values `k / n`, scaled to `units`.
///
/// The wrap-around value (1.0 or 100) is excluded: it is the start of the
/// next cycle.
pub fn phase_axis(n: usize, units: PhaseUnits) -> Vec<f64> {
    let scale = units.scale();
    (0..n).map(|k| scale * k as f64 / n as f64).collect()
}

/// Resample a closed cycle (`values` spans phase 0 to 1 inclusive) onto `n`
/// points of the open phase axis with linear interpolation
pub fn resample_linear(values: &[f64], n: usize) -> Vec<f64> {
    let m = values.len();
    match m {
        0 => return vec![f64::NAN; n],
        1 => return vec![values[0]; n],
        _ => {}
    }

    let last = m - 1;
    (0..n)
        .map(|k| {
            let position = k as f64 / n as f64 * last as f64;
            let i = position.floor() as usize;
            if i >= last {
                return values[last];
            }
            let fraction = position - i as f64;
            if fraction == 0.0 {
                values[i]
            } else {
                values[i] + (values[i + 1] - values[i]) * fraction
            }
        })
        .collect()
}

/// One phase-normalized gait cycle
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseCycle {
    pub leg: Leg,
    /// Position of the stride among the unit's accepted strides
    pub stride_number: i64,
    pub stride: Stride,
    pub table: Table,
}

/// Maps strides of a trial onto a fixed phase grid
#[derive(Debug, Clone)]
pub struct PhaseNormalizer {
    num_points: usize,
    units: PhaseUnits,
    derivatives: DerivativeConfig,
    estimator: DerivativeEstimator,
}

impl PhaseNormalizer {
    pub fn new(num_points: usize, units: PhaseUnits) -> Self {
        Self {
            num_points,
            units,
            derivatives: DerivativeConfig::default(),
            estimator: DerivativeEstimator::default(),
        }
    }

    /// Derive velocity/acceleration columns from angle channels
    pub fn with_derivatives(mut self, derivatives: DerivativeConfig) -> Self {
        self.estimator = DerivativeEstimator::new(derivatives.options);
        self.derivatives = derivatives;
        self
    }

    pub fn num_points(&self) -> usize {
        self.num_points
    }

    pub fn normalize(
        &self,
        trial: &Trial,
        stride: &Stride,
        leg: Leg,
        stride_number: i64,
    ) -> GaitResult<PhaseCycle> {
        let len = trial.len();
        if stride.end_index <= stride.start_index || stride.end_index >= len {
            return Err(GaitError::InvalidStride {
                start: stride.start_index,
                end: stride.end_index,
                len,
            });
        }

        let n = self.num_points;
        let range = stride.start_index..=stride.end_index;

        let mut resampled = Vec::new();
        let mut broadcast = Vec::new();
        for column in trial.channels().columns() {
            match &column.data {
                ColumnData::Float(values) => {
                    let cycle = resample_linear(&values[range.clone()], n);
                    resampled.push(Column::float(column.name.clone(), cycle));
                }
                other => {
                    if let Some(value) = other.cell(stride.start_index) {
                        broadcast.push(Column {
                            name: column.name.clone(),
                            data: ColumnData::broadcast(&value, n),
                        });
                    }
                }
            }
        }

        let derived = if self.derivatives.enabled {
            self.derive(trial.channels(), &resampled, stride.duration_s)
        } else {
            Vec::new()
        };

        let mut columns = resampled;
        columns.extend(derived);
        columns.extend(broadcast);
        columns.extend(self.metadata_columns(trial, leg, stride_number));

        Ok(PhaseCycle {
            leg,
            stride_number,
            stride: *stride,
            table: Table::from_columns(columns)?,
        })
    }

    fn derive(&self, channels: &Table, resampled: &[Column], duration_s: f64) -> Vec<Column> {
        let auto_detect = self.derivatives.auto_detect_discontinuity;
        let mut derived = Vec::new();

        for column in resampled {
            let ColumnData::Float(angle) = &column.data else {
                continue;
            };
            let Some(velocity_name) = velocity_channel_name(&column.name) else {
                continue;
            };

            let velocity = self.estimator.velocity_from_angle(angle, duration_s, None, auto_detect);
            let acceleration = acceleration_channel_name(&column.name)
                .filter(|name| self.derivatives.include_acceleration && !channels.has_column(name))
                .map(|name| {
                    let values = self.estimator.acceleration_from_velocity(
                        &velocity,
                        duration_s,
                        None,
                        auto_detect,
                    );
                    Column::float(name, values)
                });

            if !channels.has_column(&velocity_name) {
                derived.push(Column::float(velocity_name, velocity));
            }
            derived.extend(acceleration);
        }

        derived
    }

    fn metadata_columns(&self, trial: &Trial, leg: Leg, stride_number: i64) -> Vec<Column> {
        let n = self.num_points;
        let metadata = trial.metadata();
        let channels = trial.channels();

        let mut columns = vec![
            Column::float(PHASE_COLUMN, phase_axis(n, self.units)),
            Column::label(LEADING_LEG_COLUMN, vec![leg.token().to_string(); n]),
        ];
        if !channels.has_column(SUBJECT_COLUMN) {
            columns.push(Column::label(SUBJECT_COLUMN, vec![metadata.subject.clone(); n]));
        }
        if !channels.has_column(TASK_COLUMN) {
            columns.push(Column::label(TASK_COLUMN, vec![metadata.task.clone(); n]));
        }
        // Always present so trials with and without task parameters share a schema
        if !channels.has_column(TASK_INFO_COLUMN) {
            let task_info = metadata.task_info_label().unwrap_or_default();
            columns.push(Column::label(TASK_INFO_COLUMN, vec![task_info; n]));
        }
        columns.push(Column::integer(STRIDE_COLUMN, vec![stride_number; n]));
        columns
    }
}
