//! Trial: container for one continuous recording

use crate::error::{GaitError, GaitResult};
use crate::gait_types::TrialMetadata;
use crate::table::{ColumnData, Table};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Name of the shared time channel
pub const TIME_CHANNEL: &str = "time";

/// One subject performing one task, as equal-length channels over a shared
/// strictly increasing time axis
#[derive(Debug, Clone)]
pub struct Trial {
    id: Uuid,
    metadata: TrialMetadata,
    time: Vec<f64>,
    channels: Table,
}

impl Trial {
    /// Create a trial from an explicit time channel
    pub fn new(metadata: TrialMetadata, time: Vec<f64>, channels: Table) -> GaitResult<Self> {
        if time.is_empty() {
            return Err(GaitError::EmptyTrial);
        }

        for (index, t) in time.iter().enumerate() {
            if !t.is_finite() {
                return Err(GaitError::NonFiniteTime { index });
            }
        }
        if let Some(index) = time.windows(2).position(|w| w[1] <= w[0]) {
            return Err(GaitError::NonMonotonicTime { index: index + 1 });
        }

        for column in channels.columns() {
            if column.len() != time.len() {
                return Err(GaitError::ChannelLengthMismatch {
                    name: column.name.clone(),
                    expected: time.len(),
                    actual: column.len(),
                });
            }
        }

        if channels.has_column(TIME_CHANNEL) {
            return Err(GaitError::DuplicateColumn { name: TIME_CHANNEL.to_string() });
        }

        Ok(Trial {
            id: Uuid::new_v4(),
            metadata,
            time,
            channels,
        })
    }

    /// Create a trial whose time channel is `i * metadata.dt`
    pub fn from_sampling_interval(metadata: TrialMetadata, channels: Table) -> GaitResult<Self> {
        if !(metadata.dt > 0.0) || !metadata.dt.is_finite() {
            return Err(GaitError::NonMonotonicTime { index: 1 });
        }
        let dt = metadata.dt;
        let time = (0..channels.n_rows()).map(|i| i as f64 * dt).collect();
        Trial::new(metadata, time, channels)
    }

    /// Create a trial from a table that carries its own `time` column
    pub fn from_table(metadata: TrialMetadata, table: Table) -> GaitResult<Self> {
        let time = table.float_column(TIME_CHANNEL)?.to_vec();
        let channels = Table::from_columns(
            table
                .columns()
                .iter()
                .filter(|c| c.name != TIME_CHANNEL)
                .cloned()
                .collect(),
        )?;
        Trial::new(metadata, time, channels)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn metadata(&self) -> &TrialMetadata {
        &self.metadata
    }

    pub fn subject(&self) -> &str {
        &self.metadata.subject
    }

    pub fn task(&self) -> &str {
        &self.metadata.task
    }

    pub fn time(&self) -> &[f64] {
        &self.time
    }

    pub fn channels(&self) -> &Table {
        &self.channels
    }

    /// Number of samples per channel
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Float samples for a channel
    pub fn channel(&self, name: &str) -> GaitResult<&[f64]> {
        self.channels.float_column(name)
    }

    /// Names of floating point channels, in table order
    pub fn float_channel_names(&self) -> Vec<String> {
        self.channels
            .columns()
            .iter()
            .filter(|c| c.data.is_float())
            .map(|c| c.name.clone())
            .collect()
    }

    /// Recording duration in seconds
    pub fn duration(&self) -> f64 {
        match (self.time.first(), self.time.last()) {
            (Some(first), Some(last)) => last - first,
            _ => 0.0,
        }
    }

    /// Basic statistics for a float channel
    pub fn channel_stats(&self, name: &str) -> GaitResult<ChannelStats> {
        Ok(ChannelStats::calculate(self.channel(name)?))
    }

    /// Table holding `time` followed by every channel
    pub fn to_table(&self) -> Table {
        let mut columns = Vec::with_capacity(self.channels.n_columns() + 1);
        columns.push(crate::table::Column {
            name: TIME_CHANNEL.to_string(),
            data: ColumnData::Float(self.time.clone()),
        });
        columns.extend(self.channels.columns().iter().cloned());
        // Names and lengths were validated on construction.
        Table::from_columns(columns).unwrap_or_default()
    }
}

/// Basic statistics for a signal channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelStats {
    pub mean: f64,
    pub rms: f64,
    /// Population standard deviation
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub peak_to_peak: f64,
}

impl ChannelStats {
    pub fn calculate(data: &[f64]) -> Self {
        if data.is_empty() {
            return Self {
                mean: 0.0,
                rms: 0.0,
                std_dev: 0.0,
                min: 0.0,
                max: 0.0,
                peak_to_peak: 0.0,
            };
        }

        let n = data.len() as f64;
        let mean = data.iter().sum::<f64>() / n;
        let rms = (data.iter().map(|x| x * x).sum::<f64>() / n).sqrt();
        let variance = data.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
        let std_dev = variance.sqrt();

        let min = data.iter().fold(f64::INFINITY, |a, &b| a.min(b));
        let max = data.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));

        Self {
            mean,
            rms,
            std_dev,
            min,
            max,
            peak_to_peak: max - min,
        }
    }
}
