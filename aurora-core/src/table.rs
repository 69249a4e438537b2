//! Tabular hand-off: every series and feature set renders as named columns
//! and, from those, as a `polars::DataFrame`.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use polars::prelude::*;

use crate::domain::{GeomagneticRecord, Series, SolarWindRecord, WeatherRecord, SUB_PERIODS};
use crate::error::DataError;
use crate::features::{GeomagneticFeatures, SolarFeatures};

/// `NaiveDate::num_days_from_ce` of 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValues {
    Date(Vec<NaiveDate>),
    Timestamp(Vec<NaiveDateTime>),
    Index(Vec<u32>),
    Float(Vec<Option<f32>>),
}

impl ColumnValues {
    pub fn len(&self) -> usize {
        match self {
            ColumnValues::Date(v) => v.len(),
            ColumnValues::Timestamp(v) => v.len(),
            ColumnValues::Index(v) => v.len(),
            ColumnValues::Float(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cell `i` rendered for text output; `None` renders as an empty string.
    pub fn cell(&self, i: usize) -> String {
        match self {
            ColumnValues::Date(v) => v[i].format("%Y-%m-%d").to_string(),
            ColumnValues::Timestamp(v) => v[i].format("%Y-%m-%dT%H:%M:%S").to_string(),
            ColumnValues::Index(v) => v[i].to_string(),
            ColumnValues::Float(v) => v[i].map(|x| x.to_string()).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableColumn {
    pub name: String,
    pub values: ColumnValues,
}

impl TableColumn {
    fn new(name: impl Into<String>, values: ColumnValues) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    fn floats(name: impl Into<String>, values: impl IntoIterator<Item = f32>) -> Self {
        Self::new(name, ColumnValues::Float(values.into_iter().map(Some).collect()))
    }

    fn optional(name: impl Into<String>, values: impl IntoIterator<Item = Option<f32>>) -> Self {
        Self::new(name, ColumnValues::Float(values.into_iter().collect()))
    }

    fn to_polars(&self) -> Result<Column, DataError> {
        let name: PlSmallStr = self.name.as_str().into();
        let col = match &self.values {
            ColumnValues::Date(v) => {
                let days: Vec<i32> = v
                    .iter()
                    .map(|d| d.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE)
                    .collect();
                Column::new(name, days).cast(&DataType::Date)?
            }
            ColumnValues::Timestamp(v) => {
                let ms: Vec<i64> = v.iter().map(|t| t.and_utc().timestamp_millis()).collect();
                Column::new(name, ms).cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?
            }
            ColumnValues::Index(v) => Column::new(name, v.clone()),
            ColumnValues::Float(v) => Column::new(name, v.clone()),
        };
        Ok(col)
    }
}

/// A finished table ready for export.
pub trait FeatureTable {
    /// Stable table name, also the export file stem.
    fn name(&self) -> &'static str;

    fn columns(&self) -> Vec<TableColumn>;

    fn height(&self) -> usize;

    fn column_names(&self) -> Vec<String> {
        self.columns().into_iter().map(|c| c.name).collect()
    }

    fn to_dataframe(&self) -> Result<DataFrame, DataError> {
        let cols = self
            .columns()
            .iter()
            .map(TableColumn::to_polars)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(DataFrame::new(cols)?)
    }
}

fn geomagnetic_columns<'a>(
    records: impl Iterator<Item = &'a GeomagneticRecord> + Clone,
) -> Vec<TableColumn> {
    let mut cols = vec![TableColumn::new(
        "date",
        ColumnValues::Date(records.clone().map(|r| r.date).collect()),
    )];
    for p in 0..SUB_PERIODS {
        cols.push(TableColumn::floats(
            format!("kp{}", p + 1),
            records.clone().map(|r| r.kp[p]),
        ));
    }
    for p in 0..SUB_PERIODS {
        cols.push(TableColumn::floats(
            format!("ap{}", p + 1),
            records.clone().map(|r| r.ap_3h[p]),
        ));
    }
    cols.push(TableColumn::floats("ap", records.map(|r| r.ap)));
    cols
}

impl FeatureTable for Series<WeatherRecord> {
    fn name(&self) -> &'static str {
        "weather"
    }

    fn height(&self) -> usize {
        self.len()
    }

    fn columns(&self) -> Vec<TableColumn> {
        vec![
            TableColumn::new("date", ColumnValues::Date(self.keys().collect())),
            TableColumn::floats("cloud_cover_mean", self.iter().map(|r| r.cloud_cover_mean)),
            TableColumn::floats("precipitation_sum", self.iter().map(|r| r.precipitation_sum)),
            TableColumn::floats("sunshine_duration", self.iter().map(|r| r.sunshine_duration)),
        ]
    }
}

impl FeatureTable for Series<GeomagneticRecord> {
    fn name(&self) -> &'static str {
        "geomagnetic"
    }

    fn height(&self) -> usize {
        self.len()
    }

    fn columns(&self) -> Vec<TableColumn> {
        geomagnetic_columns(self.iter())
    }
}

impl FeatureTable for Series<SolarWindRecord> {
    fn name(&self) -> &'static str {
        "solar_wind"
    }

    fn height(&self) -> usize {
        self.len()
    }

    fn columns(&self) -> Vec<TableColumn> {
        vec![
            TableColumn::new("date", ColumnValues::Timestamp(self.keys().collect())),
            TableColumn::floats("vsw", self.iter().map(|r| r.vsw)),
            TableColumn::floats("density", self.iter().map(|r| r.density)),
            TableColumn::floats("bz", self.iter().map(|r| r.bz)),
            TableColumn::floats("pressure", self.iter().map(|r| r.pressure)),
        ]
    }
}

impl FeatureTable for SolarFeatures {
    fn name(&self) -> &'static str {
        "solar_features"
    }

    fn height(&self) -> usize {
        self.rows.len()
    }

    fn columns(&self) -> Vec<TableColumn> {
        let rows = &self.rows;
        let mut cols = vec![
            TableColumn::new(
                "index",
                ColumnValues::Index(rows.iter().map(|r| r.index as u32).collect()),
            ),
            TableColumn::new(
                "date",
                ColumnValues::Timestamp(rows.iter().map(|r| r.date).collect()),
            ),
            TableColumn::floats("vsw", rows.iter().map(|r| r.vsw)),
            TableColumn::floats("density", rows.iter().map(|r| r.density)),
            TableColumn::floats("bz", rows.iter().map(|r| r.bz)),
            TableColumn::floats("pressure", rows.iter().map(|r| r.pressure)),
        ];
        for k in 0..crate::features::solar::MAX_LAG {
            let lag = k + 1;
            cols.push(TableColumn::floats(
                format!("vsw_lag{lag}"),
                rows.iter().map(|r| r.vsw_lag[k]),
            ));
            cols.push(TableColumn::floats(
                format!("bz_lag{lag}"),
                rows.iter().map(|r| r.bz_lag[k]),
            ));
            cols.push(TableColumn::floats(
                format!("pressure_lag{lag}"),
                rows.iter().map(|r| r.pressure_lag[k]),
            ));
        }
        cols.push(TableColumn::floats(
            self.config.bz_mean_column(),
            rows.iter().map(|r| r.bz_mean),
        ));
        cols.push(TableColumn::floats(
            self.config.bz_min_column(),
            rows.iter().map(|r| r.bz_min),
        ));
        cols.push(TableColumn::floats(
            self.config.vsw_mean_column(),
            rows.iter().map(|r| r.vsw_mean),
        ));
        cols.push(TableColumn::floats(
            self.config.pressure_max_column(),
            rows.iter().map(|r| r.pressure_max),
        ));
        cols.push(TableColumn::floats("vbz", rows.iter().map(|r| r.vbz)));
        cols.push(TableColumn::floats("vbz_neg", rows.iter().map(|r| r.vbz_neg)));
        cols
    }
}

impl FeatureTable for GeomagneticFeatures {
    fn name(&self) -> &'static str {
        "geomagnetic_features"
    }

    fn height(&self) -> usize {
        self.rows.len()
    }

    fn columns(&self) -> Vec<TableColumn> {
        let rows = &self.rows;
        let mut cols = geomagnetic_columns(rows.iter().map(|r| &r.record));
        cols.push(TableColumn::floats("kp_mean", rows.iter().map(|r| r.kp_mean)));
        cols.push(TableColumn::floats("kp_max", rows.iter().map(|r| r.kp_max)));
        for k in 0..crate::features::geomagnetic::MAX_LAG {
            let lag = k + 1;
            cols.push(TableColumn::optional(
                format!("kp_mean_lag_{lag}"),
                rows.iter().map(|r| r.kp_mean_lag[k]),
            ));
            cols.push(TableColumn::optional(
                format!("kp_max_lag_{lag}"),
                rows.iter().map(|r| r.kp_max_lag[k]),
            ));
        }
        cols
    }
}
