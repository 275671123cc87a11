//! Daily spending history and a straight line fitted through it.

use serde::Serialize;
use time::{Date, Duration};

use crate::{Error, date::iso_date};

/// How many days after the history to predict.
pub const FORECAST_DAYS: i64 = 30;

/// One day on the forecast chart, either from history or predicted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastPoint {
    #[serde(with = "iso_date")]
    pub date: Date,
    pub actual: Option<f64>,
    pub predicted: Option<f64>,
}

/// A line `y = intercept + slope * x` fitted with ordinary least squares.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearModel {
    pub intercept: f64,
    pub slope: f64,
}

impl LinearModel {
    /// Fit a line through `values`, where `values[i]` is the value at `x = i`.
    ///
    /// Returns `None` if there are fewer than two values.
    pub fn fit(values: &[f64]) -> Option<Self> {
        if values.len() < 2 {
            return None;
        }

        let n = values.len() as f64;
        let mean_x = (n - 1.0) / 2.0;
        let mean_y = values.iter().sum::<f64>() / n;

        let (covariance, variance) =
            values
                .iter()
                .enumerate()
                .fold((0.0, 0.0), |(covariance, variance), (x, y)| {
                    let dx = x as f64 - mean_x;
                    (covariance + dx * (y - mean_y), variance + dx * dx)
                });

        let slope = covariance / variance;

        Some(Self {
            intercept: mean_y - slope * mean_x,
            slope,
        })
    }

    /// The value of the line at `x`.
    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

/// Spread daily totals over every day from the first to the last, filling
/// days without spending with 0.
///
/// `daily_totals` must be sorted by date with at most one entry per day.
pub fn fill_daily_series(daily_totals: &[(Date, f64)]) -> Vec<(Date, f64)> {
    let (Some((first, _)), Some((last, _))) = (daily_totals.first(), daily_totals.last()) else {
        return Vec::new();
    };

    let mut series = Vec::new();
    let mut totals = daily_totals.iter().peekable();
    let mut day = *first;

    while day <= *last {
        let amount = match totals.peek() {
            Some((date, amount)) if *date == day => {
                totals.next();
                *amount
            }
            _ => 0.0,
        };
        series.push((day, amount));

        match day.next_day() {
            Some(next) => day = next,
            None => break,
        }
    }

    series
}

/// Build the chart: the filled history followed by [FORECAST_DAYS] predicted
/// days, with predictions clipped at 0.
///
/// # Errors
/// Returns [Error::InsufficientHistory] if the history spans fewer than two days.
pub fn forecast(daily_totals: &[(Date, f64)]) -> Result<Vec<ForecastPoint>, Error> {
    let history = fill_daily_series(daily_totals);
    let values: Vec<f64> = history.iter().map(|(_, amount)| *amount).collect();
    let model = LinearModel::fit(&values).ok_or(Error::InsufficientHistory)?;

    let Some((last_day, _)) = history.last().copied() else {
        return Err(Error::InsufficientHistory);
    };

    let mut points: Vec<ForecastPoint> = history
        .into_iter()
        .map(|(date, amount)| ForecastPoint {
            date,
            actual: Some(amount),
            predicted: None,
        })
        .collect();

    let start = values.len() as f64;
    for offset in 1..=FORECAST_DAYS {
        let Some(date) = last_day.checked_add(Duration::days(offset)) else {
            break;
        };

        points.push(ForecastPoint {
            date,
            actual: None,
            predicted: Some(model.predict(start + (offset - 1) as f64).max(0.0)),
        });
    }

    Ok(points)
}
