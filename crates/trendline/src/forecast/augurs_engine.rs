//! Forecasting engine backed by `augurs` (MSTL + ETS).
//!
//! Model selection:
//! - At least two full seasonal periods: MSTL decomposition with an AutoETS
//!   trend model.
//! - Otherwise: non-seasonal AutoETS.
//!
//! Missing observations at either end of the history are left out of the fit;
//! interior gaps are linearly interpolated. Rows before the first observation
//! repeat the first in-sample estimate, and rows after the last observation
//! are forecast ahead together with the future periods. The trend
//! component is a separate non-seasonal AutoETS fit of the same series, and
//! the seasonal component is the point estimate minus the trend.

use super::engine::{
    CanonicalSeries, DS, ForecastEngine, SEASONAL, TREND, Y, YHAT, YHAT_LOWER, YHAT_UPPER,
};
use super::frequency::Spacing;
use crate::error::{PipelineError, Result};
use crate::utils::date_series;
use augurs::Forecast;
use augurs::ets::AutoETS;
use augurs::forecaster::{Forecaster, Transformer, transforms::LinearInterpolator};
use augurs::mstl::MSTLModel;
use augurs::prelude::*;
use chrono::NaiveDate;
use polars::prelude::*;
use tracing::{debug, info};

/// Fewest observations the engine will fit.
pub const MIN_OBSERVATIONS: usize = 4;

/// A fitted model that can predict in-sample and ahead.
trait FittedModel {
    fn in_sample(&self, level: f64) -> std::result::Result<Forecast, String>;
    fn ahead(&self, horizon: usize, level: f64) -> std::result::Result<Forecast, String>;
}

impl<M> FittedModel for Forecaster<M>
where
    M: Fit,
    M::Fitted: Predict,
{
    fn in_sample(&self, level: f64) -> std::result::Result<Forecast, String> {
        self.predict_in_sample(level).map_err(|e| e.to_string())
    }

    fn ahead(&self, horizon: usize, level: f64) -> std::result::Result<Forecast, String> {
        self.predict(horizon, level).map_err(|e| e.to_string())
    }
}

fn interpolating<M>(model: M) -> Forecaster<M>
where
    M: Fit,
    M::Fitted: Predict,
{
    let transformers: Vec<Box<dyn Transformer>> = vec![Box::new(LinearInterpolator::default())];
    Forecaster::new(model).with_transformers(transformers)
}

struct FittedState {
    model: Box<dyn FittedModel>,
    trend: Box<dyn FittedModel>,
    dates: Vec<NaiveDate>,
    observed: Vec<f64>,
    spacing: Spacing,
    span: ObservedSpan,
}

/// Position of the first and last present observation in the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ObservedSpan {
    lead: usize,
    len: usize,
    trail: usize,
}

impl ObservedSpan {
    fn of(values: &[f64]) -> Option<Self> {
        let first = values.iter().position(|v| !v.is_nan())?;
        let last = values.iter().rposition(|v| !v.is_nan())?;
        Some(Self {
            lead: first,
            len: last - first + 1,
            trail: values.len() - last - 1,
        })
    }

    fn slice<'a>(&self, values: &'a [f64]) -> &'a [f64] {
        &values[self.lead..self.lead + self.len]
    }
}

/// Default forecasting collaborator.
pub struct AugursEngine {
    confidence_level: f64,
    seasonal_period: Option<usize>,
    state: Option<FittedState>,
    model_name: String,
}

impl AugursEngine {
    /// Create an engine with interval coverage `confidence_level` and an
    /// optional seasonal period override.
    pub fn new(confidence_level: f64, seasonal_period: Option<usize>) -> Self {
        Self {
            confidence_level,
            seasonal_period,
            state: None,
            model_name: "augurs".to_string(),
        }
    }

    /// Spacing inferred at the last fit.
    pub fn spacing(&self) -> Option<Spacing> {
        self.state.as_ref().map(|s| s.spacing)
    }

    fn fit_model(
        values: &[f64],
        period: Option<usize>,
    ) -> std::result::Result<(Box<dyn FittedModel>, String), String> {
        match period {
            Some(p) if p >= 2 && values.len() >= 2 * p => {
                let trend_model = AutoETS::non_seasonal().into_trend_model();
                let mut forecaster = interpolating(MSTLModel::new(vec![p], trend_model));
                forecaster
                    .fit(values)
                    .map_err(|e| format!("MSTL fit error: {e}"))?;
                Ok((Box::new(forecaster), format!("MSTL(period={}) + AutoETS", p)))
            }
            _ => Ok((Self::fit_trend(values)?, "AutoETS".to_string())),
        }
    }

    fn fit_trend(values: &[f64]) -> std::result::Result<Box<dyn FittedModel>, String> {
        let mut forecaster = interpolating(AutoETS::non_seasonal());
        forecaster
            .fit(values)
            .map_err(|e| format!("ETS fit error: {e}"))?;
        Ok(Box::new(forecaster))
    }
}

impl Default for AugursEngine {
    fn default() -> Self {
        Self::new(0.8, None)
    }
}

impl ForecastEngine for AugursEngine {
    fn name(&self) -> &str {
        &self.model_name
    }

    fn fit(&mut self, history: &CanonicalSeries) -> Result<()> {
        if history.observed() < MIN_OBSERVATIONS {
            return Err(PipelineError::ForecastEngine(format!(
                "need at least {} observations to fit, got {}",
                MIN_OBSERVATIONS,
                history.observed()
            )));
        }

        let dates = history.dates()?;
        let observed = history.values()?;
        let span = ObservedSpan::of(&observed).ok_or_else(|| {
            PipelineError::ForecastEngine("history has no observed values".to_string())
        })?;
        let spacing = Spacing::detect(&dates);
        let period = self.seasonal_period.or_else(|| spacing.seasonal_period());
        let fitted = span.slice(&observed);

        debug!(
            "Fitting {} of {} rows ({} leading and {} trailing missing) with spacing {:?} and seasonal period {:?}",
            span.len,
            observed.len(),
            span.lead,
            span.trail,
            spacing,
            period
        );

        let (model, name) =
            Self::fit_model(fitted, period).map_err(PipelineError::ForecastEngine)?;
        let trend = Self::fit_trend(fitted).map_err(PipelineError::ForecastEngine)?;

        info!("Fitted {} on {} observations", name, span.len);
        self.model_name = name;
        self.state = Some(FittedState {
            model,
            trend,
            dates,
            observed,
            spacing,
            span,
        });
        Ok(())
    }

    fn predict(&self, horizon: usize) -> Result<DataFrame> {
        let state = self
            .state
            .as_ref()
            .ok_or_else(|| PipelineError::NotReady("model has not been fit".to_string()))?;
        let level = self.confidence_level;
        let span = state.span;
        let ahead_len = span.trail + horizon;

        let in_sample = state
            .model
            .in_sample(level)
            .map_err(PipelineError::ForecastEngine)?;
        let ahead = state
            .model
            .ahead(ahead_len, level)
            .map_err(PipelineError::ForecastEngine)?;
        let trend_in_sample = state
            .trend
            .in_sample(level)
            .map_err(PipelineError::ForecastEngine)?;
        let trend_ahead = state
            .trend
            .ahead(ahead_len, level)
            .map_err(PipelineError::ForecastEngine)?;

        let history_len = state.dates.len();
        let last = state
            .dates
            .last()
            .copied()
            .ok_or_else(|| PipelineError::NotReady("model has no history".to_string()))?;

        let mut dates: Vec<Option<NaiveDate>> = state.dates.iter().copied().map(Some).collect();
        for step in 1..=horizon {
            let step = u32::try_from(step).map_err(|_| PipelineError::InvalidHorizon(step as i64))?;
            let next = state.spacing.step(last, step).ok_or_else(|| {
                PipelineError::ForecastEngine(format!("date overflow {} periods after {}", step, last))
            })?;
            dates.push(Some(next));
        }

        let (yhat, lower, upper) = stitch(&in_sample, &ahead, span, ahead_len);
        let (trend, _, _) = stitch(&trend_in_sample, &trend_ahead, span, ahead_len);
        let seasonal: Vec<f64> = yhat.iter().zip(&trend).map(|(y, t)| y - t).collect();

        let mut y: Vec<Option<f64>> = state
            .observed
            .iter()
            .map(|v| (!v.is_nan()).then_some(*v))
            .collect();
        y.resize(history_len + horizon, None);

        let df = DataFrame::new(vec![
            date_series(DS, &dates)?.into(),
            Series::new(Y.into(), y).into(),
            Series::new(TREND.into(), trend).into(),
            Series::new(SEASONAL.into(), seasonal).into(),
            Series::new(YHAT_LOWER.into(), lower).into(),
            Series::new(YHAT_UPPER.into(), upper).into(),
            Series::new(YHAT.into(), yhat).into(),
        ])?;
        Ok(df)
    }
}

/// Concatenate in-sample and ahead forecasts into `(point, lower, upper)`.
///
/// The in-sample part is padded or truncated to the fitted span and prefixed
/// with `span.lead` copies of its first entry; the ahead part to `ahead_len`.
/// Missing intervals collapse onto the point estimate.
fn stitch(
    in_sample: &Forecast,
    ahead: &Forecast,
    span: ObservedSpan,
    ahead_len: usize,
) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let part = |forecast: &Forecast, len: usize| {
        let point = fit_len(&forecast.point, len);
        let (lower, upper) = match &forecast.intervals {
            Some(intervals) => (fit_len(&intervals.lower, len), fit_len(&intervals.upper, len)),
            None => (point.clone(), point.clone()),
        };
        (point, lower, upper)
    };

    let backfill = |values: Vec<f64>| {
        let first = values.first().copied().unwrap_or(f64::NAN);
        let mut out = vec![first; span.lead];
        out.extend(values);
        out
    };

    let (point, lower, upper) = part(in_sample, span.len);
    let (mut point, mut lower, mut upper) = (backfill(point), backfill(lower), backfill(upper));
    let (p, l, u) = part(ahead, ahead_len);
    point.extend(p);
    lower.extend(l);
    upper.extend(u);
    (point, lower, upper)
}

fn fit_len(values: &[f64], len: usize) -> Vec<f64> {
    let mut out: Vec<f64> = values.iter().take(len).copied().collect();
    out.resize(len, f64::NAN);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Days;

    fn daily(values: &[f64]) -> CanonicalSeries {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let dates: Vec<Option<NaiveDate>> = (0..values.len())
            .map(|i| Some(start + Days::new(i as u64)))
            .collect();
        let ys = values
            .iter()
            .map(|v| (!v.is_nan()).then_some(*v))
            .collect();
        CanonicalSeries::from_parts(&dates, ys).unwrap()
    }

    #[test]
    fn test_fit_requires_minimum_observations() {
        let mut engine = AugursEngine::default();
        let err = engine.fit(&daily(&[1.0, 2.0, f64::NAN])).unwrap_err();
        assert!(matches!(err, PipelineError::ForecastEngine(_)));
    }

    #[test]
    fn test_predict_before_fit() {
        let engine = AugursEngine::default();
        assert!(matches!(
            engine.predict(3).unwrap_err(),
            PipelineError::NotReady(_)
        ));
    }

    #[test]
    fn test_short_series_uses_ets() {
        let values: Vec<f64> = (0..10).map(|i| 100.0 + i as f64).collect();
        let mut engine = AugursEngine::default();
        engine.fit(&daily(&values)).unwrap();

        assert_eq!(engine.name(), "AutoETS");
        assert_eq!(engine.spacing(), Some(Spacing::Daily));

        let df = engine.predict(5).unwrap();
        assert_eq!(df.height(), 15);
        for name in [DS, YHAT, YHAT_LOWER, YHAT_UPPER, TREND, SEASONAL] {
            assert!(df.column(name).is_ok(), "missing column {}", name);
        }
    }

    #[test]
    fn test_seasonal_series_uses_mstl() {
        let values: Vec<f64> = (0..28)
            .map(|i| 50.0 + if i % 7 < 5 { 10.0 } else { -5.0 } + i as f64 * 0.1)
            .collect();
        let mut engine = AugursEngine::new(0.9, None);
        engine.fit(&daily(&values)).unwrap();

        assert!(engine.name().starts_with("MSTL(period=7)"));
        let df = engine.predict(7).unwrap();
        assert_eq!(df.height(), 35);

        let last = crate::utils::series_dates(df.column(DS).unwrap().as_materialized_series())
            .unwrap()
            .last()
            .copied()
            .flatten();
        assert_eq!(last, NaiveDate::from_ymd_opt(2024, 2, 4));
    }

    #[test]
    fn test_observed_span_skips_missing_edges() {
        let span = ObservedSpan::of(&[f64::NAN, 1.0, f64::NAN, 2.0, f64::NAN, f64::NAN]).unwrap();
        assert_eq!(
            span,
            ObservedSpan {
                lead: 1,
                len: 3,
                trail: 2
            }
        );
        assert_eq!(ObservedSpan::of(&[f64::NAN, f64::NAN]), None);
    }

    #[test]
    fn test_missing_edges_are_forecast() {
        let mut values: Vec<f64> = (0..30)
            .map(|i| 50.0 + if i % 7 < 5 { 10.0 } else { -5.0 } + i as f64 * 0.1)
            .collect();
        values[0] = f64::NAN;
        values[12] = f64::NAN;
        values[29] = f64::NAN;

        let mut engine = AugursEngine::default();
        engine.fit(&daily(&values)).unwrap();
        assert!(engine.name().starts_with("MSTL(period=7)"));

        let df = engine.predict(5).unwrap();
        assert_eq!(df.height(), 35);

        let yhat = crate::utils::series_f64(df.column(YHAT).unwrap().as_materialized_series())
            .unwrap();
        assert!(yhat.iter().all(|v| v.is_some_and(f64::is_finite)));
        assert_eq!(yhat[0], yhat[1]);

        let y = df.column(Y).unwrap();
        assert_eq!(y.null_count(), 3 + 5);
    }

    #[test]
    fn test_stitch_backfills_leading_rows() {
        let in_sample = Forecast {
            point: vec![1.0, 2.0],
            intervals: None,
        };
        let ahead = Forecast {
            point: vec![3.0, 4.0],
            intervals: None,
        };
        let span = ObservedSpan {
            lead: 2,
            len: 2,
            trail: 1,
        };
        let (point, _, upper) = stitch(&in_sample, &ahead, span, 2);
        assert_eq!(point, vec![1.0, 1.0, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(upper.len(), 6);
    }

    #[test]
    fn test_stitch_pads_and_collapses_intervals() {
        let in_sample = Forecast {
            point: vec![1.0, 2.0],
            intervals: None,
        };
        let ahead = Forecast {
            point: vec![3.0],
            intervals: None,
        };
        let span = ObservedSpan {
            lead: 0,
            len: 3,
            trail: 0,
        };
        let (point, lower, upper) = stitch(&in_sample, &ahead, span, 1);
        assert_eq!(point.len(), 4);
        assert!(point[2].is_nan());
        assert_eq!(point[3], 3.0);
        assert_eq!(lower[3], 3.0);
        assert_eq!(upper[0], 1.0);
    }
}
