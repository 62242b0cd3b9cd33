//! Forecasting: the engine seam, spacing inference and the default engine.

mod adapter;
mod augurs_engine;
mod engine;
mod frequency;

pub use adapter::{ForecastAdapter, ForecastResult, ForecastRow};
pub use augurs_engine::{AugursEngine, MIN_OBSERVATIONS};
pub use engine::{CanonicalSeries, ForecastEngine};
pub use frequency::Spacing;

/// Output column names produced by every [`ForecastEngine`].
pub mod columns {
    pub use super::engine::{DS, SEASONAL, TREND, Y, YHAT, YHAT_LOWER, YHAT_UPPER};
}
