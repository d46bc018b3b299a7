//! Serializable pipeline configuration.
//!
//! Loaded from TOML; every section and field has a default, so an empty file
//! is a valid config. [`PipelineConfig::validate`] rejects values the
//! pipeline cannot run with.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use edgelab_core::evaluator::{SameBarPolicy, DEFAULT_BUFFER_BPS};
use edgelab_core::forecast::ModelConfig;
use edgelab_core::journal::DEFAULT_MAX_HOLD_DAYS;
use edgelab_core::labeling::LabelConfig;
use edgelab_core::sizing::DEFAULT_MULTIPLIER;
use edgelab_core::watchlist::DEFAULT_RISK_DOLLARS;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::walk_forward::MIN_TRAIN_ROWS;

/// Unique identifier for a pipeline run (content-addressable hash).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

/// Full configuration for one research pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub data: DataConfig,
    pub labeling: LabelConfig,
    pub model: ModelConfig,
    pub backtest: BacktestConfig,
    pub signal: SignalConfig,
    pub account: AccountConfig,
    pub closer: CloserConfig,
    pub watchlist: WatchlistConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data: DataConfig::default(),
            // short windows keep enough rows on a few years of daily bars
            labeling: LabelConfig {
                horizon: 3,
                tp_sigma: 0.8,
                sl_sigma: 0.6,
                vol_lookback: 5,
            },
            model: ModelConfig::default(),
            backtest: BacktestConfig::default(),
            signal: SignalConfig::default(),
            account: AccountConfig::default(),
            closer: CloserConfig::default(),
            watchlist: WatchlistConfig::default(),
        }
    }
}

/// Where prices come from and where artifacts go.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub symbol: String,
    /// Root of the dataset store (prices, logs, cache).
    pub dataset_dir: PathBuf,
    /// Provider fetch window; defaults to the last five years.
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    /// Never touch the network.
    pub offline: bool,
    /// Fall back to a seeded synthetic series when nothing else is available.
    pub synthetic: bool,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            symbol: "SPY".into(),
            dataset_dir: PathBuf::from("data"),
            start: None,
            end: None,
            offline: false,
            synthetic: false,
        }
    }
}

/// Walk-forward split and cost model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    /// Round-trip cost in basis points, also the signal threshold.
    pub cost_bps: f64,
    /// Fraction of rows used for training.
    pub train_frac: f64,
    /// Minimum training rows regardless of `train_frac`; at least
    /// [`MIN_TRAIN_ROWS`].
    pub min_train: usize,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            cost_bps: 1.5,
            train_frac: 0.7,
            min_train: MIN_TRAIN_ROWS,
        }
    }
}

/// Latest-signal translation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    /// Forecast horizon assumed when suggesting option expiries.
    pub horizon_bars: usize,
    /// Returns in the realized-volatility estimate.
    pub sigma_window: usize,
    /// Volatility reported when the estimate is undefined.
    pub fallback_sigma: f64,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            horizon_bars: 20,
            sigma_window: 20,
            fallback_sigma: 0.02,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountConfig {
    pub equity: f64,
    pub risk_per_trade_pct: f64,
    pub max_leverage: f64,
    /// Expected premium per option contract; `None` disables option sizing.
    pub option_premium: Option<f64>,
    pub max_premium_pct: f64,
    pub contract_multiplier: u32,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            equity: 10_000.0,
            risk_per_trade_pct: 0.01,
            max_leverage: 2.0,
            option_premium: Some(2.5),
            max_premium_pct: 0.01,
            contract_multiplier: DEFAULT_MULTIPLIER,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloserConfig {
    pub max_hold_days: i64,
}

impl Default for CloserConfig {
    fn default() -> Self {
        Self {
            max_hold_days: DEFAULT_MAX_HOLD_DAYS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchlistConfig {
    /// Dollars risked per idea between entry and stop.
    pub risk_dollars: f64,
    /// Equity symbols to plan.
    pub symbols: Vec<String>,
    /// Also plan the fixed crypto pairs.
    pub include_crypto: bool,
    pub same_bar_policy: SameBarPolicy,
    pub buffer_bps: f64,
}

impl Default for WatchlistConfig {
    fn default() -> Self {
        Self {
            risk_dollars: DEFAULT_RISK_DOLLARS,
            symbols: Vec::new(),
            include_crypto: true,
            same_bar_policy: SameBarPolicy::default(),
            buffer_bps: DEFAULT_BUFFER_BPS,
        }
    }
}

impl PipelineConfig {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let cfg: Self = toml::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.data.symbol.trim().is_empty() {
            return Err(invalid("data.symbol", "must not be empty"));
        }
        if let (Some(s), Some(e)) = (self.data.start, self.data.end) {
            if s > e {
                return Err(invalid("data.start", format!("{s} is after end {e}")));
            }
        }
        if self.data.offline && self.data.synthetic {
            return Err(invalid("data.synthetic", "cannot be combined with offline"));
        }

        let l = &self.labeling;
        if l.horizon == 0 {
            return Err(invalid("labeling.horizon", "must be at least 1"));
        }
        if l.vol_lookback < 2 {
            return Err(invalid("labeling.vol_lookback", "must be at least 2"));
        }
        if !(l.tp_sigma > 0.0) || !(l.sl_sigma > 0.0) {
            return Err(invalid("labeling", "barrier multiples must be positive"));
        }

        self.model
            .check_quantiles()
            .map_err(|e| invalid("model.quantiles", e.to_string()))?;
        if self.model.n_estimators == 0 || self.model.max_depth == 0 {
            return Err(invalid("model", "n_estimators and max_depth must be positive"));
        }
        if !(self.model.subsample > 0.0 && self.model.subsample <= 1.0) {
            return Err(invalid("model.subsample", "must be in (0, 1]"));
        }
        if !(self.model.learning_rate > 0.0) {
            return Err(invalid("model.learning_rate", "must be positive"));
        }
        if self.model.ridge_alpha < 0.0 {
            return Err(invalid("model.ridge_alpha", "must be non-negative"));
        }

        let b = &self.backtest;
        if !(b.train_frac > 0.0 && b.train_frac < 1.0) {
            return Err(invalid("backtest.train_frac", "must be in (0, 1)"));
        }
        if !(b.cost_bps >= 0.0) {
            return Err(invalid("backtest.cost_bps", "must be non-negative"));
        }
        if b.min_train < MIN_TRAIN_ROWS {
            return Err(invalid(
                "backtest.min_train",
                format!("must be at least {MIN_TRAIN_ROWS}"),
            ));
        }

        if self.signal.sigma_window < 2 {
            return Err(invalid("signal.sigma_window", "must be at least 2"));
        }

        let a = &self.account;
        if !(a.equity > 0.0) {
            return Err(invalid("account.equity", "must be positive"));
        }
        if !(a.risk_per_trade_pct > 0.0 && a.risk_per_trade_pct <= 1.0) {
            return Err(invalid("account.risk_per_trade_pct", "must be in (0, 1]"));
        }
        if !(a.max_leverage > 0.0) {
            return Err(invalid("account.max_leverage", "must be positive"));
        }

        if self.closer.max_hold_days < 1 {
            return Err(invalid("closer.max_hold_days", "must be at least 1"));
        }
        if !(self.watchlist.risk_dollars > 0.0) {
            return Err(invalid("watchlist.risk_dollars", "must be positive"));
        }
        Ok(())
    }

    /// Deterministic id over this config and the dataset it ran on.
    pub fn run_id(&self, dataset_hash: &str) -> RunId {
        let json = serde_json::to_vec(self).unwrap_or_default();
        let mut hasher = blake3::Hasher::new();
        hasher.update(&json);
        hasher.update(dataset_hash.as_bytes());
        hasher.finalize().to_hex().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_is_default() {
        let cfg = PipelineConfig::from_toml("").unwrap();
        assert_eq!(cfg, PipelineConfig::default());
        assert_eq!(cfg.labeling.horizon, 3);
        assert_eq!(cfg.backtest.cost_bps, 1.5);
        assert_eq!(cfg.model.quantiles, vec![0.15, 0.5, 0.85]);
    }

    #[test]
    fn sections_override_fields() {
        let cfg = PipelineConfig::from_toml(
            r#"
            [data]
            symbol = "QQQ"
            start = "2020-01-01"

            [backtest]
            train_frac = 0.6

            [model]
            n_estimators = 50
            sort_quantiles = true

            [watchlist]
            symbols = ["AAPL", "MSFT"]
            same_bar_policy = "worst_case"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.data.symbol, "QQQ");
        assert_eq!(cfg.data.start, NaiveDate::from_ymd_opt(2020, 1, 1));
        assert_eq!(cfg.backtest.train_frac, 0.6);
        assert_eq!(cfg.backtest.cost_bps, 1.5);
        assert_eq!(cfg.model.n_estimators, 50);
        assert!(cfg.model.sort_quantiles);
        assert_eq!(cfg.watchlist.same_bar_policy, SameBarPolicy::WorstCase);
    }

    #[test]
    fn rejects_out_of_range_values() {
        for toml in [
            "[backtest]\ntrain_frac = 1.0",
            "[backtest]\ntrain_frac = 0.0",
            "[backtest]\nmin_train = 0",
            "[backtest]\nmin_train = 49",
            "[labeling]\nhorizon = 0",
            "[model]\nquantiles = [0.1, 0.9]",
            "[model]\nquantiles = [0.0, 0.5, 0.9]",
            "[account]\nequity = -5.0",
            "[closer]\nmax_hold_days = 0",
        ] {
            assert!(
                matches!(PipelineConfig::from_toml(toml), Err(ConfigError::Invalid { .. })),
                "accepted: {toml}"
            );
        }
    }

    #[test]
    fn bad_toml_is_a_parse_error() {
        assert!(matches!(
            PipelineConfig::from_toml("[backtest\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn run_id_tracks_config_and_data() {
        let a = PipelineConfig::default();
        let mut b = a.clone();
        b.backtest.cost_bps = 2.0;

        assert_eq!(a.run_id("h1"), a.run_id("h1"));
        assert_ne!(a.run_id("h1"), b.run_id("h1"));
        assert_ne!(a.run_id("h1"), a.run_id("h2"));
        assert_eq!(a.run_id("h1").len(), 64);
    }
}
