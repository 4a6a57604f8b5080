//! Market equilibrium: covariances plus a risk-aversion factor
//!
//! This module implements the bidirectional map between portfolio weights
//! and the excess returns that make those weights optimal including:
//! - `calculate_asset_returns`: weights to implied returns
//! - `calculate_asset_weights`: returns to unconstrained equilibrium weights
//! - Portfolio variance, implied risk aversion and covariance cleaning
//!
//! The risk-aversion factor is kept normalized: zero resets to the default
//! of 1.0 and a negative value is negated, so downstream optimizers can
//! rely on it being strictly positive.

use nalgebra::{storage::RawStorage, DMatrix, DVector, Dim, Matrix};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::linalg::{
    correlations_and_volatilities, covariances_from, dispatch, repair_correlations,
    StructureHints,
};

use super::PortfolioError;

/// Default risk-aversion factor.
pub const DEFAULT_RISK_AVERSION: f64 = 1.0;

/// Below this magnitude an implied risk aversion is considered noise and
/// replaced by the default.
const NEGLIGIBLE_RISK_AVERSION: f64 = 1e-12;

fn normalize_risk_aversion(factor: f64) -> f64 {
    if !factor.is_finite() {
        warn!(factor, "non-finite risk aversion, using default");
        return DEFAULT_RISK_AVERSION;
    }
    if factor == 0.0 {
        return DEFAULT_RISK_AVERSION;
    }
    if factor < 0.0 {
        warn!(factor, "negative risk aversion, negating");
        return -factor;
    }
    factor
}

/// Generates `Asset00`-style keys, zero padded so lexicographic order is
/// numeric order.
pub(crate) fn generated_asset_keys(count: usize) -> Vec<String> {
    let width = count.saturating_sub(1).to_string().len();
    (0..count)
        .map(|i| format!("Asset{:0width$}", i, width = width))
        .collect()
}

/// An asset universe: keys, excess-return covariances and a risk-aversion
/// factor.
///
/// The covariance matrix is read through its upper triangle wherever the
/// symmetric kernels are involved, so only that triangle has to be
/// meaningful. All mutation goes through `set_risk_aversion`; everything
/// else about an instance is fixed at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketEquilibrium {
    asset_keys: Vec<String>,
    covariances: DMatrix<f64>,
    risk_aversion: f64,
}

impl MarketEquilibrium {
    /// Builds an equilibrium over explicitly keyed assets.
    pub fn new(
        asset_keys: Vec<String>,
        covariances: DMatrix<f64>,
        risk_aversion: f64,
    ) -> Result<Self, PortfolioError> {
        if covariances.nrows() == 0 {
            return Err(PortfolioError::InvalidInput(
                "covariance matrix must not be empty".to_string(),
            ));
        }
        if covariances.nrows() != covariances.ncols() {
            return Err(PortfolioError::DimensionMismatch(format!(
                "covariance matrix must be square, got {}x{}",
                covariances.nrows(),
                covariances.ncols()
            )));
        }
        if asset_keys.len() != covariances.nrows() {
            return Err(PortfolioError::DimensionMismatch(format!(
                "{} asset keys for a {}x{} covariance matrix",
                asset_keys.len(),
                covariances.nrows(),
                covariances.ncols()
            )));
        }
        for (i, key) in asset_keys.iter().enumerate() {
            if asset_keys[..i].contains(key) {
                return Err(PortfolioError::InvalidInput(format!(
                    "duplicate asset key {:?}",
                    key
                )));
            }
        }
        Ok(Self {
            asset_keys,
            covariances,
            risk_aversion: normalize_risk_aversion(risk_aversion),
        })
    }

    /// Builds an equilibrium with generated asset keys.
    pub fn from_covariances(
        covariances: DMatrix<f64>,
        risk_aversion: f64,
    ) -> Result<Self, PortfolioError> {
        let keys = generated_asset_keys(covariances.nrows());
        Self::new(keys, covariances, risk_aversion)
    }

    /// Builds an equilibrium from per-asset volatilities and a correlation
    /// matrix.
    pub fn from_volatilities_and_correlations(
        asset_keys: Vec<String>,
        volatilities: DVector<f64>,
        correlations: DMatrix<f64>,
        risk_aversion: f64,
    ) -> Result<Self, PortfolioError> {
        if volatilities.len() != correlations.nrows() {
            return Err(PortfolioError::DimensionMismatch(format!(
                "{} volatilities for a {}x{} correlation matrix",
                volatilities.len(),
                correlations.nrows(),
                correlations.ncols()
            )));
        }
        Self::new(
            asset_keys,
            covariances_from(&correlations, &volatilities),
            risk_aversion,
        )
    }

    pub fn size(&self) -> usize {
        self.covariances.nrows()
    }

    pub fn asset_keys(&self) -> &[String] {
        &self.asset_keys
    }

    pub fn covariances(&self) -> &DMatrix<f64> {
        &self.covariances
    }

    pub fn risk_aversion(&self) -> f64 {
        self.risk_aversion
    }

    /// Replaces the risk-aversion factor, normalized like at construction.
    pub fn set_risk_aversion(&mut self, factor: f64) {
        self.risk_aversion = normalize_risk_aversion(factor);
    }

    /// Whether the factor is exactly the default, letting the maps skip
    /// their scalar multiply.
    fn has_default_risk_aversion(&self) -> bool {
        self.risk_aversion == DEFAULT_RISK_AVERSION
    }

    /// Per-asset volatilities: square roots of the covariance diagonal.
    pub fn volatilities(&self) -> DVector<f64> {
        correlations_and_volatilities(&self.covariances).1
    }

    /// The correlation matrix implied by the covariances.
    pub fn correlations(&self) -> DMatrix<f64> {
        correlations_and_volatilities(&self.covariances).0
    }

    fn check_vector(&self, len: usize, what: &str) -> Result<(), PortfolioError> {
        if len != self.size() {
            return Err(PortfolioError::DimensionMismatch(format!(
                "{} has {} entries for {} assets",
                what,
                len,
                self.size()
            )));
        }
        Ok(())
    }

    /// Maps weights to the excess returns that would make them optimal:
    /// `C · (ra · w)`.
    pub fn calculate_asset_returns(
        &self,
        weights: &DVector<f64>,
    ) -> Result<DVector<f64>, PortfolioError> {
        self.check_vector(weights.len(), "weight vector")?;
        if self.has_default_risk_aversion() {
            Ok(&self.covariances * weights)
        } else {
            Ok(&self.covariances * (self.risk_aversion * weights))
        }
    }

    /// Maps excess returns to the unconstrained equilibrium weights:
    /// solves `C · x = r`, then divides by the risk aversion. No budget or
    /// bound constraints are applied here.
    pub fn calculate_asset_weights(
        &self,
        returns: &DVector<f64>,
    ) -> Result<DVector<f64>, PortfolioError> {
        self.check_vector(returns.len(), "return vector")?;
        let solved = dispatch::solve(
            &self.covariances,
            returns,
            StructureHints::symmetric_positive_definite(),
        )?;
        if self.has_default_risk_aversion() {
            Ok(solved)
        } else {
            Ok(solved / self.risk_aversion)
        }
    }

    /// Portfolio variance `wᵀCw`, reading the covariance upper triangle.
    /// Accepts the weights as either a column or a row vector.
    pub fn calculate_portfolio_variance<R: Dim, C: Dim, S: RawStorage<f64, R, C>>(
        &self,
        weights: &Matrix<f64, R, C, S>,
    ) -> Result<f64, PortfolioError> {
        let n = self.size();
        let is_column = weights.ncols() == 1 && weights.nrows() == n;
        let is_row = weights.nrows() == 1 && weights.ncols() == n;
        if !is_column && !is_row {
            return Err(PortfolioError::DimensionMismatch(format!(
                "weights must be {}x1 or 1x{}, got {}x{}",
                n,
                n,
                weights.nrows(),
                weights.ncols()
            )));
        }

        let mut variance = 0.0;
        for col in 0..n {
            variance += weights[col] * weights[col] * self.covariances[(col, col)];
            for row in 0..col {
                variance += 2.0 * weights[row] * weights[col] * self.covariances[(row, col)];
            }
        }
        Ok(variance)
    }

    /// Fits the scalar `ra` that best explains `returns ≈ ra · C · w` in
    /// the least-squares sense, then normalizes it like any other
    /// risk-aversion factor.
    pub fn calculate_implied_risk_aversion(
        &self,
        weights: &DVector<f64>,
        returns: &DVector<f64>,
    ) -> Result<f64, PortfolioError> {
        self.check_vector(weights.len(), "weight vector")?;
        self.check_vector(returns.len(), "return vector")?;

        let covariance_weights = &self.covariances * weights;
        let system = DMatrix::from_columns(&[covariance_weights]);
        let fitted = dispatch::solve(&system, returns, StructureHints::general())?;
        let factor = fitted[0];

        if factor.abs() < NEGLIGIBLE_RISK_AVERSION || !factor.is_finite() {
            warn!(factor, "implied risk aversion is negligible, using default");
            return Ok(DEFAULT_RISK_AVERSION);
        }
        if factor < 0.0 {
            warn!(factor, "implied risk aversion is negative, negating");
            return Ok(-factor);
        }
        Ok(factor)
    }

    /// Returns a copy whose covariances have been rebuilt from the original
    /// volatilities and an eigenvalue-repaired correlation matrix.
    pub fn clean(&self) -> Self {
        let (correlations, volatilities) = correlations_and_volatilities(&self.covariances);
        let repaired = repair_correlations(&correlations);
        debug!(assets = self.size(), "rebuilt covariances from repaired correlations");
        Self {
            asset_keys: self.asset_keys.clone(),
            covariances: covariances_from(&repaired, &volatilities),
            risk_aversion: self.risk_aversion,
        }
    }
}
