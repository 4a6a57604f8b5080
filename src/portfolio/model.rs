//! Portfolio model traits and the fixed-input models
//!
//! This module implements the shared shape of every portfolio model
//! including:
//! - `MarketContext`: read-only market data (assets, returns, covariances)
//! - `PortfolioModel`: the four derived quantities every model exposes
//! - `DerivedCache`: generation-stamped memoization of those quantities
//! - `FixedReturnsPortfolio` and `FixedWeightsPortfolio`
//!
//! Derived quantities are computed lazily and cached against a generation
//! counter. Every mutator bumps the generation, so stale values can never
//! be observed; there is no manual invalidate call to forget.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::linalg::correlations_and_volatilities;

use super::equilibrium::{generated_asset_keys, MarketEquilibrium};
use super::PortfolioError;

/// Read-only market data a model can be built from.
pub trait MarketContext {
    fn assets(&self) -> &[String];

    /// Expected excess returns per asset.
    fn asset_returns(&self) -> DVector<f64>;

    fn covariances(&self) -> DMatrix<f64>;

    fn correlations(&self) -> DMatrix<f64> {
        correlations_and_volatilities(&self.covariances()).0
    }

    fn volatilities(&self) -> DVector<f64> {
        correlations_and_volatilities(&self.covariances()).1
    }

    fn size(&self) -> usize {
        self.assets().len()
    }
}

/// The derived quantities every portfolio model exposes.
///
/// Accessors take `&mut self` because results are computed lazily and
/// cached. `volatility` and `sharpe_ratio` are derived from the other
/// four and rarely need overriding.
pub trait PortfolioModel {
    fn asset_returns(&mut self) -> Result<DVector<f64>, PortfolioError>;

    fn asset_weights(&mut self) -> Result<DVector<f64>, PortfolioError>;

    /// Expected portfolio return `wᵀr`.
    fn mean_return(&mut self) -> Result<f64, PortfolioError>;

    /// Portfolio variance `wᵀCw`.
    fn return_variance(&mut self) -> Result<f64, PortfolioError>;

    fn volatility(&mut self) -> Result<f64, PortfolioError> {
        Ok(self.return_variance()?.max(0.0).sqrt())
    }

    fn sharpe_ratio(&mut self, risk_free_return: f64) -> Result<f64, PortfolioError> {
        let excess = self.mean_return()? - risk_free_return;
        Ok(excess / self.volatility()?)
    }
}

/// Generation-stamped cache for the four derived quantities.
///
/// A cached value is valid only while its stamp matches the current
/// generation; `invalidate` bumps the generation and implicitly drops
/// everything.
#[derive(Debug, Clone, Default)]
pub(crate) struct DerivedCache {
    generation: u64,
    asset_returns: Option<(u64, DVector<f64>)>,
    asset_weights: Option<(u64, DVector<f64>)>,
    mean_return: Option<(u64, f64)>,
    return_variance: Option<(u64, f64)>,
}

impl DerivedCache {
    pub fn invalidate(&mut self) {
        self.generation += 1;
    }

    pub fn asset_returns_or(
        &mut self,
        compute: impl FnOnce() -> Result<DVector<f64>, PortfolioError>,
    ) -> Result<DVector<f64>, PortfolioError> {
        if let Some((stamp, value)) = &self.asset_returns {
            if *stamp == self.generation {
                return Ok(value.clone());
            }
        }
        let value = compute()?;
        self.asset_returns = Some((self.generation, value.clone()));
        Ok(value)
    }

    pub fn asset_weights_or(
        &mut self,
        compute: impl FnOnce() -> Result<DVector<f64>, PortfolioError>,
    ) -> Result<DVector<f64>, PortfolioError> {
        if let Some(value) = self.asset_weights_cached() {
            return Ok(value);
        }
        let value = compute()?;
        self.store_asset_weights(value.clone());
        Ok(value)
    }

    /// Split-phase access for callers whose weight computation needs
    /// `&mut self` on the owning model.
    pub fn asset_weights_cached(&self) -> Option<DVector<f64>> {
        match &self.asset_weights {
            Some((stamp, value)) if *stamp == self.generation => Some(value.clone()),
            _ => None,
        }
    }

    pub fn store_asset_weights(&mut self, value: DVector<f64>) {
        self.asset_weights = Some((self.generation, value));
    }

    pub fn mean_return_or(
        &mut self,
        compute: impl FnOnce() -> Result<f64, PortfolioError>,
    ) -> Result<f64, PortfolioError> {
        if let Some((stamp, value)) = self.mean_return {
            if stamp == self.generation {
                return Ok(value);
            }
        }
        let value = compute()?;
        self.mean_return = Some((self.generation, value));
        Ok(value)
    }

    pub fn return_variance_or(
        &mut self,
        compute: impl FnOnce() -> Result<f64, PortfolioError>,
    ) -> Result<f64, PortfolioError> {
        if let Some((stamp, value)) = self.return_variance {
            if stamp == self.generation {
                return Ok(value);
            }
        }
        let value = compute()?;
        self.return_variance = Some((self.generation, value));
        Ok(value)
    }
}

/// A plain data portfolio: weights held alongside the market data.
///
/// Used as the target and the components of a mixing problem, and as a
/// ready-made `MarketContext` for model constructors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimplePortfolio {
    asset_keys: Vec<String>,
    weights: DVector<f64>,
    returns: DVector<f64>,
    covariances: DMatrix<f64>,
}

impl SimplePortfolio {
    pub fn new(
        asset_keys: Vec<String>,
        weights: DVector<f64>,
        returns: DVector<f64>,
        covariances: DMatrix<f64>,
    ) -> Result<Self, PortfolioError> {
        let n = asset_keys.len();
        if weights.len() != n || returns.len() != n {
            return Err(PortfolioError::DimensionMismatch(format!(
                "{} keys, {} weights, {} returns",
                n,
                weights.len(),
                returns.len()
            )));
        }
        if covariances.nrows() != n || covariances.ncols() != n {
            return Err(PortfolioError::DimensionMismatch(format!(
                "{}x{} covariances for {} assets",
                covariances.nrows(),
                covariances.ncols(),
                n
            )));
        }
        Ok(Self {
            asset_keys,
            weights,
            returns,
            covariances,
        })
    }

    /// A weights-only portfolio, for mixing problems where returns and
    /// covariances play no role.
    pub fn from_weights(weights: DVector<f64>) -> Self {
        let n = weights.len();
        Self {
            asset_keys: generated_asset_keys(n),
            weights,
            returns: DVector::zeros(n),
            covariances: DMatrix::zeros(n, n),
        }
    }

    pub fn weights(&self) -> &DVector<f64> {
        &self.weights
    }
}

impl MarketContext for SimplePortfolio {
    fn assets(&self) -> &[String] {
        &self.asset_keys
    }

    fn asset_returns(&self) -> DVector<f64> {
        self.returns.clone()
    }

    fn covariances(&self) -> DMatrix<f64> {
        self.covariances.clone()
    }
}

/// A portfolio whose expected returns are given; the weights are derived
/// through the equilibrium inverse map.
#[derive(Debug, Clone)]
pub struct FixedReturnsPortfolio {
    equilibrium: MarketEquilibrium,
    returns: DVector<f64>,
    cache: DerivedCache,
}

impl FixedReturnsPortfolio {
    pub fn new(
        equilibrium: MarketEquilibrium,
        returns: DVector<f64>,
    ) -> Result<Self, PortfolioError> {
        if returns.len() != equilibrium.size() {
            return Err(PortfolioError::DimensionMismatch(format!(
                "{} returns for {} assets",
                returns.len(),
                equilibrium.size()
            )));
        }
        Ok(Self {
            equilibrium,
            returns,
            cache: DerivedCache::default(),
        })
    }

    pub fn equilibrium(&self) -> &MarketEquilibrium {
        &self.equilibrium
    }

    pub fn set_returns(&mut self, returns: DVector<f64>) -> Result<(), PortfolioError> {
        if returns.len() != self.equilibrium.size() {
            return Err(PortfolioError::DimensionMismatch(format!(
                "{} returns for {} assets",
                returns.len(),
                self.equilibrium.size()
            )));
        }
        self.returns = returns;
        self.cache.invalidate();
        Ok(())
    }

    pub fn set_risk_aversion(&mut self, factor: f64) {
        self.equilibrium.set_risk_aversion(factor);
        self.cache.invalidate();
    }
}

impl PortfolioModel for FixedReturnsPortfolio {
    fn asset_returns(&mut self) -> Result<DVector<f64>, PortfolioError> {
        Ok(self.returns.clone())
    }

    fn asset_weights(&mut self) -> Result<DVector<f64>, PortfolioError> {
        let equilibrium = &self.equilibrium;
        let returns = &self.returns;
        self.cache
            .asset_weights_or(|| equilibrium.calculate_asset_weights(returns))
    }

    fn mean_return(&mut self) -> Result<f64, PortfolioError> {
        let weights = self.asset_weights()?;
        let returns = &self.returns;
        self.cache.mean_return_or(|| Ok(weights.dot(returns)))
    }

    fn return_variance(&mut self) -> Result<f64, PortfolioError> {
        let weights = self.asset_weights()?;
        let equilibrium = &self.equilibrium;
        self.cache
            .return_variance_or(|| equilibrium.calculate_portfolio_variance(&weights))
    }
}

/// A portfolio whose weights are given; the expected returns are derived
/// through the equilibrium forward map.
#[derive(Debug, Clone)]
pub struct FixedWeightsPortfolio {
    equilibrium: MarketEquilibrium,
    weights: DVector<f64>,
    cache: DerivedCache,
}

impl FixedWeightsPortfolio {
    pub fn new(
        equilibrium: MarketEquilibrium,
        weights: DVector<f64>,
    ) -> Result<Self, PortfolioError> {
        if weights.len() != equilibrium.size() {
            return Err(PortfolioError::DimensionMismatch(format!(
                "{} weights for {} assets",
                weights.len(),
                equilibrium.size()
            )));
        }
        Ok(Self {
            equilibrium,
            weights,
            cache: DerivedCache::default(),
        })
    }

    pub fn equilibrium(&self) -> &MarketEquilibrium {
        &self.equilibrium
    }

    pub fn set_weights(&mut self, weights: DVector<f64>) -> Result<(), PortfolioError> {
        if weights.len() != self.equilibrium.size() {
            return Err(PortfolioError::DimensionMismatch(format!(
                "{} weights for {} assets",
                weights.len(),
                self.equilibrium.size()
            )));
        }
        self.weights = weights;
        self.cache.invalidate();
        Ok(())
    }

    pub fn set_risk_aversion(&mut self, factor: f64) {
        self.equilibrium.set_risk_aversion(factor);
        self.cache.invalidate();
    }
}

impl PortfolioModel for FixedWeightsPortfolio {
    fn asset_returns(&mut self) -> Result<DVector<f64>, PortfolioError> {
        let equilibrium = &self.equilibrium;
        let weights = &self.weights;
        self.cache
            .asset_returns_or(|| equilibrium.calculate_asset_returns(weights))
    }

    fn asset_weights(&mut self) -> Result<DVector<f64>, PortfolioError> {
        Ok(self.weights.clone())
    }

    fn mean_return(&mut self) -> Result<f64, PortfolioError> {
        let returns = self.asset_returns()?;
        let weights = &self.weights;
        self.cache.mean_return_or(|| Ok(weights.dot(&returns)))
    }

    fn return_variance(&mut self) -> Result<f64, PortfolioError> {
        let equilibrium = &self.equilibrium;
        let weights = &self.weights;
        self.cache
            .return_variance_or(|| equilibrium.calculate_portfolio_variance(weights))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn equilibrium() -> MarketEquilibrium {
        let covariances = DMatrix::from_row_slice(2, 2, &[0.04, 0.01, 0.01, 0.09]);
        MarketEquilibrium::from_covariances(covariances, 1.0).unwrap()
    }

    #[test]
    fn test_cache_returns_stamped_value() {
        let mut cache = DerivedCache::default();
        let mut calls = 0;

        for _ in 0..3 {
            let value = cache
                .mean_return_or(|| {
                    calls += 1;
                    Ok(0.05)
                })
                .unwrap();
            assert_eq!(value, 0.05);
        }
        assert_eq!(calls, 1);

        cache.invalidate();
        cache
            .mean_return_or(|| {
                calls += 1;
                Ok(0.06)
            })
            .unwrap();
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_cache_does_not_store_failures() {
        let mut cache = DerivedCache::default();

        let failed: Result<f64, PortfolioError> = cache
            .return_variance_or(|| Err(PortfolioError::InvalidInput("bad".to_string())));
        assert!(failed.is_err());

        let value = cache.return_variance_or(|| Ok(1.5)).unwrap();
        assert_eq!(value, 1.5);
    }

    #[test]
    fn test_fixed_returns_derives_weights() {
        let equilibrium = equilibrium();
        let weights = DVector::from_vec(vec![0.3, 0.7]);
        let returns = equilibrium.calculate_asset_returns(&weights).unwrap();

        let mut model = FixedReturnsPortfolio::new(equilibrium, returns.clone()).unwrap();
        assert!((&model.asset_weights().unwrap() - &weights).abs().max() < 1e-12);
        assert!((&model.asset_returns().unwrap() - &returns).abs().max() < 1e-15);

        let expected_mean = weights.dot(&returns);
        assert!((model.mean_return().unwrap() - expected_mean).abs() < 1e-12);
    }

    #[test]
    fn test_fixed_weights_derives_returns() {
        let equilibrium = equilibrium();
        let weights = DVector::from_vec(vec![0.5, 0.5]);
        let mut model = FixedWeightsPortfolio::new(equilibrium, weights).unwrap();

        let returns = model.asset_returns().unwrap();
        assert!((returns[0] - 0.025).abs() < 1e-15);
        assert!((returns[1] - 0.05).abs() < 1e-15);

        let variance = model.return_variance().unwrap();
        assert!((variance - 0.0375).abs() < 1e-15);
        assert!((model.volatility().unwrap() - 0.0375_f64.sqrt()).abs() < 1e-15);
    }

    #[test]
    fn test_mutation_invalidates_derived_values() {
        let mut model =
            FixedWeightsPortfolio::new(equilibrium(), DVector::from_vec(vec![1.0, 0.0])).unwrap();
        let before = model.asset_returns().unwrap();

        model.set_weights(DVector::from_vec(vec![0.0, 1.0])).unwrap();
        let after = model.asset_returns().unwrap();
        assert!((before[0] - 0.04).abs() < 1e-15);
        assert!((after[0] - 0.01).abs() < 1e-15);

        model.set_risk_aversion(2.0);
        let scaled = model.asset_returns().unwrap();
        assert!((scaled[0] - 0.02).abs() < 1e-15);
    }

    #[test]
    fn test_sharpe_ratio() {
        let mut model =
            FixedWeightsPortfolio::new(equilibrium(), DVector::from_vec(vec![0.5, 0.5])).unwrap();
        let mean = model.mean_return().unwrap();
        let volatility = model.volatility().unwrap();

        let sharpe = model.sharpe_ratio(0.01).unwrap();
        assert!((sharpe - (mean - 0.01) / volatility).abs() < 1e-12);
    }

    #[test]
    fn test_simple_portfolio_context() {
        let portfolio = SimplePortfolio::new(
            vec!["A".to_string(), "B".to_string()],
            DVector::from_vec(vec![0.6, 0.4]),
            DVector::from_vec(vec![0.08, 0.03]),
            DMatrix::from_row_slice(2, 2, &[0.04, 0.01, 0.01, 0.09]),
        )
        .unwrap();

        assert_eq!(portfolio.size(), 2);
        assert_eq!(portfolio.assets()[1], "B");
        assert!((portfolio.volatilities()[0] - 0.2).abs() < 1e-12);
        assert!((portfolio.correlations()[(0, 1)] - 0.01 / (0.2 * 0.3)).abs() < 1e-12);

        let short = SimplePortfolio::new(
            vec!["A".to_string()],
            DVector::from_vec(vec![1.0, 0.0]),
            DVector::zeros(1),
            DMatrix::zeros(1, 1),
        );
        assert!(short.is_err());
    }
}
