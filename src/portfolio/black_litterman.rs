//! Black-Litterman view blending
//!
//! This module implements posterior weight estimation from an equilibrium
//! prior and investor views including:
//! - `View`: a portfolio of assets, its believed mean return and a
//!   `ViewConfidence` saying how strongly the belief binds
//! - The posterior update `w* = w₀ + Pᵀ (P C Pᵀ + Ω)⁻¹ (q − P C w₀)`,
//!   where `P` stacks the view portfolios, `Ω` is the diagonal of view
//!   variances and `q` holds the view means divided by the risk aversion
//! - Resolution of every confidence kind to an `Ω` entry
//!
//! With no views the posterior is the prior, exactly. The blend system is
//! k×k for k views, so small view counts run through the closed-form
//! symmetric kernels.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::linalg::{dispatch, StructureHints};

use super::equilibrium::MarketEquilibrium;
use super::model::{DerivedCache, PortfolioModel};
use super::PortfolioError;

/// How strongly a view binds, resolved to a view variance.
///
/// Smaller variance means a stronger pull toward the view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ViewConfidence {
    /// The view portfolio's model-implied variance divided by the model's
    /// global confidence factor.
    Balanced,
    /// The model-implied variance times an explicit scale.
    Scaled(f64),
    /// An explicit variance, bypassing the model-implied one.
    Variance(f64),
}

/// An investor view: a portfolio and its believed mean return.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct View {
    weights: DVector<f64>,
    mean_return: f64,
    confidence: ViewConfidence,
}

impl View {
    pub fn weights(&self) -> &DVector<f64> {
        &self.weights
    }

    pub fn mean_return(&self) -> f64 {
        self.mean_return
    }

    pub fn confidence(&self) -> ViewConfidence {
        self.confidence
    }
}

/// The Black-Litterman posterior model.
///
/// Holds the prior weights and the views; posterior weights, the returns
/// they imply and the summary statistics are derived lazily.
#[derive(Debug, Clone)]
pub struct BlackLittermanModel {
    equilibrium: MarketEquilibrium,
    original_weights: DVector<f64>,
    views: Vec<View>,
    confidence: f64,
    cache: DerivedCache,
}

impl BlackLittermanModel {
    pub fn new(
        equilibrium: MarketEquilibrium,
        original_weights: DVector<f64>,
    ) -> Result<Self, PortfolioError> {
        if original_weights.len() != equilibrium.size() {
            return Err(PortfolioError::DimensionMismatch(format!(
                "{} prior weights for {} assets",
                original_weights.len(),
                equilibrium.size()
            )));
        }
        Ok(Self {
            equilibrium,
            original_weights,
            views: Vec::new(),
            confidence: 1.0,
            cache: DerivedCache::default(),
        })
    }

    pub fn equilibrium(&self) -> &MarketEquilibrium {
        &self.equilibrium
    }

    pub fn original_weights(&self) -> &DVector<f64> {
        &self.original_weights
    }

    pub fn views(&self) -> &[View] {
        &self.views
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Sets the global confidence dividing balanced view variances.
    pub fn set_confidence(&mut self, confidence: f64) -> Result<(), PortfolioError> {
        if !confidence.is_finite() || confidence <= 0.0 {
            return Err(PortfolioError::InvalidInput(format!(
                "confidence must be positive and finite, got {}",
                confidence
            )));
        }
        self.confidence = confidence;
        self.cache.invalidate();
        Ok(())
    }

    pub fn set_risk_aversion(&mut self, factor: f64) {
        self.equilibrium.set_risk_aversion(factor);
        self.cache.invalidate();
    }

    fn check_view_weights(&self, weights: &DVector<f64>) -> Result<(), PortfolioError> {
        if weights.len() != self.equilibrium.size() {
            return Err(PortfolioError::DimensionMismatch(format!(
                "view has {} weights for {} assets",
                weights.len(),
                self.equilibrium.size()
            )));
        }
        Ok(())
    }

    fn push_view(&mut self, view: View) {
        debug!(
            views = self.views.len() + 1,
            mean_return = view.mean_return,
            "view added"
        );
        self.views.push(view);
        self.cache.invalidate();
    }

    /// Adds a view at balanced confidence.
    pub fn add_view(
        &mut self,
        weights: DVector<f64>,
        mean_return: f64,
    ) -> Result<(), PortfolioError> {
        self.check_view_weights(&weights)?;
        self.push_view(View {
            weights,
            mean_return,
            confidence: ViewConfidence::Balanced,
        });
        Ok(())
    }

    /// Adds a view whose variance is the model-implied variance times
    /// `scale`. Scales below one bind more strongly than balanced.
    pub fn add_view_with_scale(
        &mut self,
        weights: DVector<f64>,
        mean_return: f64,
        scale: f64,
    ) -> Result<(), PortfolioError> {
        self.check_view_weights(&weights)?;
        if !scale.is_finite() || scale <= 0.0 {
            return Err(PortfolioError::InvalidInput(format!(
                "view scale must be positive and finite, got {}",
                scale
            )));
        }
        self.push_view(View {
            weights,
            mean_return,
            confidence: ViewConfidence::Scaled(scale),
        });
        Ok(())
    }

    /// Adds a view with an explicitly stated variance.
    #[deprecated(note = "state confidence relative to the model-implied variance instead, \
                         via add_view or add_view_with_scale")]
    pub fn add_view_with_variance(
        &mut self,
        weights: DVector<f64>,
        mean_return: f64,
        variance: f64,
    ) -> Result<(), PortfolioError> {
        self.check_view_weights(&weights)?;
        if !variance.is_finite() || variance < 0.0 {
            return Err(PortfolioError::InvalidInput(format!(
                "view variance must be nonnegative and finite, got {}",
                variance
            )));
        }
        self.push_view(View {
            weights,
            mean_return,
            confidence: ViewConfidence::Variance(variance),
        });
        Ok(())
    }

    fn posterior_weights(
        equilibrium: &MarketEquilibrium,
        original_weights: &DVector<f64>,
        views: &[View],
        confidence: f64,
    ) -> Result<DVector<f64>, PortfolioError> {
        if views.is_empty() {
            return Ok(original_weights.clone());
        }

        let n = equilibrium.size();
        let k = views.len();
        let risk_aversion = equilibrium.risk_aversion();
        let covariances = equilibrium.covariances();

        let mut view_matrix = DMatrix::zeros(k, n);
        for (v, view) in views.iter().enumerate() {
            for a in 0..n {
                view_matrix[(v, a)] = view.weights[a];
            }
        }

        // P C Pᵀ; its diagonal is each view's model-implied variance.
        let mut system = &view_matrix * (covariances * view_matrix.transpose());
        for (v, view) in views.iter().enumerate() {
            let implied = system[(v, v)];
            let variance = match view.confidence {
                ViewConfidence::Balanced => implied / confidence,
                ViewConfidence::Scaled(scale) => scale * implied,
                ViewConfidence::Variance(variance) => variance,
            };
            system[(v, v)] += variance;
        }

        let prior = covariances * original_weights;
        let mut rhs = DVector::zeros(k);
        for (v, view) in views.iter().enumerate() {
            rhs[v] = view.mean_return / risk_aversion - view.weights.dot(&prior);
        }

        let adjustment = dispatch::solve(
            &system,
            &rhs,
            StructureHints::symmetric_positive_definite(),
        )?;
        debug!(views = k, "blended views into posterior");
        Ok(original_weights + view_matrix.transpose() * adjustment)
    }
}

impl PortfolioModel for BlackLittermanModel {
    fn asset_returns(&mut self) -> Result<DVector<f64>, PortfolioError> {
        let weights = self.asset_weights()?;
        let equilibrium = &self.equilibrium;
        self.cache
            .asset_returns_or(|| equilibrium.calculate_asset_returns(&weights))
    }

    fn asset_weights(&mut self) -> Result<DVector<f64>, PortfolioError> {
        let equilibrium = &self.equilibrium;
        let original_weights = &self.original_weights;
        let views = &self.views;
        let confidence = self.confidence;
        self.cache.asset_weights_or(|| {
            Self::posterior_weights(equilibrium, original_weights, views, confidence)
        })
    }

    fn mean_return(&mut self) -> Result<f64, PortfolioError> {
        let weights = self.asset_weights()?;
        let returns = self.asset_returns()?;
        self.cache.mean_return_or(|| Ok(weights.dot(&returns)))
    }

    fn return_variance(&mut self) -> Result<f64, PortfolioError> {
        let weights = self.asset_weights()?;
        let equilibrium = &self.equilibrium;
        self.cache
            .return_variance_or(|| equilibrium.calculate_portfolio_variance(&weights))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> BlackLittermanModel {
        let covariances = DMatrix::from_row_slice(2, 2, &[0.04, 0.01, 0.01, 0.09]);
        let equilibrium = MarketEquilibrium::from_covariances(covariances, 1.0).unwrap();
        BlackLittermanModel::new(equilibrium, DVector::from_vec(vec![0.5, 0.5])).unwrap()
    }

    #[test]
    fn test_no_views_is_identity() {
        let mut model = model();
        let weights = model.asset_weights().unwrap();
        assert_eq!(weights, DVector::from_vec(vec![0.5, 0.5]));

        // The implied returns are then exactly the prior's.
        let returns = model.asset_returns().unwrap();
        let prior_returns = model
            .equilibrium()
            .calculate_asset_returns(&DVector::from_vec(vec![0.5, 0.5]))
            .unwrap();
        assert_eq!(returns, prior_returns);
    }

    #[test]
    fn test_posterior_matches_hand_computation() {
        // View p = (1, -1), mean 0.05, explicit variance 0.02.
        // pᵀCp = 0.04 - 0.02 + 0.09 = 0.11; system = 0.13.
        // p·Cw0 = 0.025 - 0.05 = -0.025; rhs = 0.05 + 0.025 = 0.075.
        // y = 0.075 / 0.13; w* = (0.5 + y, 0.5 - y).
        let mut model = model();
        #[allow(deprecated)]
        model
            .add_view_with_variance(DVector::from_vec(vec![1.0, -1.0]), 0.05, 0.02)
            .unwrap();

        let weights = model.asset_weights().unwrap();
        let y = 0.075 / 0.13;
        assert!((weights[0] - (0.5 + y)).abs() < 1e-12, "weights {:?}", weights);
        assert!((weights[1] - (0.5 - y)).abs() < 1e-12);
    }

    #[test]
    fn test_bullish_view_tilts_toward_asset() {
        let mut model = model();
        model
            .add_view(DVector::from_vec(vec![1.0, 0.0]), 0.10)
            .unwrap();

        let weights = model.asset_weights().unwrap();
        // Prior implies 0.025 for asset 0; the view says 0.10.
        assert!(weights[0] > 0.5, "weights {:?}", weights);
        // A single-asset view leaves the other asset's weight alone.
        assert!((weights[1] - 0.5).abs() < 1e-15);
    }

    #[test]
    fn test_confidence_strengthens_tilt() {
        let mut weak = model();
        weak.add_view(DVector::from_vec(vec![1.0, 0.0]), 0.10)
            .unwrap();
        let weak_tilt = weak.asset_weights().unwrap()[0] - 0.5;

        let mut strong = model();
        strong.set_confidence(10.0).unwrap();
        strong
            .add_view(DVector::from_vec(vec![1.0, 0.0]), 0.10)
            .unwrap();
        let strong_tilt = strong.asset_weights().unwrap()[0] - 0.5;

        assert!(weak_tilt > 0.0);
        assert!(strong_tilt > weak_tilt);

        // Scaled(0.1) is the same statement as global confidence 10.
        let mut scaled = model();
        scaled
            .add_view_with_scale(DVector::from_vec(vec![1.0, 0.0]), 0.10, 0.1)
            .unwrap();
        let scaled_weights = scaled.asset_weights().unwrap();
        let strong_weights = strong.asset_weights().unwrap();
        assert!((&scaled_weights - &strong_weights).abs().max() < 1e-12);
    }

    #[test]
    fn test_risk_aversion_scales_view_means() {
        // Doubling the aversion halves q, weakening an optimistic view.
        let mut unit = model();
        unit.add_view(DVector::from_vec(vec![1.0, 0.0]), 0.10)
            .unwrap();
        let unit_tilt = unit.asset_weights().unwrap()[0] - 0.5;

        let mut doubled = model();
        doubled.set_risk_aversion(2.0);
        doubled
            .add_view(DVector::from_vec(vec![1.0, 0.0]), 0.10)
            .unwrap();
        let doubled_tilt = doubled.asset_weights().unwrap()[0] - 0.5;

        assert!(doubled_tilt < unit_tilt);
    }

    #[test]
    fn test_multiple_views_blend() {
        let mut model = model();
        model
            .add_view(DVector::from_vec(vec![1.0, 0.0]), 0.10)
            .unwrap();
        model
            .add_view(DVector::from_vec(vec![0.0, 1.0]), 0.01)
            .unwrap();

        let weights = model.asset_weights().unwrap();
        // Bullish on asset 0, bearish on asset 1 relative to the prior.
        assert!(weights[0] > 0.5);
        assert!(weights[1] < 0.5);

        let mean = model.mean_return().unwrap();
        let variance = model.return_variance().unwrap();
        // Implied returns are C·(ra·w*), so the mean is ra times the
        // variance.
        assert!((mean - variance).abs() < 1e-12);
    }

    #[test]
    fn test_view_validation() {
        let mut model = model();
        let wrong_length = DVector::from_vec(vec![1.0, 0.0, 0.0]);
        assert!(model.add_view(wrong_length, 0.05).is_err());
        assert!(model
            .add_view_with_scale(DVector::from_vec(vec![1.0, 0.0]), 0.05, 0.0)
            .is_err());
        #[allow(deprecated)]
        let negative_variance =
            model.add_view_with_variance(DVector::from_vec(vec![1.0, 0.0]), 0.05, -0.1);
        assert!(negative_variance.is_err());

        assert!(model.set_confidence(0.0).is_err());
        assert!(model.set_confidence(f64::INFINITY).is_err());
        assert!(model.views().is_empty());
    }

    #[test]
    fn test_new_view_invalidates_posterior() {
        let mut model = model();
        let before = model.asset_weights().unwrap();
        model
            .add_view(DVector::from_vec(vec![1.0, 0.0]), 0.10)
            .unwrap();
        let after = model.asset_weights().unwrap();
        assert!(after[0] > before[0]);
    }
}
