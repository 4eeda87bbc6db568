use crate::error::PalmError;

use itertools::Itertools;
use ndarray::Array2;
use rand::{Rng, RngCore};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Observed sibling status of a pair of points
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum SiblingLabel {
    Sibling,
    NonSibling,
    Unknown,
}

/// Partially known sibling relations with misclassification probabilities
///
/// `alpha` is the probability that a pair of true siblings is labelled [SiblingLabel::Sibling],
/// `beta` is the probability that a pair of true non-siblings is labelled
/// [SiblingLabel::NonSibling]. The diagonal of the label matrix is ignored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SiblingInfo {
    #[schemars(with = "Vec<Vec<SiblingLabel>>")]
    labels: Array2<SiblingLabel>,
    alpha: f64,
    beta: f64,
}

impl SiblingInfo {
    pub fn new(labels: Array2<SiblingLabel>, alpha: f64, beta: f64) -> Result<Self, PalmError> {
        if labels.nrows() != labels.ncols() {
            return Err(PalmError::configuration(format!(
                "sibling matrix must be square, got {}x{}",
                labels.nrows(),
                labels.ncols()
            )));
        }
        if let Some((i, j)) = (0..labels.nrows())
            .tuple_combinations()
            .find(|&(i, j)| labels[[i, j]] != labels[[j, i]])
        {
            return Err(PalmError::configuration(format!(
                "sibling matrix must be symmetric, entries ({i}, {j}) and ({j}, {i}) differ"
            )));
        }
        for (name, prob) in [("alpha", alpha), ("beta", beta)] {
            if !(0.0..=1.0).contains(&prob) {
                return Err(PalmError::configuration(format!(
                    "sibling classification probability {name} = {prob} must be within [0, 1]"
                )));
            }
        }
        Ok(Self {
            labels,
            alpha,
            beta,
        })
    }

    /// Fully known labels from a parent assignment
    pub fn from_groups(groups: &[usize], alpha: f64, beta: f64) -> Result<Self, PalmError> {
        let n = groups.len();
        let labels = Array2::from_shape_fn((n, n), |(i, j)| {
            if i == j {
                SiblingLabel::Unknown
            } else if groups[i] == groups[j] {
                SiblingLabel::Sibling
            } else {
                SiblingLabel::NonSibling
            }
        });
        Self::new(labels, alpha, beta)
    }

    pub fn n_points(&self) -> usize {
        self.labels.nrows()
    }

    pub fn label(&self, i: usize, j: usize) -> SiblingLabel {
        self.labels[[i, j]]
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    /// Fraction of off-diagonal pairs with a known label
    pub fn known_fraction(&self) -> f64 {
        let n = self.n_points();
        if n < 2 {
            return 0.0;
        }
        let known = (0..n)
            .tuple_combinations()
            .filter(|&(i, j)| self.labels[[i, j]] != SiblingLabel::Unknown)
            .count();
        known as f64 / (n * (n - 1) / 2) as f64
    }

    /// Log-likelihood term of a pair given the sibling and non-sibling parts of the Palm
    /// intensity at the pair's distance
    pub fn pair_log_term(&self, label: SiblingLabel, sibling: f64, nonsibling: f64) -> f64 {
        let mixture = match label {
            SiblingLabel::Sibling => self.alpha * sibling + (1.0 - self.beta) * nonsibling,
            SiblingLabel::NonSibling => (1.0 - self.alpha) * sibling + self.beta * nonsibling,
            SiblingLabel::Unknown => sibling + nonsibling,
        };
        mixture.ln()
    }

    /// Labels for a new pattern with known parents, reproducing this information's fraction
    /// of known pairs and its misclassification probabilities
    pub fn resample(&self, truth: &SiblingGroundTruth, rng: &mut dyn RngCore) -> Self {
        let known = self.known_fraction();
        let n = truth.len();
        let mut labels = Array2::from_elem((n, n), SiblingLabel::Unknown);
        for (i, j) in (0..n).tuple_combinations() {
            if rng.random::<f64>() >= known {
                continue;
            }
            let label = if truth.are_siblings(i, j) {
                if rng.random::<f64>() < self.alpha {
                    SiblingLabel::Sibling
                } else {
                    SiblingLabel::NonSibling
                }
            } else if rng.random::<f64>() < self.beta {
                SiblingLabel::NonSibling
            } else {
                SiblingLabel::Sibling
            };
            labels[[i, j]] = label;
            labels[[j, i]] = label;
        }
        Self {
            labels,
            alpha: self.alpha,
            beta: self.beta,
        }
    }
}

/// Parent index of every simulated child
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiblingGroundTruth {
    parents: Vec<usize>,
}

impl SiblingGroundTruth {
    pub fn new(parents: Vec<usize>) -> Self {
        Self { parents }
    }

    pub fn parents(&self) -> &[usize] {
        &self.parents
    }

    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    pub fn are_siblings(&self, i: usize, j: usize) -> bool {
        self.parents[i] == self.parents[j]
    }

    /// Perfectly classified labels
    pub fn to_info(&self, alpha: f64, beta: f64) -> Result<SiblingInfo, PalmError> {
        SiblingInfo::from_groups(&self.parents, alpha, beta)
    }
}
