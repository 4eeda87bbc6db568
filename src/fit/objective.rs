use crate::edge::Contrasts;
use crate::error::{IntensityError, PalmError};
use crate::family::{ProcessFamily, ProcessFamilyTrait, SiblingInfo, SiblingLabel};
use crate::params::Params;

/// Palm log-likelihood of a pattern under a process family
///
/// `log PL = Σ_k w_k log λ(d_k) - n_focal Λ(R)`, where the sum runs over the contrasts, `λ` is
/// the Palm intensity and `Λ(R)` its integral over the ball of radius `R`. With sibling
/// information the per-pair term is replaced by [SiblingInfo::pair_log_term].
#[derive(Clone, Debug)]
pub struct PalmObjective {
    family: ProcessFamily,
    contrasts: Contrasts,
    siblings: Option<(SiblingInfo, Vec<SiblingLabel>)>,
}

impl PalmObjective {
    pub fn new(family: ProcessFamily, contrasts: Contrasts) -> Result<Self, PalmError> {
        let siblings = match family.sibling_info() {
            Some(info) => Some((info.clone(), contrasts.labels(info)?)),
            None => None,
        };
        Ok(Self {
            family,
            contrasts,
            siblings,
        })
    }

    pub fn contrasts(&self) -> &Contrasts {
        &self.contrasts
    }

    pub fn log_palm_likelihood(&self, params: &Params) -> Result<f64, IntensityError> {
        let intensity = self.family.intensity(params, self.contrasts.dim())?;
        let distances = self.contrasts.distances();
        let weights = self.contrasts.weights();
        let pairs = match &self.siblings {
            Some((info, labels)) => distances
                .iter()
                .zip(weights)
                .zip(labels)
                .map(|((&d, &w), &label)| {
                    let (sibling, nonsibling) = intensity.split(d)?;
                    Ok(w * info.pair_log_term(label, sibling, nonsibling))
                })
                .sum::<Result<f64, IntensityError>>()?,
            None => distances
                .iter()
                .zip(weights)
                .map(|(&d, &w)| Ok(w * intensity.eval(d)?.ln()))
                .sum::<Result<f64, IntensityError>>()?,
        };
        let expected = self.contrasts.n_focal() as f64 * intensity.integral(self.contrasts.r())?;
        let value = pairs - expected;
        if value.is_finite() {
            Ok(value)
        } else {
            Err(IntensityError::Domain(format!(
                "Palm log-likelihood is not finite for [{params}]"
            )))
        }
    }

    /// Negative Palm log-likelihood, the value to minimise
    pub fn evaluate(&self, params: &Params) -> Result<f64, IntensityError> {
        Ok(-self.log_palm_likelihood(params)?)
    }
}
