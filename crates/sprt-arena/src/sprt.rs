//! Elo estimation and the sequential probability ratio test.
//!
//! Everything here is a pure function of a win/loss/draw count plus the
//! immutable [`SprtParameters`] chosen at startup.

use thiserror::Error;

/// Errors from constructing SPRT parameters.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SprtError {
    /// An error budget is outside the open interval (0, 1).
    #[error("{name} must be strictly between 0 and 1, got {value}")]
    ErrorBudget { name: &'static str, value: f64 },
}

/// Decision of the test at the current LLR.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Accept the alternative hypothesis (elo1).
    AcceptH1,
    /// Accept the null hypothesis (elo0).
    AcceptH0,
    /// Not enough evidence yet.
    Continue,
}

impl Verdict {
    pub fn is_decided(self) -> bool {
        self != Verdict::Continue
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::AcceptH1 => write!(f, "H1 Accepted"),
            Verdict::AcceptH0 => write!(f, "H0 Accepted"),
            Verdict::Continue => write!(f, "Continue Playing"),
        }
    }
}

/// Elo difference with a 95% confidence interval.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EloEstimate {
    pub low: f64,
    pub mid: f64,
    pub high: f64,
}

impl EloEstimate {
    /// Half the width of the confidence interval.
    pub fn error_margin(&self) -> f64 {
        (self.high - self.low) / 2.0
    }
}

/// SPRT hypotheses, error budgets and the derived LLR bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SprtParameters {
    pub elo0: f64,
    pub elo1: f64,
    pub alpha: f64,
    pub beta: f64,
    /// Scale the hypotheses by the draw-Elo dependent factor cutechess uses.
    pub cutechess_llr: bool,
    lower: f64,
    upper: f64,
}

impl SprtParameters {
    pub fn new(
        elo0: f64,
        elo1: f64,
        alpha: f64,
        beta: f64,
        cutechess_llr: bool,
    ) -> Result<Self, SprtError> {
        check_budget("alpha", alpha)?;
        check_budget("beta", beta)?;
        Ok(Self {
            elo0,
            elo1,
            alpha,
            beta,
            cutechess_llr,
            lower: (beta / (1.0 - alpha)).ln(),
            upper: ((1.0 - beta) / alpha).ln(),
        })
    }

    /// LLR at or below which H0 is accepted.
    pub fn lower(&self) -> f64 {
        self.lower
    }

    /// LLR at or above which H1 is accepted.
    pub fn upper(&self) -> f64 {
        self.upper
    }

    pub fn verdict(&self, llr: f64) -> Verdict {
        if llr >= self.upper {
            Verdict::AcceptH1
        } else if llr <= self.lower {
            Verdict::AcceptH0
        } else {
            Verdict::Continue
        }
    }

    /// Log-likelihood ratio of elo1 against elo0 for engine 1's results.
    ///
    /// Returns 0 until at least one win and one loss have been seen. Zero
    /// draws are counted as one so the draw term always exists.
    pub fn log_likelihood_ratio(&self, wins: u64, losses: u64, draws: u64) -> f64 {
        if wins == 0 || losses == 0 {
            return 0.0;
        }
        let wins = wins as f64;
        let losses = losses as f64;
        let draws = draws.max(1) as f64;

        let draw_elo = implied_draw_elo(wins, losses, draws);
        let scale = if self.cutechess_llr {
            draw_elo_scale(draw_elo)
        } else {
            1.0
        };

        let p0 = outcome_probabilities(self.elo0 / scale, draw_elo);
        let p1 = outcome_probabilities(self.elo1 / scale, draw_elo);

        wins * (p1.win / p0.win).ln()
            + losses * (p1.loss / p0.loss).ln()
            + draws * (p1.draw / p0.draw).ln()
    }
}

fn check_budget(name: &'static str, value: f64) -> Result<(), SprtError> {
    if value > 0.0 && value < 1.0 {
        Ok(())
    } else {
        Err(SprtError::ErrorBudget { name, value })
    }
}

/// Win/loss/draw probabilities under the logistic model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutcomeProbabilities {
    pub win: f64,
    pub loss: f64,
    pub draw: f64,
}

/// Expected score of a side `elo` points stronger.
pub fn expected_score(elo: f64) -> f64 {
    1.0 / (1.0 + 10f64.powf(-elo / 400.0))
}

/// Probabilities for an `elo` advantage with the given draw Elo.
pub fn outcome_probabilities(elo: f64, draw_elo: f64) -> OutcomeProbabilities {
    let win = expected_score(elo - draw_elo);
    let loss = expected_score(-elo - draw_elo);
    OutcomeProbabilities {
        win,
        loss,
        draw: 1.0 - win - loss,
    }
}

/// Draw Elo implied by the observed proportions.
pub fn implied_draw_elo(wins: f64, losses: f64, draws: f64) -> f64 {
    let total = wins + losses + draws;
    let p_win = wins / total;
    let p_loss = losses / total;
    200.0 * ((1.0 - 1.0 / p_win) * (1.0 - 1.0 / p_loss)).log10()
}

fn draw_elo_scale(draw_elo: f64) -> f64 {
    let x = 10f64.powf(-draw_elo / 400.0);
    4.0 * x / ((1.0 + x) * (1.0 + x))
}

/// Elo difference corresponding to an expected score.
///
/// Scores at or outside (0, 1) have no finite Elo and map to 0.
pub fn elo_from_score(score: f64) -> f64 {
    if score <= 0.0 || score >= 1.0 {
        return 0.0;
    }
    -400.0 * (1.0 / score - 1.0).log10()
}

/// Elo estimate of engine 1 with a 95% confidence interval.
pub fn elo_with_confidence(wins: u64, losses: u64, draws: u64) -> EloEstimate {
    let n = wins + losses + draws;
    if n == 0 {
        return EloEstimate::default();
    }
    let n = n as f64;
    let p_win = wins as f64 / n;
    let p_loss = losses as f64 / n;
    let p_draw = draws as f64 / n;

    let mu = p_win + p_draw / 2.0;
    let variance = p_win * (1.0 - mu).powi(2) + p_loss * mu.powi(2) + p_draw * (0.5 - mu).powi(2);
    let stdev = variance.sqrt() / n.sqrt();

    let mu_min = mu + phi_inv(0.025) * stdev;
    let mu_max = mu + phi_inv(0.975) * stdev;

    EloEstimate {
        low: elo_from_score(mu_min),
        mid: elo_from_score(mu),
        high: elo_from_score(mu_max),
    }
}

/// Inverse of the standard normal CDF.
pub fn phi_inv(p: f64) -> f64 {
    std::f64::consts::SQRT_2 * erf_inv(2.0 * p - 1.0)
}

/// Inverse error function on (-1, 1), after Giles' rational approximation.
pub fn erf_inv(x: f64) -> f64 {
    let mut w = -((1.0 - x) * (1.0 + x)).ln();
    let p = if w < 5.0 {
        w -= 2.5;
        [
            3.43273939e-07,
            -3.5233877e-06,
            -4.39150654e-06,
            0.00021858087,
            -0.00125372503,
            -0.00417768164,
            0.246640727,
            1.50140941,
        ]
        .iter()
        .fold(2.81022636e-08_f64, |acc, &c| c + acc * w)
    } else {
        w = w.sqrt() - 3.0;
        [
            0.000100950558,
            0.00134934322,
            -0.00367342844,
            0.00573950773,
            -0.0076224613,
            0.00943887047,
            1.00167406,
            2.83297682,
        ]
        .iter()
        .fold(-0.000200214257_f64, |acc, &c| c + acc * w)
    };
    p * x
}
