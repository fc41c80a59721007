use std::fmt;

/// Human-readable bucket for the model's positive-class probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskBand {
    Low,
    Medium,
    High,
}

pub const MEDIUM_FROM: f64 = 0.35;
pub const HIGH_FROM: f64 = 0.70;

impl RiskBand {
    /// Half-open bands: `[0, 0.35)`, `[0.35, 0.70)`, `[0.70, 1]`.
    pub fn from_probability(p: f64) -> Self {
        if p < MEDIUM_FROM {
            RiskBand::Low
        } else if p < HIGH_FROM {
            RiskBand::Medium
        } else {
            RiskBand::High
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RiskBand::Low => "LOW RISK",
            RiskBand::Medium => "MEDIUM RISK",
            RiskBand::High => "HIGH RISK",
        }
    }

    pub fn indicator(self) -> &'static str {
        match self {
            RiskBand::Low => "🟢",
            RiskBand::Medium => "🟡",
            RiskBand::High => "🔴",
        }
    }
}

impl fmt::Display for RiskBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
