use chrono::NaiveDate;

/// Overall health of a single calendar day, derived from the failure union
/// and the day's minimum online rate (spec §4.H).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayStatus {
    Normal,
    Issues,
    Critical,
}

impl DayStatus {
    pub fn from_day(failure_union_empty: bool, min_online_rate: Option<f64>) -> Self {
        if let Some(rate) = min_online_rate {
            if rate < 0.5 {
                return DayStatus::Critical;
            }
        }
        if failure_union_empty {
            DayStatus::Normal
        } else {
            DayStatus::Issues
        }
    }
}

/// Count of monitor sweeps observed for the day, with the online-rate extremes
/// needed for day-status classification (spec §4.H).
#[derive(Debug, Clone, Copy, Default)]
pub struct MonitoringSummary {
    pub sweep_count: usize,
    pub min_online_rate: Option<f64>,
    pub mean_online_rate: Option<f64>,
}

impl MonitoringSummary {
    pub fn from_rates(rates: &[f64]) -> Self {
        if rates.is_empty() {
            return Self::default();
        }
        let min = rates.iter().cloned().fold(f64::INFINITY, f64::min);
        let mean = rates.iter().sum::<f64>() / rates.len() as f64;
        Self { sweep_count: rates.len(), min_online_rate: Some(min), mean_online_rate: Some(mean) }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AlertCounts {
    pub info: u32,
    pub warning: u32,
    pub critical: u32,
    pub red: u32,
}

/// Day identity the daily report rolls up against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ReportDate(pub NaiveDate);
