/// Decimal places kept for stored monetary amounts
pub const MONEY_DECIMAL_PRECISION: u32 = 2;

/// Decimal places kept for percentages in reports
pub const PERCENTAGE_DECIMAL_PRECISION: u32 = 2;

/// Alert percentage applied when a budget is created without one
pub const DEFAULT_ALERT_PERCENTAGE: u32 = 80;

/// Upper bound for alert percentages and category alert thresholds
pub const MAX_PERCENTAGE: u32 = 100;

/// Days in a weekly budget window
pub const WEEKLY_PERIOD_DAYS: i64 = 7;
