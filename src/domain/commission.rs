//! Market-specific commission model.
//!
//! Every fee component is a [`FeeRule`]: a raw amount charged either as a rate
//! of the notional or per share, floored at a minimum, then capped by an
//! absolute maximum and/or a percentage of the notional:
//!
//! fee = min(min(max(raw, minimum), maximum), cap_pct × notional)
//!
//! A [`FeeSchedule`] combines five components with a flat per-trade system fee.
//! Every component is non-decreasing in the share count, so the total is too.

use std::fmt;

use super::error::VoltraderError;
use super::market::Market;
use crate::ports::config_port::ConfigPort;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeeBasis {
    /// Fraction of trade notional.
    Notional(f64),
    /// Amount per share.
    PerShare(f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeeRule {
    pub basis: FeeBasis,
    pub minimum: f64,
    pub maximum: Option<f64>,
    pub cap_pct: Option<f64>,
}

impl FeeRule {
    pub const NONE: FeeRule = FeeRule::rate(0.0);

    pub const fn rate(rate: f64) -> Self {
        FeeRule {
            basis: FeeBasis::Notional(rate),
            minimum: 0.0,
            maximum: None,
            cap_pct: None,
        }
    }

    pub const fn per_share(amount: f64) -> Self {
        FeeRule {
            basis: FeeBasis::PerShare(amount),
            minimum: 0.0,
            maximum: None,
            cap_pct: None,
        }
    }

    pub const fn with_minimum(mut self, minimum: f64) -> Self {
        self.minimum = minimum;
        self
    }

    pub const fn with_maximum(mut self, maximum: f64) -> Self {
        self.maximum = Some(maximum);
        self
    }

    pub const fn with_cap_pct(mut self, cap_pct: f64) -> Self {
        self.cap_pct = Some(cap_pct);
        self
    }

    pub fn apply(&self, shares: f64, notional: f64) -> f64 {
        let raw = match self.basis {
            FeeBasis::Notional(rate) => notional * rate,
            FeeBasis::PerShare(amount) => shares * amount,
        };
        let mut fee = raw.max(self.minimum);
        if let Some(max) = self.maximum {
            fee = fee.min(max);
        }
        if let Some(cap) = self.cap_pct {
            fee = fee.min(cap * notional);
        }
        fee
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CommissionBreakdown {
    pub commission: f64,
    pub stamp_duty: f64,
    pub transaction_levy: f64,
    pub transaction_fee: f64,
    pub settlement_fee: f64,
    pub fixed_system_fee: f64,
    pub total: f64,
}

impl fmt::Display for CommissionBreakdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "commission={:.2}, stamp_duty={:.2}, transaction_levy={:.2}, transaction_fee={:.2}, \
             settlement_fee={:.2}, system_fee={:.2}, total={:.2}",
            self.commission,
            self.stamp_duty,
            self.transaction_levy,
            self.transaction_fee,
            self.settlement_fee,
            self.fixed_system_fee,
            self.total,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeeSchedule {
    pub commission: FeeRule,
    pub stamp_duty: FeeRule,
    pub transaction_levy: FeeRule,
    pub transaction_fee: FeeRule,
    pub settlement_fee: FeeRule,
    pub system_fee: f64,
}

const COMPONENTS: [&str; 5] = [
    "commission",
    "stamp_duty",
    "transaction_levy",
    "transaction_fee",
    "settlement_fee",
];

impl FeeSchedule {
    pub fn hong_kong() -> Self {
        FeeSchedule {
            commission: FeeRule::rate(0.0003).with_minimum(3.0),
            stamp_duty: FeeRule::rate(0.0013),
            transaction_levy: FeeRule::rate(0.000027),
            transaction_fee: FeeRule::rate(0.00005),
            settlement_fee: FeeRule::rate(0.00002)
                .with_minimum(2.0)
                .with_maximum(100.0),
            system_fee: 15.0,
        }
    }

    pub fn china_a() -> Self {
        FeeSchedule {
            commission: FeeRule::rate(0.00025).with_minimum(5.0),
            stamp_duty: FeeRule::rate(0.0005),
            transaction_levy: FeeRule::rate(0.00001),
            transaction_fee: FeeRule::rate(0.0000341),
            settlement_fee: FeeRule::NONE,
            system_fee: 0.0,
        }
    }

    pub fn united_states() -> Self {
        FeeSchedule {
            commission: FeeRule::per_share(0.0049)
                .with_minimum(0.99)
                .with_cap_pct(0.005),
            stamp_duty: FeeRule::NONE,
            transaction_levy: FeeRule::per_share(0.000166)
                .with_minimum(0.01)
                .with_maximum(8.30),
            transaction_fee: FeeRule::rate(0.0000278),
            settlement_fee: FeeRule::per_share(0.003).with_cap_pct(0.07),
            system_fee: 0.0,
        }
    }

    pub fn for_market(market: Market) -> Self {
        match market {
            Market::Hk => Self::hong_kong(),
            Market::Cn => Self::china_a(),
            Market::Us => Self::united_states(),
        }
    }

    /// Built-in schedule for `market` with overrides from its config section
    /// (`commission_hk`, `commission_cn`, `commission_us`).
    pub fn from_config(market: Market, config: &dyn ConfigPort) -> Result<Self, VoltraderError> {
        let section = market.commission_section();
        let mut schedule = Self::for_market(market);

        for name in COMPONENTS {
            let rule = schedule.component_mut(name);
            *rule = override_rule(*rule, config, section, name)?;
        }

        if let Some(fee) = read_fee(config, section, "system_fee")? {
            schedule.system_fee = fee;
        }

        Ok(schedule)
    }

    fn component_mut(&mut self, name: &str) -> &mut FeeRule {
        match name {
            "commission" => &mut self.commission,
            "stamp_duty" => &mut self.stamp_duty,
            "transaction_levy" => &mut self.transaction_levy,
            "transaction_fee" => &mut self.transaction_fee,
            _ => &mut self.settlement_fee,
        }
    }

    pub fn estimate(&self, size: i64, price: f64) -> CommissionBreakdown {
        if size == 0 {
            return CommissionBreakdown::default();
        }

        let shares = size.unsigned_abs() as f64;
        let notional = shares * price;

        let commission = self.commission.apply(shares, notional);
        let stamp_duty = self.stamp_duty.apply(shares, notional);
        let transaction_levy = self.transaction_levy.apply(shares, notional);
        let transaction_fee = self.transaction_fee.apply(shares, notional);
        let settlement_fee = self.settlement_fee.apply(shares, notional);
        let fixed_system_fee = self.system_fee;

        CommissionBreakdown {
            commission,
            stamp_duty,
            transaction_levy,
            transaction_fee,
            settlement_fee,
            fixed_system_fee,
            total: commission
                + stamp_duty
                + transaction_levy
                + transaction_fee
                + settlement_fee
                + fixed_system_fee,
        }
    }
}

fn override_rule(
    mut rule: FeeRule,
    config: &dyn ConfigPort,
    section: &str,
    name: &str,
) -> Result<FeeRule, VoltraderError> {
    let rate = read_fee(config, section, &format!("{name}_rate"))?;
    let per_share = read_fee(config, section, &format!("{name}_per_share"))?;

    match (rate, per_share) {
        (Some(_), Some(_)) => {
            return Err(VoltraderError::config_invalid(
                section,
                &format!("{name}_per_share"),
                format!("{name}_rate and {name}_per_share are mutually exclusive"),
            ));
        }
        (Some(r), None) => rule.basis = FeeBasis::Notional(r),
        (None, Some(p)) => rule.basis = FeeBasis::PerShare(p),
        (None, None) => {}
    }

    if let Some(min) = read_fee(config, section, &format!("{name}_min"))? {
        rule.minimum = min;
    }
    if let Some(max) = read_fee(config, section, &format!("{name}_max"))? {
        rule.maximum = Some(max);
    }
    if let Some(cap) = read_fee(config, section, &format!("{name}_cap_pct"))? {
        rule.cap_pct = Some(cap);
    }

    Ok(rule)
}

fn read_fee(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<f64>, VoltraderError> {
    let Some(raw) = config.get_string(section, key) else {
        return Ok(None);
    };
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| VoltraderError::config_invalid(section, key, format!("'{raw}' is not a number")))?;
    if !value.is_finite() || value < 0.0 {
        return Err(VoltraderError::config_invalid(
            section,
            key,
            "fee parameters must be non-negative",
        ));
    }
    Ok(Some(value))
}

/// Commission model bound to one market.
#[derive(Debug, Clone, PartialEq)]
pub struct CommissionModel {
    pub market: Market,
    pub schedule: FeeSchedule,
}

impl CommissionModel {
    pub fn new(market: Market) -> Self {
        CommissionModel {
            market,
            schedule: FeeSchedule::for_market(market),
        }
    }

    pub fn with_schedule(market: Market, schedule: FeeSchedule) -> Self {
        CommissionModel { market, schedule }
    }

    pub fn estimate(&self, size: i64, price: f64) -> CommissionBreakdown {
        self.schedule.estimate(size, price)
    }
}

/// Fee breakdown for `size` shares at `price` under the built-in schedule of
/// `market` ("HK", "CN" or "US").
pub fn estimate(size: i64, price: f64, market: &str) -> Result<CommissionBreakdown, VoltraderError> {
    let market: Market = market.parse()?;
    Ok(FeeSchedule::for_market(market).estimate(size, price))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;
    use approx::assert_abs_diff_eq;

    #[test]
    fn hong_kong_breakdown() {
        let b = estimate(10_000, 10.0, "HK").unwrap();
        assert_abs_diff_eq!(b.commission, 30.0, epsilon = 1e-6);
        assert_abs_diff_eq!(b.stamp_duty, 130.0, epsilon = 1e-6);
        assert_abs_diff_eq!(b.transaction_levy, 2.7, epsilon = 1e-6);
        assert_abs_diff_eq!(b.transaction_fee, 5.0, epsilon = 1e-6);
        assert_abs_diff_eq!(b.settlement_fee, 2.0, epsilon = 1e-6);
        assert_abs_diff_eq!(b.fixed_system_fee, 15.0, epsilon = 1e-6);
        assert_abs_diff_eq!(b.total, 184.7, epsilon = 1e-6);
    }

    #[test]
    fn hong_kong_minimum_commission() {
        // 100 × 10 = 1000 notional → 0.3 raw commission, floored to 3
        let b = estimate(100, 10.0, "HK").unwrap();
        assert_abs_diff_eq!(b.commission, 3.0, epsilon = 1e-9);
        assert_abs_diff_eq!(b.settlement_fee, 2.0, epsilon = 1e-9);
    }

    #[test]
    fn hong_kong_settlement_capped() {
        // 10M notional → 200 raw settlement, capped at 100
        let b = estimate(100_000, 100.0, "HK").unwrap();
        assert_abs_diff_eq!(b.settlement_fee, 100.0, epsilon = 1e-9);
    }

    #[test]
    fn china_a_breakdown() {
        let b = estimate(1_000, 20.0, "CN").unwrap();
        // 20_000 notional: commission 5 (floor), stamp 10, levy 0.2, fee 0.682
        assert_abs_diff_eq!(b.commission, 5.0, epsilon = 1e-9);
        assert_abs_diff_eq!(b.stamp_duty, 10.0, epsilon = 1e-9);
        assert_abs_diff_eq!(b.transaction_levy, 0.2, epsilon = 1e-9);
        assert_abs_diff_eq!(b.transaction_fee, 0.682, epsilon = 1e-9);
        assert_abs_diff_eq!(b.settlement_fee, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(b.total, 15.882, epsilon = 1e-9);
    }

    #[test]
    fn us_per_share_commission_with_floor() {
        // 100 shares → 0.49 raw, floored to 0.99; cap is 0.5% of 15_000 = 75
        let b = estimate(100, 150.0, "US").unwrap();
        assert_abs_diff_eq!(b.commission, 0.99, epsilon = 1e-9);
        assert_abs_diff_eq!(b.settlement_fee, 0.3, epsilon = 1e-9);
        assert_abs_diff_eq!(b.transaction_levy, 0.0166, epsilon = 1e-9);
    }

    #[test]
    fn us_percentage_cap_binds_for_penny_stocks() {
        // 10_000 shares at 0.05 → notional 500; 49 raw → cap 2.5
        let b = estimate(10_000, 0.05, "US").unwrap();
        assert_abs_diff_eq!(b.commission, 2.5, epsilon = 1e-9);
        // settlement 30 raw → capped at 7% of 500 = 35, so raw stands
        assert_abs_diff_eq!(b.settlement_fee, 30.0, epsilon = 1e-9);
    }

    #[test]
    fn us_levy_maximum() {
        let b = estimate(1_000_000, 10.0, "US").unwrap();
        assert_abs_diff_eq!(b.transaction_levy, 8.30, epsilon = 1e-9);
    }

    #[test]
    fn zero_size_has_no_fees() {
        let b = estimate(0, 10.0, "HK").unwrap();
        assert_eq!(b, CommissionBreakdown::default());
    }

    #[test]
    fn sell_sized_negative_uses_absolute_shares() {
        let buy = estimate(500, 10.0, "HK").unwrap();
        let sell = estimate(-500, 10.0, "HK").unwrap();
        assert_eq!(buy, sell);
    }

    #[test]
    fn unknown_market_fails() {
        let err = estimate(100, 10.0, "LSE").unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn total_non_decreasing_in_size() {
        for market in Market::ALL {
            let schedule = FeeSchedule::for_market(market);
            let mut prev = 0.0;
            for size in (0..20_000).step_by(100) {
                let total = schedule.estimate(size, 3.7).total;
                assert!(total >= prev, "{market}: {total} < {prev} at size {size}");
                prev = total;
            }
        }
    }

    #[test]
    fn config_overrides_replace_components() {
        let config = FileConfigAdapter::from_string(
            "[commission_hk]\ncommission_rate = 0.001\ncommission_min = 10\nsystem_fee = 0\n\
             settlement_fee_max = 50\n",
        )
        .unwrap();
        let schedule = FeeSchedule::from_config(Market::Hk, &config).unwrap();
        assert_eq!(schedule.commission.basis, FeeBasis::Notional(0.001));
        assert_abs_diff_eq!(schedule.commission.minimum, 10.0);
        assert_eq!(schedule.settlement_fee.maximum, Some(50.0));
        assert_abs_diff_eq!(schedule.system_fee, 0.0);
        // untouched components keep their built-in values
        assert_eq!(schedule.stamp_duty, FeeSchedule::hong_kong().stamp_duty);
    }

    #[test]
    fn config_override_switches_basis() {
        let config =
            FileConfigAdapter::from_string("[commission_cn]\ncommission_per_share = 0.01\n")
                .unwrap();
        let schedule = FeeSchedule::from_config(Market::Cn, &config).unwrap();
        assert_eq!(schedule.commission.basis, FeeBasis::PerShare(0.01));
        assert_abs_diff_eq!(schedule.commission.minimum, 5.0);
    }

    #[test]
    fn config_override_rejects_negative() {
        let config =
            FileConfigAdapter::from_string("[commission_us]\nsystem_fee = -1\n").unwrap();
        let err = FeeSchedule::from_config(Market::Us, &config).unwrap_err();
        assert!(matches!(err, VoltraderError::ConfigInvalid { key, .. } if key == "system_fee"));
    }

    #[test]
    fn config_override_rejects_conflicting_basis() {
        let config = FileConfigAdapter::from_string(
            "[commission_hk]\nstamp_duty_rate = 0.001\nstamp_duty_per_share = 0.01\n",
        )
        .unwrap();
        assert!(FeeSchedule::from_config(Market::Hk, &config).is_err());
    }

    #[test]
    fn config_override_rejects_garbage() {
        let config =
            FileConfigAdapter::from_string("[commission_hk]\ncommission_rate = abc\n").unwrap();
        assert!(FeeSchedule::from_config(Market::Hk, &config).is_err());
    }

    #[test]
    fn breakdown_display() {
        let b = estimate(10_000, 10.0, "HK").unwrap();
        let text = b.to_string();
        assert!(text.starts_with("commission=30.00"));
        assert!(text.ends_with("total=184.70"));
    }
}
