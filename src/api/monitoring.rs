//! Metrics registry with Prometheus text exposition.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct MetricsRegistry {
    pub wagers_total: AtomicU64,
    pub wagers_won_total: AtomicU64,
    pub wagered_lamports_total: AtomicU64,
    pub payout_lamports_total: AtomicU64,
    pub deposits_total: AtomicU64,
    pub withdrawals_total: AtomicU64,
    pub referral_commissions_total: AtomicU64,
    pub errors_total: AtomicU64,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_wager(&self, bet: u64, payout: u64, win: bool) {
        self.wagers_total.fetch_add(1, Ordering::Relaxed);
        if win {
            self.wagers_won_total.fetch_add(1, Ordering::Relaxed);
        }
        self.wagered_lamports_total.fetch_add(bet, Ordering::Relaxed);
        self.payout_lamports_total
            .fetch_add(payout, Ordering::Relaxed);
    }

    pub fn record_deposit(&self) {
        self.deposits_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_withdrawal(&self) {
        self.withdrawals_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_commission(&self) {
        self.referral_commissions_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Render the registry in Prometheus text exposition format.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let counters = [
            ("velvet_wagers_total", &self.wagers_total),
            ("velvet_wagers_won_total", &self.wagers_won_total),
            ("velvet_wagered_lamports_total", &self.wagered_lamports_total),
            ("velvet_payout_lamports_total", &self.payout_lamports_total),
            ("velvet_deposits_total", &self.deposits_total),
            ("velvet_withdrawals_total", &self.withdrawals_total),
            (
                "velvet_referral_commissions_total",
                &self.referral_commissions_total,
            ),
            ("velvet_errors_total", &self.errors_total),
        ];
        for (name, counter) in counters {
            out.push_str(&format!("# TYPE {} counter\n", name));
            out.push_str(&format!("{} {}\n", name, counter.load(Ordering::Relaxed)));
        }
        out
    }
}
