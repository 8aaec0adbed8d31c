use altshop_db::models::plan::{PlanDetailedStatistics, PlanStatistics};
use altshop_db::models::promocode::{PromocodeDetailedStatistics, PromocodeStatistics};
use altshop_db::models::subscription::{SubscriptionDetailedStatistics, SubscriptionStatistics};
use altshop_db::models::transaction::{Transaction, TransactionDetailedStatistics, TransactionStatistics};
use altshop_db::models::user::{User, UserDetailedStatistics, UserStatistics};
use altshop_db::repositories::plan_repo::PlanRepository;
use altshop_db::repositories::promocode_repo::PromocodeRepository;
use altshop_db::repositories::subscription_repo::SubscriptionRepository;
use altshop_db::repositories::transaction_repo::TransactionRepository;
use altshop_db::repositories::user_repo::UserRepository;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sysinfo::{CpuRefreshKind, Disks, MemoryRefreshKind, RefreshKind, System};

// ============================================================================
// CPU sampling
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CpuMetrics {
    /// Whole percent.
    pub usage: u32,
    pub cores: usize,
    pub model: String,
    /// MHz of the first core.
    pub speed: u64,
}

/// Something that can report processor usage since its previous refresh.
pub trait CpuSource: Send {
    fn refresh(&mut self);
    /// Percent busy across all cores since the previous refresh.
    fn usage(&self) -> f32;
    fn cores(&self) -> usize;
    fn model(&self) -> String;
    fn speed(&self) -> u64;
}

pub struct SysinfoCpu {
    sys: System,
}

impl SysinfoCpu {
    pub fn new() -> Self {
        let sys = System::new_with_specifics(
            RefreshKind::nothing().with_cpu(CpuRefreshKind::nothing().with_cpu_usage().with_frequency()),
        );
        Self { sys }
    }
}

impl Default for SysinfoCpu {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuSource for SysinfoCpu {
    fn refresh(&mut self) {
        self.sys.refresh_cpu_specifics(CpuRefreshKind::nothing().with_cpu_usage().with_frequency());
    }

    fn usage(&self) -> f32 {
        self.sys.global_cpu_usage()
    }

    fn cores(&self) -> usize {
        self.sys.cpus().len()
    }

    fn model(&self) -> String {
        self.sys
            .cpus()
            .first()
            .map(|c| c.brand().trim().to_string())
            .filter(|b| !b.is_empty())
            .unwrap_or_else(|| "Unknown".to_string())
    }

    fn speed(&self) -> u64 {
        self.sys.cpus().first().map(|c| c.frequency()).unwrap_or(0)
    }
}

/// Usage is a delta between two samples, so the first call after construction is cold and
/// reports `0`. Every later call reports usage since the call before it.
pub struct CpuSampler {
    source: Box<dyn CpuSource>,
    warm: bool,
}

impl CpuSampler {
    pub fn new(source: Box<dyn CpuSource>) -> Self {
        Self { source, warm: false }
    }

    pub fn sample(&mut self) -> CpuMetrics {
        self.source.refresh();
        let usage = if self.warm {
            self.source.usage().clamp(0.0, 100.0).round() as u32
        } else {
            self.warm = true;
            0
        };

        CpuMetrics {
            usage,
            cores: self.source.cores(),
            model: self.source.model(),
            speed: self.source.speed(),
        }
    }
}

// ============================================================================
// Memory and disk
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetrics {
    pub total: u64,
    pub used: u64,
    pub free: u64,
    pub usage_percent: u32,
}

impl UsageMetrics {
    pub fn from_total_free(total: u64, free: u64) -> Self {
        let used = total.saturating_sub(free);
        let usage_percent = if total > 0 {
            ((used as f64 / total as f64) * 100.0).round() as u32
        } else {
            0
        };
        Self { total, used, free, usage_percent }
    }
}

fn memory_metrics() -> UsageMetrics {
    let mut sys = System::new_with_specifics(RefreshKind::nothing().with_memory(MemoryRefreshKind::everything()));
    sys.refresh_memory();
    UsageMetrics::from_total_free(sys.total_memory(), sys.available_memory())
}

/// The filesystem mounted at `/`, or every disk summed when there is none.
fn disk_metrics() -> UsageMetrics {
    let disks = Disks::new_with_refreshed_list();
    let root = disks.list().iter().find(|d| d.mount_point() == std::path::Path::new("/"));

    match root {
        Some(disk) => UsageMetrics::from_total_free(disk.total_space(), disk.available_space()),
        None => {
            let (total, free) = disks
                .list()
                .iter()
                .fold((0u64, 0u64), |(t, f), d| (t + d.total_space(), f + d.available_space()));
            UsageMetrics::from_total_free(total, free)
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemMetrics {
    pub cpu: CpuMetrics,
    pub memory: UsageMetrics,
    pub disk: UsageMetrics,
    pub uptime: u64,
    pub platform: &'static str,
    pub hostname: String,
    pub timestamp: DateTime<Utc>,
}

pub fn system_metrics(cpu: CpuMetrics) -> SystemMetrics {
    SystemMetrics {
        cpu,
        memory: memory_metrics(),
        disk: disk_metrics(),
        uptime: System::uptime(),
        platform: std::env::consts::OS,
        hostname: System::host_name().unwrap_or_default(),
        timestamp: Utc::now(),
    }
}

// ============================================================================
// Aggregates
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct Overview {
    pub users: UserStatistics,
    pub plans: PlanStatistics,
    pub subscriptions: SubscriptionStatistics,
    pub transactions: TransactionStatistics,
    pub promocodes: PromocodeStatistics,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DetailedStatistics {
    pub users: UserDetailedStatistics,
    pub transactions: TransactionDetailedStatistics,
    pub subscriptions: SubscriptionDetailedStatistics,
    pub plans: PlanDetailedStatistics,
    pub promocodes: PromocodeDetailedStatistics,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentActivity {
    pub recent_users: Vec<User>,
    pub recent_transactions: Vec<Transaction>,
}

#[derive(Debug, Clone)]
pub struct DashboardService {
    users: UserRepository,
    plans: PlanRepository,
    subscriptions: SubscriptionRepository,
    transactions: TransactionRepository,
    promocodes: PromocodeRepository,
}

impl DashboardService {
    pub fn new(
        users: UserRepository,
        plans: PlanRepository,
        subscriptions: SubscriptionRepository,
        transactions: TransactionRepository,
        promocodes: PromocodeRepository,
    ) -> Self {
        Self { users, plans, subscriptions, transactions, promocodes }
    }

    pub async fn overview(&self) -> Result<Overview> {
        let (users, plans, subscriptions, transactions, promocodes) = tokio::try_join!(
            self.users.statistics(),
            self.plans.statistics(),
            self.subscriptions.statistics(),
            self.transactions.statistics(),
            self.promocodes.statistics(),
        )?;
        Ok(Overview { users, plans, subscriptions, transactions, promocodes, timestamp: Utc::now() })
    }

    pub async fn statistics(&self) -> Result<DetailedStatistics> {
        let (users, transactions, subscriptions, plans, promocodes) = tokio::try_join!(
            self.users.detailed_statistics(),
            self.transactions.detailed_statistics(),
            self.subscriptions.detailed_statistics(),
            self.plans.detailed_statistics(),
            self.promocodes.detailed_statistics(),
        )?;
        Ok(DetailedStatistics { users, transactions, subscriptions, plans, promocodes, timestamp: Utc::now() })
    }

    pub async fn recent(&self) -> Result<RecentActivity> {
        let (recent_users, recent_transactions) =
            tokio::try_join!(self.users.recent(5), self.transactions.recent(10))?;
        Ok(RecentActivity { recent_users, recent_transactions })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeCpu {
        readings: Vec<f32>,
        refreshes: usize,
    }

    impl CpuSource for FakeCpu {
        fn refresh(&mut self) {
            self.refreshes += 1;
        }
        fn usage(&self) -> f32 {
            self.readings[self.refreshes - 1]
        }
        fn cores(&self) -> usize {
            4
        }
        fn model(&self) -> String {
            "Fake CPU".to_string()
        }
        fn speed(&self) -> u64 {
            2400
        }
    }

    #[test]
    fn first_sample_is_cold() {
        let mut sampler = CpuSampler::new(Box::new(FakeCpu { readings: vec![80.0, 42.4, 250.0], refreshes: 0 }));

        let first = sampler.sample();
        assert_eq!(first.usage, 0);
        assert_eq!(first.cores, 4);
        assert_eq!(first.model, "Fake CPU");

        assert_eq!(sampler.sample().usage, 42);
        assert_eq!(sampler.sample().usage, 100);
    }

    #[test]
    fn usage_metrics_percentages() {
        let m = UsageMetrics::from_total_free(1000, 250);
        assert_eq!(m.used, 750);
        assert_eq!(m.usage_percent, 75);
        assert_eq!(UsageMetrics::from_total_free(0, 0), UsageMetrics::default());
    }

    #[test]
    fn metrics_serialize_camel_case() {
        let json = serde_json::to_value(UsageMetrics::from_total_free(10, 5)).unwrap();
        assert_eq!(json["usagePercent"], 50);
    }
}
