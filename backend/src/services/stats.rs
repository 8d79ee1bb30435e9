//! Statistics: cached landing page counters and per-role dashboards

use std::future::Future;
use std::time::{Duration, Instant};

use rust_decimal::Decimal;
use sqlx::PgPool;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::AppResult;
use shared::models::{
    round_to, total_weight_kg, Actor, CollectionDashboard, DashboardStats, GlobalStats,
    RecyclerDashboard, Role,
};

/// In-process cache for the global statistics
pub struct StatsCache {
    ttl: Duration,
    entry: RwLock<Option<(Instant, GlobalStats)>>,
}

impl StatsCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entry: RwLock::new(None),
        }
    }

    /// Return the cached value while fresh, otherwise recompute and store it
    pub async fn get_or_compute<F, Fut>(&self, compute: F) -> AppResult<GlobalStats>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AppResult<GlobalStats>>,
    {
        if let Some((at, stats)) = self.entry.read().await.as_ref() {
            if at.elapsed() < self.ttl {
                return Ok(stats.clone());
            }
        }

        let mut entry = self.entry.write().await;
        // Another request may have refreshed it while we waited for the lock
        if let Some((at, stats)) = entry.as_ref() {
            if at.elapsed() < self.ttl {
                return Ok(stats.clone());
            }
        }

        let stats = compute().await?;
        *entry = Some((Instant::now(), stats.clone()));
        tracing::debug!("Global statistics recomputed");
        Ok(stats)
    }
}

/// Statistics service
#[derive(Clone)]
pub struct StatsService {
    db: PgPool,
}

impl StatsService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Global counters, served from `cache` while fresh
    pub async fn global(&self, cache: &StatsCache) -> AppResult<GlobalStats> {
        cache.get_or_compute(|| self.compute_global()).await
    }

    async fn compute_global(&self) -> AppResult<GlobalStats> {
        let quantities = sqlx::query_scalar::<_, String>(
            "SELECT quantity FROM collections WHERE status = 'completed'",
        )
        .fetch_all(&self.db)
        .await?;

        let (citizens, collectors) = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE role = 'citizen'),
                COUNT(*) FILTER (WHERE role = 'collector')
            FROM users
            "#,
        )
        .fetch_one(&self.db)
        .await?;

        let waste = total_weight_kg(quantities.iter().map(String::as_str));
        Ok(GlobalStats::compute(waste, citizens, collectors))
    }

    /// Dashboard counters for the current user's role
    pub async fn dashboard(&self, actor: &Actor) -> AppResult<DashboardStats> {
        match actor.role {
            Role::Citizen => self
                .collection_dashboard(actor.id, "citizen_id", &["pending", "accepted", "in_progress"], true)
                .await
                .map(DashboardStats::Collections),
            Role::Collector => self
                .collection_dashboard(actor.id, "collector_id", &["accepted", "in_progress"], false)
                .await
                .map(DashboardStats::Collections),
            Role::Recycler => self
                .recycler_dashboard(actor.id)
                .await
                .map(DashboardStats::Recycler),
        }
    }

    async fn collection_dashboard(
        &self,
        user_id: Uuid,
        owner_column: &'static str,
        open_statuses: &[&str],
        with_earnings: bool,
    ) -> AppResult<CollectionDashboard> {
        let open_statuses: Vec<String> = open_statuses.iter().map(|s| s.to_string()).collect();

        let query = format!(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE status = ANY($2)),
                COUNT(*) FILTER (
                    WHERE status = 'completed'
                      AND date_trunc('month', completed_at) = date_trunc('month', NOW())
                ),
                COALESCE(SUM(amount), 0)
            FROM collections
            WHERE {} = $1
            "#,
            owner_column
        );

        let (open, completed_this_month, earnings) =
            sqlx::query_as::<_, (i64, i64, Decimal)>(&query)
                .bind(user_id)
                .bind(&open_statuses)
                .fetch_one(&self.db)
                .await?;

        let quantity_query = format!(
            "SELECT quantity FROM collections WHERE {} = $1 AND status = 'completed'",
            owner_column
        );
        let quantities = sqlx::query_scalar::<_, String>(&quantity_query)
            .bind(user_id)
            .fetch_all(&self.db)
            .await?;

        Ok(CollectionDashboard {
            pending_collections: open,
            completed_this_month,
            total_weight: round_to(total_weight_kg(quantities.iter().map(String::as_str)), 2),
            total_earnings: if with_earnings { earnings } else { Decimal::ZERO },
        })
    }

    async fn recycler_dashboard(&self, seller_id: Uuid) -> AppResult<RecyclerDashboard> {
        let (total_sales, total_revenue) = sqlx::query_as::<_, (i64, Decimal)>(
            r#"
            SELECT COUNT(*), COALESCE(SUM(total_amount), 0)
            FROM marketplace_orders
            WHERE seller_id = $1 AND status = 'completed'
            "#,
        )
        .bind(seller_id)
        .fetch_one(&self.db)
        .await?;

        let (active_products, total_products) = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT COUNT(*) FILTER (WHERE available), COUNT(*)
            FROM marketplace_products
            WHERE seller_id = $1
            "#,
        )
        .bind(seller_id)
        .fetch_one(&self.db)
        .await?;

        Ok(RecyclerDashboard {
            total_sales,
            total_revenue,
            active_products,
            total_products,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn stats(families: i64) -> GlobalStats {
        GlobalStats::compute(Decimal::from(100), families, 2)
    }

    #[tokio::test]
    async fn test_cache_serves_fresh_value() {
        let cache = StatsCache::new(Duration::from_secs(300));
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value = cache
                .get_or_compute(|| async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(stats(5))
                })
                .await
                .unwrap();
            assert_eq!(value.families_engaged, 5);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_ttl_always_recomputes() {
        let cache = StatsCache::new(Duration::ZERO);
        let first = cache.get_or_compute(|| async { Ok(stats(1)) }).await.unwrap();
        let second = cache.get_or_compute(|| async { Ok(stats(2)) }).await.unwrap();
        assert_eq!(first.families_engaged, 1);
        assert_eq!(second.families_engaged, 2);
    }

    #[tokio::test]
    async fn test_failed_compute_is_not_cached() {
        let cache = StatsCache::new(Duration::from_secs(300));
        let failed = cache
            .get_or_compute(|| async { Err(crate::error::AppError::Internal("down".into())) })
            .await;
        assert!(failed.is_err());

        let value = cache.get_or_compute(|| async { Ok(stats(7)) }).await.unwrap();
        assert_eq!(value.families_engaged, 7);
    }
}
