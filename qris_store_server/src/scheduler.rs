//! Background jobs: the order expiry sweep, the sale report sweep, and the daily stock report.
//!
//! Each job runs on its own task and ticks at its configured interval. All of them watch a shared stop signal and exit
//! at the next tick boundary after [`SchedulerHandle::stop`] is called. A job that is running when the signal arrives
//! is allowed to finish.
use std::{
    future::Future,
    sync::{Arc, Mutex},
    time::Duration,
};

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use log::*;
use qris_store_engine::{InventoryApi, OrderFlowApi, SqliteDatabase};
use tokio::{sync::watch, task::JoinHandle, time::MissedTickBehavior};

use crate::config::SchedulerConfig;

pub struct SchedulerHandle {
    stop: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Signals every job to stop and waits for them to exit.
    pub async fn stop(self) {
        info!("🕰️ Stopping the scheduler");
        let _ = self.stop.send(true);
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!("🕰️ A scheduler job did not shut down cleanly. {e}");
            }
        }
        info!("🕰️ Scheduler stopped");
    }
}

pub fn start_scheduler(
    orders: Arc<OrderFlowApi<SqliteDatabase>>,
    inventory: Arc<InventoryApi<SqliteDatabase>>,
    config: SchedulerConfig,
) -> SchedulerHandle {
    let (stop, stop_rx) = watch::channel(false);
    let mut tasks = Vec::with_capacity(3);

    let api = Arc::clone(&orders);
    tasks.push(spawn_job("Order expiry sweep", config.expiry_sweep_interval, stop_rx.clone(), move || {
        let api = Arc::clone(&api);
        async move {
            match api.expire_old_orders().await {
                Ok(result) if !result.is_empty() => {
                    info!("🕰️ {} orders expired", result.expired.len());
                    for (order_id, e) in &result.failed {
                        error!("🕰️ Order {order_id} could not be expired. {e}");
                    }
                },
                Ok(_) => trace!("🕰️ No orders to expire"),
                Err(e) => error!("🕰️ Error running the order expiry sweep. {e}"),
            }
        }
    }));

    let api = Arc::clone(&orders);
    tasks.push(spawn_job("Sale report sweep", config.paid_notify_interval, stop_rx.clone(), move || {
        let api = Arc::clone(&api);
        async move {
            match api.notify_unreported_sales().await {
                Ok(0) => trace!("🕰️ No unreported sales"),
                Ok(n) => info!("🕰️ {n} delayed sale reports sent"),
                Err(e) => error!("🕰️ Error running the sale report sweep. {e}"),
            }
        }
    }));

    let last_report = Arc::new(Mutex::new(None::<NaiveDate>));
    let SchedulerConfig { low_stock_threshold, stock_report_hour, utc_offset_hours, .. } = config;
    tasks.push(spawn_job("Stock report", config.stock_report_interval, stop_rx, move || {
        let api = Arc::clone(&inventory);
        let last_report = Arc::clone(&last_report);
        async move {
            let last = *last_report.lock().unwrap_or_else(|p| p.into_inner());
            let Some(today) = stock_report_due(Utc::now(), utc_offset_hours, stock_report_hour, last) else {
                return;
            };
            match api.low_stock_report(low_stock_threshold).await {
                Ok(report) => {
                    if report.is_none() {
                        debug!("🕰️ Stock levels are healthy. No report today");
                    }
                    *last_report.lock().unwrap_or_else(|p| p.into_inner()) = Some(today);
                },
                Err(e) => error!("🕰️ Error building the stock report. {e}"),
            }
        }
    }));

    SchedulerHandle { stop, tasks }
}

fn spawn_job<F, Fut>(
    name: &'static str,
    period: Duration,
    mut stop: watch::Receiver<bool>,
    mut job: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("🕰️ {name} started. Runs every {}s", period.as_secs());
        loop {
            tokio::select! {
                _ = timer.tick() => job().await,
                // An error means the handle was dropped, which is as good as a stop
                _ = stop.changed() => break,
            }
        }
        info!("🕰️ {name} stopped");
    })
}

/// Returns the local date of the stock report that is due at `now`, or `None` if the report for today has gone out
/// already or it is not yet `report_hour` local time.
pub fn stock_report_due(
    now: DateTime<Utc>,
    utc_offset_hours: i32,
    report_hour: u32,
    last_report: Option<NaiveDate>,
) -> Option<NaiveDate> {
    let local = (now + chrono::Duration::hours(i64::from(utc_offset_hours))).naive_utc();
    let today = local.date();
    let due = local.hour() >= report_hour && last_report.map_or(true, |last| last < today);
    due.then_some(today)
}
