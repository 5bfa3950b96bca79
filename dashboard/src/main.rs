use std::{path::Path, sync::Arc};

use abi::{
    utils::{format_currency, format_date, format_distance_from_now, format_duration},
    Config,
};
use anyhow::{bail, Result};
use booking::BookingManager;
use booking_dashboard::Dashboard;
use chrono::Local;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let filename = config_file()?;
    info!(%filename, "loading config");
    let config = Config::load(&filename)?;

    // DATABASE_URL wins over the db section
    let manager = match std::env::var("DATABASE_URL") {
        Ok(url) => BookingManager::connect(&url, config.db.max_connections).await?,
        Err(_) => BookingManager::from_config(&config.db).await?,
    };
    let dashboard = Dashboard::new(Arc::new(manager), config.dashboard);

    let now = Local::now();
    let today = now.date_naive();
    let summary = dashboard.summary(today, &Local).await?;
    info!(
        bookings = summary.stats.today_count,
        revenue = %format_currency(Some(summary.stats.today_revenue)),
        "today"
    );
    for day in &summary.sales {
        info!(
            date = %day.date,
            bookings = day.bookings,
            revenue = %format_currency(Some(day.revenue)),
            "sales"
        );
    }
    for (status, count) in &summary.by_status {
        info!(%status, count, "status breakdown");
    }
    for b in &summary.today {
        let start = b.start.with_timezone(&Local);
        info!(
            id = b.id,
            start = %format_date(Some(&start)),
            when = %format_distance_from_now(Some(&start), &now),
            duration = %format_duration(Some(b.duration_minutes())),
            price = %format_currency(b.total_price),
            status = %b.status,
            "today's booking"
        );
    }

    Ok(())
}

// DASHBOARD_CONFIG first, then ./dashboard.yml, ~/.config/dashboard.yml, /etc/dashboard.yml
fn config_file() -> Result<String> {
    if let Ok(filename) = std::env::var("DASHBOARD_CONFIG") {
        return Ok(filename);
    }

    let home = shellexpand::tilde("~/.config/dashboard.yml");
    let candidates = [
        Path::new("./dashboard.yml"),
        Path::new(home.as_ref()),
        Path::new("/etc/dashboard.yml"),
    ];
    match candidates.iter().find(|p| p.exists()) {
        Some(p) => Ok(p.display().to_string()),
        None => bail!("no config file found"),
    }
}
