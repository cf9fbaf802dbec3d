use anyhow::Result;
use deskbot_core::DashboardStats;
use deskbot_core::events::render_stats;

use crate::context::Context;

pub async fn run() -> Result<()> {
    let context = Context::load().await?;
    let stats = DashboardStats::collect(context.store.as_ref()).await?;
    println!("{}", render_stats(&stats));
    if stats.undelivered_responses > 0 {
        println!();
        println!(
            "{} approved response(s) were never delivered; see `deskbot responses undelivered`.",
            stats.undelivered_responses
        );
    }
    Ok(())
}
