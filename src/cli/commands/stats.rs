use crate::config::Config;
use crate::db::Store;
use crate::services::{SeaOrmSystemService, SystemService};

pub async fn cmd_stats(config: &Config) -> anyhow::Result<()> {
    let store = Store::new(&config.general.database_path).await?;
    let service = SeaOrmSystemService::new(store, !config.upstream.api_key.is_empty());
    let stats = service.stats(10).await?;

    println!("Today ({})", stats.today.date);
    println!("{:-<50}", "");
    println!(
        "  Requests: {} ({} cached, {} upstream)",
        stats.today.total_requests, stats.today.cached_requests, stats.today.api_requests
    );
    println!("  Cache hit rate: {:.1}%", stats.today.cache_hit_rate);
    println!(
        "  Avg response: {} ms | Errors: {} | Timeouts: {}",
        stats.today.avg_response_time_ms, stats.today.error_count, stats.today.timeout_count
    );

    println!();
    println!("All time");
    println!("{:-<50}", "");
    println!(
        "  Requests: {} ({} cached, {} upstream)",
        stats.total.requests, stats.total.cached_requests, stats.total.api_calls
    );
    println!("  Cache hit rate: {:.1}%", stats.total.cache_hit_rate);
    println!("  Errors: {}", stats.total.errors);

    println!();
    println!(
        "Cache: {} entries, {} hits, avg {} ms",
        stats.cache.total_entries, stats.cache.total_hits, stats.cache.avg_response_time_ms
    );

    if !stats.top_queries.is_empty() {
        println!();
        println!("Top queries");
        println!("{:-<50}", "");
        for q in &stats.top_queries {
            println!("  {:>5}  {}", q.search_count, q.query);
        }
    }

    Ok(())
}
