use crate::config::Config;
use crate::db::Store;

pub async fn cmd_purge(config: &Config) -> anyhow::Result<()> {
    let store = Store::new(&config.general.database_path).await?;
    let removed = store.purge_expired_cache().await?;
    println!("Removed {removed} expired cache entries.");
    Ok(())
}
