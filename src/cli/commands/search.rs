use crate::config::Config;
use crate::state::SharedState;

pub async fn cmd_search_products(
    config: Config,
    query: &str,
    limit: Option<usize>,
) -> anyhow::Result<()> {
    let limit = limit
        .filter(|n| *n > 0)
        .unwrap_or(config.search.default_limit)
        .min(config.search.max_limit);

    let state = SharedState::new(config).await?;

    println!("Searching for: {query}");

    let outcome = state.search_service.search(query, limit).await;
    state.shutdown();
    let response = outcome?;

    if response.results.is_empty() {
        println!("No products found matching '{query}'");
        return Ok(());
    }

    let source = if response.cached { "cache" } else { "upstream" };
    println!();
    println!(
        "{} results from {} in {} ms:",
        response.count, source, response.response_time_ms
    );
    println!("{:-<70}", "");

    for (i, product) in response.results.iter().enumerate() {
        let title = product.title.as_deref().unwrap_or("(untitled)");
        let price = product.price.as_deref().unwrap_or("?");
        println!("[{}] {} - {}", i + 1, title, price);

        let mut details = Vec::new();
        if let Some(source) = &product.source {
            details.push(source.clone());
        }
        if let Some(brand) = &product.brand {
            details.push(format!("Brand: {brand}"));
        }
        if let Some(weight) = &product.weight {
            details.push(format!("Weight: {weight}"));
        }
        if let Some(rating) = product.rating {
            let reviews = product.reviews.unwrap_or(0);
            details.push(format!("{rating:.1}/5 ({reviews} reviews)"));
        }
        if !details.is_empty() {
            println!("    {}", details.join(" | "));
        }
    }

    Ok(())
}
