//! Example: List apps page by page.
//!
//! Run with: cargo run --example list_apps
//!
//! Requires ASC_ISSUER_ID, ASC_KEY_ID and ASC_PRIVATE_KEY_PATH (or ~/.asc/config.json).

use asc_api_client::rest::AscRestClient;
use asc_api_client::rest::apps::ListAppsRequest;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    let _ = dotenv::dotenv();

    let client = AscRestClient::from_env()?;
    let mut page = client
        .list_apps(Some(&ListAppsRequest::default().limit(50)))
        .await?;

    if let Some(total) = page.total() {
        println!("{total} apps");
    }

    loop {
        for app in &page.data {
            let attributes = app.attributes.as_ref();
            println!(
                "{}\t{}\t{}",
                app.id,
                attributes.and_then(|a| a.bundle_id.as_deref()).unwrap_or("-"),
                attributes.and_then(|a| a.name.as_deref()).unwrap_or("-"),
            );
        }
        match client.next_page(&page).await? {
            Some(next) => page = next,
            None => break,
        }
    }

    Ok(())
}
