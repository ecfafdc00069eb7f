use std::sync::Arc;

use asc_api_client::auth::EnvIdentity;
use asc_api_client::rest::AscRestClient;
use asc_api_client::rest::apps::ListAppsRequest;

fn live_tests_enabled() -> bool {
    std::env::var("ASC_LIVE_TESTS").ok().as_deref() == Some("1")
}

#[tokio::test]
#[ignore]
async fn live_list_apps_smoke() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenv::dotenv();
    if !live_tests_enabled() {
        return Ok(());
    }

    let identity = match EnvIdentity::try_from_env() {
        Some(identity) => identity,
        None => return Ok(()),
    };
    let client = AscRestClient::builder()
        .identity(Arc::new(identity))
        .build()?;

    let page = client
        .list_apps(Some(&ListAppsRequest::default().limit(1)))
        .await?;
    assert!(page.data.len() <= 1);

    if let Some(next) = client.next_page(&page).await? {
        assert!(next.data.len() <= 1);
    }

    Ok(())
}
