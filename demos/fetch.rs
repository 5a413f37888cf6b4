use std::time::Duration;

use replay_http::{RequestBuilder, RequestOptions};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let url = std::env::var("REPLAY_HTTP_URL")?;
    let options = RequestOptions::from_env()?;

    let mut request = RequestBuilder::new();
    request
        .set_method("POST")?
        .set_uri(&url)?
        .set_header("x-client", "replay-http-demo")?
        .set_cookie("session", "demo")?
        .set_json(&serde_json::json!({"hello": "world"}))?
        .with_options(options)
        .set_timeout(Duration::from_secs(5));

    let response = request.send().await?;
    println!("{} {}", response.status(), response.url());
    println!("{}", response.text()?);

    Ok(())
}
