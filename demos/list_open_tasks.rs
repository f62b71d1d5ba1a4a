use anyhow::Result;
use frappe_client::{Client, Fields, Filter, ListQuery};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Credentials come from API_KEY / API_SECRET or a settings.ini / .env file.
    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "http://localhost:8000".to_string());
    let client = Client::from_env(url)?;

    let query = ListQuery::new()
        .fields(Fields::only(["name", "subject", "status"]))
        .filter(Filter::new("status", "=", "Open"))
        .limit_page_length(20)
        .order_by("modified desc");

    let tasks = client.list_documents("Task", &query)?;
    for task in tasks["data"].as_array().into_iter().flatten() {
        println!("{}\t{}", task["name"], task["subject"]);
    }
    Ok(())
}
