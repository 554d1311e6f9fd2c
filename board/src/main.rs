use std::sync::Arc;

use anyhow::Context;
use todo_board::{Board, BoardView, ClientConfig, TodoApi};
use todo_core::Todo;
use tracing_subscriber::EnvFilter;

fn print_section(title: &str, todos: &[&Todo], empty: &str, view: &BoardView) {
    println!("{title}");
    if todos.is_empty() {
        println!("  {empty}");
    }
    for todo in todos {
        let marker = if view.is_lifted(&todo.id) { "~" } else { "-" };
        if todo.description.is_empty() {
            println!("  {marker} {}", todo.title);
        } else {
            println!("  {marker} {}: {}", todo.title, todo.description);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let config = ClientConfig::from_env().context("reading client configuration")?;
    tracing::info!(base_url = %config.base_url, "connecting");
    let api = TodoApi::from_config(&config).context("building HTTP client")?;
    let board = Board::new(Arc::new(api));

    let view = board.view().await;
    if let Some(error) = &view.error {
        anyhow::bail!("could not load todos from {}: {error}", config.base_url);
    }

    print_section("Todo List", &view.incomplete(), "No todos yet", &view);
    println!();
    print_section("Completed", &view.completed(), "Nothing completed yet", &view);
    Ok(())
}
