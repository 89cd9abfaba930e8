use agent_memory_store::{
    build_store, MemoryStore, Namespace, NamespaceQuery, StoreConfig, UserMemory,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Agent memory demo starting");

    let config = StoreConfig::from_env()?;
    let store = build_store(&config);

    // First session: each user shares something about themselves
    let alice = UserMemory::new(Arc::clone(&store), "1")?;
    let bob = UserMemory::new(Arc::clone(&store), "2")?;

    alice.remember("name is Alice").await?;
    alice.remember("likes pizza").await?;
    bob.remember("likes sushi").await?;

    info!(
        backend = store.backend_name(),
        items = store.len().await?,
        "First session finished"
    );

    // Second session: fresh handles, same store
    for user_id in ["1", "2"] {
        let memory = UserMemory::new(Arc::clone(&store), user_id)?;
        let context = memory.format_for_prompt().await?;

        println!("\n=== USER {} ===", user_id);
        if context.is_empty() {
            println!("(no memories)");
        } else {
            print!("{}", context);
        }
    }

    let users = store
        .list_namespaces(&NamespaceQuery::new().with_prefix(Namespace::new(["memories"])?))
        .await?;
    println!("\nNamespaces with memories:");
    for ns in users {
        println!("  {}", ns);
    }

    Ok(())
}
