use crate::context::AppContext;

pub fn connections(context: &AppContext) {
    let configs = context.registry.configs();

    println!("📊 Available Database Connections:");
    for name in context.registry.list_connections() {
        let marker = if name == configs.default { " (default)" } else { "" };
        match configs.get(&name) {
            Some(config) => println!("  - {}{} [{}] {}", name, marker, config.kind, config.masked_url()),
            None => println!("  - {}{}", name, marker),
        }
    }
}

pub async fn status(context: &AppContext, connection: Option<&str>) -> anyhow::Result<()> {
    let name = context.connection_name(connection);
    println!("🔍 Checking connection status for: {}", name);

    let health = match context.registry.health(name).await {
        Ok(health) => health,
        Err(err) => {
            println!("❌ Connection '{}' failed: {}", name, err);
            return Err(err.into());
        }
    };

    if health.is_responsive() {
        println!("✅ Connection '{}' is healthy", name);
    } else {
        println!("⚠️  Connection '{}' is slow to respond", name);
    }
    println!("   Database Type: {}", health.backend);
    println!("   Latency: {}ms", health.latency.as_millis());
    println!("   Open Connections: {}", health.stats.total_connections);
    println!("   In Use: {}", health.stats.active_connections);
    println!("   Idle: {}", health.stats.idle_connections);
    println!("   Utilization: {:.1}%", health.utilization());
    Ok(())
}
