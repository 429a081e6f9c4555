// Player Performance service entry point

#[tokio::main]
async fn main() {
    if let Err(e) = player_performance_lib::run().await {
        log::error!("Player performance service failed: {}", e);
        eprintln!("player-performance: {}", e);
        std::process::exit(1);
    }
}
