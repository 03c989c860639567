use psplayer::PlayerExt;
use psserver::{LoggingOptions, ServerBuilder};
use psyoutube::YoutubeExt;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ========== PHASE 1 : Infrastructure ==========
    let config = psconfig::get_config();
    let mut server = ServerBuilder::new_configured().build();
    server.init_logging(LoggingOptions::default()).await;
    info!("Configuration loaded from {}", config.dir());

    server
        .add_route("/info", || async {
            serde_json::json!({
                "name": "PowerSmart Audio Server",
                "version": env!("CARGO_PKG_VERSION"),
                "os": psutils::get_os_string(),
            })
        })
        .await;

    // ========== PHASE 2 : APIs ==========
    info!("🎵 Initializing YouTube search and resolution...");
    let youtube = server.init_youtube().await?;
    if !youtube.audio_enabled {
        warn!("Audio resolution disabled: /audio answers 501");
    }

    info!("▶️ Initializing playback sessions...");
    let player = server
        .init_player(youtube.resolver.decorator().clone())
        .await?;

    // ========== PHASE 3 : Démarrage du serveur ==========
    info!("🌐 Starting HTTP server...");
    server.start().await?;

    let host = server.info();
    info!("✅ PowerSmart is ready on {}:{}", host.base_url, host.http_port);
    for (iface, addresses) in psutils::list_ipv4_addresses() {
        for address in addresses {
            info!("  - {}: http://{}:{}", iface, address, host.http_port);
        }
    }
    info!("Press Ctrl+C to stop...");
    server.wait().await;

    player.registry.dispose_all();
    Ok(())
}
