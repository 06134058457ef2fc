//! Browser glue
//!
//! Each widget mounts only when its anchor element is on the page. The idle
//! timer and the snake game both talk to the shared cultivation panel.

pub mod census;
pub mod comments;
pub mod cultivation;
pub mod dom;
pub mod fireworks;
pub mod idle;
pub mod snake;

pub use comments::link_com;

/// Initialise logging and mount every widget present on the page
pub async fn run() {
    console_error_panic_hook::set_once();
    if let Err(e) = console_log::init_with_level(log::Level::Info) {
        web_sys::console::error_1(&format!("logger init failed: {e}").into());
    }

    log::info!("moyu-garden starting...");

    if let Err(e) = fireworks::mount() {
        log::error!("Fireworks failed to start: {:?}", e);
    }
    if let Err(e) = comments::mount_emoji_preview() {
        log::error!("Emoji preview failed: {:?}", e);
    }

    match cultivation::mount().await {
        Ok(panel) => {
            idle::mount(panel.clone());
            if let Err(e) = snake::mount(panel) {
                log::error!("Snake failed to start: {:?}", e);
            }
        }
        Err(e) => log::error!("Cultivation failed to load: {:?}", e),
    }

    if let Err(e) = census::mount().await {
        log::error!("Dashboard failed: {:?}", e);
    }

    log::info!("moyu-garden running!");
}
