//! Echo server: answers every packet with a packet of the same type and payload.
//!
//! ```text
//! cargo run --example echo_server -- 44917
//! ```

use ftss_net::{Connection, ConnectionWaiter, MaxWait};

const DEFAULT_PORT: u16 = 0xAF75;

async fn serve(mut conn: Box<dyn Connection>) {
    let peer = conn.counterpart_address();
    tracing::info!(?peer, "Client connected");

    while conn.is_connected() {
        let Some(packet) = conn.wait_for_then_get_packet(true).await else {
            continue;
        };
        if let Err(e) = conn.send(&packet).await {
            tracing::warn!(error = %e, "Echo failed");
        }
    }

    tracing::info!(?peer, stats = ?conn.stats().to_json().ok(), "Client gone");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ftss_net::logging::init(tracing::Level::DEBUG);

    let port = match std::env::args().nth(1) {
        Some(arg) => arg.parse()?,
        None => DEFAULT_PORT,
    };

    let mut waiter = ConnectionWaiter::bind(port, |conn| {
        tokio::spawn(serve(conn));
    })
    .await?;
    tracing::info!(addr = %waiter.local_addr()?, "Echo server listening");

    loop {
        waiter.wait_for_then_do_connection(MaxWait::Infinite).await;
    }
}
