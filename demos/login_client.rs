//! Login client: sends a LOGIN request and prints the server's answer.
//!
//! ```text
//! cargo run --example login_client -- 127.0.0.1 44917 alice secret
//! ```
//!
//! Against `echo_server` the answer is the request itself.

use ftss_net::{Connection, ConnectionConfig, Packet, RequestType, TcpConnection};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ftss_net::logging::init(tracing::Level::INFO);

    let mut args = std::env::args().skip(1);
    let host = args.next().unwrap_or_else(|| "127.0.0.1".to_string());
    let port: u16 = match args.next() {
        Some(arg) => arg.parse()?,
        None => 0xAF75,
    };
    let user = args.next().unwrap_or_else(|| "guest".to_string());
    let password = args.next().unwrap_or_default();

    let mut conn = TcpConnection::connect(&host, port, ConnectionConfig::from_millis(3000)).await?;

    let mut packet = Packet::new(RequestType::LOGIN);
    packet.append_str(&user)?.append_str(&password)?;
    if let Err(e) = conn.mreq(&mut packet).await {
        tracing::error!(code = e.code(), error = %e, "Login failed");
        return Err(e.into());
    }

    tracing::info!(
        user = %packet.get_string(),
        rest = packet.payload_len(),
        "Got login response"
    );
    println!("{}", conn.stats().to_json()?);

    conn.disconnect();
    Ok(())
}
