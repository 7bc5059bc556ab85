//! Fetch a channel template, edit it and print the resulting config.
//!
//! Run against a local server (or `cargo run -p mock-server`):
//! `cargo run -p iguana-core --example new_channel`

use iguana_core::{ApiError, Channel, ClientConfig, Iguana};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), ApiError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ClientConfig::load(std::path::Path::new("iguana.toml"))?;
    let iguana = Iguana::new(config);

    println!("server version: {}", iguana.version()?);

    let template = iguana.default_config("LLP Listener", "To Database")?.into_result()?;
    let mut channel = Channel::parse(&template)?;
    channel.set_name("channeltest123")?;
    channel.set_port(123)?;

    match iguana.channel_create(&channel) {
        Err(ApiError::NotImplemented { operation }) => {
            tracing::warn!("{operation} is not available, printing config only")
        }
        other => {
            other?;
        }
    }

    println!("{channel}");
    Ok(())
}
