//! Fill Engine - Demo Entry Point
//!
//! Signs a limit order with a fixed key, fills part of it and prints the
//! resulting event, order state and store root.
//!
//! ```bash
//! RUST_LOG=fill_engine=debug cargo run -- engine.toml
//! ```

use alloy_primitives::{address, U256};
use k256::ecdsa::SigningKey;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use fill_engine::engine::{CallContext, Exchange};
use fill_engine::host::MemoryHost;
use fill_engine::ledger::MemoryStore;
use fill_engine::types::{address_of, LimitOrder, Signature};
use fill_engine::{EngineConfig, Result};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(err) = run() {
        error!(kind = err.kind(), %err, "demo failed");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };
    info!(chain_id = config.chain_id, contract = %config.verifying_contract, "engine configured");

    let maker_key = SigningKey::from_slice(&[0x11; 32]).map_err(|e| fill_engine::EngineError::Config(e.to_string()))?;
    let maker = address_of(maker_key.verifying_key());
    let taker = address!("7a7e000000000000000000000000000000000001");
    let weth = address!("c02aaa39b223fe8d0a0e5c4f27ead9083c756cc2");
    let usdc = address!("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");

    let mut host = MemoryHost::default();
    host.mint_token(weth, maker, 200);
    host.mint_token(usdc, taker, 110);
    let mut exchange = Exchange::new(config, MemoryStore::new(), host)?;

    let order = LimitOrder {
        maker_token: weth,
        taker_token: usdc,
        maker_amount: 200,
        taker_amount: 100,
        taker_token_fee_amount: 10,
        maker,
        fee_recipient: address!("fee0000000000000000000000000000000000001"),
        expiry: 1_700_003_600,
        salt: U256::from(1u8),
        ..Default::default()
    };
    let order_hash = exchange.get_limit_order_hash(&order);
    let signature = Signature::eip712(&maker_key, order_hash)
        .map_err(|e| fill_engine::EngineError::Config(e.to_string()))?;

    let ctx = CallContext::new(taker, 1_700_000_000);
    let result = exchange.fill_limit_order(ctx, &order, &signature, 30)?;

    println!("===========================================");
    println!("  Fill Engine - limit order demo");
    println!("===========================================");
    println!("Order hash:    {order_hash}");
    println!("Taker filled:  {}", result.taker_filled);
    println!("Maker filled:  {}", result.maker_filled);
    println!("Fee filled:    {}", result.fee_filled);

    let info = exchange.get_limit_order_info(&order, ctx.timestamp);
    println!("Status:        {:?} ({} of {} filled)", info.status, info.filled_amount, order.taker_amount);

    if let Some(event) = exchange.events().last() {
        println!("Event bytes:   {}", event.encode().len());
    }
    println!("State root:    {}", exchange.store().state_root_hex());
    Ok(())
}
