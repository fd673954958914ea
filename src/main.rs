use anyhow::Context;
use log::{info, warn};

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

mod blockchain;
mod network;

use blockchain::{
    Block, DifficultyTarget, MemoryKeyStore, Miner, SledKeyStore, Transaction, Wallet,
    GENESIS_PREV_HASH,
};
use network::{LocalTransport, SyncHandler, SyncMessage, Transport};

fn main() -> anyhow::Result<()> {
    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    // Open the key store for the node wallet; receiver wallets are throwaway
    let data_dir = "data/keystore";
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create data directory {}", data_dir))?;
    let store = Arc::new(SledKeyStore::new(data_dir)?);
    let ephemeral = Arc::new(MemoryKeyStore::new());

    let wallet = Wallet::generate(store.clone())?;
    let receiver_a = Wallet::generate(ephemeral.clone())?;
    let receiver_b = Wallet::generate(ephemeral)?;
    info!("Node wallet address: {}", wallet.address());
    info!(
        "Node wallet secret key: {}",
        hex::encode(wallet.export_secret_key())
    );

    // Sign two transfers; the wallet assigns nonces 0 and 1
    let mut tx1 = Transaction::new(
        wallet.address().clone(),
        vec![receiver_a.address().clone()],
        vec![40],
        1,
    )?;
    wallet.sign(&mut tx1)?;

    let mut tx2 = Transaction::new(
        wallet.address().clone(),
        vec![receiver_a.address().clone(), receiver_b.address().clone()],
        vec![25, 10],
        2,
    )?;
    wallet.sign(&mut tx2)?;

    info!("Transaction {} verifies: {}", tx1.hash(), tx1.verify());
    info!("Transaction {} verifies: {}", tx2.hash(), tx2.verify());

    // Mine a genesis block over the two transfers at an easy target
    let difficulty = DifficultyTarget::from_hex(&format!("00{}", "ff".repeat(31)))?;
    let candidate = Block::from_transactions(
        GENESIS_PREV_HASH.to_string(),
        &[tx1, tx2],
        wallet.address().clone(),
        difficulty,
    );

    let mut miner = Miner::new(candidate);
    miner.start()?;
    miner.join()?;
    let mined = miner.get_mined_block()?;
    info!("Mined block {} at nonce {:016x}", mined.hash(), mined.nonce);

    // A second engine against an unreachable target, interrupted mid-search
    let unreachable = DifficultyTarget::from_hex(&"0".repeat(64))?;
    let hopeless = Block::new(
        mined.hash().to_hex(),
        Vec::new(),
        wallet.address().clone(),
        unreachable,
        0,
    );
    let mut stuck = Miner::new(hopeless);
    stuck.start()?;
    thread::sleep(Duration::from_millis(50));
    stuck.interrupt()?;
    stuck.join()?;
    info!("Interrupted engine alive: {}", stuck.is_alive());

    // Push the mined block between two endpoints over the local transport
    let transport = Arc::new(LocalTransport::new());
    transport.register("node-a")?;
    let inbox = transport.register("node-b")?;

    let received = Arc::new(Mutex::new(None));
    let sink = received.clone();
    let handler_b = SyncHandler::new(
        "node-b",
        Box::new(move |source, message| {
            info!("node-b received a sync message from {}", source);
            *sink.lock().unwrap() = Some(message);
        }),
    );
    let handler_a = SyncHandler::new("node-a", Box::new(|_, _| {}));

    let packet = handler_a.build_outbound(handler_b.addr(), &SyncMessage::Block(mined.clone()))?;
    transport.deliver(packet)?;
    handler_b.on_inbound(&inbox.recv()?)?;

    match received.lock().unwrap().take() {
        Some(SyncMessage::Block(block)) => info!("Synced block {} intact", block.hash()),
        other => warn!("Unexpected sync payload: {:?}", other),
    }

    // Reload the node wallet by address; the persisted nonce comes back
    let reloaded = Wallet::load(store.clone(), &wallet.address().0)?;
    info!(
        "Reloaded wallet {} at nonce {}",
        reloaded.address(),
        reloaded.nonce()
    );
    store.flush()?;

    Ok(())
}
