/**
 * Integration tests for the node daemon
 *
 * These tests verify:
 * - Configuration creation, loading and defaults
 * - NodeDB lifecycle inside a running node (load, flush on shutdown)
 * - Stale and expired contact eviction with bootstrap protection
 */
use anyhow::Result;
use myriadmesh_crypto::NodeIdentity;
use myriadmesh_nodedb::RouterContact;
use myriadmesh_protocol::{AdapterType, NodeId};
use myriadnode::{Config, Node};
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tempfile::TempDir;

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis() as u64
}

fn create_test_config(dir: &Path) -> Config {
    Config::create_default(Some(dir.join("config.yaml")), Some(dir.join("data"))).unwrap()
}

fn signed_contact(netid: &str, expires_at: u64) -> RouterContact {
    myriadmesh_crypto::init().unwrap();
    let identity = NodeIdentity::generate().unwrap();
    let mut rc = RouterContact::new(identity.node_id, netid, now_ms(), expires_at)
        .with_address(AdapterType::Ethernet, "198.51.100.7:4001");
    rc.sign(&identity).unwrap();
    rc
}

// ====================
// Configuration Tests
// ====================

#[test]
fn test_config_create_and_load() {
    let dir = TempDir::new().unwrap();
    let created = create_test_config(dir.path());
    assert!(created.config_path().exists());
    assert!(created.node.name.starts_with("myriad-"));

    let loaded = Config::load(
        Some(dir.path().join("config.yaml")),
        Some(dir.path().join("data")),
    )
    .unwrap();
    assert_eq!(loaded.node.name, created.node.name);
    assert_eq!(loaded.node.netid, "myriadmesh");
    assert_eq!(loaded.nodedb.flush_interval_secs, 300);
    assert_eq!(loaded.nodedb.stale_insertion_age_secs, 12 * 60 * 60);
    assert_eq!(loaded.nodedb_path(), dir.path().join("data").join("nodedb"));
}

#[test]
fn test_config_missing_file() {
    let dir = TempDir::new().unwrap();
    let err = Config::load(Some(dir.path().join("absent.yaml")), None).unwrap_err();
    assert!(err.to_string().contains("--init"));
}

#[test]
fn test_config_bootstrap_ids_in_hex() -> Result<()> {
    let dir = TempDir::new()?;
    let bootstrap = NodeId::random();
    let yaml = format!(
        "node:\n  name: test\n  netid: testnet\nnodedb:\n  path: {}\n  flush_interval_secs: 0\n  bootstrap:\n    - {}\nlogging:\n  level: debug\n",
        dir.path().join("store").display(),
        bootstrap.to_hex()
    );
    std::fs::write(dir.path().join("config.yaml"), yaml)?;

    let config = Config::load(Some(dir.path().join("config.yaml")), Some(dir.path().into()))?;
    assert_eq!(config.nodedb.bootstrap, vec![bootstrap]);
    assert_eq!(config.nodedb.stale_check_interval_secs, 600);
    assert!(!config.logging.json);

    let nodedb = config.nodedb_config();
    assert_eq!(nodedb.root, Some(dir.path().join("store")));
    assert_eq!(nodedb.netid, "testnet");
    assert_eq!(nodedb.flush_interval_secs, 0);

    let reserialized = serde_yaml::to_string(&config)?;
    assert!(reserialized.contains(&bootstrap.to_hex()));
    Ok(())
}

#[test]
fn test_config_rejects_bad_bootstrap_id() {
    let dir = TempDir::new().unwrap();
    let yaml = concat!(
        "node:\n  name: test\n",
        "nodedb:\n  bootstrap:\n    - not-hex\n",
        "logging:\n  level: info\n",
    );
    std::fs::write(dir.path().join("config.yaml"), yaml).unwrap();

    assert!(Config::load(Some(dir.path().join("config.yaml")), None).is_err());
}

// ====================
// Node Lifecycle Tests
// ====================

#[tokio::test]
async fn test_node_flushes_on_shutdown() -> Result<()> {
    let dir = TempDir::new()?;
    let config = create_test_config(dir.path());
    let rc = signed_contact(&config.node.netid, now_ms() + 3_600_000);

    let node = Node::new(config.clone()).await?;
    assert_eq!(node.db().load_summary().loaded, 0);
    node.db().put_rc(rc.clone());

    let shutdown = node.shutdown_handle();
    shutdown.send(()).await?;
    tokio::time::timeout(Duration::from_secs(10), node.run()).await??;

    let file = config
        .nodedb_path()
        .join(&rc.pubkey.to_hex()[..1])
        .join(format!("{}.signed", rc.pubkey.to_hex()));
    assert!(file.exists());

    let restarted = Node::new(config).await?;
    assert_eq!(restarted.db().load_summary().loaded, 1);
    assert_eq!(restarted.db().get_rc(rc.pubkey).await?, Some(rc));
    Ok(())
}

#[tokio::test]
async fn test_node_ignores_other_networks_on_load() -> Result<()> {
    let dir = TempDir::new()?;
    let config = create_test_config(dir.path());
    let foreign = signed_contact("othernet", now_ms() + 3_600_000);

    let shard = config.nodedb_path().join(&foreign.pubkey.to_hex()[..1]);
    std::fs::create_dir_all(&shard)?;
    let file = shard.join(format!("{}.signed", foreign.pubkey.to_hex()));
    foreign.write(&file)?;

    let node = Node::new(config).await?;
    assert_eq!(node.db().load_summary().skipped, 1);
    assert_eq!(node.db().num_loaded().await?, 0);
    assert!(file.exists());
    Ok(())
}

// ====================
// Eviction Tests
// ====================

#[tokio::test]
async fn test_evict_expired_contacts() -> Result<()> {
    let dir = TempDir::new()?;
    let config = create_test_config(dir.path());
    let live = signed_contact(&config.node.netid, now_ms() + 3_600_000);
    let expired = signed_contact(&config.node.netid, 1);

    let node = Node::new(config).await?;
    node.db().put_rc(live.clone());
    node.db().put_rc(expired.clone());

    assert_eq!(node.evict_stale().await?, 1);
    assert!(node.db().has_router(live.pubkey).await?);
    assert!(!node.db().has_router(expired.pubkey).await?);
    Ok(())
}

#[tokio::test]
async fn test_evict_stale_keeps_bootstrap() -> Result<()> {
    let dir = TempDir::new()?;
    let mut config = create_test_config(dir.path());
    let bootstrap = signed_contact(&config.node.netid, 1);
    let other = signed_contact(&config.node.netid, now_ms() + 3_600_000);
    config.nodedb.stale_insertion_age_secs = 0;
    config.nodedb.bootstrap = vec![bootstrap.pubkey];

    let node = Node::new(config).await?;
    node.db().put_rc(bootstrap.clone());
    node.db().put_rc(other.clone());
    tokio::time::sleep(Duration::from_millis(20)).await;

    node.evict_stale().await?;
    assert!(node.db().has_router(bootstrap.pubkey).await?);
    assert!(!node.db().has_router(other.pubkey).await?);
    assert_eq!(node.db().num_loaded().await?, 1);
    Ok(())
}

#[tokio::test]
async fn test_routers_due_for_refresh() -> Result<()> {
    let dir = TempDir::new()?;
    let mut config = create_test_config(dir.path());
    config.nodedb.refresh_age_secs = 0;
    let rc = signed_contact(&config.node.netid, now_ms() + 3_600_000);

    let node = Node::new(config).await?;
    assert!(node.routers_due_for_refresh().await?.is_empty());

    node.db().put_rc(rc.clone());
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(node.routers_due_for_refresh().await?, vec![rc.pubkey]);

    // Reporting does not evict
    assert!(node.db().has_router(rc.pubkey).await?);
    Ok(())
}
