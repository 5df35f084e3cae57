use anyhow::{Context, Result};
use myriadmesh_nodedb::config::{DEFAULT_FLUSH_INTERVAL_SECS, DEFAULT_NETID, LEGACY_DIR_NAME};
use myriadmesh_nodedb::{NodeDbConfig, STALE_INSERTION_AGE_MS};
use myriadmesh_protocol::NodeId;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub node: NodeConfig,
    pub nodedb: NodeDbSection,
    pub logging: LoggingConfig,

    #[serde(skip)]
    config_file_path: PathBuf,
    #[serde(skip)]
    pub data_directory: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    pub name: String,
    /// Network this node belongs to; contacts from other networks are ignored
    #[serde(default = "default_netid")]
    pub netid: String,
}

fn default_netid() -> String {
    DEFAULT_NETID.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDbSection {
    /// Contact store directory; defaults to `<data dir>/nodedb`
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default = "default_flush_interval")]
    pub flush_interval_secs: u64,
    #[serde(default = "default_stale_insertion_age")]
    pub stale_insertion_age_secs: u64,
    #[serde(default = "default_stale_check_interval")]
    pub stale_check_interval_secs: u64,
    /// Contacts older than this are due for a refresh lookup
    #[serde(default = "default_refresh_age")]
    pub refresh_age_secs: u64,
    /// Routers never evicted for staleness
    #[serde(default, with = "hex_node_ids")]
    pub bootstrap: Vec<NodeId>,
}

fn default_flush_interval() -> u64 {
    DEFAULT_FLUSH_INTERVAL_SECS
}

fn default_stale_insertion_age() -> u64 {
    STALE_INSERTION_AGE_MS / 1000
}

fn default_stale_check_interval() -> u64 {
    600
}

fn default_refresh_age() -> u64 {
    3600
}

impl Default for NodeDbSection {
    fn default() -> Self {
        Self {
            path: None,
            flush_interval_secs: default_flush_interval(),
            stale_insertion_age_secs: default_stale_insertion_age(),
            stale_check_interval_secs: default_stale_check_interval(),
            refresh_age_secs: default_refresh_age(),
            bootstrap: vec![],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Config {
    /// Load configuration from file or use defaults
    pub fn load(config_path: Option<PathBuf>, data_dir: Option<PathBuf>) -> Result<Self> {
        let config_path = config_path.unwrap_or_else(Self::default_config_path);
        let data_dir = data_dir.unwrap_or_else(Self::default_data_dir);

        if !config_path.exists() {
            anyhow::bail!(
                "Configuration file not found: {}\nRun with --init to create a new configuration",
                config_path.display()
            );
        }

        let contents =
            fs::read_to_string(&config_path).context("Failed to read configuration file")?;

        let mut config: Config =
            serde_yaml::from_str(&contents).context("Failed to parse configuration file")?;

        config.config_file_path = config_path;
        config.data_directory = data_dir;

        Ok(config)
    }

    /// Create a new default configuration
    pub fn create_default(config_path: Option<PathBuf>, data_dir: Option<PathBuf>) -> Result<Self> {
        let config_path = config_path.unwrap_or_else(Self::default_config_path);
        let data_dir = data_dir.unwrap_or_else(Self::default_data_dir);

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::create_dir_all(&data_dir)?;

        let suffix = NodeId::random().to_hex();

        let config = Config {
            node: NodeConfig {
                name: format!("myriad-{}", &suffix[..8]),
                netid: default_netid(),
            },
            nodedb: NodeDbSection::default(),
            logging: LoggingConfig::default(),
            config_file_path: config_path.clone(),
            data_directory: data_dir,
        };

        let yaml = serde_yaml::to_string(&config)?;
        fs::write(&config_path, yaml)?;

        Ok(config)
    }

    pub fn config_path(&self) -> &Path {
        &self.config_file_path
    }

    /// Contact store directory
    pub fn nodedb_path(&self) -> PathBuf {
        self.nodedb
            .path
            .clone()
            .unwrap_or_else(|| self.data_directory.join("nodedb"))
    }

    pub fn nodedb_config(&self) -> NodeDbConfig {
        NodeDbConfig {
            root: Some(self.nodedb_path()),
            netid: self.node.netid.clone(),
            flush_interval_secs: self.nodedb.flush_interval_secs,
            legacy_dir_name: LEGACY_DIR_NAME.to_string(),
        }
    }

    fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("myriadnode")
            .join("config.yaml")
    }

    fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("myriadnode")
    }
}

mod hex_node_ids {
    use myriadmesh_protocol::NodeId;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(ids: &[NodeId], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(ids.iter().map(NodeId::to_hex))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<NodeId>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Vec::<String>::deserialize(deserializer)?
            .iter()
            .map(|s| NodeId::from_hex(s).map_err(serde::de::Error::custom))
            .collect()
    }
}
