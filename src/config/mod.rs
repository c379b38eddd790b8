//! Configuration for the activity scheduler
//!
//! Settings are read once from `settings.json` at startup and handed to every
//! component as an explicit value. Changing them requires a restart.

pub mod rpc;

use rand::distributions::uniform::SampleUniform;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

pub use rpc::RpcConfig;

/// Blockvision API key environment override
pub const BLOCKVISION_API_KEY_ENV: &str = "BLOCKVISION_API_KEY";

/// Header of the wallet import CSV
pub const IMPORT_CSV_HEADER: &str = "private_key,proxy,name";

/// Inclusive `{from, to}` range used for counts, delays and amounts
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FromTo<T> {
    pub from: T,
    pub to: T,
}

impl<T> FromTo<T> {
    pub const fn new(from: T, to: T) -> Self {
        Self { from, to }
    }
}

impl<T: SampleUniform + PartialOrd + Copy> FromTo<T> {
    /// Draw a value uniformly from `[from, to]`
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> T {
        rng.gen_range(self.from..=self.to)
    }

    pub fn contains(&self, value: T) -> bool {
        self.from <= value && value <= self.to
    }
}

impl FromTo<u64> {
    /// Draw a delay in whole seconds
    pub fn sample_delay<R: Rng + ?Sized>(&self, rng: &mut R) -> chrono::Duration {
        chrono::Duration::seconds(self.sample(rng) as i64)
    }
}

/// Process-wide settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Native balance (MON) below which a wallet is not touched
    pub minimal_balance: f64,
    /// Blockvision API key for transaction history lookups
    #[serde(default)]
    pub blockvision_api_key: String,
    /// Swap quota range drawn once per wallet at import
    pub number_of_swaps: FromTo<u32>,
    /// Seconds between initial-sequence actions
    pub initial_actions_delay: FromTo<u64>,
    /// Seconds between activity actions
    pub activity_actions_delay: FromTo<u64>,
    /// Seconds between mandatory checklist items
    #[serde(default = "default_mandatory_actions_delay")]
    pub mandatory_actions_delay: FromTo<u64>,
    /// Native amount (MON) spent per outgoing swap
    pub mod_amount_for_swap: FromTo<f64>,
    /// Native amount (MON) deposited per stake
    pub mod_amount_for_stake: FromTo<f64>,
}

fn default_mandatory_actions_delay() -> FromTo<u64> {
    FromTo::new(60, 120)
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            minimal_balance: 0.03,
            blockvision_api_key: String::new(),
            number_of_swaps: FromTo::new(5, 15),
            initial_actions_delay: FromTo::new(1800, 10800),
            activity_actions_delay: FromTo::new(18000, 36000),
            mandatory_actions_delay: default_mandatory_actions_delay(),
            mod_amount_for_swap: FromTo::new(0.01, 0.03),
            mod_amount_for_stake: FromTo::new(0.01, 0.02),
        }
    }
}

impl Settings {
    /// Load settings from a JSON file and validate them
    ///
    /// `BLOCKVISION_API_KEY` in the environment overrides the file value.
    pub async fn load(path: &Path) -> crate::Result<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            crate::Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let mut settings: Settings = serde_json::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Invalid {}: {}", path.display(), e)))?;

        if let Ok(key) = std::env::var(BLOCKVISION_API_KEY_ENV) {
            if !key.trim().is_empty() {
                settings.blockvision_api_key = key;
            }
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Reject inverted or negative ranges before anything samples from them
    pub fn validate(&self) -> crate::Result<()> {
        if !self.minimal_balance.is_finite() || self.minimal_balance < 0.0 {
            return Err(crate::Error::Config(format!(
                "minimal_balance must be a non-negative number, got {}",
                self.minimal_balance
            )));
        }

        check_range("number_of_swaps", &self.number_of_swaps)?;
        check_range("initial_actions_delay", &self.initial_actions_delay)?;
        check_range("activity_actions_delay", &self.activity_actions_delay)?;
        check_range("mandatory_actions_delay", &self.mandatory_actions_delay)?;
        check_amount_range("mod_amount_for_swap", &self.mod_amount_for_swap)?;
        check_amount_range("mod_amount_for_stake", &self.mod_amount_for_stake)?;
        Ok(())
    }

    pub fn has_blockvision_key(&self) -> bool {
        !self.blockvision_api_key.trim().is_empty()
    }
}

fn check_range<T: PartialOrd + std::fmt::Debug>(name: &str, range: &FromTo<T>) -> crate::Result<()> {
    if range.from > range.to {
        return Err(crate::Error::Config(format!(
            "{}: from ({:?}) is greater than to ({:?})",
            name, range.from, range.to
        )));
    }
    Ok(())
}

fn check_amount_range(name: &str, range: &FromTo<f64>) -> crate::Result<()> {
    if !range.from.is_finite() || !range.to.is_finite() || range.from < 0.0 {
        return Err(crate::Error::Config(format!(
            "{}: amounts must be finite and non-negative",
            name
        )));
    }
    check_range(name, range)
}

/// Locations of every file the scheduler reads or writes
#[derive(Debug, Clone)]
pub struct FilePaths {
    root: PathBuf,
}

impl FilePaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn settings(&self) -> PathBuf {
        self.root.join("settings.json")
    }

    pub fn import_csv(&self) -> PathBuf {
        self.root.join("import.csv")
    }

    pub fn wallets(&self) -> PathBuf {
        self.root.join("wallets.json")
    }

    pub fn completed_actions(&self) -> PathBuf {
        self.root.join("completed_actions.json")
    }

    /// Create the files directory, an empty import CSV and a settings file
    /// with any missing keys filled from the defaults. A settings file that
    /// is not valid JSON is left untouched and reported as an error.
    pub async fn bootstrap(&self) -> crate::Result<()> {
        tokio::fs::create_dir_all(&self.root).await?;

        let import = self.import_csv();
        if !tokio::fs::try_exists(&import).await? {
            tokio::fs::write(&import, format!("{}\n", IMPORT_CSV_HEADER)).await?;
            tracing::info!(path = %import.display(), "Created empty import file");
        }

        let settings_path = self.settings();
        let current = match tokio::fs::read_to_string(&settings_path).await {
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                crate::Error::Config(format!("Invalid {}: {}", settings_path.display(), e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Value::Object(Default::default()),
            Err(e) => return Err(e.into()),
        };

        let template = serde_json::to_value(Settings::default())?;
        let merged = merge_defaults(current, &template);
        tokio::fs::write(&settings_path, serde_json::to_string_pretty(&merged)?).await?;

        Ok(())
    }
}

impl Default for FilePaths {
    fn default() -> Self {
        Self::new("files")
    }
}

/// Fill keys missing from `current` with values from `template`, recursively.
/// Values already present are kept; extra keys survive after the template keys.
pub fn merge_defaults(current: Value, template: &Value) -> Value {
    match (current, template) {
        (Value::Object(mut current), Value::Object(template)) => {
            let mut merged = serde_json::Map::new();
            for (key, default) in template {
                let value = match current.remove(key) {
                    Some(existing) => merge_defaults(existing, default),
                    None => default.clone(),
                };
                merged.insert(key.clone(), value);
            }
            merged.extend(current);
            Value::Object(merged)
        }
        (current, _) => current,
    }
}
