use anyhow::{
    Context,
    Result,
    anyhow,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    collections::BTreeMap,
    fs,
    path::{
        Path,
        PathBuf,
    },
};

pub const DEPLOYMENTS_ROOT: &str = ".deployments";
const REGISTRY_FILE: &str = "contract_addresses.json";

/// Chain ID to deployed raffle contract ids. The first id listed for a chain is the
/// one clients talk to.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AddressRegistry {
    entries: BTreeMap<u64, Vec<String>>,
}

impl AddressRegistry {
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (u64, Vec<S>)>,
        S: Into<String>,
    {
        let entries = entries
            .into_iter()
            .map(|(chain_id, ids)| (chain_id, ids.into_iter().map(Into::into).collect()))
            .collect();
        Self { entries }
    }

    pub fn resolve(&self, chain_id: u64) -> Option<&str> {
        self.entries
            .get(&chain_id)
            .and_then(|ids| ids.first())
            .map(String::as_str)
    }

    pub fn addresses(&self, chain_id: u64) -> &[String] {
        self.entries
            .get(&chain_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn chain_ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.entries.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.values().all(Vec::is_empty)
    }

    /// Appends `contract_id` for `chain_id` unless it is already listed. Returns whether
    /// the registry changed.
    pub fn record(&mut self, chain_id: u64, contract_id: impl Into<String>) -> bool {
        let contract_id = contract_id.into();
        let ids = self.entries.entry(chain_id).or_default();
        if ids.iter().any(|id| id.eq_ignore_ascii_case(&contract_id)) {
            return false;
        }
        ids.push(contract_id);
        true
    }
}

#[derive(Debug)]
pub struct RegistryStore {
    path: PathBuf,
}

impl RegistryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn default_path() -> PathBuf {
        Path::new(DEPLOYMENTS_ROOT).join(REGISTRY_FILE)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<AddressRegistry> {
        read_registry(&self.path)
    }

    pub fn save(&self, registry: &AddressRegistry) -> Result<()> {
        write_registry(&self.path, registry)
    }
}

pub fn ensure_structure() -> Result<()> {
    ensure_registry(RegistryStore::default_path())
}

pub fn ensure_registry(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        fs::create_dir_all(parent).with_context(|| {
            format!("Failed to create registry directory {}", parent.display())
        })?;
    }
    if !path.exists() {
        fs::write(path, b"").with_context(|| {
            format!("Failed to initialize address registry at {}", path.display())
        })?;
        tracing::info!(path = %path.display(), "created empty address registry");
    }
    Ok(())
}

pub fn record_deployment(
    path: impl AsRef<Path>,
    chain_id: u64,
    contract_id: impl AsRef<str>,
) -> Result<bool> {
    ensure_registry(path.as_ref())?;
    let store = RegistryStore::new(path.as_ref());
    let mut registry = store.load()?;
    let changed = registry.record(chain_id, contract_id.as_ref());
    if changed {
        store.save(&registry)?;
    }
    Ok(changed)
}

fn read_registry(path: impl AsRef<Path>) -> Result<AddressRegistry> {
    let path = path.as_ref();
    let data = fs::read(path)
        .with_context(|| format!("Failed to read address registry {}", path.display()))?;
    if data.iter().all(u8::is_ascii_whitespace) {
        return Ok(AddressRegistry::default());
    }
    serde_json::from_slice::<AddressRegistry>(&data).map_err(|e| {
        anyhow!(
            "Failed to parse address registry {}; expected an object of chain id to contract id list: {e}",
            path.display()
        )
    })
}

fn write_registry(path: impl AsRef<Path>, registry: &AddressRegistry) -> Result<()> {
    let json = serde_json::to_vec_pretty(registry)
        .context("Failed to serialize address registry")?;
    fs::write(path.as_ref(), json).context("Failed to write address registry")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use proptest::prelude::*;
    use tempdir::TempDir;

    const CONTRACT_A: &str =
        "0x1111111111111111111111111111111111111111111111111111111111111111";
    const CONTRACT_B: &str =
        "0x2222222222222222222222222222222222222222222222222222222222222222";

    #[test]
    fn resolve__returns_first_registered_address() {
        // given
        let registry = AddressRegistry::from_entries([(0, vec![CONTRACT_A, CONTRACT_B])]);

        // when
        let resolved = registry.resolve(0);

        // then
        assert_eq!(resolved, Some(CONTRACT_A));
    }

    #[test]
    fn resolve__chain_with_empty_list__is_unsupported() {
        let registry = AddressRegistry::from_entries([(9889, Vec::<String>::new())]);
        assert_eq!(registry.resolve(9889), None);
        assert!(registry.is_empty());
    }

    #[test]
    fn record__duplicate_id__leaves_registry_unchanged() {
        // given
        let mut registry = AddressRegistry::from_entries([(0, vec![CONTRACT_A])]);

        // when
        let changed = registry.record(0, CONTRACT_A);

        // then
        assert!(!changed);
        assert_eq!(registry.addresses(0), &[CONTRACT_A.to_string()]);
    }

    #[test]
    fn record__new_id__keeps_existing_first_entry() {
        // given
        let mut registry = AddressRegistry::from_entries([(0, vec![CONTRACT_A])]);

        // when
        let changed = registry.record(0, CONTRACT_B);

        // then
        assert!(changed);
        assert_eq!(registry.resolve(0), Some(CONTRACT_A));
        assert_eq!(registry.addresses(0).len(), 2);
    }

    #[test]
    fn load__parses_chain_id_keys_from_json_object() {
        // given
        let dir = TempDir::new("registry").unwrap();
        let path = dir.path().join(REGISTRY_FILE);
        fs::write(
            &path,
            format!(r#"{{"0": ["{CONTRACT_A}"], "9889": ["{CONTRACT_B}"]}}"#),
        )
        .unwrap();

        // when
        let registry = RegistryStore::new(&path).load().unwrap();

        // then
        assert_eq!(registry.resolve(0), Some(CONTRACT_A));
        assert_eq!(registry.resolve(9889), Some(CONTRACT_B));
        assert_eq!(registry.chain_ids().collect::<Vec<_>>(), vec![0, 9889]);
    }

    #[test]
    fn load__blank_file__is_empty_registry() {
        // given
        let dir = TempDir::new("registry").unwrap();
        let path = dir.path().join("nested").join(REGISTRY_FILE);
        ensure_registry(&path).unwrap();

        // when
        let registry = RegistryStore::new(&path).load().unwrap();

        // then
        assert_eq!(registry, AddressRegistry::default());
    }

    #[test]
    fn load__malformed_json__is_an_error() {
        let dir = TempDir::new("registry").unwrap();
        let path = dir.path().join(REGISTRY_FILE);
        fs::write(&path, b"[1, 2, 3]").unwrap();

        assert!(RegistryStore::new(&path).load().is_err());
    }

    #[test]
    fn record_deployment__persists_and_reloads() {
        // given
        let dir = TempDir::new("registry").unwrap();
        let path = dir.path().join(REGISTRY_FILE);
        ensure_registry(&path).unwrap();

        // when
        let first = record_deployment(&path, 0, CONTRACT_A).unwrap();
        let second = record_deployment(&path, 0, CONTRACT_A).unwrap();

        // then
        assert!(first);
        assert!(!second);
        let registry = RegistryStore::new(&path).load().unwrap();
        assert_eq!(registry.resolve(0), Some(CONTRACT_A));
    }

    proptest! {
        #[test]
        fn resolve__unregistered_chain__is_none(chain_id in any::<u64>()) {
            let registry = AddressRegistry::from_entries([(0u64, vec![CONTRACT_A])]);
            prop_assume!(chain_id != 0);
            prop_assert_eq!(registry.resolve(chain_id), None);
        }
    }
}
