use crate::{GenerationParams, Instance};
use anyhow::{anyhow, Result};
use log::debug;
use sspa_structs::core::InstanceKey;
use sspa_utils::{read_json_file, write_json_file, COMPRESSED_EXTENSION};
use std::path::{Path, PathBuf};

/// Anything able to materialize the instance stored under a key.
pub trait InstanceSource {
    fn load(&self, key: &InstanceKey) -> Result<Instance>;
}

/// Generates instances on demand instead of reading them from disk.
#[derive(Debug, Clone, Default)]
pub struct GeneratedInstances {
    pub params: GenerationParams,
}

impl InstanceSource for GeneratedInstances {
    fn load(&self, key: &InstanceKey) -> Result<Instance> {
        Instance::generate_with(key, &self.params)
    }
}

/// Instances persisted as json files below `root`, one per key.
#[derive(Debug, Clone)]
pub struct InstanceStore {
    root: PathBuf,
    compress: bool,
}

impl InstanceStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            compress: false,
        }
    }

    pub fn compressed(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, key: &InstanceKey, compressed: bool) -> PathBuf {
        let file = if compressed {
            format!("instance_{}.json.{}", key.instance_index, COMPRESSED_EXTENSION)
        } else {
            format!("instance_{}.json", key.instance_index)
        };
        self.root
            .join(format!(
                "{}_projects_{}_students",
                key.num_projects, key.num_students
            ))
            .join(file)
    }

    pub fn contains(&self, key: &InstanceKey) -> bool {
        self.path_for(key, false).exists() || self.path_for(key, true).exists()
    }

    pub fn save(&self, instance: &Instance) -> Result<PathBuf> {
        let path = self.path_for(&instance.key, self.compress);
        write_json_file(&path, instance, self.compress)?;
        debug!("saved instance {} to {}", instance.key, path.display());
        Ok(path)
    }

    /// Generates and saves `count` instances starting at index 0, skipping existing ones.
    pub fn populate(
        &self,
        num_projects: usize,
        num_students: usize,
        count: usize,
        params: &GenerationParams,
    ) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        for index in 0..count {
            let key = InstanceKey::new(num_projects, num_students, index);
            if self.contains(&key) {
                continue;
            }
            let instance = Instance::generate_with(&key, params)?;
            written.push(self.save(&instance)?);
        }
        Ok(written)
    }
}

impl InstanceSource for InstanceStore {
    fn load(&self, key: &InstanceKey) -> Result<Instance> {
        let path = [self.path_for(key, false), self.path_for(key, true)]
            .into_iter()
            .find(|p| p.exists())
            .ok_or_else(|| anyhow!("No instance {} below {}", key, self.root.display()))?;
        let instance: Instance = read_json_file(&path)?;
        if instance.key != *key {
            return Err(anyhow!(
                "File {} holds instance {}, expected {}",
                path.display(),
                instance.key,
                key
            ));
        }
        Ok(instance)
    }
}
