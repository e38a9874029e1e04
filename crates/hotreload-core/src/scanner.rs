//! Stat-based change detection over the known plugin directories

use tracing::{debug, warn};

use crate::config::PluginLayout;
use crate::host::VaultFs;
use crate::registry::PluginRegistry;
use crate::stat_cache::{Observation, StatCache, StatRecord};

/// Walks every known plugin directory and diffs the tracked files against
/// the [`StatCache`].
#[derive(Debug, Clone)]
pub struct Scanner<'a> {
    layout: &'a PluginLayout,
    report_first: bool,
}

impl<'a> Scanner<'a> {
    pub fn new(layout: &'a PluginLayout) -> Self {
        Self {
            layout,
            report_first: false,
        }
    }

    /// Report files seen for the first time as changed
    pub fn with_report_first(mut self, report_first: bool) -> Self {
        self.report_first = report_first;
        self
    }

    /// Return the paths whose modification time moved since the previous
    /// scan. The cache always ends up holding the latest observed stats.
    ///
    /// A registry input (manifest or opt-in marker) that appears in a
    /// directory scanned before is always reported, whatever `report_first`
    /// says, so it still reaches the classifier as a reindex.
    pub async fn scan(
        &self,
        cache: &mut StatCache,
        registry: &PluginRegistry,
        fs: &dyn VaultFs,
    ) -> Vec<String> {
        let mut changed = Vec::new();

        for dir in registry.directories() {
            let known_dir = self
                .layout
                .tracked_files()
                .iter()
                .any(|file| cache.get(&self.layout.plugin_file(dir, file)).is_some());

            for file in self.layout.tracked_files() {
                let path = self.layout.plugin_file(dir, file);
                let stat = match fs.stat(&path).await {
                    Ok(Some(stat)) => stat,
                    Ok(None) => continue,
                    Err(e) => {
                        warn!("Failed to stat {}: {}", path, e);
                        continue;
                    }
                };

                let observation = cache.observe(StatRecord::new(path.clone(), stat.modified_at));
                let new_index_file = observation == Observation::First
                    && known_dir
                    && self.layout.is_index_file(file);
                if observation.is_change(self.report_first) || new_index_file {
                    debug!("Detected change in {} ({:?})", path, observation);
                    changed.push(path);
                }
            }
        }

        changed
    }
}
