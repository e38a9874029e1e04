//! Maps a changed vault path to the action it calls for

use crate::config::PluginLayout;
use crate::registry::PluginRegistry;

/// What a changed path asks the coordinator to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Outside the plugin root, unrecognized depth, or not opted in
    Ignore,
    /// A bare directory directly under the plugin root
    WatchNewDirectory(String),
    /// Registry inputs changed (manifest or marker, or an unknown directory)
    Reindex,
    /// A reloadable artifact of a known, opted-in plugin changed
    Reload(String),
}

/// Classify `path` against the current registry.
///
/// Only paths one or two components below the layout's plugin root are
/// considered; everything else is [`Action::Ignore`].
pub fn classify(path: &str, layout: &PluginLayout, registry: &PluginRegistry) -> Action {
    let Some(relative) = path
        .strip_prefix(layout.root())
        .and_then(|rest| rest.strip_prefix('/'))
    else {
        return Action::Ignore;
    };

    let components: Vec<&str> = relative.split('/').collect();
    if components.iter().any(|c| c.is_empty()) {
        return Action::Ignore;
    }

    match components.as_slice() {
        [_directory] => Action::WatchNewDirectory(path.to_string()),
        [directory, file] => match registry.plugin_for_dir(directory) {
            _ if layout.is_index_file(file) => Action::Reindex,
            None => Action::Reindex,
            Some(plugin_id) if layout.is_reloadable(file) && registry.is_opted_in(plugin_id) => {
                Action::Reload(plugin_id.to_string())
            }
            Some(_) => Action::Ignore,
        },
        _ => Action::Ignore,
    }
}
