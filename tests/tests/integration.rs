use std::time::Duration;

use hotreload_core::{HotReloadConfig, HotReloadManager, HotReloadSettings, ReloadEvent};
use hotreload_testing::{MockHost, assert_call_count, plugin_path};
use tokio::sync::broadcast;

/// Let every debounce window elapse and the queue drain
async fn settle(manager: &HotReloadManager) {
    tokio::time::sleep(Duration::from_secs(2)).await;
    manager.flush().await.unwrap();
}

async fn start(mock: &MockHost) -> HotReloadManager {
    start_with(mock, HotReloadConfig::default()).await
}

async fn start_with(mock: &MockHost, config: HotReloadConfig) -> HotReloadManager {
    let manager = HotReloadManager::start(config, mock.host()).await.unwrap();
    settle(&manager).await;
    mock.clear_calls();
    manager
}

fn drain(events: &mut broadcast::Receiver<ReloadEvent>) -> Vec<ReloadEvent> {
    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    seen
}

/// Every `:begin` entry is immediately followed by its own `:end`
fn assert_no_overlap(calls: &[String]) {
    for pair in calls.chunks(2) {
        let [begin, end] = pair else {
            panic!("unbalanced call log: {calls:?}");
        };
        let name = begin
            .strip_suffix(":begin")
            .unwrap_or_else(|| panic!("expected a begin entry, got {begin} in {calls:?}"));
        assert_eq!(end, &format!("{name}:end"), "interleaved calls: {calls:?}");
    }
}

#[tokio::test(start_paused = true)]
async fn test_opted_in_plugin_reloads_once_per_change() {
    let mock = MockHost::new();
    mock.install_opted_in("foo", "foo");
    mock.install_plugin("bar", "bar");
    let manager = start(&mock).await;

    mock.touch(&plugin_path("foo", "main.js"));
    manager.request_scan();
    settle(&manager).await;

    assert_call_count!(mock, "disable:foo:begin", 1);
    assert_call_count!(mock, "enable:foo:begin", 1);
    assert_eq!(mock.notices(), vec!["Plugin \"foo\" has been reloaded"]);

    mock.clear_calls();
    mock.touch(&plugin_path("bar", "main.js"));
    mock.touch(&plugin_path("bar", "styles.css"));
    manager.request_scan();
    settle(&manager).await;

    assert!(mock.calls().is_empty());
    assert_eq!(mock.notices().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_vcs_directory_counts_as_opt_in() {
    let mock = MockHost::new();
    mock.install_plugin("foo", "foo");
    mock.add_file(&plugin_path("foo", ".git"));
    let manager = start(&mock).await;

    assert!(manager.registry().await.is_opted_in("foo"));

    mock.touch(&plugin_path("foo", "main.js"));
    manager.request_scan();
    settle(&manager).await;

    assert_eq!(mock.reload_count("foo"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_unchanged_files_never_reload() {
    let mock = MockHost::new();
    mock.install_opted_in("foo", "foo");
    let manager = start(&mock).await;

    for _ in 0..3 {
        manager.request_scan();
        settle(&manager).await;
    }

    assert!(mock.calls().is_empty());
    assert!(mock.notices().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_edit_burst_collapses_into_one_reload() {
    let mock = MockHost::new();
    mock.install_opted_in("foo", "foo");
    let manager = start(&mock).await;

    for _ in 0..5 {
        mock.touch(&plugin_path("foo", "main.js"));
        manager.request_scan();
        tokio::time::sleep(Duration::from_millis(400)).await;
    }
    settle(&manager).await;

    assert_eq!(mock.reload_count("foo"), 1);
    assert_call_count!(mock, "disable:foo:begin", 1);
}

#[tokio::test(start_paused = true)]
async fn test_plugins_debounce_independently() {
    let mock = MockHost::new();
    mock.install_opted_in("foo", "foo");
    mock.install_opted_in("baz", "baz");
    let manager = start(&mock).await;

    mock.touch(&plugin_path("foo", "main.js"));
    mock.touch(&plugin_path("baz", "main.js"));
    manager.request_scan();
    settle(&manager).await;

    assert_eq!(mock.reload_count("foo"), 1);
    assert_eq!(mock.reload_count("baz"), 1);
    assert_no_overlap(&mock.calls());
}

#[tokio::test(start_paused = true)]
async fn test_reindex_and_reload_never_overlap() {
    let mock = MockHost::new();
    mock.install_opted_in("foo", "foo");
    let manager = start(&mock).await;
    mock.set_latency(Duration::from_secs(1));

    mock.touch(&plugin_path("foo", "manifest.json"));
    mock.touch(&plugin_path("foo", "main.js"));
    manager.request_scan();
    tokio::time::sleep(Duration::from_secs(5)).await;
    manager.flush().await.unwrap();

    let calls = mock.calls();
    assert_no_overlap(&calls);
    let reindex_end = calls.iter().position(|c| c == "manifests:end").unwrap();
    let disable = calls.iter().position(|c| c == "disable:foo:begin").unwrap();
    assert!(reindex_end < disable, "reload started during reindex: {calls:?}");
}

#[tokio::test(start_paused = true)]
async fn test_debug_toggle_is_on_during_enable_and_restored() {
    let mock = MockHost::new();
    mock.install_opted_in("foo", "foo");
    let manager = start(&mock).await;
    hotreload_core::ToggleStore::set(&mock, "debug-plugin", "0");

    mock.touch(&plugin_path("foo", "main.js"));
    manager.request_scan();
    settle(&manager).await;

    assert_eq!(
        mock.toggles_at_enable(),
        vec![("foo".to_string(), Some("1".to_string()))]
    );
    assert_eq!(mock.toggle("debug-plugin").as_deref(), Some("0"));
}

#[tokio::test(start_paused = true)]
async fn test_failed_enable_restores_toggle_and_reports() {
    let mock = MockHost::new();
    mock.install_opted_in("foo", "foo");
    mock.fail_enable("foo");
    let manager = start(&mock).await;
    let mut events = manager.subscribe();

    mock.touch(&plugin_path("foo", "main.js"));
    manager.request_scan();
    settle(&manager).await;

    assert_eq!(mock.toggle("debug-plugin"), None);
    assert!(mock.notices().is_empty());
    let failures: Vec<_> = drain(&mut events)
        .into_iter()
        .filter_map(|event| match event {
            ReloadEvent::OperationFailed { operation, error } => Some((operation, error)),
            _ => None,
        })
        .collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, "reload(foo)");
    assert!(failures[0].1.contains("SyntaxError"));
}

#[tokio::test(start_paused = true)]
async fn test_disabled_plugin_is_left_alone() {
    let mock = MockHost::new();
    mock.install_opted_in("foo", "foo");
    mock.set_enabled("foo", false);
    let manager = start(&mock).await;
    let mut events = manager.subscribe();

    mock.touch(&plugin_path("foo", "main.js"));
    manager.request_scan();
    settle(&manager).await;

    assert!(mock.calls().is_empty());
    assert!(
        drain(&mut events)
            .iter()
            .any(|event| matches!(event, ReloadEvent::ReloadSkipped { plugin_id } if plugin_id == "foo"))
    );
}

#[tokio::test(start_paused = true)]
async fn test_queue_continues_after_failure() {
    let mock = MockHost::new();
    mock.install_opted_in("a-broken", "broken");
    mock.install_opted_in("b-fine", "fine");
    mock.fail_disable("broken");
    let manager = start(&mock).await;

    mock.touch(&plugin_path("a-broken", "main.js"));
    mock.touch(&plugin_path("b-fine", "main.js"));
    manager.request_scan();
    settle(&manager).await;

    assert_call_count!(mock, "enable:broken:begin", 0);
    assert_eq!(mock.reload_count("fine"), 1);
    assert_eq!(mock.notices(), vec!["Plugin \"fine\" has been reloaded"]);
}

#[tokio::test(start_paused = true)]
async fn test_stat_failure_skips_only_that_file() {
    let mock = MockHost::new();
    mock.install_opted_in("foo", "foo");
    mock.install_opted_in("baz", "baz");
    let manager = start(&mock).await;
    mock.fail_stat(&plugin_path("foo", "main.js"));

    mock.touch(&plugin_path("foo", "main.js"));
    mock.touch(&plugin_path("baz", "main.js"));
    manager.request_scan();
    settle(&manager).await;

    assert_eq!(mock.reload_count("foo"), 0);
    assert_eq!(mock.reload_count("baz"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_new_plugin_directory_is_picked_up() {
    let mock = MockHost::new();
    let manager = start(&mock).await;
    assert!(manager.registry().await.is_empty());

    mock.install_opted_in("fresh", "fresh");
    manager
        .handle_raw_event(Some(".obsidian/plugins/fresh"))
        .await;
    manager
        .handle_raw_event(Some(&plugin_path("fresh", "manifest.json")))
        .await;
    settle(&manager).await;

    let registry = manager.registry().await;
    assert_eq!(registry.plugin_for_dir("fresh"), Some("fresh"));
    assert!(registry.is_opted_in("fresh"));
    assert!(mock.watched().contains(&".obsidian/plugins/fresh".to_string()));

    manager.request_scan();
    settle(&manager).await;
    mock.touch(&plugin_path("fresh", "main.js"));
    manager
        .handle_raw_event(Some(&plugin_path("fresh", "main.js")))
        .await;
    settle(&manager).await;

    assert_eq!(mock.reload_count("fresh"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_marker_change_updates_opt_in() {
    let mock = MockHost::new();
    mock.install_plugin("foo", "foo");
    let manager = start(&mock).await;
    assert!(!manager.registry().await.is_opted_in("foo"));

    mock.add_file(&plugin_path("foo", ".hotreload"));
    manager
        .handle_raw_event(Some(&plugin_path("foo", ".hotreload")))
        .await;
    settle(&manager).await;
    assert!(manager.registry().await.is_opted_in("foo"));

    mock.remove_file(&plugin_path("foo", ".hotreload"));
    manager
        .handle_raw_event(Some(&plugin_path("foo", ".hotreload")))
        .await;
    settle(&manager).await;
    assert!(!manager.registry().await.is_opted_in("foo"));
    assert_eq!(mock.reload_count("foo"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_marker_dropped_into_installed_plugin_is_found_by_scan() {
    let mock = MockHost::new();
    mock.install_plugin("foo", "foo");
    let manager = start(&mock).await;

    mock.add_file(&plugin_path("foo", ".hotreload"));
    manager.handle_raw_event(None).await;
    settle(&manager).await;
    assert!(manager.registry().await.is_opted_in("foo"));

    mock.touch(&plugin_path("foo", "main.js"));
    manager.request_scan();
    settle(&manager).await;

    assert_eq!(mock.reload_count("foo"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failed_reindex_keeps_previous_registry() {
    let mock = MockHost::new();
    mock.install_opted_in("foo", "foo");
    let manager = start(&mock).await;
    let before = manager.registry().await;
    let mut events = manager.subscribe();

    mock.fail_manifests(true);
    manager.request_reindex();
    settle(&manager).await;

    assert_eq!(manager.registry().await, before);
    assert!(drain(&mut events).iter().any(
        |event| matches!(event, ReloadEvent::OperationFailed { operation, .. } if operation == "reindex")
    ));
}

#[tokio::test(start_paused = true)]
async fn test_activation_watches_plugin_directories() {
    let mock = MockHost::new();
    mock.install_plugin("foo", "foo");
    mock.install_plugin("bar", "bar");
    let _manager = start(&mock).await;

    let watched = mock.watched();
    assert!(watched.contains(&".obsidian/plugins".to_string()));
    assert!(watched.contains(&".obsidian/plugins/foo".to_string()));
    assert!(watched.contains(&".obsidian/plugins/bar".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_watch_policy_can_decline() {
    let mock = MockHost::new();
    mock.install_plugin("foo", "foo");
    mock.without_watch_needed();
    let _manager = start(&mock).await;

    assert!(mock.watched().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_first_observation_can_trigger_reload() {
    let mock = MockHost::new();
    mock.install_opted_in("foo", "foo");
    mock.install_plugin("bar", "bar");

    let manager = HotReloadManager::start(
        HotReloadConfig::default().with_reload_on_first_observation(true),
        mock.host(),
    )
    .await
    .unwrap();
    settle(&manager).await;

    assert_eq!(mock.reload_count("foo"), 1);
    assert_eq!(mock.reload_count("bar"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_cancels_pending_reloads() {
    let mock = MockHost::new();
    mock.install_opted_in("foo", "foo");
    let mut manager = start(&mock).await;

    mock.touch(&plugin_path("foo", "main.js"));
    manager.request_scan();
    tokio::time::sleep(Duration::from_millis(300)).await;
    manager.flush().await.unwrap();
    assert!(!manager.coordinator().pending().is_empty());

    manager.shutdown().await.unwrap();
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert!(mock.calls().is_empty());
    assert!(!manager.is_running());
    assert!(manager.registry().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_drops_timers_scheduled_while_draining() {
    let mock = MockHost::new();
    mock.install_opted_in("foo", "foo");
    let mut manager = start(&mock).await;
    mock.set_latency(Duration::from_secs(1));

    // Reindex is running when the scan is admitted behind it
    manager.request_reindex();
    tokio::time::sleep(Duration::from_millis(600)).await;
    mock.touch(&plugin_path("foo", "main.js"));
    manager.request_scan();
    tokio::time::sleep(Duration::from_millis(300)).await;

    manager.shutdown().await.unwrap();

    assert!(manager.coordinator().pending().is_empty());
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(mock.reload_count("foo"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_reload_now_bypasses_opt_in() {
    let mock = MockHost::new();
    mock.install_plugin("bar", "bar");
    let manager = start(&mock).await;

    manager.reload_now("bar").unwrap();
    manager.flush().await.unwrap();

    assert_eq!(mock.reload_count("bar"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_settings_are_merged_and_saved() {
    let mock = MockHost::new();
    mock.set_stored_settings(serde_json::json!({ "profile": "dev", "legacy": true }));
    let mut manager = start(&mock).await;

    assert_eq!(manager.settings().profile, "dev");

    manager
        .save_settings(HotReloadSettings {
            profile: "release".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(
        mock.stored_settings(),
        Some(serde_json::json!({ "profile": "release" }))
    );
}
