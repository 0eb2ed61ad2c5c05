use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use test_log::test;

use crate::actor::broadcast::BroadcastEvent;
use crate::common::config::{Config, FeatureOverrides, ScopeRule};
use crate::host::FixtureHost;
use crate::model::{Desktop, WindowIdentity};
use crate::sys::geometry::Rect;
use crate::workspace::{
    GENERATE_WORKSPACE_TOPIC, SnapshotBuilder, Workspace, WorkspaceError, regroup_workspace,
};

fn main(uuid: &str) -> WindowIdentity { WindowIdentity::main_window_of(uuid) }

fn config() -> Config {
    let mut config = Config::default();
    config.settings.client_timeout_ms = 50;
    config
}

fn bounds(left: f64, top: f64, width: f64, height: f64) -> Value {
    json!({ "left": left, "top": top, "width": width, "height": height })
}

fn window(name: &str, left: f64) -> Value { json!({ "name": name, "bounds": bounds(left, 0.0, 200.0, 200.0) }) }

fn app(uuid: &str, left: f64) -> Value {
    json!({
        "uuid": uuid,
        "info": { "manifestUrl": format!("https://example.com/{uuid}.json") },
        "mainWindow": window(uuid, left),
    })
}

fn ids(identities: &[WindowIdentity]) -> Value { serde_json::to_value(identities).unwrap() }

async fn setup_with(config: Config, fixture: Value) -> (Desktop, FixtureHost) {
    let host = FixtureHost::from_json(&fixture.to_string()).unwrap();
    let desktop = Desktop::new(config);
    host.populate(&desktop).await;
    (desktop, host)
}

async fn setup(fixture: Value) -> (Desktop, FixtureHost) { setup_with(config(), fixture).await }

async fn snapshot(desktop: &Desktop, host: &FixtureHost) -> Workspace {
    SnapshotBuilder::new(desktop, host, host, host).get_current_workspace().await
}

fn uuids(workspace: &Workspace) -> Vec<&str> { workspace.apps.iter().map(|a| a.uuid.as_str()).collect() }

mod snapshot {
    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;

    #[test(tokio::test)]
    async fn excludes_each_ineligible_app_independently() {
        let mut not_running = app("app3", 400.0);
        not_running["running"] = json!(false);
        let mut no_main = app("app4", 600.0);
        no_main.as_object_mut().unwrap().remove("mainWindow");
        let mut deregistered = app("app5", 800.0);
        deregistered["mainWindow"]["registered"] = json!(false);

        let (desktop, host) = setup(json!({
            "apps": [
                app("app1", 0.0),
                app("layouts-service", 200.0),
                not_running,
                no_main,
                deregistered,
            ],
        }))
        .await;

        let workspace = snapshot(&desktop, &host).await;
        assert_eq!(uuids(&workspace), vec!["app1"]);
        assert_eq!(workspace.schema_version, "1.0.0");
        assert!(!workspace.apps[0].confirmed);
        assert_eq!(workspace.apps[0].custom_data, None);
    }

    #[test(tokio::test)]
    async fn deregistered_app_vanishes_from_siblings() {
        let (desktop, host) = setup(json!({
            "apps": [app("app1", 0.0), app("app2", 200.0)],
            "windowGroups": [ids(&[main("app1"), main("app2")])],
        }))
        .await;
        desktop.deregister(&main("app1")).await;

        let workspace = snapshot(&desktop, &host).await;
        assert_eq!(uuids(&workspace), vec!["app2"]);
        assert!(workspace.apps[0].main_window.window_group.is_empty());
    }

    #[test(tokio::test)]
    async fn captures_window_state_and_siblings() {
        let mut app1 = app("app1", 0.0);
        app1["childWindows"] = json!([
            { "name": "child", "bounds": bounds(0.0, 200.0, 200.0, 100.0), "hidden": true, "state": "minimized", "title": "Child" },
            { "name": "gone", "bounds": bounds(0.0, 300.0, 200.0, 100.0), "registered": false },
        ]);
        let (desktop, host) = setup(json!({
            "apps": [app1, app("app2", 200.0)],
            "windowGroups": [ids(&[main("app1"), main("app2"), WindowIdentity::new("app1", "child")])],
        }))
        .await;

        let workspace = snapshot(&desktop, &host).await;
        let app1 = workspace.app("app1").unwrap();
        assert_eq!(
            app1.main_window.window_group,
            vec![main("app2"), WindowIdentity::new("app1", "child")]
        );
        assert_eq!(app1.child_windows.len(), 1);

        let child = &app1.child_windows[0];
        assert_eq!(child.bounds, Rect::new(0.0, 200.0, 200.0, 100.0));
        assert!(!child.is_showing);
        assert_eq!(serde_json::to_value(child.state).unwrap(), "minimized");
        assert_eq!(child.title.as_deref(), Some("Child"));
        assert_eq!(app1.info.manifest_url.as_deref(), Some("https://example.com/app1.json"));
    }

    #[test(tokio::test)]
    async fn metadata_failure_only_affects_that_app() {
        let mut broken = app("app2", 200.0);
        broken.as_object_mut().unwrap().remove("info");
        let (desktop, host) = setup(json!({ "apps": [app("app1", 0.0), broken, app("app3", 400.0)] })).await;

        let workspace = snapshot(&desktop, &host).await;
        assert_eq!(uuids(&workspace), vec!["app1", "app3"]);
    }

    #[test(tokio::test)]
    async fn programmatic_app_keeps_initial_options_only() {
        let mut programmatic = app("app2", 200.0);
        programmatic["info"] = json!({
            "manifestUrl": "https://example.com/app1.json",
            "manifest": { "startup_app": { "uuid": "app1" } },
            "initialOptions": { "uuid": "app2", "url": "https://example.com/app2.html" },
            "parentUuid": "app1",
        });
        let (desktop, host) = setup(json!({ "apps": [app("app1", 0.0), programmatic] })).await;

        let workspace = snapshot(&desktop, &host).await;
        let app2 = workspace.app("app2").unwrap();
        assert_eq!(app2.info.manifest_url, None);
        assert_eq!(app2.info.manifest, None);
        assert_eq!(app2.info.parent_uuid.as_deref(), Some("app1"));
        assert!(app2.info.initial_options.is_some());
    }

    #[test(tokio::test)]
    async fn tabbed_windows_are_marked() {
        let (desktop, host) = setup(json!({
            "apps": [app("app1", 0.0), app("app2", 200.0), app("app3", 400.0)],
            "tabGroups": [{ "tabs": ids(&[main("app1"), main("app2")]) }],
        }))
        .await;

        let workspace = snapshot(&desktop, &host).await;
        assert_eq!(workspace.tab_groups.len(), 1);
        assert_eq!(workspace.tab_groups[0].tabs, vec![main("app1"), main("app2")]);
        let tabbed: Vec<bool> = workspace.apps.iter().map(|a| a.main_window.is_tabbed).collect();
        assert_eq!(tabbed, vec![true, true, false]);
        assert_eq!(
            workspace.apps[1].main_window.bounds,
            Rect::new(0.0, 60.0, 200.0, 140.0)
        );
    }

    #[test(tokio::test)]
    async fn removed_active_tab_is_replaced_by_first_remaining() {
        let (desktop, host) = setup(json!({
            "apps": [app("w1", 0.0), app("w2", 200.0), app("w3", 400.0)],
            "tabGroups": [{ "tabs": ids(&[main("w1"), main("w2"), main("w3")]), "active": main("w2") }],
        }))
        .await;
        desktop.deregister(&main("w2")).await;

        let workspace = snapshot(&desktop, &host).await;
        assert_eq!(workspace.tab_groups[0].tabs, vec![main("w1"), main("w3")]);
        assert_eq!(workspace.tab_groups[0].group_info.active, main("w1"));
    }

    #[test(tokio::test)]
    async fn single_survivor_gets_untabbed_geometry() {
        let mut app2 = app("app2", 400.0);
        app2["childWindows"] = json!([window("tab", 400.0)]);
        let (desktop, host) = setup(json!({
            "apps": [
                {
                    "uuid": "app1",
                    "info": { "manifestUrl": "https://example.com/app1.json" },
                    "mainWindow": { "name": "app1", "bounds": bounds(100.0, 100.0, 400.0, 300.0) },
                },
                app2,
            ],
            "tabGroups": [{ "tabs": ids(&[main("app1"), WindowIdentity::new("app2", "tab")]) }],
        }))
        .await;
        // The tab stays registered, but its application's main window does not.
        desktop.deregister(&main("app2")).await;

        let workspace = snapshot(&desktop, &host).await;
        assert!(workspace.tab_groups.is_empty());
        assert_eq!(uuids(&workspace), vec!["app1"]);
        let survivor = &workspace.apps[0].main_window;
        assert!(!survivor.is_tabbed);
        assert_eq!(survivor.bounds, Rect::new(100.0, 100.0, 400.0, 300.0));
    }

    #[test(tokio::test)]
    async fn broadcasts_workspace_generated() {
        let (desktop, host) = setup(json!({ "apps": [app("app1", 0.0)] })).await;
        let mut rx = desktop.events().subscribe();

        let workspace = snapshot(&desktop, &host).await;
        let (_, event) = rx.try_recv().unwrap();
        assert_eq!(event, BroadcastEvent::WorkspaceGenerated { workspace });
    }
}

mod generate {
    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;

    #[test(tokio::test)]
    async fn collects_custom_data_from_connected_clients() {
        let (desktop, host) = setup(json!({
            "apps": [app("app1", 0.0), app("app2", 200.0), app("app3", 400.0), app("app4", 600.0)],
            "clients": [
                { "uuid": "app1", "customData": { "layout": "grid" } },
                { "uuid": "app2", "behavior": "hang" },
                { "uuid": "app3", "behavior": "fail" },
            ],
        }))
        .await;

        let workspace = SnapshotBuilder::new(&desktop, &host, &host, &host).generate_workspace().await;
        let apps = &workspace.apps;
        assert_eq!(uuids(&workspace), vec!["app1", "app2", "app3", "app4"]);

        assert_eq!(apps[0].custom_data, Some(json!({ "layout": "grid" })));
        assert_eq!(apps[1].custom_data, Some(Value::Null));
        assert_eq!(apps[2].custom_data, Some(Value::Null));
        assert_eq!(apps[3].custom_data, None);

        let confirmed: Vec<bool> = apps.iter().map(|a| a.confirmed).collect();
        assert_eq!(confirmed, vec![true, true, true, false]);

        let topics: Vec<String> = host.requests().into_iter().map(|(_, topic)| topic).collect();
        assert_eq!(topics, vec![GENERATE_WORKSPACE_TOPIC; 3]);
    }

    #[test(tokio::test)]
    async fn custom_data_serializes_as_null() {
        let (desktop, host) = setup(json!({
            "apps": [app("app1", 0.0)],
            "clients": [{ "uuid": "app1" }],
        }))
        .await;

        let workspace = SnapshotBuilder::new(&desktop, &host, &host, &host).generate_workspace().await;
        let json = serde_json::to_value(&workspace).unwrap();
        assert_eq!(json["apps"][0]["customData"], Value::Null);
        assert_eq!(json["apps"][0]["confirmed"], true);
    }

    #[test(tokio::test)]
    async fn timed_out_custom_data_survives_reload() {
        let (desktop, host) = setup(json!({
            "apps": [app("app1", 0.0), app("app2", 200.0)],
            "clients": [{ "uuid": "app1", "behavior": "hang" }],
        }))
        .await;

        let workspace = SnapshotBuilder::new(&desktop, &host, &host, &host).generate_workspace().await;
        assert_eq!(workspace.apps[0].custom_data, Some(Value::Null));

        let reloaded = Workspace::from_json(&workspace.to_json_pretty().unwrap()).unwrap();
        assert_eq!(reloaded.apps[0].custom_data, Some(Value::Null));
        assert_eq!(reloaded.apps[1].custom_data, None);
        assert_eq!(reloaded, workspace);
    }
}

mod regroup {
    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;

    fn fixture(with_groups: bool) -> Value {
        let mut fixture = json!({
            "apps": [
                app("app1", 0.0),
                app("app2", 200.0),
                app("app3", 400.0),
                app("app4", 600.0),
                app("app5", 600.0),
                app("app6", 800.0),
            ],
        });
        if with_groups {
            fixture["windowGroups"] = json!([
                ids(&[main("app1"), main("app2")]),
                ids(&[main("app3"), main("app4")]),
            ]);
            fixture["tabGroups"] = json!([{ "tabs": ids(&[main("app4"), main("app5")]) }]);
        }
        fixture
    }

    async fn captured() -> (Workspace, Vec<Vec<WindowIdentity>>) {
        let (desktop, host) = setup(fixture(true)).await;
        (snapshot(&desktop, &host).await, desktop.snap_groups())
    }

    #[test(tokio::test)]
    async fn restores_captured_partition() {
        let (workspace, partition) = captured().await;
        assert_eq!(partition, vec![
            vec![main("app1"), main("app2")],
            vec![main("app3"), main("app4"), main("app5")],
            vec![main("app6")],
        ]);

        let (fresh, _) = setup(fixture(false)).await;
        let report = regroup_workspace(&fresh, &workspace).await.unwrap();

        assert_eq!(report.tab_groups, 1);
        assert_eq!(fresh.snap_groups(), partition);
        assert_eq!(fresh.get_tabs(&main("app5")), Some(vec![main("app4"), main("app5")]));
    }

    #[test(tokio::test)]
    async fn regrouping_twice_matches_once() {
        let (workspace, _) = captured().await;
        let (fresh, _) = setup(fixture(false)).await;

        regroup_workspace(&fresh, &workspace).await.unwrap();
        let once = fresh.snap_groups();
        let tabs_once = fresh.tab_groups();

        let again = regroup_workspace(&fresh, &workspace).await.unwrap();
        assert_eq!(again.merges, 0);
        assert_eq!(fresh.snap_groups(), once);
        assert_eq!(fresh.tab_groups(), tabs_once);
    }

    #[test(tokio::test)]
    async fn incompatible_schema_changes_nothing() {
        let (mut workspace, _) = captured().await;
        workspace.schema_version = "2.0.0".into();
        let (fresh, _) = setup(fixture(false)).await;
        let before = fresh.snap_groups();

        let err = regroup_workspace(&fresh, &workspace).await.unwrap_err();
        assert!(matches!(err, WorkspaceError::IncompatibleSchema { .. }), "{err}");
        assert_eq!(fresh.snap_groups(), before);
        assert!(fresh.tab_groups().is_empty());
    }

    #[test(tokio::test)]
    async fn missing_windows_are_skipped() {
        let (workspace, _) = captured().await;
        let mut fixture = fixture(false);
        fixture["apps"][1]["mainWindow"]["registered"] = json!(false);
        let (fresh, _) = setup(fixture).await;

        let report = regroup_workspace(&fresh, &workspace).await.unwrap();
        assert!(report.skipped > 0);
        assert!(fresh.group_members(&main("app1")).is_empty());
        assert_eq!(fresh.group_members(&main("app3")), vec![main("app4"), main("app5")]);
    }

    #[test(tokio::test)]
    async fn disabled_docking_keeps_window_alone() {
        let (workspace, _) = captured().await;
        let mut config = config();
        config.scopes.push(ScopeRule {
            uuid: "app2".into(),
            name: None,
            features: FeatureOverrides { dock: Some(false) },
        });
        let (fresh, _) = setup_with(config, fixture(false)).await;

        regroup_workspace(&fresh, &workspace).await.unwrap();
        assert!(fresh.group_members(&main("app2")).is_empty());
        assert_eq!(fresh.group_members(&main("app3")).len(), 2);
    }

    #[test(tokio::test)]
    async fn snapshot_after_restore_matches_original() {
        let (workspace, _) = captured().await;
        let (fresh, host) = setup(fixture(false)).await;
        regroup_workspace(&fresh, &workspace).await.unwrap();

        let restored = snapshot(&fresh, &host).await;
        assert_eq!(restored.tab_groups, workspace.tab_groups);
        let tabbed: Vec<bool> = restored.apps.iter().map(|a| a.main_window.is_tabbed).collect();
        assert_eq!(tabbed, vec![false, false, false, true, true, false]);
    }
}
