//! End-to-end permission generation tests
//!
//! Runs the generator against in-memory stores holding the `qwc_demo`
//! resources and checks the merged document:
//!
//! 1. Open by default: everything is public without any grant
//! 2. Restricted layer and attribute
//! 3. Restricted feature info service and feature info layer
//! 4. Dataset CRUD flags and dataset attributes
//! 5. Wildcard layer, attribute and dataset grants
//! 6. Closed by default, with and without selected grants
//! 7. Closed by default with inherited info permissions
//! 8. Merge idempotence and deterministic output
//! 9. Fatal store and resource graph errors

use assert_matches::assert_matches;
use permgen_core::{
    ConfigurationError, GrantSnapshot, MemoryStore, PermGenError, StoreError,
};
use permgen_engine::{
    merge_fragment, resolve_role, Catalog, DatasetPermission, GeneratorConfig, GenerationRun,
    LayerNode, LogLevel, MapDatasets, MergeContext, PermissionGenerator, PrintTemplate,
    ResolveContext, RolePermissions, WfsCapability, WfsLayer, WmsCapability, WmsLayerPermission,
};

const DEMO_ATTRIBUTES: &[&str] = &["id", "Name", "Description"];

/// Catalog and generator settings shared by one test.
struct TestFixture {
    /// Candidate resources of the `qwc_demo` map
    catalog: Catalog,
    /// Generator settings
    config: GeneratorConfig,
}

impl TestFixture {
    fn new() -> Self {
        init_tracing();
        Self {
            catalog: demo_catalog(),
            config: GeneratorConfig::default(),
        }
    }

    fn default_restrict(mut self) -> Self {
        self.config = self.config.with_default_allow(false);
        self
    }

    fn inherit_info_permissions(mut self) -> Self {
        self.config = self.config.with_inherit_info_permissions(true);
        self
    }

    fn generator(&self) -> PermissionGenerator {
        PermissionGenerator::new(self.config.clone(), self.catalog.clone())
    }

    /// Run the generator and expect success.
    fn run(&self, store: &MemoryStore) -> GenerationRun {
        let run = self.generator().run(store).unwrap();
        assert_eq!(store.open_sessions(), 0);
        run
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn demo_catalog() -> Catalog {
    Catalog::new()
        .with_wms(WmsCapability {
            name: "qwc_demo".into(),
            root_layer: LayerNode::group(
                "qwc_demo",
                vec![
                    LayerNode::group(
                        "edit_demo",
                        vec![
                            LayerNode::leaf("edit_points", DEMO_ATTRIBUTES),
                            LayerNode::leaf("edit_lines", DEMO_ATTRIBUTES),
                            LayerNode::leaf("edit_polygons", DEMO_ATTRIBUTES),
                        ],
                    ),
                    LayerNode::leaf("countries", &["name", "pop_est"]),
                ],
            ),
            internal_print_layers: vec!["bluemarble_bg".into()],
            print_templates: vec![PrintTemplate::new("A4 Landscape")],
        })
        .with_wfs(WfsCapability {
            name: "qwc_demo".into(),
            wfs_layers: vec![
                WfsLayer::new("edit_points", DEMO_ATTRIBUTES),
                WfsLayer::new("edit_lines", DEMO_ATTRIBUTES),
            ],
        })
        .with_datasets(
            MapDatasets::new("qwc_demo")
                .with_dataset("edit_points", &["id", "name", "description"])
                .with_dataset("edit_lines", &["id", "name", "description"])
                .with_dataset("edit_polygons", &["id", "name", "description"]),
        )
        .with_background_layer("bluemarble")
        .with_mapinfo_query("parcels")
}

fn store() -> MemoryStore {
    MemoryStore::default()
        .with_role("admin")
        .with_user("admin", &[], &["admin"])
}

fn wms_layer<'a>(
    permissions: &'a RolePermissions,
    service: &str,
    layer: &str,
) -> Option<&'a WmsLayerPermission> {
    permissions
        .wms_services
        .iter()
        .find(|s| s.name == service)?
        .layers
        .iter()
        .find(|l| l.name == layer)
}

fn attributes(layer: &WmsLayerPermission) -> Vec<&str> {
    layer
        .attributes
        .iter()
        .flatten()
        .map(String::as_str)
        .collect()
}

fn dataset<'a>(permissions: &'a RolePermissions, name: &str) -> Option<&'a DatasetPermission> {
    permissions.data_datasets.iter().find(|d| d.name == name)
}

#[test]
fn test_public_permissions_without_grants() {
    let fixture = TestFixture::new();
    let run = fixture.run(&store());
    let public = run.document.role("public").unwrap();

    for name in ["edit_points", "edit_lines", "edit_polygons"] {
        let layer = wms_layer(public, "qwc_demo", name).unwrap();
        assert_eq!(layer.queryable, Some(true));
        assert_eq!(layer.info_template, Some(true));
        assert!(attributes(layer).contains(&"Name"));
        assert!(attributes(layer).len() > 1);
    }
    assert_eq!(public.wfs_services[0].layers.len(), 2);
    assert_eq!(public.background_layers, vec!["bluemarble"]);
    assert_eq!(public.print_templates, vec!["A4 Landscape"]);
    assert_eq!(public.mapinfo_query, vec!["parcels"]);

    // no datasets without data grants
    assert!(public.data_datasets.is_empty());

    // nothing on top of public for admin
    let admin = run.document.role("admin").unwrap();
    assert!(admin.wms_services.is_empty());
    assert!(admin.wfs_services.is_empty());
    assert!(admin.background_layers.is_empty());

    assert!(run.report.conflicts.is_empty());
    assert!(run.publishable());
}

#[test]
fn test_restricted_layer_and_attribute() {
    let fixture = TestFixture::new();
    let store = store()
        .with_resource(1, "map", "qwc_demo", None)
        .with_resource(2, "layer", "edit_points", Some(1))
        .with_resource(3, "layer", "edit_lines", Some(1))
        .with_resource(4, "attribute", "Name", Some(3))
        .with_grant(1, "public", 1, 0, false)
        .with_grant(2, "admin", 2, 0, false)
        .with_grant(3, "admin", 4, 0, false);
    let run = fixture.run(&store);

    let public = run.document.role("public").unwrap();
    assert!(wms_layer(public, "qwc_demo", "edit_points").is_none());

    let edit_lines = wms_layer(public, "qwc_demo", "edit_lines").unwrap();
    assert!(edit_lines.is_queryable());
    assert!(!attributes(edit_lines).contains(&"Name"));
    assert!(attributes(edit_lines).len() > 1);

    let edit_polygons = wms_layer(public, "qwc_demo", "edit_polygons").unwrap();
    assert!(edit_polygons.is_queryable());
    assert!(attributes(edit_polygons).contains(&"Name"));

    // restricted layer and attribute are added for admin only
    let admin = run.document.role("admin").unwrap();
    let edit_points = wms_layer(admin, "qwc_demo", "edit_points").unwrap();
    assert_eq!(edit_points.queryable, Some(true));
    assert_eq!(edit_points.info_template, Some(true));
    assert_eq!(attributes(edit_points), DEMO_ATTRIBUTES);

    let edit_lines = wms_layer(admin, "qwc_demo", "edit_lines").unwrap();
    assert_eq!(attributes(edit_lines), vec!["Name"]);
    assert!(wms_layer(admin, "qwc_demo", "edit_polygons").is_none());

    // WFS follows the same layer and attribute grants
    let wfs = &public.wfs_services[0];
    let names: Vec<&str> = wfs.layers.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(names, vec!["edit_lines"]);
}

#[test]
fn test_restricted_info_service() {
    let fixture = TestFixture::new();
    let store = store()
        .with_resource(1, "feature_info_service", "qwc_demo", None)
        .with_grant(1, "admin", 1, 0, false);
    let run = fixture.run(&store);

    let public = run.document.role("public").unwrap();
    let admin = run.document.role("admin").unwrap();
    for name in ["edit_points", "edit_lines", "edit_polygons"] {
        let layer = wms_layer(public, "qwc_demo", name).unwrap();
        assert_eq!(layer.queryable, Some(false));
        assert_eq!(layer.info_template, Some(false));

        let layer = wms_layer(admin, "qwc_demo", name).unwrap();
        assert_eq!(layer.queryable, Some(true));
        assert_eq!(layer.info_template, Some(true));
    }
    assert!(run.report.conflicts.is_empty());
}

#[test]
fn test_restricted_info_layer() {
    let fixture = TestFixture::new();
    let store = store()
        .with_resource(1, "feature_info_service", "qwc_demo", None)
        .with_resource(2, "feature_info_layer", "edit_points", Some(1))
        .with_grant(1, "admin", 2, 0, false);
    let run = fixture.run(&store);

    let public = run.document.role("public").unwrap();
    assert!(!wms_layer(public, "qwc_demo", "edit_points").unwrap().is_queryable());
    assert!(wms_layer(public, "qwc_demo", "edit_lines").unwrap().is_queryable());
    assert!(wms_layer(public, "qwc_demo", "edit_polygons").unwrap().is_queryable());

    let admin = run.document.role("admin").unwrap();
    let edit_points = wms_layer(admin, "qwc_demo", "edit_points").unwrap();
    assert_eq!(edit_points.queryable, Some(true));
    assert_eq!(edit_points.info_template, Some(true));
    assert!(wms_layer(admin, "qwc_demo", "edit_lines").is_none());
    assert!(wms_layer(admin, "qwc_demo", "edit_polygons").is_none());
}

#[test]
fn test_data_permissions() {
    let fixture = TestFixture::new();
    let store = store()
        .with_resource(1, "map", "qwc_demo", None)
        .with_resource(2, "data", "edit_points", Some(1))
        .with_resource(3, "data", "edit_lines", Some(1))
        .with_resource(4, "data", "edit_polygons", Some(1))
        .with_resource(5, "data_create", "edit_polygons", Some(1))
        .with_resource(6, "attribute", "description", Some(4))
        .with_grant(1, "public", 1, 0, false)
        .with_grant(2, "admin", 2, 0, true)
        .with_grant(3, "admin", 3, 0, false)
        .with_grant(4, "public", 4, 0, false)
        .with_grant(5, "admin", 5, 0, false)
        .with_grant(6, "admin", 6, 0, false);
    let run = fixture.run(&store);

    // map and layers stay public
    let public = run.document.role("public").unwrap();
    for name in ["edit_points", "edit_lines", "edit_polygons"] {
        assert!(wms_layer(public, "qwc_demo", name).is_some());
    }

    // public read-only access, restricted attribute hidden
    assert!(dataset(public, "qwc_demo.edit_points").is_none());
    let polygons = dataset(public, "qwc_demo.edit_polygons").unwrap();
    assert_eq!(polygons.writable, Some(false));
    assert_eq!(polygons.creatable, Some(false));
    assert_eq!(polygons.readable, Some(true));
    assert_eq!(polygons.updatable, Some(false));
    assert_eq!(polygons.deletable, Some(false));
    assert!(!polygons.attributes.contains(&"description".to_string()));

    let admin = run.document.role("admin").unwrap();

    // writable grant
    let points = dataset(admin, "qwc_demo.edit_points").unwrap();
    assert!(points.is_writable());
    assert!(points.is_creatable());
    assert!(points.is_readable());
    assert!(points.is_updatable());
    assert!(points.is_deletable());

    // read-only grant
    let lines = dataset(admin, "qwc_demo.edit_lines").unwrap();
    assert_eq!(lines.writable, Some(false));
    assert_eq!(lines.creatable, Some(false));
    assert_eq!(lines.readable, Some(true));
    assert_eq!(lines.updatable, Some(false));
    assert_eq!(lines.deletable, Some(false));

    // create grant on top of public read access
    let polygons = dataset(admin, "qwc_demo.edit_polygons").unwrap();
    assert!(polygons.is_creatable());
    assert!(polygons.is_readable());
    assert!(!polygons.is_updatable());
    assert!(!polygons.is_deletable());
    assert!(!polygons.is_writable());
    assert_eq!(polygons.attributes, vec!["description"]);
}

#[test]
fn test_force_readonly_datasets() {
    let fixture = TestFixture {
        config: GeneratorConfig::default().with_force_readonly_datasets(true),
        ..TestFixture::new()
    };
    let store = store()
        .with_resource(1, "map", "qwc_demo", None)
        .with_resource(2, "data", "edit_points", Some(1))
        .with_resource(3, "data_delete", "edit_points", Some(1))
        .with_grant(1, "admin", 2, 0, true)
        .with_grant(2, "admin", 3, 0, false);
    let run = fixture.run(&store);

    let points = dataset(run.document.role("admin").unwrap(), "qwc_demo.edit_points").unwrap();
    assert_eq!(points.writable, Some(false));
    assert_eq!(points.readable, Some(true));
    assert_eq!(points.deletable, Some(false));
}

#[test]
fn test_wildcard_grants() {
    let fixture = TestFixture::new();
    let store = store()
        .with_role("editor")
        .with_resource(1, "map", "qwc_demo", None)
        .with_resource(2, "layer", "*", Some(1))
        .with_resource(3, "layer", "edit_points", Some(1))
        .with_resource(4, "layer", "edit_lines", Some(1))
        .with_resource(5, "attribute", "*", Some(4))
        .with_resource(6, "attribute", "Name", Some(4))
        .with_resource(7, "data", "*", Some(1))
        .with_resource(8, "data", "edit_points", Some(1))
        .with_grant(1, "admin", 2, 0, false)
        .with_grant(2, "admin", 3, 0, false)
        .with_grant(3, "admin", 5, 0, false)
        .with_grant(4, "editor", 6, 0, false)
        .with_grant(5, "admin", 7, 0, true)
        .with_grant(6, "public", 8, 0, false);
    let run = fixture.run(&store);

    // wildcard grants leave the named siblings public
    let public = run.document.role("public").unwrap();
    assert!(wms_layer(public, "qwc_demo", "edit_points").is_none());
    for name in ["edit_polygons", "countries"] {
        assert!(wms_layer(public, "qwc_demo", name).is_some());
    }
    let edit_lines = wms_layer(public, "qwc_demo", "edit_lines").unwrap();
    assert_eq!(attributes(edit_lines), vec!["id", "Description"]);
    let names: Vec<&str> = public.data_datasets.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["qwc_demo.edit_points"]);

    let admin = run.document.role("admin").unwrap();
    let edit_points = wms_layer(admin, "qwc_demo", "edit_points").unwrap();
    assert_eq!(attributes(edit_points), DEMO_ATTRIBUTES);
    let edit_lines = wms_layer(admin, "qwc_demo", "edit_lines").unwrap();
    assert_eq!(attributes(edit_lines), DEMO_ATTRIBUTES);
    for name in ["edit_lines", "edit_points", "edit_polygons"] {
        let entry = dataset(admin, &format!("qwc_demo.{}", name)).unwrap();
        assert!(entry.is_writable());
        assert!(entry.is_readable());
    }

    // exact grants keep working next to wildcards
    let editor = run.document.role("editor").unwrap();
    let edit_lines = wms_layer(editor, "qwc_demo", "edit_lines").unwrap();
    assert_eq!(attributes(edit_lines), vec!["Name"]);
    assert!(editor.data_datasets.is_empty());
}

#[test]
fn test_default_restrict_without_grants() {
    let fixture = TestFixture::new().default_restrict();
    let run = fixture.run(&store());

    for role in ["public", "admin"] {
        let permissions = run.document.role(role).unwrap();
        assert!(permissions.wms_services.is_empty(), "{}", role);
        assert!(permissions.wfs_services.is_empty(), "{}", role);
        assert!(permissions.data_datasets.is_empty(), "{}", role);
        assert!(permissions.print_templates.is_empty(), "{}", role);
        assert!(permissions.mapinfo_query.is_empty(), "{}", role);
    }
}

#[test]
fn test_default_restrict_selected_grants() {
    let fixture = TestFixture::new().default_restrict();
    let store = store()
        .with_resource(1, "map", "qwc_demo", None)
        .with_resource(2, "layer", "qwc_demo", Some(1))
        .with_resource(3, "layer", "edit_demo", Some(1))
        .with_resource(4, "layer", "edit_points", Some(1))
        .with_resource(5, "layer", "edit_lines", Some(1))
        .with_resource(6, "attribute", "Name", Some(5))
        .with_grant(1, "public", 1, 0, false)
        .with_grant(2, "public", 2, 0, false)
        .with_grant(3, "public", 3, 0, false)
        .with_grant(4, "admin", 4, 0, false)
        .with_grant(5, "public", 5, 0, false)
        .with_grant(6, "admin", 6, 0, false);
    let run = fixture.run(&store);

    // map and edit_lines for public, not queryable, without Name
    let public = run.document.role("public").unwrap();
    let edit_lines = wms_layer(public, "qwc_demo", "edit_lines").unwrap();
    assert_eq!(edit_lines.queryable, Some(false));
    assert_eq!(edit_lines.info_template, Some(false));
    assert!(!attributes(edit_lines).contains(&"Name"));
    assert!(wms_layer(public, "qwc_demo", "edit_points").is_none());
    assert!(wms_layer(public, "qwc_demo", "countries").is_none());

    // edit_points with all attributes for admin, and Name of edit_lines
    let admin = run.document.role("admin").unwrap();
    let edit_points = wms_layer(admin, "qwc_demo", "edit_points").unwrap();
    assert_eq!(edit_points.queryable, Some(false));
    assert_eq!(edit_points.info_template, Some(false));
    assert!(attributes(edit_points).len() > 1);

    let edit_lines = wms_layer(admin, "qwc_demo", "edit_lines").unwrap();
    assert!(attributes(edit_lines).contains(&"Name"));
}

#[test]
fn test_default_restrict_inherit_info_permissions() {
    let fixture = TestFixture::new()
        .default_restrict()
        .inherit_info_permissions();
    let store = store()
        .with_resource(1, "map", "qwc_demo", None)
        .with_resource(2, "layer", "qwc_demo", Some(1))
        .with_resource(3, "layer", "edit_demo", Some(1))
        .with_resource(4, "layer", "edit_points", Some(1))
        .with_resource(5, "layer", "edit_lines", Some(1))
        .with_resource(6, "attribute", "Name", Some(5))
        .with_resource(7, "layer", "edit_polygons", Some(1))
        .with_resource(8, "feature_info_service", "qwc_demo", None)
        .with_resource(9, "feature_info_layer", "edit_polygons", Some(8))
        .with_grant(1, "public", 1, 0, false)
        .with_grant(2, "public", 2, 0, false)
        .with_grant(3, "public", 3, 0, false)
        .with_grant(4, "admin", 4, 0, false)
        .with_grant(5, "public", 5, 0, false)
        .with_grant(6, "admin", 6, 0, false)
        .with_grant(7, "public", 7, 0, false)
        .with_grant(8, "admin", 9, 0, false);
    let run = fixture.run(&store);

    // edit_lines queryable through its layer grant, edit_polygons not
    let public = run.document.role("public").unwrap();
    let edit_lines = wms_layer(public, "qwc_demo", "edit_lines").unwrap();
    assert_eq!(edit_lines.queryable, Some(true));
    assert_eq!(edit_lines.info_template, Some(true));
    assert!(!attributes(edit_lines).contains(&"Name"));

    let edit_polygons = wms_layer(public, "qwc_demo", "edit_polygons").unwrap();
    assert_eq!(edit_polygons.queryable, Some(false));
    assert_eq!(edit_polygons.info_template, Some(false));

    let admin = run.document.role("admin").unwrap();
    let edit_points = wms_layer(admin, "qwc_demo", "edit_points").unwrap();
    assert_eq!(edit_points.queryable, Some(true));
    assert_eq!(edit_points.info_template, Some(true));
    assert!(attributes(edit_points).len() > 1);

    let edit_lines = wms_layer(admin, "qwc_demo", "edit_lines").unwrap();
    assert!(attributes(edit_lines).contains(&"Name"));

    let edit_polygons = wms_layer(admin, "qwc_demo", "edit_polygons").unwrap();
    assert_eq!(edit_polygons.queryable, Some(true));
    assert_eq!(edit_polygons.info_template, Some(true));
}

#[test]
fn test_merging_fragments_twice_changes_nothing() {
    let fixture = TestFixture::new();
    let store = store()
        .with_resource(1, "map", "qwc_demo", None)
        .with_resource(2, "layer", "edit_lines", Some(1))
        .with_resource(3, "attribute", "Name", Some(2))
        .with_resource(4, "data", "edit_lines", Some(1))
        .with_grant(1, "admin", 3, 0, false)
        .with_grant(2, "admin", 4, 0, true);
    let snapshot = GrantSnapshot::capture(&store).unwrap();

    for role in ["public", "admin"] {
        let ctx = ResolveContext::new(&snapshot, &fixture.config, &fixture.catalog, role);
        let mut merge = MergeContext::new(role);

        let mut once = RolePermissions::default();
        for fragment in resolve_role(&ctx) {
            merge_fragment(&mut once, fragment, &mut merge);
        }

        let mut twice = once.clone();
        for fragment in resolve_role(&ctx) {
            merge_fragment(&mut twice, fragment, &mut merge);
        }

        assert_eq!(once, twice, "{}", role);
        assert!(merge.conflicts().is_empty(), "{}", role);
    }
}

#[test]
fn test_output_is_deterministic() {
    let fixture = TestFixture::new();
    let store = store()
        .with_user("bob", &["editors"], &[])
        .with_user("alice", &[], &["admin"])
        .with_group("editors", &["admin"])
        .with_resource(1, "map", "qwc_demo", None)
        .with_resource(2, "layer", "edit_points", Some(1))
        .with_resource(3, "viewer_task", "measure", None)
        .with_resource(4, "viewer_task", "identify", None)
        .with_grant(1, "admin", 2, 0, false)
        .with_grant(2, "admin", 3, 0, false)
        .with_grant(3, "admin", 4, 0, false);

    let first = fixture.run(&store);
    let second = fixture.run(&store);

    assert_eq!(
        first.document.to_json_pretty().unwrap(),
        second.document.to_json_pretty().unwrap()
    );
    assert_eq!(first.report.fingerprint, second.report.fingerprint);
    assert_ne!(first.report.run_id, second.report.run_id);

    let users: Vec<&str> = first.document.users.iter().map(|u| u.name.as_str()).collect();
    assert_eq!(users, vec!["admin", "alice", "bob"]);
    assert_eq!(
        first.document.role("admin").unwrap().viewer_tasks,
        vec!["identify", "measure"]
    );
}

#[test]
fn test_unknown_resource_type_is_skipped() {
    let fixture = TestFixture::new();
    let store = store()
        .with_resource(1, "map", "qwc_demo", None)
        .with_resource(2, "legacy_widget", "clock", None)
        .with_grant(1, "admin", 2, 0, false);
    let run = fixture.run(&store);

    assert_eq!(run.report.skipped.len(), 2);
    assert_eq!(run.report.entries(LogLevel::Warning).count(), 2);
    assert!(run.publishable());
}

#[test]
fn test_store_unavailable_aborts_run() {
    let fixture = TestFixture::new();
    let store = MemoryStore::unavailable("connection refused");

    let err = fixture.generator().run(&store).unwrap_err();
    assert_matches!(err, PermGenError::Store(StoreError::Unavailable(_)));
    assert!(err.is_transient());
    assert_eq!(store.sessions_opened(), 0);
}

#[test]
fn test_failing_query_releases_session() {
    let fixture = TestFixture::new();
    let store = store().with_failing_queries("relation \"resources\" does not exist");

    assert_matches!(
        fixture.generator().run(&store),
        Err(PermGenError::Store(StoreError::Query(_)))
    );
    assert_eq!(store.sessions_opened(), 1);
    assert_eq!(store.open_sessions(), 0);
}

#[test]
fn test_malformed_resource_graph_aborts_run() {
    let fixture = TestFixture::new();

    let dangling = store()
        .with_resource(1, "map", "qwc_demo", None)
        .with_resource(2, "layer", "edit_points", Some(99));
    assert_matches!(
        fixture.generator().run(&dangling),
        Err(PermGenError::Configuration(ConfigurationError::DanglingParent {
            id: 2,
            parent_id: 99
        }))
    );
    assert_eq!(dangling.open_sessions(), 0);

    let missing = store()
        .with_resource(1, "map", "qwc_demo", None)
        .with_grant(7, "admin", 42, 0, false);
    let err = fixture.generator().run(&missing).unwrap_err();
    assert_matches!(
        err,
        PermGenError::Configuration(ConfigurationError::MissingResource {
            grant_id: 7,
            resource_id: 42
        })
    );
    assert!(!err.is_transient());
}
