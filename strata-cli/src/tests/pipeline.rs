//! Pipeline tests covering the build command flow end to end.

use super::helpers::{decode_pbf_fixture, utf8_path};
use super::*;
use rstest::rstest;
use std::fs;
use tempfile::TempDir;

fn config_for(workspace: &camino::Utf8Path, layers: Vec<LayerName>) -> BuildConfig {
    BuildConfig {
        osm_pbf: decode_pbf_fixture(workspace, "sample"),
        output_dir: workspace.join("layers"),
        layers,
        node_index: NodeIndexKind::Hash,
        options: LayerOptions::default(),
    }
}

#[rstest]
fn build_writes_every_layer_and_the_sidecar() {
    let working = TempDir::new().expect("temp dir");
    let workspace = utf8_path(&working);
    let config = config_for(&workspace, LayerName::ALL.to_vec());
    config.validate_sources().expect("fixture exists");

    let outcome = build(&config).expect("build should succeed");

    for name in LayerName::ALL {
        assert!(
            config.output_dir.join(name.file_name()).is_file(),
            "expected {name} output"
        );
    }
    assert_eq!(outcome.report.layers.len(), LayerName::ALL.len());
    assert_eq!(
        outcome
            .report
            .layer("addresses")
            .map(|layer| (layer.rows_written, layer.unresolved)),
        Some((3, 0))
    );
    assert_eq!(outcome.metadata_path, config.output_dir.join("metadata.json"));
    let sidecar = fs::read_to_string(&outcome.metadata_path).expect("read sidecar");
    assert!(sidecar.contains("\"seqno\": 4242"), "sidecar: {sidecar}");
    assert_eq!(outcome.stats.failed_areas, 0);
}

#[rstest]
fn build_only_writes_selected_layers() {
    let working = TempDir::new().expect("temp dir");
    let workspace = utf8_path(&working);
    let mut config = config_for(&workspace, vec![LayerName::Roads]);
    config.node_index = NodeIndexKind::Sorted;
    config.options.sink = SinkOptions::default()
        .with_row_group_size(NonZeroUsize::new(1).expect("non-zero"));

    let outcome = build(&config).expect("build should succeed");

    assert_eq!(
        outcome
            .report
            .layers
            .iter()
            .map(|layer| (layer.name.as_str(), layer.rows_written))
            .collect::<Vec<_>>(),
        vec![("roads", 2)]
    );
    assert!(!config.output_dir.join("buildings.parquet").exists());
    assert!(config.output_dir.join("metadata.json").is_file());
}

#[rstest]
fn build_reports_undecodable_input() {
    let working = TempDir::new().expect("temp dir");
    let workspace = utf8_path(&working);
    let mut config = config_for(&workspace, vec![LayerName::Places]);
    config.osm_pbf = decode_pbf_fixture(&workspace, "invalid");

    let err = build(&config).expect_err("invalid input should fail");
    assert!(matches!(err, CliError::Dispatch(_)), "unexpected error {err:?}");
    assert!(!config.output_dir.join("metadata.json").exists());
}
