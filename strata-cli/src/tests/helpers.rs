//! Test helpers for composing build datasets and layered overrides.

use super::*;
use base64::{Engine as _, engine::general_purpose};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use tempfile::TempDir;

#[derive(Debug, Clone, Default)]
pub(super) struct LayerOverrides {
    pub(super) osm_pbf: Option<Utf8PathBuf>,
    pub(super) output_dir: Option<Utf8PathBuf>,
}

#[derive(Debug)]
pub(super) struct DatasetFiles {
    _dir: TempDir,
    cli_osm: Utf8PathBuf,
    cli_output: Utf8PathBuf,
    config_osm: Utf8PathBuf,
    config_output: Utf8PathBuf,
    env_output: Utf8PathBuf,
}

impl DatasetFiles {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = utf8_path(&dir);
        let cli_osm = root.join("cli.osm.pbf");
        let config_osm = root.join("config.osm.pbf");
        for path in [&cli_osm, &config_osm] {
            fs::write(path, b"dataset contents").expect("write dataset file");
        }
        Self {
            cli_output: root.join("cli-layers"),
            config_output: root.join("config-layers"),
            env_output: root.join("env-layers"),
            _dir: dir,
            cli_osm,
            config_osm,
        }
    }

    pub(super) fn osm(&self) -> &Utf8Path {
        &self.cli_osm
    }

    pub(super) fn output(&self) -> &Utf8Path {
        &self.cli_output
    }

    pub(super) fn config_osm(&self) -> &Utf8Path {
        &self.config_osm
    }

    pub(super) fn config_output(&self) -> &Utf8Path {
        &self.config_output
    }

    pub(super) fn env_output(&self) -> &Utf8Path {
        &self.env_output
    }
}

pub(super) fn utf8_path(dir: &TempDir) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 temp dir")
}

/// Resolve arguments without consulting the process environment.
pub(super) fn resolve_build_config(args: BuildArgs) -> Result<BuildConfig, CliError> {
    let config = BuildConfig::try_from(args)?;
    config.validate_sources()?;
    Ok(config)
}

pub(super) fn merge_layers(
    mut cli_args: BuildArgs,
    file_layer: Option<LayerOverrides>,
    env_layer: Option<LayerOverrides>,
) -> Result<BuildConfig, CliError> {
    merge_field(
        &mut cli_args.osm_pbf,
        extract_field(env_layer.as_ref(), |layer| &layer.osm_pbf),
        extract_field(file_layer.as_ref(), |layer| &layer.osm_pbf),
    );
    merge_field(
        &mut cli_args.output_dir,
        extract_field(env_layer.as_ref(), |layer| &layer.output_dir),
        extract_field(file_layer.as_ref(), |layer| &layer.output_dir),
    );
    resolve_build_config(cli_args)
}

fn merge_field<T>(target: &mut Option<T>, env_value: Option<T>, file_value: Option<T>) {
    if target.is_none()
        && let Some(value) = env_value.or(file_value)
    {
        *target = Some(value);
    }
}

fn extract_field<T: Clone>(
    layer: Option<&LayerOverrides>,
    accessor: fn(&LayerOverrides) -> &Option<T>,
) -> Option<T> {
    layer.and_then(|entry| accessor(entry).clone())
}

/// Decode the shared sample extract into `workspace`.
pub(super) fn decode_pbf_fixture(workspace: &Utf8Path, stem: &str) -> Utf8PathBuf {
    let encoded_path = Utf8PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../strata-data/tests/fixtures")
        .join(format!("{stem}.osm.pbf.b64"));
    let encoded = fs::read_to_string(&encoded_path)
        .unwrap_or_else(|err| panic!("failed to read fixture {encoded_path}: {err}"));
    let cleaned: String = encoded
        .chars()
        .filter(|ch| !ch.is_ascii_whitespace())
        .collect();
    let decoded = general_purpose::STANDARD
        .decode(cleaned.as_bytes())
        .unwrap_or_else(|err| panic!("failed to decode fixture {encoded_path}: {err}"));
    let target = workspace.join(format!("{stem}.osm.pbf"));
    fs::write(&target, decoded).expect("write decoded fixture");
    target
}
