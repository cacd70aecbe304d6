use std::{
    ffi::OsStr,
    fs::{read_dir, File},
    io::BufReader,
    path::{Path, PathBuf},
};

use typed_builder::TypedBuilder;

use crate::{
    error::{Error, Result},
    spec::Spec,
    trace::SPEC_TRACING_EVENT_TARGET,
};

/// The environment variable that restricts [`load_spec_dir`] to a single file name.
pub const TEST_FILE_ENV_VAR: &str = "TEST_FILE";

/// Options controlling which spec files [`load_spec_dir`] reads.
#[derive(Clone, Debug, Default, TypedBuilder)]
#[builder(field_defaults(default, setter(into)))]
#[non_exhaustive]
pub struct LoadOptions {
    /// File names to leave out.
    pub skipped_files: Vec<String>,

    /// If set, only the file with this name is loaded.
    #[builder(setter(strip_option))]
    pub only_file: Option<String>,
}

impl LoadOptions {
    /// Options with `only_file` taken from the `TEST_FILE` environment variable, if set.
    pub fn from_env() -> Self {
        Self {
            only_file: std::env::var(TEST_FILE_ENV_VAR).ok(),
            ..Default::default()
        }
    }

    fn should_load(&self, filename: &str) -> bool {
        if let Some(ref only_file) = self.only_file {
            if filename != only_file {
                return false;
            }
        }
        !self.skipped_files.iter().any(|skipped| skipped == filename)
    }
}

impl Spec {
    /// Reads a spec file in extended JSON format.
    ///
    /// Repeated keys in an `expectations` document each produce their own expectation.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;

        // Read straight into the typed spec rather than through an intermediate `Bson`, which
        // would collapse repeated keys. Embedded documents still go through bson's visitor, so
        // extended JSON values such as {"$numberLong": "1"} stay typed.
        let deserializer = &mut serde_json::Deserializer::from_reader(BufReader::new(file));
        let spec: Spec = serde_path_to_error::deserialize(&mut *deserializer).map_err(|e| {
            if e.inner().is_data() {
                Error::malformed_at(e)
            } else {
                Error::invalid_json(path, e)
            }
        })?;
        deserializer
            .end()
            .map_err(|e| Error::invalid_json(path, e))?;

        spec.trace_loaded();
        Ok(spec)
    }
}

/// Loads every `.json` spec file in `dir`, ordered by file name.
pub fn load_spec_dir(dir: impl AsRef<Path>, options: &LoadOptions) -> Result<Vec<(Spec, PathBuf)>> {
    let mut paths = Vec::new();
    for entry in read_dir(dir.as_ref())? {
        let path = entry?.path();
        let Some(filename) = path
            .file_name()
            .and_then(OsStr::to_str)
            .filter(|name| name.ends_with(".json"))
        else {
            continue;
        };

        if !options.should_load(filename) {
            tracing::warn!(
                target: SPEC_TRACING_EVENT_TARGET,
                file = filename,
                "Skipping spec file"
            );
            continue;
        }
        paths.push(path);
    }
    paths.sort();

    paths
        .into_iter()
        .map(|path| Ok((Spec::from_path(&path)?, path)))
        .collect()
}
