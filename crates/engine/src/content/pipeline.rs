use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::AppPaths;

use super::compiler::compile_level_files;
use super::database::LevelDatabase;
use super::types::ContentError;

#[derive(Debug, Error)]
pub enum ContentPipelineError {
    #[error("failed to read level directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("no level files (*.xml) found in {path}")]
    NoLevelFiles { path: PathBuf },
    #[error(transparent)]
    Compile(#[from] ContentError),
}

/// Compiles every `*.xml` under the levels directory, in file-name order.
pub fn load_level_database(app_paths: &AppPaths) -> Result<LevelDatabase, ContentPipelineError> {
    let xml_files = collect_xml_files_sorted(&app_paths.levels_dir)?;
    if xml_files.is_empty() {
        return Err(ContentPipelineError::NoLevelFiles {
            path: app_paths.levels_dir.clone(),
        });
    }

    let levels = compile_level_files(&xml_files)?;
    let database = LevelDatabase::from_levels(levels);
    info!(
        levels_dir = %app_paths.levels_dir.display(),
        xml_file_count = xml_files.len(),
        level_count = database.len(),
        "level_database_loaded"
    );
    Ok(database)
}

fn collect_xml_files_sorted(dir: &Path) -> Result<Vec<PathBuf>, ContentPipelineError> {
    let read_dir_error = |source| ContentPipelineError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_dir_error)? {
        let path = entry.map_err(read_dir_error)?.path();
        let is_xml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"));
        if path.is_file() && is_xml {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
