use crate::logging::AUDIT_TARGET;
use crate::metrics::Metrics;
use crate::models::{Dimension, HistoryEntry, Region, UpdaterConfig};
use crate::services::mapper::CoordinateMapper;
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur while copying a single region
#[derive(Error, Debug)]
pub enum CopyError {
    #[error("No region folder configured for dimension {0}")]
    MissingDimension(Dimension),

    #[error("Failed to copy \"{source_path}\" -> \"{destination_path}\": {source}")]
    Io {
        source_path: Utf8PathBuf,
        destination_path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// What happened to one region during a batch run
#[derive(Debug)]
pub struct RegionOutcome {
    pub region: Region,
    /// Relative paths that were copied
    pub copied: Vec<Utf8PathBuf>,
    pub errors: Vec<CopyError>,
}

impl RegionOutcome {
    /// A region succeeds only if it mapped to at least one file and every file copied
    pub fn succeeded(&self) -> bool {
        !self.copied.is_empty() && self.errors.is_empty()
    }
}

/// Copies region files from the source world into the destination world.
///
/// The caller must have stopped the server that owns the destination world
/// first; files are overwritten in place. There is no rollback: files copied
/// before a later failure stay copied.
#[derive(Debug, Clone)]
pub struct BatchApplier {
    mapper: CoordinateMapper,
    source_root: Utf8PathBuf,
    destination_root: Utf8PathBuf,
    metrics: Option<Arc<Metrics>>,
}

impl BatchApplier {
    pub fn new(
        mapper: CoordinateMapper,
        source_root: impl Into<Utf8PathBuf>,
        destination_root: impl Into<Utf8PathBuf>,
    ) -> Self {
        Self {
            mapper,
            source_root: source_root.into(),
            destination_root: destination_root.into(),
            metrics: None,
        }
    }

    pub fn from_config(config: &UpdaterConfig) -> Self {
        Self::new(
            CoordinateMapper::new(config.dimension_region_folder.clone()),
            config.source_world_directory.clone(),
            config.destination_world_directory.clone(),
        )
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn source_root(&self) -> &Utf8Path {
        &self.source_root
    }

    pub fn destination_root(&self) -> &Utf8Path {
        &self.destination_root
    }

    /// Copy every region in order and return one history entry per region.
    ///
    /// A failing region is logged and recorded, then the run moves on to the
    /// next one. The worklist itself is not touched here; see
    /// [`crate::state::WorklistManager::apply_pending`].
    pub fn apply_all(&self, regions: &[Region]) -> Vec<HistoryEntry> {
        regions
            .iter()
            .map(|region| {
                let outcome = self.apply_region(region);
                let success = outcome.succeeded();

                if success {
                    tracing::info!(target: AUDIT_TARGET, "  {}: succeeded", region);
                } else {
                    let reasons: Vec<String> =
                        outcome.errors.iter().map(ToString::to_string).collect();
                    tracing::info!(
                        target: AUDIT_TARGET,
                        "  {}: failed, {}",
                        region,
                        reasons.join("; ")
                    );
                }

                if let Some(metrics) = &self.metrics {
                    if success {
                        metrics.record_region_copied();
                    } else {
                        metrics.record_region_failed();
                    }
                }

                HistoryEntry::new(*region, success)
            })
            .collect()
    }

    /// Copy all files of one region. Every mapped path is attempted even if an
    /// earlier one failed.
    pub fn apply_region(&self, region: &Region) -> RegionOutcome {
        let paths = self.mapper.map_to_paths(region);
        let mut outcome = RegionOutcome {
            region: *region,
            copied: Vec::new(),
            errors: Vec::new(),
        };

        if paths.is_empty() {
            tracing::warn!("{} has no region folder mapping, skipping", region);
            outcome.errors.push(CopyError::MissingDimension(region.dim()));
            return outcome;
        }

        for relative in paths {
            match self.copy_file(&relative) {
                Ok(()) => outcome.copied.push(relative),
                Err(e) => {
                    tracing::error!("{}", e);
                    outcome.errors.push(e);
                }
            }
        }

        outcome
    }

    fn copy_file(&self, relative: &Utf8Path) -> Result<(), CopyError> {
        let source_path = self.source_root.join(relative);
        let destination_path = self.destination_root.join(relative);
        tracing::info!("- \"{}\" -> \"{}\"", source_path, destination_path);

        let result = destination_path
            .parent()
            .map_or(Ok(()), fs::create_dir_all)
            .and_then(|()| fs::copy(&source_path, &destination_path).map(|_| ()));

        result.map_err(|source| CopyError::Io {
            source_path,
            destination_path,
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FolderSpec;
    use indexmap::IndexMap;
    use tempfile::TempDir;

    struct Worlds {
        _dir: TempDir,
        source: Utf8PathBuf,
        destination: Utf8PathBuf,
    }

    fn worlds() -> Worlds {
        let dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        let source = root.join("source");
        let destination = root.join("destination");
        fs::create_dir_all(source.join("region")).unwrap();
        fs::create_dir_all(&destination).unwrap();
        Worlds {
            _dir: dir,
            source,
            destination,
        }
    }

    fn applier(worlds: &Worlds, folders: &[(&str, FolderSpec)]) -> BatchApplier {
        let folders: IndexMap<String, FolderSpec> = folders
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        BatchApplier::new(
            CoordinateMapper::new(folders),
            worlds.source.clone(),
            worlds.destination.clone(),
        )
    }

    #[test]
    fn test_copies_existing_region() {
        let worlds = worlds();
        fs::write(worlds.source.join("region/r.0.0.mca"), b"chunk data").unwrap();
        let applier = applier(&worlds, &[("0", FolderSpec::from("region"))]);

        let outcome = applier.apply_region(&Region::new(0, 0, Dimension::Overworld));

        assert!(outcome.succeeded());
        assert_eq!(
            fs::read(worlds.destination.join("region/r.0.0.mca")).unwrap(),
            b"chunk data"
        );
    }

    #[test]
    fn test_missing_source_fails() {
        let worlds = worlds();
        let applier = applier(&worlds, &[("0", FolderSpec::from("region"))]);

        let outcome = applier.apply_region(&Region::new(9, 9, Dimension::Overworld));

        assert!(!outcome.succeeded());
        assert!(matches!(outcome.errors[0], CopyError::Io { .. }));
    }

    #[test]
    fn test_unmapped_dimension_fails() {
        let worlds = worlds();
        let applier = applier(&worlds, &[("0", FolderSpec::from("region"))]);

        let outcome = applier.apply_region(&Region::new(0, 0, Dimension::Lower));

        assert!(!outcome.succeeded());
        assert!(matches!(
            outcome.errors[0],
            CopyError::MissingDimension(Dimension::Lower)
        ));
    }

    #[test]
    fn test_partial_fan_out_fails_but_keeps_copied_files() {
        let worlds = worlds();
        fs::write(worlds.source.join("region/r.1.1.mca"), b"a").unwrap();
        let applier = applier(
            &worlds,
            &[(
                "0",
                FolderSpec::Multiple(vec!["region".to_string(), "missing".to_string()]),
            )],
        );

        let outcome = applier.apply_region(&Region::new(1, 1, Dimension::Overworld));

        assert!(!outcome.succeeded());
        assert_eq!(outcome.copied.len(), 1);
        assert_eq!(outcome.errors.len(), 1);
        assert!(worlds.destination.join("region/r.1.1.mca").exists());
    }

    #[test]
    fn test_apply_all_isolates_failures() {
        let worlds = worlds();
        fs::write(worlds.source.join("region/r.0.0.mca"), b"a").unwrap();
        fs::write(worlds.source.join("region/r.2.0.mca"), b"c").unwrap();
        let metrics = Arc::new(Metrics::new());
        let applier = applier(&worlds, &[("0", FolderSpec::from("region"))])
            .with_metrics(metrics.clone());

        let a = Region::new(0, 0, Dimension::Overworld);
        let b = Region::new(1, 0, Dimension::Overworld);
        let c = Region::new(2, 0, Dimension::Overworld);
        let history = applier.apply_all(&[a, b, c]);

        assert_eq!(
            history,
            vec![
                HistoryEntry::new(a, true),
                HistoryEntry::new(b, false),
                HistoryEntry::new(c, true),
            ]
        );
        assert_eq!(metrics.regions_copied(), 2);
        assert_eq!(metrics.regions_failed(), 1);
    }

    #[test]
    fn test_apply_all_empty() {
        let worlds = worlds();
        let applier = applier(&worlds, &[("0", FolderSpec::from("region"))]);
        assert!(applier.apply_all(&[]).is_empty());
    }
}
