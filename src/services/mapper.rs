use crate::models::{FolderSpec, Region};
use camino::Utf8PathBuf;
use indexmap::IndexMap;

/// Maps regions to their file paths relative to a world root.
///
/// A dimension with several configured folders yields one path per folder, in
/// configured order. A dimension with no entry yields no paths at all.
#[derive(Debug, Clone, Default)]
pub struct CoordinateMapper {
    folders: IndexMap<String, FolderSpec>,
}

impl CoordinateMapper {
    pub fn new(folders: IndexMap<String, FolderSpec>) -> Self {
        Self { folders }
    }

    /// Relative paths of every file that stores `region`
    pub fn map_to_paths(&self, region: &Region) -> Vec<Utf8PathBuf> {
        let Some(spec) = self.folders.get(&region.dim().config_key()) else {
            return Vec::new();
        };

        let file_name = region.file_name();
        spec.folders()
            .into_iter()
            .map(|folder| Utf8PathBuf::from(folder).join(&file_name))
            .collect()
    }

    /// Whether the dimension of `region` has a folder mapping
    pub fn is_mapped(&self, region: &Region) -> bool {
        self.folders.contains_key(&region.dim().config_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Dimension;

    fn mapper(entries: &[(&str, FolderSpec)]) -> CoordinateMapper {
        CoordinateMapper::new(
            entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    #[test]
    fn test_single_folder() {
        let mapper = mapper(&[("0", FolderSpec::from("region"))]);
        let paths = mapper.map_to_paths(&Region::new(-3, 1, Dimension::Overworld));

        assert_eq!(paths, vec![Utf8PathBuf::from("region/r.-3.1.mca")]);
    }

    #[test]
    fn test_multiple_folders_keep_order() {
        let mapper = mapper(&[(
            "-1",
            FolderSpec::Multiple(vec!["DIM-1/region".to_string(), "mirror/DIM-1/region".to_string()]),
        )]);
        let paths = mapper.map_to_paths(&Region::new(2, -5, Dimension::Lower));

        assert_eq!(
            paths,
            vec![
                Utf8PathBuf::from("DIM-1/region/r.2.-5.mca"),
                Utf8PathBuf::from("mirror/DIM-1/region/r.2.-5.mca"),
            ]
        );
    }

    #[test]
    fn test_unmapped_dimension_yields_nothing() {
        let mapper = mapper(&[("0", FolderSpec::from("region"))]);
        let region = Region::new(0, 0, Dimension::Upper);

        assert!(mapper.map_to_paths(&region).is_empty());
        assert!(!mapper.is_mapped(&region));
    }

    #[test]
    fn test_empty_folder_list_yields_nothing() {
        let mapper = mapper(&[("0", FolderSpec::Multiple(Vec::new()))]);
        assert!(mapper
            .map_to_paths(&Region::new(0, 0, Dimension::Overworld))
            .is_empty());
    }
}
