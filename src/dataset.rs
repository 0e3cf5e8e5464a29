// Training directory layout validation

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{PipelineError, Result};

/// Subsets every training root must contain
pub const SPLITS: [&str; 3] = ["train", "validation", "test"];

/// File extensions the training loader picks up
const IMAGE_EXTENSIONS: [&str; 7] = ["png", "jpg", "jpeg", "bmp", "ppm", "tif", "tiff"];

/// One class directory within a split
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassSummary {
    pub name: String,
    /// Label the sigmoid output refers to (0 or 1)
    pub index: usize,
    pub images: usize,
}

/// One of `train`, `validation`, `test`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitSummary {
    pub name: String,
    pub classes: Vec<ClassSummary>,
}

impl SplitSummary {
    pub fn total_images(&self) -> usize {
        self.classes.iter().map(|c| c.images).sum()
    }
}

/// A validated binary-classification dataset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetLayout {
    pub root: PathBuf,
    /// Class directory names in index order
    pub class_names: Vec<String>,
    pub splits: Vec<SplitSummary>,
}

impl DatasetLayout {
    /// Checks `root` for the three splits, each holding the same two class
    /// directories. Class indices follow sorted directory names.
    pub fn scan(root: &Path) -> Result<Self> {
        let mut class_names: Option<Vec<String>> = None;
        let mut splits = Vec::with_capacity(SPLITS.len());

        for split in SPLITS {
            let split_dir = root.join(split);
            if !split_dir.is_dir() {
                return Err(PipelineError::Dataset(format!(
                    "missing split directory {}",
                    split_dir.display()
                )));
            }

            let names = class_dirs(&split_dir)?;
            if names.len() != 2 {
                return Err(PipelineError::Dataset(format!(
                    "split '{split}' must contain exactly two class directories, found {}: {names:?}",
                    names.len()
                )));
            }

            match &class_names {
                Some(expected) if *expected != names => {
                    return Err(PipelineError::Dataset(format!(
                        "split '{split}' has classes {names:?}, expected {expected:?}"
                    )));
                }
                Some(_) => {}
                None => class_names = Some(names.clone()),
            }

            let mut classes = Vec::with_capacity(names.len());
            for (index, name) in names.into_iter().enumerate() {
                let images = count_images(&split_dir.join(&name))?;
                if images == 0 {
                    warn!(split, class = %name, "class directory has no images");
                }
                classes.push(ClassSummary {
                    name,
                    index,
                    images,
                });
            }

            debug!(split, "split scanned");
            splits.push(SplitSummary {
                name: split.to_string(),
                classes,
            });
        }

        Ok(Self {
            root: root.to_path_buf(),
            class_names: class_names.unwrap_or_default(),
            splits,
        })
    }

    pub fn class_index(&self, name: &str) -> Option<usize> {
        self.class_names.iter().position(|c| c == name)
    }

    pub fn split(&self, name: &str) -> Option<&SplitSummary> {
        self.splits.iter().find(|s| s.name == name)
    }
}

impl std::fmt::Display for DatasetLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Dataset: {}", self.root.display())?;
        let indices: Vec<String> = self
            .class_names
            .iter()
            .enumerate()
            .map(|(i, name)| format!("'{name}': {i}"))
            .collect();
        writeln!(f, "Class indices: {{{}}}", indices.join(", "))?;
        for split in &self.splits {
            write!(f, "  {:<10} {:>6} images", split.name, split.total_images())?;
            for class in &split.classes {
                write!(f, "  {}={}", class.name, class.images)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Sorted, non-hidden subdirectory names
fn class_dirs(split_dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(split_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') {
            continue;
        }
        names.push(name);
    }
    names.sort();
    Ok(names)
}

/// Counts image files below `dir`, recursively
fn count_images(dir: &Path) -> Result<usize> {
    let mut count = 0;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            count += count_images(&path)?;
        } else if is_image_file(&path) {
            count += 1;
        }
    }
    Ok(count)
}

fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
