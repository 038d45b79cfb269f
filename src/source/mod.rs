//! Java sources on disk: discovery, header parsing and `extends` edits.

mod edit;
mod parse;
mod scan;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::{debug, info};

use crate::canvas::host::{EntityId, StructureSource};

pub use parse::{Token, TokenKind, TypeHeader, TypeKind, tokenize};
pub use scan::path_to_slash_string;

#[derive(Clone, Debug)]
pub struct SourceFile {
    /// Relative to the project root.
    pub path: PathBuf,
    pub text: String,
    pub header: Option<TypeHeader>,
}

impl SourceFile {
    fn new(path: PathBuf, text: String) -> Self {
        let header = parse::parse_header(&text);
        Self { path, text, header }
    }

    /// The declared type name, or the file stem when nothing parsed.
    pub fn title(&self) -> String {
        match &self.header {
            Some(header) => header.name.clone(),
            None => self
                .path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default(),
        }
    }

    fn package(&self) -> Option<&str> {
        self.header.as_ref().and_then(|header| header.package.as_deref())
    }

    fn imports(&self) -> &[String] {
        self.header
            .as_ref()
            .map(|header| header.imports.as_slice())
            .unwrap_or_default()
    }
}

/// Entities appearing, disappearing or changing between two scans.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ProjectDiff {
    pub added: Vec<EntityId>,
    pub removed: Vec<EntityId>,
    pub changed: Vec<EntityId>,
}

impl ProjectDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

#[derive(Debug)]
pub struct ClassProject {
    root: PathBuf,
    files: BTreeMap<EntityId, SourceFile>,
    read_only: bool,
}

impl ClassProject {
    pub fn load(root: &Path, read_only: bool) -> Result<Self> {
        let paths = scan::collect_java_files(root)?;
        let mut files = BTreeMap::new();
        for path in paths {
            let full = root.join(&path);
            let text = fs::read_to_string(&full)
                .with_context(|| format!("failed to read `{}`", full.display()))?;
            let file = SourceFile::new(path, text);
            if file.header.is_none() {
                debug!(path = %file.path.display(), "no type declaration found");
            }
            files.insert(EntityId::new(path_to_slash_string(&file.path)), file);
        }
        info!(root = %root.display(), files = files.len(), read_only, "scanned project");
        Ok(Self {
            root: root.to_path_buf(),
            files,
            read_only,
        })
    }

    pub fn entities(&self) -> impl Iterator<Item = &EntityId> {
        self.files.keys()
    }

    pub fn file(&self, entity: &EntityId) -> Option<&SourceFile> {
        self.files.get(entity)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Find the entity `name` refers to from inside `from`: a qualified
    /// match, then a single-type import, then the same package, then a
    /// wildcard import. Anything else names a type outside the project.
    pub fn resolve(&self, from: &SourceFile, name: &str) -> Option<EntityId> {
        if name.contains('.') {
            return self.find_qualified(name);
        }

        let single = from
            .imports()
            .iter()
            .filter(|import| import.rsplit('.').next() == Some(name));
        let same_package = match from.package() {
            Some(package) => format!("{package}.{name}"),
            None => name.to_owned(),
        };
        let wildcard = from
            .imports()
            .iter()
            .filter_map(|import| import.strip_suffix('*'))
            .map(|prefix| format!("{prefix}{name}"));

        single
            .cloned()
            .chain(std::iter::once(same_package))
            .chain(wildcard)
            .find_map(|candidate| self.find_qualified(&candidate))
    }

    fn find_qualified(&self, qualified: &str) -> Option<EntityId> {
        self.files
            .iter()
            .find(|(_, file)| {
                file.header
                    .as_ref()
                    .is_some_and(|header| header.qualified_name() == qualified)
            })
            .map(|(entity, _)| entity.clone())
    }

    /// Compare against a newer scan of the same root.
    pub fn diff(&self, newer: &ClassProject) -> ProjectDiff {
        let mut diff = ProjectDiff::default();
        for (entity, file) in &newer.files {
            match self.files.get(entity) {
                None => diff.added.push(entity.clone()),
                Some(old) if old.text != file.text => diff.changed.push(entity.clone()),
                Some(_) => {}
            }
        }
        diff.removed = self
            .files
            .keys()
            .filter(|entity| !newer.files.contains_key(*entity))
            .cloned()
            .collect();
        diff
    }

    /// How `file` should spell `target`, and the import it needs first.
    fn reference_to(&self, file: &SourceFile, target: &SourceFile) -> Result<(String, Option<String>)> {
        let target_header = target
            .header
            .as_ref()
            .with_context(|| format!("`{}` declares no type", target.path.display()))?;
        let qualified = target_header.qualified_name();
        let simple = target_header.name.clone();

        let Some(target_package) = target_header.package.as_deref() else {
            if file.package().is_some() {
                bail!("`{simple}` is in the default package and cannot be referenced from a named package");
            }
            return Ok((simple, None));
        };
        if file.package() == Some(target_package) {
            return Ok((simple, None));
        }

        let wildcard = format!("{target_package}.*");
        if file.imports().iter().any(|import| *import == qualified || *import == wildcard) {
            return Ok((simple, None));
        }
        let clashes = file
            .imports()
            .iter()
            .any(|import| import.rsplit('.').next() == Some(simple.as_str()));
        if clashes {
            return Ok((qualified, None));
        }
        Ok((simple, Some(qualified)))
    }
}

impl StructureSource for ClassProject {
    fn supertypes(&self, entity: &EntityId) -> Vec<EntityId> {
        let Some(file) = self.files.get(entity) else {
            return Vec::new();
        };
        let Some(header) = &file.header else {
            return Vec::new();
        };
        if header.kind == TypeKind::Interface {
            return Vec::new();
        }
        header
            .extends
            .iter()
            .filter_map(|name| self.resolve(file, name))
            .collect()
    }

    fn set_supertype(&mut self, entity: &EntityId, supertype: Option<&EntityId>) -> Result<()> {
        let file = self
            .files
            .get(entity)
            .with_context(|| format!("unknown entity `{entity}`"))?;
        let header = file
            .header
            .as_ref()
            .with_context(|| format!("`{entity}` declares no type"))?;
        if header.kind != TypeKind::Class {
            bail!("`{}` is not a class and cannot extend another type", header.name);
        }

        let (name, import) = match supertype {
            Some(target) => {
                let target_file = self
                    .files
                    .get(target)
                    .with_context(|| format!("unknown entity `{target}`"))?;
                let (name, import) = self.reference_to(file, target_file)?;
                (Some(name), import)
            }
            None => (None, None),
        };

        let mut text = edit::set_extends(&file.text, header, name.as_deref());
        if let Some(qualified) = &import {
            text = edit::add_import(&text, header, qualified);
        }

        if !self.read_only {
            let full = self.root.join(&file.path);
            fs::write(&full, &text).with_context(|| format!("failed to write `{}`", full.display()))?;
        }
        debug!(entity = %entity, extends = name.as_deref(), import = import.as_deref(), "rewrote header");

        let path = file.path.clone();
        self.files.insert(entity.clone(), SourceFile::new(path, text));
        Ok(())
    }
}
