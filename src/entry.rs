//! The tree of files and directories a [`crate::Generator`] produces.
//!
//! An [`Entry`] is one node of that tree. What the generator does with a node is
//! decided by its variant:
//!
//! - [`Entry::Directory`] is created, then its children are generated below it.
//! - [`Entry::Plain`] and [`Entry::Templated`] are written fresh.
//! - [`Entry::Modify`] reads the file already present in the output, transforms
//!   it and writes the result back.
//! - [`Entry::Placeholder`] reserves its name but produces nothing.
use crate::errors::BoxError;
use serde::{de::DeserializeOwned, Serialize};
use std::{borrow::Cow, fmt, io::Write, sync::Arc};
use tera::{Context, Tera};

/// Rewrites existing file contents into `sink`.
pub type ModifyFn = dyn Fn(&[u8], &mut dyn Write) -> Result<(), BoxError> + Send + Sync;

/// Produces the children of a directory on demand.
pub type EntriesFn = dyn Fn() -> Result<Vec<Entry>, BoxError> + Send + Sync;

/// Something that renders `data` into a sink.
pub trait Template: Send + Sync {
    fn render(&self, data: &Context, sink: &mut dyn Write) -> Result<(), BoxError>;
}
impl<F> Template for F
where
    F: Fn(&Context, &mut dyn Write) -> Result<(), BoxError> + Send + Sync,
{
    fn render(&self, data: &Context, sink: &mut dyn Write) -> Result<(), BoxError> {
        self(data, sink)
    }
}

/// A named template registered in a shared [`Tera`] instance.
#[derive(Debug, Clone)]
pub struct TeraTemplate {
    tera: Arc<Tera>,
    name: String,
}
impl TeraTemplate {
    pub fn new<S: Into<String>>(tera: Arc<Tera>, name: S) -> Self {
        Self {
            tera,
            name: name.into(),
        }
    }
}
impl Template for TeraTemplate {
    fn render(&self, data: &Context, sink: &mut dyn Write) -> Result<(), BoxError> {
        self.tera.render_to(&self.name, data, sink)?;
        Ok(())
    }
}

/// A template given as a string, compiled each time it renders.
#[derive(Debug, Clone)]
pub struct InlineTemplate(pub String);
impl Template for InlineTemplate {
    fn render(&self, data: &Context, sink: &mut dyn Write) -> Result<(), BoxError> {
        let rendered = Tera::one_off(&self.0, data, false)?;
        sink.write_all(rendered.as_bytes())?;
        Ok(())
    }
}

#[derive(Clone)]
pub enum Children {
    Listed(Vec<Entry>),
    Deferred(Arc<EntriesFn>),
}

#[derive(Clone)]
pub enum Entry {
    Plain {
        name: String,
        contents: Vec<u8>,
    },
    Templated {
        name: String,
        template: Arc<dyn Template>,
        data: Context,
    },
    Directory {
        name: String,
        children: Children,
    },
    Modify {
        name: String,
        modifier: Arc<ModifyFn>,
    },
    Placeholder {
        name: String,
    },
}

impl Entry {
    /// A file with fixed contents.
    pub fn plain<N: Into<String>, C: Into<Vec<u8>>>(name: N, contents: C) -> Self {
        Entry::Plain {
            name: name.into(),
            contents: contents.into(),
        }
    }

    /// A file rendered from `template` with `data`.
    pub fn templated<N, T>(name: N, template: T, data: Context) -> Self
    where
        N: Into<String>,
        T: Template + 'static,
    {
        Entry::Templated {
            name: name.into(),
            template: Arc::new(template),
            data,
        }
    }

    /// Like [`Entry::templated`], with the data taken from any serializable value.
    ///
    /// # Errors
    ///
    /// Fails if `data` does not serialize to a map.
    pub fn templated_from<N, T, D>(name: N, template: T, data: &D) -> Result<Self, tera::Error>
    where
        N: Into<String>,
        T: Template + 'static,
        D: Serialize,
    {
        Ok(Self::templated(name, template, Context::from_serialize(data)?))
    }

    /// A directory holding `children`, generated in the given order.
    pub fn dir<N, I>(name: N, children: I) -> Self
    where
        N: Into<String>,
        I: IntoIterator<Item = Entry>,
    {
        Entry::Directory {
            name: name.into(),
            children: Children::Listed(children.into_iter().collect()),
        }
    }

    /// A directory whose children are produced by `loader` when it is generated.
    /// An error from `loader` aborts the generation.
    pub fn dir_with<N, F>(name: N, loader: F) -> Self
    where
        N: Into<String>,
        F: Fn() -> Result<Vec<Entry>, BoxError> + Send + Sync + 'static,
    {
        Entry::Directory {
            name: name.into(),
            children: Children::Deferred(Arc::new(loader)),
        }
    }

    /// Rewrites a file that must already exist in the output.
    pub fn modify<N, F>(name: N, modifier: F) -> Self
    where
        N: Into<String>,
        F: Fn(&[u8], &mut dyn Write) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        Entry::Modify {
            name: name.into(),
            modifier: Arc::new(modifier),
        }
    }

    /// Reserves `name` without writing anything to the output.
    pub fn placeholder<N: Into<String>>(name: N) -> Self {
        Entry::Placeholder { name: name.into() }
    }

    pub fn name(&self) -> &str {
        match self {
            Entry::Plain { name, .. }
            | Entry::Templated { name, .. }
            | Entry::Directory { name, .. }
            | Entry::Modify { name, .. }
            | Entry::Placeholder { name } => name,
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, Entry::Directory { .. })
    }

    /// Children of a directory entry; empty for every other variant.
    ///
    /// # Errors
    ///
    /// Propagates the failure of a deferred loader.
    pub fn entries(&self) -> Result<Cow<'_, [Entry]>, BoxError> {
        match self {
            Entry::Directory {
                children: Children::Listed(entries),
                ..
            } => Ok(Cow::Borrowed(entries.as_slice())),
            Entry::Directory {
                children: Children::Deferred(loader),
                ..
            } => Ok(Cow::Owned(loader()?)),
            _ => Ok(Cow::Borrowed(&[])),
        }
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entry::Plain { name, contents } => f
                .debug_struct("Plain")
                .field("name", name)
                .field("len", &contents.len())
                .finish(),
            Entry::Templated { name, .. } => {
                f.debug_struct("Templated").field("name", name).finish()
            }
            Entry::Directory {
                name,
                children: Children::Listed(entries),
            } => f
                .debug_struct("Directory")
                .field("name", name)
                .field("entries", entries)
                .finish(),
            Entry::Directory { name, .. } => f
                .debug_struct("Directory")
                .field("name", name)
                .finish_non_exhaustive(),
            Entry::Modify { name, .. } => f.debug_struct("Modify").field("name", name).finish(),
            Entry::Placeholder { name } => {
                f.debug_struct("Placeholder").field("name", name).finish()
            }
        }
    }
}

/// Builds a modifier for structured files: `unmarshal` turns the existing bytes
/// into a `V`, `transform` edits it and returns the bytes to write.
pub fn modify_marshalled<V, U, T, E1, E2>(
    unmarshal: U,
    transform: T,
) -> impl Fn(&[u8], &mut dyn Write) -> Result<(), BoxError> + Send + Sync + 'static
where
    U: Fn(&[u8]) -> Result<V, E1> + Send + Sync + 'static,
    T: Fn(&mut V) -> Result<Vec<u8>, E2> + Send + Sync + 'static,
    E1: Into<BoxError>,
    E2: Into<BoxError>,
{
    move |contents: &[u8], sink: &mut dyn Write| {
        let mut value = unmarshal(contents).map_err(Into::into)?;
        let modified = transform(&mut value).map_err(Into::into)?;
        sink.write_all(&modified)?;
        Ok(())
    }
}

/// [`modify_marshalled`] for TOML documents.
pub fn modify_toml<V, T>(
    transform: T,
) -> impl Fn(&[u8], &mut dyn Write) -> Result<(), BoxError> + Send + Sync + 'static
where
    V: DeserializeOwned + Serialize,
    T: Fn(&mut V) -> Result<(), BoxError> + Send + Sync + 'static,
{
    modify_marshalled(
        |contents: &[u8]| -> Result<V, BoxError> {
            Ok(toml::from_str(std::str::from_utf8(contents)?)?)
        },
        move |value: &mut V| -> Result<Vec<u8>, BoxError> {
            transform(value)?;
            Ok(toml::to_string(&*value)?.into_bytes())
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn modify_toml_round_trips_a_document() {
        #[derive(Debug, Deserialize, Serialize)]
        struct Manifest {
            name: String,
            version: String,
        }

        let modifier = modify_toml(|manifest: &mut Manifest| {
            manifest.version = "0.2.0".to_string();
            Ok(())
        });

        let mut out = Vec::new();
        modifier(
            b"name = \"demo\"\nversion = \"0.1.0\"\n".as_slice(),
            &mut out,
        )
        .unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "name = \"demo\"\nversion = \"0.2.0\"\n"
        );
    }

    #[test]
    fn modify_marshalled_stops_on_unmarshal_failure() {
        let modifier = modify_marshalled(
            |_: &[u8]| -> Result<u32, BoxError> { Err("not a number".into()) },
            |_: &mut u32| -> Result<Vec<u8>, BoxError> { panic!("transform must not run") },
        );

        let mut out = Vec::new();
        let error = modifier(b"abc".as_slice(), &mut out).unwrap_err();

        assert_eq!(error.to_string(), "not a number");
        assert!(out.is_empty());
    }

    #[test]
    fn inline_template_reports_missing_variables() {
        let template = InlineTemplate("hello {{ name }}".to_string());

        let mut out = Vec::new();
        assert!(template.render(&Context::new(), &mut out).is_err());

        let mut data = Context::new();
        data.insert("name", "world");
        template.render(&data, &mut out).unwrap();
        assert_eq!(out, b"hello world");
    }

    #[test]
    fn deferred_children_are_loaded_on_request() {
        let dir = Entry::dir_with("src", || Ok(vec![Entry::plain("lib.rs", "")]));
        let names: Vec<String> = dir
            .entries()
            .unwrap()
            .iter()
            .map(|e| e.name().to_string())
            .collect();
        assert_eq!(names, vec!["lib.rs"]);

        let broken = Entry::dir_with("src", || Err("listing failed".into()));
        assert!(broken.entries().is_err());
    }

    #[test]
    fn templated_from_serializes_its_data() {
        #[derive(Serialize)]
        struct Crate {
            name: &'static str,
            private: bool,
        }

        let entry = Entry::templated_from(
            "README.md",
            InlineTemplate("{{ name }}{% if private %} (private){% endif %}".to_string()),
            &Crate {
                name: "demo",
                private: true,
            },
        )
        .unwrap();

        let mut out = Vec::new();
        match &entry {
            Entry::Templated { template, data, .. } => template.render(data, &mut out).unwrap(),
            other => panic!("expected a templated entry, got {other:?}"),
        }
        assert_eq!(out, b"demo (private)");
        assert!(!entry.is_dir());

        assert!(Entry::templated_from("x", InlineTemplate(String::new()), &"not a map").is_err());
    }
}
