//! Utility functions for serializing data in the YAML file format
use std::{io::Write, path::Path};

use snafu::{ResultExt, Snafu};

type Result<T, E = Error> = std::result::Result<T, E>;

/// Represents every error which can be encountered during YAML serialization.
#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to serialize YAML"))]
    SerializeYaml { source: serde_yaml::Error },

    #[snafu(display("failed to write YAML document separator"))]
    WriteDocumentSeparator { source: std::io::Error },

    #[snafu(display("failed to write YAML to file {path:?}"))]
    WriteToFile {
        source: std::io::Error,
        path: std::path::PathBuf,
    },

    #[snafu(display("failed to write YAML to stdout"))]
    WriteToStdout { source: std::io::Error },

    #[snafu(display("failed to parse bytes as valid UTF-8 string"))]
    ParseUtf8Bytes { source: std::string::FromUtf8Error },
}

/// Provides configurable options during YAML serialization.
///
/// The default emits an explicit document with leading dashes (`---`).
pub struct SerializeOptions {
    /// Adds leading triple dashes (`---`) to the output string.
    pub explicit_document: bool,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            explicit_document: true,
        }
    }
}

/// Serializes any [serializable](serde::Serialize) type as YAML using the
/// provided [`SerializeOptions`].
pub trait YamlSchema: Sized + serde::Serialize {
    /// Generates the YAML representation of `self`.
    fn generate_yaml_schema(&self, options: SerializeOptions) -> Result<String> {
        let mut buffer = Vec::new();
        serialize(&self, &mut buffer, options)?;

        String::from_utf8(buffer).context(ParseUtf8BytesSnafu)
    }

    /// Generates the YAML representation of `self` and writes it to a file at `path`.
    fn write_yaml_schema<P: AsRef<Path>>(&self, path: P, options: SerializeOptions) -> Result<()> {
        let schema = self.generate_yaml_schema(options)?;
        let path = path.as_ref();

        std::fs::write(path, schema).context(WriteToFileSnafu { path })
    }

    /// Generates the YAML representation of `self` and prints it to stdout.
    fn print_yaml_schema(&self, options: SerializeOptions) -> Result<()> {
        let schema = self.generate_yaml_schema(options)?;

        std::io::stdout()
            .write_all(schema.as_bytes())
            .context(WriteToStdoutSnafu)
    }
}

impl<T> YamlSchema for T where T: serde::Serialize {}

/// Serializes the given data structure and writes it to a [`Writer`](Write).
pub fn serialize<T, W>(value: &T, mut writer: W, options: SerializeOptions) -> Result<()>
where
    T: serde::Serialize,
    W: Write,
{
    if options.explicit_document {
        writer
            .write_all(b"---\n")
            .context(WriteDocumentSeparatorSnafu)?;
    }

    let mut serializer = serde_yaml::Serializer::new(writer);
    value
        .serialize(&mut serializer)
        .context(SerializeYamlSnafu)
}
