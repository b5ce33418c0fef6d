use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{ArchiveError, BoxError};

pub const CLASS_MAGIC: [u8; 4] = [0xCA, 0xFE, 0xBA, 0xBE];

/// Rewrites one class entry. Implementations receive entries whose header has already
/// been validated.
pub trait ClassTransform {
    fn transform(&mut self, entry: &str, bytes: &[u8]) -> Result<Vec<u8>, BoxError>;
}

/// Desugars `invokedynamic` in every class and tallies what it did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DesugarTransform {
    pub classes_rewritten: usize,
    pub call_sites: usize,
}

impl ClassTransform for DesugarTransform {
    fn transform(&mut self, entry: &str, bytes: &[u8]) -> Result<Vec<u8>, BoxError> {
        let (rewritten, report) = unindy_desugar::desugar_class_bytes(bytes)?;
        if report.call_sites() > 0 {
            tracing::debug!(
                target: "unindy.archive",
                entry,
                class = %report.class_name,
                call_sites = report.call_sites(),
                "rewrote class"
            );
            self.classes_rewritten += 1;
            self.call_sites += report.call_sites();
        }
        Ok(rewritten)
    }
}

/// Compression applied to rewritten class entries; other entries keep their own.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    #[default]
    Deflated,
    Stored,
}

impl Compression {
    fn method(self) -> CompressionMethod {
        match self {
            Compression::Deflated => CompressionMethod::Deflated,
            Compression::Stored => CompressionMethod::Stored,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveOptions {
    pub compression: Compression,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RewriteSummary {
    pub classes: usize,
    pub resources: usize,
    pub directories: usize,
}

/// Streams `input` into a new archive at `output`, passing every `*.class` entry through
/// `transform`.
///
/// The new archive is assembled in a temporary file next to `output` and only moved into
/// place once every entry succeeded, so a failed run leaves `output` untouched.
pub fn rewrite_archive(
    input: &Path,
    output: &Path,
    options: &ArchiveOptions,
    transform: &mut dyn ClassTransform,
) -> Result<RewriteSummary, ArchiveError> {
    let _span = tracing::debug_span!("rewrite_archive", input = %input.display()).entered();

    let file = File::open(input).map_err(|source| io_error(input, source))?;
    let mut archive = ZipArchive::new(file).map_err(|source| zip_error(input, source))?;

    let parent = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let tmp = tempfile::Builder::new()
        .prefix(".unindy-")
        .suffix(".tmp")
        .tempfile_in(parent)
        .map_err(|source| io_error(parent, source))?;
    let mut writer = ZipWriter::new(tmp);
    let class_options =
        SimpleFileOptions::default().compression_method(options.compression.method());

    let mut summary = RewriteSummary::default();
    for idx in 0..archive.len() {
        let (name, is_dir) = {
            let entry = archive
                .by_index_raw(idx)
                .map_err(|source| zip_error(input, source))?;
            (entry.name().to_string(), entry.is_dir())
        };

        if is_dir {
            writer
                .add_directory(name.as_str(), SimpleFileOptions::default())
                .map_err(|source| zip_error(output, source))?;
            summary.directories += 1;
        } else if name.ends_with(".class") {
            let mut entry = archive
                .by_index(idx)
                .map_err(|source| zip_error(input, source))?;
            let mut bytes = Vec::with_capacity(entry.size() as usize);
            entry
                .read_to_end(&mut bytes)
                .map_err(|source| io_error(input, source))?;
            let mut entry_options = class_options;
            if let Some(modified) = entry.last_modified() {
                entry_options = entry_options.last_modified_time(modified);
            }
            drop(entry);

            if !bytes.starts_with(&CLASS_MAGIC) {
                return Err(ArchiveError::MalformedClass { entry: name });
            }
            let rewritten = transform
                .transform(&name, &bytes)
                .map_err(|source| ArchiveError::Transform {
                    entry: name.clone(),
                    source,
                })?;

            writer
                .start_file(name.as_str(), entry_options)
                .map_err(|source| zip_error(output, source))?;
            writer
                .write_all(&rewritten)
                .map_err(|source| io_error(output, source))?;
            summary.classes += 1;
        } else {
            let entry = archive
                .by_index_raw(idx)
                .map_err(|source| zip_error(input, source))?;
            writer
                .raw_copy_file(entry)
                .map_err(|source| zip_error(output, source))?;
            summary.resources += 1;
        }
    }

    let tmp = writer.finish().map_err(|source| zip_error(output, source))?;
    tmp.persist(output).map_err(|err| io_error(output, err.error))?;

    tracing::debug!(
        target: "unindy.archive",
        classes = summary.classes,
        resources = summary.resources,
        directories = summary.directories,
        "wrote {}",
        output.display()
    );
    Ok(summary)
}

fn io_error(path: &Path, source: std::io::Error) -> ArchiveError {
    ArchiveError::Io {
        path: PathBuf::from(path),
        source,
    }
}

fn zip_error(path: &Path, source: zip::result::ZipError) -> ArchiveError {
    ArchiveError::Zip {
        path: PathBuf::from(path),
        source,
    }
}
