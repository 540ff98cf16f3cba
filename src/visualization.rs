use crate::error::VisualizationError;
use crate::snapshot::LatticeSnapshot;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, warn};

/// Format of a written image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// Raw binary PPM (P6).
    Ppm,
    /// Whatever the external converter produced from the requested name, usually PNG.
    Converted,
}

/// A written image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Where the image was written.
    pub path: PathBuf,
    /// What it contains.
    pub format: ImageFormat,
    /// True if conversion was requested but the raw raster was kept instead.
    pub fell_back: bool,
}

/// Turns a snapshot into an image file.
pub trait SnapshotEncoder {
    /// Encode `snapshot` into a file called `name`.
    fn encode(&self, snapshot: &LatticeSnapshot, name: &Path)
        -> Result<Artifact, VisualizationError>;
}

/// Write a snapshot as a binary PPM (P6) raster.
pub fn write_ppm<W: Write>(snapshot: &LatticeSnapshot, mut writer: W) -> std::io::Result<()> {
    write!(writer, "P6\n{} {}\n255\n", snapshot.width(), snapshot.height())?;
    for px in snapshot.pixels() {
        writer.write_all(&[px.0, px.1, px.2])?;
    }
    writer.flush()
}

fn write_ppm_file(snapshot: &LatticeSnapshot, path: &Path) -> Result<(), VisualizationError> {
    let file = File::create(path)?;
    write_ppm(snapshot, BufWriter::new(file))?;
    Ok(())
}

/// Writes the raw raster directly, no external tools.
#[derive(Debug, Clone, Copy, Default)]
pub struct PpmEncoder;

impl SnapshotEncoder for PpmEncoder {
    fn encode(
        &self,
        snapshot: &LatticeSnapshot,
        name: &Path,
    ) -> Result<Artifact, VisualizationError> {
        write_ppm_file(snapshot, name)?;
        Ok(Artifact {
            path: name.to_path_buf(),
            format: ImageFormat::Ppm,
            fell_back: false,
        })
    }
}

/// Writes a temporary raster and shells out to an image converter (ImageMagick's `convert` by
/// default). If the converter is missing or fails, the raster is kept under the requested name.
#[derive(Debug, Clone)]
pub struct ConvertEncoder {
    program: String,
}

impl Default for ConvertEncoder {
    fn default() -> Self {
        Self::new("convert")
    }
}

impl ConvertEncoder {
    /// Use a specific converter program, invoked as `program <input> <output>`.
    pub fn new<S: Into<String>>(program: S) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Temporary raster path for an output name: `temp_<file name>.ppm` next to it.
    pub fn temp_path(name: &Path) -> PathBuf {
        let file_name = name
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();
        name.with_file_name(format!("temp_{}.ppm", file_name))
    }

    fn convert(&self, input: &Path, output: &Path) -> bool {
        match Command::new(&self.program)
            .arg(input)
            .arg(output)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
        {
            Ok(status) => status.success(),
            Err(e) => {
                debug!(program = %self.program, error = %e, "Converter unavailable");
                false
            }
        }
    }
}

impl SnapshotEncoder for ConvertEncoder {
    fn encode(
        &self,
        snapshot: &LatticeSnapshot,
        name: &Path,
    ) -> Result<Artifact, VisualizationError> {
        let temp = Self::temp_path(name);
        write_ppm_file(snapshot, &temp)?;

        if self.convert(&temp, name) {
            fs::remove_file(&temp)?;
            Ok(Artifact {
                path: name.to_path_buf(),
                format: ImageFormat::Converted,
                fell_back: false,
            })
        } else {
            warn!(
                program = %self.program,
                path = %name.display(),
                "Image conversion failed, keeping raw raster"
            );
            fs::rename(&temp, name)?;
            Ok(Artifact {
                path: name.to_path_buf(),
                format: ImageFormat::Ppm,
                fell_back: true,
            })
        }
    }
}
