//! Append-only multi-frame cubes, one frame per odometer number.
//!
//! Layout (little-endian):
//!
//! | offset | size | field                         |
//! |--------|------|-------------------------------|
//! | 0      | 8    | magic `IRISCUBE`              |
//! | 8      | 4    | version                       |
//! | 12     | 4    | width                         |
//! | 16     | 4    | height                        |
//! | 20     | 4    | frame count                   |
//! | 24     | ...  | frame records                 |
//!
//! Each frame record is the odometer number (`i64`) followed by
//! `width * height` `f32` pixels in row-major order.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use memmap2::Mmap;
use ndarray::Array2;
use tracing::debug;

use crate::error::{IrisError, Result};
use crate::frame::Camera;

pub const CUBE_HEADER_SIZE: usize = 24;
pub const CUBE_MAGIC: &[u8; 8] = b"IRISCUBE";
const CUBE_VERSION: u32 = 1;
const FRAME_COUNT_OFFSET: u64 = 20;
const ODOMETER_SIZE: usize = 8;

#[derive(Clone, Debug, PartialEq)]
pub struct CubeHeader {
    pub width: u32,
    pub height: u32,
    pub frame_count: u32,
}

impl CubeHeader {
    /// Total bytes of one frame record (odometer + pixels).
    pub fn frame_record_size(&self) -> Result<usize> {
        (self.width as usize)
            .checked_mul(self.height as usize)
            .and_then(|pixels| pixels.checked_mul(std::mem::size_of::<f32>()))
            .and_then(|bytes| bytes.checked_add(ODOMETER_SIZE))
            .ok_or_else(|| {
                IrisError::InvalidCube(format!(
                    "Dimensions {}x{} too large",
                    self.width, self.height
                ))
            })
    }

    fn frame_offset(&self, index: usize) -> Result<usize> {
        index
            .checked_mul(self.frame_record_size()?)
            .and_then(|bytes| bytes.checked_add(CUBE_HEADER_SIZE))
            .ok_or_else(|| IrisError::InvalidCube(format!("Frame offset {} overflows", index)))
    }

    fn expected_len(&self) -> Result<usize> {
        self.frame_offset(self.frame_count as usize)
    }
}

fn parse_header(buf: &[u8]) -> Result<CubeHeader> {
    if buf.len() < CUBE_HEADER_SIZE {
        return Err(IrisError::InvalidCube("File too small for cube header".into()));
    }
    if &buf[0..8] != CUBE_MAGIC {
        return Err(IrisError::InvalidCube("Missing IRISCUBE magic".into()));
    }
    let mut cursor = std::io::Cursor::new(&buf[8..CUBE_HEADER_SIZE]);
    let version = cursor.read_u32::<LittleEndian>()?;
    if version != CUBE_VERSION {
        return Err(IrisError::InvalidCube(format!("Unsupported version {}", version)));
    }
    let width = cursor.read_u32::<LittleEndian>()?;
    let height = cursor.read_u32::<LittleEndian>()?;
    let frame_count = cursor.read_u32::<LittleEndian>()?;
    if width == 0 || height == 0 {
        return Err(IrisError::InvalidCube(format!(
            "Invalid dimensions {}x{}",
            width, height
        )));
    }
    Ok(CubeHeader {
        width,
        height,
        frame_count,
    })
}

fn check_length(header: &CubeHeader, actual: usize) -> Result<()> {
    let expected = header.expected_len()?;
    if actual < expected {
        return Err(IrisError::InvalidCube(format!(
            "File truncated: expected at least {} bytes, got {} (refresh or re-ingest required)",
            expected, actual
        )));
    }
    Ok(())
}

/// Memory-mapped read access to a cube.
pub struct CubeReader {
    mmap: Mmap,
    pub header: CubeHeader,
}

impl CubeReader {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };
        let header = parse_header(&mmap)?;
        check_length(&header, mmap.len())?;
        Ok(Self { mmap, header })
    }

    pub fn frame_count(&self) -> usize {
        self.header.frame_count as usize
    }

    fn record(&self, index: usize) -> Result<&[u8]> {
        let count = self.frame_count();
        if index >= count {
            return Err(IrisError::InvalidCube(format!(
                "Frame index {} out of range (total: {})",
                index, count
            )));
        }
        let offset = self.header.frame_offset(index)?;
        Ok(&self.mmap[offset..offset + self.header.frame_record_size()?])
    }

    /// Odometer number attribute of frame `index`.
    pub fn frame_odometer(&self, index: usize) -> Result<i64> {
        let raw = self.record(index)?;
        Ok(i64::from_le_bytes(raw[..ODOMETER_SIZE].try_into().map_err(
            |_| IrisError::InvalidCube("Short odometer field".into()),
        )?))
    }

    pub fn read_frame(&self, index: usize) -> Result<Array2<f32>> {
        let raw = self.record(index)?;
        let h = self.header.height as usize;
        let w = self.header.width as usize;
        let pixels: Vec<f32> = raw[ODOMETER_SIZE..]
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        Array2::from_shape_vec((h, w), pixels)
            .map_err(|e| IrisError::InvalidCube(format!("Frame shape mismatch: {}", e)))
    }

    /// Index of the frame holding `odometer`, if any.
    pub fn find_frame(&self, odometer: i64) -> Option<usize> {
        (0..self.frame_count()).find(|&i| self.frame_odometer(i).ok() == Some(odometer))
    }

    /// Odometer numbers of every frame, in frame order.
    pub fn odometers(&self) -> Result<Vec<i64>> {
        (0..self.frame_count())
            .map(|i| self.frame_odometer(i))
            .collect()
    }
}

/// Write access to a cube: overwrite an existing frame slot or append one.
pub struct CubeWriter {
    file: File,
    header: CubeHeader,
}

impl CubeWriter {
    /// Create an empty cube, truncating any existing file.
    pub fn create(path: &Path, width: usize, height: usize) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let to_u32 = |v: usize| {
            u32::try_from(v)
                .ok()
                .filter(|&v| v > 0)
                .ok_or_else(|| IrisError::InvalidCube(format!("Invalid dimensions {}x{}", width, height)))
        };
        let header = CubeHeader {
            width: to_u32(width)?,
            height: to_u32(height)?,
            frame_count: 0,
        };
        header.frame_record_size()?;
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        write_header(&mut file, &header)?;
        file.flush()?;
        debug!(path = %path.display(), width, height, "Cube created");
        Ok(Self { file, header })
    }

    /// Open an existing cube for writing.
    pub fn open(path: &Path) -> Result<Self> {
        let mut file = OpenOptions::new().read(true).write(true).open(path)?;
        let mut buf = [0u8; CUBE_HEADER_SIZE];
        file.read_exact(&mut buf).map_err(|_| {
            IrisError::InvalidCube("File too small for cube header".into())
        })?;
        let header = parse_header(&buf)?;
        let len = usize::try_from(file.metadata()?.len()).unwrap_or(usize::MAX);
        check_length(&header, len)?;
        Ok(Self { file, header })
    }

    pub fn header(&self) -> &CubeHeader {
        &self.header
    }

    pub fn frame_count(&self) -> usize {
        self.header.frame_count as usize
    }

    /// Slot for `odometer`: its existing frame if present, else the next
    /// free slot at the end. Linear in the number of frames.
    pub fn resolve_slot(&mut self, odometer: i64) -> Result<usize> {
        for index in 0..self.frame_count() {
            let offset = self.header.frame_offset(index)? as u64;
            self.file.seek(SeekFrom::Start(offset))?;
            if self.file.read_i64::<LittleEndian>()? == odometer {
                return Ok(index);
            }
        }
        Ok(self.frame_count())
    }

    /// Write `data` tagged with `odometer` at `slot`. A slot equal to the
    /// frame count appends a frame; the count is only bumped once the
    /// record is fully written.
    pub fn write_frame(&mut self, slot: usize, odometer: i64, data: &Array2<f32>) -> Result<()> {
        let (h, w) = data.dim();
        let (expected_w, expected_h) = (self.header.width as usize, self.header.height as usize);
        if w != expected_w || h != expected_h {
            return Err(IrisError::DimensionMismatch {
                expected_w,
                expected_h,
                w,
                h,
            });
        }
        let count = self.frame_count();
        if slot > count {
            return Err(IrisError::InvalidCube(format!(
                "Cannot write frame {} in a cube of {} frames",
                slot, count
            )));
        }

        let offset = self.header.frame_offset(slot)? as u64;
        let mut record = Vec::with_capacity(self.header.frame_record_size()?);
        record.write_i64::<LittleEndian>(odometer)?;
        for &v in data.iter() {
            record.write_f32::<LittleEndian>(v)?;
        }
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(&record)?;

        if slot == count {
            self.header.frame_count += 1;
            self.file.seek(SeekFrom::Start(FRAME_COUNT_OFFSET))?;
            self.file
                .write_u32::<LittleEndian>(self.header.frame_count)?;
        }
        self.file.flush()?;
        Ok(())
    }

    /// Flush and close the cube.
    pub fn finalize(mut self) -> Result<()> {
        self.file.flush()?;
        self.file.sync_data()?;
        Ok(())
    }
}

fn write_header(w: &mut impl Write, header: &CubeHeader) -> Result<()> {
    w.write_all(CUBE_MAGIC)?;
    w.write_u32::<LittleEndian>(CUBE_VERSION)?;
    w.write_u32::<LittleEndian>(header.width)?;
    w.write_u32::<LittleEndian>(header.height)?;
    w.write_u32::<LittleEndian>(header.frame_count)?;
    Ok(())
}

/// The three output cubes of a run (camera 1, camera 2, merged).
#[derive(Clone, Debug)]
pub struct CubeSet {
    dir: PathBuf,
}

impl CubeSet {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self, camera: Camera) -> PathBuf {
        self.dir
            .join(format!("cube.{}.cube", camera.cube_suffix()))
    }

    /// Check that the three cubes can take a `width x height` frame for
    /// `odometer` and pick its slot, without writing anything.
    ///
    /// With `reset` the cubes will be recreated empty on commit. Otherwise
    /// either all three cubes exist, share the exposure's dimensions and
    /// hold the same frames, or none exists yet.
    pub fn prepare(
        &self,
        odometer: i64,
        width: usize,
        height: usize,
        reset: bool,
    ) -> Result<PreparedFrames> {
        let paths: Vec<(Camera, PathBuf)> = Camera::ALL
            .into_iter()
            .map(|camera| (camera, self.path(camera)))
            .collect();
        let existing = paths.iter().filter(|(_, path)| path.exists()).count();

        if reset || existing == 0 {
            return Ok(PreparedFrames {
                odometer,
                slot: 0,
                target: FrameTarget::Create {
                    paths,
                    width,
                    height,
                },
            });
        }
        if existing != paths.len() {
            let missing: Vec<String> = paths
                .iter()
                .filter(|(_, path)| !path.exists())
                .map(|(_, path)| path.display().to_string())
                .collect();
            return Err(IrisError::InvalidCube(format!(
                "Incomplete cube set, missing {} (refresh required)",
                missing.join(", ")
            )));
        }

        let mut writers = Vec::with_capacity(paths.len());
        let mut slot = None;
        for (camera, path) in paths {
            let mut writer = CubeWriter::open(&path)?;
            let header = writer.header();
            let (cube_w, cube_h) = (header.width as usize, header.height as usize);
            if (cube_w, cube_h) != (width, height) {
                return Err(IrisError::DimensionMismatch {
                    expected_w: cube_w,
                    expected_h: cube_h,
                    w: width,
                    h: height,
                });
            }
            let camera_slot = writer.resolve_slot(odometer)?;
            match slot {
                None => slot = Some(camera_slot),
                Some(first) if first != camera_slot => {
                    return Err(IrisError::InvalidCube(format!(
                        "{} places odometer {} at frame {}, expected frame {}",
                        path.display(),
                        odometer,
                        camera_slot,
                        first
                    )));
                }
                Some(_) => {}
            }
            writers.push((camera, writer));
        }
        let counts: Vec<usize> = writers.iter().map(|(_, w)| w.frame_count()).collect();
        if counts.windows(2).any(|pair| pair[0] != pair[1]) {
            return Err(IrisError::InvalidCube(format!(
                "Cubes hold different frame counts {:?} (refresh required)",
                counts
            )));
        }

        Ok(PreparedFrames {
            odometer,
            slot: slot.unwrap_or(0),
            target: FrameTarget::Append(writers),
        })
    }

    /// Store one exposure's three frames. With `reset` the cubes are
    /// recreated empty first. Returns the frame index used in all cubes.
    pub fn store(
        &self,
        odometer: i64,
        im1: &Array2<f32>,
        im2: &Array2<f32>,
        merged: &Array2<f32>,
        reset: bool,
    ) -> Result<usize> {
        let (h, w) = im1.dim();
        self.prepare(odometer, w, h, reset)?.commit(im1, im2, merged)
    }
}

enum FrameTarget {
    Create {
        paths: Vec<(Camera, PathBuf)>,
        width: usize,
        height: usize,
    },
    Append(Vec<(Camera, CubeWriter)>),
}

/// Validated destination of one exposure's frames, from `CubeSet::prepare`.
pub struct PreparedFrames {
    odometer: i64,
    slot: usize,
    target: FrameTarget,
}

impl PreparedFrames {
    /// Frame index the exposure will occupy in all three cubes.
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Write the three frames. Returns the frame index used.
    pub fn commit(
        self,
        im1: &Array2<f32>,
        im2: &Array2<f32>,
        merged: &Array2<f32>,
    ) -> Result<usize> {
        let writers = match self.target {
            FrameTarget::Append(writers) => writers,
            FrameTarget::Create {
                paths,
                width,
                height,
            } => {
                let mut writers = Vec::with_capacity(paths.len());
                for (camera, path) in paths {
                    writers.push((camera, CubeWriter::create(&path, width, height)?));
                }
                writers
            }
        };
        for (camera, mut writer) in writers {
            let data = match camera {
                Camera::One => im1,
                Camera::Two => im2,
                Camera::Merged => merged,
            };
            writer.write_frame(self.slot, self.odometer, data)?;
            writer.finalize()?;
        }
        debug!(odometer = self.odometer, slot = self.slot, "Frames written to output cubes");
        Ok(self.slot)
    }
}
