use crate::image::{DownloadHeader, ImagePlan, NvbCommand, RegCfgHeader, StartHeader};
use crate::Error;
use deku::prelude::*;
use std::{
    convert::{TryFrom, TryInto},
    fs::File,
    io::{BufWriter, Read, Write},
    path::{Path, PathBuf},
};

/// Erased flash reads back as all ones.
pub const PAD_BYTE: u8 = 0xFF;
// flash write granularity
const PAD_BLOCK: usize = 4;

/// A stage binary loaded read-only for the duration of one assembly run.
pub struct StageBinary {
    path: PathBuf,
    data: Vec<u8>,
}

impl StageBinary {
    pub fn open(path: &Path) -> Result<Self, Error> {
        let open_err = |source: std::io::Error| Error::Open {
            path: path.to_path_buf(),
            source,
        };
        let mut file = File::open(path).map_err(open_err)?;
        let len = file.metadata().map_err(open_err)?.len();
        let mut data = Vec::with_capacity(len as usize);
        file.read_to_end(&mut data).map_err(open_err)?;
        log::debug!("Loaded {} ({} bytes)", path.display(), data.len());

        Ok(StageBinary {
            path: path.to_path_buf(),
            data,
        })
    }

    pub fn from_vec(path: impl Into<PathBuf>, data: Vec<u8>) -> Self {
        StageBinary {
            path: path.into(),
            data,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl AsRef<[u8]> for StageBinary {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

/// Output sink that tracks the write position. The position only ever
/// moves forward; gaps are filled with bytes, never seeked over.
pub struct ImageWriter<W> {
    inner: W,
    position: u64,
}

impl<W: Write> ImageWriter<W> {
    pub fn new(inner: W) -> Self {
        ImageWriter { inner, position: 0 }
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn write_all(&mut self, data: &[u8]) -> Result<(), Error> {
        self.inner.write_all(data)?;
        self.position += data.len() as u64;
        Ok(())
    }

    pub fn write_header<H: DekuContainerWrite>(&mut self, header: &H) -> Result<(), Error> {
        let bytes = header.to_bytes()?;
        let command = bytes
            .get(..4)
            .and_then(|word| word.try_into().ok())
            .map(u32::from_be_bytes)
            .and_then(NvbCommand::decode);
        if let Some(command) = command {
            log::trace!(
                "NVB command {:#04x} flags {:#04x} at {:#x}: {:02x?}",
                command.id,
                command.flags,
                self.position,
                bytes
            );
        }
        self.write_all(&bytes)
    }

    /// Fills with `fill` up to `offset`. A zero offset means "wherever we
    /// are"; an offset behind the current position is an error.
    pub fn pad_to(&mut self, offset: u64, fill: u8) -> Result<(), Error> {
        if offset == 0 {
            return Ok(());
        }
        if offset < self.position {
            return Err(Error::InvalidOffset {
                offset,
                position: self.position,
            });
        }

        let size = offset - self.position;
        log::debug!("Padding {} bytes from {:#x}", size, self.position);
        let block = [fill; PAD_BLOCK];
        for _ in 0..size / PAD_BLOCK as u64 {
            self.write_all(&block)?;
        }
        let rest = (size % PAD_BLOCK as u64) as usize;
        if rest > 0 {
            self.write_all(&block[..rest])?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), Error> {
        Ok(self.inner.flush()?)
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// Names the step that failed when the sink returns an I/O error.
fn writing(what: &'static str) -> impl Fn(Error) -> Error {
    move |err| match err {
        Error::IO(source) => Error::Write { what, source },
        err => err,
    }
}

/// Emits the stages of `plan` into `writer`, in image order.
pub fn write_image<W: Write>(
    plan: &ImagePlan,
    writer: &mut ImageWriter<W>,
    spl: &StageBinary,
    tpl: Option<&StageBinary>,
    uboot: &StageBinary,
) -> Result<(), Error> {
    let entry = plan.bootstrap_entry();

    if let Some(entry) = entry {
        let size = u32::try_from(spl.len())
            .ok()
            .filter(|size| size.checked_add(4).is_some())
            .ok_or_else(|| Error::StageTooLarge {
                path: spl.path().to_path_buf(),
                len: spl.len(),
            })?;
        writer
            .write_header(&RegCfgHeader::new(0))
            .map_err(writing("register config header"))?;
        writer
            .write_header(&DownloadHeader::new(size, entry))
            .map_err(writing("download header"))?;
    }

    log::info!("SPL at {:#x}, {} bytes", writer.position(), spl.len());
    writer.write_all(spl.as_ref()).map_err(writing("SPL"))?;

    if let Some(entry) = entry {
        writer
            .write_header(&StartHeader::new(entry))
            .map_err(writing("start header"))?;
    }

    if let (Some(tpl), Some(stage)) = (tpl, plan.tpl()) {
        writer
            .pad_to(stage.offset, PAD_BYTE)
            .map_err(writing("TPL padding"))?;
        log::info!("TPL at {:#x}, {} bytes", writer.position(), tpl.len());
        writer.write_all(tpl.as_ref()).map_err(writing("TPL"))?;
    }

    writer
        .pad_to(plan.uboot_offset(), PAD_BYTE)
        .map_err(writing("U-Boot padding"))?;
    log::info!("U-Boot at {:#x}, {} bytes", writer.position(), uboot.len());
    writer
        .write_all(uboot.as_ref())
        .map_err(writing("U-Boot image"))?;

    Ok(())
}

/// Builds the image described by `plan` and returns its length.
///
/// The output is created first and the stages are loaded in image order.
/// Whatever has been acquired is released in reverse order when this
/// returns, on success and on error alike. A failed run leaves the
/// partially written output behind.
pub fn assemble(plan: &ImagePlan) -> Result<u64, Error> {
    let output = File::create(plan.output()).map_err(|source| Error::Open {
        path: plan.output().to_path_buf(),
        source,
    })?;
    let mut writer = ImageWriter::new(BufWriter::new(output));

    let spl = StageBinary::open(plan.spl())?;
    let tpl = plan
        .tpl()
        .map(|tpl| StageBinary::open(&tpl.path))
        .transpose()?;
    let uboot = StageBinary::open(plan.uboot())?;

    write_image(plan, &mut writer, &spl, tpl.as_ref(), &uboot)?;
    writer.flush().map_err(writing("output"))?;

    Ok(writer.position())
}
