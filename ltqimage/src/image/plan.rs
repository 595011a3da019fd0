use crate::error::{Error, Input, Stage};
use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

/// The only NAND page size the mask ROM loader understands.
pub const NAND_PAGE_SIZE: u32 = 2048;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ImageKind {
    /// SPL + U-Boot for SPI flash
    SfSpl,
    /// SPL + TPL + U-Boot for NAND flash
    NandSpl,
    /// SPL + TPL + U-Boot for NOR flash
    NorSpl,
}

impl ImageKind {
    pub fn name(&self) -> &'static str {
        match self {
            ImageKind::SfSpl => "sfspl",
            ImageKind::NandSpl => "nandspl",
            ImageKind::NorSpl => "norspl",
        }
    }

    pub fn needs_tpl(&self) -> bool {
        matches!(self, ImageKind::NandSpl | ImageKind::NorSpl)
    }

    /// NOR images are read in place and carry no NVB records.
    pub fn emits_bootstrap_headers(&self) -> bool {
        matches!(self, ImageKind::SfSpl | ImageKind::NandSpl)
    }
}

impl FromStr for ImageKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sfspl" => Ok(ImageKind::SfSpl),
            "nandspl" => Ok(ImageKind::NandSpl),
            "norspl" => Ok(ImageKind::NorSpl),
            _ => Err(Error::UnknownImageType),
        }
    }
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Raw, unchecked request as collected from the command line and the
/// layout file. Zero is treated the same as absent for every number.
#[derive(Debug, Default, Clone)]
pub struct ImageInputs {
    pub image_type: Option<String>,
    pub entry: Option<u32>,
    pub uboot_offset: Option<u64>,
    pub tpl_offset: Option<u64>,
    pub page_size: Option<u32>,
    pub uboot: Option<PathBuf>,
    pub spl: Option<PathBuf>,
    pub tpl: Option<PathBuf>,
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TplStage {
    pub path: PathBuf,
    /// Zero means "wherever the previous stage ended".
    pub offset: u64,
}

/// A validated image layout. Only `ImageInputs::validate` creates one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePlan {
    kind: ImageKind,
    entry: Option<u32>,
    uboot_offset: u64,
    page_size: Option<u32>,
    emit_bootstrap_headers: bool,
    uboot: PathBuf,
    spl: PathBuf,
    tpl: Option<TplStage>,
    output: PathBuf,
}

fn non_zero<T: Default + PartialEq>(value: Option<T>) -> Option<T> {
    value.filter(|v| *v != T::default())
}

impl ImageInputs {
    /// Checks the request rule by rule and stops at the first violation.
    pub fn validate(self) -> Result<ImagePlan, Error> {
        let kind: ImageKind = self
            .image_type
            .as_deref()
            .ok_or(Error::UnknownImageType)?
            .parse()?;

        let uboot = self.uboot.ok_or(Error::MissingInput(Input::UBoot))?;
        let output = self.output.ok_or(Error::MissingInput(Input::Output))?;
        let spl = self.spl.ok_or(Error::MissingInput(Input::Spl))?;
        let uboot_offset =
            non_zero(self.uboot_offset).ok_or(Error::MissingOffset(Stage::UBoot))?;

        let tpl = if kind.needs_tpl() {
            let path = self.tpl.ok_or(Error::MissingInput(Input::Tpl))?;
            let offset = non_zero(self.tpl_offset).ok_or(Error::MissingOffset(Stage::Tpl))?;
            Some(TplStage { path, offset })
        } else {
            // optional for SPI images, written right after the SPL when
            // no offset is given
            let offset = self.tpl_offset.unwrap_or(0);
            self.tpl.map(|path| TplStage { path, offset })
        };

        let page_size = if kind == ImageKind::NandSpl {
            match non_zero(self.page_size) {
                None => return Err(Error::MissingPageSize),
                Some(NAND_PAGE_SIZE) => Some(NAND_PAGE_SIZE),
                Some(other) => return Err(Error::UnsupportedPageSize(other)),
            }
        } else {
            None
        };

        let entry = non_zero(self.entry);
        if kind.emits_bootstrap_headers() && entry.is_none() {
            return Err(Error::MissingEntryAddress);
        }

        Ok(ImagePlan {
            kind,
            entry,
            uboot_offset,
            page_size,
            emit_bootstrap_headers: kind.emits_bootstrap_headers(),
            uboot,
            spl,
            tpl,
            output,
        })
    }
}

impl ImagePlan {
    pub fn kind(&self) -> ImageKind {
        self.kind
    }

    pub fn entry(&self) -> Option<u32> {
        self.entry
    }

    /// Entry address to put into the NVB records, if the image gets any.
    pub fn bootstrap_entry(&self) -> Option<u32> {
        if self.emit_bootstrap_headers {
            self.entry
        } else {
            None
        }
    }

    pub fn emit_bootstrap_headers(&self) -> bool {
        self.emit_bootstrap_headers
    }

    pub fn uboot_offset(&self) -> u64 {
        self.uboot_offset
    }

    pub fn page_size(&self) -> Option<u32> {
        self.page_size
    }

    pub fn uboot(&self) -> &Path {
        &self.uboot
    }

    pub fn spl(&self) -> &Path {
        &self.spl
    }

    pub fn tpl(&self) -> Option<&TplStage> {
        self.tpl.as_ref()
    }

    pub fn output(&self) -> &Path {
        &self.output
    }
}
