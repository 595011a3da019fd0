mod assembler;
mod config;
mod error;
pub mod image;

pub use assembler::{assemble, write_image, ImageWriter, StageBinary, PAD_BYTE};
pub use config::Config;
pub use error::{Error, Input, Stage};

use image::{ImageInputs, ImagePlan};
use std::{num::ParseIntError, path::PathBuf};
use structopt::StructOpt;

pub const IMAGE_TYPES: &str = "Image types:
  sfspl   - SPL + [compressed] U-Boot for SPI flash
  nandspl - SPL + TPL + [compressed] U-Boot for NAND flash
  norspl  - SPL + TPL + [compressed] U-Boot for NOR flash";

fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

fn parse_hex_u32(s: &str) -> Result<u32, ParseIntError> {
    u32::from_str_radix(strip_hex_prefix(s), 16)
}

fn parse_hex_u64(s: &str) -> Result<u64, ParseIntError> {
    u64::from_str_radix(strip_hex_prefix(s), 16)
}

#[derive(StructOpt, Debug, Default)]
#[structopt(
    about = "Build a Lantiq bootstrap image from SPL, TPL and U-Boot",
    after_help = IMAGE_TYPES
)]
pub struct ImageOpt {
    /// Image type
    #[structopt(short = "t", name = "type")]
    pub image_type: Option<String>,
    /// Entry address (hex)
    #[structopt(short = "e", parse(try_from_str = parse_hex_u32))]
    pub entry: Option<u32>,
    /// U-Boot offset (hex)
    #[structopt(short = "x", parse(try_from_str = parse_hex_u64))]
    pub uboot_offset: Option<u64>,
    /// TPL offset (hex)
    #[structopt(short = "X", parse(try_from_str = parse_hex_u64))]
    pub tpl_offset: Option<u64>,
    /// NAND page size
    #[structopt(short = "p", parse(try_from_str = parse_int::parse))]
    pub page_size: Option<u32>,
    /// U-Boot binary
    #[structopt(short = "u", parse(from_os_str))]
    pub uboot: Option<PathBuf>,
    /// SPL binary
    #[structopt(short = "s", parse(from_os_str))]
    pub spl: Option<PathBuf>,
    /// TPL binary
    #[structopt(short = "T", parse(from_os_str))]
    pub tpl: Option<PathBuf>,
    /// Output binary
    #[structopt(short = "o", parse(from_os_str))]
    pub output: Option<PathBuf>,
    /// Layout file supplying defaults for any of the above
    #[structopt(short = "c", long, parse(from_os_str))]
    pub config: Option<PathBuf>,
}

impl ImageOpt {
    /// Merges the command line with the layout file, if any.
    pub fn inputs(self) -> Result<ImageInputs, Error> {
        let inputs = ImageInputs {
            image_type: self.image_type,
            entry: self.entry,
            uboot_offset: self.uboot_offset,
            tpl_offset: self.tpl_offset,
            page_size: self.page_size,
            uboot: self.uboot,
            spl: self.spl,
            tpl: self.tpl,
            output: self.output,
        };
        Ok(match self.config {
            Some(path) => {
                log::debug!("Layout file {}", path.display());
                Config::load(&path)?.apply(inputs)
            }
            None => inputs,
        })
    }

    pub fn plan(self) -> Result<ImagePlan, Error> {
        self.inputs()?.validate()
    }
}

/// Validates `opt` and writes the image. Returns the image length.
pub fn build(opt: ImageOpt) -> Result<u64, Error> {
    let plan = opt.plan()?;
    log::debug!("{:x?}", plan);
    log::info!("Building {} image {}", plan.kind(), plan.output().display());
    assemble(&plan)
}
