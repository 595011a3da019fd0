use std::{fmt, path::PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("Invalid image type")]
    UnknownImageType,
    #[error("Missing {0}")]
    MissingInput(Input),
    #[error("Missing {0} offset")]
    MissingOffset(Stage),
    #[error("Missing NAND page size")]
    MissingPageSize,
    #[error("Only a NAND page size of 2048 is supported, got {0}")]
    UnsupportedPageSize(u32),
    #[error("Missing entry address")]
    MissingEntryAddress,
    #[error("Cannot open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),
    #[error("Failed to write {what}: {source}")]
    Write {
        what: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("Offset {offset:#x} needs to be greater than {position:#x}")]
    InvalidOffset { offset: u64, position: u64 },
    #[error("{} is too large for a download header ({len} bytes)", .path.display())]
    StageTooLarge { path: PathBuf, len: usize },
    #[error("Header encode error")]
    Encode(#[from] deku::error::DekuError),
    #[error("Invalid layout file: {0}")]
    Config(#[from] toml::de::Error),
}

impl Error {
    /// Errors caused by the requested combination of options, reported
    /// before any file is opened.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            Error::UnknownImageType
                | Error::MissingInput(_)
                | Error::MissingOffset(_)
                | Error::MissingPageSize
                | Error::UnsupportedPageSize(_)
                | Error::MissingEntryAddress
        )
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Input {
    UBoot,
    Spl,
    Tpl,
    Output,
}

impl fmt::Display for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Input::UBoot => "U-Boot binary",
            Input::Spl => "SPL binary",
            Input::Tpl => "TPL binary",
            Input::Output => "output binary",
        })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Stage {
    UBoot,
    Tpl,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::UBoot => "U-Boot",
            Stage::Tpl => "TPL",
        })
    }
}
