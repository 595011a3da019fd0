use crate::{image::ImageInputs, Error};
use serde::Deserialize;
use std::{
    fs::read,
    path::{Path, PathBuf},
};

/// Image layout file, e.g.
///
/// ```toml
/// type = "nandspl"
/// entry = 0x80002000
/// tpl_offset = 0x4000
/// uboot_offset = 0x10000
/// page_size = 2048
/// spl = "u-boot-spl.bin"
/// tpl = "u-boot-tpl.bin"
/// uboot = "u-boot.lzo.img"
/// output = "u-boot.ltq.nandspl"
/// ```
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(rename = "type")]
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

impl Config {
    /// Reads a layout file. Relative paths inside it are taken relative to
    /// the directory containing the file.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let data = read(path).map_err(|source| Error::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_slice(&data)?;

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        let resolve = |p: Option<PathBuf>| p.map(|p| base.join(p));
        Ok(Config {
            uboot: resolve(config.uboot),
            spl: resolve(config.spl),
            tpl: resolve(config.tpl),
            output: resolve(config.output),
            ..config
        })
    }

    /// Fills in whatever `inputs` leaves unset.
    pub fn apply(self, inputs: ImageInputs) -> ImageInputs {
        ImageInputs {
            image_type: inputs.image_type.or(self.image_type),
            entry: inputs.entry.or(self.entry),
            uboot_offset: inputs.uboot_offset.or(self.uboot_offset),
            tpl_offset: inputs.tpl_offset.or(self.tpl_offset),
            page_size: inputs.page_size.or(self.page_size),
            uboot: inputs.uboot.or(self.uboot),
            spl: inputs.spl.or(self.spl),
            tpl: inputs.tpl.or(self.tpl),
            output: inputs.output.or(self.output),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_layout() {
        let config: Config = toml::from_str(
            r#"
            type = "sfspl"
            entry = 0x80002000
            uboot_offset = 0x10000
            spl = "spl.bin"
            "#,
        )
        .unwrap();
        assert_eq!(config.image_type.as_deref(), Some("sfspl"));
        assert_eq!(config.entry, Some(0x8000_2000));
        assert_eq!(config.uboot_offset, Some(0x10000));
        assert_eq!(config.spl, Some(PathBuf::from("spl.bin")));
        assert_eq!(config.tpl, None);
    }

    #[test]
    fn unknown_keys_rejected() {
        assert!(toml::from_str::<Config>("kernel = \"zImage\"").is_err());
    }

    #[test]
    fn command_line_wins() {
        let config = Config {
            image_type: Some("norspl".into()),
            uboot_offset: Some(0x10000),
            spl: Some("a.bin".into()),
            ..Default::default()
        };
        let inputs = config.apply(ImageInputs {
            uboot_offset: Some(0x20000),
            ..Default::default()
        });
        assert_eq!(inputs.image_type.as_deref(), Some("norspl"));
        assert_eq!(inputs.uboot_offset, Some(0x20000));
        assert_eq!(inputs.spl, Some(PathBuf::from("a.bin")));
    }
}
