//! Lantiq non-volatile bootstrap (NVB) command headers.
//!
//! The mask ROM walks these records to find where each stage lives and
//! where to jump to. Every record starts with a command word whose low
//! half is the complement of the high half, so the ROM can reject garbage
//! without a separate checksum field. All words are big-endian.

use bitflags::bitflags;
use deku::prelude::*;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandId {
    Debug = 0x11,
    RegCfg = 0x22,
    IDwnld = 0x33,
    CDwnld = 0x44,
    Dwnld = 0x55,
    IfCfg = 0x66,
    Start = 0x77,
}

bitflags! {
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct CommandFlags: u8 {
        const START = 1;
        const DEC = 1 << 1;
        const DBG = 1 << 2;
        const SDBG = 1 << 3;
        const CFG0 = 1 << 4;
        const CFG1 = 1 << 5;
        const CFG2 = 1 << 6;
        const RST = 1 << 7;
    }
}

/// A command id/flags pair as it appears in the first word of a record.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct NvbCommand {
    pub id: u8,
    pub flags: u8,
}

impl NvbCommand {
    pub fn new(id: CommandId, flags: CommandFlags) -> Self {
        NvbCommand {
            id: id as u8,
            flags: flags.bits(),
        }
    }

    pub fn tag(&self) -> u16 {
        (u16::from(self.id) << 8) | u16::from(self.flags)
    }

    pub fn word(&self) -> u32 {
        let tag = self.tag();
        (u32::from(tag) << 16) | u32::from(0xFFFF - tag)
    }

    /// Splits a command word back into id and flags, `None` if the
    /// complement check fails.
    pub fn decode(word: u32) -> Option<Self> {
        let tag = (word >> 16) as u16;
        if word as u16 != 0xFFFF - tag {
            return None;
        }
        Some(NvbCommand {
            id: (tag >> 8) as u8,
            flags: tag as u8,
        })
    }
}

pub fn command_word(id: u8, flags: u8) -> u32 {
    NvbCommand { id, flags }.word()
}

#[derive(Debug, DekuWrite)]
#[deku(endian = "big")]
pub struct RegCfgHeader {
    command: u32,
    count: u32,
}

impl RegCfgHeader {
    pub const LEN: usize = 8;

    // count is always 0, register programming records are not generated
    pub fn new(count: u32) -> Self {
        RegCfgHeader {
            command: NvbCommand::new(CommandId::RegCfg, CommandFlags::SDBG | CommandFlags::DBG)
                .word(),
            count,
        }
    }
}

#[derive(Debug, DekuWrite)]
#[deku(endian = "big")]
pub struct DownloadHeader {
    command: u32,
    size: u32,
    addr: u32,
}

impl DownloadHeader {
    pub const LEN: usize = 12;

    /// `size` is the payload length; the address word is counted too.
    pub fn new(size: u32, addr: u32) -> Self {
        DownloadHeader {
            command: NvbCommand::new(CommandId::Dwnld, CommandFlags::START | CommandFlags::SDBG)
                .word(),
            size: size.wrapping_add(4),
            addr,
        }
    }
}

#[derive(Debug, DekuWrite)]
#[deku(endian = "big")]
pub struct StartHeader {
    command: u32,
    len: u32,
    addr: u32,
}

impl StartHeader {
    pub const LEN: usize = 12;

    pub fn new(addr: u32) -> Self {
        StartHeader {
            command: NvbCommand::new(CommandId::Start, CommandFlags::SDBG).word(),
            len: 4,
            addr,
        }
    }
}

/// Bytes the NVB records add around the SPL.
pub const NVB_OVERHEAD: usize = RegCfgHeader::LEN + DownloadHeader::LEN + StartHeader::LEN;

#[cfg(test)]
mod tests {
    use super::*;

    fn words(bytes: &[u8]) -> Vec<u32> {
        bytes
            .chunks(4)
            .map(|c| u32::from_be_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }

    #[test]
    fn command_word_is_self_checking() {
        for id in 0..=u8::MAX {
            for flags in 0..=u8::MAX {
                let word = command_word(id, flags);
                let high = word >> 16;
                let low = word & 0xFFFF;
                assert_eq!(low, 0xFFFF - high);
                assert_eq!(NvbCommand::decode(word), Some(NvbCommand { id, flags }));
            }
        }
    }

    #[test]
    fn known_command_words() {
        assert_eq!(command_word(0x22, 0x0c), 0x220c_ddf3);
        assert_eq!(command_word(0x55, 0x09), 0x5509_aaf6);
        assert_eq!(command_word(0x77, 0x08), 0x7708_88f7);
    }

    #[test]
    fn decode_rejects_bad_complement() {
        assert_eq!(NvbCommand::decode(0x220c_ddf4), None);
        assert_eq!(NvbCommand::decode(0), None);
    }

    #[test]
    fn regcfg_header_layout() {
        let bytes = RegCfgHeader::new(0).to_bytes().unwrap();
        assert_eq!(bytes.len(), RegCfgHeader::LEN);
        assert_eq!(bytes[..4], [0x22, 0x0c, 0xdd, 0xf3]);
        assert_eq!(words(&bytes)[1], 0);
    }

    #[test]
    fn download_header_counts_address_word() {
        let bytes = DownloadHeader::new(64, 0x8000_2000).to_bytes().unwrap();
        assert_eq!(bytes.len(), DownloadHeader::LEN);
        assert_eq!(words(&bytes), vec![0x5509_aaf6, 68, 0x8000_2000]);
    }

    #[test]
    fn start_header_layout() {
        let bytes = StartHeader::new(0x8000_2000).to_bytes().unwrap();
        assert_eq!(bytes.len(), StartHeader::LEN);
        assert_eq!(words(&bytes), vec![0x7708_88f7, 4, 0x8000_2000]);
    }
}
