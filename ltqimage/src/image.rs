mod nvb;
mod plan;

pub use nvb::{
    command_word, CommandFlags, CommandId, DownloadHeader, NvbCommand, RegCfgHeader,
    StartHeader, NVB_OVERHEAD,
};
pub use plan::{ImageInputs, ImageKind, ImagePlan, TplStage, NAND_PAGE_SIZE};
