//! SeaORM entity models
//!
//! Database entities for dispatch file processing

mod dispatch_file;
mod intermediate_result;
mod processing_cursor;

pub use dispatch_file::{
    Entity as DispatchFileEntity,
    Model as DispatchFile,
    ActiveModel as DispatchFileActiveModel,
    Column as DispatchFileColumn,
};

pub use intermediate_result::{
    Entity as IntermediateResultEntity,
    Model as IntermediateResult,
    ActiveModel as IntermediateResultActiveModel,
    Column as IntermediateResultColumn,
    NewChunkResult,
    ResultStatus,
};

pub use processing_cursor::{
    Entity as ProcessingCursorEntity,
    Model as ProcessingCursor,
    ActiveModel as ProcessingCursorActiveModel,
    Column as ProcessingCursorColumn,
};
