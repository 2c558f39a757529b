//! 基础设施层
//!
//! 只暴露与业务无关的能力（字节流 → 事件、取消标志）

pub mod cancel;
pub mod event_stream;

pub use cancel::CancelToken;
pub use event_stream::{decode_stream, EventStreamDecoder};
