//! 解封装器实现.

pub mod mpegts;

pub use mpegts::{ElementaryStream, TS_PACKET_SIZE, TsDemuxer};
