//! Packet Decoder (§4.1) and Capture Reader (§4.7): pure, stateless per-opcode decoding of a
//! captured game protocol session into tagged semantic records.

pub mod cursor;
pub mod decode;
pub mod error;
pub mod frame;
pub mod packet;

pub use decode::decode;
pub use error::DecodeError;
pub use frame::CaptureReader;
pub use packet::{Direction, ItemStack, MarketEntry, Opcode, PacketRecord, Position, PromptChoice, RawFrame};
