/// Identifier minting
///
/// Every entity (user, room, membership) is named by a 128-bit identifier
/// combining a millisecond timestamp, a per-process machine tag and a
/// per-millisecond sequence. The codec is pure; the minter is the single
/// stateful, concurrency-sensitive piece and is constructed once per
/// machine tag and injected wherever identifiers are needed.

pub mod codec;
pub mod machine;
pub mod minter;

pub use codec::{EntityId, MAX_SEQUENCE};
pub use machine::MachineTag;
pub use minter::IdMinter;
