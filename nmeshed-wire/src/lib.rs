mod bytes_io;
mod columnar;
mod frame;
mod op;
mod presence;
mod router;
mod sync;

pub use bytes_io::{ByteReader, ByteWriter};
pub use columnar::{ActorRegistry, ColumnarBatch, ColumnarEntry};
pub use frame::{FrameType, WireFrame};
pub use op::Operation;
pub use presence::{PresenceMsg, PresenceStatus};
pub use router::{MessageRouter, ParsedMessage};
pub use sync::SyncPayload;
