// Public facade: `Config` covers every recognized option, `Workspace` wires
// a `SyncEngine` to a transport and exposes `Collection`/`Document` views
// over it. Everything here is orchestration -- the actual CRDT, queue and
// transport logic live one layer down, in `nmeshed-engine` and its
// dependencies.

mod config;
mod workspace;

pub use config::{Config, SyncMode};
pub use workspace::Workspace;

pub use nmeshed_base::{Error, ErrorKind, ParticipantId, Result, WallClock, WorkspaceId};
pub use nmeshed_engine::{ConnectionOrchestrator, EngineState, SchemaCodec, SyncEngine};
pub use nmeshed_net::{FixedJitter, JitterSource, LoopbackChannel, RandJitter, RawChannel, TransportStatus};
pub use nmeshed_queue::{MemoryStore, PersistentStore};
pub use nmeshed_view::{Collection, DocSnapshot, Document, OpEvent};
