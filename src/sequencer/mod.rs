// Sequencer module - Transport, tick scheduling and the note-producing processors

pub mod chorder;
pub mod function;
pub mod note;
pub mod pattern;
pub mod player;
pub mod scheduler;
pub mod timeline;
pub mod transport;

pub use chorder::Chorder;
pub use function::{FunctionSequencer, GeneratedNote, HandlerError, TickHandler};
pub use note::Note;
pub use pattern::{ClipState, PatternError, PatternStore};
pub use player::PianoRollProcessor;
pub use scheduler::{TickCrossing, TickScheduler};
pub use timeline::{
    FUNCTION_SEQ_PPQN, MusicalTime, PIANO_ROLL_PPQN, STEP_TICKS, compute_tick, seconds_per_tick,
};
pub use transport::{TempoRamp, TransportError, TransportLedger, TransportSegment};
